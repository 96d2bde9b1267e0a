//! Storage layer for the `images` bucket.
//!
//! - `catalog`      files records: create and look up by id or filename
//! - `chunk_store`  splitting content into numbered chunks and reassembling it
//! - `image_service` upload/download orchestration used by the HTTP handlers

pub mod catalog;
pub mod chunk_store;
pub mod image_service;

use crate::models::{
    extension::UnsupportedExtension,
    file::MalformedFileRow,
    object_id::{ObjectId, ObjectIdError},
};
use std::io;
use thiserror::Error;

/// Name of the single bucket this service manages.
pub const BUCKET_NAME: &str = "images";

/// Default chunk size, matching the usual GridFS default of 255 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    UnsupportedExtension(#[from] UnsupportedExtension),
    #[error(transparent)]
    InvalidObjectId(#[from] ObjectIdError),
    #[error("Image not found")]
    IdNotFound(ObjectId),
    #[error("Image not found")]
    FilenameNotFound(String),
    #[error("chunk {n} of `{id}` is missing")]
    MissingChunk { id: ObjectId, n: i64 },
    #[error("chunk {n} of `{id}` is corrupt: {reason}")]
    CorruptChunk { id: ObjectId, n: i64, reason: String },
    #[error(transparent)]
    MalformedRecord(#[from] MalformedFileRow),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Coarse classification used at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidInput,
    NotFound,
    StorageFailure,
}

impl StorageError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StorageError::UnsupportedExtension(_) | StorageError::InvalidObjectId(_) => {
                ErrorClass::InvalidInput
            }
            StorageError::IdNotFound(_) | StorageError::FilenameNotFound(_) => {
                ErrorClass::NotFound
            }
            StorageError::MissingChunk { .. }
            | StorageError::CorruptChunk { .. }
            | StorageError::MalformedRecord(_)
            | StorageError::Sqlx(_)
            | StorageError::Io(_) => ErrorClass::StorageFailure,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
