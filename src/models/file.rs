//! Represents the metadata record of a stored image (the bucket's files table).

use super::{extension::ImageExtension, object_id::ObjectId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Metadata for one stored object. Content bytes live in the chunks table.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Primary lookup key, allocated at upload time.
    pub id: ObjectId,

    /// Original upload name. Not unique.
    pub filename: String,

    /// Total size of the reassembled content in bytes.
    pub length: i64,

    /// Chunk size this object was split with.
    pub chunk_size: i64,

    /// Validated extension, drives the response content type.
    pub extension: ImageExtension,

    /// Hex MD5 digest of the full content.
    pub md5: String,

    /// When the upload completed.
    pub created_at: DateTime<Utc>,
}

impl ObjectMetadata {
    /// Number of chunks the content must be split into.
    pub fn expected_chunks(&self) -> i64 {
        if self.length <= 0 || self.chunk_size <= 0 {
            return 0;
        }
        (self.length + self.chunk_size - 1) / self.chunk_size
    }

    pub fn content_type(&self) -> &'static str {
        self.extension.content_type()
    }
}

/// Raw row shape of `images_files`.
#[derive(FromRow, Debug)]
pub struct FileRow {
    pub id: String,
    pub filename: String,
    pub length: i64,
    pub chunk_size: i64,
    pub extension: String,
    pub md5: String,
    pub upload_date: DateTime<Utc>,
}

/// A row that no longer matches the typed schema.
#[derive(Debug, thiserror::Error)]
#[error("files record `{id}` is malformed: {reason}")]
pub struct MalformedFileRow {
    pub id: String,
    pub reason: String,
}

impl TryFrom<FileRow> for ObjectMetadata {
    type Error = MalformedFileRow;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        let id = row.id.parse::<ObjectId>().map_err(|e| MalformedFileRow {
            id: row.id.clone(),
            reason: e.to_string(),
        })?;
        let extension = row
            .extension
            .parse::<ImageExtension>()
            .map_err(|_| MalformedFileRow {
                id: row.id.clone(),
                reason: format!("unknown extension `{}`", row.extension),
            })?;

        Ok(ObjectMetadata {
            id,
            filename: row.filename,
            length: row.length,
            chunk_size: row.chunk_size,
            extension,
            md5: row.md5,
            created_at: row.upload_date,
        })
    }
}
