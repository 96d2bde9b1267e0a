//! Core data models for the image bucket.
//!
//! A stored image is one files record (`ObjectMetadata`) plus an ordered run
//! of `Chunk`s. Rows map to the database via `sqlx::FromRow` and serialize
//! as JSON via `serde`.

pub mod chunk;
pub mod extension;
pub mod file;
pub mod object_id;
