//! Represents one slice of an object's content (the bucket's chunks table).

use sqlx::FromRow;

/// A chunk row as read back for reassembly.
///
/// Chunks of one object share a `files_id` and are numbered `0..n-1`.
#[derive(FromRow, Debug, Clone)]
pub struct Chunk {
    /// Sequence number within the owning object, 0-based.
    pub n: i64,

    /// Raw bytes, at most the object's chunk size.
    pub data: Vec<u8>,
}
