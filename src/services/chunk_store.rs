//! ChunkStore — splits object content into fixed-size numbered chunks and
//! reassembles it in sequence order.
//!
//! Chunks for object `id` are rows `(files_id = id, n, data)` with `n`
//! running `0..ceil(length / chunk_size)`. Every chunk but the last is
//! exactly `chunk_size` bytes. Content is never compressed or deduplicated.

use super::{StorageError, StorageResult, catalog};
use crate::models::{chunk::Chunk, file::ObjectMetadata, object_id::ObjectId};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt, pin_mut};
use md5::Context;
use sqlx::SqliteConnection;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Outcome of a completed `ChunkStore::write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenContent {
    /// Total bytes consumed from the input stream.
    pub length: i64,

    /// Number of chunk rows inserted.
    pub chunks: i64,

    /// Hex MD5 digest of the content.
    pub md5: String,
}

#[derive(Clone, Debug)]
pub struct ChunkStore {
    chunk_size: usize,
}

impl ChunkStore {
    /// `chunk_size` must be non-zero; `AppConfig::validate` enforces it.
    pub fn new(chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0, "chunk size must be non-zero");
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Consume `stream` to the end, persisting it as chunks of `id`.
    ///
    /// Incoming frames may be any size; they are re-blocked so that every
    /// stored chunk except the last is exactly `chunk_size` bytes. The
    /// caller owns the transaction: nothing here commits.
    pub async fn write<S>(
        &self,
        conn: &mut SqliteConnection,
        id: &ObjectId,
        filename: &str,
        stream: S,
    ) -> StorageResult<WrittenContent>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let files_id = id.to_hex();
        let mut pending = BytesMut::with_capacity(self.chunk_size);
        let mut length: i64 = 0;
        let mut n: i64 = 0;
        let mut digest = Context::new();

        pin_mut!(stream);
        while let Some(frame) = stream.next().await {
            let mut frame = frame?;
            length += frame.len() as i64;
            digest.consume(&frame);

            while !frame.is_empty() {
                let take = (self.chunk_size - pending.len()).min(frame.len());
                pending.extend_from_slice(&frame.split_to(take));
                if pending.len() == self.chunk_size {
                    let data = pending.split().freeze();
                    insert_chunk(conn, &files_id, n, &data).await?;
                    n += 1;
                }
            }
        }

        if !pending.is_empty() {
            let data = pending.split().freeze();
            insert_chunk(conn, &files_id, n, &data).await?;
            n += 1;
        }

        debug!("wrote {} bytes of {} as {} chunk(s) under {}", length, filename, n, id);

        Ok(WrittenContent {
            length,
            chunks: n,
            md5: format!("{:x}", digest.compute()),
        })
    }

    /// Look up `id` in the catalog and stream its content into `sink`.
    pub async fn read_by_id<W>(
        &self,
        conn: &mut SqliteConnection,
        id: &ObjectId,
        sink: &mut W,
    ) -> StorageResult<ObjectMetadata>
    where
        W: AsyncWrite + Unpin,
    {
        let meta = catalog::find_by_id(conn, id).await?;
        self.read_content(conn, &meta, sink).await?;
        Ok(meta)
    }

    /// Resolve `filename` to its most recent object, then behave as `read_by_id`.
    pub async fn read_by_filename<W>(
        &self,
        conn: &mut SqliteConnection,
        filename: &str,
        sink: &mut W,
    ) -> StorageResult<ObjectMetadata>
    where
        W: AsyncWrite + Unpin,
    {
        let meta = catalog::find_by_filename(conn, filename).await?;
        self.read_content(conn, &meta, sink).await?;
        Ok(meta)
    }

    /// Concatenate the chunks of `meta` in sequence order into `sink`.
    ///
    /// Verifies the run is contiguous, sized per the object's own chunk size
    /// and totals `meta.length`. Returns the number of bytes written.
    pub async fn read_content<W>(
        &self,
        conn: &mut SqliteConnection,
        meta: &ObjectMetadata,
        sink: &mut W,
    ) -> StorageResult<i64>
    where
        W: AsyncWrite + Unpin,
    {
        let expected = meta.expected_chunks();
        let mut next: i64 = 0;
        let mut written: i64 = 0;

        let mut rows = sqlx::query_as::<_, Chunk>(
            "SELECT n, data FROM images_chunks WHERE files_id = ? ORDER BY n ASC",
        )
        .bind(meta.id.to_hex())
        .fetch(&mut *conn);

        while let Some(chunk) = rows.try_next().await? {
            if chunk.n != next {
                return Err(if chunk.n > next {
                    StorageError::MissingChunk { id: meta.id, n: next }
                } else {
                    corrupt(meta, chunk.n, "duplicate sequence number")
                });
            }
            if chunk.n >= expected {
                return Err(corrupt(meta, chunk.n, "beyond the object's length"));
            }

            let want = if chunk.n == expected - 1 {
                meta.length - meta.chunk_size * (expected - 1)
            } else {
                meta.chunk_size
            };
            if chunk.data.len() as i64 != want {
                return Err(corrupt(
                    meta,
                    chunk.n,
                    &format!("expected {} bytes, found {}", want, chunk.data.len()),
                ));
            }

            sink.write_all(&chunk.data).await?;
            written += want;
            next += 1;
        }

        if next < expected {
            return Err(StorageError::MissingChunk { id: meta.id, n: next });
        }
        sink.flush().await?;

        debug!("read {} bytes of {} from {} chunk(s)", written, meta.id, next);
        Ok(written)
    }
}

async fn insert_chunk(
    conn: &mut SqliteConnection,
    files_id: &str,
    n: i64,
    data: &[u8],
) -> StorageResult<()> {
    sqlx::query("INSERT INTO images_chunks (files_id, n, data) VALUES (?, ?, ?)")
        .bind(files_id)
        .bind(n)
        .bind(data)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn corrupt(meta: &ObjectMetadata, n: i64, reason: &str) -> StorageError {
    StorageError::CorruptChunk {
        id: meta.id,
        n,
        reason: reason.to_string(),
    }
}
