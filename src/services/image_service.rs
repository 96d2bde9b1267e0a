//! src/services/image_service.rs
//!
//! ImageService — upload and download orchestration for the `images` bucket.
//! Validates input, then coordinates the catalog and the chunk store over a
//! shared SQLite pool. Each call is independent; the pool is the only state
//! shared between requests.

use super::{
    StorageError, StorageResult,
    catalog::{self, NewObject},
    chunk_store::ChunkStore,
};
use crate::models::{extension::ImageExtension, file::ObjectMetadata, object_id::ObjectId};
use bytes::Bytes;
use futures::{Stream, stream};
use serde::Serialize;
use sqlx::SqlitePool;
use std::{io, sync::Arc};
use tracing::info;

/// Summary returned to the uploader.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub id: ObjectId,
    pub name: String,
    pub size: i64,
}

/// A fully reassembled image ready to be sent.
#[derive(Debug)]
pub struct ImageDownload {
    pub metadata: ObjectMetadata,
    pub body: Vec<u8>,
}

impl ImageDownload {
    pub fn content_type(&self) -> &'static str {
        self.metadata.content_type()
    }
}

#[derive(Clone)]
pub struct ImageService {
    /// Process-wide connection pool, created once at startup.
    pub db: Arc<SqlitePool>,

    chunks: ChunkStore,
}

impl ImageService {
    pub fn new(db: Arc<SqlitePool>, chunk_size: usize) -> Self {
        Self {
            db,
            chunks: ChunkStore::new(chunk_size),
        }
    }

    /// Store an in-memory payload under `filename`.
    pub async fn upload(&self, filename: &str, content: Bytes) -> StorageResult<StoredImage> {
        let frames = stream::iter([Ok::<_, io::Error>(content)]);
        self.upload_stream(filename, frames).await
    }

    /// Store a streamed payload under `filename`.
    ///
    /// The extension is checked before anything touches the database. Chunks
    /// and the files record are written in one transaction, chunks first, so
    /// an object is either fully visible or absent.
    pub async fn upload_stream<S>(&self, filename: &str, stream: S) -> StorageResult<StoredImage>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let extension = ImageExtension::from_filename(filename)?;
        let id = ObjectId::new();

        let mut tx = self.db.begin().await?;
        let written = self.chunks.write(&mut tx, &id, filename, stream).await?;
        let meta = catalog::create(
            &mut tx,
            NewObject {
                id,
                filename,
                length: written.length,
                chunk_size: self.chunks.chunk_size() as i64,
                extension,
                md5: written.md5,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            "stored {} as {} ({} bytes, {} chunk(s))",
            meta.filename, meta.id, meta.length, written.chunks
        );

        Ok(StoredImage {
            id: meta.id,
            name: meta.filename,
            size: meta.length,
        })
    }

    /// Reassemble the image whose identifier is the hex string `raw_id`.
    pub async fn download_by_id(&self, raw_id: &str) -> StorageResult<ImageDownload> {
        let id: ObjectId = raw_id.parse()?;
        let mut conn = self.db.acquire().await?;

        let mut body = Vec::new();
        let metadata = self.chunks.read_by_id(&mut conn, &id, &mut body).await?;

        info!("served {} by id ({} bytes)", metadata.id, body.len());
        Ok(ImageDownload { metadata, body })
    }

    /// Reassemble the most recent image stored under `filename`.
    pub async fn download_by_name(&self, filename: &str) -> StorageResult<ImageDownload> {
        let mut conn = self.db.acquire().await?;

        let mut body = Vec::new();
        let metadata = self
            .chunks
            .read_by_filename(&mut conn, filename, &mut body)
            .await?;

        info!(
            "served {} by name {} ({} bytes)",
            metadata.id,
            filename,
            body.len()
        );
        Ok(ImageDownload { metadata, body })
    }

    /// Cheap connectivity check used by `/readyz`.
    pub async fn ping(&self) -> StorageResult<()> {
        let one = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        if one != 1 {
            return Err(StorageError::Sqlx(sqlx::Error::Protocol(format!(
                "unexpected ping result: {one}"
            ))));
        }
        Ok(())
    }
}
