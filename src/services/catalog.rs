//! Files records of the `images` bucket.
//!
//! Every function takes a borrowed connection so callers can run catalog
//! writes inside the same transaction as the chunk writes.

use super::{StorageError, StorageResult};
use crate::models::{
    extension::ImageExtension,
    file::{FileRow, ObjectMetadata},
    object_id::ObjectId,
};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

const SELECT_FILES: &str = "SELECT id, filename, length, chunk_size, extension, md5, upload_date
     FROM images_files";

/// Fields supplied by the uploader once the content has been chunked.
#[derive(Debug, Clone)]
pub struct NewObject<'a> {
    pub id: ObjectId,
    pub filename: &'a str,
    pub length: i64,
    pub chunk_size: i64,
    pub extension: ImageExtension,
    pub md5: String,
}

/// Insert the files record for a freshly written object.
pub async fn create(
    conn: &mut SqliteConnection,
    new: NewObject<'_>,
) -> StorageResult<ObjectMetadata> {
    let meta = ObjectMetadata {
        id: new.id,
        filename: new.filename.to_string(),
        length: new.length,
        chunk_size: new.chunk_size,
        extension: new.extension,
        md5: new.md5,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO images_files (id, filename, length, chunk_size, extension, md5, upload_date)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(meta.id.to_hex())
    .bind(&meta.filename)
    .bind(meta.length)
    .bind(meta.chunk_size)
    .bind(meta.extension.as_str())
    .bind(&meta.md5)
    .bind(meta.created_at)
    .execute(&mut *conn)
    .await?;

    debug!("created files record {} ({})", meta.id, meta.filename);
    Ok(meta)
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: &ObjectId,
) -> StorageResult<ObjectMetadata> {
    let sql = format!("{SELECT_FILES} WHERE id = ?");
    let row = sqlx::query_as::<_, FileRow>(&sql)
        .bind(id.to_hex())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StorageError::IdNotFound(*id))?;

    Ok(ObjectMetadata::try_from(row)?)
}

/// Resolve a filename to one object.
///
/// Filenames are not unique; the most recently committed record wins.
pub async fn find_by_filename(
    conn: &mut SqliteConnection,
    filename: &str,
) -> StorageResult<ObjectMetadata> {
    let sql = format!("{SELECT_FILES} WHERE filename = ? ORDER BY rowid DESC LIMIT 1");
    let row = sqlx::query_as::<_, FileRow>(&sql)
        .bind(filename)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StorageError::FilenameNotFound(filename.to_string()))?;

    Ok(ObjectMetadata::try_from(row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::memory_pool;

    fn new_object(filename: &str) -> NewObject<'_> {
        NewObject {
            id: ObjectId::new(),
            filename,
            length: 3,
            chunk_size: 4,
            extension: ImageExtension::Png,
            md5: "900150983cd24fb0d6963f7d28e17f72".into(),
        }
    }

    #[tokio::test]
    async fn create_then_find_by_id() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let created = create(&mut conn, new_object("cat.png")).await.unwrap();
        let found = find_by_id(&mut conn, &created.id).await.unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.filename, "cat.png");
        assert_eq!(found.length, 3);
        assert_eq!(found.chunk_size, 4);
        assert_eq!(found.extension, ImageExtension::Png);
        assert_eq!(found.md5, created.md5);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let missing = ObjectId::new();
        let err = find_by_id(&mut conn, &missing).await.unwrap_err();
        assert!(matches!(err, StorageError::IdNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn filename_lookup_prefers_latest() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let _first = create(&mut conn, new_object("dup.jpg")).await.unwrap();
        let second = create(&mut conn, new_object("dup.jpg")).await.unwrap();
        create(&mut conn, new_object("other.jpg")).await.unwrap();

        let found = find_by_filename(&mut conn, "dup.jpg").await.unwrap();
        assert_eq!(found.id, second.id);
    }

    #[tokio::test]
    async fn unknown_filename_is_not_found() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let err = find_by_filename(&mut conn, "ghost.png").await.unwrap_err();
        assert!(matches!(err, StorageError::FilenameNotFound(name) if name == "ghost.png"));
    }
}
