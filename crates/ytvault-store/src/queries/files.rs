//! Path ↔ id registry.

use std::path::{Path, PathBuf};

use ytvault_models::{FileEntry, FileId};

use crate::{Database, StoreError, StoreResult};

/// Sole authority for minting file ids.
///
/// Paths are made absolute lexically (no symlink resolution, the file need
/// not exist) before every lookup, so `a/b.mp4` and `./a/b.mp4` share an id.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    db: Database,
}

impl FileRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Return the id for `path`, registering it on first sight.
    ///
    /// Concurrent first registrations of the same path race on the unique
    /// constraint; the loser re-reads the winner's id.
    pub async fn get_or_create(&self, path: impl AsRef<Path>) -> StoreResult<FileId> {
        let key = path_key(path.as_ref())?;
        if let Some(entry) = self.lookup(&key).await? {
            return Ok(entry.id);
        }

        let id = FileId::new();
        sqlx::query("INSERT INTO files (id, file_path) VALUES (?, ?) ON CONFLICT(file_path) DO NOTHING")
            .bind(id.as_str())
            .bind(&key)
            .execute(self.db.pool())
            .await?;

        self.lookup(&key)
            .await?
            .map(|entry| entry.id)
            .ok_or(StoreError::MissingFileRow(key))
    }

    pub async fn get(&self, id: &FileId) -> StoreResult<Option<FileEntry>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, file_path FROM files WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(self.db.pool())
                .await?;
        Ok(row.map(|(id, file_path)| FileEntry {
            id: FileId(id),
            file_path,
        }))
    }

    /// Registered path for `id`.
    pub async fn resolve(&self, id: &FileId) -> StoreResult<Option<PathBuf>> {
        Ok(self.get(id).await?.map(|e| PathBuf::from(e.file_path)))
    }

    pub async fn find_by_path(&self, path: impl AsRef<Path>) -> StoreResult<Option<FileEntry>> {
        let key = path_key(path.as_ref())?;
        self.lookup(&key).await
    }

    /// Drop the mapping. Returns `false` if the id was unknown.
    pub async fn remove(&self, id: &FileId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id.as_str())
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn lookup(&self, key: &str) -> StoreResult<Option<FileEntry>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM files WHERE file_path = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|(id,)| FileEntry {
            id: FileId(id),
            file_path: key.to_string(),
        }))
    }
}

fn path_key(path: &Path) -> StoreResult<String> {
    Ok(std::path::absolute(path)?.to_string_lossy().into_owned())
}
