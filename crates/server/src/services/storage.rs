// Blob store: raw uploaded bytes on disk, addressed by filename. The
// metadata row in `files` and the blob here are not transactionally
// coupled; either can exist without the other.

use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct BlobStore {
    base_path: PathBuf,
}

impl BlobStore {
    pub fn new(base_path: String) -> Self {
        Self {
            base_path: PathBuf::from(base_path),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {e}")))?;
        Ok(())
    }

    fn blob_path(&self, filename: &str) -> PathBuf {
        self.base_path.join(filename)
    }

    /// Writes the blob, silently replacing any existing bytes under the
    /// same name (last writer wins).
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<()> {
        let path = self.blob_path(filename);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create directories: {e}")))?;
        }

        fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write blob: {e}")))?;

        Ok(())
    }

    pub async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        // Reads are confined to the upload directory: a name that is not a
        // plain file name (parent refs, separators, absolute paths) is
        // treated as absent rather than resolved.
        let is_plain_name = Path::new(filename)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain_name {
            return Err(AppError::NotFound(format!("File not found: {filename}")));
        }

        let path = self.blob_path(filename);

        if !path.exists() {
            return Err(AppError::NotFound(format!("File not found: {filename}")));
        }

        fs::read(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read blob: {e}")))
    }
}
