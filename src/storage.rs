//! Image file storage.
//!
//! Originals land under `uploads/`, editor deliveries under
//! `uploads/edited/`. Files are written to a local directory tree and
//! addressed by key; public URLs are the configured base joined with the
//! key, so the key never leaks filesystem layout.

use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;

use crate::error::AppError;

pub const UPLOADS_PREFIX: &str = "uploads";
pub const EDITED_PREFIX: &str = "uploads/edited";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write object {key}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
    public_url_base: String,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_url_base: impl Into<String>) -> Self {
        let mut public_url_base = public_url_base.into();
        while public_url_base.ends_with('/') {
            public_url_base.pop();
        }
        Self {
            root: root.into(),
            public_url_base,
        }
    }

    /// Write `bytes` under `key`, creating parent directories as needed.
    /// Returns the public URL of the stored object.
    pub async fn store(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| {
                StorageError::Write {
                    key: key.to_string(),
                    source,
                }
            })?;
        }
        fs::write(&path, bytes).await.map_err(|source| StorageError::Write {
            key: key.to_string(),
            source,
        })?;
        Ok(self.public_url(key))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url_base, key)
    }
}
