//! `tokio::fs` adapter for the `FileStore` port.

use crate::domain::DtsError;
use crate::ports::FileStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct TokioFileStore {
    root: PathBuf,
}

impl TokioFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl FileStore for TokioFileStore {
    fn location(&self) -> &Path {
        &self.root
    }

    async fn list(&self) -> Result<Vec<String>, DtsError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| DtsError::io(&self.root, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DtsError::io(&self.root, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|file_type| file_type.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn exists(&self, name: &str) -> Result<bool, DtsError> {
        let path = self.path(name);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| DtsError::io(path, e))
    }

    async fn read(&self, name: &str) -> Result<Bytes, DtsError> {
        let path = self.path(name);
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| DtsError::io(path, e))
    }

    async fn delete(&self, name: &str) -> Result<(), DtsError> {
        let path = self.path(name);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| DtsError::io(path, e))
    }

    async fn move_into(&self, name: &str, folder: &Path) -> Result<PathBuf, DtsError> {
        let target_folder = self.root.join(folder);
        tokio::fs::create_dir_all(&target_folder)
            .await
            .map_err(|e| DtsError::io(&target_folder, e))?;

        let from = self.path(name);
        let to = target_folder.join(name);
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| DtsError::io(&from, e))?;

        debug!(from = %from.display(), to = %to.display(), "Moved file");
        Ok(to)
    }
}
