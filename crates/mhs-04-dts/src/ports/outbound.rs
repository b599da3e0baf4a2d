//! Outbound (Driven) ports for the DTS transport.

use crate::domain::DtsError;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// The watched DTS folder. All names are plain file names inside it.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// The folder itself.
    fn location(&self) -> &Path;

    /// Names of the regular files currently in the folder.
    async fn list(&self) -> Result<Vec<String>, DtsError>;

    async fn exists(&self, name: &str) -> Result<bool, DtsError>;

    async fn read(&self, name: &str) -> Result<Bytes, DtsError>;

    async fn delete(&self, name: &str) -> Result<(), DtsError>;

    /// Move `name` into `folder` (created if missing; relative paths resolve
    /// against `location()`). Returns the new path.
    async fn move_into(&self, name: &str, folder: &Path) -> Result<PathBuf, DtsError>;
}
