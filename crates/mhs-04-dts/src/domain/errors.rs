//! DTS error types.

use mhs_03_idempotent_receiver::ReceiveError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DtsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid control file {file_name}: {reason}")]
    InvalidControlFile { file_name: String, reason: String },

    /// The paired data file never appeared.
    #[error("data file {file_name} not found after {attempts} attempts")]
    DataFileTimeout { file_name: String, attempts: u32 },

    #[error("failed to render control file: {0}")]
    Render(String),

    #[error("{0} is not a control file")]
    NotAControlFile(String),

    #[error(transparent)]
    Receive(#[from] ReceiveError),
}

impl DtsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
