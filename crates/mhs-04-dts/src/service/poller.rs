//! Waits for the data file paired with a control file.
//!
//! DTS writes the control file and the data file independently, so the
//! control file can show up first. The poller checks for existence only; a
//! data file still being written when it appears is read as-is.

use crate::domain::DtsError;
use crate::ports::FileStore;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct FilePairPoller {
    interval: Duration,
    max_attempts: u32,
}

impl FilePairPoller {
    /// `max_attempts` is clamped to at least one check.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Check for `expected` immediately, then every `interval`, up to
    /// `max_attempts` checks. Returns the name once it exists.
    pub async fn await_paired_file(
        &self,
        store: &dyn FileStore,
        expected: &str,
    ) -> Result<String, DtsError> {
        for attempt in 1..=self.max_attempts {
            if store.exists(expected).await? {
                debug!(file_name = %expected, attempt, "Paired data file found");
                return Ok(expected.to_string());
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(DtsError::DataFileTimeout {
            file_name: expected.to_string(),
            attempts: self.max_attempts,
        })
    }
}
