//! DTS receiver configuration.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtsConfig {
    /// Only `<file_prefix>*.ctl` files are picked up.
    pub file_prefix: String,
    /// Where failed data files go; relative paths resolve against the
    /// watched folder.
    pub error_folder: PathBuf,
    pub data_file_polling_interval: Duration,
    pub data_file_max_attempts: u32,
    pub scan_interval: Duration,
    pub worker_pool_size: usize,
}

impl Default for DtsConfig {
    fn default() -> Self {
        Self {
            file_prefix: String::new(),
            error_folder: PathBuf::from("error"),
            data_file_polling_interval: Duration::from_millis(200),
            data_file_max_attempts: 100,
            scan_interval: Duration::from_secs(1),
            worker_pool_size: 4,
        }
    }
}
