//! # Transport Configuration
//!
//! Loaded from a TOML file with camelCase keys. Every key is optional.
//!
//! ```toml
//! spineUrl = "https://msg.spine.example/reliablemessaging"
//! dtsFolder = "/var/dts/in"
//! dtsFilePrefix = "SITE01APP"
//! errorFolder = "error"
//! dataFilePollingInterval = 200   # ms
//! dataFileMaxAttempts = 100
//! dtsScanInterval = 1000          # ms
//! maximumRedeliveries = 2
//! redeliveryDelay = 2000          # ms
//! aggregatorTimeout = 30000       # ms, how long a send waits for its ack
//! workerPoolSize = 4
//! publishRedeliveries = 5
//! publishRedeliveryDelay = 1000   # ms
//! dedupRetention = 86400000       # ms, how long received ids are remembered
//! dedupExpiryInterval = 60000     # ms
//! ```
//!
//! Environment overrides (applied after the file): `MHS_SPINE_URL`,
//! `MHS_DTS_FOLDER`, `MHS_DTS_FILE_PREFIX`, `MHS_ERROR_FOLDER`.

use mhs_02_forward_express::SenderConfig;
use mhs_03_idempotent_receiver::ReceiverConfig;
use mhs_04_dts::DtsConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Remote MHS endpoint for outbound messages and acks.
    pub spine_url: String,
    /// Watched DTS folder. The DTS receiver is not started without one.
    pub dts_folder: Option<PathBuf>,
    pub dts_file_prefix: String,
    pub error_folder: PathBuf,
    pub data_file_polling_interval: u64,
    pub data_file_max_attempts: u32,
    pub dts_scan_interval: u64,
    pub maximum_redeliveries: u32,
    pub redelivery_delay: u64,
    pub aggregator_timeout: u64,
    pub worker_pool_size: usize,
    pub publish_redeliveries: u32,
    pub publish_redelivery_delay: u64,
    /// Inbound message ids and DTS control file names older than this are
    /// forgotten, so a later copy is processed again.
    pub dedup_retention: u64,
    pub dedup_expiry_interval: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            spine_url: String::new(),
            dts_folder: None,
            dts_file_prefix: String::new(),
            error_folder: PathBuf::from("error"),
            data_file_polling_interval: 200,
            data_file_max_attempts: 100,
            dts_scan_interval: 1000,
            maximum_redeliveries: 2,
            redelivery_delay: 2000,
            aggregator_timeout: 30_000,
            worker_pool_size: 4,
            publish_redeliveries: 5,
            publish_redelivery_delay: 1000,
            dedup_retention: 86_400_000,
            dedup_expiry_interval: 60_000,
        }
    }
}

impl TransportConfig {
    /// Read and parse `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `MHS_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `MHS_*` overrides from `lookup`. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(url) = lookup("MHS_SPINE_URL") {
            self.spine_url = url;
        }
        if let Some(folder) = lookup("MHS_DTS_FOLDER") {
            self.dts_folder = Some(PathBuf::from(folder));
        }
        if let Some(prefix) = lookup("MHS_DTS_FILE_PREFIX") {
            self.dts_file_prefix = prefix;
        }
        if let Some(folder) = lookup("MHS_ERROR_FOLDER") {
            self.error_folder = PathBuf::from(folder);
        }
        self
    }

    /// Reject settings the runtime cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spine_url.starts_with("http://") || self.spine_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "spineUrl must be an http(s) URL, got {:?}",
                self.spine_url
            )));
        }
        if self.worker_pool_size == 0 {
            return Err(ConfigError::Invalid("workerPoolSize must be at least 1".into()));
        }
        if self.data_file_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "dataFileMaxAttempts must be at least 1".into(),
            ));
        }
        if self.aggregator_timeout == 0 {
            return Err(ConfigError::Invalid("aggregatorTimeout must be positive".into()));
        }
        if self.dts_scan_interval == 0 {
            return Err(ConfigError::Invalid("dtsScanInterval must be positive".into()));
        }
        if self.dedup_retention == 0 || self.dedup_expiry_interval == 0 {
            return Err(ConfigError::Invalid(
                "dedupRetention and dedupExpiryInterval must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn dedup_retention(&self) -> Duration {
        Duration::from_millis(self.dedup_retention)
    }

    pub fn dedup_expiry_interval(&self) -> Duration {
        Duration::from_millis(self.dedup_expiry_interval)
    }

    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            maximum_redeliveries: self.maximum_redeliveries,
            redelivery_delay: Duration::from_millis(self.redelivery_delay),
            ack_timeout: Duration::from_millis(self.aggregator_timeout),
        }
    }

    pub fn receiver_config(&self) -> ReceiverConfig {
        ReceiverConfig {
            publish_redeliveries: self.publish_redeliveries,
            publish_redelivery_delay: Duration::from_millis(self.publish_redelivery_delay),
        }
    }

    pub fn dts_config(&self) -> DtsConfig {
        DtsConfig {
            file_prefix: self.dts_file_prefix.clone(),
            error_folder: self.error_folder.clone(),
            data_file_polling_interval: Duration::from_millis(self.data_file_polling_interval),
            data_file_max_attempts: self.data_file_max_attempts,
            scan_interval: Duration::from_millis(self.dts_scan_interval),
            worker_pool_size: self.worker_pool_size,
        }
    }
}
