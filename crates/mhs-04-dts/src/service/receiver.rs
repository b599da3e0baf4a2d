//! DTS message receiver.
//!
//! ```text
//! scan() ──→ <prefix>*.ctl, not processed, not in progress
//!   │
//! process_control_file(name)
//!   │ in-progress guard, processed check
//!   │ parse control file ── not Data ──→ Skipped (files untouched)
//!   │ await <stem>.dat, read it
//!   │ IdempotentReceiver::receive (keyed by control file name)
//!   ├── ok   → delete .dat and .ctl
//!   └── err  → move .dat into the error folder, keep .ctl
//! ```
//!
//! A failed control file stays marked processed, so it is not picked up
//! again while it sits in the folder.

use crate::domain::{
    data_file_name, is_control_file_for, ControlFile, DtsConfig, DtsError, DtsMessage,
    DtsMessageType,
};
use crate::ports::FileStore;
use crate::service::poller::FilePairPoller;
use mhs_03_idempotent_receiver::{IdempotentReceiver, NoopAckSender, PayloadSink, ReceiverConfig};
use shared_types::{InMemoryKeyStore, KeyStore};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// What happened to one control file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DtsDisposition {
    /// Payload published and both files deleted.
    Published,
    /// Payload had already been published; both files deleted.
    Duplicate,
    /// Control file is not a `Data` message.
    Skipped(DtsMessageType),
    AlreadyProcessed,
    AlreadyInProgress,
}

pub struct DtsMessageReceiver {
    store: Arc<dyn FileStore>,
    receiver: IdempotentReceiver<DtsMessage>,
    processed: Arc<dyn KeyStore>,
    in_progress: Arc<dyn KeyStore>,
    poller: FilePairPoller,
    config: DtsConfig,
}

impl DtsMessageReceiver {
    /// `processed` is shared with the idempotent receiver: a name is marked
    /// when its payload is published, skipped or failed.
    pub fn new(
        store: Arc<dyn FileStore>,
        processed: Arc<dyn KeyStore>,
        sink: Arc<dyn PayloadSink<DtsMessage>>,
        receiver_config: ReceiverConfig,
        config: DtsConfig,
    ) -> Self {
        let receiver = IdempotentReceiver::<DtsMessage>::new(
            processed.clone(),
            sink,
            Arc::new(NoopAckSender),
            receiver_config,
        );
        let poller = FilePairPoller::new(
            config.data_file_polling_interval,
            config.data_file_max_attempts,
        );
        Self {
            store,
            receiver,
            processed,
            in_progress: Arc::new(InMemoryKeyStore::new("dts-in-progress")),
            poller,
            config,
        }
    }

    /// Control files waiting to be processed, in name order.
    pub async fn scan(&self) -> Result<Vec<String>, DtsError> {
        let names = self.store.list().await?;
        Ok(names
            .into_iter()
            .filter(|name| is_control_file_for(name, &self.config.file_prefix))
            .filter(|name| !self.processed.contains(name) && !self.in_progress.contains(name))
            .collect())
    }

    /// Process one control file and its paired data file.
    ///
    /// # Errors
    ///
    /// Any failure after the in-progress guard. The data file (if present)
    /// has been moved to the error folder by the time this returns.
    pub async fn process_control_file(&self, name: &str) -> Result<DtsDisposition, DtsError> {
        let Some(data_name) = data_file_name(name) else {
            return Err(DtsError::NotAControlFile(name.to_string()));
        };
        if self.processed.contains(name) {
            return Ok(DtsDisposition::AlreadyProcessed);
        }
        if !self.in_progress.add(name) {
            return Ok(DtsDisposition::AlreadyInProgress);
        }

        let result = self.process_pair(name, &data_name).await;
        if let Err(e) = &result {
            self.fail(name, &data_name, e).await;
        }
        self.in_progress.remove(name);
        result
    }

    async fn process_pair(&self, name: &str, data_name: &str) -> Result<DtsDisposition, DtsError> {
        let raw = self.store.read(name).await?;
        let raw_control_file = String::from_utf8_lossy(&raw).into_owned();
        let control_file = ControlFile::parse(name, &raw_control_file)?;

        if !control_file.is_data() {
            if control_file.message_type == DtsMessageType::Report {
                info!(
                    event = "dts-report-ignored",
                    file_name = %name,
                    "Ignoring DTS report control file"
                );
            } else {
                debug!(file_name = %name, message_type = %control_file.message_type, "Skipping control file");
            }
            self.processed.add(name);
            return Ok(DtsDisposition::Skipped(control_file.message_type));
        }

        self.poller
            .await_paired_file(self.store.as_ref(), data_name)
            .await?;
        let data = self.store.read(data_name).await?;

        let message = DtsMessage {
            control_file_name: name.to_string(),
            control_file,
            raw_control_file,
            data,
        };
        let outcome = self.receiver.receive(&message).await?;

        self.store.delete(data_name).await?;
        self.store.delete(name).await?;

        info!(
            event = "dts-message-received",
            file_name = %name,
            duplicate = outcome.duplicate,
            "Processed DTS message"
        );

        Ok(if outcome.duplicate {
            DtsDisposition::Duplicate
        } else {
            DtsDisposition::Published
        })
    }

    async fn fail(&self, name: &str, data_name: &str, cause: &DtsError) {
        error!(file_name = %name, error = %cause, "Failed to process DTS message");
        self.processed.add(name);

        match self.store.exists(data_name).await {
            Ok(true) => match self.store.move_into(data_name, &self.config.error_folder).await {
                Ok(moved) => {
                    warn!(file_name = %data_name, to = %moved.display(), "Moved data file to error folder")
                }
                Err(e) => error!(file_name = %data_name, error = %e, "Failed to move data file"),
            },
            Ok(false) => {}
            Err(e) => error!(file_name = %data_name, error = %e, "Failed to check data file"),
        }
    }

    /// Scan at `scan_interval` and process control files with at most
    /// `worker_pool_size` in flight. In-flight files finish before return.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let permits = Arc::new(Semaphore::new(self.config.worker_pool_size.max(1)));
        let mut interval = tokio::time::interval(self.config.scan_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut tasks = JoinSet::new();

        info!(
            folder = %self.store.location().display(),
            prefix = %self.config.file_prefix,
            "DTS receiver started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = result {
                        error!(error = %e, "DTS task failed");
                    }
                }
                _ = interval.tick() => {
                    let names = match self.scan().await {
                        Ok(names) => names,
                        Err(e) => {
                            warn!(error = %e, "DTS folder scan failed");
                            continue;
                        }
                    };
                    for name in names {
                        if self.in_progress.contains(&name) {
                            continue;
                        }
                        let Ok(permit) = permits.clone().acquire_owned().await else {
                            break;
                        };
                        let receiver = self.clone();
                        tasks.spawn(async move {
                            let _permit = permit;
                            if let Err(e) = receiver.process_control_file(&name).await {
                                debug!(file_name = %name, error = %e, "Control file failed");
                            }
                        });
                    }
                }
            }
        }

        info!(in_flight = tasks.len(), "DTS receiver stopping");
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "DTS task failed");
            }
        }
    }

    pub fn is_in_progress(&self, name: &str) -> bool {
        self.in_progress.contains(name)
    }
}
