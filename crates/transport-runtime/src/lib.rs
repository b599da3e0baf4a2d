//! # MHS Transport Runtime
//!
//! Wires every transport component onto one in-memory bus.
//!
//! ## Task Layout
//!
//! ```text
//!  OutboundRequest ──→ OutboundWorker ──POST──→ spineUrl
//!  OutboundAck     ──→ AckForwarder   ──POST──→ spineUrl
//!  EbxmlAck        ──→ AckListener ──→ PendingAckStore (wakes the waiting send)
//!  InboundMessage  ──→ EbxmlMessageReceiver ──→ InboundPayload / OutboundAck / EbxmlAck
//!  dtsFolder       ──→ DtsMessageReceiver   ──→ DtsPayload
//!  (timer)         ──→ pending ack cleanup
//!  (timer)         ──→ dedup key expiry (inbound-seen, dts-processed)
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then `MHS_*` environment overrides)
//! 2. Validate it
//! 3. Subscribe every consumer before any task runs, so nothing published
//!    after `start()` returns is missed
//! 4. Spawn the tasks
//!
//! ## Shutdown Sequence
//!
//! 1. Stop intake: the outbound worker, the DTS receiver and the timers
//! 2. Wait for them; in-flight sends and DTS files finish first
//! 3. Stop the reply path: the inbound receiver, the ack listener and the
//!    ack forwarder, which kept running so draining sends still get their
//!    acks

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use mhs_01_ebxml::{EnvelopeCodec, SoapEnvelopeCodec};
use mhs_02_forward_express::domain::pending::cleanup_task;
use mhs_02_forward_express::{
    AckForwarder, AckListener, BusResponseSink, ForwardExpressExchange, HttpDelivery,
    MultipartMessageSender, OutboundWorker, PendingAckStore, ReqwestDelivery,
};
use mhs_03_idempotent_receiver::{
    BusPayloadSink, EbxmlAckSender, EbxmlInboundMessage, EbxmlMessageReceiver, IdempotentReceiver,
};
use mhs_04_dts::{DtsBusSink, DtsMessageReceiver, TokioFileStore};
use shared_bus::{InMemoryMessageBus, MessageFilter, Topic};
use shared_types::InMemoryKeyStore;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

pub use config::{ConfigError, TransportConfig};

/// How often abandoned ack waiters are swept.
const PENDING_CLEANUP_INTERVAL: Duration = Duration::from_secs(10);

/// Start/stop handle for one group of tasks.
struct TaskGroup {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: JoinSet<()>,
}

impl TaskGroup {
    fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            shutdown_rx,
            tasks: JoinSet::new(),
        }
    }

    fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    async fn stop(&mut self, group: &str) {
        if let Err(e) = self.shutdown_tx.send(true) {
            error!(group, "Failed to send shutdown signal: {}", e);
        }
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(group, error = %e, "Runtime task failed");
            }
        }
        debug!(group, "Tasks stopped");
    }
}

/// The running transport.
pub struct TransportRuntime {
    config: TransportConfig,
    bus: Arc<InMemoryMessageBus>,
    http: Arc<dyn HttpDelivery>,
    pending: Arc<PendingAckStore>,
    /// Stores whose keys expire after `dedupRetention`.
    dedup_stores: Vec<Arc<InMemoryKeyStore>>,
    /// Outbound worker, DTS receiver, timers.
    intake: TaskGroup,
    /// Inbound receiver, ack listener, ack forwarder.
    replies: TaskGroup,
}

impl TransportRuntime {
    /// Build a runtime posting to `config.spine_url`.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let http = Arc::new(ReqwestDelivery::new(config.spine_url.clone()));
        Self::with_http(config, http)
    }

    /// Build a runtime with an explicit HTTP delivery.
    pub fn with_http(
        config: TransportConfig,
        http: Arc<dyn HttpDelivery>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            bus: Arc::new(InMemoryMessageBus::new()),
            http,
            pending: Arc::new(PendingAckStore::new()),
            dedup_stores: Vec::new(),
            intake: TaskGroup::new(),
            replies: TaskGroup::new(),
        })
    }

    /// The bus every component publishes on and consumes from.
    pub fn bus(&self) -> Arc<InMemoryMessageBus> {
        self.bus.clone()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Number of sends currently waiting for an ack.
    pub fn pending_acks(&self) -> usize {
        self.pending.pending_count()
    }

    /// Subscribe and spawn every component.
    pub fn start(&mut self) {
        let codec: Arc<dyn EnvelopeCodec> = Arc::new(SoapEnvelopeCodec);

        info!("===========================================");
        info!("  MHS Transport Runtime");
        info!("===========================================");

        self.start_send_path(codec.clone());
        self.start_receive_path(codec);
        self.start_dts();

        let pending = self.pending.clone();
        let mut shutdown = self.intake.shutdown_signal();
        self.intake.tasks.spawn(async move {
            tokio::select! {
                _ = cleanup_task(pending, PENDING_CLEANUP_INTERVAL) => {}
                _ = shutdown.changed() => {}
            }
        });
        self.start_dedup_expiry();

        info!(
            spine_url = %self.config.spine_url,
            tasks = self.intake.tasks.len() + self.replies.tasks.len(),
            "Transport runtime started"
        );
    }

    fn start_dedup_expiry(&mut self) {
        let stores = self.dedup_stores.clone();
        let retention = self.config.dedup_retention();
        let every = self.config.dedup_expiry_interval();
        let mut shutdown = self.intake.shutdown_signal();
        self.intake.tasks.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        let expired: usize = stores
                            .iter()
                            .map(|store| store.expunge_older_than(retention))
                            .sum();
                        if expired > 0 {
                            info!(expired, "Expired dedup keys");
                        }
                    }
                }
            }
        });
    }

    fn start_send_path(&mut self, codec: Arc<dyn EnvelopeCodec>) {
        let in_progress = Arc::new(InMemoryKeyStore::new("exchange-in-progress"));
        let exchange = Arc::new(ForwardExpressExchange::new(
            self.http.clone(),
            in_progress.clone(),
            self.pending.clone(),
        ));
        let sender = Arc::new(MultipartMessageSender::new(
            exchange,
            Arc::new(BusResponseSink::new(self.bus.clone())),
            codec,
            self.config.sender_config(),
        ));

        let worker = OutboundWorker::new(sender, self.config.worker_pool_size);
        let requests = self.bus.subscribe(MessageFilter::topic(Topic::OutboundRequest));
        let shutdown = self.intake.shutdown_signal();
        self.intake
            .tasks
            .spawn(async move { worker.run(requests, shutdown).await });

        let forwarder = AckForwarder::new(self.http.clone());
        let acks = self.bus.subscribe(MessageFilter::topic(Topic::OutboundAck));
        let shutdown = self.replies.shutdown_signal();
        self.replies
            .tasks
            .spawn(async move { forwarder.run(acks, shutdown).await });

        let listener = AckListener::new(in_progress, self.pending.clone());
        let replies = self.bus.subscribe(MessageFilter::topic(Topic::EbxmlAck));
        let mut shutdown = self.replies.shutdown_signal();
        self.replies.tasks.spawn(async move {
            tokio::select! {
                _ = listener.run(replies) => {}
                _ = shutdown.changed() => {}
            }
        });
    }

    fn start_receive_path(&mut self, codec: Arc<dyn EnvelopeCodec>) {
        let seen = Arc::new(InMemoryKeyStore::new("inbound-seen"));
        self.dedup_stores.push(seen.clone());
        let receiver = IdempotentReceiver::<EbxmlInboundMessage>::new(
            seen,
            Arc::new(BusPayloadSink::new(self.bus.clone())),
            Arc::new(EbxmlAckSender::new(self.bus.clone(), codec.clone())),
            self.config.receiver_config(),
        );
        let inbound = EbxmlMessageReceiver::new(receiver, self.bus.clone(), codec);
        let messages = self.bus.subscribe(MessageFilter::topic(Topic::InboundMessage));
        let shutdown = self.replies.shutdown_signal();
        self.replies
            .tasks
            .spawn(async move { inbound.run(messages, shutdown).await });
    }

    fn start_dts(&mut self) {
        let Some(folder) = self.config.dts_folder.clone() else {
            info!("No DTS folder configured, DTS receiver disabled");
            return;
        };

        let processed = Arc::new(InMemoryKeyStore::new("dts-processed"));
        self.dedup_stores.push(processed.clone());
        let dts = Arc::new(DtsMessageReceiver::new(
            Arc::new(TokioFileStore::new(folder)),
            processed,
            Arc::new(DtsBusSink::new(self.bus.clone())),
            self.config.receiver_config(),
            self.config.dts_config(),
        ));
        let shutdown = self.intake.shutdown_signal();
        self.intake.tasks.spawn(dts.run(shutdown));
    }

    /// Stop intake, let in-flight work drain, then stop the reply path.
    pub async fn shutdown(mut self) {
        info!("Initiating graceful shutdown...");

        self.intake.stop("intake").await;
        info!(pending_acks = self.pending.pending_count(), "Intake drained");
        self.replies.stop("replies").await;

        info!("Shutdown complete");
    }
}
