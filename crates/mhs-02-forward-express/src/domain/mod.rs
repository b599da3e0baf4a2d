//! Domain layer for the ForwardExpress send path.

pub mod config;
pub mod errors;
pub mod outcome;
pub mod pending;

pub use config::SenderConfig;
pub use errors::{DeliveryError, ExchangeError, ManifestError, ResponseError};
pub use outcome::{
    AttemptOutcome, ExchangeOutcome, Reply, SendNotification, SendOutcome, SendResponse,
};
pub use pending::{cleanup_task, AckReceipt, PendingAckStore, PendingStats};
