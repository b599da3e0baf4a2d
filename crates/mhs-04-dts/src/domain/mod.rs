//! Domain layer for the DTS transport.

pub mod config;
pub mod control_file;
pub mod errors;
pub mod message;
pub mod naming;

pub use config::DtsConfig;
pub use control_file::{ControlFile, DtsMessageType};
pub use errors::DtsError;
pub use message::DtsMessage;
pub use naming::{data_file_name, is_control_file_for};
