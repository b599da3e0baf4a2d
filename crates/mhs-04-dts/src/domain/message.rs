//! A paired DTS message ready for publication.

use crate::domain::control_file::ControlFile;
use bytes::Bytes;
use mhs_03_idempotent_receiver::InboundMessage;

/// Control file plus data file contents. Deduplicated by control file name.
#[derive(Debug, Clone)]
pub struct DtsMessage {
    pub control_file_name: String,
    pub control_file: ControlFile,
    /// Control file as read from disk; downstream exchanges need the
    /// workflow id from it.
    pub raw_control_file: String,
    pub data: Bytes,
}

impl InboundMessage for DtsMessage {
    fn dedup_key(&self) -> &str {
        &self.control_file_name
    }

    /// DTS has no ack channel.
    fn ack_requested(&self) -> bool {
        false
    }

    fn is_acknowledgment(&self) -> bool {
        false
    }
}
