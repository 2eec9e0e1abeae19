//! Message channel between the device and its agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Label for bytes travelling from the UART towards the agent.
pub const OUTBOUND_LABEL: &str = "impSerialIn";
/// Label for bytes the agent wants written to the UART.
pub const INBOUND_LABEL: &str = "dataToSerial";

/// One labelled message, `{"label": "...", "data": ...}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMessage {
    pub label: String,
    pub data: Value,
}

impl PeerMessage {
    pub fn new(label: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }

    pub fn byte(label: impl Into<String>, byte: u8) -> Self {
        Self::new(label, byte)
    }
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer link closed")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outbound half of the peer link. Sends are fire-and-forget: `Ok` means the
/// message was queued, not that it arrived.
pub trait PeerChannel {
    fn send(&mut self, message: PeerMessage) -> Result<(), PeerError>;
}
