//! Outbound message transport contract.
//!
//! # Invariants
//! - Core never branches on transport-specific error detail; every `Err` is
//!   a delivery failure.

use async_trait::async_trait;
use log::{info, log_enabled, Level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// One outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport reported a failure.
    Rejected(String),
    /// The send did not finish within the configured limit.
    TimedOut(Duration),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "delivery failed: {reason}"),
            Self::TimedOut(limit) => {
                write!(f, "delivery failed: timed out after {}ms", limit.as_millis())
            }
        }
    }
}

impl Error for TransportError {}

/// Unreliable, possibly slow delivery capability (mail, chat, push, ...).
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}

/// Transport that delivers into the process log.
///
/// The log is the delivery target, so subject and body are written out in
/// full. A send is rejected when `info` records would be discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl MessageTransport for LogTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        if !log_enabled!(Level::Info) {
            return Err(TransportError::Rejected(
                "logging disabled; message has nowhere to go".to_string(),
            ));
        }
        info!(
            "event=message_deliver module=transport status=ok sender={} recipient={} subject={:?}",
            message.sender, message.recipient, message.subject
        );
        for line in message.body.lines() {
            info!("event=message_body module=transport line={line:?}");
        }
        Ok(())
    }
}
