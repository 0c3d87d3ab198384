use anyhow::Result;
use std::future::Future;

/// One message pulled from the digest mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMessage {
    pub id: String,
    /// Decoded `text/html` body, `None` when the message has no HTML part.
    pub html: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchRest {
    pub wait_at_least_ms: u32,
}

// Object style note:
// Implementations of these traits are thin I/O wrappers around a mailbox,
// a chat channel or a small persistent store. None of them knows anything
// about the digest layout; that lives entirely in the relay's parser.

/// Yields digest messages from a mailbox.
pub trait DigestSource {
    /// Identifiers of recent digest messages, newest first.
    fn list_recent(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Fetch one message and decode its HTML body.
    fn fetch(&self, id: &str) -> impl Future<Output = Result<DigestMessage>> + Send;
}

/// Publishes one formatted notification.
pub trait DeliverySink {
    fn deliver(&self, message: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Remembers which digest messages were already relayed, across restarts.
pub trait DedupLedger {
    fn is_processed(&self, id: &str) -> impl Future<Output = Result<bool>> + Send;
    fn mark_processed(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}
