use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::defs::{DedupLedger, DeliverySink, DigestMessage, DigestSource};

/// Ledger that forgets everything when the process exits.
#[derive(Default)]
pub struct MemoryLedger {
    processed: Mutex<HashSet<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed_ids(&self) -> HashSet<String> {
        self.processed.lock().map(|set| set.clone()).unwrap_or_default()
    }
}

impl DedupLedger for MemoryLedger {
    async fn is_processed(&self, id: &str) -> Result<bool> {
        let processed = self.processed.lock().map_err(|_| anyhow!("ledger lock poisoned"))?;
        Ok(processed.contains(id))
    }

    async fn mark_processed(&self, id: &str) -> Result<()> {
        let mut processed = self.processed.lock().map_err(|_| anyhow!("ledger lock poisoned"))?;
        processed.insert(id.to_owned());
        Ok(())
    }
}

/// Sink that keeps every delivered message, optionally failing after `fail_after` deliveries.
#[derive(Default)]
pub struct CollectingSink {
    delivered: Mutex<Vec<String>>,
    fail_after: Option<usize>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(deliveries: usize) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail_after: Some(deliveries),
        }
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().map(|msgs| msgs.clone()).unwrap_or_default()
    }
}

impl DeliverySink for CollectingSink {
    async fn deliver(&self, message: &str) -> Result<()> {
        let mut delivered = self.delivered.lock().map_err(|_| anyhow!("sink lock poisoned"))?;
        if let Some(limit) = self.fail_after {
            if delivered.len() >= limit {
                return Err(anyhow!("channel rejected message {}", delivered.len() + 1));
            }
        }
        delivered.push(message.to_owned());
        Ok(())
    }
}

/// Source serving a fixed set of messages. `messages` is given newest first,
/// the same order a mailbox search returns.
pub struct StaticSource {
    order: Vec<String>,
    messages: HashMap<String, DigestMessage>,
}

impl StaticSource {
    pub fn new(messages: Vec<DigestMessage>) -> Self {
        let order = messages.iter().map(|m| m.id.clone()).collect();
        let messages = messages.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self { order, messages }
    }
}

impl DigestSource for StaticSource {
    async fn list_recent(&self) -> Result<Vec<String>> {
        Ok(self.order.clone())
    }

    async fn fetch(&self, id: &str) -> Result<DigestMessage> {
        self.messages
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("No message with id {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collecting_sink_fails_past_limit() {
        let sink = CollectingSink::failing_after(1);
        assert!(sink.deliver("first").await.is_ok());
        assert!(sink.deliver("second").await.is_err());
        assert_eq!(sink.delivered(), vec!["first".to_owned()]);
    }

    #[tokio::test]
    async fn static_source_keeps_listing_order() -> Result<()> {
        let source = StaticSource::new(vec![
            DigestMessage { id: "b".into(), html: None },
            DigestMessage { id: "a".into(), html: Some("<p>hi</p>".into()) },
        ]);
        assert_eq!(source.list_recent().await?, vec!["b".to_owned(), "a".to_owned()]);
        assert_eq!(source.fetch("a").await?.html.as_deref(), Some("<p>hi</p>"));
        assert!(source.fetch("zzz").await.is_err());
        Ok(())
    }
}
