use crate::formatter::format_postings;
use crate::parser::DigestParser;
use crate::types::{PollReport, RelayConfig, RelayError, Result};
use interfaces::defs::{DedupLedger, DeliverySink, DigestSource, WatchRest};
use std::time::Duration;
use tracing::{error, info, warn};

/// What happened to one digest message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    NoHtml,
    NoPostings,
    Posted(usize),
}

/// Polls a digest source, relays every new posting to a sink, and records
/// finished digests in a ledger.
pub struct DigestRelay<S, D, L> {
    source: S,
    sink: D,
    ledger: L,
    parser: DigestParser,
    config: RelayConfig,
}

impl<S, D, L> DigestRelay<S, D, L>
where
    S: DigestSource,
    D: DeliverySink,
    L: DedupLedger,
{
    pub fn new(source: S, sink: D, ledger: L, config: RelayConfig) -> Self {
        Self {
            source,
            sink,
            ledger,
            parser: DigestParser::default(),
            config,
        }
    }

    pub fn with_parser(mut self, parser: DigestParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// One pass over the mailbox: relay every digest the ledger hasn't seen, oldest first.
    pub async fn poll_once(&self) -> Result<PollReport> {
        let recent = self.source.list_recent().await.map_err(RelayError::Source)?;

        let mut new_ids = Vec::new();
        for id in recent {
            if !self.ledger.is_processed(&id).await.map_err(RelayError::Ledger)? {
                new_ids.push(id);
            }
        }
        // Sources list newest first
        new_ids.reverse();

        if !new_ids.is_empty() {
            info!("Found {} new digest email(s)", new_ids.len());
        }

        let mut report = PollReport::default();
        for id in &new_ids {
            match self.relay_digest(id).await {
                Ok(outcome) => {
                    report.digests += 1;
                    match outcome {
                        DigestOutcome::Posted(count) => report.postings += count,
                        DigestOutcome::NoHtml | DigestOutcome::NoPostings => report.skipped += 1,
                    }
                }
                Err(e) => {
                    error!("Failed to relay digest {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Fetch, parse and deliver one digest, then mark it processed.
    /// A digest is only marked once every posting was delivered.
    pub async fn relay_digest(&self, id: &str) -> Result<DigestOutcome> {
        let message = self.source.fetch(id).await.map_err(RelayError::Source)?;

        let outcome = match message.html {
            None => {
                info!("Skipping {}: no HTML part found", id);
                DigestOutcome::NoHtml
            }
            Some(html) => {
                let extraction = self.parser.parse_digest(&html);
                let messages = format_postings(&extraction.records, self.parser.profile().source_label);

                if messages.is_empty() {
                    info!("No jobs parsed from email {}", id);
                    DigestOutcome::NoPostings
                } else {
                    for message in &messages {
                        self.sink.deliver(message).await.map_err(RelayError::Sink)?;
                        if self.config.pace_ms > 0 {
                            tokio::time::sleep(Duration::from_millis(self.config.pace_ms)).await;
                        }
                    }
                    info!("Posted {} job(s) from email {}", messages.len(), id);
                    DigestOutcome::Posted(messages.len())
                }
            }
        };

        self.ledger.mark_processed(id).await.map_err(RelayError::Ledger)?;
        Ok(outcome)
    }

    /// Poll once and report how long to rest before the next poll.
    pub async fn watch(&self) -> WatchRest {
        match self.poll_once().await {
            Ok(report) => {
                if report.failed > 0 {
                    warn!("{} digest(s) failed and will be retried next poll", report.failed);
                }
            }
            Err(e) => error!("Poll error: {}", e),
        }

        WatchRest {
            wait_at_least_ms: self.poll_interval_ms(),
        }
    }

    /// Poll forever, until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        info!("Polling every {} seconds...", self.config.poll_interval_seconds);

        loop {
            let rest = self.watch().await;
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested, stopping poll loop");
                    return Ok(());
                }
                _ = tokio::time::sleep(Duration::from_millis(u64::from(rest.wait_at_least_ms))) => {}
            }
        }
    }

    fn poll_interval_ms(&self) -> u32 {
        u32::try_from(self.config.poll_interval_seconds.saturating_mul(1000)).unwrap_or(u32::MAX)
    }
}
