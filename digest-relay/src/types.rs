use serde::{Deserialize, Serialize};

/// One job posting pulled out of a digest. Only `link` is guaranteed;
/// every other field may be missing when the block layout didn't match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub link: String,
    pub match_percent: Option<u16>,
    pub pay_range: Option<String>,
    pub location: Option<String>,
    pub company: String,
    pub role: String,
}

/// Result of parsing one digest, with the list sizes the records were paired from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub records: Vec<JobPosting>,
    pub link_count: usize,
    pub block_count: usize,
}

impl Extraction {
    /// `links - blocks`. Anything but zero means the pairing may be misaligned.
    pub fn drift(&self) -> isize {
        self.link_count as isize - self.block_count as isize
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval_seconds: u64,
    /// Pause after each delivered message.
    pub pace_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 90,
            pace_ms: 1200,
            max_retries: 3,
            retry_delay_ms: 1000,
            request_timeout_seconds: 30,
            user_agent: "digest-relay/0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// New digests handled to completion, including skipped ones.
    pub digests: usize,
    pub postings: usize,
    /// Digests without an HTML part or without any parsable posting.
    pub skipped: usize,
    /// Digests left unmarked because fetching, delivery or marking failed.
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Delivery rejected: {0}")]
    Delivery(String),

    #[error("Rate limited for {seconds} seconds")]
    RateLimited { seconds: f64 },

    #[error("Digest source error: {0:#}")]
    Source(anyhow::Error),

    #[error("Delivery sink error: {0:#}")]
    Sink(anyhow::Error),

    #[error("Ledger error: {0:#}")]
    Ledger(anyhow::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
