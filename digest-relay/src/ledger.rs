use crate::types::{RelayError, Result};
use interfaces::defs::DedupLedger;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Ids kept in the state file; the oldest are dropped first.
pub const DEFAULT_CAPACITY: usize = 5000;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    processed_message_ids: Vec<String>,
}

#[derive(Debug, Default)]
struct LedgerState {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl LedgerState {
    fn insert(&mut self, id: &str, capacity: usize) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }
}

/// Dedup ledger stored as a small JSON file, rewritten after every change.
pub struct JsonFileLedger {
    path: PathBuf,
    capacity: usize,
    state: Mutex<LedgerState>,
}

impl JsonFileLedger {
    /// Load the ledger at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_capacity(path, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(RelayError::Config("Ledger capacity must be positive".to_string()));
        }

        let path = path.as_ref().to_path_buf();
        let mut state = LedgerState::default();

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<LedgerFile>(&content) {
                Ok(file) => {
                    for id in &file.processed_message_ids {
                        state.insert(id, capacity);
                    }
                    info!("Loaded {} processed message id(s) from {}", state.order.len(), path.display());
                }
                Err(e) => warn!("Ignoring unreadable ledger {}: {}", path.display(), e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", path.display());
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path,
            capacity,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.order.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.lock()?.ids.contains(id))
    }

    pub async fn insert(&self, id: &str) -> Result<()> {
        let snapshot = {
            let mut state = self.lock()?;
            if !state.insert(id, self.capacity) {
                return Ok(());
            }
            LedgerFile {
                processed_message_ids: state.order.iter().cloned().collect(),
            }
        };
        self.save(&snapshot).await
    }

    async fn save(&self, file: &LedgerFile) -> Result<()> {
        let json = serde_json::to_string_pretty(file)?;

        // Write next to the target and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| RelayError::Ledger(anyhow::anyhow!("ledger state lock poisoned")))
    }
}

impl DedupLedger for JsonFileLedger {
    async fn is_processed(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.contains(id)?)
    }

    async fn mark_processed(&self, id: &str) -> anyhow::Result<()> {
        Ok(self.insert(id).await?)
    }
}
