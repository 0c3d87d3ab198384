pub mod defs;
pub mod memory;
pub mod state;

pub use defs::{DedupLedger, DeliverySink, DigestMessage, DigestSource, WatchRest};
