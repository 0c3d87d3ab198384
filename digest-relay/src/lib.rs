pub mod types;
pub mod text;
pub mod profile;
pub mod parser;
pub mod formatter;
pub mod delivery;
pub mod ledger;
pub mod relay;

pub use types::*;
pub use profile::{LayoutProfile, JOBRIGHT};
pub use parser::{extract, DigestParser};
pub use formatter::{format_posting, format_postings};
pub use delivery::{DiscordSink, StdoutSink};
pub use ledger::JsonFileLedger;
pub use relay::{DigestOutcome, DigestRelay};
