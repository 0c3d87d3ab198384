use anyhow::{anyhow, Context};
use clap::Parser;
use digest_relay::{
    format_postings, DigestParser, DigestRelay, DiscordSink, JsonFileLedger, RelayConfig, StdoutSink,
};
use email_ingestion::{EmailIngester, MailboxConfig};
use interfaces::defs::{DedupLedger, DeliverySink, DigestSource};
use interfaces::memory::MemoryLedger;
use interfaces::state::SqliteLedger;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "digest-relay", version, about = "Relay job digest emails to a Discord channel")]
struct Cli {
    /// Mailbox to poll, e.g. email://me%40example.com@imap.gmail.com:993/INBOX
    #[arg(long, env = "DIGEST_MAILBOX_URI")]
    mailbox_uri: Option<String>,

    #[arg(long, env = "DIGEST_MAILBOX_PASSWORD", hide_env_values = true)]
    mailbox_password: Option<String>,

    /// Only messages whose From header contains this are considered
    #[arg(long, env = "DIGEST_SENDER", default_value = "jobright.ai")]
    sender: String,

    #[arg(long, env = "DIGEST_LOOKBACK_DAYS", default_value_t = 7)]
    lookback_days: i64,

    #[arg(long, env = "DIGEST_MAX_RESULTS", default_value_t = 10)]
    max_results: usize,

    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    discord_token: Option<String>,

    #[arg(long, env = "DISCORD_CHANNEL_ID")]
    discord_channel_id: Option<String>,

    /// JSON state file, or a sqlite: URL
    #[arg(long, env = "DIGEST_LEDGER", default_value = "state_jobright.json")]
    ledger: String,

    #[arg(long, env = "DIGEST_POLL_SECONDS", default_value_t = 90)]
    poll_seconds: u64,

    /// Pause after each posted message, in milliseconds
    #[arg(long, env = "DIGEST_PACE_MS", default_value_t = 1200)]
    pace_ms: u64,

    /// Run a single poll and exit
    #[arg(long)]
    once: bool,

    /// Print messages instead of posting them; nothing is recorded as processed
    #[arg(long)]
    dry_run: bool,

    /// Parse a saved digest, print its messages and exit
    #[arg(long, value_name = "PATH")]
    html_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.html_file {
        return print_saved_digest(path);
    }

    let config = RelayConfig {
        poll_interval_seconds: cli.poll_seconds,
        pace_ms: cli.pace_ms,
        ..RelayConfig::default()
    };

    let mailbox_uri = cli.mailbox_uri.as_deref()
        .ok_or_else(|| anyhow!("DIGEST_MAILBOX_URI missing (or pass --mailbox-uri)"))?;
    let password = cli.mailbox_password.as_deref()
        .ok_or_else(|| anyhow!("DIGEST_MAILBOX_PASSWORD missing (or pass --mailbox-password)"))?;

    let mailbox = MailboxConfig::from_uri(mailbox_uri, password)?
        .with_sender(cli.sender.clone())
        .with_lookback_days(cli.lookback_days)
        .with_max_results(cli.max_results);
    info!("Watching {} on {} for mail from {}", mailbox.mailbox, mailbox.server, mailbox.sender);
    let source = EmailIngester::new(mailbox);

    if cli.dry_run {
        warn!("Dry run: messages are printed and no digest is marked processed");
        let relay = DigestRelay::new(source, StdoutSink, MemoryLedger::new(), config);
        return drive(relay, cli.once).await;
    }

    let token = cli.discord_token.as_deref()
        .ok_or_else(|| anyhow!("DISCORD_BOT_TOKEN missing in .env"))?;
    let channel_id = cli.discord_channel_id.as_deref()
        .ok_or_else(|| anyhow!("DISCORD_CHANNEL_ID missing in .env"))?;
    let sink = DiscordSink::new(token, channel_id, &config)?;

    if cli.ledger.starts_with("sqlite:") {
        let ledger = SqliteLedger::new(&cli.ledger).await?;
        info!("Using SQLite ledger {}", cli.ledger);
        drive(DigestRelay::new(source, sink, ledger, config), cli.once).await
    } else {
        let ledger = JsonFileLedger::open(&cli.ledger)?;
        info!("Using ledger file {} ({} ids)", ledger.path().display(), ledger.len());
        drive(DigestRelay::new(source, sink, ledger, config), cli.once).await
    }
}

async fn drive<S, D, L>(relay: DigestRelay<S, D, L>, once: bool) -> anyhow::Result<()>
where
    S: DigestSource,
    D: DeliverySink,
    L: DedupLedger,
{
    if once {
        let report = relay.poll_once().await?;
        info!(
            "Poll finished: {} digest(s), {} posting(s), {} skipped, {} failed",
            report.digests, report.postings, report.skipped, report.failed
        );
        return Ok(());
    }

    relay.run().await?;
    Ok(())
}

fn print_saved_digest(path: &Path) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let parser = DigestParser::default();
    let extraction = parser.parse_digest(&html);
    info!(
        "{} posting(s) from {} link(s) and {} block(s), drift {}",
        extraction.records.len(),
        extraction.link_count,
        extraction.block_count,
        extraction.drift()
    );

    for message in format_postings(&extraction.records, parser.profile().source_label) {
        println!("{}\n---", message);
    }
    Ok(())
}
