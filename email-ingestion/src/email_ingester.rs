use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use interfaces::defs::{DigestMessage, DigestSource};
use mail_parser::{MessageParser, PartType};
use native_tls::TlsStream;
use std::net::TcpStream;
use tracing::{debug, info, warn};
use url::Url;

type ImapSession = imap::Session<TlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct MailboxConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub mailbox: String,
    pub use_tls: bool,
    pub accept_invalid_certs: bool,
    pub accept_invalid_hostnames: bool,
    /// Substring matched against the `From` header.
    pub sender: String,
    pub lookback_days: i64,
    pub max_results: usize,
}

impl MailboxConfig {
    /// Parse mailbox configuration from a URI and a password.
    /// Expected URI format: email://username@server:port/mailbox?tls=true
    pub fn from_uri(uri: &str, password: &str) -> Result<Self> {
        let parsed_uri = Url::parse(uri)
            .map_err(|e| anyhow::anyhow!("Invalid email URI '{}': {}", uri, e))?;

        if parsed_uri.scheme() != "email" {
            return Err(anyhow::anyhow!("URI must use 'email://' scheme, got: {}", parsed_uri.scheme()));
        }

        let server = parsed_uri.host_str()
            .ok_or_else(|| anyhow::anyhow!("No server specified in URI: {}", uri))?
            .to_string();

        let port = parsed_uri.port().unwrap_or(993); // IMAPS

        let username = parsed_uri.username();
        if username.is_empty() {
            return Err(anyhow::anyhow!("No username in URI: {}", uri));
        }
        // `user%40example.com@imap.example.com` carries a full address as the login
        let username = username.replace("%40", "@");

        let mailbox = {
            let path = parsed_uri.path().trim_start_matches('/');
            if path.is_empty() {
                "INBOX".to_string()
            } else {
                path.to_string()
            }
        };

        let flag = |name: &str, default: bool| {
            parsed_uri.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.parse().unwrap_or(default))
                .unwrap_or(default)
        };

        // Only meant for local test servers with self-signed certificates
        let accept_invalid_certs = flag("accept_invalid_certs", false);
        let accept_invalid_hostnames = flag("accept_invalid_hostnames", false);

        Ok(Self {
            server,
            port,
            username,
            password: password.to_string(),
            mailbox,
            use_tls: flag("tls", true),
            accept_invalid_certs,
            accept_invalid_hostnames,
            sender: "jobright.ai".to_string(),
            lookback_days: 7,
            max_results: 10,
        })
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// IMAP SEARCH criteria for recent digests from the configured sender.
    pub fn search_criteria(&self) -> String {
        let since = Utc::now() - Duration::days(self.lookback_days);
        format!(
            "FROM \"{}\" SINCE {}",
            self.sender.replace('"', ""),
            since.format("%d-%b-%Y")
        )
    }
}

/// Digest source reading an IMAP mailbox. Message ids are IMAP UIDs.
pub struct EmailIngester {
    config: MailboxConfig,
}

impl EmailIngester {
    pub fn new(config: MailboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }
}

impl DigestSource for EmailIngester {
    async fn list_recent(&self) -> Result<Vec<String>> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || search_recent(&config))
            .await
            .context("IMAP search task panicked")?
    }

    async fn fetch(&self, id: &str) -> Result<DigestMessage> {
        let config = self.config.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || fetch_message(&config, &id))
            .await
            .context("IMAP fetch task panicked")?
    }
}

fn open_session(config: &MailboxConfig) -> Result<ImapSession> {
    let tls = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .danger_accept_invalid_hostnames(config.accept_invalid_hostnames)
        .build()?;

    let client = if config.use_tls {
        imap::connect((config.server.as_str(), config.port), &config.server, &tls)?
    } else {
        imap::connect_starttls((config.server.as_str(), config.port), &config.server, &tls)?
    };

    let mut session = client.login(&config.username, &config.password)
        .map_err(|(e, _)| anyhow::anyhow!("Login failed for {}: {}", config.username, e))?;
    session.select(&config.mailbox)
        .with_context(|| format!("Failed to select mailbox {}", config.mailbox))?;
    Ok(session)
}

fn search_recent(config: &MailboxConfig) -> Result<Vec<String>> {
    let mut session = open_session(config)?;

    let criteria = config.search_criteria();
    debug!("IMAP UID SEARCH {}", criteria);
    let uids = session.uid_search(&criteria)?;

    // Highest UIDs are the most recent deliveries
    let mut uids: Vec<u32> = uids.into_iter().collect();
    uids.sort_unstable_by(|a, b| b.cmp(a));
    uids.truncate(config.max_results);

    session.logout()?;

    info!("Found {} recent digest(s) from {} in {}", uids.len(), config.sender, config.mailbox);
    Ok(uids.into_iter().map(|uid| uid.to_string()).collect())
}

fn fetch_message(config: &MailboxConfig, id: &str) -> Result<DigestMessage> {
    let mut session = open_session(config)?;

    let messages = session.uid_fetch(id, "RFC822")?;
    let body = messages.iter()
        .find_map(|message| message.body())
        .ok_or_else(|| anyhow::anyhow!("Message {} not found in {}", id, config.mailbox))?;

    let html = html_body(body);
    if html.is_none() {
        warn!("Message {} has no text/html part", id);
    }

    let message = DigestMessage {
        id: id.to_string(),
        html,
    };

    session.logout()?;
    Ok(message)
}

/// Decode a raw RFC 822 message and return its first `text/html` part.
pub fn html_body(raw: &[u8]) -> Option<String> {
    let parsed = MessageParser::default().parse(raw)?;
    parsed.parts.iter().find_map(|part| match &part.body {
        PartType::Html(html) => Some(html.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_mailbox_uri() -> Result<()> {
        let config = MailboxConfig::from_uri(
            "email://alerts@imap.example.com:1993/Jobs?tls=false&accept_invalid_certs=true",
            "hunter2",
        )?;

        assert_eq!(config.server, "imap.example.com");
        assert_eq!(config.port, 1993);
        assert_eq!(config.username, "alerts");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.mailbox, "Jobs");
        assert!(!config.use_tls);
        assert!(config.accept_invalid_certs);
        assert!(!config.accept_invalid_hostnames);
        Ok(())
    }

    #[test]
    fn applies_defaults() -> Result<()> {
        let config = MailboxConfig::from_uri("email://me%40example.com@imap.example.com", "pw")?;

        assert_eq!(config.port, 993);
        assert_eq!(config.username, "me@example.com");
        assert_eq!(config.mailbox, "INBOX");
        assert!(config.use_tls);
        assert_eq!(config.sender, "jobright.ai");
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.max_results, 10);
        Ok(())
    }

    #[test]
    fn rejects_bad_uris() {
        assert!(MailboxConfig::from_uri("imap://me@imap.example.com", "pw").is_err());
        assert!(MailboxConfig::from_uri("email://imap.example.com", "pw").is_err());
        assert!(MailboxConfig::from_uri("not a uri", "pw").is_err());
    }

    #[test]
    fn search_criteria_names_sender_and_date() -> Result<()> {
        let config = MailboxConfig::from_uri("email://me@imap.example.com", "pw")?
            .with_sender("noreply@jobright.ai")
            .with_lookback_days(0);

        let expected = format!("FROM \"noreply@jobright.ai\" SINCE {}", Utc::now().format("%d-%b-%Y"));
        assert_eq!(config.search_criteria(), expected);
        Ok(())
    }

    #[test]
    fn picks_html_part_of_alternative_message() {
        let raw = concat!(
            "From: Jobright <noreply@jobright.ai>\r\n",
            "To: me@example.com\r\n",
            "Subject: Your top matches\r\n",
            "Message-ID: <digest-1@jobright.ai>\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/alternative; boundary=\"XYZ\"\r\n",
            "\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "Plain version\r\n",
            "--XYZ\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "<p class=3D\"job\">Acme</p>\r\n",
            "--XYZ--\r\n",
        );

        let html = html_body(raw.as_bytes()).expect("html part");
        assert!(html.contains("<p class=\"job\">Acme</p>"));
    }

    #[test]
    fn text_only_message_has_no_html() {
        let raw = concat!(
            "From: someone@example.com\r\n",
            "Subject: hello\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "Just text.\r\n",
        );

        assert_eq!(html_body(raw.as_bytes()), None);
    }

    #[test]
    fn decodes_base64_html_body() {
        // "<b>Hi</b>"
        let raw = concat!(
            "From: noreply@jobright.ai\r\n",
            "Subject: digest\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "PGI+SGk8L2I+\r\n",
        );

        assert_eq!(html_body(raw.as_bytes()).as_deref(), Some("<b>Hi</b>"));
    }
}
