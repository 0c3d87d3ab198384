pub mod email_ingester;

pub use email_ingester::{html_body, EmailIngester, MailboxConfig};
