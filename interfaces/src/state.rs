use anyhow::{Context, Result};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::defs::DedupLedger;

/// Dedup ledger backed by a SQLite table.
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (or create) the database at `database_url`, e.g. `sqlite://relay.db`
    /// or `sqlite::memory:`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid SQLite URL '{}'", database_url))?
            .create_if_missing(true);

        // A single connection keeps `sqlite::memory:` pointing at one database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open ledger database '{}'", database_url))?;

        let ledger = Self { pool };
        ledger.setup_schema().await?;
        Ok(ledger)
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            "
                CREATE TABLE IF NOT EXISTS processed_messages (
                    message_id TEXT PRIMARY KEY,
                    processed_at TEXT NOT NULL
                )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn processed_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM processed_messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count"))
    }
}

impl DedupLedger for SqliteLedger {
    async fn is_processed(&self, id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM processed_messages WHERE message_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn mark_processed(&self, id: &str) -> Result<()> {
        sqlx::query(
            "
                INSERT OR IGNORE INTO processed_messages
                    (message_id, processed_at)
                VALUES
                    (?1, datetime('now'))
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
