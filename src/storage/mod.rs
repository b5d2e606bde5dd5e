use anyhow::{Context as _, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the daemon indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

/// SQLite-backed document storage at `{data_dir}/huntd.db`.
///
/// Everything the daemon persists is a named JSON document in the
/// `documents` table. Document bodies are opaque here; callers own their
/// schema and their tolerance for old shapes.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("huntd.db");
        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// The schema is one table; `CREATE TABLE IF NOT EXISTS` at startup
    /// keeps old and new daemons pointed at the same file compatible
    /// without a migration step.
    async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                name       TEXT PRIMARY KEY,
                data       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await
        .context("create documents table")?;
        Ok(())
    }

    // ─── Documents ──────────────────────────────────────────────────────────

    pub async fn read_document(&self, name: &str) -> Result<Option<String>> {
        with_timeout(async {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT data FROM documents WHERE name = ?")
                    .bind(name)
                    .fetch_optional(&self.pool)
                    .await
                    .context("read document")?;
            Ok(row.map(|(data,)| data))
        })
        .await
    }

    pub async fn write_document(&self, name: &str, data: &str) -> Result<()> {
        with_timeout(async {
            let now = Utc::now().to_rfc3339();
            sqlx::query(
                "INSERT INTO documents (name, data, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(name) DO UPDATE SET
                     data = excluded.data,
                     updated_at = excluded.updated_at",
            )
            .bind(name)
            .bind(data)
            .bind(&now)
            .execute(&self.pool)
            .await
            .context("write document")?;
            Ok(())
        })
        .await
    }
}
