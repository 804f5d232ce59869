//! SQLite backing for the fact store
//!
//! Facts live in a `facts` table with a unique `content` column, so
//! duplicate inserts are rejected by the database itself. WAL mode keeps
//! readers and the single writer out of each other's way.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;

use super::{Memory, MemoryStore};

pub struct SqliteMemoryStore {
    pool: SqlitePool,
}

fn db_error(context: &str, e: sqlx::Error) -> EngineError {
    EngineError::Database(format!("{}: {}", context, e))
}

impl SqliteMemoryStore {
    /// Open (or create) the database at `path` and apply the schema
    pub async fn open(path: &Path) -> Result<Self, EngineError> {
        tracing::info!("Opening fact database at: {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let connection_string = format!("sqlite:{}", path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| db_error("Invalid database path", e))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), EngineError> {
        sqlx::raw_sql(include_str!("../../migrations/001_facts.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to execute migration 001_facts.sql", e))?;

        tracing::debug!("Fact database schema ready");
        Ok(())
    }

    async fn facts(&self) -> Result<Vec<String>, EngineError> {
        sqlx::query_scalar::<_, String>("SELECT content FROM facts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load facts", e))
    }

    /// Checkpoint the WAL and close the pool
    pub async fn close(self) -> Result<(), EngineError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to flush WAL", e))?;

        self.pool.close().await;
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn load(&self) -> Memory {
        match self.facts().await {
            Ok(facts) => Memory { facts },
            Err(e) => {
                tracing::warn!("Cannot read facts, starting empty: {}", e);
                Memory::default()
            }
        }
    }

    async fn update(&self, fact: &str) -> Result<bool, EngineError> {
        let created_at = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query("INSERT OR IGNORE INTO facts (content, created_at) VALUES (?, ?)")
            .bind(fact)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to store fact", e))?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            tracing::info!("Stored fact");
        }
        Ok(inserted)
    }

    async fn delete(&self, fact: &str) -> Result<bool, EngineError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM facts WHERE content = ? ORDER BY id LIMIT 1")
                .bind(fact)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to look up fact", e))?;

        let Some(id) = id else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM facts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to delete fact", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit delete", e))?;

        tracing::info!("Deleted fact");
        Ok(true)
    }

    async fn clear(&self) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM facts")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to clear facts", e))?;

        tracing::info!("Cleared all facts");
        Ok(())
    }
}
