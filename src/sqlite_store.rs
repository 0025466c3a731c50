//! SQLite-backed [`KnowledgeStore`] implementation.
//!
//! Chunks and file metadata live in two append-only tables keyed by an
//! autoincrement `seq`, so reading back in `seq` order reproduces append
//! order exactly.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use kb_harness_core::models::FileMeta;
use kb_harness_core::store::KnowledgeStore;

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`KnowledgeStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database, creating the schema if needed.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    async fn append_chunks(&self, chunks: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            sqlx::query("INSERT INTO chunks (text) VALUES (?)")
                .bind(chunk)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn append_file(&self, meta: &FileMeta) -> Result<()> {
        sqlx::query("INSERT INTO files (name, chunk_count, uploaded_at) VALUES (?, ?, ?)")
            .bind(&meta.name)
            .bind(meta.chunks as i64)
            .bind(meta.time)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<String>> {
        let texts: Vec<String> = sqlx::query_scalar("SELECT text FROM chunks ORDER BY seq")
            .fetch_all(&self.pool)
            .await?;
        Ok(texts)
    }

    async fn files(&self) -> Result<Vec<FileMeta>> {
        let rows = sqlx::query("SELECT name, chunk_count, uploaded_at FROM files ORDER BY seq")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| FileMeta {
                name: row.get("name"),
                chunks: row.get::<i64, _>("chunk_count").max(0) as usize,
                time: row.get("uploaded_at"),
            })
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM files").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn chunk_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }
}
