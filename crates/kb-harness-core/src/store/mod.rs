//! Storage abstraction for the knowledge base.
//!
//! The [`KnowledgeStore`] trait is the only view the pipeline has of
//! persisted state: an append-only, ordered list of chunks plus parallel
//! file metadata. The pipeline reads everything, appends new data after a
//! successful extraction, and never rewrites or reorders existing chunks.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{FileMeta, KnowledgeBaseSummary};

/// Abstract knowledge-base backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`append_chunks`](KnowledgeStore::append_chunks) | Append chunks after existing ones |
/// | [`append_file`](KnowledgeStore::append_file) | Record metadata for an ingested file |
/// | [`read_all`](KnowledgeStore::read_all) | All chunks, in append order |
/// | [`files`](KnowledgeStore::files) | All file metadata, in append order |
/// | [`clear`](KnowledgeStore::clear) | Reset to an empty knowledge base |
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn append_chunks(&self, chunks: &[String]) -> Result<()>;

    async fn append_file(&self, meta: &FileMeta) -> Result<()>;

    async fn read_all(&self) -> Result<Vec<String>>;

    async fn files(&self) -> Result<Vec<FileMeta>>;

    async fn clear(&self) -> Result<()>;

    /// Number of stored chunks. Backends with a cheaper count should override.
    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.read_all().await?.len())
    }

    /// Files plus total chunk count, as shown by listings.
    async fn summary(&self) -> Result<KnowledgeBaseSummary> {
        Ok(KnowledgeBaseSummary {
            files: self.files().await?,
            total_chunks: self.chunk_count().await?,
        })
    }
}
