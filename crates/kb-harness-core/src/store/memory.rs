//! In-memory [`KnowledgeStore`] implementation for tests and embedding.
//!
//! Uses `Vec` behind `std::sync::RwLock` for thread safety.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::FileMeta;

use super::KnowledgeStore;

/// In-memory knowledge base. Contents vanish with the value.
#[derive(Default)]
pub struct InMemoryStore {
    chunks: RwLock<Vec<String>>,
    files: RwLock<Vec<FileMeta>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn append_chunks(&self, chunks: &[String]) -> Result<()> {
        self.chunks
            .write()
            .map_err(poisoned)?
            .extend_from_slice(chunks);
        Ok(())
    }

    async fn append_file(&self, meta: &FileMeta) -> Result<()> {
        self.files.write().map_err(poisoned)?.push(meta.clone());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<String>> {
        Ok(self.chunks.read().map_err(poisoned)?.clone())
    }

    async fn files(&self) -> Result<Vec<FileMeta>> {
        Ok(self.files.read().map_err(poisoned)?.clone())
    }

    async fn clear(&self) -> Result<()> {
        self.chunks.write().map_err(poisoned)?.clear();
        self.files.write().map_err(poisoned)?.clear();
        Ok(())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.chunks.read().map_err(poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, chunks: usize) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            chunks,
            time: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = InMemoryStore::new();
        store
            .append_chunks(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        store.append_chunks(&["c".to_string()]).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_summary_counts_chunks_and_files() {
        let store = InMemoryStore::new();
        store
            .append_chunks(&["x".to_string(), "y".to_string()])
            .await
            .unwrap();
        store.append_file(&meta("manual.docx", 2)).await.unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.total_chunks, 2);
        assert_eq!(summary.files, vec![meta("manual.docx", 2)]);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let store = InMemoryStore::new();
        store.append_chunks(&["x".to_string()]).await.unwrap();
        store.append_file(&meta("a.txt", 1)).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.read_all().await.unwrap().is_empty());
        assert!(store.files().await.unwrap().is_empty());
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }
}
