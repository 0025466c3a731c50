//! Ingestion pipeline orchestration.
//!
//! Coordinates one file at a time: dispatch → extraction → chunking →
//! storage. Extraction is CPU-bound (inflate, regex scanning) and runs on
//! the blocking pool. The store is only touched once extraction and
//! chunking have both succeeded, so a bad upload never leaves partial data.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use kb_harness_core::chunk::chunk_units;
use kb_harness_core::models::FileMeta;
use kb_harness_core::store::KnowledgeStore;

use crate::config::Config;
use crate::extract::{self, ExtractOptions};

/// Outcome of ingesting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub name: String,
    pub new_chunks: usize,
    pub total_chunks: usize,
}

/// Extract, chunk and append one file's content.
///
/// Extraction errors come back as [`extract::ExtractError`] inside the
/// `anyhow::Error`, so callers can `downcast_ref` to tell a bad upload from
/// a storage failure.
pub async fn ingest_file<S>(
    store: &S,
    config: &Config,
    name: &str,
    bytes: Vec<u8>,
) -> Result<IngestReport>
where
    S: KnowledgeStore + ?Sized,
{
    let options = ExtractOptions::from(&config.extraction);
    let max_len = config.chunking.max_len;
    let owned_name = name.to_string();

    let chunks = tokio::task::spawn_blocking(move || {
        let units = extract::extract_units(&owned_name, &bytes, &options)?;
        Ok::<_, extract::ExtractError>(chunk_units(&units, max_len))
    })
    .await
    .context("extraction task panicked")??;

    store.append_chunks(&chunks).await?;
    store
        .append_file(&FileMeta {
            name: name.to_string(),
            chunks: chunks.len(),
            time: Utc::now().timestamp_millis(),
        })
        .await?;
    let total_chunks = store.chunk_count().await?;

    tracing::info!(
        file = name,
        new_chunks = chunks.len(),
        total_chunks,
        "ingested"
    );

    Ok(IngestReport {
        name: name.to_string(),
        new_chunks: chunks.len(),
        total_chunks,
    })
}

/// Read a file from disk and ingest it under its file name.
pub async fn ingest_path<S>(store: &S, config: &Config, path: &Path) -> Result<IngestReport>
where
    S: KnowledgeStore + ?Sized,
{
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    ingest_file(store, config, &name, bytes).await
}

/// Expand `paths` into the files to ingest.
///
/// Plain files are kept as given, even with an unsupported suffix, so the
/// caller reports them. Directories are walked recursively and contribute
/// only supported files, sorted by path.
pub fn collect_files(paths: &[PathBuf], options: &ExtractOptions) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(path) {
            let entry =
                entry.with_context(|| format!("Failed to walk directory {}", path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if extract::is_supported(&name, options) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::extract::ExtractError;
    use kb_harness_core::store::memory::InMemoryStore;
    use tempfile::TempDir;

    fn test_config(extra: &str) -> Config {
        parse_config(&format!("[db]\npath = \"unused.sqlite\"\n{}", extra)).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_text_file() {
        let store = InMemoryStore::new();
        let config = test_config("");
        let report = ingest_file(&store, &config, "faq.txt", b"alpha\nbeta\n".to_vec())
            .await
            .unwrap();
        assert_eq!(report.new_chunks, 1);
        assert_eq!(report.total_chunks, 1);
        assert_eq!(store.read_all().await.unwrap(), vec!["alpha\nbeta"]);

        let files = store.files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "faq.txt");
        assert_eq!(files[0].chunks, 1);
        assert!(files[0].time > 0);
    }

    #[tokio::test]
    async fn test_chunks_append_after_existing() {
        let store = InMemoryStore::new();
        let config = test_config("[chunking]\nmax_len = 6\n");
        ingest_file(&store, &config, "a.txt", b"one\ntwo".to_vec())
            .await
            .unwrap();
        let report = ingest_file(&store, &config, "b.txt", b"three".to_vec())
            .await
            .unwrap();
        assert_eq!(report.new_chunks, 1);
        assert_eq!(report.total_chunks, 3);
        assert_eq!(
            store.read_all().await.unwrap(),
            vec!["one", "two", "three"]
        );
    }

    #[tokio::test]
    async fn test_failed_extraction_leaves_store_untouched() {
        let store = InMemoryStore::new();
        let config = test_config("");
        ingest_file(&store, &config, "keep.txt", b"kept".to_vec())
            .await
            .unwrap();

        let err = ingest_file(&store, &config, "broken.docx", b"not a zip".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::Container(_))
        ));

        let err = ingest_file(&store, &config, "deck.pptx", b"x".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::UnsupportedFormat(_))
        ));

        assert_eq!(store.read_all().await.unwrap(), vec!["kept"]);
        assert_eq!(store.files().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_extraction_records_file_with_zero_chunks() {
        let store = InMemoryStore::new();
        let config = test_config("");
        let report = ingest_file(&store, &config, "blank.txt", b"\n\n".to_vec())
            .await
            .unwrap();
        assert_eq!(report.new_chunks, 0);
        assert_eq!(store.files().await.unwrap()[0].chunks, 0);
    }

    #[tokio::test]
    async fn test_ingest_path_uses_file_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let store = InMemoryStore::new();
        let report = ingest_path(&store, &test_config(""), &path).await.unwrap();
        assert_eq!(report.name, "notes.txt");
        assert_eq!(store.files().await.unwrap()[0].name, "notes.txt");
    }

    #[test]
    fn test_collect_files_walks_directories() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(tmp.path().join("b.txt"), "b").unwrap();
        std::fs::write(sub.join("a.txt"), "a").unwrap();
        std::fs::write(tmp.path().join("skip.png"), "x").unwrap();
        std::fs::write(tmp.path().join("doc.pdf"), "x").unwrap();

        let options = ExtractOptions {
            pdf_enabled: false,
            ..ExtractOptions::default()
        };
        let explicit = tmp.path().join("skip.png");
        let files = collect_files(&[tmp.path().to_path_buf(), explicit.clone()], &options)
            .unwrap();
        assert_eq!(
            files,
            vec![tmp.path().join("b.txt"), sub.join("a.txt"), explicit]
        );
    }
}
