//! Data models shared by the ingestion and retrieval pipeline.
//!
//! Text units and chunks are plain `String`s: a text unit is one paragraph,
//! spreadsheet row, or line in source order, and a chunk is a bounded run of
//! consecutive units. The types here carry the metadata around them.

use serde::{Deserialize, Serialize};

/// Metadata recorded for every successfully ingested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Original file name as uploaded.
    pub name: String,
    /// Number of chunks this file contributed.
    pub chunks: usize,
    /// Upload time, milliseconds since the Unix epoch.
    pub time: i64,
}

/// A chunk paired with its lexical score. Lives only inside one ranking call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Position of the chunk in the knowledge base.
    pub index: usize,
    pub score: f64,
    pub text: String,
}

/// Listing of everything currently in the knowledge base.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseSummary {
    pub files: Vec<FileMeta>,
    pub total_chunks: usize,
}
