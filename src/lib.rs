//! # KB Harness
//!
//! A small knowledge-base service: upload office documents and PDFs, keep
//! their text as bounded chunks, and answer questions from the chunks most
//! lexically relevant to the question.
//!
//! Extraction works directly on the container formats (ZIP + XML for
//! DOCX/XLSX, raw content streams for PDF) rather than through a document
//! SDK, and ranking is plain keyword counting, so the whole pipeline is
//! deterministic and dependency-light.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Extractors │──▶│   Chunker    │──▶│  SQLite   │
//! │ DOCX/XLSX/  │   │ (line-pack) │   │  chunks   │
//! │ PDF/TXT     │   └─────────────┘   └────┬─────┘
//! └─────────────┘                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │   (kb)   │       │  (axum)  │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kb init                        # create database
//! kb ingest ./manuals            # extract, chunk, store
//! kb search "reset password"     # ranked chunks with scores
//! kb ask "How do I reset my password?"
//! kb serve                       # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | DOCX, XLSX, PDF and plain-text extraction |
//! | [`ingest`] | Extract → chunk → store pipeline |
//! | [`answer`] | Retrieval plus chat-completion answering |
//! | [`sqlite_store`] | SQLite-backed knowledge store |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |
//!
//! Chunking, ranking and the store trait live in `kb-harness-core`.

pub mod answer;
pub mod config;
pub mod db;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
