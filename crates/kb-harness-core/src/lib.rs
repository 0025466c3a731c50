//! # KB Harness Core
//!
//! Shared, I/O-free logic for KB Harness: data models, the line-packing
//! chunker, the lexical retriever, and the knowledge store abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Format extraction lives in the application
//! crate; everything here operates on already-extracted text units.

pub mod chunk;
pub mod models;
pub mod search;
pub mod store;
