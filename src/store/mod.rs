//! Storage backends behind the query layer.
//!
//! This module defines the [`AbstractStore`] trait the planner and service call
//! through. The query layer never sees SQL or index internals; it hands a store
//! a [`NamePattern`], a category prefix or a planned [`AbstractQuery`] and gets
//! plain records back.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStore`]: everything in memory, loaded from a JSON-lines snapshot
//! - [`SqliteStore`]: SQLite with an FTS5 index over title and abstract
//!
//! Both use the same [`TextAnalyzer`] so a query analyzes the same way
//! regardless of backend.

mod import;
mod memory;
mod sqlite;

pub use import::import_jsonl;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::models::{Abstract, AuthorRef, CategoryRef};
use crate::query::{AbstractQuery, NamePattern};
use crate::utils::TextAnalyzer;

/// Row counts reported by a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub abstracts: usize,
    pub authors: usize,
    pub categories: usize,
}

/// Read/write access to the mirrored abstracts.
///
/// # Implementing a New Store
///
/// 1. Create a struct holding its connection or data and a shared [`TextAnalyzer`]
/// 2. Implement every method below; lookups are case-insensitive
/// 3. Return candidates from [`authors_by_name`](AbstractStore::authors_by_name)
///    already ranked with [`rank_by_similarity`](crate::query::rank_by_similarity)
/// 4. Add a [`StoreBackend`] variant and construct it in [`open_store`]
#[async_trait]
pub trait AbstractStore: Send + Sync + std::fmt::Debug {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Categories whose raw string starts with `prefix`, case-insensitive
    async fn categories_by_prefix(&self, prefix: &str) -> Result<Vec<CategoryRef>, StoreError>;

    /// Authors matching the pattern, most similar to its rank key first
    async fn authors_by_name(&self, pattern: &NamePattern) -> Result<Vec<AuthorRef>, StoreError>;

    /// Execute a planned query: filter, rank, then apply offset and limit
    async fn search_abstracts(&self, query: &AbstractQuery) -> Result<Vec<Abstract>, StoreError>;

    /// Look up one abstract by arXiv id
    async fn abstract_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<Abstract>, StoreError>;

    /// Insert or replace an abstract by arXiv id, reusing author and category rows
    async fn upsert_abstract(&self, record: &Abstract) -> Result<(), StoreError>;

    /// Row counts
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// Errors raised by a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database engine error
    #[error("Database error: {0}")]
    Database(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing error (JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A record in an import file could not be read
    #[error("Invalid record on line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    /// The store cannot be reached or its state is unusable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Parse(format!("JSON: {}", err))
    }
}

/// Open the store described by the configuration
pub async fn open_store(
    config: &StoreConfig,
    analyzer: Arc<TextAnalyzer>,
) -> Result<Arc<dyn AbstractStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new(analyzer);
            if let Some(path) = &config.path {
                let imported = import_jsonl(&store, path).await?;
                tracing::info!("Loaded {} abstracts from {}", imported, path.display());
            }
            Ok(Arc::new(store))
        }
        StoreBackend::Sqlite => {
            let store = match &config.path {
                Some(path) => SqliteStore::open(path, analyzer)?,
                None => SqliteStore::open_in_memory(analyzer)?,
            };
            Ok(Arc::new(store))
        }
    }
}
