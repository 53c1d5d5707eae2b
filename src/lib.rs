//! # arxiv-search
//!
//! Search over a local mirror of arXiv abstract metadata, served to MCP clients
//! and from the command line.
//!
//! ## Architecture
//!
//! - [`query`]: query language tokenizer, author name matching, planner and the
//!   [`SearchService`] entry point
//! - [`store`]: the [`AbstractStore`] trait with in-memory and SQLite backends
//! - [`models`]: abstracts, authors, categories, paging and response types
//! - [`mcp`]: MCP protocol implementation and server
//! - [`utils`]: text analysis and input validation
//! - [`config`]: configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use arxiv_search::{SearchService, store::MemoryStore, utils::TextAnalyzer};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new(Arc::new(TextAnalyzer::english()));
//! let service = SearchService::new(Arc::new(store));
//! let page = service.page(None, None);
//! let response = service.search("emcee cat:astro-ph since:2010 au:hogg", &page).await?;
//! println!("{} results", response.count);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod mcp;
pub mod models;
pub mod query;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use models::Abstract;
pub use query::{SearchError, SearchService};
pub use store::AbstractStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
