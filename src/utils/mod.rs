//! Utility modules shared by the stores, the query layer and the serving layer.
//!
//! - [`TextAnalyzer`]: word splitting and stop-word removal for full-text search
//! - [`sanitize_arxiv_id`]: normalize an arXiv id before a detail lookup
//! - [`validate_query`]: reject oversized or binary queries from the serving layer
//!
//! # Text Analysis
//!
//! ```rust
//! use arxiv_search::utils::TextAnalyzer;
//!
//! let analyzer = TextAnalyzer::new(["the", "of"]);
//! assert_eq!(analyzer.terms("The Age of Galaxies"), vec!["age", "galaxies"]);
//! ```

mod text;
mod validate;

pub use text::TextAnalyzer;
pub use validate::{sanitize_arxiv_id, validate_query, ValidationError, MAX_QUERY_LEN};
