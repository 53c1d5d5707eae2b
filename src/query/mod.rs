//! Search query language and query planning.
//!
//! A raw query flows through three stages:
//!
//! 1. [`tokenize_query`] splits it into free-text terms and modifier values
//! 2. [`Planner::resolve`] turns author/category/date values into id sets and
//!    bounds, failing fast when a value matches nothing
//! 3. [`Planner::plan`] builds the store-agnostic [`AbstractQuery`]
//!
//! [`SearchService`] runs the stages against an [`AbstractStore`](crate::store::AbstractStore)
//! and exposes `search`, `detail` and autocomplete to the serving layer.

mod author;
mod planner;
mod service;
mod tokenizer;

pub(crate) use author::escape_like;
pub use author::{normalize_author_name, rank_by_similarity, NamePattern};
pub use planner::{AbstractQuery, DateRange, Planner, ResolvedFilter, ResultOrder};
pub use service::SearchService;
pub use tokenizer::{tokenize_query, ParsedQuery};

use crate::models::Modifier;
use crate::store::StoreError;

/// Errors surfaced by search operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The query was empty or whitespace only
    #[error("You must include a search query")]
    EmptyQuery,

    /// A category modifier value matched no stored category
    #[error("No categories matching '{0}'")]
    NoMatchingCategory(String),

    /// An author modifier value matched no stored author
    #[error("No matches found for author '{0}'")]
    NoMatchingAuthor(String),

    /// A date modifier value could not be parsed
    #[error("Invalid date for '{modifier}': '{value}' (expected YYYY, YYYY-MM or YYYY-MM-DD)")]
    InvalidDate { modifier: Modifier, value: String },

    /// The arXiv id given to the detail view is malformed
    #[error("Invalid arXiv ID: {0}")]
    InvalidArxivId(String),

    /// No abstract with this arXiv id
    #[error("No abstract found for ID '{0}'")]
    NotFound(String),

    /// The backing store failed or is unreachable
    #[error("Store unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl SearchError {
    /// Whether this error abandons a search with a user-readable outcome
    /// rather than failing the request
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            SearchError::NoMatchingCategory(_)
                | SearchError::NoMatchingAuthor(_)
                | SearchError::InvalidDate { .. }
        )
    }
}

impl From<StoreError> for SearchError {
    fn from(err: StoreError) -> Self {
        SearchError::UpstreamUnavailable(err.to_string())
    }
}
