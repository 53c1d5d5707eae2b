//! Search service: runs parsed queries against a store and shapes responses.

use std::path::Path;
use std::sync::Arc;

use super::author::NamePattern;
use super::planner::Planner;
use super::tokenizer::tokenize_query;
use super::SearchError;
use crate::config::SearchConfig;
use crate::models::{AuthorRef, CategoryRef, DetailResponse, Page, PageLimits, SearchResponse};
use crate::store::{import_jsonl, AbstractStore, StoreError, StoreStats};
use crate::utils::sanitize_arxiv_id;

/// Default number of autocomplete suggestions
const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 10;

/// Entry point for search, detail and autocomplete
#[derive(Debug, Clone)]
pub struct SearchService {
    store: Arc<dyn AbstractStore>,
    limits: PageLimits,
    autocomplete_limit: usize,
}

impl SearchService {
    pub fn new(store: Arc<dyn AbstractStore>) -> Self {
        Self {
            store,
            limits: PageLimits::default(),
            autocomplete_limit: DEFAULT_AUTOCOMPLETE_LIMIT,
        }
    }

    /// Service using the page limits and autocomplete size from configuration
    pub fn from_config(store: Arc<dyn AbstractStore>, config: &SearchConfig) -> Self {
        Self::new(store)
            .with_limits(config.page_limits())
            .with_autocomplete_limit(config.autocomplete_limit)
    }

    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_autocomplete_limit(mut self, limit: usize) -> Self {
        self.autocomplete_limit = limit.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn AbstractStore> {
        &self.store
    }

    pub fn limits(&self) -> &PageLimits {
        &self.limits
    }

    /// Page from raw request values, clamped to this service's limits
    pub fn page(&self, page: Option<i64>, per_page: Option<i64>) -> Page {
        Page::from_request(page, per_page, &self.limits)
    }

    /// Run a search for one page of results.
    ///
    /// A modifier that matches nothing abandons the search: the response is
    /// `Ok` with no results and a message. Store failures are errors.
    pub async fn search(&self, raw_query: &str, page: &Page) -> Result<SearchResponse, SearchError> {
        if raw_query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let parsed = tokenize_query(raw_query);
        let planner = Planner::new(self.store.as_ref());

        let filter = match planner.resolve(&parsed).await {
            Ok(filter) => filter,
            Err(e) if e.is_resolution_failure() => {
                tracing::info!("Search abandoned: {}", e);
                return Ok(SearchResponse::abandoned(page, e));
            }
            Err(e) => {
                tracing::warn!("Modifier resolution failed on {} store: {}", self.store.name(), e);
                return Err(e);
            }
        };

        let query = Planner::plan(&parsed, filter, page);
        tracing::debug!(
            order = ?query.order,
            offset = query.offset,
            limit = query.limit,
            "executing search on {} store",
            self.store.name()
        );

        let results = self.store.search_abstracts(&query).await.map_err(|e| {
            tracing::warn!("Search failed on {} store: {}", self.store.name(), e);
            SearchError::from(e)
        })?;

        Ok(SearchResponse::new(
            results.iter().map(|r| r.short_repr()).collect(),
            page,
        ))
    }

    /// Full representation of one abstract
    pub async fn detail(&self, arxiv_id: &str) -> Result<DetailResponse, SearchError> {
        let id = sanitize_arxiv_id(arxiv_id)
            .map_err(|_| SearchError::InvalidArxivId(arxiv_id.trim().to_string()))?;

        match self.store.abstract_by_arxiv_id(&id).await? {
            Some(record) => Ok(DetailResponse {
                result: record.full_repr(),
            }),
            None => Err(SearchError::NotFound(id)),
        }
    }

    /// Authors whose name starts like `prefix`, most similar first
    pub async fn complete_authors(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AuthorRef>, SearchError> {
        let Some(pattern) = NamePattern::prefix(prefix) else {
            return Ok(Vec::new());
        };

        let mut authors = self.store.authors_by_name(&pattern).await?;
        authors.truncate(self.suggestion_limit(limit));
        Ok(authors)
    }

    /// Categories whose raw string starts with `prefix`
    pub async fn complete_categories(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CategoryRef>, SearchError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        let mut categories = self.store.categories_by_prefix(prefix).await?;
        categories.sort_by(|a, b| a.raw.len().cmp(&b.raw.len()).then_with(|| a.raw.cmp(&b.raw)));
        categories.truncate(self.suggestion_limit(limit));
        Ok(categories)
    }

    /// Load a JSON-lines file of abstracts into the store
    pub async fn import_jsonl(&self, path: &Path) -> Result<usize, StoreError> {
        let imported = import_jsonl(self.store.as_ref(), path).await?;
        tracing::info!("Imported {} abstracts from {}", imported, path.display());
        Ok(imported)
    }

    /// Row counts of the underlying store
    pub async fn stats(&self) -> Result<StoreStats, SearchError> {
        Ok(self.store.stats().await?)
    }

    fn suggestion_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.autocomplete_limit)
            .clamp(1, self.limits.max_per_page)
    }
}
