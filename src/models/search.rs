//! Search request and response models.

use serde::{Deserialize, Serialize};

use crate::models::{FullAbstract, ShortAbstract};
use crate::query::SearchError;

/// Named query modifier restricting search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Author,
    Category,
    From,
    To,
}

impl Modifier {
    /// All canonical modifiers
    pub const ALL: [Modifier; 4] = [
        Modifier::Author,
        Modifier::Category,
        Modifier::From,
        Modifier::To,
    ];

    /// Resolve a modifier name or synonym (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "author" | "au" => Some(Modifier::Author),
            "category" | "cat" => Some(Modifier::Category),
            "from" | "since" => Some(Modifier::From),
            "to" | "until" => Some(Modifier::To),
            _ => None,
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Author => "author",
            Modifier::Category => "category",
            Modifier::From => "from",
            Modifier::To => "to",
        }
    }

    /// Synonyms accepted in place of the canonical name
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Modifier::Author => &["au"],
            Modifier::Category => &["cat"],
            Modifier::From => &["since"],
            Modifier::To => &["until"],
        }
    }
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bounds applied to requested page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    /// Page size used when the request does not give one
    pub default_per_page: usize,

    /// Smallest page size accepted
    pub min_per_page: usize,

    /// Largest page size accepted
    pub max_per_page: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_per_page: 50,
            min_per_page: 1,
            max_per_page: 500,
        }
    }
}

/// Pagination parameters (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page number, at least 1
    pub page: usize,

    /// Rows per page
    pub per_page: usize,
}

impl Page {
    /// Build a page from raw request values
    ///
    /// A missing or non-positive page becomes 1; a missing page size takes the
    /// configured default and any size is clamped into the configured bounds.
    pub fn from_request(page: Option<i64>, per_page: Option<i64>, limits: &PageLimits) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1) as usize;
        let per_page = match per_page {
            Some(size) => size.max(0) as usize,
            None => limits.default_per_page,
        };
        Self {
            page,
            per_page: per_page.clamp(limits.min_per_page, limits.max_per_page),
        }
    }

    /// First page with the default size
    pub fn first(limits: &PageLimits) -> Self {
        Self::from_request(None, None, limits)
    }

    /// Number of rows skipped before this page
    pub fn offset(&self) -> usize {
        (self.page.max(1) - 1).saturating_mul(self.per_page)
    }
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Rows on this page (not the total number of matches)
    pub count: usize,

    /// Echoed page number
    pub page: usize,

    /// Echoed page size
    pub per_page: usize,

    /// Short representations in rank order
    pub results: Vec<ShortAbstract>,

    /// User-facing message, set when the search was abandoned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Why the search was abandoned
    #[serde(skip)]
    pub diagnostic: Option<SearchError>,
}

impl SearchResponse {
    /// Create a response for a page of results
    pub fn new(results: Vec<ShortAbstract>, page: &Page) -> Self {
        Self {
            count: results.len(),
            page: page.page,
            per_page: page.per_page,
            results,
            message: None,
            diagnostic: None,
        }
    }

    /// Create an empty response for a search abandoned during modifier resolution
    pub fn abandoned(page: &Page, diagnostic: SearchError) -> Self {
        Self {
            count: 0,
            page: page.page,
            per_page: page.per_page,
            results: Vec::new(),
            message: Some(diagnostic.to_string()),
            diagnostic: Some(diagnostic),
        }
    }

    /// Whether the search was abandoned before execution
    pub fn is_abandoned(&self) -> bool {
        self.diagnostic.is_some()
    }
}

/// Detail view of a single abstract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailResponse {
    pub result: FullAbstract,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_synonyms() {
        assert_eq!(Modifier::from_name("au"), Some(Modifier::Author));
        assert_eq!(Modifier::from_name("CAT"), Some(Modifier::Category));
        assert_eq!(Modifier::from_name("since"), Some(Modifier::From));
        assert_eq!(Modifier::from_name("Until"), Some(Modifier::To));
        assert_eq!(Modifier::from_name("title"), None);

        for modifier in Modifier::ALL {
            assert_eq!(Modifier::from_name(modifier.as_str()), Some(modifier));
            for synonym in modifier.synonyms() {
                assert_eq!(Modifier::from_name(synonym), Some(modifier));
            }
        }
    }

    #[test]
    fn test_page_defaults() {
        let limits = PageLimits::default();
        let page = Page::from_request(None, None, &limits);
        assert_eq!(page, Page { page: 1, per_page: 50 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_clamping() {
        let limits = PageLimits::default();
        assert_eq!(Page::from_request(Some(0), Some(0), &limits).per_page, 1);
        assert_eq!(Page::from_request(Some(-4), None, &limits).page, 1);
        assert_eq!(Page::from_request(None, Some(10_000), &limits).per_page, 500);
        assert_eq!(Page::from_request(Some(3), Some(50), &limits).offset(), 100);
        assert_eq!(
            Page::from_request(Some(i64::MAX), Some(500), &limits).offset(),
            usize::MAX
        );
    }

    #[test]
    fn test_abandoned_response() {
        let page = Page::first(&PageLimits::default());
        let response =
            SearchResponse::abandoned(&page, SearchError::NoMatchingCategory("astro-xx".into()));
        assert!(response.is_abandoned());
        assert_eq!(response.count, 0);
        assert!(response.message.unwrap().contains("astro-xx"));
    }
}
