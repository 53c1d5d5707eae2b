//! Query planning: resolve modifier values against a store, then build the
//! store-agnostic [`AbstractQuery`].

use chrono::{Months, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

use super::author::NamePattern;
use super::tokenizer::ParsedQuery;
use super::SearchError;
use crate::models::{Modifier, Page};
use crate::store::AbstractStore;

/// Inclusive bounds on the `updated` date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Whether `date` falls inside the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// True when neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Modifier values resolved to store ids and date bounds.
///
/// `None` means the modifier was not used. A present set is never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedFilter {
    pub category_ids: Option<BTreeSet<i64>>,
    pub author_ids: Option<BTreeSet<i64>>,
    pub date_range: DateRange,
}

/// How results are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrder {
    /// Full-text rank, best first
    Relevance,
    /// Most recently updated first
    UpdatedDesc,
}

/// A planned, store-agnostic query.
///
/// Stores must break ties on `updated` descending then `arxiv_id` descending
/// so repeated requests page identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbstractQuery {
    pub free_text: Option<String>,
    pub category_ids: Option<BTreeSet<i64>>,
    pub author_ids: Option<BTreeSet<i64>>,
    pub date_range: DateRange,
    pub order: ResultOrder,
    pub offset: usize,
    pub limit: usize,
}

/// Resolves parsed queries against a store and plans them
pub struct Planner<'a> {
    store: &'a dyn AbstractStore,
}

impl<'a> Planner<'a> {
    pub fn new(store: &'a dyn AbstractStore) -> Self {
        Self { store }
    }

    /// Resolve every modifier value, failing on the first one that matches nothing.
    ///
    /// Categories are checked first, then authors, then dates.
    pub async fn resolve(&self, parsed: &ParsedQuery) -> Result<ResolvedFilter, SearchError> {
        let category_ids = self
            .resolve_categories(parsed.values(Modifier::Category))
            .await?;
        let author_ids = self.resolve_authors(parsed.values(Modifier::Author)).await?;
        let date_range = resolve_dates(parsed)?;

        Ok(ResolvedFilter {
            category_ids,
            author_ids,
            date_range,
        })
    }

    /// Build the executable query for one page
    pub fn plan(parsed: &ParsedQuery, filter: ResolvedFilter, page: &Page) -> AbstractQuery {
        let free_text = parsed.free_text();
        let order = if free_text.is_some() {
            ResultOrder::Relevance
        } else {
            ResultOrder::UpdatedDesc
        };

        AbstractQuery {
            free_text,
            category_ids: filter.category_ids,
            author_ids: filter.author_ids,
            date_range: filter.date_range,
            order,
            offset: page.offset(),
            limit: page.per_page,
        }
    }

    async fn resolve_categories(
        &self,
        values: &[String],
    ) -> Result<Option<BTreeSet<i64>>, SearchError> {
        if values.is_empty() {
            return Ok(None);
        }

        let mut ids = BTreeSet::new();
        for value in values {
            if value.is_empty() {
                return Err(SearchError::NoMatchingCategory(value.clone()));
            }
            let matches = self.store.categories_by_prefix(value).await?;
            if matches.is_empty() {
                tracing::debug!("No categories matching '{}'", value);
                return Err(SearchError::NoMatchingCategory(value.clone()));
            }
            ids.extend(matches.iter().map(|c| c.id));
        }
        Ok(Some(ids))
    }

    async fn resolve_authors(
        &self,
        values: &[String],
    ) -> Result<Option<BTreeSet<i64>>, SearchError> {
        if values.is_empty() {
            return Ok(None);
        }

        let mut ids = BTreeSet::new();
        for value in values {
            let pattern = NamePattern::parse(value)
                .ok_or_else(|| SearchError::NoMatchingAuthor(value.clone()))?;
            let matches = self.store.authors_by_name(&pattern).await?;
            if matches.is_empty() {
                tracing::debug!("No authors matching '{}'", pattern.like_pattern());
                return Err(SearchError::NoMatchingAuthor(value.clone()));
            }
            ids.extend(matches.iter().map(|a| a.id));
        }
        Ok(Some(ids))
    }
}

/// Turn `from`/`to` values into inclusive bounds.
///
/// The latest `from` and the earliest `to` win when repeated.
pub(crate) fn resolve_dates(parsed: &ParsedQuery) -> Result<DateRange, SearchError> {
    let mut range = DateRange::default();

    for value in parsed.values(Modifier::From) {
        let date = parse_date_bound(value, Bound::Start).ok_or_else(|| SearchError::InvalidDate {
            modifier: Modifier::From,
            value: value.clone(),
        })?;
        range.from = Some(range.from.map_or(date, |d| d.max(date)));
    }

    for value in parsed.values(Modifier::To) {
        let date = parse_date_bound(value, Bound::End).ok_or_else(|| SearchError::InvalidDate {
            modifier: Modifier::To,
            value: value.clone(),
        })?;
        range.to = Some(range.to.map_or(date, |d| d.min(date)));
    }

    Ok(range)
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD` to the first or last day of that period
fn parse_date_bound(value: &str, bound: Bound) -> Option<NaiveDate> {
    let parts: Vec<&str> = value.split('-').collect();
    let numeric = |s: &str, max_len: usize| {
        !s.is_empty() && s.len() <= max_len && s.bytes().all(|b| b.is_ascii_digit())
    };

    match parts.as_slice() {
        [year] if year.len() == 4 && numeric(year, 4) => {
            let year: i32 = year.parse().ok()?;
            match bound {
                Bound::Start => NaiveDate::from_ymd_opt(year, 1, 1),
                Bound::End => NaiveDate::from_ymd_opt(year, 12, 31),
            }
        }
        [year, month] if year.len() == 4 && numeric(year, 4) && numeric(month, 2) => {
            let first = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)?;
            match bound {
                Bound::Start => Some(first),
                Bound::End => first.checked_add_months(Months::new(1))?.pred_opt(),
            }
        }
        [year, month, day]
            if year.len() == 4 && numeric(year, 4) && numeric(month, 2) && numeric(day, 2) =>
        {
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbstractBuilder, PageLimits};
    use crate::query::tokenize_query;
    use crate::store::MemoryStore;
    use crate::utils::TextAnalyzer;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn fixture() -> MemoryStore {
        let store = MemoryStore::new(Arc::new(TextAnalyzer::without_stop_words()));
        let records = [
            AbstractBuilder::new("1202.3665", "emcee: The MCMC Hammer", date(2013, 11, 25))
                .author("Daniel", "Foreman-Mackey")
                .author("David W.", "Hogg")
                .categories("astro-ph.IM physics.comp-ph stat.CO")
                .build(),
            AbstractBuilder::new("1008.4686", "Data analysis recipes", date(2010, 8, 23))
                .author("David W.", "Hogg")
                .author("Jo", "Bovy")
                .categories("astro-ph.IM physics.data-an")
                .build(),
            AbstractBuilder::new("hep-th/9901001", "Strings", date(1999, 1, 4))
                .author("Ed", "Witten")
                .categories("hep-th")
                .build(),
        ];
        for record in &records {
            store.upsert_abstract(record).await.unwrap();
        }
        store
    }

    #[test]
    fn test_parse_date_bounds() {
        assert_eq!(parse_date_bound("2010", Bound::Start), Some(date(2010, 1, 1)));
        assert_eq!(parse_date_bound("2010", Bound::End), Some(date(2010, 12, 31)));
        assert_eq!(parse_date_bound("2012-02", Bound::End), Some(date(2012, 2, 29)));
        assert_eq!(parse_date_bound("2010-6", Bound::Start), Some(date(2010, 6, 1)));
        assert_eq!(parse_date_bound("2010-06-15", Bound::End), Some(date(2010, 6, 15)));
        assert_eq!(parse_date_bound("2010-13", Bound::Start), None);
        assert_eq!(parse_date_bound("2010-02-30", Bound::Start), None);
        assert_eq!(parse_date_bound("yesterday", Bound::Start), None);
        assert_eq!(parse_date_bound("10", Bound::Start), None);
        assert_eq!(parse_date_bound("", Bound::Start), None);
    }

    #[test]
    fn test_resolve_dates_keeps_tightest_bounds() {
        let parsed = tokenize_query("since:2009 from:2010-06 until:2014 to:2012");
        let range = resolve_dates(&parsed).unwrap();
        assert_eq!(range.from, Some(date(2010, 6, 1)));
        assert_eq!(range.to, Some(date(2012, 12, 31)));
        assert!(range.contains(date(2012, 12, 31)));
        assert!(!range.contains(date(2010, 5, 31)));
    }

    #[test]
    fn test_invalid_date() {
        let parsed = tokenize_query("to:soon");
        assert_eq!(
            resolve_dates(&parsed),
            Err(SearchError::InvalidDate {
                modifier: Modifier::To,
                value: "soon".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_resolve_unions_categories_and_authors() {
        let store = fixture().await;
        let planner = Planner::new(&store);

        let parsed = tokenize_query("cat:astro-ph cat:hep author:hogg au:witten");
        let filter = planner.resolve(&parsed).await.unwrap();

        let categories = store.categories_by_prefix("astro-ph").await.unwrap();
        let hep = store.categories_by_prefix("hep").await.unwrap();
        let expected: BTreeSet<i64> = categories.iter().chain(hep.iter()).map(|c| c.id).collect();
        assert_eq!(filter.category_ids, Some(expected));
        assert_eq!(filter.author_ids.map(|ids| ids.len()), Some(2));
        assert!(filter.date_range.is_unbounded());
    }

    #[tokio::test]
    async fn test_resolve_fails_fast_on_category() {
        let store = fixture().await;
        let planner = Planner::new(&store);

        let parsed = tokenize_query("cat:nonexistent author:nobody to:soon");
        assert_eq!(
            planner.resolve(&parsed).await,
            Err(SearchError::NoMatchingCategory("nonexistent".to_string()))
        );

        let parsed = tokenize_query("author:nobody to:soon");
        assert_eq!(
            planner.resolve(&parsed).await,
            Err(SearchError::NoMatchingAuthor("nobody".to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_values_match_nothing() {
        let store = fixture().await;
        let planner = Planner::new(&store);

        assert_eq!(
            planner.resolve(&tokenize_query("cat:")).await,
            Err(SearchError::NoMatchingCategory(String::new()))
        );
        assert_eq!(
            planner.resolve(&tokenize_query("galaxies author:")).await,
            Err(SearchError::NoMatchingAuthor(String::new()))
        );
    }

    #[tokio::test]
    async fn test_no_modifiers_resolve_to_no_filters() {
        let store = fixture().await;
        let filter = Planner::new(&store)
            .resolve(&tokenize_query("dark matter"))
            .await
            .unwrap();
        assert_eq!(filter, ResolvedFilter::default());
    }

    #[test]
    fn test_plan_order_and_paging() {
        let limits = PageLimits::default();

        let parsed = tokenize_query("MCMC hammer cat:astro-ph");
        let page = Page::from_request(Some(3), Some(20), &limits);
        let query = Planner::plan(&parsed, ResolvedFilter::default(), &page);
        assert_eq!(query.free_text.as_deref(), Some("mcmc hammer"));
        assert_eq!(query.order, ResultOrder::Relevance);
        assert_eq!(query.offset, 40);
        assert_eq!(query.limit, 20);

        let parsed = tokenize_query("cat:astro-ph");
        let query = Planner::plan(&parsed, ResolvedFilter::default(), &Page::first(&limits));
        assert_eq!(query.free_text, None);
        assert_eq!(query.order, ResultOrder::UpdatedDesc);
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, 50);
    }
}
