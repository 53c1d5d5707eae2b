//! In-memory store with a precomputed term index.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{AbstractStore, StoreError, StoreStats};
use crate::models::{Abstract, Author, AuthorRef, CategoryRef};
use crate::query::{rank_by_similarity, AbstractQuery, NamePattern, ResultOrder};
use crate::utils::TextAnalyzer;

/// Weight of a title occurrence relative to an abstract occurrence
const TITLE_WEIGHT: f64 = 2.0;

/// Store keeping every abstract in memory
#[derive(Debug)]
pub struct MemoryStore {
    analyzer: Arc<TextAnalyzer>,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    abstracts: BTreeMap<String, IndexedAbstract>,
    authors: Vec<AuthorRef>,
    author_ids: HashMap<Author, i64>,
    categories: Vec<CategoryRef>,
    category_ids: HashMap<String, i64>,
}

#[derive(Debug)]
struct IndexedAbstract {
    record: Abstract,
    author_ids: BTreeSet<i64>,
    category_ids: BTreeSet<i64>,
    title_tf: HashMap<String, u32>,
    body_tf: HashMap<String, u32>,
    length: usize,
}

impl IndexedAbstract {
    /// Weighted, length-normalized score; `None` unless every term occurs
    fn score(&self, terms: &[String]) -> Option<f64> {
        let mut total = 0.0;
        for term in terms {
            let title = self.title_tf.get(term).copied().unwrap_or(0);
            let body = self.body_tf.get(term).copied().unwrap_or(0);
            if title == 0 && body == 0 {
                return None;
            }
            total += TITLE_WEIGHT * f64::from(title) + f64::from(body);
        }
        Some(total / (1.0 + (1.0 + self.length as f64).ln()))
    }
}

fn term_frequencies(terms: Vec<String>) -> HashMap<String, u32> {
    let mut tf = HashMap::new();
    for term in terms {
        *tf.entry(term).or_insert(0) += 1;
    }
    tf
}

/// Newest first, then highest arXiv id
fn recency(a: &Abstract, b: &Abstract) -> Ordering {
    b.updated
        .cmp(&a.updated)
        .then_with(|| b.arxiv_id.cmp(&a.arxiv_id))
}

impl MemoryStore {
    pub fn new(analyzer: Arc<TextAnalyzer>) -> Self {
        Self {
            analyzer,
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn index(&self, inner: &mut Inner, record: &Abstract) -> IndexedAbstract {
        let author_ids = record
            .authors
            .iter()
            .map(|author| inner.author_id(author))
            .collect();
        let category_ids = record
            .categories
            .iter()
            .map(|raw| inner.category_id(raw))
            .collect();

        let title_terms = self.analyzer.terms(&record.title);
        let body_terms = self.analyzer.terms(&record.r#abstract);
        let length = title_terms.len() + body_terms.len();

        IndexedAbstract {
            record: record.clone(),
            author_ids,
            category_ids,
            title_tf: term_frequencies(title_terms),
            body_tf: term_frequencies(body_terms),
            length,
        }
    }
}

impl Inner {
    fn author_id(&mut self, author: &Author) -> i64 {
        if let Some(id) = self.author_ids.get(author) {
            return *id;
        }
        let id = self.authors.len() as i64 + 1;
        self.authors.push(AuthorRef {
            id,
            full_name: author.full_name(),
        });
        self.author_ids.insert(author.clone(), id);
        id
    }

    fn category_id(&mut self, raw: &str) -> i64 {
        if let Some(id) = self.category_ids.get(raw) {
            return *id;
        }
        let id = self.categories.len() as i64 + 1;
        self.categories.push(CategoryRef {
            id,
            raw: raw.to_string(),
        });
        self.category_ids.insert(raw.to_string(), id);
        id
    }
}

#[async_trait]
impl AbstractStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn categories_by_prefix(&self, prefix: &str) -> Result<Vec<CategoryRef>, StoreError> {
        let prefix = prefix.to_lowercase();
        let inner = self.read()?;
        Ok(inner
            .categories
            .iter()
            .filter(|c| c.raw.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn authors_by_name(&self, pattern: &NamePattern) -> Result<Vec<AuthorRef>, StoreError> {
        let mut matches: Vec<AuthorRef> = {
            let inner = self.read()?;
            inner
                .authors
                .iter()
                .filter(|a| pattern.matches(&a.full_name))
                .cloned()
                .collect()
        };
        rank_by_similarity(pattern, &mut matches, |a| (a.id, a.full_name.as_str()));
        Ok(matches)
    }

    async fn search_abstracts(&self, query: &AbstractQuery) -> Result<Vec<Abstract>, StoreError> {
        let terms = match &query.free_text {
            Some(text) => {
                let terms = self.analyzer.terms(text);
                if terms.is_empty() {
                    tracing::debug!("Free text '{}' has no searchable terms", text);
                    return Ok(Vec::new());
                }
                Some(terms)
            }
            None => None,
        };

        let inner = self.read()?;
        let mut hits: Vec<(f64, &IndexedAbstract)> = inner
            .abstracts
            .values()
            .filter(|doc| {
                query
                    .category_ids
                    .as_ref()
                    .map_or(true, |ids| !ids.is_disjoint(&doc.category_ids))
            })
            .filter(|doc| {
                query
                    .author_ids
                    .as_ref()
                    .map_or(true, |ids| !ids.is_disjoint(&doc.author_ids))
            })
            .filter(|doc| query.date_range.contains(doc.record.updated))
            .filter_map(|doc| match &terms {
                Some(terms) => doc.score(terms).map(|score| (score, doc)),
                None => Some((0.0, doc)),
            })
            .collect();

        hits.sort_by(|(score_a, a), (score_b, b)| match query.order {
            ResultOrder::Relevance => score_b
                .total_cmp(score_a)
                .then_with(|| recency(&a.record, &b.record)),
            ResultOrder::UpdatedDesc => recency(&a.record, &b.record),
        });

        Ok(hits
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|(_, doc)| doc.record.clone())
            .collect())
    }

    async fn abstract_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<Abstract>, StoreError> {
        let inner = self.read()?;
        Ok(inner.abstracts.get(arxiv_id).map(|doc| doc.record.clone()))
    }

    async fn upsert_abstract(&self, record: &Abstract) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let indexed = self.index(&mut inner, record);
        inner.abstracts.insert(record.arxiv_id.clone(), indexed);
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let inner = self.read()?;
        Ok(StoreStats {
            abstracts: inner.abstracts.len(),
            authors: inner.authors.len(),
            categories: inner.categories.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AbstractBuilder;
    use crate::query::DateRange;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn query(free_text: Option<&str>) -> AbstractQuery {
        AbstractQuery {
            free_text: free_text.map(str::to_string),
            category_ids: None,
            author_ids: None,
            date_range: DateRange::default(),
            order: if free_text.is_some() {
                ResultOrder::Relevance
            } else {
                ResultOrder::UpdatedDesc
            },
            offset: 0,
            limit: 50,
        }
    }

    async fn fixture() -> MemoryStore {
        let store = MemoryStore::new(Arc::new(TextAnalyzer::new(["the", "a", "of"])));
        let records = [
            AbstractBuilder::new("1202.3665", "emcee: The MCMC Hammer", date(2013, 11, 25))
                .abstract_text("An affine invariant ensemble sampler for MCMC.")
                .author("Daniel", "Foreman-Mackey")
                .author("David W.", "Hogg")
                .categories("astro-ph.IM stat.CO")
                .build(),
            AbstractBuilder::new("1008.4686", "Data analysis recipes", date(2010, 8, 23))
                .abstract_text("Fitting a model to data, with MCMC as a tool.")
                .author("David W.", "Hogg")
                .author("Jo", "Bovy")
                .categories("astro-ph.IM physics.data-an")
                .build(),
            AbstractBuilder::new("1008.0001", "Galaxy rotation", date(2010, 8, 23))
                .abstract_text("Rotation curves of spiral galaxies.")
                .author("Jo", "Bovy")
                .categories("astro-ph.GA")
                .build(),
        ];
        for record in &records {
            store.upsert_abstract(record).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_upsert_reuses_rows() {
        let store = fixture().await;
        let stats = store.stats().await.unwrap();
        assert_eq!(
            stats,
            StoreStats {
                abstracts: 3,
                authors: 3,
                categories: 4
            }
        );

        let updated = AbstractBuilder::new("1202.3665", "emcee v2", date(2014, 1, 1))
            .author("David W.", "Hogg")
            .categories("astro-ph.IM")
            .build();
        store.upsert_abstract(&updated).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.abstracts, 3);
        assert_eq!(stats.authors, 3);
        let fetched = store.abstract_by_arxiv_id("1202.3665").await.unwrap().unwrap();
        assert_eq!(fetched.title, "emcee v2");
    }

    #[tokio::test]
    async fn test_categories_by_prefix_case_insensitive() {
        let store = fixture().await;
        let matches = store.categories_by_prefix("ASTRO-PH.im").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].raw, "astro-ph.IM");
        assert_eq!(store.categories_by_prefix("astro").await.unwrap().len(), 2);
        assert!(store.categories_by_prefix("hep").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authors_by_name() {
        let store = fixture().await;
        let pattern = NamePattern::parse("Hogg, David").unwrap();
        let matches = store.authors_by_name(&pattern).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].full_name, "David W. Hogg");

        let pattern = NamePattern::prefix("bo").unwrap();
        assert_eq!(store.authors_by_name(&pattern).await.unwrap()[0].full_name, "Jo Bovy");
    }

    #[tokio::test]
    async fn test_free_text_requires_every_term() {
        let store = fixture().await;
        let results = store.search_abstracts(&query(Some("mcmc hammer"))).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].arxiv_id, "1202.3665");

        let results = store.search_abstracts(&query(Some("mcmc"))).await.unwrap();
        assert_eq!(results.len(), 2);
        // title hit outranks body-only hit
        assert_eq!(results[0].arxiv_id, "1202.3665");

        assert!(store.search_abstracts(&query(Some("the of"))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recency_order_breaks_ties_on_id() {
        let store = fixture().await;
        let results = store.search_abstracts(&query(None)).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["1202.3665", "1008.4686", "1008.0001"]);
    }

    #[tokio::test]
    async fn test_filters_and_paging() {
        let store = fixture().await;
        let bovy = store
            .authors_by_name(&NamePattern::parse("bovy").unwrap())
            .await
            .unwrap();

        let mut q = query(None);
        q.author_ids = Some(bovy.iter().map(|a| a.id).collect());
        q.date_range = DateRange {
            from: Some(date(2010, 1, 1)),
            to: Some(date(2010, 12, 31)),
        };
        assert_eq!(store.search_abstracts(&q).await.unwrap().len(), 2);

        q.offset = 1;
        q.limit = 1;
        let page = store.search_abstracts(&q).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].arxiv_id, "1008.0001");

        q.offset = 5;
        assert!(store.search_abstracts(&q).await.unwrap().is_empty());
    }
}
