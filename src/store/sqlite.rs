//! SQLite store with an FTS5 index over title and abstract.
//!
//! Every statement is static SQL with bound parameters. Id sets travel as JSON
//! arrays and are expanded with `json_each`, so no query text is ever built from
//! user input. Rusqlite is synchronous; each call runs on the blocking pool.

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{AbstractStore, StoreError, StoreStats};
use crate::models::{Abstract, Author, AuthorRef, Category, CategoryRef};
use crate::query::{escape_like, rank_by_similarity, AbstractQuery, NamePattern, ResultOrder};
use crate::utils::TextAnalyzer;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS abstracts (
    id          INTEGER PRIMARY KEY,
    arxiv_id    TEXT NOT NULL UNIQUE,
    title       TEXT NOT NULL,
    abstract    TEXT NOT NULL,
    updated     TEXT NOT NULL,
    license     TEXT
);
CREATE INDEX IF NOT EXISTS idx_abstracts_updated ON abstracts(updated DESC, arxiv_id DESC);

CREATE TABLE IF NOT EXISTS authors (
    id              INTEGER PRIMARY KEY,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    fullname        TEXT NOT NULL,
    fullname_lower  TEXT NOT NULL,
    UNIQUE (first_name, last_name)
);
CREATE INDEX IF NOT EXISTS idx_authors_fullname_lower ON authors(fullname_lower);

CREATE TABLE IF NOT EXISTS categories (
    id          INTEGER PRIMARY KEY,
    raw         TEXT NOT NULL UNIQUE,
    raw_lower   TEXT NOT NULL,
    archive     TEXT NOT NULL,
    subject     TEXT
);

CREATE TABLE IF NOT EXISTS abstract_authors (
    abstract_id INTEGER NOT NULL REFERENCES abstracts(id) ON DELETE CASCADE,
    author_id   INTEGER NOT NULL REFERENCES authors(id),
    position    INTEGER NOT NULL,
    PRIMARY KEY (abstract_id, position)
);
CREATE INDEX IF NOT EXISTS idx_abstract_authors_author ON abstract_authors(author_id);

CREATE TABLE IF NOT EXISTS abstract_categories (
    abstract_id INTEGER NOT NULL REFERENCES abstracts(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES categories(id),
    position    INTEGER NOT NULL,
    PRIMARY KEY (abstract_id, position)
);
CREATE INDEX IF NOT EXISTS idx_abstract_categories_category ON abstract_categories(category_id);

CREATE VIRTUAL TABLE IF NOT EXISTS abstracts_fts USING fts5(
    title,
    abstract,
    content='abstracts',
    content_rowid='id',
    tokenize='unicode61 remove_diacritics 0'
);

CREATE TRIGGER IF NOT EXISTS abstracts_ai AFTER INSERT ON abstracts BEGIN
    INSERT INTO abstracts_fts(rowid, title, abstract) VALUES (new.id, new.title, new.abstract);
END;
CREATE TRIGGER IF NOT EXISTS abstracts_ad AFTER DELETE ON abstracts BEGIN
    INSERT INTO abstracts_fts(abstracts_fts, rowid, title, abstract)
    VALUES ('delete', old.id, old.title, old.abstract);
END;
CREATE TRIGGER IF NOT EXISTS abstracts_au AFTER UPDATE ON abstracts BEGIN
    INSERT INTO abstracts_fts(abstracts_fts, rowid, title, abstract)
    VALUES ('delete', old.id, old.title, old.abstract);
    INSERT INTO abstracts_fts(rowid, title, abstract) VALUES (new.id, new.title, new.abstract);
END;
"#;

/// Filter clause shared by both search statements
macro_rules! search_filters {
    () => {
        r#"
  AND (:category_ids IS NULL OR EXISTS (
        SELECT 1 FROM abstract_categories ac
        WHERE ac.abstract_id = a.id
          AND ac.category_id IN (SELECT value FROM json_each(:category_ids))))
  AND (:author_ids IS NULL OR EXISTS (
        SELECT 1 FROM abstract_authors aa
        WHERE aa.abstract_id = a.id
          AND aa.author_id IN (SELECT value FROM json_each(:author_ids))))
  AND (:date_from IS NULL OR a.updated >= :date_from)
  AND (:date_to IS NULL OR a.updated <= :date_to)
"#
    };
}

const SEARCH_RECENT_SQL: &str = concat!(
    "SELECT a.id, a.arxiv_id, a.title, a.abstract, a.updated, a.license
FROM abstracts a
WHERE 1 = 1",
    search_filters!(),
    "ORDER BY a.updated DESC, a.arxiv_id DESC
LIMIT :limit OFFSET :offset"
);

const SEARCH_TEXT_SQL: &str = concat!(
    "SELECT a.id, a.arxiv_id, a.title, a.abstract, a.updated, a.license
FROM abstracts_fts
JOIN abstracts a ON a.id = abstracts_fts.rowid
WHERE abstracts_fts MATCH :fts_query",
    search_filters!(),
    "ORDER BY bm25(abstracts_fts, 2.0, 1.0), a.updated DESC, a.arxiv_id DESC
LIMIT :limit OFFSET :offset"
);

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Store backed by a single SQLite connection
#[derive(Debug)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    analyzer: Arc<TextAnalyzer>,
}

struct AbstractRow {
    id: i64,
    arxiv_id: String,
    title: String,
    body: String,
    updated: String,
    license: Option<String>,
}

impl AbstractRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            arxiv_id: row.get(1)?,
            title: row.get(2)?,
            body: row.get(3)?,
            updated: row.get(4)?,
            license: row.get(5)?,
        })
    }
}

impl SqliteStore {
    /// Open (creating if needed) a database file
    pub fn open(path: impl AsRef<Path>, analyzer: Arc<TextAnalyzer>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure_pragmas(&conn, true)?;
        tracing::debug!("Opened SQLite store at {}", path.display());
        Self::with_connection(conn, analyzer)
    }

    /// Open a private in-memory database
    pub fn open_in_memory(analyzer: Arc<TextAnalyzer>) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::configure_pragmas(&conn, false)?;
        Self::with_connection(conn, analyzer)
    }

    fn with_connection(conn: Connection, analyzer: Arc<TextAnalyzer>) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            analyzer,
        })
    }

    fn configure_pragmas(conn: &Connection, on_disk: bool) -> Result<(), StoreError> {
        if on_disk {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA cache_size = -64000;",
            )?;
        }
        conn.execute_batch(
            "PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool
    async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {}", e)))?
    }

    /// FTS5 query requiring every analyzed term, `None` when nothing is searchable
    fn fts_query(&self, free_text: &str) -> Option<String> {
        let terms = self.analyzer.terms(free_text);
        if terms.is_empty() {
            return None;
        }
        Some(
            terms
                .iter()
                .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn id_set_json(ids: Option<&std::collections::BTreeSet<i64>>) -> Result<Option<String>, StoreError> {
    ids.map(serde_json::to_string).transpose().map_err(StoreError::from)
}

/// Load authors and categories for a row and build the record
fn hydrate(conn: &Connection, row: AbstractRow) -> Result<Abstract, StoreError> {
    let updated = NaiveDate::parse_from_str(&row.updated, DATE_FORMAT).map_err(|e| {
        StoreError::Parse(format!("bad date '{}' for {}: {}", row.updated, row.arxiv_id, e))
    })?;

    let mut stmt = conn.prepare_cached(
        "SELECT au.first_name, au.last_name
         FROM abstract_authors aa JOIN authors au ON au.id = aa.author_id
         WHERE aa.abstract_id = ?1
         ORDER BY aa.position",
    )?;
    let authors = stmt
        .query_map([row.id], |r| Ok(Author::new(r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare_cached(
        "SELECT c.raw
         FROM abstract_categories ac JOIN categories c ON c.id = ac.category_id
         WHERE ac.abstract_id = ?1
         ORDER BY ac.position",
    )?;
    let categories = stmt
        .query_map([row.id], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Abstract {
        arxiv_id: row.arxiv_id,
        title: row.title,
        r#abstract: row.body,
        updated,
        license: row.license,
        authors,
        categories,
    })
}

fn upsert(conn: &mut Connection, record: &Abstract) -> Result<(), StoreError> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO abstracts (arxiv_id, title, abstract, updated, license)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(arxiv_id) DO UPDATE SET
            title = excluded.title,
            abstract = excluded.abstract,
            updated = excluded.updated,
            license = excluded.license",
        rusqlite::params![
            record.arxiv_id,
            record.title,
            record.r#abstract,
            record.updated.format(DATE_FORMAT).to_string(),
            record.license,
        ],
    )?;
    let abstract_id: i64 = tx.query_row(
        "SELECT id FROM abstracts WHERE arxiv_id = ?1",
        [&record.arxiv_id],
        |r| r.get(0),
    )?;

    tx.execute("DELETE FROM abstract_authors WHERE abstract_id = ?1", [abstract_id])?;
    tx.execute("DELETE FROM abstract_categories WHERE abstract_id = ?1", [abstract_id])?;

    for (position, author) in record.authors.iter().enumerate() {
        let full_name = author.full_name();
        tx.execute(
            "INSERT INTO authors (first_name, last_name, fullname, fullname_lower)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(first_name, last_name) DO NOTHING",
            rusqlite::params![author.first_name, author.last_name, full_name, full_name.to_lowercase()],
        )?;
        let author_id: i64 = tx.query_row(
            "SELECT id FROM authors WHERE first_name = ?1 AND last_name = ?2",
            [&author.first_name, &author.last_name],
            |r| r.get(0),
        )?;
        tx.execute(
            "INSERT INTO abstract_authors (abstract_id, author_id, position) VALUES (?1, ?2, ?3)",
            rusqlite::params![abstract_id, author_id, position as i64],
        )?;
    }

    for (position, raw) in record.categories.iter().enumerate() {
        let category = Category::parse(raw);
        tx.execute(
            "INSERT INTO categories (raw, raw_lower, archive, subject)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(raw) DO NOTHING",
            rusqlite::params![raw, raw.to_lowercase(), category.archive, category.subject],
        )?;
        let category_id: i64 =
            tx.query_row("SELECT id FROM categories WHERE raw = ?1", [raw], |r| r.get(0))?;
        tx.execute(
            "INSERT INTO abstract_categories (abstract_id, category_id, position) VALUES (?1, ?2, ?3)",
            rusqlite::params![abstract_id, category_id, position as i64],
        )?;
    }

    tx.commit()?;
    Ok(())
}

#[async_trait]
impl AbstractStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn categories_by_prefix(&self, prefix: &str) -> Result<Vec<CategoryRef>, StoreError> {
        let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));
        self.call(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, raw FROM categories WHERE raw_lower LIKE ?1 ESCAPE '\\' ORDER BY id",
            )?;
            let rows = stmt
                .query_map([&pattern], |r| {
                    Ok(CategoryRef {
                        id: r.get(0)?,
                        raw: r.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn authors_by_name(&self, pattern: &NamePattern) -> Result<Vec<AuthorRef>, StoreError> {
        let like = pattern.like_pattern();
        let mut matches = self
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, fullname FROM authors WHERE fullname_lower LIKE ?1 ESCAPE '\\'",
                )?;
                let rows = stmt
                    .query_map([&like], |r| {
                        Ok(AuthorRef {
                            id: r.get(0)?,
                            full_name: r.get(1)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        rank_by_similarity(pattern, &mut matches, |a| (a.id, a.full_name.as_str()));
        Ok(matches)
    }

    async fn search_abstracts(&self, query: &AbstractQuery) -> Result<Vec<Abstract>, StoreError> {
        let fts_query = match &query.free_text {
            Some(text) => match self.fts_query(text) {
                Some(q) => Some(q),
                None => {
                    tracing::debug!("Free text '{}' has no searchable terms", text);
                    return Ok(Vec::new());
                }
            },
            None => None,
        };

        let category_ids = id_set_json(query.category_ids.as_ref())?;
        let author_ids = id_set_json(query.author_ids.as_ref())?;
        let date_from = format_date(query.date_range.from);
        let date_to = format_date(query.date_range.to);
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
        let order = query.order;

        self.call(move |conn| {
            let conn: &Connection = conn;
            let rows = match (&fts_query, order) {
                (Some(fts_query), ResultOrder::Relevance) => {
                    let mut stmt = conn.prepare_cached(SEARCH_TEXT_SQL)?;
                    let rows = stmt
                        .query_map(
                            named_params! {
                                ":fts_query": fts_query,
                                ":category_ids": category_ids,
                                ":author_ids": author_ids,
                                ":date_from": date_from,
                                ":date_to": date_to,
                                ":limit": limit,
                                ":offset": offset,
                            },
                            AbstractRow::from_row,
                        )?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
                _ => {
                    if fts_query.is_some() {
                        return Err(StoreError::Unavailable(
                            "free-text queries must be ordered by relevance".to_string(),
                        ));
                    }
                    let mut stmt = conn.prepare_cached(SEARCH_RECENT_SQL)?;
                    let rows = stmt
                        .query_map(
                            named_params! {
                                ":category_ids": category_ids,
                                ":author_ids": author_ids,
                                ":date_from": date_from,
                                ":date_to": date_to,
                                ":limit": limit,
                                ":offset": offset,
                            },
                            AbstractRow::from_row,
                        )?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
            };

            rows.into_iter().map(|row| hydrate(conn, row)).collect()
        })
        .await
    }

    async fn abstract_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<Abstract>, StoreError> {
        let arxiv_id = arxiv_id.to_string();
        self.call(move |conn| {
            let conn: &Connection = conn;
            let row = conn
                .query_row(
                    "SELECT id, arxiv_id, title, abstract, updated, license
                     FROM abstracts WHERE arxiv_id = ?1",
                    [&arxiv_id],
                    AbstractRow::from_row,
                )
                .optional()?;
            row.map(|row| hydrate(conn, row)).transpose()
        })
        .await
    }

    async fn upsert_abstract(&self, record: &Abstract) -> Result<(), StoreError> {
        let record = record.clone();
        self.call(move |conn| upsert(conn, &record)).await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.call(|conn| {
            let count = |table: &str| -> Result<usize, StoreError> {
                let sql = match table {
                    "abstracts" => "SELECT COUNT(*) FROM abstracts",
                    "authors" => "SELECT COUNT(*) FROM authors",
                    _ => "SELECT COUNT(*) FROM categories",
                };
                let n: i64 = conn.query_row(sql, [], |r| r.get(0))?;
                Ok(n as usize)
            };
            Ok(StoreStats {
                abstracts: count("abstracts")?,
                authors: count("authors")?,
                categories: count("categories")?,
            })
        })
        .await
    }
}
