//! Abstract model representing one paper of the mirrored arXiv corpus.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Base URL for arXiv abstract pages
const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";

/// An author as listed on an abstract
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    /// Given name(s), possibly initials
    #[serde(default)]
    pub first_name: String,

    /// Family name
    pub last_name: String,
}

impl Author {
    /// Create a new author, trimming both parts
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
        }
    }

    /// Full name in "first last" order, as stored and searched
    pub fn full_name(&self) -> String {
        if self.first_name.is_empty() {
            self.last_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// An author row known to a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    /// Store-assigned identifier
    pub id: i64,

    /// Full name in "first last" order
    pub full_name: String,
}

/// A category row known to a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Store-assigned identifier
    pub id: i64,

    /// Raw category string, e.g. `astro-ph.IM`
    pub raw: String,
}

impl CategoryRef {
    /// Split the raw string into archive and subject
    pub fn parsed(&self) -> Category {
        Category::parse(&self.raw)
    }
}

/// An arXiv category split into its archive and optional subject class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Archive, e.g. `astro-ph`
    pub archive: String,

    /// Subject class, e.g. `IM`
    pub subject: Option<String>,
}

impl Category {
    /// Parse a raw category string such as `astro-ph.IM` or `hep-th`
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once('.') {
            Some((archive, subject)) if !subject.is_empty() => Self {
                archive: archive.to_string(),
                subject: Some(subject.to_string()),
            },
            Some((archive, _)) => Self {
                archive: archive.to_string(),
                subject: None,
            },
            None => Self {
                archive: raw.to_string(),
                subject: None,
            },
        }
    }
}

/// An abstract from the mirror
///
/// This is the record every store hands back to the query layer. Authors keep
/// their listing order; categories keep their raw arXiv spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abstract {
    /// arXiv identifier, e.g. `1202.3665`
    pub arxiv_id: String,

    /// Paper title
    pub title: String,

    /// Abstract body
    pub r#abstract: String,

    /// Last updated date
    pub updated: NaiveDate,

    /// License URL, if the feed carried one
    #[serde(default)]
    pub license: Option<String>,

    /// Authors in listing order
    #[serde(default)]
    pub authors: Vec<Author>,

    /// Raw category strings
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Abstract {
    /// Author full names in listing order
    pub fn author_names(&self) -> Vec<String> {
        self.authors.iter().map(Author::full_name).collect()
    }

    /// Link to the abstract page on arxiv.org
    pub fn url(&self) -> String {
        format!("{}/{}", ARXIV_ABS_URL, self.arxiv_id)
    }

    /// Short representation used in result lists
    pub fn short_repr(&self) -> ShortAbstract {
        ShortAbstract {
            arxiv_id: self.arxiv_id.clone(),
            title: self.title.clone(),
            updated: self.updated,
            authors: self.author_names(),
            categories: self.categories.clone(),
            url: self.url(),
        }
    }

    /// Full representation used by the detail view
    pub fn full_repr(&self) -> FullAbstract {
        FullAbstract {
            summary: self.short_repr(),
            r#abstract: self.r#abstract.clone(),
            license: self.license.clone(),
        }
    }
}

/// Short representation of an abstract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortAbstract {
    pub arxiv_id: String,
    pub title: String,
    pub updated: NaiveDate,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub url: String,
}

/// Full representation of an abstract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullAbstract {
    #[serde(flatten)]
    pub summary: ShortAbstract,
    pub r#abstract: String,
    pub license: Option<String>,
}

/// Builder for constructing Abstract records
#[derive(Debug, Clone)]
pub struct AbstractBuilder {
    record: Abstract,
}

impl AbstractBuilder {
    /// Create a new builder with required fields
    pub fn new(arxiv_id: impl Into<String>, title: impl Into<String>, updated: NaiveDate) -> Self {
        Self {
            record: Abstract {
                arxiv_id: arxiv_id.into(),
                title: title.into(),
                r#abstract: String::new(),
                updated,
                license: None,
                authors: Vec::new(),
                categories: Vec::new(),
            },
        }
    }

    /// Set abstract body
    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.record.r#abstract = text.into();
        self
    }

    /// Set license
    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.record.license = Some(license.into());
        self
    }

    /// Append an author
    pub fn author(mut self, first_name: &str, last_name: &str) -> Self {
        self.record.authors.push(Author::new(first_name, last_name));
        self
    }

    /// Set categories from a whitespace-separated string, as the feed delivers them
    pub fn categories(mut self, categories: &str) -> Self {
        self.record.categories = categories.split_whitespace().map(str::to_string).collect();
        self
    }

    /// Build the Abstract
    pub fn build(self) -> Abstract {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_abstract_builder() {
        let record = AbstractBuilder::new("1202.3665", "emcee: The MCMC Hammer", date(2013, 11, 25))
            .abstract_text("We introduce a stable, well tested Python implementation.")
            .author("Daniel", "Foreman-Mackey")
            .author("David W.", "Hogg")
            .categories("astro-ph.IM physics.comp-ph")
            .license("http://arxiv.org/licenses/nonexclusive-distrib/1.0/")
            .build();

        assert_eq!(record.arxiv_id, "1202.3665");
        assert_eq!(
            record.author_names(),
            vec!["Daniel Foreman-Mackey", "David W. Hogg"]
        );
        assert_eq!(record.categories, vec!["astro-ph.IM", "physics.comp-ph"]);
        assert!(record.license.is_some());
    }

    #[test]
    fn test_full_name_without_first_name() {
        assert_eq!(Author::new("", "Collaboration").full_name(), "Collaboration");
        assert_eq!(Author::new("  Jo ", " Bovy ").full_name(), "Jo Bovy");
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(
            Category::parse("astro-ph.IM"),
            Category {
                archive: "astro-ph".to_string(),
                subject: Some("IM".to_string()),
            }
        );
        assert_eq!(Category::parse("hep-th").subject, None);
        assert_eq!(Category::parse("math.").archive, "math");
    }

    #[test]
    fn test_representations() {
        let record = AbstractBuilder::new("1202.3665", "emcee", date(2013, 11, 25))
            .abstract_text("body")
            .author("David W.", "Hogg")
            .build();

        let short = record.short_repr();
        assert_eq!(short.url, "https://arxiv.org/abs/1202.3665");
        assert_eq!(short.authors, vec!["David W. Hogg"]);

        let full = record.full_repr();
        assert_eq!(full.r#abstract, "body");
        let json = serde_json::to_value(&full).unwrap();
        assert_eq!(json["arxiv_id"], "1202.3665");
        assert_eq!(json["updated"], "2013-11-25");
    }
}
