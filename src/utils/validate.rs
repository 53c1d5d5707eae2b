//! Input validation for arXiv ids and raw search queries.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Longest raw query accepted from the serving layer
pub const MAX_QUERY_LEN: usize = 1024;

/// Validation error types
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid arXiv ID: {0}")]
    InvalidArxivId(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Path traversal detected: {0}")]
    PathTraversal(String),
}

static ARXIV_ID_PATTERN: OnceLock<Regex> = OnceLock::new();

/// New-style (`1202.3665`) and old-style (`hep-th/9901001`, `math.AG/0601001`) ids,
/// with an optional version suffix
fn arxiv_id_pattern() -> &'static Regex {
    ARXIV_ID_PATTERN.get_or_init(|| {
        Regex::new(r"^(?:\d{4}\.\d{4,5}|[a-z][a-z\-]*(?:\.[a-z]{2})?/\d{7})(v\d+)?$")
            .expect("arXiv id pattern is a valid regex")
    })
}

/// Normalize and validate an arXiv id for lookup.
///
/// Trims whitespace, drops an `arxiv:` prefix and a trailing version
/// (`1202.3665v2` → `1202.3665`).
pub fn sanitize_arxiv_id(id: &str) -> Result<String, ValidationError> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::InvalidArxivId("empty ID".to_string()));
    }

    if id.contains("..") || id.contains("./") || id.contains(".\\") {
        return Err(ValidationError::PathTraversal(id.to_string()));
    }

    if id.chars().any(char::is_control) {
        return Err(ValidationError::InvalidArxivId(
            "contains control characters".to_string(),
        ));
    }

    let id = match id.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("arxiv:") => &id[6..],
        _ => id,
    };

    // Old-style archive names are lowercase, subject classes uppercase
    let lowered = id.to_ascii_lowercase();
    let caps = arxiv_id_pattern()
        .captures(&lowered)
        .ok_or_else(|| ValidationError::InvalidArxivId(id.to_string()))?;

    let version_len = caps.get(1).map_or(0, |m| m.len());
    Ok(id[..id.len() - version_len].to_string())
}

/// Check a raw query from the serving layer.
///
/// Returns the trimmed query; `Ok(None)` when it is blank.
pub fn validate_query(query: &str) -> Result<Option<&str>, ValidationError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(None);
    }

    if query.len() > MAX_QUERY_LEN {
        return Err(ValidationError::InvalidQuery(format!(
            "longer than {} bytes",
            MAX_QUERY_LEN
        )));
    }

    if query.contains('\0') {
        return Err(ValidationError::InvalidQuery("contains null byte".to_string()));
    }

    Ok(Some(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_new_style_ids() {
        assert_eq!(sanitize_arxiv_id("1202.3665").unwrap(), "1202.3665");
        assert_eq!(sanitize_arxiv_id(" 1501.00001v3 ").unwrap(), "1501.00001");
        assert_eq!(sanitize_arxiv_id("arXiv:1202.3665").unwrap(), "1202.3665");
    }

    #[test]
    fn test_sanitize_old_style_ids() {
        assert_eq!(sanitize_arxiv_id("hep-th/9901001").unwrap(), "hep-th/9901001");
        assert_eq!(sanitize_arxiv_id("math.AG/0601001v2").unwrap(), "math.AG/0601001");
        assert_eq!(sanitize_arxiv_id("solv-int/9901001").unwrap(), "solv-int/9901001");
    }

    #[test]
    fn test_sanitize_rejects_garbage() {
        assert!(matches!(
            sanitize_arxiv_id(""),
            Err(ValidationError::InvalidArxivId(_))
        ));
        assert!(matches!(
            sanitize_arxiv_id("../etc/passwd"),
            Err(ValidationError::PathTraversal(_))
        ));
        assert!(sanitize_arxiv_id("1202.3665; drop table").is_err());
        assert!(sanitize_arxiv_id("12023665").is_err());
        assert!(sanitize_arxiv_id("1202.3665\0").is_err());
    }

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  emcee  ").unwrap(), Some("emcee"));
        assert_eq!(validate_query(" \t ").unwrap(), None);
        assert!(validate_query(&"a".repeat(MAX_QUERY_LEN + 1)).is_err());
        assert!(validate_query("a\0b").is_err());
    }
}
