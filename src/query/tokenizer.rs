//! Tokenizer for the search box query language.
//!
//! A query is a mix of free-text words and `name:value` modifiers:
//!
//! ```text
//! emcee MCMC cat:astro-ph.IM since:2010 author:"hogg, david"
//! ```
//!
//! Modifier names are drawn from a closed set (see [`Modifier`]); anything else
//! that merely looks like `word:word` is ordinary free text.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::models::Modifier;

static MODIFIER_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Pattern matching a modifier at the start of the remaining input.
///
/// Groups: 1 = name, 2 = double-quoted value, 3 = single-quoted value,
/// 4 = unquoted value.
fn modifier_pattern() -> &'static Regex {
    MODIFIER_PATTERN.get_or_init(|| {
        let names: Vec<&str> = Modifier::ALL
            .iter()
            .map(|m| m.as_str())
            .chain(Modifier::ALL.iter().flat_map(|m| m.synonyms().iter().copied()))
            .collect();
        let pattern = format!(
            r#"(?i)^({}):(?:"([^"]*)"|'([^']*)'|(\S*))"#,
            names.join("|")
        );
        Regex::new(&pattern).expect("modifier pattern is a valid regex")
    })
}

/// Output of tokenization: free-text terms plus modifier values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    /// Free-text terms in input order (lowercase, duplicates kept)
    pub terms: Vec<String>,

    /// Raw modifier values keyed by canonical modifier, in input order
    pub modifiers: BTreeMap<Modifier, Vec<String>>,
}

impl ParsedQuery {
    /// Values given for a modifier, empty if it was not used
    pub fn values(&self, modifier: Modifier) -> &[String] {
        self.modifiers
            .get(&modifier)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Free-text terms joined into one natural-language query, if any
    pub fn free_text(&self) -> Option<String> {
        if self.terms.is_empty() {
            None
        } else {
            Some(self.terms.join(" "))
        }
    }

    /// True when neither terms nor modifiers were found
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.modifiers.is_empty()
    }

    fn push_modifier(&mut self, modifier: Modifier, value: &str) {
        self.modifiers
            .entry(modifier)
            .or_default()
            .push(value.trim().to_string());
    }
}

/// Split a raw query into free-text terms and modifier values.
///
/// The input is lowercased first. Scanning goes left to right: at each run of
/// non-whitespace the modifier pattern is tried, otherwise the run up to the
/// next whitespace is taken as a free-text term. Nothing is validated against
/// a store here.
pub fn tokenize_query(query: &str) -> ParsedQuery {
    let lowered = query.to_lowercase();
    let pattern = modifier_pattern();
    let mut parsed = ParsedQuery::default();
    let mut rest = lowered.as_str();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        if let Some(caps) = pattern.captures(rest) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let consumed = caps.get(0).map(|m| m.end()).unwrap_or(rest.len());

            // The pattern only admits known names
            if let Some(modifier) = Modifier::from_name(name) {
                parsed.push_modifier(modifier, value);
            }
            rest = &rest[consumed..];
            continue;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        parsed.terms.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    tracing::trace!(
        terms = parsed.terms.len(),
        modifiers = parsed.modifiers.len(),
        "tokenized query"
    );
    parsed
}
