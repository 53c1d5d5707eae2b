//! Author name normalization and fuzzy matching.
//!
//! Users type names as "Last, First", "First Last", initials or a bare surname.
//! Stored names are "first last". A typed name becomes a [`NamePattern`]: a
//! prefix-style pattern whose tokens must appear in order, plus a rank key used
//! to order candidates by similarity.

use strsim::sorensen_dice;

/// Normalize a typed author name into ordered lowercase tokens.
///
/// "Hogg, David" and "David Hogg" both become `["david", "hogg"]`. A single
/// remaining token is padded with a leading empty token so a bare surname
/// anchors against the last word of a stored "first last" name.
pub fn normalize_author_name(name: &str) -> Vec<String> {
    let lowered = name.to_lowercase();

    // "last, first" → "first last"
    let reordered = lowered.split(',').rev().collect::<Vec<_>>().join(" ");

    let mut tokens: Vec<String> = reordered
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if tokens.len() == 1 {
        tokens.insert(0, String::new());
    }
    tokens
}

/// Prefix-style author name pattern.
///
/// Equivalent to the SQL pattern `t0% t1% ... tn` on the lowercase full name:
/// the name starts with the first token, each following token starts a word
/// further along, and the last token ends the name. Open-ended patterns (used
/// for autocomplete) accept anything after the last token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    tokens: Vec<String>,
    open_ended: bool,
}

impl NamePattern {
    /// Pattern for a typed author name, `None` when no usable token remains
    pub fn parse(name: &str) -> Option<Self> {
        let tokens = normalize_author_name(name);
        if tokens.iter().all(String::is_empty) {
            return None;
        }
        Some(Self {
            tokens,
            open_ended: false,
        })
    }

    /// Open-ended pattern for autocomplete on a partially typed name
    pub fn prefix(name: &str) -> Option<Self> {
        Self::parse(name).map(|pattern| Self {
            open_ended: true,
            ..pattern
        })
    }

    /// Plain comparison string used for similarity ranking
    pub fn rank_key(&self) -> String {
        self.tokens.join(" ")
    }

    /// The pattern as a SQL `LIKE` string, to be used with `ESCAPE '\'`
    pub fn like_pattern(&self) -> String {
        let mut pattern = self
            .tokens
            .iter()
            .map(|t| escape_like(t))
            .collect::<Vec<_>>()
            .join("% ");
        if self.open_ended {
            pattern.push('%');
        }
        pattern
    }

    /// Whether a stored full name matches this pattern (case-insensitive)
    pub fn matches(&self, full_name: &str) -> bool {
        let name = full_name.to_lowercase();
        let (first, rest) = match self.tokens.split_first() {
            Some(split) => split,
            None => return false,
        };

        if !name.starts_with(first.as_str()) {
            return false;
        }
        let mut pos = first.len();

        let Some((last, middle)) = rest.split_last() else {
            return self.open_ended || pos == name.len();
        };

        for token in middle {
            let segment = format!(" {token}");
            match name[pos..].find(&segment) {
                Some(idx) => pos += idx + segment.len(),
                None => return false,
            }
        }

        let segment = format!(" {last}");
        if self.open_ended {
            name[pos..].contains(&segment)
        } else {
            name.len() >= pos + segment.len() && name[pos..].ends_with(&segment)
        }
    }

    /// Similarity between a stored full name and the rank key, in `[0, 1]`
    pub fn similarity(&self, full_name: &str) -> f64 {
        sorensen_dice(&full_name.to_lowercase(), &self.rank_key())
    }
}

/// Escape `LIKE` wildcards and the escape character itself
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Sort candidate ids and names by similarity to the pattern, best first.
///
/// Ties are broken by id so the order is stable across calls.
pub fn rank_by_similarity<T>(pattern: &NamePattern, candidates: &mut [T], key: impl Fn(&T) -> (i64, &str)) {
    candidates.sort_by(|a, b| {
        let (id_a, name_a) = key(a);
        let (id_b, name_b) = key(b);
        pattern
            .similarity(name_b)
            .total_cmp(&pattern.similarity(name_a))
            .then(id_a.cmp(&id_b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_and_space_forms_agree() {
        assert_eq!(normalize_author_name("Hogg, David"), vec!["david", "hogg"]);
        assert_eq!(normalize_author_name("David Hogg"), vec!["david", "hogg"]);
    }

    #[test]
    fn test_bare_surname_is_padded() {
        assert_eq!(normalize_author_name("hogg"), vec!["", "hogg"]);
        assert_eq!(normalize_author_name("  Hogg. "), vec!["", "hogg"]);
    }

    #[test]
    fn test_punctuation_stripped() {
        assert_eq!(
            normalize_author_name("Hogg, D. W."),
            vec!["d", "w", "hogg"]
        );
        assert_eq!(
            normalize_author_name("foreman-mackey"),
            vec!["", "foreman-mackey"]
        );
        assert!(normalize_author_name(" , . ").is_empty());
    }

    #[test]
    fn test_empty_name_has_no_pattern() {
        assert!(NamePattern::parse("").is_none());
        assert!(NamePattern::parse("...").is_none());
    }

    #[test]
    fn test_like_pattern() {
        let pattern = NamePattern::parse("Hogg, David").unwrap();
        assert_eq!(pattern.like_pattern(), "david% hogg");
        assert_eq!(pattern.rank_key(), "david hogg");

        let pattern = NamePattern::parse("hogg").unwrap();
        assert_eq!(pattern.like_pattern(), "% hogg");

        let pattern = NamePattern::parse("o_brien").unwrap();
        assert_eq!(pattern.like_pattern(), "% o\\_brien");

        let pattern = NamePattern::prefix("hog").unwrap();
        assert_eq!(pattern.like_pattern(), "% hog%");
    }

    #[test]
    fn test_matches_full_and_initial_forms() {
        let pattern = NamePattern::parse("Hogg, David").unwrap();
        assert!(pattern.matches("David W. Hogg"));
        assert!(pattern.matches("David Hogg"));
        assert!(!pattern.matches("David Hogg Jr"));
        assert!(!pattern.matches("Jo Bovy"));

        let pattern = NamePattern::parse("d hogg").unwrap();
        assert!(pattern.matches("David W. Hogg"));
        assert!(pattern.matches("D. Hogg"));
        assert!(!pattern.matches("W. D. Hogg"));
    }

    #[test]
    fn test_matches_bare_surname() {
        let pattern = NamePattern::parse("hogg").unwrap();
        assert!(pattern.matches("David W. Hogg"));
        assert!(pattern.matches("Ian Hogg"));
        assert!(!pattern.matches("Hogg"));
        assert!(!pattern.matches("Daniel Hoggart"));
    }

    #[test]
    fn test_open_ended_pattern() {
        let pattern = NamePattern::prefix("hog").unwrap();
        assert!(pattern.matches("David W. Hogg"));
        assert!(pattern.matches("Daniel Hoggart"));
        assert!(!pattern.matches("Jo Bovy"));
    }

    #[test]
    fn test_rank_by_similarity() {
        let pattern = NamePattern::parse("david hogg").unwrap();
        let mut candidates = vec![
            (3, "david w. hogg".to_string()),
            (1, "david hogg".to_string()),
            (2, "david michael hogg".to_string()),
        ];
        rank_by_similarity(&pattern, &mut candidates, |c| (c.0, c.1.as_str()));
        assert_eq!(candidates[0].0, 1);
        assert!(pattern.similarity("david hogg") > pattern.similarity("david michael hogg"));
    }
}
