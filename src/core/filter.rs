// lx - core/filter.rs
//
// Substring-AND filter engine for log entries.
// Query language: whitespace-separated terms, all AND-combined; a term
// prefixed with `!` excludes lines containing it. Case-insensitive.
// Core layer: pure logic, no I/O or UI dependencies.

use crate::core::model::{Entry, Level};

/// One query term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTerm {
    /// Lower-cased needle.
    pub text: String,
    /// True when the term was prefixed with `!`.
    pub negate: bool,
}

/// A compiled query. Stateless; rebuilt from the query string on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub terms: Vec<FilterTerm>,
}

impl Filter {
    /// Returns true if the filter has no terms (matches everything).
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Check `text` against every term, honouring each term's polarity.
    pub fn matches(&self, text: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        let lower = text.to_lowercase();
        self.matches_lowered(&lower)
    }

    fn matches_lowered(&self, lower: &str) -> bool {
        self.terms
            .iter()
            .all(|term| lower.contains(term.text.as_str()) != term.negate)
    }
}

/// Compile a query string. Never fails: an empty or whitespace-only query
/// yields an empty filter, and a bare `!` is dropped.
pub fn build_filter(query: &str) -> Filter {
    let terms = query
        .split_whitespace()
        .filter_map(|part| {
            let (negate, text) = match part.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, part),
            };
            if text.is_empty() {
                return None;
            }
            Some(FilterTerm {
                text: text.to_lowercase(),
                negate,
            })
        })
        .collect();
    Filter { terms }
}

/// Apply a filter to entries, returning the indices of surviving entries.
///
/// An entry survives when it is not soft-deleted, its level equals `level`
/// (if given), and its raw text satisfies every term. Output follows entry
/// order and contains `Entry::index` values, not copies.
pub fn evaluate(entries: &[Entry], filter: &Filter, level: Option<Level>) -> Vec<usize> {
    entries
        .iter()
        .filter(|entry| !entry.deleted)
        .filter(|entry| level.map_or(true, |l| entry.level == l))
        .filter(|entry| filter.is_empty() || filter.matches_lowered(&entry.raw.to_lowercase()))
        .map(|entry| entry.index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::classify;

    fn make_entries(raws: &[&str]) -> Vec<Entry> {
        raws.iter()
            .enumerate()
            .map(|(i, raw)| classify(raw, i))
            .collect()
    }

    #[test]
    fn test_empty_filter_returns_all() {
        let entries = make_entries(&["foo", "bar", "baz"]);
        assert_eq!(evaluate(&entries, &build_filter(""), None), vec![0, 1, 2]);
        assert_eq!(evaluate(&entries, &build_filter("   \t "), None), vec![0, 1, 2]);
    }

    #[test]
    fn test_simple_term() {
        let entries = make_entries(&["error: something", "info: all good", "error: another"]);
        assert_eq!(evaluate(&entries, &build_filter("error"), None), vec![0, 2]);
    }

    #[test]
    fn test_case_insensitive() {
        let entries = make_entries(&["ERROR: uppercase", "error: lowercase", "ErRoR: mixed"]);
        assert_eq!(evaluate(&entries, &build_filter("eRRor"), None).len(), 3);
    }

    #[test]
    fn test_negation() {
        let entries = make_entries(&["error: bad", "info: good", "debug: trace"]);
        assert_eq!(evaluate(&entries, &build_filter("!error"), None), vec![1, 2]);
    }

    #[test]
    fn test_and_of_terms() {
        let entries = make_entries(&[
            "error timeout in database",
            "error network failure",
            "info timeout handled",
        ]);
        assert_eq!(evaluate(&entries, &build_filter("error timeout"), None), vec![0]);
        assert_eq!(evaluate(&entries, &build_filter("timeout !error"), None), vec![2]);
    }

    #[test]
    fn test_deleted_entries_excluded() {
        let mut entries = make_entries(&["foo", "bar", "baz"]);
        entries[1].deleted = true;
        assert_eq!(evaluate(&entries, &build_filter(""), None), vec![0, 2]);
        assert_eq!(evaluate(&entries, &build_filter("bar"), None), Vec::<usize>::new());
        assert_eq!(evaluate(&entries, &build_filter("!foo"), None), vec![2]);
    }

    #[test]
    fn test_level_constraint() {
        let entries = make_entries(&["ERROR a", "[WARN] b", "ERROR c timeout"]);
        assert_eq!(evaluate(&entries, &build_filter(""), Some(Level::Error)), vec![0, 2]);
        assert_eq!(
            evaluate(&entries, &build_filter("timeout"), Some(Level::Error)),
            vec![2]
        );
        assert_eq!(evaluate(&entries, &build_filter(""), Some(Level::Debug)), Vec::<usize>::new());
    }

    #[test]
    fn test_matches_direct() {
        let f = build_filter("goku !frieza");
        assert!(f.matches("goku is training"));
        assert!(!f.matches("goku vs frieza"));
        assert!(!f.matches("vegeta is here"));
    }

    #[test]
    fn test_bare_bang_is_dropped() {
        let f = build_filter("! error !");
        assert_eq!(
            f.terms,
            vec![FilterTerm {
                text: "error".to_string(),
                negate: false
            }]
        );
    }

    #[test]
    fn test_repeated_terms_are_harmless() {
        let entries = make_entries(&["error x", "info y"]);
        assert_eq!(evaluate(&entries, &build_filter("error error ERROR"), None), vec![0]);
    }

    #[test]
    fn test_terms_are_lowercased() {
        let f = build_filter("TimeOut !DB");
        assert_eq!(f.terms[0].text, "timeout");
        assert!(f.terms[1].negate);
        assert_eq!(f.terms[1].text, "db");
    }

    #[test]
    fn test_matches_raw_not_message() {
        // The JSON message is "x" but the raw text carries the level field.
        let entries = make_entries(&[r#"{"msg":"x","level":"warn"}"#]);
        assert_eq!(evaluate(&entries, &build_filter("warn"), None), vec![0]);
    }
}
