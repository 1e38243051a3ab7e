use crate::errors::InvalidInputError;
use anyhow::Result;
use regex::{NoExpand, Regex};
use std::borrow::Cow;

/// Characters of surrounding text reported on each side of a pattern match.
pub const CONTEXT_WINDOW_CHARS: usize = 50;

/// Ordered, non-empty list of search keywords.
///
/// Order matters: it drives row coloring in the result workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordSet {
    /// Trims each keyword and drops blanks; fails when nothing is left.
    pub fn new<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = raw
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(InvalidInputError::new("search", "at least one keyword is required")
                .with_field("keywords")
                .with_suggestion("provide one or more non-blank keywords")
                .into());
        }
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();
        Ok(Self { keywords, lowered })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Zero-based position of `keyword` in the set.
    pub fn position(&self, keyword: &str) -> Option<usize> {
        self.keywords.iter().position(|k| k == keyword)
    }

    /// Keywords contained in `text`, case-insensitively, in set order.
    ///
    /// Each keyword is reported at most once per text regardless of how often it occurs.
    pub fn matches(&self, text: &str) -> Vec<&str> {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .zip(self.lowered.iter())
            .filter(|(_, lowered)| haystack.contains(lowered.as_str()))
            .map(|(keyword, _)| keyword.as_str())
            .collect()
    }
}

/// One non-overlapping hit of a [`ReplacePattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Character offsets into the searched text.
    pub start: usize,
    pub end: usize,
    /// Byte offsets, for slicing the searched text.
    pub byte_start: usize,
    pub byte_end: usize,
    pub text: String,
    pub context_before: String,
    pub context_after: String,
}

/// A compiled bulk-replace pattern: either an escaped literal or a user regex.
#[derive(Debug, Clone)]
pub struct ReplacePattern {
    regex: Regex,
    literal: bool,
}

impl ReplacePattern {
    pub fn compile(pattern: &str, use_regex: bool) -> Result<Self> {
        if pattern.is_empty() {
            return Err(
                InvalidInputError::new("search_replace", "search pattern must not be empty")
                    .with_field("search_pattern")
                    .into(),
            );
        }
        let source = if use_regex {
            Cow::Borrowed(pattern)
        } else {
            Cow::Owned(regex::escape(pattern))
        };
        let regex = Regex::new(&source).map_err(|e| {
            InvalidInputError::new("search_replace", format!("invalid regular expression: {e}"))
                .with_field("search_pattern")
                .with_suggestion("disable use_regex to search for the text literally")
        })?;
        Ok(Self {
            regex,
            literal: !use_regex,
        })
    }

    pub fn find_matches(&self, text: &str) -> Vec<PatternMatch> {
        let mut out = Vec::new();
        let mut scanned_bytes = 0;
        let mut scanned_chars = 0;
        for m in self.regex.find_iter(text) {
            scanned_chars += text[scanned_bytes..m.start()].chars().count();
            scanned_bytes = m.start();
            let start = scanned_chars;
            let end = start + m.as_str().chars().count();

            out.push(PatternMatch {
                start,
                end,
                byte_start: m.start(),
                byte_end: m.end(),
                text: m.as_str().to_string(),
                context_before: tail_chars(&text[..m.start()], CONTEXT_WINDOW_CHARS).to_string(),
                context_after: head_chars(&text[m.end()..], CONTEXT_WINDOW_CHARS).to_string(),
            });
        }
        out
    }

    /// Replace every match. Literal patterns insert `replacement` verbatim; regex patterns expand
    /// `$1` / `${name}` group references.
    pub fn replace_all<'t>(&self, text: &'t str, replacement: &str) -> Cow<'t, str> {
        if self.literal {
            self.regex.replace_all(text, NoExpand(replacement))
        } else {
            self.regex.replace_all(text, replacement)
        }
    }
}

fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InvalidInputError;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn keywords_are_trimmed_and_blanks_dropped() {
        let set = KeywordSet::new([" invoice ", "", "  ", "Total"]).unwrap();
        assert_eq!(set.as_slice(), &["invoice".to_string(), "Total".to_string()]);
    }

    #[test]
    fn blank_keyword_list_is_invalid_input() {
        let err = KeywordSet::new(["", " "]).unwrap_err();
        assert_matches!(err.downcast_ref::<InvalidInputError>(), Some(e) if e.field() == Some("keywords"));
    }

    #[test]
    fn matching_is_case_insensitive_containment() {
        let set = KeywordSet::new(["invoice", "2024", "missing"]).unwrap();
        let hits = set.matches("Invoice 2024");
        assert_eq!(hits, vec!["invoice", "2024"]);
    }

    #[test]
    fn overlapping_keywords_each_report() {
        let set = KeywordSet::new(["inv", "invoice"]).unwrap();
        assert_eq!(set.matches("INVOICE").len(), 2);
    }

    #[test]
    fn literal_pattern_escapes_metacharacters() {
        let pattern = ReplacePattern::compile("a.b", false).unwrap();
        assert!(pattern.find_matches("axb").is_empty());
        assert_eq!(pattern.find_matches("1 a.b 2").len(), 1);
        assert_eq!(pattern.replace_all("a.b", "$1"), "$1");
    }

    #[test]
    fn regex_replacement_expands_groups() {
        let pattern = ReplacePattern::compile(r"(\d+)-(\d+)", true).unwrap();
        assert_eq!(pattern.replace_all("10-20", "${2}-${1}"), "20-10");
    }

    #[test]
    fn invalid_regex_is_invalid_input() {
        let err = ReplacePattern::compile("(unclosed", true).unwrap_err();
        assert_matches!(err.downcast_ref::<InvalidInputError>(), Some(_));
        let err = ReplacePattern::compile("", false).unwrap_err();
        assert_matches!(err.downcast_ref::<InvalidInputError>(), Some(e) if e.field() == Some("search_pattern"));
    }

    #[test]
    fn offsets_and_context_are_in_characters() {
        let pattern = ReplacePattern::compile("é", false).unwrap();
        let text = "ab é cd é";
        let found = pattern.find_matches(text);
        assert_eq!(found.len(), 2);
        assert_eq!((found[0].start, found[0].end), (3, 4));
        assert_eq!((found[1].start, found[1].end), (8, 9));
        assert_eq!(found[0].context_before, "ab ");
        assert_eq!(found[0].context_after, " cd é");
    }

    #[test]
    fn context_windows_are_clamped_to_fifty_chars() {
        let text = format!("{}X{}", "a".repeat(80), "b".repeat(80));
        let pattern = ReplacePattern::compile("X", false).unwrap();
        let found = pattern.find_matches(&text);
        assert_eq!(found[0].context_before, "a".repeat(50));
        assert_eq!(found[0].context_after, "b".repeat(50));
    }

    proptest! {
        #[test]
        fn match_count_equals_contained_keywords(
            text in "[a-cA-C ]{0,12}",
            keywords in proptest::collection::vec("[a-cA-C]{1,3}", 1..5),
        ) {
            let set = KeywordSet::new(&keywords).unwrap();
            let expected = keywords
                .iter()
                .filter(|k| text.to_lowercase().contains(&k.to_lowercase()))
                .count();
            prop_assert_eq!(set.matches(&text).len(), expected);
        }
    }
}
