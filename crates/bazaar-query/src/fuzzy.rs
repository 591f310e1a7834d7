use regex::{Regex, RegexBuilder};

/// Compiled-size ceiling for a search pattern.
const SIZE_LIMIT: usize = 1 << 20;

fn compile(pattern: &str, size_limit: usize) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(size_limit)
        .build()
}

/// Build the loose "characters in order, any gap" pattern for a search term.
///
/// Every character is matched literally and any run of characters may sit
/// between two of them, case-insensitively. `"ab"` therefore matches
/// `"a-label"`. Blank terms yield `None`; a term too large to compile yields
/// `Some(Err(_))`, and callers must treat it as matching nothing.
pub fn subsequence_pattern(term: &str) -> Option<Result<Regex, regex::Error>> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }

    let mut buf = [0u8; 4];
    let pieces: Vec<String> = term
        .chars()
        .map(|c| regex::escape(c.encode_utf8(&mut buf)))
        .collect();

    Some(compile(&pieces.join(".*"), SIZE_LIMIT))
}

/// Case-insensitive literal substring pattern. Blank terms yield `None`,
/// oversized ones `Some(Err(_))` as for [`subsequence_pattern`].
pub fn substring_pattern(term: &str) -> Option<Result<Regex, regex::Error>> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    Some(compile(&regex::escape(term), SIZE_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_term_has_no_pattern() {
        assert!(subsequence_pattern("").is_none());
        assert!(subsequence_pattern("   ").is_none());
    }

    #[test]
    fn matches_characters_in_order_with_gaps() {
        let re = subsequence_pattern("tle").unwrap().unwrap();
        assert!(re.is_match("Tile"));
        assert!(re.is_match("TITLE"));
        assert!(!re.is_match("let"));
    }

    #[test]
    fn loose_match_across_words() {
        let re = subsequence_pattern("ab").unwrap().unwrap();
        assert!(re.is_match("a label"));
        assert!(!re.is_match("ba"));
    }

    #[test]
    fn metacharacters_are_literal() {
        let re = subsequence_pattern("a.b").unwrap().unwrap();
        assert!(re.is_match("a.xb"));
        assert!(!re.is_match("axxb"));

        let re = subsequence_pattern("(1+").unwrap().unwrap();
        assert!(re.is_match("x(1 +"));
    }

    #[test]
    fn substring_is_contiguous_and_literal() {
        let re = substring_pattern("Til").unwrap().unwrap();
        assert!(re.is_match("glossy tiles"));
        assert!(!re.is_match("t-i-l"));
        assert!(substring_pattern(" ").is_none());
        assert!(substring_pattern("a+").unwrap().unwrap().is_match("A+B"));
    }

    #[test]
    fn oversized_terms_report_an_error() {
        assert!(compile("tile", 16).is_err());

        let huge = "a".repeat(200_000);
        assert!(matches!(subsequence_pattern(&huge), Some(Err(_))));
        assert!(matches!(substring_pattern(&"b".repeat(2_000_000)), Some(Err(_))));
    }
}
