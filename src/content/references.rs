//! Locating path-like references in free text.
//!
//! The reference heuristic is deliberately loose: a whitespace-free, `@`-free
//! token, optionally containing `/`, that ends in a dot-extension of ASCII
//! alphanumerics. Callers filter candidates by whether the file exists.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:[^\s@]+/)*[^\s@/]+\.[a-zA-Z0-9]+").expect("reference pattern is valid")
    })
}

/// A path-like token located in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub path: String,
    /// Byte span of the token in the text
    pub span: Range<usize>,
}

/// All candidate references in `text`, in order of appearance.
pub fn find_references(text: &str) -> Vec<FileReference> {
    reference_regex()
        .find_iter(text)
        .map(|m| FileReference {
            path: m.as_str().to_string(),
            span: m.range(),
        })
        .collect()
}

/// An `@query` under the cursor, as typed while picking a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtQuery {
    /// Byte offset of the `@`
    pub start: usize,
    /// Byte offset just past the query token
    pub end: usize,
    /// Text after the `@`, up to `end`
    pub query: String,
}

/// Find the `@query` token containing the byte offset `cursor`.
///
/// Scans backwards from the cursor for `@`, giving up at whitespace, then
/// forwards to the end of the token.
pub fn find_at_query(text: &str, cursor: usize) -> Option<AtQuery> {
    if cursor == 0 || cursor > text.len() || !text.is_char_boundary(cursor) {
        return None;
    }

    let mut start = None;
    for (idx, ch) in text[..cursor].char_indices().rev() {
        if ch == '@' {
            start = Some(idx);
            break;
        }
        if ch.is_whitespace() {
            return None;
        }
    }
    let start = start?;

    let end = text[cursor..]
        .char_indices()
        .find(|(_, ch)| ch.is_whitespace())
        .map(|(idx, _)| cursor + idx)
        .unwrap_or(text.len());

    Some(AtQuery {
        start,
        end,
        query: text[start + 1..end].to_string(),
    })
}

/// Replace an `@query` token with the chosen path.
pub fn replace_at_query(text: &str, at: &AtQuery, path: &str) -> String {
    let mut result = String::with_capacity(text.len() + path.len());
    result.push_str(&text[..at.start]);
    result.push_str(path);
    result.push_str(&text[at.end..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(text: &str) -> Vec<String> {
        find_references(text).into_iter().map(|r| r.path).collect()
    }

    #[test]
    fn test_find_references() {
        assert_eq!(paths("see a/foo.py and bar.py."), vec!["a/foo.py", "bar.py"]);
        assert_eq!(paths("no refs here"), Vec::<String>::new());
        assert_eq!(paths("deep/nested/dir/file.rs,"), vec!["deep/nested/dir/file.rs"]);
    }

    #[test]
    fn test_reference_spans() {
        let text = "see a/foo.py";
        let refs = find_references(text);
        assert_eq!(refs.len(), 1);
        assert_eq!(&text[refs[0].span.clone()], "a/foo.py");
        assert_eq!(refs[0].span, 4..12);
    }

    #[test]
    fn test_at_sigil_splits_tokens() {
        assert_eq!(paths("@main.rs"), vec!["main.rs"]);
        assert_eq!(paths("user@example.com"), vec!["example.com"]);
    }

    #[test]
    fn test_find_at_query() {
        let text = "look at @foo.p please";
        let cursor = "look at @foo.p".len();
        let at = find_at_query(text, cursor).unwrap();
        assert_eq!(at.start, 8);
        assert_eq!(at.end, cursor);
        assert_eq!(at.query, "foo.p");
    }

    #[test]
    fn test_find_at_query_extends_to_token_end() {
        let text = "@src/ma and more";
        let at = find_at_query(text, 3).unwrap();
        assert_eq!(at.query, "src/ma");
        assert_eq!(at.end, 7);
    }

    #[test]
    fn test_find_at_query_none() {
        assert!(find_at_query("plain words", 5).is_none());
        assert!(find_at_query("@foo bar", 7).is_none());
        assert!(find_at_query("@foo", 0).is_none());
        assert!(find_at_query("@foo", 99).is_none());
    }

    #[test]
    fn test_replace_at_query() {
        let text = "see @fo now";
        let at = find_at_query(text, 7).unwrap();
        assert_eq!(replace_at_query(text, &at, "a/foo.py"), "see a/foo.py now");
    }
}
