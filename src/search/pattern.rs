//! Regex tier compilation.
//!
//! The raw query doubles as a case-insensitive regular expression for the last
//! match tier. A query that does not compile simply disables that tier, so the
//! outcome is a value rather than an error.

use regex::{Regex, RegexBuilder};

/// Cap on compiled program size; queries are user typed and short.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Outcome of compiling a query for the regex tier.
#[derive(Debug)]
pub enum PatternTier {
    Compiled(Regex),
    /// The query is not a valid pattern; the tier contributes nothing
    Invalid(regex::Error),
}

impl PatternTier {
    /// Compile `query` as a case-insensitive pattern.
    pub fn compile(query: &str) -> Self {
        match RegexBuilder::new(query)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
        {
            Ok(regex) => PatternTier::Compiled(regex),
            Err(e) => {
                tracing::debug!(query = %query, error = %e, "Query is not a valid pattern, regex tier skipped");
                PatternTier::Invalid(e)
            }
        }
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            PatternTier::Compiled(regex) => regex.is_match(haystack),
            PatternTier::Invalid(_) => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, PatternTier::Compiled(_))
    }
}
