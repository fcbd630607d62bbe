//! Tiered file-name matching over an index snapshot.
//!
//! Every search key is compared case-insensitively against the query and
//! placed in the best tier it qualifies for:
//!
//! 1. exact match
//! 2. prefix match
//! 3. substring match
//! 4. regular-expression match (skipped when the query is not a valid pattern)
//!
//! Tiers are concatenated in priority order, skipping paths already emitted,
//! until the limit is reached. Matching is a pure read of the snapshot.

use crate::index::IndexSnapshot;
use crate::search::pattern::PatternTier;
use rustc_hash::FxHashSet;

/// Priority class of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    Prefix,
    Substring,
    Pattern,
}

const TIER_COUNT: usize = 4;

impl MatchTier {
    fn slot(self) -> usize {
        self as usize
    }
}

/// Strip surrounding whitespace and a leading `@` sigil.
pub fn clean_query(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}

/// Query engine over a snapshot.
pub struct Matcher<'a> {
    snapshot: &'a IndexSnapshot,
}

impl<'a> Matcher<'a> {
    pub fn new(snapshot: &'a IndexSnapshot) -> Self {
        Self { snapshot }
    }

    /// Return up to `limit` distinct relative paths, best matches first.
    ///
    /// An empty query, an empty index or no match yields an empty list.
    pub fn search(&self, raw_query: &str, limit: usize) -> Vec<String> {
        self.search_ranked(raw_query, limit)
            .into_iter()
            .map(|(path, _)| path.to_string())
            .collect()
    }

    /// Like [`Matcher::search`], keeping the tier each path was found in.
    pub fn search_ranked(&self, raw_query: &str, limit: usize) -> Vec<(&'a str, MatchTier)> {
        let query = clean_query(raw_query);
        if query.is_empty() || limit == 0 || self.snapshot.is_empty() {
            return Vec::new();
        }

        let query_lower = query.to_lowercase();
        let pattern = PatternTier::compile(query);

        let mut tiers: [Vec<&'a str>; TIER_COUNT] = Default::default();
        for entry in self.snapshot.entries() {
            let tier = if entry.key_lower == query_lower {
                MatchTier::Exact
            } else if entry.key_lower.starts_with(&query_lower) {
                MatchTier::Prefix
            } else if entry.key_lower.contains(&query_lower) {
                MatchTier::Substring
            } else if pattern.is_match(&entry.key) {
                MatchTier::Pattern
            } else {
                continue;
            };
            tiers[tier.slot()].extend(entry.paths.iter().map(String::as_str));
        }

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut results = Vec::with_capacity(limit.min(64));
        let order = [
            MatchTier::Exact,
            MatchTier::Prefix,
            MatchTier::Substring,
            MatchTier::Pattern,
        ];
        for tier in order {
            for &path in &tiers[tier.slot()] {
                if results.len() >= limit {
                    return results;
                }
                if seen.insert(path) {
                    results.push((path, tier));
                }
            }
        }

        results
    }
}
