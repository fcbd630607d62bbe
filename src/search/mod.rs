pub mod matcher;
pub mod pattern;

pub use matcher::{clean_query, MatchTier, Matcher};
pub use pattern::PatternTier;
