//! Approximate name matching for symbol search and completion.
//!
//! Matching is ASCII case-insensitive. Candidates are classified into a
//! [`MatchKind`] (exact, prefix, substring, scattered subsequence) and scored
//! within that kind by a subsequence scorer that rewards word starts and
//! consecutive runs. [`rank`] is the pure, deterministic entry point; the
//! trigram index prefilters large candidate sets before scoring.

#![forbid(unsafe_code)]

mod levels;
mod rank;
mod scoring;
mod trigram;

pub use levels::{match_level, prefix_weight, MatchLevel};
pub use rank::{rank, Ranked};
pub use scoring::{fuzzy_match, FuzzyMatcher, MatchKind, MatchScore, RankKey};
pub use trigram::{Trigram, TrigramIndex, TrigramIndexBuilder};

/// Case-insensitive prefix match (exact matches count as prefixes).
#[inline]
pub fn prefix_match(query: &str, candidate: &str) -> bool {
    fuzzy_match(query, candidate).is_some_and(|s| s.kind >= MatchKind::Prefix)
}
