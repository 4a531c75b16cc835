//! Completion-oriented match classification.

use crate::scoring::fuzzy_match;

/// How well a completion candidate matches the typed prefix.
///
/// Variants are ordered from worst to best so the level can be used as a
/// sort key directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchLevel {
    NotMatch,
    Partial,
    CaseInsensitivePrefix,
    CaseSensitivePrefix,
    CaseInsensitiveEqual,
    CaseSensitiveEqual,
}

/// Classifies `candidate` against the completion `prefix`.
///
/// Anything that is not a prefix match but still contains the prefix as a
/// subsequence is [`MatchLevel::Partial`].
pub fn match_level(prefix: &str, candidate: &str) -> MatchLevel {
    if candidate.starts_with(prefix) {
        return if candidate.len() == prefix.len() {
            MatchLevel::CaseSensitiveEqual
        } else {
            MatchLevel::CaseSensitivePrefix
        };
    }

    let is_ci_prefix = candidate.len() >= prefix.len()
        && candidate.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes());
    if is_ci_prefix {
        return if candidate.len() == prefix.len() {
            MatchLevel::CaseInsensitiveEqual
        } else {
            MatchLevel::CaseInsensitivePrefix
        };
    }

    if fuzzy_match(prefix, candidate).is_some() {
        MatchLevel::Partial
    } else {
        MatchLevel::NotMatch
    }
}

/// Weight applied by completion sorting for prefix closeness: 200 for an
/// exact match, 100 for a case-sensitive prefix, 50 for a case-insensitive
/// prefix, 0 otherwise (including an empty prefix).
pub fn prefix_weight(prefix: &str, candidate: &str) -> i32 {
    if prefix.is_empty() {
        return 0;
    }
    match match_level(prefix, candidate) {
        MatchLevel::CaseSensitiveEqual => 200,
        MatchLevel::CaseSensitivePrefix => 100,
        MatchLevel::CaseInsensitiveEqual | MatchLevel::CaseInsensitivePrefix => 50,
        MatchLevel::Partial | MatchLevel::NotMatch => 0,
    }
}
