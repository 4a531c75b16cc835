use std::cmp::Ordering;

use crate::scoring::{FuzzyMatcher, MatchKind, MatchScore};

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    pub name: String,
    pub kind: MatchKind,
    /// Combined score, see [`MatchScore::value`].
    pub score: i64,
}

impl Ranked {
    fn new(name: String, score: MatchScore) -> Self {
        Self {
            name,
            kind: score.kind,
            score: score.value(),
        }
    }
}

pub(crate) fn cmp_ranked(a: &Ranked, b: &Ranked) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.name.len().cmp(&b.name.len()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Scores `candidates` against `query` and returns the matching ones.
///
/// Results are sorted by descending score, then shorter name, then
/// lexicographically. Candidates that do not contain the query as a
/// (case-insensitive) subsequence are dropped. The function is pure: the same
/// inputs always produce the same output.
pub fn rank<I, S>(query: &str, candidates: I) -> Vec<Ranked>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut matcher = FuzzyMatcher::new(query);
    let mut out: Vec<Ranked> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let name = candidate.as_ref();
            matcher
                .score(name)
                .map(|score| Ranked::new(name.to_owned(), score))
        })
        .collect();
    out.sort_by(cmp_ranked);
    out
}
