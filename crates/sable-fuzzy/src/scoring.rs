use std::cmp::Ordering;

/// The kind of match that was produced.
///
/// Variants are declared from weakest to strongest, so the derived ordering
/// can be used directly when ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKind {
    /// Query characters appear in order, but not contiguously.
    Fuzzy,
    /// `candidate` contains `query` somewhere after its first character.
    Substring,
    /// `candidate` starts with `query`.
    Prefix,
    /// `candidate` equals `query` (ASCII case-insensitive).
    Exact,
}

/// Score returned by [`fuzzy_match`] and [`FuzzyMatcher::score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    pub kind: MatchKind,
    pub score: i32,
}

/// A key that defines stable ordering for matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankKey {
    kind: MatchKind,
    score: i32,
}

impl MatchScore {
    pub fn rank_key(self) -> RankKey {
        RankKey {
            kind: self.kind,
            score: self.score,
        }
    }

    /// Collapses kind and score into a single comparable number.
    ///
    /// The kind occupies the high 32 bits, so any match of a stronger kind
    /// compares greater than every match of a weaker one.
    pub fn value(self) -> i64 {
        ((self.kind as i64) << 32) + i64::from(self.score)
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.kind, self.score).cmp(&(other.kind, other.score))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn fold_byte(b: u8) -> u8 {
    b.to_ascii_lowercase()
}

#[inline]
fn is_separator(b: u8) -> bool {
    matches!(
        b,
        b'_' | b'-' | b' ' | b'/' | b'\\' | b'.' | b':' | b'<' | b'>' | b'(' | b')' | b'['
            | b']' | b'$'
    )
}

#[inline]
fn is_word_start(candidate: &[u8], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    let prev = candidate[i - 1];
    let b = candidate[i];
    is_separator(prev)
        || (prev.is_ascii_lowercase() && b.is_ascii_uppercase())
        || (prev.is_ascii_alphabetic() && b.is_ascii_digit())
        || (prev.is_ascii_digit() && b.is_ascii_alphabetic())
}

fn case_bonus(query: u8, candidate: u8) -> i32 {
    if query == candidate {
        2
    } else {
        0
    }
}

fn find_folded(candidate: &[u8], query_folded: &[u8]) -> Option<usize> {
    if query_folded.len() > candidate.len() {
        return None;
    }
    candidate.windows(query_folded.len()).position(|window| {
        window
            .iter()
            .zip(query_folded)
            .all(|(&c, &q)| fold_byte(c) == q)
    })
}

const MIN_SCORE: i32 = i32::MIN / 4;

const BASE_MATCH: i32 = 10;
const BONUS_WORD_START: i32 = 15;
const BONUS_CONSECUTIVE: i32 = 5;
const GAP_PENALTY: i32 = 1;
const LEADING_PENALTY: i32 = 1;
const TRAILING_PENALTY: i32 = 1;

/// Reusable matcher for one query; scratch buffers survive across candidates.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    query: String,
    query_folded: Vec<u8>,
    dp_prev: Vec<i32>,
    dp_cur: Vec<i32>,
    word_starts: Vec<bool>,
}

impl FuzzyMatcher {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_owned(),
            query_folded: query.bytes().map(fold_byte).collect(),
            dp_prev: Vec::new(),
            dp_cur: Vec::new(),
            word_starts: Vec::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn score(&mut self, candidate: &str) -> Option<MatchScore> {
        let q = self.query.as_bytes();
        let c = candidate.as_bytes();

        if q.is_empty() {
            return Some(MatchScore {
                kind: MatchKind::Prefix,
                score: 0,
            });
        }

        match find_folded(c, &self.query_folded) {
            Some(0) => {
                let case_matches = c.iter().zip(q).filter(|(a, b)| a == b).count() as i32;
                let kind = if c.len() == q.len() {
                    MatchKind::Exact
                } else {
                    MatchKind::Prefix
                };
                // Shorter candidates and exact case win within the kind.
                let score = 2 * case_matches - (c.len() - q.len()) as i32;
                Some(MatchScore { kind, score })
            }
            Some(_) => self.subsequence_score(c).map(|score| MatchScore {
                kind: MatchKind::Substring,
                score,
            }),
            None => self.subsequence_score(c).map(|score| MatchScore {
                kind: MatchKind::Fuzzy,
                score,
            }),
        }
    }

    fn subsequence_score(&mut self, candidate: &[u8]) -> Option<i32> {
        let query = self.query.as_bytes();
        if query.len() > candidate.len() {
            return None;
        }

        let n = candidate.len();
        self.dp_prev.clear();
        self.dp_prev.resize(n, MIN_SCORE);
        self.dp_cur.clear();
        self.dp_cur.resize(n, MIN_SCORE);
        self.word_starts.clear();
        self.word_starts
            .extend((0..n).map(|i| is_word_start(candidate, i)));

        let q0 = query[0];
        let q0_folded = self.query_folded[0];
        for (j, &c) in candidate.iter().enumerate() {
            if fold_byte(c) != q0_folded {
                continue;
            }
            let mut score = BASE_MATCH;
            if self.word_starts[j] {
                score += BONUS_WORD_START;
            }
            score += case_bonus(q0, c);
            score -= LEADING_PENALTY * (j as i32);
            self.dp_prev[j] = score;
        }

        for i in 1..query.len() {
            self.dp_cur.fill(MIN_SCORE);
            let q = query[i];
            let q_folded = self.query_folded[i];

            // running_max = max_{k<j} dp_prev[k] + GAP_PENALTY * (k + 1)
            let mut running_max = MIN_SCORE;
            for (j, &c) in candidate.iter().enumerate() {
                if j > 0 {
                    let prev = self.dp_prev[j - 1];
                    if prev > MIN_SCORE / 2 {
                        running_max = running_max.max(prev + GAP_PENALTY * (j as i32));
                    }
                }

                if fold_byte(c) != q_folded {
                    continue;
                }

                let prev_non_consecutive = if running_max > MIN_SCORE / 2 {
                    running_max - GAP_PENALTY * (j as i32)
                } else {
                    MIN_SCORE
                };
                let prev_consecutive = if j > 0 {
                    self.dp_prev[j - 1] + BONUS_CONSECUTIVE
                } else {
                    MIN_SCORE
                };
                let prev_best = prev_non_consecutive.max(prev_consecutive);
                if prev_best <= MIN_SCORE / 2 {
                    continue;
                }

                let mut score = prev_best + BASE_MATCH;
                if self.word_starts[j] {
                    score += BONUS_WORD_START;
                }
                score += case_bonus(q, c);
                self.dp_cur[j] = score;
            }

            std::mem::swap(&mut self.dp_prev, &mut self.dp_cur);
        }

        let best = self
            .dp_prev
            .iter()
            .enumerate()
            .filter(|(_, &score)| score > MIN_SCORE / 2)
            .map(|(j, &score)| score - TRAILING_PENALTY * (n - 1 - j) as i32)
            .max()?;
        Some(best)
    }
}

/// Fuzzy match `query` against `candidate`.
///
/// Convenience wrapper around a one-shot [`FuzzyMatcher`]. Prefer the
/// matcher when scoring many candidates against the same query.
pub fn fuzzy_match(query: &str, candidate: &str) -> Option<MatchScore> {
    FuzzyMatcher::new(query).score(candidate)
}
