use crate::snapshot::IndexSnapshot;
use crate::symbol::Symbol;
use sable_fuzzy::{FuzzyMatcher, MatchScore, TrigramIndex, TrigramIndexBuilder};
use std::cmp::Ordering;

type SymbolId = u32;

/// Above this many symbols an unfiltered query scans only a bounded prefix.
const FULL_SCAN_LIMIT: usize = 50_000;

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub symbol: Symbol,
    pub score: MatchScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStrategy {
    Prefix,
    Trigram,
    FullScan,
}

#[derive(Debug, Clone)]
pub struct SearchStats {
    pub strategy: CandidateStrategy,
    pub candidates_considered: usize,
}

#[derive(Debug, Clone, Copy)]
struct ScoredCandidate {
    id: SymbolId,
    score: MatchScore,
}

#[derive(Debug, Clone)]
struct SymbolEntry {
    symbol: Symbol,
    fqn_differs: bool,
}

/// Fuzzy workspace-symbol search over one index snapshot.
///
/// Built once per snapshot; queries never touch the live index.
#[derive(Debug, Clone)]
pub struct SymbolSearchIndex {
    generation: u64,
    symbols: Vec<SymbolEntry>,
    trigram: TrigramIndex,
    /// First ASCII-lowercased byte of `name` or `fqn` -> symbol ids.
    prefix1: Vec<Vec<SymbolId>>,
}

impl SymbolSearchIndex {
    pub fn build(snapshot: &IndexSnapshot) -> Self {
        Self::from_symbols(snapshot.generation(), snapshot.all_symbols().cloned())
    }

    pub fn from_symbols(generation: u64, symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let symbols: Vec<SymbolEntry> = symbols
            .into_iter()
            .map(|symbol| SymbolEntry {
                fqn_differs: symbol.fqn != symbol.name,
                symbol,
            })
            .collect();

        let mut builder = TrigramIndexBuilder::new();
        let mut prefix1: Vec<Vec<SymbolId>> = vec![Vec::new(); 256];
        for (id, entry) in symbols.iter().enumerate() {
            let Ok(id) = SymbolId::try_from(id) else {
                tracing::warn!(
                    target: "sable.index",
                    "symbol search index truncated at {} entries",
                    SymbolId::MAX
                );
                break;
            };
            builder.insert(id, &entry.symbol.name);

            let name_key = first_key(&entry.symbol.name);
            if let Some(key) = name_key {
                prefix1[key as usize].push(id);
            }
            if entry.fqn_differs {
                builder.insert(id, &entry.symbol.fqn);
                let fqn_key = first_key(&entry.symbol.fqn);
                if let Some(key) = fqn_key.filter(|key| Some(*key) != name_key) {
                    prefix1[key as usize].push(id);
                }
            }
        }

        Self {
            generation,
            symbols,
            trigram: builder.build(),
            prefix1,
        }
    }

    /// Generation of the snapshot this index was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        self.search_with_stats(query, limit).0
    }

    pub fn search_with_stats(&self, query: &str, limit: usize) -> (Vec<SearchResult>, SearchStats) {
        let Some(&first) = query.as_bytes().first() else {
            return (
                Vec::new(),
                SearchStats {
                    strategy: CandidateStrategy::FullScan,
                    candidates_considered: 0,
                },
            );
        };

        enum Candidates<'a> {
            Ids(&'a [SymbolId]),
            Owned(Vec<SymbolId>),
            FullScan(usize),
        }

        let bucket = self.prefix1[first.to_ascii_lowercase() as usize].as_slice();
        let (strategy, candidates_considered, candidates) = match self.trigram.candidates(query) {
            Some(ids) if !ids.is_empty() => {
                (CandidateStrategy::Trigram, ids.len(), Candidates::Owned(ids))
            }
            // Too short for trigrams, or no substring match: acronym-style
            // queries can still hit through the first-byte bucket.
            _ if !bucket.is_empty() => {
                (CandidateStrategy::Prefix, bucket.len(), Candidates::Ids(bucket))
            }
            _ => {
                let scan = FULL_SCAN_LIMIT.min(self.symbols.len());
                (CandidateStrategy::FullScan, scan, Candidates::FullScan(scan))
            }
        };

        let stats = SearchStats {
            strategy,
            candidates_considered,
        };
        if limit == 0 {
            return (Vec::new(), stats);
        }

        let mut matcher = FuzzyMatcher::new(query);
        let mut scored = Vec::new();
        let mut consider = |id: SymbolId| {
            if let Some(score) = self.score_candidate(id, &mut matcher) {
                scored.push(ScoredCandidate { id, score });
            }
        };
        match candidates {
            Candidates::Ids(ids) => ids.iter().copied().for_each(&mut consider),
            Candidates::Owned(ids) => ids.into_iter().for_each(&mut consider),
            Candidates::FullScan(scan) => (0..scan)
                .filter_map(|id| SymbolId::try_from(id).ok())
                .for_each(&mut consider),
        }

        if scored.len() > limit {
            scored.select_nth_unstable_by(limit, |a, b| self.cmp_scored(a, b));
            scored.truncate(limit);
        }
        scored.sort_by(|a, b| self.cmp_scored(a, b));

        let results = scored
            .into_iter()
            .map(|candidate| SearchResult {
                symbol: self.symbols[candidate.id as usize].symbol.clone(),
                score: candidate.score,
            })
            .collect();
        (results, stats)
    }

    /// Best of the name and FQN scores.
    fn score_candidate(&self, id: SymbolId, matcher: &mut FuzzyMatcher) -> Option<MatchScore> {
        let entry = &self.symbols[id as usize];
        let name = matcher.score(&entry.symbol.name);
        if !entry.fqn_differs {
            return name;
        }
        let fqn = matcher.score(&entry.symbol.fqn);
        match (name, fqn) {
            (Some(a), Some(b)) if b.rank_key() > a.rank_key() => Some(b),
            (Some(a), _) => Some(a),
            (None, b) => b,
        }
    }

    fn cmp_scored(&self, a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
        let a_sym = &self.symbols[a.id as usize].symbol;
        let b_sym = &self.symbols[b.id as usize].symbol;

        b.score
            .rank_key()
            .cmp(&a.score.rank_key())
            .then_with(|| a_sym.name.len().cmp(&b_sym.name.len()))
            .then_with(|| a_sym.name.cmp(&b_sym.name))
            .then_with(|| a_sym.fqn.cmp(&b_sym.fqn))
            .then_with(|| a_sym.path.cmp(&b_sym.path))
            .then_with(|| a_sym.ordinal.cmp(&b_sym.ordinal))
    }
}

fn first_key(text: &str) -> Option<u8> {
    text.as_bytes().first().map(u8::to_ascii_lowercase)
}
