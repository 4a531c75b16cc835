//! Trigram posting lists for candidate prefiltering.

/// A packed, ASCII case-folded 3-byte trigram (`b0 << 16 | b1 << 8 | b2`).
pub type Trigram = u32;

fn for_each_trigram(text: &str, mut f: impl FnMut(Trigram)) {
    let bytes = text.as_bytes();
    for window in bytes.windows(3) {
        let [a, b, c] = [window[0], window[1], window[2]].map(|b| b.to_ascii_lowercase());
        f((u32::from(a) << 16) | (u32::from(b) << 8) | u32::from(c));
    }
}

fn sorted_trigrams(text: &str, out: &mut Vec<Trigram>) {
    out.clear();
    for_each_trigram(text, |t| out.push(t));
    out.sort_unstable();
    out.dedup();
}

/// Immutable trigram -> sorted id list index.
#[derive(Debug, Clone, Default)]
pub struct TrigramIndex {
    keys: Vec<Trigram>,
    /// `offsets[i]..offsets[i + 1]` is the posting range of `keys[i]`.
    offsets: Vec<u32>,
    ids: Vec<u32>,
}

impl TrigramIndex {
    pub fn postings(&self, trigram: Trigram) -> &[u32] {
        match self.keys.binary_search(&trigram) {
            Ok(ix) => &self.ids[self.offsets[ix] as usize..self.offsets[ix + 1] as usize],
            Err(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Ids whose text contains every trigram of `query`, sorted and unique.
    ///
    /// Returns `None` when the query is too short to have trigrams; callers
    /// then fall back to a scan.
    pub fn candidates(&self, query: &str) -> Option<Vec<u32>> {
        let mut trigrams = Vec::new();
        sorted_trigrams(query, &mut trigrams);
        if trigrams.is_empty() {
            return None;
        }

        let mut lists: Vec<&[u32]> = trigrams.iter().map(|&t| self.postings(t)).collect();
        if lists.iter().any(|list| list.is_empty()) {
            return Some(Vec::new());
        }
        // Rarest first keeps the membership checks cheap.
        lists.sort_by_key(|list| list.len());

        let (base, rest) = lists.split_first()?;
        Some(
            base.iter()
                .copied()
                .filter(|id| rest.iter().all(|list| list.binary_search(id).is_ok()))
                .collect(),
        )
    }
}

#[derive(Debug, Default)]
pub struct TrigramIndexBuilder {
    /// `(trigram << 32) | id`
    pairs: Vec<u64>,
    scratch: Vec<Trigram>,
}

impl TrigramIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, text: &str) {
        sorted_trigrams(text, &mut self.scratch);
        self.pairs
            .extend(self.scratch.iter().map(|&t| (u64::from(t) << 32) | u64::from(id)));
    }

    pub fn build(mut self) -> TrigramIndex {
        self.pairs.sort_unstable();
        self.pairs.dedup();

        let mut index = TrigramIndex {
            keys: Vec::new(),
            offsets: vec![0],
            ids: Vec::with_capacity(self.pairs.len()),
        };
        for pair in self.pairs {
            let trigram = (pair >> 32) as Trigram;
            if index.keys.last() != Some(&trigram) {
                if !index.keys.is_empty() {
                    index.offsets.push(index.ids.len() as u32);
                }
                index.keys.push(trigram);
            }
            index.ids.push(pair as u32);
        }
        if !index.keys.is_empty() {
            index.offsets.push(index.ids.len() as u32);
        }
        debug_assert_eq!(index.offsets.len(), index.keys.len() + 1);
        index
    }
}
