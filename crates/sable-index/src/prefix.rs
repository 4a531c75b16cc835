use crate::snapshot::IndexSnapshot;
use crate::symbol::Symbol;
use sable_core::SmolStr;
use std::collections::VecDeque;
use std::ops::Bound;
use std::sync::Arc;

/// Lazy FQN-ordered iterator over the symbols whose FQN starts with a prefix.
///
/// Holds the snapshot it was created from, so it keeps yielding a consistent
/// view while the index moves on. Each step resumes the ordered key scan after
/// the last FQN it visited; nothing beyond the current FQN's symbols is
/// materialized.
#[derive(Debug)]
pub struct PrefixIter {
    snapshot: Arc<IndexSnapshot>,
    prefix: SmolStr,
    /// Last FQN visited; `None` before the first step.
    cursor: Option<SmolStr>,
    pending: VecDeque<Symbol>,
    done: bool,
}

impl PrefixIter {
    pub(crate) fn new(snapshot: Arc<IndexSnapshot>, prefix: &str) -> Self {
        Self {
            snapshot,
            prefix: prefix.into(),
            cursor: None,
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn advance(&mut self) -> bool {
        let lower = match &self.cursor {
            Some(cursor) => Bound::Excluded(cursor.as_str()),
            None => Bound::Included(self.prefix.as_str()),
        };
        let next = self
            .snapshot
            .fqn_order
            .range::<_, str>((lower, Bound::Unbounded))
            .next()
            .map(|(fqn, id)| (fqn.clone(), *id));

        let Some((fqn, id)) = next else {
            return false;
        };
        if !fqn.starts_with(self.prefix.as_str()) {
            return false;
        }

        let snapshot = &self.snapshot;
        if let Some(refs) = snapshot.by_fqn.get(&id) {
            self.pending
                .extend(refs.iter().filter_map(|r| snapshot.resolve(r)).cloned());
        }
        self.cursor = Some(fqn);
        true
    }
}

impl Iterator for PrefixIter {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        loop {
            if let Some(symbol) = self.pending.pop_front() {
                return Some(symbol);
            }
            if self.done || !self.advance() {
                self.done = true;
                return None;
            }
        }
    }
}

impl std::iter::FusedIterator for PrefixIter {}
