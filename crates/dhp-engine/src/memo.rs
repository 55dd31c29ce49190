//! Packrat memoization cache: (parser equivalence class, location) →
//! cached parse result.

use std::collections::HashMap;

use dhp_core::{Error, Node};

use crate::parser::ParserId;

/// Cached outcome of parsing `parser` at `location`.
#[derive(Clone, Debug)]
pub struct MemoEntry {
    pub node: Option<Node>,
    pub new_location: usize,
    pub errors: Vec<Error>,
}

/// The packrat memo table. Consulted at the top of every `parse` call and
/// populated at its bottom, except while memoization is suspended (see
/// [`crate::grammar::Grammar::memo_suspended`]).
#[derive(Debug, Default)]
pub struct MemoTable {
    entries: HashMap<(ParserId, usize), MemoEntry>,
}

impl MemoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, parser: ParserId, location: usize) -> Option<&MemoEntry> {
        self.entries.get(&(parser, location))
    }

    pub fn insert(&mut self, parser: ParserId, location: usize, entry: MemoEntry) {
        self.entries.insert((parser, location), entry);
    }

    /// Used by left recursion to overwrite a prior seed with a grown result
    /// at the same key.
    pub fn replace(&mut self, parser: ParserId, location: usize, entry: MemoEntry) {
        self.entries.insert((parser, location), entry);
    }

    pub fn remove(&mut self, parser: ParserId, location: usize) {
        self.entries.remove(&(parser, location));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_roundtrip() {
        let mut memo = MemoTable::new();
        let pid = ParserId(0);
        memo.insert(
            pid,
            0,
            MemoEntry {
                node: None,
                new_location: 0,
                errors: vec![],
            },
        );
        assert!(memo.get(pid, 0).is_some());
        assert!(memo.get(pid, 1).is_none());
        assert!(memo.get(ParserId(1), 0).is_none());
    }

    #[test]
    fn replace_overwrites_seed() {
        let mut memo = MemoTable::new();
        let pid = ParserId(0);
        memo.insert(
            pid,
            0,
            MemoEntry {
                node: None,
                new_location: 0,
                errors: vec![],
            },
        );
        memo.replace(
            pid,
            0,
            MemoEntry {
                node: None,
                new_location: 3,
                errors: vec![],
            },
        );
        assert_eq!(memo.get(pid, 0).unwrap().new_location, 3);
    }
}
