//! Sparse store of fetched line content
//!
//! Lines are keyed by absolute line index. The map sits behind an `Arc` and
//! each update batch replaces it copy-on-write, so a snapshot handed to a
//! reader never changes under it.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Content of one fetched line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEntry {
    pub content: String,
    pub loaded: bool,
}

impl LineEntry {
    pub fn loaded(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            loaded: true,
        }
    }
}

/// Immutable view of the store at one point in time.
pub type LineSnapshot = Arc<BTreeMap<usize, LineEntry>>;

#[derive(Debug, Clone, Default)]
pub struct LineStore {
    lines: LineSnapshot,
}

impl LineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a contiguous block of lines beginning at `start`.
    pub fn write_block<I, S>(&mut self, start: usize, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = Arc::make_mut(&mut self.lines);
        for (offset, line) in lines.into_iter().enumerate() {
            map.insert(start + offset, LineEntry::loaded(line));
        }
    }

    /// Write scattered lines as one batch.
    pub fn write_lines<'a, I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let map = Arc::make_mut(&mut self.lines);
        for (line, content) in lines {
            map.insert(line, LineEntry::loaded(content));
        }
    }

    pub fn get(&self, line: usize) -> Option<&LineEntry> {
        self.lines.get(&line)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn snapshot(&self) -> LineSnapshot {
        Arc::clone(&self.lines)
    }

    pub fn clear(&mut self) {
        self.lines = LineSnapshot::default();
    }

    /// Join lines `0..total` with `\n`, returning the text and how many
    /// indices had no entry.
    pub fn join(&self, total: usize) -> (String, usize) {
        let mut gaps = 0;
        let mut out = String::new();
        for line in 0..total {
            if line > 0 {
                out.push('\n');
            }
            match self.lines.get(&line) {
                Some(entry) => out.push_str(&entry.content),
                None => gaps += 1,
            }
        }
        (out, gaps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_block_uses_absolute_indices() {
        let mut store = LineStore::new();
        store.write_block(100, ["a", "b", "c"]);
        assert_eq!(store.get(100).map(|e| e.content.as_str()), Some("a"));
        assert_eq!(store.get(102).map(|e| e.content.as_str()), Some("c"));
        assert!(store.get(0).is_none());
        assert!(store.get(100).unwrap().loaded);
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_writes() {
        let mut store = LineStore::new();
        store.write_block(0, ["one"]);
        let before = store.snapshot();
        store.write_block(0, ["uno", "dos"]);

        assert_eq!(before.len(), 1);
        assert_eq!(before[&0].content, "one");
        assert_eq!(store.get(0).unwrap().content, "uno");
    }

    #[test]
    fn test_join_fills_gaps_with_empty_lines() {
        let mut store = LineStore::new();
        store.write_lines([(0, "first"), (2, "third")]);
        let (text, gaps) = store.join(3);
        assert_eq!(text, "first\n\nthird");
        assert_eq!(gaps, 1);
    }
}
