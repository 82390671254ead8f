//! Uncommitted line edits
//!
//! The overlay maps line numbers to edited content and lives independently of
//! what has been fetched: a line can be edited before it was ever loaded.
//! Saving turns the overlay into dirty ranges, one per maximal run of
//! consecutively numbered edited lines.

use std::collections::BTreeMap;

/// A run of consecutive edited lines, `[start_line, end_line)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyRange {
    pub start_line: usize,
    pub end_line: usize,
    /// The run's lines joined with `\n`.
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOverlay {
    edits: BTreeMap<usize, String>,
}

impl EditOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, line: usize, content: impl Into<String>) {
        self.edits.insert(line, content.into());
    }

    pub fn get(&self, line: usize) -> Option<&str> {
        self.edits.get(&line).map(String::as_str)
    }

    pub fn remove(&mut self, line: usize) -> Option<String> {
        self.edits.remove(&line)
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Edited lines in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.edits.iter().map(|(line, content)| (*line, content.as_str()))
    }

    /// Coalesce the edits into maximal runs of consecutive line numbers.
    pub fn dirty_ranges(&self) -> Vec<DirtyRange> {
        let mut ranges = Vec::new();
        let mut run: Option<(usize, usize, Vec<&str>)> = None;

        for (line, content) in self.iter() {
            if let Some((_, last, lines)) = run.as_mut() {
                if last.checked_add(1) == Some(line) {
                    *last = line;
                    lines.push(content);
                    continue;
                }
            }
            if let Some(done) = run.take() {
                ranges.push(Self::flush(done));
            }
            run = Some((line, line, vec![content]));
        }
        if let Some(done) = run {
            ranges.push(Self::flush(done));
        }
        ranges
    }

    fn flush((start, last, lines): (usize, usize, Vec<&str>)) -> DirtyRange {
        DirtyRange {
            start_line: start,
            end_line: last.saturating_add(1),
            content: lines.join("\n"),
        }
    }
}
