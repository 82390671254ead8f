//! Loaded line ranges
//!
//! Tracks which half-open line intervals `[start, end)` have been fetched in
//! full. The set is kept sorted and minimal: after every insertion,
//! overlapping or touching ranges are swept together into one.

use std::fmt;

/// A half-open interval of line indices, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True if `[start, end)` lies entirely inside this range.
    pub fn contains(&self, start: usize, end: usize) -> bool {
        self.start <= start && self.end >= end
    }

    /// Key used to recognise identical in-flight requests.
    pub fn key(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }

    /// Join two ranges if they overlap or touch.
    pub fn merge(self, other: LineRange) -> Option<LineRange> {
        if other.start <= self.end && self.start <= other.end {
            Some(LineRange {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Collapse a list of ranges into the minimal sorted set covering the same lines.
///
/// Empty ranges are dropped. The result depends only on which lines the input
/// covers, so it is idempotent and independent of input order.
pub fn merge_ranges(mut ranges: Vec<LineRange>) -> Vec<LineRange> {
    ranges.retain(|r| !r.is_empty());
    if ranges.len() <= 1 {
        return ranges;
    }

    ranges.sort_by_key(|r| r.start);

    let mut merged = Vec::with_capacity(ranges.len());
    let mut current = ranges[0];
    for next in ranges.into_iter().skip(1) {
        match current.merge(next) {
            Some(joined) => current = joined,
            None => {
                merged.push(current);
                current = next;
            }
        }
    }
    merged.push(current);
    merged
}

/// The set of line ranges known to be fully loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<LineRange>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff a single recorded range contains `[start, end)`.
    ///
    /// Coverage spread over several ranges does not count; the set is always
    /// merged, so that only happens when there is a real gap.
    pub fn is_loaded(&self, start: usize, end: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(start, end))
    }

    /// Add `[start, end)` and re-merge.
    pub fn record(&mut self, start: usize, end: usize) {
        self.ranges.push(LineRange::new(start, end));
        self.ranges = merge_ranges(std::mem::take(&mut self.ranges));
    }

    pub fn ranges(&self) -> &[LineRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn covered(ranges: &[LineRange]) -> BTreeSet<usize> {
        ranges.iter().flat_map(|r| r.start..r.end).collect()
    }

    #[test]
    fn test_partial_overlap_merges() {
        let mut set = RangeSet::new();
        set.record(0, 200);
        set.record(150, 350);
        assert_eq!(set.ranges(), &[LineRange::new(0, 350)]);
    }

    #[test]
    fn test_touching_ranges_merge() {
        let mut set = RangeSet::new();
        set.record(0, 10);
        set.record(10, 20);
        assert_eq!(set.ranges(), &[LineRange::new(0, 20)]);
    }

    #[test]
    fn test_gap_of_one_line_is_kept() {
        let mut set = RangeSet::new();
        set.record(0, 10);
        set.record(11, 20);
        assert_eq!(
            set.ranges(),
            &[LineRange::new(0, 10), LineRange::new(11, 20)]
        );
        assert!(!set.is_loaded(0, 20));
        assert!(!set.is_loaded(10, 11));
    }

    #[test]
    fn test_out_of_order_inserts_are_sorted() {
        let mut set = RangeSet::new();
        set.record(500, 600);
        set.record(0, 100);
        set.record(250, 300);
        let starts: Vec<usize> = set.ranges().iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0, 250, 500]);
    }

    #[test]
    fn test_is_loaded_requires_single_range() {
        let mut set = RangeSet::new();
        set.record(0, 100);
        assert!(set.is_loaded(10, 20));
        assert!(set.is_loaded(0, 100));
        assert!(!set.is_loaded(50, 101));
        assert!(!set.is_loaded(200, 210));
    }

    #[test]
    fn test_bridging_range_joins_neighbours() {
        let mut set = RangeSet::new();
        set.record(0, 10);
        set.record(20, 30);
        set.record(5, 25);
        assert_eq!(set.ranges(), &[LineRange::new(0, 30)]);
    }

    #[test]
    fn test_empty_ranges_are_dropped() {
        let mut set = RangeSet::new();
        set.record(5, 5);
        assert!(set.is_empty());
    }

    #[test]
    fn test_key_format() {
        assert_eq!(LineRange::new(100, 200).key(), "100-200");
    }

    fn arb_ranges() -> impl Strategy<Value = Vec<LineRange>> {
        prop::collection::vec(
            (0usize..500, 0usize..60).prop_map(|(s, len)| LineRange::new(s, s + len)),
            0..30,
        )
    }

    proptest! {
        #[test]
        fn prop_merge_preserves_coverage(ranges in arb_ranges()) {
            let merged = merge_ranges(ranges.clone());
            prop_assert_eq!(covered(&merged), covered(&ranges));
        }

        #[test]
        fn prop_merge_is_minimal(ranges in arb_ranges()) {
            let merged = merge_ranges(ranges);
            for pair in merged.windows(2) {
                prop_assert!(pair[0].end < pair[1].start);
            }
            prop_assert!(merged.iter().all(|r| !r.is_empty()));
        }

        #[test]
        fn prop_merge_is_idempotent(ranges in arb_ranges()) {
            let once = merge_ranges(ranges);
            let twice = merge_ranges(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_merge_ignores_insertion_order(ranges in arb_ranges()) {
            let mut reversed = ranges.clone();
            reversed.reverse();
            prop_assert_eq!(merge_ranges(ranges), merge_ranges(reversed));
        }
    }
}
