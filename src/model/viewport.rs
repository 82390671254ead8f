//! Viewport geometry
//!
//! Maps a scroll position onto the window of lines worth rendering.

/// Lines to render, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

/// Compute the rendered window for a scroll offset, in pixels.
///
/// `overscan` extra lines are included on each side of the viewport. The end
/// is clamped to `total_lines`. A non-positive `line_height` yields an empty
/// window at line 0. Offsets too large for a line index saturate.
pub fn visible_range(
    scroll_top: f64,
    viewport_height: f64,
    line_height: f64,
    overscan: usize,
    total_lines: usize,
) -> VisibleRange {
    if line_height.is_nan() || line_height <= 0.0 {
        return VisibleRange::default();
    }

    let first = (scroll_top.max(0.0) / line_height).floor() as usize;
    let start = first.saturating_sub(overscan);
    let visible_count = (viewport_height.max(0.0) / line_height).ceil() as usize;
    let span = visible_count.saturating_add(overscan.saturating_mul(2));
    let end = total_lines.min(start.saturating_add(span));

    VisibleRange { start, end }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrolled_window() {
        let range = visible_range(1000.0, 500.0, 20.0, 10, 10_000);
        assert_eq!(range, VisibleRange { start: 40, end: 85 });
    }

    #[test]
    fn test_end_clamped_to_total() {
        let range = visible_range(1000.0, 500.0, 20.0, 10, 60);
        assert_eq!(range, VisibleRange { start: 40, end: 60 });
    }

    #[test]
    fn test_top_of_file_does_not_underflow() {
        let range = visible_range(0.0, 400.0, 20.0, 10, 1000);
        assert_eq!(range, VisibleRange { start: 0, end: 40 });
    }

    #[test]
    fn test_partial_line_rounds_up() {
        let range = visible_range(0.0, 410.0, 20.0, 0, 1000);
        assert_eq!(range.end, 21);
    }

    #[test]
    fn test_zero_line_height() {
        assert_eq!(
            visible_range(100.0, 100.0, 0.0, 5, 100),
            VisibleRange::default()
        );
    }

    #[test]
    fn test_huge_scroll_offset_saturates() {
        let range = visible_range(1e30, 500.0, 20.0, 10, 1000);
        assert_eq!(range.start, usize::MAX - 10);
        assert_eq!(range.end, 1000);
    }

    #[test]
    fn test_infinite_viewport_covers_file() {
        let range = visible_range(0.0, f64::INFINITY, 20.0, 10, 1000);
        assert_eq!(range, VisibleRange { start: 0, end: 1000 });
    }
}
