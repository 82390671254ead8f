//! Core data model: loaded ranges, line content, the edit overlay and patches.

pub mod line_store;
pub mod overlay;
pub mod patch;
pub mod ranges;
pub mod viewport;

pub use line_store::{LineEntry, LineSnapshot, LineStore};
pub use overlay::{DirtyRange, EditOverlay};
pub use patch::PatchOperation;
pub use ranges::{merge_ranges, LineRange, RangeSet};
pub use viewport::{visible_range, VisibleRange};
