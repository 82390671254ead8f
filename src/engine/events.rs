use super::CacheError;
use crate::model::LineRange;
use std::path::PathBuf;

/// Notification published by a [`RangeCache`](super::RangeCache) after each
/// state change.
///
/// Delivered over a `tokio::sync::broadcast` channel owned by the cache; a
/// receiver that falls behind sees `RecvError::Lagged` rather than blocking
/// the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The target file changed and all state was reset.
    FileChanged { path: Option<PathBuf> },
    /// A fetch completed and its lines are now readable.
    RangeLoaded { range: LineRange, total_lines: usize },
    /// A fetch failed; the range stays unloaded.
    LoadFailed { range: LineRange, error: CacheError },
    LineEdited { line: usize },
    EditsCleared,
    /// A patch batch was applied.
    Saved { patches: usize, total_lines: usize },
    /// A patch batch failed; the edits are still pending.
    SaveFailed { error: CacheError },
}
