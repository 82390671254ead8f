//! Range cache engine
//!
//! Presents a huge file to a UI as if it were fully in memory. Line windows
//! are fetched on demand from a [`LineSource`], tracked in a merged set of
//! loaded ranges, and layered under an overlay of uncommitted edits. Saving
//! turns the overlay into one atomic batch of replace patches.
//!
//! All methods take `&self`. State sits behind a single mutex that is never
//! held across an `.await`, so loads issued concurrently (scroll prefetch and
//! explicit paging, say) can complete in any order. Each change of target
//! file bumps a generation counter; a fetch or save that completes under an
//! older generation leaves the current state alone.

mod error;
mod events;

pub use error::CacheError;
pub use events::CacheEvent;

use crate::config::EngineConfig;
use crate::model::{
    visible_range, DirtyRange, EditOverlay, LineRange, LineSnapshot, LineStore, PatchOperation,
    RangeSet, VisibleRange,
};
use crate::services::source::{LineSource, RangeChunk};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct CacheState {
    path: Option<PathBuf>,
    generation: u64,
    enabled: bool,
    lines: LineStore,
    ranges: RangeSet,
    /// Keys of fetches in flight, for exact-duplicate suppression
    pending: HashSet<String>,
    overlay: EditOverlay,
    total_lines: usize,
    loading: usize,
    saving: usize,
    error: Option<CacheError>,
}

/// Line-range cache with an edit overlay over one file at a time.
pub struct RangeCache {
    source: Arc<dyn LineSource>,
    config: EngineConfig,
    state: Mutex<CacheState>,
    events: broadcast::Sender<CacheEvent>,
}

impl RangeCache {
    pub fn new(source: Arc<dyn LineSource>, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = CacheState {
            enabled: config.enabled,
            total_lines: config.initial_total_lines,
            ..CacheState::default()
        };
        Self {
            source,
            config,
            state: Mutex::new(state),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CacheEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receive a [`CacheEvent`] for every subsequent state change.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // File identity
    // ========================================================================

    /// Point the cache at a different file, dropping everything cached or
    /// edited for the previous one. Setting the current path again is a no-op.
    pub fn set_file(&self, path: Option<PathBuf>) {
        {
            let mut state = self.state();
            if state.path == path {
                return;
            }
            debug!("Switching range cache to {:?}", path);
            state.path = path.clone();
            state.generation += 1;
            state.lines.clear();
            state.ranges.clear();
            state.pending.clear();
            state.overlay.clear();
            state.loading = 0;
            state.error = None;
            state.total_lines = self.config.initial_total_lines;
        }
        self.emit(CacheEvent::FileChanged { path });
    }

    /// Switch to `path` and load its first window of `chunk_size` lines.
    pub async fn open(&self, path: impl Into<PathBuf>) {
        self.set_file(Some(path.into()));
        self.load_range(0, self.config.chunk_size).await;
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.state().path.clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state().enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// True iff one loaded range contains all of `[start, end)`.
    pub fn is_range_loaded(&self, start: usize, end: usize) -> bool {
        self.state().ranges.is_loaded(start, end)
    }

    pub fn loaded_ranges(&self) -> Vec<LineRange> {
        self.state().ranges.ranges().to_vec()
    }

    /// Fetch lines `[start, end)` unless they are already loaded or the exact
    /// same fetch is in flight.
    ///
    /// Failures are not returned; they are recorded as the cache's last error
    /// and the range stays unloaded so a later call retries it.
    pub async fn load_range(&self, start: usize, end: usize) {
        let range = LineRange::new(start, end);
        let key = range.key();

        let (path, generation) = {
            let mut state = self.state();
            let Some(path) = state.path.clone() else {
                return;
            };
            if !state.enabled || range.is_empty() {
                return;
            }
            if state.pending.contains(&key) {
                debug!("Lines {range} already being fetched");
                return;
            }
            if state.ranges.is_loaded(start, end) {
                return;
            }
            state.pending.insert(key.clone());
            state.loading += 1;
            (path, state.generation)
        };

        debug!("Fetching lines {range} of {}", path.display());
        let result = self.source.fetch_range(&path, start, end).await;

        let event = {
            let mut state = self.state();
            if state.generation != generation {
                debug!(
                    "Discarding lines {range} of {}: file changed while fetching",
                    path.display()
                );
                return;
            }
            state.pending.remove(&key);
            state.loading = state.loading.saturating_sub(1);

            match result {
                Ok(chunk) => {
                    // Never claim more than what actually arrived.
                    let loaded_end = chunk.end_line.min(chunk.start_line + chunk.lines.len());
                    let RangeChunk {
                        start_line,
                        total_lines,
                        lines,
                        ..
                    } = chunk;

                    // Content first, then the range: a range is never
                    // observable as loaded before its lines exist.
                    state.lines.write_block(start_line, lines);
                    state.total_lines = total_lines;
                    state.ranges.record(start_line, loaded_end);
                    state.error = None;

                    CacheEvent::RangeLoaded {
                        range: LineRange::new(start_line, loaded_end),
                        total_lines,
                    }
                }
                Err(e) => {
                    warn!("Failed to load lines {range} of {}: {e}", path.display());
                    let error = CacheError::Load {
                        start,
                        end,
                        message: e.to_string(),
                    };
                    state.error = Some(error.clone());
                    CacheEvent::LoadFailed { range, error }
                }
            }
        };
        self.emit(event);
    }

    /// Speculatively load one chunk on each side of the visible window.
    ///
    /// Both sides are fetched concurrently. Skipping this never yields wrong
    /// content, only a later on-demand load.
    pub async fn prefetch_adjacent(&self, visible_start: usize, visible_end: usize) {
        let chunk_size = self.config.chunk_size;
        let total_lines = self.total_lines();
        let before = visible_start.saturating_sub(chunk_size);
        let after = total_lines.min(visible_end.saturating_add(chunk_size));

        let load_before = async {
            if before < visible_start && !self.is_range_loaded(before, visible_start) {
                self.load_range(before, visible_start).await;
            }
        };
        let load_after = async {
            if visible_end < after && !self.is_range_loaded(visible_end, after) {
                self.load_range(visible_end, after).await;
            }
        };
        tokio::join!(load_before, load_after);
    }

    /// Window of lines to render for a scroll offset, in pixels, using the
    /// configured overscan and the current line count.
    pub fn visible_range(
        &self,
        scroll_top: f64,
        viewport_height: f64,
        line_height: f64,
    ) -> VisibleRange {
        visible_range(
            scroll_top,
            viewport_height,
            line_height,
            self.config.overscan,
            self.total_lines(),
        )
    }

    /// Load what a viewport at `scroll_top` shows, then prefetch around it.
    pub async fn ensure_visible(
        &self,
        scroll_top: f64,
        viewport_height: f64,
        line_height: f64,
    ) -> VisibleRange {
        let visible = self.visible_range(scroll_top, viewport_height, line_height);
        self.load_range(visible.start, visible.end).await;
        self.prefetch_adjacent(visible.start, visible.end).await;
        visible
    }

    /// True once every line of the file is in one loaded range.
    pub fn is_fully_loaded(&self) -> bool {
        let state = self.state();
        state.total_lines > 0 && state.ranges.is_loaded(0, state.total_lines)
    }

    /// Fetch the whole file in a single request.
    pub async fn load_all(&self) {
        let total_lines = {
            let state = self.state();
            if !state.enabled || state.total_lines == 0 {
                return;
            }
            state.total_lines
        };
        if self.is_fully_loaded() {
            return;
        }
        self.load_range(0, total_lines).await;
    }

    // ========================================================================
    // Observable state
    // ========================================================================

    /// Snapshot of all loaded lines, unaffected by later updates.
    pub fn lines(&self) -> LineSnapshot {
        self.state().lines.snapshot()
    }

    /// Loaded content of a line, ignoring pending edits.
    pub fn line(&self, line: usize) -> Option<String> {
        self.state().lines.get(line).map(|entry| entry.content.clone())
    }

    /// What the UI should show for a line: the pending edit if there is one,
    /// else the loaded content.
    pub fn display_line(&self, line: usize) -> Option<String> {
        let state = self.state();
        state
            .overlay
            .get(line)
            .map(str::to_string)
            .or_else(|| state.lines.get(line).map(|entry| entry.content.clone()))
    }

    pub fn total_lines(&self) -> usize {
        self.state().total_lines
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading > 0
    }

    pub fn is_saving(&self) -> bool {
        self.state().saving > 0
    }

    pub fn error(&self) -> Option<CacheError> {
        self.state().error.clone()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.state().overlay.is_empty()
    }

    /// Copy of the pending edits.
    pub fn edits(&self) -> EditOverlay {
        self.state().overlay.clone()
    }

    /// Whole file as one string, available only once fully loaded.
    pub fn full_content(&self) -> Option<String> {
        let state = self.state();
        if state.total_lines == 0 || !state.ranges.is_loaded(0, state.total_lines) {
            return None;
        }
        let (content, gaps) = state.lines.join(state.total_lines);
        if gaps > 0 {
            warn!(
                "{gaps} lines missing from a fully loaded range set ({} lines)",
                state.total_lines
            );
        }
        Some(content)
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Record an edit. The line does not need to be loaded.
    ///
    /// `usize::MAX` is not a line index any file can have and is ignored.
    pub fn set_line_content(&self, line: usize, content: impl Into<String>) {
        if line == usize::MAX {
            warn!("Ignoring edit of out-of-range line {line}");
            return;
        }
        self.state().overlay.set(line, content);
        self.emit(CacheEvent::LineEdited { line });
    }

    /// Drop all pending edits.
    pub fn clear_edits(&self) {
        self.state().overlay.clear();
        self.emit(CacheEvent::EditsCleared);
    }

    /// Pending edits coalesced into runs of consecutive lines.
    pub fn dirty_ranges(&self) -> Vec<DirtyRange> {
        self.state().overlay.dirty_ranges()
    }

    /// Persist all pending edits as one batch of replace patches.
    ///
    /// On success the edited lines become loaded content and leave the
    /// overlay. On failure the overlay is left exactly as it was and the error
    /// is both recorded and returned. Edits made while the save is in flight
    /// stay pending. If the file is switched mid-save the outcome is only
    /// returned: state and events belong to the new file.
    pub async fn save_edits(&self) -> Result<(), CacheError> {
        let (path, generation, saved, patches) = {
            let mut state = self.state();
            if state.overlay.is_empty() {
                return Ok(());
            }
            if !state.enabled {
                return Err(CacheError::Disabled);
            }
            let Some(path) = state.path.clone() else {
                return Err(CacheError::NoFile);
            };
            let patches: Vec<PatchOperation> = state
                .overlay
                .dirty_ranges()
                .into_iter()
                .map(PatchOperation::from)
                .collect();
            state.saving += 1;
            (path, state.generation, state.overlay.clone(), patches)
        };

        debug!(
            "Saving {} edited lines in {} patches to {}",
            saved.len(),
            patches.len(),
            path.display()
        );
        let result = self.source.apply_patches(&path, &patches).await;

        let mut state = self.state();
        state.saving = state.saving.saturating_sub(1);
        let current = state.generation == generation;

        let error = match result {
            Ok(outcome) if outcome.success => {
                if !current {
                    debug!("Saved {} after the cache moved on", path.display());
                    return Ok(());
                }
                Self::commit_saved(&mut state, &saved);
                state.total_lines = outcome.total_lines;
                state.error = None;
                drop(state);
                self.emit(CacheEvent::Saved {
                    patches: patches.len(),
                    total_lines: outcome.total_lines,
                });
                return Ok(());
            }
            Ok(_) => CacheError::PatchRejected,
            Err(e) => CacheError::Save(e.to_string()),
        };

        warn!("Saving {} failed: {error}", path.display());
        if !current {
            return Err(error);
        }
        state.error = Some(error.clone());
        drop(state);
        self.emit(CacheEvent::SaveFailed {
            error: error.clone(),
        });
        Err(error)
    }

    /// Move saved edits into the line store. An entry edited again during the
    /// save keeps its newer content in the overlay.
    fn commit_saved(state: &mut CacheState, saved: &EditOverlay) {
        state.lines.write_lines(saved.iter());
        for (line, content) in saved.iter() {
            if state.overlay.get(line) == Some(content) {
                state.overlay.remove(line);
            }
        }
    }

    /// Path of the file currently targeted, for log and status messages.
    pub fn display_path(&self) -> String {
        self.state()
            .path
            .as_deref()
            .map(Path::display)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "[no file]".to_string())
    }
}
