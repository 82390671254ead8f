//! Virtualized line-range content engine
//!
//! Lets a UI show and edit an arbitrarily large text file without loading it
//! wholesale: line windows are fetched on demand and merged into a minimal set
//! of loaded ranges, edits sit in an overlay until saved, and saves go out as
//! one atomic batch of patches.
//!
//! ```no_run
//! use fresh_lines::{EngineConfig, LocalLineSource, RangeCache};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), fresh_lines::CacheError> {
//! let cache = RangeCache::new(Arc::new(LocalLineSource::new()), EngineConfig::default());
//! cache.open("/var/log/huge.log").await;
//! let visible = cache.ensure_visible(4000.0, 600.0, 20.0).await;
//! cache.set_line_content(visible.start, "edited");
//! cache.save_edits().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod model;
pub mod services;

pub use config::{ConfigError, EngineConfig};
pub use engine::{CacheError, CacheEvent, RangeCache};
pub use model::{DirtyRange, LineRange, PatchOperation, VisibleRange};
pub use services::{LineSource, LocalLineSource, RemoteLineSource};
