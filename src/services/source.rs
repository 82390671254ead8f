//! Backend seam for line content
//!
//! The range cache never touches storage directly. It asks a [`LineSource`]
//! for line windows and hands it patch batches to persist.

use crate::model::PatchOperation;
use crate::services::remote::ChannelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Lines returned by a fetch.
///
/// May hold fewer lines than requested when the request runs past the end of
/// the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeChunk {
    pub start_line: usize,
    pub end_line: usize,
    pub total_lines: usize,
    #[serde(default)]
    pub lines: Vec<String>,
}

/// Result of applying a patch batch.
///
/// `success == false` means the batch was rejected and nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    pub success: bool,
    pub total_lines: usize,
}

/// Error type for line source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Where line content comes from and where edits go.
#[async_trait]
pub trait LineSource: Send + Sync {
    /// Fetch lines `[start_line, end_line)` of `path`.
    async fn fetch_range(
        &self,
        path: &Path,
        start_line: usize,
        end_line: usize,
    ) -> Result<RangeChunk, SourceError>;

    /// Apply an ordered batch of patches to `path` as one unit.
    async fn apply_patches(
        &self,
        path: &Path,
        patches: &[PatchOperation],
    ) -> Result<PatchOutcome, SourceError>;
}
