use super::overlay::DirtyRange;
use serde::{Deserialize, Serialize};

/// One operation in a save batch.
///
/// Serialized as `{"op":"replace","startLine":..,"endLine":..,"content":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOperation {
    /// Replace lines `[start_line, end_line)` with `content` split on `\n`.
    #[serde(rename_all = "camelCase")]
    Replace {
        start_line: usize,
        end_line: usize,
        content: String,
    },
}

impl PatchOperation {
    pub fn start_line(&self) -> usize {
        match self {
            PatchOperation::Replace { start_line, .. } => *start_line,
        }
    }

    pub fn end_line(&self) -> usize {
        match self {
            PatchOperation::Replace { end_line, .. } => *end_line,
        }
    }
}

impl From<DirtyRange> for PatchOperation {
    fn from(range: DirtyRange) -> Self {
        PatchOperation::Replace {
            start_line: range.start_line,
            end_line: range.end_line,
            content: range.content,
        }
    }
}
