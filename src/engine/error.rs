/// Last error observed by the range cache.
///
/// Kept as plain messages so it can be cloned into events and read back by
/// the UI at any time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to load lines {start}-{end}: {message}")]
    Load {
        start: usize,
        end: usize,
        message: String,
    },

    #[error("Failed to save edits: {0}")]
    Save(String),

    #[error("Backend rejected the patch batch")]
    PatchRejected,

    #[error("No file is open")]
    NoFile,

    #[error("Range cache is disabled")]
    Disabled,
}
