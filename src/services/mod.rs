//! Collaborators of the range cache: where lines come from and where edits go.

pub mod local;
pub mod remote;
pub mod source;

pub use local::LocalLineSource;
pub use remote::RemoteLineSource;
pub use source::{LineSource, PatchOutcome, RangeChunk, SourceError};
