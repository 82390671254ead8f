//! Remote line backend support
//!
//! This module lets the range cache read and patch files held by another
//! process (a server, a helper on a remote host) speaking newline-delimited
//! JSON over any async byte stream.

mod channel;
mod lines;
mod protocol;

pub use channel::{ChannelError, RangeChannel};
pub use lines::RemoteLineSource;
pub use protocol::{
    apply_patches_params, fetch_range_params, LinesData, RangeRequest, RangeResponse,
    METHOD_APPLY_PATCHES, METHOD_FETCH_RANGE,
};
