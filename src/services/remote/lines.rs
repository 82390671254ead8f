//! Line source backed by a remote process
//!
//! Fetch replies stream their lines as `data` chunks so a large window never
//! has to fit in a single protocol message.

use super::channel::RangeChannel;
use super::protocol::{
    apply_patches_params, fetch_range_params, LinesData, METHOD_APPLY_PATCHES,
    METHOD_FETCH_RANGE,
};
use crate::model::PatchOperation;
use crate::services::source::{LineSource, PatchOutcome, RangeChunk, SourceError};
use async_trait::async_trait;
use std::path::Path;

pub struct RemoteLineSource {
    channel: RangeChannel,
}

impl RemoteLineSource {
    pub fn new(channel: RangeChannel) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &RangeChannel {
        &self.channel
    }
}

#[async_trait]
impl LineSource for RemoteLineSource {
    async fn fetch_range(
        &self,
        path: &Path,
        start_line: usize,
        end_line: usize,
    ) -> Result<RangeChunk, SourceError> {
        let (data, result) = self
            .channel
            .request_with_data(
                METHOD_FETCH_RANGE,
                fetch_range_params(path, start_line, end_line),
            )
            .await?;

        let mut chunk: RangeChunk = serde_json::from_value(result)?;

        let mut streamed = Vec::new();
        for value in data {
            let LinesData { lines } = serde_json::from_value(value)?;
            streamed.extend(lines);
        }
        if !streamed.is_empty() {
            streamed.append(&mut chunk.lines);
            chunk.lines = streamed;
        }

        if chunk.lines.len() > chunk.end_line.saturating_sub(chunk.start_line) {
            return Err(SourceError::Protocol(format!(
                "got {} lines for range {}-{}",
                chunk.lines.len(),
                chunk.start_line,
                chunk.end_line
            )));
        }
        Ok(chunk)
    }

    async fn apply_patches(
        &self,
        path: &Path,
        patches: &[PatchOperation],
    ) -> Result<PatchOutcome, SourceError> {
        let result = self
            .channel
            .request(METHOD_APPLY_PATCHES, apply_patches_params(path, patches))
            .await?;
        Ok(serde_json::from_value(result)?)
    }
}
