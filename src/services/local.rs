//! Local file line source
//!
//! Serves line windows straight from a file on disk and applies patch batches
//! with an atomic write: write to a temp file, fsync, then rename over the
//! target.

use super::source::{LineSource, PatchOutcome, RangeChunk, SourceError};
use crate::model::PatchOperation;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Line source backed by the local filesystem
#[derive(Debug, Default, Clone)]
pub struct LocalLineSource;

/// A whole file split into raw byte lines.
///
/// Lines are kept as bytes so a rewrite reproduces untouched lines exactly,
/// whatever their encoding. A trailing newline does not start an extra line;
/// it is remembered so a rewrite keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileLines {
    lines: Vec<Vec<u8>>,
    trailing_newline: bool,
}

impl FileLines {
    fn parse(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self {
                lines: Vec::new(),
                trailing_newline: false,
            };
        }
        let (body, trailing_newline) = match bytes.strip_suffix(b"\n") {
            Some(body) => (body, true),
            None => (bytes, false),
        };
        Self {
            lines: body.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect(),
            trailing_newline,
        }
    }

    fn render(&self) -> Vec<u8> {
        let mut out = self.lines.join(&b'\n');
        if self.trailing_newline && !self.lines.is_empty() {
            out.push(b'\n');
        }
        out
    }

    /// Check a batch before touching anything: each range must sit inside the
    /// file and come after the previous one.
    fn validate(&self, patches: &[PatchOperation]) -> bool {
        let total = self.lines.len();
        let mut floor = 0;
        for patch in patches {
            let (start, end) = (patch.start_line(), patch.end_line());
            if start < floor || start > end || end > total {
                return false;
            }
            floor = end;
        }
        true
    }

    /// Apply a validated batch bottom-up so earlier indices stay put.
    fn apply(&mut self, patches: &[PatchOperation]) {
        for patch in patches.iter().rev() {
            match patch {
                PatchOperation::Replace {
                    start_line,
                    end_line,
                    content,
                } => {
                    self.lines.splice(
                        *start_line..*end_line,
                        content.split('\n').map(|line| line.as_bytes().to_vec()),
                    );
                }
            }
        }
    }
}

impl LocalLineSource {
    pub fn new() -> Self {
        Self
    }

    /// Stream the file once, keeping only lines in `[start, end)`.
    ///
    /// Returns the kept lines and the total line count.
    async fn scan(path: &Path, start: usize, end: usize) -> io::Result<(Vec<String>, usize)> {
        let file = File::open(path).await?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut lines = Vec::with_capacity(end.saturating_sub(start).min(4096));
        let mut index = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            if index >= start && index < end {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                lines.push(String::from_utf8_lossy(&buf).into_owned());
            }
            index += 1;
        }
        Ok((lines, index))
    }

    fn temp_path(target: &Path) -> PathBuf {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".fresh-lines.tmp");
        target.with_file_name(name)
    }

    /// Write `content` to `target` atomically.
    ///
    /// The target's permissions carry over to the new file. The temp file is
    /// removed if any step fails.
    async fn atomic_write(target: &Path, content: &[u8]) -> io::Result<()> {
        let temp_path = Self::temp_path(target);
        let permissions = fs::metadata(target).await.ok().map(|m| m.permissions());

        let written = async {
            let mut file = File::create(&temp_path).await?;
            file.write_all(content).await?;
            file.sync_all().await?;
            drop(file);

            if let Some(permissions) = permissions {
                fs::set_permissions(&temp_path, permissions).await?;
            }
            fs::rename(&temp_path, target).await
        }
        .await;

        if written.is_err() {
            if let Err(e) = fs::remove_file(&temp_path).await {
                tracing::debug!("Could not remove {}: {e}", temp_path.display());
            }
        }
        written
    }
}

#[async_trait]
impl LineSource for LocalLineSource {
    async fn fetch_range(
        &self,
        path: &Path,
        start_line: usize,
        end_line: usize,
    ) -> Result<RangeChunk, SourceError> {
        let (lines, total_lines) = Self::scan(path, start_line, end_line).await?;
        let start = start_line.min(total_lines);
        Ok(RangeChunk {
            start_line: start,
            end_line: start + lines.len(),
            total_lines,
            lines,
        })
    }

    async fn apply_patches(
        &self,
        path: &Path,
        patches: &[PatchOperation],
    ) -> Result<PatchOutcome, SourceError> {
        let bytes = fs::read(path).await?;
        let mut file = FileLines::parse(&bytes);

        if !file.validate(patches) {
            tracing::warn!(
                "Rejecting patch batch of {} operations for {}",
                patches.len(),
                path.display()
            );
            return Ok(PatchOutcome {
                success: false,
                total_lines: file.lines.len(),
            });
        }
        if patches.is_empty() {
            return Ok(PatchOutcome {
                success: true,
                total_lines: file.lines.len(),
            });
        }

        file.apply(patches);
        Self::atomic_write(path, &file.render()).await?;

        Ok(PatchOutcome {
            success: true,
            total_lines: file.lines.len(),
        })
    }
}
