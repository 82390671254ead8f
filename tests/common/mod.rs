//! Shared test helpers: a scripted in-memory line source.

#![allow(dead_code)]

use async_trait::async_trait;
use fresh_lines::services::{LineSource, PatchOutcome, RangeChunk, SourceError};
use fresh_lines::{EngineConfig, LineRange, PatchOperation, RangeCache};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// In-memory file served through the `LineSource` seam.
///
/// Records every call, can be told to fail, and can hold calls in flight
/// until the test releases them.
#[derive(Default)]
pub struct MockSource {
    files: Mutex<Vec<(PathBuf, Vec<String>)>>,
    fetches: Mutex<Vec<(PathBuf, LineRange)>>,
    batches: Mutex<Vec<Vec<PatchOperation>>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    pub fail_fetch: AtomicBool,
    pub fail_patch: AtomicBool,
    pub reject_patch: AtomicBool,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mock holding one file of `count` lines named "line N".
    pub fn with_numbered(path: &str, count: usize) -> Arc<Self> {
        let source = Self::new();
        source.add_file(path, numbered(count));
        source
    }

    pub fn add_file(&self, path: &str, lines: Vec<String>) {
        self.files.lock().unwrap().push((PathBuf::from(path), lines));
    }

    pub fn file(&self, path: &str) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == Path::new(path))
            .map(|(_, lines)| lines.clone())
            .unwrap_or_default()
    }

    /// Hold every subsequent call until permits are added to the returned gate.
    pub fn hold(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fetches(&self) -> Vec<LineRange> {
        self.fetches.lock().unwrap().iter().map(|(_, r)| *r).collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn batches(&self) -> Vec<Vec<PatchOperation>> {
        self.batches.lock().unwrap().clone()
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }
    }
}

pub fn numbered(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("line {i}")).collect()
}

#[async_trait]
impl LineSource for MockSource {
    async fn fetch_range(
        &self,
        path: &Path,
        start_line: usize,
        end_line: usize,
    ) -> Result<RangeChunk, SourceError> {
        self.fetches
            .lock()
            .unwrap()
            .push((path.to_path_buf(), LineRange::new(start_line, end_line)));
        self.wait_gate().await;

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SourceError::Remote("backend unavailable".to_string()));
        }

        let files = self.files.lock().unwrap();
        let lines = files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, lines)| lines.as_slice())
            .ok_or_else(|| SourceError::Remote(format!("no such file {}", path.display())))?;
        let start = start_line.min(lines.len());
        let end = end_line.clamp(start, lines.len());
        Ok(RangeChunk {
            start_line: start,
            end_line: end,
            total_lines: lines.len(),
            lines: lines[start..end].to_vec(),
        })
    }

    async fn apply_patches(
        &self,
        path: &Path,
        patches: &[PatchOperation],
    ) -> Result<PatchOutcome, SourceError> {
        self.batches.lock().unwrap().push(patches.to_vec());
        self.wait_gate().await;

        if self.fail_patch.load(Ordering::SeqCst) {
            return Err(SourceError::Remote("write failed".to_string()));
        }

        let mut files = self.files.lock().unwrap();
        let Some((_, lines)) = files.iter_mut().find(|(p, _)| p == path) else {
            return Err(SourceError::Remote(format!("no such file {}", path.display())));
        };
        if self.reject_patch.load(Ordering::SeqCst) {
            return Ok(PatchOutcome {
                success: false,
                total_lines: lines.len(),
            });
        }
        for patch in patches.iter().rev() {
            let PatchOperation::Replace {
                start_line,
                end_line,
                content,
            } = patch;
            lines.splice(
                *start_line..*end_line,
                content.split('\n').map(str::to_string),
            );
        }
        Ok(PatchOutcome {
            success: true,
            total_lines: lines.len(),
        })
    }
}

pub fn cache_with(source: &Arc<MockSource>, chunk_size: usize) -> RangeCache {
    let config = EngineConfig {
        chunk_size,
        ..EngineConfig::default()
    };
    RangeCache::new(source.clone(), config)
}
