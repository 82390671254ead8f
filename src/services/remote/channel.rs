//! Backend communication channel
//!
//! Handles request/response multiplexing over a pair of async byte streams.

use crate::services::remote::protocol::{RangeRequest, RangeResponse};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

/// Default capacity for the per-request streaming data channel.
const DEFAULT_DATA_CHANNEL_CAPACITY: usize = 64;

/// Error type for channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel closed")]
    ChannelClosed,

    #[error("Request timed out")]
    Timeout,

    #[error("Remote error: {0}")]
    Remote(String),
}

/// Pending request state
struct PendingRequest {
    /// Channel for streaming data
    data_tx: mpsc::Sender<serde_json::Value>,
    /// Channel for final result
    result_tx: oneshot::Sender<Result<serde_json::Value, String>>,
}

type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<u64, PendingRequest>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Communication channel with a line backend
pub struct RangeChannel {
    /// Sender to the write task
    write_tx: mpsc::Sender<String>,
    /// Pending requests awaiting responses
    pending: PendingMap,
    /// Next request ID
    next_id: AtomicU64,
    /// Whether the channel is connected
    connected: Arc<AtomicBool>,
    /// Capacity for per-request streaming data channels
    data_channel_capacity: usize,
    /// Upper bound on one request, from send to final result
    timeout: Option<Duration>,
}

impl RangeChannel {
    /// Create a new channel from async read/write handles
    ///
    /// Must be called from within a Tokio runtime context.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::with_capacity(reader, writer, DEFAULT_DATA_CHANNEL_CAPACITY)
    }

    /// Create a new channel with a custom data channel capacity.
    pub fn with_capacity<R, W>(mut reader: R, mut writer: W, data_channel_capacity: usize) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        // Channel for outgoing requests
        let (write_tx, mut write_rx) = mpsc::channel::<String>(64);

        // Spawn write task
        let connected_write = connected.clone();
        tokio::spawn(async move {
            while let Some(msg) = write_rx.recv().await {
                if writer.write_all(msg.as_bytes()).await.is_err() {
                    connected_write.store(false, Ordering::SeqCst);
                    break;
                }
                if writer.flush().await.is_err() {
                    connected_write.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        // Spawn read task
        let pending_read = pending.clone();
        let connected_read = connected.clone();
        tokio::spawn(async move {
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        // EOF
                        connected_read.store(false, Ordering::SeqCst);
                        break;
                    }
                    Ok(_) => match serde_json::from_str::<RangeResponse>(&line) {
                        Ok(resp) => Self::handle_response(&pending_read, resp).await,
                        Err(e) => warn!("ignoring malformed backend line: {e}"),
                    },
                    Err(_) => {
                        connected_read.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }

            // Clean up pending requests on disconnect.
            let mut pending = lock(&pending_read);
            for (id, req) in pending.drain() {
                if req.result_tx.send(Err("connection closed".to_string())).is_err() {
                    warn!("request {id}: receiver dropped during disconnect cleanup");
                }
            }
        });

        Self {
            write_tx,
            pending,
            next_id: AtomicU64::new(1),
            connected,
            data_channel_capacity,
            timeout: None,
        }
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Handle an incoming response.
    ///
    /// Streaming data goes through `send().await`, so a slow consumer applies
    /// backpressure to the reader instead of losing chunks.
    async fn handle_response(pending: &PendingMap, resp: RangeResponse) {
        trace!("response for request {}", resp.id);

        // Send streaming data without holding the mutex (send().await may yield)
        if let Some(data) = resp.data {
            let data_tx = lock(pending).get(&resp.id).map(|req| req.data_tx.clone());
            if let Some(tx) = data_tx {
                if tx.send(data).await.is_err() {
                    warn!("request {}: data receiver dropped mid-stream", resp.id);
                    lock(pending).remove(&resp.id);
                    return;
                }
            }
        }

        // Handle final result/error
        let outcome = match (resp.result, resp.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(error),
            (None, None) => return,
        };
        let req = lock(pending).remove(&resp.id);
        if let Some(req) = req {
            if req.result_tx.send(outcome).is_err() {
                warn!("request {}: result receiver dropped", resp.id);
            }
        }
    }

    /// Check if the channel is connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of requests still waiting for a final result
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Send a request and wait for the final result (ignoring streaming data)
    pub async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChannelError> {
        self.request_with_data(method, params)
            .await
            .map(|(_, result)| result)
    }

    /// Send a request that may stream data
    ///
    /// Returns the request id with the data and result receivers.
    pub async fn request_streaming(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<
        (
            u64,
            mpsc::Receiver<serde_json::Value>,
            oneshot::Receiver<Result<serde_json::Value, String>>,
        ),
        ChannelError,
    > {
        if !self.is_connected() {
            return Err(ChannelError::ChannelClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let (data_tx, data_rx) = mpsc::channel(self.data_channel_capacity);
        let (result_tx, result_rx) = oneshot::channel();

        lock(&self.pending).insert(id, PendingRequest { data_tx, result_tx });

        // The reader drains pending requests only after marking the channel
        // disconnected, so re-checking here closes the gap where the drain ran
        // before the insert.
        if !self.is_connected() {
            lock(&self.pending).remove(&id);
            return Err(ChannelError::ChannelClosed);
        }

        let req = RangeRequest::new(id, method, params);
        trace!("request {id}: {method}");
        if self.write_tx.send(req.to_json_line()).await.is_err() {
            lock(&self.pending).remove(&id);
            return Err(ChannelError::ChannelClosed);
        }

        Ok((id, data_rx, result_rx))
    }

    /// Send a request and collect all streaming data along with the final result
    pub async fn request_with_data(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<(Vec<serde_json::Value>, serde_json::Value), ChannelError> {
        let (id, mut data_rx, result_rx) = self.request_streaming(method, params).await?;

        let collect = async move {
            let mut data = Vec::new();
            while let Some(chunk) = data_rx.recv().await {
                data.push(chunk);
            }
            let result = result_rx
                .await
                .map_err(|_| ChannelError::ChannelClosed)?
                .map_err(ChannelError::Remote)?;
            Ok::<_, ChannelError>((data, result))
        };

        match self.timeout {
            None => collect.await,
            Some(limit) => match tokio::time::timeout(limit, collect).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    lock(&self.pending).remove(&id);
                    Err(ChannelError::Timeout)
                }
            },
        }
    }
}
