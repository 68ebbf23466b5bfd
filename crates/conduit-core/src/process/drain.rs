//! Worker stderr capture
//!
//! The drain owns only the stderr pipe and a handle to the shared sink, so
//! a chatty worker can never stall the protocol pipes.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::ChildStderr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::defaults::diagnostics::MAX_LINE_BYTES;

/// Appended to a stderr line cut at [`MAX_LINE_BYTES`]
pub const TRUNCATION_MARKER: &str = " [truncated]";

/// Bounded ring buffer of diagnostic lines
#[derive(Debug, Clone)]
pub struct DiagnosticSink {
    inner: Arc<Mutex<SinkState>>,
}

#[derive(Debug)]
struct SinkState {
    lines: VecDeque<String>,
    capacity: usize,
    evicted: u64,
}

impl DiagnosticSink {
    /// Create a sink retaining at most `capacity` lines
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(SinkState {
                lines: VecDeque::with_capacity(capacity),
                capacity,
                evicted: 0,
            })),
        }
    }

    /// Append a line, evicting the oldest one when full
    pub fn push(&self, line: impl Into<String>) {
        let mut state = self.inner.lock();
        if state.lines.len() == state.capacity {
            state.lines.pop_front();
            state.evicted += 1;
        }
        state.lines.push_back(line.into());
    }

    /// Copy of the retained lines, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.lock().lines.iter().cloned().collect()
    }

    /// Number of lines dropped because the buffer was full
    pub fn evicted(&self) -> u64 {
        self.inner.lock().evicted
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Forget everything, including the eviction count
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.lines.clear();
        state.evicted = 0;
    }
}

/// Background task moving worker stderr into a [`DiagnosticSink`]
pub struct StderrDrain {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl StderrDrain {
    /// Start draining `stderr` until it closes or the drain is cancelled
    pub fn spawn(stderr: ChildStderr, sink: DiagnosticSink, pid: Option<u32>) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(?pid, "stderr drain cancelled");
                        break;
                    }
                    next = read_capped_line(&mut reader, &mut buf, MAX_LINE_BYTES) => match next {
                        Ok(Some(truncated)) => {
                            let mut line = String::from_utf8_lossy(&buf)
                                .trim_end_matches('\r')
                                .to_string();
                            if truncated {
                                line.push_str(TRUNCATION_MARKER);
                            }
                            debug!(target: "conduit::worker", ?pid, "{}", line);
                            sink.push(line);
                        }
                        Ok(None) => {
                            debug!(?pid, "worker stderr closed");
                            break;
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            debug!(?pid, "worker stderr read failed: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        Self {
            handle,
            cancel_token,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Let the drain reach end of stream, giving up after `limit`
    ///
    /// Used when the worker already exited and its last words are still
    /// in the pipe.
    pub async fn finish(mut self, limit: std::time::Duration) {
        if tokio::time::timeout(limit, &mut self.handle).await.is_err() {
            self.cancel_token.cancel();
            let _ = (&mut self.handle).await;
        }
    }

    /// Stop the drain and wait for the task to exit
    pub async fn stop(mut self) {
        self.cancel_token.cancel();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for StderrDrain {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Read one line into `buf` without its newline, keeping at most `limit` bytes
///
/// Bytes past the limit are consumed and discarded. Returns `None` at end of
/// stream, otherwise whether the line was cut.
async fn read_capped_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> std::io::Result<Option<bool>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut truncated = false;
    let mut seen_any = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(seen_any.then_some(truncated));
        }
        seen_any = true;

        let newline = available.iter().position(|b| *b == b'\n');
        let chunk = match newline {
            Some(end) => &available[..end],
            None => available,
        };
        let room = limit.saturating_sub(buf.len());
        if chunk.len() > room {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);

        let used = newline.map_or(available.len(), |end| end + 1);
        reader.consume(used);
        if newline.is_some() {
            return Ok(Some(truncated));
        }
    }
}
