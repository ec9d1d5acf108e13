use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

use logpipe_core::api::{FetchPageRequest, LogStreamApi};

use crate::errors::{ClientError, Result};

/// The remote API accepts at most 10 page fetches per second per stream.
pub(crate) const FETCH_THROTTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
enum ReaderState {
    Open,
    Errored(ClientError),
}

/// Pull-based byte source over one remote log stream.
///
/// A background task pages through the stream at the permitted call rate,
/// appending each event's text to an internal buffer that `read` drains in
/// FIFO order. The first remote failure is sticky: polling halts and every
/// later `read` returns the same error.
pub struct StreamReader {
    shared: Arc<ReaderShared>,
    // Signals the background poll loop to stop.
    shutdown_tx: mpsc::Sender<()>,
}

struct ReaderShared {
    api: Arc<dyn LogStreamApi>,
    group_name: String,
    stream_name: String,
    // Text accumulated from fetched pages, drained FIFO by `read`.
    buffer: Mutex<VecDeque<u8>>,
    state: RwLock<ReaderState>,
}

impl StreamReader {
    /// Construct the reader and spawn its background poll loop.
    pub(crate) fn start(
        api: Arc<dyn LogStreamApi>,
        group_name: String,
        stream_name: String,
    ) -> Self {
        let (reader, shutdown_rx) = StreamReader::new(api, group_name, stream_name);
        let shared = Arc::clone(&reader.shared);
        tokio::spawn(run_poll_loop(shared, shutdown_rx));
        reader
    }

    /// Construct the reader without spawning the poll loop. Polls are then
    /// driven explicitly through `poll_now` with a caller-held cursor.
    #[cfg(test)]
    pub(crate) fn detached(
        api: Arc<dyn LogStreamApi>,
        group_name: String,
        stream_name: String,
    ) -> Self {
        StreamReader::new(api, group_name, stream_name).0
    }

    fn new(
        api: Arc<dyn LogStreamApi>,
        group_name: String,
        stream_name: String,
    ) -> (Self, mpsc::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let shared = Arc::new(ReaderShared {
            api,
            group_name,
            stream_name,
            buffer: Mutex::new(VecDeque::new()),
            state: RwLock::new(ReaderState::Open),
        });
        (
            StreamReader {
                shared,
                shutdown_tx,
            },
            shutdown_rx,
        )
    }

    /// Pull accumulated stream text into `buf`.
    ///
    /// `Ok(0)` means nothing has arrived yet. A live stream has no
    /// end-of-stream marker, so callers poll again later instead of
    /// treating an empty read as final.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if let ReaderState::Errored(err) = &*self.shared.state.read().await {
            return Err(err.clone());
        }

        let mut inner = self.shared.buffer.lock().await;
        let count = buf.len().min(inner.len());
        for (dst, src) in buf.iter_mut().zip(inner.drain(..count)) {
            *dst = src;
        }
        Ok(count)
    }

    /// Stop the background poll loop. Text already buffered stays readable.
    pub fn close(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    /// Fetch one page immediately, threading the caller-held cursor.
    #[cfg(test)]
    pub(crate) async fn poll_now(&self, cursor: &mut Option<String>) -> Result<()> {
        self.shared.poll_page(cursor).await
    }
}

impl fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("group_name", &self.shared.group_name)
            .field("stream_name", &self.shared.stream_name)
            .finish()
    }
}

impl ReaderShared {
    /// Fetch the next page and append its text to the buffer.
    async fn poll_page(&self, cursor: &mut Option<String>) -> Result<()> {
        let response = self
            .api
            .fetch_page(FetchPageRequest {
                group_name: self.group_name.clone(),
                stream_name: self.stream_name.clone(),
                cursor: cursor.clone(),
            })
            .await
            .map_err(|source| ClientError::transport("page fetch failed", source))?;

        // An absent cursor signals no progress, never a reset; keep the one
        // already held so the next poll resumes from the same position.
        if response.next_cursor.is_some() {
            *cursor = response.next_cursor;
        }

        if response.events.is_empty() {
            return Ok(());
        }

        let mut buffer = self.buffer.lock().await;
        for event in &response.events {
            buffer.extend(event.message.as_bytes());
        }
        Ok(())
    }

    async fn set_error(&self, err: ClientError) {
        let mut state = self.state.write().await;
        if matches!(*state, ReaderState::Open) {
            *state = ReaderState::Errored(err);
        }
    }
}

/// Background poll loop: one page fetch per throttle tick, until the
/// reader is closed or a fetch fails.
async fn run_poll_loop(shared: Arc<ReaderShared>, mut shutdown_rx: mpsc::Receiver<()>) {
    let mut throttle = interval(FETCH_THROTTLE);
    throttle.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cursor: Option<String> = None;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,

            _ = throttle.tick() => {
                if let Err(err) = shared.poll_page(&mut cursor).await {
                    warn!(
                        error = %err,
                        stream = %shared.stream_name,
                        "page fetch failed, stopping the poll loop"
                    );
                    shared.set_error(err).await;
                    break;
                }
            }
        }
    }
}
