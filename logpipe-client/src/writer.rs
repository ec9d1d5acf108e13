use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use logpipe_core::api::{LogStreamApi, SubmitBatchRequest};
use logpipe_core::event::LogEvent;

use crate::errors::{ClientError, Result};
use crate::event_buffer::EventBuffer;

/// The remote API accepts at most 5 batch submissions per second per stream.
pub(crate) const SUBMIT_THROTTLE: Duration = Duration::from_millis(200);

/// Clock stamping events at enqueue time, in epoch milliseconds.
pub(crate) type ClockFn = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Hook observing, and possibly amending, each event before it is buffered.
pub(crate) type EventInspector = Arc<dyn Fn(&mut LogEvent) + Send + Sync>;

/// Configuration overrides applied when creating a `StreamWriter`.
#[derive(Clone, Default)]
pub struct WriterOptions {
    pub(crate) inspector: Option<EventInspector>,
    pub(crate) initial_sequence_token: Option<String>,
    pub(crate) clock: Option<ClockFn>,
}

impl WriterOptions {
    pub fn new() -> Self {
        WriterOptions::default()
    }

    /// Sets a hook invoked with each event after line splitting, before the
    /// event is buffered. The hook may amend the event in place.
    pub fn with_inspector(
        mut self,
        inspector: impl Fn(&mut LogEvent) + Send + Sync + 'static,
    ) -> Self {
        self.inspector = Some(Arc::new(inspector));
        self
    }

    /// Starts the writer from an arbitrary sequence token, skipping the
    /// create/describe exchange against the remote service entirely.
    pub fn with_sequence_token(mut self, token: impl Into<String>) -> Self {
        self.initial_sequence_token = Some(token.into());
        self
    }

    /// Replaces the wall clock used for event timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }
}

impl fmt::Debug for WriterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterOptions")
            .field("initial_sequence_token", &self.initial_sequence_token)
            .field("has_inspector", &self.inspector.is_some())
            .field("has_clock", &self.clock.is_some())
            .finish()
    }
}

/// Lifecycle of a writer. `Closed` and `Errored` are terminal.
#[derive(Debug, Clone)]
enum WriterState {
    Open,
    Closed,
    Errored(ClientError),
}

/// Byte sink over one remote log stream.
///
/// `write` splits input into line events and buffers them locally; a
/// background task flushes completed batches at the permitted call rate,
/// threading the stream's sequence token from one submission into the
/// next. The first remote failure is sticky: the flush loop halts and
/// every later `write` returns the same error.
pub struct StreamWriter {
    shared: Arc<WriterShared>,
    // Signals the background flush loop to stop.
    shutdown_tx: mpsc::Sender<()>,
}

struct WriterShared {
    api: Arc<dyn LogStreamApi>,
    group_name: String,
    stream_name: String,
    buffer: EventBuffer,
    state: RwLock<WriterState>,
    // Serializes flush cycles against each other and against close; the
    // sequence token only changes while this lock is held.
    flush: Mutex<FlushState>,
    clock: ClockFn,
    inspector: Option<EventInspector>,
}

struct FlushState {
    sequence_token: Option<String>,
}

impl StreamWriter {
    /// Construct the writer and spawn its background flush loop.
    pub(crate) fn start(
        api: Arc<dyn LogStreamApi>,
        group_name: String,
        stream_name: String,
        sequence_token: Option<String>,
        options: WriterOptions,
    ) -> Self {
        let (writer, shutdown_rx) =
            StreamWriter::new(api, group_name, stream_name, sequence_token, options);
        let shared = Arc::clone(&writer.shared);
        tokio::spawn(run_flush_loop(shared, shutdown_rx));
        writer
    }

    /// Construct the writer without spawning the flush loop. Flush cycles
    /// are then driven explicitly through `flush_now`.
    #[cfg(test)]
    pub(crate) fn detached(
        api: Arc<dyn LogStreamApi>,
        group_name: String,
        stream_name: String,
        sequence_token: Option<String>,
        options: WriterOptions,
    ) -> Self {
        StreamWriter::new(api, group_name, stream_name, sequence_token, options).0
    }

    fn new(
        api: Arc<dyn LogStreamApi>,
        group_name: String,
        stream_name: String,
        sequence_token: Option<String>,
        options: WriterOptions,
    ) -> (Self, mpsc::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let shared = Arc::new(WriterShared {
            api,
            group_name,
            stream_name,
            buffer: EventBuffer::new(),
            state: RwLock::new(WriterState::Open),
            flush: Mutex::new(FlushState { sequence_token }),
            clock: options.clock.unwrap_or_else(|| Arc::new(system_millis)),
            inspector: options.inspector,
        });
        (
            StreamWriter {
                shared,
                shutdown_tx,
            },
            shutdown_rx,
        )
    }

    /// Buffer `buf` as one log event per line.
    ///
    /// The line terminator stays with its line, and a trailing line without
    /// one is buffered immediately rather than held back. The whole input
    /// is always consumed; delivery happens asynchronously, so a remote
    /// failure surfaces on a later call.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        match &*self.shared.state.read().await {
            WriterState::Open => {}
            WriterState::Closed => return Err(ClientError::Closed),
            WriterState::Errored(err) => return Err(err.clone()),
        }
        self.shared.enqueue(buf).await;
        Ok(buf.len())
    }

    /// Close the writer, draining whatever is still buffered.
    ///
    /// Exactly one final flush cycle runs, and its outcome is returned.
    /// Afterwards every `write`, and any further `close`, fails with
    /// [`ClientError::Closed`].
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.shared.state.write().await;
            if matches!(*state, WriterState::Closed) {
                return Err(ClientError::Closed);
            }
            *state = WriterState::Closed;
        }
        // Stop the background loop; the cycle below drains the remainder.
        let _ = self.shutdown_tx.try_send(());
        self.shared.flush_cycle().await
    }

    /// The stream's current continuity token, as adopted from the last
    /// successful submission (or supplied at creation).
    pub async fn sequence_token(&self) -> Option<String> {
        self.shared.flush.lock().await.sequence_token.clone()
    }

    /// Run one flush cycle immediately, recording any failure as sticky.
    #[cfg(test)]
    pub(crate) async fn flush_now(&self) -> Result<()> {
        flush_and_record(&self.shared).await
    }
}

impl fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWriter")
            .field("group_name", &self.shared.group_name)
            .field("stream_name", &self.shared.stream_name)
            .finish()
    }
}

impl WriterShared {
    async fn enqueue(&self, buf: &[u8]) {
        for line in buf.split_inclusive(|byte| *byte == b'\n') {
            let mut event = LogEvent {
                message: String::from_utf8_lossy(line).into_owned(),
                timestamp: (self.clock)(),
            };
            if let Some(inspector) = &self.inspector {
                inspector(&mut event);
            }
            self.buffer.add(event).await;
        }
    }

    /// Run one flush cycle: drain the oldest batch and submit it with the
    /// current sequence token. Cycles are serialized by the flush lock,
    /// which keeps the token hand-off strictly ordered across submissions.
    async fn flush_cycle(&self) -> Result<()> {
        let mut flush = self.flush.lock().await;

        let events = self.buffer.drain().await;
        if events.is_empty() {
            return Ok(());
        }
        let count = events.len();

        let response = self
            .api
            .submit_batch(SubmitBatchRequest {
                group_name: self.group_name.clone(),
                stream_name: self.stream_name.clone(),
                events,
                sequence_token: flush.sequence_token.clone(),
            })
            .await
            .map_err(|source| ClientError::transport("batch submission failed", source))?;

        // A rejection means part of the batch is lost; treat it like any
        // other terminal failure.
        if let Some(rejected) = response.rejected {
            return Err(ClientError::Rejected(rejected));
        }

        flush.sequence_token = response.next_sequence_token;
        debug!(
            count,
            stream = %self.stream_name,
            "flushed batch to remote stream"
        );
        Ok(())
    }

    async fn set_error(&self, err: ClientError) {
        let mut state = self.state.write().await;
        if matches!(*state, WriterState::Open) {
            *state = WriterState::Errored(err);
        }
    }
}

async fn flush_and_record(shared: &WriterShared) -> Result<()> {
    match shared.flush_cycle().await {
        Ok(()) => Ok(()),
        Err(err) => {
            shared.set_error(err.clone()).await;
            Err(err)
        }
    }
}

/// Background flush loop: one flush cycle per throttle tick, until the
/// writer closes, errors out, or signals shutdown.
async fn run_flush_loop(shared: Arc<WriterShared>, mut shutdown_rx: mpsc::Receiver<()>) {
    let mut throttle = interval(SUBMIT_THROTTLE);
    throttle.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,

            _ = throttle.tick() => {
                if !matches!(&*shared.state.read().await, WriterState::Open) {
                    break;
                }
                if !shared.buffer.has_pending().await {
                    continue;
                }
                if let Err(err) = flush_and_record(&shared).await {
                    warn!(
                        error = %err,
                        stream = %shared.stream_name,
                        "flush failed, stopping the flush loop"
                    );
                    break;
                }
            }
        }
    }
}

fn system_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
