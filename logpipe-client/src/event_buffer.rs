use std::collections::VecDeque;

use tokio::sync::RwLock;
use tracing::warn;

use logpipe_core::event::LogEvent;

use crate::batch::{LogBatch, MAX_BATCH_SIZE_BYTES};

/// FIFO buffer of batches shared between writers and the flush loop.
///
/// Batches form a growable sequence with the oldest at the front; only the
/// back batch still accepts events. Producers append concurrently under the
/// write lock, and the single consumer drains whole batches from the front.
#[derive(Debug)]
pub(crate) struct EventBuffer {
    batches: RwLock<VecDeque<LogBatch>>,
}

impl EventBuffer {
    pub(crate) fn new() -> Self {
        let mut batches = VecDeque::new();
        batches.push_back(LogBatch::new());
        EventBuffer {
            batches: RwLock::new(batches),
        }
    }

    /// Append an event to the tail batch, sealing it and starting a fresh
    /// one when either batch ceiling would be exceeded.
    ///
    /// Events with an empty message are dropped, as are events too large to
    /// ever fit in a batch on their own.
    pub(crate) async fn add(&self, event: LogEvent) {
        if event.message.is_empty() {
            return;
        }
        if LogBatch::padded_size(&event) > MAX_BATCH_SIZE_BYTES {
            warn!(
                size = LogBatch::padded_size(&event),
                limit = MAX_BATCH_SIZE_BYTES,
                "dropping event larger than the maximum batch size"
            );
            return;
        }

        let mut batches = self.batches.write().await;
        let tail = batches.back_mut().expect("buffer holds at least one batch");
        if tail.accepts(&event) {
            tail.push(event);
        } else {
            // Seals the current tail; the event starts the next batch.
            let mut fresh = LogBatch::new();
            fresh.push(event);
            batches.push_back(fresh);
        }
    }

    /// Take the oldest batch off the buffer.
    ///
    /// An empty result means nothing was ready; the caller must tolerate it
    /// regardless of any earlier `has_pending` answer.
    pub(crate) async fn drain(&self) -> Vec<LogEvent> {
        let mut batches = self.batches.write().await;
        if batches.len() == 1 {
            let tail = batches.front_mut().expect("buffer holds at least one batch");
            return tail.take();
        }
        batches
            .pop_front()
            .map(LogBatch::into_events)
            .unwrap_or_default()
    }

    /// Whether the head batch currently holds anything to flush. A cheap
    /// hint for the flush loop, not a correctness gate.
    pub(crate) async fn has_pending(&self) -> bool {
        let batches = self.batches.read().await;
        batches.front().is_some_and(|batch| !batch.is_empty())
    }
}
