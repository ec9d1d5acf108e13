use logpipe_core::event::LogEvent;

// Ceilings the remote submission API imposes on a single batch.
pub(crate) const MAX_BATCH_SIZE_BYTES: usize = 1_048_576;
pub(crate) const MAX_BATCH_SIZE_EVENTS: usize = 10_000;
// Fixed per-event accounting overhead on top of the message length.
pub(crate) const EVENT_PADDING_BYTES: usize = 26;

/// One bounded group of events, submitted together in a single remote call.
///
/// A batch grows by appending until either ceiling would be exceeded, at
/// which point the buffer seals it and starts a new one. A sealed batch is
/// therefore always under both limits, and no event is ever split across
/// two batches.
#[derive(Debug, Default)]
pub(crate) struct LogBatch {
    size: usize,
    events: Vec<LogEvent>,
}

impl LogBatch {
    pub(crate) fn new() -> Self {
        LogBatch::default()
    }

    /// Bytes the event counts toward the batch size ceiling.
    pub(crate) fn padded_size(event: &LogEvent) -> usize {
        event.message.len() + EVENT_PADDING_BYTES
    }

    /// Whether the event fits without breaking either ceiling.
    pub(crate) fn accepts(&self, event: &LogEvent) -> bool {
        self.size + Self::padded_size(event) <= MAX_BATCH_SIZE_BYTES
            && self.events.len() < MAX_BATCH_SIZE_EVENTS
    }

    pub(crate) fn push(&mut self, event: LogEvent) {
        self.size += Self::padded_size(&event);
        self.events.push(event);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take the batch contents, leaving it empty.
    pub(crate) fn take(&mut self) -> Vec<LogEvent> {
        self.size = 0;
        std::mem::take(&mut self.events)
    }

    pub(crate) fn into_events(self) -> Vec<LogEvent> {
        self.events
    }
}
