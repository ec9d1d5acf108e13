use serde::{Deserialize, Serialize};

/// A single line of stream text, stamped at enqueue time.
///
/// Events are created by the writer when it splits caller input into lines
/// and are immutable once buffered. The same shape comes back from the
/// remote service when a reader pages through a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    // The line text, including its terminator when one was present
    pub message: String,
    // Wall-clock time at enqueue, in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl LogEvent {
    pub fn new(message: impl Into<String>, timestamp: i64) -> Self {
        LogEvent {
            message: message.into(),
            timestamp,
        }
    }
}
