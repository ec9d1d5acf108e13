use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::LogEvent;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure surfaced by a remote log-stream service implementation.
///
/// The variants are deliberately coarse: the adapter never retries a remote
/// call, so all it needs to distinguish is "the stream was already there"
/// from everything else. `Clone` lets a failure be cached and handed back
/// on every subsequent operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("stream already exists")]
    AlreadyExists,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("remote call cancelled")]
    Cancelled,
}

/// Description of one remote stream, as returned by `describe_streams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescription {
    pub stream_name: String,
    // Continuity token the next batch submission for this stream must carry
    pub sequence_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBatchRequest {
    pub group_name: String,
    pub stream_name: String,
    // Events in enqueue order; the batch already satisfies the size/count ceilings
    pub events: Vec<LogEvent>,
    // None is valid only for the very first submission to a brand-new stream
    pub sequence_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBatchResponse {
    pub next_sequence_token: Option<String>,
    // Present when the service accepted the call but refused part of the batch
    pub rejected: Option<RejectedEventsInfo>,
}

/// Index ranges of a submitted batch the service refused to store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEventsInfo {
    pub too_new_start_index: Option<usize>,
    pub too_old_end_index: Option<usize>,
    pub expired_end_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPageRequest {
    pub group_name: String,
    pub stream_name: String,
    // None on the first poll; afterwards the cursor from the last response
    // that made progress
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPageResponse {
    // Page of events in stream order; may be empty
    pub events: Vec<LogEvent>,
    // None means no progress, not a cursor reset
    pub next_cursor: Option<String>,
}

/// Capability interface over the remote log-stream service.
///
/// Implementations own transport, credentials, and any retry/backoff
/// policy; the adapter only reacts to the final outcome of each call.
/// Cancellation and deadlines live behind the implementation as well and
/// surface as [`ApiError::Cancelled`].
#[async_trait]
pub trait LogStreamApi: Send + Sync + 'static {
    /// Create a stream in the group. Creating a stream that already exists
    /// fails with [`ApiError::AlreadyExists`].
    async fn create_stream(&self, group_name: &str, stream_name: &str) -> ApiResult<()>;

    /// List streams in the group whose name starts with `stream_prefix`.
    async fn describe_streams(
        &self,
        group_name: &str,
        stream_prefix: &str,
    ) -> ApiResult<Vec<StreamDescription>>;

    /// Submit one batch of events, threading the stream's sequence token.
    async fn submit_batch(&self, request: SubmitBatchRequest) -> ApiResult<SubmitBatchResponse>;

    /// Fetch the next page of events from the head of the stream.
    async fn fetch_page(&self, request: FetchPageRequest) -> ApiResult<FetchPageResponse>;
}
