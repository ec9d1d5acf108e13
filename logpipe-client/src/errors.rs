use thiserror::Error;

use logpipe_core::api::{ApiError, RejectedEventsInfo};

pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors returned by writers, readers and the group factory.
///
/// A `Transport` or `Rejected` error that occurs inside a background loop
/// is cached on the owning writer/reader and returned, cloned, by every
/// later `write`/`read` call; recovery means constructing a fresh instance.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: ApiError,
    },

    #[error("no matching stream description: {0}")]
    Configuration(String),

    #[error("log events were rejected by the stream")]
    Rejected(RejectedEventsInfo),

    #[error("writer is closed")]
    Closed,
}

impl ClientError {
    pub(crate) fn transport(context: impl Into<String>, source: ApiError) -> Self {
        ClientError::Transport {
            context: context.into(),
            source,
        }
    }

    /// The rejection report, when the error is a partial or full rejection.
    pub fn rejected_info(&self) -> Option<&RejectedEventsInfo> {
        match self {
            ClientError::Rejected(info) => Some(info),
            _ => None,
        }
    }
}
