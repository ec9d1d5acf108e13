use std::fmt;
use std::sync::Arc;

use tracing::info;

use logpipe_core::api::{ApiError, LogStreamApi};

use crate::errors::{ClientError, Result};
use crate::reader::StreamReader;
use crate::writer::{StreamWriter, WriterOptions};

/// A named collection of remote log streams.
///
/// The group hands out writers and readers bound to its identity; all
/// remote calls they make carry the group name. Streams are independent of
/// each other, so writers and readers for different streams never share
/// state.
pub struct LogGroup {
    api: Arc<dyn LogStreamApi>,
    group_name: String,
}

impl LogGroup {
    pub fn new(api: Arc<dyn LogStreamApi>, group_name: impl Into<String>) -> Self {
        LogGroup {
            api,
            group_name: group_name.into(),
        }
    }

    /// The remote group identity shared by every stream handle created here.
    pub fn name(&self) -> &str {
        &self.group_name
    }

    /// Create the named stream and return a writer for it.
    ///
    /// A stream that already exists is adopted instead of failing: its
    /// description supplies the sequence token the next submission must
    /// carry. The writer's background flush loop is running by the time
    /// this returns.
    pub async fn create(&self, stream_name: &str, options: WriterOptions) -> Result<StreamWriter> {
        let sequence_token = match &options.initial_sequence_token {
            // An explicit token skips the create/describe exchange.
            Some(token) => Some(token.clone()),
            None => self.resolve_stream(stream_name).await?,
        };

        Ok(StreamWriter::start(
            Arc::clone(&self.api),
            self.group_name.clone(),
            stream_name.to_string(),
            sequence_token,
            options,
        ))
    }

    /// Open a reader over the named stream.
    ///
    /// Construction never fails and the poll loop is running by the time
    /// this returns; a missing stream surfaces once reads are attempted.
    pub fn open(&self, stream_name: &str) -> StreamReader {
        StreamReader::start(
            Arc::clone(&self.api),
            self.group_name.clone(),
            stream_name.to_string(),
        )
    }

    async fn resolve_stream(&self, stream_name: &str) -> Result<Option<String>> {
        match self.api.create_stream(&self.group_name, stream_name).await {
            Ok(()) => {
                info!(group = %self.group_name, stream = %stream_name, "created log stream");
                Ok(None)
            }
            Err(ApiError::AlreadyExists) => self.adopt_existing(stream_name).await,
            Err(source) => Err(ClientError::transport(
                "could not create the log stream",
                source,
            )),
        }
    }

    /// The stream is already there: pick up its sequence token so the next
    /// submission continues where the previous writer left off.
    async fn adopt_existing(&self, stream_name: &str) -> Result<Option<String>> {
        let descriptions = self
            .api
            .describe_streams(&self.group_name, stream_name)
            .await
            .map_err(|source| {
                ClientError::transport("couldn't get the log stream description", source)
            })?;

        match descriptions.into_iter().next() {
            Some(description) => {
                info!(
                    group = %self.group_name,
                    stream = %stream_name,
                    "adopted existing log stream"
                );
                Ok(description.sequence_token)
            }
            None => Err(ClientError::Configuration(format!(
                "stream {} exists but no description matched it",
                stream_name
            ))),
        }
    }
}

impl fmt::Debug for LogGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogGroup")
            .field("group_name", &self.group_name)
            .finish()
    }
}
