//! Logpipe-Client
//!
//! Logpipe-Client -- byte-stream access to remote log streams
//!
//! A [`LogGroup`] hands out writers and readers bound to one remote group.
//! The writer splits caller bytes into line events, batches them under the
//! service's size/count ceilings and flushes in the background at the
//! permitted call rate; the reader pages through the stream in the
//! background and exposes the accumulated text as a pull-based byte source.

mod batch;

mod event_buffer;
mod event_buffer_test;

pub mod errors;

mod group;
pub use group::LogGroup;

mod reader;
pub use reader::StreamReader;

mod writer;
pub use writer::{StreamWriter, WriterOptions};

#[cfg(test)]
mod mock_api;
