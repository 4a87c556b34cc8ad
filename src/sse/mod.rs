//! Server-Sent Events support.
//!
//! This module turns a `text/event-stream` body into discrete [`Event`]s.
//!
//! - [`EventReader`] is the line-oriented scanner. It pulls bytes from any
//!   [`tokio::io::AsyncRead`] and yields one event per call to
//!   [`EventReader::read_event`].
//! - [`spawn_listener`] drives a reader from a background task and forwards
//!   events on a channel, returning an [`EventReceiver`].
//!
//! # Example
//!
//! ```
//! use unikraft_cloud_provider::sse::EventReader;
//!
//! # tokio_test::block_on(async {
//! let body: &[u8] = b"id: 7\ndata: booting\ndata: ready\n\n";
//! let mut reader = EventReader::new(body);
//!
//! let event = reader.read_event().await.unwrap().unwrap();
//! assert_eq!(event.id, "7");
//! assert_eq!(event.data, "booting\nready");
//!
//! assert!(reader.read_event().await.unwrap().is_none());
//! # });
//! ```

mod event;
mod listener;
mod reader;

pub use event::Event;
pub use listener::{
    spawn_listener, spawn_listener_with_capacity, EventReceiver, DEFAULT_CHANNEL_CAPACITY,
};
pub use reader::EventReader;

use thiserror::Error;

/// MIME type of a Server-Sent Events body.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Errors produced while reading an event stream.
#[derive(Debug, Error)]
pub enum SseError {
    /// The underlying byte stream failed.
    #[error("event stream read failed: {0}")]
    Io(#[from] std::io::Error),
}
