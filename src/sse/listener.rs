//! Background task that forwards events from a reader onto a channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use super::{Event, EventReader, SseError};

/// Number of events buffered between the listener task and the receiver.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Spawn a task that reads `reader` to completion and forwards every event.
///
/// The task stops when the stream ends, a read fails (the error is sent
/// first), the receiver is dropped, or [`EventReceiver::cancel`] is called.
/// The channel closes once the task stops.
pub fn spawn_listener<R>(reader: EventReader<R>) -> EventReceiver
where
    R: AsyncRead + Unpin + Send + 'static,
{
    spawn_listener_with_capacity(reader, DEFAULT_CHANNEL_CAPACITY)
}

/// Like [`spawn_listener`], with an explicit channel capacity.
pub fn spawn_listener_with_capacity<R>(
    mut reader: EventReader<R>,
    capacity: usize,
) -> EventReceiver
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        let mut forwarded = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(forwarded, "event listener cancelled");
                    break;
                }
                next = reader.read_event() => next,
            };

            match next {
                Ok(Some(event)) => {
                    if tx.send(Ok(event)).await.is_err() {
                        debug!(forwarded, "event receiver dropped");
                        break;
                    }
                    forwarded += 1;
                },
                Ok(None) => {
                    debug!(forwarded, "event stream ended");
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "event stream failed");
                    let _ = tx.send(Err(e)).await;
                    break;
                },
            }
        }
    });

    let guard = cancel.clone().drop_guard();
    EventReceiver {
        rx,
        cancel,
        _guard: guard,
    }
}

/// Receiving half of a spawned event listener.
///
/// Dropping the receiver cancels the listener task.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Result<Event, SseError>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl EventReceiver {
    /// Wait for the next event. Returns `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<Result<Event, SseError>> {
        self.rx.recv().await
    }

    /// Stop the listener task. Events already buffered can still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether [`cancel`](Self::cancel) was called or the receiver is shutting down.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drain the channel, collecting every event until it closes.
    ///
    /// Stops at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<Event>, SseError> {
        let mut events = Vec::new();
        while let Some(next) = self.recv().await {
            events.push(next?);
        }
        Ok(events)
    }
}

impl Stream for EventReceiver {
    type Item = Result<Event, SseError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;
    use tokio_stream::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_listener_forwards_events_then_closes() {
        let body: &'static [u8] = b"id: 1\ndata: a\n\nid: 2\ndata: b\n\n";
        let mut receiver = spawn_listener(EventReader::new(body));

        let first = receiver.recv().await.unwrap().unwrap();
        assert_eq!(first.id, "1");
        let second = receiver.recv().await.unwrap().unwrap();
        assert_eq!(second.data, "b");
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_listener_as_stream() {
        let body: &'static [u8] = b"data: x\n\ndata: y\n\n";
        let data: Vec<String> = spawn_listener(EventReader::new(body))
            .map(|event| event.unwrap().data)
            .collect()
            .await;
        assert_eq!(data, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_listener_cancel_closes_channel() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut receiver = spawn_listener(EventReader::new(reader));

        writer.write_all(b"data: first\n\n").await.unwrap();
        assert_eq!(receiver.recv().await.unwrap().unwrap().data, "first");

        receiver.cancel();
        assert!(receiver.is_cancelled());
        let closed = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("channel should close after cancel");
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn test_listener_forwards_error() {
        let mock = tokio_test::io::Builder::new()
            .read(b"data: ok\n\n")
            .read_error(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed",
            ))
            .build();
        let mut receiver = spawn_listener(EventReader::new(mock));

        assert_eq!(receiver.recv().await.unwrap().unwrap().data, "ok");
        assert!(matches!(receiver.recv().await, Some(Err(SseError::Io(_)))));
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_collect_stops_at_end() {
        let body: &'static [u8] = b"data: 1\n\ndata: 2\n\ndata: 3";
        let events = spawn_listener_with_capacity(EventReader::new(body), 1)
            .collect_all()
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].data, "3");
    }
}
