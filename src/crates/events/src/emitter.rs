//! Bounded-channel event emission with cancellation and timeout semantics
//! (spec §4.1).

use crate::ctx::InvocationContext;
use crate::error::{EventError, Result};
use crate::event::Event;
use std::time::Duration;
use tokio::sync::mpsc;

/// The outer event channel an agent invocation streams into. Cheap to
/// clone; all clones share the same underlying bounded queue.
#[derive(Clone)]
pub struct EventSink {
    sender: mpsc::Sender<Event>,
}

impl EventSink {
    /// Create a sink/source pair backed by a bounded channel of `capacity`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Emit `event` onto the channel.
    ///
    /// - `None` is a no-op success (nothing to send).
    /// - `timeout == Duration::ZERO` blocks until the channel accepts the
    ///   event or `ctx` is cancelled.
    /// - `timeout > Duration::ZERO` additionally races a deadline; on
    ///   expiry returns [`EventError::EmitTimeout`].
    ///
    /// Never mutates `event` — ownership moves into the channel as-is.
    pub async fn emit(
        &self,
        ctx: &InvocationContext,
        event: Option<Event>,
        timeout: Duration,
    ) -> Result<()> {
        let Some(event) = event else {
            return Ok(());
        };

        if timeout.is_zero() {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => Err(EventError::Cancelled(
                    "emit cancelled by ambient context".to_string(),
                )),
                res = self.sender.send(event) => res.map_err(|_| EventError::ChannelClosed),
            }
        } else {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => Err(EventError::Cancelled(
                    "emit cancelled by ambient context".to_string(),
                )),
                res = self.sender.send(event) => res.map_err(|_| EventError::ChannelClosed),
                _ = tokio::time::sleep(timeout) => Err(EventError::EmitTimeout(timeout)),
            }
        }
    }

    /// Capacity currently available before the channel would block.
    pub fn available_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_none_as_noop() {
        let (sink, _rx) = EventSink::channel(1);
        let ctx = InvocationContext::new();
        assert!(sink.emit(&ctx, None, Duration::ZERO).await.is_ok());
    }

    #[tokio::test]
    async fn delivers_in_send_order() {
        let (sink, mut rx) = EventSink::channel(4);
        let ctx = InvocationContext::new();
        for i in 0..3 {
            let e = Event::new("inv", format!("author-{i}"));
            sink.emit(&ctx, Some(e), Duration::ZERO).await.unwrap();
        }
        for i in 0..3 {
            let got = rx.recv().await.unwrap();
            assert_eq!(got.author, format!("author-{i}"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_channel_stays_full() {
        let (sink, _rx) = EventSink::channel(1);
        let ctx = InvocationContext::new();
        // Fill the one slot; receiver is kept alive but never drained.
        sink.emit(&ctx, Some(Event::new("inv", "a")), Duration::ZERO)
            .await
            .unwrap();

        let err = sink
            .emit(&ctx, Some(Event::new("inv", "b")), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::EmitTimeout(_)));
    }

    #[tokio::test]
    async fn cancellation_takes_priority_over_a_blocked_send() {
        let (sink, _rx) = EventSink::channel(1);
        let ctx = InvocationContext::new();
        sink.emit(&ctx, Some(Event::new("inv", "a")), Duration::ZERO)
            .await
            .unwrap();

        ctx.cancel();
        let err = sink
            .emit(&ctx, Some(Event::new("inv", "b")), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Cancelled(_)));
    }
}
