//! Cancellable transaction stream handles.

use super::types::StreamEvent;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Cancellation token shared between a stream handle and the task feeding it.
///
/// Cancelling only records the request; the producer decides when the stream actually ends.
#[derive(Clone)]
pub struct CancelToken {
	sender: Arc<watch::Sender<bool>>,
}

impl CancelToken {
	/// Create a new token in the non-cancelled state.
	pub fn new() -> Self {
		let (sender, _) = watch::channel(false);
		Self {
			sender: Arc::new(sender),
		}
	}

	/// Returns `true` if cancellation has been requested.
	pub fn is_cancelled(&self) -> bool {
		*self.sender.borrow()
	}

	/// Request cancellation and wake any waiters.
	pub fn cancel(&self) {
		self.sender.send_replace(true);
	}

	/// Await until cancellation is requested.
	pub async fn cancelled(&self) {
		let mut receiver = self.sender.subscribe();
		// The sender lives in `self`, so `wait_for` can only resolve through a cancel.
		let _ = receiver.wait_for(|cancelled| *cancelled).await;
	}
}

impl Default for CancelToken {
	fn default() -> Self {
		Self::new()
	}
}

/// An open subscription. Events come out strictly in arrival order.
#[async_trait::async_trait]
pub trait TransactionStream: Send {
	/// Wait for the next event. Once the producer is gone this keeps returning `End`.
	async fn next_event(&mut self) -> StreamEvent;

	/// Ask the transport to stop streaming. The stream still finishes with `End` or `Error`.
	fn cancel(&mut self);
}

/// Stream handle fed by a background task through a channel.
pub struct ChannelStream {
	events: mpsc::Receiver<StreamEvent>,
	cancel: CancelToken,
}

impl ChannelStream {
	pub fn new(events: mpsc::Receiver<StreamEvent>, cancel: CancelToken) -> Self {
		Self { events, cancel }
	}
}

#[async_trait::async_trait]
impl TransactionStream for ChannelStream {
	async fn next_event(&mut self) -> StreamEvent {
		self.events.recv().await.unwrap_or(StreamEvent::End)
	}

	fn cancel(&mut self) {
		self.cancel.cancel();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::StreamResponse;

	#[tokio::test]
	async fn channel_stream_yields_events_then_end() {
		let (tx, rx) = mpsc::channel(4);
		let mut stream = ChannelStream::new(rx, CancelToken::new());

		tx.send(StreamEvent::Data(StreamResponse::default())).await.unwrap();
		drop(tx);

		assert!(matches!(stream.next_event().await, StreamEvent::Data(_)));
		assert!(matches!(stream.next_event().await, StreamEvent::End));
		assert!(matches!(stream.next_event().await, StreamEvent::End));
	}

	#[tokio::test]
	async fn cancel_wakes_waiting_producer() {
		let token = CancelToken::new();
		let (_tx, rx) = mpsc::channel(1);
		let mut stream = ChannelStream::new(rx, token.clone());

		let waiter = tokio::spawn({
			let token = token.clone();
			async move { token.cancelled().await }
		});

		assert!(!token.is_cancelled());
		stream.cancel();
		assert!(token.is_cancelled());
		tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
			.await
			.expect("waiter should be woken")
			.unwrap();
	}
}
