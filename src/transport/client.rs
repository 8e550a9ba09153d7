//!
//! WebSocket and JSON-RPC client for the filtered transaction stream service.
//!
//! Subscriptions run over a WebSocket using the `connection_init`/`subscribe`/`next`/`complete`
//! message flow, block lookups go through HTTP JSON-RPC. Each subscription gets a background
//! task that forwards frames into a channel-backed [`ChannelStream`].

use super::stream::{CancelToken, ChannelStream, TransactionStream};
use super::types::*;
use super::Transport;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{
	connect_async,
	tungstenite::{Message, client::IntoClientRequest},
};
use tracing::{debug, error, info, warn};

const SUBSCRIPTION_ID: &str = "transactions-with-proofs";
const EVENT_BUFFER: usize = 64;

/// Remote transport client
#[derive(Clone)]
pub struct RemoteTransportClient {
	/// The underlying HTTP client for JSON-RPC calls.
	http_client: Client,
	/// JSON-RPC endpoint.
	rpc_url: String,
	/// The WebSocket URL for stream subscriptions.
	ws_url: String,
}

/// A decoded WebSocket text frame.
#[derive(Debug)]
enum Frame {
	Next(StreamResponse),
	Error(TransportError),
	Complete,
	Ignored,
}

impl RemoteTransportClient {
	/// Create a new transport client.
	///
	/// # Arguments
	/// * `rpc_url` - The HTTP JSON-RPC endpoint.
	/// * `ws_url` - The WebSocket endpoint for subscriptions.
	/// * `request_timeout` - Timeout applied to every HTTP request.
	pub fn new(
		rpc_url: String,
		ws_url: String,
		request_timeout: Duration,
	) -> Result<Self, TransportError> {
		let http_client = Client::builder().timeout(request_timeout).build()?;

		Ok(Self {
			http_client,
			rpc_url,
			ws_url,
		})
	}

	/// Execute a JSON-RPC call and return its `result` member.
	pub async fn call(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<serde_json::Value, TransportError> {
		let request_body = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": method,
			"params": params,
		});

		let response = self
			.http_client
			.post(&self.rpc_url)
			.header("Content-Type", "application/json")
			.json(&request_body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(TransportError::ProtocolError(format!(
				"HTTP error: {}",
				response.status()
			)));
		}

		let mut response_json: serde_json::Value = response.json().await?;

		if let Some(error) = response_json.get("error").filter(|e| !e.is_null()) {
			return Err(TransportError::ProtocolError(format!(
				"RPC error calling {}: {}",
				method, error
			)));
		}

		match response_json.get_mut("result").map(serde_json::Value::take) {
			Some(result) if !result.is_null() => Ok(result),
			_ => Err(TransportError::NoData),
		}
	}
}

#[async_trait::async_trait]
impl Transport for RemoteTransportClient {
	async fn subscribe_to_transactions_with_proofs(
		&self,
		addresses: &[String],
		options: &SubscriptionOptions,
	) -> Result<Box<dyn TransactionStream>, TransportError> {
		debug!("Attempting WebSocket connection to: {}", self.ws_url);

		let mut request = self.ws_url.clone().into_client_request()?;
		request.headers_mut().insert(
			"Sec-WebSocket-Protocol",
			"graphql-transport-ws".parse().map_err(|_| {
				TransportError::ProtocolError(
					"Invalid WebSocket subprotocol header value".to_string(),
				)
			})?,
		);

		let (ws_stream, response) = connect_async(request).await?;
		debug!(
			"WebSocket connection established, response status: {}",
			response.status()
		);
		let (mut ws_sender, mut ws_receiver) = ws_stream.split();

		ws_sender
			.send(Message::Text(json!({ "type": "connection_init" }).to_string()))
			.await?;

		// Wait for connection ack
		match ws_receiver.next().await {
			Some(msg) => match msg? {
				Message::Text(text) => {
					let parsed: serde_json::Value = serde_json::from_str(&text)?;
					if parsed.get("type").and_then(|t| t.as_str()) != Some("connection_ack") {
						return Err(TransportError::ProtocolError(
							"Connection not acknowledged".to_string(),
						));
					}
				}
				_ => {
					return Err(TransportError::ProtocolError(
						"Unexpected message type during handshake".to_string(),
					));
				}
			},
			None => {
				return Err(TransportError::StreamClosed(
					"connection closed during handshake".to_string(),
				));
			}
		}

		ws_sender
			.send(Message::Text(
				subscribe_message(addresses, options).to_string(),
			))
			.await?;

		info!(
			"Subscribed to transactions with proofs for {} addresses from {:?} (count {})",
			addresses.len(),
			options.from,
			options.count
		);

		let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
		let cancel = CancelToken::new();
		let task_cancel = cancel.clone();

		tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = task_cancel.cancelled() => {
						debug!("Cancellation requested, completing subscription");
						let complete = json!({ "id": SUBSCRIPTION_ID, "type": "complete" });
						if let Err(e) = ws_sender.send(Message::Text(complete.to_string())).await {
							warn!("Failed to send complete message: {}", e);
						}
						let _ = ws_sender.close().await;
						let _ = events_tx.send(StreamEvent::End).await;
						break;
					}
					msg = ws_receiver.next() => {
						let event = match msg {
							Some(Ok(Message::Text(text))) => match parse_frame(&text) {
								Frame::Next(response) => StreamEvent::Data(response),
								Frame::Error(e) => StreamEvent::Error(e),
								Frame::Complete => StreamEvent::End,
								Frame::Ignored => continue,
							},
							Some(Ok(Message::Close(_))) | None => StreamEvent::End,
							Some(Ok(_)) => continue,
							Some(Err(e)) => {
								error!("Error in transaction stream: {}", e);
								StreamEvent::Error(TransportError::WebSocketError(e))
							}
						};

						let terminal = !matches!(event, StreamEvent::Data(_));
						if events_tx.send(event).await.is_err() {
							debug!("Stream handle dropped, stopping subscription task");
							break;
						}
						if terminal {
							break;
						}
					}
				}
			}
		});

		Ok(Box::new(ChannelStream::new(events_rx, cancel)))
	}

	async fn get_block_by_hash(&self, hash: &str) -> Result<Block, TransportError> {
		debug!("Fetching block {}", hash);
		let result = self.call("getBlock", json!({ "hash": hash })).await?;
		Ok(serde_json::from_value(result)?)
	}
}

fn subscribe_message(addresses: &[String], options: &SubscriptionOptions) -> serde_json::Value {
	let mut params = json!({
		"addresses": addresses,
		"count": options.count,
	});
	match &options.from {
		BlockLocator::Hash(hash) => params["fromBlockHash"] = json!(hash),
		BlockLocator::Height(height) => params["fromBlockHeight"] = json!(height),
	}

	json!({
		"id": SUBSCRIPTION_ID,
		"type": "subscribe",
		"payload": {
			"method": "subscribeToTransactionsWithProofs",
			"params": params,
		}
	})
}

fn parse_frame(text: &str) -> Frame {
	let parsed = match serde_json::from_str::<serde_json::Value>(text) {
		Ok(parsed) => parsed,
		Err(e) => return Frame::Error(TransportError::JsonError(e)),
	};

	let Some(msg_type) = parsed.get("type").and_then(|t| t.as_str()) else {
		return Frame::Error(TransportError::ProtocolError(
			"Message missing type field".to_string(),
		));
	};

	match msg_type {
		"next" => match parsed.get("payload") {
			Some(payload) => match serde_json::from_value::<StreamResponse>(payload.clone()) {
				Ok(response) => Frame::Next(response),
				Err(e) => {
					error!("Failed to deserialize stream response: {}", e);
					Frame::Error(TransportError::JsonError(e))
				}
			},
			None => Frame::Error(TransportError::NoData),
		},
		"error" => {
			let error_msg = parsed
				.get("payload")
				.and_then(|p| p.get("message"))
				.and_then(|m| m.as_str())
				.unwrap_or("Unknown subscription error");
			Frame::Error(TransportError::ProtocolError(error_msg.to_string()))
		}
		"complete" => {
			debug!("Transaction subscription completed");
			Frame::Complete
		}
		_ => {
			debug!("Ignoring message type: {}", msg_type);
			Frame::Ignored
		}
	}
}
