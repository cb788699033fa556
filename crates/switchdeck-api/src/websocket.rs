//! WebSocket command channel and `state_changed` stream with auto-reconnect.
//!
//! Connects to Home Assistant's `/api/websocket` endpoint, authenticates
//! with the access token, subscribes to `state_changed`, and then serves
//! two purposes over the same socket:
//!
//! - parsed state changes are fanned out through a
//!   [`tokio::sync::broadcast`] channel;
//! - request/response commands (the device and entity registry
//!   listings) are correlated by message id and answered through a
//!   [`tokio::sync::oneshot`].
//!
//! Reconnection uses exponential backoff with jitter. Every new connection
//! re-authenticates and re-subscribes. A rejected token is fatal.
//!
//! # Example
//!
//! ```rust,ignore
//! use switchdeck_api::websocket::{WebSocketHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let url = url::Url::parse("ws://homeassistant.local:8123/api/websocket")?;
//! let handle = WebSocketHandle::connect(url, token, ReconnectConfig::default(), cancel.clone()).await?;
//!
//! let devices = handle.list_devices().await?;
//! let mut rx = handle.subscribe();
//! while let Ok(change) = rx.recv().await {
//!     println!("{} changed", change.entity_id);
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::Stream;
use futures_util::{Sink, SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::types::{DeviceRegistryEntry, EntityRegistryEntry, StateChangedEvent};

// ── Channel capacities ───────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Id of the `subscribe_events` command sent right after authentication.
const SUBSCRIPTION_ID: u64 = 1;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for WebSocket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,

    /// How long a command waits for its result. Default: 30s.
    pub command_timeout: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
            command_timeout: Duration::from_secs(30),
        }
    }
}

// ── WsStatus ─────────────────────────────────────────────────────────

/// Lifecycle of the background connection, published through a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsStatus {
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Terminal: the token was rejected or the retry limit was hit.
    Failed(String),
    Stopped,
}

// ── WebSocketHandle ──────────────────────────────────────────────────

struct PendingCommand {
    payload: Value,
    reply: oneshot::Sender<Result<Value, Error>>,
}

/// Handle to a running WebSocket connection.
///
/// Call [`shutdown`](Self::shutdown) to tear down the background task.
pub struct WebSocketHandle {
    event_rx: broadcast::Receiver<Arc<StateChangedEvent>>,
    status_rx: watch::Receiver<WsStatus>,
    command_tx: mpsc::Sender<PendingCommand>,
    command_timeout: Duration,
    cancel: CancellationToken,
}

impl WebSocketHandle {
    /// Spawn the connection loop and return immediately.
    ///
    /// The first connection attempt happens asynchronously. Use
    /// [`wait_connected`](Self::wait_connected) to block until the socket
    /// is authenticated, or just issue commands (they queue until then).
    pub async fn connect(
        ws_url: Url,
        token: SecretString,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(WsStatus::Connecting);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let command_timeout = reconnect.command_timeout;

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let channels = LoopChannels {
                event_tx,
                status_tx,
                command_rx,
            };
            ws_loop(ws_url, token, channels, reconnect, task_cancel).await;
        });

        Ok(Self {
            event_rx,
            status_rx,
            command_tx,
            command_timeout,
            cancel,
        })
    }

    /// Get a new broadcast receiver for `state_changed` events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StateChangedEvent>> {
        self.event_rx.resubscribe()
    }

    /// Watch receiver for the connection lifecycle.
    pub fn status(&self) -> watch::Receiver<WsStatus> {
        self.status_rx.clone()
    }

    /// Wait until the socket is authenticated and subscribed.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), Error> {
        let mut rx = self.status_rx.clone();
        let wait = async {
            loop {
                match &*rx.borrow_and_update() {
                    WsStatus::Connected => return Ok(()),
                    WsStatus::Failed(reason) if reason.starts_with("auth") => {
                        return Err(Error::Authentication {
                            message: reason.clone(),
                        });
                    }
                    WsStatus::Failed(reason) => {
                        return Err(Error::WebSocketConnect(reason.clone()));
                    }
                    WsStatus::Stopped => return Err(Error::NotConnected),
                    WsStatus::Connecting | WsStatus::Reconnecting { .. } => {}
                }
                if rx.changed().await.is_err() {
                    return Err(Error::NotConnected);
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: timeout.as_secs(),
            })?
    }

    /// Send a raw command (without `id`) and await its `result` payload.
    pub async fn command(&self, payload: Value) -> Result<Value, Error> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(PendingCommand { payload, reply })
            .await
            .map_err(|_| Error::NotConnected)?;

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::NotConnected),
            Err(_) => Err(Error::Timeout {
                timeout_secs: self.command_timeout.as_secs(),
            }),
        }
    }

    async fn command_typed<T: DeserializeOwned>(&self, payload: Value) -> Result<T, Error> {
        let value = self.command(payload).await?;
        serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: value.to_string(),
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// `config/device_registry/list`
    pub async fn list_devices(&self) -> Result<Vec<DeviceRegistryEntry>, Error> {
        self.command_typed(json!({ "type": "config/device_registry/list" }))
            .await
    }

    /// `config/entity_registry/list`
    pub async fn list_entities(&self) -> Result<Vec<EntityRegistryEntry>, Error> {
        self.command_typed(json!({ "type": "config/entity_registry/list" }))
            .await
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

struct LoopChannels {
    event_tx: broadcast::Sender<Arc<StateChangedEvent>>,
    status_tx: watch::Sender<WsStatus>,
    command_rx: mpsc::Receiver<PendingCommand>,
}

/// Main loop: connect → authenticate → serve → on error, backoff → reconnect.
async fn ws_loop(
    ws_url: Url,
    token: SecretString,
    mut channels: LoopChannels,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_serve(&ws_url, &token, &mut channels, &cancel) => result,
        };

        match result {
            // Clean disconnect (server close frame or stream ended).
            Ok(()) => {
                if cancel.is_cancelled() {
                    break;
                }
                tracing::info!("WebSocket disconnected cleanly, reconnecting");
                attempt = 0;
            }
            Err(e) if e.is_auth_failure() => {
                tracing::error!(error = %e, "WebSocket authentication rejected, giving up");
                channels
                    .status_tx
                    .send_replace(WsStatus::Failed(format!("auth: {e}")));
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "WebSocket error");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(
                            max_retries = max,
                            "WebSocket reconnection limit reached, giving up"
                        );
                        channels
                            .status_tx
                            .send_replace(WsStatus::Failed(e.to_string()));
                        return;
                    }
                }

                let delay = calculate_backoff(attempt, &reconnect);
                tracing::info!(
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "Waiting before reconnect"
                );
                channels
                    .status_tx
                    .send_replace(WsStatus::Reconnecting { attempt });

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }

                attempt += 1;
            }
        }
    }

    channels.status_tx.send_replace(WsStatus::Stopped);
    tracing::debug!("WebSocket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one connection, authenticate, subscribe, and serve commands
/// and events until it drops.
async fn connect_and_serve(
    url: &Url,
    token: &SecretString,
    channels: &mut LoopChannels,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "Connecting to WebSocket");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    let ha_version = authenticate(&mut read, &mut write, token).await?;
    tracing::info!(ha_version = ha_version.as_deref().unwrap_or("unknown"), "WebSocket authenticated");

    send_json(
        &mut write,
        &json!({
            "id": SUBSCRIPTION_ID,
            "type": "subscribe_events",
            "event_type": "state_changed",
        }),
    )
    .await?;

    channels.status_tx.send_replace(WsStatus::Connected);

    let mut next_id = SUBSCRIPTION_ID + 1;
    let mut pending: HashMap<u64, oneshot::Sender<Result<Value, Error>>> = HashMap::new();

    let outcome = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break Ok(()),
            Some(cmd) = channels.command_rx.recv() => {
                let id = next_id;
                next_id += 1;
                let mut payload = cmd.payload;
                if let Value::Object(map) = &mut payload {
                    map.insert("id".into(), Value::from(id));
                }
                if let Err(e) = send_json(&mut write, &payload).await {
                    let _ = cmd.reply.send(Err(Error::NotConnected));
                    break Err(e);
                }
                pending.insert(id, cmd.reply);
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatch_text(&text, &mut pending, &channels.event_tx);
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("WebSocket ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "WebSocket close frame received"
                            );
                        } else {
                            tracing::info!("WebSocket close frame received (no payload)");
                        }
                        break Ok(());
                    }
                    Some(Err(e)) => break Err(Error::WebSocketConnect(e.to_string())),
                    None => {
                        tracing::info!("WebSocket stream ended");
                        break Ok(());
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    };

    // Commands in flight on a dead socket can never be answered.
    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(Error::NotConnected));
    }

    outcome
}

/// Run the `auth_required → auth → auth_ok` handshake.
///
/// Returns the Home Assistant version reported by the server.
async fn authenticate<R, W>(
    read: &mut R,
    write: &mut W,
    token: &SecretString,
) -> Result<Option<String>, Error>
where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        let text = next_text(read).await?;
        match parse_incoming(&text) {
            Some(Incoming::AuthRequired { .. }) => {
                send_json(
                    write,
                    &json!({ "type": "auth", "access_token": token.expose_secret() }),
                )
                .await?;
            }
            Some(Incoming::AuthOk { ha_version }) => return Ok(ha_version),
            Some(Incoming::AuthInvalid { message }) => {
                return Err(Error::Authentication {
                    message: message.unwrap_or_else(|| "access token rejected".into()),
                });
            }
            _ => tracing::debug!("Ignoring message during authentication"),
        }
    }
}

async fn next_text<R>(read: &mut R) -> Result<String, Error>
where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                    .unwrap_or((1005, String::new()));
                return Err(Error::WebSocketClosed { code, reason });
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
            None => {
                return Err(Error::WebSocketClosed {
                    code: 1006,
                    reason: "stream ended".into(),
                });
            }
        }
    }
}

async fn send_json<W>(write: &mut W, value: &Value) -> Result<(), Error>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    write
        .send(Message::text(value.to_string()))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))
}

// ── Message parsing ──────────────────────────────────────────────────

/// Messages the server sends, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Incoming {
    AuthRequired {
        #[serde(default)]
        ha_version: Option<String>,
    },
    AuthOk {
        #[serde(default)]
        ha_version: Option<String>,
    },
    AuthInvalid {
        #[serde(default)]
        message: Option<String>,
    },
    Result {
        id: u64,
        success: bool,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<CommandError>,
    },
    Event {
        id: u64,
        event: EventEnvelope,
    },
    Pong {
        id: u64,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct CommandError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    event_type: String,
    #[serde(default)]
    data: Value,
}

fn parse_incoming(text: &str) -> Option<Incoming> {
    match serde_json::from_str(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse WebSocket message");
            None
        }
    }
}

/// Route one text frame: results complete their pending command, events
/// from our subscription are broadcast.
fn dispatch_text(
    text: &str,
    pending: &mut HashMap<u64, oneshot::Sender<Result<Value, Error>>>,
    event_tx: &broadcast::Sender<Arc<StateChangedEvent>>,
) {
    match parse_incoming(text) {
        Some(Incoming::Result {
            id,
            success,
            result,
            error,
        }) => {
            if id == SUBSCRIPTION_ID {
                if !success {
                    tracing::warn!(?error, "state_changed subscription rejected");
                }
                return;
            }
            let Some(reply) = pending.remove(&id) else {
                tracing::debug!(id, "Result for unknown command id");
                return;
            };
            let outcome = if success {
                Ok(result.unwrap_or(Value::Null))
            } else {
                let error = error.unwrap_or(CommandError {
                    code: "unknown_error".into(),
                    message: "command failed without details".into(),
                });
                Err(Error::Command {
                    code: error.code,
                    message: error.message,
                })
            };
            // Caller may have timed out and dropped the receiver.
            let _ = reply.send(outcome);
        }
        Some(Incoming::Event { id, event }) => {
            if id != SUBSCRIPTION_ID || event.event_type != "state_changed" {
                return;
            }
            match serde_json::from_value::<StateChangedEvent>(event.data) {
                Ok(change) => {
                    // No subscribers right now is fine.
                    let _ = event_tx.send(Arc::new(change));
                }
                Err(e) => tracing::debug!(error = %e, "Malformed state_changed payload"),
            }
        }
        Some(Incoming::Pong { id }) => tracing::trace!(id, "pong"),
        Some(_) | None => {}
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25%, derived deterministically from the attempt number.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn channels() -> (
        HashMap<u64, oneshot::Sender<Result<Value, Error>>>,
        broadcast::Sender<Arc<StateChangedEvent>>,
        broadcast::Receiver<Arc<StateChangedEvent>>,
    ) {
        let (tx, rx) = broadcast::channel(16);
        (HashMap::new(), tx, rx)
    }

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(10),
            ..ReconnectConfig::default()
        };

        let d10 = calculate_backoff(10, &config);
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
        // Huge attempt counts must not overflow.
        assert!(calculate_backoff(u32::MAX, &config) <= Duration::from_secs(13));
    }

    #[test]
    fn parse_auth_messages() {
        let msg = parse_incoming(r#"{"type":"auth_required","ha_version":"2026.3.0"}"#);
        assert!(matches!(msg, Some(Incoming::AuthRequired { .. })));

        let msg = parse_incoming(r#"{"type":"auth_invalid","message":"Invalid password"}"#);
        match msg {
            Some(Incoming::AuthInvalid { message }) => {
                assert_eq!(message.as_deref(), Some("Invalid password"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_message_type_is_tolerated() {
        let msg = parse_incoming(r#"{"type":"something_new","id":3}"#);
        assert!(matches!(msg, Some(Incoming::Unknown)));
        assert!(parse_incoming("not json at all").is_none());
    }

    #[test]
    fn result_completes_pending_command() {
        let (mut pending, tx, _rx) = channels();
        let (reply, mut reply_rx) = oneshot::channel();
        pending.insert(7, reply);

        dispatch_text(
            r#"{"id":7,"type":"result","success":true,"result":[{"id":"dev1"}]}"#,
            &mut pending,
            &tx,
        );

        let value = reply_rx.try_recv().unwrap().unwrap();
        assert_eq!(value[0]["id"], "dev1");
        assert!(pending.is_empty());
    }

    #[test]
    fn failed_result_maps_to_command_error() {
        let (mut pending, tx, _rx) = channels();
        let (reply, mut reply_rx) = oneshot::channel();
        pending.insert(4, reply);

        dispatch_text(
            r#"{"id":4,"type":"result","success":false,"error":{"code":"not_found","message":"Service not found."}}"#,
            &mut pending,
            &tx,
        );

        let err = reply_rx.try_recv().unwrap().unwrap_err();
        assert!(matches!(err, Error::Command { ref code, .. } if code == "not_found"));
        assert!(err.to_string().contains("Service not found."));
    }

    #[test]
    fn state_changed_event_is_broadcast() {
        let (mut pending, tx, mut rx) = channels();

        let raw = json!({
            "id": SUBSCRIPTION_ID,
            "type": "event",
            "event": {
                "event_type": "state_changed",
                "data": {
                    "entity_id": "switch.core_gi1_0_3",
                    "old_state": { "entity_id": "switch.core_gi1_0_3", "state": "on", "attributes": {} },
                    "new_state": { "entity_id": "switch.core_gi1_0_3", "state": "off", "attributes": { "Index": 3 } }
                }
            }
        });
        dispatch_text(&raw.to_string(), &mut pending, &tx);

        let change = rx.try_recv().unwrap();
        assert_eq!(change.entity_id, "switch.core_gi1_0_3");
        assert_eq!(change.new_state.as_ref().unwrap().state, "off");
    }

    #[test]
    fn events_from_other_subscriptions_are_ignored() {
        let (mut pending, tx, mut rx) = channels();
        let raw = json!({
            "id": 99,
            "type": "event",
            "event": { "event_type": "state_changed", "data": { "entity_id": "light.x" } }
        });
        dispatch_text(&raw.to_string(), &mut pending, &tx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn malformed_frame_does_not_panic() {
        let (mut pending, tx, mut rx) = channels();
        dispatch_text("{\"type\":", &mut pending, &tx);
        assert!(rx.try_recv().is_err());
    }
}
