// ── Controller abstraction ──
//
// Full lifecycle management for a Home Assistant connection.
// Handles authentication, the initial state dump, the live
// `state_changed` feed, and periodic refresh into the StateStore.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use switchdeck_api::transport::{TlsMode, TransportConfig, websocket_url};
use switchdeck_api::websocket::{ReconnectConfig, WebSocketHandle, WsStatus};
use switchdeck_api::{RestClient, StateChangedEvent};

use crate::config::{ConnectionConfig, TlsVerification};
use crate::convert::state_entry;
use crate::discovery::{DiscoveryRequest, DiscoveryResult, discover};
use crate::error::CoreError;
use crate::gateway::ActionGateway;
use crate::host::{DeviceDirectory, ServiceCaller};
use crate::model::{DeviceEntry, EntityEntry, EntityId, EntityState, StateSnapshot};
use crate::store::StateStore;
use crate::stream::SnapshotStream;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Implements
/// [`DeviceDirectory`] and [`ServiceCaller`], so it can be handed
/// straight to discovery and the action gateway.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ConnectionConfig,
    store: Arc<StateStore>,
    connection_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    /// Child token for the current connection; cancelled on disconnect,
    /// replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    rest: Mutex<Option<Arc<RestClient>>>,
    /// WebSocket handle (populated on connect if enabled).
    ws_handle: Mutex<Option<Arc<WebSocketHandle>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a new Controller from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to authenticate and start background tasks.
    pub fn new(config: ConnectionConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store: Arc::new(StateStore::new()),
                connection_state,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                rest: Mutex::new(None),
                ws_handle: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Access the underlying StateStore.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Publish a connection state. Stored even while nobody is subscribed.
    fn set_connection_state(&self, state: ConnectionState) {
        self.inner.connection_state.send_replace(state);
    }

    /// Connect to Home Assistant.
    ///
    /// Verifies the token against the REST API, loads every state
    /// object, then starts the WebSocket feed and periodic refresh when
    /// configured.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.set_connection_state(ConnectionState::Connecting);

        let config = &self.inner.config;
        let transport = transport_config(config);

        let rest = match RestClient::new(config.url.clone(), &config.token, &transport) {
            Ok(rest) => rest,
            Err(e) => {
                self.set_connection_state(ConnectionState::Failed);
                return Err(e.into());
            }
        };
        match rest.check_api().await {
            Ok(message) => debug!(api_message = %message, "REST API reachable"),
            Err(e) => {
                self.set_connection_state(ConnectionState::Failed);
                return Err(e.into());
            }
        }
        *self.inner.rest.lock().await = Some(Arc::new(rest));

        if let Err(e) = self.full_refresh().await {
            self.set_connection_state(ConnectionState::Failed);
            return Err(e);
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let mut handles = self.inner.task_handles.lock().await;

        if config.websocket_enabled {
            if let Err(e) = self.spawn_websocket(&child, &mut handles).await {
                self.set_connection_state(ConnectionState::Failed);
                return Err(e);
            }
        }

        let interval_secs = config.refresh_interval_secs;
        if interval_secs > 0 {
            let ctrl = self.clone();
            let cancel = child.clone();
            handles.push(tokio::spawn(refresh_task(ctrl, interval_secs, cancel)));
        }
        drop(handles);

        self.set_connection_state(ConnectionState::Connected);
        info!(
            url = %config.url,
            entities = self.inner.store.len(),
            websocket = config.websocket_enabled,
            "connected to Home Assistant"
        );
        Ok(())
    }

    /// Open the WebSocket, wait for authentication, and spawn the bridge
    /// task that feeds `state_changed` events into the store.
    async fn spawn_websocket(
        &self,
        cancel: &CancellationToken,
        handles: &mut Vec<JoinHandle<()>>,
    ) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let ws_url = websocket_url(&config.url)?;
        let ws_cancel = cancel.child_token();

        let handle = WebSocketHandle::connect(
            ws_url,
            config.token.clone(),
            ReconnectConfig {
                command_timeout: config.timeout,
                ..ReconnectConfig::default()
            },
            ws_cancel.clone(),
        )
        .await?;

        if let Err(e) = handle.wait_connected(config.timeout).await {
            handle.shutdown();
            return Err(e.into());
        }

        let events = handle.subscribe();
        let status = handle.status();
        let ctrl = self.clone();
        handles.push(tokio::spawn(event_bridge_task(ctrl, events, status, ws_cancel)));

        *self.inner.ws_handle.lock().await = Some(Arc::new(handle));
        info!("WebSocket state feed active");
        Ok(())
    }

    /// Disconnect from Home Assistant.
    ///
    /// Cancels background tasks, shuts the WebSocket down, and resets
    /// the connection state to [`Disconnected`](ConnectionState::Disconnected).
    pub async fn disconnect(&self) {
        // Cancel the child token (not the parent, so reconnect works).
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Some(handle) = self.inner.ws_handle.lock().await.take() {
            handle.shutdown();
        }
        *self.inner.rest.lock().await = None;

        self.set_connection_state(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Reload every state object and replace the store contents.
    pub async fn full_refresh(&self) -> Result<(), CoreError> {
        let rest = self.rest().await?;
        let states = rest.get_states().await?;
        let count = states.len();
        self.inner
            .store
            .replace_all(states.into_iter().map(state_entry));
        debug!(count, "state refresh applied");
        Ok(())
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// Optimized for CLI: disables periodic refresh. The WebSocket stays
    /// as configured since registry queries need it.
    pub async fn oneshot<F, Fut, T>(config: ConnectionConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.refresh_interval_secs = 0;

        let controller = Controller::new(cfg);
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.store.snapshot()
    }

    /// Subscribe to state snapshots.
    pub fn states(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    // ── Ad-hoc queries ───────────────────────────────────────────

    /// Run port discovery against this connection.
    pub async fn discover(&self, request: DiscoveryRequest) -> DiscoveryResult {
        discover(self, request).await
    }

    /// An action gateway backed by this connection.
    pub fn gateway(&self) -> ActionGateway<Controller> {
        ActionGateway::new(self.clone())
    }

    // ── Private helpers ──────────────────────────────────────────

    async fn rest(&self) -> Result<Arc<RestClient>, CoreError> {
        self.inner
            .rest
            .lock()
            .await
            .clone()
            .ok_or(CoreError::Disconnected)
    }

    async fn websocket(&self, operation: &str) -> Result<Arc<WebSocketHandle>, CoreError> {
        self.inner
            .ws_handle
            .lock()
            .await
            .clone()
            .ok_or_else(|| CoreError::Unsupported {
                operation: operation.into(),
                required: "a WebSocket connection".into(),
            })
    }
}

// ── Host contract ────────────────────────────────────────────────

impl DeviceDirectory for Controller {
    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, CoreError> {
        let ws = self.websocket("device registry listing").await?;
        let devices = ws.list_devices().await?;
        Ok(devices.into_iter().map(DeviceEntry::from).collect())
    }

    async fn list_entities(&self) -> Result<Vec<EntityEntry>, CoreError> {
        let ws = self.websocket("entity registry listing").await?;
        let entities = ws.list_entities().await?;
        Ok(entities.into_iter().map(EntityEntry::from).collect())
    }
}

impl ServiceCaller for Controller {
    async fn call_service(&self, domain: &str, service: &str, data: Value) -> Result<(), CoreError> {
        let rest = self.rest().await?;
        let changed = rest.call_service(domain, service, &data).await?;
        debug!(domain, service, changed = changed.len(), "service call accepted");
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn transport_config(config: &ConnectionConfig) -> TransportConfig {
    let tls = match &config.tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    };
    TransportConfig {
        tls,
        timeout: config.timeout,
    }
}

fn apply_event(store: &StateStore, event: &StateChangedEvent) {
    let entity_id = EntityId::from(event.entity_id.as_str());
    let new_state = event.new_state.clone().map(EntityState::from);
    store.apply_change(entity_id, new_state);
}

// ── Background tasks ─────────────────────────────────────────────

/// Bridge WS events into the store and mirror the socket lifecycle
/// onto [`ConnectionState`]. Events missed while reconnecting are
/// recovered with a full refresh once the socket is back.
async fn event_bridge_task(
    controller: Controller,
    mut events: tokio::sync::broadcast::Receiver<Arc<StateChangedEvent>>,
    mut status: watch::Receiver<WsStatus>,
    cancel: CancellationToken,
) {
    let mut was_reconnecting = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                let mapped = match current {
                    WsStatus::Connected => {
                        if was_reconnecting {
                            was_reconnecting = false;
                            if let Err(e) = controller.full_refresh().await {
                                warn!(error = %e, "refresh after reconnect failed");
                            }
                        }
                        ConnectionState::Connected
                    }
                    WsStatus::Connecting => ConnectionState::Connecting,
                    WsStatus::Reconnecting { attempt } => {
                        was_reconnecting = true;
                        ConnectionState::Reconnecting { attempt }
                    }
                    WsStatus::Failed(reason) => {
                        warn!(reason = %reason, "WebSocket gave up");
                        ConnectionState::Failed
                    }
                    WsStatus::Stopped => break,
                };
                controller.set_connection_state(mapped);
            }
            result = events.recv() => {
                match result {
                    Ok(event) => apply_event(&controller.inner.store, &event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "state feed lagged, refreshing");
                        if let Err(e) = controller.full_refresh().await {
                            warn!(error = %e, "refresh after lag failed");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn refresh_task(controller: Controller, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.full_refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
