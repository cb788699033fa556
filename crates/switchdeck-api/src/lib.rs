// switchdeck-api: Async Rust client for Home Assistant (REST + WebSocket)

pub mod error;
pub mod rest;
pub mod transport;
pub mod types;
pub mod websocket;

pub use error::Error;
pub use rest::RestClient;
pub use transport::{TlsMode, TransportConfig};
pub use types::{DeviceRegistryEntry, EntityRegistryEntry, StateChangedEvent, StateObject};
pub use websocket::{ReconnectConfig, WebSocketHandle, WsStatus};
