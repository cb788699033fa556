//! Port-visualization engine and reactive state layer for SNMP switch
//! panels on Home Assistant.
//!
//! - **[`PortCard`]** owns one card instance: it normalizes raw
//!   configuration, reconciles ports against the latest
//!   [`StateSnapshot`], renders a [`CardView`], and routes user
//!   [`Interaction`]s to the dialog or to a confirmed [`PortAction`].
//!
//! - **[`discovery`]** resolves a device id or name to its ordered port
//!   entities through a [`DeviceDirectory`]. Runs once per
//!   configuration; stale results are dropped by generation.
//!
//! - **[`ActionGateway`]** turns port actions into service calls on a
//!   [`ServiceCaller`]. One attempt each, no retry.
//!
//! - **[`Controller`]** is the Home Assistant host: REST for states and
//!   service calls, WebSocket for registries and live `state_changed`
//!   events, all fed into a [`StateStore`].

pub mod card;
pub mod config;
pub mod controller;
pub mod convert;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod host;
pub mod integration;
pub mod model;
pub mod registry;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use card::{CardBody, CardView, DialogState, DialogView, Interaction, PortCard};
pub use config::{ConnectionConfig, TlsVerification};
pub use controller::{ConnectionState, Controller};
pub use discovery::{DiscoveryRequest, DiscoveryResult};
pub use error::{ConfigurationError, CoreError};
pub use gateway::{ActionGateway, ActionOutcome, PortAction};
pub use host::{DeviceDirectory, ServiceCaller};
pub use registry::{CardDescriptor, CardRegistry, register_builtin_cards};
pub use store::StateStore;
pub use stream::SnapshotStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    CardConfig, DeviceEntry, DiscoveryPhase, EntityEntry, EntityId, EntityState, LayoutKind,
    PortConfig, PortLabel, PortStatus, ResolvedPort, StateSnapshot,
};
