// ── Domain model ──
//
// Canonical types shared by the card engine and the host adapters.

pub mod directory;
pub mod entity_id;
pub mod port;
pub mod state;

// ── Re-exports ──────────────────────────────────────────────────────

pub use directory::{DeviceEntry, EntityEntry};
pub use entity_id::EntityId;
pub use port::{
    CardConfig, DEFAULT_MARKER_SIZE, DiscoveryPhase, LayoutKind, PortConfig, PortLabel,
    PortStatus, ResolvedPort,
};
pub use state::{EntityState, StateSnapshot};
