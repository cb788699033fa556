// ── Reactive state store ──
//
// Holds the latest Home Assistant state objects and vends immutable
// `StateSnapshot`s to the card engine and UI consumers.

mod state_store;

pub use state_store::StateStore;
