//! Port list × snapshot → render-ready ports.

use std::sync::Arc;

use crate::model::{PortConfig, ResolvedPort, StateSnapshot};

/// Join configured ports with their live state, preserving order.
///
/// Ports without an entry in `snapshot` are dropped; that is how stale
/// references are handled, not an error.
pub fn reconcile(ports: &[PortConfig], snapshot: &StateSnapshot) -> Vec<ResolvedPort> {
    ports
        .iter()
        .filter_map(|port| {
            let state = snapshot.get(port.entity_id.as_str())?;
            Some(ResolvedPort {
                entity_id: port.entity_id.clone(),
                entity_state: Arc::clone(state),
                x: port.x,
                y: port.y,
                label: port.label.clone(),
            })
        })
        .collect()
}
