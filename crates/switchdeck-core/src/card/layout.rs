//! Per-render layout choice.

use crate::model::{CardConfig, LayoutKind, ResolvedPort};

/// Image layout needs an image layout request, a background image, and
/// coordinates on every resolved port. Anything less renders as a grid
/// for this cycle.
pub fn select_layout(config: &CardConfig, ports: &[ResolvedPort]) -> LayoutKind {
    let image_ready = config.layout == LayoutKind::Image
        && config.image.is_some()
        && ports.iter().all(|port| port.position().is_some());

    if image_ready {
        LayoutKind::Image
    } else {
        LayoutKind::Grid
    }
}
