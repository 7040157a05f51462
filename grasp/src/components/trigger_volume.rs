use rapier3d::prelude::ColliderHandle;

/// A sensor volume that notices other collision volumes entering and leaving it.
/// Essentially a wrapper around a `rapier` sensor `ColliderHandle`.
///
/// Every [`super::Hand`] has one; the hover system diffs `overlapping` against what the physics
/// simulation reports this frame to produce enter and exit events.
#[derive(Debug, Clone)]
pub struct TriggerVolume {
    /// Handle to the `rapier` sensor collider
    pub handle: ColliderHandle,
    /// The collision volumes that were overlapping this one last frame
    pub overlapping: Vec<ColliderHandle>,
}

impl TriggerVolume {
    /// Create a new trigger volume
    pub fn new(handle: ColliderHandle) -> TriggerVolume {
        TriggerVolume {
            handle,
            overlapping: vec![],
        }
    }
}
