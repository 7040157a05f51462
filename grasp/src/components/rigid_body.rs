use rapier3d::prelude::RigidBodyHandle;

/// Component added to an entity to map it to a `rapier` `RigidBody`.
///
/// Interactables, hands, physical hands and the bodies attach joints hang off all carry one.
/// The colliders attached to the body in the [`crate::resources::PhysicsContext`] are the
/// entity's collision volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigidBody {
    /// Handle to the `rapier` `RigidBody`
    pub handle: RigidBodyHandle,
}

impl RigidBody {
    /// Wrap a `rapier` handle
    pub fn new(handle: RigidBodyHandle) -> Self {
        Self { handle }
    }
}
