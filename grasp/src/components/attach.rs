use hecs::Entity;
use rapier3d::prelude::ColliderHandle;

/// A component that marks a spot on an interactable that can be magnetically pulled onto an
/// [`AttachJoint`].
///
/// Lives on its own entity; `item` is the interactable that gets pulled.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachPoint {
    /// The interactable this point belongs to
    pub item: Entity,
    /// A sensor volume on the item's body. Joints find points by overlapping it.
    pub volume: ColliderHandle,
    /// The joint this point is coupled to, if any
    pub attached_joint: Option<Entity>,
    /// Should the item be turned to match the joint's orientation?
    pub match_rotation: bool,
}

impl AttachPoint {
    /// Create a free point
    pub fn new(item: Entity, volume: ColliderHandle) -> Self {
        Self {
            item,
            volume,
            attached_joint: None,
            match_rotation: false,
        }
    }

    /// Is this point coupled to a joint?
    pub fn is_attached(&self) -> bool {
        self.attached_joint.is_some()
    }
}

/// A component that pulls nearby [`AttachPoint`]s towards itself and couples them once they're
/// close enough.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachJoint {
    /// The sensor volume used to find candidate points
    pub volume: ColliderHandle,
    /// Points further than this are ignored, even if their volumes overlap
    pub pull_range: f32,
    /// Points closer than this are coupled
    pub attach_range: f32,
    /// A coupled point that gets further than this is let go
    pub drop_distance: f32,
    /// The point currently coupled to this joint
    pub attached_point: Option<Entity>,
}

impl AttachJoint {
    /// Create an unattached joint
    pub fn new(volume: ColliderHandle, pull_range: f32, attach_range: f32) -> Self {
        Self {
            volume,
            pull_range,
            attach_range,
            drop_distance: pull_range,
            attached_point: None,
        }
    }

    /// Is a point coupled to this joint?
    pub fn is_attached(&self) -> bool {
        self.attached_point.is_some()
    }
}
