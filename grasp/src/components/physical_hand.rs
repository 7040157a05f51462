use hecs::Entity;
use rapier3d::prelude::ColliderHandle;

/// A dynamic stand-in for a [`super::Hand`].
///
/// Tracked hands are kinematic, so they pass straight through walls. A physical hand is a
/// dynamic body that chases the hand's pose with the same velocity control law used for held
/// objects, so it can be blocked by world geometry and push things around.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalHand {
    /// The hand being mirrored
    pub hand: Entity,
    /// The colliders of the stand-in body
    pub colliders: Vec<ColliderHandle>,
    /// Are the colliders currently solid?
    pub solid: bool,
}

impl PhysicalHand {
    /// Create a physical hand that starts out non-solid
    pub fn new(hand: Entity, colliders: Vec<ColliderHandle>) -> Self {
        Self {
            hand,
            colliders,
            solid: false,
        }
    }
}
