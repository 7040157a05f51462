//! What an interactable does when it's held.
//!
//! Every interactable carries a [`Behaviour`], which boxes one implementation of
//! [`InteractableBehaviour`]. The engine calls the hooks; the behaviour decides how the body
//! should move by returning a [`VelocityTarget`] from [`InteractableBehaviour::physics_update`].

use std::any::Any;

use hecs::Entity;

use crate::{
    components::{GripAnchor, Pose},
    control_law::{
        delta_from_anchor, delta_from_interaction_point, BodyState, PoseDelta, VelocityTarget,
    },
    InteractionConfig,
};

pub mod item;
pub mod lever;
pub mod slider;

pub use item::Item;
pub use lever::{Lever, LeverPosition};
pub use slider::Slider;

/// A hand holding the interactable, as seen by its behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HolderPose {
    /// The hand entity
    pub hand: Entity,
    /// Where the hand is this step
    pub hand_pose: Pose,
    /// The grip it took at pickup
    pub anchor: GripAnchor,
}

/// Everything a behaviour gets to look at when one of its hooks is called.
#[derive(Debug, Clone, Copy)]
pub struct BehaviourContext<'a> {
    /// The interactable
    pub entity: Entity,
    /// The interactable's body
    pub body: BodyState,
    /// The hands holding it. Empty when hovering.
    pub holders: &'a [HolderPose],
    /// The fixed interaction point, if the interactable has one
    pub interaction_point: Option<Pose>,
    /// The length of this step
    pub delta_time: f32,
    /// Control law tuning
    pub config: &'a InteractionConfig,
}

impl<'a> BehaviourContext<'a> {
    /// How far the body is from where the holding hands want it, averaged across hands.
    pub fn pose_delta(&self) -> Option<PoseDelta> {
        let deltas: Vec<PoseDelta> = self
            .holders
            .iter()
            .map(|holder| match &self.interaction_point {
                Some(point) => {
                    delta_from_interaction_point(point, &self.body.pose, &holder.hand_pose)
                }
                None => delta_from_anchor(&holder.anchor, &self.body.pose, &holder.hand_pose),
            })
            .collect();
        PoseDelta::mean(&deltas)
    }
}

/// What a hovered interactable wants the hand to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoverResponse {
    /// Nothing
    #[default]
    Ignore,
    /// Pick me up. Honoured by hands using the toggle or scripted styles.
    Pickup,
}

/// The hooks an interactable can implement.
pub trait InteractableBehaviour: Send + Sync + 'static {
    /// A hand took hold
    fn begin_interaction(&mut self, _context: &BehaviourContext) {}

    /// Called once per tick per holding hand, after input is processed
    fn interacting_update(&mut self, _hand: Entity, _context: &BehaviourContext) {}

    /// Called once per physics step while held. Returns the velocities the body should move
    /// towards.
    fn physics_update(&mut self, context: &BehaviourContext) -> VelocityTarget;

    /// A hand let go
    fn end_interaction(&mut self, _hand: Entity, _context: &BehaviourContext) {}

    /// The holding hand pressed its use button
    fn use_button_down(&mut self, _hand: Entity) {}

    /// The holding hand released its use button
    fn use_button_up(&mut self, _hand: Entity) {}

    /// An idle hand is hovering over this, and has been for `hover_time` seconds
    fn hovering_update(&mut self, _hand: Entity, _hover_time: f32) -> HoverResponse {
        HoverResponse::Ignore
    }

    /// Used to downcast
    fn as_any(&self) -> &dyn Any;

    /// Used to downcast
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A component that holds an interactable's behaviour.
pub struct Behaviour(pub Box<dyn InteractableBehaviour>);

impl Behaviour {
    /// Box up a behaviour
    pub fn new(behaviour: impl InteractableBehaviour) -> Self {
        Self(Box::new(behaviour))
    }

    /// Get the concrete behaviour, if it's a `T`
    pub fn downcast_ref<T: InteractableBehaviour>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }

    /// Get the concrete behaviour mutably, if it's a `T`
    pub fn downcast_mut<T: InteractableBehaviour>(&mut self) -> Option<&mut T> {
        self.0.as_any_mut().downcast_mut()
    }
}

impl std::fmt::Debug for Behaviour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Behaviour").finish()
    }
}

impl std::ops::Deref for Behaviour {
    type Target = dyn InteractableBehaviour;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl std::ops::DerefMut for Behaviour {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};
    use hecs::World;

    #[test]
    fn test_pose_delta_uses_interaction_point_when_present() {
        let mut world = World::new();
        let hand = world.spawn(());
        let config = InteractionConfig::default();
        let body = BodyState {
            pose: Pose::from_translation(Vec3::ZERO),
            ..Default::default()
        };
        let holders = [HolderPose {
            hand,
            hand_pose: Pose::from_translation(Vec3::new(1., 0., 0.)),
            anchor: GripAnchor::capture(body.pose, Pose::from_translation(Vec3::new(1., 0., 0.))),
        }];

        let mut context = BehaviourContext {
            entity: hand,
            body,
            holders: &holders,
            interaction_point: None,
            delta_time: config.expected_delta_time,
            config: &config,
        };
        // Grabbed where the hand is, so nothing to correct
        assert_relative_eq!(context.pose_delta().unwrap().position, Vec3::ZERO);

        context.interaction_point = Some(Pose::new(Vec3::new(0.25, 0., 0.), Quat::IDENTITY));
        assert_relative_eq!(
            context.pose_delta().unwrap().position,
            Vec3::new(0.75, 0., 0.)
        );

        context.holders = &[];
        assert!(context.pose_delta().is_none());
    }

    #[test]
    fn test_downcast() {
        let mut behaviour = Behaviour::new(Item::default());
        assert!(behaviour.downcast_ref::<Item>().is_some());
        assert!(behaviour.downcast_ref::<Slider>().is_none());
        behaviour.downcast_mut::<Item>().unwrap().auto_pickup_after = Some(1.0);
        assert_eq!(
            behaviour.downcast_ref::<Item>().unwrap().auto_pickup_after,
            Some(1.0)
        );
    }
}
