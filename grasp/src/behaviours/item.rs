use std::any::Any;

use hecs::Entity;

use super::{BehaviourContext, HoverResponse, InteractableBehaviour};
use crate::control_law::{velocity_target, VelocityTarget};

/// A plain object that goes wherever the hand takes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// Ask to be picked up after being hovered over for this many seconds
    pub auto_pickup_after: Option<f32>,
    /// How many times the use button has been pressed while holding this
    pub uses: u32,
    /// Is the use button down right now?
    pub in_use: bool,
}

impl Item {
    /// An item that jumps into the hand after being hovered over for `seconds`
    pub fn auto_pickup(seconds: f32) -> Self {
        Self {
            auto_pickup_after: Some(seconds),
            ..Default::default()
        }
    }
}

impl InteractableBehaviour for Item {
    fn physics_update(&mut self, context: &BehaviourContext) -> VelocityTarget {
        context
            .pose_delta()
            .map(|delta| velocity_target(&delta, context.delta_time, context.config))
            .unwrap_or_default()
    }

    fn end_interaction(&mut self, _hand: Entity, _context: &BehaviourContext) {
        self.in_use = false;
    }

    fn use_button_down(&mut self, _hand: Entity) {
        self.uses += 1;
        self.in_use = true;
    }

    fn use_button_up(&mut self, _hand: Entity) {
        self.in_use = false;
    }

    fn hovering_update(&mut self, _hand: Entity, hover_time: f32) -> HoverResponse {
        match self.auto_pickup_after {
            Some(delay) if hover_time >= delay => HoverResponse::Pickup,
            _ => HoverResponse::Ignore,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
