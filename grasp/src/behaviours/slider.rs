use std::any::Any;

use glam::{Quat, Vec3};
use hecs::Entity;

use super::{BehaviourContext, InteractableBehaviour};
use crate::control_law::{angular_target, linear_target, VelocityTarget};

/// An interactable that can only slide along a straight segment, like a drawer or a fader.
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    /// One end of the track, in world space
    pub start: Vec3,
    /// The other end of the track, in world space
    pub end: Vec3,
    value: f32,
    held_rotation: Option<Quat>,
}

impl Slider {
    /// Create a slider that runs from `start` to `end`
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self {
            start,
            end,
            value: 0.,
            held_rotation: None,
        }
    }

    /// How far along the track the slider was last seen, from 0 at `start` to 1 at `end`
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Where along the track a point projects to, from 0 to 1
    pub fn value_at(&self, point: Vec3) -> f32 {
        let track = self.end - self.start;
        let length_squared = track.length_squared();
        if length_squared <= f32::EPSILON {
            return 0.;
        }
        ((point - self.start).dot(track) / length_squared).clamp(0., 1.)
    }

    /// The closest point on the track
    pub fn project(&self, point: Vec3) -> Vec3 {
        self.start + (self.end - self.start) * self.value_at(point)
    }
}

impl InteractableBehaviour for Slider {
    fn begin_interaction(&mut self, context: &BehaviourContext) {
        self.held_rotation = Some(context.body.pose.rotation);
        self.value = self.value_at(context.body.pose.translation);
    }

    fn interacting_update(&mut self, _hand: Entity, context: &BehaviourContext) {
        self.value = self.value_at(context.body.pose.translation);
    }

    fn physics_update(&mut self, context: &BehaviourContext) -> VelocityTarget {
        let Some(delta) = context.pose_delta() else {
            return VelocityTarget::default();
        };

        let body = &context.body.pose;
        let target = self.project(body.translation + delta.position);
        self.value = self.value_at(body.translation);

        let rotation = self
            .held_rotation
            .map(|held| held * body.rotation.inverse())
            .unwrap_or(Quat::IDENTITY);

        VelocityTarget {
            linear: Some(linear_target(
                target - body.translation,
                context.delta_time,
                context.config,
            )),
            angular: Some(angular_target(rotation, context.delta_time, context.config)),
        }
    }

    fn end_interaction(&mut self, _hand: Entity, context: &BehaviourContext) {
        self.value = self.value_at(context.body.pose.translation);
        if context.holders.is_empty() {
            self.held_rotation = None;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        behaviours::HolderPose,
        components::{GripAnchor, Pose},
        control_law::BodyState,
        InteractionConfig,
    };
    use approx::assert_relative_eq;
    use hecs::World;

    #[test]
    fn test_value_at() {
        let slider = Slider::new(Vec3::ZERO, Vec3::new(2., 0., 0.));
        assert_relative_eq!(slider.value_at(Vec3::new(1., 5., 0.)), 0.5);
        assert_relative_eq!(slider.value_at(Vec3::new(-1., 0., 0.)), 0.);
        assert_relative_eq!(slider.value_at(Vec3::new(3., 0., 0.)), 1.);
        assert_relative_eq!(slider.project(Vec3::new(1.5, 1., 1.)), Vec3::new(1.5, 0., 0.));
    }

    #[test]
    fn test_slider_only_moves_along_its_track() {
        let mut world = World::new();
        let hand = world.spawn(());
        let config = InteractionConfig::default();
        let body = BodyState {
            pose: Pose::from_translation(Vec3::new(1., 0., 0.)),
            ..Default::default()
        };
        let holders = [HolderPose {
            hand,
            // The hand has moved diagonally since pickup
            hand_pose: Pose::from_translation(Vec3::new(1.1, 0.1, 0.)),
            anchor: GripAnchor::capture(body.pose, body.pose),
        }];
        let context = BehaviourContext {
            entity: hand,
            body,
            holders: &holders,
            interaction_point: None,
            delta_time: config.expected_delta_time,
            config: &config,
        };

        let mut slider = Slider::new(Vec3::ZERO, Vec3::new(2., 0., 0.));
        slider.begin_interaction(&context);
        assert_relative_eq!(slider.value(), 0.5);

        let target = slider.physics_update(&context);
        let linear = target.linear.unwrap();
        assert_relative_eq!(linear.y, 0.);
        assert_relative_eq!(linear.z, 0.);
        assert!(linear.x > 0.);
        assert_relative_eq!(target.angular.unwrap(), Vec3::ZERO);
    }
}
