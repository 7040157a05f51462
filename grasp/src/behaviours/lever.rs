use std::any::Any;

use glam::{Quat, Vec3};
use hecs::Entity;

use super::{BehaviourContext, InteractableBehaviour};
use crate::{
    control_law::{angular_target, linear_target, VelocityTarget},
    GraspError, GraspResult,
};

/// Where a lever is resting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeverPosition {
    /// Pushed all the way to its minimum angle
    Min,
    /// Somewhere in between
    Middle,
    /// Pushed all the way to its maximum angle
    Max,
}

const END_TOLERANCE: f32 = 0.05;

/// An interactable that swings around a hinge, between two angle limits.
///
/// The lever is turned by where the hand is, not how it's rotated: the hand's position is
/// projected onto the plane of the hinge and the lever follows the swing.
#[derive(Debug, Clone, PartialEq)]
pub struct Lever {
    /// The hinge axis, in world space
    pub hinge_axis: Vec3,
    /// The lowest angle, in degrees from the rest pose
    pub min_angle: f32,
    /// The highest angle, in degrees from the rest pose
    pub max_angle: f32,
    rest: Option<(Vec3, Quat)>,
    angle: f32,
}

impl Lever {
    /// Create a lever that swings around `hinge_axis`. Its rest pose is taken from wherever the
    /// body is the first time it's picked up.
    ///
    /// Fails if the axis has no direction or either limit isn't a number.
    pub fn new(hinge_axis: Vec3, min_angle: f32, max_angle: f32) -> GraspResult<Self> {
        let Some(hinge_axis) = hinge_axis.try_normalize() else {
            return Err(GraspError::InvalidConfig(format!(
                "a lever's hinge axis must have a direction, got {hinge_axis}"
            )));
        };
        if !min_angle.is_finite() || !max_angle.is_finite() {
            return Err(GraspError::InvalidConfig(format!(
                "lever limits must be finite, got {min_angle} and {max_angle}"
            )));
        }

        Ok(Self {
            hinge_axis,
            min_angle: min_angle.min(max_angle),
            max_angle: max_angle.max(min_angle),
            rest: None,
            angle: 0.,
        })
    }

    /// Fix the rest pose up front, instead of at first pickup
    pub fn with_rest_pose(mut self, pivot: Vec3, rotation: Quat) -> Self {
        self.rest = Some((pivot, rotation));
        self
    }

    /// The angle the lever was last seen at, in degrees from the rest pose
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// The angle as a fraction of the lever's travel, from 0 at `min_angle` to 1 at `max_angle`
    pub fn value(&self) -> f32 {
        let range = self.max_angle - self.min_angle;
        if range <= f32::EPSILON {
            return 0.;
        }
        ((self.angle - self.min_angle) / range).clamp(0., 1.)
    }

    /// Which end, if any, the lever is at
    pub fn position(&self) -> LeverPosition {
        match self.value() {
            v if v <= END_TOLERANCE => LeverPosition::Min,
            v if v >= 1. - END_TOLERANCE => LeverPosition::Max,
            _ => LeverPosition::Middle,
        }
    }

    /// The angle of `rotation` around the hinge, relative to the rest pose, in `(-180, 180]`
    pub fn angle_of(&self, rotation: Quat) -> f32 {
        let rest = self.rest.map(|(_, r)| r).unwrap_or(Quat::IDENTITY);
        let delta = rotation * rest.inverse();
        let along_axis = Vec3::new(delta.x, delta.y, delta.z).dot(self.hinge_axis);
        let mut degrees = (2. * along_axis.atan2(delta.w)).to_degrees();
        if degrees > 180. {
            degrees -= 360.;
        } else if degrees <= -180. {
            degrees += 360.;
        }
        degrees
    }

    fn ensure_rest(&mut self, context: &BehaviourContext) -> (Vec3, Quat) {
        *self
            .rest
            .get_or_insert((context.body.pose.translation, context.body.pose.rotation))
    }

    /// How far the hand has swung the grip point around the hinge, in degrees
    fn swing(&self, pivot: Vec3, context: &BehaviourContext) -> Option<f32> {
        let holder = context.holders.first()?;
        let grip = holder.anchor.grip_point(&context.body.pose);
        let from = flatten(grip - pivot, self.hinge_axis);
        let to = flatten(holder.hand_pose.translation - pivot, self.hinge_axis);
        if from.length_squared() <= f32::EPSILON || to.length_squared() <= f32::EPSILON {
            return None;
        }
        let sin = from.cross(to).dot(self.hinge_axis);
        let cos = from.dot(to);
        Some(sin.atan2(cos).to_degrees())
    }
}

fn flatten(v: Vec3, axis: Vec3) -> Vec3 {
    v - axis * v.dot(axis)
}

impl InteractableBehaviour for Lever {
    fn begin_interaction(&mut self, context: &BehaviourContext) {
        self.ensure_rest(context);
        self.angle = self.angle_of(context.body.pose.rotation);
    }

    fn interacting_update(&mut self, _hand: Entity, context: &BehaviourContext) {
        self.angle = self.angle_of(context.body.pose.rotation);
    }

    fn physics_update(&mut self, context: &BehaviourContext) -> VelocityTarget {
        let (pivot, _) = self.ensure_rest(context);
        let body = &context.body.pose;
        self.angle = self.angle_of(body.rotation);

        let swing = self.swing(pivot, context).unwrap_or(0.);
        let target_angle = (self.angle + swing).clamp(self.min_angle, self.max_angle);
        let turn = Quat::from_axis_angle(self.hinge_axis, (target_angle - self.angle).to_radians());

        VelocityTarget {
            linear: Some(linear_target(
                pivot - body.translation,
                context.delta_time,
                context.config,
            )),
            angular: Some(angular_target(turn, context.delta_time, context.config)),
        }
    }

    fn end_interaction(&mut self, _hand: Entity, context: &BehaviourContext) {
        self.angle = self.angle_of(context.body.pose.rotation);
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
    fn test_angle_and_value() {
        let mut lever = Lever::new(Vec3::Z, -45., 45.).unwrap();
        assert_relative_eq!(
            lever.angle_of(Quat::from_rotation_z(30_f32.to_radians())),
            30.,
            epsilon = 1e-3
        );
        assert_relative_eq!(
            lever.angle_of(Quat::from_rotation_x(30_f32.to_radians())),
            0.,
            epsilon = 1e-3
        );

        assert_relative_eq!(lever.value(), 0.5);
        assert_eq!(lever.position(), LeverPosition::Middle);

        lever.angle = 45.;
        assert_eq!(lever.position(), LeverPosition::Max);
        lever.angle = -60.;
        assert_relative_eq!(lever.value(), 0.);
        assert_eq!(lever.position(), LeverPosition::Min);
    }

    #[test]
    fn test_hinge_axis_needs_a_direction() {
        assert!(matches!(
            Lever::new(Vec3::ZERO, -45., 45.),
            Err(GraspError::InvalidConfig(_))
        ));
        assert!(Lever::new(Vec3::new(f32::NAN, 0., 0.), -45., 45.).is_err());
        assert!(Lever::new(Vec3::Z, f32::NEG_INFINITY, 45.).is_err());

        let lever = Lever::new(Vec3::new(0., 0., 3.), 45., -45.).unwrap();
        assert_relative_eq!(lever.hinge_axis, Vec3::Z);
        assert_eq!((lever.min_angle, lever.max_angle), (-45., 45.));
    }

    #[test]
    fn test_lever_swings_towards_the_hand_within_limits() {
        let mut world = World::new();
        let hand = world.spawn(());
        let config = InteractionConfig::default();
        let body = BodyState::default();
        let holders = [HolderPose {
            hand,
            // Grabbed at the top of the lever, then swung a quarter turn
            hand_pose: Pose::from_translation(Vec3::new(-1., 0., 0.)),
            anchor: GripAnchor::capture(body.pose, Pose::from_translation(Vec3::Y)),
        }];
        let context = BehaviourContext {
            entity: hand,
            body,
            holders: &holders,
            interaction_point: None,
            delta_time: config.expected_delta_time,
            config: &config,
        };

        let mut lever = Lever::new(Vec3::Z, -45., 45.).unwrap();
        lever.begin_interaction(&context);
        let target = lever.physics_update(&context);

        // The swing is 90 degrees, but the lever stops at 45
        assert_relative_eq!(
            target.angular.unwrap(),
            Vec3::new(0., 0., 40.5),
            epsilon = 1e-2
        );
        assert_relative_eq!(target.linear.unwrap(), Vec3::ZERO);
    }
}
