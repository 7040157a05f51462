//! The velocity control law that drives held objects, physical hands and attach points.
//!
//! Nothing here ever sets a pose. Every function produces a *target* velocity, and the body's
//! current velocity is moved towards it by a bounded amount each step. That keeps a held object
//! forced rather than teleported, so it still collides with the world and keeps its momentum.

use glam::{Quat, Vec3};
use rapier3d::prelude::RigidBody as RapierRigidBody;

use crate::{
    components::{GripAnchor, Pose},
    util::{glam_vec_from_na, na_vector_from_glam},
    InteractionConfig,
};

/// A snapshot of a rigid body's pose and velocities.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyState {
    /// Where the body is
    pub pose: Pose,
    /// How fast it's moving
    pub linear_velocity: Vec3,
    /// How fast it's spinning, in radians per second
    pub angular_velocity: Vec3,
}

impl BodyState {
    /// Read the state of a `rapier` body
    pub fn from_rigid_body(body: &RapierRigidBody) -> Self {
        Self {
            pose: Pose::from_isometry(body.position()),
            linear_velocity: glam_vec_from_na(body.linvel()),
            angular_velocity: glam_vec_from_na(body.angvel()),
        }
    }

    /// Is the body finite and inside `bound` on every axis?
    pub fn is_within(&self, bound: f32) -> bool {
        let t = self.pose.translation;
        t.is_finite() && t.abs().max_element() <= bound
    }
}

/// The velocities a behaviour wants its body to have. `None` leaves that velocity alone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityTarget {
    /// Target linear velocity
    pub linear: Option<Vec3>,
    /// Target angular velocity
    pub angular: Option<Vec3>,
}

impl VelocityTarget {
    /// A target that asks for the body to stop
    pub fn stop() -> Self {
        Self {
            linear: Some(Vec3::ZERO),
            angular: Some(Vec3::ZERO),
        }
    }
}

/// How far a body is from where it should be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseDelta {
    /// World space offset from the body's reference point to its target
    pub position: Vec3,
    /// World space rotation that takes the body's orientation to its target
    pub rotation: Quat,
}

impl PoseDelta {
    /// The average of several deltas. Rotations are blended pairwise.
    pub fn mean(deltas: &[PoseDelta]) -> Option<PoseDelta> {
        let (first, rest) = deltas.split_first()?;
        let count = deltas.len() as f32;
        let position = deltas
            .iter()
            .fold(Vec3::ZERO, |sum, d| sum + d.position)
            / count;
        let rotation = rest
            .iter()
            .enumerate()
            .fold(first.rotation, |acc, (i, d)| {
                acc.slerp(d.rotation, 1. / (i as f32 + 2.))
            });
        Some(PoseDelta { position, rotation })
    }
}

/// Move `current` towards `target` by at most `max_delta`.
///
/// Any non-finite component of `target` is treated as "no change" for that axis.
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let axis = |t: f32, c: f32| if t.is_finite() { t } else { c };
    let target = Vec3::new(
        axis(target.x, current.x),
        axis(target.y, current.y),
        axis(target.z, current.z),
    );
    let difference = target - current;
    let distance = difference.length();
    if distance <= max_delta || distance == 0. {
        return target;
    }
    current + difference / distance * max_delta
}

/// Decompose a rotation into an axis and an angle in degrees, with the angle in `(-180, 180]`.
pub fn axis_angle_degrees(rotation: Quat) -> (Vec3, f32) {
    let (axis, angle) = rotation.to_axis_angle();
    let mut degrees = angle.to_degrees();
    if degrees > 180. {
        degrees -= 360.;
    } else if degrees <= -180. {
        degrees += 360.;
    }
    (axis, degrees)
}

/// The linear velocity that would close `position_delta` in one step, scaled by the gains.
pub fn linear_target(position_delta: Vec3, delta_time: f32, config: &InteractionConfig) -> Vec3 {
    let magic = config.velocity_magic * config.time_scale(delta_time);
    position_delta / delta_time * magic
}

/// The angular velocity that turns a body by `rotation_delta`, scaled by the gains.
///
/// Follows `axis * angle_in_degrees / (dt * angular_velocity_divisor)`, which is not a physically
/// derived expression; the divisor acts as damping and is tunable.
pub fn angular_target(rotation_delta: Quat, delta_time: f32, config: &InteractionConfig) -> Vec3 {
    let (axis, degrees) = axis_angle_degrees(rotation_delta);
    let magic = config.angular_velocity_magic * config.time_scale(delta_time);
    axis * degrees / (delta_time * config.angular_velocity_divisor) * magic
}

/// Turn a pose delta into a velocity target
pub fn velocity_target(
    delta: &PoseDelta,
    delta_time: f32,
    config: &InteractionConfig,
) -> VelocityTarget {
    VelocityTarget {
        linear: Some(linear_target(delta.position, delta_time, config)),
        angular: Some(angular_target(delta.rotation, delta_time, config)),
    }
}

/// How far the captured grip point is from the hand.
pub fn delta_from_anchor(anchor: &GripAnchor, item: &Pose, hand: &Pose) -> PoseDelta {
    PoseDelta {
        position: hand.translation - anchor.grip_point(item),
        rotation: anchor.target_rotation(hand) * item.rotation.inverse(),
    }
}

/// How far a fixed interaction point (in the item's local space) is from the hand.
pub fn delta_from_interaction_point(point: &Pose, item: &Pose, hand: &Pose) -> PoseDelta {
    let point = item.compose(point);
    PoseDelta {
        position: hand.translation - point.translation,
        rotation: hand.rotation * point.rotation.inverse(),
    }
}

/// The target velocities that bring a body's origin to `target`.
pub fn velocity_toward_pose(
    current: &BodyState,
    target: &Pose,
    delta_time: f32,
    config: &InteractionConfig,
) -> VelocityTarget {
    let delta = PoseDelta {
        position: target.translation - current.pose.translation,
        rotation: target.rotation * current.pose.rotation.inverse(),
    };
    velocity_target(&delta, delta_time, config)
}

/// Move a body's velocities towards `target` by no more than the configured limits, returning
/// the velocities it ended up with.
pub fn apply_velocity_target(
    body: &mut RapierRigidBody,
    target: &VelocityTarget,
    config: &InteractionConfig,
) -> (Vec3, Vec3) {
    let mut linear = glam_vec_from_na(body.linvel());
    let mut angular = glam_vec_from_na(body.angvel());

    if let Some(target) = target.linear {
        linear = move_towards(linear, target, config.max_velocity_change);
        body.set_linvel(na_vector_from_glam(linear), true);
    }

    if let Some(target) = target.angular {
        angular = move_towards(angular, target, config.max_angular_velocity_change);
        body.set_angvel(na_vector_from_glam(angular), true);
    }

    (linear, angular)
}
