use glam::Vec3;
use hecs::{Entity, World};
use log::{debug, error, info};
use rapier3d::prelude::Collider;

use crate::{
    components::{AttachJoint, AttachPoint, Info, Interactable, Pose, RigidBody},
    control_law::{angular_target, move_towards},
    resources::{
        physics_context::trigger_volume, InteractionContext, InteractionEvent, PhysicsContext,
    },
    util::glam_vec_from_na,
    Engine, GraspError, GraspResult,
};

/// Give an interactable a point that attach joints can snap to.
///
/// `volume` is attached to the interactable's body and always made a sensor. When
/// `match_rotation` is set the item is also turned to line the point up with the joint.
pub fn add_attach_point(
    engine: &mut Engine,
    item: Entity,
    volume: Collider,
    match_rotation: bool,
) -> GraspResult<Entity> {
    let Ok(rigid_body) = engine.world.get::<&RigidBody>(item).map(|r| *r) else {
        error!("[GRASP_ATTACH] {item:?} has no rigid body to put an attach point on");
        return Err(GraspError::MissingRigidBody(item));
    };
    if engine.world.get::<&Interactable>(item).is_err() {
        error!("[GRASP_ATTACH] Attach points can only be added to interactables");
        return Err(GraspError::NotInteractable(item));
    }

    let volume = engine
        .physics_context
        .add_collider(&rigid_body, trigger_volume(volume));
    let mut point = AttachPoint::new(item, volume);
    point.match_rotation = match_rotation;

    Ok(engine.world.spawn((point, Info::new("Attach Point"))))
}

/// Put an attach joint on a body. `volume` should be at least `pull_range` across, as points are
/// only found while they overlap it.
pub fn add_attach_joint(
    engine: &mut Engine,
    body: Entity,
    volume: Collider,
    pull_range: f32,
    attach_range: f32,
) -> GraspResult<Entity> {
    let Ok(rigid_body) = engine.world.get::<&RigidBody>(body).map(|r| *r) else {
        error!("[GRASP_ATTACH] {body:?} has no rigid body to put an attach joint on");
        return Err(GraspError::MissingRigidBody(body));
    };

    let volume = engine
        .physics_context
        .add_collider(&rigid_body, trigger_volume(volume));
    let joint = AttachJoint::new(volume, pull_range, attach_range);

    Ok(engine.world.spawn((joint, Info::new("Attach Joint"))))
}

/// Separate an attach point from whatever joint it's on. Returns `false` if it wasn't attached.
pub fn detach_point(engine: &mut Engine, point: Entity) -> bool {
    let Some(joint) = engine
        .world
        .get::<&AttachPoint>(point)
        .ok()
        .and_then(|p| p.attached_joint)
    else {
        return false;
    };

    detach_inner(
        point,
        joint,
        &mut engine.world,
        &mut engine.physics_context,
        &mut engine.interaction_context,
    );
    true
}

/// Pull nearby attach points towards their joints, snap them on once they're close enough and
/// let them go once they're pulled too far away.
pub fn attach_system(engine: &mut Engine) {
    attach_system_inner(
        &mut engine.world,
        &mut engine.physics_context,
        &mut engine.interaction_context,
    )
}

pub(crate) fn attach_system_inner(
    world: &mut World,
    physics_context: &mut PhysicsContext,
    interaction_context: &mut InteractionContext,
) {
    let joints = world
        .query::<&AttachJoint>()
        .iter()
        .map(|(entity, joint)| (entity, joint.clone()))
        .collect::<Vec<_>>();

    for (joint_entity, joint) in joints {
        let Some(joint_pose) = physics_context.collider_pose(joint.volume) else {
            continue;
        };

        match joint.attached_point {
            Some(point_entity) => {
                let Some((point, point_pose)) = point_and_pose(world, physics_context, point_entity)
                else {
                    detach_inner(
                        point_entity,
                        joint_entity,
                        world,
                        physics_context,
                        interaction_context,
                    );
                    continue;
                };

                let separation = joint_pose.translation.distance(point_pose.translation);
                if separation > joint.drop_distance {
                    debug!("[GRASP_ATTACH] {point_entity:?} was pulled {separation} away from {joint_entity:?}");
                    detach_inner(
                        point_entity,
                        joint_entity,
                        world,
                        physics_context,
                        interaction_context,
                    );
                } else {
                    pull_towards(
                        &point,
                        &point_pose,
                        &joint_pose,
                        world,
                        physics_context,
                        interaction_context,
                    );
                }
            }
            None => {
                let Some((point_entity, point, point_pose, distance)) =
                    closest_free_point(&joint, &joint_pose, world, physics_context)
                else {
                    continue;
                };

                if distance <= joint.attach_range {
                    attach(
                        joint_entity,
                        point_entity,
                        &point,
                        &point_pose,
                        &joint_pose,
                        world,
                        physics_context,
                        interaction_context,
                    );
                } else {
                    pull_towards(
                        &point,
                        &point_pose,
                        &joint_pose,
                        world,
                        physics_context,
                        interaction_context,
                    );
                }
            }
        }
    }
}

fn point_and_pose(
    world: &World,
    physics_context: &PhysicsContext,
    point_entity: Entity,
) -> Option<(AttachPoint, Pose)> {
    let point = (*world.get::<&AttachPoint>(point_entity).ok()?).clone();
    if !world.contains(point.item) {
        return None;
    }
    let pose = physics_context.collider_pose(point.volume)?;
    Some((point, pose))
}

/// The nearest free point overlapping the joint's volume, and how far away it is. Points on held
/// items count too: the pull is blended with the hand's control law.
fn closest_free_point(
    joint: &AttachJoint,
    joint_pose: &Pose,
    world: &World,
    physics_context: &PhysicsContext,
) -> Option<(Entity, AttachPoint, Pose, f32)> {
    let overlapping = physics_context.overlapping(joint.volume);
    if overlapping.is_empty() {
        return None;
    }

    let mut closest: Option<(Entity, AttachPoint, Pose, f32)> = None;
    for (entity, point) in world.query::<&AttachPoint>().iter() {
        if point.is_attached() || !overlapping.contains(&point.volume) {
            continue;
        }
        let Some(pose) = physics_context.collider_pose(point.volume) else {
            continue;
        };

        let distance = joint_pose.translation.distance(pose.translation);
        if distance > joint.pull_range {
            continue;
        }
        if closest.as_ref().map_or(true, |(_, _, _, d)| distance < *d) {
            closest = Some((entity, point.clone(), pose, distance));
        }
    }

    closest
}

#[allow(clippy::too_many_arguments)]
fn attach(
    joint_entity: Entity,
    point_entity: Entity,
    point: &AttachPoint,
    point_pose: &Pose,
    joint_pose: &Pose,
    world: &mut World,
    physics_context: &mut PhysicsContext,
    interaction_context: &mut InteractionContext,
) {
    let Ok(handle) = world.get::<&RigidBody>(point.item).map(|r| r.handle) else {
        return;
    };

    if let Some(body) = physics_context.rigid_bodies.get_mut(handle) {
        body.set_linvel(Default::default(), true);
        body.set_angvel(Default::default(), true);
        if let Ok(mut interactable) = world.get::<&mut Interactable>(point.item) {
            interactable.suppress_gravity(body);
        }

        if point.match_rotation {
            // Turn the body about the point so the point itself stays put
            let item_pose = Pose::from_isometry(body.position());
            let turn = joint_pose.rotation * point_pose.rotation.inverse();
            let rotation = (turn * item_pose.rotation).normalize();
            let translation =
                point_pose.translation + turn * (item_pose.translation - point_pose.translation);
            body.set_position(Pose::new(translation, rotation).position(), true);
        }
    }

    if let Ok(mut interactable) = world.get::<&mut Interactable>(point.item) {
        interactable.clear_external_velocities();
    }
    if let Ok(mut point) = world.get::<&mut AttachPoint>(point_entity) {
        point.attached_joint = Some(joint_entity);
    }
    if let Ok(mut joint) = world.get::<&mut AttachJoint>(joint_entity) {
        joint.attached_point = Some(point_entity);
    }

    info!("[GRASP_ATTACH] {point_entity:?} attached to {joint_entity:?}");
    interaction_context.raise(InteractionEvent::PointAttached {
        point: point_entity,
        joint: joint_entity,
    });
}

/// Clear both sides of a coupling. Either side may already be gone.
pub(crate) fn detach_inner(
    point_entity: Entity,
    joint_entity: Entity,
    world: &mut World,
    physics_context: &mut PhysicsContext,
    interaction_context: &mut InteractionContext,
) {
    if let Ok(mut joint) = world.get::<&mut AttachJoint>(joint_entity) {
        if joint.attached_point == Some(point_entity) {
            joint.attached_point = None;
        }
    }

    let item = match world.get::<&mut AttachPoint>(point_entity) {
        Ok(mut point) if point.attached_joint == Some(joint_entity) => {
            point.attached_joint = None;
            Some(point.item)
        }
        _ => None,
    };

    if let Some(item) = item {
        let handle = world.get::<&RigidBody>(item).map(|r| r.handle).ok();
        if let (Ok(mut interactable), Some(body)) = (
            world.get::<&mut Interactable>(item),
            handle.and_then(|h| physics_context.rigid_bodies.get_mut(h)),
        ) {
            // A hand still holding the item restores gravity when it lets go
            if !interactable.is_attached() {
                interactable.restore_gravity(body);
            }
        }
    }

    info!("[GRASP_ATTACH] {point_entity:?} detached from {joint_entity:?}");
    interaction_context.raise(InteractionEvent::PointDetached {
        point: point_entity,
        joint: joint_entity,
    });
}

/// Ask the point's item to move so the point closes on the joint.
fn pull_towards(
    point: &AttachPoint,
    point_pose: &Pose,
    joint_pose: &Pose,
    world: &mut World,
    physics_context: &PhysicsContext,
    interaction_context: &InteractionContext,
) {
    let Ok(handle) = world.get::<&RigidBody>(point.item).map(|r| r.handle) else {
        return;
    };
    let Some(body) = physics_context.rigid_bodies.get(handle) else {
        return;
    };

    let config = &interaction_context.config;
    let delta_time = physics_context.delta_time();
    let magic = config.attach_velocity_magic * config.time_scale(delta_time);

    let position_delta = joint_pose.translation - point_pose.translation;
    let target = position_delta * magic * delta_time;
    let current = glam_vec_from_na(body.linvel());
    let velocity = move_towards(current, target, config.max_velocity_change);

    let angular_velocity = point.match_rotation.then(|| {
        let rotation_delta = joint_pose.rotation * point_pose.rotation.inverse();
        let target = angular_target(rotation_delta, delta_time, config);
        move_towards(
            glam_vec_from_na(body.angvel()),
            target,
            config.max_angular_velocity_change,
        )
    });

    let Ok(mut interactable) = world.get::<&mut Interactable>(point.item) else {
        return;
    };
    interactable.add_external_velocity(velocity);
    if let Some(angular_velocity) = angular_velocity.filter(|v: &Vec3| v.is_finite()) {
        interactable.add_external_angular_velocity(angular_velocity);
    }
}
