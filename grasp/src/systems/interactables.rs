use hecs::{Entity, World};
use log::{debug, error, warn};
use rapier3d::prelude::ColliderHandle;

use crate::{
    behaviours::{Behaviour, BehaviourContext, HolderPose, InteractableBehaviour},
    components::{Hand, Interactable, RigidBody, VelocityHistory},
    control_law::{apply_velocity_target, BodyState},
    resources::{ColliderRegistry, InteractionContext, PhysicsContext},
    systems::grabbing::{destroy_interactable_inner, end_interaction_inner},
    Engine, GraspError, GraspResult,
};

/// Make an entity with a [`RigidBody`] into something hands can pick up.
///
/// Every non-sensor collider on the body becomes one of the interactable's collision volumes and
/// is registered with the collider registry. Sensor colliders are left alone, so attach point
/// volumes and the like can live on the same body.
pub fn add_interactable(
    engine: &mut Engine,
    entity: Entity,
    mut interactable: Interactable,
    behaviour: impl InteractableBehaviour,
) -> GraspResult<()> {
    let volumes = collision_volumes(engine, entity)?;
    engine.collider_registry.register(entity, &volumes);

    interactable.volumes = volumes;
    interactable.velocity_history =
        VelocityHistory::new(engine.interaction_context.config.velocity_history_steps);
    engine
        .world
        .insert(entity, (interactable, Behaviour::new(behaviour)))?;

    debug!("[GRASP_INTERACTABLES] Added interactable {entity:?}");
    Ok(())
}

/// Re-register an interactable's collision volumes after colliders were added to or removed from
/// its body.
pub fn refresh_collision_volumes(engine: &mut Engine, entity: Entity) -> GraspResult<()> {
    if engine.world.get::<&Interactable>(entity).is_err() {
        return Err(GraspError::NotInteractable(entity));
    }

    let volumes = collision_volumes(engine, entity)?;
    engine.collider_registry.register(entity, &volumes);

    engine.world.get::<&mut Interactable>(entity)?.volumes = volumes;
    Ok(())
}

fn collision_volumes(engine: &Engine, entity: Entity) -> GraspResult<Vec<ColliderHandle>> {
    let Ok(handle) = engine.world.get::<&RigidBody>(entity).map(|r| r.handle) else {
        error!("[GRASP_INTERACTABLES] {entity:?} has no rigid body");
        return Err(GraspError::MissingRigidBody(entity));
    };

    let volumes = engine.physics_context.solid_colliders(handle);
    if volumes.is_empty() {
        error!("[GRASP_INTERACTABLES] {entity:?} has no solid colliders");
        return Err(GraspError::NoCollisionVolumes(entity));
    }

    Ok(volumes)
}

/// Drive every held interactable towards its hands, drop anything a hand has wandered too far
/// from, and destroy anything that has left the world.
pub fn interactables_system(engine: &mut Engine) {
    interactables_system_inner(
        &mut engine.world,
        &mut engine.physics_context,
        &mut engine.collider_registry,
        &mut engine.interaction_context,
    )
}

pub(crate) fn interactables_system_inner(
    world: &mut World,
    physics_context: &mut PhysicsContext,
    collider_registry: &mut ColliderRegistry,
    interaction_context: &mut InteractionContext,
) {
    let entities = world
        .query::<(&Interactable, &RigidBody)>()
        .iter()
        .map(|(entity, (_, rigid_body))| (entity, rigid_body.handle))
        .collect::<Vec<_>>();
    let world_bound = interaction_context.config.world_bound;

    for (entity, handle) in entities {
        let Some(body) = physics_context.rigid_bodies.get(handle) else {
            continue;
        };

        if !BodyState::from_rigid_body(body).is_within(world_bound) {
            warn!("[GRASP_INTERACTABLES] {entity:?} left the world, destroying it");
            destroy_interactable_inner(
                entity,
                world,
                physics_context,
                collider_registry,
                interaction_context,
            );
            continue;
        }

        drop_distant_holders(entity, world, physics_context, interaction_context);

        let attached = world
            .get::<&Interactable>(entity)
            .map(|i| i.is_attached())
            .unwrap_or(false);
        if attached {
            let target = with_behaviour(
                world,
                physics_context,
                interaction_context,
                entity,
                |behaviour, context| behaviour.physics_update(context),
            )
            .unwrap_or_default();

            if let (Some(body), Ok(mut interactable)) = (
                physics_context.rigid_bodies.get_mut(handle),
                world.get::<&mut Interactable>(entity),
            ) {
                let (linear, angular) =
                    apply_velocity_target(body, &target, &interaction_context.config);
                interactable.velocity_history.push(linear, angular);
            }
        }

        if let (Some(body), Ok(mut interactable)) = (
            physics_context.rigid_bodies.get_mut(handle),
            world.get::<&mut Interactable>(entity),
        ) {
            interactable.apply_external_velocities(body);
        }
    }
}

fn drop_distant_holders(
    entity: Entity,
    world: &mut World,
    physics_context: &mut PhysicsContext,
    interaction_context: &mut InteractionContext,
) {
    let too_far = {
        let Ok(interactable) = world.get::<&Interactable>(entity) else {
            return;
        };
        interactable
            .holders
            .hands()
            .filter(|hand| {
                let Ok(position) = world.get::<&Hand>(*hand).map(|h| h.pose.translation) else {
                    return true;
                };
                physics_context
                    .distance_to_volumes(&interactable.volumes, position)
                    .map_or(false, |distance| distance > interactable.drop_distance)
            })
            .collect::<Vec<_>>()
    };

    for hand in too_far {
        debug!("[GRASP_INTERACTABLES] {hand:?} is too far from {entity:?}, dropping it");
        end_interaction_inner(hand, entity, world, physics_context, interaction_context);
    }
}

/// Call one of an interactable's behaviour hooks with a freshly built [`BehaviourContext`].
///
/// Returns `None` if the entity isn't a live interactable.
pub(crate) fn with_behaviour<R>(
    world: &World,
    physics_context: &PhysicsContext,
    interaction_context: &InteractionContext,
    entity: Entity,
    hook: impl FnOnce(&mut dyn InteractableBehaviour, &BehaviourContext) -> R,
) -> Option<R> {
    let handle = world.get::<&RigidBody>(entity).ok()?.handle;
    let body = BodyState::from_rigid_body(physics_context.rigid_bodies.get(handle)?);

    let (holders, interaction_point) = {
        let interactable = world.get::<&Interactable>(entity).ok()?;
        let holders = interactable
            .holders
            .iter()
            .filter_map(|holder| {
                let hand = world.get::<&Hand>(holder.hand).ok()?;
                Some(HolderPose {
                    hand: holder.hand,
                    hand_pose: hand.pose,
                    anchor: holder.anchor,
                })
            })
            .collect::<Vec<_>>();
        (holders, interactable.interaction_point)
    };

    let context = BehaviourContext {
        entity,
        body,
        holders: &holders,
        interaction_point,
        delta_time: physics_context.delta_time(),
        config: &interaction_context.config,
    };

    let mut behaviour = world.get::<&mut Behaviour>(entity).ok()?;
    Some(hook(&mut **behaviour, &context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        behaviours::Item,
        components::{Handedness, InteractionStyle, Pose},
        resources::InteractionEvent,
        systems::grabbing::begin_interaction,
        util::{
            na_vector_from_glam,
            test_utils::{device_at, press, release, spawn_ball, spawn_hand, spawn_item, test_engine},
        },
    };
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};
    use rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder};

    fn linvel(engine: &Engine, entity: Entity) -> Vec3 {
        let handle = engine.world.get::<&RigidBody>(entity).unwrap().handle;
        crate::util::glam_vec_from_na(engine.physics_context.rigid_bodies[handle].linvel())
    }

    #[test]
    fn test_add_interactable_registers_solid_colliders() {
        let mut engine = test_engine();
        let entity = engine.world.spawn(());
        let (rigid_body, colliders) = engine.physics_context.create_rigid_body_and_colliders(
            RigidBodyBuilder::dynamic().build(),
            vec![
                ColliderBuilder::ball(0.1).build(),
                ColliderBuilder::ball(0.2).sensor(true).build(),
                ColliderBuilder::cuboid(0.1, 0.1, 0.1).build(),
            ],
        );
        engine.world.insert_one(entity, rigid_body).unwrap();

        add_interactable(&mut engine, entity, Interactable::default(), Item::default()).unwrap();

        assert_eq!(
            engine.collider_registry.volumes_of(entity),
            &[colliders[0], colliders[2]]
        );
        assert_eq!(engine.collider_registry.resolve(colliders[1]), None);
        assert_eq!(
            engine.world.get::<&Interactable>(entity).unwrap().volumes,
            vec![colliders[0], colliders[2]]
        );
    }

    #[test]
    fn test_add_interactable_errors() {
        let mut engine = test_engine();

        let no_body = engine.world.spawn(());
        assert!(matches!(
            add_interactable(&mut engine, no_body, Interactable::default(), Item::default()),
            Err(GraspError::MissingRigidBody(e)) if e == no_body
        ));

        let sensors_only = engine.world.spawn(());
        let (rigid_body, _) = engine.physics_context.create_rigid_body_and_colliders(
            RigidBodyBuilder::dynamic().build(),
            vec![ColliderBuilder::ball(0.1).sensor(true).build()],
        );
        engine.world.insert_one(sensors_only, rigid_body).unwrap();
        assert!(matches!(
            add_interactable(
                &mut engine,
                sensors_only,
                Interactable::default(),
                Item::default()
            ),
            Err(GraspError::NoCollisionVolumes(_))
        ));
        assert!(engine.collider_registry.list_all().is_empty());
    }

    #[test]
    fn test_refresh_collision_volumes() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        let rigid_body = *engine.world.get::<&RigidBody>(item).unwrap();
        let extra = engine
            .physics_context
            .add_collider(&rigid_body, ColliderBuilder::ball(0.2).build());

        assert_eq!(engine.collider_registry.resolve(extra), None);
        refresh_collision_volumes(&mut engine, item).unwrap();
        assert_eq!(engine.collider_registry.resolve(extra), Some(item));
        assert_eq!(engine.world.get::<&Interactable>(item).unwrap().volumes.len(), 2);

        let ball = spawn_ball(&mut engine, Vec3::X, 0.1);
        assert!(matches!(
            refresh_collision_volumes(&mut engine, ball),
            Err(GraspError::NotInteractable(_))
        ));
    }

    #[test]
    fn test_pickup_and_throw() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        let start = Vec3::new(-0.03, 0., 0.);
        let hand = spawn_hand(&mut engine, Handedness::Right, InteractionStyle::Hold, start);
        let mut device = device_at(Vec3::new(-1., 0., 0.), start);

        // One step for the physics to notice the hand is touching the item
        engine.tick(&mut device);
        press(&mut engine, &mut device, Handedness::Right);
        assert_eq!(
            engine.world.get::<&Hand>(hand).unwrap().currently_interacting,
            Some(item)
        );

        // Sweep the hand one metre along +x over ten steps
        let mut velocities = Vec::new();
        for step in 1..=10 {
            let position = start + Vec3::new(step as f32 * 0.1, 0., 0.);
            device.set_pose(Handedness::Right, Pose::new(position, Quat::IDENTITY));
            engine.tick(&mut device);
            velocities.push(linvel(&engine, item));
        }

        // Never more than the per-step limit from one step to the next
        let max_change = engine.config().max_velocity_change;
        let mut previous = Vec3::ZERO;
        for velocity in &velocities {
            assert!((*velocity - previous).length() <= max_change + 1e-3);
            previous = *velocity;
        }

        let history = engine
            .world
            .get::<&Interactable>(item)
            .unwrap()
            .velocity_history
            .clone();
        assert_eq!(history.recorded(), 3);
        let expected = history.mean_linear().unwrap();
        assert!(expected.x > 5.);
        assert!(expected.normalize().x > 0.99);

        release(&mut engine, &mut device, Handedness::Right);
        let interactable = engine.world.get::<&Interactable>(item).unwrap();
        assert!(!interactable.is_attached());
        drop(interactable);

        // The release velocity is the mean of the history, and nothing damps it in the step
        assert_relative_eq!(linvel(&engine, item), expected, epsilon = 1e-3);
        let handle = engine.world.get::<&RigidBody>(item).unwrap().handle;
        assert_relative_eq!(
            engine.physics_context.rigid_bodies[handle].gravity_scale(),
            1.0
        );
    }

    #[test]
    fn test_drop_distance() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        engine
            .world
            .get::<&mut Interactable>(item)
            .unwrap()
            .drop_distance = 0.2;
        let hand = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::ByScript,
            Vec3::ZERO,
        );
        assert!(begin_interaction(&mut engine, hand, item));

        // Pin the item so the hand can get away from it
        let handle = engine.world.get::<&RigidBody>(item).unwrap().handle;
        engine.physics_context.rigid_bodies[handle].set_body_type(
            rapier3d::prelude::RigidBodyType::KinematicPositionBased,
            true,
        );

        let mut device = device_at(Vec3::ZERO, Vec3::new(1., 0., 0.));
        device.set_pose(Handedness::Left, Pose::from_translation(Vec3::new(0.2, 0., 0.)));
        engine.tick(&mut device);
        assert!(engine.world.get::<&Interactable>(item).unwrap().is_attached());

        device.set_pose(Handedness::Left, Pose::from_translation(Vec3::new(0.5, 0., 0.)));
        engine.tick(&mut device);
        engine.tick(&mut device);
        assert!(!engine.world.get::<&Interactable>(item).unwrap().is_attached());
        assert_eq!(
            engine.world.get::<&Hand>(hand).unwrap().currently_interacting,
            None
        );
        assert!(engine
            .drain_events()
            .contains(&InteractionEvent::EndedInteraction {
                hand,
                interactable: item
            }));
    }

    #[test]
    fn test_leaving_the_world_destroys_the_interactable() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        let hand = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::ByScript,
            Vec3::ZERO,
        );
        assert!(begin_interaction(&mut engine, hand, item));

        let handle = engine.world.get::<&RigidBody>(item).unwrap().handle;
        engine.physics_context.rigid_bodies[handle].set_translation(
            na_vector_from_glam(Vec3::new(0., -20_000., 0.)),
            true,
        );

        let mut device = device_at(Vec3::ZERO, Vec3::X);
        engine.tick(&mut device);

        assert!(!engine.world.contains(item));
        assert!(engine.physics_context.rigid_bodies.get(handle).is_none());
        assert!(!engine.collider_registry.contains(item));
        let hand = engine.world.get::<&Hand>(hand).unwrap();
        assert_eq!(hand.currently_interacting, None);
        assert!(hand.hovering.is_empty());
        drop(hand);
        assert!(engine
            .drain_events()
            .contains(&InteractionEvent::Destroyed { interactable: item }));
    }

    #[test]
    fn test_external_velocity_is_blended() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        {
            let mut interactable = engine.world.get::<&mut Interactable>(item).unwrap();
            interactable.add_external_velocity(Vec3::new(2., 0., 0.));
            interactable.add_external_velocity(Vec3::new(4., 0., 0.));
        }

        interactables_system(&mut engine);
        assert_relative_eq!(linvel(&engine, item), Vec3::new(1.5, 0., 0.));

        // Consumed
        interactables_system(&mut engine);
        assert_relative_eq!(linvel(&engine, item), Vec3::new(1.5, 0., 0.));
    }
}
