use hecs::{Entity, World};
use log::info;
use rapier3d::prelude::{Collider, RigidBodyBuilder};

use crate::{
    components::{Hand, Info, PhysicalHand, RigidBody},
    control_law::{apply_velocity_target, velocity_toward_pose, BodyState},
    resources::{InteractionContext, PhysicsContext},
    Engine, GraspResult,
};

/// Give a hand a dynamic stand-in that world geometry can block.
///
/// The stand-in chases the hand with the same control law as held items. Its colliders start out
/// as sensors and are only made solid while the hand's grip is down on nothing.
pub fn add_physical_hand(
    engine: &mut Engine,
    hand: Entity,
    colliders: Vec<Collider>,
) -> GraspResult<Entity> {
    let pose = engine.world.get::<&Hand>(hand)?.pose;

    let colliders = colliders
        .into_iter()
        .map(|mut collider| {
            collider.set_sensor(true);
            collider
        })
        .collect();
    let rigid_body = RigidBodyBuilder::dynamic()
        .position(pose.position())
        .gravity_scale(0.)
        .ccd_enabled(true)
        .build();
    let (rigid_body, colliders) = engine
        .physics_context
        .create_rigid_body_and_colliders(rigid_body, colliders);

    let entity = engine.world.spawn((
        PhysicalHand::new(hand, colliders),
        rigid_body,
        Info::new("Physical Hand"),
    ));

    let mut hand_component = engine.world.get::<&mut Hand>(hand)?;
    hand_component.physical_hand = Some(entity);
    hand_component.update_presentation();

    info!("[GRASP_PHYSICAL_HANDS] Added physical hand {entity:?} for {hand:?}");
    Ok(entity)
}

/// Drive every physical hand towards its hand, and make its colliders solid or not to match the
/// hand's presentation.
pub fn physical_hands_system(engine: &mut Engine) {
    physical_hands_system_inner(
        &mut engine.world,
        &mut engine.physics_context,
        &engine.interaction_context,
    )
}

pub(crate) fn physical_hands_system_inner(
    world: &mut World,
    physics_context: &mut PhysicsContext,
    interaction_context: &InteractionContext,
) {
    let delta_time = physics_context.delta_time();
    let config = &interaction_context.config;

    for (_, (physical_hand, rigid_body)) in world.query::<(&mut PhysicalHand, &RigidBody)>().iter()
    {
        let Ok((target, active)) = world
            .get::<&Hand>(physical_hand.hand)
            .map(|h| (h.pose, h.physical_hand_active))
        else {
            continue;
        };

        if let Some(body) = physics_context.rigid_bodies.get_mut(rigid_body.handle) {
            let current = BodyState::from_rigid_body(body);
            let velocity = velocity_toward_pose(&current, &target, delta_time, config);
            apply_velocity_target(body, &velocity, config);
        }

        if physical_hand.solid != active {
            physics_context.set_sensor(&physical_hand.colliders, !active);
            physical_hand.solid = active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::{Handedness, InteractionStyle, Pose},
        util::{
            glam_vec_from_na,
            test_utils::{device_at, press, release, spawn_hand, test_engine},
        },
    };
    use approx::assert_relative_eq;
    use glam::Vec3;
    use rapier3d::prelude::ColliderBuilder;

    #[test]
    fn test_physical_hand_follows_the_hand() {
        let mut engine = test_engine();
        let hand = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::Hold,
            Vec3::ZERO,
        );
        let physical_hand =
            add_physical_hand(&mut engine, hand, vec![ColliderBuilder::ball(0.04).build()])
                .unwrap();
        let handle = engine.world.get::<&RigidBody>(physical_hand).unwrap().handle;
        let mut device = device_at(Vec3::ZERO, Vec3::new(5., 0., 0.));
        engine.tick(&mut device);

        device.set_pose(Handedness::Left, Pose::from_translation(Vec3::new(0.05, 0., 0.)));
        engine.tick(&mut device);

        let body = &engine.physics_context.rigid_bodies[handle];
        assert_relative_eq!(
            glam_vec_from_na(body.translation()),
            Vec3::new(0.05, 0., 0.),
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_colliders_are_solid_only_with_an_empty_grip() {
        let mut engine = test_engine();
        let hand = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::Hold,
            Vec3::ZERO,
        );
        let physical_hand =
            add_physical_hand(&mut engine, hand, vec![ColliderBuilder::ball(0.04).build()])
                .unwrap();
        let collider = engine
            .world
            .get::<&PhysicalHand>(physical_hand)
            .unwrap()
            .colliders[0];
        let is_sensor =
            |engine: &Engine| engine.physics_context.colliders[collider].is_sensor();

        let mut device = device_at(Vec3::ZERO, Vec3::new(5., 0., 0.));
        engine.tick(&mut device);
        assert!(is_sensor(&engine));

        press(&mut engine, &mut device, Handedness::Left);
        assert!(!is_sensor(&engine));
        assert!(engine.world.get::<&PhysicalHand>(physical_hand).unwrap().solid);

        release(&mut engine, &mut device, Handedness::Left);
        assert!(is_sensor(&engine));
    }
}
