use glam::Vec3;
use hecs::{Entity, World};
use log::{debug, info};
use rapier3d::prelude::RigidBodyHandle;

use crate::{
    components::{
        hand::HandState, interactable::MAX_HOLDERS, AttachJoint, AttachPoint, GripAnchor, Hand,
        Holder, Interactable, Pose, RigidBody,
    },
    resources::{
        ColliderRegistry, HapticContext, InteractionContext, InteractionEvent, PhysicsContext,
    },
    systems::{attach::detach_inner, interactables::with_behaviour},
    Engine,
};

/// The length of the pulse played when a hand picks something up, in microseconds
pub const PICKUP_PULSE_MICROS: u32 = 1000;

/// Make `hand` take hold of `interactable`.
///
/// Does nothing (and returns `false`) if the interactable can't be held, or belongs to someone
/// else and the ownership authority won't let it be taken. If another hand is holding it, that
/// hand is made to let go first, unless the interactable allows two-handed holding and has room.
pub fn begin_interaction(engine: &mut Engine, hand: Entity, interactable: Entity) -> bool {
    begin_interaction_inner(
        hand,
        interactable,
        &mut engine.world,
        &mut engine.physics_context,
        &mut engine.haptic_context,
        &mut engine.interaction_context,
    )
}

/// Make `hand` let go of `interactable`. Returns `false` if it wasn't holding it.
pub fn end_interaction(engine: &mut Engine, hand: Entity, interactable: Entity) -> bool {
    end_interaction_inner(
        hand,
        interactable,
        &mut engine.world,
        &mut engine.physics_context,
        &mut engine.interaction_context,
    )
}

pub(crate) fn begin_interaction_inner(
    hand_entity: Entity,
    interactable_entity: Entity,
    world: &mut World,
    physics_context: &mut PhysicsContext,
    haptic_context: &mut HapticContext,
    interaction_context: &mut InteractionContext,
) -> bool {
    let (two_handed, holders) = match world.get::<&Interactable>(interactable_entity) {
        Ok(interactable) if interactable.can_attach => (
            interactable.two_handed,
            interactable.holders.hands().collect::<Vec<_>>(),
        ),
        Ok(_) => return false,
        Err(_) => {
            debug!("[GRASP_GRABBING] {interactable_entity:?} is not an interactable");
            return false;
        }
    };

    let Ok(current) = world
        .get::<&Hand>(hand_entity)
        .map(|hand| hand.currently_interacting)
    else {
        return false;
    };

    if current == Some(interactable_entity) {
        return true;
    }

    let mut request_ownership = false;
    if let Some(authority) = &interaction_context.ownership {
        if !authority.is_mine(interactable_entity) {
            if !authority.allows_takeover(interactable_entity) {
                debug!("[GRASP_GRABBING] {interactable_entity:?} is owned elsewhere, ignoring");
                return false;
            }
            request_ownership = true;
        }
    }

    // One hand, one object.
    if let Some(previous) = current {
        end_interaction_inner(
            hand_entity,
            previous,
            world,
            physics_context,
            interaction_context,
        );
    }

    let others = holders
        .into_iter()
        .filter(|h| *h != hand_entity)
        .collect::<Vec<_>>();
    if !two_handed || others.len() >= MAX_HOLDERS {
        for other in others {
            end_interaction_inner(
                other,
                interactable_entity,
                world,
                physics_context,
                interaction_context,
            );
        }
    }

    let Ok(rigid_body) = world.get::<&RigidBody>(interactable_entity).map(|r| *r) else {
        return false;
    };
    let Some(body) = physics_context.rigid_bodies.get_mut(rigid_body.handle) else {
        return false;
    };
    let Ok((hand_pose, handedness)) = world
        .get::<&Hand>(hand_entity)
        .map(|hand| (hand.pose, hand.handedness))
    else {
        return false;
    };

    {
        let Ok(mut interactable) = world.get::<&mut Interactable>(interactable_entity) else {
            return false;
        };
        let first = interactable.holders.is_empty();
        let anchor = GripAnchor::capture(Pose::from_isometry(body.position()), hand_pose);
        if !interactable.holders.insert(Holder {
            hand: hand_entity,
            anchor,
        }) {
            return false;
        }
        if first {
            interactable.on_attach(body, &mut physics_context.colliders);
        }
    }

    if let Ok(mut hand) = world.get::<&mut Hand>(hand_entity) {
        hand.currently_interacting = Some(interactable_entity);
        hand.update_presentation();
    }

    haptic_context.trigger_haptic_pulse(handedness, PICKUP_PULSE_MICROS);
    with_behaviour(
        world,
        physics_context,
        interaction_context,
        interactable_entity,
        |behaviour, context| behaviour.begin_interaction(context),
    );

    if request_ownership {
        if let Some(authority) = interaction_context.ownership.as_mut() {
            authority.request_ownership(interactable_entity);
        }
    }

    info!("[GRASP_GRABBING] {hand_entity:?} picked up {interactable_entity:?}");
    interaction_context.raise(InteractionEvent::BeganInteraction {
        hand: hand_entity,
        interactable: interactable_entity,
    });

    true
}

pub(crate) fn end_interaction_inner(
    hand_entity: Entity,
    interactable_entity: Entity,
    world: &mut World,
    physics_context: &mut PhysicsContext,
    interaction_context: &mut InteractionContext,
) -> bool {
    let mut was_holding = false;
    let mut hand_velocity = (Vec3::ZERO, Vec3::ZERO);
    if let Ok(mut hand) = world.get::<&mut Hand>(hand_entity) {
        hand_velocity = (hand.linear_velocity, hand.angular_velocity);
        if hand.currently_interacting == Some(interactable_entity) {
            hand.currently_interacting = None;
            was_holding = true;
            hand.state = match hand.state {
                HandState::GripDownInteracting => HandState::GripDownNotInteracting,
                HandState::GripToggleOnInteracting => HandState::Idle,
                state => state,
            };
        }
        hand.hovering.remove(interactable_entity);
        hand.update_presentation();
    }

    let rigid_body = world
        .get::<&RigidBody>(interactable_entity)
        .map(|r| *r)
        .ok();

    let released = match world.get::<&mut Interactable>(interactable_entity) {
        Ok(mut interactable) => match interactable.holders.remove(hand_entity) {
            Some(_) => {
                let body = rigid_body.and_then(|r| physics_context.rigid_bodies.get_mut(r.handle));
                if let (true, Some(body)) = (interactable.holders.is_empty(), body) {
                    // Let go before a single held step: the item leaves with the hand's motion
                    if interactable.velocity_history.recorded() == 0 {
                        let (linear, angular) = hand_velocity;
                        interactable.velocity_history.push(linear, angular);
                    }
                    interactable.on_detach(body, &mut physics_context.colliders);
                }
                true
            }
            None => false,
        },
        Err(_) => false,
    };

    if !(released || was_holding) {
        return false;
    }

    if released {
        with_behaviour(
            world,
            physics_context,
            interaction_context,
            interactable_entity,
            |behaviour, context| behaviour.end_interaction(hand_entity, context),
        );
    }

    info!("[GRASP_GRABBING] {hand_entity:?} let go of {interactable_entity:?}");
    interaction_context.raise(InteractionEvent::EndedInteraction {
        hand: hand_entity,
        interactable: interactable_entity,
    });

    true
}

/// Make every hand let go of an interactable and forget it was ever hovered, and take it out of
/// the collider registry. The entity itself is left alone.
pub fn forget_interactable(engine: &mut Engine, interactable: Entity) {
    forget_interactable_inner(
        interactable,
        &mut engine.world,
        &mut engine.physics_context,
        &mut engine.collider_registry,
        &mut engine.interaction_context,
    )
}

/// Forget an interactable, free any attach joints it was coupled to, then remove its body and
/// despawn it. Returns `false` if the entity didn't exist.
pub fn destroy_interactable(engine: &mut Engine, interactable: Entity) -> bool {
    destroy_interactable_inner(
        interactable,
        &mut engine.world,
        &mut engine.physics_context,
        &mut engine.collider_registry,
        &mut engine.interaction_context,
    )
}

pub(crate) fn forget_interactable_inner(
    interactable_entity: Entity,
    world: &mut World,
    physics_context: &mut PhysicsContext,
    collider_registry: &mut ColliderRegistry,
    interaction_context: &mut InteractionContext,
) {
    let holders = world
        .query::<&Hand>()
        .iter()
        .filter(|(_, hand)| hand.currently_interacting == Some(interactable_entity))
        .map(|(entity, _)| entity)
        .chain(
            world
                .get::<&Interactable>(interactable_entity)
                .map(|i| i.holders.hands().collect::<Vec<_>>())
                .unwrap_or_default(),
        )
        .collect::<Vec<_>>();

    for hand in holders {
        end_interaction_inner(
            hand,
            interactable_entity,
            world,
            physics_context,
            interaction_context,
        );
    }

    collider_registry.deregister(interactable_entity);
    for (_, hand) in world.query_mut::<&mut Hand>() {
        hand.hovering.remove(interactable_entity);
    }
}

pub(crate) fn destroy_interactable_inner(
    interactable_entity: Entity,
    world: &mut World,
    physics_context: &mut PhysicsContext,
    collider_registry: &mut ColliderRegistry,
    interaction_context: &mut InteractionContext,
) -> bool {
    if !world.contains(interactable_entity) {
        return false;
    }

    forget_interactable_inner(
        interactable_entity,
        world,
        physics_context,
        collider_registry,
        interaction_context,
    );

    let handle = world
        .get::<&RigidBody>(interactable_entity)
        .map(|r| r.handle)
        .ok();

    // Points on the item go with it
    let points = world
        .query::<&AttachPoint>()
        .iter()
        .filter(|(_, point)| point.item == interactable_entity)
        .map(|(entity, point)| (entity, point.attached_joint))
        .collect::<Vec<_>>();
    for (point, joint) in points {
        if let Some(joint) = joint {
            detach_inner(point, joint, world, physics_context, interaction_context);
        }
        let _ = world.despawn(point);
    }

    // As do joints on its body
    if let Some(handle) = handle {
        for (joint, point) in joints_on_body(world, physics_context, handle) {
            if let Some(point) = point {
                detach_inner(point, joint, world, physics_context, interaction_context);
            }
            let _ = world.despawn(joint);
        }
        physics_context.remove_rigid_body(handle);
    }

    let _ = world.despawn(interactable_entity);
    info!("[GRASP_GRABBING] Destroyed {interactable_entity:?}");
    interaction_context.raise(InteractionEvent::Destroyed {
        interactable: interactable_entity,
    });
    true
}

fn joints_on_body(
    world: &World,
    physics_context: &PhysicsContext,
    handle: RigidBodyHandle,
) -> Vec<(Entity, Option<Entity>)> {
    world
        .query::<&AttachJoint>()
        .iter()
        .filter(|(_, joint)| {
            physics_context
                .colliders
                .get(joint.volume)
                .and_then(|c| c.parent())
                == Some(handle)
        })
        .map(|(entity, joint)| (entity, joint.attached_point))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::{Handedness, InteractionStyle},
        resources::OwnershipAuthority,
        util::{
            glam_vec_from_na,
            test_utils::{device_at, spawn_hand, spawn_item, test_engine},
        },
    };
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_single_ownership() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        let left = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::ByScript,
            Vec3::new(-0.03, 0., 0.),
        );
        let right = spawn_hand(
            &mut engine,
            Handedness::Right,
            InteractionStyle::ByScript,
            Vec3::new(0.03, 0., 0.),
        );

        assert!(begin_interaction(&mut engine, left, item));
        assert!(begin_interaction(&mut engine, right, item));

        let holding = |engine: &Engine, hand| {
            engine.world.get::<&Hand>(hand).unwrap().currently_interacting == Some(item)
        };
        assert!(!holding(&engine, left));
        assert!(holding(&engine, right));

        let interactable = engine.world.get::<&Interactable>(item).unwrap();
        assert_eq!(interactable.holders.hands().collect::<Vec<_>>(), vec![right]);
        drop(interactable);

        let events = engine.drain_events();
        assert_eq!(
            events,
            vec![
                InteractionEvent::BeganInteraction {
                    hand: left,
                    interactable: item
                },
                InteractionEvent::EndedInteraction {
                    hand: left,
                    interactable: item
                },
                InteractionEvent::BeganInteraction {
                    hand: right,
                    interactable: item
                },
            ]
        );
    }

    #[test]
    fn test_two_handed_holding() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        engine
            .world
            .get::<&mut Interactable>(item)
            .unwrap()
            .two_handed = true;
        let left = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::ByScript,
            Vec3::new(-0.03, 0., 0.),
        );
        let right = spawn_hand(
            &mut engine,
            Handedness::Right,
            InteractionStyle::ByScript,
            Vec3::new(0.03, 0., 0.),
        );

        assert!(begin_interaction(&mut engine, left, item));
        assert!(begin_interaction(&mut engine, right, item));
        assert_eq!(
            engine
                .world
                .get::<&Interactable>(item)
                .unwrap()
                .holders
                .len(),
            2
        );

        assert!(end_interaction(&mut engine, left, item));
        let interactable = engine.world.get::<&Interactable>(item).unwrap();
        assert!(interactable.is_attached());
        assert_eq!(interactable.holders.hands().collect::<Vec<_>>(), vec![right]);
    }

    #[test]
    fn test_instant_release_takes_the_hand_velocity() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        let hand = spawn_hand(
            &mut engine,
            Handedness::Right,
            InteractionStyle::ByScript,
            Vec3::ZERO,
        );

        assert!(begin_interaction(&mut engine, hand, item));
        {
            let mut hand = engine.world.get::<&mut Hand>(hand).unwrap();
            hand.linear_velocity = Vec3::new(1., 2., 0.);
            hand.angular_velocity = Vec3::new(0., 0., 3.);
        }
        assert!(end_interaction(&mut engine, hand, item));

        let handle = engine.world.get::<&RigidBody>(item).unwrap().handle;
        let body = &engine.physics_context.rigid_bodies[handle];
        assert_eq!(glam_vec_from_na(body.linvel()), Vec3::new(1., 2., 0.));
        assert_eq!(glam_vec_from_na(body.angvel()), Vec3::new(0., 0., 3.));
    }

    #[test]
    fn test_materials_come_back_when_the_last_hand_lets_go() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        let volume = {
            let mut interactable = engine.world.get::<&mut Interactable>(item).unwrap();
            interactable.two_handed = true;
            interactable.volumes[0]
        };
        engine.physics_context.colliders[volume].set_friction(0.6);
        engine.physics_context.colliders[volume].set_restitution(0.3);
        let left = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::ByScript,
            Vec3::new(-0.03, 0., 0.),
        );
        let right = spawn_hand(
            &mut engine,
            Handedness::Right,
            InteractionStyle::ByScript,
            Vec3::new(0.03, 0., 0.),
        );
        let materials = |engine: &Engine| {
            let collider = &engine.physics_context.colliders[volume];
            (collider.friction(), collider.restitution())
        };

        assert!(begin_interaction(&mut engine, left, item));
        assert_eq!(materials(&engine), (0., 0.));

        // The second hand must not cache the already stripped values
        assert!(begin_interaction(&mut engine, right, item));
        assert_eq!(materials(&engine), (0., 0.));

        assert!(end_interaction(&mut engine, left, item));
        assert_eq!(materials(&engine), (0., 0.));

        assert!(end_interaction(&mut engine, right, item));
        assert_eq!(materials(&engine), (0.6, 0.3));
        assert!(!engine.world.get::<&Interactable>(item).unwrap().is_attached());
    }

    #[test]
    fn test_cannot_pick_up_disabled_interactable() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        let hand = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::ByScript,
            Vec3::ZERO,
        );
        engine
            .world
            .get::<&mut Interactable>(item)
            .unwrap()
            .can_attach = false;

        assert!(!begin_interaction(&mut engine, hand, item));
        assert!(!end_interaction(&mut engine, hand, item));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_switching_objects_lets_go_of_the_first() {
        let mut engine = test_engine();
        let first = spawn_item(&mut engine, Vec3::ZERO);
        let second = spawn_item(&mut engine, Vec3::new(0.5, 0., 0.));
        let hand = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::ByScript,
            Vec3::ZERO,
        );

        assert!(begin_interaction(&mut engine, hand, first));
        assert!(begin_interaction(&mut engine, hand, second));
        assert!(!engine
            .world
            .get::<&Interactable>(first)
            .unwrap()
            .is_attached());
        assert_eq!(
            engine.world.get::<&Hand>(hand).unwrap().currently_interacting,
            Some(second)
        );
    }

    struct RemoteOwner {
        takeover: bool,
        requests: Arc<Mutex<Vec<Entity>>>,
    }

    impl OwnershipAuthority for RemoteOwner {
        fn is_mine(&self, _interactable: Entity) -> bool {
            false
        }

        fn request_ownership(&mut self, interactable: Entity) {
            self.requests.lock().unwrap().push(interactable);
        }

        fn allows_takeover(&self, _interactable: Entity) -> bool {
            self.takeover
        }
    }

    #[test]
    fn test_ownership_is_requested_on_takeover() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        let hand = spawn_hand(
            &mut engine,
            Handedness::Left,
            InteractionStyle::ByScript,
            Vec3::ZERO,
        );

        engine.interaction_context.ownership = Some(Box::new(RemoteOwner {
            takeover: false,
            requests: requests.clone(),
        }));
        assert!(!begin_interaction(&mut engine, hand, item));
        assert!(requests.lock().unwrap().is_empty());

        engine.interaction_context.ownership = Some(Box::new(RemoteOwner {
            takeover: true,
            requests: requests.clone(),
        }));
        assert!(begin_interaction(&mut engine, hand, item));
        assert_eq!(*requests.lock().unwrap(), vec![item]);
    }

    #[test]
    fn test_pickup_pulse() {
        let mut engine = test_engine();
        let item = spawn_item(&mut engine, Vec3::ZERO);
        let hand = spawn_hand(
            &mut engine,
            Handedness::Right,
            InteractionStyle::ByScript,
            Vec3::ZERO,
        );
        let mut device = device_at(Vec3::ZERO, Vec3::ZERO);

        assert!(begin_interaction(&mut engine, hand, item));
        engine.tick(&mut device);
        assert_eq!(device.pulses, vec![(Handedness::Right, PICKUP_PULSE_MICROS)]);
    }
}
