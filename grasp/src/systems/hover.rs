use hecs::World;
use log::trace;

use crate::{
    components::{Hand, Interactable, TriggerVolume},
    resources::{ColliderRegistry, PhysicsContext, Time},
    Engine,
};

/// Keep every hand's hover map in step with what its trigger volume is touching.
///
/// Overlaps are read from collider positions as of the last physics step, so a hand that moved
/// this tick is seen where it was.
pub fn hover_system(engine: &mut Engine) {
    hover_system_inner(
        &mut engine.world,
        &engine.physics_context,
        &engine.collider_registry,
        &engine.time,
    )
}

pub(crate) fn hover_system_inner(
    world: &mut World,
    physics_context: &PhysicsContext,
    collider_registry: &ColliderRegistry,
    time: &Time,
) {
    let hands = world
        .query::<(&Hand, &TriggerVolume)>()
        .iter()
        .map(|(entity, (_, trigger))| (entity, trigger.handle, trigger.overlapping.clone()))
        .collect::<Vec<_>>();

    for (hand_entity, trigger, previous) in hands {
        let current = physics_context.overlapping(trigger);

        let entered = current
            .iter()
            .filter_map(|volume| {
                let interactable = collider_registry.resolve(*volume)?;
                let enabled = world
                    .get::<&Interactable>(interactable)
                    .map(|i| i.can_attach)
                    .unwrap_or(false);
                enabled.then_some((interactable, *volume))
            })
            .collect::<Vec<_>>();

        let Ok((hand, trigger)) =
            world.query_one_mut::<(&mut Hand, &mut TriggerVolume)>(hand_entity)
        else {
            continue;
        };

        for volume in previous.iter().filter(|v| !current.contains(v)) {
            match collider_registry.resolve(*volume) {
                Some(interactable) => {
                    if hand.hovering.exit(interactable, *volume) {
                        trace!("[GRASP_HOVER] {hand_entity:?} stopped hovering {interactable:?}");
                    }
                }
                None => hand.hovering.remove_volume(*volume),
            }
        }

        // A volume that's still touching but whose interactable was disabled or re-registered
        // no longer counts.
        for volume in current.iter() {
            let still_valid = entered.iter().any(|(_, v)| v == volume);
            if !still_valid {
                hand.hovering.remove_volume(*volume);
            }
        }

        for (interactable, volume) in entered {
            if hand.hovering.enter(interactable, volume, time.elapsed) {
                trace!("[GRASP_HOVER] {hand_entity:?} started hovering {interactable:?}");
            }
        }

        trigger.overlapping = current;
    }
}
