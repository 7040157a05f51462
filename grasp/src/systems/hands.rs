use glam::Vec3;
use hecs::{Entity, World};
use log::{debug, error, info};
use rapier3d::prelude::{Collider, RigidBodyBuilder};

use crate::{
    behaviours::{Behaviour, HoverResponse},
    components::{Hand, HandState, Info, InteractionStyle, PoseHistory, RigidBody, TriggerVolume},
    resources::{
        input_context::ButtonState, physics_context::trigger_volume, HapticContext, InputContext,
        InteractionContext, PhysicsContext, Time,
    },
    systems::{
        grabbing::{begin_interaction_inner, end_interaction_inner},
        interactables::with_behaviour,
    },
    Engine, GraspError, GraspResult,
};

/// Add a hand to the world. `trigger` is the volume used to find things to pick up, and must be
/// a sensor.
///
/// The hand gets a kinematic body that follows the controller, and stays `Uninitialized` until
/// its controller reports ready.
pub fn add_hand(engine: &mut Engine, mut hand: Hand, trigger: Collider) -> GraspResult<Entity> {
    if !trigger.is_sensor() {
        error!(
            "[GRASP_HANDS] The trigger volume for the {:?} hand is not a sensor",
            hand.handedness
        );
        return Err(GraspError::TriggerNotSensor);
    }

    hand.pose_history = PoseHistory::new(engine.interaction_context.config.pose_history_steps);
    let rigid_body = RigidBodyBuilder::kinematic_position_based()
        .position(hand.pose.position())
        .build();
    let (rigid_body, colliders) = engine
        .physics_context
        .create_rigid_body_and_colliders(rigid_body, vec![trigger_volume(trigger)]);

    let name = format!("{:?} Hand", hand.handedness);
    let trigger = TriggerVolume::new(colliders[0]);
    let entity = engine
        .world
        .spawn((hand, rigid_body, trigger, Info::new(name)));

    info!("[GRASP_HANDS] Added hand {entity:?}");
    Ok(entity)
}

/// Remove a hand, making it let go of whatever it's holding first.
pub fn remove_hand(engine: &mut Engine, hand: Entity) -> GraspResult<()> {
    let (current, handle) = {
        let mut query = engine.world.query_one::<(&Hand, &RigidBody)>(hand)?;
        let (h, rigid_body) = query.get().ok_or(GraspError::MissingRigidBody(hand))?;
        (h.currently_interacting, rigid_body.handle)
    };

    if let Some(interactable) = current {
        end_interaction_inner(
            hand,
            interactable,
            &mut engine.world,
            &mut engine.physics_context,
            &mut engine.interaction_context,
        );
    }

    engine.physics_context.remove_rigid_body(handle);
    engine.world.despawn(hand)?;
    info!("[GRASP_HANDS] Removed hand {hand:?}");
    Ok(())
}

/// Sync each hand with its controller and run its grasp state machine.
pub fn hands_system(engine: &mut Engine) {
    hands_system_inner(
        &mut engine.world,
        &mut engine.physics_context,
        &engine.input_context,
        &mut engine.haptic_context,
        &mut engine.interaction_context,
        &engine.time,
    )
}

pub(crate) fn hands_system_inner(
    world: &mut World,
    physics_context: &mut PhysicsContext,
    input_context: &InputContext,
    haptic_context: &mut HapticContext,
    interaction_context: &mut InteractionContext,
    time: &Time,
) {
    let hands = world
        .query::<(&Hand, &RigidBody)>()
        .iter()
        .map(|(entity, (_, rigid_body))| (entity, rigid_body.handle))
        .collect::<Vec<_>>();

    for (hand_entity, handle) in hands {
        let Ok(handedness) = world.get::<&Hand>(hand_entity).map(|h| h.handedness) else {
            continue;
        };
        let input = input_context.hand(handedness);
        if !input.ready() {
            continue;
        }

        let pose = input.pose();
        let (style, hold_button, use_button) = {
            let Ok(mut hand) = world.get::<&mut Hand>(hand_entity) else {
                continue;
            };
            if hand.state == HandState::Uninitialized {
                debug!("[GRASP_HANDS] {handedness:?} hand is ready");
                hand.state = HandState::Idle;
            }

            hand.pose = pose;
            hand.pose_history.push(time.elapsed, pose);
            hand.linear_velocity = input
                .linear_velocity()
                .or_else(|| hand.pose_history.linear_velocity())
                .unwrap_or(Vec3::ZERO);
            hand.angular_velocity = input
                .angular_velocity()
                .or_else(|| hand.pose_history.angular_velocity())
                .unwrap_or(Vec3::ZERO);

            (hand.interaction_style, hand.hold_button, hand.use_button)
        };

        if let Some(body) = physics_context.rigid_bodies.get_mut(handle) {
            body.set_next_kinematic_position(pose.position());
        }

        let hold = *input.button(hold_button);
        let mut contexts = Contexts {
            world: &mut *world,
            physics_context: &mut *physics_context,
            haptic_context: &mut *haptic_context,
            interaction_context: &mut *interaction_context,
        };

        match style {
            InteractionStyle::Hold => {
                if hold.just_pressed() && !contexts.is_interacting(hand_entity) {
                    let picked_up = contexts.pickup_closest(hand_entity);
                    contexts.set_state(
                        hand_entity,
                        if picked_up {
                            HandState::GripDownInteracting
                        } else {
                            HandState::GripDownNotInteracting
                        },
                    );
                } else if hold.just_released() {
                    contexts.release(hand_entity);
                    contexts.set_state(hand_entity, HandState::Idle);
                }
            }
            InteractionStyle::Toggle => {
                if hold.just_pressed() {
                    let toggled_on = matches!(
                        contexts.state(hand_entity),
                        Some(HandState::GripToggleOnInteracting)
                            | Some(HandState::GripToggleOnNotInteracting)
                    );
                    if toggled_on || contexts.is_interacting(hand_entity) {
                        contexts.release(hand_entity);
                        contexts.set_state(hand_entity, HandState::Idle);
                    } else if contexts.pickup_closest(hand_entity) {
                        contexts.set_state(hand_entity, HandState::GripToggleOnInteracting);
                    } else if contexts.has_physical_hand(hand_entity) {
                        contexts.set_state(hand_entity, HandState::GripToggleOnNotInteracting);
                    }
                }
            }
            InteractionStyle::ByScript => {}
        }

        contexts.interacting_tick(hand_entity, input.button(use_button));
        contexts.hovering_tick(hand_entity, style, time.elapsed);

        if let Ok(mut hand) = world.get::<&mut Hand>(hand_entity) {
            hand.update_presentation();
        }
    }
}

/// Everything a hand needs to change what it's holding.
struct Contexts<'a> {
    world: &'a mut World,
    physics_context: &'a mut PhysicsContext,
    haptic_context: &'a mut HapticContext,
    interaction_context: &'a mut InteractionContext,
}

impl<'a> Contexts<'a> {
    fn state(&self, hand: Entity) -> Option<HandState> {
        self.world.get::<&Hand>(hand).ok().map(|h| h.state)
    }

    fn set_state(&mut self, hand: Entity, state: HandState) {
        if let Ok(mut hand) = self.world.get::<&mut Hand>(hand) {
            hand.state = state;
        }
    }

    fn is_interacting(&self, hand: Entity) -> bool {
        self.current(hand).is_some()
    }

    fn has_physical_hand(&self, hand: Entity) -> bool {
        self.world
            .get::<&Hand>(hand)
            .map(|h| h.physical_hand.is_some())
            .unwrap_or(false)
    }

    fn current(&self, hand: Entity) -> Option<Entity> {
        self.world
            .get::<&Hand>(hand)
            .ok()
            .and_then(|h| h.currently_interacting)
    }

    fn begin(&mut self, hand: Entity, interactable: Entity) -> bool {
        begin_interaction_inner(
            hand,
            interactable,
            self.world,
            self.physics_context,
            self.haptic_context,
            self.interaction_context,
        )
    }

    fn release(&mut self, hand: Entity) {
        if let Some(interactable) = self.current(hand) {
            end_interaction_inner(
                hand,
                interactable,
                self.world,
                self.physics_context,
                self.interaction_context,
            );
        }
    }

    fn pickup_closest(&mut self, hand: Entity) -> bool {
        match closest_hovered(self.world, self.physics_context, hand) {
            Some(interactable) => self.begin(hand, interactable),
            None => false,
        }
    }

    /// Forward the per-frame tick and any use button edges to the held interactable.
    fn interacting_tick(&mut self, hand: Entity, use_button: &ButtonState) {
        let Some(interactable) = self.current(hand) else {
            return;
        };

        with_behaviour(
            self.world,
            self.physics_context,
            self.interaction_context,
            interactable,
            |behaviour, context| behaviour.interacting_update(hand, context),
        );

        let Ok(mut behaviour) = self.world.get::<&mut Behaviour>(interactable) else {
            return;
        };
        if use_button.just_pressed() {
            behaviour.use_button_down(hand);
        }
        if use_button.just_released() {
            behaviour.use_button_up(hand);
        }
    }

    /// Let everything an idle hand is hovering over know how long it's been hovered. Hands that
    /// aren't driven by the hold button pick up anything that asks to be.
    fn hovering_tick(&mut self, hand: Entity, style: InteractionStyle, now: f64) {
        let hovered = {
            let Ok(h) = self.world.get::<&Hand>(hand) else {
                return;
            };
            if h.state != HandState::Idle || h.is_interacting() {
                return;
            }
            h.hovering
                .iter()
                .filter_map(|entry| Some((entry.interactable, entry.first_touch()?)))
                .collect::<Vec<_>>()
        };

        for (interactable, first_touch) in hovered {
            let hover_time = (now - first_touch) as f32;
            let response = self
                .world
                .get::<&mut Behaviour>(interactable)
                .map(|mut b| b.hovering_update(hand, hover_time))
                .unwrap_or_default();

            if response != HoverResponse::Pickup || style == InteractionStyle::Hold {
                continue;
            }
            if self.begin(hand, interactable) {
                if style == InteractionStyle::Toggle {
                    self.set_state(hand, HandState::GripToggleOnInteracting);
                }
                break;
            }
        }
    }
}

/// The hovered interactable nearest the hand. Ties go to whichever was hovered first.
fn closest_hovered(
    world: &World,
    physics_context: &PhysicsContext,
    hand: Entity,
) -> Option<Entity> {
    let hand = world.get::<&Hand>(hand).ok()?;
    let position = hand.pose.translation;

    let mut closest: Option<(Entity, f32)> = None;
    for interactable in hand.hovering.interactables() {
        let Ok(handle) = world.get::<&RigidBody>(interactable).map(|r| r.handle) else {
            continue;
        };
        let Some(pose) = physics_context.pose_of(handle) else {
            continue;
        };

        let distance = pose.translation.distance(position);
        if closest.map_or(true, |(_, d)| distance < d) {
            closest = Some((interactable, distance));
        }
    }

    closest.map(|(interactable, _)| interactable)
}
