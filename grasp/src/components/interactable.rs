use std::collections::HashMap;

use glam::{Quat, Vec3};
use hecs::Entity;
use rapier3d::prelude::{ColliderHandle, ColliderSet, RigidBody as RapierRigidBody, RigidBodyType};

use super::Pose;
use crate::util::{glam_vec_from_na, na_vector_from_glam};

/// The most hands that can hold one interactable at once.
pub const MAX_HOLDERS: usize = 2;

/// Where the hand and the item were, relative to each other, at the moment of pickup.
///
/// Holding on to this is what lets you pick up a sword by its handle and have it stay in your
/// hand by the handle, instead of snapping its origin into your palm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GripAnchor {
    /// The item's pose at pickup
    pub item_pose: Pose,
    /// The hand's pose at pickup
    pub hand_pose: Pose,
    /// Where the hand was, in the item's local space
    pub pickup_point_diff: Vec3,
    /// The item's rotation relative to the hand
    pub pickup_rotation_delta: Quat,
}

impl GripAnchor {
    /// Capture the offset between an item and the hand picking it up
    pub fn capture(item_pose: Pose, hand_pose: Pose) -> Self {
        Self {
            item_pose,
            hand_pose,
            pickup_point_diff: item_pose.inverse_transform_point(hand_pose.translation),
            pickup_rotation_delta: hand_pose.rotation.inverse() * item_pose.rotation,
        }
    }

    /// Where the captured grip point is now, given the item's current pose
    pub fn grip_point(&self, item_pose: &Pose) -> Vec3 {
        item_pose.transform_point(self.pickup_point_diff)
    }

    /// The rotation the item should have to keep the captured offset to the hand
    pub fn target_rotation(&self, hand_pose: &Pose) -> Quat {
        hand_pose.rotation * self.pickup_rotation_delta
    }
}

/// A hand holding an interactable, and the grip it took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Holder {
    /// The hand entity
    pub hand: Entity,
    /// The grip captured at pickup
    pub anchor: GripAnchor,
}

/// The hands holding an interactable. One normally, two if two-handed holding is enabled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holders {
    slots: [Option<Holder>; MAX_HOLDERS],
}

impl Holders {
    /// Add a holder. Returns `false` if every slot is taken or the hand is already holding.
    pub fn insert(&mut self, holder: Holder) -> bool {
        if self.contains(holder.hand) {
            return false;
        }
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                *slot = Some(holder);
                true
            }
            None => false,
        }
    }

    /// Remove a hand. Returns the grip it had, if it was holding.
    pub fn remove(&mut self, hand: Entity) -> Option<Holder> {
        self.slots
            .iter_mut()
            .find(|s| matches!(s, Some(h) if h.hand == hand))
            .and_then(Option::take)
    }

    /// Is this hand holding?
    pub fn contains(&self, hand: Entity) -> bool {
        self.iter().any(|h| h.hand == hand)
    }

    /// Every holder, in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Holder> {
        self.slots.iter().flatten()
    }

    /// Every holding hand, in slot order
    pub fn hands(&self) -> impl Iterator<Item = Entity> + '_ {
        self.iter().map(|h| h.hand)
    }

    /// How many hands are holding?
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Is nobody holding?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A short ring buffer of the velocities an item had while held.
///
/// On release the item is given the mean of these rather than whatever it had on the last
/// step, which is usually noisy.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityHistory {
    linear: Vec<Option<Vec3>>,
    angular: Vec<Option<Vec3>>,
    cursor: usize,
}

impl VelocityHistory {
    /// Keep the last `steps` velocities
    pub fn new(steps: usize) -> Self {
        Self {
            linear: vec![None; steps],
            angular: vec![None; steps],
            cursor: 0,
        }
    }

    /// Forget every sample
    pub fn reset(&mut self) {
        self.linear.iter_mut().for_each(|v| *v = None);
        self.angular.iter_mut().for_each(|v| *v = None);
        self.cursor = 0;
    }

    /// Record this step's velocities
    pub fn push(&mut self, linear: Vec3, angular: Vec3) {
        if self.linear.is_empty() {
            return;
        }
        self.linear[self.cursor] = Some(linear);
        self.angular[self.cursor] = Some(angular);
        self.cursor = (self.cursor + 1) % self.linear.len();
    }

    /// The mean of the recorded linear velocities
    pub fn mean_linear(&self) -> Option<Vec3> {
        mean(&self.linear)
    }

    /// The mean of the recorded angular velocities
    pub fn mean_angular(&self) -> Option<Vec3> {
        mean(&self.angular)
    }

    /// How many steps have been recorded since the last reset, up to the capacity
    pub fn recorded(&self) -> usize {
        self.linear.iter().flatten().count()
    }
}

fn mean(samples: &[Option<Vec3>]) -> Option<Vec3> {
    let (sum, count) = samples
        .iter()
        .flatten()
        .fold((Vec3::ZERO, 0), |(sum, count), v| (sum + *v, count + 1));
    (count > 0).then(|| sum / count as f32)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CachedMaterial {
    friction: f32,
    restitution: f32,
}

/// A component that makes an entity's rigid body something hands can pick up.
///
/// The entity also needs a [`super::RigidBody`] and a [`crate::behaviours::Behaviour`]; use
/// [`crate::systems::interactables::add_interactable`] to get all three and the collider
/// registration right.
#[derive(Debug, Clone)]
pub struct Interactable {
    /// Can a hand begin holding this?
    pub can_attach: bool,
    /// May a second hand join the first instead of taking the item away?
    pub two_handed: bool,
    /// If the hand gets further than this from the item's surface, the item is dropped
    pub drop_distance: f32,
    /// Make a kinematic body dynamic when it's picked up
    pub disable_kinematic_on_attach: bool,
    /// Make the body kinematic when it's released
    pub enable_kinematic_on_detach: bool,
    /// Turn gravity back on when the body is released
    pub enable_gravity_on_detach: bool,
    /// Zero the friction and restitution of the item's volumes while it's held
    pub strip_materials_while_held: bool,
    /// A fixed point, in the item's local space, that is driven to the hand instead of the
    /// point the hand happened to grab
    pub interaction_point: Option<Pose>,
    /// The hands currently holding this
    pub holders: Holders,
    /// The item's collision volumes, as registered with the collider registry
    pub volumes: Vec<ColliderHandle>,
    /// Velocities recorded while held
    pub velocity_history: VelocityHistory,
    pending_velocity: Option<Vec3>,
    pending_angular_velocity: Option<Vec3>,
    cached_damping: Option<(f32, f32)>,
    cached_gravity_scale: Option<f32>,
    cached_materials: HashMap<ColliderHandle, CachedMaterial>,
}

impl Default for Interactable {
    fn default() -> Self {
        Self {
            can_attach: true,
            two_handed: false,
            drop_distance: 1.0,
            disable_kinematic_on_attach: true,
            enable_kinematic_on_detach: false,
            enable_gravity_on_detach: true,
            strip_materials_while_held: true,
            interaction_point: None,
            holders: Default::default(),
            volumes: Vec::new(),
            velocity_history: VelocityHistory::new(3),
            pending_velocity: None,
            pending_angular_velocity: None,
            cached_damping: None,
            cached_gravity_scale: None,
            cached_materials: HashMap::new(),
        }
    }
}

impl Interactable {
    /// Is any hand holding this?
    pub fn is_attached(&self) -> bool {
        !self.holders.is_empty()
    }

    /// Ask for the body to move at `velocity`. Several requests in one step are blended, and the
    /// result is blended with the body's own velocity on the next step rather than replacing it.
    pub fn add_external_velocity(&mut self, velocity: Vec3) {
        self.pending_velocity = Some(match self.pending_velocity {
            Some(pending) => pending.lerp(velocity, 0.5),
            None => velocity,
        });
    }

    /// The angular counterpart of [`Interactable::add_external_velocity`]
    pub fn add_external_angular_velocity(&mut self, angular_velocity: Vec3) {
        self.pending_angular_velocity = Some(match self.pending_angular_velocity {
            Some(pending) => pending.lerp(angular_velocity, 0.5),
            None => angular_velocity,
        });
    }

    /// Drop any external velocity that hasn't been applied yet
    pub fn clear_external_velocities(&mut self) {
        self.pending_velocity = None;
        self.pending_angular_velocity = None;
    }

    /// Blend any pending external velocities into the body.
    pub(crate) fn apply_external_velocities(&mut self, body: &mut RapierRigidBody) {
        if let Some(velocity) = self.pending_velocity.take() {
            let current = glam_vec_from_na(body.linvel());
            body.set_linvel(na_vector_from_glam(current.lerp(velocity, 0.5)), true);
        }
        if let Some(angular_velocity) = self.pending_angular_velocity.take() {
            let current = glam_vec_from_na(body.angvel());
            body.set_angvel(
                na_vector_from_glam(current.lerp(angular_velocity, 0.5)),
                true,
            );
        }
    }

    /// Called when the first hand takes hold.
    pub(crate) fn on_attach(&mut self, body: &mut RapierRigidBody, colliders: &mut ColliderSet) {
        // Engine damping would fight the control law.
        self.cached_damping = Some((body.linear_damping(), body.angular_damping()));
        body.set_linear_damping(0.);
        body.set_angular_damping(0.);

        if self.strip_materials_while_held {
            for handle in &self.volumes {
                if let Some(collider) = colliders.get_mut(*handle) {
                    self.cached_materials.insert(
                        *handle,
                        CachedMaterial {
                            friction: collider.friction(),
                            restitution: collider.restitution(),
                        },
                    );
                    collider.set_friction(0.);
                    collider.set_restitution(0.);
                }
            }
        }

        self.velocity_history.reset();
        self.clear_external_velocities();
        self.suppress_gravity(body);

        if self.disable_kinematic_on_attach && body.is_kinematic() {
            body.set_body_type(RigidBodyType::Dynamic, true);
        }
    }

    /// Called when the last hand lets go.
    pub(crate) fn on_detach(&mut self, body: &mut RapierRigidBody, colliders: &mut ColliderSet) {
        if let Some((linear, angular)) = self.cached_damping.take() {
            body.set_linear_damping(linear);
            body.set_angular_damping(angular);
        }

        for (handle, material) in self.cached_materials.drain() {
            if let Some(collider) = colliders.get_mut(handle) {
                collider.set_friction(material.friction);
                collider.set_restitution(material.restitution);
            }
        }

        if let Some(velocity) = self.velocity_history.mean_linear() {
            body.set_linvel(na_vector_from_glam(velocity), true);
        }
        if let Some(angular_velocity) = self.velocity_history.mean_angular() {
            body.set_angvel(na_vector_from_glam(angular_velocity), true);
        }

        if self.enable_kinematic_on_detach {
            body.set_body_type(RigidBodyType::KinematicPositionBased, true);
        }
        self.restore_gravity(body);
    }

    /// Turn gravity off, remembering what it was. Holding an item and coupling it to an attach
    /// joint both do this; only the first caller's value is kept.
    pub(crate) fn suppress_gravity(&mut self, body: &mut RapierRigidBody) {
        if self.cached_gravity_scale.is_none() {
            self.cached_gravity_scale = Some(body.gravity_scale());
        }
        body.set_gravity_scale(0., true);
    }

    /// Put back the gravity scale from before [`Interactable::suppress_gravity`], or full gravity
    /// if `enable_gravity_on_detach` is set.
    pub(crate) fn restore_gravity(&mut self, body: &mut RapierRigidBody) {
        if let Some(gravity_scale) = self.cached_gravity_scale.take() {
            body.set_gravity_scale(gravity_scale, true);
        }
        if self.enable_gravity_on_detach {
            body.set_gravity_scale(1.0, true);
        }
    }
}
