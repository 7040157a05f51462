use glam::Vec3;
use hecs::{Entity, World};
use rapier3d::parry::query::PointQuery;
use rapier3d::prelude::*;

use crate::{
    components::{Pose, RigidBody as RigidBodyComponent},
    util::na_vector_from_glam,
    GraspError, GraspResult,
};

/// Wrapper around the `rapier` simulation. Owns every rigid body and collider in the scene.
#[allow(missing_docs)]
pub struct PhysicsContext {
    pub physics_pipeline: PhysicsPipeline,
    pub gravity: Vector<Real>,
    pub query_pipeline: QueryPipeline,
    pub colliders: ColliderSet,
    pub broad_phase: BroadPhase,
    pub narrow_phase: NarrowPhase,
    pub rigid_bodies: RigidBodySet,
    pub island_manager: IslandManager,
    pub integration_parameters: IntegrationParameters,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
}

impl Default for PhysicsContext {
    fn default() -> Self {
        // No gravity by default. Scenes that want it set it through `EngineBuilder`.
        let gravity = vector![0.0, 0.0, 0.0];
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = 1. / 90.;

        PhysicsContext {
            physics_pipeline: PhysicsPipeline::new(),
            gravity,
            query_pipeline: QueryPipeline::new(),
            colliders: ColliderSet::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            island_manager: IslandManager::new(),
            integration_parameters,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }
}

impl PhysicsContext {
    /// Advance the simulation by one step
    pub fn update(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// The length of one simulation step, in seconds
    pub fn delta_time(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Add a rigid body and its colliders to the simulation
    pub fn create_rigid_body_and_colliders(
        &mut self,
        rigid_body: RigidBody,
        colliders: Vec<Collider>,
    ) -> (RigidBodyComponent, Vec<ColliderHandle>) {
        let rigid_body_handle = self.rigid_bodies.insert(rigid_body);
        let collider_handles = colliders
            .into_iter()
            .map(|collider| {
                self.colliders
                    .insert_with_parent(collider, rigid_body_handle, &mut self.rigid_bodies)
            })
            .collect();

        (RigidBodyComponent::new(rigid_body_handle), collider_handles)
    }

    /// Attach another collider to an existing body
    pub fn add_collider(
        &mut self,
        rigid_body: &RigidBodyComponent,
        collider: Collider,
    ) -> ColliderHandle {
        self.colliders
            .insert_with_parent(collider, rigid_body.handle, &mut self.rigid_bodies)
    }

    /// Remove a rigid body and every collider attached to it
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Get the `rapier` body behind an entity's [`RigidBodyComponent`]
    pub fn get_rigid_body<'a>(
        &'a mut self,
        world: &World,
        entity: Entity,
    ) -> GraspResult<&'a mut RigidBody> {
        let handle = world
            .get::<&RigidBodyComponent>(entity)
            .map_err(|_| GraspError::MissingRigidBody(entity))?
            .handle;
        self.rigid_bodies
            .get_mut(handle)
            .ok_or(GraspError::MissingRigidBody(entity))
    }

    /// Where is this body?
    pub fn pose_of(&self, handle: RigidBodyHandle) -> Option<Pose> {
        self.rigid_bodies
            .get(handle)
            .map(|body| Pose::from_isometry(body.position()))
    }

    /// Where is this collider?
    pub fn collider_pose(&self, handle: ColliderHandle) -> Option<Pose> {
        self.colliders
            .get(handle)
            .map(|collider| Pose::from_isometry(collider.position()))
    }

    /// The non-sensor colliders attached to a body
    pub fn solid_colliders(&self, handle: RigidBodyHandle) -> Vec<ColliderHandle> {
        self.rigid_bodies
            .get(handle)
            .map(|body| {
                body.colliders()
                    .iter()
                    .copied()
                    .filter(|c| self.colliders.get(*c).map_or(false, |c| !c.is_sensor()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every collider currently intersecting the sensor `volume`. Colliders on the same body never
    /// count. Reflects collider positions as of the last step, so a freshly added volume sees
    /// nothing until the simulation has been updated once.
    pub fn overlapping(&self, volume: ColliderHandle) -> Vec<ColliderHandle> {
        self.narrow_phase
            .intersections_with(volume)
            .filter(|(_, _, intersecting)| *intersecting)
            .map(|(a, b, _)| if a == volume { b } else { a })
            .collect()
    }

    /// The distance from `point` to the closest point on any of `volumes`. Zero if the point is
    /// inside one of them.
    pub fn distance_to_volumes(&self, volumes: &[ColliderHandle], point: Vec3) -> Option<f32> {
        let point = Point::from(na_vector_from_glam(point));
        volumes
            .iter()
            .filter_map(|handle| self.colliders.get(*handle))
            .map(|collider| {
                collider
                    .shape()
                    .distance_to_point(collider.position(), &point, true)
            })
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Make a set of colliders solid or not
    pub fn set_sensor(&mut self, volumes: &[ColliderHandle], is_sensor: bool) {
        for handle in volumes {
            if let Some(collider) = self.colliders.get_mut(*handle) {
                collider.set_sensor(is_sensor);
            }
        }
    }
}

/// Make `collider` a trigger volume: a sensor whose intersections with kinematic and fixed bodies
/// are tracked as well as dynamic ones.
pub fn trigger_volume(mut collider: Collider) -> Collider {
    collider.set_sensor(true);
    collider.set_active_collision_types(ActiveCollisionTypes::all());
    collider
}
