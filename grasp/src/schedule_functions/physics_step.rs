use crate::resources::PhysicsContext;

/// Step the simulation once. Held objects, attach points and physical hands have all had their
/// velocities set by the time this runs.
pub fn physics_step(physics_context: &mut PhysicsContext) {
    physics_context.update();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rapier3d::prelude::{vector, ColliderBuilder, RigidBodyBuilder};

    #[test]
    fn test_physics_step_integrates_velocity() {
        let mut physics_context = PhysicsContext::default();
        let (rigid_body, _) = physics_context.create_rigid_body_and_colliders(
            RigidBodyBuilder::dynamic()
                .linvel(vector![9., 0., 0.])
                .build(),
            vec![ColliderBuilder::ball(0.1).build()],
        );

        physics_step(&mut physics_context);
        let pose = physics_context.pose_of(rigid_body.handle).unwrap();
        assert_relative_eq!(pose.translation.x, 0.1, epsilon = 1e-5);
    }
}
