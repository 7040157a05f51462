use glam::Vec3;
use log::info;

use crate::{
    resources::{
        ColliderRegistry, HapticContext, InputContext, InputDevice, InteractionContext,
        InteractionEvent, OwnershipAuthority, PhysicsContext, Time,
    },
    schedule_functions::{apply_haptic_feedback, physics_step},
    systems::{
        attach::attach_system_inner, hands::hands_system_inner, hover::hover_system_inner,
        interactables::interactables_system_inner,
        physical_hands::physical_hands_system_inner,
    },
    util::na_vector_from_glam,
    GraspResult, InteractionConfig,
};

/// Builder for `Engine`.
#[derive(Default)]
pub struct EngineBuilder {
    config: InteractionConfig,
    gravity: Vec3,
    ownership: Option<Box<dyn OwnershipAuthority>>,
}

impl EngineBuilder {
    /// Create an `EngineBuilder`
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the control law tuning
    pub fn config(mut self, config: InteractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the gravity applied to every dynamic body. Defaults to none.
    pub fn gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Decide who owns what in a networked session
    pub fn ownership(mut self, ownership: impl OwnershipAuthority + 'static) -> Self {
        self.ownership = Some(Box::new(ownership));
        self
    }

    /// Build the `Engine`, checking the config first
    pub fn build(self) -> GraspResult<Engine> {
        self.config.validate()?;

        let mut physics_context = PhysicsContext::default();
        physics_context.gravity = na_vector_from_glam(self.gravity);
        physics_context.integration_parameters.dt = self.config.expected_delta_time;

        let haptic_context = HapticContext::new(self.config.long_haptic_threshold_micros);
        let mut interaction_context = InteractionContext::new(self.config);
        interaction_context.ownership = self.ownership;

        info!(
            "[GRASP_ENGINE] Engine ready, stepping at {:.1}Hz",
            1. / physics_context.delta_time()
        );

        Ok(Engine {
            world: Default::default(),
            physics_context,
            collider_registry: Default::default(),
            input_context: Default::default(),
            haptic_context,
            interaction_context,
            time: Default::default(),
        })
    }
}

/// The grasp engine.
///
/// Owns the world and every resource the systems need. Call [`Engine::tick`] once per physics
/// step with the current input device.
pub struct Engine {
    /// World
    pub world: hecs::World,
    /// Physics context
    pub physics_context: PhysicsContext,
    /// Which collision volumes belong to which interactable
    pub collider_registry: ColliderRegistry,
    /// Input context
    pub input_context: InputContext,
    /// Haptics context
    pub haptic_context: HapticContext,
    /// Config, events and ownership
    pub interaction_context: InteractionContext,
    /// The simulation clock
    pub time: Time,
}

impl Engine {
    /// Create an engine with the default config and no gravity
    pub fn new() -> Self {
        let config = InteractionConfig::default();
        let mut physics_context = PhysicsContext::default();
        physics_context.integration_parameters.dt = config.expected_delta_time;

        Engine {
            world: Default::default(),
            physics_context,
            collider_registry: Default::default(),
            input_context: Default::default(),
            haptic_context: HapticContext::new(config.long_haptic_threshold_micros),
            interaction_context: InteractionContext::new(config),
            time: Default::default(),
        }
    }

    /// Run one step: read the device, update hands and everything they hold, step the physics
    /// simulation and send any haptics back to the device.
    pub fn tick(&mut self, device: &mut dyn InputDevice) {
        self.input_context.update(device);

        hover_system_inner(
            &mut self.world,
            &self.physics_context,
            &self.collider_registry,
            &self.time,
        );
        hands_system_inner(
            &mut self.world,
            &mut self.physics_context,
            &self.input_context,
            &mut self.haptic_context,
            &mut self.interaction_context,
            &self.time,
        );
        attach_system_inner(
            &mut self.world,
            &mut self.physics_context,
            &mut self.interaction_context,
        );
        interactables_system_inner(
            &mut self.world,
            &mut self.physics_context,
            &mut self.collider_registry,
            &mut self.interaction_context,
        );
        physical_hands_system_inner(
            &mut self.world,
            &mut self.physics_context,
            &self.interaction_context,
        );

        physics_step(&mut self.physics_context);

        let delta_time = self.physics_context.delta_time();
        apply_haptic_feedback(device, &mut self.haptic_context, delta_time);
        self.time.advance(delta_time);
    }

    /// Take every event raised since the last call
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        self.interaction_context.drain_events()
    }

    /// The control law tuning
    pub fn config(&self) -> &InteractionConfig {
        &self.interaction_context.config
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resources::SimulatedInputDevice, GraspError};
    use approx::assert_relative_eq;

    #[test]
    fn test_builder_rejects_bad_config() {
        let result = EngineBuilder::new()
            .config(InteractionConfig {
                angular_velocity_divisor: 0.,
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(GraspError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_applies_config() {
        let engine = EngineBuilder::new()
            .config(InteractionConfig {
                expected_delta_time: 1. / 72.,
                long_haptic_threshold_micros: 5000,
                ..Default::default()
            })
            .gravity(Vec3::new(0., -9.81, 0.))
            .build()
            .unwrap();

        assert_relative_eq!(engine.physics_context.delta_time(), 1. / 72.);
        assert_relative_eq!(engine.physics_context.gravity.y, -9.81);
        assert_eq!(engine.haptic_context.long_pulse_threshold_micros, 5000);
    }

    #[test]
    fn test_tick_advances_time() {
        let mut engine = Engine::new();
        let mut device = SimulatedInputDevice::default();
        engine.tick(&mut device);
        engine.tick(&mut device);

        assert_eq!(engine.time.frame, 2);
        assert_relative_eq!(engine.time.elapsed, 2. / 90., epsilon = 1e-6);
    }
}
