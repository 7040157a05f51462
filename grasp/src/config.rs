use serde::{Deserialize, Serialize};

use crate::{GraspError, GraspResult};

/// Tuning for the velocity control law and the bookkeeping around it.
///
/// The gains are empirical: they were tuned against a 90Hz physics tick and unit-mass bodies.
/// Different masses or solvers will want different values, which is why none of them are
/// hardcoded. Every field has a sensible default, so a partial JSON document is fine:
///
/// ```
/// let config: grasp::InteractionConfig =
///     serde_json::from_str(r#"{ "max_velocity_change": 5.0 }"#).unwrap();
/// assert_eq!(config.max_velocity_change, 5.0);
/// assert_eq!(config.velocity_history_steps, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// The physics tick the gains were tuned for, in seconds.
    pub expected_delta_time: f32,
    /// Gain applied to `position_delta / dt` when computing a held item's target velocity.
    pub velocity_magic: f32,
    /// Gain applied to the angular target of a held item.
    pub angular_velocity_magic: f32,
    /// The angular target is `axis * angle_in_degrees / (dt * angular_velocity_divisor)`.
    pub angular_velocity_divisor: f32,
    /// The most a body's linear velocity may change in a single step.
    pub max_velocity_change: f32,
    /// The most a body's angular velocity may change in a single step.
    pub max_angular_velocity_change: f32,
    /// Spring gain used by attach points when pulling an item toward a joint.
    pub attach_velocity_magic: f32,
    /// How many steps of velocity history are averaged when an item is released.
    pub velocity_history_steps: usize,
    /// How many hand poses are kept to estimate the hand's velocity.
    pub pose_history_steps: usize,
    /// Any interactable further than this from the origin on any axis is destroyed.
    pub world_bound: f32,
    /// Haptic pulses at least this long (in microseconds) are played as a long pulse,
    /// spread over several frames.
    pub long_haptic_threshold_micros: u32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            expected_delta_time: 1. / 90.,
            velocity_magic: 1.0,
            angular_velocity_magic: 1.0,
            angular_velocity_divisor: 100.0,
            max_velocity_change: 10.0,
            max_angular_velocity_change: 20.0,
            attach_velocity_magic: 3000.0,
            velocity_history_steps: 3,
            pose_history_steps: 10,
            world_bound: 10_000.0,
            long_haptic_threshold_micros: 3000,
        }
    }
}

impl InteractionConfig {
    /// Check that the config won't produce NaNs or a control law that can never move anything.
    pub fn validate(&self) -> GraspResult<()> {
        let positive = [
            ("expected_delta_time", self.expected_delta_time),
            ("velocity_magic", self.velocity_magic),
            ("angular_velocity_magic", self.angular_velocity_magic),
            ("angular_velocity_divisor", self.angular_velocity_divisor),
            ("max_velocity_change", self.max_velocity_change),
            ("max_angular_velocity_change", self.max_angular_velocity_change),
            ("attach_velocity_magic", self.attach_velocity_magic),
            ("world_bound", self.world_bound),
        ];

        for (name, value) in positive {
            if !value.is_finite() || value <= 0. {
                return Err(GraspError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        if self.pose_history_steps < 2 {
            return Err(GraspError::InvalidConfig(
                "pose_history_steps must be at least 2 to estimate a velocity".to_string(),
            ));
        }

        if self.long_haptic_threshold_micros == 0 {
            return Err(GraspError::InvalidConfig(
                "long_haptic_threshold_micros must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// How far the current tick is from the one the gains were tuned for. Every gain in the control
    /// law, linear, angular and attach alike, is multiplied by this.
    pub fn time_scale(&self, delta_time: f32) -> f32 {
        delta_time / self.expected_delta_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(InteractionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_values() {
        let config = InteractionConfig {
            max_velocity_change: 0.,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GraspError::InvalidConfig(_))
        ));

        let config = InteractionConfig {
            expected_delta_time: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = InteractionConfig {
            pose_history_steps: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: InteractionConfig =
            serde_json::from_str(r#"{ "world_bound": 50.0, "velocity_history_steps": 5 }"#)
                .unwrap();
        assert_eq!(config.world_bound, 50.0);
        assert_eq!(config.velocity_history_steps, 5);
        assert_eq!(config.max_angular_velocity_change, 20.0);
    }
}
