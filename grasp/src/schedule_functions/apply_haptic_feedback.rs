use crate::{
    components::Handedness,
    resources::{HapticContext, InputDevice},
};

/// Send this frame's haptic pulses to the device, and tick down any long pulses by `delta_time`.
///
/// Basic usage:
/// ```ignore
/// fn tick(...) {
///     apply_haptic_feedback(device, &mut haptic_context, delta_time)
/// }
/// ```
pub fn apply_haptic_feedback(
    device: &mut dyn InputDevice,
    haptic_context: &mut HapticContext,
    delta_time: f32,
) {
    for handedness in [Handedness::Left, Handedness::Right] {
        if let Some(micros) = haptic_context.take_pulse(handedness, delta_time) {
            device.apply_haptic_pulse(handedness, micros);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::SimulatedInputDevice;

    #[test]
    pub fn test_apply_haptic_feedback() {
        let mut device = SimulatedInputDevice::default();
        let mut haptic_context = HapticContext::default();

        haptic_context.trigger_haptic_pulse(Handedness::Left, 1000);
        haptic_context.trigger_haptic_pulse(Handedness::Right, 10_000);
        apply_haptic_feedback(&mut device, &mut haptic_context, 0.004);
        assert_eq!(
            device.pulses,
            vec![(Handedness::Left, 1000), (Handedness::Right, 2999)]
        );

        // The long pulse keeps going, the short one doesn't
        apply_haptic_feedback(&mut device, &mut haptic_context, 0.004);
        assert_eq!(device.pulses.len(), 3);
        apply_haptic_feedback(&mut device, &mut haptic_context, 0.004);
        apply_haptic_feedback(&mut device, &mut haptic_context, 0.004);
        assert_eq!(device.pulses.len(), 4);
    }
}
