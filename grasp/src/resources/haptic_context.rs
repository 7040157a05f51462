use crate::components::hand::Handedness;

/// Pulses at least this long are played as a long pulse unless configured otherwise.
pub const DEFAULT_LONG_PULSE_THRESHOLD_MICROS: u32 = 3000;

#[derive(Clone, Debug, Default, PartialEq)]
struct HandHaptics {
    pulse_micros_this_frame: u32,
    long_pulse_remaining: f32,
}

/// Wrapper around controller haptics
///
/// Most devices can't play a single pulse longer than a few milliseconds, so anything at or
/// over `long_pulse_threshold_micros` is turned into a countdown that re-triggers a short pulse
/// every frame until it runs out.
#[derive(Clone, Debug, PartialEq)]
pub struct HapticContext {
    left: HandHaptics,
    right: HandHaptics,
    /// Pulses at least this long (in microseconds) are spread across several frames
    pub long_pulse_threshold_micros: u32,
}

impl Default for HapticContext {
    fn default() -> Self {
        Self {
            left: Default::default(),
            right: Default::default(),
            long_pulse_threshold_micros: DEFAULT_LONG_PULSE_THRESHOLD_MICROS,
        }
    }
}

impl HapticContext {
    /// Create a context with a custom long pulse threshold
    pub fn new(long_pulse_threshold_micros: u32) -> Self {
        Self {
            long_pulse_threshold_micros,
            ..Default::default()
        }
    }

    fn hand(&self, handedness: Handedness) -> &HandHaptics {
        match handedness {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }

    fn hand_mut(&mut self, handedness: Handedness) -> &mut HandHaptics {
        match handedness {
            Handedness::Left => &mut self.left,
            Handedness::Right => &mut self.right,
        }
    }

    /// Request a pulse of `micros` microseconds. Short pulses requested in the same frame don't
    /// stack; the longest one wins.
    pub fn trigger_haptic_pulse(&mut self, handedness: Handedness, micros: u32) {
        let threshold = self.long_pulse_threshold_micros;
        let hand = self.hand_mut(handedness);
        if micros >= threshold {
            let seconds = micros as f32 / 1_000_000.;
            hand.long_pulse_remaining = hand.long_pulse_remaining.max(seconds);
        } else if micros > hand.pulse_micros_this_frame {
            hand.pulse_micros_this_frame = micros;
        }
    }

    /// Is a long pulse still playing on this hand?
    pub fn is_long_pulse_active(&self, handedness: Handedness) -> bool {
        self.hand(handedness).long_pulse_remaining > 0.
    }

    /// Work out the pulse to play on this hand this frame, and tick down any long pulse by
    /// `delta_time` seconds.
    pub(crate) fn take_pulse(&mut self, handedness: Handedness, delta_time: f32) -> Option<u32> {
        let long_pulse_micros = self.long_pulse_threshold_micros.saturating_sub(1);
        let hand = self.hand_mut(handedness);
        let short = std::mem::take(&mut hand.pulse_micros_this_frame);

        if hand.long_pulse_remaining > 0. {
            hand.long_pulse_remaining = (hand.long_pulse_remaining - delta_time).max(0.);
            return Some(long_pulse_micros.max(short));
        }

        (short > 0).then_some(short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_pulses_take_the_longest() {
        let mut haptic_context = HapticContext::default();
        haptic_context.trigger_haptic_pulse(Handedness::Left, 500);
        haptic_context.trigger_haptic_pulse(Handedness::Left, 1500);
        haptic_context.trigger_haptic_pulse(Handedness::Left, 200);

        assert_eq!(haptic_context.take_pulse(Handedness::Left, 0.01), Some(1500));
        assert_eq!(haptic_context.take_pulse(Handedness::Left, 0.01), None);
        assert_eq!(haptic_context.take_pulse(Handedness::Right, 0.01), None);
    }

    #[test]
    fn test_long_pulse_counts_down() {
        let mut haptic_context = HapticContext::default();

        // 30ms at 10ms per frame
        haptic_context.trigger_haptic_pulse(Handedness::Right, 30_000);
        assert!(haptic_context.is_long_pulse_active(Handedness::Right));

        let mut frames = 0;
        while let Some(micros) = haptic_context.take_pulse(Handedness::Right, 0.01) {
            assert_eq!(micros, 2999);
            frames += 1;
            assert!(frames < 10, "long pulse never ended");
        }

        assert!((3..=4).contains(&frames));
        assert!(!haptic_context.is_long_pulse_active(Handedness::Right));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut haptic_context = HapticContext::new(3000);
        haptic_context.trigger_haptic_pulse(Handedness::Left, 2999);
        assert!(!haptic_context.is_long_pulse_active(Handedness::Left));
        haptic_context.trigger_haptic_pulse(Handedness::Left, 3000);
        assert!(haptic_context.is_long_pulse_active(Handedness::Left));
    }
}
