use std::collections::HashSet;

use glam::{Vec2, Vec3};

use crate::components::{Handedness, Pose};

/// A logical controller button. Hands bind their hold and use actions to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Button {
    /// The grip, usually under the middle finger
    Grip,
    /// The trigger, under the index finger
    Trigger,
    /// A or X
    Primary,
    /// B or Y
    Secondary,
    /// The menu button
    Menu,
    /// Clicking the thumbstick
    Thumbstick,
}

const BUTTON_COUNT: usize = 6;

impl Button {
    /// Every button, in a stable order
    pub const ALL: [Button; BUTTON_COUNT] = [
        Button::Grip,
        Button::Trigger,
        Button::Primary,
        Button::Secondary,
        Button::Menu,
        Button::Thumbstick,
    ];

    fn index(self) -> usize {
        match self {
            Button::Grip => 0,
            Button::Trigger => 1,
            Button::Primary => 2,
            Button::Secondary => 3,
            Button::Menu => 4,
            Button::Thumbstick => 5,
        }
    }
}

/// Something that can report controller state, eg. an OpenXR session or a scripted test device.
pub trait InputDevice {
    /// Is the controller for this hand tracked and reporting?
    fn is_ready(&self, handedness: Handedness) -> bool;
    /// The grip pose of the controller
    fn pose(&self, handedness: Handedness) -> Option<Pose>;
    /// Is the button held down?
    fn is_pressed(&self, handedness: Handedness, button: Button) -> bool;
    /// Is a finger resting on the button?
    fn is_touched(&self, handedness: Handedness, button: Button) -> bool;
    /// How far the button is pulled, from 0 to 1. Digital buttons report 0 or 1.
    fn axis(&self, handedness: Handedness, button: Button) -> f32;
    /// The thumbstick position
    fn thumbstick(&self, handedness: Handedness) -> Vec2;
    /// The controller's linear velocity, if the device tracks it
    fn linear_velocity(&self, handedness: Handedness) -> Option<Vec3>;
    /// The controller's angular velocity, if the device tracks it
    fn angular_velocity(&self, handedness: Handedness) -> Option<Vec3>;
    /// Vibrate the controller for `micros` microseconds
    fn apply_haptic_pulse(&mut self, handedness: Handedness, micros: u32);
}

/// The state of one button this frame and the last.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ButtonState {
    pressed: bool,
    pressed_prev: bool,
    touched: bool,
    touched_prev: bool,
    axis: f32,
}

impl ButtonState {
    /// Is the button held down?
    pub fn pressed(&self) -> bool {
        self.pressed
    }

    /// Was the button just pressed this frame?
    pub fn just_pressed(&self) -> bool {
        !self.pressed_prev & self.pressed
    }

    /// Was the button just released this frame?
    pub fn just_released(&self) -> bool {
        self.pressed_prev & !self.pressed
    }

    /// Is a finger resting on the button?
    pub fn touched(&self) -> bool {
        self.touched
    }

    /// Did a finger just land on the button?
    pub fn just_touched(&self) -> bool {
        !self.touched_prev & self.touched
    }

    /// Did a finger just leave the button?
    pub fn just_untouched(&self) -> bool {
        self.touched_prev & !self.touched
    }

    /// How far the button is pulled
    pub fn axis(&self) -> f32 {
        self.axis
    }
}

/// Input state for one controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandInput {
    ready: bool,
    buttons: [ButtonState; BUTTON_COUNT],
    thumbstick: Vec2,
    pose: Pose,
    linear_velocity: Option<Vec3>,
    angular_velocity: Option<Vec3>,
}

impl HandInput {
    /// Is the controller tracked?
    pub fn ready(&self) -> bool {
        self.ready
    }

    /// Get the state of a button
    pub fn button(&self, button: Button) -> &ButtonState {
        &self.buttons[button.index()]
    }

    /// The thumbstick position
    pub fn thumbstick(&self) -> Vec2 {
        self.thumbstick
    }

    /// The grip pose. Holds the last known pose while tracking is lost.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Linear velocity, if the device reports it
    pub fn linear_velocity(&self) -> Option<Vec3> {
        self.linear_velocity
    }

    /// Angular velocity, if the device reports it
    pub fn angular_velocity(&self) -> Option<Vec3> {
        self.angular_velocity
    }

    fn update(&mut self, device: &dyn InputDevice, handedness: Handedness) {
        self.ready = device.is_ready(handedness);
        for button in Button::ALL {
            let state = &mut self.buttons[button.index()];
            state.pressed_prev = state.pressed;
            state.touched_prev = state.touched;
            state.pressed = device.is_pressed(handedness, button);
            state.touched = device.is_touched(handedness, button);
            state.axis = device.axis(handedness, button);
        }
        self.thumbstick = device.thumbstick(handedness);
        if let Some(pose) = device.pose(handedness).filter(Pose::is_finite) {
            self.pose = pose;
        }
        self.linear_velocity = device.linear_velocity(handedness);
        self.angular_velocity = device.angular_velocity(handedness);
    }
}

/// Context that holds input state. Allows systems to query for input edges without having to
/// worry about the device behind them.
///
/// Each button's state is captured once per frame, so an edge like [`ButtonState::just_pressed`]
/// is true for exactly one tick.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    left: HandInput,
    right: HandInput,
}

impl InputContext {
    /// Get the input state for one hand
    pub fn hand(&self, handedness: Handedness) -> &HandInput {
        match handedness {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }

    /// Synchronize the context state with the device. Automatically called by `Engine`
    /// each tick.
    pub fn update(&mut self, device: &dyn InputDevice) {
        self.left.update(device, Handedness::Left);
        self.right.update(device, Handedness::Right);
    }
}

#[derive(Debug, Clone, Default)]
struct SimulatedHand {
    ready: bool,
    pose: Option<Pose>,
    pressed: HashSet<Button>,
    touched: HashSet<Button>,
    thumbstick: Vec2,
    linear_velocity: Option<Vec3>,
    angular_velocity: Option<Vec3>,
}

/// A scriptable [`InputDevice`], for tests and headless runs.
///
/// Every haptic pulse sent to it is recorded in `pulses`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedInputDevice {
    left: SimulatedHand,
    right: SimulatedHand,
    /// Every haptic pulse applied so far, oldest first
    pub pulses: Vec<(Handedness, u32)>,
}

impl SimulatedInputDevice {
    fn hand(&self, handedness: Handedness) -> &SimulatedHand {
        match handedness {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }

    fn hand_mut(&mut self, handedness: Handedness) -> &mut SimulatedHand {
        match handedness {
            Handedness::Left => &mut self.left,
            Handedness::Right => &mut self.right,
        }
    }

    /// Start or stop tracking a controller
    pub fn set_ready(&mut self, handedness: Handedness, ready: bool) {
        self.hand_mut(handedness).ready = ready;
    }

    /// Move a controller
    pub fn set_pose(&mut self, handedness: Handedness, pose: Pose) {
        self.hand_mut(handedness).pose = Some(pose);
    }

    /// Where is the controller?
    pub fn current_pose(&self, handedness: Handedness) -> Option<Pose> {
        self.hand(handedness).pose
    }

    /// Hold a button down. Pressing implies touching.
    pub fn press(&mut self, handedness: Handedness, button: Button) {
        let hand = self.hand_mut(handedness);
        hand.pressed.insert(button);
        hand.touched.insert(button);
    }

    /// Let go of a button, leaving the finger resting on it
    pub fn release(&mut self, handedness: Handedness, button: Button) {
        self.hand_mut(handedness).pressed.remove(&button);
    }

    /// Rest a finger on a button, or lift it off
    pub fn touch(&mut self, handedness: Handedness, button: Button, touched: bool) {
        let hand = self.hand_mut(handedness);
        if touched {
            hand.touched.insert(button);
        } else {
            hand.touched.remove(&button);
            hand.pressed.remove(&button);
        }
    }

    /// Push the thumbstick
    pub fn set_thumbstick(&mut self, handedness: Handedness, value: Vec2) {
        self.hand_mut(handedness).thumbstick = value;
    }

    /// Report tracked velocities for a controller. `None` makes the engine estimate them.
    pub fn set_velocity(
        &mut self,
        handedness: Handedness,
        linear: Option<Vec3>,
        angular: Option<Vec3>,
    ) {
        let hand = self.hand_mut(handedness);
        hand.linear_velocity = linear;
        hand.angular_velocity = angular;
    }
}

impl InputDevice for SimulatedInputDevice {
    fn is_ready(&self, handedness: Handedness) -> bool {
        self.hand(handedness).ready
    }

    fn pose(&self, handedness: Handedness) -> Option<Pose> {
        self.hand(handedness).pose
    }

    fn is_pressed(&self, handedness: Handedness, button: Button) -> bool {
        self.hand(handedness).pressed.contains(&button)
    }

    fn is_touched(&self, handedness: Handedness, button: Button) -> bool {
        self.hand(handedness).touched.contains(&button)
    }

    fn axis(&self, handedness: Handedness, button: Button) -> f32 {
        if self.is_pressed(handedness, button) {
            1.
        } else {
            0.
        }
    }

    fn thumbstick(&self, handedness: Handedness) -> Vec2 {
        self.hand(handedness).thumbstick
    }

    fn linear_velocity(&self, handedness: Handedness) -> Option<Vec3> {
        self.hand(handedness).linear_velocity
    }

    fn angular_velocity(&self, handedness: Handedness) -> Option<Vec3> {
        self.hand(handedness).angular_velocity
    }

    fn apply_haptic_pulse(&mut self, handedness: Handedness, micros: u32) {
        self.pulses.push((handedness, micros));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_last_one_frame() {
        let mut device = SimulatedInputDevice::default();
        let mut input_context = InputContext::default();

        device.press(Handedness::Left, Button::Grip);
        input_context.update(&device);
        let grip = input_context.hand(Handedness::Left).button(Button::Grip);
        assert!(grip.pressed());
        assert!(grip.just_pressed());
        assert!(grip.just_touched());
        assert_eq!(grip.axis(), 1.);

        // Other hand and other buttons are untouched
        assert!(!input_context
            .hand(Handedness::Right)
            .button(Button::Grip)
            .pressed());
        assert!(!input_context
            .hand(Handedness::Left)
            .button(Button::Trigger)
            .pressed());

        input_context.update(&device);
        let grip = input_context.hand(Handedness::Left).button(Button::Grip);
        assert!(grip.pressed());
        assert!(!grip.just_pressed());

        device.release(Handedness::Left, Button::Grip);
        input_context.update(&device);
        let grip = input_context.hand(Handedness::Left).button(Button::Grip);
        assert!(!grip.pressed());
        assert!(grip.just_released());
        assert!(grip.touched());

        device.touch(Handedness::Left, Button::Grip, false);
        input_context.update(&device);
        let grip = input_context.hand(Handedness::Left).button(Button::Grip);
        assert!(grip.just_untouched());
        assert!(!grip.just_released());
    }

    #[test]
    fn test_pose_is_held_when_tracking_is_lost() {
        let mut device = SimulatedInputDevice::default();
        let mut input_context = InputContext::default();
        let pose = Pose::from_translation(Vec3::new(0., 1., 0.));

        device.set_ready(Handedness::Right, true);
        device.set_pose(Handedness::Right, pose);
        input_context.update(&device);
        assert!(input_context.hand(Handedness::Right).ready());

        device.set_pose(
            Handedness::Right,
            Pose::from_translation(Vec3::splat(f32::NAN)),
        );
        input_context.update(&device);
        assert_eq!(input_context.hand(Handedness::Right).pose(), pose);
    }
}
