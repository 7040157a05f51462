use std::collections::VecDeque;

use glam::{Quat, Vec3};
use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::{HoverMap, Pose};
use crate::resources::Button;

/// A component that represents the "side" or "handedness" that an entity is on
/// Used by components such as `Hand` to identify which controller they should map to
#[derive(Debug, PartialEq, Clone, Copy, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Handedness {
    /// Left hand side
    Left,
    /// Right hand side
    Right,
}

/// How the hold button maps to picking things up.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Default, Deserialize, Serialize)]
pub enum InteractionStyle {
    /// Hold the button to hold the object, let go to drop it.
    #[default]
    Hold,
    /// Press once to pick up, press again to drop.
    Toggle,
    /// No automatic transitions. Call `begin_interaction` and `end_interaction` yourself.
    ByScript,
}

/// Where a hand is in its grasp state machine.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Default)]
pub enum HandState {
    /// The input device hasn't reported that it's ready yet.
    #[default]
    Uninitialized,
    /// Not gripping anything.
    Idle,
    /// Hold style: the button is down and nothing is being held.
    GripDownNotInteracting,
    /// Hold style: the button is down and something is being held.
    GripDownInteracting,
    /// Toggle style: toggled on and holding something.
    GripToggleOnInteracting,
    /// Toggle style: toggled on with an empty hand. Only reachable with a physical hand.
    GripToggleOnNotInteracting,
}

/// How the controller model should be drawn.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Default)]
pub enum ControllerVisibility {
    /// Drawn normally
    #[default]
    Visible,
    /// Drawn translucent, eg. while the object in hand is the focus
    Ghost,
    /// Not drawn at all
    Invisible,
}

/// A component that's added to an entity to represent a "hand" presence.
/// Used to give the player a feeling of immersion by allowing them to grab objects in the world
/// Requires `hover_system` and `hands_system`
#[derive(Debug, Clone)]
pub struct Hand {
    /// Which side is this hand on?
    pub handedness: Handedness,
    /// The button that picks things up
    pub hold_button: Button,
    /// The button forwarded to the held interactable as "use"
    pub use_button: Button,
    /// How the hold button maps to picking things up
    pub interaction_style: InteractionStyle,
    /// Where this hand is in its grasp state machine
    pub state: HandState,
    /// Have we grabbed something?
    pub currently_interacting: Option<Entity>,
    /// Everything the hand's trigger volume is touching
    pub hovering: HoverMap,
    /// The pose of the hand this frame
    pub pose: Pose,
    /// Recent poses, used to estimate velocity when the device doesn't report it
    pub pose_history: PoseHistory,
    /// The linear velocity of the hand this frame. An item let go before it has been driven for
    /// a single step leaves with this.
    pub linear_velocity: Vec3,
    /// The angular velocity of the hand this frame
    pub angular_velocity: Vec3,
    /// A dynamic stand-in body for this hand, if it has one
    pub physical_hand: Option<Entity>,
    /// How the controller model should be drawn
    pub visibility: ControllerVisibility,
    /// Should the physical hand be solid this frame?
    pub physical_hand_active: bool,
}

impl Hand {
    /// Create a hand with the default bindings: grip to hold, trigger to use
    pub fn new(handedness: Handedness) -> Hand {
        Hand {
            handedness,
            hold_button: Button::Grip,
            use_button: Button::Trigger,
            interaction_style: InteractionStyle::Hold,
            state: HandState::Uninitialized,
            currently_interacting: None,
            hovering: Default::default(),
            pose: Default::default(),
            pose_history: PoseHistory::new(10),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            physical_hand: None,
            visibility: ControllerVisibility::Invisible,
            physical_hand_active: false,
        }
    }

    /// Shortcut helper to create a Left hand
    pub fn left() -> Hand {
        Hand::new(Handedness::Left)
    }

    /// Shortcut helper to create a right hand
    pub fn right() -> Hand {
        Hand::new(Handedness::Right)
    }

    /// Is this hand holding something?
    pub fn is_interacting(&self) -> bool {
        self.currently_interacting.is_some()
    }

    /// Recompute the presentation side effects from the state machine. These are outputs only:
    /// nothing in the pickup logic reads them back.
    pub fn update_presentation(&mut self) {
        let (visibility, physical_hand_active) = presentation(
            self.state,
            self.is_interacting(),
            self.physical_hand.is_some(),
        );
        self.visibility = visibility;
        self.physical_hand_active = physical_hand_active;
    }
}

/// Derive how a hand is drawn and whether its physical stand-in is solid.
///
/// An empty fist can push things around, but a hand holding something must not shove the
/// object it's holding, so the stand-in goes non-solid while interacting.
pub fn presentation(
    state: HandState,
    is_interacting: bool,
    has_physical_hand: bool,
) -> (ControllerVisibility, bool) {
    match state {
        HandState::Uninitialized => (ControllerVisibility::Invisible, false),
        _ if is_interacting => (ControllerVisibility::Ghost, false),
        HandState::GripDownNotInteracting | HandState::GripToggleOnNotInteracting => {
            (ControllerVisibility::Visible, has_physical_hand)
        }
        _ => (ControllerVisibility::Visible, false),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PoseSample {
    time: f64,
    pose: Pose,
}

/// A rolling window of recent hand poses.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseHistory {
    samples: VecDeque<PoseSample>,
    capacity: usize,
}

impl PoseHistory {
    /// Keep the last `capacity` poses
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(2),
        }
    }

    /// Record the pose at `time` (in seconds)
    pub fn push(&mut self, time: f64, pose: Pose) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(PoseSample { time, pose });
    }

    /// Average linear velocity across the window
    pub fn linear_velocity(&self) -> Option<Vec3> {
        let (first, last, elapsed) = self.span()?;
        Some((last.pose.translation - first.pose.translation) / elapsed)
    }

    /// Average angular velocity across the window, in radians per second
    pub fn angular_velocity(&self) -> Option<Vec3> {
        let (first, last, elapsed) = self.span()?;
        let mut delta: Quat = last.pose.rotation * first.pose.rotation.inverse();
        if delta.w < 0. {
            delta = -delta;
        }
        let (axis, angle) = delta.to_axis_angle();
        let velocity = axis * angle / elapsed;
        velocity.is_finite().then_some(velocity)
    }

    /// Forget every sample
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    fn span(&self) -> Option<(&PoseSample, &PoseSample, f32)> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let elapsed = (last.time - first.time) as f32;
        (elapsed > 0.).then_some((first, last, elapsed))
    }
}
