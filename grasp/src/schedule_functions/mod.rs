#![allow(missing_docs)]
pub mod apply_haptic_feedback;
pub mod physics_step;

pub use apply_haptic_feedback::apply_haptic_feedback;
pub use physics_step::physics_step;
