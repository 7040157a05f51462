#![allow(missing_docs)]
pub mod attach;
pub mod grabbing;
pub mod hands;
pub mod hover;
pub mod interactables;
pub mod physical_hands;

pub use attach::attach_system;
pub use hands::hands_system;
pub use hover::hover_system;
pub use interactables::interactables_system;
pub use physical_hands::physical_hands_system;
