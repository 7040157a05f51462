pub mod attach;
pub mod hand;
pub mod hover;
pub mod info;
pub mod interactable;
pub mod physical_hand;
pub mod pose;
pub mod rigid_body;
pub mod trigger_volume;

pub use attach::{AttachJoint, AttachPoint};
pub use hand::{ControllerVisibility, Hand, HandState, Handedness, InteractionStyle, PoseHistory};
pub use hover::{HoverEntry, HoverMap};
pub use info::Info;
pub use interactable::{GripAnchor, Holder, Holders, Interactable, VelocityHistory};
pub use physical_hand::PhysicalHand;
pub use pose::Pose;
pub use rigid_body::RigidBody;
pub use trigger_volume::TriggerVolume;
