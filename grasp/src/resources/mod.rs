pub mod collider_registry;
pub mod haptic_context;
pub mod input_context;
pub mod interaction_context;
pub mod physics_context;
pub mod time;

pub use collider_registry::{ColliderRegistry, RegistryEvent, SubscriptionId};
pub use haptic_context::HapticContext;
pub use input_context::{Button, InputContext, InputDevice, SimulatedInputDevice};
pub use interaction_context::{InteractionContext, InteractionEvent, OwnershipAuthority};
pub use physics_context::PhysicsContext;
pub use time::Time;
