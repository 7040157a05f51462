#![warn(missing_docs)]

//! G'day, and welcome to grasp! 👋
//!
//! grasp lets tracked VR controllers pick things up. Held objects are never teleported into the
//! hand: every step the engine works out the velocity that would bring the object to where the
//! hand wants it and lets the physics engine do the moving, so a held sword still stops when it
//! hits a wall and a thrown ball leaves the hand with the momentum it had.
//!
//! # Getting started
//! Build an [`Engine`], add some hands with [`systems::hands::add_hand`], turn rigid bodies into
//! things that can be held with [`systems::interactables::add_interactable`] and call
//! [`Engine::tick`] once per physics step with something that implements
//! [`resources::InputDevice`]. [`resources::SimulatedInputDevice`] is a scriptable one, handy
//! for tests.
//!
//! ```
//! use grasp::{
//!     behaviours::Item,
//!     components::{Hand, Interactable, Pose},
//!     glam::Vec3,
//!     rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder},
//!     resources::SimulatedInputDevice,
//!     systems::{hands::add_hand, interactables::add_interactable},
//!     Engine,
//! };
//!
//! let mut engine = Engine::new();
//! add_hand(&mut engine, Hand::left(), ColliderBuilder::ball(0.05).sensor(true).build()).unwrap();
//!
//! let ball = engine.world.spawn(());
//! let (rigid_body, _) = engine.physics_context.create_rigid_body_and_colliders(
//!     RigidBodyBuilder::dynamic().build(),
//!     vec![ColliderBuilder::ball(0.05).build()],
//! );
//! engine.world.insert_one(ball, rigid_body).unwrap();
//! add_interactable(&mut engine, ball, Interactable::default(), Item::default()).unwrap();
//!
//! let mut device = SimulatedInputDevice::default();
//! device.set_ready(grasp::components::Handedness::Left, true);
//! device.set_pose(grasp::components::Handedness::Left, Pose::from_translation(Vec3::ZERO));
//! engine.tick(&mut device);
//! ```

pub use config::InteractionConfig;
pub use engine::{Engine, EngineBuilder};
pub use glam;
pub use grasp_error::GraspError;
pub use hecs;
pub use rapier3d;

/// What interactables do when they're held
pub mod behaviours;
/// Components are data attached to hands, interactables and attach points
pub mod components;
mod config;
/// The velocity control law shared by held items, physical hands and attach points
pub mod control_law;
mod engine;
mod grasp_error;
/// Resources are the state shared by every system, eg. physics, input and haptics
pub mod resources;
/// Functions called once per tick that aren't tied to any component
pub mod schedule_functions;
/// Systems are functions called each tick to update the simulation
pub mod systems;
/// Kitchen sink utility functions
pub mod util;

/// grasp result type
pub type GraspResult<T> = std::result::Result<T, GraspError>;
