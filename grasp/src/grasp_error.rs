use hecs::Entity;
use thiserror::Error;

/// Errors raised while setting up hands, interactables and attach points.
///
/// Once a scene is running the systems never return these: a problem found mid-simulation is
/// handled where it is detected (dropping an object, destroying a runaway body) and is only
/// observable through the world state and `InteractionEvent`s.
#[derive(Error, Debug)]
pub enum GraspError {
    #[error("Entity {0:?} has no rigid body, so it can't be driven by a hand")]
    MissingRigidBody(Entity),
    #[error("Entity {0:?} has no collision volumes, so nothing could ever touch it")]
    NoCollisionVolumes(Entity),
    #[error("The trigger volume for a hand or attach joint must be a sensor")]
    TriggerNotSensor,
    #[error("Entity {0:?} is not an interactable")]
    NotInteractable(Entity),
    #[error("The interaction config is invalid: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    NoSuchEntity(#[from] hecs::NoSuchEntity),
    #[error(transparent)]
    Component(#[from] hecs::ComponentError),
}
