use anyhow::Result;
use grasp::{
    behaviours::Item,
    components::{Hand, Interactable, Pose},
    glam::Vec3,
    hecs::Entity,
    rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder},
    systems::{
        attach::{add_attach_joint, add_attach_point},
        hands::add_hand,
        interactables::add_interactable,
    },
    util::na_vector_from_glam,
    Engine,
};

pub const HAND_START: Vec3 = Vec3::new(0., 1., 0.);
const PEG_START: Vec3 = Vec3::new(0.6, 1., 0.);
const SOCKET_POSITION: Vec3 = Vec3::new(0.8, 1., 0.);

/// Everything the script needs to refer back to.
pub struct Scene {
    pub hand: Entity,
    pub ball: Entity,
    pub peg: Entity,
}

/// A right hand with a ball in reach, and a peg resting close enough to a socket to be pulled in.
pub fn build(engine: &mut Engine) -> Result<Scene> {
    let mut hand = Hand::right();
    hand.pose = Pose::from_translation(HAND_START);
    let hand = add_hand(engine, hand, ColliderBuilder::ball(0.05).sensor(true).build())?;

    let ball = spawn_body(
        engine,
        RigidBodyBuilder::dynamic().translation(na_vector_from_glam(HAND_START)),
        0.04,
    );
    add_interactable(engine, ball, Interactable::default(), Item::default())?;

    let peg = spawn_body(
        engine,
        RigidBodyBuilder::dynamic().translation(na_vector_from_glam(PEG_START)),
        0.03,
    );
    add_interactable(engine, peg, Interactable::default(), Item::default())?;
    add_attach_point(engine, peg, ColliderBuilder::ball(0.01).build(), false)?;

    let socket = spawn_body(
        engine,
        RigidBodyBuilder::fixed().translation(na_vector_from_glam(SOCKET_POSITION)),
        0.05,
    );
    add_attach_joint(engine, socket, ColliderBuilder::ball(0.3).build(), 0.3, 0.01)?;

    Ok(Scene { hand, ball, peg })
}

fn spawn_body(engine: &mut Engine, rigid_body: RigidBodyBuilder, radius: f32) -> Entity {
    let (rigid_body, _) = engine.physics_context.create_rigid_body_and_colliders(
        rigid_body.build(),
        vec![ColliderBuilder::ball(radius).build()],
    );
    engine.world.spawn((rigid_body,))
}
