mod scene;

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use grasp::{
    components::{Handedness, Pose, RigidBody},
    glam::Vec3,
    resources::{Button, InteractionEvent, SimulatedInputDevice},
    util::glam_vec_from_na,
    EngineBuilder, InteractionConfig,
};
use log::{debug, info};

use crate::scene::HAND_START;

const GRAB_TICK: u64 = 10;
const THROW_TICK: u64 = 40;
const THROW_VELOCITY: Vec3 = Vec3::new(0., 0.5, -2.);

/// Runs a scripted hand through a pickup, a throw and a magnetic attach, headless.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// A JSON file with control law tuning. Missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// How many physics steps to run
    #[arg(long, default_value_t = 270)]
    ticks: u64,
    /// Gravity along -Y, in m/s²
    #[arg(long, default_value_t = 0.)]
    gravity: f32,
    /// Sleep between steps so the run takes as long as it would on a headset
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => InteractionConfig::default(),
    };

    let should_quit = Arc::new(AtomicBool::new(false));
    {
        let should_quit = should_quit.clone();
        ctrlc::set_handler(move || should_quit.store(true, Ordering::Relaxed))
            .context("Unable to set Ctrl-C handler")?;
    }

    let mut engine = EngineBuilder::new()
        .config(config)
        .gravity(Vec3::new(0., -args.gravity, 0.))
        .build()?;
    let scene = scene::build(&mut engine)?;

    let mut device = SimulatedInputDevice::default();
    device.set_ready(Handedness::Right, true);
    let mut hand_position = HAND_START;
    let delta_time = engine.physics_context.delta_time();

    for tick in 0..args.ticks {
        if should_quit.load(Ordering::Relaxed) {
            info!("[GRASP_SANDBOX] Interrupted after {tick} ticks");
            break;
        }

        if tick == GRAB_TICK {
            device.press(Handedness::Right, Button::Grip);
        }
        if (GRAB_TICK..THROW_TICK).contains(&tick) {
            hand_position += THROW_VELOCITY * delta_time;
        }
        if tick == THROW_TICK {
            device.release(Handedness::Right, Button::Grip);
        }
        device.set_pose(Handedness::Right, Pose::from_translation(hand_position));

        engine.tick(&mut device);

        for event in engine.drain_events() {
            log_event(tick, &event);
        }

        if args.realtime {
            std::thread::sleep(Duration::from_secs_f32(delta_time));
        }
    }

    for (name, entity) in [("Ball", scene.ball), ("Peg", scene.peg)] {
        let Ok(handle) = engine.world.get::<&RigidBody>(entity).map(|r| r.handle) else {
            info!("[GRASP_SANDBOX] {name} no longer exists");
            continue;
        };
        let body = &engine.physics_context.rigid_bodies[handle];
        info!(
            "[GRASP_SANDBOX] {name} finished at {:?} moving at {:?}",
            glam_vec_from_na(body.translation()),
            glam_vec_from_na(body.linvel())
        );
    }
    info!(
        "[GRASP_SANDBOX] {} haptic pulses sent, hand {:?} ran for {:.2}s",
        device.pulses.len(),
        scene.hand,
        engine.time.elapsed
    );

    Ok(())
}

fn load_config(path: &Path) -> Result<InteractionConfig> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Unable to open config file {}", path.display()))?;
    let config: InteractionConfig = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Unable to parse config file {}", path.display()))?;
    debug!("[GRASP_SANDBOX] Loaded config {config:?}");
    Ok(config)
}

fn log_event(tick: u64, event: &InteractionEvent) {
    match event {
        InteractionEvent::BeganInteraction { hand, interactable } => {
            info!("[GRASP_SANDBOX] {tick}: {hand:?} picked up {interactable:?}")
        }
        InteractionEvent::EndedInteraction { hand, interactable } => {
            info!("[GRASP_SANDBOX] {tick}: {hand:?} let go of {interactable:?}")
        }
        InteractionEvent::PointAttached { point, joint } => {
            info!("[GRASP_SANDBOX] {tick}: {point:?} snapped onto {joint:?}")
        }
        InteractionEvent::PointDetached { point, joint } => {
            info!("[GRASP_SANDBOX] {tick}: {point:?} came off {joint:?}")
        }
        InteractionEvent::Destroyed { interactable } => {
            info!("[GRASP_SANDBOX] {tick}: {interactable:?} fell out of the world")
        }
    }
}
