//! Platformer-RL demo
//!
//! Runs the full bridge loop against the built-in grid world with a greedy
//! scripted agent on the other side of the exchange: the agent reads each
//! observation and walks toward the current waypoint. Useful for smoke
//! testing the pipeline end to end without a real game or a real learner.
//!
//! Usage: `platformer-rl-demo [config.json] [levels.csv] [targets.fit]`
//!
//! The optional second and third arguments seed the waypoint tracker with a
//! room completion order and legacy per-room targets.

use anyhow::Result;
use platformer_rl_bridge::{AgentEndpoint, Exchange};
use platformer_rl_core::{
    Action, BridgeConfig, GrabIntent, HorizontalIntent, Observation, SpecialMove, VerticalIntent,
};
use platformer_rl_env::{GridWorld, RlSession, RoomSpec, WaypointTracker};
use std::thread;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const DEMO_FRAMES: u64 = 3000;

fn demo_world() -> GridWorld {
    GridWorld::new(
        "demo",
        vec![
            RoomSpec::new(
                "a1",
                &[
                    "............",
                    "...........m",
                    "############",
                ],
            ),
            RoomSpec::new(
                "a2",
                &[
                    "..........",
                    ".........m",
                    "##########",
                ],
            ),
            RoomSpec::new(
                "a3",
                &[
                    "........#",
                    ".......m#",
                    "#########",
                ],
            ),
        ],
    )
}

/// One greedy step toward the waypoint, in tile coordinates
fn greedy_action(observation: &Observation) -> Action {
    let dx = observation.target.x - observation.position.x;
    let dy = observation.target.y - observation.position.y;
    // Keep pressing right on the marker tile itself so the walker pushes
    // through room exits instead of idling on the waypoint.
    let horizontal = if dx < 0.0 {
        HorizontalIntent::Left
    } else {
        HorizontalIntent::Right
    };
    let vertical = if dy > 0.0 {
        VerticalIntent::Down
    } else if dy < 0.0 {
        VerticalIntent::Up
    } else {
        VerticalIntent::Noop
    };
    Action::Move {
        vertical,
        horizontal,
        special: SpecialMove::None,
        grab: GrabIntent::None,
    }
}

fn run_agent(agent: AgentEndpoint) -> (u32, f64) {
    let mut episodes = 0u32;
    let mut total_reward = 0.0f64;
    while let Ok(observation) = agent.next_observation() {
        while let Some(reward) = agent.try_next_reward() {
            total_reward += reward.value();
        }
        if observation.death || observation.finished_level {
            episodes += 1;
        }
        if agent.push_action(greedy_action(&observation)).is_err() {
            break;
        }
    }
    (episodes, total_reward)
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(path, "loading config");
            BridgeConfig::from_file(&path)?
        }
        None => BridgeConfig::default(),
    };

    let mut tracker = WaypointTracker::new();
    if let Some(path) = std::env::args().nth(2) {
        info!(path, "loading level order");
        tracker.load_level_order(&path)?;
    }
    if let Some(path) = std::env::args().nth(3) {
        info!(path, "loading legacy targets");
        tracker.load_legacy_targets(&path)?;
    }

    let mut world = demo_world();
    let (sim, agent) = Exchange::new(&config);
    let mut session = RlSession::new(config.clone(), tracker, sim);
    let agent_handle = thread::spawn(move || run_agent(agent));

    info!(
        frames = DEMO_FRAMES,
        cadence = config.frames_per_decision(),
        "demo starting"
    );
    for _ in 0..DEMO_FRAMES {
        session.run_host_frame(&mut world, GridWorld::advance_frame)?;
    }

    info!(
        episodes_started = session.engine().episodes_started(),
        episodes_ended = session.engine().episodes_ended(),
        last_episode_reward = session.engine().last_episode_reward(),
        rooms_finished = session.tracker().finished_level_count(),
        "demo finished"
    );
    drop(session);

    let (episode_boundaries, agent_total_reward) = agent_handle
        .join()
        .map_err(|_| anyhow::anyhow!("agent thread panicked"))?;
    info!(episode_boundaries, agent_total_reward, "agent summary");
    Ok(())
}
