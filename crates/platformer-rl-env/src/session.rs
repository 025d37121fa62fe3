//! Per-frame training session driver
//!
//! `RlSession` is the host-side glue: each simulation frame it decides
//! whether to send an observation, pull and apply an action, or settle the
//! tick's reward, following a fixed cadence. Observations go out on decision
//! boundaries; the matching action is fetched a configurable number of
//! frames later.

use platformer_rl_bridge::{BridgeState, SimEndpoint};
use platformer_rl_core::{
    normalize_stamina, BridgeConfig, Observation, Result, Reward, Vec2,
};
use tracing::{debug, info};

use crate::episode::{EpisodeRewardEngine, TickSignals};
use crate::spatial::SpatialEntityCache;
use crate::vision::VisionSampler;
use crate::waypoint::WaypointTracker;
use crate::world::{PlayerState, WorldView};

pub struct RlSession {
    config: BridgeConfig,
    cache: SpatialEntityCache,
    sampler: VisionSampler,
    tracker: WaypointTracker,
    engine: EpisodeRewardEngine,
    sim: SimEndpoint,
    /// Countdown from observation to action application; `None` when no
    /// action is pending
    run_action_in: Option<u32>,
    /// An action was applied since the last settled tick
    need_update: bool,
    waiting_for_respawn: bool,
    first_observation_sent: bool,
}

impl RlSession {
    pub fn new(config: BridgeConfig, tracker: WaypointTracker, sim: SimEndpoint) -> RlSession {
        let cache = SpatialEntityCache::new(
            config.cache_max_x,
            config.cache_max_y,
            config.entity_cache_refresh_frames,
        );
        let sampler = VisionSampler::new(config.vision_width, config.vision_height);
        let engine = EpisodeRewardEngine::new(config.reward.clone(), config.frames_per_decision());
        RlSession {
            config,
            cache,
            sampler,
            tracker,
            engine,
            sim,
            run_action_in: None,
            need_update: false,
            waiting_for_respawn: false,
            first_observation_sent: false,
        }
    }

    pub fn engine(&self) -> &EpisodeRewardEngine {
        &self.engine
    }

    pub fn tracker(&self) -> &WaypointTracker {
        &self.tracker
    }

    /// Run every per-frame session decision for one simulation frame.
    /// Call after the world has advanced.
    pub fn step(&mut self, world: &mut impl WorldView) -> Result<()> {
        if self.sim.state() == BridgeState::Disabled {
            return Ok(());
        }
        if world.level_generation().is_none() || world.transitioning() {
            return Ok(());
        }
        let Some(player) = world.player() else {
            return Ok(());
        };

        if player.dead {
            if !self.waiting_for_respawn {
                self.waiting_for_respawn = true;
                debug!("death detected, settling terminal tick");
                if self.first_observation_sent {
                    self.settle_tick(world, player, true)?;
                }
            }
            return Ok(());
        }
        if self.waiting_for_respawn {
            if world.respawning() {
                return Ok(());
            }
            self.waiting_for_respawn = false;
        }

        self.engine.increment_frames();

        if !self.first_observation_sent {
            self.tracker.update_target(world)?;
            self.engine.start_episode(self.tracker.distance_from_target(world));
            let observation = self.observe(world, player, false, false);
            self.sim.push_observation(observation)?;
            self.sim.mark_running();
            self.first_observation_sent = true;
            if self.config.training_enabled {
                self.run_action_in = Some(self.config.action_delay_frames);
            }
            return Ok(());
        }

        if let Some(delay) = self.run_action_in {
            if delay == 0 {
                self.run_action_in = None;
                let action = self.sim.next_action()?;
                world.apply_action(&action);
                self.need_update = true;
            } else {
                self.run_action_in = Some(delay - 1);
            }
        }

        let observing = self.need_update || !self.config.training_enabled;
        if observing && self.is_decision_frame() {
            self.settle_tick(world, player, false)?;
        }
        Ok(())
    }

    /// Host update loops for one rendered frame. In worker mode the
    /// multiplier reruns the whole world-advance/session-step pair.
    pub fn run_host_frame<W: WorldView>(
        &mut self,
        world: &mut W,
        mut advance: impl FnMut(&mut W),
    ) -> Result<()> {
        for _ in 0..self.config.frame_multiplier() {
            advance(world);
            self.step(world)?;
        }
        Ok(())
    }

    fn is_decision_frame(&self) -> bool {
        let frames = self.engine.frames();
        frames > 0 && frames % self.config.frames_per_decision() as u64 == 0
    }

    /// Settle one decision tick: retarget, score, and push the
    /// observation/reward pair. On a terminal tick the episode resets and
    /// stale actions are flushed.
    fn settle_tick(
        &mut self,
        world: &mut impl WorldView,
        player: PlayerState,
        died: bool,
    ) -> Result<()> {
        self.tracker.update_target(world)?;
        let signals = TickSignals {
            distance: self.tracker.distance_from_target(world),
            dead: died,
            finished_level: self.tracker.take_forward_reward(),
            backtracked: self.tracker.take_backtrack_penalty(),
            unbacktracked: self.tracker.take_unbacktrack_reward(),
        };
        let finished = signals.finished_level || signals.unbacktracked;
        let outcome = self.engine.get_reward(signals)?;
        if outcome.kill_requested {
            world.kill_player();
        }

        // Re-read the snapshot so the observation reflects the applied
        // action (and a forced kill, if one just happened).
        let player = world.player().unwrap_or(player);
        let observation = self.observe(world, player, died, finished);
        self.sim.push_observation(observation)?;
        self.sim.push_reward(Reward(outcome.reward))?;

        self.need_update = false;
        if died || finished {
            info!(died, finished, "episode boundary");
            self.engine.reset_episode();
            self.first_observation_sent = false;
            self.run_action_in = None;
            self.sim.flush_actions();
        } else if self.config.training_enabled {
            self.run_action_in = Some(self.config.action_delay_frames);
        }
        Ok(())
    }

    fn observe(
        &mut self,
        world: &impl WorldView,
        player: PlayerState,
        death: bool,
        finished_level: bool,
    ) -> Observation {
        let vision = self.sampler.sample(world, &mut self.cache);
        let camera = world.camera();
        let target = self.tracker.current_target();
        let position_tile = world.tile_at(player.position);
        let target_tile = world.tile_at(target);
        Observation {
            vision,
            speed: player.speed,
            stamina: normalize_stamina(player.stamina),
            can_dash: player.can_dash,
            death,
            finished_level,
            climbing: player.climbing,
            on_ground: player.on_ground && !death,
            target: Vec2::new(target_tile.x as f32, target_tile.y as f32),
            position: Vec2::new(position_tile.x as f32, position_tile.y as f32),
            screen_position: camera.map(|c| c.position).unwrap_or(Vec2::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_world::{GridWorld, RoomSpec};
    use platformer_rl_bridge::{AgentEndpoint, Exchange};
    use platformer_rl_core::{
        Action, GrabIntent, HorizontalIntent, SpecialMove, VerticalIntent,
    };
    use std::thread;

    fn walk_right() -> Action {
        Action::Move {
            vertical: VerticalIntent::Noop,
            horizontal: HorizontalIntent::Right,
            special: SpecialMove::None,
            grab: GrabIntent::None,
        }
    }

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            frames_per_second: 12,
            calculations_per_second: 4,
            action_delay_frames: 2,
            cache_max_x: 64,
            cache_max_y: 64,
            entity_cache_refresh_frames: 2,
            channel_capacity: 8,
            ..Default::default()
        }
    }

    fn marker_world() -> GridWorld {
        GridWorld::new(
            "demo",
            vec![RoomSpec::new(
                "a1",
                &[
                    "............#",
                    "...........m#",
                    "#############",
                ],
            )],
        )
    }

    /// Agent that always walks right, answering every observation
    fn spawn_walk_right_agent(agent: AgentEndpoint) -> thread::JoinHandle<Vec<f64>> {
        thread::spawn(move || {
            let mut rewards = Vec::new();
            while let Ok(_obs) = agent.next_observation() {
                while let Some(reward) = agent.try_next_reward() {
                    rewards.push(reward.value());
                }
                if agent.push_action(walk_right()).is_err() {
                    break;
                }
            }
            rewards
        })
    }

    #[test]
    fn actions_flow_and_progress_is_rewarded() {
        let config = test_config();
        let (sim, agent) = Exchange::new(&config);
        let mut session = RlSession::new(config, WaypointTracker::new(), sim);
        let mut world = marker_world();
        let start_x = world.player_position().x;
        let handle = spawn_walk_right_agent(agent);

        for _ in 0..60 {
            world.advance_frame();
            session.step(&mut world).unwrap();
        }

        assert!(world.player_position().x > start_x);
        assert!(session.engine().total_reward() > 0.0);
        drop(session);
        let rewards = handle.join().unwrap();
        assert!(!rewards.is_empty());
        assert!(rewards.iter().any(|&r| r > 0.0));
    }

    #[test]
    fn death_settles_a_terminal_tick_and_restarts_the_episode() {
        let config = test_config();
        let (sim, agent) = Exchange::new(&config);
        let mut session = RlSession::new(config, WaypointTracker::new(), sim);
        let mut world = marker_world();

        let handle = thread::spawn(move || {
            let mut death_seen = false;
            let mut observations_after_death = 0;
            while let Ok(obs) = agent.next_observation() {
                while agent.try_next_reward().is_some() {}
                if obs.death {
                    death_seen = true;
                } else if death_seen {
                    observations_after_death += 1;
                }
                if agent.push_action(walk_right()).is_err() {
                    break;
                }
            }
            (death_seen, observations_after_death)
        });

        for frame in 0..90 {
            if frame == 20 {
                world.kill_player();
            }
            world.advance_frame();
            session.step(&mut world).unwrap();
        }

        assert_eq!(session.engine().episodes_ended(), 1);
        assert_eq!(session.engine().episodes_started(), 2);
        drop(session);
        let (death_seen, observations_after_death) = handle.join().unwrap();
        assert!(death_seen);
        assert!(observations_after_death > 0);
    }

    #[test]
    fn closed_agent_disables_the_bridge_once() {
        let config = test_config();
        let (sim, agent) = Exchange::new(&config);
        let mut session = RlSession::new(config, WaypointTracker::new(), sim);
        let mut world = marker_world();

        // First observation goes through, then the agent goes away.
        world.advance_frame();
        session.step(&mut world).unwrap();
        drop(agent);

        let mut failures = 0;
        for _ in 0..10 {
            world.advance_frame();
            if session.step(&mut world).is_err() {
                failures += 1;
            }
        }
        assert_eq!(failures, 1);
    }

    #[test]
    fn nothing_is_sent_while_transitioning_or_unloaded() {
        let config = test_config();
        let (sim, agent) = Exchange::new(&config);
        let mut session = RlSession::new(config, WaypointTracker::new(), sim);
        let mut world = marker_world();

        world.set_transitioning(true);
        for _ in 0..10 {
            world.advance_frame();
            session.step(&mut world).unwrap();
        }
        assert!(agent.try_next_observation().is_none());

        world.set_transitioning(false);
        world.unload();
        for _ in 0..10 {
            world.advance_frame();
            session.step(&mut world).unwrap();
        }
        assert!(agent.try_next_observation().is_none());
    }

    #[test]
    fn observer_mode_pushes_without_pulling_actions() {
        let config = BridgeConfig {
            training_enabled: false,
            ..test_config()
        };
        let (sim, agent) = Exchange::new(&config);
        let mut session = RlSession::new(config, WaypointTracker::new(), sim);
        let mut world = marker_world();

        for _ in 0..20 {
            world.advance_frame();
            session.step(&mut world).unwrap();
        }
        // First observation plus decision-frame observations, no action
        // fetches (which would have timed out the bridge).
        assert!(agent.try_next_observation().is_some());
        assert!(session.engine().frames() >= 20);
    }
}
