//! Per-run reward shaping and episode lifecycle
//!
//! The engine is a three-state machine: the first reward call of an episode
//! records the starting distance and returns zero; active ticks shape a
//! reward from waypoint-distance deltas plus flat event terms; a death tick
//! overrides the delta with a terminal formula and parks the engine until an
//! external reset.

use platformer_rl_core::{BridgeError, Result, RewardPolicy};
use tracing::{debug, info};

/// Lifecycle of one episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeLifecycle {
    /// No reward computed yet; the next call records the starting distance
    AwaitingFirst,
    /// Normal per-tick shaping
    Active,
    /// Terminal reward delivered; waiting for an external reset
    AwaitingReset,
}

/// Waypoint/death signals consumed by one reward tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickSignals {
    /// Straight-line distance to the current target
    pub distance: f64,
    /// The character died this tick
    pub dead: bool,
    /// Level-finished flag fired this tick
    pub finished_level: bool,
    /// Unintended backtrack flag fired this tick
    pub backtracked: bool,
    /// Intentional un-backtrack flag fired this tick
    pub unbacktracked: bool,
}

/// Result of one reward tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardOutcome {
    /// Cadence-normalized reward for this tick
    pub reward: f64,
    /// The policy decided to kill the stuck character
    pub kill_requested: bool,
    /// The episode reached a terminal state this tick
    pub episode_over: bool,
}

pub struct EpisodeRewardEngine {
    policy: RewardPolicy,
    /// Frames between decision ticks
    cadence: u32,
    lifecycle: EpisodeLifecycle,
    frames: u64,
    total_reward: f64,
    last_episode_reward: f64,
    last_action_reward: f64,
    original_distance: f64,
    closest_distance: f64,
    last_distance: f64,
    frames_since_progress: u32,
    episodes_started: u32,
    episodes_ended: u32,
}

impl EpisodeRewardEngine {
    pub fn new(policy: RewardPolicy, cadence: u32) -> EpisodeRewardEngine {
        EpisodeRewardEngine {
            policy,
            cadence,
            lifecycle: EpisodeLifecycle::AwaitingFirst,
            frames: 0,
            total_reward: 0.0,
            last_episode_reward: 0.0,
            last_action_reward: 0.0,
            original_distance: 0.0,
            closest_distance: 0.0,
            last_distance: 0.0,
            frames_since_progress: 0,
            episodes_started: 0,
            episodes_ended: 0,
        }
    }

    pub fn lifecycle(&self) -> EpisodeLifecycle {
        self.lifecycle
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn last_episode_reward(&self) -> f64 {
        self.last_episode_reward
    }

    pub fn last_action_reward(&self) -> f64 {
        self.last_action_reward
    }

    pub fn episodes_started(&self) -> u32 {
        self.episodes_started
    }

    pub fn episodes_ended(&self) -> u32 {
        self.episodes_ended
    }

    pub fn increment_frames(&mut self) {
        self.frames += 1;
    }

    /// Record the starting distance of a fresh episode
    pub fn start_episode(&mut self, distance: f64) {
        self.original_distance = distance;
        self.closest_distance = distance;
        self.episodes_started += 1;
        info!(
            episode = self.episodes_started,
            original_distance = distance,
            "episode started"
        );
    }

    /// Compute the shaped reward for one decision tick
    pub fn get_reward(&mut self, signals: TickSignals) -> Result<RewardOutcome> {
        match self.lifecycle {
            EpisodeLifecycle::AwaitingReset => {
                debug!("waiting for reset, no reward given");
                return Ok(RewardOutcome {
                    reward: 0.0,
                    kill_requested: false,
                    episode_over: true,
                });
            }
            EpisodeLifecycle::AwaitingFirst => {
                self.lifecycle = EpisodeLifecycle::Active;
                self.last_distance = signals.distance;
                return Ok(RewardOutcome {
                    reward: 0.0,
                    kill_requested: false,
                    episode_over: false,
                });
            }
            EpisodeLifecycle::Active => {}
        }

        let cadence = self.cadence as f64;
        let delta = self.last_distance - signals.distance;
        let mut reward = delta;
        let mut multiplier = 1.0;
        let mut kill_requested = false;
        let mut episode_over = false;

        if signals.distance < self.closest_distance {
            self.closest_distance = signals.distance;
            self.frames_since_progress = 0;
            multiplier = self.policy.progress_bonus;
        } else {
            self.frames_since_progress += self.cadence;
        }
        self.last_distance = signals.distance;

        if signals.dead {
            // Terminal reward tracks how much of the room was covered
            if self.original_distance == 0.0 {
                return Err(BridgeError::EpisodeCorrupt);
            }
            reward = self.policy.death_scale
                * cadence
                * ((self.original_distance
                    - signals.distance * self.policy.death_distance_factor)
                    / self.original_distance);
            info!(
                reward,
                original_distance = self.original_distance,
                closest_distance = self.closest_distance,
                "died"
            );
            self.lifecycle = EpisodeLifecycle::AwaitingReset;
            episode_over = true;
        } else if signals.finished_level {
            reward += self.policy.level_finish_bonus * cadence;
        } else if signals.backtracked {
            debug!("backtracking, punishing");
            reward -= self.policy.backtrack_penalty * cadence;
        } else if signals.unbacktracked {
            debug!("un-backtracking, rewarding");
            reward += self.policy.unbacktrack_bonus * cadence;
        } else if self.frames_since_progress > self.policy.no_progress_frame_limit {
            info!(
                frames = self.frames_since_progress,
                "no progress, killing the character"
            );
            reward = -self.policy.no_progress_penalty * cadence;
            kill_requested = true;
            self.frames_since_progress = 0;
        } else {
            reward *= multiplier;
        }

        // Normalize per decision tick so cumulative reward is comparable
        // across cadence configurations
        reward /= cadence;
        self.total_reward += reward;
        self.last_action_reward = reward;
        Ok(RewardOutcome {
            reward,
            kill_requested,
            episode_over,
        })
    }

    /// External reset after a death or level transition is confirmed. Only
    /// valid when the character exists and is not mid-respawn; the caller
    /// guards that.
    pub fn reset_episode(&mut self) {
        info!(total_reward = self.total_reward, "resetting episode");
        if self.total_reward != 0.0 {
            self.last_episode_reward = self.total_reward;
        }
        if self.lifecycle != EpisodeLifecycle::AwaitingFirst {
            self.episodes_ended += 1;
        }
        self.total_reward = 0.0;
        self.frames = 0;
        self.frames_since_progress = 0;
        self.last_action_reward = 0.0;
        self.lifecycle = EpisodeLifecycle::AwaitingFirst;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EpisodeRewardEngine {
        let mut engine = EpisodeRewardEngine::new(RewardPolicy::default(), 15);
        engine.start_episode(1000.0);
        engine
    }

    fn tick(distance: f64) -> TickSignals {
        TickSignals {
            distance,
            ..Default::default()
        }
    }

    #[test]
    fn first_call_records_distance_and_returns_zero() {
        let mut engine = engine();
        assert_eq!(engine.lifecycle(), EpisodeLifecycle::AwaitingFirst);
        let outcome = engine.get_reward(tick(1000.0)).unwrap();
        assert_eq!(outcome.reward, 0.0);
        assert_eq!(engine.lifecycle(), EpisodeLifecycle::Active);
    }

    #[test]
    fn progress_applies_bonus_multiplier() {
        let mut engine = engine();
        engine.get_reward(tick(1000.0)).unwrap();
        // 800 closer than ever before: delta * 4, normalized by cadence
        let outcome = engine.get_reward(tick(200.0)).unwrap();
        assert_eq!(outcome.reward, 800.0 * 4.0 / 15.0);
    }

    #[test]
    fn regression_gets_no_bonus() {
        let mut engine = engine();
        engine.get_reward(tick(1000.0)).unwrap();
        engine.get_reward(tick(200.0)).unwrap();
        // Moving away: plain negative delta
        let outcome = engine.get_reward(tick(300.0)).unwrap();
        assert_eq!(outcome.reward, -100.0 / 15.0);
    }

    #[test]
    fn death_reward_is_exact_and_overrides_delta() {
        let mut engine = engine();
        engine.get_reward(tick(1000.0)).unwrap();
        engine.get_reward(tick(200.0)).unwrap();
        let outcome = engine
            .get_reward(TickSignals {
                distance: 300.0,
                dead: true,
                ..Default::default()
            })
            .unwrap();
        // 5 * cadence * ((1000 - 300*1.2)/1000), then cadence-normalized
        let expected = 5.0 * 15.0 * ((1000.0 - 300.0 * 1.2) / 1000.0) / 15.0;
        assert_eq!(outcome.reward, expected);
        assert!(outcome.episode_over);
        assert_eq!(engine.lifecycle(), EpisodeLifecycle::AwaitingReset);
        // Parked until reset
        let parked = engine.get_reward(tick(300.0)).unwrap();
        assert_eq!(parked.reward, 0.0);
        assert!(parked.episode_over);
    }

    #[test]
    fn zero_original_distance_on_death_is_fatal() {
        let mut engine = EpisodeRewardEngine::new(RewardPolicy::default(), 15);
        engine.start_episode(0.0);
        engine.get_reward(tick(0.0)).unwrap();
        let result = engine.get_reward(TickSignals {
            distance: 10.0,
            dead: true,
            ..Default::default()
        });
        assert!(matches!(result, Err(BridgeError::EpisodeCorrupt)));
    }

    #[test]
    fn no_progress_triggers_exactly_one_forced_kill() {
        let mut engine = engine();
        engine.get_reward(tick(1000.0)).unwrap();
        let limit = RewardPolicy::default().no_progress_frame_limit;
        let ticks_to_limit = limit / 15;
        let mut kills = 0;
        let mut kill_reward = 0.0;
        // Hold distance flat; each tick adds one cadence of stall
        for _ in 0..=(ticks_to_limit + 1) {
            let outcome = engine.get_reward(tick(1000.0)).unwrap();
            if outcome.kill_requested {
                kills += 1;
                kill_reward = outcome.reward;
            }
        }
        assert_eq!(kills, 1);
        assert_eq!(kill_reward, -75.0 * 15.0 / 15.0);
    }

    #[test]
    fn flat_event_terms_are_cadence_invariant() {
        for cadence in [10u32, 15, 30] {
            let mut engine = EpisodeRewardEngine::new(RewardPolicy::default(), cadence);
            engine.start_episode(1000.0);
            engine.get_reward(tick(1000.0)).unwrap();
            let outcome = engine
                .get_reward(TickSignals {
                    distance: 1000.0,
                    finished_level: true,
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(outcome.reward, 150.0);
        }
    }

    #[test]
    fn reset_records_last_episode_reward() {
        let mut engine = engine();
        engine.get_reward(tick(1000.0)).unwrap();
        engine.get_reward(tick(200.0)).unwrap();
        let total = engine.total_reward();
        assert!(total > 0.0);
        engine.reset_episode();
        assert_eq!(engine.last_episode_reward(), total);
        assert_eq!(engine.total_reward(), 0.0);
        assert_eq!(engine.lifecycle(), EpisodeLifecycle::AwaitingFirst);
        // A zero-total episode keeps the previous record
        engine.get_reward(tick(500.0)).unwrap();
        engine.reset_episode();
        assert_eq!(engine.last_episode_reward(), total);
    }
}
