//! Bridge configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BridgeError, Result};

/// Numeric constants of the reward shaping policy. These are policy knobs,
/// not physical constants; the defaults are the reference values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewardPolicy {
    /// Multiplier applied when a tick sets a new closest-ever distance
    pub progress_bonus: f64,
    /// Flat reward for finishing a level, before cadence scaling
    pub level_finish_bonus: f64,
    /// Flat penalty for unintended backtracking
    pub backtrack_penalty: f64,
    /// Flat reward for leaving a backtracked level forward again
    pub unbacktrack_bonus: f64,
    /// Scale K of the terminal death reward
    pub death_scale: f64,
    /// Distance factor M of the terminal death reward
    pub death_distance_factor: f64,
    /// Decision-equivalent frames without progress before a forced kill
    pub no_progress_frame_limit: u32,
    /// Flat penalty applied on a forced kill
    pub no_progress_penalty: f64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            progress_bonus: 4.0,
            level_finish_bonus: 150.0,
            backtrack_penalty: 75.0,
            unbacktrack_bonus: 50.0,
            death_scale: 5.0,
            death_distance_factor: 1.2,
            no_progress_frame_limit: 600,
            no_progress_penalty: 75.0,
        }
    }
}

/// Full configuration surface of the bridge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Host simulation frame rate
    pub frames_per_second: u32,
    /// Decision ticks per second; must divide `frames_per_second`
    pub calculations_per_second: u32,
    /// Frames between sending an observation and applying the action
    pub action_delay_frames: u32,
    /// Maximum X extent of the spatial cache, in tiles
    pub cache_max_x: usize,
    /// Maximum Y extent of the spatial cache, in tiles
    pub cache_max_y: usize,
    /// Frames between entity-layer recomputations
    pub entity_cache_refresh_frames: u32,
    /// Host update loops per rendered frame in accelerated mode
    pub fast_mode_frame_multiplier: u32,
    /// Whether observations/rewards are pushed to the agent
    pub training_enabled: bool,
    /// Offline/batch worker mode; lengthens the action timeout
    pub worker_mode: bool,
    /// Vision grid width in tiles
    pub vision_width: usize,
    /// Vision grid height in tiles
    pub vision_height: usize,
    /// Capacity of each exchange channel
    pub channel_capacity: usize,
    /// Reward shaping constants
    pub reward: RewardPolicy,
    /// Accepted for compatibility; rendering is out of scope
    pub draw_overlays: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            frames_per_second: 60,
            calculations_per_second: 4,
            action_delay_frames: 2,
            cache_max_x: 1000,
            cache_max_y: 1000,
            entity_cache_refresh_frames: 10,
            fast_mode_frame_multiplier: 10,
            training_enabled: true,
            worker_mode: false,
            vision_width: 20,
            vision_height: 20,
            channel_capacity: 40,
            reward: RewardPolicy::default(),
            draw_overlays: false,
        }
    }
}

impl BridgeConfig {
    /// Load from a JSON file and validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<BridgeConfig> {
        let text = std::fs::read_to_string(path)?;
        let config: BridgeConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Frames between decision ticks
    pub fn frames_per_decision(&self) -> u32 {
        self.frames_per_second / self.calculations_per_second
    }

    /// Active frame multiplier (1 unless running as a worker)
    pub fn frame_multiplier(&self) -> u32 {
        if self.worker_mode {
            self.fast_mode_frame_multiplier
        } else {
            1
        }
    }

    /// Blocking action fetch deadline
    pub fn action_timeout(&self) -> std::time::Duration {
        if self.worker_mode {
            std::time::Duration::from_secs(30)
        } else {
            std::time::Duration::from_secs(5)
        }
    }

    /// Per-tick action retrieval budget in milliseconds
    pub fn tick_budget_ms(&self) -> f64 {
        1000.0 / (self.calculations_per_second as f64 * self.frame_multiplier() as f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.calculations_per_second == 0 {
            return Err(BridgeError::Config(
                "calculations_per_second must be nonzero".into(),
            ));
        }
        if self.frames_per_second % self.calculations_per_second != 0 {
            return Err(BridgeError::Config(format!(
                "calculations_per_second ({}) must divide frames_per_second ({})",
                self.calculations_per_second, self.frames_per_second
            )));
        }
        if self.action_delay_frames >= self.frames_per_decision() {
            return Err(BridgeError::Config(format!(
                "action_delay_frames ({}) must be below the decision cadence ({})",
                self.action_delay_frames,
                self.frames_per_decision()
            )));
        }
        if self.cache_max_x == 0 || self.cache_max_y == 0 {
            return Err(BridgeError::Config("cache extents must be nonzero".into()));
        }
        if self.vision_width == 0 || self.vision_height == 0 {
            return Err(BridgeError::Config("vision extents must be nonzero".into()));
        }
        if self.channel_capacity == 0 {
            return Err(BridgeError::Config(
                "channel_capacity must be nonzero".into(),
            ));
        }
        Ok(())
    }
}
