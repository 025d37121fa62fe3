//! # platformer-rl-env
//!
//! Simulation-side engine turning a live 2D platformer session into an RL
//! environment:
//! - [`SpatialEntityCache`] answers tile classification queries under a
//!   bounded, recenterable window
//! - [`VisionSampler`] produces the per-tick categorical grid
//! - [`WaypointTracker`] models forward exploration vs backtracking
//! - [`EpisodeRewardEngine`] shapes the reward and manages episode lifecycle
//! - [`RlSession`] schedules all of the above against the decision cadence
//!
//! The host game sits behind the [`WorldView`] trait; [`GridWorld`] is the
//! deterministic in-memory implementation used by the demo binary and tests.

pub mod episode;
pub mod grid_world;
pub mod session;
pub mod spatial;
pub mod vision;
pub mod waypoint;
pub mod world;

pub use episode::{EpisodeLifecycle, EpisodeRewardEngine, RewardOutcome, TickSignals};
pub use grid_world::{GridWorld, RoomSpec};
pub use session::RlSession;
pub use spatial::SpatialEntityCache;
pub use vision::VisionSampler;
pub use waypoint::{LevelKey, Transition, WaypointTracker};
pub use world::{CameraView, EntityBox, PlayerState, WorldView, PIXELS_PER_TILE};
