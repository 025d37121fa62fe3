//! # platformer-rl-core
//!
//! Core types shared by both sides of the platformer RL bridge:
//! - Tile/entity categories and the sampled vision frame
//! - Observation, action, and reward records
//! - Bridge configuration
//! - Error types

pub mod action;
pub mod category;
pub mod config;
pub mod error;
pub mod geometry;
pub mod observation;
pub mod reward;

pub use action::{
    Action, ActionSequence, GrabIntent, HorizontalIntent, MenuIntent, SpecialMove, VerticalIntent,
};
pub use category::Category;
pub use config::{BridgeConfig, RewardPolicy};
pub use error::{BridgeError, Result};
pub use geometry::{Rect, TilePoint, Vec2};
pub use observation::{normalize_stamina, Observation, VisionFrame};
pub use reward::Reward;
