//! World query boundary between the engine and the host game

use platformer_rl_core::{Action, Category, Rect, TilePoint, Vec2};

use crate::waypoint::LevelKey;

/// Side length of one tile in world pixels
pub const PIXELS_PER_TILE: i32 = 8;

/// Kinematic snapshot of the tracked character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    /// Position in world pixels
    pub position: Vec2,
    /// Velocity in pixels per frame
    pub speed: Vec2,
    /// Raw stamina, host units
    pub stamina: f32,
    pub can_dash: bool,
    pub on_ground: bool,
    pub climbing: bool,
    pub dead: bool,
}

/// A live collidable entity as seen by the cache
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityBox {
    pub kind: Category,
    pub bounds: Rect,
}

/// Camera viewport in world pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub position: Vec2,
    pub width: f32,
    pub height: f32,
}

/// Read access to the running game, plus the one mutation the reward policy
/// needs (killing a stuck character).
///
/// Every query that can find nothing returns `Option` or an empty slice;
/// a scene that is not ready is an expected outcome, not an error.
pub trait WorldView {
    /// Identity of the active level object. Changes whenever the tile layer
    /// must be invalidated. `None` while no level is loaded.
    fn level_generation(&self) -> Option<u64>;

    /// Map-file and room-name of the active session
    fn level_key(&self) -> Option<LevelKey>;

    /// Whether the level is mid-transition between rooms
    fn transitioning(&self) -> bool;

    /// Whether any static collision geometry intersects the given rect
    fn solid_intersects(&self, rect: Rect) -> bool;

    /// Snapshot of live collidable entities, excluding static tiles and the
    /// player
    fn entities(&self) -> Vec<EntityBox>;

    /// Exit-marker positions recorded in the static data of a room
    fn markers(&self, room: &str) -> Vec<Vec2>;

    /// The tracked character, if one exists
    fn player(&self) -> Option<PlayerState>;

    /// Camera viewport, if a scene is active
    fn camera(&self) -> Option<CameraView>;

    /// Whether the character is mid-respawn
    fn respawning(&self) -> bool;

    /// Kill the character (used to end stuck episodes)
    fn kill_player(&mut self);

    /// Feed an agent action into the host input layer. The input holds
    /// until the next action arrives.
    fn apply_action(&mut self, action: &Action);

    /// World-pixel position to tile coordinate
    fn tile_at(&self, position: Vec2) -> TilePoint {
        TilePoint::new(
            (position.x / PIXELS_PER_TILE as f32).floor() as i32,
            (position.y / PIXELS_PER_TILE as f32).floor() as i32,
        )
    }

    /// World-pixel rect covered by a tile coordinate. Computed in f32 so
    /// extreme coordinates stay representable instead of overflowing.
    fn tile_footprint(&self, tile: TilePoint) -> Rect {
        Rect::new(
            tile.x as f32 * PIXELS_PER_TILE as f32,
            tile.y as f32 * PIXELS_PER_TILE as f32,
            PIXELS_PER_TILE as f32,
            PIXELS_PER_TILE as f32,
        )
    }
}
