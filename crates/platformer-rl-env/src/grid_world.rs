//! Deterministic in-memory world for the demo binary and tests
//!
//! Rooms are ASCII maps laid out left to right in world space:
//! `#` solid tile, `.` air, `m` exit marker, and lowercase letters for
//! entity kinds (`s` spikes, `g` spring, `b` strawberry, `r` refill,
//! `f` falling block, `o` anything else).

use platformer_rl_core::{Action, Category, Rect, Vec2};

use crate::waypoint::LevelKey;
use crate::world::{CameraView, EntityBox, PlayerState, WorldView, PIXELS_PER_TILE};

/// One room's ASCII layout
#[derive(Debug, Clone)]
pub struct RoomSpec {
    pub name: String,
    pub rows: Vec<String>,
}

impl RoomSpec {
    pub fn new(name: &str, rows: &[&str]) -> RoomSpec {
        RoomSpec {
            name: name.to_string(),
            rows: rows.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct Room {
    name: String,
    /// Left edge in world tiles
    origin_x: i32,
    width: i32,
    rows: Vec<Vec<char>>,
    markers: Vec<Vec2>,
    entities: Vec<EntityBox>,
}

/// Scripted world implementing [`WorldView`] with simple walk physics
pub struct GridWorld {
    map: String,
    rooms: Vec<Room>,
    generation: u64,
    loaded: bool,
    transitioning: bool,
    player: PlayerState,
    respawn_frames: u32,
    /// How many frames a death takes before respawn completes
    respawn_delay: u32,
    spawn: Vec2,
    camera_tiles: i32,
}

const WALK_SPEED: f32 = 2.0;
const RESPAWN_DELAY_FRAMES: u32 = 6;

impl GridWorld {
    pub fn new(map: &str, specs: Vec<RoomSpec>) -> GridWorld {
        let mut rooms = Vec::new();
        let mut origin_x = 0i32;
        for spec in specs {
            let rows: Vec<Vec<char>> = spec.rows.iter().map(|r| r.chars().collect()).collect();
            let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as i32;
            let mut markers = Vec::new();
            let mut entities = Vec::new();
            for (y, row) in rows.iter().enumerate() {
                for (x, &ch) in row.iter().enumerate() {
                    let world_x = origin_x + x as i32;
                    let center = Vec2::new(
                        (world_x * PIXELS_PER_TILE + PIXELS_PER_TILE / 2) as f32,
                        (y as i32 * PIXELS_PER_TILE + PIXELS_PER_TILE / 2) as f32,
                    );
                    match ch {
                        'm' => markers.push(center),
                        '#' | '.' | ' ' => {}
                        other => entities.push(EntityBox {
                            kind: entity_kind(other),
                            bounds: Rect::new(
                                (world_x * PIXELS_PER_TILE) as f32,
                                (y as i32 * PIXELS_PER_TILE) as f32,
                                PIXELS_PER_TILE as f32,
                                PIXELS_PER_TILE as f32,
                            ),
                        }),
                    }
                }
            }
            rooms.push(Room {
                name: spec.name,
                origin_x,
                width,
                rows,
                markers,
                entities,
            });
            origin_x += width;
        }

        let spawn = Vec2::new(
            (PIXELS_PER_TILE / 2) as f32,
            (PIXELS_PER_TILE + PIXELS_PER_TILE / 2) as f32,
        );
        GridWorld {
            map: map.to_string(),
            rooms,
            generation: 1,
            loaded: true,
            transitioning: false,
            player: PlayerState {
                position: spawn,
                speed: Vec2::ZERO,
                stamina: 110.0,
                can_dash: true,
                on_ground: true,
                climbing: false,
                dead: false,
            },
            respawn_frames: 0,
            respawn_delay: RESPAWN_DELAY_FRAMES,
            spawn,
            camera_tiles: 20,
        }
    }

    /// Advance one simulation frame
    pub fn advance_frame(&mut self) {
        if self.player.dead {
            if self.respawn_frames > 0 {
                self.respawn_frames -= 1;
            } else {
                self.player.dead = false;
                self.player.position = self.spawn;
                self.player.speed = Vec2::ZERO;
            }
            return;
        }
        let next = self.player.position + self.player.speed;
        let half = (PIXELS_PER_TILE / 2) as f32;
        let body = Rect::new(next.x - half, next.y - half, half * 2.0, half * 2.0);
        if !self.solid_intersects(body) {
            self.player.position = next;
        }
    }

    /// Move the player to the spawn point of a named room
    pub fn teleport_to_room(&mut self, room: &str) {
        if let Some(r) = self.rooms.iter().find(|r| r.name == room) {
            self.player.position = Vec2::new(
                (r.origin_x * PIXELS_PER_TILE + PIXELS_PER_TILE / 2) as f32,
                self.spawn.y,
            );
            self.player.dead = false;
            self.respawn_frames = 0;
        }
    }

    pub fn set_player_position(&mut self, position: Vec2) {
        self.player.position = position;
    }

    pub fn player_position(&self) -> Vec2 {
        self.player.position
    }

    /// Simulate the level object being rebuilt (tile layer must re-resolve)
    pub fn bump_level_generation(&mut self) {
        self.generation += 1;
    }

    /// Simulate no scene being loaded yet
    pub fn unload(&mut self) {
        self.loaded = false;
    }

    pub fn set_transitioning(&mut self, transitioning: bool) {
        self.transitioning = transitioning;
    }

    fn room_at(&self, tile_x: i32) -> Option<&Room> {
        self.rooms
            .iter()
            .find(|r| tile_x >= r.origin_x && tile_x < r.origin_x + r.width)
    }
}

fn entity_kind(ch: char) -> Category {
    match ch {
        's' => Category::Spikes,
        'g' => Category::Spring,
        'b' => Category::Strawberry,
        'r' => Category::Refill,
        'f' => Category::FallingBlock,
        _ => Category::Other,
    }
}

impl WorldView for GridWorld {
    fn level_generation(&self) -> Option<u64> {
        self.loaded.then_some(self.generation)
    }

    fn level_key(&self) -> Option<LevelKey> {
        if !self.loaded {
            return None;
        }
        let tile = self.tile_at(self.player.position);
        self.room_at(tile.x)
            .map(|room| LevelKey::new(&self.map, &room.name))
    }

    fn transitioning(&self) -> bool {
        self.transitioning
    }

    fn solid_intersects(&self, rect: Rect) -> bool {
        if !self.loaded {
            return false;
        }
        let left = (rect.left / PIXELS_PER_TILE as f32).floor() as i32;
        let right = ((rect.right() - 0.01) / PIXELS_PER_TILE as f32).floor() as i32;
        let top = (rect.top / PIXELS_PER_TILE as f32).floor() as i32;
        let bottom = ((rect.bottom() - 0.01) / PIXELS_PER_TILE as f32).floor() as i32;
        for tx in left..=right {
            let Some(room) = self.room_at(tx) else {
                continue;
            };
            for ty in top..=bottom {
                if ty < 0 || ty >= room.rows.len() as i32 {
                    continue;
                }
                let row = &room.rows[ty as usize];
                let local = (tx - room.origin_x) as usize;
                if row.get(local) == Some(&'#') {
                    return true;
                }
            }
        }
        false
    }

    fn entities(&self) -> Vec<EntityBox> {
        if !self.loaded {
            return Vec::new();
        }
        self.rooms
            .iter()
            .flat_map(|r| r.entities.iter().copied())
            .collect()
    }

    fn markers(&self, room: &str) -> Vec<Vec2> {
        self.rooms
            .iter()
            .find(|r| r.name == room)
            .map(|r| r.markers.clone())
            .unwrap_or_default()
    }

    fn player(&self) -> Option<PlayerState> {
        self.loaded.then_some(self.player)
    }

    fn camera(&self) -> Option<CameraView> {
        if !self.loaded {
            return None;
        }
        let span = (self.camera_tiles * PIXELS_PER_TILE) as f32;
        Some(CameraView {
            position: Vec2::new(
                self.player.position.x - span / 2.0,
                self.player.position.y - span / 2.0,
            ),
            width: span,
            height: span,
        })
    }

    fn respawning(&self) -> bool {
        self.player.dead && self.respawn_frames > 0
    }

    fn kill_player(&mut self) {
        if !self.player.dead {
            self.player.dead = true;
            self.respawn_frames = self.respawn_delay;
        }
    }

    fn apply_action(&mut self, action: &Action) {
        if self.player.dead {
            return;
        }
        self.player.speed = Vec2::new(
            action.move_x() * WALK_SPEED,
            action.move_y() * WALK_SPEED,
        );
        self.player.can_dash = !action.dash();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platformer_rl_core::{HorizontalIntent, GrabIntent, SpecialMove, VerticalIntent};

    fn two_rooms() -> GridWorld {
        GridWorld::new(
            "demo",
            vec![
                RoomSpec::new("a1", &["........", "........", "####...m"]),
                RoomSpec::new("a2", &["........", "......m.", "########"]),
            ],
        )
    }

    #[test]
    fn rooms_are_laid_out_left_to_right() {
        let world = two_rooms();
        assert_eq!(world.level_key().unwrap().room, "a1");
        let mut world = world;
        world.teleport_to_room("a2");
        assert_eq!(world.level_key().unwrap().room, "a2");
    }

    #[test]
    fn markers_are_per_room() {
        let world = two_rooms();
        assert_eq!(world.markers("a1").len(), 1);
        assert_eq!(world.markers("a2").len(), 1);
        assert!(world.markers("nope").is_empty());
    }

    #[test]
    fn walk_moves_right_until_solid() {
        let mut world = two_rooms();
        world.set_player_position(Vec2::new(4.0, 12.0));
        world.apply_action(&Action::Move {
            vertical: VerticalIntent::Noop,
            horizontal: HorizontalIntent::Right,
            special: SpecialMove::None,
            grab: GrabIntent::None,
        });
        for _ in 0..100 {
            world.advance_frame();
        }
        assert!(world.player_position().x > 4.0);
    }

    #[test]
    fn kill_and_respawn_cycle() {
        let mut world = two_rooms();
        world.set_player_position(Vec2::new(40.0, 12.0));
        world.kill_player();
        assert!(world.player().unwrap().dead);
        assert!(world.respawning());
        for _ in 0..(RESPAWN_DELAY_FRAMES + 1) {
            world.advance_frame();
        }
        let player = world.player().unwrap();
        assert!(!player.dead);
        assert_eq!(player.position, world.spawn);
    }

    #[test]
    fn unloaded_world_answers_with_absence() {
        let mut world = two_rooms();
        world.unload();
        assert!(world.level_generation().is_none());
        assert!(world.level_key().is_none());
        assert!(world.player().is_none());
        assert!(world.camera().is_none());
        assert!(world.entities().is_empty());
    }
}
