//! Waypoint discovery and exploration-state tracking
//!
//! The tracker keeps a backtrack stack of rooms the agent has visited and
//! left, so re-entering known territory can be told apart from forward
//! exploration. On every room change exactly one of four transitions fires;
//! the target waypoint is then the closest discovered marker (steering back
//! toward known territory) or the furthest one (pushing forward).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use platformer_rl_core::{BridgeError, Result, Vec2};
use tracing::{info, warn};

use crate::world::WorldView;

/// Identity of a room: (map-file, room-name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelKey {
    pub map: String,
    pub room: String,
}

impl LevelKey {
    pub fn new(map: &str, room: &str) -> LevelKey {
        LevelKey {
            map: map.to_string(),
            room: room.to_string(),
        }
    }
}

/// Which exploration transition fired on the last update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Entered unseen territory (or the very first room)
    Forward,
    /// Left the expected path; steering back toward known territory
    Backtrack,
    /// Returned to the top of the backtrack stack; resuming forward
    UnBacktrack,
    /// Room unchanged
    NoOp,
}

pub struct WaypointTracker {
    /// Rooms in intended completion order, seeded from a levels file
    completion_order: Vec<LevelKey>,
    /// Legacy position log: room name to recorded positions, used to seed
    /// targets before any marker is discovered
    legacy_targets: HashMap<String, Vec<Vec2>>,
    /// Marker positions memoized per room name
    marker_cache: HashMap<String, Vec<Vec2>>,
    seen_rooms: HashSet<String>,
    backtrack_stack: Vec<String>,
    /// Room the current target belongs to; empty before the first update
    targeted_room: String,
    current_target: Vec2,
    finished_level_count: u32,
    /// Set when a never-seen room is entered; consumed by the reward engine
    forward_reward_pending: bool,
    /// Set when an un-backtrack fires; consumed by the reward engine
    unbacktrack_reward_pending: bool,
    /// Set when an unintended backtrack fires; consumed by the reward engine
    backtrack_penalty_pending: bool,
}

impl WaypointTracker {
    pub fn new() -> WaypointTracker {
        WaypointTracker {
            completion_order: Vec::new(),
            legacy_targets: HashMap::new(),
            marker_cache: HashMap::new(),
            seen_rooms: HashSet::new(),
            backtrack_stack: Vec::new(),
            targeted_room: String::new(),
            current_target: Vec2::ZERO,
            finished_level_count: 0,
            forward_reward_pending: false,
            unbacktrack_reward_pending: false,
            backtrack_penalty_pending: false,
        }
    }

    /// Seed the intended completion order from a CSV of
    /// `map_file,room_name` rows. The header line is skipped.
    pub fn load_level_order(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.completion_order.clear();
        for line in text.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let (Some(map), Some(room)) = (fields.next(), fields.next()) else {
                return Err(BridgeError::Parse(format!(
                    "level order row needs two fields: {line:?}"
                )));
            };
            self.completion_order
                .push(LevelKey::new(map.trim(), room.trim()));
        }
        info!(rooms = self.completion_order.len(), "loaded level order");
        Ok(())
    }

    /// Parse a legacy position/velocity log (`room: [x, y, vx, vy]` lines)
    /// used only to seed very early targets before markers exist.
    pub fn load_legacy_targets(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        for line in text.lines() {
            let Some((name, rest)) = line.split_once(": ") else {
                continue;
            };
            let Some(inner) = rest
                .split_once('[')
                .and_then(|(_, tail)| tail.split_once(']'))
                .map(|(inner, _)| inner)
            else {
                continue;
            };
            let values: Vec<f32> = inner
                .split(", ")
                .map(|v| {
                    v.trim()
                        .parse::<f32>()
                        .map_err(|e| BridgeError::Parse(format!("bad legacy value {v:?}: {e}")))
                })
                .collect::<Result<_>>()?;
            if values.len() < 2 {
                return Err(BridgeError::Parse(format!(
                    "legacy row needs at least x and y: {line:?}"
                )));
            }
            self.legacy_targets
                .entry(name.trim().to_string())
                .or_default()
                .push(Vec2::new(values[0], values[1]));
        }
        Ok(())
    }

    pub fn current_target(&self) -> Vec2 {
        self.current_target
    }

    pub fn finished_level_count(&self) -> u32 {
        self.finished_level_count
    }

    /// Whether the agent is currently working back through the stack
    pub fn doing_backtracked_levels(&self) -> bool {
        !self.backtrack_stack.is_empty()
    }

    /// Straight-line distance from the player to the current target; zero
    /// when no player exists.
    pub fn distance_from_target(&self, world: &impl WorldView) -> f64 {
        match world.player() {
            Some(player) => player.position.distance(self.current_target) as f64,
            None => 0.0,
        }
    }

    /// Componentwise offset from the player to the current target
    pub fn vector_distance_from_target(&self, world: &impl WorldView) -> Vec2 {
        match world.player() {
            Some(player) => player.position - self.current_target,
            None => Vec2::ZERO,
        }
    }

    /// Evaluate the exploration state machine against the current room.
    /// Exactly one transition fires per call. Fails only when the seeded
    /// completion order produces a corrupt target.
    pub fn update_target(&mut self, world: &impl WorldView) -> Result<Transition> {
        let Some(key) = world.level_key() else {
            return Ok(Transition::NoOp);
        };
        let room = key.room.clone();
        let first_room = self.targeted_room.is_empty();
        let room_changed = room != self.targeted_room;
        if !room_changed {
            return Ok(Transition::NoOp);
        }

        let seen_before = self.seen_rooms.contains(&room);
        let unbacktracking =
            seen_before && self.backtrack_stack.last() == Some(&room);
        let previous_room = std::mem::replace(&mut self.targeted_room, room.clone());

        if unbacktracking {
            // Returning to where we left off; resume forward progress
            self.backtrack_stack.pop();
            self.unbacktrack_reward_pending = true;
            self.finished_level_count += 1;
            self.current_target = self.furthest_marker(world, &key)?;
            info!(room, "un-backtrack: resuming forward progress");
            return Ok(Transition::UnBacktrack);
        }

        if seen_before && !first_room {
            self.backtrack_stack.push(previous_room);
        }

        if !self.backtrack_stack.is_empty() {
            // Off the path; steer back toward known territory
            self.backtrack_penalty_pending = true;
            self.current_target = self.closest_marker(world, &key)?;
            info!(room, depth = self.backtrack_stack.len(), "backtracking");
            return Ok(Transition::Backtrack);
        }

        // Forward: the very first room, or unseen territory past the
        // furthest point reached
        if !seen_before && !first_room {
            self.forward_reward_pending = true;
            self.finished_level_count += 1;
        }
        self.seen_rooms.insert(room.clone());
        self.current_target = self.furthest_marker(world, &key)?;
        info!(room, target = ?self.current_target, "forward progress");
        Ok(Transition::Forward)
    }

    /// Consume the pending forward-progress flag
    pub fn take_forward_reward(&mut self) -> bool {
        std::mem::take(&mut self.forward_reward_pending)
    }

    /// Consume the pending un-backtrack flag
    pub fn take_unbacktrack_reward(&mut self) -> bool {
        std::mem::take(&mut self.unbacktrack_reward_pending)
    }

    /// Consume the pending backtrack-penalty flag
    pub fn take_backtrack_penalty(&mut self) -> bool {
        std::mem::take(&mut self.backtrack_penalty_pending)
    }

    /// Validate a candidate drawn from the seeded completion order. A
    /// candidate identical to the current target means the order loops back
    /// on itself and the waypoint graph is corrupt.
    pub fn next_ordered_target(&self, key: &LevelKey, candidate: Vec2) -> Result<Vec2> {
        if candidate == self.current_target && candidate != Vec2::ZERO {
            warn!(?candidate, "next waypoint equals current waypoint");
            return Err(BridgeError::WaypointGraph(format!(
                "next target for {}/{} equals current target {:?}",
                key.map, key.room, candidate
            )));
        }
        Ok(candidate)
    }

    /// Ordered position of a room in the seeded completion order
    pub fn completion_index(&self, key: &LevelKey) -> Option<usize> {
        self.completion_order.iter().position(|k| k == key)
    }

    /// Marker/seed candidate for the next room after `key` in the seeded
    /// completion order, if one can be resolved
    fn ordered_fallback(&self, world: &impl WorldView, key: &LevelKey) -> Result<Option<Vec2>> {
        let Some(index) = self.completion_index(key) else {
            return Ok(None);
        };
        let Some(next) = self.completion_order.get(index + 1) else {
            return Ok(None);
        };
        let candidate = world
            .markers(&next.room)
            .into_iter()
            .next()
            .or_else(|| {
                self.legacy_targets
                    .get(&next.room)
                    .and_then(|seeded| seeded.first().copied())
            });
        match candidate {
            Some(candidate) => self.next_ordered_target(key, candidate).map(Some),
            None => Ok(None),
        }
    }

    fn markers_for(&mut self, world: &impl WorldView, key: &LevelKey) -> Result<Vec<Vec2>> {
        if let Some(found) = self.marker_cache.get(&key.room) {
            return Ok(found.clone());
        }
        let mut found = world.markers(&key.room);
        if found.is_empty() {
            // No markers discovered yet; seed from the legacy log if any
            if let Some(seeded) = self.legacy_targets.get(&key.room) {
                found = seeded.clone();
            }
        }
        if found.is_empty() {
            // Still nothing; steer toward the next room in the seeded
            // completion order
            if let Some(next) = self.ordered_fallback(world, key)? {
                found = vec![next];
            }
        }
        self.marker_cache.insert(key.room.clone(), found.clone());
        Ok(found)
    }

    fn closest_marker(&mut self, world: &impl WorldView, key: &LevelKey) -> Result<Vec2> {
        let Some(player) = world.player() else {
            return Ok(self.current_target);
        };
        Ok(self
            .markers_for(world, key)?
            .into_iter()
            .min_by(|a, b| {
                player
                    .position
                    .distance(*a)
                    .total_cmp(&player.position.distance(*b))
            })
            .unwrap_or(self.current_target))
    }

    fn furthest_marker(&mut self, world: &impl WorldView, key: &LevelKey) -> Result<Vec2> {
        let Some(player) = world.player() else {
            return Ok(self.current_target);
        };
        Ok(self
            .markers_for(world, key)?
            .into_iter()
            .max_by(|a, b| {
                player
                    .position
                    .distance(*a)
                    .total_cmp(&player.position.distance(*b))
            })
            .unwrap_or(self.current_target))
    }
}

impl Default for WaypointTracker {
    fn default() -> Self {
        Self::new()
    }
}
