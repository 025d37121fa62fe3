//! Observation types sent to the external agent

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::geometry::Vec2;

/// A fixed-size categorical grid sampled around the viewport once per
/// decision tick. Stored flat, row-major.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisionFrame {
    pub width: usize,
    pub height: usize,
    cells: Vec<u8>,
}

impl VisionFrame {
    pub fn new(width: usize, height: usize) -> VisionFrame {
        VisionFrame {
            width,
            height,
            cells: vec![Category::Unset.code(); width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Category {
        Category::from_code(self.cells[y * self.width + x])
    }

    pub fn set(&mut self, x: usize, y: usize, category: Category) {
        self.cells[y * self.width + x] = category.code();
    }

    /// Raw encoded cells, row-major
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }
}

/// Everything the agent sees for one decision tick. Immutable once
/// constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    /// Categorical vision grid centered on the viewport
    pub vision: VisionFrame,

    /// Player velocity in pixels per frame
    pub speed: Vec2,

    /// Stamina normalized to 0..1
    pub stamina: f32,

    /// Whether a dash is currently available
    pub can_dash: bool,

    /// Player died this tick
    pub death: bool,

    /// Player finished a level this tick
    pub finished_level: bool,

    /// Player is climbing
    pub climbing: bool,

    /// Player is standing on ground
    pub on_ground: bool,

    /// Current waypoint target in tile coordinates
    pub target: Vec2,

    /// Player position in tile coordinates
    pub position: Vec2,

    /// Camera position in world pixels
    pub screen_position: Vec2,
}

/// Stamina range used by the host game
const STAMINA_MIN: f32 = -1.0;
const STAMINA_MAX: f32 = 120.0;

/// Normalize raw stamina into 0..1
pub fn normalize_stamina(raw: f32) -> f32 {
    ((raw - STAMINA_MIN) / (STAMINA_MAX - STAMINA_MIN)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vision_frame_get_set() {
        let mut frame = VisionFrame::new(4, 3);
        assert_eq!(frame.get(3, 2), Category::Unset);
        frame.set(3, 2, Category::Spikes);
        assert_eq!(frame.get(3, 2), Category::Spikes);
        assert_eq!(frame.cells().len(), 12);
    }

    #[test]
    fn stamina_normalization_clamps() {
        assert_eq!(normalize_stamina(-1.0), 0.0);
        assert_eq!(normalize_stamina(120.0), 1.0);
        assert_eq!(normalize_stamina(500.0), 1.0);
        let mid = normalize_stamina(59.5);
        assert!((mid - 0.5).abs() < 1e-6);
    }
}
