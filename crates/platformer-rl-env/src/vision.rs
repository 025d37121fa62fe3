//! Viewport-anchored vision sampling
//!
//! Once per decision tick the sampler reads a fixed grid of tiles starting
//! at the camera's top-left corner, one classification per cell, and marks
//! the cell the player occupies.

use platformer_rl_core::{Category, TilePoint, Vec2, VisionFrame};

use crate::spatial::SpatialEntityCache;
use crate::world::WorldView;

/// Vertical offset from the player origin to the sampled body point, in
/// pixels. The player origin sits at the feet; sampling slightly above it
/// lands inside the body tile.
const PLAYER_SAMPLE_OFFSET_Y: f32 = 4.0;

pub struct VisionSampler {
    width: usize,
    height: usize,
}

impl VisionSampler {
    pub fn new(width: usize, height: usize) -> VisionSampler {
        VisionSampler { width, height }
    }

    /// Sample one frame. Runs the cache's per-frame maintenance first, so
    /// the entity layer is at most one refresh interval stale. With no
    /// camera (scene not loaded) every cell stays `Unset`.
    pub fn sample(
        &self,
        world: &impl WorldView,
        cache: &mut SpatialEntityCache,
    ) -> VisionFrame {
        cache.refresh(world);

        let mut frame = VisionFrame::new(self.width, self.height);
        let Some(camera) = world.camera() else {
            return frame;
        };
        let anchor = world.tile_at(camera.position);
        let player_tile = world.player().map(|p| {
            world.tile_at(Vec2::new(
                p.position.x,
                p.position.y - PLAYER_SAMPLE_OFFSET_Y,
            ))
        });

        for row in 0..self.height {
            for col in 0..self.width {
                let tile = TilePoint::new(anchor.x + col as i32, anchor.y + row as i32);
                let category = if player_tile == Some(tile) {
                    Category::Player
                } else {
                    cache.classify(world, tile)
                };
                frame.set(col, row, category);
            }
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_world::{GridWorld, RoomSpec};

    fn sampler_world() -> GridWorld {
        GridWorld::new(
            "demo",
            vec![RoomSpec::new(
                "a1",
                &[
                    "........",
                    "...s....",
                    "........",
                    "########",
                ],
            )],
        )
    }

    #[test]
    fn player_cell_is_marked() {
        let world = sampler_world();
        let mut cache = SpatialEntityCache::new(64, 64, 10);
        let sampler = VisionSampler::new(20, 20);

        let frame = sampler.sample(&world, &mut cache);
        let found = (0..20)
            .flat_map(|y| (0..20).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.get(x, y) == Category::Player)
            .count();
        assert_eq!(found, 1);
    }

    #[test]
    fn grid_is_anchored_at_the_camera_corner() {
        let world = sampler_world();
        let mut cache = SpatialEntityCache::new(64, 64, 10);
        let sampler = VisionSampler::new(20, 20);

        let frame = sampler.sample(&world, &mut cache);
        let camera = world.camera().unwrap();
        let anchor = world.tile_at(camera.position);

        // Bottom solid row of the room lands where the anchor predicts.
        let solid_row = (3 - anchor.y) as usize;
        let solid_col = (0 - anchor.x) as usize;
        assert_eq!(frame.get(solid_col, solid_row), Category::Tile);
    }

    #[test]
    fn entities_appear_in_the_frame() {
        let world = sampler_world();
        // Zero interval so the first refresh already voxelizes entities.
        let mut cache = SpatialEntityCache::new(64, 64, 0);
        let sampler = VisionSampler::new(20, 20);

        let frame = sampler.sample(&world, &mut cache);
        let camera = world.camera().unwrap();
        let anchor = world.tile_at(camera.position);
        let col = (3 - anchor.x) as usize;
        let row = (1 - anchor.y) as usize;
        assert_eq!(frame.get(col, row), Category::Spikes);
    }

    #[test]
    fn unloaded_scene_yields_unset_cells() {
        let mut world = sampler_world();
        world.unload();
        let mut cache = SpatialEntityCache::new(64, 64, 10);
        let sampler = VisionSampler::new(4, 4);

        let frame = sampler.sample(&world, &mut cache);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(frame.get(x, y), Category::Unset);
            }
        }
    }
}
