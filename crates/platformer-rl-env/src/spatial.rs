//! Bounded, recenterable tile/entity classification cache
//!
//! The cache is a fixed backing store addressed through a movable origin:
//! array index = tile coordinate + origin. Queries that fall outside the
//! window recenter the origin around the missed coordinate, preserving the
//! overlap region. The tile layer survives until the level object changes;
//! the entity layer is rebuilt at most once every configured number of
//! frames.

use platformer_rl_core::{Category, TilePoint};
use tracing::debug;

use crate::world::{WorldView, PIXELS_PER_TILE};

pub struct SpatialEntityCache {
    width: usize,
    height: usize,
    max_width: usize,
    max_height: usize,
    /// Added to a tile coordinate to produce an array index. Kept in i64
    /// so translation cannot overflow for any i32 tile coordinate.
    origin_x: i64,
    origin_y: i64,
    tiles: Vec<Category>,
    entities: Vec<u8>,
    refresh_frames: u32,
    frames_until_entity_wipe: u32,
    level_generation: Option<u64>,
}

impl SpatialEntityCache {
    /// Cache spanning the full configured extent from the start
    pub fn new(max_width: usize, max_height: usize, refresh_frames: u32) -> SpatialEntityCache {
        Self::with_extent(max_width, max_height, max_width, max_height, refresh_frames)
    }

    /// Cache starting smaller than its configured maximum; [`grow`] doubles
    /// it toward the bound.
    ///
    /// [`grow`]: SpatialEntityCache::grow
    pub fn with_extent(
        width: usize,
        height: usize,
        max_width: usize,
        max_height: usize,
        refresh_frames: u32,
    ) -> SpatialEntityCache {
        let width = width.min(max_width);
        let height = height.min(max_height);
        SpatialEntityCache {
            width,
            height,
            max_width,
            max_height,
            origin_x: (width / 2) as i64,
            origin_y: (height / 2) as i64,
            tiles: vec![Category::Unset; width * height],
            entities: vec![0; width * height],
            refresh_frames,
            frames_until_entity_wipe: refresh_frames,
            level_generation: None,
        }
    }

    /// Current window extent in tiles
    pub fn extent(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Classify a world tile coordinate. Never fails: coordinates the
    /// window cannot represent resolve to `Unset`, coordinates with no
    /// resolvable scene resolve to `Air`.
    pub fn classify(&mut self, world: &impl WorldView, tile: TilePoint) -> Category {
        self.wipe_tiles_if_level_changed(world);

        let Some((x, y)) = self.index_of(tile).or_else(|| {
            self.recenter(tile);
            self.index_of(tile)
        }) else {
            return Category::Unset;
        };

        if self.tiles[y * self.width + x] == Category::Unset {
            let solid = world
                .level_generation()
                .is_some_and(|_| world.solid_intersects(world.tile_footprint(tile)));
            self.tiles[y * self.width + x] = if solid { Category::Tile } else { Category::Air };
        }

        let tile_layer = self.tiles[y * self.width + x];
        let entity_code = self.entities[y * self.width + x];
        if tile_layer != Category::Tile && entity_code != 0 {
            Category::from_code(entity_code)
        } else {
            tile_layer
        }
    }

    /// Per-frame maintenance: invalidate the tile layer on level change and
    /// rebuild the entity layer when its refresh interval elapses.
    pub fn refresh(&mut self, world: &impl WorldView) {
        self.wipe_tiles_if_level_changed(world);
        self.cache_entities(world);
    }

    /// Double both extents, bounded by the configured maximum. Past the
    /// bound this is a no-op. Previously classified cells keep their
    /// category at the same world coordinate.
    pub fn grow(&mut self) {
        let new_width = self.width * 2;
        let new_height = self.height * 2;
        if new_width > self.max_width || new_height > self.max_height {
            return;
        }

        let mut tiles = vec![Category::Unset; new_width * new_height];
        let mut entities = vec![0u8; new_width * new_height];
        let xoff = self.origin_x as usize;
        let yoff = self.origin_y as usize;
        for y in 0..self.height {
            for x in 0..self.width {
                tiles[(yoff + y) * new_width + xoff + x] = self.tiles[y * self.width + x];
                entities[(yoff + y) * new_width + xoff + x] = self.entities[y * self.width + x];
            }
        }

        debug!(
            from = self.width,
            to = new_width,
            "growing spatial cache extent"
        );
        self.width = new_width;
        self.height = new_height;
        self.tiles = tiles;
        self.entities = entities;
        self.origin_x *= 2;
        self.origin_y *= 2;
    }

    /// Shift the addressing origin so `tile` lands at the window center,
    /// copying every entry whose translated position stays in range.
    fn recenter(&mut self, tile: TilePoint) {
        let new_origin_x = (self.width / 2) as i64 - tile.x as i64;
        let new_origin_y = (self.height / 2) as i64 - tile.y as i64;
        let shift_x = new_origin_x - self.origin_x;
        let shift_y = new_origin_y - self.origin_y;

        let mut tiles = vec![Category::Unset; self.width * self.height];
        let mut entities = vec![0u8; self.width * self.height];
        for y in 0..self.height as i64 {
            let ny = y + shift_y;
            if ny < 0 || ny >= self.height as i64 {
                continue;
            }
            for x in 0..self.width as i64 {
                let nx = x + shift_x;
                if nx < 0 || nx >= self.width as i64 {
                    continue;
                }
                tiles[(ny as usize) * self.width + nx as usize] =
                    self.tiles[(y as usize) * self.width + x as usize];
                entities[(ny as usize) * self.width + nx as usize] =
                    self.entities[(y as usize) * self.width + x as usize];
            }
        }

        debug!(tile.x, tile.y, shift_x, shift_y, "recentering spatial cache");
        self.tiles = tiles;
        self.entities = entities;
        self.origin_x = new_origin_x;
        self.origin_y = new_origin_y;
    }

    /// Rebuild the entity layer by voxelizing live collider bounds onto the
    /// grid, at most once per refresh interval.
    fn cache_entities(&mut self, world: &impl WorldView) {
        if self.frames_until_entity_wipe > 0 {
            self.frames_until_entity_wipe -= 1;
            return;
        }
        self.frames_until_entity_wipe = self.refresh_frames;

        self.entities.fill(0);
        for entity in world.entities() {
            let bounds = entity.bounds;
            // Colliders flush with a grid line belong to the cell on the
            // far side of it.
            let mut px = bounds.left as i32;
            if px % PIXELS_PER_TILE == 0 {
                px += 1;
            }
            while (px as f32) < bounds.right() {
                let mut py = bounds.top as i32;
                if py % PIXELS_PER_TILE == 0 {
                    py += 1;
                }
                while (py as f32) < bounds.bottom() {
                    let tile = world.tile_at(platformer_rl_core::Vec2::new(px as f32, py as f32));
                    let index = self.index_of(tile).or_else(|| {
                        self.recenter(tile);
                        self.index_of(tile)
                    });
                    if let Some((x, y)) = index {
                        self.entities[y * self.width + x] = entity.kind.code();
                    }
                    py += PIXELS_PER_TILE;
                }
                px += PIXELS_PER_TILE;
            }
        }
    }

    fn wipe_tiles_if_level_changed(&mut self, world: &impl WorldView) {
        let generation = world.level_generation();
        if generation != self.level_generation {
            self.level_generation = generation;
            self.tiles.fill(Category::Unset);
        }
    }

    fn index_of(&self, tile: TilePoint) -> Option<(usize, usize)> {
        let x = tile.x as i64 + self.origin_x;
        let y = tile.y as i64 + self.origin_y;
        if x < 0 || x >= self.width as i64 || y < 0 || y >= self.height as i64 {
            None
        } else {
            Some((x as usize, y as usize))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_world::{GridWorld, RoomSpec};

    fn world_with_wall() -> GridWorld {
        // Solid column at tile x=2, spikes entity at tile (5, 1)
        let room = RoomSpec::new(
            "a1",
            &[
                "..#.....", //
                "..#..s..",
                "..#.....",
            ],
        );
        GridWorld::new("map", vec![room])
    }

    #[test]
    fn classify_never_fails_and_is_total() {
        let world = world_with_wall();
        let mut cache = SpatialEntityCache::new(64, 64, 0);
        for x in -200..200 {
            for y in -200..200 {
                let category = cache.classify(&world, TilePoint::new(x, y));
                assert_ne!(category, Category::Unset);
            }
        }
        // The full i32 range is reachable: float positions saturate when
        // converted to tile coordinates
        for extreme in [
            TilePoint::new(i32::MAX, 0),
            TilePoint::new(i32::MIN, 0),
            TilePoint::new(i32::MAX, i32::MIN),
            TilePoint::new(i32::MIN, i32::MAX),
        ] {
            let category = cache.classify(&world, extreme);
            assert_ne!(category, Category::Unset);
        }
    }

    #[test]
    fn solid_and_air_classification() {
        let world = world_with_wall();
        let mut cache = SpatialEntityCache::new(64, 64, 0);
        assert_eq!(cache.classify(&world, TilePoint::new(2, 1)), Category::Tile);
        assert_eq!(cache.classify(&world, TilePoint::new(0, 0)), Category::Air);
    }

    #[test]
    fn entity_layer_appears_after_refresh() {
        let world = world_with_wall();
        let mut cache = SpatialEntityCache::new(64, 64, 0);
        assert_eq!(cache.classify(&world, TilePoint::new(5, 1)), Category::Air);
        cache.refresh(&world);
        assert_eq!(
            cache.classify(&world, TilePoint::new(5, 1)),
            Category::Spikes
        );
    }

    #[test]
    fn entity_refresh_respects_interval() {
        let world = world_with_wall();
        let mut cache = SpatialEntityCache::new(64, 64, 3);
        // Interval counts down; the first rebuilds happen on the 4th call
        cache.refresh(&world);
        cache.refresh(&world);
        cache.refresh(&world);
        assert_eq!(cache.classify(&world, TilePoint::new(5, 1)), Category::Air);
        cache.refresh(&world);
        assert_eq!(
            cache.classify(&world, TilePoint::new(5, 1)),
            Category::Spikes
        );
    }

    #[test]
    fn recenter_keeps_overlap_and_absorbs_repeat_queries() {
        let world = world_with_wall();
        let mut cache = SpatialEntityCache::new(1000, 1000, 0);
        // Warm a cell inside the initial window
        assert_eq!(
            cache.classify(&world, TilePoint::new(100, 100)),
            Category::Air
        );
        // Far query forces a recenter
        let far = TilePoint::new(2000, 500);
        assert_eq!(cache.classify(&world, far), Category::Air);
        // Repeat query resolves without another recenter (index is in range)
        assert!(cache.index_of(far).is_some());
        assert_eq!(cache.classify(&world, far), Category::Air);
        // The warmed cell is out of the new window
        assert!(cache.index_of(TilePoint::new(100, 100)).is_none());
    }

    #[test]
    fn recenter_preserves_classified_overlap() {
        let world = world_with_wall();
        let mut cache = SpatialEntityCache::with_extent(32, 32, 32, 32, 0);
        let solid = TilePoint::new(2, 1);
        assert_eq!(cache.classify(&world, solid), Category::Tile);
        // Recenter a short hop away; (2, 1) stays inside the new window
        cache.recenter(TilePoint::new(10, 9));
        // Read the stored layer directly so the world cannot re-resolve it
        let (x, y) = cache.index_of(solid).unwrap();
        assert_eq!(cache.tiles[y * cache.width + x], Category::Tile);
    }

    #[test]
    fn grow_doubles_up_to_maximum() {
        let world = world_with_wall();
        let mut cache = SpatialEntityCache::with_extent(16, 16, 64, 64, 0);
        let solid = TilePoint::new(2, 1);
        assert_eq!(cache.classify(&world, solid), Category::Tile);
        cache.grow();
        assert_eq!(cache.extent(), (32, 32));
        // Grown cache still answers from the carried-over layer
        assert_eq!(cache.classify(&world, solid), Category::Tile);
        cache.grow();
        assert_eq!(cache.extent(), (64, 64));
        cache.grow();
        assert_eq!(cache.extent(), (64, 64));
    }

    #[test]
    fn tile_layer_wiped_on_level_change() {
        let mut world = world_with_wall();
        let mut cache = SpatialEntityCache::new(64, 64, 0);
        let solid = TilePoint::new(2, 1);
        assert_eq!(cache.classify(&world, solid), Category::Tile);
        world.bump_level_generation();
        // Any query after the change wipes the stored layer
        cache.classify(&world, TilePoint::new(0, 0));
        let (x, y) = cache.index_of(solid).unwrap();
        assert_eq!(cache.tiles[y * cache.width + x], Category::Unset);
        // The wiped cell re-resolves from the live geometry
        assert_eq!(cache.classify(&world, solid), Category::Tile);
    }

    #[test]
    fn unloaded_world_resolves_to_air() {
        let mut world = world_with_wall();
        world.unload();
        let mut cache = SpatialEntityCache::new(64, 64, 0);
        assert_eq!(cache.classify(&world, TilePoint::new(2, 1)), Category::Air);
    }
}
