//! Tile/entity classification categories

use serde::{Deserialize, Serialize};

/// Classification of a single tile cell as seen by the agent.
///
/// Ordinal values are part of the observation encoding for one running
/// session; they are not stable across versions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Category {
    /// Not yet classified
    #[default]
    Unset = 0,
    /// Empty space
    Air = 1,
    /// Static solid tile
    Tile = 2,
    /// The tracked player character
    Player = 3,
    /// The current waypoint target
    Target = 4,
    /// Collidable entity with no dedicated kind
    Other = 5,
    Spring = 6,
    Strawberry = 7,
    Spikes = 8,
    ZipMover = 9,
    CrumblePlatform = 10,
    DashBlock = 11,
    FakeWall = 12,
    Refill = 13,
    RespawnTrigger = 14,
    FallingBlock = 15,
    BridgeTile = 16,
    Npc = 17,
    JumpthruPlatform = 18,
}

impl Category {
    /// Numeric code used in the flat vision encoding
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a numeric cell value, falling back to `Other` for codes
    /// produced by entity kinds this build does not know about.
    pub fn from_code(code: u8) -> Category {
        match code {
            0 => Category::Unset,
            1 => Category::Air,
            2 => Category::Tile,
            3 => Category::Player,
            4 => Category::Target,
            5 => Category::Other,
            6 => Category::Spring,
            7 => Category::Strawberry,
            8 => Category::Spikes,
            9 => Category::ZipMover,
            10 => Category::CrumblePlatform,
            11 => Category::DashBlock,
            12 => Category::FakeWall,
            13 => Category::Refill,
            14 => Category::RespawnTrigger,
            15 => Category::FallingBlock,
            16 => Category::BridgeTile,
            17 => Category::Npc,
            18 => Category::JumpthruPlatform,
            _ => Category::Other,
        }
    }

    /// Whether this cell holds a live entity rather than level geometry
    pub fn is_entity(self) -> bool {
        self.code() >= Category::Other.code()
    }
}
