use serde::{
    Deserialize,
    Serialize,
};

pub const CHUNK_SIZE: usize = 5;
pub const CHUNK_CELLS: usize = CHUNK_SIZE * CHUNK_SIZE;

pub const VOID_TILE: u8 = 0;
pub const NO_DECORATION: u8 = 0;

const TILE_NAMES: [&str; 19] = [
    "land_1",
    "barrier_1",
    "cliff_1",
    "cliff_2",
    "cliff_3",
    "cliff_4",
    "cliff_5",
    "cliff_6",
    "cliff_7",
    "cliff_8",
    "cliff_9",
    "cliff_10",
    "cliff_12",
    "cliff_13",
    "cliff_14",
    "cliff_16",
    "cliff_17",
    "cliff_18",
    "cliff_19",
];

pub const MAX_TILE_ID: u8 = TILE_NAMES.len() as u8;

/// Decoration codes 1..=DECORATION_COUNT are defined.
pub const DECORATION_COUNT: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// walkable, the only kind a key or a player can be placed on
    Ground,
    Barrier,
    /// falling in ends the run
    Abyss,
}

impl TileKind {
    pub fn glyph(self) -> char {
        match self {
            TileKind::Ground => '.',
            TileKind::Barrier => '#',
            TileKind::Abyss => '~',
        }
    }
}

pub fn tile_name(id: u8) -> Option<&'static str> {
    let index = usize::from(id).checked_sub(1)?;
    TILE_NAMES.get(index).copied()
}

pub fn tile_kind(id: u8) -> Option<TileKind> {
    let name = tile_name(id)?;
    if name.starts_with("cliff_") {
        Some(TileKind::Abyss)
    } else if name.starts_with("barrier_") {
        Some(TileKind::Barrier)
    } else {
        Some(TileKind::Ground)
    }
}

pub fn is_walkable(id: u8) -> bool {
    tile_kind(id) == Some(TileKind::Ground)
}

pub fn is_blocking(id: u8) -> bool {
    matches!(tile_kind(id), Some(TileKind::Barrier | TileKind::Abyss))
}

pub fn normalize_tile(id: u8) -> u8 {
    if tile_kind(id).is_some() { id } else { VOID_TILE }
}

pub fn normalize_decoration(id: u8) -> u8 {
    if (1..=DECORATION_COUNT).contains(&id) {
        id
    } else {
        NO_DECORATION
    }
}
