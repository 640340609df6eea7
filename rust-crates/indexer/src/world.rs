//! Client-side composition of a world from its on-chain chunks.

use crate::tiles::{
    self,
    CHUNK_CELLS,
    CHUNK_SIZE,
    NO_DECORATION,
    VOID_TILE,
};
use chain::{
    ObjectId,
    fields,
};
use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

/// Chunks further out than this on either axis are ignored when composing a grid.
pub const MAX_CHUNK_COORD: u32 = 255;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoords {
    pub cx: u32,
    pub cy: u32,
}

impl ChunkCoords {
    /// Reads `{cx, cy}` from a dynamic field key, wrapped or bare.
    pub fn from_key(value: &Value) -> Option<Self> {
        let fields = fields::normalize_fields(value)?;
        let coord = |name: &str| {
            fields::field(fields, &[name])
                .and_then(fields::parse_u64)
                .and_then(|v| u32::try_from(v).ok())
        };
        Some(Self {
            cx: coord("cx")?,
            cy: coord("cy")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub coords: ChunkCoords,
    pub tiles: [u8; CHUNK_CELLS],
    pub decorations: [u8; CHUNK_CELLS],
}

impl Chunk {
    /// Builds a chunk from its Move fields. Codes are clamped to a byte and
    /// normalized; missing cells are void.
    pub fn from_fields(coords: ChunkCoords, value: &Value) -> Self {
        let mut tiles = [VOID_TILE; CHUNK_CELLS];
        let mut decorations = [NO_DECORATION; CHUNK_CELLS];
        if let Some(record) = fields::normalize_fields(value) {
            let raw_tiles = record.get("tiles").map(fields::vector).unwrap_or(&[]);
            for (cell, raw) in tiles.iter_mut().zip(raw_tiles) {
                *cell = tiles::normalize_tile(fields::clamped_u8(raw));
            }
            let raw_decorations = record
                .get("decorations")
                .map(fields::vector)
                .unwrap_or(&[]);
            for (cell, raw) in decorations.iter_mut().zip(raw_decorations) {
                *cell = tiles::normalize_decoration(fields::clamped_u8(raw));
            }
        }
        Self {
            coords,
            tiles,
            decorations,
        }
    }

    pub fn tile(&self, x: usize, y: usize) -> u8 {
        self.tiles[y * CHUNK_SIZE + x]
    }
}

/// Row-major tile and decoration layers of a composed world. Both layers always hold
/// exactly `width * height` cells; decoding rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawWorldGrid")]
pub struct WorldGrid {
    width: usize,
    height: usize,
    tiles: Vec<u8>,
    decorations: Vec<u8>,
}

#[derive(Deserialize)]
struct RawWorldGrid {
    width: usize,
    height: usize,
    tiles: Vec<u8>,
    decorations: Vec<u8>,
}

impl TryFrom<RawWorldGrid> for WorldGrid {
    type Error = String;

    fn try_from(raw: RawWorldGrid) -> Result<Self, Self::Error> {
        let cells = raw
            .width
            .checked_mul(raw.height)
            .ok_or_else(|| format!("grid {}x{} overflows", raw.width, raw.height))?;
        if raw.tiles.len() != cells || raw.decorations.len() != cells {
            return Err(format!(
                "grid {}x{} needs {cells} cells, got {} tiles and {} decorations",
                raw.width,
                raw.height,
                raw.tiles.len(),
                raw.decorations.len()
            ));
        }
        Ok(Self {
            width: raw.width,
            height: raw.height,
            tiles: raw.tiles,
            decorations: raw.decorations,
        })
    }
}

impl WorldGrid {
    pub fn compose(chunks: &[Chunk]) -> Self {
        let placed: Vec<&Chunk> = chunks
            .iter()
            .filter(|chunk| {
                let in_range = chunk.coords.cx <= MAX_CHUNK_COORD
                    && chunk.coords.cy <= MAX_CHUNK_COORD;
                if !in_range {
                    tracing::warn!(
                        cx = chunk.coords.cx,
                        cy = chunk.coords.cy,
                        "skipping chunk outside the world bounds"
                    );
                }
                in_range
            })
            .collect();
        let Some(max_cx) = placed.iter().map(|chunk| chunk.coords.cx).max() else {
            return Self::default();
        };
        let max_cy = placed.iter().map(|chunk| chunk.coords.cy).max().unwrap_or(0);
        let width = (max_cx as usize + 1) * CHUNK_SIZE;
        let height = (max_cy as usize + 1) * CHUNK_SIZE;
        let mut grid = Self {
            width,
            height,
            tiles: vec![VOID_TILE; width * height],
            decorations: vec![NO_DECORATION; width * height],
        };
        for chunk in placed {
            let origin_x = chunk.coords.cx as usize * CHUNK_SIZE;
            let origin_y = chunk.coords.cy as usize * CHUNK_SIZE;
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let cell = (origin_y + y) * width + origin_x + x;
                    let local = y * CHUNK_SIZE + x;
                    grid.tiles[cell] = chunk.tiles[local];
                    grid.decorations[cell] = chunk.decorations[local];
                }
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Void outside the grid.
    pub fn tile(&self, x: usize, y: usize) -> u8 {
        self.index(x, y).map_or(VOID_TILE, |i| self.tiles[i])
    }

    pub fn decoration(&self, x: usize, y: usize) -> u8 {
        self.index(x, y).map_or(NO_DECORATION, |i| self.decorations[i])
    }

    pub fn walkable_tiles(&self) -> Vec<TilePosition> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| tiles::is_walkable(**tile))
            .map(|(i, _)| TilePosition {
                x: (i % self.width) as u32,
                y: (i / self.width) as u32,
            })
            .collect()
    }

    /// Uniformly random walkable cell; `None` when the world has no ground.
    pub fn pick_key_target<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<TilePosition> {
        let candidates = self.walkable_tiles();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.random_range(0..candidates.len())])
    }

    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.tiles.chunks(self.width.max(1)) {
            out.extend(
                row.iter()
                    .map(|tile| tiles::tile_kind(*tile).map_or(' ', |kind| kind.glyph())),
            );
            out.push('\n');
        }
        out
    }
}

pub fn clamp_difficulty(raw: Option<u64>) -> u8 {
    match raw {
        Some(0) | None => MIN_DIFFICULTY,
        Some(value) => value.min(u64::from(MAX_DIFFICULTY)) as u8,
    }
}

/// A loaded world as cached locally between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMap {
    pub world_id: ObjectId,
    pub grid: WorldGrid,
    pub difficulty: u8,
    pub chunk_count: usize,
}
