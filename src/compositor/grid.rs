//! Tile grid of the primary overlay.
//!
//! Each cell is resolved through two tables: its tilemap entry names a slot in the tile
//! lookup table, and that slot holds the tile number to decode.

use crate::format::{wed::NO_SECONDARY_TILE, StructKind};
use crate::index::{CategoryKey, StructureIndex};

const TILEMAP_SIZE: u64 = 10;
const TILE_INDEX_SIZE: u64 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileCell {
    /// Row-major position, `y * width + x`
    pub linear_index: u32,
    pub primary_tile: u32,
    pub secondary_tile: Option<u32>,
    /// Lowest set bit of the tilemap's draw-overlays mask
    pub overlay_bit: Option<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<TileCell>,
    /// Tilemap indices of every door-affected cell, across all doors
    pub door_tiles: Vec<u32>,
}

impl TileGrid {
    pub fn build(index: &StructureIndex) -> TileGrid {
        let Some(overlay) = index.index(CategoryKey::wed(StructKind::Overlay)).first() else {
            return TileGrid::default();
        };
        let width = overlay.unsigned("Width").unwrap_or(0);
        let height = overlay.unsigned("Height").unwrap_or(0);
        let tilemap_base = overlay.unsigned("Tilemap offset").unwrap_or(0) as u64;
        let lookup_base = overlay.unsigned("Tilemap lookup offset").unwrap_or(0) as u64;

        let mut fallbacks = 0;
        let cells = (0..width * height)
            .map(|i| {
                let cell = resolve_cell(index, i, tilemap_base, lookup_base);
                cell.unwrap_or_else(|| {
                    fallbacks += 1;
                    TileCell {
                        linear_index: i,
                        primary_tile: i,
                        secondary_tile: None,
                        overlay_bit: None,
                    }
                })
            })
            .collect();
        if fallbacks > 0 {
            log::warn!("{} of {} cells fell back to their own index", fallbacks, width * height);
        }

        let door_tiles = index
            .index(CategoryKey::wed(StructKind::DoorTile))
            .iter()
            .filter_map(|t| t.unsigned("Tilemap index"))
            .collect();

        TileGrid {
            width,
            height,
            cells,
            door_tiles,
        }
    }

    pub fn pixel_size(&self, tile_width: u32, tile_height: u32) -> (u32, u32) {
        (self.width * tile_width, self.height * tile_height)
    }

    /// Cell for a door tile: direct position first, then a scan for grids not in row-major order
    pub fn find_cell(&self, linear_index: u32) -> Option<&TileCell> {
        match self.cells.get(linear_index as usize) {
            Some(cell) if cell.linear_index == linear_index => Some(cell),
            _ => self.cells.iter().find(|c| c.linear_index == linear_index),
        }
    }
}

fn resolve_cell(index: &StructureIndex, i: u32, tilemap_base: u64, lookup_base: u64) -> Option<TileCell> {
    let tilemap = index.index_by_offset(
        CategoryKey::wed(StructKind::Tilemap),
        tilemap_base + i as u64 * TILEMAP_SIZE,
    )?;
    let slot = tilemap.unsigned("Primary tile index")? as u64;
    let lookup = index.index_by_offset(
        CategoryKey::wed(StructKind::TileIndex),
        lookup_base + slot * TILE_INDEX_SIZE,
    )?;
    let primary_tile = u32::try_from(lookup.signed("Tile index")?).ok()?;

    let secondary_tile = tilemap
        .unsigned("Secondary tile")
        .filter(|&t| t != NO_SECONDARY_TILE);
    let mask = tilemap.unsigned("Draw overlays").unwrap_or(0) as u8;
    let overlay_bit = (mask != 0).then(|| mask.trailing_zeros() as u8);

    Some(TileCell {
        linear_index: i,
        primary_tile,
        secondary_tile,
        overlay_bit,
    })
}
