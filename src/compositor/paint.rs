use image::{imageops, RgbaImage};

use super::{grid::TileGrid, DoorState};
use crate::format::tis::TileDecoder;

/// Blit one decoded tile into the canvas at its grid position
fn blit_tile(
    canvas: &mut RgbaImage,
    scratch: &mut RgbaImage,
    decoder: &mut dyn TileDecoder,
    grid: &TileGrid,
    linear_index: u32,
    tile: u32,
) -> bool {
    if grid.width == 0 {
        return false;
    }
    if let Err(e) = decoder.decode_tile(tile, scratch) {
        log::warn!("Cell {}: {}", linear_index, e);
        return false;
    }
    let x = (linear_index % grid.width) * decoder.tile_width();
    let y = (linear_index / grid.width) * decoder.tile_height();
    imageops::replace(canvas, scratch, x as i64, y as i64);
    true
}

/// Paint every cell of the grid with its primary tile. Returns the number of painted cells.
pub fn paint_grid(grid: &TileGrid, decoder: &mut dyn TileDecoder, canvas: &mut RgbaImage) -> usize {
    let mut scratch = RgbaImage::new(decoder.tile_width(), decoder.tile_height());
    let mut painted = 0;
    for cell in &grid.cells {
        if blit_tile(canvas, &mut scratch, decoder, grid, cell.linear_index, cell.primary_tile) {
            painted += 1;
        }
    }
    log::debug!("Painted {}/{} cells", painted, grid.cells.len());
    painted
}

/// Redraw door-affected cells for the given door state.
///
/// Closed doors use a cell's secondary tile when it has one; everything else uses the
/// primary tile, so painting `Open` restores the base map.
pub fn paint_doors(grid: &TileGrid, decoder: &mut dyn TileDecoder, canvas: &mut RgbaImage, state: DoorState) -> usize {
    let mut scratch = RgbaImage::new(decoder.tile_width(), decoder.tile_height());
    let mut painted = 0;
    for &door_tile in &grid.door_tiles {
        let Some(cell) = grid.find_cell(door_tile) else {
            log::debug!("Door tile {} is outside the grid", door_tile);
            continue;
        };
        let tile = match (state, cell.secondary_tile) {
            (DoorState::Closed, Some(secondary)) => secondary,
            _ => cell.primary_tile,
        };
        if blit_tile(canvas, &mut scratch, decoder, grid, cell.linear_index, tile) {
            painted += 1;
        }
    }
    painted
}
