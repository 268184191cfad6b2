//! # Map Compositor
//!
//! Resolves which WED backs the current map (day or extended night), builds the tile
//! grid of its primary overlay and paints the full-map bitmap from decoded tiles.
//!
//! ## Passes
//! - Base pass: every cell with its primary tile.
//! - Door pass: door-affected cells redrawn for the active door state.
//!
//! Bitmap allocations are checked before use. A failed allocation is reported as
//! [`CompositorError::ResourceExhausted`] and leaves the compositor as it was.

mod grid;
mod paint;

pub use grid::{TileCell, TileGrid};
pub use paint::{paint_doors, paint_grid};

use image::RgbaImage;
use thiserror::Error;

use crate::format::{
    are::{self, AREA_DAY_NIGHT, AREA_EXTENDED_NIGHT, LOCATION, WED_RESOURCE},
    tis::{TileDecoder, TisDecoder},
    wed, Container, FormatError, StructKind,
};
use crate::index::StructureIndex;
use crate::resource::{night_variant_name, resource_name, ResourceProvider};

#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("resource {0} not found")]
    MissingResource(String),

    #[error("failed to read {name}: {source}")]
    Format {
        name: String,
        #[source]
        source: FormatError,
    },

    #[error("not enough memory for a {width}x{height} bitmap")]
    ResourceExhausted { width: u64, height: u64 },

    #[error("invalid zoom factor {0}")]
    InvalidZoom(f32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DoorState {
    #[default]
    Open,
    Closed,
}

/// Time of day. Recorded for the caller; the compositor does not tint the bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Lighting {
    #[default]
    Day,
    Night,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariantChange {
    /// The active WED is unchanged
    Unchanged,
    /// Geometry now comes from another WED
    Switched { wed: String },
}

struct WedSet {
    container: Container,
    decoder: TisDecoder,
}

pub struct MapCompositor {
    provider: Box<dyn ResourceProvider>,
    are: Container,
    index: StructureIndex,
    day_wed: String,
    active_wed: String,
    grid: TileGrid,
    decoder: Box<dyn TileDecoder>,
    canvas: Option<RgbaImage>,
    lighting: Lighting,
    door_state: DoorState,
    zoom: f32,
}

fn read_container(
    provider: &dyn ResourceProvider,
    name: &str,
    parse: fn(&str, &[u8]) -> Result<Container, FormatError>,
) -> Result<Container, CompositorError> {
    let data = provider
        .resolve(name)
        .ok_or_else(|| CompositorError::MissingResource(name.to_string()))?;
    parse(name, &data).map_err(|source| CompositorError::Format {
        name: name.to_string(),
        source,
    })
}

fn base_name(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(base, _)| base)
}

/// Read a WED and the tileset named by its primary overlay
fn read_wed_set(provider: &dyn ResourceProvider, name: &str) -> Result<WedSet, CompositorError> {
    let container = read_container(provider, name, wed::read_wed)?;
    let tileset = container
        .root
        .children_of(StructKind::Overlay)
        .next()
        .and_then(|o| o.text("Tileset"))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| base_name(name))
        .to_string();
    let tis_name = resource_name(&tileset, "TIS");
    let data = provider
        .resolve(&tis_name)
        .ok_or_else(|| CompositorError::MissingResource(tis_name.clone()))?;
    let decoder = TisDecoder::from_bytes(data).map_err(|source| CompositorError::Format {
        name: tis_name,
        source,
    })?;
    Ok(WedSet { container, decoder })
}

/// Zeroed RGBA bitmap whose buffer is reserved fallibly
fn try_canvas(width: u64, height: u64) -> Result<RgbaImage, CompositorError> {
    let exhausted = || CompositorError::ResourceExhausted { width, height };
    if width > u32::MAX as u64 || height > u32::MAX as u64 {
        return Err(exhausted());
    }
    let len = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(exhausted)?;
    let mut buffer: Vec<u8> = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| exhausted())?;
    buffer.resize(len, 0);
    RgbaImage::from_raw(width as u32, height as u32, buffer).ok_or_else(exhausted)
}

/// Nearest-neighbour scale
fn scale(source: &RgbaImage, zoom: f32) -> Result<RgbaImage, CompositorError> {
    let zoom = zoom as f64;
    let width = (source.width() as f64 * zoom).ceil() as u64;
    let height = (source.height() as f64 * zoom).ceil() as u64;
    let mut scaled = try_canvas(width, height)?;
    for (x, y, pixel) in scaled.enumerate_pixels_mut() {
        let sx = ((x as f64 / zoom) as u32).min(source.width() - 1);
        let sy = ((y as f64 / zoom) as u32).min(source.height() - 1);
        *pixel = *source.get_pixel(sx, sy);
    }
    Ok(scaled)
}

impl MapCompositor {
    /// Load an area and the day WED it references. `are_name` may omit the `.ARE` extension.
    pub fn load<P>(provider: P, are_name: &str) -> Result<MapCompositor, CompositorError>
    where
        P: ResourceProvider + 'static,
    {
        let are_file = if are_name.to_uppercase().ends_with(".ARE") {
            are_name.to_uppercase()
        } else {
            resource_name(are_name, "ARE")
        };
        let are = read_container(&provider, &are_file, are::read_are)?;
        let mut index = StructureIndex::new();
        index.build_are(&are);

        let day_wed = match are.root.text(WED_RESOURCE) {
            Some(wed) if !wed.is_empty() => resource_name(wed, "WED"),
            _ => {
                log::warn!("{} has no WED reference, assuming its own name", are_file);
                resource_name(base_name(&are_file), "WED")
            }
        };
        let WedSet { container, decoder } = read_wed_set(&provider, &day_wed)?;
        index.build_wed(&container);
        let grid = TileGrid::build(&index);
        log::info!(
            "Loaded {} with {} ({}x{} tiles, {} door tiles)",
            are_file,
            day_wed,
            grid.width,
            grid.height,
            grid.door_tiles.len()
        );

        Ok(MapCompositor {
            provider: Box::new(provider),
            are,
            index,
            active_wed: day_wed.clone(),
            day_wed,
            grid,
            decoder: Box::new(decoder),
            canvas: None,
            lighting: Lighting::Day,
            door_state: DoorState::Open,
            zoom: 1.0,
        })
    }

    fn area_flags(&self) -> u32 {
        self.are.root.unsigned(LOCATION).unwrap_or(0)
    }

    pub fn has_day_night(&self) -> bool {
        self.area_flags() & AREA_DAY_NIGHT != 0
    }

    pub fn has_extended_night(&self) -> bool {
        self.has_day_night() && self.area_flags() & AREA_EXTENDED_NIGHT != 0
    }

    /// Switch the backing WED for a time of day.
    ///
    /// Areas without day/night support ignore the request. Night without an extended
    /// night WED only changes the recorded lighting. On error nothing changes.
    pub fn select_variant(&mut self, lighting: Lighting) -> Result<VariantChange, CompositorError> {
        if !self.has_day_night() {
            log::debug!("{} has no day/night cycle", self.are.name);
            return Ok(VariantChange::Unchanged);
        }
        let target = match lighting {
            Lighting::Night if self.has_extended_night() => night_variant_name(&self.day_wed),
            _ => self.day_wed.clone(),
        };
        if target == self.active_wed {
            self.lighting = lighting;
            return Ok(VariantChange::Unchanged);
        }

        if !self.provider.exists(&target) {
            return Err(CompositorError::MissingResource(target));
        }
        let WedSet { container, decoder } = read_wed_set(self.provider.as_ref(), &target)?;
        let mut index = self.index.clone();
        index.build_wed(&container);
        let grid = TileGrid::build(&index);

        self.index = index;
        self.grid = grid;
        self.decoder = Box::new(decoder);
        self.canvas = None;
        self.active_wed = target.clone();
        self.lighting = lighting;
        log::info!("Switched {} to {}", self.are.name, target);
        Ok(VariantChange::Switched { wed: target })
    }

    /// Change the door state, redrawing door tiles of an already painted map
    pub fn set_door_state(&mut self, state: DoorState) {
        if state == self.door_state {
            return;
        }
        self.door_state = state;
        if let Some(canvas) = self.canvas.as_mut() {
            paint_doors(&self.grid, self.decoder.as_mut(), canvas, state);
        }
    }

    fn paint_canvas(&mut self) -> Result<RgbaImage, CompositorError> {
        let (width, height) = self.map_size();
        let mut canvas = try_canvas(width as u64, height as u64)?;
        paint_grid(&self.grid, self.decoder.as_mut(), &mut canvas);
        paint_doors(&self.grid, self.decoder.as_mut(), &mut canvas, self.door_state);
        Ok(canvas)
    }

    /// Repaint the full map at 1:1 scale
    pub fn paint(&mut self) -> Result<&RgbaImage, CompositorError> {
        let canvas = self.paint_canvas()?;
        let canvas = self.canvas.insert(canvas);
        Ok(&*canvas)
    }

    /// Zoomed copy of the painted map. The zoom is only committed when the copy succeeds.
    pub fn render_scaled(&mut self, zoom: f32) -> Result<RgbaImage, CompositorError> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(CompositorError::InvalidZoom(zoom));
        }
        let source = match self.canvas.take() {
            Some(canvas) => canvas,
            None => self.paint_canvas()?,
        };
        let scaled = scale(&source, zoom);
        self.canvas = Some(source);
        let scaled = scaled?;
        self.zoom = zoom;
        Ok(scaled)
    }

    /// Map size in pixels at 1:1 scale
    pub fn map_size(&self) -> (u32, u32) {
        self.grid
            .pixel_size(self.decoder.tile_width(), self.decoder.tile_height())
    }

    pub fn index(&self) -> &StructureIndex {
        &self.index
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    pub fn are_name(&self) -> &str {
        &self.are.name
    }

    pub fn wed_name(&self) -> &str {
        &self.active_wed
    }

    pub fn lighting(&self) -> Lighting {
        self.lighting
    }

    pub fn door_state(&self) -> DoorState {
        self.door_state
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }
}
