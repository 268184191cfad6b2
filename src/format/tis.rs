//! # Tileset (TIS V1)
//!
//! Palette-based 64×64 tiles. Each tile record is a 256-colour BGRA palette followed by
//! one palette index per pixel. Palette entry 0 set to pure green is transparent.
//!
//! Decoded tiles are cached per index. Identical decoded payloads (common for filler
//! tiles) share one reference-counted image, keyed by an XxHash64 of the pixels.

use std::{
    collections::{hash_map::Entry, HashMap},
    hash::{Hash, Hasher},
    rc::Rc,
};

use image::{imageops, Rgba, RgbaImage};
use thiserror::Error;
use twox_hash::XxHash64;

use super::reader::{check_signature, FieldReader};
use super::FormatError;

pub const TIS_HEADER_LEN: usize = 0x18;
const PALETTE_LEN: usize = 256 * 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("tile {index} out of range ({count} tiles)")]
    OutOfRange { index: u32, count: u32 },

    #[error("tile {index} record is truncated")]
    Truncated { index: u32 },
}

/// Produces fixed-size tile bitmaps by index
pub trait TileDecoder {
    fn tile_width(&self) -> u32;
    fn tile_height(&self) -> u32;
    fn tile_count(&self) -> u32;

    /// Draw tile `index` into the top-left corner of `dest`
    fn decode_tile(&mut self, index: u32, dest: &mut RgbaImage) -> Result<(), DecodeError>;
}

pub struct TisDecoder {
    data: Vec<u8>,
    tile_count: u32,
    tile_len: usize,
    header_len: usize,
    dimension: u32,
    cache: HashMap<u32, Rc<RgbaImage>>,
    by_hash: HashMap<u64, Rc<RgbaImage>>,
}

impl TisDecoder {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FormatError> {
        check_signature(&data, b"TIS ", b"V1  ")?;
        let mut reader = FieldReader::new(&data);
        reader.seek_to(8)?;
        let tile_count = reader.read_u32()?;
        let tile_len = reader.read_u32()? as usize;
        let header_len = reader.read_u32()? as usize;
        let dimension = reader.read_u32()?;

        if dimension == 0
            || dimension > 1024
            || tile_len < PALETTE_LEN + (dimension * dimension) as usize
            || header_len < TIS_HEADER_LEN
        {
            return Err(FormatError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Unsupported TIS layout: tile length {}, header length {}, dimension {}",
                    tile_len, header_len, dimension
                ),
            )));
        }

        Ok(TisDecoder {
            data,
            tile_count,
            tile_len,
            header_len,
            dimension,
            cache: HashMap::new(),
            by_hash: HashMap::new(),
        })
    }

    fn decode_uncached(&self, index: u32) -> Result<RgbaImage, DecodeError> {
        let start = self.header_len + index as usize * self.tile_len;
        let pixel_count = (self.dimension * self.dimension) as usize;
        let record = self
            .data
            .get(start..start + PALETTE_LEN + pixel_count)
            .ok_or(DecodeError::Truncated { index })?;
        let (palette, pixels) = record.split_at(PALETTE_LEN);

        let colours: Vec<Rgba<u8>> = palette
            .chunks_exact(4)
            .enumerate()
            .map(|(i, c)| {
                // BGRA on disk; the transparency key is green in slot 0
                let transparent = i == 0 && c[0] == 0 && c[1] == 255 && c[2] == 0;
                Rgba([c[2], c[1], c[0], if transparent { 0 } else { 255 }])
            })
            .collect();

        let mut img = RgbaImage::new(self.dimension, self.dimension);
        for (i, &ci) in pixels.iter().enumerate() {
            let x = i as u32 % self.dimension;
            let y = i as u32 / self.dimension;
            img.put_pixel(x, y, colours[ci as usize]);
        }
        Ok(img)
    }

    fn cached(&mut self, index: u32) -> Result<Rc<RgbaImage>, DecodeError> {
        if let Some(img) = self.cache.get(&index) {
            return Ok(Rc::clone(img));
        }
        let img = self.decode_uncached(index)?;
        let mut hasher = XxHash64::default();
        img.as_raw().hash(&mut hasher);
        let shared = match self.by_hash.entry(hasher.finish()) {
            Entry::Occupied(e) if e.get().as_raw() == img.as_raw() => Rc::clone(e.get()),
            // Hash collision: keep this tile private
            Entry::Occupied(_) => Rc::new(img),
            Entry::Vacant(e) => Rc::clone(e.insert(Rc::new(img))),
        };
        self.cache.insert(index, Rc::clone(&shared));
        Ok(shared)
    }
}

impl TileDecoder for TisDecoder {
    fn tile_width(&self) -> u32 {
        self.dimension
    }

    fn tile_height(&self) -> u32 {
        self.dimension
    }

    fn tile_count(&self) -> u32 {
        self.tile_count
    }

    fn decode_tile(&mut self, index: u32, dest: &mut RgbaImage) -> Result<(), DecodeError> {
        if index >= self.tile_count {
            return Err(DecodeError::OutOfRange {
                index,
                count: self.tile_count,
            });
        }
        let tile = self.cached(index)?;
        imageops::replace(dest, &*tile, 0, 0);
        Ok(())
    }
}
