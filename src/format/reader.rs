//! Little-endian field reading over an in-memory resource buffer.
//!
//! Sub-structures are described by static layouts; [`read_struct`] walks a layout and
//! produces named fields with their absolute byte offsets.

use std::io::{self, Cursor, Read};

use super::{Entry, Field, FieldValue, FormatError, StructKind, Structure};

#[derive(Clone, Copy, Debug)]
pub enum FieldType {
    U8,
    U16,
    I16,
    U32,
    ResRef,
    Text(usize),
    Skip(usize),
}

impl FieldType {
    pub const fn size(self) -> usize {
        match self {
            FieldType::U8 => 1,
            FieldType::U16 | FieldType::I16 => 2,
            FieldType::U32 => 4,
            FieldType::ResRef => 8,
            FieldType::Text(n) | FieldType::Skip(n) => n,
        }
    }
}

pub type Layout = [(&'static str, FieldType)];

pub const fn layout_size(layout: &Layout) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < layout.len() {
        total += layout[i].1.size();
        i += 1;
    }
    total
}

pub struct FieldReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        FieldReader {
            cursor: Cursor::new(data),
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn seek_to(&mut self, position: u64) -> io::Result<()> {
        if position > self.cursor.get_ref().len() as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Cannot seek to position {} (buffer length: {})",
                    position,
                    self.cursor.get_ref().len()
                ),
            ));
        }
        self.cursor.set_position(position);
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_bytes(&mut self, length: usize) -> io::Result<Vec<u8>> {
        let mut buffer = vec![0u8; length];
        self.cursor.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_field(&mut self, name: &'static str, ty: FieldType) -> io::Result<Field> {
        let offset = self.position();
        let value = match ty {
            FieldType::U8 => FieldValue::Unsigned(self.read_array::<1>()?[0] as u32),
            FieldType::U16 => FieldValue::Unsigned(self.read_u16()? as u32),
            FieldType::I16 => FieldValue::Signed(i16::from_le_bytes(self.read_array()?) as i32),
            FieldType::U32 => FieldValue::Unsigned(self.read_u32()?),
            FieldType::ResRef => FieldValue::ResRef(decode_text(&self.read_bytes(8)?).to_uppercase()),
            FieldType::Text(n) => FieldValue::Text(decode_text(&self.read_bytes(n)?)),
            FieldType::Skip(n) => {
                self.seek_to(offset + n as u64)?;
                FieldValue::Bytes(n)
            }
        };
        Ok(Field {
            name,
            offset,
            size: ty.size(),
            value,
        })
    }
}

/// NUL-terminated, Latin-1 style fixed-width text
fn decode_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end].iter().map(|&b| b as char).collect()
}

/// Read the fields of `layout` starting at `offset`. The entire span must be in bounds.
pub fn read_fields(data: &[u8], offset: u64, kind: StructKind, layout: &Layout) -> Result<Vec<Entry>, FormatError> {
    let size = layout_size(layout);
    let available = data.len().saturating_sub(offset as usize);
    if offset as usize > data.len() || available < size {
        return Err(FormatError::Truncated {
            kind,
            offset,
            size,
            available,
        });
    }

    let mut reader = FieldReader::new(data);
    reader.seek_to(offset)?;
    layout
        .iter()
        .map(|&(name, ty)| reader.read_field(name, ty).map(Entry::Field).map_err(FormatError::from))
        .collect()
}

/// Read a leaf structure: fields only, no children
pub fn read_struct(data: &[u8], offset: u64, kind: StructKind, layout: &Layout) -> Result<Structure, FormatError> {
    let entries = read_fields(data, offset, kind, layout)?;
    Ok(Structure::new(kind, offset, layout_size(layout), entries))
}

/// Clamp a declared record count to the records that can start inside the buffer.
/// A shortfall is logged once for the whole table.
pub fn fitting_count(data: &[u8], offset: u64, count: usize, size: u64, kind: StructKind) -> usize {
    let room = (data.len() as u64).saturating_sub(offset) / size.max(1);
    if count as u64 > room {
        log::warn!(
            "{} table at {:#x} declares {} records, only {} fit in {} bytes",
            kind,
            offset,
            count,
            room,
            data.len()
        );
        room as usize
    } else {
        count
    }
}

/// Read `count` consecutive records of one layout, skipping (and logging) any that fail.
pub fn read_table(
    data: &[u8],
    offset: u64,
    count: usize,
    kind: StructKind,
    layout: &Layout,
) -> Vec<Structure> {
    let size = layout_size(layout) as u64;
    let count = fitting_count(data, offset, count, size, kind);
    (0..count as u64)
        .filter_map(|i| match read_struct(data, offset + i * size, kind, layout) {
            Ok(s) => Some(s),
            Err(e) => {
                log::warn!("Skipping {} #{}: {}", kind, i, e);
                None
            }
        })
        .collect()
}

pub fn check_signature(data: &[u8], signature: &[u8; 4], version: &[u8; 4]) -> Result<(), FormatError> {
    if data.len() < 8 || &data[0..4] != signature || &data[4..8] != version {
        let found = data.get(0..8.min(data.len())).unwrap_or(&[]);
        return Err(FormatError::Signature {
            expected: format!(
                "{}{}",
                String::from_utf8_lossy(signature),
                String::from_utf8_lossy(version)
            ),
            found: String::from_utf8_lossy(found).into_owned(),
        });
    }
    Ok(())
}
