//! # Parsed Container Model
//!
//! ARE and WED resources are read into a tree of [`Structure`]s. Every structure keeps an
//! offset-ordered list of entries, each either a named scalar [`Field`] or a child
//! structure. The indexing layer never looks at raw bytes again; it slices these entry
//! lists by byte offset and declared counts.

pub mod are;
pub mod reader;
pub mod tis;
pub mod wed;

use std::{fmt, io, sync::Arc};

use thiserror::Error;

/// Shared handle to a parsed sub-structure. Identity is the byte offset within its container.
pub type StructRef = Arc<Structure>;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid signature: expected {expected:?}, found {found:?}")]
    Signature { expected: String, found: String },

    #[error("{kind} at offset 0x{offset:x} needs {size} bytes but only {available} remain")]
    Truncated {
        kind: StructKind,
        offset: u64,
        size: usize,
        available: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StructKind {
    // ARE
    Are,
    Actor,
    Region,
    SpawnPoint,
    Entrance,
    Container,
    Item,
    Ambient,
    Door,
    Animation,
    AutomapNote,
    ProjectileTrap,
    OpenVertex,
    ClosedVertex,
    // WED
    Wed,
    Overlay,
    Tilemap,
    TileIndex,
    SecondaryHeader,
    WedDoor,
    DoorTile,
    OpenPolygon,
    ClosedPolygon,
    WallGroup,
    WallPolygon,
    PolygonIndex,
    // Both
    Vertex,
}

impl fmt::Display for StructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StructKind::Are => "Area",
            StructKind::Actor => "Actor",
            StructKind::Region => "Region",
            StructKind::SpawnPoint => "Spawn point",
            StructKind::Entrance => "Entrance",
            StructKind::Container => "Container",
            StructKind::Item => "Item",
            StructKind::Ambient => "Ambient",
            StructKind::Door => "Door",
            StructKind::Animation => "Animation",
            StructKind::AutomapNote => "Automap note",
            StructKind::ProjectileTrap => "Projectile trap",
            StructKind::OpenVertex => "Open vertex",
            StructKind::ClosedVertex => "Closed vertex",
            StructKind::Wed => "WED",
            StructKind::Overlay => "Overlay",
            StructKind::Tilemap => "Tilemap",
            StructKind::TileIndex => "Tile index",
            StructKind::SecondaryHeader => "Secondary header",
            StructKind::WedDoor => "WED door",
            StructKind::DoorTile => "Door tile",
            StructKind::OpenPolygon => "Open polygon",
            StructKind::ClosedPolygon => "Closed polygon",
            StructKind::WallGroup => "Wall group",
            StructKind::WallPolygon => "Wall polygon",
            StructKind::PolygonIndex => "Polygon index",
            StructKind::Vertex => "Vertex",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Unsigned(u32),
    Signed(i32),
    /// 8-byte resource reference, upper-cased and NUL-trimmed
    ResRef(String),
    Text(String),
    /// Unused or opaque span
    Bytes(usize),
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: &'static str,
    pub offset: u64,
    pub size: usize,
    pub value: FieldValue,
}

impl Field {
    pub fn as_u32(&self) -> Option<u32> {
        match self.value {
            FieldValue::Unsigned(v) => Some(v),
            FieldValue::Signed(v) => u32::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self.value {
            FieldValue::Unsigned(v) => i32::try_from(v).ok(),
            FieldValue::Signed(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            FieldValue::ResRef(s) | FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Entry {
    Field(Field),
    Struct(StructRef),
}

impl Entry {
    pub fn offset(&self) -> u64 {
        match self {
            Entry::Field(f) => f.offset,
            Entry::Struct(s) => s.offset,
        }
    }

    pub fn as_struct(&self) -> Option<&StructRef> {
        match self {
            Entry::Struct(s) => Some(s),
            Entry::Field(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Structure {
    pub kind: StructKind,
    pub offset: u64,
    pub size: usize,
    entries: Vec<Entry>,
}

impl Structure {
    /// Entries are stable-sorted by offset so that children read from shared tables
    /// land behind the structure's own fields.
    pub fn new(kind: StructKind, offset: u64, size: usize, mut entries: Vec<Entry>) -> Self {
        entries.sort_by_key(Entry::offset);
        Structure {
            kind,
            offset,
            size,
            entries,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn with_children(self, children: impl IntoIterator<Item = Structure>) -> Structure {
        let Structure {
            kind,
            offset,
            size,
            mut entries,
        } = self;
        entries.extend(children.into_iter().map(|c| Entry::Struct(Arc::new(c))));
        Structure::new(kind, offset, size, entries)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.entries.iter().find_map(|e| match e {
            Entry::Field(f) if f.name == name => Some(f),
            _ => None,
        })
    }

    pub fn unsigned(&self, name: &str) -> Option<u32> {
        self.field(name).and_then(Field::as_u32)
    }

    pub fn signed(&self, name: &str) -> Option<i32> {
        self.field(name).and_then(Field::as_i32)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Field::as_str)
    }

    /// Position stored as two unsigned fields, e.g. `"Location: X"` / `"Location: Y"`
    pub fn point(&self, x_name: &str, y_name: &str) -> Option<(i32, i32)> {
        Some((self.signed(x_name)?, self.signed(y_name)?))
    }

    pub fn children(&self) -> impl Iterator<Item = &StructRef> {
        self.entries.iter().filter_map(Entry::as_struct)
    }

    pub fn children_of(&self, kind: StructKind) -> impl Iterator<Item = &StructRef> {
        self.children().filter(move |s| s.kind == kind)
    }

    /// Label used for tooltips: the "Name" field if present, otherwise kind and offset
    pub fn label(&self) -> String {
        match self.text("Name") {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{} @ 0x{:x}", self.kind, self.offset),
        }
    }
}

/// Owned view of a fully parsed resource
#[derive(Debug, Clone)]
pub struct Container {
    /// Resource name including extension, e.g. `AR0100.WED`
    pub name: String,
    pub root: StructRef,
}
