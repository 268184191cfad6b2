//! # Area (ARE V1.0)
//!
//! Object placement for a map: actors, trigger regions, spawn points, entrances,
//! containers, ambient sounds, doors, background animations, automap notes and
//! projectile traps. Geometry-owning records (regions, containers, doors) carry their
//! vertices as child structures read from the shared vertex table.

use std::sync::Arc;

use super::{
    reader::{check_signature, layout_size, read_fields, read_table, FieldType::*, Layout},
    Container, FormatError, StructKind, Structure,
};

pub const WED_RESOURCE: &str = "WED resource";
pub const LOCATION: &str = "Location";
pub const VERTICES_OFFSET: &str = "Vertices offset";

/// Bits of the header's "Location" (area type) field
pub const AREA_DAY_NIGHT: u32 = 0x02;
pub const AREA_EXTENDED_NIGHT: u32 = 0x40;

/// Edge transitions as (area field, flags field), clockwise from north
pub const EDGE_FIELDS: [(&str, &str); 4] = [
    ("Area north", "Edge flags north"),
    ("Area east", "Edge flags east"),
    ("Area south", "Edge flags south"),
    ("Area west", "Edge flags west"),
];

pub const HEADER: &Layout = &[
    ("Signature", Text(4)),
    ("Version", Text(4)),
    (WED_RESOURCE, ResRef),
    ("Last saved", U32),
    ("Area flags", U32),
    ("Area north", ResRef),
    ("Edge flags north", U32),
    ("Area east", ResRef),
    ("Edge flags east", U32),
    ("Area south", ResRef),
    ("Edge flags south", U32),
    ("Area west", ResRef),
    ("Edge flags west", U32),
    (LOCATION, U16),
    ("Rain probability", U16),
    ("Snow probability", U16),
    ("Fog probability", U16),
    ("Lightning probability", U16),
    ("Wind speed", U16),
    ("Actors offset", U32),
    ("# actors", U16),
    ("# regions", U16),
    ("Regions offset", U32),
    ("Spawn points offset", U32),
    ("# spawn points", U32),
    ("Entrances offset", U32),
    ("# entrances", U32),
    ("Containers offset", U32),
    ("# containers", U16),
    ("# items", U16),
    ("Items offset", U32),
    (VERTICES_OFFSET, U32),
    ("# vertices", U16),
    ("# ambients", U16),
    ("Ambients offset", U32),
    ("Variables offset", U32),
    ("# variables", U32),
    ("Tiled object flags offset", U16),
    ("# tiled object flags", U16),
    ("Area script", ResRef),
    ("Explored bitmap size", U32),
    ("Explored bitmap offset", U32),
    ("# doors", U32),
    ("Doors offset", U32),
    ("# animations", U32),
    ("Animations offset", U32),
    ("# tiled objects", U32),
    ("Tiled objects offset", U32),
    ("Songs offset", U32),
    ("Rest encounters offset", U32),
    ("Automap notes offset", U32),
    ("# automap notes", U32),
    ("Projectile traps offset", U32),
    ("# projectile traps", U32),
    ("Rest movie (day)", ResRef),
    ("Rest movie (night)", ResRef),
    ("Unused", Skip(56)),
];

pub const ACTOR: &Layout = &[
    ("Name", Text(32)),
    ("Position: X", U16),
    ("Position: Y", U16),
    ("Destination: X", U16),
    ("Destination: Y", U16),
    ("Flags", U32),
    ("Is spawned", U16),
    ("First letter of CRE resref", U8),
    ("Unused", Skip(1)),
    ("Animation", U32),
    ("Orientation", U16),
    ("Unused", Skip(2)),
    ("Expiry time", U32),
    ("Wander distance", U16),
    ("Follow distance", U16),
    ("Active at", U32),
    ("# times talked to", U32),
    ("Dialogue", ResRef),
    ("Override script", ResRef),
    ("General script", ResRef),
    ("Class script", ResRef),
    ("Race script", ResRef),
    ("Default script", ResRef),
    ("Specific script", ResRef),
    ("Character", ResRef),
    ("CRE structure offset", U32),
    ("CRE structure size", U32),
    ("Unused", Skip(128)),
];

pub const REGION: &Layout = &[
    ("Name", Text(32)),
    ("Type", U16),
    ("Bounding box: Left", U16),
    ("Bounding box: Top", U16),
    ("Bounding box: Right", U16),
    ("Bounding box: Bottom", U16),
    ("# vertices", U16),
    ("First vertex index", U32),
    ("Trigger value", U32),
    ("Cursor", U32),
    ("Destination area", ResRef),
    ("Entrance name", Text(32)),
    ("Flags", U32),
    ("Info point text", U32),
    ("Trap detection difficulty", U16),
    ("Trap removal difficulty", U16),
    ("Is trapped", U16),
    ("Trap detected", U16),
    ("Launch point: X", U16),
    ("Launch point: Y", U16),
    ("Key", ResRef),
    ("Script", ResRef),
    ("Activation point: X", U16),
    ("Activation point: Y", U16),
    ("Unused", Skip(60)),
];

pub const SPAWN_POINT: &Layout = &[
    ("Name", Text(32)),
    ("Location: X", U16),
    ("Location: Y", U16),
    ("Creature 1", ResRef),
    ("Creature 2", ResRef),
    ("Creature 3", ResRef),
    ("Creature 4", ResRef),
    ("Creature 5", ResRef),
    ("Creature 6", ResRef),
    ("Creature 7", ResRef),
    ("Creature 8", ResRef),
    ("Creature 9", ResRef),
    ("Creature 10", ResRef),
    ("# creatures", U16),
    ("Encounter difficulty", U16),
    ("Spawn rate", U16),
    ("Spawn method", U16),
    ("Creature duration", U32),
    ("Wander distance", U16),
    ("Follow distance", U16),
    ("Maximum spawned", U16),
    ("Active", U16),
    ("Active at", U32),
    ("Probability (day)", U16),
    ("Probability (night)", U16),
    ("Unused", Skip(56)),
];

pub const ENTRANCE: &Layout = &[
    ("Name", Text(32)),
    ("Location: X", U16),
    ("Location: Y", U16),
    ("Orientation", U16),
    ("Unused", Skip(66)),
];

pub const CONTAINER: &Layout = &[
    ("Name", Text(32)),
    ("Location: X", U16),
    ("Location: Y", U16),
    ("Type", U16),
    ("Lock difficulty", U16),
    ("Flags", U32),
    ("Trap detection difficulty", U16),
    ("Trap removal difficulty", U16),
    ("Is trapped", U16),
    ("Trap detected", U16),
    ("Launch point: X", U16),
    ("Launch point: Y", U16),
    ("Bounding box: Left", U16),
    ("Bounding box: Top", U16),
    ("Bounding box: Right", U16),
    ("Bounding box: Bottom", U16),
    ("First item index", U32),
    ("# items", U32),
    ("Trap script", ResRef),
    ("First vertex index", U32),
    ("# vertices", U16),
    ("Trigger range", U16),
    ("Owner", Text(32)),
    ("Key", ResRef),
    ("Break difficulty", U32),
    ("Lockpick string", U32),
    ("Unused", Skip(56)),
];

pub const ITEM: &Layout = &[
    ("Item", ResRef),
    ("Expiry time", U16),
    ("Quantity/Charges 1", U16),
    ("Quantity/Charges 2", U16),
    ("Quantity/Charges 3", U16),
    ("Flags", U32),
];

pub const VERTEX: &Layout = &[("X", U16), ("Y", U16)];

pub const AMBIENT: &Layout = &[
    ("Name", Text(32)),
    ("Origin: X", U16),
    ("Origin: Y", U16),
    ("Radius", U16),
    ("Height", U16),
    ("Pitch variation", U32),
    ("Volume variation", U16),
    ("Volume", U16),
    ("Sound 1", ResRef),
    ("Sound 2", ResRef),
    ("Sound 3", ResRef),
    ("Sound 4", ResRef),
    ("Sound 5", ResRef),
    ("Sound 6", ResRef),
    ("Sound 7", ResRef),
    ("Sound 8", ResRef),
    ("Sound 9", ResRef),
    ("Sound 10", ResRef),
    ("# sounds", U16),
    ("Unused", Skip(2)),
    ("Base interval", U32),
    ("Interval variation", U32),
    ("Active at", U32),
    ("Flags", U32),
    ("Unused", Skip(64)),
];

/// Ambient flag: sound plays everywhere on the map, the radius is ignored
pub const AMBIENT_GLOBAL: u32 = 0x04;

pub const DOOR: &Layout = &[
    ("Name", Text(32)),
    ("Door ID", ResRef),
    ("Flags", U32),
    ("First vertex index (open)", U32),
    ("# vertices (open)", U16),
    ("# vertices (closed)", U16),
    ("First vertex index (closed)", U32),
    ("Open bounding box: Left", U16),
    ("Open bounding box: Top", U16),
    ("Open bounding box: Right", U16),
    ("Open bounding box: Bottom", U16),
    ("Closed bounding box: Left", U16),
    ("Closed bounding box: Top", U16),
    ("Closed bounding box: Right", U16),
    ("Closed bounding box: Bottom", U16),
    ("First impeded cell (open)", U32),
    ("# impeded cells (open)", U16),
    ("# impeded cells (closed)", U16),
    ("First impeded cell (closed)", U32),
    ("Hit points", U16),
    ("Armor class", U16),
    ("Open sound", ResRef),
    ("Close sound", ResRef),
    ("Cursor", U32),
    ("Trap detection difficulty", U16),
    ("Trap removal difficulty", U16),
    ("Is trapped", U16),
    ("Trap detected", U16),
    ("Launch point: X", U16),
    ("Launch point: Y", U16),
    ("Key", ResRef),
    ("Script", ResRef),
    ("Detection difficulty", U32),
    ("Lock difficulty", U32),
    ("Toggle point (open): X", U16),
    ("Toggle point (open): Y", U16),
    ("Toggle point (closed): X", U16),
    ("Toggle point (closed): Y", U16),
    ("Lockpick string", U32),
    ("Travel trigger name", Text(24)),
    ("Dialogue speaker name", U32),
    ("Dialogue", ResRef),
    ("Unused", Skip(8)),
];

pub const ANIMATION: &Layout = &[
    ("Name", Text(32)),
    ("Location: X", U16),
    ("Location: Y", U16),
    ("Active at", U32),
    ("Animation", ResRef),
    ("Sequence", U16),
    ("Frame", U16),
    ("Flags", U32),
    ("Height", I16),
    ("Translucency", U16),
    ("Start range", U16),
    ("Loop probability", U8),
    ("Skip cycles", U8),
    ("Palette", ResRef),
    ("Unused", Skip(4)),
];

pub const AUTOMAP_NOTE: &Layout = &[
    ("Coordinate: X", U16),
    ("Coordinate: Y", U16),
    ("Text", U32),
    ("Text location", U16),
    ("Marker color", U16),
    ("Control ID", U32),
    ("Unused", Skip(36)),
];

pub const PROJECTILE_TRAP: &Layout = &[
    ("Projectile", ResRef),
    ("Effects offset", U32),
    ("Effects size", U16),
    ("Missile ID", U16),
    ("Recharge delay", U16),
    ("Explosion count", U16),
    ("Location: X", U16),
    ("Location: Y", U16),
    ("Location: Z", U16),
    ("Target", U8),
    ("Party member", U8),
];

/// Table descriptor: header fields that declare where a record list lives
pub struct Table {
    pub offset_field: &'static str,
    pub count_field: &'static str,
    pub kind: StructKind,
    pub layout: &'static Layout,
}

pub const TABLES: [Table; 11] = [
    Table { offset_field: "Actors offset", count_field: "# actors", kind: StructKind::Actor, layout: ACTOR },
    Table { offset_field: "Regions offset", count_field: "# regions", kind: StructKind::Region, layout: REGION },
    Table { offset_field: "Spawn points offset", count_field: "# spawn points", kind: StructKind::SpawnPoint, layout: SPAWN_POINT },
    Table { offset_field: "Entrances offset", count_field: "# entrances", kind: StructKind::Entrance, layout: ENTRANCE },
    Table { offset_field: "Containers offset", count_field: "# containers", kind: StructKind::Container, layout: CONTAINER },
    Table { offset_field: "Items offset", count_field: "# items", kind: StructKind::Item, layout: ITEM },
    Table { offset_field: "Ambients offset", count_field: "# ambients", kind: StructKind::Ambient, layout: AMBIENT },
    Table { offset_field: "Doors offset", count_field: "# doors", kind: StructKind::Door, layout: DOOR },
    Table { offset_field: "Animations offset", count_field: "# animations", kind: StructKind::Animation, layout: ANIMATION },
    Table { offset_field: "Automap notes offset", count_field: "# automap notes", kind: StructKind::AutomapNote, layout: AUTOMAP_NOTE },
    Table { offset_field: "Projectile traps offset", count_field: "# projectile traps", kind: StructKind::ProjectileTrap, layout: PROJECTILE_TRAP },
];

pub const HEADER_SIZE: usize = layout_size(HEADER);
pub const VERTEX_SIZE: u64 = layout_size(VERTEX) as u64;

/// Vertex runs owned by a record: (first index field, count field, child kind)
pub fn vertex_runs(kind: StructKind) -> &'static [(&'static str, &'static str, StructKind)] {
    match kind {
        StructKind::Region | StructKind::Container => {
            &[("First vertex index", "# vertices", StructKind::Vertex)]
        }
        StructKind::Door => &[
            ("First vertex index (open)", "# vertices (open)", StructKind::OpenVertex),
            ("First vertex index (closed)", "# vertices (closed)", StructKind::ClosedVertex),
        ],
        _ => &[],
    }
}

fn attach_vertices(record: Structure, data: &[u8], vertex_base: u64) -> Structure {
    let runs = vertex_runs(record.kind);
    if runs.is_empty() {
        return record;
    }
    let mut children = Vec::new();
    for &(first_field, count_field, kind) in runs {
        let first = record.unsigned(first_field).unwrap_or(0) as u64;
        let count = record.unsigned(count_field).unwrap_or(0) as usize;
        if count == 0 {
            continue;
        }
        children.extend(read_table(
            data,
            vertex_base + first * VERTEX_SIZE,
            count,
            kind,
            VERTEX,
        ));
    }
    record.with_children(children)
}

pub fn read_are(name: &str, data: &[u8]) -> Result<Container, FormatError> {
    check_signature(data, b"AREA", b"V1.0")?;
    let header = Structure::new(
        StructKind::Are,
        0,
        data.len(),
        read_fields(data, 0, StructKind::Are, HEADER)?,
    );
    let vertex_base = header.unsigned(VERTICES_OFFSET).unwrap_or(0) as u64;

    let mut records = Vec::new();
    for table in &TABLES {
        let offset = header.unsigned(table.offset_field).unwrap_or(0) as u64;
        let count = header.unsigned(table.count_field).unwrap_or(0) as usize;
        if offset == 0 || count == 0 {
            continue;
        }
        let rows = read_table(data, offset, count, table.kind, table.layout);
        log::debug!("{}: read {}/{} {} records", name, rows.len(), count, table.kind);
        records.extend(rows.into_iter().map(|r| attach_vertices(r, data, vertex_base)));
    }

    Ok(Container {
        name: name.to_uppercase(),
        root: Arc::new(header.with_children(records)),
    })
}
