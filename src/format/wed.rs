//! # Wilderness Environment (WED V1.3)
//!
//! Tile layout and static geometry of a map. Overlays own their tilemap and tile
//! lookup tables, doors own their door-tile cells and open/closed polygons, and every
//! polygon owns the vertices it references in the shared vertex table.

use std::sync::Arc;

use super::{
    reader::{
        check_signature, fitting_count, layout_size, read_fields, read_struct, read_table, FieldType::*, Layout,
    },
    Container, FormatError, StructKind, Structure,
};

pub const OVERLAYS_OFFSET: &str = "Overlays offset";
pub const OVERLAY_COUNT: &str = "# overlays";
pub const SECONDARY_HEADER_OFFSET: &str = "Second header offset";
pub const DOORS_OFFSET: &str = "Doors offset";
pub const DOOR_COUNT: &str = "# doors";
pub const DOOR_TILES_OFFSET: &str = "Door tilemap lookup offset";

pub const HEADER: &Layout = &[
    ("Signature", Text(4)),
    ("Version", Text(4)),
    (OVERLAY_COUNT, U32),
    (DOOR_COUNT, U32),
    (OVERLAYS_OFFSET, U32),
    (SECONDARY_HEADER_OFFSET, U32),
    (DOORS_OFFSET, U32),
    (DOOR_TILES_OFFSET, U32),
];

pub const OVERLAY: &Layout = &[
    ("Width", U16),
    ("Height", U16),
    ("Tileset", ResRef),
    ("# unique tiles", U16),
    ("Movement type", U16),
    ("Tilemap offset", U32),
    ("Tilemap lookup offset", U32),
];

pub const SECONDARY_HEADER: &Layout = &[
    ("# wall polygons", U32),
    ("Wall polygons offset", U32),
    ("Vertices offset", U32),
    ("Wall groups offset", U32),
    ("Polygon lookup offset", U32),
];

pub const DOOR: &Layout = &[
    ("Name", ResRef),
    ("Is door?", U16),
    ("Tilemap lookup index", U16),
    ("# tilemap indexes", U16),
    ("# polygons (open)", U16),
    ("# polygons (closed)", U16),
    ("Polygons offset (open)", U32),
    ("Polygons offset (closed)", U32),
];

pub const TILEMAP: &Layout = &[
    ("Primary tile index", U16),
    ("# primary tiles", U16),
    ("Secondary tile", U16),
    ("Draw overlays", U8),
    ("Animation speed", U8),
    ("Flags", U16),
];

pub const TILE_INDEX: &Layout = &[("Tile index", I16)];
pub const DOOR_TILE: &Layout = &[("Tilemap index", U16)];
pub const WALL_GROUP: &Layout = &[("Polygon index", U16), ("# polygons", U16)];
pub const POLYGON_INDEX: &Layout = &[("Polygon index", U16)];

pub const POLYGON: &Layout = &[
    ("Vertex index", U32),
    ("# vertices", U32),
    ("Flags", U8),
    ("Height", U8),
    ("Bounding box: Left", U16),
    ("Bounding box: Right", U16),
    ("Bounding box: Top", U16),
    ("Bounding box: Bottom", U16),
];

pub const VERTEX: &Layout = &[("X", U16), ("Y", U16)];

/// Secondary tile value meaning "no alternate tile"
pub const NO_SECONDARY_TILE: u32 = 0xFFFF;

const DOOR_TILE_SIZE: u64 = layout_size(DOOR_TILE) as u64;
const POLYGON_SIZE: u64 = layout_size(POLYGON) as u64;
const VERTEX_SIZE: u64 = layout_size(VERTEX) as u64;

/// Wall groups cover 10×7.5 tile blocks of the primary overlay
pub fn wall_group_count(width: u32, height: u32) -> u32 {
    ((width + 9) / 10) * ((height * 2 + 14) / 15)
}

fn read_polygon(data: &[u8], offset: u64, kind: StructKind, vertex_base: u64) -> Result<Structure, FormatError> {
    let polygon = read_struct(data, offset, kind, POLYGON)?;
    let first = polygon.unsigned("Vertex index").unwrap_or(0) as u64;
    let count = polygon.unsigned("# vertices").unwrap_or(0) as usize;
    let vertices = read_table(
        data,
        vertex_base + first * VERTEX_SIZE,
        count,
        StructKind::Vertex,
        VERTEX,
    );
    Ok(polygon.with_children(vertices))
}

fn read_polygons(data: &[u8], offset: u64, count: usize, kind: StructKind, vertex_base: u64) -> Vec<Structure> {
    let count = fitting_count(data, offset, count, POLYGON_SIZE, kind);
    (0..count as u64)
        .filter_map(|i| match read_polygon(data, offset + i * POLYGON_SIZE, kind, vertex_base) {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("Skipping {} #{}: {}", kind, i, e);
                None
            }
        })
        .collect()
}

fn read_overlay(data: &[u8], overlay: Structure) -> Structure {
    let width = overlay.unsigned("Width").unwrap_or(0);
    let height = overlay.unsigned("Height").unwrap_or(0);
    let tilemap_offset = overlay.unsigned("Tilemap offset").unwrap_or(0) as u64;
    let lookup_offset = overlay.unsigned("Tilemap lookup offset").unwrap_or(0) as u64;
    if tilemap_offset == 0 {
        return overlay;
    }

    let tilemaps = read_table(
        data,
        tilemap_offset,
        (width * height) as usize,
        StructKind::Tilemap,
        TILEMAP,
    );
    // The lookup table has no declared length; it ends after the last referenced slot
    let lookup_count = tilemaps
        .iter()
        .map(|t| {
            let start = t.unsigned("Primary tile index").unwrap_or(0);
            let count = t.unsigned("# primary tiles").unwrap_or(0).max(1);
            start + count
        })
        .max()
        .unwrap_or(0);
    let lookups = if lookup_offset == 0 {
        Vec::new()
    } else {
        read_table(
            data,
            lookup_offset,
            lookup_count as usize,
            StructKind::TileIndex,
            TILE_INDEX,
        )
    };
    overlay.with_children(tilemaps.into_iter().chain(lookups))
}

fn read_door(data: &[u8], door: Structure, door_tiles_base: u64, vertex_base: u64) -> Structure {
    let first_tile = door.unsigned("Tilemap lookup index").unwrap_or(0) as u64;
    let tile_count = door.unsigned("# tilemap indexes").unwrap_or(0) as usize;
    let mut children = if door_tiles_base == 0 {
        Vec::new()
    } else {
        read_table(
            data,
            door_tiles_base + first_tile * DOOR_TILE_SIZE,
            tile_count,
            StructKind::DoorTile,
            DOOR_TILE,
        )
    };

    for (offset_field, count_field, kind) in [
        ("Polygons offset (open)", "# polygons (open)", StructKind::OpenPolygon),
        ("Polygons offset (closed)", "# polygons (closed)", StructKind::ClosedPolygon),
    ] {
        let offset = door.unsigned(offset_field).unwrap_or(0) as u64;
        let count = door.unsigned(count_field).unwrap_or(0) as usize;
        if offset != 0 && count != 0 {
            children.extend(read_polygons(data, offset, count, kind, vertex_base));
        }
    }
    door.with_children(children)
}

pub fn read_wed(name: &str, data: &[u8]) -> Result<Container, FormatError> {
    check_signature(data, b"WED ", b"V1.3")?;
    let header = Structure::new(
        StructKind::Wed,
        0,
        data.len(),
        read_fields(data, 0, StructKind::Wed, HEADER)?,
    );
    let mut records = Vec::new();

    let overlay_offset = header.unsigned(OVERLAYS_OFFSET).unwrap_or(0) as u64;
    let overlay_count = header.unsigned(OVERLAY_COUNT).unwrap_or(0) as usize;
    let overlays: Vec<Structure> = if overlay_offset == 0 {
        Vec::new()
    } else {
        read_table(data, overlay_offset, overlay_count, StructKind::Overlay, OVERLAY)
            .into_iter()
            .map(|o| read_overlay(data, o))
            .collect()
    };
    let (width, height) = overlays
        .first()
        .map(|o| (o.unsigned("Width").unwrap_or(0), o.unsigned("Height").unwrap_or(0)))
        .unwrap_or((0, 0));
    records.extend(overlays);

    let secondary_offset = header.unsigned(SECONDARY_HEADER_OFFSET).unwrap_or(0) as u64;
    let secondary = if secondary_offset == 0 {
        None
    } else {
        match read_struct(data, secondary_offset, StructKind::SecondaryHeader, SECONDARY_HEADER) {
            Ok(s) => Some(s),
            Err(e) => {
                log::warn!("{}: unreadable secondary header: {}", name, e);
                None
            }
        }
    };
    let vertex_base = secondary
        .as_ref()
        .and_then(|s| s.unsigned("Vertices offset"))
        .unwrap_or(0) as u64;

    let doors_offset = header.unsigned(DOORS_OFFSET).unwrap_or(0) as u64;
    let door_count = header.unsigned(DOOR_COUNT).unwrap_or(0) as usize;
    let door_tiles_base = header.unsigned(DOOR_TILES_OFFSET).unwrap_or(0) as u64;
    if doors_offset != 0 {
        records.extend(
            read_table(data, doors_offset, door_count, StructKind::WedDoor, DOOR)
                .into_iter()
                .map(|d| read_door(data, d, door_tiles_base, vertex_base)),
        );
    }

    if let Some(secondary) = secondary {
        let wall_offset = secondary.unsigned("Wall polygons offset").unwrap_or(0) as u64;
        let wall_count = secondary.unsigned("# wall polygons").unwrap_or(0) as usize;
        if wall_offset != 0 {
            records.extend(read_polygons(data, wall_offset, wall_count, StructKind::WallPolygon, vertex_base));
        }

        let groups_offset = secondary.unsigned("Wall groups offset").unwrap_or(0) as u64;
        let groups = if groups_offset == 0 {
            Vec::new()
        } else {
            read_table(
                data,
                groups_offset,
                wall_group_count(width, height) as usize,
                StructKind::WallGroup,
                WALL_GROUP,
            )
        };
        let lookup_count = groups
            .iter()
            .map(|g| g.unsigned("Polygon index").unwrap_or(0) + g.unsigned("# polygons").unwrap_or(0))
            .max()
            .unwrap_or(0);
        records.extend(groups);

        let lookup_offset = secondary.unsigned("Polygon lookup offset").unwrap_or(0) as u64;
        if lookup_offset != 0 {
            records.extend(read_table(
                data,
                lookup_offset,
                lookup_count as usize,
                StructKind::PolygonIndex,
                POLYGON_INDEX,
            ));
        }
        records.push(secondary);
    }

    Ok(Container {
        name: name.to_uppercase(),
        root: Arc::new(header.with_children(records)),
    })
}
