use crate::format::{
    wed::{
        wall_group_count, DOORS_OFFSET, DOOR_COUNT, DOOR_TILES_OFFSET, OVERLAYS_OFFSET, OVERLAY_COUNT,
        SECONDARY_HEADER_OFFSET,
    },
    StructKind, StructRef, Structure,
};

use super::{declared, merge, slice, CategoryKey, StructureIndex};

const DOOR_TILE_SIZE: u64 = 2;

/// Categories are built in dependency order: later ones read members of earlier ones.
pub(super) fn build(index: &mut StructureIndex, root: &Structure) {
    let overlays = declared(root, root, OVERLAYS_OFFSET, OVERLAY_COUNT, StructKind::Overlay);
    let primary = overlays.first().cloned();
    index.insert(CategoryKey::wed(StructKind::Overlay), overlays);

    let doors = declared(root, root, DOORS_OFFSET, DOOR_COUNT, StructKind::WedDoor);
    index.insert(CategoryKey::wed(StructKind::WedDoor), doors.clone());

    let door_tiles_base = root.unsigned(DOOR_TILES_OFFSET).unwrap_or(0) as u64;
    let door_tiles = merge(doors.iter().flat_map(|door| door_tiles(door, door_tiles_base)));
    index.insert(CategoryKey::wed(StructKind::DoorTile), door_tiles);

    let (width, height) = match &primary {
        Some(overlay) => {
            let (tilemaps, lookups) = overlay_tables(overlay);
            index.insert(CategoryKey::wed(StructKind::Tilemap), tilemaps);
            index.insert(CategoryKey::wed(StructKind::TileIndex), lookups);
            (
                overlay.unsigned("Width").unwrap_or(0),
                overlay.unsigned("Height").unwrap_or(0),
            )
        }
        None => {
            log::warn!("WED has no primary overlay");
            (0, 0)
        }
    };

    let secondary_offset = root.unsigned(SECONDARY_HEADER_OFFSET).unwrap_or(0) as u64;
    let secondary = slice(root, secondary_offset, 1, StructKind::SecondaryHeader);
    index.insert(CategoryKey::wed(StructKind::SecondaryHeader), secondary.clone());
    let secondary = secondary.into_iter().next();
    if secondary.is_none() {
        log::warn!("WED has no secondary header; no wall polygons");
    }

    let mut lookup_count = 0;
    if let Some(secondary) = &secondary {
        let groups_offset = secondary.unsigned("Wall groups offset").unwrap_or(0) as u64;
        let groups = slice(
            root,
            groups_offset,
            wall_group_count(width, height) as usize,
            StructKind::WallGroup,
        );
        lookup_count = groups
            .iter()
            .map(|g| g.unsigned("Polygon index").unwrap_or(0) + g.unsigned("# polygons").unwrap_or(0))
            .max()
            .unwrap_or(0);
        index.insert(CategoryKey::wed(StructKind::WallGroup), groups);

        let walls = declared(
            root,
            secondary,
            "Wall polygons offset",
            "# wall polygons",
            StructKind::WallPolygon,
        );
        index.insert(CategoryKey::wed(StructKind::WallPolygon), walls);
    }

    index_door_polygons(index, &doors);

    if let Some(secondary) = &secondary {
        let lookup_offset = secondary.unsigned("Polygon lookup offset").unwrap_or(0) as u64;
        let lookups = slice(root, lookup_offset, lookup_count as usize, StructKind::PolygonIndex);
        index.insert(CategoryKey::wed(StructKind::PolygonIndex), lookups);
    }

    // Wall and door polygons may reference the same vertex; the merged pool keeps one
    let polygons: Vec<StructRef> = [
        StructKind::WallPolygon,
        StructKind::OpenPolygon,
        StructKind::ClosedPolygon,
    ]
    .into_iter()
    .flat_map(|kind| index.index(CategoryKey::wed(kind)).to_vec())
    .collect();
    let pool = merge(
        polygons
            .iter()
            .flat_map(|polygon| polygon.children_of(StructKind::Vertex).cloned()),
    );
    index.insert(CategoryKey::wed(StructKind::Vertex), pool);
}

fn door_tiles(door: &Structure, door_tiles_base: u64) -> Vec<StructRef> {
    if door_tiles_base == 0 {
        return Vec::new();
    }
    let first = door.unsigned("Tilemap lookup index").unwrap_or(0) as u64;
    let count = door.unsigned("# tilemap indexes").unwrap_or(0) as usize;
    slice(door, door_tiles_base + first * DOOR_TILE_SIZE, count, StructKind::DoorTile)
}

/// Tilemap entries (one per cell) and the tile lookup table of an overlay
fn overlay_tables(overlay: &Structure) -> (Vec<StructRef>, Vec<StructRef>) {
    let width = overlay.unsigned("Width").unwrap_or(0) as usize;
    let height = overlay.unsigned("Height").unwrap_or(0) as usize;
    let tilemap_offset = overlay.unsigned("Tilemap offset").unwrap_or(0) as u64;
    let tilemaps = slice(overlay, tilemap_offset, width * height, StructKind::Tilemap);

    let lookup_count = tilemaps
        .iter()
        .map(|t| {
            t.unsigned("Primary tile index").unwrap_or(0) + t.unsigned("# primary tiles").unwrap_or(0).max(1)
        })
        .max()
        .unwrap_or(0);
    let lookup_offset = overlay.unsigned("Tilemap lookup offset").unwrap_or(0) as u64;
    let lookups = slice(overlay, lookup_offset, lookup_count as usize, StructKind::TileIndex);
    (tilemaps, lookups)
}

fn index_door_polygons(index: &mut StructureIndex, doors: &[StructRef]) {
    for (offset_field, count_field, kind) in [
        ("Polygons offset (open)", "# polygons (open)", StructKind::OpenPolygon),
        ("Polygons offset (closed)", "# polygons (closed)", StructKind::ClosedPolygon),
    ] {
        let polygons = merge(
            doors
                .iter()
                .flat_map(|door| declared(door, door, offset_field, count_field, kind)),
        );
        index.insert(CategoryKey::wed(kind), polygons);
    }
}
