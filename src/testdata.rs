//! Synthetic ARE / WED / TIS buffers for unit tests.

use image::{Rgba, RgbaImage};

use crate::format::{
    are,
    reader::{layout_size, FieldType, Layout},
    tis::{DecodeError, TileDecoder},
    wed,
};

fn write_u16(data: &mut [u8], value: u16, pos: usize) {
    data[pos..pos + 2].copy_from_slice(&value.to_le_bytes());
}

fn write_u32(data: &mut [u8], value: u32, pos: usize) {
    data[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
}

fn field_offset(layout: &Layout, name: &str) -> (usize, FieldType) {
    let mut offset = 0;
    for &(n, ty) in layout {
        if n == name {
            return (offset, ty);
        }
        offset += ty.size();
    }
    panic!("no field {:?} in layout", name);
}

/// A zeroed record that can be filled by field name
pub struct Record<'l> {
    layout: &'l Layout,
    pub bytes: Vec<u8>,
}

impl<'l> Record<'l> {
    pub fn new(layout: &'l Layout) -> Self {
        Record {
            layout,
            bytes: vec![0u8; layout_size(layout)],
        }
    }

    pub fn num(mut self, name: &str, value: u32) -> Self {
        let (pos, ty) = field_offset(self.layout, name);
        match ty {
            FieldType::U8 => self.bytes[pos] = value as u8,
            FieldType::U16 | FieldType::I16 => write_u16(&mut self.bytes, value as u16, pos),
            FieldType::U32 => write_u32(&mut self.bytes, value, pos),
            other => panic!("{:?} is not numeric", other),
        }
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        let (pos, ty) = field_offset(self.layout, name);
        let len = ty.size().min(value.len());
        self.bytes[pos..pos + len].copy_from_slice(&value.as_bytes()[..len]);
        self
    }
}

type Point = (u16, u16);

struct PolygonSpec {
    first: u32,
    count: u32,
}

struct WedDoorSpec {
    name: String,
    tiles: Vec<u16>,
    open: Vec<PolygonSpec>,
    closed: Vec<PolygonSpec>,
}

pub struct WedBuilder {
    width: u16,
    height: u16,
    tileset: String,
    /// (tile number, secondary tile, draw overlay mask) per grid cell
    cells: Vec<(i16, u16, u8)>,
    doors: Vec<WedDoorSpec>,
    walls: Vec<PolygonSpec>,
    vertices: Vec<Point>,
}

impl WedBuilder {
    /// Every cell `i` initially shows tile `i` and has no secondary tile
    pub fn new(width: u16, height: u16, tileset: &str) -> Self {
        let cells = (0..(width as usize * height as usize))
            .map(|i| (i as i16, wed::NO_SECONDARY_TILE as u16, 0))
            .collect();
        WedBuilder {
            width,
            height,
            tileset: tileset.to_string(),
            cells,
            doors: Vec::new(),
            walls: Vec::new(),
            vertices: Vec::new(),
        }
    }

    pub fn tile(mut self, cell: usize, tile: i16) -> Self {
        self.cells[cell].0 = tile;
        self
    }

    pub fn secondary(mut self, cell: usize, tile: u16) -> Self {
        self.cells[cell].1 = tile;
        self
    }

    pub fn overlay_mask(mut self, cell: usize, mask: u8) -> Self {
        self.cells[cell].2 = mask;
        self
    }

    fn push_polygon(&mut self, points: &[Point]) -> PolygonSpec {
        let first = self.vertices.len() as u32;
        self.vertices.extend_from_slice(points);
        PolygonSpec {
            first,
            count: points.len() as u32,
        }
    }

    pub fn wall(mut self, points: &[Point]) -> Self {
        let spec = self.push_polygon(points);
        self.walls.push(spec);
        self
    }

    /// Wall polygon that reuses already pushed vertices
    pub fn wall_ref(mut self, first: u32, count: u32) -> Self {
        self.walls.push(PolygonSpec { first, count });
        self
    }

    pub fn door(mut self, name: &str, tiles: &[u16], open: &[&[Point]], closed: &[&[Point]]) -> Self {
        let open = open.iter().map(|p| self.push_polygon(p)).collect();
        let closed = closed.iter().map(|p| self.push_polygon(p)).collect();
        self.doors.push(WedDoorSpec {
            name: name.to_string(),
            tiles: tiles.to_vec(),
            open,
            closed,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let header_size = layout_size(wed::HEADER);
        let overlay_size = layout_size(wed::OVERLAY);
        let secondary_size = layout_size(wed::SECONDARY_HEADER);
        let door_size = layout_size(wed::DOOR);
        let tilemap_size = layout_size(wed::TILEMAP);
        let polygon_size = layout_size(wed::POLYGON);

        let overlay_off = header_size;
        let secondary_off = overlay_off + overlay_size;
        let doors_off = secondary_off + secondary_size;
        let tilemap_off = doors_off + self.doors.len() * door_size;
        let lookup_off = tilemap_off + self.cells.len() * tilemap_size;
        let door_tiles_off = lookup_off + self.cells.len() * 2;
        let door_tile_total: usize = self.doors.iter().map(|d| d.tiles.len()).sum();
        let groups_off = door_tiles_off + door_tile_total * 2;
        let group_count = wed::wall_group_count(self.width as u32, self.height as u32) as usize;
        let poly_lookup_off = groups_off + group_count * 4;
        let walls_off = poly_lookup_off + self.walls.len() * 2;
        let door_polys_off = walls_off + self.walls.len() * polygon_size;
        let door_poly_total: usize = self.doors.iter().map(|d| d.open.len() + d.closed.len()).sum();
        let vertices_off = door_polys_off + door_poly_total * polygon_size;
        let total = vertices_off + self.vertices.len() * 4;

        let mut data = vec![0u8; total];
        data[0..8].copy_from_slice(b"WED V1.3");
        let header = Record::new(wed::HEADER)
            .num(wed::OVERLAY_COUNT, 1)
            .num(wed::DOOR_COUNT, self.doors.len() as u32)
            .num(wed::OVERLAYS_OFFSET, overlay_off as u32)
            .num(wed::SECONDARY_HEADER_OFFSET, secondary_off as u32)
            .num(wed::DOORS_OFFSET, doors_off as u32)
            .num(wed::DOOR_TILES_OFFSET, door_tiles_off as u32);
        data[8..header_size].copy_from_slice(&header.bytes[8..]);

        let overlay = Record::new(wed::OVERLAY)
            .num("Width", self.width as u32)
            .num("Height", self.height as u32)
            .text("Tileset", &self.tileset)
            .num("# unique tiles", self.cells.len() as u32)
            .num("Tilemap offset", tilemap_off as u32)
            .num("Tilemap lookup offset", lookup_off as u32);
        data[overlay_off..overlay_off + overlay_size].copy_from_slice(&overlay.bytes);

        let secondary = Record::new(wed::SECONDARY_HEADER)
            .num("# wall polygons", self.walls.len() as u32)
            .num("Wall polygons offset", walls_off as u32)
            .num("Vertices offset", vertices_off as u32)
            .num("Wall groups offset", groups_off as u32)
            .num("Polygon lookup offset", poly_lookup_off as u32);
        data[secondary_off..secondary_off + secondary_size].copy_from_slice(&secondary.bytes);

        for (i, &(tile, secondary, mask)) in self.cells.iter().enumerate() {
            let rec = Record::new(wed::TILEMAP)
                .num("Primary tile index", i as u32)
                .num("# primary tiles", 1)
                .num("Secondary tile", secondary as u32)
                .num("Draw overlays", mask as u32);
            let pos = tilemap_off + i * tilemap_size;
            data[pos..pos + tilemap_size].copy_from_slice(&rec.bytes);
            write_u16(&mut data, tile as u16, lookup_off + i * 2);
        }

        let mut tile_cursor = 0usize;
        let mut poly_cursor = 0usize;
        let write_polygon = |data: &mut Vec<u8>, index: usize, spec: &PolygonSpec| {
            let rec = Record::new(wed::POLYGON)
                .num("Vertex index", spec.first)
                .num("# vertices", spec.count);
            let pos = index;
            data[pos..pos + polygon_size].copy_from_slice(&rec.bytes);
        };
        for (d, door) in self.doors.iter().enumerate() {
            let open_off = door_polys_off + poly_cursor * polygon_size;
            for spec in &door.open {
                write_polygon(&mut data, door_polys_off + poly_cursor * polygon_size, spec);
                poly_cursor += 1;
            }
            let closed_off = door_polys_off + poly_cursor * polygon_size;
            for spec in &door.closed {
                write_polygon(&mut data, door_polys_off + poly_cursor * polygon_size, spec);
                poly_cursor += 1;
            }
            let rec = Record::new(wed::DOOR)
                .text("Name", &door.name)
                .num("Tilemap lookup index", tile_cursor as u32)
                .num("# tilemap indexes", door.tiles.len() as u32)
                .num("# polygons (open)", door.open.len() as u32)
                .num("# polygons (closed)", door.closed.len() as u32)
                .num("Polygons offset (open)", if door.open.is_empty() { 0 } else { open_off as u32 })
                .num("Polygons offset (closed)", if door.closed.is_empty() { 0 } else { closed_off as u32 });
            let pos = doors_off + d * door_size;
            data[pos..pos + door_size].copy_from_slice(&rec.bytes);
            for &tile in &door.tiles {
                write_u16(&mut data, tile, door_tiles_off + tile_cursor * 2);
                tile_cursor += 1;
            }
        }

        if group_count > 0 {
            write_u16(&mut data, 0, groups_off);
            write_u16(&mut data, self.walls.len() as u16, groups_off + 2);
        }
        for (i, spec) in self.walls.iter().enumerate() {
            write_u16(&mut data, i as u16, poly_lookup_off + i * 2);
            write_polygon(&mut data, walls_off + i * polygon_size, spec);
        }
        for (i, &(x, y)) in self.vertices.iter().enumerate() {
            write_u16(&mut data, x, vertices_off + i * 4);
            write_u16(&mut data, y, vertices_off + i * 4 + 2);
        }
        data
    }
}

pub struct AreBuilder {
    wed: String,
    area_type: u32,
    edges: [Option<String>; 4],
    vertices: Vec<Point>,
    tables: Vec<(usize, Vec<u8>)>,
}

/// Table slots, in the order they are laid out after the vertex table
const REGIONS: usize = 0;
const SPAWN_POINTS: usize = 1;
const ENTRANCES: usize = 2;
const CONTAINERS: usize = 3;
const AMBIENTS: usize = 4;
const DOORS: usize = 5;
const ANIMATIONS: usize = 6;
const NOTES: usize = 7;
const TRAPS: usize = 8;
const ACTORS: usize = 9;

const TABLE_FIELDS: [(&str, &str, &Layout); 10] = [
    ("Regions offset", "# regions", are::REGION),
    ("Spawn points offset", "# spawn points", are::SPAWN_POINT),
    ("Entrances offset", "# entrances", are::ENTRANCE),
    ("Containers offset", "# containers", are::CONTAINER),
    ("Ambients offset", "# ambients", are::AMBIENT),
    ("Doors offset", "# doors", are::DOOR),
    ("Animations offset", "# animations", are::ANIMATION),
    ("Automap notes offset", "# automap notes", are::AUTOMAP_NOTE),
    ("Projectile traps offset", "# projectile traps", are::PROJECTILE_TRAP),
    ("Actors offset", "# actors", are::ACTOR),
];

impl AreBuilder {
    pub fn new(wed: &str) -> Self {
        AreBuilder {
            wed: wed.to_string(),
            area_type: 0,
            edges: Default::default(),
            vertices: Vec::new(),
            tables: Vec::new(),
        }
    }

    pub fn area_type(mut self, flags: u32) -> Self {
        self.area_type = flags;
        self
    }

    /// 0 = north, 1 = east, 2 = south, 3 = west
    pub fn edge(mut self, edge: usize, area: &str) -> Self {
        self.edges[edge] = Some(area.to_string());
        self
    }

    fn push_vertices(&mut self, points: &[Point]) -> u32 {
        let first = self.vertices.len() as u32;
        self.vertices.extend_from_slice(points);
        first
    }

    fn push(mut self, table: usize, record: Record) -> Self {
        self.tables.push((table, record.bytes));
        self
    }

    pub fn actor(self, name: &str, (x, y): Point, schedule: u32) -> Self {
        let rec = Record::new(are::ACTOR)
            .text("Name", name)
            .num("Position: X", x as u32)
            .num("Position: Y", y as u32)
            .num("Active at", schedule);
        self.push(ACTORS, rec)
    }

    pub fn region(mut self, name: &str, kind: u32, points: &[Point]) -> Self {
        let first = self.push_vertices(points);
        let rec = Record::new(are::REGION)
            .text("Name", name)
            .num("Type", kind)
            .num("# vertices", points.len() as u32)
            .num("First vertex index", first);
        self.push(REGIONS, rec)
    }

    pub fn entrance(self, name: &str, (x, y): Point) -> Self {
        let rec = Record::new(are::ENTRANCE)
            .text("Name", name)
            .num("Location: X", x as u32)
            .num("Location: Y", y as u32);
        self.push(ENTRANCES, rec)
    }

    pub fn container(mut self, name: &str, (x, y): Point, points: &[Point]) -> Self {
        let first = self.push_vertices(points);
        let rec = Record::new(are::CONTAINER)
            .text("Name", name)
            .num("Location: X", x as u32)
            .num("Location: Y", y as u32)
            .num("First vertex index", first)
            .num("# vertices", points.len() as u32);
        self.push(CONTAINERS, rec)
    }

    pub fn ambient(self, name: &str, (x, y): Point, radius: u16, flags: u32, schedule: u32) -> Self {
        let rec = Record::new(are::AMBIENT)
            .text("Name", name)
            .num("Origin: X", x as u32)
            .num("Origin: Y", y as u32)
            .num("Radius", radius as u32)
            .num("Active at", schedule)
            .num("Flags", flags);
        self.push(AMBIENTS, rec)
    }

    pub fn door(mut self, name: &str, id: &str, open: &[Point], closed: &[Point]) -> Self {
        let open_first = self.push_vertices(open);
        let closed_first = self.push_vertices(closed);
        let rec = Record::new(are::DOOR)
            .text("Name", name)
            .text("Door ID", id)
            .num("First vertex index (open)", open_first)
            .num("# vertices (open)", open.len() as u32)
            .num("# vertices (closed)", closed.len() as u32)
            .num("First vertex index (closed)", closed_first);
        self.push(DOORS, rec)
    }

    pub fn animation(self, name: &str, (x, y): Point, schedule: u32) -> Self {
        let rec = Record::new(are::ANIMATION)
            .text("Name", name)
            .num("Location: X", x as u32)
            .num("Location: Y", y as u32)
            .num("Active at", schedule)
            .num("Flags", 1);
        self.push(ANIMATIONS, rec)
    }

    pub fn spawn_point(self, name: &str, (x, y): Point, schedule: u32) -> Self {
        let rec = Record::new(are::SPAWN_POINT)
            .text("Name", name)
            .num("Location: X", x as u32)
            .num("Location: Y", y as u32)
            .num("Active at", schedule);
        self.push(SPAWN_POINTS, rec)
    }

    pub fn automap_note(self, (x, y): Point, strref: u32) -> Self {
        let rec = Record::new(are::AUTOMAP_NOTE)
            .num("Coordinate: X", x as u32)
            .num("Coordinate: Y", y as u32)
            .num("Text", strref);
        self.push(NOTES, rec)
    }

    pub fn trap(self, projectile: &str, (x, y): Point) -> Self {
        let rec = Record::new(are::PROJECTILE_TRAP)
            .text("Projectile", projectile)
            .num("Location: X", x as u32)
            .num("Location: Y", y as u32);
        self.push(TRAPS, rec)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut header = Record::new(are::HEADER)
            .text("Signature", "AREA")
            .text("Version", "V1.0")
            .text(are::WED_RESOURCE, &self.wed)
            .num(are::LOCATION, self.area_type);
        for (i, edge) in self.edges.iter().enumerate() {
            if let Some(area) = edge {
                header = header.text(are::EDGE_FIELDS[i].0, area);
            }
        }

        let vertices_off = are::HEADER_SIZE;
        header = header
            .num(are::VERTICES_OFFSET, vertices_off as u32)
            .num("# vertices", self.vertices.len() as u32);
        let mut body = Vec::new();
        for &(x, y) in &self.vertices {
            body.extend_from_slice(&x.to_le_bytes());
            body.extend_from_slice(&y.to_le_bytes());
        }

        for (slot, (offset_field, count_field, _)) in TABLE_FIELDS.iter().enumerate() {
            let rows: Vec<&Vec<u8>> = self
                .tables
                .iter()
                .filter(|(t, _)| *t == slot)
                .map(|(_, bytes)| bytes)
                .collect();
            if rows.is_empty() {
                continue;
            }
            header = header
                .num(offset_field, (vertices_off + body.len()) as u32)
                .num(count_field, rows.len() as u32);
            for row in rows {
                body.extend_from_slice(row);
            }
        }

        let mut data = header.bytes;
        data.extend(body);
        data
    }
}

/// TIS V1 palette tileset where tile `k` is a solid 64×64 square of [`tile_colour`]`(k)`
pub fn tis_bytes(tile_count: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(0x18 + tile_count as usize * 0x1400);
    data.extend_from_slice(b"TIS V1  ");
    data.extend_from_slice(&tile_count.to_le_bytes());
    data.extend_from_slice(&0x1400u32.to_le_bytes());
    data.extend_from_slice(&0x18u32.to_le_bytes());
    data.extend_from_slice(&64u32.to_le_bytes());
    for k in 0..tile_count {
        let mut palette = vec![0u8; 1024];
        let [r, g, b] = tile_colour(k);
        palette[4..8].copy_from_slice(&[b, g, r, 0]);
        data.extend(palette);
        data.extend(std::iter::repeat(1u8).take(4096));
    }
    data
}

pub fn tile_colour(k: u32) -> [u8; 3] {
    [(k % 256) as u8, (k / 256) as u8, 200]
}

/// Tile decoder that records every requested index and paints tile `k` in [`tile_colour`]`(k)`
pub struct RecordingDecoder {
    pub tile_count: u32,
    pub calls: Vec<u32>,
}

impl RecordingDecoder {
    pub fn new(tile_count: u32) -> Self {
        RecordingDecoder {
            tile_count,
            calls: Vec::new(),
        }
    }
}

impl TileDecoder for RecordingDecoder {
    fn tile_width(&self) -> u32 {
        64
    }

    fn tile_height(&self) -> u32 {
        64
    }

    fn tile_count(&self) -> u32 {
        self.tile_count
    }

    fn decode_tile(&mut self, index: u32, dest: &mut RgbaImage) -> Result<(), DecodeError> {
        self.calls.push(index);
        if index >= self.tile_count {
            return Err(DecodeError::OutOfRange {
                index,
                count: self.tile_count,
            });
        }
        let [r, g, b] = tile_colour(index);
        for pixel in dest.pixels_mut() {
            *pixel = Rgba([r, g, b, 255]);
        }
        Ok(())
    }
}
