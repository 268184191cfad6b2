//! Per-kind construction of layer objects from indexed records.
//!
//! Unresolvable fields never fail construction: positions default to the origin,
//! missing vertices are dropped and labels fall back to kind and offset.

use super::geometry::{Geometry, Point, RenderItem};
use super::object::{Edge, LayerKind, LayerObject, ObjectShapes, Schedule};
use crate::format::{
    are::{AMBIENT_GLOBAL, EDGE_FIELDS, VERTEX_SIZE, VERTICES_OFFSET},
    StructKind, StructRef, Structure,
};
use crate::index::{CategoryKey, ContainerKind, StructureIndex};

/// Width in map pixels of a transition strip
pub const TRANSITION_STRIPE: i32 = 16;

pub fn build_objects(kind: LayerKind, index: &StructureIndex) -> Vec<LayerObject> {
    match kind.category() {
        Some(key) => index
            .index(key)
            .iter()
            .map(|record| build_object(kind, record, index))
            .collect(),
        None => build_transitions(index),
    }
}

pub(super) fn rebuild(object: &LayerObject, index: &StructureIndex) -> Option<LayerObject> {
    let record = object.structures.first()?;
    Some(match object.edge {
        Some(edge) => transition(record, edge),
        None => build_object(object.kind, record, index),
    })
}

/// Corners of a transition strip along one edge of a `map_size` map
pub fn transition_strip(edge: Edge, (width, height): (u32, u32)) -> Vec<Point> {
    let (w, h, s) = (width as i32, height as i32, TRANSITION_STRIPE);
    let (left, top, right, bottom) = match edge {
        Edge::North => (0, 0, w, s),
        Edge::East => (w - s, 0, w, h),
        Edge::South => (0, h - s, w, h),
        Edge::West => (0, 0, s, h),
    };
    vec![
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    ]
}

fn build_transitions(index: &StructureIndex) -> Vec<LayerObject> {
    let Some(are) = index.container(ContainerKind::Are) else {
        return Vec::new();
    };
    Edge::ALL
        .into_iter()
        .filter(|&edge| {
            are.root
                .text(EDGE_FIELDS[edge as usize].0)
                .map_or(false, |area| !area.is_empty())
        })
        .map(|edge| transition(&are.root, edge))
        .collect()
}

fn transition(root: &StructRef, edge: Edge) -> LayerObject {
    let label = root
        .text(EDGE_FIELDS[edge as usize].0)
        .unwrap_or_default()
        .to_string();
    LayerObject {
        kind: LayerKind::Transition,
        structures: vec![root.clone()],
        label: label.clone(),
        shapes: ObjectShapes::Single(vec![RenderItem::new(label, Geometry::Polygon(Vec::new()))]),
        schedule: None,
        global_sound: false,
        edge: Some(edge),
    }
}

fn point(record: &Structure, prefix: &str) -> Point {
    match record.point(&format!("{}: X", prefix), &format!("{}: Y", prefix)) {
        Some((x, y)) => Point::new(x, y),
        None => {
            log::debug!("{} has no {} position", record.label(), prefix);
            Point::default()
        }
    }
}

fn vertex_point(vertex: &Structure) -> Point {
    Point::new(vertex.signed("X").unwrap_or(0), vertex.signed("Y").unwrap_or(0))
}

/// `count` vertices from an indexed pool, starting at vertex number `first`
fn pool_polygon(index: &StructureIndex, pool: CategoryKey, base: u64, first: u32, count: u32) -> Vec<Point> {
    let points: Vec<Point> = (0..count as u64)
        .filter_map(|i| index.index_by_offset(pool, base + (first as u64 + i) * VERTEX_SIZE))
        .map(|v| vertex_point(v))
        .collect();
    if points.len() != count as usize {
        log::debug!("{:?}: resolved {}/{} vertices", pool.kind, points.len(), count);
    }
    points
}

fn are_vertex_base(index: &StructureIndex) -> u64 {
    index
        .container(ContainerKind::Are)
        .and_then(|are| are.root.unsigned(VERTICES_OFFSET))
        .unwrap_or(0) as u64
}

fn wed_vertex_base(index: &StructureIndex) -> u64 {
    index
        .index(CategoryKey::wed(StructKind::SecondaryHeader))
        .first()
        .and_then(|s| s.unsigned("Vertices offset"))
        .unwrap_or(0) as u64
}

fn are_polygon(index: &StructureIndex, record: &Structure, first: &str, count: &str, pool: StructKind) -> Vec<Point> {
    pool_polygon(
        index,
        CategoryKey::are(pool),
        are_vertex_base(index),
        record.unsigned(first).unwrap_or(0),
        record.unsigned(count).unwrap_or(0),
    )
}

fn wed_polygon(index: &StructureIndex, polygon: &Structure) -> Vec<Point> {
    pool_polygon(
        index,
        CategoryKey::wed(StructKind::Vertex),
        wed_vertex_base(index),
        polygon.unsigned("Vertex index").unwrap_or(0),
        polygon.unsigned("# vertices").unwrap_or(0),
    )
}

fn schedule(record: &Structure) -> Schedule {
    record.unsigned("Active at").map_or(Schedule::ALWAYS, Schedule::from_bits)
}

pub(super) fn build_object(kind: LayerKind, record: &StructRef, index: &StructureIndex) -> LayerObject {
    let mut label = record.label();
    let mut schedule_mask = None;
    let mut global_sound = false;

    let shapes = match kind {
        LayerKind::Actor => {
            schedule_mask = Some(schedule(record));
            icon(&label, point(record, "Position"))
        }
        LayerKind::Entrance => icon(&label, point(record, "Location")),
        LayerKind::SpawnPoint | LayerKind::Animation => {
            schedule_mask = Some(schedule(record));
            icon(&label, point(record, "Location"))
        }
        LayerKind::ProjectileTrap => {
            if let Some(projectile) = record.text("Projectile").filter(|p| !p.is_empty()) {
                label = projectile.to_string();
            }
            icon(&label, point(record, "Location"))
        }
        LayerKind::AutomapNote => {
            label = format!("Note (strref {})", record.unsigned("Text").unwrap_or(0));
            icon(&label, point(record, "Coordinate"))
        }
        LayerKind::Ambient => {
            schedule_mask = Some(schedule(record));
            global_sound = record.unsigned("Flags").unwrap_or(0) & AMBIENT_GLOBAL != 0;
            let origin = point(record, "Origin");
            let mut items = vec![RenderItem::new(label.clone(), Geometry::Icon(origin))];
            let radius = record.signed("Radius").unwrap_or(0);
            if !global_sound && radius > 0 {
                items.push(RenderItem::new(
                    label.clone(),
                    Geometry::Ellipse {
                        center: origin,
                        radius,
                    },
                ));
            }
            ObjectShapes::Single(items)
        }
        LayerKind::Region | LayerKind::Container => {
            let points = are_polygon(index, record, "First vertex index", "# vertices", StructKind::Vertex);
            polygon(&label, points)
        }
        LayerKind::Door => ObjectShapes::Dual {
            open: vec![RenderItem::new(
                label.clone(),
                Geometry::Polygon(are_polygon(
                    index,
                    record,
                    "First vertex index (open)",
                    "# vertices (open)",
                    StructKind::OpenVertex,
                )),
            )],
            closed: vec![RenderItem::new(
                label.clone(),
                Geometry::Polygon(are_polygon(
                    index,
                    record,
                    "First vertex index (closed)",
                    "# vertices (closed)",
                    StructKind::ClosedVertex,
                )),
            )],
        },
        LayerKind::DoorPolygon => {
            let polygons = |kind: StructKind| -> Vec<RenderItem> {
                record
                    .children_of(kind)
                    .map(|p| RenderItem::new(label.clone(), Geometry::Polygon(wed_polygon(index, p))))
                    .collect()
            };
            ObjectShapes::Dual {
                open: polygons(StructKind::OpenPolygon),
                closed: polygons(StructKind::ClosedPolygon),
            }
        }
        LayerKind::WallPolygon => polygon(&label, wed_polygon(index, record)),
        LayerKind::Transition => ObjectShapes::Single(Vec::new()),
    };

    LayerObject {
        kind,
        structures: vec![record.clone()],
        label,
        shapes,
        schedule: schedule_mask,
        global_sound,
        edge: None,
    }
}

fn icon(label: &str, position: Point) -> ObjectShapes {
    ObjectShapes::Single(vec![RenderItem::new(label, Geometry::Icon(position))])
}

fn polygon(label: &str, points: Vec<Point>) -> ObjectShapes {
    ObjectShapes::Single(vec![RenderItem::new(label, Geometry::Polygon(points))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::DoorState;
    use crate::format::{are::read_are, wed::read_wed};
    use crate::layer::geometry::{Placement, Viewport};
    use crate::testdata::{AreBuilder, WedBuilder};

    fn index_of(are: AreBuilder, wed: WedBuilder) -> StructureIndex {
        let mut index = StructureIndex::new();
        index.build_are(&read_are("AR0100.ARE", &are.build()).unwrap());
        index.build_wed(&read_wed("AR0100.WED", &wed.build()).unwrap());
        index
    }

    fn polygon_points(item: &RenderItem) -> &[Point] {
        match item.placement() {
            Placement::Polygon { points } => points,
            other => panic!("expected a polygon, got {:?}", other),
        }
    }

    #[test]
    fn door_has_independent_open_and_closed_polygons() {
        let are = AreBuilder::new("AR0100").door(
            "Door1",
            "DOOR01",
            &[(100, 100), (140, 100), (140, 180), (100, 180)],
            &[(90, 90), (120, 95), (130, 120), (125, 150), (100, 160), (92, 130)],
        );
        let index = index_of(are, WedBuilder::new(4, 4, "AR0100"));
        let doors = build_objects(LayerKind::Door, &index);
        assert_eq!(doors.len(), 1);
        let door = &doors[0];
        assert_eq!(door.label(), "Door1");

        let open = &door.items(DoorState::Open)[0];
        let closed = &door.items(DoorState::Closed)[0];
        assert_eq!(polygon_points(open).len(), 4);
        assert_eq!(polygon_points(closed).len(), 6);
        for item in [open, closed] {
            let points = polygon_points(item);
            assert_eq!(points.iter().map(|p| p.x).min(), Some(0));
            assert_eq!(points.iter().map(|p| p.y).min(), Some(0));
        }
        assert_eq!(open.anchor(), Point::new(100, 100));
        assert_eq!(closed.anchor(), Point::new(90, 90));
    }

    #[test]
    fn icons_sit_at_record_positions() {
        let are = AreBuilder::new("AR0100")
            .actor("Guard", (300, 400), 0xFF)
            .entrance("Entry", (10, 20))
            .automap_note((50, 60), 4242)
            .trap("FIREBALL", (7, 8));
        let index = index_of(are, WedBuilder::new(2, 2, "AR0100"));

        let actors = build_objects(LayerKind::Actor, &index);
        assert_eq!(actors[0].map_locations(), vec![Point::new(300, 400)]);
        assert_eq!(actors[0].schedule(), Some(Schedule::from_bits(0xFF)));

        let entrances = build_objects(LayerKind::Entrance, &index);
        assert_eq!(entrances[0].items(DoorState::Open)[0].anchor(), Point::new(10, 20));
        assert_eq!(entrances[0].schedule(), None);

        let notes = build_objects(LayerKind::AutomapNote, &index);
        assert_eq!(notes[0].label(), "Note (strref 4242)");

        let traps = build_objects(LayerKind::ProjectileTrap, &index);
        assert_eq!(traps[0].label(), "FIREBALL");
    }

    #[test]
    fn local_ambients_carry_a_range() {
        let are = AreBuilder::new("AR0100")
            .ambient("Wind", (0, 0), 0, AMBIENT_GLOBAL, 0xFF_FFFF)
            .ambient("Birds", (200, 200), 50, 0, 0xFF_FFFF);
        let index = index_of(are, WedBuilder::new(2, 2, "AR0100"));
        let ambients = build_objects(LayerKind::Ambient, &index);
        assert!(ambients[0].is_global_sound());
        assert_eq!(ambients[0].items(DoorState::Open).len(), 1);
        assert!(!ambients[1].is_global_sound());
        assert_eq!(ambients[1].items(DoorState::Open).len(), 2);
    }

    #[test]
    fn wed_polygons_use_the_merged_pool() {
        let wed = WedBuilder::new(10, 8, "AR0100")
            .wall(&[(0, 0), (64, 0), (64, 64)])
            .door("DOOR01", &[], &[&[(10, 10), (20, 10), (20, 20)]], &[&[(30, 30), (40, 30), (40, 40), (30, 40)]]);
        let index = index_of(AreBuilder::new("AR0100"), wed);

        let walls = build_objects(LayerKind::WallPolygon, &index);
        assert_eq!(walls.len(), 1);
        assert_eq!(polygon_points(&walls[0].items(DoorState::Open)[0]).len(), 3);

        let doors = build_objects(LayerKind::DoorPolygon, &index);
        assert_eq!(doors[0].label(), "DOOR01");
        assert_eq!(polygon_points(&doors[0].items(DoorState::Open)[0]).len(), 3);
        assert_eq!(polygon_points(&doors[0].items(DoorState::Closed)[0]).len(), 4);
    }

    #[test]
    fn transitions_follow_the_map_size() {
        let are = AreBuilder::new("AR0100").edge(0, "AR0200").edge(3, "AR0300");
        let index = index_of(are, WedBuilder::new(2, 2, "AR0100"));
        let mut transitions = build_objects(LayerKind::Transition, &index);
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].label(), "AR0200");
        assert_eq!(transitions[1].edge(), Some(Edge::West));

        transitions[0].update(&Viewport::new((256, 192)));
        let strip = &transitions[0].items(DoorState::Open)[0];
        assert_eq!(
            polygon_points(strip),
            &[Point::new(0, 0), Point::new(256, 0), Point::new(256, 16), Point::new(0, 16)]
        );

        transitions[0].update(&Viewport::new((128, 128)));
        let strip = &transitions[0].items(DoorState::Open)[0];
        assert_eq!(polygon_points(strip)[1], Point::new(128, 0));
    }

    #[test]
    fn unresolvable_vertices_give_an_inert_polygon() {
        let are = AreBuilder::new("AR0100").region("Broken", 0, &[(1, 1), (2, 2), (3, 3)]);
        let mut index = StructureIndex::new();
        let container = read_are("AR0100.ARE", &are.build()).unwrap();
        index.build_are(&container);
        let region = index.index(CategoryKey::are(StructKind::Region))[0].clone();

        // Index without the ARE vertex pool
        let empty = StructureIndex::new();
        let object = build_object(LayerKind::Region, &region, &empty);
        assert_eq!(object.label(), "Broken");
        assert_eq!(polygon_points(&object.items(DoorState::Open)[0]).len(), 0);
    }
}
