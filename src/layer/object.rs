use std::fmt;

use serde::{Deserialize, Serialize};

use super::build::{rebuild, transition_strip};
use super::geometry::{Geometry, Placement, Point, RenderItem, Viewport};
use crate::compositor::DoorState;
use crate::format::{StructKind, StructRef};
use crate::index::{CategoryKey, ContainerKind, StructureIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Actor,
    Region,
    Entrance,
    Container,
    Ambient,
    Door,
    Animation,
    AutomapNote,
    SpawnPoint,
    Transition,
    ProjectileTrap,
    DoorPolygon,
    WallPolygon,
}

impl LayerKind {
    pub const ALL: [LayerKind; 13] = [
        LayerKind::Actor,
        LayerKind::Region,
        LayerKind::Entrance,
        LayerKind::Container,
        LayerKind::Ambient,
        LayerKind::Door,
        LayerKind::Animation,
        LayerKind::AutomapNote,
        LayerKind::SpawnPoint,
        LayerKind::Transition,
        LayerKind::ProjectileTrap,
        LayerKind::DoorPolygon,
        LayerKind::WallPolygon,
    ];

    /// Container whose change triggers a reload of this layer
    pub fn source(self) -> ContainerKind {
        match self {
            LayerKind::DoorPolygon | LayerKind::WallPolygon => ContainerKind::Wed,
            _ => ContainerKind::Are,
        }
    }

    /// Indexed category backing one object each; transitions come from the ARE header instead
    pub fn category(self) -> Option<CategoryKey> {
        let key = match self {
            LayerKind::Actor => CategoryKey::are(StructKind::Actor),
            LayerKind::Region => CategoryKey::are(StructKind::Region),
            LayerKind::Entrance => CategoryKey::are(StructKind::Entrance),
            LayerKind::Container => CategoryKey::are(StructKind::Container),
            LayerKind::Ambient => CategoryKey::are(StructKind::Ambient),
            LayerKind::Door => CategoryKey::are(StructKind::Door),
            LayerKind::Animation => CategoryKey::are(StructKind::Animation),
            LayerKind::AutomapNote => CategoryKey::are(StructKind::AutomapNote),
            LayerKind::SpawnPoint => CategoryKey::are(StructKind::SpawnPoint),
            LayerKind::ProjectileTrap => CategoryKey::are(StructKind::ProjectileTrap),
            LayerKind::DoorPolygon => CategoryKey::wed(StructKind::WedDoor),
            LayerKind::WallPolygon => CategoryKey::wed(StructKind::WallPolygon),
            LayerKind::Transition => return None,
        };
        Some(key)
    }

    pub fn is_dual_state(self) -> bool {
        matches!(self, LayerKind::Door | LayerKind::DoorPolygon)
    }

    pub fn is_scheduled(self) -> bool {
        matches!(
            self,
            LayerKind::Actor | LayerKind::Ambient | LayerKind::Animation | LayerKind::SpawnPoint
        )
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerKind::Actor => "Actors",
            LayerKind::Region => "Regions",
            LayerKind::Entrance => "Entrances",
            LayerKind::Container => "Containers",
            LayerKind::Ambient => "Ambient Sounds",
            LayerKind::Door => "Doors",
            LayerKind::Animation => "Background Animations",
            LayerKind::AutomapNote => "Automap Notes",
            LayerKind::SpawnPoint => "Spawn Points",
            LayerKind::Transition => "Map Transitions",
            LayerKind::ProjectileTrap => "Projectile Traps",
            LayerKind::DoorPolygon => "Door Polygons",
            LayerKind::WallPolygon => "Wall Polygons",
        };
        f.write_str(name)
    }
}

/// 24-bit activity mask, bit `h` set when the object is present during hour `h`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule(u32);

impl Schedule {
    pub const ALWAYS: Schedule = Schedule(0xFF_FFFF);

    pub fn from_bits(bits: u32) -> Self {
        Schedule(bits & 0xFF_FFFF)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_active(self, hour: u32) -> bool {
        hour < 24 && self.0 & (1 << hour) != 0
    }
}

/// Map edge a transition strip is attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    North,
    East,
    South,
    West,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::North, Edge::East, Edge::South, Edge::West];
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectShapes {
    Single(Vec<RenderItem>),
    Dual {
        open: Vec<RenderItem>,
        closed: Vec<RenderItem>,
    },
}

/// How background animations are drawn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationMode {
    #[default]
    Icon,
    Real,
    Animated,
}

/// Placed object: backing records, label, and one or two item sets
#[derive(Clone, Debug)]
pub struct LayerObject {
    pub(super) kind: LayerKind,
    pub(super) structures: Vec<StructRef>,
    pub(super) label: String,
    pub(super) shapes: ObjectShapes,
    pub(super) schedule: Option<Schedule>,
    pub(super) global_sound: bool,
    pub(super) edge: Option<Edge>,
}

impl LayerObject {
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn structures(&self) -> &[StructRef] {
        &self.structures
    }

    pub fn shapes(&self) -> &ObjectShapes {
        &self.shapes
    }

    pub fn schedule(&self) -> Option<Schedule> {
        self.schedule
    }

    /// Ambient sound audible everywhere on the map
    pub fn is_global_sound(&self) -> bool {
        self.global_sound
    }

    pub fn edge(&self) -> Option<Edge> {
        self.edge
    }

    /// Items exposed for a door state; single-state objects ignore it
    pub fn items(&self, state: DoorState) -> &[RenderItem] {
        match (&self.shapes, state) {
            (ObjectShapes::Single(items), _) => items,
            (ObjectShapes::Dual { open, .. }, DoorState::Open) => open,
            (ObjectShapes::Dual { closed, .. }, DoorState::Closed) => closed,
        }
    }

    fn all_items_mut(&mut self) -> impl Iterator<Item = &mut RenderItem> {
        let (first, second): (&mut Vec<RenderItem>, Option<&mut Vec<RenderItem>>) = match &mut self.shapes {
            ObjectShapes::Single(items) => (items, None),
            ObjectShapes::Dual { open, closed } => (open, Some(closed)),
        };
        first.iter_mut().chain(second.into_iter().flatten())
    }

    /// Map-space anchor of every item, both door states included
    pub fn map_locations(&self) -> Vec<Point> {
        let items: Vec<&RenderItem> = match &self.shapes {
            ObjectShapes::Single(items) => items.iter().collect(),
            ObjectShapes::Dual { open, closed } => open.iter().chain(closed).collect(),
        };
        items.iter().map(|i| i.map_location()).collect()
    }

    pub fn update(&mut self, viewport: &Viewport) {
        if let Some(edge) = self.edge {
            let strip = transition_strip(edge, viewport.map_size);
            for item in self.all_items_mut() {
                item.geometry = Geometry::Polygon(strip.clone());
            }
        }
        for item in self.all_items_mut() {
            item.update(viewport);
        }
    }

    /// Re-derive geometry and labels from the backing records
    pub fn reload(&mut self, index: &StructureIndex, viewport: &Viewport) {
        if let Some(fresh) = rebuild(self, index) {
            *self = fresh;
        }
        self.update(viewport);
    }
}

/// Serializable view of one visible item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub kind: LayerKind,
    pub label: String,
    pub anchor: Point,
    pub shape: Placement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationMode>,
}

impl ItemDescriptor {
    pub fn new(kind: LayerKind, item: &RenderItem) -> Self {
        ItemDescriptor {
            kind,
            label: item.label.clone(),
            anchor: item.anchor(),
            shape: item.placement().clone(),
            animation: None,
        }
    }
}
