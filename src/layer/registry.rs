//! # Layer Registry
//!
//! One lazily loaded collection per layer kind, plus the viewer state that decides what
//! is shown. An item is shown when its collection is visible, its schedule allows the
//! active hour (or schedule filtering is off), and for doors the item belongs to the
//! active door state.

use super::build::build_objects;
use super::geometry::{Geometry, RenderItem, Viewport};
use super::object::{AnimationMode, ItemDescriptor, LayerKind, LayerObject};
use crate::compositor::DoorState;
use crate::index::{ContainerKind, StructureIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loaded,
}

/// Ambient sound subsets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundScope {
    /// Audible everywhere, no range shape
    Global,
    /// Has a sound range
    Local,
}

pub struct LayerCollection {
    kind: LayerKind,
    state: LoadState,
    visible: bool,
    objects: Vec<LayerObject>,
    global_sounds: Vec<usize>,
    local_sounds: Vec<usize>,
}

impl LayerCollection {
    pub fn new(kind: LayerKind) -> Self {
        LayerCollection {
            kind,
            state: LoadState::Unloaded,
            visible: true,
            objects: Vec::new(),
            global_sounds: Vec::new(),
            local_sounds: Vec::new(),
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Build the object list from the index. A loaded collection is left untouched
    /// unless `force` is set; the return value is the number of objects loaded.
    pub fn load(&mut self, force: bool, index: &StructureIndex, viewport: &Viewport) -> usize {
        if self.state == LoadState::Loaded && !force {
            return 0;
        }
        let mut objects = build_objects(self.kind, index);
        for object in &mut objects {
            object.update(viewport);
        }

        // Snapshot of the global/local split; edits to the flags need a forced reload
        let (global, local): (Vec<usize>, Vec<usize>) =
            (0..objects.len()).partition(|&i| objects[i].is_global_sound());
        if self.kind == LayerKind::Ambient {
            self.global_sounds = global;
            self.local_sounds = local;
        }

        self.objects = objects;
        self.state = LoadState::Loaded;
        log::debug!("Loaded {} {}", self.objects.len(), self.kind);
        self.objects.len()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object_at(&self, index: usize) -> Option<&LayerObject> {
        self.objects.get(index)
    }

    pub fn objects(&self) -> &[LayerObject] {
        &self.objects
    }

    /// Ambient sounds of one scope; empty for other layer kinds
    pub fn sounds(&self, scope: SoundScope) -> impl Iterator<Item = &LayerObject> {
        let indices = match scope {
            SoundScope::Global => &self.global_sounds,
            SoundScope::Local => &self.local_sounds,
        };
        indices.iter().filter_map(move |&i| self.objects.get(i))
    }

    pub fn update(&mut self, viewport: &Viewport) {
        for object in &mut self.objects {
            object.update(viewport);
        }
    }

    /// Re-derive a single object from its backing records
    pub fn reload_object(&mut self, position: usize, index: &StructureIndex, viewport: &Viewport) -> bool {
        match self.objects.get_mut(position) {
            Some(object) => {
                object.reload(index, viewport);
                true
            }
            None => false,
        }
    }
}

pub struct LayerRegistry {
    collections: Vec<LayerCollection>,
    viewport: Viewport,
    schedule_filter: bool,
    hour: u32,
    door_state: DoorState,
    ambient_icons: bool,
    ambient_ranges: bool,
    animation: AnimationMode,
    are_name: Option<String>,
    wed_name: Option<String>,
}

impl LayerRegistry {
    pub fn new(viewport: Viewport) -> Self {
        LayerRegistry {
            collections: LayerKind::ALL.into_iter().map(LayerCollection::new).collect(),
            viewport,
            schedule_filter: false,
            hour: 12,
            door_state: DoorState::Open,
            ambient_icons: true,
            ambient_ranges: true,
            animation: AnimationMode::Icon,
            are_name: None,
            wed_name: None,
        }
    }

    pub fn collection(&self, kind: LayerKind) -> &LayerCollection {
        &self.collections[kind as usize]
    }

    pub fn collection_mut(&mut self, kind: LayerKind) -> &mut LayerCollection {
        &mut self.collections[kind as usize]
    }

    fn container_name(index: &StructureIndex, kind: ContainerKind) -> Option<String> {
        index.container(kind).map(|c| c.name.clone())
    }

    /// Load every collection. Returns the total number of objects loaded.
    ///
    /// Without `force`, loaded collections whose source container changed are reloaded
    /// first, so a later [`sync`](Self::sync) still sees them as current.
    pub fn load_all(&mut self, force: bool, index: &StructureIndex) -> usize {
        let mut total = 0;
        if !force {
            let viewport = self.viewport;
            for kind in self.sync(index, viewport) {
                total += self.collection(kind).object_count();
            }
        }
        self.are_name = Self::container_name(index, ContainerKind::Are);
        self.wed_name = Self::container_name(index, ContainerKind::Wed);
        let viewport = self.viewport;
        total
            + self
                .collections
                .iter_mut()
                .map(|c| c.load(force, index, &viewport))
                .sum::<usize>()
    }

    /// Reload loaded collections whose source container changed name since the last load.
    ///
    /// ARE-backed kinds follow the area; door and wall polygons follow the active WED.
    /// `viewport` replaces the stored one; when it differs, the collections that were
    /// not reloaded are updated against it (a variant switch can change the map size).
    pub fn sync(&mut self, index: &StructureIndex, viewport: Viewport) -> Vec<LayerKind> {
        let are_name = Self::container_name(index, ContainerKind::Are);
        let wed_name = Self::container_name(index, ContainerKind::Wed);
        let are_changed = are_name != self.are_name;
        let wed_changed = wed_name != self.wed_name;
        self.are_name = are_name;
        self.wed_name = wed_name;

        let moved = viewport != self.viewport;
        self.viewport = viewport;
        let mut reloaded = Vec::new();
        for collection in &mut self.collections {
            let changed = match collection.kind.source() {
                ContainerKind::Are => are_changed,
                ContainerKind::Wed => wed_changed,
            };
            if changed && collection.state == LoadState::Loaded {
                collection.load(true, index, &viewport);
                reloaded.push(collection.kind);
            } else if moved {
                collection.update(&viewport);
            }
        }
        if !reloaded.is_empty() {
            log::info!("Reloaded layers: {:?}", reloaded);
        }
        reloaded
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Recompute device positions of every loaded object
    pub fn update(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        for collection in &mut self.collections {
            collection.update(&viewport);
        }
    }

    pub fn set_visible(&mut self, kind: LayerKind, visible: bool) {
        self.collection_mut(kind).set_visible(visible);
    }

    pub fn set_all_visible(&mut self, visible: bool) {
        for collection in &mut self.collections {
            collection.set_visible(visible);
        }
    }

    pub fn set_schedule_filter(&mut self, enabled: bool) {
        self.schedule_filter = enabled;
    }

    pub fn schedule_filter(&self) -> bool {
        self.schedule_filter
    }

    pub fn set_hour(&mut self, hour: u32) {
        self.hour = hour % 24;
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn set_door_state(&mut self, state: DoorState) {
        self.door_state = state;
    }

    pub fn door_state(&self) -> DoorState {
        self.door_state
    }

    pub fn set_ambient_icons(&mut self, visible: bool) {
        self.ambient_icons = visible;
    }

    pub fn set_ambient_ranges(&mut self, visible: bool) {
        self.ambient_ranges = visible;
    }

    /// Enabling animation implies real graphics
    pub fn set_animation_animated(&mut self, animated: bool) {
        self.animation = match (animated, self.animation) {
            (true, _) => AnimationMode::Animated,
            (false, AnimationMode::Animated) => AnimationMode::Real,
            (false, mode) => mode,
        };
    }

    /// Disabling real graphics also disables animation
    pub fn set_animation_real(&mut self, real: bool) {
        self.animation = match (real, self.animation) {
            (false, _) => AnimationMode::Icon,
            (true, AnimationMode::Icon) => AnimationMode::Real,
            (true, mode) => mode,
        };
    }

    pub fn animation_mode(&self) -> AnimationMode {
        self.animation
    }

    pub fn is_object_visible(&self, object: &LayerObject) -> bool {
        self.collection(object.kind()).is_visible()
            && (!self.schedule_filter
                || object
                    .schedule()
                    .map_or(true, |schedule| schedule.is_active(self.hour)))
    }

    fn is_item_shown(&self, kind: LayerKind, item: &RenderItem) -> bool {
        match (kind, &item.geometry) {
            (LayerKind::Ambient, Geometry::Ellipse { .. }) => self.ambient_ranges,
            (LayerKind::Ambient, _) => self.ambient_icons,
            _ => true,
        }
    }

    /// Items currently shown for one layer
    pub fn visible_items(&self, kind: LayerKind) -> Vec<&RenderItem> {
        self.collection(kind)
            .objects()
            .iter()
            .filter(|object| self.is_object_visible(object))
            .flat_map(|object| object.items(self.door_state))
            .filter(|item| self.is_item_shown(kind, item))
            .collect()
    }

    /// Descriptors of every shown item, in layer order
    pub fn descriptors(&self) -> Vec<ItemDescriptor> {
        let mut descriptors = Vec::new();
        for kind in LayerKind::ALL {
            for item in self.visible_items(kind) {
                let mut descriptor = ItemDescriptor::new(kind, item);
                if kind == LayerKind::Animation {
                    descriptor.animation = Some(self.animation);
                }
                descriptors.push(descriptor);
            }
        }
        descriptors
    }
}
