//! # Structure Index
//!
//! Named, offset-ordered collections of sub-structures for the active ARE and WED.
//!
//! A collection is found by reading the declared offset and count on a declaring
//! structure, scanning the owner's entry list for the first entry at that offset, and
//! taking the following `count` entries of the requested kind. Derived collections
//! (vertex pools, door tiles) gather the members of already built collections.
//! Every collection is sorted by offset and deduplicated before it is stored.

mod are;
mod wed;

use std::collections::HashMap;

use crate::format::{are::VERTEX_SIZE, Container, StructKind, StructRef, Structure};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Are,
    Wed,
}

/// Two-level collection key: owning container × sub-structure kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CategoryKey {
    pub container: ContainerKind,
    pub kind: StructKind,
}

impl CategoryKey {
    pub const fn are(kind: StructKind) -> Self {
        CategoryKey {
            container: ContainerKind::Are,
            kind,
        }
    }

    pub const fn wed(kind: StructKind) -> Self {
        CategoryKey {
            container: ContainerKind::Wed,
            kind,
        }
    }
}

#[derive(Clone, Default)]
pub struct StructureIndex {
    collections: HashMap<CategoryKey, Vec<StructRef>>,
    are: Option<Container>,
    wed: Option<Container>,
}

impl StructureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset-ordered members of a collection; empty when the category was never built
    pub fn index(&self, key: CategoryKey) -> &[StructRef] {
        self.collections.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn index_by_offset(&self, key: CategoryKey, offset: u64) -> Option<&StructRef> {
        let entries = self.index(key);
        entries
            .binary_search_by_key(&offset, |s| s.offset)
            .ok()
            .map(|i| &entries[i])
    }

    pub fn container(&self, kind: ContainerKind) -> Option<&Container> {
        match kind {
            ContainerKind::Are => self.are.as_ref(),
            ContainerKind::Wed => self.wed.as_ref(),
        }
    }

    /// Re-index an ARE, replacing every ARE category
    pub fn build_are(&mut self, container: &Container) {
        self.clear(ContainerKind::Are);
        are::build(self, &container.root);
        self.are = Some(container.clone());
        log::debug!("Indexed {}: {} categories", container.name, self.category_count(ContainerKind::Are));
    }

    /// Re-index a WED, replacing every WED category
    pub fn build_wed(&mut self, container: &Container) {
        self.clear(ContainerKind::Wed);
        wed::build(self, &container.root);
        self.wed = Some(container.clone());
        log::debug!("Indexed {}: {} categories", container.name, self.category_count(ContainerKind::Wed));
    }

    fn category_count(&self, container: ContainerKind) -> usize {
        self.collections.keys().filter(|k| k.container == container).count()
    }

    fn clear(&mut self, container: ContainerKind) {
        self.collections.retain(|k, _| k.container != container);
    }

    fn insert(&mut self, key: CategoryKey, mut entries: Vec<StructRef>) {
        finalize(&mut entries);
        self.collections.insert(key, entries);
    }
}

/// Sort by offset and drop later entries that share an offset
pub fn finalize(entries: &mut Vec<StructRef>) {
    entries.sort_by_key(|s| s.offset);
    entries.dedup_by_key(|s| s.offset);
}

/// Union of several collections, offset-ordered and deduplicated
pub fn merge<I>(sources: I) -> Vec<StructRef>
where
    I: IntoIterator<Item = StructRef>,
{
    let mut pool: Vec<StructRef> = sources.into_iter().collect();
    finalize(&mut pool);
    pool
}

/// Take `count` entries of `kind` from `owner`, starting at the entry located at `offset`.
///
/// A zero offset or count is an empty collection. An offset with no matching entry is
/// logged and also yields an empty collection.
pub fn slice(owner: &Structure, offset: u64, count: usize, kind: StructKind) -> Vec<StructRef> {
    if offset == 0 || count == 0 {
        return Vec::new();
    }
    let start = owner
        .entries()
        .iter()
        .position(|e| e.offset() == offset && e.as_struct().map_or(false, |s| s.kind == kind));
    let Some(start) = start else {
        log::debug!(
            "No {} at offset 0x{:x} in {} @ 0x{:x}",
            kind,
            offset,
            owner.kind,
            owner.offset
        );
        return Vec::new();
    };

    let found: Vec<StructRef> = owner.entries()[start..]
        .iter()
        .filter_map(|e| e.as_struct())
        .filter(|s| s.kind == kind)
        .take(count)
        .cloned()
        .collect();
    if found.len() < count {
        log::warn!(
            "{} @ 0x{:x} declares {} {} entries, found {}",
            owner.kind,
            owner.offset,
            count,
            kind,
            found.len()
        );
    }
    found
}

/// [`slice`] with offset and count read from fields of `declaring`
pub fn declared(
    owner: &Structure,
    declaring: &Structure,
    offset_field: &str,
    count_field: &str,
    kind: StructKind,
) -> Vec<StructRef> {
    match (declaring.unsigned(offset_field), declaring.unsigned(count_field)) {
        (Some(offset), Some(count)) => slice(owner, offset as u64, count as usize, kind),
        _ => Vec::new(),
    }
}

/// Vertices owned by `owner` given the vertex table base and first-index/count fields
pub fn owned_vertices(
    owner: &Structure,
    vertex_base: u64,
    first_field: &str,
    count_field: &str,
    kind: StructKind,
) -> Vec<StructRef> {
    let first = owner.unsigned(first_field).unwrap_or(0) as u64;
    let count = owner.unsigned(count_field).unwrap_or(0) as usize;
    slice(owner, vertex_base + first * VERTEX_SIZE, count, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{are::read_are, wed::read_wed};
    use crate::testdata::{AreBuilder, WedBuilder};

    fn assert_ordered_unique(entries: &[StructRef]) {
        for pair in entries.windows(2) {
            assert!(pair[0].offset < pair[1].offset, "{} >= {}", pair[0].offset, pair[1].offset);
        }
    }

    fn indexed(are: Vec<u8>, wed: Vec<u8>) -> StructureIndex {
        let mut index = StructureIndex::new();
        index.build_are(&read_are("AR0100.ARE", &are).unwrap());
        index.build_wed(&read_wed("AR0100.WED", &wed).unwrap());
        index
    }

    #[test]
    fn collections_are_offset_ordered_and_unique() {
        let are = AreBuilder::new("AR0100")
            .actor("A", (1, 1), 0)
            .actor("B", (2, 2), 0)
            .region("R", 0, &[(0, 0), (5, 0), (5, 5)])
            .container("C", (3, 3), &[(0, 0), (1, 0), (1, 1)])
            .door("D", "DOOR01", &[(0, 0), (1, 1), (2, 2)], &[(3, 3), (4, 4)])
            .build();
        let wed = WedBuilder::new(10, 8, "AR0100")
            .wall(&[(0, 0), (10, 0), (10, 10)])
            .door("DOOR01", &[1, 2], &[&[(0, 0), (1, 0), (1, 1)]], &[&[(2, 2), (3, 2), (3, 3)]])
            .wall_ref(0, 2)
            .build();
        let index = indexed(are, wed);

        for entries in index.collections.values() {
            assert_ordered_unique(entries);
        }
        assert_eq!(index.index(CategoryKey::are(StructKind::Actor)).len(), 2);
        assert_eq!(index.index(CategoryKey::wed(StructKind::Tilemap)).len(), 80);
        assert_eq!(index.index(CategoryKey::wed(StructKind::WallPolygon)).len(), 2);
    }

    #[test]
    fn missing_declaration_is_an_empty_collection() {
        let are = AreBuilder::new("AR0100").build();
        let wed = WedBuilder::new(2, 2, "AR0100").build();
        let index = indexed(are, wed);
        assert!(index.index(CategoryKey::are(StructKind::Actor)).is_empty());
        assert!(index.index(CategoryKey::wed(StructKind::WedDoor)).is_empty());
        assert!(index.index(CategoryKey::wed(StructKind::WallPolygon)).is_empty());
    }

    #[test]
    fn unmatched_offset_leaves_only_that_category_empty() {
        let data = AreBuilder::new("AR0100")
            .actor("A", (1, 1), 0)
            .entrance("E", (5, 5))
            .build();
        let are = read_are("AR0100.ARE", &data).unwrap();
        let actors = slice(&are.root, 3, 1, StructKind::Actor);
        assert!(actors.is_empty());

        let mut index = StructureIndex::new();
        index.build_are(&are);
        assert_eq!(index.index(CategoryKey::are(StructKind::Entrance)).len(), 1);
    }

    #[test]
    fn lookup_by_offset() {
        let data = AreBuilder::new("AR0100")
            .actor("A", (1, 1), 0)
            .actor("B", (2, 2), 0)
            .build();
        let mut index = StructureIndex::new();
        index.build_are(&read_are("AR0100.ARE", &data).unwrap());
        let key = CategoryKey::are(StructKind::Actor);
        let second = index.index(key)[1].clone();
        let found = index.index_by_offset(key, second.offset).unwrap();
        assert_eq!(found.text("Name"), Some("B"));
        assert!(index.index_by_offset(key, second.offset + 1).is_none());
    }

    #[test]
    fn shared_vertex_across_polygon_kinds_appears_once() {
        // The second wall polygon reuses vertex 3, the first vertex of the door's open polygon
        let wed = WedBuilder::new(10, 8, "AR0100")
            .wall(&[(0, 0), (10, 0), (10, 10)])
            .door("DOOR01", &[], &[&[(20, 20), (30, 20), (30, 30)]], &[])
            .wall_ref(3, 1)
            .build();
        let mut index = StructureIndex::new();
        index.build_wed(&read_wed("AR0100.WED", &wed).unwrap());

        let pool = index.index(CategoryKey::wed(StructKind::Vertex));
        assert_eq!(pool.len(), 6);
        assert_ordered_unique(pool);
        let shared = pool[3].offset;
        assert_eq!(pool.iter().filter(|v| v.offset == shared).count(), 1);
    }

    #[test]
    fn rebuilding_wed_replaces_wed_categories_only() {
        let are = AreBuilder::new("AR0100").actor("A", (1, 1), 0).build();
        let wed = WedBuilder::new(4, 4, "AR0100").wall(&[(0, 0), (1, 0), (1, 1)]).build();
        let mut index = indexed(are, wed);
        assert_eq!(index.index(CategoryKey::wed(StructKind::WallPolygon)).len(), 1);

        let night = WedBuilder::new(2, 2, "AR0100N").build();
        index.build_wed(&read_wed("AR0100N.WED", &night).unwrap());
        assert!(index.index(CategoryKey::wed(StructKind::WallPolygon)).is_empty());
        assert_eq!(index.index(CategoryKey::wed(StructKind::Tilemap)).len(), 4);
        assert_eq!(index.index(CategoryKey::are(StructKind::Actor)).len(), 1);
        assert_eq!(index.container(ContainerKind::Wed).unwrap().name, "AR0100N.WED");
    }
}
