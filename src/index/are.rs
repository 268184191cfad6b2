use crate::format::{
    are::{vertex_runs, TABLES, VERTICES_OFFSET},
    StructKind, StructRef, Structure,
};

use super::{declared, owned_vertices, CategoryKey, StructureIndex};

pub(super) fn build(index: &mut StructureIndex, root: &Structure) {
    for table in &TABLES {
        let members = declared(root, root, table.offset_field, table.count_field, table.kind);
        index.insert(CategoryKey::are(table.kind), members);
    }

    let vertex_base = root.unsigned(VERTICES_OFFSET).unwrap_or(0) as u64;
    let mut pools: Vec<(StructKind, Vec<StructRef>)> = vec![
        (StructKind::Vertex, Vec::new()),
        (StructKind::OpenVertex, Vec::new()),
        (StructKind::ClosedVertex, Vec::new()),
    ];
    for owner_kind in [StructKind::Region, StructKind::Container, StructKind::Door] {
        for owner in index.index(CategoryKey::are(owner_kind)).to_vec() {
            for &(first_field, count_field, kind) in vertex_runs(owner_kind) {
                let vertices = owned_vertices(&owner, vertex_base, first_field, count_field, kind);
                if let Some((_, pool)) = pools.iter_mut().find(|(k, _)| *k == kind) {
                    pool.extend(vertices);
                }
            }
        }
    }
    for (kind, pool) in pools {
        index.insert(CategoryKey::are(kind), pool);
    }
}
