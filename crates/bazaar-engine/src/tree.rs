use std::collections::HashSet;

use bazaar_query::{Clause, Field, FilterSpec, Query};
use bazaar_store::Collection;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use tracing::debug;

use crate::error::EngineError;
use crate::fetch::object_id;

/// Every id in the reply tree rooted at `root`, root first, level by level.
///
/// `parent` names the field that points a node at its parent. One query is
/// issued per level. Ids already visited are skipped, so a cycle in stored
/// data cannot loop forever.
pub fn collect_subtree<C, F>(coll: &C, root: ObjectId, parent: F) -> Result<Vec<ObjectId>, EngineError>
where
    C: Collection + ?Sized,
    F: Field,
{
    let mut ids = vec![root];
    let mut seen = HashSet::from([root]);
    let mut frontier = vec![root];

    while !frontier.is_empty() {
        let filter = FilterSpec::new().with(Clause::one_of(
            parent,
            frontier.iter().copied().map(Bson::ObjectId).collect(),
        ));
        let children = coll.find(&Query::new(filter))?;
        frontier = children
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .filter(|id| seen.insert(*id))
            .collect();
        ids.extend_from_slice(&frontier);
    }
    Ok(ids)
}

/// Delete `root` and all of its descendants in a single batch.
pub fn delete_tree<C, F>(coll: &C, root: ObjectId, parent: F) -> Result<u64, EngineError>
where
    C: Collection + ?Sized,
    F: Field,
{
    let ids = collect_subtree(coll, root, parent)?;
    let removed = coll.delete_many(&ids)?;
    debug!(collection = coll.name(), %root, removed, "deleted reply tree");
    Ok(removed)
}

/// Append `child` to the id array `parent[field]`, creating it if missing.
pub fn link(parent: &mut Document, field: &str, child: ObjectId) {
    match parent.get_mut(field) {
        Some(Bson::Array(items)) => items.push(Bson::ObjectId(child)),
        _ => {
            parent.insert(field, vec![Bson::ObjectId(child)]);
        }
    }
}

/// Drop every id in `ids` from the id array `parent[field]`. Returns how
/// many entries went.
pub fn unlink(parent: &mut Document, field: &str, ids: &[ObjectId]) -> usize {
    let Some(Bson::Array(items)) = parent.get_mut(field) else {
        return 0;
    };
    let before = items.len();
    items.retain(|item| object_id(item).is_none_or(|id| !ids.contains(&id)));
    before - items.len()
}
