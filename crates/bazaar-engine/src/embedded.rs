//! Sub-documents stored in an array field of a parent and addressed by their
//! own `_id`: a user's addresses, a category's sub-categories, and so on.
//!
//! Every helper here works on a parent [`Document`] already loaded by the
//! caller. [`with_parent`] wraps the load / mutate / save cycle.

use bazaar_store::Collection;
use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::error::EngineError;
use crate::fetch::object_id;

/// An array-of-sub-documents field and the entity name used in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedField {
    pub field: &'static str,
    pub entity: &'static str,
}

impl EmbeddedField {
    pub const fn new(field: &'static str, entity: &'static str) -> Self {
        Self { field, entity }
    }

    fn not_found(self, id: &ObjectId) -> EngineError {
        EngineError::EmbeddedNotFound {
            entity: self.entity,
            id: *id,
        }
    }
}

fn has_id(item: &Bson, id: &ObjectId) -> bool {
    match item {
        Bson::Document(sub) => sub.get("_id").and_then(object_id).as_ref() == Some(id),
        _ => false,
    }
}

fn items<'a>(parent: &'a Document, field: EmbeddedField) -> &'a [Bson] {
    match parent.get(field.field) {
        Some(Bson::Array(items)) => items,
        _ => &[],
    }
}

/// Find the element of `parent[field]` whose `_id` is `id`.
pub fn find<'a>(
    parent: &'a Document,
    field: EmbeddedField,
    id: &ObjectId,
) -> Result<&'a Document, EngineError> {
    items(parent, field)
        .iter()
        .find_map(|item| match item {
            Bson::Document(sub) if has_id(item, id) => Some(sub),
            _ => None,
        })
        .ok_or_else(|| field.not_found(id))
}

pub fn find_mut<'a>(
    parent: &'a mut Document,
    field: EmbeddedField,
    id: &ObjectId,
) -> Result<&'a mut Document, EngineError> {
    let Some(Bson::Array(items)) = parent.get_mut(field.field) else {
        return Err(field.not_found(id));
    };
    items
        .iter_mut()
        .find_map(|item| match item {
            Bson::Document(sub) if sub.get("_id").and_then(object_id).as_ref() == Some(id) => {
                Some(sub)
            }
            _ => None,
        })
        .ok_or_else(|| field.not_found(id))
}

/// Walk a chain of embedded lookups, e.g. sub-category then type.
pub fn find_path_mut<'a>(
    parent: &'a mut Document,
    path: &[(EmbeddedField, ObjectId)],
) -> Result<&'a mut Document, EngineError> {
    let mut current = parent;
    for (field, id) in path {
        current = find_mut(current, *field, id)?;
    }
    Ok(current)
}

pub fn find_path<'a>(
    parent: &'a Document,
    path: &[(EmbeddedField, ObjectId)],
) -> Result<&'a Document, EngineError> {
    let mut current = parent;
    for (field, id) in path {
        current = find(current, *field, id)?;
    }
    Ok(current)
}

/// Append `sub` to `parent[field]`, assigning an `_id` if it has none.
pub fn push(parent: &mut Document, field: EmbeddedField, mut sub: Document) -> ObjectId {
    let id = ensure_id(&mut sub);
    match parent.get_mut(field.field) {
        Some(Bson::Array(items)) => items.push(Bson::Document(sub)),
        _ => {
            parent.insert(field.field, Bson::Array(vec![Bson::Document(sub)]));
        }
    }
    id
}

/// Merge `patch` into the addressed element.
///
/// `null` values in the patch leave the stored value alone. An `_id` in the
/// patch is accepted only if it equals the current one.
pub fn update<'a>(
    parent: &'a mut Document,
    field: EmbeddedField,
    id: &ObjectId,
    patch: Document,
) -> Result<&'a Document, EngineError> {
    if let Some(new_id) = patch.get("_id") {
        if object_id(new_id).as_ref() != Some(id) {
            return Err(EngineError::IdImmutable {
                entity: field.entity,
            });
        }
    }
    let sub = find_mut(parent, field, id)?;
    merge(sub, patch);
    Ok(&*sub)
}

/// Remove the addressed element and return it.
pub fn remove(
    parent: &mut Document,
    field: EmbeddedField,
    id: &ObjectId,
) -> Result<Document, EngineError> {
    let Some(Bson::Array(items)) = parent.get_mut(field.field) else {
        return Err(field.not_found(id));
    };
    let pos = items
        .iter()
        .position(|item| has_id(item, id))
        .ok_or_else(|| field.not_found(id))?;
    match items.remove(pos) {
        Bson::Document(sub) => Ok(sub),
        _ => Err(field.not_found(id)),
    }
}

/// Shallow merge skipping `_id` and `null` values.
pub fn merge(target: &mut Document, patch: Document) {
    for (k, v) in patch {
        if k == "_id" || matches!(v, Bson::Null) {
            continue;
        }
        target.insert(k, v);
    }
}

/// Give `doc` an `_id` if it lacks one and return it.
pub fn ensure_id(doc: &mut Document) -> ObjectId {
    if let Some(id) = doc.get("_id").and_then(object_id) {
        doc.insert("_id", id);
        return id;
    }
    let id = ObjectId::new();
    doc.insert("_id", id);
    id
}

/// Assign ids to every sub-document reachable through `fields`, at any
/// depth. Used on create so nested levels are addressable afterwards.
pub fn assign_ids(doc: &mut Document, fields: &[&str]) {
    for field in fields {
        if let Some(Bson::Array(items)) = doc.get_mut(*field) {
            for item in items.iter_mut() {
                if let Bson::Document(sub) = item {
                    ensure_id(sub);
                    assign_ids(sub, fields);
                }
            }
        }
    }
}

/// Load `parent_id` from `coll`, run `f` on it, then persist the result.
///
/// The whole cycle is one [`Collection::modify`] call, so concurrent edits
/// of the same parent are applied one after another. Nothing is written when
/// `f` fails. `f` must not call back into `coll`.
pub fn with_parent<C, T>(
    coll: &C,
    parent_id: &ObjectId,
    entity: &'static str,
    f: impl FnOnce(&mut Document) -> Result<T, EngineError>,
) -> Result<(T, Document), EngineError>
where
    C: Collection + ?Sized,
{
    let mut f = Some(f);
    let mut out = None;
    let saved = coll.modify(parent_id, &mut |parent| match f.take() {
        Some(f) => {
            let result = f(parent);
            let commit = result.is_ok();
            out = Some(result);
            commit
        }
        None => false,
    })?;
    let saved = saved.ok_or(EngineError::NotFound { entity })?;
    match out {
        Some(result) => Ok((result?, saved)),
        None => Err(EngineError::NotFound { entity }),
    }
}
