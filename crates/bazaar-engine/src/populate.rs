use std::collections::{HashMap, HashSet};

use bazaar_store::Collection;
use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::error::EngineError;
use crate::fetch::object_id;

/// Which fields of a referenced document survive population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    All,
    /// Keep only these fields (plus `_id`).
    Include(&'static [&'static str]),
    Exclude(&'static [&'static str]),
}

impl Projection {
    pub fn apply(&self, doc: Document) -> Document {
        match self {
            Projection::All => doc,
            Projection::Include(keep) => doc
                .into_iter()
                .filter(|(k, _)| k == "_id" || keep.contains(&k.as_str()))
                .collect(),
            Projection::Exclude(drop) => doc
                .into_iter()
                .filter(|(k, _)| !drop.contains(&k.as_str()))
                .collect(),
        }
    }
}

/// Replace the id (or array of ids) at `path` in every document with the
/// referenced document from `target`.
///
/// `path` is dotted and fans out through arrays, so `replies.user` populates
/// the author of every already-populated reply. One batched lookup is made
/// for all documents. A dangling single reference becomes `null`; dangling
/// entries in an array are dropped.
pub fn populate<C: Collection + ?Sized>(
    target: &C,
    docs: &mut [Document],
    path: &str,
    projection: Projection,
) -> Result<(), EngineError> {
    let mut wanted = Vec::new();
    let mut seen = HashSet::new();
    for doc in docs.iter_mut() {
        visit_mut(doc, path, &mut |value| {
            for id in referenced_ids(value) {
                if seen.insert(id) {
                    wanted.push(id);
                }
            }
        });
    }
    if wanted.is_empty() {
        return Ok(());
    }

    let found: HashMap<ObjectId, Document> = target
        .get_many(&wanted)?
        .into_iter()
        .filter_map(|d| {
            let id = d.get_object_id("_id").ok()?;
            Some((id, projection.apply(d)))
        })
        .collect();

    for doc in docs.iter_mut() {
        visit_mut(doc, path, &mut |value| substitute(value, &found));
    }
    Ok(())
}

/// Resolve a reference into an array of sub-documents held by another
/// document: `doc[owner_field]` names the owner in `owners`, `doc[ref_field]`
/// names an element of `owner[array_field]`. The element replaces the id,
/// or `null` when either side is missing.
pub fn populate_embedded<C: Collection + ?Sized>(
    owners: &C,
    docs: &mut [Document],
    owner_field: &str,
    ref_field: &str,
    array_field: &str,
) -> Result<(), EngineError> {
    let mut owner_ids: Vec<ObjectId> = docs
        .iter()
        .filter_map(|d| d.get(owner_field).and_then(object_id))
        .collect();
    owner_ids.sort();
    owner_ids.dedup();
    if owner_ids.is_empty() {
        return Ok(());
    }

    let owner_docs: HashMap<ObjectId, Document> = owners
        .get_many(&owner_ids)?
        .into_iter()
        .filter_map(|d| Some((d.get_object_id("_id").ok()?, d)))
        .collect();

    for doc in docs.iter_mut() {
        let Some(sub_id) = doc.get(ref_field).and_then(object_id) else {
            continue;
        };
        let resolved = doc
            .get(owner_field)
            .and_then(object_id)
            .and_then(|owner| owner_docs.get(&owner))
            .and_then(|owner| owner.get_array(array_field).ok())
            .and_then(|items| {
                items.iter().find_map(|item| match item {
                    Bson::Document(sub) if sub.get("_id").and_then(object_id) == Some(sub_id) => {
                        Some(sub.clone())
                    }
                    _ => None,
                })
            });
        doc.insert(
            ref_field.to_string(),
            resolved.map(Bson::Document).unwrap_or(Bson::Null),
        );
    }
    Ok(())
}

fn referenced_ids(value: &Bson) -> Vec<ObjectId> {
    match value {
        Bson::Array(items) => items.iter().filter_map(object_id).collect(),
        other => object_id(other).into_iter().collect(),
    }
}

fn substitute(value: &mut Bson, found: &HashMap<ObjectId, Document>) {
    match value {
        Bson::Array(items) => {
            let resolved: Vec<Bson> = items
                .drain(..)
                .filter_map(|item| match object_id(&item) {
                    Some(id) => found.get(&id).cloned().map(Bson::Document),
                    None => Some(item),
                })
                .collect();
            *items = resolved;
        }
        other => {
            if let Some(id) = object_id(other) {
                *other = found.get(&id).cloned().map(Bson::Document).unwrap_or(Bson::Null);
            }
        }
    }
}

fn visit_mut(doc: &mut Document, path: &str, f: &mut dyn FnMut(&mut Bson)) {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let Some(value) = doc.get_mut(head) else {
        return;
    };
    match rest {
        None => f(value),
        Some(rest) => match value {
            Bson::Document(sub) => visit_mut(sub, rest, f),
            Bson::Array(items) => {
                for item in items {
                    if let Bson::Document(sub) = item {
                        visit_mut(sub, rest, f);
                    }
                }
            }
            _ => {}
        },
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn include_keeps_id() {
        let id = ObjectId::new();
        let projected = Projection::Include(&["fname"]).apply(doc! {
            "_id": id, "fname": "Asha", "password": "x", "email": "a@b.c"
        });
        assert_eq!(projected, doc! { "_id": id, "fname": "Asha" });
    }

    #[test]
    fn exclude_drops_listed_fields() {
        let projected = Projection::Exclude(&["password"]).apply(doc! {
            "fname": "Asha", "password": "x"
        });
        assert_eq!(projected, doc! { "fname": "Asha" });
    }

    #[test]
    fn substitute_keeps_non_id_array_entries() {
        let known = ObjectId::new();
        let found = HashMap::from([(known, doc! { "_id": known, "n": 1 })]);
        let mut value = Bson::Array(vec![
            Bson::ObjectId(known),
            Bson::ObjectId(ObjectId::new()),
            Bson::Document(doc! { "n": 2 }),
        ]);
        substitute(&mut value, &found);
        assert_eq!(
            value,
            Bson::Array(vec![
                Bson::Document(doc! { "_id": known, "n": 1 }),
                Bson::Document(doc! { "n": 2 }),
            ])
        );
    }
}
