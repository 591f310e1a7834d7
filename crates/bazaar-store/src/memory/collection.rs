use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use bazaar_query::{FilterSpec, Query};
use bson::oid::ObjectId;
use bson::{Bson, DateTime, Document};
use imbl::OrdMap;

use crate::collection::Collection;
use crate::error::StoreError;
use crate::eval::{compare_documents, matches};

type Records = OrdMap<ObjectId, Document>;

/// Copy-on-write collection. Readers take a snapshot; writers serialise on a
/// mutex and swap in a new map, which is cheap due to imbl structural sharing.
pub struct MemoryCollection {
    name: String,
    records: ArcSwap<Records>,
    write_lock: Mutex<()>,
}

impl MemoryCollection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: ArcSwap::new(Arc::new(OrdMap::new())),
            write_lock: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.load().is_empty()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("write lock poisoned: {e}")))
    }

    /// Apply `f` to a private copy of the records and publish the result.
    fn write<T>(&self, f: impl FnOnce(&mut Records) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let _guard = self.lock()?;
        let mut data = (**self.records.load()).clone();
        let out = f(&mut data)?;
        self.records.store(Arc::new(data));
        Ok(out)
    }
}

fn document_id(doc: &Document) -> Result<Option<ObjectId>, StoreError> {
    match doc.get("_id") {
        None => Ok(None),
        Some(Bson::ObjectId(id)) => Ok(Some(*id)),
        Some(other) => Err(StoreError::InvalidDocument(format!(
            "_id must be an ObjectId, got {other}"
        ))),
    }
}

/// Id plus `createdAt` / `updatedAt` for a document about to be inserted.
fn stamped(doc: Document) -> Result<(ObjectId, Document), StoreError> {
    let id = document_id(&doc)?.unwrap_or_else(ObjectId::new);
    let mut doc = with_leading_id(id, doc);
    let now = DateTime::now();
    if !doc.contains_key("createdAt") {
        doc.insert("createdAt", now);
    }
    if !doc.contains_key("updatedAt") {
        doc.insert("updatedAt", now);
    }
    Ok((id, doc))
}

/// Rebuild the document with `_id` as its first key.
fn with_leading_id(id: ObjectId, doc: Document) -> Document {
    let mut out = Document::new();
    out.insert("_id", id);
    for (k, v) in doc {
        if k != "_id" {
            out.insert(k, v);
        }
    }
    out
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let snapshot = self.records.load();
        let mut docs: Vec<&Document> = snapshot
            .values()
            .filter(|doc| matches(doc, &query.filter))
            .collect();
        docs.sort_by(|a, b| compare_documents(a, b, &query.sort));

        let skip = query.skip.unwrap_or(0);
        let take = query.take.unwrap_or(usize::MAX);
        Ok(docs.into_iter().skip(skip).take(take).cloned().collect())
    }

    fn count(&self, filter: &FilterSpec) -> Result<u64, StoreError> {
        let snapshot = self.records.load();
        if filter.is_empty() {
            return Ok(snapshot.len() as u64);
        }
        Ok(snapshot.values().filter(|doc| matches(doc, filter)).count() as u64)
    }

    fn get(&self, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        Ok(self.records.load().get(id).cloned())
    }

    fn get_many(&self, ids: &[ObjectId]) -> Result<Vec<Document>, StoreError> {
        let snapshot = self.records.load();
        Ok(ids.iter().filter_map(|id| snapshot.get(id).cloned()).collect())
    }

    fn insert(&self, doc: Document) -> Result<Document, StoreError> {
        let (id, doc) = stamped(doc)?;
        self.write(|data| {
            if data.contains_key(&id) {
                return Err(StoreError::DuplicateId(id));
            }
            data.insert(id, doc.clone());
            Ok(doc)
        })
    }

    fn insert_unless(&self, doc: Document, guard: &FilterSpec) -> Result<Option<Document>, StoreError> {
        let (id, doc) = stamped(doc)?;
        self.write(|data| {
            if data.values().any(|existing| matches(existing, guard)) {
                return Ok(None);
            }
            if data.contains_key(&id) {
                return Err(StoreError::DuplicateId(id));
            }
            data.insert(id, doc.clone());
            Ok(Some(doc))
        })
    }

    fn replace(&self, doc: Document) -> Result<Option<Document>, StoreError> {
        let id = document_id(&doc)?
            .ok_or_else(|| StoreError::InvalidDocument("replace requires an _id".into()))?;
        let mut doc = with_leading_id(id, doc);
        doc.insert("updatedAt", DateTime::now());

        self.write(|data| {
            if !data.contains_key(&id) {
                return Ok(None);
            }
            data.insert(id, doc.clone());
            Ok(Some(doc))
        })
    }

    fn modify(
        &self,
        id: &ObjectId,
        f: &mut dyn FnMut(&mut Document) -> bool,
    ) -> Result<Option<Document>, StoreError> {
        self.write(|data| {
            let Some(current) = data.get(id) else {
                return Ok(None);
            };
            let mut edited = current.clone();
            if !f(&mut edited) {
                return Ok(Some(current.clone()));
            }
            let mut edited = with_leading_id(*id, edited);
            edited.insert("updatedAt", DateTime::now());
            data.insert(*id, edited.clone());
            Ok(Some(edited))
        })
    }

    fn update(&self, id: &ObjectId, fields: Document) -> Result<Option<Document>, StoreError> {
        self.write(|data| {
            let Some(current) = data.get(id) else {
                return Ok(None);
            };
            let mut merged = current.clone();
            for (k, v) in fields {
                if k != "_id" {
                    merged.insert(k, v);
                }
            }
            merged.insert("updatedAt", DateTime::now());
            data.insert(*id, merged.clone());
            Ok(Some(merged))
        })
    }

    fn delete(&self, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        if !self.records.load().contains_key(id) {
            return Ok(None);
        }
        self.write(|data| Ok(data.remove(id)))
    }

    fn delete_many(&self, ids: &[ObjectId]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.write(|data| {
            let mut removed = 0;
            for id in ids {
                if data.remove(id).is_some() {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    fn delete_where(&self, filter: &FilterSpec) -> Result<u64, StoreError> {
        self.write(|data| {
            let doomed: Vec<ObjectId> = data
                .iter()
                .filter(|(_, doc)| matches(doc, filter))
                .map(|(id, _)| *id)
                .collect();
            for id in &doomed {
                data.remove(id);
            }
            Ok(doomed.len() as u64)
        })
    }
}
