use bazaar_query::{FilterSpec, Query};
use bson::Document;
use bson::oid::ObjectId;

use crate::error::StoreError;

/// A named set of documents keyed by `_id`.
///
/// Every call is synchronous and self-contained; callers that need several
/// calls to agree should not assume isolation between them.
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Matching documents in query order, after `skip` / `take`.
    fn find(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    fn count(&self, filter: &FilterSpec) -> Result<u64, StoreError>;

    fn get(&self, id: &ObjectId) -> Result<Option<Document>, StoreError>;

    /// Documents for the ids that exist, in the order the ids were given.
    fn get_many(&self, ids: &[ObjectId]) -> Result<Vec<Document>, StoreError>;

    /// Store a new document. Assigns `_id` when absent and stamps
    /// `createdAt` / `updatedAt` when absent.
    fn insert(&self, doc: Document) -> Result<Document, StoreError>;

    /// Persist a whole document over the one with the same `_id`.
    /// Returns `None` when no such document exists.
    fn replace(&self, doc: Document) -> Result<Option<Document>, StoreError>;

    /// Read-modify-write of one document as a single write. `f` edits a copy;
    /// returning `false` leaves the stored document untouched. `_id` is
    /// never changed. Returns the stored document, or `None` when no such
    /// document exists. `f` must not call back into this collection.
    fn modify(
        &self,
        id: &ObjectId,
        f: &mut dyn FnMut(&mut Document) -> bool,
    ) -> Result<Option<Document>, StoreError>;

    /// Insert `doc` unless a document matching `guard` already exists, as a
    /// single write. Returns `None` when the guard matched.
    fn insert_unless(&self, doc: Document, guard: &FilterSpec) -> Result<Option<Document>, StoreError>;

    /// Merge top-level fields into the document. `_id` is never changed.
    fn update(&self, id: &ObjectId, fields: Document) -> Result<Option<Document>, StoreError>;

    fn delete(&self, id: &ObjectId) -> Result<Option<Document>, StoreError>;

    /// Remove every listed id in one write. Returns how many existed.
    fn delete_many(&self, ids: &[ObjectId]) -> Result<u64, StoreError>;

    fn delete_where(&self, filter: &FilterSpec) -> Result<u64, StoreError>;

    fn find_one(&self, filter: &FilterSpec) -> Result<Option<Document>, StoreError> {
        let query = Query {
            filter: filter.clone(),
            take: Some(1),
            ..Default::default()
        };
        Ok(self.find(&query)?.into_iter().next())
    }
}
