use bazaar_store::Collection;
use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::error::EngineError;

/// Load a document or report `entity` as not found.
pub fn require<C: Collection + ?Sized>(
    coll: &C,
    id: &ObjectId,
    entity: &'static str,
) -> Result<Document, EngineError> {
    coll.get(id)?.ok_or(EngineError::NotFound { entity })
}

/// An id stored either as an ObjectId or as its hex string.
pub fn object_id(value: &Bson) -> Option<ObjectId> {
    match value {
        Bson::ObjectId(id) => Some(*id),
        Bson::String(s) => ObjectId::parse_str(s).ok(),
        _ => None,
    }
}
