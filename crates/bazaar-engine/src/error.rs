use bazaar_store::StoreError;
use bson::oid::ObjectId;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The top-level (parent) document does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The parent exists but holds no sub-document with this id.
    #[error("{entity} not found")]
    EmbeddedNotFound { entity: &'static str, id: ObjectId },

    #[error("{entity} id cannot be changed")]
    IdImmutable { entity: &'static str },
}
