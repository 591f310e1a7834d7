use std::fmt;

use bson::oid::ObjectId;

#[derive(Debug)]
pub enum StoreError {
    InvalidDocument(String),
    DuplicateId(ObjectId),
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidDocument(msg) => write!(f, "invalid document: {msg}"),
            StoreError::DuplicateId(id) => write!(f, "duplicate id: {id}"),
            StoreError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}
