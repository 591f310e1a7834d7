mod collection;
mod error;
mod eval;
mod memory;

pub use collection::Collection;
pub use error::StoreError;
pub use eval::{compare_documents, compare_values, lookup, matches};
pub use memory::{MemoryCollection, MemoryStore};
