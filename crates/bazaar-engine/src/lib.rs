//! Request-scoped query helpers shared by every listing endpoint: pagination
//! with a uniform envelope, reference population, sub-documents addressed by
//! id inside a parent, reply-tree deletion, facet buckets and small
//! aggregations.

mod aggregate;
pub mod embedded;
mod error;
mod facets;
mod fetch;
mod page;
mod populate;
mod tree;

pub use aggregate::{average, group_count};
pub use embedded::{EmbeddedField, with_parent};
pub use error::EngineError;
pub use facets::{Categorized, Facet, categorize};
pub use fetch::{object_id, require};
pub use page::{Listing, Page, paginate, paginate_in_memory};
pub use populate::{Projection, populate, populate_embedded};
pub use tree::{collect_subtree, delete_tree, link, unlink};
