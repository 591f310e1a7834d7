use bazaar_query::FilterSpec;
use bazaar_store::matches;
use bson::{Bson, Document};

/// A named bucket. `filter` is `None` when the caller did not supply the
/// parameter that would define it, and the bucket then stays empty.
#[derive(Debug, Clone)]
pub struct Facet {
    pub name: &'static str,
    pub filter: Option<FilterSpec>,
}

impl Facet {
    pub fn new(name: &'static str, filter: Option<FilterSpec>) -> Self {
        Self { name, filter }
    }
}

/// The general result set plus one subset per facet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Categorized {
    pub general: Vec<Document>,
    pub buckets: Vec<(&'static str, Vec<Document>)>,
}

impl Categorized {
    pub fn bucket(&self, name: &str) -> Option<&[Document]> {
        self.buckets
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, docs)| docs.as_slice())
    }

    /// `{ general: [...], <facet>: [...], ... }`
    pub fn into_document(self) -> Document {
        let mut out = Document::new();
        out.insert("general", to_array(self.general));
        for (name, docs) in self.buckets {
            out.insert(name, to_array(docs));
        }
        out
    }
}

fn to_array(docs: Vec<Document>) -> Bson {
    Bson::Array(docs.into_iter().map(Bson::Document).collect())
}

/// Split `general` into facet buckets, each a subset in the same order.
pub fn categorize(general: Vec<Document>, facets: Vec<Facet>) -> Categorized {
    let buckets = facets
        .into_iter()
        .map(|facet| {
            let docs = match &facet.filter {
                Some(filter) => general
                    .iter()
                    .filter(|d| matches(d, filter))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            };
            (facet.name, docs)
        })
        .collect();
    Categorized { general, buckets }
}
