use bazaar_query::{FilterSpec, PageSpec, Query, Sort};
use bazaar_store::Collection;
use bson::{Bson, Document};
use tracing::debug;

use crate::error::EngineError;

/// One page of results plus consistent metadata.
///
/// A page past the end (when there is at least one page) comes back empty
/// with `out_of_range` set rather than as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T = Document> {
    pub items: Vec<T>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total: u64,
    pub out_of_range: bool,
}

impl<T> Page<T> {
    fn empty(spec: PageSpec, total: u64, total_pages: u64, out_of_range: bool) -> Self {
        Self {
            items: Vec::new(),
            current_page: spec.page,
            total_pages,
            total,
            out_of_range,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            total: self.total,
            out_of_range: self.out_of_range,
        }
    }
}

/// Envelope key names for one entity, e.g. `totalProducts` / `products`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    pub total_key: &'static str,
    pub items_key: &'static str,
}

impl Page<Document> {
    /// `{ currentPage, totalPages, total<Entity>, <entities>, pageOutOfRange? }`
    pub fn envelope(self, listing: Listing) -> Document {
        let mut out = Document::new();
        out.insert("currentPage", self.current_page as i64);
        out.insert("totalPages", self.total_pages as i64);
        out.insert(listing.total_key, self.total as i64);
        out.insert(
            listing.items_key,
            Bson::Array(self.items.into_iter().map(Bson::Document).collect()),
        );
        if self.out_of_range {
            out.insert("pageOutOfRange", true);
        }
        out
    }
}

/// Count, then fetch the requested slice in sort order.
pub fn paginate<C: Collection + ?Sized>(
    coll: &C,
    filter: &FilterSpec,
    sort: &[Sort],
    spec: PageSpec,
) -> Result<Page, EngineError> {
    let total = coll.count(filter)?;
    let total_pages = spec.total_pages(total);
    let out_of_range = total_pages > 0 && spec.page > total_pages;

    debug!(
        collection = coll.name(),
        clauses = filter.len(),
        page = spec.page,
        limit = spec.limit,
        total,
        "paginate"
    );

    if total == 0 || out_of_range {
        return Ok(Page::empty(spec, total, total_pages, out_of_range));
    }

    let query = Query {
        filter: filter.clone(),
        sort: sort.to_vec(),
        ..Default::default()
    }
    .page(spec);
    let items = coll.find(&query)?;

    Ok(Page {
        items,
        current_page: spec.page,
        total_pages,
        total,
        out_of_range,
    })
}

/// Page an already-materialised, already-ordered result set.
///
/// Used when part of the filter could only run after population.
pub fn paginate_in_memory<T>(items: Vec<T>, spec: PageSpec) -> Page<T> {
    let total = items.len() as u64;
    let total_pages = spec.total_pages(total);
    let out_of_range = total_pages > 0 && spec.page > total_pages;
    if out_of_range {
        return Page::empty(spec, total, total_pages, out_of_range);
    }

    let limit = usize::try_from(spec.limit).unwrap_or(usize::MAX);
    Page {
        items: items.into_iter().skip(spec.offset()).take(limit).collect(),
        current_page: spec.page,
        total_pages,
        total,
        out_of_range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_slices_and_reports_totals() {
        let page = paginate_in_memory((1..=25).collect(), PageSpec::new(3, 10));
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert!(!page.out_of_range);
    }

    #[test]
    fn in_memory_past_the_end_is_flagged() {
        let page = paginate_in_memory((1..=5).collect::<Vec<i32>>(), PageSpec::new(4, 2));
        assert!(page.items.is_empty());
        assert_eq!(page.current_page, 4);
        assert_eq!(page.total_pages, 3);
        assert!(page.out_of_range);
    }

    #[test]
    fn in_memory_empty_has_zero_pages() {
        let page = paginate_in_memory(Vec::<i32>::new(), PageSpec::new(2, 10));
        assert_eq!(page.total_pages, 0);
        assert!(!page.out_of_range);
        assert!(page.items.is_empty());
    }

    #[test]
    fn envelope_uses_entity_keys() {
        let page = paginate_in_memory(vec![Document::new()], PageSpec::default());
        let env = page.envelope(Listing {
            total_key: "totalBrands",
            items_key: "brands",
        });
        assert_eq!(env.get_i64("currentPage").unwrap(), 1);
        assert_eq!(env.get_i64("totalPages").unwrap(), 1);
        assert_eq!(env.get_i64("totalBrands").unwrap(), 1);
        assert_eq!(env.get_array("brands").unwrap().len(), 1);
        assert!(!env.contains_key("pageOutOfRange"));
    }
}
