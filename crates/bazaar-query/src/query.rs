use crate::filter::FilterSpec;
use crate::parse::PageSpec;
use crate::sort::Sort;

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: FilterSpec,
    pub sort: Vec<Sort>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

impl Query {
    pub fn new(filter: FilterSpec) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn page(mut self, page: PageSpec) -> Self {
        self.skip = Some(page.offset());
        self.take = Some(page.limit as usize);
        self
    }
}
