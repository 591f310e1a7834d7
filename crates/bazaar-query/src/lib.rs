mod field;
mod filter;
mod fuzzy;
mod params;
mod parse;
mod query;
mod sort;

pub use field::{CommonField, Field};
pub use filter::{Clause, Constraint, FilterSpec};
pub use fuzzy::{subsequence_pattern, substring_pattern};
pub use params::{ParamValue, Params};
pub use parse::{PageSpec, parse_bool, parse_fuzzy, parse_one_of, parse_range, parse_sort};
pub use query::Query;
pub use sort::{Sort, SortDirection};
