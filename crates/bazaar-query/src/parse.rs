use bson::Bson;

use crate::field::Field;
use crate::filter::Clause;
use crate::fuzzy::subsequence_pattern;
use crate::params::Params;
use crate::sort::{Sort, SortDirection};

/// Set-membership clause from a comma-delimited parameter.
///
/// Every supplied value (repeated keys included) is split on `,` and trimmed;
/// empty pieces are dropped. Nothing left means no clause, never "match nothing".
pub fn parse_one_of<F: Field>(params: &Params, name: &str, field: F) -> Option<Clause> {
    let values: Vec<Bson> = params
        .get(name)?
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Bson::String(v.to_string()))
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(Clause::one_of(field, values))
    }
}

/// Inclusive numeric range from two optional parameters.
///
/// A bound that is missing or not a finite number is left open.
pub fn parse_range<F: Field>(
    params: &Params,
    min_name: &str,
    max_name: &str,
    field: F,
) -> Option<Clause> {
    Clause::range(
        field,
        parse_number(params, min_name),
        parse_number(params, max_name),
    )
}

fn parse_number(params: &Params, name: &str) -> Option<f64> {
    params
        .first(name)?
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Subsequence search over `fields`, OR-ed together. A term that cannot be
/// compiled yields a clause matching nothing.
pub fn parse_fuzzy<F: Field>(params: &Params, name: &str, fields: &[F]) -> Option<Clause> {
    if fields.is_empty() {
        return None;
    }
    match subsequence_pattern(params.first(name)?)? {
        Ok(pattern) => Some(Clause::fuzzy(fields, &pattern)),
        Err(_) => Some(Clause::nothing()),
    }
}

/// `"true"` / `"false"` (any case); other values add no clause.
pub fn parse_bool<F: Field>(params: &Params, name: &str, field: F) -> Option<Clause> {
    let raw = params.first(name)?;
    if raw.eq_ignore_ascii_case("true") {
        Some(Clause::bool_equals(field, true))
    } else if raw.eq_ignore_ascii_case("false") {
        Some(Clause::bool_equals(field, false))
    } else {
        None
    }
}

/// `sortBy` / `order` parameters.
///
/// `sortBy` must name one of `allowed`, otherwise the default field is kept.
/// `order=asc` sorts ascending, `order=desc` descending; anything else keeps
/// the default direction.
pub fn parse_sort<F: Field>(params: &Params, allowed: &[F], default: Sort) -> Sort {
    let field = params
        .first("sortBy")
        .and_then(|name| allowed.iter().map(|f| f.path()).find(|p| *p == name))
        .unwrap_or(default.field);

    let direction = match params.first("order") {
        Some(o) if o.eq_ignore_ascii_case("asc") => SortDirection::Asc,
        Some(o) if o.eq_ignore_ascii_case("desc") => SortDirection::Desc,
        _ => default.direction,
    };

    Sort { field, direction }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page: u64,
    pub limit: u64,
}

impl PageSpec {
    pub const DEFAULT_PAGE: u64 = 1;
    pub const DEFAULT_LIMIT: u64 = 10;

    /// Values below 1 fall back to the defaults.
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: coerce(Some(page), Self::DEFAULT_PAGE),
            limit: coerce(Some(limit), Self::DEFAULT_LIMIT),
        }
    }

    /// Read `page` and `limit`. Malformed input silently becomes the default.
    pub fn from_params(params: &Params) -> Self {
        let read = |name| params.first(name).and_then(|v| v.parse::<i64>().ok());
        Self {
            page: coerce(read("page"), Self::DEFAULT_PAGE),
            limit: coerce(read("limit"), Self::DEFAULT_LIMIT),
        }
    }

    pub fn offset(&self) -> usize {
        let skip = (self.page - 1).saturating_mul(self.limit);
        usize::try_from(skip).unwrap_or(usize::MAX)
    }

    /// `ceil(total / limit)`.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

fn coerce(value: Option<i64>, default: u64) -> u64 {
    match value {
        Some(v) if v >= 1 => v as u64,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::filter::Constraint;

    fields! {
        enum ProductField {
            Category => "category",
            Price => "price",
            Name => "name",
            Warranty => "warrantyAndCertifications.warranty",
            CreatedAt => "createdAt",
        }
    }

    fn one_of_values(clause: Clause) -> Vec<String> {
        match clause {
            Clause::Field {
                constraint: Constraint::OneOf(values),
                ..
            } => values
                .into_iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect(),
            other => panic!("expected OneOf, got {other:?}"),
        }
    }

    #[test]
    fn one_of_splits_and_trims() {
        let params = Params::from_pairs([("category", " Tiles, Paint ,,Wood ")]);
        let clause = parse_one_of(&params, "category", ProductField::Category).unwrap();
        assert_eq!(one_of_values(clause), vec!["Tiles", "Paint", "Wood"]);
    }

    #[test]
    fn one_of_flattens_repeated_keys() {
        let params = Params::from_pairs([("category", "Tiles,Paint"), ("category", "Wood")]);
        let clause = parse_one_of(&params, "category", ProductField::Category).unwrap();
        assert_eq!(one_of_values(clause), vec!["Tiles", "Paint", "Wood"]);
    }

    #[test]
    fn one_of_absent_or_empty_adds_nothing() {
        let params = Params::from_pairs([("category", " , ")]);
        assert!(parse_one_of(&params, "category", ProductField::Category).is_none());
        assert!(parse_one_of(&params, "brand", ProductField::Category).is_none());
    }

    #[test]
    fn range_ignores_non_numeric_bounds() {
        let params = Params::from_pairs([("minPrice", "100"), ("maxPrice", "cheap")]);
        match parse_range(&params, "minPrice", "maxPrice", ProductField::Price) {
            Some(Clause::Field {
                constraint: Constraint::Range { min, max },
                ..
            }) => {
                assert_eq!(min, Some(100.0));
                assert_eq!(max, None);
            }
            other => panic!("expected range, got {other:?}"),
        }

        let params = Params::from_pairs([("minPrice", "NaN"), ("maxPrice", "inf")]);
        assert!(parse_range(&params, "minPrice", "maxPrice", ProductField::Price).is_none());
    }

    #[test]
    fn fuzzy_requires_a_term() {
        let params = Params::from_pairs([("q", " ")]);
        assert!(parse_fuzzy(&params, "q", &[ProductField::Name]).is_none());

        let params = Params::from_pairs([("q", "tl")]);
        assert!(matches!(
            parse_fuzzy(&params, "q", &[ProductField::Name]),
            Some(Clause::Any(ref b)) if b.len() == 1
        ));
    }

    #[test]
    fn oversized_fuzzy_term_matches_nothing() {
        let huge = "x".repeat(200_000);
        let params = Params::from_pairs([("q", huge.as_str())]);
        assert!(matches!(
            parse_fuzzy(&params, "q", &[ProductField::Name]),
            Some(Clause::Any(ref b)) if b.is_empty()
        ));
    }

    #[test]
    fn bool_accepts_only_true_or_false() {
        let params = Params::from_pairs([("warranty", "TRUE"), ("iso", "yes")]);
        assert!(matches!(
            parse_bool(&params, "warranty", ProductField::Warranty),
            Some(Clause::Field {
                constraint: Constraint::BoolEquals(true),
                ..
            })
        ));
        assert!(parse_bool(&params, "iso", ProductField::Warranty).is_none());
    }

    #[test]
    fn sort_defaults_and_allow_list() {
        let allowed = [ProductField::Price, ProductField::CreatedAt];

        let params = Params::new();
        assert_eq!(parse_sort(&params, &allowed, Sort::newest_first()), Sort::newest_first());

        let params = Params::from_pairs([("sortBy", "price"), ("order", "asc")]);
        let sort = parse_sort(&params, &allowed, Sort::newest_first());
        assert_eq!(sort.field, "price");
        assert_eq!(sort.direction, SortDirection::Asc);

        let params = Params::from_pairs([("sortBy", "password")]);
        let sort = parse_sort(&params, &allowed, Sort::newest_first());
        assert_eq!(sort.field, "createdAt");
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn page_falls_back_on_malformed_input() {
        for (page, limit) in [("abc", "xyz"), ("0", "0"), ("-3", "-1"), ("1.5", "")] {
            let params = Params::from_pairs([("page", page), ("limit", limit)]);
            assert_eq!(PageSpec::from_params(&params), PageSpec::default(), "{page} {limit}");
        }
    }

    #[test]
    fn page_offset_and_total_pages() {
        let params = Params::from_pairs([("page", "3"), ("limit", "20")]);
        let page = PageSpec::from_params(&params);
        assert_eq!(page.offset(), 40);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(20), 1);
        assert_eq!(page.total_pages(41), 3);
    }

    #[test]
    fn new_coerces_below_one() {
        assert_eq!(PageSpec::new(0, -5), PageSpec::default());
        assert_eq!(PageSpec::new(2, 5), PageSpec { page: 2, limit: 5 });
    }
}
