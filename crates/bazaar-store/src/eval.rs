use std::cmp::Ordering;

use bazaar_query::{Clause, Constraint, FilterSpec, Sort, SortDirection};
use bson::{Bson, Document};

/// Evaluate whether a document satisfies every clause of the filter.
pub fn matches(doc: &Document, filter: &FilterSpec) -> bool {
    filter.clauses().iter().all(|c| clause_matches(doc, c))
}

fn clause_matches(doc: &Document, clause: &Clause) -> bool {
    match clause {
        Clause::Field { field, constraint } => field_matches(doc, field, constraint),
        Clause::Any(branches) => branches.iter().any(|b| matches(doc, b)),
    }
}

fn field_matches(doc: &Document, path: &str, constraint: &Constraint) -> bool {
    let values = lookup(doc, path);
    match constraint {
        // null matches both missing fields and explicit null values
        Constraint::Equals(Bson::Null) => {
            values.is_empty() || values.iter().any(|v| matches!(v, Bson::Null))
        }
        Constraint::Equals(expected) => values.iter().any(|v| value_eq(v, expected)),
        Constraint::OneOf(set) => values
            .iter()
            .any(|v| set.iter().any(|expected| value_eq(v, expected))),
        Constraint::Range { min, max } => values.iter().any(|v| {
            as_f64(v).is_some_and(|n| min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m))
        }),
        Constraint::Fuzzy(re) => values
            .iter()
            .any(|v| matches!(v, Bson::String(s) if re.is_match(s))),
        Constraint::BoolEquals(b) => values.iter().any(|v| value_eq(v, &Bson::Boolean(*b))),
    }
}

/// Values at a dotted path. Arrays along the way are fanned out, so
/// `technicalDetails.color` over an array of sub-documents yields every color.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let mut out = Vec::new();
    collect(doc, path, &mut out);
    out
}

fn collect<'a>(doc: &'a Document, path: &str, out: &mut Vec<&'a Bson>) {
    let (head, rest) = match path.split_once('.') {
        Some((h, r)) => (h, Some(r)),
        None => (path, None),
    };
    if let Some(value) = doc.get(head) {
        descend(value, rest, out);
    }
}

fn descend<'a>(value: &'a Bson, rest: Option<&str>, out: &mut Vec<&'a Bson>) {
    match (value, rest) {
        (Bson::Array(items), None) => out.extend(items.iter()),
        (Bson::Array(items), Some(r)) => {
            for item in items {
                if let Bson::Document(sub) = item {
                    collect(sub, r, out);
                }
            }
        }
        (Bson::Document(sub), Some(r)) => collect(sub, r, out),
        (_, Some(_)) => {}
        (v, None) => out.push(v),
    }
}

/// Equality: stored value vs query value.
fn value_eq(stored: &Bson, query: &Bson) -> bool {
    match (stored, query) {
        // ── Direct type matches ─────────────────────────────────
        (Bson::String(a), Bson::String(b)) => a == b,
        (Bson::Boolean(a), Bson::Boolean(b)) => a == b,
        (Bson::ObjectId(a), Bson::ObjectId(b)) => a == b,
        (Bson::DateTime(a), Bson::DateTime(b)) => a.timestamp_millis() == b.timestamp_millis(),
        (Bson::Null, Bson::Null) => true,
        (a, b) if is_number(a) && is_number(b) => as_f64(a) == as_f64(b),

        // ── Cross-type coercion: query string → stored type ─
        (Bson::ObjectId(a), Bson::String(s)) => a.to_hex() == *s,
        (Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_), Bson::String(s)) => {
            s.trim().parse::<f64>().is_ok_and(|b| as_f64(stored) == Some(b))
        }
        (Bson::Boolean(a), Bson::String(s)) => match s.as_str() {
            "true" => *a,
            "false" => !*a,
            _ => false,
        },

        // ── Incompatible types: silent exclusion ────────────────
        _ => false,
    }
}

fn is_number(v: &Bson) -> bool {
    matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

fn as_f64(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Rank used when two values of different kinds are compared.
fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => 1,
        Bson::String(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::ObjectId(_) => 5,
        Bson::Boolean(_) => 6,
        Bson::DateTime(_) => 7,
        _ => 8,
    }
}

/// Total order over optional values; missing sorts with null, below everything.
pub fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let a = a.unwrap_or(&Bson::Null);
    let b = b.unwrap_or(&Bson::Null);
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        (x, y) if is_number(x) && is_number(y) => {
            let (x, y) = (as_f64(x).unwrap_or(0.0), as_f64(y).unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (x, y) => type_rank(x).cmp(&type_rank(y)),
    }
}

/// Order two documents by the sort keys, breaking ties on `_id` in the
/// direction of the first key so that paging is deterministic.
pub fn compare_documents(a: &Document, b: &Document, sort: &[Sort]) -> Ordering {
    for s in sort {
        let ord = compare_values(
            lookup(a, s.field).first().copied(),
            lookup(b, s.field).first().copied(),
        );
        let ord = match s.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    let ord = compare_values(a.get("_id"), b.get("_id"));
    match sort.first().map(|s| s.direction) {
        Some(SortDirection::Desc) => ord.reverse(),
        _ => ord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_query::{Clause, fields, subsequence_pattern};
    use bson::doc;
    use bson::oid::ObjectId;

    fields! {
        enum F {
            Name => "name",
            Price => "price",
            Tags => "tags",
            Color => "technicalDetails.color",
            Brand => "brand",
            Parent => "parent",
            Warranty => "warranty",
            ReplyUser => "replies.user",
        }
    }

    fn product() -> Document {
        doc! {
            "name": "Glossy Tile",
            "price": 120,
            "tags": ["floor", "kitchen"],
            "technicalDetails": { "color": "Red" },
            "warranty": true,
            "parent": Bson::Null,
        }
    }

    fn filter(clause: Clause) -> FilterSpec {
        FilterSpec::new().with(clause)
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches(&product(), &FilterSpec::new()));
    }

    #[test]
    fn one_of_matches_scalar_and_array_fields() {
        let doc = product();
        let set = |vs: &[&str]| -> Vec<Bson> { vs.iter().map(|v| Bson::String(v.to_string())).collect() };
        assert!(matches(&doc, &filter(Clause::one_of(F::Color, set(&["Blue", "Red"])))));
        assert!(matches(&doc, &filter(Clause::one_of(F::Tags, set(&["kitchen"])))));
        assert!(!matches(&doc, &filter(Clause::one_of(F::Tags, set(&["bath"])))));
    }

    #[test]
    fn range_respects_each_bound() {
        let doc = product();
        assert!(matches(&doc, &filter(Clause::range(F::Price, Some(100.0), None).unwrap())));
        assert!(matches(&doc, &filter(Clause::range(F::Price, None, Some(120.0)).unwrap())));
        assert!(!matches(&doc, &filter(Clause::range(F::Price, Some(121.0), None).unwrap())));
        assert!(!matches(&doc, &filter(Clause::range(F::Name, Some(0.0), None).unwrap())));
    }

    #[test]
    fn fuzzy_only_matches_strings() {
        let re = subsequence_pattern("gt").unwrap().unwrap();
        assert!(matches(&product(), &filter(Clause::fuzzy(&[F::Price, F::Name], &re))));
        let re = subsequence_pattern("zz").unwrap().unwrap();
        assert!(!matches(&product(), &filter(Clause::fuzzy(&[F::Name], &re))));
    }

    #[test]
    fn empty_or_group_matches_nothing() {
        assert!(!matches(&product(), &filter(Clause::nothing())));
        assert!(matches(&product(), &FilterSpec::new()));
    }

    #[test]
    fn equals_null_matches_missing_and_null() {
        assert!(matches(&product(), &filter(Clause::equals(F::Parent, Bson::Null))));
        assert!(matches(&product(), &filter(Clause::equals(F::Brand, Bson::Null))));
        let reply = doc! { "parent": ObjectId::new() };
        assert!(!matches(&reply, &filter(Clause::equals(F::Parent, Bson::Null))));
    }

    #[test]
    fn object_ids_match_hex_strings() {
        let id = ObjectId::new();
        let doc = doc! { "brand": id };
        assert!(matches(&doc, &filter(Clause::equals(F::Brand, id.to_hex()))));
        assert!(matches(&doc, &filter(Clause::equals(F::Brand, id))));
    }

    #[test]
    fn bool_and_numeric_coercion() {
        let doc = product();
        assert!(matches(&doc, &filter(Clause::bool_equals(F::Warranty, true))));
        assert!(!matches(&doc, &filter(Clause::bool_equals(F::Warranty, false))));
        assert!(matches(&doc, &filter(Clause::equals(F::Price, "120"))));
        assert!(matches(&doc, &filter(Clause::equals(F::Price, 120.0))));
    }

    #[test]
    fn lookup_fans_out_through_arrays() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let doc = doc! { "replies": [{ "user": a }, { "user": b }, "stray"] };
        assert_eq!(lookup(&doc, "replies.user").len(), 2);
        assert!(matches(&doc, &filter(Clause::equals(F::ReplyUser, b))));
    }

    #[test]
    fn any_group_is_or() {
        let doc = product();
        let branch = |c| FilterSpec::new().with(c);
        let spec = filter(Clause::any(vec![
            branch(Clause::equals(F::Name, "nope")),
            branch(Clause::equals(F::Price, 120)),
        ]));
        assert!(matches(&doc, &spec));
        assert!(!matches(&doc, &filter(Clause::any(vec![]))));
    }

    #[test]
    fn compare_puts_missing_first_and_numbers_across_types() {
        assert_eq!(compare_values(None, Some(&Bson::Int32(1))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&Bson::Int32(2)), Some(&Bson::Double(1.5))),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some(&Bson::Int64(3)), Some(&Bson::String("3".into()))),
            Ordering::Less
        );
    }

    #[test]
    fn documents_tie_break_on_id_in_sort_direction() {
        let first = doc! { "_id": ObjectId::new(), "price": 1 };
        let second = doc! { "_id": ObjectId::new(), "price": 1 };
        let asc = [Sort::asc(F::Price)];
        let desc = [Sort::desc(F::Price)];
        assert_eq!(compare_documents(&first, &second, &asc), Ordering::Less);
        assert_eq!(compare_documents(&first, &second, &desc), Ordering::Greater);
    }
}
