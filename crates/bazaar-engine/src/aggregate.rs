use std::collections::BTreeMap;

use bazaar_query::{Field, FilterSpec, Query};
use bazaar_store::{Collection, lookup};
use bson::Bson;

use crate::error::EngineError;

/// Count matching documents grouped by the value at `field`.
///
/// Documents without the field are not counted.
pub fn group_count<C, F>(coll: &C, filter: &FilterSpec, field: F) -> Result<BTreeMap<String, u64>, EngineError>
where
    C: Collection + ?Sized,
    F: Field,
{
    let mut counts = BTreeMap::new();
    for doc in coll.find(&Query::new(filter.clone()))? {
        for value in lookup(&doc, field.path()) {
            let key = match value {
                Bson::String(s) => s.clone(),
                Bson::Null => continue,
                other => other.to_string(),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Mean of the numeric values at `field` across matching documents, with the
/// number of values that contributed. `None` when nothing contributed.
pub fn average<C, F>(coll: &C, filter: &FilterSpec, field: F) -> Result<Option<(f64, u64)>, EngineError>
where
    C: Collection + ?Sized,
    F: Field,
{
    let mut sum = 0.0;
    let mut n = 0u64;
    for doc in coll.find(&Query::new(filter.clone()))? {
        for value in lookup(&doc, field.path()) {
            let x = match value {
                Bson::Int32(v) => f64::from(*v),
                Bson::Int64(v) => *v as f64,
                Bson::Double(v) => *v,
                _ => continue,
            };
            sum += x;
            n += 1;
        }
    }
    Ok((n > 0).then(|| (sum / n as f64, n)))
}
