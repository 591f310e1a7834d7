use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// A query-string parameter: a single value, or several for a repeated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

impl ParamValue {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            ParamValue::One(v) => std::slice::from_ref(v),
            ParamValue::Many(vs) => vs,
        };
        values.iter().map(String::as_str)
    }
}

/// Untrusted request parameters, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect decoded `(name, value)` pairs; repeated names accumulate.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (k, v) in pairs {
            params.insert(k, v);
        }
        params
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.values.entry(name.into()) {
            Entry::Vacant(slot) => {
                slot.insert(ParamValue::One(value));
            }
            Entry::Occupied(mut slot) => {
                let merged = match slot.get_mut() {
                    ParamValue::One(prev) => ParamValue::Many(vec![std::mem::take(prev), value]),
                    ParamValue::Many(vs) => {
                        vs.push(value);
                        return;
                    }
                };
                slot.insert(merged);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// First value for `name`, trimmed; blank values count as absent.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)?
            .iter()
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.first(name).is_some()
    }
}
