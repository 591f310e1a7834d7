use bson::Bson;
use regex::Regex;

use crate::field::Field;

/// A constraint on a single document field.
#[derive(Debug, Clone)]
pub enum Constraint {
    Equals(Bson),
    /// Matches when the field, or any element of an array field, is in the set.
    OneOf(Vec<Bson>),
    /// Numeric bounds, both inclusive. An omitted bound does not constrain.
    Range { min: Option<f64>, max: Option<f64> },
    /// Case-insensitive pattern over string values.
    Fuzzy(Regex),
    BoolEquals(bool),
}

#[derive(Debug, Clone)]
pub enum Clause {
    Field {
        field: &'static str,
        constraint: Constraint,
    },
    /// Logical OR of sub-filters. An empty group matches nothing.
    Any(Vec<FilterSpec>),
}

impl Clause {
    pub fn new<F: Field>(field: F, constraint: Constraint) -> Self {
        Clause::Field {
            field: field.path(),
            constraint,
        }
    }

    pub fn equals<F: Field>(field: F, value: impl Into<Bson>) -> Self {
        Self::new(field, Constraint::Equals(value.into()))
    }

    pub fn one_of<F: Field>(field: F, values: Vec<Bson>) -> Self {
        Self::new(field, Constraint::OneOf(values))
    }

    /// Returns `None` when neither bound is present.
    pub fn range<F: Field>(field: F, min: Option<f64>, max: Option<f64>) -> Option<Self> {
        if min.is_none() && max.is_none() {
            return None;
        }
        Some(Self::new(field, Constraint::Range { min, max }))
    }

    pub fn bool_equals<F: Field>(field: F, value: bool) -> Self {
        Self::new(field, Constraint::BoolEquals(value))
    }

    /// The same pattern applied to every field, OR-ed together.
    pub fn fuzzy<F: Field>(fields: &[F], pattern: &Regex) -> Self {
        Clause::Any(
            fields
                .iter()
                .map(|f| FilterSpec::new().with(Self::new(*f, Constraint::Fuzzy(pattern.clone()))))
                .collect(),
        )
    }

    pub fn any(branches: Vec<FilterSpec>) -> Self {
        Clause::Any(branches)
    }

    /// A clause no document satisfies.
    pub fn nothing() -> Self {
        Clause::Any(Vec::new())
    }
}

/// An ordered conjunction of clauses. An empty spec matches every document.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    clauses: Vec<Clause>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn with(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Add the clause if one was produced; absent parameters leave the spec untouched.
    pub fn maybe(mut self, clause: Option<Clause>) -> Self {
        if let Some(c) = clause {
            self.clauses.push(c);
        }
        self
    }

    /// AND two specs together.
    pub fn merge(mut self, other: FilterSpec) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    /// Names of the fields this spec constrains directly, in order.
    pub fn fields(&self) -> Vec<&'static str> {
        self.clauses
            .iter()
            .filter_map(|c| match c {
                Clause::Field { field, .. } => Some(*field),
                Clause::Any(_) => None,
            })
            .collect()
    }
}
