use serde::{Deserialize, Serialize};

use crate::field::{CommonField, Field};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc<F: Field>(field: F) -> Self {
        Sort {
            field: field.path(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc<F: Field>(field: F) -> Self {
        Sort {
            field: field.path(),
            direction: SortDirection::Desc,
        }
    }

    /// `createdAt` descending.
    pub fn newest_first() -> Self {
        Self::desc(CommonField::CreatedAt)
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::newest_first()
    }
}
