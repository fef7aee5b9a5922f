//! Per-record results.
//!
//! A [`ResultRow`] holds, for each selected field pattern, every matching
//! value in encounter order. Its shape follows
//! [`OutputShape`](crate::options::OutputShape).

use crate::error::Result;
use crate::options::{OutputShape, SelectOptions};
use crate::query::FieldSpec;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Values extracted from one record.
///
/// # Examples
///
/// ```
/// use marcflow::{OutputShape, ResultRow};
///
/// let row = ResultRow::empty(OutputShape::Object);
/// assert!(row.is_empty());
/// assert_eq!(row.to_json()?, "{}");
/// # Ok::<(), marcflow::MarcError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResultRow {
    /// Field pattern to values, in selection order.
    Object(IndexMap<String, Vec<String>>),
    /// One value list per selected field, in selection order.
    Array(Vec<Vec<String>>),
}

impl ResultRow {
    /// The canonical empty value for a shape.
    ///
    /// Returned for records that fail their condition filter.
    #[must_use]
    pub fn empty(shape: OutputShape) -> Self {
        match shape {
            OutputShape::Object => ResultRow::Object(IndexMap::new()),
            OutputShape::Array => ResultRow::Array(Vec::new()),
        }
    }

    pub(crate) fn assemble(
        fields: &[FieldSpec],
        values: Vec<Vec<String>>,
        options: &SelectOptions,
    ) -> Self {
        let values = values.into_iter().map(|list| {
            if options.dedup {
                dedup(list)
            } else {
                list
            }
        });
        match options.shape {
            OutputShape::Object => ResultRow::Object(
                fields
                    .iter()
                    .map(|field| field.pattern().to_string())
                    .zip(values)
                    .collect(),
            ),
            OutputShape::Array => ResultRow::Array(values.collect()),
        }
    }

    /// Whether the row holds no fields at all (the canonical empty value).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            ResultRow::Object(map) => map.is_empty(),
            ResultRow::Array(lists) => lists.is_empty(),
        }
    }

    /// Values selected by a field pattern (object-shaped rows only).
    #[must_use]
    pub fn get(&self, pattern: &str) -> Option<&[String]> {
        match self {
            ResultRow::Object(map) => map.get(pattern).map(Vec::as_slice),
            ResultRow::Array(_) => None,
        }
    }

    /// All value lists in selection order, regardless of shape.
    #[must_use]
    pub fn value_lists(&self) -> Vec<&[String]> {
        match self {
            ResultRow::Object(map) => map.values().map(Vec::as_slice).collect(),
            ResultRow::Array(lists) => lists.iter().map(Vec::as_slice).collect(),
        }
    }

    /// Serialize as JSON text. Non-ASCII characters are written as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Keep the first occurrence of every value, preserving order.
///
/// # Examples
///
/// ```
/// use marcflow::result::dedup;
///
/// let values = vec!["b".to_string(), "a".to_string(), "b".to_string()];
/// assert_eq!(dedup(values), vec!["b", "a"]);
/// ```
#[must_use]
pub fn dedup(values: Vec<String>) -> Vec<String> {
    if values.len() < 2 {
        return values;
    }
    values
        .into_iter()
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}
