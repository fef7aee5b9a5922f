//! Configuration switches for a selection query.
//!
//! [`SelectOptions`] applies to a whole query, never to a single parse call.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Shape of each per-record result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// One ordered mapping per record: field pattern to matched values.
    #[default]
    Object,
    /// One ordered list of value lists per record, in selection order.
    Array,
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
        }
    }
}

/// Options controlling how a query extracts and shapes values.
///
/// # Examples
///
/// ```
/// use marcflow::{OutputShape, SelectOptions};
///
/// let options = SelectOptions::default()
///     .with_dedup(false)
///     .with_shape(OutputShape::Array);
/// assert!(!options.dedup);
/// assert!(!options.ignore_case);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectOptions {
    /// Collapse each value list to its first-occurrence-unique values.
    pub dedup: bool,

    /// Result shape.
    pub shape: OutputShape,

    /// Case-fold tags and labels (never values) before matching.
    pub ignore_case: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        SelectOptions {
            dedup: true,
            shape: OutputShape::Object,
            ignore_case: false,
        }
    }
}

impl SelectOptions {
    /// Set the dedup switch.
    #[must_use]
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    /// Set the output shape.
    #[must_use]
    pub fn with_shape(mut self, shape: OutputShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set the ignore-case switch.
    #[must_use]
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Load options from a JSON object. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object of known keys with
    /// correctly typed values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply the case rule to a tag, label or pattern.
    #[must_use]
    pub(crate) fn fold<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.ignore_case {
            Cow::Owned(text.to_lowercase())
        } else {
            Cow::Borrowed(text)
        }
    }
}
