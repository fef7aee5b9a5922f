//! A stateful front end holding options and the current query.
//!
//! [`Selector`] is the convenient entry point when one configuration is used
//! for many sources: select a statement once, then read any number of binary
//! MARC, MARCXML or Aleph sources with it.
//!
//! # Examples
//!
//! ```
//! use marcflow::{OutputShape, SelectOptions, Selector};
//!
//! let mut selector = Selector::with_options(SelectOptions::default().with_shape(OutputShape::Array));
//! selector.select("001 245a")?;
//!
//! let data = "000000123 001   L 000000123\n000000123 245   L $$aTitle\n";
//! for row in selector.aleph_str(data)?.flatten() {
//!     assert_eq!(row.to_json()?, r#"[["000000123"],["Title"]]"#);
//! }
//! # Ok::<(), marcflow::MarcError>(())
//! ```

use crate::aleph::AlephReader;
use crate::error::{MarcError, Result};
use crate::formats::{FormatReaderExt, Results};
use crate::marcxml::MarcXmlReader;
use crate::options::SelectOptions;
use crate::query::{CompiledQuery, QueryDescription};
use crate::reader::MarcReader;
use std::io::{BufRead, Read};

/// Options plus the currently selected query.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    options: SelectOptions,
    query: Option<CompiledQuery>,
}

impl Selector {
    /// Create a selector with default options and no statement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selector with the given options and no statement.
    #[must_use]
    pub fn with_options(options: SelectOptions) -> Self {
        Selector {
            options,
            query: None,
        }
    }

    /// Options used for the next (and current) statement.
    #[must_use]
    pub fn options(&self) -> &SelectOptions {
        &self.options
    }

    /// Replace the options, recompiling the current statement under them.
    ///
    /// # Errors
    ///
    /// Returns the compile error if the current statement no longer compiles;
    /// the selector is then left without a statement.
    pub fn set_options(&mut self, options: SelectOptions) -> Result<()> {
        self.options = options;
        match self.query.take() {
            Some(query) => self.select(query.statement()),
            None => Ok(()),
        }
    }

    /// Compile and activate a statement.
    ///
    /// On failure the previous statement is discarded as well, so the
    /// selector never keeps a query the caller did not ask for.
    ///
    /// # Errors
    ///
    /// See [`CompiledQuery::compile`].
    pub fn select(&mut self, statement: &str) -> Result<()> {
        self.query = None;
        self.query = Some(CompiledQuery::compile_with(statement, self.options)?);
        Ok(())
    }

    /// Whether a statement is active.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.query.is_some()
    }

    /// The active query, if any.
    #[must_use]
    pub fn query(&self) -> Option<&CompiledQuery> {
        self.query.as_ref()
    }

    /// Diagnostic snapshot of the active query.
    #[must_use]
    pub fn describe(&self) -> Option<QueryDescription> {
        self.query.as_ref().map(CompiledQuery::describe)
    }

    fn active(&self) -> Result<&CompiledQuery> {
        self.query
            .as_ref()
            .ok_or_else(|| MarcError::InvalidStatement("no statement selected".to_string()))
    }

    /// Select from a binary MARC source.
    ///
    /// # Errors
    ///
    /// Returns an error if no statement is active.
    pub fn marc<R: Read>(&self, source: R) -> Result<Results<MarcReader<'_, R>>> {
        Ok(MarcReader::new(source, self.active()?).into_results())
    }

    /// Select from a MARCXML source.
    ///
    /// # Errors
    ///
    /// Returns an error if no statement is active.
    pub fn marcxml<R: BufRead>(&self, source: R) -> Result<Results<MarcXmlReader<'_, R>>> {
        Ok(MarcXmlReader::new(source, self.active()?).into_results())
    }

    /// Select from an Aleph sequential source.
    ///
    /// # Errors
    ///
    /// Returns an error if no statement is active.
    pub fn aleph<R: BufRead>(&self, source: R) -> Result<Results<AlephReader<'_, R>>> {
        Ok(AlephReader::new(source, self.active()?).into_results())
    }

    /// Select from binary MARC data held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if no statement is active.
    pub fn marc_str<'a>(&'a self, data: &'a str) -> Result<Results<MarcReader<'a, &'a [u8]>>> {
        self.marc(data.as_bytes())
    }

    /// Select from a MARCXML document held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if no statement is active.
    pub fn marcxml_str<'a>(
        &'a self,
        data: &'a str,
    ) -> Result<Results<MarcXmlReader<'a, &'a [u8]>>> {
        self.marcxml(data.as_bytes())
    }

    /// Select from Aleph sequential data held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if no statement is active.
    pub fn aleph_str<'a>(&'a self, data: &'a str) -> Result<Results<AlephReader<'a, &'a [u8]>>> {
        self.aleph(data.as_bytes())
    }
}
