//! The reader trait shared by all input formats.
//!
//! Every format reader turns its source into a sequence of per-record
//! outcomes through [`FormatReader::read_result`]. [`FormatReaderExt`] adapts
//! any reader into the [`Results`] iterator, which applies the stream rules
//! common to all formats:
//!
//! - a record with a structural problem yields `None` and the stream goes on,
//! - a source-level failure ([`MarcError::is_fatal`]) yields one final `None`,
//! - the end of the source ends the iterator.
//!
//! # Example
//!
//! ```
//! use marcflow::formats::{FormatReader, FormatReaderExt};
//! use marcflow::{CompiledQuery, MarcReader};
//!
//! fn count_accepted<R: FormatReader>(mut reader: R) -> usize {
//!     reader.results().flatten().filter(|row| !row.is_empty()).count()
//! }
//!
//! let query = CompiledQuery::compile("001")?;
//! let data = "                        001000400000\x1E123\x1E\x1D";
//! assert_eq!(count_accepted(MarcReader::new(data.as_bytes(), &query)), 1);
//! # Ok::<(), marcflow::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::result::ResultRow;
use std::iter::FusedIterator;
use tracing::{debug, warn};

/// Trait for readers that apply a compiled query to each record of a source.
///
/// # Implementation Notes
///
/// Implementations should:
/// - Return `Ok(None)` when the source is exhausted (not an error)
/// - Return a non-fatal error for a record that cannot be parsed, and be
///   ready to continue with the next record afterwards
/// - Return a fatal error when the source itself is unusable
pub trait FormatReader: std::fmt::Debug {
    /// Read the next record and apply the query to it.
    ///
    /// Returns:
    /// - `Ok(Some(row))` for a parsed record; rows of records failing the
    ///   condition filter are empty
    /// - `Ok(None)` if the end of the source was reached
    /// - `Err(_)` if the record or the source is malformed
    ///
    /// # Errors
    ///
    /// Returns an error if the record is malformed or reading fails.
    fn read_result(&mut self) -> Result<Option<ResultRow>>;

    /// Returns the number of records read so far, rejected ones included.
    ///
    /// The default implementation returns `None` if tracking is not supported.
    fn records_read(&self) -> Option<usize> {
        None
    }
}

impl<R: FormatReader + ?Sized> FormatReader for &mut R {
    fn read_result(&mut self) -> Result<Option<ResultRow>> {
        (**self).read_result()
    }

    fn records_read(&self) -> Option<usize> {
        (**self).records_read()
    }
}

impl<R: FormatReader + ?Sized> FormatReader for Box<R> {
    fn read_result(&mut self) -> Result<Option<ResultRow>> {
        (**self).read_result()
    }

    fn records_read(&self) -> Option<usize> {
        (**self).records_read()
    }
}

/// Extension trait providing iterator-style access for format readers.
///
/// This trait is automatically implemented for all types implementing [`FormatReader`].
pub trait FormatReaderExt: FormatReader {
    /// Iterate over the results of this reader without consuming it.
    fn results(&mut self) -> Results<&mut Self>
    where
        Self: Sized,
    {
        Results::new(self)
    }

    /// Turn this reader into an iterator over its results.
    fn into_results(self) -> Results<Self>
    where
        Self: Sized,
    {
        Results::new(self)
    }
}

impl<T: FormatReader> FormatReaderExt for T {}

/// Iterator adapter for [`FormatReader`].
///
/// Yields `Some(row)` per accepted record and `None` per rejected one.
/// Created by [`results`](FormatReaderExt::results) and
/// [`into_results`](FormatReaderExt::into_results).
#[derive(Debug)]
pub struct Results<R: FormatReader> {
    reader: R,
    done: bool,
    last_error: Option<MarcError>,
}

impl<R: FormatReader> Results<R> {
    fn new(reader: R) -> Self {
        Results {
            reader,
            done: false,
            last_error: None,
        }
    }

    /// The error behind the most recent `None` item, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&MarcError> {
        self.last_error.as_ref()
    }

    /// The underlying reader.
    #[must_use]
    pub fn reader(&self) -> &R {
        &self.reader
    }
}

impl<R: FormatReader> Iterator for Results<R> {
    type Item = Option<ResultRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_result() {
            Ok(Some(row)) => Some(Some(row)),
            Ok(None) => {
                self.done = true;
                None
            },
            Err(e) if e.is_fatal() => {
                warn!(error = %e, "record source failed, stopping");
                self.done = true;
                self.last_error = Some(e);
                Some(None)
            },
            Err(e) => {
                debug!(error = %e, "record rejected");
                self.last_error = Some(e);
                Some(None)
            },
        }
    }
}

impl<R: FormatReader> FusedIterator for Results<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OutputShape;
    use std::collections::VecDeque;

    /// Mock reader replaying canned outcomes
    #[derive(Debug)]
    struct MockReader {
        outcomes: VecDeque<Result<Option<ResultRow>>>,
        index: usize,
    }

    impl MockReader {
        fn new(outcomes: Vec<Result<Option<ResultRow>>>) -> Self {
            Self {
                outcomes: outcomes.into(),
                index: 0,
            }
        }
    }

    impl FormatReader for MockReader {
        fn read_result(&mut self) -> Result<Option<ResultRow>> {
            self.index += 1;
            self.outcomes.pop_front().unwrap_or(Ok(None))
        }

        fn records_read(&self) -> Option<usize> {
            Some(self.index)
        }
    }

    fn row() -> ResultRow {
        ResultRow::empty(OutputShape::Array)
    }

    #[test]
    fn test_rows_then_end() {
        let mut reader = MockReader::new(vec![Ok(Some(row())), Ok(Some(row()))]);
        assert_eq!(reader.results().count(), 2);
        assert_eq!(reader.records_read(), Some(3));
    }

    #[test]
    fn test_bad_record_yields_none_and_continues() {
        let reader = MockReader::new(vec![
            Ok(Some(row())),
            Err(MarcError::InvalidRecord("short".to_string())),
            Ok(Some(row())),
        ]);
        let mut results = reader.into_results();
        assert_eq!(results.next(), Some(Some(row())));
        assert_eq!(results.next(), Some(None));
        assert!(matches!(results.last_error(), Some(MarcError::InvalidRecord(_))));
        assert_eq!(results.next(), Some(Some(row())));
        assert_eq!(results.next(), None);
    }

    #[test]
    fn test_fatal_error_ends_stream() {
        let reader = MockReader::new(vec![
            Err(MarcError::XmlError("unclosed".to_string())),
            Ok(Some(row())),
        ]);
        let mut results = reader.into_results();
        assert_eq!(results.next(), Some(None));
        assert_eq!(results.next(), None);
        assert_eq!(results.next(), None);
        assert_eq!(results.reader().records_read(), Some(1));
    }

    #[test]
    fn test_boxed_reader() {
        let mut reader: Box<dyn FormatReader> = Box::new(MockReader::new(vec![Ok(Some(row()))]));
        assert_eq!(reader.results().count(), 1);
    }
}
