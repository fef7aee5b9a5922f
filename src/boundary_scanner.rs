//! Record boundary detection across read chunks.
//!
//! Binary MARC records end with the 0x1D record terminator. Input arrives in
//! fixed-size chunks, so a record may straddle two or more of them;
//! [`RecordBoundaryScanner`] keeps the unterminated tail of the last chunk and
//! prepends it to the next. Terminators are located with the SIMD-accelerated
//! `memchr` crate.
//!
//! # Example
//!
//! ```
//! use marcflow::boundary_scanner::RecordBoundaryScanner;
//!
//! let mut scanner = RecordBoundaryScanner::new();
//! scanner.feed(b"first\x1Dsec");
//! scanner.feed(b"ond\x1Dthi");
//!
//! assert_eq!(scanner.next_record().transpose()?, Some(b"first".to_vec()));
//! assert_eq!(scanner.next_record().transpose()?, Some(b"second".to_vec()));
//! assert!(scanner.next_record().is_none());
//! assert_eq!(scanner.finish().transpose()?, Some(b"thi".to_vec()));
//! # Ok::<(), marcflow::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use std::collections::VecDeque;

/// The byte value that terminates MARC records (ISO 2709).
/// In ISO 2709 format, records end with 0x1D (not 0x1E, which is the field terminator).
pub const RECORD_TERMINATOR: u8 = 0x1D;

/// Splits a chunked byte stream into records.
#[derive(Debug, Default)]
pub struct RecordBoundaryScanner {
    /// Bytes after the last terminator seen so far
    tail: Vec<u8>,
    /// Length of the current record once its bytes were discarded
    discarded: usize,
    max_length: Option<usize>,
    /// Complete records not yet handed out
    ready: VecDeque<Result<Vec<u8>>>,
}

impl RecordBoundaryScanner {
    /// Create a scanner with an empty tail and no length limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner that holds at most `max_length` bytes of a record.
    ///
    /// Tabs, carriage returns and newlines are dropped while buffering and do
    /// not count. A record reaching `max_length` is discarded as it streams
    /// in and reported as [`MarcError::InvalidRecord`] once its terminator
    /// (or the end of input) arrives.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        RecordBoundaryScanner {
            max_length: Some(max_length),
            ..Self::default()
        }
    }

    /// Scan one chunk. Every terminator completes a record (without the
    /// terminator byte); bytes after the last terminator are kept as the tail.
    pub fn feed(&mut self, chunk: &[u8]) {
        let mut offset = 0;
        for terminator_pos in memchr::memchr_iter(RECORD_TERMINATOR, chunk) {
            self.buffer(&chunk[offset..terminator_pos]);
            let record = self.take_record();
            self.ready.push_back(record);
            offset = terminator_pos + 1;
        }
        self.buffer(&chunk[offset..]);
    }

    fn buffer(&mut self, bytes: &[u8]) {
        let Some(max_length) = self.max_length else {
            self.tail.extend_from_slice(bytes);
            return;
        };
        let kept = bytes.iter().copied().filter(|b| !is_line_break(*b));
        if self.discarded > 0 {
            self.discarded += kept.count();
            return;
        }
        self.tail.extend(kept);
        if self.tail.len() >= max_length {
            self.discarded = self.tail.len();
            self.tail = Vec::new();
        }
    }

    fn take_record(&mut self) -> Result<Vec<u8>> {
        let record = std::mem::take(&mut self.tail);
        match std::mem::take(&mut self.discarded) {
            0 => Ok(record),
            length => Err(MarcError::InvalidRecord(format!(
                "record of {length} bytes exceeds {} and was discarded",
                self.max_length.unwrap_or_default()
            ))),
        }
    }

    /// Next complete record, if any.
    ///
    /// # Errors
    ///
    /// A record that outgrew the scanner's maximum length comes out as
    /// [`MarcError::InvalidRecord`].
    pub fn next_record(&mut self) -> Option<Result<Vec<u8>>> {
        self.ready.pop_front()
    }

    /// Take the unterminated tail at end of input.
    ///
    /// Returns `None` when the tail is empty or only whitespace, as left by a
    /// trailing newline after the last terminator.
    pub fn finish(&mut self) -> Option<Result<Vec<u8>>> {
        if self.discarded == 0 && self.tail.iter().all(u8::is_ascii_whitespace) {
            self.tail.clear();
            return None;
        }
        Some(self.take_record())
    }

    /// Number of complete records waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.ready.len()
    }

    /// Bytes currently held for the unterminated record.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.tail.len()
    }
}

fn is_line_break(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\r' | b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scanner: &mut RecordBoundaryScanner) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| scanner.next_record())
            .map(|record| record.unwrap())
            .collect()
    }

    #[test]
    fn test_single_chunk() {
        let mut scanner = RecordBoundaryScanner::new();
        scanner.feed(&[1, 2, 3, 0x1D, 4, 5, 0x1D]);
        assert_eq!(scanner.pending(), 2);
        assert_eq!(drain(&mut scanner), vec![vec![1, 2, 3], vec![4, 5]]);
        assert!(scanner.finish().is_none());
    }

    #[test]
    fn test_record_spanning_three_chunks() {
        let mut scanner = RecordBoundaryScanner::new();
        scanner.feed(b"ab");
        scanner.feed(b"cd");
        assert_eq!(scanner.pending(), 0);
        scanner.feed(b"e\x1D");
        assert_eq!(drain(&mut scanner), vec![b"abcde".to_vec()]);
    }

    #[test]
    fn test_consecutive_terminators() {
        let mut scanner = RecordBoundaryScanner::new();
        scanner.feed(b"a\x1D\x1Db\x1D");
        assert_eq!(
            drain(&mut scanner),
            vec![b"a".to_vec(), Vec::new(), b"b".to_vec()]
        );
    }

    #[test]
    fn test_whitespace_tail_is_dropped() {
        let mut scanner = RecordBoundaryScanner::new();
        scanner.feed(b"a\x1D\r\n");
        assert_eq!(drain(&mut scanner), vec![b"a".to_vec()]);
        assert!(scanner.finish().is_none());
    }

    #[test]
    fn test_unterminated_tail() {
        let mut scanner = RecordBoundaryScanner::new();
        scanner.feed(b"a\x1Dbc");
        assert_eq!(scanner.finish().unwrap().unwrap(), b"bc".to_vec());
    }

    #[test]
    fn test_oversized_record_is_discarded() {
        let mut scanner = RecordBoundaryScanner::with_max_length(10);
        for _ in 0..100 {
            scanner.feed(b"xxxxxxxx");
            assert!(scanner.buffered() < 10 + 8);
        }
        assert_eq!(scanner.buffered(), 0);
        scanner.feed(b"x\x1Dshort\x1D");
        assert!(matches!(
            scanner.next_record(),
            Some(Err(MarcError::InvalidRecord(_)))
        ));
        assert_eq!(scanner.next_record().unwrap().unwrap(), b"short".to_vec());
        assert!(scanner.next_record().is_none());
    }

    #[test]
    fn test_oversized_tail_at_end_of_input() {
        let mut scanner = RecordBoundaryScanner::with_max_length(4);
        scanner.feed(b"abcdef");
        assert!(matches!(
            scanner.finish(),
            Some(Err(MarcError::InvalidRecord(_)))
        ));
        assert!(scanner.finish().is_none());
    }

    #[test]
    fn test_line_breaks_do_not_count_toward_limit() {
        let mut scanner = RecordBoundaryScanner::with_max_length(4);
        scanner.feed(b"a\nb\r\nc\t\x1D");
        assert_eq!(drain(&mut scanner), vec![b"abc".to_vec()]);
    }
}
