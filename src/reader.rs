//! Selecting from binary MARC (ISO 2709) streams.
//!
//! [`MarcReader`] reads any source implementing [`std::io::Read`] in fixed
//! chunks, splits it on the record terminator and runs each record through a
//! [`CompiledQuery`].
//!
//! A record is accepted only when its structure is consistent:
//!
//! - 40 to 99998 bytes long once newlines and tabs are removed (lengths and
//!   directory offsets count bytes, not characters),
//! - the first field terminator (end of the directory) sits at a multiple of 12,
//! - the record holds exactly one field terminator per directory entry plus
//!   the directory's own,
//! - every directory entry's length and start position are digits.
//!
//! Fields are read in start-position order, not directory order.
//!
//! # Examples
//!
//! ```
//! use marcflow::formats::FormatReaderExt;
//! use marcflow::{CompiledQuery, MarcReader};
//!
//! let record = "                        001000400000\x1E123\x1E\x1D";
//! let query = CompiledQuery::compile("001")?;
//! let mut reader = MarcReader::new(record.as_bytes(), &query);
//!
//! let rows: Vec<_> = reader.results().collect();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].as_ref().unwrap().to_json()?, r#"{"001":["123"]}"#);
//! # Ok::<(), marcflow::MarcError>(())
//! ```

use crate::boundary_scanner::RecordBoundaryScanner;
use crate::encoding::decode_utf8;
use crate::error::{MarcError, Result};
use crate::formats::FormatReader;
use crate::label::{is_control_tag, LEADER_TAG};
use crate::query::{CompiledQuery, MatchContext};
use crate::result::ResultRow;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: char = '\u{1F}';

const LEADER_LENGTH: usize = 24;
const DIRECTORY_ENTRY_LENGTH: usize = 12;
const MIN_RECORD_LENGTH: usize = 40;
const MAX_RECORD_LENGTH: usize = 99_999;

/// Read size for the underlying source.
const CHUNK_SIZE: usize = 4096;

/// Reader applying a [`CompiledQuery`] to binary MARC records.
pub struct MarcReader<'q, R: Read> {
    reader: R,
    query: &'q CompiledQuery,
    context: MatchContext,
    scanner: RecordBoundaryScanner,
    chunk: Vec<u8>,
    eof: bool,
    records_read: usize,
}

impl<'q, R: Read> MarcReader<'q, R> {
    /// Create a new reader over `reader` for `query`.
    pub fn new(reader: R, query: &'q CompiledQuery) -> Self {
        MarcReader {
            reader,
            query,
            context: MatchContext::default(),
            scanner: RecordBoundaryScanner::with_max_length(MAX_RECORD_LENGTH),
            chunk: vec![0u8; CHUNK_SIZE],
            eof: false,
            records_read: 0,
        }
    }

    /// Pull chunks until a record is complete or the input ends.
    ///
    /// The outer error is a failure of the source; the inner one rejects a
    /// single record the scanner could not hold.
    fn next_raw_record(&mut self) -> Result<Option<Result<Vec<u8>>>> {
        loop {
            if let Some(raw) = self.scanner.next_record() {
                return Ok(Some(raw));
            }
            if self.eof {
                return Ok(None);
            }
            let read = match self.reader.read(&mut self.chunk) {
                Ok(read) => read,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(MarcError::IoError(e)),
            };
            if read == 0 {
                self.eof = true;
                return Ok(self.scanner.finish());
            }
            self.scanner.feed(&self.chunk[..read]);
        }
    }
}

impl<R: Read> FormatReader for MarcReader<'_, R> {
    fn read_result(&mut self) -> Result<Option<ResultRow>> {
        let Some(raw) = self.next_raw_record()? else {
            return Ok(None);
        };
        self.records_read += 1;
        parse_record(&raw?, self.query, &mut self.context).map(Some)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

impl<R: Read> fmt::Debug for MarcReader<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarcReader")
            .field("statement", &self.query.statement())
            .field("records_read", &self.records_read)
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}

/// Apply a query to one raw record (without its record terminator).
///
/// # Errors
///
/// Returns [`MarcError::EncodingError`] if the bytes are not UTF-8 and
/// [`MarcError::InvalidRecord`] if the record structure is inconsistent.
pub fn parse_record(
    raw: &[u8],
    query: &CompiledQuery,
    context: &mut MatchContext,
) -> Result<ResultRow> {
    let text = decode_utf8(raw)?;
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
        .collect();
    // spaces are kept: a blank leader is still a leader
    let record = cleaned.trim_start_matches(|c: char| c.is_whitespace() && c != ' ');

    let length = record.len();
    if !(MIN_RECORD_LENGTH..MAX_RECORD_LENGTH).contains(&length) {
        return Err(MarcError::InvalidRecord(format!(
            "record length {length} outside {MIN_RECORD_LENGTH}..{MAX_RECORD_LENGTH}"
        )));
    }

    let bytes = record.as_bytes();
    let base = memchr::memchr(FIELD_TERMINATOR, bytes)
        .ok_or_else(|| MarcError::InvalidRecord("no directory terminator".to_string()))?;
    if base < LEADER_LENGTH || base % DIRECTORY_ENTRY_LENGTH != 0 {
        return Err(MarcError::InvalidRecord(format!(
            "directory ends at {base}, not on a 12-byte boundary"
        )));
    }

    let expected = base / DIRECTORY_ENTRY_LENGTH - 1;
    let terminators = memchr::memchr_iter(FIELD_TERMINATOR, bytes).count();
    if terminators != expected {
        return Err(MarcError::InvalidRecord(format!(
            "{terminators} field terminators, directory implies {expected}"
        )));
    }

    let leader = record
        .get(..LEADER_LENGTH)
        .ok_or_else(|| MarcError::InvalidRecord("leader is not 24 characters".to_string()))?;

    // start position -> tag; the 5-digit keys sort numerically
    let mut entries = BTreeMap::new();
    for entry in (LEADER_LENGTH..base).step_by(DIRECTORY_ENTRY_LENGTH) {
        let numbers = &bytes[entry + 3..entry + DIRECTORY_ENTRY_LENGTH];
        if !numbers.iter().all(u8::is_ascii_digit) {
            return Err(MarcError::InvalidRecord(format!(
                "directory entry at {entry} has non-numeric length or position"
            )));
        }
        let tag = record
            .get(entry..entry + 3)
            .ok_or_else(|| MarcError::InvalidRecord(format!("unreadable tag at {entry}")))?;
        entries.insert(&numbers[4..], tag);
    }

    let mut collector = query.collector(context);
    collector.emit_control(LEADER_TAG, leader);

    let data = &record[base + 1..];
    for (tag, field) in entries.into_values().zip(data.split(char::from(FIELD_TERMINATOR))) {
        if is_control_tag(tag) {
            collector.emit_control(tag, field);
            continue;
        }

        let mut subfields = field.split(SUBFIELD_DELIMITER);
        let indicators = subfields.next().unwrap_or_default();
        let content = field.char_indices().nth(2).map_or("", |(i, _)| &field[i..]);
        collector.emit_field(tag, content);
        collector.emit_indicators(tag, indicators);
        for subfield in subfields {
            let mut chars = subfield.chars();
            if let Some(code) = chars.next() {
                collector.emit_subfield(tag, indicators, code, chars.as_str());
            }
        }
    }

    Ok(collector.finish())
}
