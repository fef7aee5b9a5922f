//! Selecting from Aleph sequential exports.
//!
//! Each line of an Aleph sequential file holds one field of one record:
//!
//! ```text
//! 000000123 24510 L $$aTitle$$cAuthor
//! ^^^^^^^^^ ^^^^^ ^ ^^^^^^^^^^^^^^^^^
//!   ASN     tag+  L payload (from column 18)
//!           ind
//! ```
//!
//! Consecutive lines sharing the 9-character accession sequence number (ASN)
//! make up one record. Lines shorter than 19 characters are ignored. Columns
//! count characters, not bytes.

use crate::encoding::map_read_error;
use crate::error::Result;
use crate::formats::FormatReader;
use crate::label::{is_control_tag, ASN_TAG, FORMAT_TAG, LEADER_TAG};
use crate::query::{CompiledQuery, MatchContext};
use crate::result::ResultRow;
use std::fmt;
use std::io::BufRead;

const ASN_LENGTH: usize = 9;
const MIN_LINE_LENGTH: usize = 19;
const TAG_COLUMN: usize = 10;
const INDICATOR_COLUMN: usize = 13;
const PAYLOAD_COLUMN: usize = 18;
const SUBFIELD_DELIMITER: &str = "$$";

/// Reader applying a [`CompiledQuery`] to Aleph sequential records.
///
/// # Examples
///
/// ```
/// use marcflow::formats::FormatReaderExt;
/// use marcflow::{AlephReader, CompiledQuery};
///
/// let data = "000000123 245   L $$aTitle\n";
/// let query = CompiledQuery::compile("245a")?;
/// let mut reader = AlephReader::new(data.as_bytes(), &query);
///
/// let row = reader.results().next().flatten().unwrap();
/// assert_eq!(row.to_json()?, r#"{"245a":["Title"]}"#);
/// # Ok::<(), marcflow::MarcError>(())
/// ```
pub struct AlephReader<'q, R: BufRead> {
    reader: R,
    query: &'q CompiledQuery,
    context: MatchContext,
    line: String,
    /// First line of the next record, read while closing the current one
    pending: Option<String>,
    records_read: usize,
}

impl<'q, R: BufRead> AlephReader<'q, R> {
    /// Create a new reader over `reader` for `query`.
    pub fn new(reader: R, query: &'q CompiledQuery) -> Self {
        AlephReader {
            reader,
            query,
            context: MatchContext::default(),
            line: String::new(),
            pending: None,
            records_read: 0,
        }
    }

    /// Next line long enough to carry a field, trimmed.
    fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).map_err(map_read_error)? == 0 {
                return Ok(None);
            }
            let line = self.line.trim();
            if line.chars().count() >= MIN_LINE_LENGTH {
                return Ok(Some(line.to_string()));
            }
        }
    }

    /// Lines of the next record.
    fn next_group(&mut self) -> Result<Option<Vec<String>>> {
        let mut group: Vec<String> = self.pending.take().into_iter().collect();
        while let Some(line) = self.next_line()? {
            if let Some(first) = group.first() {
                if columns(first, 0, Some(ASN_LENGTH)) != columns(&line, 0, Some(ASN_LENGTH)) {
                    self.pending = Some(line);
                    break;
                }
            }
            group.push(line);
        }
        Ok(if group.is_empty() { None } else { Some(group) })
    }
}

impl<R: BufRead> FormatReader for AlephReader<'_, R> {
    fn read_result(&mut self) -> Result<Option<ResultRow>> {
        let Some(group) = self.next_group()? else {
            return Ok(None);
        };
        self.records_read += 1;
        Ok(Some(select_group(&group, self.query, &mut self.context)))
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

impl<R: BufRead> fmt::Debug for AlephReader<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlephReader")
            .field("statement", &self.query.statement())
            .field("records_read", &self.records_read)
            .finish_non_exhaustive()
    }
}

/// Character columns `start..end` of a line (to the end when `end` is `None`).
fn columns(line: &str, start: usize, end: Option<usize>) -> &str {
    let offset = |column: usize| {
        line.char_indices()
            .nth(column)
            .map_or(line.len(), |(index, _)| index)
    };
    let from = offset(start);
    let to = end.map_or(line.len(), offset);
    &line[from..to.max(from)]
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

fn select_group(lines: &[String], query: &CompiledQuery, context: &mut MatchContext) -> ResultRow {
    let mut collector = query.collector(context);

    if let Some(first) = lines.first() {
        let asn = columns(first, 0, Some(ASN_LENGTH));
        if is_numeric(asn) {
            collector.emit_control(ASN_TAG, asn);
        }
    }

    for line in lines {
        if !is_numeric(columns(line, 0, Some(ASN_LENGTH))) {
            continue;
        }
        let tag = columns(line, TAG_COLUMN, Some(INDICATOR_COLUMN));
        let value = columns(line, PAYLOAD_COLUMN, None);
        if tag == FORMAT_TAG || tag == LEADER_TAG || is_control_tag(tag) {
            collector.emit_control(tag, value);
            continue;
        }

        let indicators = columns(line, INDICATOR_COLUMN, Some(INDICATOR_COLUMN + 2));
        collector.emit_field(tag, value);
        collector.emit_indicators(tag, indicators);
        for subfield in value.split(SUBFIELD_DELIMITER) {
            let mut chars = subfield.chars();
            if let Some(code) = chars.next() {
                collector.emit_subfield(tag, indicators, code, chars.as_str());
            }
        }
    }

    collector.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatReaderExt;
    use crate::MarcError;

    const SAMPLE: &str = "\
000000123 FMT   L BK
000000123 LDR   L -----nam^^22-----^a^4500
000000123 001   L 000000123
000000123 24510 L $$aFirst title$$cSomeone
000000123 650 0 L $$aFiction$$aFiction
short line
000000124 001   L 000000124
000000124 24500 L $$aSecond title
";

    fn select(statement: &str, data: &str) -> Vec<Option<ResultRow>> {
        let query = CompiledQuery::compile(statement).unwrap();
        let mut reader = AlephReader::new(data.as_bytes(), &query);
        reader.results().collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_columns() {
        assert_eq!(columns("abcdef", 1, Some(3)), "bc");
        assert_eq!(columns("abcdef", 4, None), "ef");
        assert_eq!(columns("äbc", 1, Some(2)), "b");
        assert_eq!(columns("ab", 5, Some(9)), "");
    }

    #[test]
    fn test_grouping_by_asn() {
        let rows = select("001", SAMPLE);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_ref().unwrap().get("001"), Some(&strings(&["000000123"])[..]));
        assert_eq!(rows[1].as_ref().unwrap().get("001"), Some(&strings(&["000000124"])[..]));
    }

    #[test]
    fn test_reserved_tags() {
        let rows = select("ASN FMT LDR", SAMPLE);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("ASN"), Some(&strings(&["000000123"])[..]));
        assert_eq!(row.get("FMT"), Some(&strings(&["BK"])[..]));
        assert_eq!(row.get("LDR"), Some(&strings(&["-----nam^^22-----^a^4500"])[..]));
    }

    #[test]
    fn test_data_field_emissions() {
        let rows = select("245 245* 245a 650a", SAMPLE);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("245"), Some(&strings(&["$$aFirst title$$cSomeone"])[..]));
        assert_eq!(row.get("245*"), Some(&strings(&["10"])[..]));
        assert_eq!(row.get("245a"), Some(&strings(&["First title"])[..]));
        assert_eq!(row.get("650a"), Some(&strings(&["Fiction"])[..]));
    }

    #[test]
    fn test_condition_on_asn() {
        let rows = select("245a ASN___124", SAMPLE);
        assert!(rows[0].as_ref().unwrap().is_empty());
        assert_eq!(
            rows[1].as_ref().unwrap().get("245a"),
            Some(&strings(&["Second title"])[..])
        );
    }

    #[test]
    fn test_empty_source() {
        assert!(select("001", "").is_empty());
        assert!(select("001", "\n  \nshort\n").is_empty());
    }

    #[test]
    fn test_condition_on_indicators() {
        let rows = select("001 6500_aFic", SAMPLE);
        assert!(rows[0].as_ref().unwrap().is_empty());
        let rows = select("001 650_0aFic", SAMPLE);
        assert!(!rows[0].as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_non_numeric_asn_lines_are_ignored() {
        let data = "ABCDEFGHI 245   L $$aIgnored\n";
        let rows = select("245a", data);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_ref().unwrap().get("245a"), Some(&[][..]));
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let mut data = b"000000001 245   L $$aOk\n000000002 245   L $$aLost\n000000003 245   L $$a".to_vec();
        data.extend_from_slice(&[0xFF, 0xFE]);
        data.push(b'\n');
        let query = CompiledQuery::compile("245a").unwrap();
        let mut reader = AlephReader::new(&data[..], &query);
        let mut results = reader.results();
        assert!(results.next().flatten().is_some());
        assert_eq!(results.next(), Some(None));
        assert_eq!(results.next(), None);
        assert!(matches!(results.last_error(), Some(MarcError::EncodingError(_))));
    }
}
