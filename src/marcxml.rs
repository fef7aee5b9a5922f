//! Selecting from MARCXML documents.
//!
//! [`MarcXmlReader`] streams a MARCXML document with `quick-xml`, one
//! `<record>` at a time. The document root is either a single `<record>` or a
//! container (usually `<collection>`) whose `<record>` children are read in
//! order. Element names are matched on their local part, so the default
//! namespace form (`<record xmlns="http://www.loc.gov/MARC21/slim">`) and the
//! prefixed form (`<marc:record xmlns:marc="...">`) both work. A prefix that was
//! never declared is an XML error.
//!
//! Within a record:
//! - `<leader>` is emitted under `LDR`,
//! - each `<controlfield tag>` is emitted whole, except a `LDR` control field
//!   repeating the leader,
//! - each `<datafield tag ind1 ind2>` emits its indicator pair, every
//!   `<subfield code>`, and a whole-field value rebuilt as
//!   `\x1Fa...\x1Fb...` so that whole-field selection works as for binary MARC.
//!
//! # Examples
//!
//! ```
//! use marcflow::formats::FormatReaderExt;
//! use marcflow::{CompiledQuery, MarcXmlReader};
//!
//! let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim">
//!   <record>
//!     <controlfield tag="001">42</controlfield>
//!     <datafield tag="245" ind1="1" ind2="0">
//!       <subfield code="a">Title</subfield>
//!     </datafield>
//!   </record>
//! </collection>"#;
//!
//! let query = CompiledQuery::compile("001 245a")?;
//! let mut reader = MarcXmlReader::new(xml.as_bytes(), &query);
//! let row = reader.results().next().flatten().unwrap();
//! assert_eq!(row.to_json()?, r#"{"001":["42"],"245a":["Title"]}"#);
//! # Ok::<(), marcflow::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::formats::FormatReader;
use crate::label::LEADER_TAG;
use crate::query::{CompiledQuery, MatchContext};
use crate::result::ResultRow;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::fmt;
use std::io::BufRead;

const SUBFIELD_DELIMITER: char = '\u{1F}';

/// Subfield values of one `<datafield>`.
#[derive(Debug, Default)]
struct XmlDataField {
    tag: String,
    ind1: String,
    ind2: String,
    subfields: Vec<(String, String)>,
}

impl XmlDataField {
    /// Tag and indicators from a `<datafield>` start tag. Missing indicators are blank.
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        Ok(XmlDataField {
            tag: attribute(start, b"tag")?.unwrap_or_default(),
            ind1: attribute(start, b"ind1")?.unwrap_or_else(|| " ".to_string()),
            ind2: attribute(start, b"ind2")?.unwrap_or_else(|| " ".to_string()),
            subfields: Vec::new(),
        })
    }
}

/// The parts of one `<record>` relevant to selection.
#[derive(Debug, Default)]
struct XmlRecord {
    leader: Option<String>,
    control_fields: Vec<(String, String)>,
    data_fields: Vec<XmlDataField>,
}

/// What the document root turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    /// Nothing read yet.
    Pending,
    /// The root is the only record.
    Record,
    /// The root contains records.
    Container,
    /// The root has been closed.
    Closed,
}

/// Reader applying a [`CompiledQuery`] to MARCXML records.
pub struct MarcXmlReader<'q, R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    query: &'q CompiledQuery,
    context: MatchContext,
    root: Root,
    depth: usize,
    records_read: usize,
}

impl<'q, R: BufRead> MarcXmlReader<'q, R> {
    /// Create a new reader over `reader` for `query`.
    pub fn new(reader: R, query: &'q CompiledQuery) -> Self {
        MarcXmlReader {
            reader: NsReader::from_reader(reader),
            buf: Vec::new(),
            query,
            context: MatchContext::default(),
            root: Root::Pending,
            depth: 0,
            records_read: 0,
        }
    }

    /// Read the next event, rejecting elements in undeclared namespaces.
    fn next_event(&mut self) -> Result<Event<'static>> {
        self.buf.clear();
        let (namespace, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
        if let ResolveResult::Unknown(prefix) = namespace {
            return Err(MarcError::XmlError(format!(
                "undeclared namespace prefix {:?}",
                String::from_utf8_lossy(&prefix)
            )));
        }
        Ok(event.into_owned())
    }

    /// Collect the text of the element just opened, up to its end tag.
    fn read_text(&mut self) -> Result<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            match self.next_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(text),
                Event::End(_) => depth -= 1,
                Event::Text(t) if depth == 0 => text.push_str(&t.unescape()?),
                Event::CData(c) if depth == 0 => {
                    let data = std::str::from_utf8(&c)
                        .map_err(|e| MarcError::EncodingError(e.to_string()))?;
                    text.push_str(data);
                },
                Event::Eof => {
                    return Err(MarcError::XmlError(
                        "document ends inside an element".to_string(),
                    ))
                },
                _ => {},
            }
        }
    }

    /// Skip the element just opened, up to its end tag.
    fn skip_element(&mut self) -> Result<()> {
        self.read_text().map(drop)
    }

    fn read_data_field(&mut self, start: &BytesStart<'_>) -> Result<XmlDataField> {
        let mut field = XmlDataField::from_start(start)?;
        loop {
            match self.next_event()? {
                Event::Start(e) if e.local_name().as_ref() == b"subfield" => {
                    let code = attribute(&e, b"code")?;
                    let text = self.read_text()?;
                    if let Some(code) = code {
                        field.subfields.push((code, text));
                    }
                },
                Event::Start(_) => self.skip_element()?,
                Event::End(_) => return Ok(field),
                Event::Eof => {
                    return Err(MarcError::XmlError(
                        "document ends inside a datafield".to_string(),
                    ))
                },
                _ => {},
            }
        }
    }

    /// Read the children of the `<record>` element just opened.
    fn read_record(&mut self) -> Result<XmlRecord> {
        let mut record = XmlRecord::default();
        loop {
            match self.next_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"leader" => record.leader = Some(self.read_text()?),
                    b"controlfield" => {
                        let tag = attribute(&e, b"tag")?;
                        let text = self.read_text()?;
                        if let Some(tag) = tag {
                            record.control_fields.push((tag, text));
                        }
                    },
                    b"datafield" => {
                        let field = self.read_data_field(&e)?;
                        record.data_fields.push(field);
                    },
                    _ => self.skip_element()?,
                },
                Event::Empty(e) if e.local_name().as_ref() == b"datafield" => {
                    record.data_fields.push(XmlDataField::from_start(&e)?);
                },
                Event::End(_) => return Ok(record),
                Event::Eof => {
                    return Err(MarcError::XmlError(
                        "document ends inside a record".to_string(),
                    ))
                },
                _ => {},
            }
        }
    }

    /// Advance to the next `<record>` element and read it.
    fn next_record(&mut self) -> Result<Option<XmlRecord>> {
        loop {
            match self.next_event()? {
                Event::Start(e) => {
                    let is_record = e.local_name().as_ref() == b"record";
                    match (self.root, self.depth) {
                        (Root::Pending, 0) if is_record => {
                            self.root = Root::Record;
                            let record = self.read_record()?;
                            self.root = Root::Closed;
                            return Ok(Some(record));
                        },
                        (Root::Pending, 0) => {
                            self.root = Root::Container;
                            self.depth = 1;
                        },
                        (Root::Container, 1) if is_record => {
                            return self.read_record().map(Some);
                        },
                        (Root::Container, _) => {
                            self.skip_element()?;
                        },
                        _ => {
                            return Err(MarcError::XmlError(
                                "content after the document root".to_string(),
                            ))
                        },
                    }
                },
                Event::Empty(e) => {
                    let is_record = e.local_name().as_ref() == b"record";
                    match (self.root, self.depth) {
                        (Root::Pending, 0) => {
                            self.root = Root::Closed;
                            if is_record {
                                return Ok(Some(XmlRecord::default()));
                            }
                        },
                        (Root::Container, 1) if is_record => {
                            return Ok(Some(XmlRecord::default()));
                        },
                        (Root::Container, _) => {},
                        _ => {
                            return Err(MarcError::XmlError(
                                "content after the document root".to_string(),
                            ))
                        },
                    }
                },
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    self.root = Root::Closed;
                },
                Event::Eof => {
                    return match self.root {
                        Root::Pending => {
                            Err(MarcError::XmlError("document has no root element".to_string()))
                        },
                        Root::Container => Err(MarcError::XmlError(
                            "document ends inside the root element".to_string(),
                        )),
                        Root::Record | Root::Closed => Ok(None),
                    };
                },
                _ => {},
            }
        }
    }
}

impl<R: BufRead> FormatReader for MarcXmlReader<'_, R> {
    fn read_result(&mut self) -> Result<Option<ResultRow>> {
        let Some(record) = self.next_record()? else {
            return Ok(None);
        };
        self.records_read += 1;
        Ok(Some(select_record(&record, self.query, &mut self.context)))
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

impl<R: BufRead> fmt::Debug for MarcXmlReader<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarcXmlReader")
            .field("statement", &self.query.statement())
            .field("records_read", &self.records_read)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Value of an unprefixed attribute, unescaped.
fn attribute(start: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn select_record(
    record: &XmlRecord,
    query: &CompiledQuery,
    context: &mut MatchContext,
) -> ResultRow {
    let mut collector = query.collector(context);

    let leader = record.leader.as_deref().filter(|l| !l.is_empty());
    if let Some(leader) = leader {
        collector.emit_control(LEADER_TAG, leader);
    }

    for (tag, text) in &record.control_fields {
        if tag.is_empty() || text.is_empty() {
            continue;
        }
        if tag == LEADER_TAG && leader == Some(text.as_str()) {
            continue;
        }
        collector.emit_control(tag, text);
    }

    for field in &record.data_fields {
        if field.tag.is_empty()
            || field.tag.chars().count() + field.ind1.chars().count() + field.ind2.chars().count()
                != 5
        {
            continue;
        }
        let indicators = format!("{}{}", field.ind1, field.ind2);
        collector.emit_indicators(&field.tag, &indicators);

        let mut whole = String::new();
        for (code, text) in &field.subfields {
            let mut chars = code.chars();
            let (Some(code), None) = (chars.next(), chars.next()) else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            collector.emit_subfield(&field.tag, &indicators, code, text);
            whole.push(SUBFIELD_DELIMITER);
            whole.push(code);
            whole.push_str(text);
        }
        collector.emit_field(&field.tag, &whole);
    }

    collector.finish()
}
