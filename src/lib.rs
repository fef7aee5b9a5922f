#![warn(missing_docs)]

//! # marcflow: field selection over MARC streams
//!
//! Select fields from bibliographic records in binary MARC (ISO 2709),
//! MARCXML and Aleph sequential form with a compact statement language, and
//! filter records by boolean combinations of field-content conditions.
//!
//! ## Quick Start
//!
//! ```
//! use marcflow::Selector;
//!
//! let mut selector = Selector::new();
//! selector.select("001 245a 650_0a^Fiction")?;
//!
//! let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim">
//!   <record>
//!     <controlfield tag="001">42</controlfield>
//!     <datafield tag="245" ind1="1" ind2="0"><subfield code="a">Tales</subfield></datafield>
//!     <datafield tag="650" ind1=" " ind2="0"><subfield code="a">Fiction</subfield></datafield>
//!   </record>
//! </collection>"#;
//!
//! for row in selector.marcxml_str(xml)?.flatten() {
//!     assert_eq!(row.to_json()?, r#"{"001":["42"],"245a":["Tales"]}"#);
//! }
//! # Ok::<(), marcflow::MarcError>(())
//! ```
//!
//! ## Selection statements
//!
//! A statement lists the fields to extract, optionally followed by a
//! condition clause:
//!
//! - `001`, `LDR`: a control field or the leader,
//! - `245`: a whole data field (subfields separated by 0x1F),
//! - `245a`: subfield `a` of field 245,
//! - `245*`: the indicator pair of field 245,
//! - `_` matches any character: `6__a`, `245_`.
//!
//! A condition is a 6-character label (tag, two indicators, subfield code)
//! optionally followed by a regular expression, e.g. `650_0aFiction`.
//! Conditions combine with `!`, `&`, `|` and parentheses. Spaces and
//! parentheses inside a regular expression are escaped with a backslash.
//!
//! ## Modules
//!
//! - [`query`] - Compiled queries and per-record collection
//! - [`reader`] - Binary MARC (ISO 2709) reader
//! - [`marcxml`] - MARCXML reader
//! - [`aleph`] - Aleph sequential reader
//! - [`formats`] - Reader trait, result iterator and format detection
//! - [`selector`] - Options plus current query, for repeated use
//! - [`label`] - Labels, reserved tags and wildcard matching
//! - [`combinator`] - Boolean expressions over conditions
//! - [`result`] - Per-record results
//! - [`options`] - Query options
//! - [`boundary_scanner`] - Record boundary detection across read chunks
//! - [`encoding`] - Character decoding
//! - [`error`] - Error types and result type

pub mod aleph;
pub mod boundary_scanner;
pub mod combinator;
pub mod encoding;
pub mod error;
/// Input formats with a unified reader trait.
///
/// See the [`formats`] module documentation for details on supported formats
/// and how to use format-agnostic code.
pub mod formats;
pub mod label;
pub mod marcxml;
pub mod options;
pub mod query;
pub mod reader;
pub mod result;
pub mod selector;
mod statement;

pub use aleph::AlephReader;
pub use combinator::Combinator;
pub use error::{MarcError, Result};
pub use formats::{Format, FormatReader, FormatReaderExt, Results};
pub use marcxml::MarcXmlReader;
pub use options::{OutputShape, SelectOptions};
pub use query::{
    CompiledQuery, ConditionSpec, FieldSpec, MatchContext, QueryDescription, RecordCollector,
};
pub use reader::MarcReader;
pub use result::ResultRow;
pub use selector::Selector;
