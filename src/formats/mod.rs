//! Input formats and format-agnostic reading.
//!
//! All readers implement [`FormatReader`], so selection code does not need to
//! know which serialization a source uses.
//!
//! # Supported Formats
//!
//! | Format | Reader | Extensions |
//! |--------|--------|------------|
//! | ISO 2709 | [`MarcReader`](crate::MarcReader) | `mrc`, `marc` |
//! | MARCXML | [`MarcXmlReader`](crate::MarcXmlReader) | `xml` |
//! | Aleph sequential | [`AlephReader`](crate::AlephReader) | `seq`, `aleph` |
//!
//! Any of the extensions may be followed by `.gz`, in which case
//! [`open_path`] decompresses the file while reading it.
//!
//! # Usage
//!
//! ```no_run
//! use marcflow::formats::{open_path, FormatReaderExt};
//! use marcflow::CompiledQuery;
//!
//! let query = CompiledQuery::compile("001 245a")?;
//! for row in open_path("records.mrc.gz", &query)?.into_results().flatten() {
//!     println!("{}", row.to_json()?);
//! }
//! # Ok::<(), marcflow::MarcError>(())
//! ```

mod traits;

pub use traits::{FormatReader, FormatReaderExt, Results};

use crate::aleph::AlephReader;
use crate::error::{MarcError, Result};
use crate::marcxml::MarcXmlReader;
use crate::query::CompiledQuery;
use crate::reader::MarcReader;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Supported format types for format detection and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    /// ISO 2709 binary MARC format (`.mrc`, `.marc`)
    Iso2709,
    /// MARCXML (`.xml`)
    MarcXml,
    /// Aleph sequential format (`.seq`, `.aleph`)
    Aleph,
}

impl Format {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    ///
    /// # Example
    ///
    /// ```
    /// use marcflow::formats::Format;
    ///
    /// assert_eq!(Format::from_extension("mrc"), Some(Format::Iso2709));
    /// assert_eq!(Format::from_extension("unknown"), None);
    /// ```
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mrc" | "marc" => Some(Self::Iso2709),
            "xml" => Some(Self::MarcXml),
            "seq" | "aleph" => Some(Self::Aleph),
            _ => None,
        }
    }

    /// Detect format from a file name, looking through a trailing `.gz`.
    ///
    /// ```
    /// use marcflow::formats::Format;
    ///
    /// assert_eq!(Format::from_path("dump.seq.gz"), Some(Format::Aleph));
    /// assert_eq!(Format::from_path("dump.gz"), None);
    /// ```
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let path = if is_gzipped(path) {
            Path::new(path.file_stem()?)
        } else {
            path
        };
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the canonical file extension for this format.
    ///
    /// # Example
    ///
    /// ```
    /// use marcflow::formats::Format;
    ///
    /// assert_eq!(Format::Iso2709.extension(), "mrc");
    /// ```
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Iso2709 => "mrc",
            Self::MarcXml => "xml",
            Self::Aleph => "seq",
        }
    }

    /// Get the human-readable name for this format.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Iso2709 => "ISO 2709",
            Self::MarcXml => "MARCXML",
            Self::Aleph => "Aleph sequential",
        }
    }

    /// Create the reader for this format over `source`.
    pub fn reader<'q>(
        self,
        source: Box<dyn Read + 'q>,
        query: &'q CompiledQuery,
    ) -> Box<dyn FormatReader + 'q> {
        match self {
            Self::Iso2709 => Box::new(MarcReader::new(source, query)),
            Self::MarcXml => Box::new(MarcXmlReader::new(BufReader::new(source), query)),
            Self::Aleph => Box::new(AlephReader::new(BufReader::new(source), query)),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Open a file and return the reader matching its extension.
///
/// A trailing `.gz` is decompressed on the fly.
///
/// # Errors
///
/// Returns [`MarcError::UnsupportedFormat`] if the extension is not
/// recognized, or an IO error if the file cannot be opened.
pub fn open_path<'q, P: AsRef<Path>>(
    path: P,
    query: &'q CompiledQuery,
) -> Result<Box<dyn FormatReader + 'q>> {
    let path = path.as_ref();
    let format = Format::from_path(path)
        .ok_or_else(|| MarcError::UnsupportedFormat(path.display().to_string()))?;
    let file = File::open(path)?;
    let source: Box<dyn Read> = if is_gzipped(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(format.reader(source, query))
}
