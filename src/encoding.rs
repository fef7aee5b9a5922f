//! Character decoding for raw record bytes.
//!
//! Records are decoded as strict UTF-8. Malformed byte sequences are not
//! replaced: a source that cannot be decoded is unusable, so decoding
//! failures surface as [`MarcError::EncodingError`], which is fatal.

use crate::error::{MarcError, Result};
use std::borrow::Cow;

/// Decode bytes as UTF-8 without replacement characters.
///
/// # Errors
///
/// Returns [`MarcError::EncodingError`] if the bytes are not valid UTF-8.
///
/// # Examples
///
/// ```
/// use marcflow::encoding::decode_utf8;
///
/// assert_eq!(decode_utf8("Bücher".as_bytes())?, "Bücher");
/// assert!(decode_utf8(&[0x66, 0xFF]).is_err());
/// # Ok::<(), marcflow::MarcError>(())
/// ```
pub fn decode_utf8(bytes: &[u8]) -> Result<Cow<'_, str>> {
    encoding_rs::UTF_8
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| {
            let valid = match std::str::from_utf8(bytes) {
                Ok(_) => bytes.len(),
                Err(e) => e.valid_up_to(),
            };
            MarcError::EncodingError(format!("invalid UTF-8 after byte {valid}"))
        })
}

/// Map an IO error raised by line-oriented text reading to the library error.
///
/// `BufRead::read_line` reports undecodable input as `InvalidData`.
pub(crate) fn map_read_error(err: std::io::Error) -> MarcError {
    if err.kind() == std::io::ErrorKind::InvalidData {
        MarcError::EncodingError(err.to_string())
    } else {
        MarcError::IoError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_utf8_is_borrowed() {
        let decoded = decode_utf8(b"plain ascii").unwrap();
        assert!(matches!(decoded, Cow::Borrowed(_)));
    }

    #[test]
    fn test_invalid_utf8_reports_offset() {
        let err = decode_utf8(&[b'a', b'b', 0xC3]).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("after byte 2"), "got: {err}");
    }

    #[test]
    fn test_map_read_error() {
        let invalid = std::io::Error::new(std::io::ErrorKind::InvalidData, "stream did not contain valid UTF-8");
        assert!(matches!(map_read_error(invalid), MarcError::EncodingError(_)));
        let other = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert!(matches!(map_read_error(other), MarcError::IoError(_)));
    }
}
