//! BER decoder for fully buffered values
//!
//! The grammar engine hands actions the raw value of each primitive TLV.
//! This module turns those values into Rust types, and provides
//! [`BerDecoder`] for the few places where a complete nested structure is
//! available at once (control values, search filters, extended operation
//! payloads).
//!
//! # Usage Example
//!
//! ```rust
//! use ldap_asn1::BerDecoder;
//!
//! // SEQUENCE { INTEGER 10, OCTET STRING "" }
//! let data = [0x30, 0x05, 0x02, 0x01, 0x0A, 0x04, 0x00];
//! let mut decoder = BerDecoder::new(&data);
//! let mut seq = BerDecoder::new(decoder.decode_sequence().unwrap());
//! assert_eq!(seq.decode_integer().unwrap(), 10);
//! assert!(seq.decode_octet_string().unwrap().is_empty());
//! ```

use crate::ber::types::{BerLength, BerTag};
use ldap_core::{DecodeError, DecodeResult};

/// Decode a two's complement big-endian INTEGER value
///
/// # Errors
/// Returns error if the value is empty or longer than 8 bytes.
pub fn decode_integer_value(bytes: &[u8]) -> DecodeResult<i64> {
    if bytes.is_empty() {
        return Err(DecodeError::invalid("INTEGER", "empty encoding"));
    }
    if bytes.len() > 8 {
        return Err(DecodeError::invalid(
            "INTEGER",
            format!("too large: {} bytes (max 8)", bytes.len()),
        ));
    }

    let is_negative = (bytes[0] & 0x80) != 0;
    let mut value = if is_negative { -1i64 } else { 0i64 };
    for &byte in bytes {
        value = (value << 8) | byte as i64;
    }
    Ok(value)
}

/// Decode an INTEGER value and check it against `min..=max`
///
/// # Arguments
/// * `field` - Field name used in the error
/// * `bytes` - Value bytes
/// * `min`, `max` - Inclusive bounds
pub fn decode_integer_in_range(
    field: &'static str,
    bytes: &[u8],
    min: i64,
    max: i64,
) -> DecodeResult<i64> {
    let value = decode_integer_value(bytes)?;
    if value < min || value > max {
        return Err(DecodeError::invalid(
            field,
            format!("{} is out of range {}..={}", value, min, max),
        ));
    }
    Ok(value)
}

/// Decode a BOOLEAN value
///
/// BER accepts any non-zero octet as TRUE.
pub fn decode_boolean_value(bytes: &[u8]) -> DecodeResult<bool> {
    match bytes {
        [byte] => Ok(*byte != 0),
        _ => Err(DecodeError::invalid(
            "BOOLEAN",
            format!("expected 1 byte, got {}", bytes.len()),
        )),
    }
}

/// Decode a UTF-8 character string value
pub fn decode_utf8_value(field: &'static str, bytes: &[u8]) -> DecodeResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| DecodeError::InvalidUtf8(field))
}

/// BER decoder over a fully buffered slice
///
/// The decoder maintains a position that advances as values are decoded.
/// Every read is bounded by the slice; running past its end is an error,
/// since the enclosing TLV was already complete when the slice was taken.
pub struct BerDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BerDecoder<'a> {
    /// Create a new BER decoder
    ///
    /// # Arguments
    /// * `buffer` - Buffer containing BER-encoded data
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Get current position in buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get remaining bytes
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Check if there is more data to decode
    pub fn has_remaining(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// Peek at the next tag without consuming it
    pub fn peek_tag(&self) -> DecodeResult<Option<BerTag>> {
        if !self.has_remaining() {
            return Ok(None);
        }
        BerTag::decode(&self.buffer[self.position..]).map(|(tag, _)| Some(tag))
    }

    fn read_bytes(&mut self, count: usize) -> DecodeResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(DecodeError::LengthExceedsScope {
                length: count,
                remaining: self.remaining(),
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.buffer[start..start + count])
    }

    /// Decode a TLV (Tag-Length-Value) triplet
    ///
    /// # Returns
    /// Returns `Ok((tag, value_bytes))` if successful.
    pub fn decode_tlv(&mut self) -> DecodeResult<(BerTag, &'a [u8])> {
        let (tag, tag_bytes) = BerTag::decode(&self.buffer[self.position..])?;
        self.position += tag_bytes;

        let (length, length_bytes) = BerLength::decode(&self.buffer[self.position..])?;
        self.position += length_bytes;

        let value = self.read_bytes(length.value())?;
        Ok((tag, value))
    }

    /// Decode a TLV and check its tag
    pub fn decode_expected(&mut self, expected: BerTag) -> DecodeResult<&'a [u8]> {
        let (tag, value) = self.decode_tlv()?;
        if tag != expected {
            return Err(DecodeError::invalid(
                "tag",
                format!("expected {}, got {}", expected, tag),
            ));
        }
        Ok(value)
    }

    /// Decode an INTEGER
    pub fn decode_integer(&mut self) -> DecodeResult<i64> {
        let value = self.decode_expected(BerTag::INTEGER)?;
        decode_integer_value(value)
    }

    /// Decode an ENUMERATED
    pub fn decode_enumerated(&mut self) -> DecodeResult<i64> {
        let value = self.decode_expected(BerTag::ENUMERATED)?;
        decode_integer_value(value)
    }

    /// Decode a BOOLEAN
    pub fn decode_boolean(&mut self) -> DecodeResult<bool> {
        let value = self.decode_expected(BerTag::BOOLEAN)?;
        decode_boolean_value(value)
    }

    /// Decode an OCTET STRING
    pub fn decode_octet_string(&mut self) -> DecodeResult<&'a [u8]> {
        self.decode_expected(BerTag::OCTET_STRING)
    }

    /// Decode a SEQUENCE and return its content bytes
    pub fn decode_sequence(&mut self) -> DecodeResult<&'a [u8]> {
        self.decode_expected(BerTag::SEQUENCE)
    }

    /// Decode a context-specific tag
    ///
    /// # Arguments
    /// * `expected_tag_number` - Expected context-specific tag number
    /// * `constructed` - Whether this is expected to be constructed
    pub fn decode_context_specific(
        &mut self,
        expected_tag_number: u32,
        constructed: bool,
    ) -> DecodeResult<&'a [u8]> {
        self.decode_expected(BerTag::context_specific(constructed, expected_tag_number))
    }

    /// Skip a TLV
    ///
    /// # Returns
    /// Returns the number of bytes skipped.
    pub fn skip_tlv(&mut self) -> DecodeResult<usize> {
        let start = self.position;
        self.decode_tlv()?;
        Ok(self.position - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_integer_value_sign() {
        assert_eq!(decode_integer_value(&[0x7F]).unwrap(), 127);
        assert_eq!(decode_integer_value(&[0x00, 0x80]).unwrap(), 128);
        assert_eq!(decode_integer_value(&[0xFF]).unwrap(), -1);
        assert_eq!(decode_integer_value(&[0xFF, 0x7F]).unwrap(), -129);
        assert!(decode_integer_value(&[]).is_err());
        assert!(decode_integer_value(&[0; 9]).is_err());
    }

    #[test]
    fn test_decode_integer_in_range() {
        assert_eq!(decode_integer_in_range("version", &[0x03], 1, 127).unwrap(), 3);
        assert!(decode_integer_in_range("version", &[0x00, 0x80], 1, 127).is_err());
    }

    #[test]
    fn test_decode_boolean_value() {
        assert!(decode_boolean_value(&[0xFF]).unwrap());
        assert!(decode_boolean_value(&[0x01]).unwrap());
        assert!(!decode_boolean_value(&[0x00]).unwrap());
        assert!(decode_boolean_value(&[0x00, 0x00]).is_err());
    }

    #[test]
    fn test_decode_utf8_value() {
        assert_eq!(decode_utf8_value("name", "héllo".as_bytes()).unwrap(), "héllo");
        assert_eq!(
            decode_utf8_value("name", &[0xC3, 0x28]),
            Err(DecodeError::InvalidUtf8("name"))
        );
    }

    #[test]
    fn test_decode_tlv_truncated_value() {
        let data = [0x04, 0x05, b'a'];
        let mut decoder = BerDecoder::new(&data);
        assert!(matches!(
            decoder.decode_tlv(),
            Err(DecodeError::LengthExceedsScope { length: 5, remaining: 1 })
        ));
    }

    #[test]
    fn test_decode_expected_tag_mismatch() {
        let data = [0x01, 0x01, 0xFF];
        let mut decoder = BerDecoder::new(&data);
        assert!(decoder.decode_integer().is_err());
    }

    #[test]
    fn test_peek_and_skip() {
        let data = [0x80, 0x01, 0x00, 0x02, 0x01, 0x07];
        let mut decoder = BerDecoder::new(&data);
        assert_eq!(decoder.peek_tag().unwrap(), Some(BerTag::context_specific(false, 0)));
        assert_eq!(decoder.skip_tlv().unwrap(), 3);
        assert_eq!(decoder.decode_integer().unwrap(), 7);
        assert_eq!(decoder.peek_tag().unwrap(), None);
    }
}
