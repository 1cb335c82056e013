//! Incremental TLV reader
//!
//! Network input arrives in chunks of arbitrary size, so a TLV header may be
//! split anywhere: inside a multi-byte tag, between the length-of-length byte
//! and the length bytes, or before the value. [`TlvReader`] keeps the partial
//! header it has seen so far and consumes header bytes from the caller's
//! buffer as soon as it sees them. Values are only taken once complete, so no
//! byte is ever read twice.

use crate::ber::types::{BerTag, BerTagClass, MAX_LENGTH_OCTETS};
use bytes::{Buf, Bytes, BytesMut};
use ldap_core::{DecodeError, DecodeResult};

/// Header of a TLV: its tag and the length of its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvHeader {
    /// Tag
    pub tag: BerTag,
    /// Declared value length
    pub length: usize,
    /// Number of octets used by tag and length
    pub header_len: usize,
}

impl TlvHeader {
    /// Total encoded size: header plus value
    pub fn total_len(&self) -> usize {
        self.header_len + self.length
    }
}

/// One decoded TLV handed to grammar actions
///
/// For primitive TLVs `value` holds the complete value. For constructed TLVs
/// the engine descends into the children instead, and `value` is empty unless
/// the grammar asked for the whole encoding as one opaque value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    header: TlvHeader,
    value: Bytes,
}

impl Tlv {
    /// Create a TLV from a header and its value bytes
    pub fn new(header: TlvHeader, value: Bytes) -> Self {
        Self { header, value }
    }

    /// Get the tag
    pub fn tag(&self) -> BerTag {
        self.header.tag
    }

    /// Get the declared value length
    pub fn length(&self) -> usize {
        self.header.length
    }

    /// Get the header
    pub fn header(&self) -> &TlvHeader {
        &self.header
    }

    /// Get the value bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ReadState {
    #[default]
    TagStart,
    PendingTag,
    LengthStart,
    PendingLength,
    HeaderDone,
}

/// Resumable reader for one TLV at a time
///
/// # Usage
///
/// ```rust
/// use bytes::BytesMut;
/// use ldap_asn1::TlvReader;
///
/// let mut reader = TlvReader::new();
/// let mut buf = BytesMut::from(&[0x04, 0x03, b'a'][..]);
/// let header = reader.read_header(&mut buf).unwrap().unwrap();
/// assert_eq!(header.length, 3);
/// // Value not fully buffered yet
/// assert!(reader.read_value(&mut buf).is_none());
/// buf.extend_from_slice(b"bc");
/// assert_eq!(&reader.read_value(&mut buf).unwrap()[..], b"abc");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TlvReader {
    state: ReadState,
    first_octet: u8,
    tag_number: u32,
    tag_octets: usize,
    length: usize,
    length_octets: usize,
    length_octets_left: usize,
    tag: Option<BerTag>,
}

impl TlvReader {
    /// Create a reader positioned before a tag
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget any partially read header
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check whether some bytes of the current TLV have been consumed
    pub fn in_progress(&self) -> bool {
        self.state != ReadState::TagStart
    }

    /// Read the tag of the next TLV
    ///
    /// # Returns
    /// `Ok(None)` when the buffer ran dry in the middle of the tag. Consumed
    /// bytes are remembered, so the next call continues where this one
    /// stopped.
    pub fn read_tag(&mut self, buf: &mut BytesMut) -> DecodeResult<Option<BerTag>> {
        loop {
            match self.state {
                ReadState::TagStart => {
                    if !buf.has_remaining() {
                        return Ok(None);
                    }
                    let octet = buf.get_u8();
                    self.first_octet = octet;
                    self.tag_octets = 1;
                    if octet & 0x1F == 0x1F {
                        self.tag_number = 0;
                        self.state = ReadState::PendingTag;
                    } else {
                        self.tag = Some(BerTag::from_byte(octet));
                        self.state = ReadState::LengthStart;
                    }
                }
                ReadState::PendingTag => {
                    if !buf.has_remaining() {
                        return Ok(None);
                    }
                    let octet = buf.get_u8();
                    self.tag_octets += 1;
                    if self.tag_octets > 5 {
                        return Err(DecodeError::TagTooLarge);
                    }
                    self.tag_number = (self.tag_number << 7) | (octet & 0x7F) as u32;
                    if octet & 0x80 == 0 {
                        self.tag = Some(BerTag::new(
                            BerTagClass::from_bits(self.first_octet),
                            self.first_octet & 0x20 != 0,
                            self.tag_number,
                        ));
                        self.state = ReadState::LengthStart;
                    }
                }
                _ => return Ok(self.tag),
            }
        }
    }

    /// Read the length of the current TLV
    ///
    /// Must be called after [`TlvReader::read_tag`] returned a tag.
    ///
    /// # Errors
    /// Returns error for the indefinite form and for lengths announced with
    /// more than four octets.
    pub fn read_length(&mut self, buf: &mut BytesMut) -> DecodeResult<Option<usize>> {
        loop {
            match self.state {
                ReadState::TagStart | ReadState::PendingTag => return Ok(None),
                ReadState::LengthStart => {
                    if !buf.has_remaining() {
                        return Ok(None);
                    }
                    let octet = buf.get_u8();
                    if octet & 0x80 == 0 {
                        self.length = octet as usize;
                        self.length_octets = 1;
                        self.state = ReadState::HeaderDone;
                    } else {
                        let count = (octet & 0x7F) as usize;
                        if count == 0 {
                            return Err(DecodeError::IndefiniteLength);
                        }
                        if count > MAX_LENGTH_OCTETS {
                            return Err(DecodeError::LengthTooLong(count));
                        }
                        self.length = 0;
                        self.length_octets = 1 + count;
                        self.length_octets_left = count;
                        self.state = ReadState::PendingLength;
                    }
                }
                ReadState::PendingLength => {
                    if !buf.has_remaining() {
                        return Ok(None);
                    }
                    let octet = buf.get_u8();
                    self.length = (self.length << 8) | octet as usize;
                    self.length_octets_left -= 1;
                    if self.length_octets_left == 0 {
                        self.state = ReadState::HeaderDone;
                    }
                }
                ReadState::HeaderDone => return Ok(Some(self.length)),
            }
        }
    }

    /// Read tag and length of the current TLV
    ///
    /// Calling this again once the header is complete returns the same
    /// header without consuming anything.
    pub fn read_header(&mut self, buf: &mut BytesMut) -> DecodeResult<Option<TlvHeader>> {
        let Some(tag) = self.read_tag(buf)? else {
            return Ok(None);
        };
        let Some(length) = self.read_length(buf)? else {
            return Ok(None);
        };
        Ok(Some(TlvHeader {
            tag,
            length,
            header_len: self.tag_octets + self.length_octets,
        }))
    }

    /// Take the complete value of the current TLV
    ///
    /// Returns `None`, consuming nothing, while fewer than `length` bytes are
    /// buffered. This is a suspension point, not an error. On success the
    /// reader is positioned before the next tag.
    pub fn read_value(&mut self, buf: &mut BytesMut) -> Option<Bytes> {
        if self.state != ReadState::HeaderDone || buf.len() < self.length {
            return None;
        }
        let value = buf.split_to(self.length).freeze();
        self.reset();
        Some(value)
    }

    /// Finish the current TLV without reading its value
    ///
    /// Used when descending into a constructed TLV: its value is the
    /// sequence of child TLVs that follow.
    pub fn skip_value(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_short_header() {
        let mut reader = TlvReader::new();
        let mut buf = BytesMut::from(&[0x30, 0x05, 0x02][..]);
        let header = reader.read_header(&mut buf).unwrap().unwrap();
        assert_eq!(header.tag, BerTag::SEQUENCE);
        assert_eq!(header.length, 5);
        assert_eq!(header.header_len, 2);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_read_header_byte_by_byte() {
        let encoded = [0x9F, 0x81, 0x48, 0x82, 0x01, 0x00];
        let mut reader = TlvReader::new();
        let mut buf = BytesMut::new();
        for (i, byte) in encoded.iter().enumerate() {
            buf.extend_from_slice(&[*byte]);
            let header = reader.read_header(&mut buf).unwrap();
            if i < encoded.len() - 1 {
                assert!(header.is_none());
                assert!(buf.is_empty());
            } else {
                let header = header.unwrap();
                assert_eq!(header.tag, BerTag::context_specific(false, 200));
                assert_eq!(header.length, 256);
                assert_eq!(header.header_len, 6);
            }
        }
    }

    #[test]
    fn test_read_value_waits_for_all_bytes() {
        let mut reader = TlvReader::new();
        let mut buf = BytesMut::from(&[0x04, 0x02, 0x01][..]);
        reader.read_header(&mut buf).unwrap().unwrap();
        assert!(reader.read_value(&mut buf).is_none());
        assert_eq!(buf.len(), 1);
        buf.extend_from_slice(&[0x02, 0xFF]);
        assert_eq!(&reader.read_value(&mut buf).unwrap()[..], &[0x01, 0x02]);
        assert_eq!(&buf[..], &[0xFF]);
        assert!(!reader.in_progress());
    }

    #[test]
    fn test_reject_indefinite_length() {
        let mut reader = TlvReader::new();
        let mut buf = BytesMut::from(&[0x30, 0x80][..]);
        assert_eq!(reader.read_header(&mut buf), Err(DecodeError::IndefiniteLength));
    }

    #[test]
    fn test_reject_oversized_length_of_length() {
        let mut reader = TlvReader::new();
        let mut buf = BytesMut::from(&[0x30, 0x89][..]);
        assert_eq!(reader.read_header(&mut buf), Err(DecodeError::LengthTooLong(9)));
    }
}
