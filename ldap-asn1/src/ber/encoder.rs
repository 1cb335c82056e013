//! BER encoder for ASN.1 structures
//!
//! Encoding is done in two passes. The first pass computes the length of
//! every nested element bottom-up with the helpers in this module
//! ([`tlv_len`], [`integer_len`], ...). The second pass writes tags, lengths
//! and values top-down into a [`BerEncoder`] whose capacity is exactly the
//! computed total.
//!
//! # Usage Example
//!
//! ```rust
//! use ldap_asn1::ber::encoder::{integer_len, tlv_len};
//! use ldap_asn1::{BerEncoder, BerTag};
//!
//! // SEQUENCE { INTEGER 5 }
//! let content = integer_len(5);
//! let total = tlv_len(BerTag::SEQUENCE, content);
//! let mut encoder = BerEncoder::with_capacity(total);
//! encoder.encode_header(BerTag::SEQUENCE, content).unwrap();
//! encoder.encode_integer(BerTag::INTEGER, 5).unwrap();
//! assert_eq!(&encoder.finish().unwrap()[..], &[0x30, 0x03, 0x02, 0x01, 0x05]);
//! ```

use crate::ber::types::{BerLength, BerTag};
use bytes::{BufMut, Bytes, BytesMut};
use ldap_core::{EncodeError, EncodeResult};

/// Total size of a TLV whose value is `content_len` bytes long
pub fn tlv_len(tag: BerTag, content_len: usize) -> usize {
    tag.encoded_len() + BerLength::size_of(content_len) + content_len
}

/// Number of bytes in the minimal two's complement encoding of `value`
pub fn integer_value_len(value: i64) -> usize {
    let mut len = 1;
    let mut rest = value;
    // Stop once the remaining high bits are pure sign extension of the
    // last emitted byte
    while !(-128..=127).contains(&rest) {
        rest >>= 8;
        len += 1;
    }
    len
}

/// Total size of a universal INTEGER TLV
pub fn integer_len(value: i64) -> usize {
    tlv_len(BerTag::INTEGER, integer_value_len(value))
}

/// Total size of a universal OCTET STRING TLV
pub fn octet_string_len(value: &[u8]) -> usize {
    tlv_len(BerTag::OCTET_STRING, value.len())
}

/// Total size of a universal BOOLEAN TLV
pub fn boolean_len() -> usize {
    tlv_len(BerTag::BOOLEAN, 1)
}

/// BER encoder writing into a buffer of fixed capacity
///
/// The capacity is the length computed by the first encoding pass. Any write
/// beyond it fails with [`EncodeError::BufferTooSmall`], and
/// [`BerEncoder::finish`] fails with [`EncodeError::LengthMismatch`] if the
/// buffer was not filled exactly. No partially encoded output is ever
/// returned.
pub struct BerEncoder {
    buffer: BytesMut,
    capacity: usize,
}

impl BerEncoder {
    /// Create a new BER encoder
    ///
    /// # Arguments
    /// * `capacity` - Exact number of bytes that will be written
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing was written yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of bytes that may still be written
    pub fn remaining(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    fn reserve(&self, count: usize) -> EncodeResult<()> {
        if count > self.remaining() {
            return Err(EncodeError::BufferTooSmall {
                needed: self.buffer.len() + count,
                available: self.capacity,
            });
        }
        Ok(())
    }

    /// Encode a tag and a length
    ///
    /// Used for constructed elements, whose content is written by the
    /// following calls.
    pub fn encode_header(&mut self, tag: BerTag, length: usize) -> EncodeResult<()> {
        let tag_bytes = tag.encode();
        let length_bytes = BerLength::new(length).encode();
        self.reserve(tag_bytes.len() + length_bytes.len())?;
        self.buffer.put_slice(&tag_bytes);
        self.buffer.put_slice(&length_bytes);
        Ok(())
    }

    /// Encode a TLV (Tag-Length-Value) triplet
    pub fn encode_tlv(&mut self, tag: BerTag, value: &[u8]) -> EncodeResult<()> {
        self.reserve(tlv_len(tag, value.len()))?;
        self.encode_header(tag, value.len())?;
        self.buffer.put_slice(value);
        Ok(())
    }

    /// Encode an INTEGER or ENUMERATED value under `tag`
    ///
    /// Uses the minimal two's complement representation: 127 is one byte
    /// (`0x7F`), 128 is two (`0x00 0x80`).
    pub fn encode_integer(&mut self, tag: BerTag, value: i64) -> EncodeResult<()> {
        let len = integer_value_len(value);
        let bytes = value.to_be_bytes();
        self.encode_tlv(tag, &bytes[8 - len..])
    }

    /// Encode a BOOLEAN under `tag` (TRUE as `0xFF`)
    pub fn encode_boolean(&mut self, tag: BerTag, value: bool) -> EncodeResult<()> {
        self.encode_tlv(tag, &[if value { 0xFF } else { 0x00 }])
    }

    /// Encode an OCTET STRING (or any primitive string type) under `tag`
    pub fn encode_octet_string(&mut self, tag: BerTag, value: &[u8]) -> EncodeResult<()> {
        self.encode_tlv(tag, value)
    }

    /// Encode a NULL-like empty primitive under `tag`
    pub fn encode_null(&mut self, tag: BerTag) -> EncodeResult<()> {
        self.encode_tlv(tag, &[])
    }

    /// Append bytes that are already BER encoded
    pub fn encode_raw(&mut self, bytes: &[u8]) -> EncodeResult<()> {
        self.reserve(bytes.len())?;
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Get the encoded bytes
    ///
    /// # Errors
    /// Returns [`EncodeError::LengthMismatch`] if fewer bytes were written
    /// than the capacity announced.
    pub fn finish(self) -> EncodeResult<Bytes> {
        if self.buffer.len() != self.capacity {
            return Err(EncodeError::LengthMismatch {
                planned: self.capacity,
                written: self.buffer.len(),
            });
        }
        Ok(self.buffer.freeze())
    }
}
