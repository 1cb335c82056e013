//! BER encoding types (Tag, Length)

use ldap_core::{DecodeError, DecodeResult};
use std::fmt;

/// BER Tag Class
///
/// ASN.1 defines four tag classes:
/// - **Universal**: Standard ASN.1 types (INTEGER, OCTET STRING, etc.)
/// - **Application**: Application-specific types (LDAP protocol operations)
/// - **Context-specific**: Context-dependent types (used in SEQUENCE/CHOICE)
/// - **Private**: Private/implementation-specific types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerTagClass {
    /// Universal class (00)
    Universal = 0,
    /// Application class (01)
    Application = 1,
    /// Context-specific class (10)
    ContextSpecific = 2,
    /// Private class (11)
    Private = 3,
}

impl BerTagClass {
    /// Get tag class from bits (bits 8-7 of tag byte)
    pub fn from_bits(bits: u8) -> Self {
        match (bits >> 6) & 0x03 {
            0 => BerTagClass::Universal,
            1 => BerTagClass::Application,
            2 => BerTagClass::ContextSpecific,
            _ => BerTagClass::Private,
        }
    }

    /// Convert tag class to bits (for encoding)
    pub fn to_bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// BER Tag
///
/// A BER tag identifies the type of an ASN.1 value. It consists of:
/// - **Class**: Universal, Application, Context-specific, or Private
/// - **Constructed/Primitive**: Whether the value contains nested TLVs
/// - **Tag Number**: 0-30 in the first byte, larger numbers in base-128
///   continuation bytes
///
/// Two tags only compare equal when class, form and number all match, so a
/// primitive encoding where a grammar expects a constructed one (or the
/// reverse) never finds a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BerTag {
    /// Tag class
    class: BerTagClass,
    /// Whether this is a constructed type
    constructed: bool,
    /// Tag number
    number: u32,
}

impl BerTag {
    /// BOOLEAN (universal 1)
    pub const BOOLEAN: BerTag = BerTag::universal(false, 1);
    /// INTEGER (universal 2)
    pub const INTEGER: BerTag = BerTag::universal(false, 2);
    /// OCTET STRING (universal 4)
    pub const OCTET_STRING: BerTag = BerTag::universal(false, 4);
    /// NULL (universal 5)
    pub const NULL: BerTag = BerTag::universal(false, 5);
    /// ENUMERATED (universal 10)
    pub const ENUMERATED: BerTag = BerTag::universal(false, 10);
    /// SEQUENCE / SEQUENCE OF (universal 16, constructed)
    pub const SEQUENCE: BerTag = BerTag::universal(true, 16);
    /// SET / SET OF (universal 17, constructed)
    pub const SET: BerTag = BerTag::universal(true, 17);

    /// Create a new BER tag
    ///
    /// # Arguments
    /// * `class` - Tag class
    /// * `constructed` - Whether this is a constructed type
    /// * `number` - Tag number
    pub const fn new(class: BerTagClass, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    /// Create a Universal class tag
    pub const fn universal(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::Universal, constructed, number)
    }

    /// Create an Application class tag
    pub const fn application(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::Application, constructed, number)
    }

    /// Create a Context-specific class tag
    pub const fn context_specific(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::ContextSpecific, constructed, number)
    }

    /// Create a Private class tag
    pub const fn private(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::Private, constructed, number)
    }

    /// Build a tag from a single identifier octet (tag numbers 0-30 only)
    pub const fn from_byte(byte: u8) -> Self {
        let class = match (byte >> 6) & 0x03 {
            0 => BerTagClass::Universal,
            1 => BerTagClass::Application,
            2 => BerTagClass::ContextSpecific,
            _ => BerTagClass::Private,
        };
        Self::new(class, byte & 0x20 != 0, (byte & 0x1F) as u32)
    }

    /// Get tag class
    pub fn class(&self) -> BerTagClass {
        self.class
    }

    /// Check if tag is constructed
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Get tag number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Number of octets [`BerTag::encode`] produces
    pub fn encoded_len(&self) -> usize {
        if self.number <= 30 {
            1
        } else {
            let mut octets = 1;
            let mut remaining = self.number >> 7;
            while remaining > 0 {
                octets += 1;
                remaining >>= 7;
            }
            1 + octets
        }
    }

    /// Encode tag to bytes
    ///
    /// Tag numbers up to 30 use the single byte form, larger numbers the
    /// extended form with base-128 continuation bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.encoded_len());

        let class_bits = self.class.to_bits();
        let constructed_bit = if self.constructed { 0x20 } else { 0x00 };

        if self.number <= 30 {
            result.push(class_bits | constructed_bit | (self.number as u8 & 0x1F));
        } else {
            result.push(class_bits | constructed_bit | 0x1F);

            let mut remaining = self.number;
            let mut bytes = Vec::new();
            while remaining > 0 {
                bytes.push((remaining & 0x7F) as u8);
                remaining >>= 7;
            }

            // Continuation bit on all but the last byte
            for (i, &byte) in bytes.iter().rev().enumerate() {
                if i < bytes.len() - 1 {
                    result.push(byte | 0x80);
                } else {
                    result.push(byte);
                }
            }
        }

        result
    }

    /// Decode tag from a fully buffered slice
    ///
    /// # Returns
    /// Returns `Ok((BerTag, bytes_consumed))` if successful
    ///
    /// # Errors
    /// Returns error if the buffer is too short or the extended tag number
    /// does not fit in 28 bits.
    pub fn decode(data: &[u8]) -> DecodeResult<(Self, usize)> {
        let Some(&first_byte) = data.first() else {
            return Err(DecodeError::invalid("tag", "empty buffer"));
        };

        let class = BerTagClass::from_bits(first_byte);
        let constructed = (first_byte & 0x20) != 0;
        let tag_bits = first_byte & 0x1F;

        if tag_bits < 31 {
            return Ok((Self::new(class, constructed, tag_bits as u32), 1));
        }

        let mut tag_number = 0u32;
        let mut pos = 1;
        let mut has_more = true;

        while has_more && pos < data.len() {
            let byte = data[pos];
            has_more = (byte & 0x80) != 0;
            tag_number = (tag_number << 7) | ((byte & 0x7F) as u32);
            pos += 1;

            if pos > 5 {
                return Err(DecodeError::TagTooLarge);
            }
        }

        if has_more {
            return Err(DecodeError::invalid("tag", "incomplete extended tag encoding"));
        }

        Ok((Self::new(class, constructed, tag_number), pos))
    }
}

impl fmt::Display for BerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.encode() {
            write!(f, "{:02X}", byte)?;
        }
        let class = match self.class {
            BerTagClass::Universal => "UNIVERSAL",
            BerTagClass::Application => "APPLICATION",
            BerTagClass::ContextSpecific => "CONTEXT",
            BerTagClass::Private => "PRIVATE",
        };
        let form = if self.constructed { "constructed" } else { "primitive" };
        write!(f, " [{} {}, {}]", class, self.number, form)
    }
}

/// BER Length encoding
///
/// - **Short form**: lengths 0-127 (1 byte)
/// - **Long form**: lengths > 127, a length-of-length byte followed by the
///   big-endian length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerLength {
    /// Short form: length 0-127
    Short(u8),
    /// Long form: length > 127, encoded with length-of-length
    Long(usize),
}

/// Longest accepted length-of-length (32-bit lengths)
pub const MAX_LENGTH_OCTETS: usize = 4;

impl BerLength {
    /// Create a new BER length
    ///
    /// Automatically chooses short or long form based on the length value.
    pub fn new(length: usize) -> Self {
        if length < 128 {
            BerLength::Short(length as u8)
        } else {
            BerLength::Long(length)
        }
    }

    /// Get the length value
    pub fn value(&self) -> usize {
        match self {
            BerLength::Short(l) => *l as usize,
            BerLength::Long(l) => *l,
        }
    }

    /// Number of octets needed to encode `length` in minimal form
    pub fn size_of(length: usize) -> usize {
        if length < 128 {
            1
        } else {
            let mut num_bytes = 0;
            let mut temp = length;
            while temp > 0 {
                num_bytes += 1;
                temp >>= 8;
            }
            1 + num_bytes
        }
    }

    /// Encode length to bytes
    pub fn encode(&self) -> Vec<u8> {
        match self {
            BerLength::Short(length) => vec![*length],
            BerLength::Long(length) => {
                let num_bytes = Self::size_of(*length) - 1;
                let mut result = Vec::with_capacity(num_bytes + 1);
                result.push(0x80 | (num_bytes as u8));
                for i in (0..num_bytes).rev() {
                    result.push(((*length >> (i * 8)) & 0xFF) as u8);
                }
                result
            }
        }
    }

    /// Decode length from a fully buffered slice
    ///
    /// # Returns
    /// Returns `Ok((BerLength, bytes_consumed))` if successful
    ///
    /// # Errors
    /// Returns error if:
    /// - Buffer is too short
    /// - The indefinite form is used
    /// - More than 4 length bytes are announced
    pub fn decode(data: &[u8]) -> DecodeResult<(Self, usize)> {
        let Some(&first_byte) = data.first() else {
            return Err(DecodeError::invalid("length", "empty buffer"));
        };

        if (first_byte & 0x80) == 0 {
            return Ok((BerLength::Short(first_byte & 0x7F), 1));
        }

        let num_bytes = (first_byte & 0x7F) as usize;
        if num_bytes == 0 {
            return Err(DecodeError::IndefiniteLength);
        }
        if num_bytes > MAX_LENGTH_OCTETS {
            return Err(DecodeError::LengthTooLong(num_bytes));
        }
        if data.len() < 1 + num_bytes {
            return Err(DecodeError::invalid(
                "length",
                format!(
                    "buffer too short for long form length: need {} bytes, got {}",
                    1 + num_bytes,
                    data.len()
                ),
            ));
        }

        let length = data[1..=num_bytes]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);

        Ok((BerLength::Long(length), 1 + num_bytes))
    }
}
