//! BER (Basic Encoding Rules) encoder and decoder for ASN.1
//!
//! Each ASN.1 value is encoded as a TLV (Tag-Length-Value) triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! ## Tag Encoding
//!
//! ```text
//! Bits: 8 7 6 5 4 3 2 1
//!       C C P T T T T T
//! ```
//! - CC = Class (00=Universal, 01=Application, 10=Context, 11=Private)
//! - P = Primitive (0) or Constructed (1)
//! - TTTTT = Tag number (0-30), or 11111 indicates extended tag
//!
//! ## Length Encoding
//!
//! - **Short form** (1 byte): lengths 0-127, bit 8 clear
//! - **Long form** (2-5 bytes): first byte `0x80 | n`, then `n` big-endian
//!   length bytes. LDAP forbids the indefinite form (`0x80`).
//!
//! # Modules
//!
//! - [`reader`]: incremental TLV header/value reader over a `BytesMut`,
//!   able to stop at any byte boundary and resume later.
//! - [`decoder`]: slice decoder for values that are already fully buffered
//!   (control values, search filters) and primitive value parsers.
//! - [`encoder`]: writer bounded by a precomputed length, plus the length
//!   arithmetic used by the first encoding pass.

pub mod decoder;
pub mod encoder;
pub mod reader;
pub mod types;

pub use decoder::BerDecoder;
pub use encoder::BerEncoder;
pub use reader::{Tlv, TlvHeader, TlvReader};
pub use types::{BerLength, BerTag, BerTagClass};
