//! Error types for LDAP codec operations
//!
//! Three failure classes exist on the wire boundary:
//!
//! - [`DecodeError`]: the byte stream is malformed. The decode state of the
//!   connection is lost and the connection must be closed.
//! - Operation-recoverable failures (an invalid DN inside an otherwise
//!   well-formed request) are *not* errors here; the codec reports them as a
//!   rejected request so that a response can still be sent.
//! - [`EncodeError`]: the length computation and the serialization pass
//!   disagree. This is always a programming error.

use crate::result_code::ResultCode;
use thiserror::Error;

/// Transport-fatal decoding error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected tag {tag} in state {state} of grammar {grammar}")]
    UnexpectedTag {
        grammar: &'static str,
        state: &'static str,
        tag: String,
    },

    #[error("TLV length {length} exceeds the {remaining} bytes left in the enclosing element")]
    LengthExceedsScope { length: usize, remaining: usize },

    #[error("Indefinite length encoding is not allowed")]
    IndefiniteLength,

    #[error("Length encoding too large: {0} bytes (max 4)")]
    LengthTooLong(usize),

    #[error("Tag number too large or invalid encoding")]
    TagTooLarge,

    #[error("Envelope has zero length")]
    EmptyEnvelope,

    #[error("PDU length {length} exceeds the configured maximum of {max} bytes")]
    PduTooLarge { length: usize, max: usize },

    #[error("PDU ended in state {state} of grammar {grammar}, which is not a legal end")]
    UnexpectedEnd {
        grammar: &'static str,
        state: &'static str,
    },

    #[error("Message ID {0} is out of range (0..2147483647)")]
    MessageIdOutOfRange(i64),

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("Invalid search filter: {0}")]
    InvalidFilter(String),

    #[error("Decoder is unusable after a previous fatal error")]
    Poisoned,
}

impl DecodeError {
    /// Shorthand for [`DecodeError::InvalidValue`]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// Result code a Notice of Disconnection for this error would carry
    pub fn result_code(&self) -> ResultCode {
        match self {
            DecodeError::PduTooLarge { .. } => ResultCode::AdminLimitExceeded,
            DecodeError::Poisoned => ResultCode::Unavailable,
            _ => ResultCode::ProtocolError,
        }
    }
}

/// Encoder-fatal error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Buffer too small: need {needed} bytes, {available} available")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("Encoded {written} bytes but {planned} were planned")]
    LengthMismatch { planned: usize, written: usize },

    #[error("Value cannot be encoded: {0}")]
    InvalidValue(String),
}

/// Top-level error for connection handling
#[derive(Error, Debug)]
pub enum LdapError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type alias for decoding
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type alias for encoding
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Result type alias for connection handling
pub type LdapResult<T> = Result<T, LdapError>;
