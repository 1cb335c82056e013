//! LDAPv3 BER codec
//!
//! This library decodes LDAP protocol messages from a byte stream and
//! encodes responses back into BER.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `ldap-core`: Error taxonomy, result codes, message IDs and decoder configuration
//! - `ldap-asn1`: BER primitives and the table-driven grammar engine
//! - `ldap-codec`: Message model, LDAP grammars, control registry and encoder
//! - `ldap-server`: Tokio codec, connection loop and TCP listener
//!
//! # Usage
//!
//! ```no_run
//! use ldap::codec::{ControlRegistry, LdapDecoder};
//! use ldap::DecoderConfig;
//! use std::sync::Arc;
//!
//! let decoder = LdapDecoder::new(Arc::new(ControlRegistry::with_defaults()), DecoderConfig::default());
//! ```

// Re-export core types
pub use ldap_core::{
    DecodeError, DecodeResult, DecoderConfig, EncodeError, EncodeResult, LdapError, LdapResult,
    MessageId, ResultCode,
};

// Re-export BER and grammar engine
pub mod asn1 {
    pub use ldap_asn1::*;
}

// Re-export message model and codec
pub mod codec {
    pub use ldap_codec::*;
}

// Re-export server API
pub mod server {
    pub use ldap_server::*;
}
