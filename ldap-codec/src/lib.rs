//! LDAPv3 message codec
//!
//! This crate turns BER bytes into [`LdapMessage`] values and back:
//!
//! - [`decoder`]: the streaming [`LdapDecoder`], driving the LDAP grammars
//!   over the table engine of `ldap-asn1`. Fragmented and back-to-back PDUs
//!   are handled; requests with invalid content come out as
//!   [`DecodedPdu::Rejected`] so the connection can answer and carry on.
//! - [`encoder`]: the two-pass [`LdapEncoder`]. Lengths are computed once
//!   and the output is written into a buffer of exactly the right size.
//! - [`controls`]: request and response controls, with a
//!   [`ControlRegistry`] mapping OIDs to value decoders.
//! - [`model`]: the tagged-union message model.
//! - [`filter`]: search filters.
//!
//! # Usage Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use ldap_codec::{ControlRegistry, DecodedPdu, DecoderConfig, LdapDecoder, ProtocolOp};
//! use std::sync::Arc;
//!
//! let mut decoder = LdapDecoder::new(Arc::new(ControlRegistry::with_defaults()), DecoderConfig::default());
//! let mut buf = BytesMut::from(&[0x30, 0x05, 0x02, 0x01, 0x02, 0x42, 0x00][..]);
//! match decoder.decode(&mut buf).unwrap() {
//!     Some(DecodedPdu::Message(message)) => assert_eq!(message.op, ProtocolOp::UnbindRequest),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

pub mod container;
pub mod controls;
pub mod decoder;
pub mod encoder;
pub mod filter;
pub mod grammar;
pub mod model;
pub mod tags;
pub mod validate;

pub use container::LdapContainer;
pub use controls::{Control, ControlDecoder, ControlRegistry, ControlValue};
pub use decoder::{DecodedPdu, InvalidRequest, LdapDecoder};
pub use encoder::{EncodePlan, LdapEncoder};
pub use filter::{Filter, MatchingRuleAssertion, Substring, SubstringFilter};
pub use grammar::LdapGrammar;
pub use ldap_core::{
    DecodeError, DecodeResult, DecoderConfig, EncodeError, EncodeResult, MessageId, ResultCode,
};
pub use model::{
    AbandonRequest, AddRequest, AttributeValueAssertion, Authentication, BindRequest,
    BindResponse, Change, CompareRequest, DelRequest, DerefAliases, ExtendedRequest,
    ExtendedResponse, IntermediateResponse, LdapMessage, ModifyDnRequest, ModifyOperation,
    ModifyRequest, OperationKind, OperationResult, PartialAttribute, ProtocolOp, SearchRequest,
    SearchResultEntry, SearchResultReference, SearchScope,
};
