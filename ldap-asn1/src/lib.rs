//! ASN.1 BER processing for the LDAP codec
//!
//! This crate provides the pieces of the codec that know nothing about LDAP
//! itself:
//!
//! - [`ber`]: tag and length types, the resumable [`TlvReader`], the slice
//!   based [`BerDecoder`] for nested values and the bounded [`BerEncoder`].
//! - [`grammar`]: the table-driven state machine. A [`Grammar`] maps
//!   `(state, tag)` pairs to transitions; [`Asn1Decoder`] drives one or more
//!   grammars over a stream of TLVs on behalf of an [`Asn1Container`].

pub mod ber;
pub mod grammar;

pub use ldap_core::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use ber::{BerDecoder, BerEncoder, BerLength, BerTag, BerTagClass, Tlv, TlvHeader, TlvReader};
pub use grammar::{
    Action, Advance, Asn1Container, Asn1Decoder, DecodePhase, DecoderState, Grammar, GrammarFrame, Next,
    StateId, Transition,
};
