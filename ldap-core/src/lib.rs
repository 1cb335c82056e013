//! Core types and utilities for the LDAP protocol codec
//!
//! This crate provides the error taxonomy, LDAP result codes, message
//! identifiers and decoder configuration shared by every other crate of
//! the workspace.

pub mod config;
pub mod error;
pub mod message_id;
pub mod result_code;

pub use config::DecoderConfig;
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult, LdapError, LdapResult};
pub use message_id::MessageId;
pub use result_code::ResultCode;
