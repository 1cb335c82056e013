//! LDAP server transport
//!
//! This crate connects the codec to `tokio`:
//!
//! - [`codec`]: [`LdapCodec`], a `tokio_util` codec yielding decoded PDUs and
//!   accepting messages to encode.
//! - [`server`]: the per-connection loop ([`serve_connection`]) and the
//!   [`RequestHandler`] seam where the directory plugs in.
//! - [`listener`]: [`ServerListener`], one task per accepted TCP connection.

pub mod codec;
pub mod listener;
pub mod server;

pub use codec::LdapCodec;
pub use listener::ServerListener;
pub use server::{
    NOTICE_OF_DISCONNECTION_OID, RequestHandler, ServerConfig, notice_of_disconnection,
    serve_connection,
};
