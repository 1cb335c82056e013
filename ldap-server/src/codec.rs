//! `tokio_util` codec over the LDAP decoder and encoder

use bytes::BytesMut;
use ldap_codec::{ControlRegistry, DecodedPdu, LdapDecoder, LdapEncoder, LdapMessage};
use ldap_core::{DecoderConfig, LdapError};
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};

/// Frames a byte stream into LDAP PDUs
///
/// Decoding is incremental: a PDU split across reads is resumed where the
/// previous read stopped instead of being re-parsed from its first byte.
#[derive(Debug)]
pub struct LdapCodec {
    decoder: LdapDecoder,
}

impl LdapCodec {
    /// Create a codec for one connection
    pub fn new(registry: Arc<ControlRegistry>, config: DecoderConfig) -> Self {
        Self {
            decoder: LdapDecoder::new(registry, config),
        }
    }
}

impl Decoder for LdapCodec {
    type Item = DecodedPdu;
    type Error = LdapError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let available = src.len();
        match self.decoder.decode(src)? {
            Some(pdu) => Ok(Some(pdu)),
            None => {
                log::trace!("Incomplete PDU, consumed {} bytes", available - src.len());
                Ok(None)
            }
        }
    }
}

impl Encoder<LdapMessage> for LdapCodec {
    type Error = LdapError;

    fn encode(&mut self, item: LdapMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let plan = LdapEncoder::plan(&item)?;
        dst.reserve(plan.len());
        plan.encode_into(dst)?;
        Ok(())
    }
}
