//! Streaming LDAP message decoder
//!
//! [`LdapDecoder`] owns one [`LdapContainer`] and feeds it whatever bytes
//! the transport delivered. A PDU may arrive in any number of fragments and
//! several PDUs may share one buffer; bytes past the end of the current PDU
//! are left in the buffer for the next call.

use crate::container::LdapContainer;
use crate::controls::ControlRegistry;
use crate::model::{
    BindResponse, ExtendedResponse, LdapMessage, OperationKind, OperationResult, ProtocolOp,
};
use bytes::BytesMut;
use ldap_asn1::{Asn1Container, Asn1Decoder};
use ldap_core::{DecodeResult, DecoderConfig, MessageId, ResultCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One decoded PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPdu {
    /// A well-formed message
    Message(LdapMessage),
    /// A structurally sound request whose content is invalid
    Rejected(InvalidRequest),
}

/// A request that decoded structurally but must be refused
///
/// The PDU was consumed completely, so the connection stays usable. The
/// server answers with [`InvalidRequest::to_response`] where the operation
/// has a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRequest {
    pub message_id: MessageId,
    pub operation: OperationKind,
    pub result_code: ResultCode,
    pub diagnostic: String,
}

impl InvalidRequest {
    /// Build the error response for the refused request
    ///
    /// # Returns
    /// `None` for operations without a response (unbind, abandon) and for
    /// responses received by mistake.
    pub fn to_response(&self) -> Option<LdapMessage> {
        let result = OperationResult::new(self.result_code, self.diagnostic.clone());
        let op = match self.operation {
            OperationKind::BindRequest => ProtocolOp::BindResponse(BindResponse {
                result,
                server_sasl_creds: None,
            }),
            OperationKind::SearchRequest => ProtocolOp::SearchResultDone(result),
            OperationKind::ModifyRequest => ProtocolOp::ModifyResponse(result),
            OperationKind::AddRequest => ProtocolOp::AddResponse(result),
            OperationKind::DelRequest => ProtocolOp::DelResponse(result),
            OperationKind::ModifyDnRequest => ProtocolOp::ModifyDnResponse(result),
            OperationKind::CompareRequest => ProtocolOp::CompareResponse(result),
            OperationKind::ExtendedRequest => ProtocolOp::ExtendedResponse(ExtendedResponse {
                result,
                name: None,
                value: None,
            }),
            _ => return None,
        };
        Some(LdapMessage::new(self.message_id, op))
    }
}

/// Per-connection LDAP decoder
#[derive(Debug)]
pub struct LdapDecoder {
    container: LdapContainer,
}

impl LdapDecoder {
    /// Create a decoder with its own container
    ///
    /// # Arguments
    /// * `registry` - Control decoders, usually shared by all connections
    /// * `config` - Limits and validation switches
    pub fn new(registry: Arc<ControlRegistry>, config: DecoderConfig) -> Self {
        Self {
            container: LdapContainer::new(registry, config),
        }
    }

    /// Decode from the front of `buf`
    ///
    /// # Returns
    /// `Ok(Some(pdu))` once a PDU is complete, `Ok(None)` if `buf` ran dry
    /// before that. Consumed bytes are removed from `buf`.
    ///
    /// # Errors
    /// Any error is fatal: the byte stream can no longer be framed, and every
    /// later call fails with [`ldap_core::DecodeError::Poisoned`] until
    /// [`LdapDecoder::reset`].
    pub fn decode(&mut self, buf: &mut BytesMut) -> DecodeResult<Option<DecodedPdu>> {
        match Asn1Decoder::decode(&mut self.container, buf) {
            Ok(true) => {
                let pdu = self.container.take_pdu()?;
                match &pdu {
                    DecodedPdu::Message(message) => log::debug!(
                        "Decoded {} (message {}, {} controls)",
                        message.op.kind().name(),
                        message.message_id,
                        message.controls.len()
                    ),
                    DecodedPdu::Rejected(invalid) => log::debug!(
                        "Decoded invalid {} (message {}): {}",
                        invalid.operation.name(),
                        invalid.message_id,
                        invalid.result_code
                    ),
                }
                Ok(Some(pdu))
            }
            Ok(false) => Ok(None),
            Err(e) => {
                log::error!("LDAP decode error: {}", e);
                Err(e)
            }
        }
    }

    /// Discard any partial PDU and clear a failure
    pub fn reset(&mut self) {
        self.container.reset();
    }

    /// Check that no PDU is partially decoded
    pub fn is_idle(&self) -> bool {
        self.container.decoder_state().is_idle()
    }

    /// Get the underlying container
    pub fn container(&self) -> &LdapContainer {
        &self.container
    }
}
