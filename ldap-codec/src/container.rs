//! LDAP decode container
//!
//! Holds the engine bookkeeping for one connection together with the
//! message being assembled. Grammar actions are the only writers; once the
//! engine reports the PDU complete, [`LdapContainer::take_pdu`] hands the
//! message out and resets the container for the next PDU.

use crate::controls::{Control, ControlRegistry};
use crate::decoder::{DecodedPdu, InvalidRequest};
use crate::grammar::LdapGrammar;
use crate::model::{
    AddRequest, BindRequest, BindResponse, CompareRequest, ExtendedRequest, ExtendedResponse,
    IntermediateResponse, LdapMessage, ModifyDnRequest, ModifyRequest, OperationResult,
    ProtocolOp, SearchRequest, SearchResultEntry, SearchResultReference,
};
use ldap_asn1::{Asn1Container, DecoderState, Grammar};
use ldap_core::{DecodeError, DecodeResult, DecoderConfig, MessageId, ResultCode};
use std::sync::Arc;

fn wrong_operation(expected: &'static str) -> DecodeError {
    DecodeError::invalid("protocolOp", format!("{} is not the operation being decoded", expected))
}

macro_rules! op_accessors {
    ($($name:ident => $variant:ident($ty:ty)),* $(,)?) => {
        $(
            pub(crate) fn $name(&mut self) -> DecodeResult<&mut $ty> {
                match self.op.as_mut() {
                    Some(ProtocolOp::$variant(op)) => Ok(op),
                    _ => Err(wrong_operation(stringify!($variant))),
                }
            }
        )*
    };
}

/// Per-connection decode context
#[derive(Debug)]
pub struct LdapContainer {
    state: DecoderState<LdapGrammar>,
    registry: Arc<ControlRegistry>,
    config: DecoderConfig,
    message_id: Option<MessageId>,
    op: Option<ProtocolOp>,
    controls: Vec<Control>,
    rejection: Option<(ResultCode, String)>,
}

impl LdapContainer {
    /// Create a container positioned before the first PDU
    pub fn new(registry: Arc<ControlRegistry>, config: DecoderConfig) -> Self {
        Self {
            state: DecoderState::new(LdapGrammar::Message, config.max_pdu_size),
            registry,
            config,
            message_id: None,
            op: None,
            controls: Vec::new(),
            rejection: None,
        }
    }

    /// Discard any partial PDU
    pub fn reset(&mut self) {
        self.state.reset();
        self.message_id = None;
        self.op = None;
        self.controls.clear();
        self.rejection = None;
    }

    /// Get the message ID, once decoded
    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    /// Get the operation decoded so far
    pub fn op(&self) -> Option<&ProtocolOp> {
        self.op.as_ref()
    }

    /// Get the controls decoded so far
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// Result code and diagnostic of the first recoverable failure, if any
    pub fn rejection(&self) -> Option<(ResultCode, &str)> {
        self.rejection
            .as_ref()
            .map(|(code, diagnostic)| (*code, diagnostic.as_str()))
    }

    pub(crate) fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub(crate) fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    pub(crate) fn set_message_id(&mut self, message_id: MessageId) {
        self.message_id = Some(message_id);
    }

    /// Allocate the operation once its tag has been seen
    pub(crate) fn start_op(&mut self, op: ProtocolOp) {
        self.op = Some(op);
    }

    pub(crate) fn controls_mut(&mut self) -> &mut Vec<Control> {
        &mut self.controls
    }

    /// Get the `LDAPResult` of the response being decoded
    pub(crate) fn result(&mut self) -> DecodeResult<&mut OperationResult> {
        self.op
            .as_mut()
            .and_then(ProtocolOp::result_mut)
            .ok_or_else(|| wrong_operation("LDAPResult"))
    }

    op_accessors! {
        bind_request => BindRequest(BindRequest),
        bind_response => BindResponse(BindResponse),
        search_request => SearchRequest(SearchRequest),
        search_result_entry => SearchResultEntry(SearchResultEntry),
        search_result_reference => SearchResultReference(SearchResultReference),
        modify_request => ModifyRequest(ModifyRequest),
        add_request => AddRequest(AddRequest),
        modify_dn_request => ModifyDnRequest(ModifyDnRequest),
        compare_request => CompareRequest(CompareRequest),
        extended_request => ExtendedRequest(ExtendedRequest),
        extended_response => ExtendedResponse(ExtendedResponse),
        intermediate_response => IntermediateResponse(IntermediateResponse),
    }

    /// Record a recoverable failure of the request being decoded
    ///
    /// Decoding continues to the end of the PDU. Only the first failure is
    /// kept.
    pub(crate) fn reject(&mut self, result_code: ResultCode, diagnostic: impl Into<String>) {
        let diagnostic = diagnostic.into();
        log::warn!(
            "Rejecting message {}: {} ({})",
            self.message_id.map(|id| id.value() as i64).unwrap_or(-1),
            diagnostic,
            result_code
        );
        if self.rejection.is_none() {
            self.rejection = Some((result_code, diagnostic));
        }
    }

    /// Hand out the completed PDU and prepare for the next one
    ///
    /// # Errors
    /// Returns error if the grammar completed without a message ID or an
    /// operation, which well-formed grammars never allow.
    pub(crate) fn take_pdu(&mut self) -> DecodeResult<DecodedPdu> {
        let message_id = self.message_id.take();
        let op = self.op.take();
        let controls = std::mem::take(&mut self.controls);
        let rejection = self.rejection.take();
        self.state.reset();

        let (Some(message_id), Some(op)) = (message_id, op) else {
            return Err(DecodeError::invalid(
                "LDAPMessage",
                "PDU ended without a message ID or operation",
            ));
        };
        Ok(match rejection {
            Some((result_code, diagnostic)) => DecodedPdu::Rejected(InvalidRequest {
                message_id,
                operation: op.kind(),
                result_code,
                diagnostic,
            }),
            None => DecodedPdu::Message(LdapMessage {
                message_id,
                op,
                controls,
            }),
        })
    }
}

impl Asn1Container for LdapContainer {
    type GrammarId = LdapGrammar;

    fn grammar(id: LdapGrammar) -> &'static Grammar<Self> {
        id.table()
    }

    fn decoder_state(&self) -> &DecoderState<LdapGrammar> {
        &self.state
    }

    fn decoder_state_mut(&mut self) -> &mut DecoderState<LdapGrammar> {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> LdapContainer {
        LdapContainer::new(Arc::new(ControlRegistry::new()), DecoderConfig::default())
    }

    #[test]
    fn test_first_rejection_wins() {
        let mut container = container();
        container.reject(ResultCode::InvalidDnSyntax, "bad DN");
        container.reject(ResultCode::ProtocolError, "bad scope");
        assert_eq!(
            container.rejection(),
            Some((ResultCode::InvalidDnSyntax, "bad DN"))
        );
    }

    #[test]
    fn test_accessor_checks_variant() {
        let mut container = container();
        container.start_op(ProtocolOp::CompareRequest(CompareRequest::default()));
        assert!(container.compare_request().is_ok());
        assert!(container.bind_request().is_err());
        assert!(container.result().is_err());
    }

    #[test]
    fn test_take_pdu_resets() {
        let mut container = container();
        container.set_message_id(MessageId::new(4).unwrap());
        container.start_op(ProtocolOp::UnbindRequest);
        let pdu = container.take_pdu().unwrap();
        assert_eq!(
            pdu,
            DecodedPdu::Message(LdapMessage::new(
                MessageId::new(4).unwrap(),
                ProtocolOp::UnbindRequest
            ))
        );
        assert!(container.message_id().is_none());
        assert!(container.op().is_none());
        assert!(container.take_pdu().is_err());
    }

    #[test]
    fn test_take_rejected_pdu() {
        let mut container = container();
        container.set_message_id(MessageId::new(9).unwrap());
        container.start_op(ProtocolOp::AddRequest(AddRequest::default()));
        container.reject(ResultCode::InvalidAttributeSyntax, "bad type");
        match container.take_pdu().unwrap() {
            DecodedPdu::Rejected(invalid) => {
                assert_eq!(invalid.message_id.value(), 9);
                assert_eq!(invalid.result_code, ResultCode::InvalidAttributeSyntax);
            }
            other => panic!("unexpected pdu: {:?}", other),
        }
        assert!(container.rejection().is_none());
    }
}
