//! LDAP message model
//!
//! One [`LdapMessage`] is one PDU: a message ID, exactly one protocol
//! operation and an optional list of controls.
//!
//! ```text
//! LDAPMessage ::= SEQUENCE {
//!      messageID       MessageID,
//!      protocolOp      CHOICE { bindRequest, bindResponse, ... },
//!      controls       [0] Controls OPTIONAL }
//! ```

pub mod request;
pub mod response;

pub use request::{
    AbandonRequest, AddRequest, AttributeValueAssertion, Authentication, BindRequest, Change,
    CompareRequest, DelRequest, DerefAliases, ExtendedRequest, ModifyDnRequest, ModifyOperation,
    ModifyRequest, PartialAttribute, SearchRequest, SearchScope,
};
pub use response::{
    BindResponse, ExtendedResponse, IntermediateResponse, OperationResult, SearchResultEntry,
    SearchResultReference,
};

use crate::controls::Control;
use crate::tags;
use ldap_asn1::BerTag;
use ldap_core::MessageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One LDAP PDU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapMessage {
    pub message_id: MessageId,
    pub op: ProtocolOp,
    /// Empty when the PDU carries no `controls` element
    pub controls: Vec<Control>,
}

impl LdapMessage {
    /// Create a message without controls
    pub fn new(message_id: MessageId, op: ProtocolOp) -> Self {
        Self {
            message_id,
            op,
            controls: Vec::new(),
        }
    }

    /// Add a control
    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    /// Look up a control by OID
    pub fn control(&self, oid: &str) -> Option<&Control> {
        self.controls.iter().find(|control| control.oid == oid)
    }
}

/// `protocolOp` CHOICE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolOp {
    BindRequest(BindRequest),
    BindResponse(BindResponse),
    UnbindRequest,
    SearchRequest(SearchRequest),
    SearchResultEntry(SearchResultEntry),
    SearchResultDone(OperationResult),
    SearchResultReference(SearchResultReference),
    ModifyRequest(ModifyRequest),
    ModifyResponse(OperationResult),
    AddRequest(AddRequest),
    AddResponse(OperationResult),
    DelRequest(DelRequest),
    DelResponse(OperationResult),
    ModifyDnRequest(ModifyDnRequest),
    ModifyDnResponse(OperationResult),
    CompareRequest(CompareRequest),
    CompareResponse(OperationResult),
    AbandonRequest(AbandonRequest),
    ExtendedRequest(ExtendedRequest),
    ExtendedResponse(ExtendedResponse),
    IntermediateResponse(IntermediateResponse),
}

impl ProtocolOp {
    /// Get the operation kind
    pub fn kind(&self) -> OperationKind {
        match self {
            ProtocolOp::BindRequest(_) => OperationKind::BindRequest,
            ProtocolOp::BindResponse(_) => OperationKind::BindResponse,
            ProtocolOp::UnbindRequest => OperationKind::UnbindRequest,
            ProtocolOp::SearchRequest(_) => OperationKind::SearchRequest,
            ProtocolOp::SearchResultEntry(_) => OperationKind::SearchResultEntry,
            ProtocolOp::SearchResultDone(_) => OperationKind::SearchResultDone,
            ProtocolOp::SearchResultReference(_) => OperationKind::SearchResultReference,
            ProtocolOp::ModifyRequest(_) => OperationKind::ModifyRequest,
            ProtocolOp::ModifyResponse(_) => OperationKind::ModifyResponse,
            ProtocolOp::AddRequest(_) => OperationKind::AddRequest,
            ProtocolOp::AddResponse(_) => OperationKind::AddResponse,
            ProtocolOp::DelRequest(_) => OperationKind::DelRequest,
            ProtocolOp::DelResponse(_) => OperationKind::DelResponse,
            ProtocolOp::ModifyDnRequest(_) => OperationKind::ModifyDnRequest,
            ProtocolOp::ModifyDnResponse(_) => OperationKind::ModifyDnResponse,
            ProtocolOp::CompareRequest(_) => OperationKind::CompareRequest,
            ProtocolOp::CompareResponse(_) => OperationKind::CompareResponse,
            ProtocolOp::AbandonRequest(_) => OperationKind::AbandonRequest,
            ProtocolOp::ExtendedRequest(_) => OperationKind::ExtendedRequest,
            ProtocolOp::ExtendedResponse(_) => OperationKind::ExtendedResponse,
            ProtocolOp::IntermediateResponse(_) => OperationKind::IntermediateResponse,
        }
    }

    /// Get the `LDAPResult` of a response, if this is one that carries it
    pub fn result(&self) -> Option<&OperationResult> {
        match self {
            ProtocolOp::BindResponse(response) => Some(&response.result),
            ProtocolOp::ExtendedResponse(response) => Some(&response.result),
            ProtocolOp::SearchResultDone(result)
            | ProtocolOp::ModifyResponse(result)
            | ProtocolOp::AddResponse(result)
            | ProtocolOp::DelResponse(result)
            | ProtocolOp::ModifyDnResponse(result)
            | ProtocolOp::CompareResponse(result) => Some(result),
            _ => None,
        }
    }

    /// Get the `LDAPResult` of a response mutably
    pub fn result_mut(&mut self) -> Option<&mut OperationResult> {
        match self {
            ProtocolOp::BindResponse(response) => Some(&mut response.result),
            ProtocolOp::ExtendedResponse(response) => Some(&mut response.result),
            ProtocolOp::SearchResultDone(result)
            | ProtocolOp::ModifyResponse(result)
            | ProtocolOp::AddResponse(result)
            | ProtocolOp::DelResponse(result)
            | ProtocolOp::ModifyDnResponse(result)
            | ProtocolOp::CompareResponse(result) => Some(result),
            _ => None,
        }
    }
}

/// Discriminant of [`ProtocolOp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    BindRequest,
    BindResponse,
    UnbindRequest,
    SearchRequest,
    SearchResultEntry,
    SearchResultDone,
    SearchResultReference,
    ModifyRequest,
    ModifyResponse,
    AddRequest,
    AddResponse,
    DelRequest,
    DelResponse,
    ModifyDnRequest,
    ModifyDnResponse,
    CompareRequest,
    CompareResponse,
    AbandonRequest,
    ExtendedRequest,
    ExtendedResponse,
    IntermediateResponse,
}

impl OperationKind {
    /// BER tag of the operation
    pub fn tag(&self) -> BerTag {
        match self {
            OperationKind::BindRequest => tags::BIND_REQUEST,
            OperationKind::BindResponse => tags::BIND_RESPONSE,
            OperationKind::UnbindRequest => tags::UNBIND_REQUEST,
            OperationKind::SearchRequest => tags::SEARCH_REQUEST,
            OperationKind::SearchResultEntry => tags::SEARCH_RESULT_ENTRY,
            OperationKind::SearchResultDone => tags::SEARCH_RESULT_DONE,
            OperationKind::SearchResultReference => tags::SEARCH_RESULT_REFERENCE,
            OperationKind::ModifyRequest => tags::MODIFY_REQUEST,
            OperationKind::ModifyResponse => tags::MODIFY_RESPONSE,
            OperationKind::AddRequest => tags::ADD_REQUEST,
            OperationKind::AddResponse => tags::ADD_RESPONSE,
            OperationKind::DelRequest => tags::DEL_REQUEST,
            OperationKind::DelResponse => tags::DEL_RESPONSE,
            OperationKind::ModifyDnRequest => tags::MODIFY_DN_REQUEST,
            OperationKind::ModifyDnResponse => tags::MODIFY_DN_RESPONSE,
            OperationKind::CompareRequest => tags::COMPARE_REQUEST,
            OperationKind::CompareResponse => tags::COMPARE_RESPONSE,
            OperationKind::AbandonRequest => tags::ABANDON_REQUEST,
            OperationKind::ExtendedRequest => tags::EXTENDED_REQUEST,
            OperationKind::ExtendedResponse => tags::EXTENDED_RESPONSE,
            OperationKind::IntermediateResponse => tags::INTERMEDIATE_RESPONSE,
        }
    }

    /// Name used in RFC 4511
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::BindRequest => "bindRequest",
            OperationKind::BindResponse => "bindResponse",
            OperationKind::UnbindRequest => "unbindRequest",
            OperationKind::SearchRequest => "searchRequest",
            OperationKind::SearchResultEntry => "searchResEntry",
            OperationKind::SearchResultDone => "searchResDone",
            OperationKind::SearchResultReference => "searchResRef",
            OperationKind::ModifyRequest => "modifyRequest",
            OperationKind::ModifyResponse => "modifyResponse",
            OperationKind::AddRequest => "addRequest",
            OperationKind::AddResponse => "addResponse",
            OperationKind::DelRequest => "delRequest",
            OperationKind::DelResponse => "delResponse",
            OperationKind::ModifyDnRequest => "modDNRequest",
            OperationKind::ModifyDnResponse => "modDNResponse",
            OperationKind::CompareRequest => "compareRequest",
            OperationKind::CompareResponse => "compareResponse",
            OperationKind::AbandonRequest => "abandonRequest",
            OperationKind::ExtendedRequest => "extendedReq",
            OperationKind::ExtendedResponse => "extendedResp",
            OperationKind::IntermediateResponse => "intermediateResponse",
        }
    }

    /// Check if a client sends this operation
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            OperationKind::BindRequest
                | OperationKind::UnbindRequest
                | OperationKind::SearchRequest
                | OperationKind::ModifyRequest
                | OperationKind::AddRequest
                | OperationKind::DelRequest
                | OperationKind::ModifyDnRequest
                | OperationKind::CompareRequest
                | OperationKind::AbandonRequest
                | OperationKind::ExtendedRequest
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldap_core::ResultCode;

    #[test]
    fn test_result_accessor() {
        let mut op = ProtocolOp::ModifyResponse(OperationResult::success());
        op.result_mut().unwrap().result_code = ResultCode::Busy;
        assert_eq!(op.result().unwrap().result_code, ResultCode::Busy);
        assert!(ProtocolOp::UnbindRequest.result().is_none());
    }

    #[test]
    fn test_operation_kind() {
        let op = ProtocolOp::AbandonRequest(AbandonRequest::default());
        assert_eq!(op.kind(), OperationKind::AbandonRequest);
        assert_eq!(op.kind().to_string(), "abandonRequest");
        assert!(op.kind().is_request());
        assert!(!OperationKind::IntermediateResponse.is_request());
    }

    #[test]
    fn test_message_serde() {
        let message = LdapMessage::new(
            MessageId::new(7).unwrap(),
            ProtocolOp::DelRequest(DelRequest {
                entry: "cn=old,dc=example,dc=com".to_string(),
            }),
        );
        let json = serde_json::to_string(&message).unwrap();
        let back: LdapMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }
}
