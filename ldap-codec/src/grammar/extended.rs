//! Extended and intermediate grammars
//!
//! ```text
//! ExtendedRequest ::= [APPLICATION 23] SEQUENCE {
//!      requestName      [0] LDAPOID,
//!      requestValue     [1] OCTET STRING OPTIONAL }
//!
//! ExtendedResponse ::= [APPLICATION 24] SEQUENCE {
//!      COMPONENTS OF LDAPResult,
//!      responseName     [10] LDAPOID OPTIONAL,
//!      responseValue    [11] OCTET STRING OPTIONAL }
//!
//! IntermediateResponse ::= [APPLICATION 25] SEQUENCE {
//!      responseName     [0] LDAPOID OPTIONAL,
//!      responseValue    [1] OCTET STRING OPTIONAL }
//! ```

use super::LdapGrammar;
use super::actions::{allow_end, ldap_string};
use crate::container::LdapContainer;
use crate::model::{ExtendedRequest, ExtendedResponse, IntermediateResponse, ProtocolOp};
use crate::tags;
use ldap_asn1::{BerTag, Grammar, StateId, Tlv};
use ldap_core::DecodeResult;
use once_cell::sync::Lazy;

const REQUEST_START: StateId = 0;
const REQUEST: StateId = 1;
const REQUEST_NAME: StateId = 2;
const REQUEST_VALUE: StateId = 3;

fn start_extended_request(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::ExtendedRequest(ExtendedRequest::default()));
    Ok(())
}

fn store_request_name(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.extended_request()?.name = ldap_string("requestName", tlv.value())?;
    allow_end(container);
    Ok(())
}

fn store_request_value(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.extended_request()?.value = Some(tlv.value().to_vec());
    allow_end(container);
    Ok(())
}

pub(super) static EXTENDED_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::ExtendedRequest,
        "ExtendedRequest",
        &[("START", 0), ("REQUEST", 0), ("NAME", 1), ("VALUE", 1)],
    );
    grammar
        .on(REQUEST_START, tags::EXTENDED_REQUEST, REQUEST, start_extended_request)
        .on(REQUEST, tags::EXTENDED_REQUEST_NAME, REQUEST_NAME, store_request_name)
        .on(REQUEST_NAME, tags::EXTENDED_REQUEST_VALUE, REQUEST_VALUE, store_request_value);
    grammar
});

const RESPONSE_START: StateId = 0;
const RESPONSE: StateId = 1;
const RESULT_DONE: StateId = 2;
const RESPONSE_NAME: StateId = 3;
const RESPONSE_VALUE: StateId = 4;

fn start_extended_response(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::ExtendedResponse(ExtendedResponse::default()));
    Ok(())
}

fn store_response_name(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.extended_response()?.name = Some(ldap_string("responseName", tlv.value())?);
    allow_end(container);
    Ok(())
}

fn store_response_value(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.extended_response()?.value = Some(tlv.value().to_vec());
    allow_end(container);
    Ok(())
}

pub(super) static EXTENDED_RESPONSE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::ExtendedResponse,
        "ExtendedResponse",
        &[("START", 0), ("RESPONSE", 0), ("RESULT_DONE", 1), ("NAME", 1), ("VALUE", 1)],
    );
    grammar
        .on(RESPONSE_START, tags::EXTENDED_RESPONSE, RESPONSE, start_extended_response)
        .push(RESPONSE, BerTag::ENUMERATED, LdapGrammar::Result, RESULT_DONE)
        .on(RESULT_DONE, tags::EXTENDED_RESPONSE_NAME, RESPONSE_NAME, store_response_name)
        .on(RESULT_DONE, tags::EXTENDED_RESPONSE_VALUE, RESPONSE_VALUE, store_response_value)
        .on(RESPONSE_NAME, tags::EXTENDED_RESPONSE_VALUE, RESPONSE_VALUE, store_response_value);
    grammar
});

const INTERMEDIATE_START: StateId = 0;
const INTERMEDIATE: StateId = 1;
const INTERMEDIATE_NAME: StateId = 2;
const INTERMEDIATE_VALUE: StateId = 3;

fn start_intermediate_response(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::IntermediateResponse(IntermediateResponse::default()));
    allow_end(container);
    Ok(())
}

fn store_intermediate_name(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.intermediate_response()?.name = Some(ldap_string("responseName", tlv.value())?);
    allow_end(container);
    Ok(())
}

fn store_intermediate_value(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.intermediate_response()?.value = Some(tlv.value().to_vec());
    allow_end(container);
    Ok(())
}

pub(super) static INTERMEDIATE_RESPONSE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::IntermediateResponse,
        "IntermediateResponse",
        &[("START", 0), ("RESPONSE", 0), ("NAME", 1), ("VALUE", 1)],
    );
    grammar
        .on(
            INTERMEDIATE_START,
            tags::INTERMEDIATE_RESPONSE,
            INTERMEDIATE,
            start_intermediate_response,
        )
        .on(
            INTERMEDIATE,
            tags::INTERMEDIATE_RESPONSE_NAME,
            INTERMEDIATE_NAME,
            store_intermediate_name,
        )
        .on(
            INTERMEDIATE,
            tags::INTERMEDIATE_RESPONSE_VALUE,
            INTERMEDIATE_VALUE,
            store_intermediate_value,
        )
        .on(
            INTERMEDIATE_NAME,
            tags::INTERMEDIATE_RESPONSE_VALUE,
            INTERMEDIATE_VALUE,
            store_intermediate_value,
        );
    grammar
});

#[cfg(test)]
mod tests {
    use super::super::test_support::{decode, decode_message};
    use crate::model::{
        ExtendedRequest, ExtendedResponse, IntermediateResponse, OperationResult, ProtocolOp,
    };
    use ldap_core::{DecodeError, ResultCode};

    #[test]
    fn test_extended_request_without_value() {
        // StartTLS
        let bytes = [
            0x30, 0x1D, 0x02, 0x01, 0x01, 0x77, 0x18, 0x80, 0x16, b'1', b'.', b'3', b'.', b'6',
            b'.', b'1', b'.', b'4', b'.', b'1', b'.', b'1', b'4', b'6', b'6', b'.', b'2', b'0',
            b'0', b'3', b'7',
        ];
        let message = decode_message(&bytes);
        assert_eq!(
            message.op,
            ProtocolOp::ExtendedRequest(ExtendedRequest {
                name: "1.3.6.1.4.1.1466.20037".to_string(),
                value: None,
            })
        );
    }

    #[test]
    fn test_extended_request_with_value() {
        let bytes = [
            0x30, 0x0D, 0x02, 0x01, 0x01, 0x77, 0x08, 0x80, 0x03, b'1', b'.', b'2', 0x81, 0x01,
            0x2A,
        ];
        match decode_message(&bytes).op {
            ProtocolOp::ExtendedRequest(request) => {
                assert_eq!(request.name, "1.2");
                assert_eq!(request.value, Some(vec![0x2A]));
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_extended_request_without_name() {
        let bytes = [0x30, 0x05, 0x02, 0x01, 0x01, 0x77, 0x00];
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnexpectedEnd { grammar: "ExtendedRequest", state: "REQUEST" })
        ));
    }

    #[test]
    fn test_extended_response_value_without_name() {
        let bytes = [
            0x30, 0x0F, 0x02, 0x01, 0x01, 0x78, 0x0A, 0x0A, 0x01, 0x00, 0x04, 0x00, 0x04, 0x00,
            0x8B, 0x01, 0x07,
        ];
        assert_eq!(
            decode_message(&bytes).op,
            ProtocolOp::ExtendedResponse(ExtendedResponse {
                result: OperationResult::success(),
                name: None,
                value: Some(vec![0x07]),
            })
        );
    }

    #[test]
    fn test_extended_response_name_and_value() {
        let bytes = [
            0x30, 0x13, 0x02, 0x01, 0x01, 0x78, 0x0E, 0x0A, 0x01, 0x34, 0x04, 0x00, 0x04, 0x00,
            0x8A, 0x03, b'1', b'.', b'2', 0x8B, 0x00,
        ];
        match decode_message(&bytes).op {
            ProtocolOp::ExtendedResponse(response) => {
                assert_eq!(response.result.result_code, ResultCode::from_u32(52));
                assert_eq!(response.name.as_deref(), Some("1.2"));
                assert_eq!(response.value, Some(Vec::new()));
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_empty_intermediate_response() {
        let bytes = [0x30, 0x05, 0x02, 0x01, 0x03, 0x79, 0x00];
        assert_eq!(
            decode_message(&bytes).op,
            ProtocolOp::IntermediateResponse(IntermediateResponse::default())
        );
    }

    #[test]
    fn test_intermediate_response_value_only() {
        let bytes = [0x30, 0x09, 0x02, 0x01, 0x03, 0x79, 0x04, 0x81, 0x02, 0x01, 0x02];
        assert_eq!(
            decode_message(&bytes).op,
            ProtocolOp::IntermediateResponse(IntermediateResponse {
                name: None,
                value: Some(vec![0x01, 0x02]),
            })
        );
    }
}
