//! Compare grammars
//!
//! ```text
//! CompareRequest ::= [APPLICATION 14] SEQUENCE {
//!      entry           LDAPDN,
//!      ava             AttributeValueAssertion }
//!
//! CompareResponse ::= [APPLICATION 15] LDAPResult
//! ```

use super::LdapGrammar;
use super::actions::{allow_end, attribute_description, request_dn};
use super::result::{response_grammar, start_result};
use crate::container::LdapContainer;
use crate::model::{CompareRequest, ProtocolOp};
use crate::tags;
use ldap_asn1::{BerTag, Grammar, StateId, Tlv};
use ldap_core::DecodeResult;
use once_cell::sync::Lazy;

const START: StateId = 0;
const COMPARE: StateId = 1;
const ENTRY: StateId = 2;
const AVA: StateId = 3;
const ATTRIBUTE_DESC: StateId = 4;
const ASSERTION_VALUE: StateId = 5;

fn start_compare_request(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::CompareRequest(CompareRequest::default()));
    Ok(())
}

fn store_entry(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let entry = request_dn(container, "entry", tlv.value());
    container.compare_request()?.entry = entry;
    Ok(())
}

fn store_attribute_desc(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let attribute_desc = attribute_description(container, "attributeDesc", tlv.value());
    container.compare_request()?.ava.attribute_desc = attribute_desc;
    Ok(())
}

fn store_assertion_value(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.compare_request()?.ava.assertion_value = tlv.value().to_vec();
    allow_end(container);
    Ok(())
}

pub(super) static COMPARE_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::CompareRequest,
        "CompareRequest",
        &[
            ("START", 0),
            ("COMPARE", 0),
            ("ENTRY", 1),
            ("AVA", 1),
            ("ATTRIBUTE_DESC", 2),
            ("ASSERTION_VALUE", 2),
        ],
    );
    grammar
        .on(START, tags::COMPARE_REQUEST, COMPARE, start_compare_request)
        .on(COMPARE, BerTag::OCTET_STRING, ENTRY, store_entry)
        .on_pure(ENTRY, BerTag::SEQUENCE, AVA)
        .on(AVA, BerTag::OCTET_STRING, ATTRIBUTE_DESC, store_attribute_desc)
        .on(ATTRIBUTE_DESC, BerTag::OCTET_STRING, ASSERTION_VALUE, store_assertion_value);
    grammar
});

pub(super) static COMPARE_RESPONSE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    response_grammar(
        LdapGrammar::CompareResponse,
        "CompareResponse",
        tags::COMPARE_RESPONSE,
        |container, _| start_result(container, ProtocolOp::CompareResponse),
    )
});

#[cfg(test)]
mod tests {
    use super::super::test_support::{decode, decode_message, decode_rejected};
    use crate::model::{AttributeValueAssertion, CompareRequest, OperationResult, ProtocolOp};
    use ldap_core::{DecodeError, ResultCode};

    #[test]
    fn test_compare_request() {
        let bytes = [
            0x30, 0x18, 0x02, 0x01, 0x02, 0x6E, 0x13, 0x04, 0x04, b'c', b'n', b'=', b'a', 0x30,
            0x0B, 0x04, 0x02, b's', b'n', 0x04, 0x05, b'S', b'm', b'i', b't', b'h',
        ];
        let message = decode_message(&bytes);
        assert_eq!(
            message.op,
            ProtocolOp::CompareRequest(CompareRequest {
                entry: "cn=a".to_string(),
                ava: AttributeValueAssertion::new("sn", "Smith"),
            })
        );
    }

    #[test]
    fn test_compare_request_invalid_attribute() {
        let bytes = [
            0x30, 0x18, 0x02, 0x01, 0x02, 0x6E, 0x13, 0x04, 0x04, b'c', b'n', b'=', b'a', 0x30,
            0x0B, 0x04, 0x02, b'1', b'x', 0x04, 0x05, b'S', b'm', b'i', b't', b'h',
        ];
        let invalid = decode_rejected(&bytes);
        assert_eq!(invalid.result_code, ResultCode::InvalidAttributeSyntax);
    }

    #[test]
    fn test_compare_request_missing_value() {
        let bytes = [
            0x30, 0x11, 0x02, 0x01, 0x02, 0x6E, 0x0C, 0x04, 0x04, b'c', b'n', b'=', b'a', 0x30,
            0x04, 0x04, 0x02, b's', b'n',
        ];
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnexpectedEnd { grammar: "CompareRequest", state: "ATTRIBUTE_DESC" })
        ));
    }

    #[test]
    fn test_compare_response() {
        let bytes = [
            0x30, 0x0C, 0x02, 0x01, 0x02, 0x6F, 0x07, 0x0A, 0x01, 0x06, 0x04, 0x00, 0x04, 0x00,
        ];
        let message = decode_message(&bytes);
        assert_eq!(
            message.op,
            ProtocolOp::CompareResponse(OperationResult {
                result_code: ResultCode::from_u32(6),
                ..Default::default()
            })
        );
    }
}
