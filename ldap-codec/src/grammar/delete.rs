//! Delete grammars
//!
//! ```text
//! DelRequest ::= [APPLICATION 10] LDAPDN
//!
//! DelResponse ::= [APPLICATION 11] LDAPResult
//! ```

use super::LdapGrammar;
use super::actions::{allow_end, request_dn};
use super::result::{response_grammar, start_result};
use crate::container::LdapContainer;
use crate::model::{DelRequest, ProtocolOp};
use crate::tags;
use ldap_asn1::{Grammar, StateId, Tlv};
use ldap_core::DecodeResult;
use once_cell::sync::Lazy;

const START: StateId = 0;
const DELETE: StateId = 1;

fn store_del_request(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let entry = request_dn(container, "entry", tlv.value());
    container.start_op(ProtocolOp::DelRequest(DelRequest { entry }));
    allow_end(container);
    Ok(())
}

pub(super) static DEL_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::DelRequest,
        "DelRequest",
        &[("START", 0), ("DELETE", 0)],
    );
    grammar.on(START, tags::DEL_REQUEST, DELETE, store_del_request);
    grammar
});

pub(super) static DEL_RESPONSE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    response_grammar(
        LdapGrammar::DelResponse,
        "DelResponse",
        tags::DEL_RESPONSE,
        |container, _| start_result(container, ProtocolOp::DelResponse),
    )
});

#[cfg(test)]
mod tests {
    use super::super::test_support::{decode_message, decode_rejected};
    use crate::model::{DelRequest, OperationResult, ProtocolOp};
    use ldap_core::ResultCode;

    #[test]
    fn test_del_request() {
        let bytes = [0x30, 0x0B, 0x02, 0x01, 0x09, 0x4A, 0x06, b'o', b'u', b'=', b'a', b',', b'b'];
        // "ou=a,b": the second RDN has no value
        let invalid = decode_rejected(&bytes);
        assert_eq!(invalid.result_code, ResultCode::InvalidDnSyntax);

        let bytes = [0x30, 0x0A, 0x02, 0x01, 0x09, 0x4A, 0x05, b'o', b'u', b'=', b'a', b'b'];
        let message = decode_message(&bytes);
        assert_eq!(message.message_id.value(), 9);
        assert_eq!(
            message.op,
            ProtocolOp::DelRequest(DelRequest {
                entry: "ou=ab".to_string()
            })
        );
    }

    #[test]
    fn test_del_request_empty_dn() {
        let bytes = [0x30, 0x05, 0x02, 0x01, 0x09, 0x4A, 0x00];
        let message = decode_message(&bytes);
        assert_eq!(
            message.op,
            ProtocolOp::DelRequest(DelRequest {
                entry: String::new()
            })
        );
    }

    #[test]
    fn test_del_response() {
        let bytes = [
            0x30, 0x0C, 0x02, 0x01, 0x09, 0x6B, 0x07, 0x0A, 0x01, 0x20, 0x04, 0x00, 0x04, 0x00,
        ];
        let message = decode_message(&bytes);
        assert_eq!(
            message.op,
            ProtocolOp::DelResponse(OperationResult {
                result_code: ResultCode::NoSuchObject,
                ..Default::default()
            })
        );
    }
}
