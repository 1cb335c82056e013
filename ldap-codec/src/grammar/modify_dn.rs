//! ModifyDN grammars
//!
//! ```text
//! ModifyDNRequest ::= [APPLICATION 12] SEQUENCE {
//!      entry           LDAPDN,
//!      newrdn          RelativeLDAPDN,
//!      deleteoldrdn    BOOLEAN,
//!      newSuperior     [0] LDAPDN OPTIONAL }
//!
//! ModifyDNResponse ::= [APPLICATION 13] LDAPResult
//! ```

use super::LdapGrammar;
use super::actions::{allow_end, request_dn};
use super::result::{response_grammar, start_result};
use crate::container::LdapContainer;
use crate::model::{ModifyDnRequest, ProtocolOp};
use crate::tags;
use crate::validate::is_valid_rdn;
use ldap_asn1::ber::decoder::decode_boolean_value;
use ldap_asn1::{BerTag, Grammar, StateId, Tlv};
use ldap_core::{DecodeResult, ResultCode};
use once_cell::sync::Lazy;

const START: StateId = 0;
const MODIFY_DN: StateId = 1;
const ENTRY: StateId = 2;
const NEW_RDN: StateId = 3;
const DELETE_OLD_RDN: StateId = 4;
const NEW_SUPERIOR: StateId = 5;

fn start_modify_dn_request(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::ModifyDnRequest(ModifyDnRequest::default()));
    Ok(())
}

fn store_entry(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let entry = request_dn(container, "entry", tlv.value());
    container.modify_dn_request()?.entry = entry;
    Ok(())
}

fn store_new_rdn(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let new_rdn = String::from_utf8_lossy(tlv.value()).into_owned();
    let malformed = std::str::from_utf8(tlv.value()).is_err()
        || (container.config().validate_dn && !is_valid_rdn(&new_rdn));
    if malformed {
        container.reject(
            ResultCode::InvalidDnSyntax,
            format!("Invalid newrdn '{}'", new_rdn),
        );
    }
    container.modify_dn_request()?.new_rdn = new_rdn;
    Ok(())
}

fn store_delete_old_rdn(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.modify_dn_request()?.delete_old_rdn = decode_boolean_value(tlv.value())?;
    allow_end(container);
    Ok(())
}

fn store_new_superior(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let new_superior = request_dn(container, "newSuperior", tlv.value());
    container.modify_dn_request()?.new_superior = Some(new_superior);
    allow_end(container);
    Ok(())
}

pub(super) static MODIFY_DN_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::ModifyDnRequest,
        "ModifyDNRequest",
        &[
            ("START", 0),
            ("MODIFY_DN", 0),
            ("ENTRY", 1),
            ("NEW_RDN", 1),
            ("DELETE_OLD_RDN", 1),
            ("NEW_SUPERIOR", 1),
        ],
    );
    grammar
        .on(START, tags::MODIFY_DN_REQUEST, MODIFY_DN, start_modify_dn_request)
        .on(MODIFY_DN, BerTag::OCTET_STRING, ENTRY, store_entry)
        .on(ENTRY, BerTag::OCTET_STRING, NEW_RDN, store_new_rdn)
        .on(NEW_RDN, BerTag::BOOLEAN, DELETE_OLD_RDN, store_delete_old_rdn)
        .on(DELETE_OLD_RDN, tags::NEW_SUPERIOR, NEW_SUPERIOR, store_new_superior);
    grammar
});

pub(super) static MODIFY_DN_RESPONSE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    response_grammar(
        LdapGrammar::ModifyDnResponse,
        "ModifyDNResponse",
        tags::MODIFY_DN_RESPONSE,
        |container, _| start_result(container, ProtocolOp::ModifyDnResponse),
    )
});

#[cfg(test)]
mod tests {
    use super::super::test_support::{decode, decode_message, decode_rejected};
    use crate::model::{ModifyDnRequest, ProtocolOp};
    use ldap_core::{DecodeError, ResultCode};

    #[test]
    fn test_modify_dn_with_new_superior() {
        let bytes = [
            0x30, 0x1A, 0x02, 0x01, 0x04, 0x6C, 0x15, 0x04, 0x04, b'c', b'n', b'=', b'a', 0x04,
            0x04, b'c', b'n', b'=', b'b', 0x01, 0x01, 0xFF, 0x80, 0x04, b'o', b'=', b'x', b'y',
        ];
        let message = decode_message(&bytes);
        assert_eq!(
            message.op,
            ProtocolOp::ModifyDnRequest(ModifyDnRequest {
                entry: "cn=a".to_string(),
                new_rdn: "cn=b".to_string(),
                delete_old_rdn: true,
                new_superior: Some("o=xy".to_string()),
            })
        );
    }

    #[test]
    fn test_modify_dn_without_new_superior() {
        let bytes = [
            0x30, 0x14, 0x02, 0x01, 0x04, 0x6C, 0x0F, 0x04, 0x04, b'c', b'n', b'=', b'a', 0x04,
            0x04, b'c', b'n', b'=', b'b', 0x01, 0x01, 0x00,
        ];
        match decode_message(&bytes).op {
            ProtocolOp::ModifyDnRequest(request) => {
                assert!(!request.delete_old_rdn);
                assert_eq!(request.new_superior, None);
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_modify_dn_invalid_new_rdn() {
        // "cn=b" -> "cn,b"
        let bytes = [
            0x30, 0x14, 0x02, 0x01, 0x04, 0x6C, 0x0F, 0x04, 0x04, b'c', b'n', b'=', b'a', 0x04,
            0x04, b'c', b'n', b',', b'b', 0x01, 0x01, 0x00,
        ];
        let invalid = decode_rejected(&bytes);
        assert_eq!(invalid.result_code, ResultCode::InvalidDnSyntax);
        assert!(invalid.diagnostic.contains("newrdn"));
    }

    #[test]
    fn test_modify_dn_missing_delete_old_rdn() {
        let bytes = [
            0x30, 0x11, 0x02, 0x01, 0x04, 0x6C, 0x0C, 0x04, 0x04, b'c', b'n', b'=', b'a', 0x04,
            0x04, b'c', b'n', b'=', b'b',
        ];
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnexpectedEnd { grammar: "ModifyDNRequest", state: "NEW_RDN" })
        ));
    }
}
