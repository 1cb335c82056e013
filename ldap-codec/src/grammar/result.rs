//! `LDAPResult` grammar
//!
//! ```text
//! LDAPResult ::= SEQUENCE {
//!      resultCode         ENUMERATED,
//!      matchedDN          LDAPDN,
//!      diagnosticMessage  LDAPString,
//!      referral           [3] Referral OPTIONAL }
//! ```
//!
//! Every response inlines these components (`COMPONENTS OF`), so this
//! grammar has no envelope of its own. Responses enter it on the result
//! code and get control back on the first tag after the result.

use super::LdapGrammar;
use super::actions::{allow_end, ldap_string};
use crate::container::LdapContainer;
use crate::model::ProtocolOp;
use crate::tags;
use ldap_asn1::ber::decoder::decode_integer_in_range;
use ldap_asn1::{Action, BerTag, Grammar, StateId, Tlv};
use ldap_core::{DecodeResult, ResultCode};
use once_cell::sync::Lazy;

const START: StateId = 0;
const RESULT_CODE: StateId = 1;
const MATCHED_DN: StateId = 2;
const DIAGNOSTIC: StateId = 3;
const REFERRAL: StateId = 4;
const REFERRAL_URI: StateId = 5;

fn store_result_code(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let code = decode_integer_in_range("resultCode", tlv.value(), 0, i32::MAX as i64)?;
    container.result()?.result_code = ResultCode::from_u32(code as u32);
    Ok(())
}

fn store_matched_dn(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.result()?.matched_dn = ldap_string("matchedDN", tlv.value())?;
    Ok(())
}

fn store_diagnostic(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.result()?.diagnostic_message = ldap_string("diagnosticMessage", tlv.value())?;
    allow_end(container);
    Ok(())
}

fn store_referral_uri(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let uri = ldap_string("referral", tlv.value())?;
    container.result()?.referral.push(uri);
    allow_end(container);
    Ok(())
}

pub(super) static RESULT: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::Result,
        "LDAPResult",
        &[
            ("START", 0),
            ("RESULT_CODE", 0),
            ("MATCHED_DN", 0),
            ("DIAGNOSTIC", 0),
            ("REFERRAL", 0),
            ("REFERRAL_URI", 1),
        ],
    );
    grammar
        .on(START, BerTag::ENUMERATED, RESULT_CODE, store_result_code)
        .on(RESULT_CODE, BerTag::OCTET_STRING, MATCHED_DN, store_matched_dn)
        .on(MATCHED_DN, BerTag::OCTET_STRING, DIAGNOSTIC, store_diagnostic)
        // SIZE (1..MAX): an empty referral may not end the result
        .on_pure(DIAGNOSTIC, tags::REFERRAL, REFERRAL)
        .on(REFERRAL, BerTag::OCTET_STRING, REFERRAL_URI, store_referral_uri)
        .on(REFERRAL_URI, BerTag::OCTET_STRING, REFERRAL_URI, store_referral_uri);
    grammar
});

const RESPONSE_START: StateId = 0;
const RESPONSE: StateId = 1;
const RESPONSE_DONE: StateId = 2;

/// Grammar of a response that is nothing but an `LDAPResult`
///
/// # Arguments
/// * `id`, `name` - Grammar identity
/// * `tag` - Operation tag
/// * `start` - Action allocating the operation
pub(super) fn response_grammar(
    id: LdapGrammar,
    name: &'static str,
    tag: BerTag,
    start: Action<LdapContainer>,
) -> Grammar<LdapContainer> {
    let mut grammar = Grammar::new(id, name, &[("START", 0), ("RESPONSE", 0), ("RESULT_DONE", 1)]);
    grammar
        .on(RESPONSE_START, tag, RESPONSE, start)
        .push(RESPONSE, BerTag::ENUMERATED, LdapGrammar::Result, RESPONSE_DONE);
    grammar
}

/// Allocate a plain-result response
pub(super) fn start_result(
    container: &mut LdapContainer,
    op: fn(crate::model::OperationResult) -> ProtocolOp,
) -> DecodeResult<()> {
    container.start_op(op(Default::default()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{decode, decode_message};
    use crate::model::{OperationResult, ProtocolOp};
    use ldap_core::{DecodeError, ResultCode};

    #[test]
    fn test_search_done_with_referral() {
        let bytes = [
            0x30, 0x16, 0x02, 0x01, 0x04, 0x65, 0x11, 0x0A, 0x01, 0x0A, 0x04, 0x00, 0x04, 0x00,
            0xA3, 0x08, 0x04, 0x06, b'l', b'd', b'a', b'p', b':', b'/',
        ];
        let message = decode_message(&bytes);
        assert_eq!(
            message.op,
            ProtocolOp::SearchResultDone(OperationResult {
                result_code: ResultCode::Referral,
                matched_dn: String::new(),
                diagnostic_message: String::new(),
                referral: vec!["ldap:/".to_string()],
            })
        );
    }

    #[test]
    fn test_empty_referral_rejected() {
        let bytes = [
            0x30, 0x0E, 0x02, 0x01, 0x04, 0x65, 0x09, 0x0A, 0x01, 0x0A, 0x04, 0x00, 0x04, 0x00,
            0xA3, 0x00,
        ];
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnexpectedEnd { grammar: "LDAPResult", state: "REFERRAL" })
        ));
    }

    #[test]
    fn test_result_missing_diagnostic() {
        let bytes = [0x30, 0x0A, 0x02, 0x01, 0x04, 0x67, 0x05, 0x0A, 0x01, 0x00, 0x04, 0x00];
        assert!(matches!(decode(&bytes), Err(DecodeError::UnexpectedEnd { .. })));
    }
}
