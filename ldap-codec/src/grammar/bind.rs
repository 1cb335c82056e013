//! Bind and unbind grammars
//!
//! ```text
//! BindRequest ::= [APPLICATION 0] SEQUENCE {
//!      version                 INTEGER (1 ..  127),
//!      name                    LDAPDN,
//!      authentication          AuthenticationChoice }
//!
//! AuthenticationChoice ::= CHOICE {
//!      simple                  [0] OCTET STRING,
//!      sasl                    [3] SaslCredentials }
//!
//! SaslCredentials ::= SEQUENCE {
//!      mechanism               LDAPString,
//!      credentials             OCTET STRING OPTIONAL }
//!
//! BindResponse ::= [APPLICATION 1] SEQUENCE {
//!      COMPONENTS OF LDAPResult,
//!      serverSaslCreds    [7] OCTET STRING OPTIONAL }
//!
//! UnbindRequest ::= [APPLICATION 2] NULL
//! ```

use super::LdapGrammar;
use super::actions::{allow_end, ldap_string, request_dn};
use crate::container::LdapContainer;
use crate::model::{Authentication, BindRequest, BindResponse, ProtocolOp};
use crate::tags;
use ldap_asn1::ber::decoder::decode_integer_in_range;
use ldap_asn1::{BerTag, Grammar, StateId, Tlv};
use ldap_core::{DecodeError, DecodeResult};
use once_cell::sync::Lazy;

const START: StateId = 0;
const BIND: StateId = 1;
const VERSION: StateId = 2;
const NAME: StateId = 3;
const SIMPLE: StateId = 4;
const SASL: StateId = 5;
const MECHANISM: StateId = 6;
const CREDENTIALS: StateId = 7;

fn start_bind_request(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::BindRequest(BindRequest::default()));
    Ok(())
}

fn store_version(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let version = decode_integer_in_range("version", tlv.value(), 1, 127)?;
    container.bind_request()?.version = version as u8;
    Ok(())
}

fn store_name(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let name = request_dn(container, "name", tlv.value());
    container.bind_request()?.name = name;
    Ok(())
}

fn store_simple(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.bind_request()?.authentication = Authentication::Simple(tlv.value().to_vec());
    allow_end(container);
    Ok(())
}

fn open_sasl(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.bind_request()?.authentication = Authentication::Sasl {
        mechanism: String::new(),
        credentials: None,
    };
    Ok(())
}

fn store_mechanism(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let value = ldap_string("mechanism", tlv.value())?;
    if let Authentication::Sasl { mechanism, .. } = &mut container.bind_request()?.authentication {
        *mechanism = value;
    }
    allow_end(container);
    Ok(())
}

fn store_credentials(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    if let Authentication::Sasl { credentials, .. } = &mut container.bind_request()?.authentication {
        *credentials = Some(tlv.value().to_vec());
    }
    allow_end(container);
    Ok(())
}

pub(super) static BIND_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::BindRequest,
        "BindRequest",
        &[
            ("START", 0),
            ("BIND", 0),
            ("VERSION", 1),
            ("NAME", 1),
            ("SIMPLE", 1),
            ("SASL", 1),
            ("MECHANISM", 2),
            ("CREDENTIALS", 2),
        ],
    );
    grammar
        .on(START, tags::BIND_REQUEST, BIND, start_bind_request)
        .on(BIND, BerTag::INTEGER, VERSION, store_version)
        .on(VERSION, BerTag::OCTET_STRING, NAME, store_name)
        .on(NAME, tags::AUTH_SIMPLE, SIMPLE, store_simple)
        .on(NAME, tags::AUTH_SASL, SASL, open_sasl)
        .on(SASL, BerTag::OCTET_STRING, MECHANISM, store_mechanism)
        .on(MECHANISM, BerTag::OCTET_STRING, CREDENTIALS, store_credentials);
    grammar
});

const RESPONSE_START: StateId = 0;
const RESPONSE: StateId = 1;
const RESULT_DONE: StateId = 2;
const SASL_CREDS: StateId = 3;

fn start_bind_response(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::BindResponse(BindResponse::default()));
    Ok(())
}

fn store_server_sasl_creds(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.bind_response()?.server_sasl_creds = Some(tlv.value().to_vec());
    allow_end(container);
    Ok(())
}

pub(super) static BIND_RESPONSE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::BindResponse,
        "BindResponse",
        &[("START", 0), ("RESPONSE", 0), ("RESULT_DONE", 1), ("SASL_CREDS", 1)],
    );
    grammar
        .on(RESPONSE_START, tags::BIND_RESPONSE, RESPONSE, start_bind_response)
        .push(RESPONSE, BerTag::ENUMERATED, LdapGrammar::Result, RESULT_DONE)
        .on(RESULT_DONE, tags::SERVER_SASL_CREDS, SASL_CREDS, store_server_sasl_creds);
    grammar
});

const UNBIND_START: StateId = 0;
const UNBIND: StateId = 1;

fn store_unbind(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    if !tlv.value().is_empty() {
        return Err(DecodeError::invalid("unbindRequest", "NULL with content"));
    }
    container.start_op(ProtocolOp::UnbindRequest);
    allow_end(container);
    Ok(())
}

pub(super) static UNBIND_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::UnbindRequest,
        "UnbindRequest",
        &[("START", 0), ("UNBIND", 0)],
    );
    grammar.on(UNBIND_START, tags::UNBIND_REQUEST, UNBIND, store_unbind);
    grammar
});

#[cfg(test)]
mod tests {
    use super::super::test_support::{decode, decode_message, decode_rejected};
    use crate::model::{Authentication, BindRequest, ProtocolOp};
    use ldap_core::{DecodeError, ResultCode};

    #[test]
    fn test_simple_bind() {
        let bytes = [
            0x30, 0x16, 0x02, 0x01, 0x01, 0x60, 0x11, 0x02, 0x01, 0x03, 0x04, 0x06, b'c', b'n',
            b'=', b'a', b'b', b'c', 0x80, 0x04, b'p', b'a', b's', b's',
        ];
        let message = decode_message(&bytes);
        assert_eq!(message.message_id.value(), 1);
        assert_eq!(
            message.op,
            ProtocolOp::BindRequest(BindRequest {
                version: 3,
                name: "cn=abc".to_string(),
                authentication: Authentication::Simple(b"pass".to_vec()),
            })
        );
    }

    #[test]
    fn test_simple_bind_invalid_dn() {
        // "b" has no value
        let bytes = [
            0x30, 0x16, 0x02, 0x01, 0x01, 0x60, 0x11, 0x02, 0x01, 0x03, 0x04, 0x06, b'c', b'n',
            b'=', b'a', b',', b'b', 0x80, 0x04, b'p', b'a', b's', b's',
        ];
        let invalid = decode_rejected(&bytes);
        assert_eq!(invalid.result_code, ResultCode::InvalidDnSyntax);
        assert!(invalid.diagnostic.contains("cn=a,b"));
    }

    #[test]
    fn test_sasl_bind_without_credentials() {
        let bytes = [
            0x30, 0x13, 0x02, 0x01, 0x02, 0x60, 0x0E, 0x02, 0x01, 0x03, 0x04, 0x00, 0xA3, 0x07,
            0x04, 0x05, b'P', b'L', b'A', b'I', b'N',
        ];
        let message = decode_message(&bytes);
        match message.op {
            ProtocolOp::BindRequest(request) => assert_eq!(
                request.authentication,
                Authentication::Sasl {
                    mechanism: "PLAIN".to_string(),
                    credentials: None
                }
            ),
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_bind_without_authentication() {
        let bytes = [0x30, 0x0A, 0x02, 0x01, 0x01, 0x60, 0x05, 0x02, 0x01, 0x03, 0x04, 0x00];
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnexpectedEnd { grammar: "BindRequest", state: "NAME" })
        ));
    }

    #[test]
    fn test_bind_version_out_of_range() {
        let bytes = [
            0x30, 0x0C, 0x02, 0x01, 0x01, 0x60, 0x07, 0x02, 0x01, 0x00, 0x04, 0x00, 0x80, 0x00,
        ];
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::InvalidValue { field: "version", .. })
        ));
    }

    #[test]
    fn test_bind_response_with_sasl_creds() {
        let bytes = [
            0x30, 0x10, 0x02, 0x01, 0x02, 0x61, 0x0B, 0x0A, 0x01, 0x0E, 0x04, 0x00, 0x04, 0x00,
            0x87, 0x02, 0xAB, 0xCD,
        ];
        let message = decode_message(&bytes);
        match message.op {
            ProtocolOp::BindResponse(response) => {
                assert_eq!(response.result.result_code, ResultCode::from_u32(14));
                assert_eq!(response.server_sasl_creds, Some(vec![0xAB, 0xCD]));
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_unbind_with_content() {
        let bytes = [0x30, 0x06, 0x02, 0x01, 0x01, 0x42, 0x01, 0x00];
        assert!(decode(&bytes).is_err());
    }
}
