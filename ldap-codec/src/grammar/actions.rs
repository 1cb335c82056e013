//! Helpers shared by the grammar actions

use crate::container::LdapContainer;
use crate::validate::{is_valid_attribute_description, validate_dn};
use ldap_asn1::Asn1Container;
use ldap_asn1::ber::decoder::{decode_integer_value, decode_utf8_value};
use ldap_core::{DecodeError, DecodeResult, ResultCode};

/// The PDU may end here, and the active grammar may hand control back
pub(super) fn allow_end(container: &mut LdapContainer) {
    container.grammar_end_allowed(true);
    container.grammar_pop_allowed(true);
}

/// Decode an `LDAPDN` of a request
///
/// A malformed DN rejects the request but keeps decoding.
pub(super) fn request_dn(container: &mut LdapContainer, field: &'static str, value: &[u8]) -> String {
    match std::str::from_utf8(value) {
        Ok(dn) => {
            if container.config().validate_dn {
                if let Err(reason) = validate_dn(dn) {
                    container.reject(
                        ResultCode::InvalidDnSyntax,
                        format!("Invalid {} '{}': {}", field, dn, reason),
                    );
                }
            }
            dn.to_owned()
        }
        Err(_) => {
            let dn = String::from_utf8_lossy(value).into_owned();
            container.reject(
                ResultCode::InvalidDnSyntax,
                format!("Invalid {} '{}': not UTF-8", field, dn),
            );
            dn
        }
    }
}

/// Decode an `AttributeDescription` of a request
///
/// A malformed description rejects the request but keeps decoding.
pub(super) fn attribute_description(
    container: &mut LdapContainer,
    field: &'static str,
    value: &[u8],
) -> String {
    let description = String::from_utf8_lossy(value).into_owned();
    if std::str::from_utf8(value).is_err() || !is_valid_attribute_description(&description) {
        container.reject(
            ResultCode::InvalidAttributeSyntax,
            format!("Invalid {} '{}'", field, description),
        );
    }
    description
}

/// Decode an `LDAPString` or `LDAPOID`
pub(super) fn ldap_string(field: &'static str, value: &[u8]) -> DecodeResult<String> {
    decode_utf8_value(field, value)
}

/// Decode an ENUMERATED of a request
///
/// Values outside the enumeration reject the request with `protocolError`
/// and leave the default in place.
pub(super) fn enumerated<T: Default>(
    container: &mut LdapContainer,
    field: &'static str,
    value: &[u8],
    from_i64: fn(i64) -> Option<T>,
) -> DecodeResult<T> {
    let raw = decode_integer_value(value)?;
    match from_i64(raw) {
        Some(known) => Ok(known),
        None => {
            container.reject(
                ResultCode::ProtocolError,
                format!("{} {} is not defined", field, raw),
            );
            Ok(T::default())
        }
    }
}

/// Get the element a `SEQUENCE OF` loop is filling
pub(super) fn last_mut<'a, T>(items: &'a mut [T], field: &'static str) -> DecodeResult<&'a mut T> {
    items
        .last_mut()
        .ok_or_else(|| DecodeError::invalid(field, "no element is open"))
}
