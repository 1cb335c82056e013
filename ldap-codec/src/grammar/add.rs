//! Add grammars
//!
//! ```text
//! AddRequest ::= [APPLICATION 8] SEQUENCE {
//!      entry           LDAPDN,
//!      attributes      AttributeList }
//!
//! AttributeList ::= SEQUENCE OF attribute Attribute
//!
//! Attribute ::= PartialAttribute(WITH COMPONENTS {
//!      ...,
//!      vals (SIZE(1..MAX))})
//!
//! AddResponse ::= [APPLICATION 9] LDAPResult
//! ```

use super::LdapGrammar;
use super::actions::{allow_end, attribute_description, last_mut, request_dn};
use super::result::{response_grammar, start_result};
use crate::container::LdapContainer;
use crate::model::{AddRequest, PartialAttribute, ProtocolOp};
use crate::tags;
use ldap_asn1::{BerTag, Grammar, StateId, Tlv};
use ldap_core::DecodeResult;
use once_cell::sync::Lazy;

const START: StateId = 0;
const ADD: StateId = 1;
const ENTRY: StateId = 2;
const ATTRIBUTES: StateId = 3;
const ATTRIBUTE: StateId = 4;
const TYPE: StateId = 5;
const VALUES: StateId = 6;
const VALUE: StateId = 7;

fn start_add_request(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::AddRequest(AddRequest::default()));
    Ok(())
}

fn store_entry(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let entry = request_dn(container, "entry", tlv.value());
    container.add_request()?.entry = entry;
    Ok(())
}

fn open_attributes(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    allow_end(container);
    Ok(())
}

fn open_attribute(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container
        .add_request()?
        .attributes
        .push(PartialAttribute::default());
    Ok(())
}

fn store_type(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let attribute_type = attribute_description(container, "type", tlv.value());
    last_mut(&mut container.add_request()?.attributes, "attribute")?.attribute_type =
        attribute_type;
    Ok(())
}

fn store_value(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    last_mut(&mut container.add_request()?.attributes, "attribute")?
        .values
        .push(tlv.value().to_vec());
    allow_end(container);
    Ok(())
}

pub(super) static ADD_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::AddRequest,
        "AddRequest",
        &[
            ("START", 0),
            ("ADD", 0),
            ("ENTRY", 1),
            ("ATTRIBUTES", 1),
            ("ATTRIBUTE", 2),
            ("TYPE", 3),
            ("VALUES", 3),
            ("VALUE", 4),
        ],
    );
    grammar
        .on(START, tags::ADD_REQUEST, ADD, start_add_request)
        .on(ADD, BerTag::OCTET_STRING, ENTRY, store_entry)
        .on(ENTRY, BerTag::SEQUENCE, ATTRIBUTES, open_attributes)
        .on(ATTRIBUTES, BerTag::SEQUENCE, ATTRIBUTE, open_attribute)
        .on(ATTRIBUTE, BerTag::OCTET_STRING, TYPE, store_type)
        // vals SIZE(1..MAX): no end and no next attribute before a value
        .on_pure(TYPE, BerTag::SET, VALUES)
        .on(VALUES, BerTag::OCTET_STRING, VALUE, store_value)
        .on(VALUE, BerTag::OCTET_STRING, VALUE, store_value)
        .on(VALUE, BerTag::SEQUENCE, ATTRIBUTE, open_attribute);
    grammar
});

pub(super) static ADD_RESPONSE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    response_grammar(
        LdapGrammar::AddResponse,
        "AddResponse",
        tags::ADD_RESPONSE,
        |container, _| start_result(container, ProtocolOp::AddResponse),
    )
});
