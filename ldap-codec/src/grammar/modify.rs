//! Modify grammars
//!
//! ```text
//! ModifyRequest ::= [APPLICATION 6] SEQUENCE {
//!      object          LDAPDN,
//!      changes         SEQUENCE OF change SEQUENCE {
//!           operation       ENUMERATED { add (0), delete (1), replace (2), ... },
//!           modification    PartialAttribute } }
//!
//! ModifyResponse ::= [APPLICATION 7] LDAPResult
//! ```

use super::LdapGrammar;
use super::actions::{allow_end, attribute_description, enumerated, last_mut, request_dn};
use super::result::{response_grammar, start_result};
use crate::container::LdapContainer;
use crate::model::{Change, ModifyOperation, ModifyRequest, ProtocolOp};
use crate::tags;
use ldap_asn1::{BerTag, Grammar, StateId, Tlv};
use ldap_core::DecodeResult;
use once_cell::sync::Lazy;

const START: StateId = 0;
const MODIFY: StateId = 1;
const OBJECT: StateId = 2;
const CHANGES: StateId = 3;
const CHANGE: StateId = 4;
const OPERATION: StateId = 5;
const MODIFICATION: StateId = 6;
const TYPE: StateId = 7;
const VALUES: StateId = 8;
const VALUE: StateId = 9;

fn start_modify_request(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::ModifyRequest(ModifyRequest::default()));
    Ok(())
}

fn store_object(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let object = request_dn(container, "object", tlv.value());
    container.modify_request()?.object = object;
    Ok(())
}

fn open_changes(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    allow_end(container);
    Ok(())
}

fn open_change(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.modify_request()?.changes.push(Change::default());
    Ok(())
}

fn store_operation(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let operation = enumerated(container, "operation", tlv.value(), ModifyOperation::from_i64)?;
    last_mut(&mut container.modify_request()?.changes, "change")?.operation = operation;
    Ok(())
}

fn store_type(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let attribute_type = attribute_description(container, "type", tlv.value());
    last_mut(&mut container.modify_request()?.changes, "change")?
        .modification
        .attribute_type = attribute_type;
    Ok(())
}

fn store_value(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    last_mut(&mut container.modify_request()?.changes, "change")?
        .modification
        .values
        .push(tlv.value().to_vec());
    allow_end(container);
    Ok(())
}

pub(super) static MODIFY_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::ModifyRequest,
        "ModifyRequest",
        &[
            ("START", 0),
            ("MODIFY", 0),
            ("OBJECT", 1),
            ("CHANGES", 1),
            ("CHANGE", 2),
            ("OPERATION", 3),
            ("MODIFICATION", 3),
            ("TYPE", 4),
            ("VALUES", 4),
            ("VALUE", 5),
        ],
    );
    grammar
        .on(START, tags::MODIFY_REQUEST, MODIFY, start_modify_request)
        .on(MODIFY, BerTag::OCTET_STRING, OBJECT, store_object)
        .on(OBJECT, BerTag::SEQUENCE, CHANGES, open_changes)
        .on(CHANGES, BerTag::SEQUENCE, CHANGE, open_change)
        .on(CHANGE, BerTag::ENUMERATED, OPERATION, store_operation)
        .on_pure(OPERATION, BerTag::SEQUENCE, MODIFICATION)
        .on(MODIFICATION, BerTag::OCTET_STRING, TYPE, store_type)
        // Delete and replace may carry no values
        .on(TYPE, BerTag::SET, VALUES, open_changes)
        .on(VALUES, BerTag::OCTET_STRING, VALUE, store_value)
        .on(VALUE, BerTag::OCTET_STRING, VALUE, store_value)
        .on(VALUES, BerTag::SEQUENCE, CHANGE, open_change)
        .on(VALUE, BerTag::SEQUENCE, CHANGE, open_change);
    grammar
});

pub(super) static MODIFY_RESPONSE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    response_grammar(
        LdapGrammar::ModifyResponse,
        "ModifyResponse",
        tags::MODIFY_RESPONSE,
        |container, _| start_result(container, ProtocolOp::ModifyResponse),
    )
});
