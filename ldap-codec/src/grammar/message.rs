//! Envelope and controls grammars
//!
//! ```text
//! LDAPMessage ::= SEQUENCE {
//!      messageID       MessageID,
//!      protocolOp      CHOICE { ... },
//!      controls       [0] Controls OPTIONAL }
//!
//! Controls ::= SEQUENCE OF control Control
//! ```

use super::LdapGrammar;
use super::actions::{allow_end, last_mut, ldap_string};
use crate::container::LdapContainer;
use crate::controls::{Control, ControlValue};
use crate::tags;
use ldap_asn1::ber::decoder::{decode_boolean_value, decode_integer_value};
use ldap_asn1::{Asn1Container, BerTag, Grammar, StateId, Tlv};
use ldap_core::{DecodeError, DecodeResult, MessageId, ResultCode};
use once_cell::sync::Lazy;

const START: StateId = 0;
const MESSAGE_SEQ: StateId = 1;
const MESSAGE_ID: StateId = 2;
const OP_DONE: StateId = 3;
const CONTROLS_DONE: StateId = 4;

/// Operation tags and the grammar each one enters
const OPERATIONS: [(BerTag, LdapGrammar); 21] = [
    (tags::BIND_REQUEST, LdapGrammar::BindRequest),
    (tags::BIND_RESPONSE, LdapGrammar::BindResponse),
    (tags::UNBIND_REQUEST, LdapGrammar::UnbindRequest),
    (tags::SEARCH_REQUEST, LdapGrammar::SearchRequest),
    (tags::SEARCH_RESULT_ENTRY, LdapGrammar::SearchResultEntry),
    (tags::SEARCH_RESULT_DONE, LdapGrammar::SearchResultDone),
    (tags::SEARCH_RESULT_REFERENCE, LdapGrammar::SearchResultReference),
    (tags::MODIFY_REQUEST, LdapGrammar::ModifyRequest),
    (tags::MODIFY_RESPONSE, LdapGrammar::ModifyResponse),
    (tags::ADD_REQUEST, LdapGrammar::AddRequest),
    (tags::ADD_RESPONSE, LdapGrammar::AddResponse),
    (tags::DEL_REQUEST, LdapGrammar::DelRequest),
    (tags::DEL_RESPONSE, LdapGrammar::DelResponse),
    (tags::MODIFY_DN_REQUEST, LdapGrammar::ModifyDnRequest),
    (tags::MODIFY_DN_RESPONSE, LdapGrammar::ModifyDnResponse),
    (tags::COMPARE_REQUEST, LdapGrammar::CompareRequest),
    (tags::COMPARE_RESPONSE, LdapGrammar::CompareResponse),
    (tags::ABANDON_REQUEST, LdapGrammar::AbandonRequest),
    (tags::EXTENDED_REQUEST, LdapGrammar::ExtendedRequest),
    (tags::EXTENDED_RESPONSE, LdapGrammar::ExtendedResponse),
    (tags::INTERMEDIATE_RESPONSE, LdapGrammar::IntermediateResponse),
];

fn store_message_id(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let value = decode_integer_value(tlv.value())?;
    let message_id = u32::try_from(value)
        .ok()
        .and_then(MessageId::new)
        .ok_or(DecodeError::MessageIdOutOfRange(value))?;
    log::trace!("Message ID {}", message_id);
    container.set_message_id(message_id);
    Ok(())
}

pub(super) static MESSAGE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::Message,
        "LDAPMessage",
        &[
            ("START", 0),
            ("MESSAGE_SEQ", 0),
            ("MESSAGE_ID", 1),
            ("OP_DONE", 1),
            ("CONTROLS_DONE", 1),
        ],
    );
    grammar
        .on_pure(START, BerTag::SEQUENCE, MESSAGE_SEQ)
        .on(MESSAGE_SEQ, BerTag::INTEGER, MESSAGE_ID, store_message_id)
        .push(OP_DONE, tags::CONTROLS, LdapGrammar::Controls, CONTROLS_DONE);
    for (tag, op) in OPERATIONS {
        grammar.push(MESSAGE_ID, tag, op, OP_DONE);
    }
    grammar
});

const CONTROLS_START: StateId = 0;
const CONTROLS_SEQ: StateId = 1;
const CONTROL: StateId = 2;
const CONTROL_TYPE: StateId = 3;
const CRITICALITY: StateId = 4;
const CONTROL_VALUE: StateId = 5;

fn open_controls(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    // An empty Controls sequence is legal
    container.grammar_end_allowed(true);
    Ok(())
}

fn open_control(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.controls_mut().push(Control::new(String::new(), false, None));
    Ok(())
}

fn store_control_type(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let oid = ldap_string("controlType", tlv.value())?;
    if oid.is_empty() {
        return Err(DecodeError::invalid("controlType", "empty OID"));
    }
    last_mut(container.controls_mut(), "control")?.oid = oid;
    allow_end(container);
    Ok(())
}

fn store_criticality(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let criticality = decode_boolean_value(tlv.value())?;
    last_mut(container.controls_mut(), "control")?.criticality = criticality;
    allow_end(container);
    Ok(())
}

fn store_control_value(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let oid = last_mut(container.controls_mut(), "control")?.oid.clone();
    let value = match container.registry().decode(&oid, tlv.value()) {
        Ok(value) => value,
        Err(e) => {
            container.reject(
                ResultCode::ProtocolError,
                format!("Invalid value for control {}: {}", oid, e),
            );
            ControlValue::Raw(tlv.value().to_vec())
        }
    };
    last_mut(container.controls_mut(), "control")?.value = Some(value);
    allow_end(container);
    Ok(())
}

pub(super) static CONTROLS: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::Controls,
        "Controls",
        &[
            ("START", 0),
            ("CONTROLS", 0),
            ("CONTROL", 1),
            ("TYPE", 2),
            ("CRITICALITY", 2),
            ("VALUE", 2),
        ],
    );
    grammar
        .on(CONTROLS_START, tags::CONTROLS, CONTROLS_SEQ, open_controls)
        .on(CONTROLS_SEQ, BerTag::SEQUENCE, CONTROL, open_control)
        .on(CONTROL, BerTag::OCTET_STRING, CONTROL_TYPE, store_control_type)
        .on(CONTROL_TYPE, BerTag::BOOLEAN, CRITICALITY, store_criticality)
        .on(CONTROL_TYPE, BerTag::OCTET_STRING, CONTROL_VALUE, store_control_value)
        .on(CRITICALITY, BerTag::OCTET_STRING, CONTROL_VALUE, store_control_value)
        .on(CONTROL_TYPE, BerTag::SEQUENCE, CONTROL, open_control)
        .on(CRITICALITY, BerTag::SEQUENCE, CONTROL, open_control)
        .on(CONTROL_VALUE, BerTag::SEQUENCE, CONTROL, open_control);
    grammar
});
