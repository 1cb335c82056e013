//! Abandon grammar
//!
//! ```text
//! AbandonRequest ::= [APPLICATION 16] MessageID
//! ```

use super::LdapGrammar;
use super::actions::allow_end;
use crate::container::LdapContainer;
use crate::model::{AbandonRequest, ProtocolOp};
use crate::tags;
use ldap_asn1::ber::decoder::decode_integer_value;
use ldap_asn1::{Grammar, StateId, Tlv};
use ldap_core::{DecodeError, DecodeResult, MessageId};
use once_cell::sync::Lazy;

const START: StateId = 0;
const ABANDON: StateId = 1;

fn store_abandon_request(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let value = decode_integer_value(tlv.value())?;
    let target = u32::try_from(value)
        .ok()
        .and_then(MessageId::new)
        .ok_or(DecodeError::MessageIdOutOfRange(value))?;
    container.start_op(ProtocolOp::AbandonRequest(AbandonRequest { target }));
    allow_end(container);
    Ok(())
}

pub(super) static ABANDON_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::AbandonRequest,
        "AbandonRequest",
        &[("START", 0), ("ABANDON", 0)],
    );
    grammar.on(START, tags::ABANDON_REQUEST, ABANDON, store_abandon_request);
    grammar
});
