//! Search grammars
//!
//! ```text
//! SearchRequest ::= [APPLICATION 3] SEQUENCE {
//!      baseObject      LDAPDN,
//!      scope           ENUMERATED { baseObject, singleLevel, wholeSubtree },
//!      derefAliases    ENUMERATED { ... },
//!      sizeLimit       INTEGER (0 ..  maxInt),
//!      timeLimit       INTEGER (0 ..  maxInt),
//!      typesOnly       BOOLEAN,
//!      filter          Filter,
//!      attributes      AttributeSelection }
//!
//! SearchResultEntry ::= [APPLICATION 4] SEQUENCE {
//!      objectName      LDAPDN,
//!      attributes      PartialAttributeList }
//!
//! SearchResultReference ::= [APPLICATION 19] SEQUENCE SIZE (1..MAX) OF uri URI
//!
//! SearchResultDone ::= [APPLICATION 5] LDAPResult
//! ```
//!
//! The filter is the one recursive construct of the protocol. It is read
//! as a single opaque TLV and handed to [`Filter::decode`].

use super::LdapGrammar;
use super::actions::{allow_end, enumerated, last_mut, ldap_string, request_dn};
use super::result::{response_grammar, start_result};
use crate::container::LdapContainer;
use crate::filter::Filter;
use crate::model::{
    DerefAliases, PartialAttribute, ProtocolOp, SearchRequest, SearchResultEntry,
    SearchResultReference, SearchScope,
};
use crate::tags;
use ldap_asn1::ber::decoder::{decode_boolean_value, decode_integer_in_range};
use ldap_asn1::{BerTag, Grammar, StateId, Tlv};
use ldap_core::{DecodeResult, MessageId};
use once_cell::sync::Lazy;

const START: StateId = 0;
const SEARCH: StateId = 1;
const BASE_OBJECT: StateId = 2;
const SCOPE: StateId = 3;
const DEREF_ALIASES: StateId = 4;
const SIZE_LIMIT: StateId = 5;
const TIME_LIMIT: StateId = 6;
const TYPES_ONLY: StateId = 7;
const FILTER: StateId = 8;
const ATTRIBUTES: StateId = 9;
const ATTRIBUTE: StateId = 10;

const FILTER_TAGS: [BerTag; 10] = [
    tags::FILTER_AND,
    tags::FILTER_OR,
    tags::FILTER_NOT,
    tags::FILTER_EQUALITY,
    tags::FILTER_SUBSTRINGS,
    tags::FILTER_GREATER_OR_EQUAL,
    tags::FILTER_LESS_OR_EQUAL,
    tags::FILTER_PRESENT,
    tags::FILTER_APPROX,
    tags::FILTER_EXTENSIBLE,
];

fn start_search_request(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::SearchRequest(SearchRequest::default()));
    Ok(())
}

fn store_base_object(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let base = request_dn(container, "baseObject", tlv.value());
    container.search_request()?.base_object = base;
    Ok(())
}

fn store_scope(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let scope = enumerated(container, "scope", tlv.value(), SearchScope::from_i64)?;
    container.search_request()?.scope = scope;
    Ok(())
}

fn store_deref_aliases(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let deref = enumerated(container, "derefAliases", tlv.value(), DerefAliases::from_i64)?;
    container.search_request()?.deref_aliases = deref;
    Ok(())
}

fn store_size_limit(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let limit = decode_integer_in_range("sizeLimit", tlv.value(), 0, MessageId::MAX as i64)?;
    container.search_request()?.size_limit = limit as u32;
    Ok(())
}

fn store_time_limit(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let limit = decode_integer_in_range("timeLimit", tlv.value(), 0, MessageId::MAX as i64)?;
    container.search_request()?.time_limit = limit as u32;
    Ok(())
}

fn store_types_only(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.search_request()?.types_only = decode_boolean_value(tlv.value())?;
    Ok(())
}

fn store_filter(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let filter = Filter::decode(tlv.tag(), tlv.value(), container.config().max_filter_depth)?;
    log::trace!("Search filter {}", filter);
    container.search_request()?.filter = filter;
    Ok(())
}

fn open_attributes(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    allow_end(container);
    Ok(())
}

fn store_attribute(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let selector = ldap_string("attributes", tlv.value())?;
    container.search_request()?.attributes.push(selector);
    allow_end(container);
    Ok(())
}

pub(super) static SEARCH_REQUEST: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::SearchRequest,
        "SearchRequest",
        &[
            ("START", 0),
            ("SEARCH", 0),
            ("BASE_OBJECT", 1),
            ("SCOPE", 1),
            ("DEREF_ALIASES", 1),
            ("SIZE_LIMIT", 1),
            ("TIME_LIMIT", 1),
            ("TYPES_ONLY", 1),
            ("FILTER", 1),
            ("ATTRIBUTES", 1),
            ("ATTRIBUTE", 2),
        ],
    );
    grammar
        .on(START, tags::SEARCH_REQUEST, SEARCH, start_search_request)
        .on(SEARCH, BerTag::OCTET_STRING, BASE_OBJECT, store_base_object)
        .on(BASE_OBJECT, BerTag::ENUMERATED, SCOPE, store_scope)
        .on(SCOPE, BerTag::ENUMERATED, DEREF_ALIASES, store_deref_aliases)
        .on(DEREF_ALIASES, BerTag::INTEGER, SIZE_LIMIT, store_size_limit)
        .on(SIZE_LIMIT, BerTag::INTEGER, TIME_LIMIT, store_time_limit)
        .on(TIME_LIMIT, BerTag::BOOLEAN, TYPES_ONLY, store_types_only)
        .on(FILTER, BerTag::SEQUENCE, ATTRIBUTES, open_attributes)
        .on(ATTRIBUTES, BerTag::OCTET_STRING, ATTRIBUTE, store_attribute)
        .on(ATTRIBUTE, BerTag::OCTET_STRING, ATTRIBUTE, store_attribute);
    for tag in FILTER_TAGS {
        grammar.on_opaque(TYPES_ONLY, tag, FILTER, store_filter);
    }
    grammar
});

const ENTRY_START: StateId = 0;
const ENTRY: StateId = 1;
const OBJECT_NAME: StateId = 2;
const ENTRY_ATTRIBUTES: StateId = 3;
const ENTRY_ATTRIBUTE: StateId = 4;
const ENTRY_TYPE: StateId = 5;
const ENTRY_VALUES: StateId = 6;
const ENTRY_VALUE: StateId = 7;

fn start_search_result_entry(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::SearchResultEntry(SearchResultEntry::default()));
    Ok(())
}

fn store_object_name(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    container.search_result_entry()?.object_name = ldap_string("objectName", tlv.value())?;
    Ok(())
}

fn open_entry_attribute(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container
        .search_result_entry()?
        .attributes
        .push(PartialAttribute::default());
    Ok(())
}

fn store_entry_type(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let attribute_type = ldap_string("type", tlv.value())?;
    let entry = container.search_result_entry()?;
    last_mut(&mut entry.attributes, "attribute")?.attribute_type = attribute_type;
    Ok(())
}

fn store_entry_value(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let entry = container.search_result_entry()?;
    last_mut(&mut entry.attributes, "attribute")?
        .values
        .push(tlv.value().to_vec());
    allow_end(container);
    Ok(())
}

pub(super) static SEARCH_RESULT_ENTRY: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::SearchResultEntry,
        "SearchResultEntry",
        &[
            ("START", 0),
            ("ENTRY", 0),
            ("OBJECT_NAME", 1),
            ("ATTRIBUTES", 1),
            ("ATTRIBUTE", 2),
            ("TYPE", 3),
            ("VALUES", 3),
            ("VALUE", 4),
        ],
    );
    grammar
        .on(ENTRY_START, tags::SEARCH_RESULT_ENTRY, ENTRY, start_search_result_entry)
        .on(ENTRY, BerTag::OCTET_STRING, OBJECT_NAME, store_object_name)
        .on(OBJECT_NAME, BerTag::SEQUENCE, ENTRY_ATTRIBUTES, open_attributes)
        .on(ENTRY_ATTRIBUTES, BerTag::SEQUENCE, ENTRY_ATTRIBUTE, open_entry_attribute)
        .on(ENTRY_ATTRIBUTE, BerTag::OCTET_STRING, ENTRY_TYPE, store_entry_type)
        // A partial attribute may have no values
        .on(ENTRY_TYPE, BerTag::SET, ENTRY_VALUES, open_attributes)
        .on(ENTRY_VALUES, BerTag::OCTET_STRING, ENTRY_VALUE, store_entry_value)
        .on(ENTRY_VALUE, BerTag::OCTET_STRING, ENTRY_VALUE, store_entry_value)
        .on(ENTRY_VALUES, BerTag::SEQUENCE, ENTRY_ATTRIBUTE, open_entry_attribute)
        .on(ENTRY_VALUE, BerTag::SEQUENCE, ENTRY_ATTRIBUTE, open_entry_attribute);
    grammar
});

const REFERENCE_START: StateId = 0;
const REFERENCE: StateId = 1;
const URI: StateId = 2;

fn start_search_result_reference(container: &mut LdapContainer, _tlv: &Tlv) -> DecodeResult<()> {
    container.start_op(ProtocolOp::SearchResultReference(SearchResultReference::default()));
    Ok(())
}

fn store_uri(container: &mut LdapContainer, tlv: &Tlv) -> DecodeResult<()> {
    let uri = ldap_string("uri", tlv.value())?;
    container.search_result_reference()?.uris.push(uri);
    allow_end(container);
    Ok(())
}

pub(super) static SEARCH_RESULT_REFERENCE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    let mut grammar = Grammar::new(
        LdapGrammar::SearchResultReference,
        "SearchResultReference",
        &[("START", 0), ("REFERENCE", 0), ("URI", 1)],
    );
    grammar
        .on(REFERENCE_START, tags::SEARCH_RESULT_REFERENCE, REFERENCE, start_search_result_reference)
        .on(REFERENCE, BerTag::OCTET_STRING, URI, store_uri)
        .on(URI, BerTag::OCTET_STRING, URI, store_uri);
    grammar
});

pub(super) static SEARCH_RESULT_DONE: Lazy<Grammar<LdapContainer>> = Lazy::new(|| {
    response_grammar(
        LdapGrammar::SearchResultDone,
        "SearchResultDone",
        tags::SEARCH_RESULT_DONE,
        |container, _| start_result(container, ProtocolOp::SearchResultDone),
    )
});

#[cfg(test)]
mod tests {
    use super::super::test_support::{decode, decode_message, decode_rejected};
    use crate::filter::Filter;
    use crate::model::{
        AttributeValueAssertion, DerefAliases, PartialAttribute, ProtocolOp, SearchScope,
    };
    use ldap_core::{DecodeError, ResultCode};

    /// base "", scope 2, deref 0, size 0, time 0, typesOnly false, then `filter_and_attrs`
    fn search_request(filter_and_attrs: &[u8]) -> Vec<u8> {
        let mut op = vec![
            0x04, 0x00, 0x0A, 0x01, 0x02, 0x0A, 0x01, 0x00, 0x02, 0x01, 0x00, 0x02, 0x01, 0x00,
            0x01, 0x01, 0x00,
        ];
        op.extend_from_slice(filter_and_attrs);
        let mut message = vec![0x02, 0x01, 0x07, 0x63, op.len() as u8];
        message.extend_from_slice(&op);
        let mut bytes = vec![0x30, message.len() as u8];
        bytes.extend_from_slice(&message);
        bytes
    }

    #[test]
    fn test_search_request() {
        // (cn=x), attributes [cn, *]
        let bytes = search_request(&[
            0xA3, 0x07, 0x04, 0x02, b'c', b'n', 0x04, 0x01, b'x', 0x30, 0x07, 0x04, 0x02, b'c',
            b'n', 0x04, 0x01, b'*',
        ]);
        let message = decode_message(&bytes);
        match message.op {
            ProtocolOp::SearchRequest(request) => {
                assert_eq!(request.scope, SearchScope::WholeSubtree);
                assert_eq!(request.deref_aliases, DerefAliases::NeverDerefAliases);
                assert_eq!(
                    request.filter,
                    Filter::EqualityMatch(AttributeValueAssertion::new("cn", "x"))
                );
                assert_eq!(request.attributes, vec!["cn".to_string(), "*".to_string()]);
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_present_filter_without_attributes() {
        let bytes = search_request(&[
            0x87, 0x0B, b'o', b'b', b'j', b'e', b'c', b't', b'C', b'l', b'a', b's', b's', 0x30,
            0x00,
        ]);
        let message = decode_message(&bytes);
        match message.op {
            ProtocolOp::SearchRequest(request) => {
                assert_eq!(request.filter, Filter::Present("objectClass".to_string()));
                assert!(request.attributes.is_empty());
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_missing_attribute_selection() {
        let bytes = search_request(&[0x87, 0x02, b'c', b'n']);
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnexpectedEnd { grammar: "SearchRequest", state: "FILTER" })
        ));
    }

    #[test]
    fn test_malformed_filter_is_fatal() {
        // equalityMatch missing its assertion value
        let bytes = search_request(&[0xA3, 0x04, 0x04, 0x02, b'c', b'n', 0x30, 0x00]);
        assert!(matches!(decode(&bytes), Err(DecodeError::InvalidFilter(_))));
    }

    #[test]
    fn test_invalid_scope_rejects() {
        let mut bytes = search_request(&[0x87, 0x02, b'c', b'n', 0x30, 0x00]);
        // scope value
        bytes[11] = 0x05;
        let invalid = decode_rejected(&bytes);
        assert_eq!(invalid.result_code, ResultCode::ProtocolError);
        assert_eq!(invalid.message_id.value(), 7);
    }

    #[test]
    fn test_search_result_entry() {
        let bytes = [
            0x30, 0x1F, 0x02, 0x01, 0x07, 0x64, 0x1A, 0x04, 0x04, b'c', b'n', b'=', b'a', 0x30,
            0x12, 0x30, 0x08, 0x04, 0x02, b'c', b'n', 0x31, 0x02, 0x04, 0x00, 0x30, 0x06, 0x04,
            0x02, b's', b'n', 0x31, 0x00,
        ];
        let message = decode_message(&bytes);
        match message.op {
            ProtocolOp::SearchResultEntry(entry) => {
                assert_eq!(entry.object_name, "cn=a");
                assert_eq!(
                    entry.attributes,
                    vec![
                        PartialAttribute::new("cn", [Vec::<u8>::new()]),
                        PartialAttribute::new("sn", Vec::<Vec<u8>>::new()),
                    ]
                );
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_search_result_reference_requires_uri() {
        let bytes = [0x30, 0x05, 0x02, 0x01, 0x07, 0x73, 0x00];
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnexpectedEnd { grammar: "SearchResultReference", .. })
        ));
    }
}
