//! Search filters
//!
//! ```text
//! Filter ::= CHOICE {
//!      and             [0] SET SIZE (1..MAX) OF filter Filter,
//!      or              [1] SET SIZE (1..MAX) OF filter Filter,
//!      not             [2] Filter,
//!      equalityMatch   [3] AttributeValueAssertion,
//!      substrings      [4] SubstringFilter,
//!      greaterOrEqual  [5] AttributeValueAssertion,
//!      lessOrEqual     [6] AttributeValueAssertion,
//!      present         [7] AttributeDescription,
//!      approxMatch     [8] AttributeValueAssertion,
//!      extensibleMatch [9] MatchingRuleAssertion,
//!      ...  }
//! ```
//!
//! The search grammar hands the whole filter TLV to [`Filter::decode`], which
//! parses it by recursive descent. Empty `and`/`or` sets are accepted as the
//! absolute true and false filters of RFC 4526.

use crate::encoder::{BerPass, Encodable, encode_value};
use crate::model::AttributeValueAssertion;
use crate::tags;
use ldap_asn1::ber::decoder::{decode_boolean_value, decode_utf8_value};
use ldap_asn1::{BerDecoder, BerTag};
use ldap_core::{DecodeError, DecodeResult, EncodeResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Search filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    EqualityMatch(AttributeValueAssertion),
    Substrings(SubstringFilter),
    GreaterOrEqual(AttributeValueAssertion),
    LessOrEqual(AttributeValueAssertion),
    Present(String),
    ApproxMatch(AttributeValueAssertion),
    ExtensibleMatch(MatchingRuleAssertion),
}

/// The match-all filter `(objectClass=*)`
impl Default for Filter {
    fn default() -> Self {
        Filter::Present("objectClass".to_string())
    }
}

/// `SubstringFilter ::= SEQUENCE { type, substrings SEQUENCE SIZE (1..MAX) OF substring }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstringFilter {
    pub attribute_type: String,
    /// At most one `Initial` (first) and one `Final` (last)
    pub substrings: Vec<Substring>,
}

/// One `substring` CHOICE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Substring {
    Initial(#[serde(with = "serde_bytes")] Vec<u8>),
    Any(#[serde(with = "serde_bytes")] Vec<u8>),
    Final(#[serde(with = "serde_bytes")] Vec<u8>),
}

/// `MatchingRuleAssertion ::= SEQUENCE { matchingRule [1], type [2], matchValue [3], dnAttributes [4] }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchingRuleAssertion {
    pub matching_rule: Option<String>,
    pub attribute_type: Option<String>,
    #[serde(with = "serde_bytes")]
    pub match_value: Vec<u8>,
    pub dn_attributes: bool,
}

fn invalid(reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidFilter(reason.into())
}

fn single_tlv(value: &[u8]) -> DecodeResult<(BerTag, &[u8])> {
    let mut decoder = BerDecoder::new(value);
    let tlv = decoder.decode_tlv()?;
    if decoder.has_remaining() {
        return Err(invalid("trailing bytes after filter"));
    }
    Ok(tlv)
}

fn decode_ava(value: &[u8]) -> DecodeResult<AttributeValueAssertion> {
    let mut decoder = BerDecoder::new(value);
    let attribute_desc = decode_utf8_value("attributeDesc", decoder.decode_octet_string()?)?;
    let assertion_value = decoder.decode_octet_string()?.to_vec();
    if decoder.has_remaining() {
        return Err(invalid("trailing bytes after assertion value"));
    }
    Ok(AttributeValueAssertion {
        attribute_desc,
        assertion_value,
    })
}

fn decode_substrings(value: &[u8]) -> DecodeResult<SubstringFilter> {
    let mut decoder = BerDecoder::new(value);
    let attribute_type = decode_utf8_value("type", decoder.decode_octet_string()?)?;
    let mut items = BerDecoder::new(decoder.decode_sequence()?);
    if decoder.has_remaining() {
        return Err(invalid("trailing bytes after substrings"));
    }

    let mut substrings = Vec::new();
    while items.has_remaining() {
        let (tag, bytes) = items.decode_tlv()?;
        let substring = match tag {
            tags::SUBSTRING_INITIAL if substrings.is_empty() => Substring::Initial(bytes.to_vec()),
            tags::SUBSTRING_ANY => Substring::Any(bytes.to_vec()),
            tags::SUBSTRING_FINAL if !items.has_remaining() => Substring::Final(bytes.to_vec()),
            other => return Err(invalid(format!("misplaced substring {}", other))),
        };
        substrings.push(substring);
    }
    if substrings.is_empty() {
        return Err(invalid("substrings filter without substrings"));
    }
    Ok(SubstringFilter {
        attribute_type,
        substrings,
    })
}

fn decode_extensible(value: &[u8]) -> DecodeResult<MatchingRuleAssertion> {
    let mut decoder = BerDecoder::new(value);
    let mut assertion = MatchingRuleAssertion::default();

    if decoder.peek_tag()? == Some(tags::MATCHING_RULE) {
        let bytes = decoder.decode_expected(tags::MATCHING_RULE)?;
        assertion.matching_rule = Some(decode_utf8_value("matchingRule", bytes)?);
    }
    if decoder.peek_tag()? == Some(tags::MATCHING_TYPE) {
        let bytes = decoder.decode_expected(tags::MATCHING_TYPE)?;
        assertion.attribute_type = Some(decode_utf8_value("type", bytes)?);
    }
    if assertion.matching_rule.is_none() && assertion.attribute_type.is_none() {
        return Err(invalid("extensible match without rule or type"));
    }
    assertion.match_value = decoder.decode_expected(tags::MATCH_VALUE)?.to_vec();
    if decoder.peek_tag()? == Some(tags::DN_ATTRIBUTES) {
        assertion.dn_attributes = decode_boolean_value(decoder.decode_expected(tags::DN_ATTRIBUTES)?)?;
    }
    if decoder.has_remaining() {
        return Err(invalid("trailing bytes after extensible match"));
    }
    Ok(assertion)
}

impl Filter {
    /// Decode a filter from its tag and value bytes
    ///
    /// # Arguments
    /// * `tag` - One of the filter CHOICE tags
    /// * `value` - Value bytes of that TLV
    /// * `max_depth` - Deepest accepted nesting of `and`/`or`/`not`
    ///
    /// # Errors
    /// Every failure is reported as [`DecodeError::InvalidFilter`].
    pub fn decode(tag: BerTag, value: &[u8], max_depth: usize) -> DecodeResult<Filter> {
        Self::decode_nested(tag, value, 1, max_depth).map_err(|e| match e {
            DecodeError::InvalidFilter(_) => e,
            other => DecodeError::InvalidFilter(other.to_string()),
        })
    }

    /// Decode a complete filter TLV
    pub fn from_ber(bytes: &[u8], max_depth: usize) -> DecodeResult<Filter> {
        let (tag, value) =
            single_tlv(bytes).map_err(|e| DecodeError::InvalidFilter(e.to_string()))?;
        Self::decode(tag, value, max_depth)
    }

    fn decode_nested(tag: BerTag, value: &[u8], depth: usize, max_depth: usize) -> DecodeResult<Filter> {
        if depth > max_depth {
            return Err(invalid(format!("nesting deeper than {}", max_depth)));
        }
        let filter = match tag {
            tags::FILTER_AND => Filter::And(Self::decode_set(value, depth, max_depth)?),
            tags::FILTER_OR => Filter::Or(Self::decode_set(value, depth, max_depth)?),
            tags::FILTER_NOT => {
                let (inner_tag, inner) = single_tlv(value)?;
                Filter::Not(Box::new(Self::decode_nested(
                    inner_tag,
                    inner,
                    depth + 1,
                    max_depth,
                )?))
            }
            tags::FILTER_EQUALITY => Filter::EqualityMatch(decode_ava(value)?),
            tags::FILTER_SUBSTRINGS => Filter::Substrings(decode_substrings(value)?),
            tags::FILTER_GREATER_OR_EQUAL => Filter::GreaterOrEqual(decode_ava(value)?),
            tags::FILTER_LESS_OR_EQUAL => Filter::LessOrEqual(decode_ava(value)?),
            tags::FILTER_PRESENT => Filter::Present(decode_utf8_value("present", value)?),
            tags::FILTER_APPROX => Filter::ApproxMatch(decode_ava(value)?),
            tags::FILTER_EXTENSIBLE => Filter::ExtensibleMatch(decode_extensible(value)?),
            other => return Err(invalid(format!("unknown filter choice {}", other))),
        };
        Ok(filter)
    }

    fn decode_set(value: &[u8], depth: usize, max_depth: usize) -> DecodeResult<Vec<Filter>> {
        let mut decoder = BerDecoder::new(value);
        let mut filters = Vec::new();
        while decoder.has_remaining() {
            let (tag, inner) = decoder.decode_tlv()?;
            filters.push(Self::decode_nested(tag, inner, depth + 1, max_depth)?);
        }
        Ok(filters)
    }

    /// Encode the filter as one TLV
    pub fn to_ber(&self) -> EncodeResult<Vec<u8>> {
        Ok(encode_value(self)?.to_vec())
    }

    /// Nesting depth (1 for a leaf filter)
    pub fn depth(&self) -> usize {
        match self {
            Filter::And(filters) | Filter::Or(filters) => {
                1 + filters.iter().map(Filter::depth).max().unwrap_or(0)
            }
            Filter::Not(inner) => 1 + inner.depth(),
            _ => 1,
        }
    }
}

fn walk_ava<P: BerPass>(
    pass: &mut P,
    tag: BerTag,
    ava: &AttributeValueAssertion,
) -> EncodeResult<usize> {
    pass.nested(tag, |pass| {
        let len = pass.primitive(BerTag::OCTET_STRING, ava.attribute_desc.as_bytes())?;
        Ok(len + pass.primitive(BerTag::OCTET_STRING, &ava.assertion_value)?)
    })
}

fn walk_set<P: BerPass>(pass: &mut P, tag: BerTag, filters: &[Filter]) -> EncodeResult<usize> {
    pass.nested(tag, |pass| {
        let mut len = 0;
        for filter in filters {
            len += filter.walk(pass)?;
        }
        Ok(len)
    })
}

impl Encodable for Filter {
    fn walk<P: BerPass>(&self, pass: &mut P) -> EncodeResult<usize> {
        match self {
            Filter::And(filters) => walk_set(pass, tags::FILTER_AND, filters),
            Filter::Or(filters) => walk_set(pass, tags::FILTER_OR, filters),
            Filter::Not(inner) => pass.nested(tags::FILTER_NOT, |pass| inner.walk(pass)),
            Filter::EqualityMatch(ava) => walk_ava(pass, tags::FILTER_EQUALITY, ava),
            Filter::Substrings(substrings) => pass.nested(tags::FILTER_SUBSTRINGS, |pass| {
                let len =
                    pass.primitive(BerTag::OCTET_STRING, substrings.attribute_type.as_bytes())?;
                Ok(len
                    + pass.nested(BerTag::SEQUENCE, |pass| {
                        let mut len = 0;
                        for substring in &substrings.substrings {
                            len += match substring {
                                Substring::Initial(v) => pass.primitive(tags::SUBSTRING_INITIAL, v)?,
                                Substring::Any(v) => pass.primitive(tags::SUBSTRING_ANY, v)?,
                                Substring::Final(v) => pass.primitive(tags::SUBSTRING_FINAL, v)?,
                            };
                        }
                        Ok(len)
                    })?)
            }),
            Filter::GreaterOrEqual(ava) => walk_ava(pass, tags::FILTER_GREATER_OR_EQUAL, ava),
            Filter::LessOrEqual(ava) => walk_ava(pass, tags::FILTER_LESS_OR_EQUAL, ava),
            Filter::Present(attribute) => pass.primitive(tags::FILTER_PRESENT, attribute.as_bytes()),
            Filter::ApproxMatch(ava) => walk_ava(pass, tags::FILTER_APPROX, ava),
            Filter::ExtensibleMatch(assertion) => pass.nested(tags::FILTER_EXTENSIBLE, |pass| {
                let mut len = 0;
                if let Some(rule) = &assertion.matching_rule {
                    len += pass.primitive(tags::MATCHING_RULE, rule.as_bytes())?;
                }
                if let Some(attribute) = &assertion.attribute_type {
                    len += pass.primitive(tags::MATCHING_TYPE, attribute.as_bytes())?;
                }
                len += pass.primitive(tags::MATCH_VALUE, &assertion.match_value)?;
                if assertion.dn_attributes {
                    len += pass.boolean(tags::DN_ATTRIBUTES, true)?;
                }
                Ok(len)
            }),
        }
    }
}

/// Append an assertion value in RFC 4515 escaped form
fn escape_value(out: &mut String, value: &[u8]) {
    match std::str::from_utf8(value) {
        Ok(text) => {
            for c in text.chars() {
                match c {
                    '*' | '(' | ')' | '\\' | '\0' => {
                        let _ = write!(out, "\\{:02x}", c as u32);
                    }
                    _ => out.push(c),
                }
            }
        }
        Err(_) => {
            for byte in value {
                let _ = write!(out, "\\{:02x}", byte);
            }
        }
    }
}

/// RFC 4515 string representation, e.g. `(&(objectClass=person)(cn=Al*))`
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let (attribute, operator, value) = match self {
            Filter::And(filters) | Filter::Or(filters) => {
                f.write_str(if matches!(self, Filter::And(_)) { "(&" } else { "(|" })?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                return f.write_str(")");
            }
            Filter::Not(inner) => return write!(f, "(!{})", inner),
            Filter::Present(attribute) => return write!(f, "({}=*)", attribute),
            Filter::Substrings(substrings) => {
                for substring in &substrings.substrings {
                    match substring {
                        Substring::Initial(v) => escape_value(&mut out, v),
                        Substring::Any(v) => {
                            if !out.ends_with('*') {
                                out.push('*');
                            }
                            escape_value(&mut out, v);
                            out.push('*');
                        }
                        Substring::Final(v) => {
                            if !out.ends_with('*') {
                                out.push('*');
                            }
                            escape_value(&mut out, v);
                        }
                    }
                }
                if matches!(substrings.substrings.last(), Some(Substring::Initial(_))) {
                    out.push('*');
                }
                return write!(f, "({}={})", substrings.attribute_type, out);
            }
            Filter::ExtensibleMatch(assertion) => {
                f.write_str("(")?;
                if let Some(attribute) = &assertion.attribute_type {
                    f.write_str(attribute)?;
                }
                if assertion.dn_attributes {
                    f.write_str(":dn")?;
                }
                if let Some(rule) = &assertion.matching_rule {
                    write!(f, ":{}", rule)?;
                }
                escape_value(&mut out, &assertion.match_value);
                return write!(f, ":={})", out);
            }
            Filter::EqualityMatch(ava) => (&ava.attribute_desc, "=", &ava.assertion_value),
            Filter::GreaterOrEqual(ava) => (&ava.attribute_desc, ">=", &ava.assertion_value),
            Filter::LessOrEqual(ava) => (&ava.attribute_desc, "<=", &ava.assertion_value),
            Filter::ApproxMatch(ava) => (&ava.attribute_desc, "~=", &ava.assertion_value),
        };
        escape_value(&mut out, value);
        write!(f, "({}{}{})", attribute, operator, out)
    }
}
