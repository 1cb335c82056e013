//! Controls and the control value decoder registry
//!
//! ```text
//! Control ::= SEQUENCE {
//!      controlType             LDAPOID,
//!      criticality             BOOLEAN DEFAULT FALSE,
//!      controlValue            OCTET STRING OPTIONAL }
//! ```
//!
//! The `controlValue` is an opaque OCTET STRING whose content depends on the
//! control type. A [`ControlRegistry`] maps control OIDs to decoders for that
//! content. Values of unregistered controls are kept as raw bytes, decoded
//! values must be in the one encoding the codec writes back (minimal lengths
//! and integers, BOOLEAN TRUE as `FF`), so every control round-trips whether
//! the codec understands it or not.
//!
//! # Usage Example
//!
//! ```rust
//! use ldap_codec::controls::{ControlRegistry, ControlValue, PAGED_RESULTS_OID};
//!
//! let registry = ControlRegistry::with_defaults();
//! let value = registry
//!     .decode(PAGED_RESULTS_OID, &[0x30, 0x05, 0x02, 0x01, 0x0A, 0x04, 0x00])
//!     .unwrap();
//! assert_eq!(value, ControlValue::PagedResults { size: 10, cookie: Vec::new() });
//!
//! let raw = registry.decode("1.2.3.4", &[0x01, 0x02]).unwrap();
//! assert_eq!(raw, ControlValue::Raw(vec![0x01, 0x02]));
//! ```

use crate::encoder::{BerPass, Encodable, encode_value};
use ldap_asn1::ber::decoder::{decode_integer_in_range, decode_utf8_value};
use ldap_asn1::{BerDecoder, BerTag};
use ldap_core::{DecodeError, DecodeResult, EncodeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// ManageDsaIT (RFC 3296), no value
pub const MANAGE_DSA_IT_OID: &str = "2.16.840.1.113730.3.4.2";
/// Simple paged results (RFC 2696)
pub const PAGED_RESULTS_OID: &str = "1.2.840.113556.1.4.319";
/// Subentries (RFC 3672)
pub const SUBENTRIES_OID: &str = "1.3.6.1.4.1.4203.1.10.1";
/// Persistent search (draft-ietf-ldapext-psearch)
pub const PERSISTENT_SEARCH_OID: &str = "2.16.840.1.113730.3.4.3";
/// Entry change notification (draft-ietf-ldapext-psearch)
pub const ENTRY_CHANGE_OID: &str = "2.16.840.1.113730.3.4.7";

const MAX_INT: i64 = 0x7FFF_FFFF;

/// One control of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub oid: String,
    pub criticality: bool,
    pub value: Option<ControlValue>,
}

impl Control {
    /// Create a control
    pub fn new(oid: impl Into<String>, criticality: bool, value: Option<ControlValue>) -> Self {
        Self {
            oid: oid.into(),
            criticality,
            value,
        }
    }

    /// Create a control carrying raw value bytes
    pub fn raw(oid: impl Into<String>, criticality: bool, value: impl Into<Vec<u8>>) -> Self {
        Self::new(oid, criticality, Some(ControlValue::Raw(value.into())))
    }
}

impl Encodable for Control {
    fn walk<P: BerPass>(&self, pass: &mut P) -> EncodeResult<usize> {
        pass.nested(BerTag::SEQUENCE, |pass| {
            let mut len = pass.primitive(BerTag::OCTET_STRING, self.oid.as_bytes())?;
            // DEFAULT FALSE is omitted
            if self.criticality {
                len += pass.boolean(BerTag::BOOLEAN, true)?;
            }
            if let Some(value) = &self.value {
                len += pass.nested(BerTag::OCTET_STRING, |pass| value.walk(pass))?;
            }
            Ok(len)
        })
    }
}

/// Decoded `controlValue`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlValue {
    /// Value of a control without a registered decoder
    Raw(#[serde(with = "serde_bytes")] Vec<u8>),
    /// `realSearchControlValue ::= SEQUENCE { size INTEGER (0..maxInt), cookie OCTET STRING }`
    PagedResults {
        size: u32,
        #[serde(with = "serde_bytes")]
        cookie: Vec<u8>,
    },
    /// `visibility BOOLEAN`
    Subentries { visibility: bool },
    /// `PersistentSearch ::= SEQUENCE { changeTypes INTEGER, changesOnly BOOLEAN, returnECs BOOLEAN }`
    PersistentSearch {
        change_types: u32,
        changes_only: bool,
        return_ecs: bool,
    },
    /// `EntryChangeNotification ::= SEQUENCE { changeType ENUMERATED, previousDN LDAPDN OPTIONAL, changeNumber INTEGER OPTIONAL }`
    EntryChange {
        change_type: u32,
        previous_dn: Option<String>,
        change_number: Option<i64>,
    },
}

impl ControlValue {
    /// Encoded value bytes, as carried in `controlValue`
    pub fn to_bytes(&self) -> EncodeResult<Vec<u8>> {
        Ok(encode_value(self)?.to_vec())
    }
}

impl Encodable for ControlValue {
    fn walk<P: BerPass>(&self, pass: &mut P) -> EncodeResult<usize> {
        match self {
            ControlValue::Raw(bytes) => pass.raw(bytes),
            ControlValue::PagedResults { size, cookie } => pass.nested(BerTag::SEQUENCE, |pass| {
                let len = pass.integer(BerTag::INTEGER, *size as i64)?;
                Ok(len + pass.primitive(BerTag::OCTET_STRING, cookie)?)
            }),
            ControlValue::Subentries { visibility } => pass.boolean(BerTag::BOOLEAN, *visibility),
            ControlValue::PersistentSearch {
                change_types,
                changes_only,
                return_ecs,
            } => pass.nested(BerTag::SEQUENCE, |pass| {
                let mut len = pass.integer(BerTag::INTEGER, *change_types as i64)?;
                len += pass.boolean(BerTag::BOOLEAN, *changes_only)?;
                len += pass.boolean(BerTag::BOOLEAN, *return_ecs)?;
                Ok(len)
            }),
            ControlValue::EntryChange {
                change_type,
                previous_dn,
                change_number,
            } => pass.nested(BerTag::SEQUENCE, |pass| {
                let mut len = pass.integer(BerTag::ENUMERATED, *change_type as i64)?;
                if let Some(dn) = previous_dn {
                    len += pass.primitive(BerTag::OCTET_STRING, dn.as_bytes())?;
                }
                if let Some(number) = change_number {
                    len += pass.integer(BerTag::INTEGER, *number)?;
                }
                Ok(len)
            }),
        }
    }
}

/// Decoder for the value of one control type
///
/// Implemented for any `Fn(&[u8]) -> DecodeResult<ControlValue>`, so plain
/// functions and closures can be registered directly.
pub trait ControlDecoder: Send + Sync {
    /// Decode the content of `controlValue`
    fn decode(&self, value: &[u8]) -> DecodeResult<ControlValue>;
}

impl<F> ControlDecoder for F
where
    F: Fn(&[u8]) -> DecodeResult<ControlValue> + Send + Sync,
{
    fn decode(&self, value: &[u8]) -> DecodeResult<ControlValue> {
        self(value)
    }
}

fn ensure_consumed(decoder: &BerDecoder<'_>, field: &'static str) -> DecodeResult<()> {
    if decoder.has_remaining() {
        return Err(DecodeError::invalid(field, "trailing bytes"));
    }
    Ok(())
}

fn decode_manage_dsa_it(_value: &[u8]) -> DecodeResult<ControlValue> {
    Err(DecodeError::invalid("ManageDsaIT", "control must not carry a value"))
}

fn decode_paged_results(value: &[u8]) -> DecodeResult<ControlValue> {
    let mut outer = BerDecoder::new(value);
    let mut decoder = BerDecoder::new(outer.decode_sequence()?);
    ensure_consumed(&outer, "pagedResults")?;
    let size = decode_integer_in_range("size", decoder.decode_expected(BerTag::INTEGER)?, 0, MAX_INT)?;
    let cookie = decoder.decode_octet_string()?.to_vec();
    ensure_consumed(&decoder, "pagedResults")?;
    Ok(ControlValue::PagedResults {
        size: size as u32,
        cookie,
    })
}

fn decode_subentries(value: &[u8]) -> DecodeResult<ControlValue> {
    let mut decoder = BerDecoder::new(value);
    let visibility = decoder.decode_boolean()?;
    ensure_consumed(&decoder, "subentries")?;
    Ok(ControlValue::Subentries { visibility })
}

fn decode_persistent_search(value: &[u8]) -> DecodeResult<ControlValue> {
    let mut outer = BerDecoder::new(value);
    let mut decoder = BerDecoder::new(outer.decode_sequence()?);
    ensure_consumed(&outer, "persistentSearch")?;
    let change_types = decode_integer_in_range(
        "changeTypes",
        decoder.decode_expected(BerTag::INTEGER)?,
        1,
        15,
    )?;
    let changes_only = decoder.decode_boolean()?;
    let return_ecs = decoder.decode_boolean()?;
    ensure_consumed(&decoder, "persistentSearch")?;
    Ok(ControlValue::PersistentSearch {
        change_types: change_types as u32,
        changes_only,
        return_ecs,
    })
}

fn decode_entry_change(value: &[u8]) -> DecodeResult<ControlValue> {
    let mut outer = BerDecoder::new(value);
    let mut decoder = BerDecoder::new(outer.decode_sequence()?);
    ensure_consumed(&outer, "entryChange")?;
    let change_type = decoder.decode_enumerated()?;
    if ![1, 2, 4, 8].contains(&change_type) {
        return Err(DecodeError::invalid(
            "changeType",
            format!("{} is not one of add(1), delete(2), modify(4), modDN(8)", change_type),
        ));
    }
    let mut previous_dn = None;
    if decoder.peek_tag()? == Some(BerTag::OCTET_STRING) {
        previous_dn = Some(decode_utf8_value("previousDN", decoder.decode_octet_string()?)?);
    }
    let mut change_number = None;
    if decoder.peek_tag()? == Some(BerTag::INTEGER) {
        change_number = Some(decoder.decode_integer()?);
    }
    ensure_consumed(&decoder, "entryChange")?;
    Ok(ControlValue::EntryChange {
        change_type: change_type as u32,
        previous_dn,
        change_number,
    })
}

/// Map from control OID to value decoder
///
/// Populated at startup, then shared read-only (typically behind an
/// [`Arc`]) by every connection's decoder.
#[derive(Clone, Default)]
pub struct ControlRegistry {
    decoders: HashMap<String, Arc<dyn ControlDecoder>>,
}

impl ControlRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the well-known control decoders
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MANAGE_DSA_IT_OID, decode_manage_dsa_it);
        registry.register(PAGED_RESULTS_OID, decode_paged_results);
        registry.register(SUBENTRIES_OID, decode_subentries);
        registry.register(PERSISTENT_SEARCH_OID, decode_persistent_search);
        registry.register(ENTRY_CHANGE_OID, decode_entry_change);
        registry
    }

    /// Register a decoder, returning the one it replaces
    pub fn register<D>(&mut self, oid: impl Into<String>, decoder: D) -> Option<Arc<dyn ControlDecoder>>
    where
        D: ControlDecoder + 'static,
    {
        self.decoders.insert(oid.into(), Arc::new(decoder))
    }

    /// Check if a decoder is registered for `oid`
    pub fn is_registered(&self, oid: &str) -> bool {
        self.decoders.contains_key(oid)
    }

    /// Number of registered decoders
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Check if no decoder is registered
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode a control value
    ///
    /// Values of unregistered OIDs are returned unchanged as
    /// [`ControlValue::Raw`]; this never fails.
    ///
    /// # Errors
    /// Returns the registered decoder's error for a malformed value, and
    /// rejects a decoded value that does not encode back to `value`.
    pub fn decode(&self, oid: &str, value: &[u8]) -> DecodeResult<ControlValue> {
        let Some(decoder) = self.decoders.get(oid) else {
            return Ok(ControlValue::Raw(value.to_vec()));
        };
        let decoded = decoder.decode(value)?;
        let encoded = decoded
            .to_bytes()
            .map_err(|e| DecodeError::invalid("controlValue", e.to_string()))?;
        if encoded != value {
            return Err(DecodeError::invalid(
                "controlValue",
                format!("{} value is not in canonical encoding", oid),
            ));
        }
        Ok(decoded)
    }
}

impl fmt::Debug for ControlRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut oids: Vec<&String> = self.decoders.keys().collect();
        oids.sort();
        f.debug_struct("ControlRegistry").field("oids", &oids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_oid_is_raw() {
        let registry = ControlRegistry::with_defaults();
        assert_eq!(
            registry.decode("1.3.6.1.4.1.99999.1", &[0x01, 0x02]).unwrap(),
            ControlValue::Raw(vec![0x01, 0x02])
        );
        assert!(!registry.is_registered("1.3.6.1.4.1.99999.1"));
    }

    #[test]
    fn test_paged_results_round_trip() {
        let bytes = [0x30, 0x08, 0x02, 0x01, 0x64, 0x04, 0x03, 0x01, 0x02, 0x03];
        let registry = ControlRegistry::with_defaults();
        let value = registry.decode(PAGED_RESULTS_OID, &bytes).unwrap();
        assert_eq!(
            value,
            ControlValue::PagedResults {
                size: 100,
                cookie: vec![1, 2, 3]
            }
        );
        assert_eq!(value.to_bytes().unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_paged_results_negative_size() {
        let bytes = [0x30, 0x05, 0x02, 0x01, 0xFF, 0x04, 0x00];
        let registry = ControlRegistry::with_defaults();
        assert!(registry.decode(PAGED_RESULTS_OID, &bytes).is_err());
    }

    #[test]
    fn test_manage_dsa_it_rejects_value() {
        let registry = ControlRegistry::with_defaults();
        assert!(registry.decode(MANAGE_DSA_IT_OID, &[]).is_err());
    }

    #[test]
    fn test_subentries() {
        let registry = ControlRegistry::with_defaults();
        assert_eq!(
            registry.decode(SUBENTRIES_OID, &[0x01, 0x01, 0xFF]).unwrap(),
            ControlValue::Subentries { visibility: true }
        );
    }

    #[test]
    fn test_non_canonical_values_rejected() {
        let registry = ControlRegistry::with_defaults();
        // BOOLEAN TRUE as 01
        assert!(matches!(
            registry.decode(SUBENTRIES_OID, &[0x01, 0x01, 0x01]),
            Err(DecodeError::InvalidValue { field: "controlValue", .. })
        ));
        // size 10 padded to two bytes
        assert!(registry
            .decode(PAGED_RESULTS_OID, &[0x30, 0x06, 0x02, 0x02, 0x00, 0x0A, 0x04, 0x00])
            .is_err());
        // long-form length where the short form fits
        assert!(registry
            .decode(PAGED_RESULTS_OID, &[0x30, 0x81, 0x05, 0x02, 0x01, 0x0A, 0x04, 0x00])
            .is_err());
        assert_eq!(
            registry.decode(SUBENTRIES_OID, &[0x01, 0x01, 0x00]).unwrap(),
            ControlValue::Subentries { visibility: false }
        );
    }

    #[test]
    fn test_entry_change_optional_fields() {
        let registry = ControlRegistry::with_defaults();
        let value = ControlValue::EntryChange {
            change_type: 8,
            previous_dn: Some("cn=old,dc=example".to_string()),
            change_number: None,
        };
        let bytes = value.to_bytes().unwrap();
        assert_eq!(registry.decode(ENTRY_CHANGE_OID, &bytes).unwrap(), value);

        let bad = [0x30, 0x03, 0x0A, 0x01, 0x03];
        assert!(registry.decode(ENTRY_CHANGE_OID, &bad).is_err());
    }

    #[test]
    fn test_persistent_search() {
        let value = ControlValue::PersistentSearch {
            change_types: 15,
            changes_only: true,
            return_ecs: false,
        };
        let bytes = value.to_bytes().unwrap();
        assert_eq!(
            bytes,
            vec![0x30, 0x09, 0x02, 0x01, 0x0F, 0x01, 0x01, 0xFF, 0x01, 0x01, 0x00]
        );
        let registry = ControlRegistry::with_defaults();
        assert_eq!(registry.decode(PERSISTENT_SEARCH_OID, &bytes).unwrap(), value);
    }

    #[test]
    fn test_register_closure() {
        let mut registry = ControlRegistry::new();
        assert!(registry.is_empty());
        let previous = registry.register("1.2.3", |value: &[u8]| {
            if value.len() != 2 {
                return Err(DecodeError::invalid("pair", "expected two bytes"));
            }
            Ok(ControlValue::Raw(value.to_vec()))
        });
        assert!(previous.is_none());
        assert_eq!(
            registry.decode("1.2.3", &[1, 2]).unwrap(),
            ControlValue::Raw(vec![1, 2])
        );
        assert!(registry.decode("1.2.3", &[1]).is_err());
        assert_eq!(registry.len(), 1);
    }
}
