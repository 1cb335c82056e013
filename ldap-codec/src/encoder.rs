//! Two-pass LDAP encoder
//!
//! Every encodable value describes its TLV tree once, as a walk over a
//! `BerPass`. The walk runs twice:
//!
//! 1. `Measure` records the content length of each nested TLV in walk
//!    order and returns the total size. Nothing is written.
//! 2. `Write` replays the same walk against a `BerEncoder` sized to that
//!    total, taking each nested length from the recorded plan.
//!
//! Both passes run the same code, so they agree on every byte count. An
//! [`EncodePlan`] borrows the message immutably between the two passes.
//!
//! # Usage Example
//!
//! ```rust
//! use ldap_codec::{AbandonRequest, LdapEncoder, LdapMessage, MessageId, ProtocolOp};
//!
//! let message = LdapMessage::new(
//!     MessageId::new(5).unwrap(),
//!     ProtocolOp::AbandonRequest(AbandonRequest { target: MessageId::new(3).unwrap() }),
//! );
//! let plan = LdapEncoder::plan(&message).unwrap();
//! assert_eq!(plan.len(), 8);
//! assert_eq!(&plan.encode().unwrap()[..], &[0x30, 0x06, 0x02, 0x01, 0x05, 0x50, 0x01, 0x03]);
//! ```

use crate::controls::Control;
use crate::model::{
    Authentication, BindRequest, LdapMessage, OperationResult, PartialAttribute, ProtocolOp,
    SearchRequest,
};
use crate::tags;
use bytes::{Bytes, BytesMut};
use ldap_asn1::ber::encoder::{integer_value_len, tlv_len};
use ldap_asn1::{BerEncoder, BerTag};
use ldap_core::{EncodeError, EncodeResult, MessageId};

/// One traversal of a TLV tree
///
/// Every method returns the total encoded size of the TLV it handled.
pub(crate) trait BerPass {
    /// A TLV whose value is produced by `body`; `body` returns its length
    fn nested<F>(&mut self, tag: BerTag, body: F) -> EncodeResult<usize>
    where
        F: FnOnce(&mut Self) -> EncodeResult<usize>;

    /// A TLV with the given value bytes
    fn primitive(&mut self, tag: BerTag, value: &[u8]) -> EncodeResult<usize>;

    /// An INTEGER or ENUMERATED in minimal form
    fn integer(&mut self, tag: BerTag, value: i64) -> EncodeResult<usize>;

    /// A BOOLEAN
    fn boolean(&mut self, tag: BerTag, value: bool) -> EncodeResult<usize>;

    /// Bytes that are already BER encoded
    fn raw(&mut self, bytes: &[u8]) -> EncodeResult<usize>;
}

/// Value with a BER encoding
pub(crate) trait Encodable {
    fn walk<P: BerPass>(&self, pass: &mut P) -> EncodeResult<usize>;
}

/// Length computation pass
#[derive(Debug, Default)]
pub(crate) struct Measure {
    lengths: Vec<usize>,
}

impl BerPass for Measure {
    fn nested<F>(&mut self, tag: BerTag, body: F) -> EncodeResult<usize>
    where
        F: FnOnce(&mut Self) -> EncodeResult<usize>,
    {
        // Reserve the slot first so the plan is in walk (pre-)order
        let slot = self.lengths.len();
        self.lengths.push(0);
        let content = body(self)?;
        self.lengths[slot] = content;
        Ok(tlv_len(tag, content))
    }

    fn primitive(&mut self, tag: BerTag, value: &[u8]) -> EncodeResult<usize> {
        Ok(tlv_len(tag, value.len()))
    }

    fn integer(&mut self, tag: BerTag, value: i64) -> EncodeResult<usize> {
        Ok(tlv_len(tag, integer_value_len(value)))
    }

    fn boolean(&mut self, tag: BerTag, _value: bool) -> EncodeResult<usize> {
        Ok(tlv_len(tag, 1))
    }

    fn raw(&mut self, bytes: &[u8]) -> EncodeResult<usize> {
        Ok(bytes.len())
    }
}

/// Serialization pass
pub(crate) struct Write<'p> {
    encoder: BerEncoder,
    lengths: std::slice::Iter<'p, usize>,
}

impl<'p> Write<'p> {
    pub(crate) fn new(total: usize, lengths: &'p [usize]) -> Self {
        Self {
            encoder: BerEncoder::with_capacity(total),
            lengths: lengths.iter(),
        }
    }

    pub(crate) fn finish(self) -> EncodeResult<Bytes> {
        self.encoder.finish()
    }
}

impl BerPass for Write<'_> {
    fn nested<F>(&mut self, tag: BerTag, body: F) -> EncodeResult<usize>
    where
        F: FnOnce(&mut Self) -> EncodeResult<usize>,
    {
        let planned = *self
            .lengths
            .next()
            .ok_or_else(|| EncodeError::InvalidValue("length plan exhausted".to_string()))?;
        self.encoder.encode_header(tag, planned)?;
        let written = body(self)?;
        if written != planned {
            return Err(EncodeError::LengthMismatch { planned, written });
        }
        Ok(tlv_len(tag, planned))
    }

    fn primitive(&mut self, tag: BerTag, value: &[u8]) -> EncodeResult<usize> {
        self.encoder.encode_tlv(tag, value)?;
        Ok(tlv_len(tag, value.len()))
    }

    fn integer(&mut self, tag: BerTag, value: i64) -> EncodeResult<usize> {
        self.encoder.encode_integer(tag, value)?;
        Ok(tlv_len(tag, integer_value_len(value)))
    }

    fn boolean(&mut self, tag: BerTag, value: bool) -> EncodeResult<usize> {
        self.encoder.encode_boolean(tag, value)?;
        Ok(tlv_len(tag, 1))
    }

    fn raw(&mut self, bytes: &[u8]) -> EncodeResult<usize> {
        self.encoder.encode_raw(bytes)?;
        Ok(bytes.len())
    }
}

/// Run both passes over a standalone value
pub(crate) fn encode_value<T: Encodable>(value: &T) -> EncodeResult<Bytes> {
    let mut measure = Measure::default();
    let total = value.walk(&mut measure)?;
    let mut write = Write::new(total, &measure.lengths);
    value.walk(&mut write)?;
    write.finish()
}

/// Computed lengths of one message, ready to be written
///
/// Holds a shared borrow of the message, so the message cannot change
/// between [`LdapEncoder::plan`] and [`EncodePlan::encode`].
#[derive(Debug)]
pub struct EncodePlan<'a> {
    message: &'a LdapMessage,
    lengths: Vec<usize>,
    total: usize,
}

impl<'a> EncodePlan<'a> {
    /// Total encoded size in bytes
    pub fn len(&self) -> usize {
        self.total
    }

    /// Always false: an LDAP message is never empty
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Get the planned message
    pub fn message(&self) -> &'a LdapMessage {
        self.message
    }

    /// Serialize the message
    ///
    /// # Errors
    /// Fails without returning any bytes if the write pass disagrees with
    /// the plan.
    pub fn encode(self) -> EncodeResult<Bytes> {
        let mut write = Write::new(self.total, &self.lengths);
        let written = self.message.walk(&mut write)?;
        if written != self.total {
            return Err(EncodeError::LengthMismatch {
                planned: self.total,
                written,
            });
        }
        write.finish()
    }

    /// Serialize the message and append it to `dst`
    pub fn encode_into(self, dst: &mut BytesMut) -> EncodeResult<()> {
        let bytes = self.encode()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

/// LDAP message encoder
pub struct LdapEncoder;

impl LdapEncoder {
    /// First pass: compute all lengths
    ///
    /// # Errors
    /// Returns [`EncodeError::InvalidValue`] for values outside their ASN.1
    /// range (for example a size limit above 2^31 - 1).
    pub fn plan(message: &LdapMessage) -> EncodeResult<EncodePlan<'_>> {
        let mut measure = Measure::default();
        let total = message.walk(&mut measure)?;
        Ok(EncodePlan {
            message,
            lengths: measure.lengths,
            total,
        })
    }

    /// Total encoded size of `message`
    pub fn compute_length(message: &LdapMessage) -> EncodeResult<usize> {
        Ok(Self::plan(message)?.len())
    }

    /// Plan and serialize in one call
    pub fn encode(message: &LdapMessage) -> EncodeResult<Bytes> {
        Self::plan(message)?.encode()
    }

    /// Plan and serialize into a new vector
    pub fn encode_to_vec(message: &LdapMessage) -> EncodeResult<Vec<u8>> {
        Ok(Self::encode(message)?.to_vec())
    }
}

fn check_int(field: &str, value: u32) -> EncodeResult<i64> {
    if value > MessageId::MAX {
        return Err(EncodeError::InvalidValue(format!(
            "{} {} exceeds maxInt",
            field, value
        )));
    }
    Ok(value as i64)
}

fn walk_strings<P: BerPass>(pass: &mut P, tag: BerTag, values: &[String]) -> EncodeResult<usize> {
    let mut len = 0;
    for value in values {
        len += pass.primitive(tag, value.as_bytes())?;
    }
    Ok(len)
}

/// `LDAPResult` components, inlined into the enclosing response
fn walk_result<P: BerPass>(pass: &mut P, result: &OperationResult) -> EncodeResult<usize> {
    let mut len = pass.integer(BerTag::ENUMERATED, result.result_code.as_u32() as i64)?;
    len += pass.primitive(BerTag::OCTET_STRING, result.matched_dn.as_bytes())?;
    len += pass.primitive(BerTag::OCTET_STRING, result.diagnostic_message.as_bytes())?;
    if !result.referral.is_empty() {
        len += pass.nested(tags::REFERRAL, |pass| {
            walk_strings(pass, BerTag::OCTET_STRING, &result.referral)
        })?;
    }
    Ok(len)
}

fn walk_attribute<P: BerPass>(pass: &mut P, attribute: &PartialAttribute) -> EncodeResult<usize> {
    pass.nested(BerTag::SEQUENCE, |pass| {
        let mut len = pass.primitive(BerTag::OCTET_STRING, attribute.attribute_type.as_bytes())?;
        len += pass.nested(BerTag::SET, |pass| {
            let mut len = 0;
            for value in &attribute.values {
                len += pass.primitive(BerTag::OCTET_STRING, value)?;
            }
            Ok(len)
        })?;
        Ok(len)
    })
}

fn walk_attributes<P: BerPass>(
    pass: &mut P,
    attributes: &[PartialAttribute],
) -> EncodeResult<usize> {
    pass.nested(BerTag::SEQUENCE, |pass| {
        let mut len = 0;
        for attribute in attributes {
            len += walk_attribute(pass, attribute)?;
        }
        Ok(len)
    })
}

fn walk_bind_request<P: BerPass>(pass: &mut P, request: &BindRequest) -> EncodeResult<usize> {
    if !(1..=127).contains(&request.version) {
        return Err(EncodeError::InvalidValue(format!(
            "bind version {} is out of range 1..=127",
            request.version
        )));
    }
    pass.nested(tags::BIND_REQUEST, |pass| {
        let mut len = pass.integer(BerTag::INTEGER, request.version as i64)?;
        len += pass.primitive(BerTag::OCTET_STRING, request.name.as_bytes())?;
        len += match &request.authentication {
            Authentication::Simple(password) => pass.primitive(tags::AUTH_SIMPLE, password)?,
            Authentication::Sasl {
                mechanism,
                credentials,
            } => pass.nested(tags::AUTH_SASL, |pass| {
                let mut len = pass.primitive(BerTag::OCTET_STRING, mechanism.as_bytes())?;
                if let Some(credentials) = credentials {
                    len += pass.primitive(BerTag::OCTET_STRING, credentials)?;
                }
                Ok(len)
            })?,
        };
        Ok(len)
    })
}

fn walk_search_request<P: BerPass>(pass: &mut P, request: &SearchRequest) -> EncodeResult<usize> {
    let size_limit = check_int("sizeLimit", request.size_limit)?;
    let time_limit = check_int("timeLimit", request.time_limit)?;
    pass.nested(tags::SEARCH_REQUEST, |pass| {
        let mut len = pass.primitive(BerTag::OCTET_STRING, request.base_object.as_bytes())?;
        len += pass.integer(BerTag::ENUMERATED, request.scope as i64)?;
        len += pass.integer(BerTag::ENUMERATED, request.deref_aliases as i64)?;
        len += pass.integer(BerTag::INTEGER, size_limit)?;
        len += pass.integer(BerTag::INTEGER, time_limit)?;
        len += pass.boolean(BerTag::BOOLEAN, request.types_only)?;
        len += request.filter.walk(pass)?;
        len += pass.nested(BerTag::SEQUENCE, |pass| {
            walk_strings(pass, BerTag::OCTET_STRING, &request.attributes)
        })?;
        Ok(len)
    })
}

fn walk_op<P: BerPass>(pass: &mut P, op: &ProtocolOp) -> EncodeResult<usize> {
    let tag = op.kind().tag();
    match op {
        ProtocolOp::BindRequest(request) => walk_bind_request(pass, request),
        ProtocolOp::BindResponse(response) => pass.nested(tag, |pass| {
            let mut len = walk_result(pass, &response.result)?;
            if let Some(creds) = &response.server_sasl_creds {
                len += pass.primitive(tags::SERVER_SASL_CREDS, creds)?;
            }
            Ok(len)
        }),
        ProtocolOp::UnbindRequest => pass.primitive(tag, &[]),
        ProtocolOp::SearchRequest(request) => walk_search_request(pass, request),
        ProtocolOp::SearchResultEntry(entry) => pass.nested(tag, |pass| {
            let mut len = pass.primitive(BerTag::OCTET_STRING, entry.object_name.as_bytes())?;
            len += walk_attributes(pass, &entry.attributes)?;
            Ok(len)
        }),
        ProtocolOp::SearchResultReference(reference) => {
            if reference.uris.is_empty() {
                return Err(EncodeError::InvalidValue(
                    "search result reference without URIs".to_string(),
                ));
            }
            pass.nested(tag, |pass| {
                walk_strings(pass, BerTag::OCTET_STRING, &reference.uris)
            })
        }
        ProtocolOp::SearchResultDone(result)
        | ProtocolOp::ModifyResponse(result)
        | ProtocolOp::AddResponse(result)
        | ProtocolOp::DelResponse(result)
        | ProtocolOp::ModifyDnResponse(result)
        | ProtocolOp::CompareResponse(result) => pass.nested(tag, |pass| walk_result(pass, result)),
        ProtocolOp::ModifyRequest(request) => pass.nested(tag, |pass| {
            let mut len = pass.primitive(BerTag::OCTET_STRING, request.object.as_bytes())?;
            len += pass.nested(BerTag::SEQUENCE, |pass| {
                let mut len = 0;
                for change in &request.changes {
                    len += pass.nested(BerTag::SEQUENCE, |pass| {
                        let len = pass.integer(BerTag::ENUMERATED, change.operation as i64)?;
                        Ok(len + walk_attribute(pass, &change.modification)?)
                    })?;
                }
                Ok(len)
            })?;
            Ok(len)
        }),
        ProtocolOp::AddRequest(request) => {
            if let Some(attribute) = request.attributes.iter().find(|a| a.values.is_empty()) {
                return Err(EncodeError::InvalidValue(format!(
                    "add attribute '{}' without values",
                    attribute.attribute_type
                )));
            }
            pass.nested(tag, |pass| {
                let len = pass.primitive(BerTag::OCTET_STRING, request.entry.as_bytes())?;
                Ok(len + walk_attributes(pass, &request.attributes)?)
            })
        }
        ProtocolOp::DelRequest(request) => pass.primitive(tag, request.entry.as_bytes()),
        ProtocolOp::ModifyDnRequest(request) => pass.nested(tag, |pass| {
            let mut len = pass.primitive(BerTag::OCTET_STRING, request.entry.as_bytes())?;
            len += pass.primitive(BerTag::OCTET_STRING, request.new_rdn.as_bytes())?;
            len += pass.boolean(BerTag::BOOLEAN, request.delete_old_rdn)?;
            if let Some(superior) = &request.new_superior {
                len += pass.primitive(tags::NEW_SUPERIOR, superior.as_bytes())?;
            }
            Ok(len)
        }),
        ProtocolOp::CompareRequest(request) => pass.nested(tag, |pass| {
            let len = pass.primitive(BerTag::OCTET_STRING, request.entry.as_bytes())?;
            let ava = &request.ava;
            Ok(len
                + pass.nested(BerTag::SEQUENCE, |pass| {
                    let len = pass.primitive(BerTag::OCTET_STRING, ava.attribute_desc.as_bytes())?;
                    Ok(len + pass.primitive(BerTag::OCTET_STRING, &ava.assertion_value)?)
                })?)
        }),
        ProtocolOp::AbandonRequest(request) => pass.integer(tag, request.target.value() as i64),
        ProtocolOp::ExtendedRequest(request) => pass.nested(tag, |pass| {
            let mut len = pass.primitive(tags::EXTENDED_REQUEST_NAME, request.name.as_bytes())?;
            if let Some(value) = &request.value {
                len += pass.primitive(tags::EXTENDED_REQUEST_VALUE, value)?;
            }
            Ok(len)
        }),
        ProtocolOp::ExtendedResponse(response) => pass.nested(tag, |pass| {
            let mut len = walk_result(pass, &response.result)?;
            if let Some(name) = &response.name {
                len += pass.primitive(tags::EXTENDED_RESPONSE_NAME, name.as_bytes())?;
            }
            if let Some(value) = &response.value {
                len += pass.primitive(tags::EXTENDED_RESPONSE_VALUE, value)?;
            }
            Ok(len)
        }),
        ProtocolOp::IntermediateResponse(response) => pass.nested(tag, |pass| {
            let mut len = 0;
            if let Some(name) = &response.name {
                len += pass.primitive(tags::INTERMEDIATE_RESPONSE_NAME, name.as_bytes())?;
            }
            if let Some(value) = &response.value {
                len += pass.primitive(tags::INTERMEDIATE_RESPONSE_VALUE, value)?;
            }
            Ok(len)
        }),
    }
}

fn walk_controls<P: BerPass>(pass: &mut P, controls: &[Control]) -> EncodeResult<usize> {
    pass.nested(tags::CONTROLS, |pass| {
        let mut len = 0;
        for control in controls {
            len += control.walk(pass)?;
        }
        Ok(len)
    })
}

impl Encodable for LdapMessage {
    fn walk<P: BerPass>(&self, pass: &mut P) -> EncodeResult<usize> {
        pass.nested(BerTag::SEQUENCE, |pass| {
            let mut len = pass.integer(BerTag::INTEGER, self.message_id.value() as i64)?;
            len += walk_op(pass, &self.op)?;
            if !self.controls.is_empty() {
                len += walk_controls(pass, &self.controls)?;
            }
            Ok(len)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AbandonRequest, AddRequest, Change, DelRequest, ModifyOperation, ModifyRequest,
        PartialAttribute, SearchResultReference,
    };
    use ldap_core::ResultCode;

    fn id(value: u32) -> MessageId {
        MessageId::new(value).unwrap()
    }

    #[test]
    fn test_encode_abandon() {
        let message = LdapMessage::new(
            id(5),
            ProtocolOp::AbandonRequest(AbandonRequest { target: id(3) }),
        );
        assert_eq!(
            LdapEncoder::encode_to_vec(&message).unwrap(),
            vec![0x30, 0x06, 0x02, 0x01, 0x05, 0x50, 0x01, 0x03]
        );
    }

    #[test]
    fn test_encode_unbind() {
        let message = LdapMessage::new(id(3), ProtocolOp::UnbindRequest);
        assert_eq!(
            LdapEncoder::encode_to_vec(&message).unwrap(),
            vec![0x30, 0x05, 0x02, 0x01, 0x03, 0x42, 0x00]
        );
    }

    #[test]
    fn test_encode_del_response() {
        let message = LdapMessage::new(
            id(2),
            ProtocolOp::DelResponse(OperationResult::new(ResultCode::NoSuchObject, "")),
        );
        assert_eq!(
            LdapEncoder::encode_to_vec(&message).unwrap(),
            vec![0x30, 0x0C, 0x02, 0x01, 0x02, 0x6B, 0x07, 0x0A, 0x01, 0x20, 0x04, 0x00, 0x04, 0x00]
        );
    }

    #[test]
    fn test_plan_matches_encoding() {
        let message = LdapMessage::new(
            id(300),
            ProtocolOp::ModifyRequest(ModifyRequest {
                object: "cn=a".to_string(),
                changes: vec![Change::new(
                    ModifyOperation::Replace,
                    PartialAttribute::new("description", [vec![b'x'; 200]]),
                )],
            }),
        );
        let plan = LdapEncoder::plan(&message).unwrap();
        let total = plan.len();
        let bytes = plan.encode().unwrap();
        assert_eq!(bytes.len(), total);
        // Long-form envelope length
        assert_eq!(&bytes[..2], &[0x30, 0x81]);
    }

    #[test]
    fn test_length_grows_with_content() {
        let mut request = DelRequest {
            entry: "dc=example".to_string(),
        };
        let short = LdapEncoder::compute_length(&LdapMessage::new(
            id(1),
            ProtocolOp::DelRequest(request.clone()),
        ))
        .unwrap();
        request.entry.push_str(",dc=com");
        let long = LdapEncoder::compute_length(&LdapMessage::new(
            id(1),
            ProtocolOp::DelRequest(request),
        ))
        .unwrap();
        assert_eq!(long, short + 7);
    }

    #[test]
    fn test_reject_out_of_range_values() {
        let message = LdapMessage::new(
            id(1),
            ProtocolOp::SearchResultReference(SearchResultReference { uris: Vec::new() }),
        );
        assert!(matches!(
            LdapEncoder::plan(&message),
            Err(EncodeError::InvalidValue(_))
        ));

        let mut bind = BindRequest::simple("", "");
        bind.version = 0;
        let message = LdapMessage::new(id(1), ProtocolOp::BindRequest(bind));
        assert!(LdapEncoder::encode(&message).is_err());
    }

    #[test]
    fn test_reject_add_attribute_without_values() {
        let request = AddRequest {
            entry: "cn=a".to_string(),
            attributes: vec![
                PartialAttribute::new("cn", ["a"]),
                PartialAttribute::new("sn", Vec::<Vec<u8>>::new()),
            ],
        };
        let message = LdapMessage::new(id(1), ProtocolOp::AddRequest(request));
        match LdapEncoder::plan(&message) {
            Err(EncodeError::InvalidValue(reason)) => assert!(reason.contains("'sn'")),
            other => panic!("unexpected plan: {:?}", other.map(|plan| plan.len())),
        }

        // an empty value set is fine where the SET has no lower bound
        let change = Change::new(
            ModifyOperation::Delete,
            PartialAttribute::new("sn", Vec::<Vec<u8>>::new()),
        );
        let message = LdapMessage::new(
            id(1),
            ProtocolOp::ModifyRequest(ModifyRequest {
                object: "cn=a".to_string(),
                changes: vec![change],
            }),
        );
        assert!(LdapEncoder::encode(&message).is_ok());
    }

    #[test]
    fn test_write_detects_short_plan() {
        let message = LdapMessage::new(id(1), ProtocolOp::UnbindRequest);
        let mut measure = Measure::default();
        let total = message.walk(&mut measure).unwrap();
        let mut write = Write::new(total, &[]);
        assert!(message.walk(&mut write).is_err());
    }
}
