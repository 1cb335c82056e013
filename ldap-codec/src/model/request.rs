//! Request operations

use crate::filter::Filter;
use ldap_core::MessageId;
use serde::{Deserialize, Serialize};

/// `BindRequest ::= [APPLICATION 0] SEQUENCE { version, name, authentication }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindRequest {
    /// Protocol version, 1..=127 (3 for LDAPv3)
    pub version: u8,
    /// DN of the bind identity (empty for anonymous binds)
    pub name: String,
    pub authentication: Authentication,
}

impl Default for BindRequest {
    fn default() -> Self {
        Self {
            version: 3,
            name: String::new(),
            authentication: Authentication::default(),
        }
    }
}

impl BindRequest {
    /// Create a simple bind
    pub fn simple(name: impl Into<String>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            version: 3,
            name: name.into(),
            authentication: Authentication::Simple(password.into()),
        }
    }
}

/// `AuthenticationChoice`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authentication {
    /// `simple [0] OCTET STRING`
    Simple(#[serde(with = "serde_bytes")] Vec<u8>),
    /// `sasl [3] SaslCredentials`
    Sasl {
        mechanism: String,
        #[serde(with = "serde_bytes")]
        credentials: Option<Vec<u8>>,
    },
}

impl Default for Authentication {
    fn default() -> Self {
        Authentication::Simple(Vec::new())
    }
}

/// `scope ENUMERATED` of SearchRequest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SearchScope {
    #[default]
    BaseObject = 0,
    SingleLevel = 1,
    WholeSubtree = 2,
}

impl SearchScope {
    /// Map a wire value, `None` if undefined
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(SearchScope::BaseObject),
            1 => Some(SearchScope::SingleLevel),
            2 => Some(SearchScope::WholeSubtree),
            _ => None,
        }
    }
}

/// `derefAliases ENUMERATED` of SearchRequest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DerefAliases {
    #[default]
    NeverDerefAliases = 0,
    DerefInSearching = 1,
    DerefFindingBaseObj = 2,
    DerefAlways = 3,
}

impl DerefAliases {
    /// Map a wire value, `None` if undefined
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(DerefAliases::NeverDerefAliases),
            1 => Some(DerefAliases::DerefInSearching),
            2 => Some(DerefAliases::DerefFindingBaseObj),
            3 => Some(DerefAliases::DerefAlways),
            _ => None,
        }
    }
}

/// `SearchRequest ::= [APPLICATION 3] SEQUENCE { ... }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub base_object: String,
    pub scope: SearchScope,
    pub deref_aliases: DerefAliases,
    /// `0` means no client-requested limit
    pub size_limit: u32,
    /// Seconds, `0` means no client-requested limit
    pub time_limit: u32,
    pub types_only: bool,
    pub filter: Filter,
    /// Attribute selectors, including the special `*`, `+` and `1.1`
    pub attributes: Vec<String>,
}

/// `PartialAttribute ::= SEQUENCE { type AttributeDescription, vals SET OF value }`
///
/// Also used for `Attribute`, whose value set must not be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartialAttribute {
    pub attribute_type: String,
    pub values: Vec<Vec<u8>>,
}

impl PartialAttribute {
    /// Create an attribute from a type and its values
    pub fn new<V: Into<Vec<u8>>>(
        attribute_type: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            attribute_type: attribute_type.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// `operation ENUMERATED` of a ModifyRequest change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModifyOperation {
    #[default]
    Add = 0,
    Delete = 1,
    Replace = 2,
    /// RFC 4525
    Increment = 3,
}

impl ModifyOperation {
    /// Map a wire value, `None` if undefined
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(ModifyOperation::Add),
            1 => Some(ModifyOperation::Delete),
            2 => Some(ModifyOperation::Replace),
            3 => Some(ModifyOperation::Increment),
            _ => None,
        }
    }
}

/// One element of `changes SEQUENCE OF change SEQUENCE { operation, modification }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Change {
    pub operation: ModifyOperation,
    pub modification: PartialAttribute,
}

impl Change {
    pub fn new(operation: ModifyOperation, modification: PartialAttribute) -> Self {
        Self {
            operation,
            modification,
        }
    }
}

/// `ModifyRequest ::= [APPLICATION 6] SEQUENCE { object, changes }`
///
/// Changes are applied in order, so their order is preserved exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifyRequest {
    pub object: String,
    pub changes: Vec<Change>,
}

/// `AddRequest ::= [APPLICATION 8] SEQUENCE { entry, attributes }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddRequest {
    pub entry: String,
    pub attributes: Vec<PartialAttribute>,
}

/// `DelRequest ::= [APPLICATION 10] LDAPDN`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DelRequest {
    pub entry: String,
}

/// `ModifyDNRequest ::= [APPLICATION 12] SEQUENCE { ... }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifyDnRequest {
    pub entry: String,
    pub new_rdn: String,
    pub delete_old_rdn: bool,
    pub new_superior: Option<String>,
}

/// `AttributeValueAssertion ::= SEQUENCE { attributeDesc, assertionValue }`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttributeValueAssertion {
    pub attribute_desc: String,
    #[serde(with = "serde_bytes")]
    pub assertion_value: Vec<u8>,
}

impl AttributeValueAssertion {
    pub fn new(attribute_desc: impl Into<String>, assertion_value: impl Into<Vec<u8>>) -> Self {
        Self {
            attribute_desc: attribute_desc.into(),
            assertion_value: assertion_value.into(),
        }
    }
}

/// `CompareRequest ::= [APPLICATION 14] SEQUENCE { entry, ava }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompareRequest {
    pub entry: String,
    pub ava: AttributeValueAssertion,
}

/// `AbandonRequest ::= [APPLICATION 16] MessageID`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbandonRequest {
    /// Message ID of the operation to abandon
    pub target: MessageId,
}

/// `ExtendedRequest ::= [APPLICATION 23] SEQUENCE { requestName [0], requestValue [1] OPTIONAL }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtendedRequest {
    /// OID of the extended operation
    pub name: String,
    #[serde(with = "serde_bytes")]
    pub value: Option<Vec<u8>>,
}
