//! Response operations

use crate::model::request::PartialAttribute;
use ldap_core::ResultCode;
use serde::{Deserialize, Serialize};

/// `LDAPResult ::= SEQUENCE { resultCode, matchedDN, diagnosticMessage, referral [3] OPTIONAL }`
///
/// An empty `referral` list is encoded as an absent referral, since
/// `Referral` has `SIZE (1..MAX)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationResult {
    pub result_code: ResultCode,
    pub matched_dn: String,
    pub diagnostic_message: String,
    pub referral: Vec<String>,
}

impl OperationResult {
    /// Create a result without matched DN and referrals
    pub fn new(result_code: ResultCode, diagnostic_message: impl Into<String>) -> Self {
        Self {
            result_code,
            diagnostic_message: diagnostic_message.into(),
            ..Default::default()
        }
    }

    /// Create a `success` result
    pub fn success() -> Self {
        Self::default()
    }
}

/// `BindResponse ::= [APPLICATION 1] SEQUENCE { COMPONENTS OF LDAPResult, serverSaslCreds [7] OPTIONAL }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BindResponse {
    pub result: OperationResult,
    #[serde(with = "serde_bytes")]
    pub server_sasl_creds: Option<Vec<u8>>,
}

/// `SearchResultEntry ::= [APPLICATION 4] SEQUENCE { objectName, attributes }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchResultEntry {
    pub object_name: String,
    pub attributes: Vec<PartialAttribute>,
}

/// `SearchResultReference ::= [APPLICATION 19] SEQUENCE SIZE (1..MAX) OF uri URI`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchResultReference {
    pub uris: Vec<String>,
}

/// `ExtendedResponse ::= [APPLICATION 24] SEQUENCE { COMPONENTS OF LDAPResult, responseName [10], responseValue [11] }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtendedResponse {
    pub result: OperationResult,
    pub name: Option<String>,
    #[serde(with = "serde_bytes")]
    pub value: Option<Vec<u8>>,
}

/// `IntermediateResponse ::= [APPLICATION 25] SEQUENCE { responseName [0], responseValue [1] }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntermediateResponse {
    pub name: Option<String>,
    #[serde(with = "serde_bytes")]
    pub value: Option<Vec<u8>>,
}
