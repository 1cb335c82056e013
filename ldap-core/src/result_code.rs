//! LDAP result codes (RFC 4511 section 4.1.9 and appendix A)

use serde::{Deserialize, Serialize};
use std::fmt;

/// LDAP result code
///
/// Carried in the `resultCode` ENUMERATED of every `LDAPResult`. Values not
/// defined by RFC 4511 are preserved in [`ResultCode::Other`] so that a
/// response from a newer server still decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    Success,
    OperationsError,
    ProtocolError,
    TimeLimitExceeded,
    SizeLimitExceeded,
    CompareFalse,
    CompareTrue,
    AuthMethodNotSupported,
    StrongerAuthRequired,
    Referral,
    AdminLimitExceeded,
    UnavailableCriticalExtension,
    ConfidentialityRequired,
    SaslBindInProgress,
    NoSuchAttribute,
    UndefinedAttributeType,
    InappropriateMatching,
    ConstraintViolation,
    AttributeOrValueExists,
    InvalidAttributeSyntax,
    NoSuchObject,
    AliasProblem,
    InvalidDnSyntax,
    AliasDereferencingProblem,
    InappropriateAuthentication,
    InvalidCredentials,
    InsufficientAccessRights,
    Busy,
    Unavailable,
    UnwillingToPerform,
    LoopDetect,
    NamingViolation,
    ObjectClassViolation,
    NotAllowedOnNonLeaf,
    NotAllowedOnRdn,
    EntryAlreadyExists,
    ObjectClassModsProhibited,
    AffectsMultipleDsas,
    Other(u32),
}

const CODES: &[(ResultCode, u32, &str)] = &[
    (ResultCode::Success, 0, "success"),
    (ResultCode::OperationsError, 1, "operationsError"),
    (ResultCode::ProtocolError, 2, "protocolError"),
    (ResultCode::TimeLimitExceeded, 3, "timeLimitExceeded"),
    (ResultCode::SizeLimitExceeded, 4, "sizeLimitExceeded"),
    (ResultCode::CompareFalse, 5, "compareFalse"),
    (ResultCode::CompareTrue, 6, "compareTrue"),
    (ResultCode::AuthMethodNotSupported, 7, "authMethodNotSupported"),
    (ResultCode::StrongerAuthRequired, 8, "strongerAuthRequired"),
    (ResultCode::Referral, 10, "referral"),
    (ResultCode::AdminLimitExceeded, 11, "adminLimitExceeded"),
    (ResultCode::UnavailableCriticalExtension, 12, "unavailableCriticalExtension"),
    (ResultCode::ConfidentialityRequired, 13, "confidentialityRequired"),
    (ResultCode::SaslBindInProgress, 14, "saslBindInProgress"),
    (ResultCode::NoSuchAttribute, 16, "noSuchAttribute"),
    (ResultCode::UndefinedAttributeType, 17, "undefinedAttributeType"),
    (ResultCode::InappropriateMatching, 18, "inappropriateMatching"),
    (ResultCode::ConstraintViolation, 19, "constraintViolation"),
    (ResultCode::AttributeOrValueExists, 20, "attributeOrValueExists"),
    (ResultCode::InvalidAttributeSyntax, 21, "invalidAttributeSyntax"),
    (ResultCode::NoSuchObject, 32, "noSuchObject"),
    (ResultCode::AliasProblem, 33, "aliasProblem"),
    (ResultCode::InvalidDnSyntax, 34, "invalidDNSyntax"),
    (ResultCode::AliasDereferencingProblem, 36, "aliasDereferencingProblem"),
    (ResultCode::InappropriateAuthentication, 48, "inappropriateAuthentication"),
    (ResultCode::InvalidCredentials, 49, "invalidCredentials"),
    (ResultCode::InsufficientAccessRights, 50, "insufficientAccessRights"),
    (ResultCode::Busy, 51, "busy"),
    (ResultCode::Unavailable, 52, "unavailable"),
    (ResultCode::UnwillingToPerform, 53, "unwillingToPerform"),
    (ResultCode::LoopDetect, 54, "loopDetect"),
    (ResultCode::NamingViolation, 64, "namingViolation"),
    (ResultCode::ObjectClassViolation, 65, "objectClassViolation"),
    (ResultCode::NotAllowedOnNonLeaf, 66, "notAllowedOnNonLeaf"),
    (ResultCode::NotAllowedOnRdn, 67, "notAllowedOnRDN"),
    (ResultCode::EntryAlreadyExists, 68, "entryAlreadyExists"),
    (ResultCode::ObjectClassModsProhibited, 69, "objectClassModsProhibited"),
    (ResultCode::AffectsMultipleDsas, 71, "affectsMultipleDSAs"),
];

impl ResultCode {
    /// Map a wire value to a result code
    pub fn from_u32(value: u32) -> Self {
        CODES
            .iter()
            .find(|(_, code, _)| *code == value)
            .map(|(rc, _, _)| *rc)
            .unwrap_or(ResultCode::Other(value))
    }

    /// Wire value of this result code
    pub fn as_u32(&self) -> u32 {
        match self {
            ResultCode::Other(value) => *value,
            rc => CODES
                .iter()
                .find(|(known, _, _)| known == rc)
                .map(|(_, code, _)| *code)
                .unwrap_or_default(),
        }
    }

    /// Check if this is the `success` code
    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Success)
    }
}

impl Default for ResultCode {
    fn default() -> Self {
        ResultCode::Success
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match CODES.iter().find(|(known, _, _)| known == self) {
            Some((_, code, name)) => write!(f, "{} ({})", name, code),
            None => write!(f, "unknown ({})", self.as_u32()),
        }
    }
}
