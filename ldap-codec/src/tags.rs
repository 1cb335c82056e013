//! BER tags of the LDAP protocol (RFC 4511 appendix B)

use ldap_asn1::BerTag;

// Protocol operations
pub const BIND_REQUEST: BerTag = BerTag::application(true, 0);
pub const BIND_RESPONSE: BerTag = BerTag::application(true, 1);
pub const UNBIND_REQUEST: BerTag = BerTag::application(false, 2);
pub const SEARCH_REQUEST: BerTag = BerTag::application(true, 3);
pub const SEARCH_RESULT_ENTRY: BerTag = BerTag::application(true, 4);
pub const SEARCH_RESULT_DONE: BerTag = BerTag::application(true, 5);
pub const MODIFY_REQUEST: BerTag = BerTag::application(true, 6);
pub const MODIFY_RESPONSE: BerTag = BerTag::application(true, 7);
pub const ADD_REQUEST: BerTag = BerTag::application(true, 8);
pub const ADD_RESPONSE: BerTag = BerTag::application(true, 9);
pub const DEL_REQUEST: BerTag = BerTag::application(false, 10);
pub const DEL_RESPONSE: BerTag = BerTag::application(true, 11);
pub const MODIFY_DN_REQUEST: BerTag = BerTag::application(true, 12);
pub const MODIFY_DN_RESPONSE: BerTag = BerTag::application(true, 13);
pub const COMPARE_REQUEST: BerTag = BerTag::application(true, 14);
pub const COMPARE_RESPONSE: BerTag = BerTag::application(true, 15);
pub const ABANDON_REQUEST: BerTag = BerTag::application(false, 16);
pub const SEARCH_RESULT_REFERENCE: BerTag = BerTag::application(true, 19);
pub const EXTENDED_REQUEST: BerTag = BerTag::application(true, 23);
pub const EXTENDED_RESPONSE: BerTag = BerTag::application(true, 24);
pub const INTERMEDIATE_RESPONSE: BerTag = BerTag::application(true, 25);

/// `controls [0] Controls` of the message envelope
pub const CONTROLS: BerTag = BerTag::context_specific(true, 0);

/// `referral [3] Referral` of `LDAPResult`
pub const REFERRAL: BerTag = BerTag::context_specific(true, 3);

// BindRequest.authentication
pub const AUTH_SIMPLE: BerTag = BerTag::context_specific(false, 0);
pub const AUTH_SASL: BerTag = BerTag::context_specific(true, 3);

/// `serverSaslCreds [7]` of BindResponse
pub const SERVER_SASL_CREDS: BerTag = BerTag::context_specific(false, 7);

/// `newSuperior [0]` of ModifyDNRequest
pub const NEW_SUPERIOR: BerTag = BerTag::context_specific(false, 0);

// ExtendedRequest
pub const EXTENDED_REQUEST_NAME: BerTag = BerTag::context_specific(false, 0);
pub const EXTENDED_REQUEST_VALUE: BerTag = BerTag::context_specific(false, 1);

// ExtendedResponse
pub const EXTENDED_RESPONSE_NAME: BerTag = BerTag::context_specific(false, 10);
pub const EXTENDED_RESPONSE_VALUE: BerTag = BerTag::context_specific(false, 11);

// IntermediateResponse
pub const INTERMEDIATE_RESPONSE_NAME: BerTag = BerTag::context_specific(false, 0);
pub const INTERMEDIATE_RESPONSE_VALUE: BerTag = BerTag::context_specific(false, 1);

// Filter CHOICE
pub const FILTER_AND: BerTag = BerTag::context_specific(true, 0);
pub const FILTER_OR: BerTag = BerTag::context_specific(true, 1);
pub const FILTER_NOT: BerTag = BerTag::context_specific(true, 2);
pub const FILTER_EQUALITY: BerTag = BerTag::context_specific(true, 3);
pub const FILTER_SUBSTRINGS: BerTag = BerTag::context_specific(true, 4);
pub const FILTER_GREATER_OR_EQUAL: BerTag = BerTag::context_specific(true, 5);
pub const FILTER_LESS_OR_EQUAL: BerTag = BerTag::context_specific(true, 6);
pub const FILTER_PRESENT: BerTag = BerTag::context_specific(false, 7);
pub const FILTER_APPROX: BerTag = BerTag::context_specific(true, 8);
pub const FILTER_EXTENSIBLE: BerTag = BerTag::context_specific(true, 9);

// SubstringFilter.substrings CHOICE
pub const SUBSTRING_INITIAL: BerTag = BerTag::context_specific(false, 0);
pub const SUBSTRING_ANY: BerTag = BerTag::context_specific(false, 1);
pub const SUBSTRING_FINAL: BerTag = BerTag::context_specific(false, 2);

// MatchingRuleAssertion
pub const MATCHING_RULE: BerTag = BerTag::context_specific(false, 1);
pub const MATCHING_TYPE: BerTag = BerTag::context_specific(false, 2);
pub const MATCH_VALUE: BerTag = BerTag::context_specific(false, 3);
pub const DN_ATTRIBUTES: BerTag = BerTag::context_specific(false, 4);
