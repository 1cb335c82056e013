//! LDAP grammar tables
//!
//! One table per ASN.1 construct of RFC 4511 appendix B. The envelope
//! grammar ([`LdapGrammar::Message`]) reads the message ID, then enters the
//! operation's grammar on the operation tag, and the controls grammar on
//! `[0]`. Responses enter the shared [`LdapGrammar::Result`] grammar for the
//! `LDAPResult` components. Each grammar pops back to its parent on the
//! first tag it has no transition for, provided its last action allowed it.
//!
//! Tables are built on first use and never change afterwards.

mod actions;
mod abandon;
mod add;
mod bind;
mod compare;
mod delete;
mod extended;
mod message;
mod modify;
mod modify_dn;
mod result;
mod search;

use crate::container::LdapContainer;
use ldap_asn1::Grammar;

/// Identifier of every LDAP grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LdapGrammar {
    Message,
    Controls,
    Result,
    BindRequest,
    BindResponse,
    UnbindRequest,
    SearchRequest,
    SearchResultEntry,
    SearchResultDone,
    SearchResultReference,
    ModifyRequest,
    ModifyResponse,
    AddRequest,
    AddResponse,
    DelRequest,
    DelResponse,
    ModifyDnRequest,
    ModifyDnResponse,
    CompareRequest,
    CompareResponse,
    AbandonRequest,
    ExtendedRequest,
    ExtendedResponse,
    IntermediateResponse,
}

impl LdapGrammar {
    /// Every grammar, envelope first
    pub const ALL: [LdapGrammar; 24] = [
        LdapGrammar::Message,
        LdapGrammar::Controls,
        LdapGrammar::Result,
        LdapGrammar::BindRequest,
        LdapGrammar::BindResponse,
        LdapGrammar::UnbindRequest,
        LdapGrammar::SearchRequest,
        LdapGrammar::SearchResultEntry,
        LdapGrammar::SearchResultDone,
        LdapGrammar::SearchResultReference,
        LdapGrammar::ModifyRequest,
        LdapGrammar::ModifyResponse,
        LdapGrammar::AddRequest,
        LdapGrammar::AddResponse,
        LdapGrammar::DelRequest,
        LdapGrammar::DelResponse,
        LdapGrammar::ModifyDnRequest,
        LdapGrammar::ModifyDnResponse,
        LdapGrammar::CompareRequest,
        LdapGrammar::CompareResponse,
        LdapGrammar::AbandonRequest,
        LdapGrammar::ExtendedRequest,
        LdapGrammar::ExtendedResponse,
        LdapGrammar::IntermediateResponse,
    ];

    /// Get the table of this grammar
    pub fn table(self) -> &'static Grammar<LdapContainer> {
        match self {
            LdapGrammar::Message => &message::MESSAGE,
            LdapGrammar::Controls => &message::CONTROLS,
            LdapGrammar::Result => &result::RESULT,
            LdapGrammar::BindRequest => &bind::BIND_REQUEST,
            LdapGrammar::BindResponse => &bind::BIND_RESPONSE,
            LdapGrammar::UnbindRequest => &bind::UNBIND_REQUEST,
            LdapGrammar::SearchRequest => &search::SEARCH_REQUEST,
            LdapGrammar::SearchResultEntry => &search::SEARCH_RESULT_ENTRY,
            LdapGrammar::SearchResultDone => &search::SEARCH_RESULT_DONE,
            LdapGrammar::SearchResultReference => &search::SEARCH_RESULT_REFERENCE,
            LdapGrammar::ModifyRequest => &modify::MODIFY_REQUEST,
            LdapGrammar::ModifyResponse => &modify::MODIFY_RESPONSE,
            LdapGrammar::AddRequest => &add::ADD_REQUEST,
            LdapGrammar::AddResponse => &add::ADD_RESPONSE,
            LdapGrammar::DelRequest => &delete::DEL_REQUEST,
            LdapGrammar::DelResponse => &delete::DEL_RESPONSE,
            LdapGrammar::ModifyDnRequest => &modify_dn::MODIFY_DN_REQUEST,
            LdapGrammar::ModifyDnResponse => &modify_dn::MODIFY_DN_RESPONSE,
            LdapGrammar::CompareRequest => &compare::COMPARE_REQUEST,
            LdapGrammar::CompareResponse => &compare::COMPARE_RESPONSE,
            LdapGrammar::AbandonRequest => &abandon::ABANDON_REQUEST,
            LdapGrammar::ExtendedRequest => &extended::EXTENDED_REQUEST,
            LdapGrammar::ExtendedResponse => &extended::EXTENDED_RESPONSE,
            LdapGrammar::IntermediateResponse => &extended::INTERMEDIATE_RESPONSE,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use ldap_asn1::Asn1Container;

    #[test]
    fn test_tables_resolve_to_their_id() {
        for id in LdapGrammar::ALL {
            let grammar = LdapContainer::grammar(id);
            assert_eq!(grammar.id(), id);
            assert!(!grammar.is_empty(), "{} has no transitions", grammar.name());
        }
    }
}
