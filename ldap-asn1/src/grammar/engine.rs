//! Grammar-driven decode loop

use crate::ber::{BerTag, Tlv, TlvHeader};
use crate::grammar::state::{Asn1Container, DecodePhase, DecoderState, GrammarFrame};
use crate::grammar::table::{Grammar, Next, StateId, Transition};
use bytes::{Bytes, BytesMut};
use ldap_core::{DecodeError, DecodeResult};

/// Grammars nested deeper than this are rejected
pub const MAX_GRAMMAR_DEPTH: usize = 32;

/// Outcome of one [`Asn1Decoder::advance`] step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The buffer ran dry; call again once more bytes are available
    NeedMore,
    /// One TLV was processed and the PDU continues
    Continue,
    /// The outermost TLV is complete
    Complete,
}

/// Table-driven decoder
///
/// Stateless: everything needed to resume lives in the container's
/// [`DecoderState`]. Bytes are consumed from the front of the caller's
/// buffer and never beyond the end of the current PDU, so anything left in
/// the buffer after [`Advance::Complete`] belongs to the next one.
pub struct Asn1Decoder;

impl Asn1Decoder {
    /// Process at most one TLV
    ///
    /// # Errors
    /// Any error is fatal for the PDU. The container's state is marked failed
    /// and every later call returns [`DecodeError::Poisoned`] until the state
    /// is reset.
    pub fn advance<C: Asn1Container>(container: &mut C, buf: &mut BytesMut) -> DecodeResult<Advance> {
        match container.decoder_state().phase {
            DecodePhase::Failed => return Err(DecodeError::Poisoned),
            DecodePhase::Complete => return Ok(Advance::Complete),
            DecodePhase::Idle | DecodePhase::InProgress => {}
        }

        let result = Self::step(container, buf);
        if let Err(e) = &result {
            let state = container.decoder_state_mut();
            let grammar = C::grammar(state.grammar);
            log::debug!(
                "Decode failed in {} at {}: {}",
                grammar.name(),
                grammar.state_name(state.state),
                e
            );
            state.phase = DecodePhase::Failed;
        }
        result
    }

    /// Process TLVs until the PDU completes or the buffer runs dry
    ///
    /// # Returns
    /// `Ok(true)` once the PDU is complete, `Ok(false)` if more bytes are
    /// needed.
    pub fn decode<C: Asn1Container>(container: &mut C, buf: &mut BytesMut) -> DecodeResult<bool> {
        loop {
            match Self::advance(container, buf)? {
                Advance::Continue => continue,
                Advance::NeedMore => return Ok(false),
                Advance::Complete => return Ok(true),
            }
        }
    }

    fn step<C: Asn1Container>(container: &mut C, buf: &mut BytesMut) -> DecodeResult<Advance> {
        let state = container.decoder_state_mut();

        let header = state.reader.read_header(buf)?;
        if state.reader.in_progress() {
            state.phase = DecodePhase::InProgress;
        }
        let Some(header) = header else {
            return Ok(Advance::NeedMore);
        };

        Self::check_scope(state, &header)?;
        let (transition, next_state) = Self::resolve::<C>(state, header.tag)?;

        let descend = header.tag.is_constructed() && !transition.is_opaque();
        let value = if descend {
            state.reader.skip_value();
            Bytes::new()
        } else {
            match state.reader.read_value(buf) {
                Some(value) => value,
                None => return Ok(Advance::NeedMore),
            }
        };

        log::trace!(
            "{}: {} -> {} on {}",
            C::grammar(state.grammar).name(),
            C::grammar(state.grammar).state_name(state.state),
            C::grammar(state.grammar).state_name(next_state),
            header.tag
        );
        state.state = next_state;
        state.end_allowed = false;
        state.pop_allowed = false;

        if let Some(action) = transition.action() {
            let tlv = Tlv::new(header, value);
            action(container, &tlv)?;
        }

        let state = container.decoder_state_mut();
        if !Self::consume(state, &header, descend) {
            return Ok(Advance::Continue);
        }
        if state.end_allowed {
            state.phase = DecodePhase::Complete;
            Ok(Advance::Complete)
        } else {
            let grammar = C::grammar(state.grammar);
            Err(DecodeError::UnexpectedEnd {
                grammar: grammar.name(),
                state: grammar.state_name(state.state),
            })
        }
    }

    /// Check the header against the PDU limits and the enclosing TLV
    fn check_scope<G>(state: &DecoderState<G>, header: &TlvHeader) -> DecodeResult<()> {
        match state.scopes.last() {
            None => {
                if header.tag.is_constructed() && header.length == 0 {
                    return Err(DecodeError::EmptyEnvelope);
                }
                if header.length > state.max_pdu_size {
                    return Err(DecodeError::PduTooLarge {
                        length: header.length,
                        max: state.max_pdu_size,
                    });
                }
            }
            Some(&remaining) => {
                if header.total_len() > remaining {
                    return Err(DecodeError::LengthExceedsScope {
                        length: header.total_len(),
                        remaining,
                    });
                }
            }
        }
        Ok(())
    }

    /// Find the transition for `tag`, entering or leaving grammars as needed
    ///
    /// A tag read at another depth than the transition expects has no
    /// transition: the active grammar pops if it may, otherwise the TLV is
    /// rejected.
    ///
    /// Repeating the call with the same tag after a suspension lands on the
    /// same transition: pushes and pops already applied are not undone, and
    /// the retried lookup succeeds directly in the grammar they led to.
    fn resolve<C: Asn1Container>(
        state: &mut DecoderState<C::GrammarId>,
        tag: BerTag,
    ) -> DecodeResult<(&'static Transition<C>, StateId)> {
        loop {
            let grammar: &'static Grammar<C> = C::grammar(state.grammar);
            let transition = state
                .relative_depth()
                .and_then(|depth| grammar.transition_at(state.state, tag, depth));
            match transition {
                Some(transition) => match transition.next() {
                    Next::State(next) => return Ok((transition, next)),
                    Next::Push {
                        grammar: child,
                        return_state,
                    } => {
                        if state.stack.len() >= MAX_GRAMMAR_DEPTH {
                            return Err(DecodeError::invalid(
                                "grammar",
                                format!("nesting deeper than {}", MAX_GRAMMAR_DEPTH),
                            ));
                        }
                        log::trace!("{}: entering {:?} on {}", grammar.name(), child, tag);
                        state.stack.push(GrammarFrame {
                            grammar: state.grammar,
                            return_state,
                            base: state.base,
                        });
                        state.grammar = child;
                        state.base = state.scopes.len();
                        state.state = Grammar::<C>::INITIAL_STATE;
                        state.pop_allowed = false;
                    }
                },
                None if state.pop_allowed => {
                    let Some(frame) = state.stack.pop() else {
                        return Err(Self::unexpected(grammar, state.state, tag));
                    };
                    log::trace!("{}: leaving on {}", grammar.name(), tag);
                    state.grammar = frame.grammar;
                    state.state = frame.return_state;
                    state.base = frame.base;
                }
                None => return Err(Self::unexpected(grammar, state.state, tag)),
            }
        }
    }

    fn unexpected<C: Asn1Container>(grammar: &Grammar<C>, state: StateId, tag: BerTag) -> DecodeError {
        DecodeError::UnexpectedTag {
            grammar: grammar.name(),
            state: grammar.state_name(state),
            tag: tag.to_string(),
        }
    }

    /// Charge a processed TLV to the enclosing scopes
    ///
    /// # Returns
    /// `true` when the outermost TLV has been fully consumed.
    fn consume<G>(state: &mut DecoderState<G>, header: &TlvHeader, descend: bool) -> bool {
        match state.scopes.last_mut() {
            Some(remaining) => *remaining -= header.total_len(),
            None if !descend => return true,
            None => {}
        }
        if descend {
            state.scopes.push(header.length);
        }
        while state.scopes.last() == Some(&0) {
            state.scopes.pop();
            if state.scopes.is_empty() {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::decoder::{decode_boolean_value, decode_integer_value, decode_utf8_value};
    use once_cell::sync::Lazy;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestGrammar {
        Record,
        Names,
    }

    #[derive(Debug)]
    struct Record {
        state: DecoderState<TestGrammar>,
        require_names: bool,
        number: i64,
        names: Vec<String>,
        flag: Option<bool>,
    }

    impl Record {
        fn new(max_pdu_size: usize) -> Self {
            Self {
                state: DecoderState::new(TestGrammar::Record, max_pdu_size),
                require_names: false,
                number: 0,
                names: Vec::new(),
                flag: None,
            }
        }
    }

    // Record ::= SEQUENCE { number INTEGER, names [0] SEQUENCE OF OCTET STRING OPTIONAL, flag BOOLEAN OPTIONAL }
    const RECORD_START: StateId = 0;
    const RECORD_SEQ: StateId = 1;
    const RECORD_NUMBER: StateId = 2;
    const RECORD_NAMES: StateId = 3;
    const RECORD_FLAG: StateId = 4;

    const NAMES_START: StateId = 0;
    const NAMES_LIST: StateId = 1;
    const NAMES_NAME: StateId = 2;

    fn store_number(record: &mut Record, tlv: &Tlv) -> DecodeResult<()> {
        record.number = decode_integer_value(tlv.value())?;
        let end = !record.require_names;
        record.grammar_end_allowed(end);
        Ok(())
    }

    fn open_names(record: &mut Record, _tlv: &Tlv) -> DecodeResult<()> {
        record.grammar_end_allowed(true);
        record.grammar_pop_allowed(true);
        Ok(())
    }

    fn store_name(record: &mut Record, tlv: &Tlv) -> DecodeResult<()> {
        record.names.push(decode_utf8_value("name", tlv.value())?);
        record.grammar_end_allowed(true);
        record.grammar_pop_allowed(true);
        Ok(())
    }

    fn store_flag(record: &mut Record, tlv: &Tlv) -> DecodeResult<()> {
        record.flag = Some(decode_boolean_value(tlv.value())?);
        record.grammar_end_allowed(true);
        Ok(())
    }

    static RECORD_GRAMMAR: Lazy<Grammar<Record>> = Lazy::new(|| {
        let mut grammar = Grammar::new(
            TestGrammar::Record,
            "Record",
            &[("START", 0), ("SEQ", 0), ("NUMBER", 1), ("NAMES", 1), ("FLAG", 1)],
        );
        grammar
            .on_pure(RECORD_START, BerTag::SEQUENCE, RECORD_SEQ)
            .on(RECORD_SEQ, BerTag::INTEGER, RECORD_NUMBER, store_number)
            .push(
                RECORD_NUMBER,
                BerTag::context_specific(true, 0),
                TestGrammar::Names,
                RECORD_NAMES,
            )
            .on(RECORD_NUMBER, BerTag::BOOLEAN, RECORD_FLAG, store_flag)
            .on(RECORD_NAMES, BerTag::BOOLEAN, RECORD_FLAG, store_flag);
        grammar
    });

    static NAMES_GRAMMAR: Lazy<Grammar<Record>> = Lazy::new(|| {
        let mut grammar = Grammar::new(
            TestGrammar::Names,
            "Names",
            &[("START", 0), ("LIST", 0), ("NAME", 1)],
        );
        grammar
            .on(NAMES_START, BerTag::context_specific(true, 0), NAMES_LIST, open_names)
            .on(NAMES_LIST, BerTag::OCTET_STRING, NAMES_NAME, store_name)
            .on(NAMES_NAME, BerTag::OCTET_STRING, NAMES_NAME, store_name);
        grammar
    });

    impl Asn1Container for Record {
        type GrammarId = TestGrammar;

        fn grammar(id: TestGrammar) -> &'static Grammar<Self> {
            match id {
                TestGrammar::Record => &RECORD_GRAMMAR,
                TestGrammar::Names => &NAMES_GRAMMAR,
            }
        }

        fn decoder_state(&self) -> &DecoderState<TestGrammar> {
            &self.state
        }

        fn decoder_state_mut(&mut self) -> &mut DecoderState<TestGrammar> {
            &mut self.state
        }
    }

    const NUMBER_ONLY: [u8; 5] = [0x30, 0x03, 0x02, 0x01, 0x05];
    const FULL: [u8; 16] = [
        0x30, 0x0E, 0x02, 0x01, 0x05, 0xA0, 0x06, 0x04, 0x01, b'a', 0x04, 0x01, b'b', 0x01, 0x01,
        0xFF,
    ];

    #[test]
    fn test_decode_minimal_record() {
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&NUMBER_ONLY[..]);
        assert!(Asn1Decoder::decode(&mut record, &mut buf).unwrap());
        assert!(record.is_complete());
        assert_eq!(record.number, 5);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_pushed_grammar_pops_on_foreign_tag() {
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&FULL[..]);
        assert!(Asn1Decoder::decode(&mut record, &mut buf).unwrap());
        assert_eq!(record.names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(record.flag, Some(true));
        assert_eq!(record.state.depth(), 0);
        assert_eq!(record.state.nesting(), 0);
    }

    #[test]
    fn test_pushed_grammar_may_end_pdu() {
        let data = [0x30, 0x07, 0x02, 0x01, 0x05, 0xA0, 0x02, 0x04, 0x00];
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&data[..]);
        assert!(Asn1Decoder::decode(&mut record, &mut buf).unwrap());
        assert_eq!(record.names, vec![String::new()]);
        assert_eq!(record.flag, None);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut record = Record::new(1024);
        let mut buf = BytesMut::new();
        for (i, byte) in FULL.iter().enumerate() {
            buf.extend_from_slice(&[*byte]);
            let complete = Asn1Decoder::decode(&mut record, &mut buf).unwrap();
            assert_eq!(complete, i == FULL.len() - 1, "byte {}", i);
        }
        assert_eq!(record.number, 5);
        assert_eq!(record.names.len(), 2);
        assert_eq!(record.flag, Some(true));
    }

    #[test]
    fn test_stops_at_pdu_boundary() {
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&NUMBER_ONLY[..]);
        buf.extend_from_slice(&[0x30, 0x03]);
        assert!(Asn1Decoder::decode(&mut record, &mut buf).unwrap());
        assert_eq!(&buf[..], &[0x30, 0x03]);
        // Complete is sticky until reset
        assert_eq!(Asn1Decoder::advance(&mut record, &mut buf).unwrap(), Advance::Complete);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_reset_decodes_next_pdu() {
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&NUMBER_ONLY[..]);
        buf.extend_from_slice(&[0x30, 0x03, 0x02, 0x01, 0x07]);
        assert!(Asn1Decoder::decode(&mut record, &mut buf).unwrap());
        record.state.reset();
        assert!(record.state.is_idle());
        assert!(Asn1Decoder::decode(&mut record, &mut buf).unwrap());
        assert_eq!(record.number, 7);
    }

    #[test]
    fn test_truncated_input_needs_more() {
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&FULL[..10]);
        assert!(!Asn1Decoder::decode(&mut record, &mut buf).unwrap());
        assert_eq!(record.state.phase(), DecodePhase::InProgress);
        assert_eq!(record.state.grammar(), TestGrammar::Names);
    }

    #[test]
    fn test_unexpected_tag_poisons() {
        let data = [0x30, 0x03, 0x04, 0x01, 0x05];
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&data[..]);
        match Asn1Decoder::decode(&mut record, &mut buf) {
            Err(DecodeError::UnexpectedTag { grammar, state, .. }) => {
                assert_eq!(grammar, "Record");
                assert_eq!(state, "SEQ");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(record.state.phase(), DecodePhase::Failed);
        assert_eq!(
            Asn1Decoder::decode(&mut record, &mut buf),
            Err(DecodeError::Poisoned)
        );
    }

    #[test]
    fn test_pop_cascade_exhausted() {
        // INTEGER inside the names list: Names pops, Record has no use for it
        let data = [0x30, 0x08, 0x02, 0x01, 0x05, 0xA0, 0x03, 0x02, 0x01, 0x07];
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&data[..]);
        assert!(matches!(
            Asn1Decoder::decode(&mut record, &mut buf),
            Err(DecodeError::UnexpectedTag { grammar: "Record", state: "NAMES", .. })
        ));
    }

    #[test]
    fn test_element_inside_sibling_rejected() {
        // flag nested in the names list instead of following it
        let data = [
            0x30, 0x0B, 0x02, 0x01, 0x05, 0xA0, 0x06, 0x04, 0x01, b'a', 0x01, 0x01, 0xFF,
        ];
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&data[..]);
        assert!(matches!(
            Asn1Decoder::decode(&mut record, &mut buf),
            Err(DecodeError::UnexpectedTag { grammar: "Record", state: "NAMES", .. })
        ));
    }

    #[test]
    fn test_element_after_closed_list_rejected() {
        // second name follows the names list instead of sitting in it
        let data = [
            0x30, 0x0B, 0x02, 0x01, 0x05, 0xA0, 0x03, 0x04, 0x01, b'a', 0x04, 0x01, b'b',
        ];
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&data[..]);
        assert!(matches!(
            Asn1Decoder::decode(&mut record, &mut buf),
            Err(DecodeError::UnexpectedTag { grammar: "Record", state: "NAMES", .. })
        ));
        assert_eq!(record.names, vec!["a".to_string()]);
    }

    #[test]
    fn test_unknown_context_tag() {
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&[0x30, 0x05, 0x02, 0x01, 0x05, 0xA1, 0x00][..]);
        assert!(matches!(
            Asn1Decoder::decode(&mut record, &mut buf),
            Err(DecodeError::UnexpectedTag { grammar: "Record", state: "NUMBER", .. })
        ));
    }

    #[test]
    fn test_child_longer_than_parent() {
        let data = [0x30, 0x03, 0x02, 0x05, 0x01];
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&data[..]);
        assert_eq!(
            Asn1Decoder::decode(&mut record, &mut buf),
            Err(DecodeError::LengthExceedsScope {
                length: 7,
                remaining: 3
            })
        );
    }

    #[test]
    fn test_empty_envelope() {
        let mut record = Record::new(1024);
        let mut buf = BytesMut::from(&[0x30, 0x00][..]);
        assert_eq!(
            Asn1Decoder::decode(&mut record, &mut buf),
            Err(DecodeError::EmptyEnvelope)
        );
    }

    #[test]
    fn test_pdu_too_large() {
        let mut record = Record::new(16);
        let mut buf = BytesMut::from(&[0x30, 0x81, 0x20][..]);
        assert_eq!(
            Asn1Decoder::decode(&mut record, &mut buf),
            Err(DecodeError::PduTooLarge { length: 32, max: 16 })
        );
    }

    #[test]
    fn test_end_not_allowed() {
        let mut record = Record::new(1024);
        record.require_names = true;
        let mut buf = BytesMut::from(&NUMBER_ONLY[..]);
        assert_eq!(
            Asn1Decoder::decode(&mut record, &mut buf),
            Err(DecodeError::UnexpectedEnd {
                grammar: "Record",
                state: "NUMBER"
            })
        );
    }
}
