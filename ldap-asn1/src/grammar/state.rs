//! Decode container bookkeeping

use crate::ber::TlvReader;
use crate::grammar::table::{Grammar, StateId};
use std::fmt;

/// A grammar to return to when the active one pops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarFrame<G> {
    /// Grammar that pushed the active one
    pub grammar: G,
    /// State to resume in
    pub return_state: StateId,
    /// Nesting of the first TLV of `grammar`
    pub base: usize,
}

/// Progress of the PDU being decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePhase {
    /// No byte of the next PDU consumed yet
    #[default]
    Idle,
    /// Some bytes consumed, PDU not finished
    InProgress,
    /// PDU fully decoded
    Complete,
    /// A fatal error occurred; the state is unusable until reset
    Failed,
}

/// Engine-owned part of a decode container
///
/// Holds everything needed to resume decoding at the exact byte where the
/// input ran out: the partially read TLV header, the active grammar, its
/// state and the nesting its first TLV was read at, the grammar stack, the
/// remaining lengths of the enclosing constructed TLVs, and the two flags
/// actions use to declare legal end and pop points.
#[derive(Debug, Clone)]
pub struct DecoderState<G> {
    pub(crate) reader: TlvReader,
    pub(crate) root: G,
    pub(crate) grammar: G,
    pub(crate) state: StateId,
    pub(crate) base: usize,
    pub(crate) stack: Vec<GrammarFrame<G>>,
    pub(crate) scopes: Vec<usize>,
    pub(crate) end_allowed: bool,
    pub(crate) pop_allowed: bool,
    pub(crate) phase: DecodePhase,
    pub(crate) max_pdu_size: usize,
}

impl<G: Copy> DecoderState<G> {
    /// Create a state positioned at the initial state of `root`
    ///
    /// # Arguments
    /// * `root` - Grammar of the outermost TLV
    /// * `max_pdu_size` - Largest accepted outermost value length
    pub fn new(root: G, max_pdu_size: usize) -> Self {
        Self {
            reader: TlvReader::new(),
            root,
            grammar: root,
            state: 0,
            base: 0,
            stack: Vec::new(),
            scopes: Vec::new(),
            end_allowed: false,
            pop_allowed: false,
            phase: DecodePhase::Idle,
            max_pdu_size,
        }
    }

    /// Prepare for the next PDU
    pub fn reset(&mut self) {
        *self = Self::new(self.root, self.max_pdu_size);
    }

    /// Get the decode phase
    pub fn phase(&self) -> DecodePhase {
        self.phase
    }

    /// Check if the PDU is fully decoded
    pub fn is_complete(&self) -> bool {
        self.phase == DecodePhase::Complete
    }

    /// Check if no byte of the current PDU has been consumed
    pub fn is_idle(&self) -> bool {
        self.phase == DecodePhase::Idle
    }

    /// Get the active grammar
    pub fn grammar(&self) -> G {
        self.grammar
    }

    /// Get the current state in the active grammar
    pub fn state(&self) -> StateId {
        self.state
    }

    /// Number of grammars pushed above the root
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of constructed TLVs currently open
    pub fn nesting(&self) -> usize {
        self.scopes.len()
    }

    /// Nesting depth of the next TLV relative to the active grammar
    ///
    /// `None` once the TLVs of the active grammar are all closed.
    pub fn relative_depth(&self) -> Option<usize> {
        self.scopes.len().checked_sub(self.base)
    }

    /// Whether the PDU may legally end here
    pub fn end_allowed(&self) -> bool {
        self.end_allowed
    }

    /// Whether the active grammar may pop here
    pub fn pop_allowed(&self) -> bool {
        self.pop_allowed
    }

    /// Largest accepted outermost value length
    pub fn max_pdu_size(&self) -> usize {
        self.max_pdu_size
    }
}

/// Per-PDU mutable decode context
///
/// Implementors own a [`DecoderState`] and the partially built message.
/// Grammar actions receive the container and write into it; the engine only
/// touches the decoder state.
pub trait Asn1Container: Sized + 'static {
    /// Identifier of the grammars this container is decoded with
    type GrammarId: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    /// Resolve a grammar identifier to its table
    fn grammar(id: Self::GrammarId) -> &'static Grammar<Self>;

    /// Get the engine bookkeeping
    fn decoder_state(&self) -> &DecoderState<Self::GrammarId>;

    /// Get the engine bookkeeping mutably
    fn decoder_state_mut(&mut self) -> &mut DecoderState<Self::GrammarId>;

    /// Declare whether the PDU may end after the current transition
    ///
    /// Called by actions only. The flag is cleared before every transition.
    fn grammar_end_allowed(&mut self, allowed: bool) {
        self.decoder_state_mut().end_allowed = allowed;
    }

    /// Declare whether the active grammar may hand control back to its
    /// parent after the current transition
    ///
    /// Called by actions only. The flag is cleared before every transition.
    fn grammar_pop_allowed(&mut self, allowed: bool) {
        self.decoder_state_mut().pop_allowed = allowed;
    }

    /// Check if the PDU is fully decoded
    fn is_complete(&self) -> bool {
        self.decoder_state().is_complete()
    }
}
