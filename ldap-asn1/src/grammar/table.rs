//! Grammar tables

use crate::ber::{BerTag, Tlv};
use crate::grammar::state::Asn1Container;
use ldap_core::DecodeResult;
use std::collections::HashMap;
use std::fmt;

/// State identifier, scoped to one grammar
///
/// State 0 is always the grammar's initial state.
pub type StateId = u16;

/// Side effect run when a transition is taken
///
/// The TLV value borrows the decoder's input for the duration of the call;
/// actions copy whatever they keep into the container.
pub type Action<C> = fn(&mut C, &Tlv) -> DecodeResult<()>;

/// Destination of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next<G> {
    /// Move to another state of the same grammar
    State(StateId),
    /// Enter `grammar` at its initial state and retry the same tag there.
    /// Control comes back at `return_state` when the pushed grammar pops.
    Push { grammar: G, return_state: StateId },
}

/// One entry of a grammar table
pub struct Transition<C: Asn1Container> {
    next: Next<C::GrammarId>,
    action: Option<Action<C>>,
    opaque: bool,
}

impl<C: Asn1Container> Transition<C> {
    /// Get the destination
    pub fn next(&self) -> Next<C::GrammarId> {
        self.next
    }

    /// State the transition lands in once its TLV is read
    ///
    /// For a grammar switch this is the state control returns to.
    pub fn landing(&self) -> StateId {
        match self.next {
            Next::State(to) => to,
            Next::Push { return_state, .. } => return_state,
        }
    }

    /// Get the action, if any
    pub fn action(&self) -> Option<Action<C>> {
        self.action
    }

    /// Whether a constructed TLV is delivered whole instead of descended into
    pub fn is_opaque(&self) -> bool {
        self.opaque
    }
}

impl<C: Asn1Container> fmt::Debug for Transition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("next", &self.next)
            .field("has_action", &self.action.is_some())
            .field("opaque", &self.opaque)
            .finish()
    }
}

/// Grammar table: `(state, tag) -> transition`
///
/// Built once through the `on*`/`push` methods and never mutated afterwards.
///
/// Every state carries the nesting depth of the TLV that leads into it,
/// counted in constructed TLVs from the grammar's first TLV (depth 0). A
/// transition only matches a TLV read at the depth of the state it lands
/// in, so an element can neither leave the SEQUENCE or SET it belongs to
/// nor turn up inside a sibling.
///
/// # Usage Example
///
/// ```rust,ignore
/// let mut grammar = Grammar::new(
///     MyGrammar::Abandon,
///     "AbandonRequest",
///     &[("START", 0), ("END", 0)],
/// );
/// grammar.on(0, BerTag::from_byte(0x50), 1, store_abandoned_id);
/// ```
pub struct Grammar<C: Asn1Container> {
    id: C::GrammarId,
    name: &'static str,
    states: &'static [(&'static str, usize)],
    transitions: HashMap<(StateId, BerTag), Transition<C>>,
}

impl<C: Asn1Container> Grammar<C> {
    /// Initial state of every grammar
    pub const INITIAL_STATE: StateId = 0;

    /// Create an empty grammar
    ///
    /// # Arguments
    /// * `id` - Identifier the container resolves back to this grammar
    /// * `name` - Name used in logs and errors
    /// * `states` - State names and nesting depths, indexed by [`StateId`]
    pub fn new(
        id: C::GrammarId,
        name: &'static str,
        states: &'static [(&'static str, usize)],
    ) -> Self {
        Self {
            id,
            name,
            states,
            transitions: HashMap::new(),
        }
    }

    fn insert(&mut self, from: StateId, tag: BerTag, transition: Transition<C>) -> &mut Self {
        assert!(
            (from as usize) < self.states.len(),
            "grammar {}: unknown state {}",
            self.name,
            from
        );
        let to = transition.landing();
        assert!(
            (to as usize) < self.states.len(),
            "grammar {}: unknown state {}",
            self.name,
            to
        );
        let previous = self.transitions.insert((from, tag), transition);
        assert!(
            previous.is_none(),
            "grammar {}: duplicate transition from {} on {}",
            self.name,
            self.state_name(from),
            tag
        );
        self
    }

    /// Add a transition running `action`
    pub fn on(&mut self, from: StateId, tag: BerTag, to: StateId, action: Action<C>) -> &mut Self {
        self.insert(
            from,
            tag,
            Transition {
                next: Next::State(to),
                action: Some(action),
                opaque: false,
            },
        )
    }

    /// Add a pure state transition
    pub fn on_pure(&mut self, from: StateId, tag: BerTag, to: StateId) -> &mut Self {
        self.insert(
            from,
            tag,
            Transition {
                next: Next::State(to),
                action: None,
                opaque: false,
            },
        )
    }

    /// Add a transition delivering a constructed TLV whole to `action`
    pub fn on_opaque(
        &mut self,
        from: StateId,
        tag: BerTag,
        to: StateId,
        action: Action<C>,
    ) -> &mut Self {
        self.insert(
            from,
            tag,
            Transition {
                next: Next::State(to),
                action: Some(action),
                opaque: true,
            },
        )
    }

    /// Add a grammar switch
    pub fn push(
        &mut self,
        from: StateId,
        tag: BerTag,
        grammar: C::GrammarId,
        return_state: StateId,
    ) -> &mut Self {
        self.insert(
            from,
            tag,
            Transition {
                next: Next::Push {
                    grammar,
                    return_state,
                },
                action: None,
                opaque: false,
            },
        )
    }

    /// Look up the transition for `tag` in `state`
    pub fn transition(&self, state: StateId, tag: BerTag) -> Option<&Transition<C>> {
        self.transitions.get(&(state, tag))
    }

    /// Look up the transition for `tag` read at `depth` in `state`
    ///
    /// A transition tabulated for `(state, tag)` does not match when its
    /// landing state sits at another depth.
    pub fn transition_at(
        &self,
        state: StateId,
        tag: BerTag,
        depth: usize,
    ) -> Option<&Transition<C>> {
        self.transition(state, tag)
            .filter(|transition| self.state_depth(transition.landing()) == Some(depth))
    }

    /// Get the grammar identifier
    pub fn id(&self) -> C::GrammarId {
        self.id
    }

    /// Get the grammar name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the name of a state
    pub fn state_name(&self, state: StateId) -> &'static str {
        self.states
            .get(state as usize)
            .map(|(name, _)| *name)
            .unwrap_or("UNKNOWN")
    }

    /// Get the nesting depth of a state
    pub fn state_depth(&self, state: StateId) -> Option<usize> {
        self.states.get(state as usize).map(|(_, depth)| *depth)
    }

    /// Number of tabulated transitions
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if the grammar has no transitions
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl<C: Asn1Container> fmt::Debug for Grammar<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("transitions", &self.transitions.len())
            .finish()
    }
}
