//! Table-driven grammar engine
//!
//! An ASN.1 structure is decoded as a walk through a state machine. Each
//! [`Grammar`] is an immutable table `(state, tag) -> Transition` built once;
//! a transition names the next state (or another grammar to enter) and an
//! optional [`Action`] run against the container with the TLV just read.
//!
//! # State Transitions
//!
//! ```text
//! read TLV header
//!   -> lookup (state, tag) in the active grammar
//!        found Next::State   -> read value if primitive, run action
//!        found Next::Push    -> push (grammar, return state), retry the
//!                               same tag in the pushed grammar
//!        not found, popAllowed and a parent grammar exists
//!                            -> pop, retry the same tag in the parent
//!        not found           -> DecodeError::UnexpectedTag
//!   -> when the outermost TLV is fully consumed, the PDU is complete if the
//!      last action declared endAllowed
//! ```
//!
//! There are no wildcard transitions: every accepted tag at every state is
//! listed explicitly.

pub mod engine;
pub mod state;
pub mod table;

pub use engine::{Advance, Asn1Decoder};
pub use state::{Asn1Container, DecodePhase, DecoderState, GrammarFrame};
pub use table::{Action, Grammar, Next, StateId, Transition};
