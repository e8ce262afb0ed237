//! Grammar analysis for compiler front-ends: FIRST/FOLLOW sets and the
//! canonical collection of LR(0) item sets.

pub mod first_sets;
pub mod follow_sets;
pub mod grammar;
pub mod item;
pub mod lr0;
pub mod syntax;
pub mod types;
pub mod util;

/// Raised when an analysis breaks one of its own invariants.
///
/// The fixpoint computations always terminate on a closed grammar, so these
/// errors indicate a bug in this crate rather than bad input.
#[derive(Debug, thiserror::Error)]
pub enum InvariantError {
    #[error("{phase} did not converge after {passes} passes")]
    NotConverged { phase: &'static str, passes: usize },

    #[error("the automaton exceeded the limit of {limit} states")]
    TooManyStates { limit: usize },

    #[error("malformed item: dot position {index} in {production:?} of length {len}")]
    MalformedItem {
        production: grammar::ProductionID,
        index: u16,
        len: usize,
    },
}

/// Upper bound of full passes a monotone fixpoint over this grammar may take.
///
/// Every pass except the last adds at least one terminal (or marker) to one
/// nonterminal's set.
pub(crate) fn pass_limit(g: &grammar::Grammar) -> usize {
    g.terminals.len() * g.nonterminals.len() + 2
}
