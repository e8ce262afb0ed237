//! Calculation of follow set function.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet},
    types::Map,
    util::display_fn,
    InvariantError,
};
use std::fmt;

/// FOLLOW sets of every nonterminal in a grammar.
#[derive(Debug)]
pub struct FollowSets {
    follow_sets: Map<NonterminalID, TerminalSet>,
    passes: usize,
}

impl FollowSets {
    pub fn new(g: &Grammar, first_sets: &FirstSets) -> Result<Self, InvariantError> {
        let span = tracing::debug_span!("follow_sets");
        let _entered = span.enter();

        let mut map: Map<NonterminalID, TerminalSet> = g
            .nonterminals
            .keys()
            .map(|&n| (n, TerminalSet::default()))
            .collect();
        map[&g.start_symbol].insert(TerminalID::EOI);

        let limit = crate::pass_limit(g);
        let mut passes = 0;
        loop {
            passes += 1;
            if passes > limit {
                return Err(InvariantError::NotConverged {
                    phase: "FOLLOW",
                    passes: limit,
                });
            }

            let mut changed = false;
            for production in g.productions.values() {
                // A -> α X β
                for (i, symbol) in production.right.iter().enumerate() {
                    let x = match symbol {
                        SymbolID::N(x) => *x,
                        SymbolID::T(..) => continue,
                    };
                    let beta = &production.right[i + 1..];

                    let mut added = first_sets.first_of_sequence(beta);
                    if added.remove(TerminalID::EPSILON) {
                        // β is empty or nullable: whatever follows A follows X.
                        added.union_with(&map[&production.left]);
                    }
                    changed |= map[&x].union_with(&added);
                }
            }
            tracing::trace!("pass {}: changed = {}", passes, changed);

            if !changed {
                break;
            }
        }
        tracing::debug!("converged after {} passes", passes);

        Ok(Self {
            follow_sets: map,
            passes,
        })
    }

    /// `FOLLOW(n)`
    pub fn follow(&self, n: NonterminalID) -> &TerminalSet {
        self.follow_sets.get(&n).expect("unexpected nonterminal")
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &TerminalSet)> + '_ {
        self.follow_sets.iter().map(|(n, set)| (*n, set))
    }

    /// `FOLLOW(X) = { ... }` for every nonterminal, in definition order.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for &n in g.nonterminals.keys().filter(|n| **n != NonterminalID::START) {
                let follow = self.follow(n);
                writeln!(f, "FOLLOW({}) = {}", g.nonterminal_name(n), follow.display(g))?;
            }
            Ok(())
        })
    }
}
