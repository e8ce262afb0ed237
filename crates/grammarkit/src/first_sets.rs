//! Calculation of first set function.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet},
    types::Map,
    util::display_fn,
    InvariantError,
};
use std::fmt;

/// FIRST sets of every symbol in a grammar.
///
/// `FIRST(X)` contains [`TerminalID::EPSILON`] iff `X` derives the empty
/// string.
#[derive(Debug)]
pub struct FirstSets {
    first_sets: Map<SymbolID, TerminalSet>,
    passes: usize,
}

impl FirstSets {
    pub fn new(g: &Grammar) -> Result<Self, InvariantError> {
        let span = tracing::debug_span!("first_sets");
        let _entered = span.enter();

        let mut map: Map<SymbolID, TerminalSet> = Map::default();

        // terminal symbols については First(T) = {T} になる (ε, $ を含む)
        for &t in g.terminals.keys() {
            map.insert(SymbolID::T(t), Some(t).into_iter().collect());
        }

        // nonterminal symbols は First(T) = {} と初期化する
        for &n in g.nonterminals.keys() {
            map.insert(SymbolID::N(n), TerminalSet::default());
        }

        // 値が更新されなくなるまで全構文規則を走査する
        let limit = crate::pass_limit(g);
        let mut passes = 0;
        loop {
            passes += 1;
            if passes > limit {
                return Err(InvariantError::NotConverged {
                    phase: "FIRST",
                    passes: limit,
                });
            }

            let mut changed = false;
            for production in g.productions.values() {
                let added = first_of_sequence(&map, &production.right);
                let first = &mut map[&SymbolID::N(production.left)];
                changed |= first.union_with(&added);
            }
            tracing::trace!("pass {}: changed = {}", passes, changed);

            if !changed {
                break;
            }
        }
        tracing::debug!("converged after {} passes", passes);

        Ok(Self {
            first_sets: map,
            passes,
        })
    }

    /// `FIRST(symbol)`
    pub fn first(&self, symbol: SymbolID) -> &TerminalSet {
        self.first_sets.get(&symbol).expect("unexpected symbol")
    }

    /// `FIRST(X1 X2 ... Xn)`; the empty sequence yields `{ε}`.
    pub fn first_of_sequence(&self, symbols: &[SymbolID]) -> TerminalSet {
        first_of_sequence(&self.first_sets, symbols)
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        self.first(symbol).contains(TerminalID::EPSILON)
    }

    /// The number of full passes over the grammar, including the final one
    /// that changed nothing.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolID, &TerminalSet)> + '_ {
        self.first_sets.iter().map(|(symbol, set)| (*symbol, set))
    }

    /// `FIRST(X) = { ... }` for every nonterminal, in definition order.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for &n in g.nonterminals.keys().filter(|n| **n != NonterminalID::START) {
                let first = self.first(SymbolID::N(n));
                writeln!(f, "FIRST({}) = {}", g.nonterminal_name(n), first.display(g))?;
            }
            Ok(())
        })
    }
}

fn first_of_sequence(map: &Map<SymbolID, TerminalSet>, symbols: &[SymbolID]) -> TerminalSet {
    let mut res = TerminalSet::default();
    for symbol in symbols {
        let first = &map[symbol];
        res.union_with(first);
        res.remove(TerminalID::EPSILON);
        if !first.contains(TerminalID::EPSILON) {
            return res;
        }
    }
    res.insert(TerminalID::EPSILON);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        let mut names: Vec<_> = set.iter().map(|t| g.terminal_name(t).to_owned()).collect();
        names.sort();
        names
    }

    fn first(g: &Grammar, first_sets: &FirstSets, name: &str) -> Vec<String> {
        names(g, first_sets.first(g.symbol(name).unwrap()))
    }

    #[test]
    fn nullable_tail() {
        let g = Grammar::from_str("S = a B c\nB = b | ε\n").unwrap();
        let first_sets = FirstSets::new(&g).unwrap();
        assert_eq!(first(&g, &first_sets, "B"), ["b", "ε"]);
        assert_eq!(first(&g, &first_sets, "S"), ["a"]);
        assert_eq!(first(&g, &first_sets, "a"), ["a"]);
        assert_eq!(names(&g, first_sets.first(SymbolID::EPSILON)), ["ε"]);
        assert_eq!(names(&g, first_sets.first(SymbolID::EOI)), ["$"]);
    }

    #[test]
    fn nullable_chain() {
        let g = Grammar::from_str(
            "\
S = a B D h
B = c C
C = b C | ε
D = E F
E = g | ε
F = f | ε
",
        )
        .unwrap();
        let first_sets = FirstSets::new(&g).unwrap();
        assert_eq!(first(&g, &first_sets, "S"), ["a"]);
        assert_eq!(first(&g, &first_sets, "B"), ["c"]);
        assert_eq!(first(&g, &first_sets, "C"), ["b", "ε"]);
        assert_eq!(first(&g, &first_sets, "D"), ["f", "g", "ε"]);
        assert_eq!(first(&g, &first_sets, "E"), ["g", "ε"]);
        assert_eq!(first(&g, &first_sets, "F"), ["f", "ε"]);
    }

    #[test]
    fn mutual_recursion() {
        // A memoizing recursive descent caches FIRST(A) = {} while computing
        // FIRST(B) and never revisits it.
        let g = Grammar::from_str("A = B c | x\nB = A d | y\n").unwrap();
        let first_sets = FirstSets::new(&g).unwrap();
        assert_eq!(first(&g, &first_sets, "A"), ["x", "y"]);
        assert_eq!(first(&g, &first_sets, "B"), ["x", "y"]);
    }

    #[test]
    fn left_recursion_through_nullable() {
        let g = Grammar::from_str("S = A S b | c\nA = ε | a\n").unwrap();
        let first_sets = FirstSets::new(&g).unwrap();
        assert_eq!(first(&g, &first_sets, "S"), ["a", "c"]);
        assert!(!first_sets.is_nullable(g.symbol("S").unwrap()));
        assert!(first_sets.is_nullable(g.symbol("A").unwrap()));
    }

    #[test]
    fn epsilon_iff_derives_empty() {
        let g = Grammar::from_str(
            "\
S = A B | x
A = B B
B = ε | b
C = C c | D
D = d
",
        )
        .unwrap();
        let first_sets = FirstSets::new(&g).unwrap();
        for (name, nullable) in [("S", true), ("A", true), ("B", true), ("C", false), ("D", false)] {
            assert_eq!(
                first_sets.is_nullable(g.symbol(name).unwrap()),
                nullable,
                "{}",
                name
            );
        }
    }

    #[test]
    fn sequences() {
        let g = Grammar::from_str("S = A b\nA = a | ε\n").unwrap();
        let first_sets = FirstSets::new(&g).unwrap();
        let a = g.symbol("A").unwrap();
        let b = g.symbol("b").unwrap();
        assert_eq!(names(&g, &first_sets.first_of_sequence(&[])), ["ε"]);
        assert_eq!(names(&g, &first_sets.first_of_sequence(&[a])), ["a", "ε"]);
        assert_eq!(names(&g, &first_sets.first_of_sequence(&[a, b])), ["a", "b"]);
        assert_eq!(names(&g, &first_sets.first_of_sequence(&[a, a])), ["a", "ε"]);
    }

    #[test]
    fn stable_after_convergence() {
        let g = Grammar::from_str(
            "\
E = T E'
E' = plus T E' | ε
T = F T'
T' = star F T' | ε
F = lp E rp | id
",
        )
        .unwrap();
        let first_sets = FirstSets::new(&g).unwrap();
        assert!(first_sets.passes() >= 2);

        // One more pass over the grammar adds nothing.
        for production in g.productions.values() {
            let added = first_sets.first_of_sequence(&production.right);
            assert!(added.is_subset(first_sets.first(SymbolID::N(production.left))));
        }
    }

    #[test]
    fn display_sorted() {
        let g = Grammar::from_str("S = a B c\nB = b | ε\n").unwrap();
        let first_sets = FirstSets::new(&g).unwrap();
        assert_eq!(
            first_sets.display(&g).to_string(),
            "FIRST(S) = { a }\nFIRST(B) = { b, ε }\n"
        );
    }
}
