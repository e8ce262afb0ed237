//! Canonical collection of LR(0) item sets.

use crate::{
    grammar::{Grammar, ProductionID, SymbolID},
    item::{self, ItemSet, LR0Item},
    types::Map,
    util::display_fn,
    InvariantError,
};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}
impl StateID {
    /// The state seeded with `CLOSURE({S' -> . S})`.
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct LR0State {
    pub items: ItemSet,
    /// Outgoing transitions, in the order the symbols were enumerated.
    pub transitions: Map<SymbolID, StateID>,
}

impl LR0State {
    /// Items with the dot at the right end.
    pub fn reduce_ready_items<'g>(
        &'g self,
        g: &'g Grammar,
    ) -> impl Iterator<Item = LR0Item> + 'g {
        self.items
            .iter()
            .filter(move |item| item.is_reduce_ready(g))
            .copied()
    }

    /// Whether this state holds `S' -> S .`.
    pub fn is_accepting(&self) -> bool {
        self.items.contains(&LR0Item::new(ProductionID::ACCEPT, 1))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for line in self.items.display(g).to_string().lines() {
                writeln!(f, "  {}", line)?;
            }
            Ok(())
        })
    }
}

/// Options for building the canonical collection.
#[derive(Debug, Clone)]
pub struct Config {
    max_states: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_states: usize::from(u16::MAX),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up with [`InvariantError::TooManyStates`] once the collection
    /// would grow beyond `max_states`. Clamped to the range of [`StateID`].
    pub fn max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states.min(usize::from(u16::MAX));
        self
    }

    pub fn build(&self, g: &Grammar) -> Result<LR0Automaton, InvariantError> {
        LR0Automaton::build_with(g, self)
    }
}

/// The canonical collection of LR(0) item sets together with its GOTO
/// function.
#[derive(Debug)]
pub struct LR0Automaton {
    grammar: Grammar,
    states: Map<StateID, LR0State>,
}

impl LR0Automaton {
    /// Calculate the LR(0) automaton based on the specified grammar.
    ///
    /// The grammar is augmented first unless it already is.
    pub fn build(g: &Grammar) -> Result<Self, InvariantError> {
        Self::build_with(g, &Config::default())
    }

    fn build_with(g: &Grammar, config: &Config) -> Result<Self, InvariantError> {
        let span = tracing::debug_span!("lr0");
        let _entered = span.enter();

        let g = g.augment();

        let mut states = Map::<StateID, LR0State>::default();
        let mut state_ids = Map::<ItemSet, StateID>::default();

        let kernels: ItemSet = Some(LR0Item::new(ProductionID::ACCEPT, 0))
            .into_iter()
            .collect();
        let start = item::closure(&kernels, &g);
        state_ids.insert(start.clone(), StateID::START);
        states.insert(
            StateID::START,
            LR0State {
                items: start,
                transitions: Map::default(),
            },
        );

        // 新しく見つかった状態は末尾に追加されるので、発見順に走査すれば良い
        let mut current = 0;
        while let Some((&id, state)) = states.get_index(current) {
            let symbols = item::symbols_after_dot(&state.items, &g);
            let targets: Vec<(SymbolID, ItemSet)> = symbols
                .into_iter()
                .map(|symbol| (symbol, item::goto(&state.items, symbol, &g)))
                .filter(|(_, items)| !items.is_empty())
                .collect();

            let mut transitions = Map::default();
            for (symbol, items) in targets {
                let next = match state_ids.get(&items) {
                    Some(next) => *next,
                    None => {
                        if states.len() >= config.max_states {
                            return Err(InvariantError::TooManyStates {
                                limit: config.max_states,
                            });
                        }
                        items.validate(&g)?;
                        // max_states is clamped to the range of u16
                        let next = StateID(states.len() as u16);
                        tracing::trace!(
                            "new state {} = GOTO({}, {})",
                            next,
                            id,
                            g.symbol_name(symbol)
                        );
                        state_ids.insert(items.clone(), next);
                        states.insert(
                            next,
                            LR0State {
                                items,
                                transitions: Map::default(),
                            },
                        );
                        next
                    }
                };
                transitions.insert(symbol, next);
            }
            states[&id].transitions = transitions;

            current += 1;
        }
        tracing::debug!("{} states", states.len());

        Ok(Self { grammar: g, states })
    }

    /// The augmented grammar the collection was built from.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &LR0State)> + '_ {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub fn state(&self, id: StateID) -> Option<&LR0State> {
        self.states.get(&id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// `GOTO(id, symbol)`, or `None` if there is no such transition.
    pub fn goto(&self, id: StateID, symbol: SymbolID) -> Option<StateID> {
        self.states.get(&id)?.transitions.get(&symbol).copied()
    }

    /// Every transition as `(from, symbol, to)`, ordered by source state and
    /// then by the enumeration order of the symbols.
    pub fn transitions(&self) -> impl Iterator<Item = (StateID, SymbolID, StateID)> + '_ {
        self.states.iter().flat_map(|(from, state)| {
            state
                .transitions
                .iter()
                .map(move |(symbol, to)| (*from, *symbol, *to))
        })
    }

    pub fn reduce_ready_items(&self, id: StateID) -> Vec<LR0Item> {
        match self.states.get(&id) {
            Some(state) => state.reduce_ready_items(&self.grammar).collect(),
            None => vec![],
        }
    }

    /// The state reached by `GOTO(I0, S)`, which holds `S' -> S .`.
    pub fn accepting_state(&self) -> Option<StateID> {
        self.states
            .iter()
            .find_map(|(id, state)| state.is_accepting().then_some(*id))
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            let g = &self.grammar;
            for (i, (id, state)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "{}:", id)?;
                write!(f, "{}", state.display(g))?;
                for (symbol, to) in &state.transitions {
                    writeln!(f, "  GOTO({}, {}) = {}", id, g.symbol_name(*symbol), to)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Set;
    use std::collections::VecDeque;

    const BALANCED: &str = "S = a S b | ε\n";

    const EXPR: &str = "\
E = E plus T | T
T = T star F | F
F = lp E rp | id
";

    fn build(source: &str) -> LR0Automaton {
        let g = Grammar::from_str(source).unwrap();
        LR0Automaton::build(&g).unwrap()
    }

    fn items(lr0: &LR0Automaton, id: StateID) -> Vec<String> {
        let g = lr0.grammar();
        lr0.state(id)
            .unwrap()
            .items
            .display(g)
            .to_string()
            .lines()
            .map(String::from)
            .collect()
    }

    fn symbol(lr0: &LR0Automaton, name: &str) -> SymbolID {
        lr0.grammar().symbol(name).unwrap()
    }

    #[test]
    fn balanced_parens() {
        let lr0 = build(BALANCED);
        let a = symbol(&lr0, "a");
        let b = symbol(&lr0, "b");
        let s = symbol(&lr0, "S");

        assert_eq!(
            items(&lr0, StateID::START),
            ["S -> .", "S -> . a S b", "S' -> . S"]
        );

        // terminals are enumerated before nonterminals
        let i1 = lr0.goto(StateID::START, a).unwrap();
        assert_eq!(i1, StateID::from_raw(1));
        assert_eq!(items(&lr0, i1), ["S -> .", "S -> . a S b", "S -> a . S b"]);

        let accept = lr0.goto(StateID::START, s).unwrap();
        assert_eq!(lr0.accepting_state(), Some(accept));
        assert_eq!(items(&lr0, accept), ["S' -> S ."]);

        assert_eq!(lr0.goto(i1, a), Some(i1));
        assert_eq!(lr0.goto(i1, b), None);
        let i3 = lr0.goto(i1, s).unwrap();
        let i4 = lr0.goto(i3, b).unwrap();
        assert_eq!(items(&lr0, i4), ["S -> a S b ."]);

        let reduces: Vec<_> = lr0
            .reduce_ready_items(i4)
            .iter()
            .map(|item| item.display(lr0.grammar()).to_string())
            .collect();
        assert_eq!(reduces, ["S -> a S b ."]);
        assert_eq!(lr0.reduce_ready_items(StateID::START).len(), 1);

        assert_eq!(lr0.len(), 5);
    }

    #[test]
    fn display_states() {
        let lr0 = build(BALANCED);
        let text = lr0.display().to_string();
        assert!(text.starts_with(
            "\
I0:
  S -> .
  S -> . a S b
  S' -> . S
  GOTO(I0, a) = I1
  GOTO(I0, S) = I2
"
        ));
        assert!(text.contains("I4:\n  S -> a S b .\n"));
    }

    #[test]
    fn states_are_distinct() {
        let lr0 = build(EXPR);
        let distinct: Set<&ItemSet> = lr0.states().map(|(_, state)| &state.items).collect();
        assert_eq!(distinct.len(), lr0.len());
        assert_eq!(lr0.len(), 12);
    }

    #[test]
    fn every_state_is_reachable() {
        let lr0 = build(EXPR);
        let mut visited = Set::default();
        let mut queue = VecDeque::from([StateID::START]);
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            for (_, to) in &lr0.state(id).unwrap().transitions {
                queue.push_back(*to);
            }
        }
        assert_eq!(visited.len(), lr0.len());
    }

    #[test]
    fn transitions_agree_with_goto() {
        let lr0 = build(EXPR);
        let g = lr0.grammar();
        for (from, symbol, to) in lr0.transitions() {
            let state = lr0.state(from).unwrap();
            let expected = item::goto(&state.items, symbol, g);
            assert_eq!(lr0.state(to).unwrap().items, expected);
        }
        // reduce-ready items never have an outgoing edge on their own
        for (id, state) in lr0.states() {
            if state.items.iter().all(|item| item.is_reduce_ready(g)) {
                assert!(lr0.transitions().all(|(from, _, _)| from != id));
            }
        }
    }

    #[test]
    fn deterministic() {
        let g = Grammar::from_str(EXPR).unwrap();
        let first = LR0Automaton::build(&g).unwrap();
        let second = LR0Automaton::build(&g.augment()).unwrap();
        assert_eq!(first.display().to_string(), second.display().to_string());
        assert_eq!(
            first.transitions().collect::<Vec<_>>(),
            second.transitions().collect::<Vec<_>>()
        );
    }

    #[test]
    fn state_limit() {
        let g = Grammar::from_str(EXPR).unwrap();
        let err = Config::new().max_states(5).build(&g).unwrap_err();
        assert!(matches!(err, InvariantError::TooManyStates { limit: 5 }));

        let lr0 = Config::new().max_states(12).build(&g).unwrap();
        assert_eq!(lr0.len(), 12);
    }

    #[test]
    fn start_name_is_fresh() {
        let lr0 = build("S = S' x | y\nS' = z\n");
        let g = lr0.grammar();
        assert_eq!(g.nonterminal_name(g.accept_symbol().unwrap()), "S''");
        assert_eq!(items(&lr0, lr0.accepting_state().unwrap()), ["S'' -> S ."]);
    }
}
