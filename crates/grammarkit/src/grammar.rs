//! Context-free grammars.

use crate::{
    syntax::{ast as s, SyntaxError},
    types::Map,
    util::{display_fn, write_sorted_set},
};
use std::{fmt, fs, io, path::Path};

// ==== Symbols ====

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalID(u16);
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self(0);

    /// Reserved symbol that stands for the empty string.
    pub const EPSILON: Self = Self(1);

    const OFFSET: u16 = 2;

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.0 < Self::OFFSET
    }
}
impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOI => write!(f, "T#End"),
            &Self::EPSILON => write!(f, "T#Empty"),
            _ => write!(f, "T#{:03}", self.0),
        }
    }
}

/// A set of terminal symbols, possibly including the reserved
/// end-of-input and epsilon markers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.0.into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.0.into())
    }
    pub fn remove(&mut self, id: TerminalID) -> bool {
        self.inner.remove(id.0.into())
    }
    /// Add every element of `other`, returning whether this set grew.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }
    pub fn is_subset(&self, other: &Self) -> bool {
        self.inner.is_subset(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        // Raw values always originate from a `u16`.
        self.inner.iter().map(|raw| TerminalID(raw as u16))
    }

    /// `{ a, b, ε }`, sorted by name.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| write_sorted_set(f, self.iter().map(|t| g.terminal_name(t))))
    }
}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.0.into()).collect(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalID(u16);
impl NonterminalID {
    /// Reserved for the fresh start symbol introduced by augmentation.
    pub const START: Self = Self(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::START => write!(f, "N#Start"),
            _ => write!(f, "N#{:03}", self.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}
impl SymbolID {
    pub const EOI: Self = Self::T(TerminalID::EOI);
    pub const EPSILON: Self = Self::T(TerminalID::EPSILON);

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::T(..))
    }
}
impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}
impl From<TerminalID> for SymbolID {
    fn from(t: TerminalID) -> Self {
        Self::T(t)
    }
}
impl From<NonterminalID> for SymbolID {
    fn from(n: NonterminalID) -> Self {
        Self::N(n)
    }
}

// ==== Productions ====

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionID(u16);
impl ProductionID {
    /// The production `S' -> S` added by augmentation.
    pub const ACCEPT: Self = Self(u16::MAX);
}
impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::ACCEPT => write!(f, "P#Accept"),
            _ => write!(f, "P#{:03}", self.0),
        }
    }
}

/// A production rule. An empty right-hand side is an epsilon production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub left: NonterminalID,
    pub right: Vec<SymbolID>,
}
impl Production {
    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} -> ", g.nonterminal_name(self.left))?;
            write_body(f, g, &self.right)
        })
    }
}

fn write_body(f: &mut fmt::Formatter<'_>, g: &Grammar, body: &[SymbolID]) -> fmt::Result {
    if body.is_empty() {
        return f.write_str("ε");
    }
    for (i, symbol) in body.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        f.write_str(g.symbol_name(*symbol))?;
    }
    Ok(())
}

// ==== Grammar ====

/// The grammar definition consumed by the analyses.
///
/// A `Grammar` can only be obtained through [`Grammar::define`] (or the
/// textual readers built on top of it), which guarantees that it is closed:
/// every nonterminal has at least one production, so no analysis has to
/// check symbol membership again.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, String>,
    pub nonterminals: Map<NonterminalID, String>,
    pub productions: Map<ProductionID, Production>,
    pub start_symbol: NonterminalID,
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let source = fs::read_to_string(path).map_err(GrammarError::IO)?;
        Self::from_str(&source)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Self, GrammarError> {
        let grammar = crate::syntax::parse(source)?;
        Self::define(|g| define_grammar_from_syntax(g, grammar))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            start: None,
            next_terminal: TerminalID::OFFSET,
            next_nonterminal: NonterminalID::OFFSET,
            next_production: 0,
        };
        def.terminals.insert(TerminalID::EOI, "$".into());
        def.terminals.insert(TerminalID::EPSILON, "ε".into());

        f(&mut def)?;

        def.end()
    }

    pub fn terminal_name(&self, id: TerminalID) -> &str {
        self.terminals.get(&id).map_or("<unknown>", String::as_str)
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        self.nonterminals.get(&id).map_or("<unknown>", String::as_str)
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }

    /// Look up a terminal or nonterminal by its name.
    pub fn symbol(&self, name: &str) -> Option<SymbolID> {
        let t = self
            .terminals
            .iter()
            .find_map(|(id, n)| (n == name).then_some(SymbolID::T(*id)));
        t.or_else(|| {
            self.nonterminals
                .iter()
                .find_map(|(id, n)| (n == name).then_some(SymbolID::N(*id)))
        })
    }

    /// Terminals declared by the user, without the reserved markers.
    pub fn user_terminals(&self) -> impl Iterator<Item = (TerminalID, &str)> + '_ {
        self.terminals
            .iter()
            .filter(|(id, _)| !id.is_reserved())
            .map(|(id, name)| (*id, name.as_str()))
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// The productions of `left`, in definition order.
    pub fn productions_of(
        &self,
        left: NonterminalID,
    ) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.productions
            .iter()
            .filter(move |(_, p)| p.left == left)
            .map(|(id, p)| (*id, p))
    }

    pub fn is_augmented(&self) -> bool {
        self.productions.contains_key(&ProductionID::ACCEPT)
    }

    /// The start symbol of the augmented grammar, if augmented.
    pub fn accept_symbol(&self) -> Option<NonterminalID> {
        self.is_augmented().then_some(NonterminalID::START)
    }

    /// Return a copy of this grammar with a fresh start symbol `S'` and the
    /// single production `S' -> S` prepended.
    ///
    /// The fresh name is the start symbol's name followed by primes, adding
    /// primes until the name is not used by any other symbol.
    pub fn augment(&self) -> Grammar {
        if self.is_augmented() {
            return self.clone();
        }

        let mut name = format!("{}'", self.nonterminal_name(self.start_symbol));
        while self.symbol(&name).is_some() {
            name.push('\'');
        }
        tracing::debug!("augmented start symbol: {}", name);

        let mut nonterminals = Map::default();
        nonterminals.insert(NonterminalID::START, name);
        nonterminals.extend(self.nonterminals.iter().map(|(id, n)| (*id, n.clone())));

        let mut productions = Map::default();
        productions.insert(
            ProductionID::ACCEPT,
            Production {
                left: NonterminalID::START,
                right: vec![SymbolID::N(self.start_symbol)],
            },
        );
        productions.extend(self.productions.iter().map(|(id, p)| (*id, p.clone())));

        Grammar {
            terminals: self.terminals.clone(),
            nonterminals,
            productions,
            start_symbol: self.start_symbol,
        }
    }
}

/// Rules grouped by their left-hand side: `A -> x y | z | ε`.
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (&id, name) in &self.nonterminals {
            write!(f, "{} -> ", name)?;
            for (i, (_, p)) in self.productions_of(id).enumerate() {
                if i > 0 {
                    f.write_str(" | ")?;
                }
                write_body(f, self, &p.right)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn define_grammar_from_syntax(g: &mut GrammarDef, grammar: s::Grammar) -> Result<(), GrammarError> {
    // Heads of rules and explicitly declared names are nonterminals. They are
    // registered up front so that a body may mention a nonterminal whose
    // rule appears later in the file.
    let mut nonterminals = Map::default();
    for stmt in &grammar.stmts {
        let names: Vec<&str> = match stmt {
            s::Stmt::Nonterminal(desc) => desc.idents.iter().map(String::as_str).collect(),
            s::Stmt::Rule(desc) => vec![desc.left.as_str()],
            s::Stmt::Start(..) => continue,
        };
        for name in names {
            if !nonterminals.contains_key(name) {
                let id = g.nonterminal(name)?;
                nonterminals.insert(name.to_owned(), id);
            }
        }
    }

    // @start が無ければ最初の規則の左辺を開始記号とする
    if let Some(s::Stmt::Rule(desc)) = grammar
        .stmts
        .iter()
        .find(|stmt| matches!(stmt, s::Stmt::Rule(..)))
    {
        g.start_symbol(nonterminals[desc.left.as_str()]);
    }

    let mut terminals = Map::default();
    for stmt in &grammar.stmts {
        match stmt {
            s::Stmt::Start(s::StartDesc { name }) => {
                let id = match nonterminals.get(name) {
                    Some(id) => *id,
                    None => {
                        // An unknown start symbol is a nonterminal without
                        // productions, reported as such when the definition ends.
                        let id = g.nonterminal(name)?;
                        nonterminals.insert(name.clone(), id);
                        id
                    }
                };
                g.start_symbol(id);
            }

            s::Stmt::Nonterminal(..) => (),

            s::Stmt::Rule(s::RuleDesc { left, productions }) => {
                let left = nonterminals[left.as_str()];
                for production in productions {
                    let mut right = vec![];
                    for elem in &production.elems {
                        let symbol = match elem {
                            s::ProductionElem::Empty => SymbolID::EPSILON,
                            s::ProductionElem::Ident(name) => {
                                if let Some(n) = nonterminals.get(name.as_str()) {
                                    SymbolID::N(*n)
                                } else if let Some(t) = terminals.get(name.as_str()) {
                                    SymbolID::T(*t)
                                } else {
                                    let t = g.terminal(name)?;
                                    terminals.insert(name.clone(), t);
                                    SymbolID::T(t)
                                }
                            }
                        };
                        right.push(symbol);
                    }
                    g.rule(left, right)?;
                }
            }
        }
    }

    Ok(())
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, String>,
    nonterminals: Map<NonterminalID, String>,
    productions: Map<ProductionID, Production>,
    start: Option<NonterminalID>,
    next_terminal: u16,
    next_nonterminal: u16,
    next_production: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarError> {
        self.verify_name(name)?;
        if self.next_terminal == u16::MAX {
            return Err(GrammarError::TooManySymbols);
        }
        let id = TerminalID(self.next_terminal);
        self.next_terminal += 1;
        self.terminals.insert(id, name.to_owned());
        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarError> {
        self.verify_name(name)?;
        if self.next_nonterminal == u16::MAX {
            return Err(GrammarError::TooManySymbols);
        }
        let id = NonterminalID(self.next_nonterminal);
        self.next_nonterminal += 1;
        self.nonterminals.insert(id, name.to_owned());
        Ok(id)
    }

    /// Specify a production rule into this grammer.
    ///
    /// Epsilon markers in `right` are dropped, so `A -> ε` and `A -> ε ε`
    /// both denote the empty production.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<ProductionID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<_> = right
            .into_iter()
            .filter(|s| *s != SymbolID::EPSILON)
            .collect();
        let production = Production { left, right };

        if production.right.contains(&SymbolID::EOI) {
            return Err(GrammarError::ReservedSymbol {
                production: self.render(&production),
            });
        }
        if self.productions.values().any(|p| *p == production) {
            return Err(GrammarError::DuplicateProduction {
                production: self.render(&production),
            });
        }
        // ProductionID::ACCEPT is the upper bound.
        if self.next_production == u16::MAX {
            return Err(GrammarError::TooManySymbols);
        }

        let id = ProductionID(self.next_production);
        self.next_production += 1;
        self.productions.insert(id, production);
        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) {
        self.start.replace(symbol);
    }

    fn verify_name(&self, name: &str) -> Result<(), GrammarError> {
        if !verify_ident(name) {
            return Err(GrammarError::InvalidName { name: name.into() });
        }
        if self.terminals.values().chain(self.nonterminals.values()).any(|n| n == name) {
            return Err(GrammarError::DuplicateSymbol { name: name.into() });
        }
        Ok(())
    }

    fn name(&self, symbol: SymbolID) -> &str {
        let name = match symbol {
            SymbolID::T(t) => self.terminals.get(&t),
            SymbolID::N(n) => self.nonterminals.get(&n),
        };
        name.map_or("<unknown>", String::as_str)
    }

    fn render(&self, production: &Production) -> String {
        let mut out = format!("{} ->", self.name(SymbolID::N(production.left)));
        if production.right.is_empty() {
            out.push_str(" ε");
        }
        for symbol in &production.right {
            out.push(' ');
            out.push_str(self.name(*symbol));
        }
        out
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        // start symbolが指定されていない場合は最初に宣言された非終端記号を用いる
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .next()
                .copied()
                .ok_or(GrammarError::MissingStart)?,
        };

        let has_productions = |n: NonterminalID| self.productions.values().any(|p| p.left == n);

        if !has_productions(start) {
            return Err(GrammarError::StartWithoutProductions {
                name: self.name(SymbolID::N(start)).into(),
            });
        }

        for production in self.productions.values() {
            for symbol in &production.right {
                match symbol {
                    SymbolID::N(n) if !has_productions(*n) => {
                        return Err(GrammarError::UndefinedNonterminal {
                            name: self.name(*symbol).into(),
                            production: self.render(production),
                        });
                    }
                    _ => (),
                }
            }
        }

        if let Some(name) = self
            .nonterminals
            .iter()
            .find_map(|(id, name)| (!has_productions(*id)).then_some(name))
        {
            return Err(GrammarError::EmptyNonterminal { name: name.clone() });
        }

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            productions: self.productions,
            start_symbol: start,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("Syntax error: {}", _0)]
    Syntax(#[from] SyntaxError),

    #[error("the nonterminal `{name}' used in `{production}' has no production")]
    UndefinedNonterminal { name: String, production: String },

    #[error("the nonterminal `{name}' has no production")]
    EmptyNonterminal { name: String },

    #[error("the grammar has no nonterminal to start from")]
    MissingStart,

    #[error("the start symbol `{name}' has no production")]
    StartWithoutProductions { name: String },

    #[error("the symbol `{name}' has already been declared")]
    DuplicateSymbol { name: String },

    #[error("duplicate production `{production}'")]
    DuplicateProduction { production: String },

    #[error("invalid symbol name: `{name}'")]
    InvalidName { name: String },

    #[error("the end-of-input marker cannot appear in `{production}'")]
    ReservedSymbol { production: String },

    #[error("too many symbols or productions")]
    TooManySymbols,
}

/// Identifiers are `XID_Start XID_Continue*`, optionally followed by primes
/// (`E'`, `T''`).
fn verify_ident(s: &str) -> bool {
    if s == "ε" {
        // Reserved for the epsilon marker.
        return false;
    }

    let s = s.trim_end_matches('\'');
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(ch) => ch,
        None => return false,
    };
    if !is_ident_start(first) {
        return false;
    }
    chars.all(is_ident_continue)
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_start(ch)
}

fn is_ident_continue(ch: char) -> bool {
    unicode_ident::is_xid_continue(ch)
}
