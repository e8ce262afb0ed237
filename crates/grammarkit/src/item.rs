//! LR(0) items and the CLOSURE/GOTO functions.

use crate::{
    grammar::{Grammar, NonterminalID, Production, ProductionID, SymbolID},
    types::Set,
    util::display_fn,
    InvariantError,
};
use std::fmt;

/// The LR(0) item, a.k.a. LR item core.
///
/// A production together with the position of the dot. Productions are
/// unique within a grammar, so the production ID stands for the pair of its
/// head and body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub production: ProductionID,
    pub index: u16,
}

impl LR0Item {
    pub const fn new(production: ProductionID, index: u16) -> Self {
        Self { production, index }
    }

    pub fn production<'g>(&self, g: &'g Grammar) -> &'g Production {
        g.production(self.production)
    }

    pub fn head(&self, g: &Grammar) -> NonterminalID {
        self.production(g).left
    }

    pub fn body<'g>(&self, g: &'g Grammar) -> &'g [SymbolID] {
        &self.production(g).right
    }

    /// The symbol right after the dot, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        self.body(g).get(usize::from(self.index)).copied()
    }

    /// Whether the dot is at the right end of the production.
    pub fn is_reduce_ready(&self, g: &Grammar) -> bool {
        usize::from(self.index) == self.body(g).len()
    }

    /// The item with the dot moved one symbol to the right.
    pub fn advance(&self) -> Self {
        Self {
            index: self.index + 1,
            ..*self
        }
    }

    pub fn validate(&self, g: &Grammar) -> Result<(), InvariantError> {
        let len = self.body(g).len();
        if usize::from(self.index) > len {
            return Err(InvariantError::MalformedItem {
                production: self.production,
                index: self.index,
                len,
            });
        }
        Ok(())
    }

    /// `A -> α . β`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} ->", g.nonterminal_name(self.head(g)))?;
            let body = self.body(g);
            for (i, symbol) in body.iter().enumerate() {
                if i == usize::from(self.index) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if usize::from(self.index) >= body.len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// A set of LR(0) items.
///
/// Items are kept sorted, so two sets with the same content have the same
/// representation and compare and hash equal regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ItemSet {
    items: Vec<LR0Item>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: LR0Item) -> bool {
        match self.items.binary_search(&item) {
            Ok(..) => false,
            Err(pos) => {
                self.items.insert(pos, item);
                true
            }
        }
    }

    pub fn contains(&self, item: &LR0Item) -> bool {
        self.items.binary_search(item).is_ok()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LR0Item> + '_ {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[LR0Item] {
        &self.items[..]
    }

    pub fn validate(&self, g: &Grammar) -> Result<(), InvariantError> {
        self.items.iter().try_for_each(|item| item.validate(g))
    }

    /// Every item on its own line, sorted by its textual form.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let mut lines: Vec<String> = self
                .items
                .iter()
                .map(|item| item.display(g).to_string())
                .collect();
            lines.sort();
            for line in lines {
                writeln!(f, "{}", line)?;
            }
            Ok(())
        })
    }
}

impl FromIterator<LR0Item> for ItemSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = LR0Item>,
    {
        let mut items: Vec<_> = iter.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Self { items }
    }
}

/// `CLOSURE(items)`
///
/// For every item `[A -> α . B β]` add `[B -> . γ]` for each production of
/// `B`, until a full scan adds nothing.
pub fn closure(items: &ItemSet, g: &Grammar) -> ItemSet {
    let mut items = items.clone();
    let mut added = vec![];
    loop {
        added.clear();
        for item in items.iter() {
            if let Some(SymbolID::N(n)) = item.next_symbol(g) {
                for (id, _) in g.productions_of(n) {
                    let new_item = LR0Item::new(id, 0);
                    if !items.contains(&new_item) {
                        added.push(new_item);
                    }
                }
            }
        }

        let changed = added
            .drain(..)
            .fold(false, |changed, item| changed | items.insert(item));
        if !changed {
            break;
        }
    }
    items
}

/// `GOTO(items, symbol)`
///
/// An empty result means there is no transition on `symbol`.
pub fn goto(items: &ItemSet, symbol: SymbolID, g: &Grammar) -> ItemSet {
    let kernels: ItemSet = items
        .iter()
        .filter(|item| item.next_symbol(g) == Some(symbol))
        .map(LR0Item::advance)
        .collect();
    if kernels.is_empty() {
        return kernels;
    }
    closure(&kernels, g)
}

/// The symbols right after a dot in `items`: terminals first, then
/// nonterminals, each group sorted by name.
pub fn symbols_after_dot(items: &ItemSet, g: &Grammar) -> Vec<SymbolID> {
    let mut symbols: Vec<SymbolID> = items
        .iter()
        .filter_map(|item| item.next_symbol(g))
        .collect::<Set<_>>()
        .into_iter()
        .collect();
    symbols.sort_by(|a, b| {
        let key = |s: &SymbolID| (!s.is_terminal(), g.symbol_name(*s));
        key(a).cmp(&key(b))
    });
    symbols
}
