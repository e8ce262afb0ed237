//! Syntax tree of the textual grammar notation.

#[derive(Debug)]
pub struct Grammar {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Stmt {
    Start(StartDesc),
    Nonterminal(NonterminalDesc),
    Rule(RuleDesc),
}

/// `@start S;`
#[derive(Debug)]
pub struct StartDesc {
    pub name: String,
}

/// `@nonterminal A, B;`
#[derive(Debug)]
pub struct NonterminalDesc {
    pub idents: Vec<String>,
}

/// `S = a B c | d`
#[derive(Debug)]
pub struct RuleDesc {
    pub left: String,
    pub productions: Vec<Production>,
}

#[derive(Debug)]
pub struct Production {
    pub elems: Vec<ProductionElem>,
}

#[derive(Debug, PartialEq)]
pub enum ProductionElem {
    Ident(String),
    Empty,
}
