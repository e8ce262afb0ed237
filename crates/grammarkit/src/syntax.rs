//! Reader for the textual grammar notation.
//!
//! ```text
//! @start S;             // optional, defaults to the head of the first rule
//! @nonterminal D;       // optional, declares a nonterminal explicitly
//! S = a B c             // a rule ends at a newline or a semicolon
//! B = b
//!   | ε                 // a line starting with '|' continues the rule
//! ```
//!
//! `->` may be used in place of `=`, and `@empty` in place of `ε`.

pub mod ast;
pub mod lexer;

use self::lexer::{Keyword, Lexer, Spanned, Token};

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("line {line}: unrecognized input")]
    Lex { line: usize },

    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        line: usize,
        expected: &'static str,
        found: String,
    },
}

pub fn parse(source: &str) -> Result<ast::Grammar, SyntaxError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut tokens = vec![];
    for res in Lexer::new(source) {
        let (start, token, _end): Spanned<'_> =
            res.map_err(|err| SyntaxError::Lex {
                line: err.location.line as usize + 1,
            })?;
        tokens.push((start.line as usize + 1, token));
    }
    tracing::trace!("{} tokens", tokens.len());

    let mut parser = Parser { tokens, pos: 0 };
    let mut stmts = vec![];
    loop {
        parser.skip_newlines();
        if parser.peek().is_none() {
            break;
        }
        let stmt = parser.stmt()?;
        tracing::trace!("stmt: {:?}", stmt);
        stmts.push(stmt);
    }

    Ok(ast::Grammar { stmts })
}

struct Parser<'input> {
    tokens: Vec<(usize, Token<'input>)>,
    pos: usize,
}

impl<'input> Parser<'input> {
    fn peek(&self) -> Option<Token<'input>> {
        self.tokens.get(self.pos).map(|(_, t)| *t)
    }

    fn line(&self) -> usize {
        match self.tokens.get(self.pos) {
            Some((line, _)) => *line,
            None => self.tokens.last().map_or(1, |(line, _)| *line),
        }
    }

    fn unexpected(&self, expected: &'static str) -> SyntaxError {
        let found = match self.peek() {
            Some(Token::Ident(ident)) => format!("`{}'", ident),
            Some(Token::Newline) => "end of line".into(),
            Some(token) => format!("{:?}", token),
            None => "end of input".into(),
        };
        SyntaxError::Unexpected {
            line: self.line(),
            expected,
            found,
        }
    }

    fn skip_newlines(&mut self) {
        while let Some(Token::Newline | Token::Semicolon) = self.peek() {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(Token::Ident(ident)) => {
                self.pos += 1;
                Ok(ident.to_owned())
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    /// A statement ends with a semicolon, a newline or the end of input.
    fn end_of_stmt(&mut self) -> Result<(), SyntaxError> {
        match self.peek() {
            Some(Token::Semicolon | Token::Newline) => {
                self.pos += 1;
                Ok(())
            }
            None => Ok(()),
            _ => Err(self.unexpected("`;' or end of line")),
        }
    }

    fn stmt(&mut self) -> Result<ast::Stmt, SyntaxError> {
        match self.peek() {
            Some(Token::Kw(Keyword::Start)) => {
                self.pos += 1;
                let name = self.ident()?;
                self.end_of_stmt()?;
                Ok(ast::Stmt::Start(ast::StartDesc { name }))
            }
            Some(Token::Kw(Keyword::Nonterminal)) => {
                self.pos += 1;
                let mut idents = vec![self.ident()?];
                while let Some(Token::Comma) = self.peek() {
                    self.pos += 1;
                    idents.push(self.ident()?);
                }
                self.end_of_stmt()?;
                Ok(ast::Stmt::Nonterminal(ast::NonterminalDesc { idents }))
            }
            Some(Token::Ident(..)) => self.rule().map(ast::Stmt::Rule),
            _ => Err(self.unexpected("a rule or a declaration")),
        }
    }

    fn rule(&mut self) -> Result<ast::RuleDesc, SyntaxError> {
        let left = self.ident()?;
        match self.peek() {
            Some(Token::Eq | Token::Arrow) => self.pos += 1,
            _ => return Err(self.unexpected("`=' or `->'")),
        }

        let mut productions = vec![self.production()];
        loop {
            match self.peek() {
                Some(Token::VertBar) => {
                    self.pos += 1;
                }
                // A line starting with `|' continues the rule.
                Some(Token::Newline) if self.continues_on_next_line() => {
                    self.skip_newlines();
                    self.pos += 1;
                }
                _ => break,
            }
            productions.push(self.production());
        }
        self.end_of_stmt()?;

        Ok(ast::RuleDesc { left, productions })
    }

    fn continues_on_next_line(&self) -> bool {
        self.tokens[self.pos..]
            .iter()
            .find(|(_, t)| *t != Token::Newline)
            .map_or(false, |(_, t)| *t == Token::VertBar)
    }

    fn production(&mut self) -> ast::Production {
        let mut elems = vec![];
        loop {
            match self.peek() {
                Some(Token::Ident("ε")) | Some(Token::Kw(Keyword::Empty)) => {
                    elems.push(ast::ProductionElem::Empty);
                }
                Some(Token::Ident(ident)) => {
                    elems.push(ast::ProductionElem::Ident(ident.to_owned()));
                }
                _ => break,
            }
            self.pos += 1;
        }
        ast::Production { elems }
    }
}
