//! Lexer implementation.

use lexgen_util::Loc;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Token<'input> {
    Eq,
    Arrow,
    Comma,
    Semicolon,
    VertBar,
    Newline,
    Kw(Keyword),
    Ident(&'input str),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Keyword {
    Nonterminal,
    Start,
    Empty,
}

pub type Spanned<'input> = (Loc, Token<'input>, Loc);

#[derive(Debug, Default)]
pub struct LexerState {
    comment_depth: usize,
}

lexgen::lexer! {
    pub Lexer(LexerState) -> Token<'input>;

    let whitespace = [' ' '\t'];
    let newline = '\r'* '\n' | '\r';
    let ident = ($$XID_Start | '_') $$XID_Continue* '\''*;

    rule Init {
        $whitespace+,
        "//" (_ # ['\r' '\n'])*,
        "/*" => |lexer| {
            lexer.state().comment_depth += 1;
            lexer.switch(LexerRule::BlockComment)
        },
        $newline = Token::Newline,
        "=" = Token::Eq,
        "->" = Token::Arrow,
        "," = Token::Comma,
        ";" = Token::Semicolon,
        "|" = Token::VertBar,
        "@nonterminal" = Token::Kw(Keyword::Nonterminal),
        "@start" = Token::Kw(Keyword::Start),
        "@empty" = Token::Kw(Keyword::Empty),
        $ident => |lexer| {
            let token = Token::Ident(lexer.match_());
            lexer.return_(token)
        },
    }

    rule BlockComment {
        "/*" => |lexer| {
            lexer.state().comment_depth += 1;
            lexer.continue_()
        },
        "*/" => |lexer| {
            let depth = &mut lexer.state().comment_depth;
            if *depth == 1 {
                *depth = 0;
                lexer.switch(LexerRule::Init)
            } else {
                *depth -= 1;
                lexer.continue_()
            }
        },
        _,
    }
}
