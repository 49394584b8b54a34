//! Token definitions for the `rows` / `columns` range grammar
//!
//! The grammar only has five punctuation tokens. Everything else is a word:
//! labels, pivots and dash-range bounds alike. The parser decides what a word means
//! from its position, and reads kind annotations straight from the source slice
//! between the parentheses so date formats can contain any character.
use logos::Logos;
use std::ops::Range;

/// All possible tokens in a range grammar string
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("-")]
    Dash,

    // Labels, numbers, anything that isn't a separator
    #[regex(r"[^\s,:()\-]+")]
    Word,
}

impl Token {
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Comma => "','",
            Token::Colon => "':'",
            Token::OpenParen => "'('",
            Token::CloseParen => "')'",
            Token::Dash => "'-'",
            Token::Word => "word",
        }
    }
}

/// Type alias for token with span
pub type TokenLocation = (Token, Range<usize>);

/// Tokenize a grammar string, keeping byte spans
pub fn tokenize(source: &str) -> Vec<TokenLocation> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        if let Ok(token) = result {
            tokens.push((token, lexer.span()));
        }
    }

    tokens
}
