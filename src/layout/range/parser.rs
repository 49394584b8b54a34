//! Recursive-descent parser for the range grammar
//!
//! Grammar:
//! ```text
//! <range>  = <item> ( "," <item> )*                  comma form
//!          | <item> ( ":" <pivot> ":" <item> )*      colon form
//! <item>   = <label> [ "(" <kind> ")" ]
//! <label>  = WORD [ "-" WORD ]                        second form is a dash range
//! <pivot>  = WORD                                     absolute axis offset
//! ```
//!
//! The form is decided up front by looking at the separators outside parentheses:
//! any `:` selects the colon form, otherwise any `,` selects the comma form, otherwise
//! the whole string is a single item. A string mixing both is rejected.

use super::tokens::{tokenize, Token, TokenLocation};
use crate::layout::kind::FieldKind;
use std::fmt;

/// Separator style of a grammar string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Single,
    Comma,
    Colon,
}

/// A label as written, before dash-range expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Plain(String),
    /// `base-end`, e.g. `A01-03`; validity is checked at expansion time
    Span { base: String, end: String },
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Plain(label) => write!(f, "{}", label),
            Label::Span { base, end } => write!(f, "{}-{}", base, end),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeItem {
    pub label: Label,
    pub kind: Option<FieldKind>,
    /// Absolute offset where this item ends (colon form only, never on the last item)
    pub pivot: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpec {
    pub form: Form,
    pub items: Vec<RangeItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

/// Parse a `rows` / `columns` grammar string
pub fn parse_range(source: &str) -> Result<RangeSpec, ParseError> {
    let tokens = tokenize(source);
    if tokens.is_empty() {
        return Err(ParseError {
            offset: 0,
            message: "empty range".to_string(),
        });
    }
    let form = detect_form(&tokens)?;
    RangeParser {
        source,
        tokens: &tokens,
        pos: 0,
    }
    .parse(form)
}

fn detect_form(tokens: &[TokenLocation]) -> Result<Form, ParseError> {
    let mut depth = 0usize;
    let mut colon = None;
    let mut comma = None;
    for (token, span) in tokens {
        match token {
            Token::OpenParen => depth += 1,
            Token::CloseParen => depth = depth.saturating_sub(1),
            Token::Colon if depth == 0 => colon = colon.or(Some(span.start)),
            Token::Comma if depth == 0 => comma = comma.or(Some(span.start)),
            _ => {}
        }
    }
    match (colon, comma) {
        (Some(_), Some(offset)) => Err(ParseError {
            offset,
            message: "',' and ':' separators cannot be mixed".to_string(),
        }),
        (Some(_), None) => Ok(Form::Colon),
        (None, Some(_)) => Ok(Form::Comma),
        (None, None) => Ok(Form::Single),
    }
}

struct RangeParser<'a> {
    source: &'a str,
    tokens: &'a [TokenLocation],
    pos: usize,
}

impl<'a> RangeParser<'a> {
    fn parse(mut self, form: Form) -> Result<RangeSpec, ParseError> {
        let mut items = vec![self.item()?];

        while let Some(token) = self.peek() {
            match (form, token) {
                (Form::Comma, Token::Comma) => {
                    self.pos += 1;
                    items.push(self.item()?);
                }
                (Form::Colon, Token::Colon) => {
                    self.pos += 1;
                    let pivot = self.pivot()?;
                    self.expect(Token::Colon)?;
                    if let Some(last) = items.last_mut() {
                        last.pivot = Some(pivot);
                    }
                    items.push(self.item()?);
                }
                (_, other) => return Err(self.error(format!("unexpected {}", other.describe()))),
            }
        }

        Ok(RangeSpec { form, items })
    }

    fn item(&mut self) -> Result<RangeItem, ParseError> {
        let label = self.label()?;
        let kind = if self.peek() == Some(Token::OpenParen) {
            Some(self.kind()?)
        } else {
            None
        };
        Ok(RangeItem {
            label,
            kind,
            pivot: None,
        })
    }

    fn label(&mut self) -> Result<Label, ParseError> {
        let base = self.word("label")?;
        if self.peek() != Some(Token::Dash) {
            return Ok(Label::Plain(base));
        }
        self.pos += 1;
        let end = self.word("range end")?;
        Ok(Label::Span { base, end })
    }

    fn kind(&mut self) -> Result<FieldKind, ParseError> {
        let open = self.expect(Token::OpenParen)?;
        let close_index = self.tokens[self.pos..]
            .iter()
            .position(|(token, _)| *token == Token::CloseParen)
            .map(|i| self.pos + i)
            .ok_or_else(|| ParseError {
                offset: open.start,
                message: "unclosed '('".to_string(),
            })?;
        let close = self.tokens[close_index].1.clone();
        self.pos = close_index + 1;

        self.source[open.end..close.start]
            .parse::<FieldKind>()
            .map_err(|message| ParseError {
                offset: open.end,
                message,
            })
    }

    fn pivot(&mut self) -> Result<f64, ParseError> {
        let offset = self.offset();
        let word = self.word("pivot")?;
        word.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ParseError {
                offset,
                message: format!("pivot '{}' is not a number", word),
            })
    }

    fn word(&mut self, what: &str) -> Result<String, ParseError> {
        match self.tokens.get(self.pos) {
            Some((Token::Word, span)) => {
                self.pos += 1;
                Ok(self.source[span.clone()].to_string())
            }
            Some((token, _)) => Err(self.error(format!(
                "expected {}, found {}",
                what,
                token.describe()
            ))),
            None => Err(self.error(format!("expected {}, found end of input", what))),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<std::ops::Range<usize>, ParseError> {
        match self.tokens.get(self.pos) {
            Some((token, span)) if *token == expected => {
                self.pos += 1;
                Ok(span.clone())
            }
            Some((token, _)) => Err(self.error(format!(
                "expected {}, found {}",
                expected.describe(),
                token.describe()
            ))),
            None => Err(self.error(format!(
                "expected {}, found end of input",
                expected.describe()
            ))),
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source.len())
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            offset: self.offset(),
            message,
        }
    }
}
