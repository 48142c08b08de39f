//! Recursive descent selector parser.
//!
//! Parses selector text into a [`SelectorList`] using the logos-based
//! tokenizer from [`crate::selector::tokenizer`].

use logos::Logos;

use crate::selector::model::*;
use crate::selector::tokenizer::Token;

/// Errors from selector parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected token at position {position}: {message}")]
    UnexpectedToken { position: usize, message: String },
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(String),
    #[error("empty selector")]
    Empty,
}

/// A positioned token with byte-level span information for whitespace detection.
#[derive(Debug, Clone)]
struct PToken {
    token: Token,
    text: String,
    /// Index in the token stream (for error reporting).
    pos: usize,
    byte_start: usize,
    byte_end: usize,
}

fn tokenize_with_spans(input: &str) -> Result<Vec<PToken>, ParseError> {
    let mut tokens = Vec::new();

    for (idx, (result, span)) in Token::lexer(input).spanned().enumerate() {
        let text = input[span.clone()].to_string();
        let Ok(token) = result else {
            return Err(ParseError::UnexpectedToken {
                position: idx,
                message: format!("invalid character '{text}' at byte {}", span.start),
            });
        };
        tokens.push(PToken {
            text,
            token,
            pos: idx,
            byte_start: span.start,
            byte_end: span.end,
        });
    }

    Ok(tokens)
}

/// Parse a comma-separated selector list such as `.btn, a[href]`.
pub fn parse_selector_list(input: &str) -> Result<SelectorList, ParseError> {
    let tokens = tokenize_with_spans(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser { tokens, cursor: 0 };
    let mut selectors = vec![parser.parse_selector()?];
    while parser.peek().is_some_and(|t| t.token == Token::Comma) {
        parser.advance();
        selectors.push(parser.parse_selector()?);
    }

    if let Some(tok) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            position: tok.pos,
            message: format!("trailing {:?} '{}'", tok.token, tok.text),
        });
    }

    Ok(SelectorList {
        selectors,
        source: input.trim().to_owned(),
    })
}

struct Parser {
    tokens: Vec<PToken>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&PToken> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<PToken> {
        let tok = self.tokens.get(self.cursor).cloned();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    fn current_pos(&self) -> usize {
        self.peek().map(|t| t.pos).unwrap_or(self.tokens.len())
    }

    /// Returns `true` if the current token touches the previous one (no whitespace).
    fn is_adjacent(&self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = &self.tokens[self.cursor - 1];
        match self.peek() {
            Some(curr) => curr.byte_start == prev.byte_end,
            None => false,
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<PToken, ParseError> {
        match self.advance() {
            Some(tok) if &tok.token == expected => Ok(tok),
            Some(tok) => Err(ParseError::UnexpectedToken {
                position: tok.pos,
                message: format!("expected {what}, got {:?} '{}'", tok.token, tok.text),
            }),
            None => Err(ParseError::UnexpectedEof(format!("expected {what}"))),
        }
    }

    /// Parse compound selectors joined by combinators.
    fn parse_selector(&mut self) -> Result<Selector, ParseError> {
        let mut parts = vec![SelectorPart::Compound(self.parse_compound_selector()?)];

        loop {
            match self.peek() {
                Some(t) if t.token == Token::GreaterThan => {
                    self.advance();
                    parts.push(SelectorPart::Combinator(Combinator::Child));
                    parts.push(SelectorPart::Compound(self.parse_compound_selector()?));
                }
                // A selector-starting token that was not swallowed by the
                // previous compound is separated by whitespace.
                Some(t)
                    if matches!(
                        t.token,
                        Token::Ident
                            | Token::Hash
                            | Token::Dot
                            | Token::Star
                            | Token::BracketOpen
                            | Token::PseudoClass
                    ) =>
                {
                    parts.push(SelectorPart::Combinator(Combinator::Descendant));
                    parts.push(SelectorPart::Compound(self.parse_compound_selector()?));
                }
                _ => break,
            }
        }

        Ok(Selector { parts })
    }

    /// Parse a compound selector, e.g. `li.item[data-x]:first-child`.
    ///
    /// Only the first component may be a type or universal selector; the rest
    /// are appended while they stay adjacent to the previous token.
    fn parse_compound_selector(&mut self) -> Result<CompoundSelector, ParseError> {
        let mut compound = CompoundSelector::new();

        match self.peek().map(|t| t.token.clone()) {
            Some(Token::Ident) => {
                if let Some(tok) = self.advance() {
                    compound.push(SelectorComponent::Type(tok.text.to_ascii_lowercase()));
                }
            }
            Some(Token::Star) => {
                self.advance();
                compound.push(SelectorComponent::Universal);
            }
            Some(_) => {
                let component = self.parse_simple()?.ok_or_else(|| {
                    ParseError::UnexpectedToken {
                        position: self.current_pos(),
                        message: "expected selector".into(),
                    }
                })?;
                compound.push(component);
            }
            None => return Err(ParseError::UnexpectedEof("expected selector".into())),
        }

        while self.is_adjacent() {
            match self.parse_simple()? {
                Some(component) => compound.push(component),
                None => break,
            }
        }

        Ok(compound)
    }

    /// Parse one of `.class`, `#id`, `[attr]`, `[attr=value]`, `:pseudo`.
    ///
    /// Returns `Ok(None)` without consuming anything if the next token starts
    /// none of them.
    fn parse_simple(&mut self) -> Result<Option<SelectorComponent>, ParseError> {
        let Some(kind) = self.peek().map(|t| t.token.clone()) else {
            return Ok(None);
        };
        let component = match kind {
            Token::Dot => {
                self.advance();
                let name = self.expect(&Token::Ident, "class name after '.'")?;
                SelectorComponent::Class(name.text)
            }
            Token::Hash => {
                self.advance();
                let name = self.expect(&Token::Ident, "id after '#'")?;
                SelectorComponent::Id(name.text)
            }
            Token::PseudoClass => {
                let tok = self.advance().ok_or_else(|| {
                    ParseError::UnexpectedEof("expected pseudo-class".into())
                })?;
                SelectorComponent::PseudoClass(tok.text[1..].to_ascii_lowercase())
            }
            Token::BracketOpen => {
                self.advance();
                self.parse_attribute()?
            }
            _ => return Ok(None),
        };
        Ok(Some(component))
    }

    /// Parse the inside of `[...]`; the opening bracket is already consumed.
    fn parse_attribute(&mut self) -> Result<SelectorComponent, ParseError> {
        let name = self.expect(&Token::Ident, "attribute name")?.text;

        let value = if self.peek().is_some_and(|t| t.token == Token::Equals) {
            self.advance();
            let tok = self
                .advance()
                .ok_or_else(|| ParseError::UnexpectedEof("expected attribute value".into()))?;
            let value = match tok.token {
                Token::StringLiteral | Token::StringLiteralSingle => {
                    tok.text[1..tok.text.len() - 1].to_string()
                }
                Token::Ident | Token::Number => tok.text,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        position: tok.pos,
                        message: format!("expected attribute value, got {other:?}"),
                    })
                }
            };
            Some(value)
        } else {
            None
        };

        self.expect(&Token::BracketClose, "']'")?;
        Ok(SelectorComponent::Attribute {
            name: name.to_ascii_lowercase(),
            value,
        })
    }
}
