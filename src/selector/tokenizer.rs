//! logos-based selector tokenizer.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `:first-child` as PseudoClass beats `:` as Colon)
//! 2. For equal length matches, earlier-defined variants win
//!
//! `#` is always lexed as [`Token::Hash`] followed by an identifier, so ids
//! like `#abc` are never confused with anything else.

use logos::Logos;

/// Selector token produced by the lexer.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token {
    /// Pseudo-class: `:first-child`, `:last-child`, etc.
    #[regex(r":[a-zA-Z][a-zA-Z0-9_-]*")]
    PseudoClass,

    /// Double-quoted string literal (attribute values).
    #[regex(r#""[^"]*""#)]
    StringLiteral,

    /// Single-quoted string literal (attribute values).
    #[regex(r"'[^']*'")]
    StringLiteralSingle,

    /// Identifier: tag names, class names, ids, attribute names.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*")]
    Ident,

    /// Bare number, only meaningful as an unquoted attribute value.
    #[regex(r"-?[0-9]+(\.[0-9]+)?")]
    Number,

    /// `[`
    #[token("[")]
    BracketOpen,

    /// `]`
    #[token("]")]
    BracketClose,

    /// `=`
    #[token("=")]
    Equals,

    /// `,`
    #[token(",")]
    Comma,

    /// `.`
    #[token(".")]
    Dot,

    /// `#`
    #[token("#")]
    Hash,

    /// `*`
    #[token("*")]
    Star,

    /// `>`
    #[token(">")]
    GreaterThan,
}

/// Input the lexer could not match.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid input '{text}' at byte {offset}")]
pub struct LexError {
    /// Byte offset of the offending text.
    pub offset: usize,
    pub text: String,
}

/// Tokenize a selector string into `(Token, text)` pairs.
///
/// Fails on the first span that matches no token.
pub fn tokenize(input: &str) -> Result<Vec<(Token, String)>, LexError> {
    Token::lexer(input)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, input[span].to_string())),
            Err(()) => Err(LexError {
                offset: span.start,
                text: input[span].to_string(),
            }),
        })
        .collect()
}
