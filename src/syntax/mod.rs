//! Syntax module for the Quill language
//!
//! Turns the raw word units produced by an external lexer into a classified, linked token
//! stream. Classification is context sensitive: see [`classifier`] for the rules and
//! [`context`] for the lexical context stack that drives them.

use serde::{Deserialize, Serialize};

pub mod classifier;
pub mod context;
pub mod linker;
pub mod token;

pub use classifier::classify;
pub use context::{ContextStack, LexicalContext};
pub use linker::{link, TokenStream};
pub use token::{
    Delimiter, Keyword, LiteralKind, Operator, Token, TokenClass, TokenIdx, TokenKind,
};

/// Represents a span in the source code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// An immutable word unit produced by the external lexer.
///
/// `text` keeps the original casing; `normalized` is the uppercase comparison form used by
/// case-insensitive pattern matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawToken {
    pub text: String,
    pub normalized: String,
    pub span: Span,
}

impl RawToken {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        let text = text.into();
        let normalized = text.to_uppercase();
        Self {
            text,
            normalized,
            span,
        }
    }

    /// A raw token with no known source position.
    pub fn unspanned(text: impl Into<String>) -> Self {
        Self::new(text, Span::default())
    }

    /// Builds raw tokens from bare words, assigning spans as if they were separated by one space.
    pub fn from_words<I, S>(words: I) -> Vec<RawToken>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut offset = 0;
        words
            .into_iter()
            .map(|word| {
                let text = word.into();
                let span = Span::new(offset, offset + text.len());
                offset = span.end + 1;
                RawToken::new(text, span)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_token_normalizes_to_uppercase() {
        let token = RawToken::unspanned("From");
        assert_eq!(token.text, "From");
        assert_eq!(token.normalized, "FROM");
    }

    #[test]
    fn test_from_words_assigns_contiguous_spans() {
        let tokens = RawToken::from_words(["VAR", "x", "=", "10"]);
        assert_eq!(tokens[0].span, Span::new(0, 3));
        assert_eq!(tokens[1].span, Span::new(4, 5));
        assert_eq!(tokens[3].span, Span::new(8, 10));
    }

    #[test]
    fn test_span_merge() {
        assert_eq!(Span::new(4, 6).to(Span::new(1, 2)), Span::new(1, 6));
    }
}
