//! Token linker and the index-addressed token stream.

use crate::syntax::token::{Token, TokenIdx};
use crate::syntax::Span;

/// Sets `next[i] = i + 1` and `prev[i] = i - 1`, with [`TokenIdx::NONE`] at both ends.
pub fn link(tokens: &mut [Token]) {
    let len = tokens.len();
    for (i, token) in tokens.iter_mut().enumerate() {
        token.prev = if i == 0 { TokenIdx::NONE } else { TokenIdx(i - 1) };
        token.next = if i + 1 == len {
            TokenIdx::NONE
        } else {
            TokenIdx(i + 1)
        };
    }
}

/// The classified, linked token sequence. It owns every token; links are plain indices.
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        link(&mut tokens);
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn first(&self) -> TokenIdx {
        if self.tokens.is_empty() {
            TokenIdx::NONE
        } else {
            TokenIdx(0)
        }
    }

    pub fn last(&self) -> TokenIdx {
        match self.tokens.len() {
            0 => TokenIdx::NONE,
            n => TokenIdx(n - 1),
        }
    }

    /// Walks the chain from the first token by following `next`.
    pub fn iter_forward(&self) -> Walk<'_> {
        Walk {
            stream: self,
            at: self.first(),
            forward: true,
        }
    }

    /// Walks the chain from the last token by following `prev`.
    pub fn iter_backward(&self) -> Walk<'_> {
        Walk {
            stream: self,
            at: self.last(),
            forward: false,
        }
    }

    /// Zero-width span just past the last token, used for "end of input" errors.
    pub fn end_span(&self) -> Span {
        self.tokens
            .last()
            .map(|t| Span::new(t.raw.span.end, t.raw.span.end))
            .unwrap_or_default()
    }

    /// Span of the token at `index`, or the end span past the last token.
    pub fn span_at(&self, index: usize) -> Span {
        self.get(index).map(Token::span).unwrap_or_else(|| self.end_span())
    }
}

pub struct Walk<'s> {
    stream: &'s TokenStream,
    at: TokenIdx,
    forward: bool,
}

impl<'s> Iterator for Walk<'s> {
    type Item = &'s Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.stream.get(self.at.get()?)?;
        self.at = if self.forward { token.next } else { token.prev };
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternRegistry;
    use crate::syntax::{classify, RawToken};

    fn stream(words: &[&str]) -> TokenStream {
        let registry = PatternRegistry::new();
        TokenStream::new(classify(&RawToken::from_words(words.iter().copied()), &registry).unwrap())
    }

    #[test]
    fn test_forward_and_backward_walks_visit_every_token_once() {
        let stream = stream(&["VAR", "x", "=", "1", "+", "2"]);
        let forward: Vec<_> = stream.iter_forward().map(|t| t.text().to_string()).collect();
        let mut backward: Vec<_> = stream.iter_backward().map(|t| t.text().to_string()).collect();
        assert_eq!(forward, vec!["VAR", "x", "=", "1", "+", "2"]);
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_exactly_one_null_link_at_each_end() {
        let stream = stream(&["a", "b", "c"]);
        let null_prev = stream.tokens().iter().filter(|t| t.prev.is_none()).count();
        let null_next = stream.tokens().iter().filter(|t| t.next.is_none()).count();
        assert_eq!((null_prev, null_next), (1, 1));
        assert!(stream.tokens()[0].prev.is_none());
        assert!(stream.tokens()[2].next.is_none());
    }

    #[test]
    fn test_empty_stream() {
        let stream = stream(&[]);
        assert!(stream.first().is_none());
        assert_eq!(stream.iter_forward().count(), 0);
        assert_eq!(stream.end_span(), Span::default());
    }

    #[test]
    fn test_single_token_has_no_neighbours() {
        let stream = stream(&["x"]);
        let token = &stream.tokens()[0];
        assert!(token.prev.is_none() && token.next.is_none());
    }
}
