//! Token classifier.
//!
//! Assigns exactly one [`TokenKind`] to each raw token, except for compound merges where two
//! raw tokens become one token. Per token, in order:
//!
//! 1. compound merge (`ELSE IF`, `==`, `<=`, `>=`, `!=`, `::`);
//! 2. pattern keyword, when the word is in the registry vocabulary and context allows it;
//! 3. exact, case-sensitive reserved-word/punctuation lookup;
//! 4. literal shape, else identifier.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::diagnostics::QuillError;
use crate::err_ctx;
use crate::patterns::{PatternRef, PatternRegistry};
use crate::syntax::context::ContextStack;
use crate::syntax::token::{lookup_reserved, Keyword, LiteralKind, Operator, Token, TokenKind};
use crate::syntax::{RawToken, Span};

static INT_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());
static DECIMAL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+$").unwrap());
static WORD_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Returns true when `text` has the shape of an identifier.
pub fn is_word(text: &str) -> bool {
    WORD_SHAPE.is_match(text)
}

/// Classifies a full raw token sequence. The returned tokens are not linked yet.
pub fn classify(raw: &[RawToken], registry: &PatternRegistry) -> Result<Vec<Token>, QuillError> {
    Classifier::new(registry).run(raw)
}

pub struct Classifier<'r> {
    registry: &'r PatternRegistry,
    contexts: ContextStack,
}

impl<'r> Classifier<'r> {
    pub fn new(registry: &'r PatternRegistry) -> Self {
        Self {
            registry,
            contexts: ContextStack::new(),
        }
    }

    pub fn run(mut self, raw: &[RawToken]) -> Result<Vec<Token>, QuillError> {
        let mut tokens = Vec::with_capacity(raw.len());
        let mut previous: Option<TokenKind> = None;
        let mut index = 0;

        while index < raw.len() {
            self.contexts.advance(previous.as_ref());

            let (kind, consumed) = match merge_compound(raw, index)? {
                Some(kind) => (kind, 2),
                None => (self.classify_single(raw, index, previous)?, 1),
            };

            let token_raw = if consumed == 2 {
                merged_raw(&raw[index], &raw[index + 1], kind)
            } else {
                raw[index].clone()
            };
            trace!(text = %token_raw.text, ?kind, "classified token");

            tokens.push(Token::new(token_raw, kind));
            previous = Some(kind);
            index += consumed;
        }
        Ok(tokens)
    }

    fn classify_single(
        &self,
        raw: &[RawToken],
        index: usize,
        previous: Option<TokenKind>,
    ) -> Result<TokenKind, QuillError> {
        if let Some(pattern) = self.pattern_keyword(raw, index, previous) {
            return Ok(TokenKind::PatternKeyword(pattern));
        }
        let token = &raw[index];
        if let Some(kind) = lookup_reserved(&token.text) {
            return Ok(kind);
        }
        classify_shape(token)
    }

    fn pattern_keyword(
        &self,
        raw: &[RawToken],
        index: usize,
        previous: Option<TokenKind>,
    ) -> Option<PatternRef> {
        let token = &raw[index];
        if !is_word(&token.text) {
            return None;
        }
        let pattern = self.registry.vocabulary_entry(&token.normalized)?;

        if !self.contexts.current().allows_pattern_keywords() {
            trace!(word = %token.text, context = ?self.contexts.current(), "pattern word rejected by context");
            return None;
        }
        if is_call_or_assignment_follow(raw, index) {
            return None;
        }
        match previous {
            Some(TokenKind::PatternKeyword(_)) => None,
            Some(TokenKind::Operator(Operator::Dot | Operator::HostAccess)) => None,
            _ => Some(pattern),
        }
    }
}

/// `(` or a lone `=` (not the first half of `==`) after the word.
fn is_call_or_assignment_follow(raw: &[RawToken], index: usize) -> bool {
    let Some(next) = raw.get(index + 1) else {
        return false;
    };
    match next.text.as_str() {
        "(" => true,
        "=" => raw.get(index + 2).map_or(true, |after| after.text != "="),
        _ => false,
    }
}

/// Compound-merge check. `Ok(None)` means the token stands alone.
fn merge_compound(raw: &[RawToken], index: usize) -> Result<Option<TokenKind>, QuillError> {
    let first = raw[index].text.as_str();
    let second = raw.get(index + 1).map(|t| t.text.as_str());

    let merged = match (first, second) {
        ("ELSE", Some("IF")) => TokenKind::Keyword(Keyword::ElseIf),
        ("=", Some("=")) => TokenKind::Operator(Operator::Eq),
        ("<", Some("=")) => TokenKind::Operator(Operator::LtEq),
        (">", Some("=")) => TokenKind::Operator(Operator::GtEq),
        ("!", Some("=")) => TokenKind::Operator(Operator::NotEq),
        (":", Some(":")) => TokenKind::Operator(Operator::HostAccess),
        ("!", _) => {
            return Err(err_ctx!(
                LexicalAmbiguity,
                "'!' must be followed by '=' to form '!='",
                raw[index].span,
                "use NOT for logical negation"
            ))
        }
        (":", _) => {
            return Err(err_ctx!(
                LexicalAmbiguity,
                "':' must be followed by ':' to form '::'",
                raw[index].span,
                "host members are written as @Type::Member"
            ))
        }
        _ => return Ok(None),
    };
    Ok(Some(merged))
}

fn merged_raw(first: &RawToken, second: &RawToken, kind: TokenKind) -> RawToken {
    let text = match kind {
        TokenKind::Keyword(k) => k.as_str().to_string(),
        TokenKind::Operator(op) => op.as_str().to_string(),
        _ => format!("{}{}", first.text, second.text),
    };
    RawToken::new(text, Span::new(first.span.start, second.span.end.max(first.span.end)))
}

/// Shape fallback: literal forms, else identifier.
fn classify_shape(token: &RawToken) -> Result<TokenKind, QuillError> {
    let text = token.text.as_str();
    if INT_SHAPE.is_match(text) {
        return Ok(TokenKind::Literal(LiteralKind::Int));
    }
    if DECIMAL_SHAPE.is_match(text) {
        return Ok(TokenKind::Literal(LiteralKind::Decimal));
    }
    if is_quoted(text, '"') || is_quoted(text, '\'') {
        return Ok(TokenKind::Literal(LiteralKind::String));
    }
    if is_quoted(text, '`') {
        return Ok(TokenKind::Literal(LiteralKind::TemplateString));
    }
    if is_word(text) {
        return Ok(TokenKind::Identifier);
    }
    Err(err_ctx!(
        LexicalAmbiguity,
        format!("cannot classify '{}'", text),
        token.span
    ))
}

fn is_quoted(text: &str, quote: char) -> bool {
    text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;
    use crate::syntax::token::Delimiter;

    fn kinds(words: &[&str], registry: &PatternRegistry) -> Vec<TokenKind> {
        classify(&RawToken::from_words(words.iter().copied()), registry)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn take_registry() -> PatternRegistry {
        let mut registry = PatternRegistry::new();
        registry
            .register("TAKE $count FROM $array", "ARRAY_TAKE($array, $count)")
            .unwrap();
        registry
    }

    #[test]
    fn test_shapes() {
        let registry = PatternRegistry::new();
        let result = kinds(&["42", "4.5", "\"hi\"", "`t`", "name", "TRUE", "NULL"], &registry);
        assert_eq!(
            result,
            vec![
                TokenKind::Literal(LiteralKind::Int),
                TokenKind::Literal(LiteralKind::Decimal),
                TokenKind::Literal(LiteralKind::String),
                TokenKind::Literal(LiteralKind::TemplateString),
                TokenKind::Identifier,
                TokenKind::Literal(LiteralKind::Bool),
                TokenKind::Literal(LiteralKind::Null),
            ]
        );
    }

    #[test]
    fn test_compound_merges() {
        let registry = PatternRegistry::new();
        let tokens = classify(&RawToken::from_words(["ELSE", "IF", "a", "=", "=", "b"]), &registry)
            .unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::ElseIf));
        assert_eq!(tokens[0].text(), "ELSE IF");
        assert_eq!(tokens[2].kind, TokenKind::Operator(Operator::Eq));
        assert_eq!(tokens[2].text(), "==");
    }

    #[test]
    fn test_dangling_colon_is_ambiguous() {
        let registry = PatternRegistry::new();
        let err = classify(&RawToken::from_words(["a", ":", "b"]), &registry).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::LexicalAmbiguity);
    }

    #[test]
    fn test_pattern_keywords_need_permissive_context() {
        let registry = take_registry();
        let result = kinds(&["f", "(", "TAKE", ")", "TAKE"], &registry);
        assert_eq!(result[2], TokenKind::Identifier);
        assert!(matches!(result[4], TokenKind::PatternKeyword(_)));
    }

    #[test]
    fn test_pattern_word_before_call_or_assignment_is_identifier() {
        let registry = take_registry();
        assert_eq!(kinds(&["take", "(", ")"], &registry)[0], TokenKind::Identifier);
        assert_eq!(kinds(&["from", "=", "1"], &registry)[0], TokenKind::Identifier);
        assert!(matches!(
            kinds(&["from", "=", "=", "1"], &registry)[0],
            TokenKind::PatternKeyword(_)
        ));
    }

    #[test]
    fn test_member_access_blocks_pattern_keyword() {
        let registry = take_registry();
        let result = kinds(&["obj", ".", "FROM"], &registry);
        assert_eq!(result[1], TokenKind::Operator(Operator::Dot));
        assert_eq!(result[2], TokenKind::Identifier);
    }

    #[test]
    fn test_word_after_pattern_keyword_is_rejected() {
        let mut registry = take_registry();
        registry.register("FROM $a FROM $b", "TWICE($a, $b)").unwrap();
        let result = kinds(&["TAKE", "FROM"], &registry);
        assert!(matches!(result[0], TokenKind::PatternKeyword(_)));
        assert_eq!(result[1], TokenKind::Identifier);
    }

    #[test]
    fn test_lowercase_reserved_word_degrades_to_identifier() {
        let registry = PatternRegistry::new();
        let result = kinds(&["if", "IF", "{", "}"], &registry);
        assert_eq!(result[0], TokenKind::Identifier);
        assert_eq!(result[1], TokenKind::Keyword(Keyword::If));
        assert_eq!(result[2], TokenKind::Delimiter(Delimiter::LBrace));
    }
}
