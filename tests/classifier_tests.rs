// tests/classifier_tests.rs

mod common;

use common::lex;
use quill::syntax::{Keyword, LiteralKind, Operator, TokenKind};
use quill::{standard_registry, ErrorType, Parser, PatternRegistry};
use rstest::rstest;

fn kinds(registry: &PatternRegistry, source: &str) -> Vec<TokenKind> {
    Parser::new(registry)
        .classify_and_link(&lex(source))
        .unwrap()
        .tokens()
        .iter()
        .map(|t| t.kind)
        .collect()
}

fn std_kinds(source: &str) -> Vec<TokenKind> {
    kinds(&standard_registry().unwrap(), source)
}

// ---
// Linker
// ---

#[rstest]
#[case("")]
#[case("PRINT 1")]
#[case("VAR total = price * 2 IF total >= 10 { PRINT \"big\" }")]
fn test_linker_walks_every_token_once(#[case] source: &str) {
    let registry = standard_registry().unwrap();
    let stream = Parser::new(&registry).classify_and_link(&lex(source)).unwrap();

    let forward: Vec<_> = stream.iter_forward().map(|t| t.span()).collect();
    let mut backward: Vec<_> = stream.iter_backward().map(|t| t.span()).collect();
    backward.reverse();

    assert_eq!(forward.len(), stream.len());
    assert_eq!(forward, backward);
    if let Some(last) = stream.tokens().last() {
        assert!(last.next.is_none());
    }
}

// ---
// Compound merges and reserved words
// ---

#[rstest]
#[case("a == b", Operator::Eq)]
#[case("a != b", Operator::NotEq)]
#[case("a <= b", Operator::LtEq)]
#[case("a >= b", Operator::GtEq)]
fn test_comparison_operators_merge(#[case] source: &str, #[case] expected: Operator) {
    let result = std_kinds(source);
    assert_eq!(result.len(), 3);
    assert_eq!(result[1], TokenKind::Operator(expected));
}

#[test]
fn test_host_access_merges() {
    let result = std_kinds("@Console::WriteLine");
    assert_eq!(
        result,
        vec![
            TokenKind::Operator(Operator::HostPrefix),
            TokenKind::Identifier,
            TokenKind::Operator(Operator::HostAccess),
            TokenKind::Identifier,
        ]
    );
}

#[test]
fn test_else_if_merges_into_one_keyword() {
    let result = std_kinds("} ELSE IF x {");
    assert_eq!(result[1], TokenKind::Keyword(Keyword::ElseIf));
    assert_eq!(result.len(), 4);
}

#[rstest]
#[case("if")]
#[case("print")]
#[case("Var")]
fn test_reserved_words_are_case_sensitive(#[case] word: &str) {
    assert_eq!(std_kinds(word), vec![TokenKind::Identifier]);
}

#[test]
fn test_literal_shapes() {
    let result = std_kinds(r#"12 3.5 "text" 'single' `tmpl` TRUE NULL"#);
    assert_eq!(
        result,
        vec![
            TokenKind::Literal(LiteralKind::Int),
            TokenKind::Literal(LiteralKind::Decimal),
            TokenKind::Literal(LiteralKind::String),
            TokenKind::Literal(LiteralKind::String),
            TokenKind::Literal(LiteralKind::TemplateString),
            TokenKind::Literal(LiteralKind::Bool),
            TokenKind::Literal(LiteralKind::Null),
        ]
    );
}

#[rstest]
#[case("a ! b")]
#[case("a : b")]
#[case("a # b")]
fn test_unclassifiable_input_is_ambiguous(#[case] source: &str) {
    let registry = standard_registry().unwrap();
    let err = Parser::new(&registry).classify_and_link(&lex(source)).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::LexicalAmbiguity);
}

// ---
// Pattern keywords and lexical context
// ---

#[test]
fn test_pattern_words_at_statement_level() {
    let result = std_kinds("TAKE 3 FROM items");
    assert!(matches!(result[0], TokenKind::PatternKeyword(_)));
    assert!(matches!(result[2], TokenKind::PatternKeyword(_)));
    assert_eq!(result[3], TokenKind::Identifier);
}

#[test]
fn test_pattern_words_are_case_insensitive() {
    let result = std_kinds("take 3 from items");
    assert!(matches!(result[0], TokenKind::PatternKeyword(_)));
    assert!(matches!(result[2], TokenKind::PatternKeyword(_)));
}

#[test]
fn test_from_after_member_access_is_an_identifier() {
    let result = std_kinds("PRINT query.FROM");
    assert_eq!(result[2], TokenKind::Operator(Operator::Dot));
    assert_eq!(result[3], TokenKind::Identifier);
}

#[rstest]
#[case("f(take)", 2)]
#[case("[1, take]", 3)]
#[case("VAR take", 1)]
#[case("x = take", 2)]
#[case("x == take", 2)]
fn test_restricted_contexts_reject_pattern_words(#[case] source: &str, #[case] at: usize) {
    assert_eq!(std_kinds(source)[at], TokenKind::Identifier);
}

#[test]
fn test_block_context_allows_pattern_words() {
    let result = std_kinds("IF ready { REVERSE items }");
    assert!(matches!(result[3], TokenKind::PatternKeyword(_)));
}

#[test]
fn test_closing_argument_restores_statement_context() {
    let result = std_kinds("f(1) REVERSE items");
    assert!(matches!(result[4], TokenKind::PatternKeyword(_)));
}

#[test]
fn test_empty_registry_has_no_pattern_words() {
    let result = kinds(&PatternRegistry::new(), "TAKE 3 FROM items");
    assert!(result.iter().all(|k| !matches!(k, TokenKind::PatternKeyword(_))));
}
