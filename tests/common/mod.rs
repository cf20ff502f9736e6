//! Shared helpers for the integration tests.
//!
//! The crate consumes raw word units from an external lexer. `lex` is a minimal stand-in:
//! words, numbers, quoted strings and templates, and single-character punctuation, each with
//! its byte span. Compound operators (`==`, `::`, ...) are left split so the classifier's
//! merge step is exercised.

#![allow(dead_code)]

use quill::ast::{Program, ScopeShape, Stmt};
use quill::{standard_registry, Parser, PatternRegistry, QuillError, RawToken, Span};

pub fn lex(source: &str) -> Vec<RawToken> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
        } else if c.is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
        } else if c == b'"' || c == b'\'' || c == b'`' {
            i += 1;
            while i < bytes.len() && bytes[i] != c {
                if bytes[i] == b'\\' && c != b'`' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(bytes.len());
        } else {
            // one character, which may be multi-byte
            i += source[i..].chars().next().map_or(1, char::len_utf8);
        }

        tokens.push(RawToken::new(&source[start..i], Span::new(start, i)));
    }
    tokens
}

pub fn parse(source: &str) -> Result<Program, QuillError> {
    let registry = standard_registry()?;
    parse_with(&registry, source)
}

pub fn parse_with(registry: &PatternRegistry, source: &str) -> Result<Program, QuillError> {
    Parser::new(registry).parse_source("test.ql", source, &lex(source))
}

/// Root statements of a program that must parse.
pub fn root_statements(source: &str) -> Vec<Stmt> {
    match parse(source) {
        Ok(program) => program.root().statements.clone(),
        Err(e) => panic!("failed to parse {:?}: {}", source, e),
    }
}

/// Span-free view of a program: its scope shape plus every scope's statements.
pub fn structure(program: &Program) -> (Vec<ScopeShape>, Vec<Vec<Stmt>>) {
    let statements = program
        .scopes()
        .iter()
        .map(|scope| scope.statements.clone())
        .collect();
    (program.shape(), statements)
}
