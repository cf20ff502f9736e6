//! Closed token-kind tables.
//!
//! Every token kind is a variant of [`TokenKind`]; reserved words and punctuation are
//! resolved through one static table built on first use. Lookup is case-sensitive, so
//! `if` is an identifier while `IF` is a keyword.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::patterns::PatternRef;
use crate::syntax::{RawToken, Span};

// ============================================================================
// TOKEN KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Function,
    Return,
    If,
    Else,
    ElseIf,
    Loop,
    While,
    To,
    In,
    As,
    Break,
    Continue,
    Print,
    Var,
    Import,
    New,
    With,
    And,
    Or,
    Not,
    // Type keywords
    Int,
    Decimal,
    String,
    Bool,
    Array,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Function => "FUNCTION",
            Keyword::Return => "RETURN",
            Keyword::If => "IF",
            Keyword::Else => "ELSE",
            Keyword::ElseIf => "ELSE IF",
            Keyword::Loop => "LOOP",
            Keyword::While => "WHILE",
            Keyword::To => "TO",
            Keyword::In => "IN",
            Keyword::As => "AS",
            Keyword::Break => "BREAK",
            Keyword::Continue => "CONTINUE",
            Keyword::Print => "PRINT",
            Keyword::Var => "VAR",
            Keyword::Import => "IMPORT",
            Keyword::New => "NEW",
            Keyword::With => "WITH",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Int => "INT",
            Keyword::Decimal => "DECIMAL",
            Keyword::String => "STRING",
            Keyword::Bool => "BOOL",
            Keyword::Array => "ARRAY",
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Keyword::Int | Keyword::Decimal | Keyword::String | Keyword::Bool | Keyword::Array
        )
    }

    /// Keywords that can only appear at the start of a statement.
    pub fn introduces_statement(&self) -> bool {
        self.is_type()
            || matches!(
                self,
                Keyword::Function
                    | Keyword::Return
                    | Keyword::If
                    | Keyword::Else
                    | Keyword::ElseIf
                    | Keyword::Loop
                    | Keyword::Break
                    | Keyword::Continue
                    | Keyword::Print
                    | Keyword::Var
                    | Keyword::Import
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    /// `.` member access
    Dot,
    /// `::` host member access
    HostAccess,
    /// `@` host prefix marker
    HostPrefix,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Assign => "=",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::LtEq => "<=",
            Operator::GtEq => ">=",
            Operator::Dot => ".",
            Operator::HostAccess => "::",
            Operator::HostPrefix => "@",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::NotEq
                | Operator::Lt
                | Operator::Gt
                | Operator::LtEq
                | Operator::GtEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Delimiter {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
}

impl Delimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::LParen => "(",
            Delimiter::RParen => ")",
            Delimiter::LBracket => "[",
            Delimiter::RBracket => "]",
            Delimiter::LBrace => "{",
            Delimiter::RBrace => "}",
            Delimiter::Comma => ",",
        }
    }

    pub fn is_opener(&self) -> bool {
        matches!(self, Delimiter::LParen | Delimiter::LBracket | Delimiter::LBrace)
    }

    pub fn is_closer(&self) -> bool {
        matches!(self, Delimiter::RParen | Delimiter::RBracket | Delimiter::RBrace)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    Int,
    Decimal,
    String,
    TemplateString,
    Bool,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword(Keyword),
    Operator(Operator),
    Delimiter(Delimiter),
    Identifier,
    Literal(LiteralKind),
    /// A word recognized as part of a registered pattern.
    PatternKeyword(PatternRef),
}

/// Coarse token classes used by the legacy single-token check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Keyword,
    Operator,
    Delimiter,
    Identifier,
    Literal,
    PatternKeyword,
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenClass::Keyword => "keyword",
            TokenClass::Operator => "operator",
            TokenClass::Delimiter => "delimiter",
            TokenClass::Identifier => "identifier",
            TokenClass::Literal => "literal",
            TokenClass::PatternKeyword => "pattern keyword",
        };
        f.write_str(text)
    }
}

impl TokenKind {
    pub fn class(&self) -> TokenClass {
        match self {
            TokenKind::Keyword(_) => TokenClass::Keyword,
            TokenKind::Operator(_) => TokenClass::Operator,
            TokenKind::Delimiter(_) => TokenClass::Delimiter,
            TokenKind::Identifier => TokenClass::Identifier,
            TokenKind::Literal(_) => TokenClass::Literal,
            TokenKind::PatternKeyword(_) => TokenClass::PatternKeyword,
        }
    }

    /// Classes the legacy check accepts directly after a statement led by this kind.
    /// An empty set means no constraint.
    pub fn expected_next(&self) -> &'static [TokenClass] {
        const NAME: &[TokenClass] = &[TokenClass::Identifier];
        const IMPORT_TARGET: &[TokenClass] = &[TokenClass::Identifier, TokenClass::Literal];
        const VALUE: &[TokenClass] = &[
            TokenClass::Literal,
            TokenClass::Identifier,
            TokenClass::Operator,
            TokenClass::Delimiter,
            TokenClass::Keyword,
        ];
        match self {
            TokenKind::Keyword(Keyword::Function) => NAME,
            TokenKind::Keyword(Keyword::Var) => NAME,
            TokenKind::Keyword(k) if k.is_type() => NAME,
            TokenKind::Keyword(Keyword::Import) => IMPORT_TARGET,
            TokenKind::Keyword(Keyword::Return) => VALUE,
            TokenKind::Operator(Operator::HostPrefix) => NAME,
            TokenKind::Operator(Operator::Dot) | TokenKind::Operator(Operator::HostAccess) => NAME,
            _ => &[],
        }
    }
}

// ============================================================================
// STATIC LOOKUP TABLE
// ============================================================================

static RESERVED: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use Keyword as K;
    let keywords = [
        K::Function,
        K::Return,
        K::If,
        K::Else,
        K::Loop,
        K::While,
        K::To,
        K::In,
        K::As,
        K::Break,
        K::Continue,
        K::Print,
        K::Var,
        K::Import,
        K::New,
        K::With,
        K::And,
        K::Or,
        K::Not,
        K::Int,
        K::Decimal,
        K::String,
        K::Bool,
        K::Array,
    ];
    let operators = [
        Operator::Plus,
        Operator::Minus,
        Operator::Star,
        Operator::Slash,
        Operator::Percent,
        Operator::Assign,
        Operator::Eq,
        Operator::NotEq,
        Operator::Lt,
        Operator::Gt,
        Operator::LtEq,
        Operator::GtEq,
        Operator::Dot,
        Operator::HostAccess,
        Operator::HostPrefix,
    ];
    let delimiters = [
        Delimiter::LParen,
        Delimiter::RParen,
        Delimiter::LBracket,
        Delimiter::RBracket,
        Delimiter::LBrace,
        Delimiter::RBrace,
        Delimiter::Comma,
    ];

    let mut table = HashMap::new();
    for k in keywords {
        table.insert(k.as_str(), TokenKind::Keyword(k));
    }
    for op in operators {
        table.insert(op.as_str(), TokenKind::Operator(op));
    }
    for d in delimiters {
        table.insert(d.as_str(), TokenKind::Delimiter(d));
    }
    table.insert("TRUE", TokenKind::Literal(LiteralKind::Bool));
    table.insert("FALSE", TokenKind::Literal(LiteralKind::Bool));
    table.insert("NULL", TokenKind::Literal(LiteralKind::Null));
    table
});

/// Exact, case-sensitive lookup of reserved words, operators and punctuation.
pub fn lookup_reserved(text: &str) -> Option<TokenKind> {
    RESERVED.get(text).copied()
}

// ============================================================================
// TOKEN
// ============================================================================

/// Index of a token in its [`TokenStream`](crate::syntax::TokenStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenIdx(pub usize);

impl TokenIdx {
    /// Out-of-range sentinel standing for "no token".
    pub const NONE: TokenIdx = TokenIdx(usize::MAX);

    pub fn is_none(&self) -> bool {
        *self == TokenIdx::NONE
    }

    pub fn get(&self) -> Option<usize> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }
}

/// A classified token. `next`/`prev` are set by the linker.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub raw: RawToken,
    pub kind: TokenKind,
    pub next: TokenIdx,
    pub prev: TokenIdx,
    pub expected_next: &'static [TokenClass],
}

impl Token {
    pub fn new(raw: RawToken, kind: TokenKind) -> Self {
        Self {
            raw,
            kind,
            next: TokenIdx::NONE,
            prev: TokenIdx::NONE,
            expected_next: kind.expected_next(),
        }
    }

    pub fn text(&self) -> &str {
        &self.raw.text
    }

    pub fn span(&self) -> Span {
        self.raw.span
    }

    pub fn class(&self) -> TokenClass {
        self.kind.class()
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_operator(&self, op: Operator) -> bool {
        self.kind == TokenKind::Operator(op)
    }

    pub fn is_delimiter(&self, delimiter: Delimiter) -> bool {
        self.kind == TokenKind::Delimiter(delimiter)
    }

    /// True for the keyword itself, or for the same word claimed by a pattern.
    pub fn is_word(&self, keyword: Keyword) -> bool {
        match self.kind {
            TokenKind::Keyword(k) => k == keyword,
            TokenKind::PatternKeyword(_) => self.raw.text == keyword.as_str(),
            _ => false,
        }
    }

    /// Identifiers, plus pattern words used outside of a pattern.
    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::PatternKeyword(_))
    }

    pub fn pattern_ref(&self) -> Option<PatternRef> {
        match self.kind {
            TokenKind::PatternKeyword(r) => Some(r),
            _ => None,
        }
    }

    /// Source text of the token as error messages show it. The messages add the quotes.
    pub fn describe(&self) -> String {
        self.raw.text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_lookup_is_case_sensitive() {
        assert_eq!(lookup_reserved("IF"), Some(TokenKind::Keyword(Keyword::If)));
        assert_eq!(lookup_reserved("if"), None);
        assert_eq!(lookup_reserved("If"), None);
    }

    #[test]
    fn test_reserved_lookup_covers_punctuation() {
        assert_eq!(lookup_reserved("::"), Some(TokenKind::Operator(Operator::HostAccess)));
        assert_eq!(lookup_reserved("}"), Some(TokenKind::Delimiter(Delimiter::RBrace)));
        assert_eq!(lookup_reserved("TRUE"), Some(TokenKind::Literal(LiteralKind::Bool)));
    }

    #[test]
    fn test_expected_next_sets() {
        let function = TokenKind::Keyword(Keyword::Function);
        assert_eq!(function.expected_next(), &[TokenClass::Identifier]);
        assert!(TokenKind::Keyword(Keyword::Print).expected_next().is_empty());
        assert!(TokenKind::Keyword(Keyword::Int).expected_next().contains(&TokenClass::Identifier));
    }

    #[test]
    fn test_sentinel_index() {
        assert!(TokenIdx::NONE.is_none());
        assert_eq!(TokenIdx(3).get(), Some(3));
        assert_eq!(TokenIdx::NONE.get(), None);
    }
}
