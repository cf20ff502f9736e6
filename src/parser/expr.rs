//! Expression parser.
//!
//! Recursive descent over a bounded window of the token stream. Precedence, loosest first:
//! additive, multiplicative, unary minus, primary. Primaries take postfix call, index,
//! property and (for host-rooted chains) `::` member operations.

use crate::ast::{BinaryOp, Expr, Literal};
use crate::config::DEFAULT_MAX_DEPTH;
use crate::diagnostics::{unexpected_token, Expected, QuillError};
use crate::err_ctx;
use crate::syntax::token::{Delimiter, Keyword, LiteralKind, Operator, Token, TokenKind};
use crate::syntax::TokenStream;

/// Parses tokens `start..end` as exactly one expression.
pub fn parse_span(stream: &TokenStream, start: usize, end: usize) -> Result<Expr, QuillError> {
    let mut parser = ExprParser::new(stream, start, end);
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

pub struct ExprParser<'s> {
    stream: &'s TokenStream,
    pos: usize,
    end: usize,
    depth: usize,
    max_depth: usize,
}

impl<'s> ExprParser<'s> {
    pub fn new(stream: &'s TokenStream, start: usize, end: usize) -> Self {
        Self {
            stream,
            pos: start,
            end: end.min(stream.len()),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Caps how deeply sub-expressions and sub-conditions may nest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Runs `f` one nesting level deeper, failing once the level passes `max_depth`.
    pub(crate) fn descend<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, QuillError>,
    ) -> Result<T, QuillError> {
        if self.depth >= self.max_depth {
            let span = match self.peek() {
                Some(token) => token.span(),
                None => self.stream.span_at(self.pos),
            };
            return Err(err_ctx!(
                StructuralRule,
                format!("expression nesting exceeds the maximum depth of {}", self.max_depth),
                span,
                "split the expression with intermediate variables"
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor back to a position returned by [`position`](Self::position).
    pub fn rewind(&mut self, position: usize) {
        self.pos = position;
    }

    pub fn peek(&self) -> Option<&'s Token> {
        if self.pos < self.end {
            self.stream.get(self.pos)
        } else {
            None
        }
    }

    pub fn advance(&mut self) -> Option<&'s Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    pub fn at_delimiter(&self, delimiter: Delimiter) -> bool {
        self.peek().is_some_and(|t| t.is_delimiter(delimiter))
    }

    pub fn at_operator(&self, op: Operator) -> bool {
        self.peek().is_some_and(|t| t.is_operator(op))
    }

    pub fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    /// An `UnexpectedToken` error for the token under the cursor.
    pub fn unexpected(&self, expected: Expected) -> QuillError {
        match self.peek() {
            Some(token) => unexpected_token(token.describe(), expected, token.span()),
            None => unexpected_token("end of input", expected, self.stream.span_at(self.pos)),
        }
    }

    pub fn expect_delimiter(&mut self, delimiter: Delimiter) -> Result<&'s Token, QuillError> {
        match self.peek() {
            Some(token) if token.is_delimiter(delimiter) => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(Expected::one(format!("'{}'", delimiter.as_str())))),
        }
    }

    pub fn expect_name(&mut self) -> Result<&'s Token, QuillError> {
        match self.peek() {
            Some(token) if token.is_name() => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(Expected::one("identifier"))),
        }
    }

    pub fn expect_end(&self) -> Result<(), QuillError> {
        if self.pos < self.end {
            return Err(self.unexpected(Expected::any(["operator", "end of expression"])));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Precedence levels
    // ------------------------------------------------------------------------

    pub fn parse_expression(&mut self) -> Result<Expr, QuillError> {
        self.descend(Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Expr, QuillError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Operator(Operator::Plus)) => BinaryOp::Add,
                Some(TokenKind::Operator(Operator::Minus)) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, QuillError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Operator(Operator::Star)) => BinaryOp::Mul,
                Some(TokenKind::Operator(Operator::Slash)) => BinaryOp::Div,
                Some(TokenKind::Operator(Operator::Percent)) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, QuillError> {
        if self.at_operator(Operator::Minus) {
            self.pos += 1;
            let operand = self.descend(Self::parse_unary)?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, QuillError> {
        let Some(token) = self.peek() else {
            return Err(self.unexpected(Expected::one("expression")));
        };

        match token.kind {
            TokenKind::Delimiter(Delimiter::LParen) => {
                self.pos += 1;
                let inner = self.parse_expression()?;
                self.expect_delimiter(Delimiter::RParen)?;
                Ok(inner)
            }
            TokenKind::Delimiter(Delimiter::LBracket) => {
                self.pos += 1;
                let items = self.parse_list(Delimiter::RBracket)?;
                Ok(Expr::Array(items))
            }
            TokenKind::Delimiter(Delimiter::LBrace) => self.parse_object(),
            TokenKind::Keyword(Keyword::New) => self.parse_new_array(),
            TokenKind::Literal(kind) => {
                self.pos += 1;
                literal_value(token, kind).map(Expr::Literal)
            }
            TokenKind::Identifier | TokenKind::PatternKeyword(_) => {
                self.pos += 1;
                if self.at_operator(Operator::HostAccess) {
                    return Err(unexpected_token(
                        token.describe(),
                        Expected::one("'@'"),
                        token.span(),
                    )
                    .with_help(format!("host members are written as @{}::Member", token.text())));
                }
                self.parse_postfix(Expr::Identifier(token.text().to_string()))
            }
            TokenKind::Operator(Operator::HostPrefix) => {
                self.pos += 1;
                let name = self.expect_name()?;
                self.parse_postfix(Expr::Host(name.text().to_string()))
            }
            _ => Err(self.unexpected(Expected::any([
                "literal",
                "identifier",
                "'('",
                "'['",
                "'{'",
                "'@'",
                "NEW",
            ]))),
        }
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, QuillError> {
        loop {
            let Some(token) = self.peek() else {
                return Ok(expr);
            };
            expr = match token.kind {
                TokenKind::Delimiter(Delimiter::LParen) => {
                    self.pos += 1;
                    let args = self.parse_list(Delimiter::RParen)?;
                    Expr::Call {
                        callee: Box::new(expr),
                        args,
                    }
                }
                TokenKind::Delimiter(Delimiter::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_expression()?;
                    self.expect_delimiter(Delimiter::RBracket)?;
                    Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    }
                }
                TokenKind::Operator(Operator::Dot) => {
                    self.pos += 1;
                    let name = self.expect_name()?;
                    Expr::Property {
                        target: Box::new(expr),
                        name: name.text().to_string(),
                    }
                }
                TokenKind::Operator(Operator::HostAccess) => {
                    if !expr.is_host_rooted() {
                        return Err(unexpected_token(
                            token.describe(),
                            Expected::any(["'('", "'['", "'.'"]),
                            token.span(),
                        )
                        .with_help("'::' only follows an @-prefixed host name"));
                    }
                    self.pos += 1;
                    let member = self.expect_name()?;
                    Expr::HostMember {
                        target: Box::new(expr),
                        member: member.text().to_string(),
                    }
                }
                _ => return Ok(expr),
            };
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: Delimiter) -> Result<Vec<Expr>, QuillError> {
        let mut items = Vec::new();
        loop {
            if self.at_delimiter(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse_expression()?);
            if self.at_delimiter(Delimiter::Comma) {
                self.pos += 1;
                continue;
            }
            self.expect_delimiter(close)?;
            return Ok(items);
        }
    }

    fn parse_object(&mut self) -> Result<Expr, QuillError> {
        self.expect_delimiter(Delimiter::LBrace)?;
        let mut fields = Vec::new();
        loop {
            if self.at_delimiter(Delimiter::RBrace) {
                self.pos += 1;
                return Ok(Expr::Object(fields));
            }
            let key = self.expect_name()?.text().to_string();
            if !self.at_operator(Operator::Assign) {
                return Err(self.unexpected(Expected::one("'='")));
            }
            self.pos += 1;
            let value = self.parse_expression()?;
            fields.push((key, value));
            if self.at_delimiter(Delimiter::Comma) {
                self.pos += 1;
                continue;
            }
            self.expect_delimiter(Delimiter::RBrace)?;
            return Ok(Expr::Object(fields));
        }
    }

    /// `NEW ARRAY[size]`, optionally followed by `WITH fill`.
    fn parse_new_array(&mut self) -> Result<Expr, QuillError> {
        self.pos += 1;
        if !self.at_keyword(Keyword::Array) {
            return Err(self.unexpected(Expected::one("ARRAY")));
        }
        self.pos += 1;
        self.expect_delimiter(Delimiter::LBracket)?;
        let size = self.parse_expression()?;
        self.expect_delimiter(Delimiter::RBracket)?;
        let fill = if self.at_keyword(Keyword::With) {
            self.pos += 1;
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Expr::NewArray {
            size: Box::new(size),
            fill,
        })
    }
}

/// Converts a literal token to its value.
pub fn literal_value(token: &Token, kind: LiteralKind) -> Result<Literal, QuillError> {
    let text = token.text();
    match kind {
        LiteralKind::Int => text.parse::<i64>().map(Literal::Int).map_err(|_| {
            err_ctx!(
                LexicalAmbiguity,
                format!("integer literal '{}' is out of range", text),
                token.span()
            )
        }),
        LiteralKind::Decimal => text.parse::<f64>().map(Literal::Decimal).map_err(|_| {
            err_ctx!(
                LexicalAmbiguity,
                format!("malformed decimal literal '{}'", text),
                token.span()
            )
        }),
        LiteralKind::String => Ok(Literal::String(unescape(strip_quotes(text)))),
        LiteralKind::TemplateString => Ok(Literal::Template(strip_quotes(text).to_string())),
        LiteralKind::Bool => Ok(Literal::Bool(text == "TRUE")),
        LiteralKind::Null => Ok(Literal::Null),
    }
}

fn strip_quotes(text: &str) -> &str {
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Resolves backslash escapes inside a quoted string body.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
