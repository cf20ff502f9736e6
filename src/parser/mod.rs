//! # Quill Parser
//!
//! Drives the whole front end: classify raw tokens, link them into a stream, then build the
//! scope tree statement by statement.
//!
//! ## Pipeline
//!
//! ```text
//! RawToken[] -> classify -> link -> ScopeBuilder (statement rules) -> Program
//! ```
//!
//! Classification runs over the whole input before any scope is built. Statement rules are
//! tried in [`DEFAULT_RULES`] order; the first rule accepting the lead token builds the
//! statement. Every error aborts the parse.

use tracing::debug;

use crate::ast::{Declaration, DeclarationKind, Program, Scope, ScopeId, ScopeKind, Stmt};
use crate::config::ParserOptions;
use crate::diagnostics::{to_error_source, unexpected_token, Expected, QuillError};
use crate::err_ctx;
use crate::host::{NamespaceLinker, NullLinker};
use crate::patterns::PatternRegistry;
use crate::syntax::token::{Delimiter, Keyword, Token};
use crate::syntax::{classify, RawToken, Span, TokenStream};

pub mod condition;
pub mod expr;
pub mod statements;

pub use expr::{parse_span, ExprParser};
pub use statements::{HandlerOutcome, StatementRule, DEFAULT_RULES};

// ============================================================================
// PARSE CONTEXT
// ============================================================================

/// Immutable per-recursion state. Nested constructs receive a modified copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseContext {
    pub depth: usize,
    pub in_function: bool,
    pub loop_depth: usize,
}

impl ParseContext {
    pub fn root() -> Self {
        Self::default()
    }

    /// Context for an ordinary nested block.
    pub fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    /// Context for a function body. Loops outside the function do not enclose its body.
    pub fn entering_function(self) -> Self {
        Self {
            depth: self.depth + 1,
            in_function: true,
            loop_depth: 0,
        }
    }

    pub fn entering_loop(self) -> Self {
        Self {
            depth: self.depth + 1,
            loop_depth: self.loop_depth + 1,
            ..self
        }
    }
}

// ============================================================================
// SCOPE BUILDER
// ============================================================================

/// Builds the scope arena for one token stream. Owned by a single parse.
pub struct ScopeBuilder<'a> {
    stream: &'a TokenStream,
    registry: &'a PatternRegistry,
    options: &'a ParserOptions,
    linker: &'a mut dyn NamespaceLinker,
    rules: &'a [StatementRule],
    scopes: Vec<Scope>,
    root: ScopeId,
}

impl<'a> ScopeBuilder<'a> {
    pub fn new(
        stream: &'a TokenStream,
        registry: &'a PatternRegistry,
        options: &'a ParserOptions,
        linker: &'a mut dyn NamespaceLinker,
    ) -> Self {
        let root = ScopeId(0);
        Self {
            stream,
            registry,
            options,
            linker,
            rules: DEFAULT_RULES,
            scopes: vec![Scope::new(root, ScopeKind::Root, None)],
            root,
        }
    }

    pub fn stream(&self) -> &'a TokenStream {
        self.stream
    }

    pub fn registry(&self) -> &'a PatternRegistry {
        self.registry
    }

    pub fn options(&self) -> &'a ParserOptions {
        self.options
    }

    pub fn linker(&mut self) -> &mut dyn NamespaceLinker {
        &mut *self.linker
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn token(&self, index: usize) -> Option<&'a Token> {
        self.stream.get(index)
    }

    /// An expression parser over the rest of the stream, starting at `index`.
    pub fn expr_at(&self, index: usize) -> ExprParser<'a> {
        ExprParser::new(self.stream, index, self.stream.len())
            .with_max_depth(self.options.max_depth)
    }

    pub fn scope(&self, id: ScopeId) -> Result<&Scope, QuillError> {
        self.scopes.get(id.0).ok_or_else(|| {
            err_ctx!(Internal, format!("unknown scope {:?}", id), Span::default())
        })
    }

    fn scope_mut(&mut self, id: ScopeId) -> Result<&mut Scope, QuillError> {
        self.scopes.get_mut(id.0).ok_or_else(|| {
            err_ctx!(Internal, format!("unknown scope {:?}", id), Span::default())
        })
    }

    pub fn new_scope(&mut self, kind: ScopeKind, outer: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(id, kind, Some(outer)));
        id
    }

    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        kind: DeclarationKind,
        span: Span,
    ) -> Result<(), QuillError> {
        self.scope_mut(scope)?.declare(Declaration {
            name: name.into(),
            kind,
            span,
        })
    }

    /// Looks `name` up from `scope` outward.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<&Declaration> {
        let mut current = self.scopes.get(scope.0);
        while let Some(s) = current {
            if let Some(declaration) = s.lookup_local(name) {
                return Some(declaration);
            }
            current = s.outer.and_then(|outer| self.scopes.get(outer.0));
        }
        None
    }

    // ------------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------------

    /// `UnexpectedToken` for whatever sits at `index` (or the end of input).
    pub fn unexpected(&self, index: usize, expected: Expected) -> QuillError {
        match self.token(index) {
            Some(token) => unexpected_token(token.describe(), expected, token.span()),
            None => unexpected_token("end of input", expected, self.stream.span_at(index)),
        }
    }

    pub fn expect_delimiter(&self, index: usize, delimiter: Delimiter) -> Result<usize, QuillError> {
        match self.token(index) {
            Some(token) if token.is_delimiter(delimiter) => Ok(index + 1),
            _ => Err(self.unexpected(index, Expected::one(format!("'{}'", delimiter.as_str())))),
        }
    }

    pub fn expect_keyword(&self, index: usize, keyword: Keyword) -> Result<usize, QuillError> {
        match self.token(index) {
            Some(token) if token.is_keyword(keyword) => Ok(index + 1),
            _ => Err(self.unexpected(index, Expected::one(keyword.as_str()))),
        }
    }

    pub fn expect_name(&self, index: usize) -> Result<&'a Token, QuillError> {
        match self.token(index) {
            Some(token) if token.is_name() => Ok(token),
            _ => Err(self.unexpected(index, Expected::one("identifier"))),
        }
    }

    // ------------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------------

    /// Builds statements into `scope` from `start` until end of input or, for a nested
    /// scope, the closing `}`. Returns the index where building stopped.
    pub fn build_statements(
        &mut self,
        scope: ScopeId,
        start: usize,
        ctx: ParseContext,
    ) -> Result<usize, QuillError> {
        let mut index = start;
        while let Some(token) = self.token(index) {
            if scope != self.root && token.is_delimiter(Delimiter::RBrace) {
                break;
            }
            index = self.dispatch(scope, index, ctx)?;
        }
        Ok(index)
    }

    /// Builds `{ ... }` at `start` into an existing scope. Returns the index past `}`.
    pub fn build_block_into(
        &mut self,
        scope: ScopeId,
        start: usize,
        ctx: ParseContext,
    ) -> Result<usize, QuillError> {
        if ctx.depth > self.options.max_depth {
            return Err(err_ctx!(
                StructuralRule,
                format!("blocks nested deeper than {} levels", self.options.max_depth),
                self.stream.span_at(start),
                "raise ParserOptions::max_depth or flatten the nesting"
            ));
        }
        let body = self.expect_delimiter(start, Delimiter::LBrace)?;
        let close = self.build_statements(scope, body, ctx)?;
        self.expect_delimiter(close, Delimiter::RBrace)
    }

    /// Creates a block scope under `outer` and builds `{ ... }` at `start` into it.
    pub fn build_block(
        &mut self,
        outer: ScopeId,
        start: usize,
        ctx: ParseContext,
    ) -> Result<(ScopeId, usize), QuillError> {
        let scope = self.new_scope(ScopeKind::Block, outer);
        let next = self.build_block_into(scope, start, ctx)?;
        Ok((scope, next))
    }

    /// Offers the token at `index` to each rule in order and runs the first that accepts it.
    fn dispatch(
        &mut self,
        scope: ScopeId,
        index: usize,
        ctx: ParseContext,
    ) -> Result<usize, QuillError> {
        let rules = self.rules;
        let Some(rule) = rules.iter().find(|r| (r.can_handle)(self, index)) else {
            return Err(self.unexpected(index, Expected::one("statement")));
        };

        let outcome = (rule.handle)(self, index, scope, ctx)?;
        if outcome.next <= index {
            return Err(err_ctx!(
                Internal,
                format!("statement rule '{}' did not advance", rule.name),
                self.stream.span_at(index)
            ));
        }
        if self.options.legacy_token_checks && !outcome.suppress_legacy_check {
            self.legacy_check(index)?;
        }
        if let Some(statement) = outcome.statement {
            self.scope_mut(scope)?.statements.push(statement);
        }
        Ok(outcome.next)
    }

    /// The lead token's expected-next class set, when non-empty, must admit the next token.
    fn legacy_check(&self, index: usize) -> Result<(), QuillError> {
        let Some(lead) = self.token(index) else {
            return Ok(());
        };
        if lead.expected_next.is_empty() {
            return Ok(());
        }
        match self.token(index + 1) {
            Some(next) if lead.expected_next.contains(&next.class()) => Ok(()),
            _ => Err(self.unexpected(
                index + 1,
                Expected::any(lead.expected_next.iter().map(|c| c.to_string())),
            )),
        }
    }

    fn finish(self) -> Program {
        Program::new(self.scopes, self.root)
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Entry point: parses raw tokens into a [`Program`] against a borrowed pattern registry.
pub struct Parser<'r> {
    registry: &'r PatternRegistry,
    options: ParserOptions,
}

impl<'r> Parser<'r> {
    pub fn new(registry: &'r PatternRegistry) -> Self {
        Self::with_options(registry, ParserOptions::default())
    }

    pub fn with_options(registry: &'r PatternRegistry, options: ParserOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Classifies and links the raw tokens without building scopes.
    pub fn classify_and_link(&self, raw: &[RawToken]) -> Result<TokenStream, QuillError> {
        Ok(TokenStream::new(classify(raw, self.registry)?))
    }

    pub fn parse(&self, raw: &[RawToken]) -> Result<Program, QuillError> {
        self.parse_with_linker(raw, &mut NullLinker)
    }

    /// Parses, announcing namespace imports to `linker`.
    pub fn parse_with_linker(
        &self,
        raw: &[RawToken],
        linker: &mut dyn NamespaceLinker,
    ) -> Result<Program, QuillError> {
        debug!(
            tokens = raw.len(),
            patterns = self.registry.len(),
            "parse started"
        );
        let stream = self.classify_and_link(raw)?;
        let mut builder = ScopeBuilder::new(&stream, self.registry, &self.options, linker);
        let root = builder.root();
        builder.build_statements(root, 0, ParseContext::root())?;
        let program = builder.finish();
        debug!(
            scopes = program.scopes().len(),
            statements = program.root().statements.len(),
            "parse finished"
        );
        Ok(program)
    }

    /// Like [`parse`](Self::parse), but any error carries `source` for rendering.
    pub fn parse_source(
        &self,
        name: &str,
        source: &str,
        raw: &[RawToken],
    ) -> Result<Program, QuillError> {
        self.parse(raw)
            .map_err(|e| e.with_source(to_error_source(name, source)))
    }
}

impl<'a> ScopeBuilder<'a> {
    /// True if `scope` holds a value-returning `RETURN`, looking through nested blocks but
    /// not into nested functions.
    pub fn returns_value(&self, scope: ScopeId) -> bool {
        let Some(scope) = self.scopes.get(scope.0) else {
            return false;
        };
        scope.statements.iter().any(|stmt| match stmt {
            Stmt::Return(Some(_)) => true,
            Stmt::FunctionDeclaration(_) => false,
            other => other
                .child_scopes()
                .into_iter()
                .any(|child| self.returns_value(child)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;

    fn parse(words: &[&str]) -> Result<Program, QuillError> {
        let registry = PatternRegistry::new();
        Parser::new(&registry).parse(&RawToken::from_words(words.iter().copied()))
    }

    #[test]
    fn test_context_overrides() {
        let ctx = ParseContext::root().entering_loop().entering_loop();
        assert_eq!(ctx.loop_depth, 2);
        let inner = ctx.entering_function();
        assert_eq!((inner.depth, inner.loop_depth, inner.in_function), (3, 0, true));
        assert_eq!(ctx.nested().loop_depth, 2);
    }

    #[test]
    fn test_empty_input_yields_empty_root() {
        let program = parse(&[]).unwrap();
        assert!(program.root().statements.is_empty());
        assert_eq!(program.scopes().len(), 1);
    }

    #[test]
    fn test_stray_closer_is_unexpected() {
        let err = parse(&["}"]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::UnexpectedToken);
    }

    #[test]
    fn test_depth_limit() {
        let registry = PatternRegistry::new();
        let options = ParserOptions {
            max_depth: 1,
            ..ParserOptions::default()
        };
        let words = ["IF", "a", "{", "IF", "b", "{", "}", "}"];
        let err = Parser::with_options(&registry, options)
            .parse(&RawToken::from_words(words))
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::StructuralRule);
    }

    #[test]
    fn test_parse_source_attaches_source() {
        let registry = PatternRegistry::new();
        let err = Parser::new(&registry)
            .parse_source("main.q", "PRINT", &RawToken::from_words(["PRINT"]))
            .unwrap_err();
        assert!(miette::Diagnostic::source_code(&err).is_some());
    }
}
