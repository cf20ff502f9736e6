//!
//! # Overview
//!
//! This module defines the unified, `miette`-based diagnostic system for the Quill front end.
//! Every failure produced by classification, expression parsing, pattern rewriting or scope
//! building is represented by [`QuillError`]. Every error is fatal to the parse that raised it;
//! the top-level driver is the only place that catches one, and it does so only to attach the
//! source text before handing the error back to the caller.
//!
//! # Error Construction Macros
//!
//! - **Use `err_msg!` for message-only errors.**
//!   - `err_msg!(StructuralRule, "RETURN with a value outside a function")`
//!
//! - **Use `err_ctx!` for errors pinned to a span.**
//!   - `err_ctx!(LexicalAmbiguity, "'!' must be followed by '='", span)`
//!   - `err_ctx!(StructuralRule, msg, span, "move the IMPORT to the top of the file")`
//!
//! - **Use [`unexpected_token`] and [`duplicate_declaration`]** for the two structured variants.
//!
//! # Rules
//!
//! - Never pass a bare integer as a span; always pass a [`Span`].
//! - Never attach source text inside a parser layer. The driver calls
//!   [`QuillError::with_source`] once, at the top.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::syntax::Span;

// Type aliases for clarity and brevity
pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe error classification that corresponds to `QuillError` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// A compound token could not be completed, or a raw token has no valid shape
    LexicalAmbiguity,
    /// A parser layer required one of a known set of token kinds and found another
    UnexpectedToken,
    /// A name already exists in the current scope
    DuplicateDeclaration,
    /// A structural rule of the language was broken (misplaced RETURN, IMPORT, BREAK, ...)
    StructuralRule,
    /// A pattern or transformation is malformed, or a required pattern variable captured nothing
    PatternConfiguration,
    /// Internal invariant violations
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::LexicalAmbiguity => "LexicalAmbiguity",
            ErrorType::UnexpectedToken => "UnexpectedToken",
            ErrorType::DuplicateDeclaration => "DuplicateDeclaration",
            ErrorType::StructuralRule => "StructuralRule",
            ErrorType::PatternConfiguration => "PatternConfiguration",
            ErrorType::Internal => "Internal",
        }
    }

    /// Diagnostic code reported through `miette`.
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorType::LexicalAmbiguity => "quill::lexical_ambiguity",
            ErrorType::UnexpectedToken => "quill::unexpected_token",
            ErrorType::DuplicateDeclaration => "quill::duplicate_declaration",
            ErrorType::StructuralRule => "quill::structural_rule",
            ErrorType::PatternConfiguration => "quill::pattern_configuration",
            ErrorType::Internal => "quill::internal",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single additional label for multi-span diagnostics.
#[derive(Debug, Clone)]
pub struct RelatedLabel {
    pub span: Span,
    pub label: String,
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    /// The source text this error points into (attached by the driver).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
    /// Additional labeled spans for multi-label diagnostics.
    pub related: Vec<RelatedLabel>,
}

impl ErrorContext {
    /// Returns an empty error context (no source, span, or help).
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a context with only a span.
    pub fn with_span(span: Span) -> Self {
        Self {
            span: Some(span),
            ..Self::default()
        }
    }

    /// Creates a context with a span and help message.
    pub fn with_span_and_help(span: Span, help: impl Into<String>) -> Self {
        Self {
            span: Some(span),
            help: Some(help.into()),
            ..Self::default()
        }
    }
}

/// The set of token kinds a parser layer would have accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected(pub Vec<String>);

impl Expected {
    pub fn one(kind: impl Into<String>) -> Self {
        Expected(vec![kind.into()])
    }

    pub fn any<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expected(kinds.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.0.iter().any(|k| k == kind)
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "nothing"),
            [only] => write!(f, "{}", only),
            [init @ .., last] => write!(f, "{} or {}", init.join(", "), last),
        }
    }
}

/// Unified error type for every front-end failure mode.
#[derive(Debug, Error)]
pub enum QuillError {
    #[error("Lexical ambiguity: {message}")]
    LexicalAmbiguity { message: String, ctx: ErrorContext },

    #[error("Unexpected token: expected {expected}, found '{found}'")]
    UnexpectedToken {
        found: String,
        expected: Expected,
        ctx: ErrorContext,
    },

    #[error("Duplicate declaration: '{name}' is already declared in this scope")]
    DuplicateDeclaration { name: String, ctx: ErrorContext },

    #[error("Structural rule violation: {message}")]
    StructuralRule { message: String, ctx: ErrorContext },

    #[error("Pattern configuration error: {message}")]
    PatternConfiguration {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String, ctx: ErrorContext },
}

impl QuillError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            QuillError::LexicalAmbiguity { ctx, .. }
            | QuillError::UnexpectedToken { ctx, .. }
            | QuillError::DuplicateDeclaration { ctx, .. }
            | QuillError::StructuralRule { ctx, .. }
            | QuillError::PatternConfiguration { ctx, .. }
            | QuillError::Internal { ctx, .. } => ctx,
        }
    }

    fn get_ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            QuillError::LexicalAmbiguity { ctx, .. }
            | QuillError::UnexpectedToken { ctx, .. }
            | QuillError::DuplicateDeclaration { ctx, .. }
            | QuillError::StructuralRule { ctx, .. }
            | QuillError::PatternConfiguration { ctx, .. }
            | QuillError::Internal { ctx, .. } => ctx,
        }
    }

    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            QuillError::LexicalAmbiguity { .. } => ErrorType::LexicalAmbiguity,
            QuillError::UnexpectedToken { .. } => ErrorType::UnexpectedToken,
            QuillError::DuplicateDeclaration { .. } => ErrorType::DuplicateDeclaration,
            QuillError::StructuralRule { .. } => ErrorType::StructuralRule,
            QuillError::PatternConfiguration { .. } => ErrorType::PatternConfiguration,
            QuillError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// The primary span of the error, when one is known.
    pub fn span(&self) -> Option<Span> {
        self.get_ctx().span
    }

    pub fn help_text(&self) -> Option<&str> {
        self.get_ctx().help.as_deref()
    }

    /// Attaches the source text the error's spans point into.
    pub fn with_source(mut self, source: SourceArc) -> Self {
        self.get_ctx_mut().source = Some(source);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.get_ctx_mut().help = Some(help.into());
        self
    }

    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.get_ctx_mut().related.push(RelatedLabel {
            span,
            label: label.into(),
        });
        self
    }

    /// Records the underlying cause of a `PatternConfiguration` error. Other variants carry
    /// no cause and are returned unchanged.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if let QuillError::PatternConfiguration { source, .. } = &mut self {
            *source = Some(Box::new(cause));
        }
        self
    }

    fn primary_label(&self) -> String {
        match self {
            QuillError::LexicalAmbiguity { .. } => "ambiguous token".into(),
            QuillError::UnexpectedToken { expected, .. } => format!("expected {}", expected),
            QuillError::DuplicateDeclaration { .. } => "declared again here".into(),
            QuillError::StructuralRule { .. } => "not allowed here".into(),
            QuillError::PatternConfiguration { .. } => "pattern failed here".into(),
            QuillError::Internal { .. } => "internal error".into(),
        }
    }
}

impl Diagnostic for QuillError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.error_type().code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        let mut labels = Vec::new();
        if let Some(span) = ctx.span {
            labels.push(LabeledSpan::new(
                Some(self.primary_label()),
                span.start,
                span.len().max(1),
            ));
        }
        for rel in &ctx.related {
            labels.push(LabeledSpan::new(
                Some(rel.label.clone()),
                rel.span.start,
                rel.span.len().max(1),
            ));
        }
        if labels.is_empty() {
            None
        } else {
            Some(Box::new(labels.into_iter()))
        }
    }
}

/// Converts a source string into an `Arc<NamedSource<String>>` for use in error contexts.
pub fn to_error_source<S: AsRef<str>>(name: &str, source: S) -> SourceArc {
    Arc::new(NamedSource::new(name, source.as_ref().to_string()))
}

/// Builds an `UnexpectedToken` error for `found` at `span`.
pub fn unexpected_token(found: impl Into<String>, expected: Expected, span: Span) -> QuillError {
    QuillError::UnexpectedToken {
        found: found.into(),
        expected,
        ctx: ErrorContext::with_span(span),
    }
}

/// Builds a `DuplicateDeclaration` error pointing at both declarations.
pub fn duplicate_declaration(name: impl Into<String>, span: Span, original: Span) -> QuillError {
    QuillError::DuplicateDeclaration {
        name: name.into(),
        ctx: ErrorContext::with_span(span),
    }
    .with_related(original, "first declared here")
}

/// Constructs a message-carrying `QuillError` variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    (PatternConfiguration, $($arg:tt)+) => {
        $crate::QuillError::PatternConfiguration {
            message: format!($($arg)+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
    ($variant:ident, $($arg:tt)+) => {
        $crate::QuillError::$variant {
            message: format!($($arg)+),
            ctx: $crate::ErrorContext::none(),
        }
    };
}

/// Constructs a message-carrying `QuillError` variant pinned to a span, with optional help.
#[macro_export]
macro_rules! err_ctx {
    (PatternConfiguration, $msg:expr, $span:expr, $help:expr) => {
        $crate::QuillError::PatternConfiguration {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_span_and_help($span, format!("{}", $help)),
            source: None,
        }
    };
    (PatternConfiguration, $msg:expr, $span:expr) => {
        $crate::QuillError::PatternConfiguration {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_span($span),
            source: None,
        }
    };
    ($variant:ident, $msg:expr, $span:expr, $help:expr) => {
        $crate::QuillError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_span_and_help($span, format!("{}", $help)),
        }
    };
    ($variant:ident, $msg:expr, $span:expr) => {
        $crate::QuillError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_span($span),
        }
    };
}
