pub use crate::diagnostics::{to_error_source, ErrorContext, ErrorType, Expected, QuillError};

pub use crate::ast::render::{render_program, render_tokens};
pub use crate::ast::{Program, Scope, ScopeId, Stmt};
pub use crate::config::ParserOptions;
pub use crate::host::{NamespaceLinker, NullLinker, RecordingLinker};
pub use crate::parser::Parser;
pub use crate::patterns::std::standard_registry;
pub use crate::patterns::PatternRegistry;
pub use crate::syntax::{RawToken, Span};

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod host;
pub mod parser;
pub mod patterns;
pub mod syntax;
