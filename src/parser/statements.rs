//! Statement rules.
//!
//! Each rule pairs a cheap `can_handle` predicate on the lead token with a `handle` function
//! that builds the statement. [`DEFAULT_RULES`] fixes the order rules are offered a token in;
//! the first acceptance wins.

use tracing::debug;

use crate::ast::{
    Branch, Conditional, DeclarationKind, Expr, FunctionDecl, ImportTarget, Literal, Loop,
    LoopKind, Param, ScopeId, ScopeKind, Stmt, TypeName, VarType,
};
use crate::diagnostics::{Expected, QuillError};
use crate::err_ctx;
use crate::parser::expr::{literal_value, ExprParser};
use crate::parser::{ParseContext, ScopeBuilder};
use crate::patterns::rewrite;
use crate::syntax::token::{Delimiter, Keyword, LiteralKind, Operator, Token, TokenKind};
use crate::syntax::Span;

// ============================================================================
// RULE TYPES
// ============================================================================

/// Predicate on the lead token at the given index.
pub type CanHandleFn = fn(builder: &ScopeBuilder<'_>, index: usize) -> bool;

/// Builds one statement starting at `index` into `scope`.
pub type HandleFn = fn(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    scope: ScopeId,
    ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError>;

#[derive(Clone, Copy)]
pub struct StatementRule {
    pub name: &'static str,
    pub can_handle: CanHandleFn,
    pub handle: HandleFn,
}

impl std::fmt::Debug for StatementRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementRule").field("name", &self.name).finish()
    }
}

/// What a rule produced: where parsing resumes, and the statement to append, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
    pub next: usize,
    pub statement: Option<Stmt>,
    /// Skips the single-token follow check for this statement.
    pub suppress_legacy_check: bool,
}

impl HandlerOutcome {
    pub fn new(next: usize, statement: Stmt) -> Self {
        Self {
            next,
            statement: Some(statement),
            suppress_legacy_check: false,
        }
    }

    pub fn unchecked(next: usize, statement: Stmt) -> Self {
        Self {
            suppress_legacy_check: true,
            ..Self::new(next, statement)
        }
    }
}

pub static DEFAULT_RULES: &[StatementRule] = &[
    StatementRule {
        name: "import",
        can_handle: leads_with_import,
        handle: handle_import,
    },
    StatementRule {
        name: "function",
        can_handle: leads_with_function,
        handle: handle_function,
    },
    StatementRule {
        name: "return",
        can_handle: leads_with_return,
        handle: handle_return,
    },
    StatementRule {
        name: "break_continue",
        can_handle: leads_with_break_or_continue,
        handle: handle_break_or_continue,
    },
    StatementRule {
        name: "print",
        can_handle: leads_with_print,
        handle: handle_print,
    },
    StatementRule {
        name: "typed_declaration",
        can_handle: leads_with_type,
        handle: handle_typed_declaration,
    },
    StatementRule {
        name: "dynamic_declaration",
        can_handle: leads_with_var,
        handle: handle_dynamic_declaration,
    },
    StatementRule {
        name: "conditional",
        can_handle: leads_with_if,
        handle: handle_conditional,
    },
    StatementRule {
        name: "loop",
        can_handle: leads_with_loop,
        handle: handle_loop,
    },
    StatementRule {
        name: "host_call",
        can_handle: leads_with_host_prefix,
        handle: handle_host_call,
    },
    StatementRule {
        name: "pattern",
        can_handle: leads_pattern,
        handle: handle_pattern,
    },
    StatementRule {
        name: "array_assignment",
        can_handle: is_array_assignment,
        handle: handle_array_assignment,
    },
    StatementRule {
        name: "assignment",
        can_handle: is_assignment,
        handle: handle_assignment,
    },
    StatementRule {
        name: "call",
        can_handle: is_call,
        handle: handle_call,
    },
    StatementRule {
        name: "expression",
        can_handle: starts_expression,
        handle: handle_expression,
    },
];

// ============================================================================
// PREDICATES
// ============================================================================

fn lead_is_keyword(builder: &ScopeBuilder<'_>, index: usize, keyword: Keyword) -> bool {
    builder.token(index).is_some_and(|t| t.is_keyword(keyword))
}

fn leads_with_import(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_keyword(builder, index, Keyword::Import)
}

fn leads_with_function(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_keyword(builder, index, Keyword::Function)
}

fn leads_with_return(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_keyword(builder, index, Keyword::Return)
}

fn leads_with_break_or_continue(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_keyword(builder, index, Keyword::Break)
        || lead_is_keyword(builder, index, Keyword::Continue)
}

fn leads_with_print(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_keyword(builder, index, Keyword::Print)
}

fn leads_with_type(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    builder.token(index).and_then(type_name).is_some()
}

fn leads_with_var(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_keyword(builder, index, Keyword::Var)
}

fn leads_with_if(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_keyword(builder, index, Keyword::If)
}

fn leads_with_loop(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_keyword(builder, index, Keyword::Loop)
}

fn leads_with_host_prefix(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    builder
        .token(index)
        .is_some_and(|t| t.is_operator(Operator::HostPrefix))
}

fn leads_pattern(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    builder.token(index).is_some_and(|t| {
        t.pattern_ref().is_some() && builder.registry().is_leading_keyword(&t.raw.normalized)
    })
}

fn lead_is_name(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    builder.token(index).is_some_and(Token::is_name)
}

/// `name [..]... =`: index groups followed by a lone assignment operator.
fn is_array_assignment(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    if !lead_is_name(builder, index) {
        return false;
    }
    let mut at = index + 1;
    let mut groups = 0;
    while builder
        .token(at)
        .is_some_and(|t| t.is_delimiter(Delimiter::LBracket))
    {
        let Some(close) = matching_close(builder, at) else {
            return false;
        };
        at = close + 1;
        groups += 1;
    }
    groups > 0
        && builder
            .token(at)
            .is_some_and(|t| t.is_operator(Operator::Assign))
}

/// Index of the bracket closing the opener at `open`.
fn matching_close(builder: &ScopeBuilder<'_>, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut at = open;
    while let Some(token) = builder.token(at) {
        match token.kind {
            TokenKind::Delimiter(d) if d.is_opener() => depth += 1,
            TokenKind::Delimiter(d) if d.is_closer() => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(at);
                }
            }
            _ => {}
        }
        at += 1;
    }
    None
}

fn is_assignment(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_name(builder, index)
        && builder
            .token(index + 1)
            .is_some_and(|t| t.is_operator(Operator::Assign))
}

fn is_call(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    lead_is_name(builder, index)
        && builder
            .token(index + 1)
            .is_some_and(|t| t.is_delimiter(Delimiter::LParen))
}

fn starts_expression(builder: &ScopeBuilder<'_>, index: usize) -> bool {
    builder.token(index).is_some_and(|t| {
        t.is_name()
            || matches!(
                t.kind,
                TokenKind::Literal(_)
                    | TokenKind::Delimiter(Delimiter::LParen | Delimiter::LBracket)
                    | TokenKind::Operator(Operator::Minus)
            )
    })
}

// ============================================================================
// HANDLERS
// ============================================================================

fn handle_import(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    scope: ScopeId,
    ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let span = builder.stream().span_at(index);
    if scope != builder.root() || ctx.depth > 0 {
        return Err(err_ctx!(
            StructuralRule,
            "IMPORT is only allowed at the top level",
            span
        ));
    }
    let after_other = builder
        .scope(scope)?
        .statements
        .iter()
        .any(|s| !matches!(s, Stmt::Import(_)));
    if after_other {
        return Err(err_ctx!(
            StructuralRule,
            "IMPORT must come before every other statement",
            span,
            "move the IMPORT to the top of the file"
        ));
    }

    let target_at = index + 1;
    match builder.token(target_at) {
        Some(token) if token.kind == TokenKind::Literal(LiteralKind::String) => {
            let path = match literal_value(token, LiteralKind::String)? {
                Literal::String(path) => path,
                _ => token.text().to_string(),
            };
            Ok(HandlerOutcome::new(
                target_at + 1,
                Stmt::Import(ImportTarget::File(path)),
            ))
        }
        Some(token) if token.is_name() => {
            let mut segments = vec![token.text().to_string()];
            let mut at = target_at + 1;
            while builder
                .token(at)
                .is_some_and(|t| t.is_operator(Operator::Dot))
            {
                segments.push(builder.expect_name(at + 1)?.text().to_string());
                at += 2;
            }
            let namespace = segments.join(".");
            debug!(%namespace, "linking host namespace");
            builder.linker().link_namespace(&namespace);
            Ok(HandlerOutcome::new(
                at,
                Stmt::Import(ImportTarget::Namespace(namespace)),
            ))
        }
        _ => Err(builder.unexpected(
            target_at,
            Expected::any(["namespace name", "string literal"]),
        )),
    }
}

fn handle_function(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    scope: ScopeId,
    ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let name_token = builder.expect_name(index + 1)?;
    let name = name_token.text().to_string();
    let mut at = builder.expect_delimiter(index + 2, Delimiter::LParen)?;

    // (TYPE[bits] name, ...)
    let mut params: Vec<(Param, Span)> = Vec::new();
    loop {
        if builder
            .token(at)
            .is_some_and(|t| t.is_delimiter(Delimiter::RParen))
        {
            at += 1;
            break;
        }
        let (param, span, next) = parse_param(builder, at)?;
        params.push((param, span));
        at = next;
        match builder.token(at) {
            Some(t) if t.is_delimiter(Delimiter::Comma) => at += 1,
            Some(t) if t.is_delimiter(Delimiter::RParen) => {}
            _ => return Err(builder.unexpected(at, Expected::any(["','", "')'"]))),
        }
    }

    // [RET]
    let mut return_type = None;
    if builder
        .token(at)
        .is_some_and(|t| t.is_delimiter(Delimiter::LBracket))
    {
        let ty_token = builder.token(at + 1);
        let Some(ty) = ty_token.and_then(type_name) else {
            return Err(builder.unexpected(at + 1, Expected::one("type keyword")));
        };
        return_type = Some(ty);
        at = builder.expect_delimiter(at + 2, Delimiter::RBracket)?;
    }

    builder.declare(
        scope,
        name.as_str(),
        DeclarationKind::Function {
            arity: params.len(),
            return_type,
        },
        name_token.span(),
    )?;

    let body = builder.new_scope(ScopeKind::Function, scope);
    for (param, span) in &params {
        builder.declare(
            body,
            param.name.as_str(),
            DeclarationKind::Parameter(param.ty),
            *span,
        )?;
    }
    let next = builder.build_block_into(body, at, ctx.entering_function())?;

    if let Some(ty) = return_type {
        if !builder.returns_value(body) {
            return Err(err_ctx!(
                StructuralRule,
                format!(
                    "function '{}' declares return type {} but never returns a value",
                    name, ty
                ),
                name_token.span(),
                "add a RETURN with a value, or drop the return type"
            ));
        }
    }

    debug!(function = %name, params = params.len(), "built function");
    Ok(HandlerOutcome::new(
        next,
        Stmt::FunctionDeclaration(FunctionDecl {
            name,
            params: params.into_iter().map(|(p, _)| p).collect(),
            return_type,
            body,
        }),
    ))
}

/// One parameter: optional type keyword, optional `[bits]` after it, then the name.
fn parse_param(
    builder: &ScopeBuilder<'_>,
    start: usize,
) -> Result<(Param, Span, usize), QuillError> {
    let mut at = start;
    let mut ty = None;
    let mut bits = None;

    if let Some(t) = builder.token(at).and_then(type_name) {
        ty = Some(t);
        at += 1;
        if builder
            .token(at)
            .is_some_and(|t| t.is_delimiter(Delimiter::LBracket))
        {
            let width = match builder.token(at + 1) {
                Some(tok) if tok.kind == TokenKind::Literal(LiteralKind::Int) => {
                    tok.text().parse::<u32>().map_err(|_| {
                        err_ctx!(
                            StructuralRule,
                            format!("bit width '{}' is out of range", tok.text()),
                            tok.span()
                        )
                    })?
                }
                _ => return Err(builder.unexpected(at + 1, Expected::one("bit width"))),
            };
            bits = Some(width);
            at = builder.expect_delimiter(at + 2, Delimiter::RBracket)?;
        }
    }

    let name = builder.expect_name(at)?;
    Ok((
        Param {
            ty,
            bits,
            name: name.text().to_string(),
        },
        name.span(),
        at + 1,
    ))
}

fn handle_return(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    _scope: ScopeId,
    ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let void = match builder.token(index + 1) {
        None => true,
        Some(t) if t.is_delimiter(Delimiter::RBrace) => true,
        Some(t) => matches!(t.kind, TokenKind::Keyword(k) if k.introduces_statement()),
    };
    if void {
        return Ok(HandlerOutcome::unchecked(index + 1, Stmt::Return(None)));
    }
    if !ctx.in_function {
        return Err(err_ctx!(
            StructuralRule,
            "RETURN with a value outside a function",
            builder.stream().span_at(index)
        ));
    }
    let mut parser = builder.expr_at(index + 1);
    let value = parser.parse_expression()?;
    Ok(HandlerOutcome::new(
        parser.position(),
        Stmt::Return(Some(value)),
    ))
}

fn handle_break_or_continue(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    _scope: ScopeId,
    ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let is_break = lead_is_keyword(builder, index, Keyword::Break);
    let word = if is_break { "BREAK" } else { "CONTINUE" };
    if ctx.loop_depth == 0 {
        return Err(err_ctx!(
            StructuralRule,
            format!("{} outside a loop", word),
            builder.stream().span_at(index)
        ));
    }
    let statement = if is_break { Stmt::Break } else { Stmt::Continue };
    Ok(HandlerOutcome::new(index + 1, statement))
}

fn handle_print(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    _scope: ScopeId,
    _ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let mut parser = builder.expr_at(index + 1);
    let value = parser.parse_expression()?;
    Ok(HandlerOutcome::new(parser.position(), Stmt::Print(value)))
}

fn handle_typed_declaration(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    scope: ScopeId,
    _ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let Some(ty) = builder.token(index).and_then(type_name) else {
        return Err(builder.unexpected(index, Expected::one("type keyword")));
    };
    declaration(builder, index, scope, VarType::Static(ty))
}

fn handle_dynamic_declaration(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    scope: ScopeId,
    _ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    declaration(builder, index, scope, VarType::Dynamic)
}

/// `<lead> name [= value]`, declared in `scope` once the value has been read.
fn declaration(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    scope: ScopeId,
    ty: VarType,
) -> Result<HandlerOutcome, QuillError> {
    let name = builder.expect_name(index + 1)?;
    let mut next = index + 2;
    let mut value = None;
    if builder
        .token(next)
        .is_some_and(|t| t.is_operator(Operator::Assign))
    {
        let mut parser = builder.expr_at(next + 1);
        value = Some(parser.parse_expression()?);
        next = parser.position();
    }
    builder.declare(
        scope,
        name.text(),
        DeclarationKind::Variable(ty),
        name.span(),
    )?;
    Ok(HandlerOutcome::new(
        next,
        Stmt::VariableDeclaration {
            name: name.text().to_string(),
            ty,
            value,
        },
    ))
}

fn handle_conditional(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    scope: ScopeId,
    ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let mut branches = Vec::new();
    let mut at = index + 1;
    loop {
        let mut parser = builder.expr_at(at);
        let condition = parser.parse_condition()?;
        let (body, next) = builder.build_block(scope, parser.position(), ctx.nested())?;
        branches.push(Branch { condition, body });
        at = next;

        if lead_is_keyword(builder, at, Keyword::ElseIf) {
            at += 1;
            continue;
        }
        break;
    }

    let mut otherwise = None;
    if lead_is_keyword(builder, at, Keyword::Else) {
        let (body, next) = builder.build_block(scope, at + 1, ctx.nested())?;
        otherwise = Some(body);
        at = next;
    }

    Ok(HandlerOutcome::new(
        at,
        Stmt::Conditional(Conditional {
            branches,
            otherwise,
        }),
    ))
}

fn handle_loop(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    scope: ScopeId,
    ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let mut at = index + 1;
    let kind = if lead_is_keyword(builder, at, Keyword::While) {
        let mut parser = builder.expr_at(at + 1);
        let condition = parser.parse_condition()?;
        at = parser.position();
        LoopKind::While(condition)
    } else if lead_is_keyword(builder, at, Keyword::In) {
        let mut parser = builder.expr_at(at + 1);
        let collection = parser.parse_expression()?;
        at = parser.position();
        LoopKind::Each(collection)
    } else {
        let mut parser = builder.expr_at(at);
        let first = parser.parse_expression()?;
        if parser.at_keyword(Keyword::To) {
            parser.advance();
            let to = parser.parse_expression()?;
            at = parser.position();
            LoopKind::Range { from: first, to }
        } else {
            at = parser.position();
            LoopKind::Count(first)
        }
    };

    let (variable, span, renamed) = if lead_is_keyword(builder, at, Keyword::As) {
        let name = builder.expect_name(at + 1)?;
        at += 2;
        (name.text().to_string(), name.span(), true)
    } else {
        let name = builder.options().loop_variable(ctx.loop_depth);
        (name, builder.stream().span_at(index), false)
    };

    let body = builder.new_scope(ScopeKind::Block, scope);
    builder.declare(body, variable.as_str(), DeclarationKind::LoopVariable, span)?;
    let next = builder.build_block_into(body, at, ctx.entering_loop())?;

    Ok(HandlerOutcome::new(
        next,
        Stmt::Loop(Loop {
            kind,
            variable,
            renamed,
            body,
        }),
    ))
}

fn handle_host_call(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    _scope: ScopeId,
    _ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let mut parser = builder.expr_at(index);
    let expr = parser.parse_expression()?;
    let statement = if expr.is_host_rooted() {
        Stmt::HostCall(expr)
    } else {
        Stmt::Expression(expr)
    };
    Ok(HandlerOutcome::new(parser.position(), statement))
}

fn handle_pattern(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    _scope: ScopeId,
    _ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let rewritten = rewrite(builder.stream(), index, builder.registry())?;
    Ok(HandlerOutcome::new(
        rewritten.next,
        Stmt::FunctionCall {
            name: rewritten.function,
            args: rewritten.args,
        },
    ))
}

fn handle_array_assignment(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    _scope: ScopeId,
    _ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let name = builder.expect_name(index)?;
    let mut parser = builder.expr_at(index + 1);
    let mut indices = Vec::new();
    while parser.at_delimiter(Delimiter::LBracket) {
        parser.advance();
        indices.push(parser.parse_expression()?);
        parser.expect_delimiter(Delimiter::RBracket)?;
    }
    expect_assign(&mut parser)?;
    let value = parser.parse_expression()?;
    Ok(HandlerOutcome::new(
        parser.position(),
        Stmt::ArrayAssignment {
            name: name.text().to_string(),
            indices,
            value,
        },
    ))
}

fn handle_assignment(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    scope: ScopeId,
    _ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let name = builder.expect_name(index)?;
    let mut parser = builder.expr_at(index + 2);
    let value = parser.parse_expression()?;
    let next = parser.position();

    if builder.resolve(scope, name.text()).is_some() {
        return Ok(HandlerOutcome::new(
            next,
            Stmt::Assignment {
                name: name.text().to_string(),
                value,
            },
        ));
    }
    if !builder.options().implicit_declarations {
        return Err(err_ctx!(
            StructuralRule,
            format!("assignment to undeclared variable '{}'", name.text()),
            name.span(),
            format!("declare it first, e.g. VAR {} = ...", name.text())
        ));
    }
    builder.declare(
        scope,
        name.text(),
        DeclarationKind::Variable(VarType::Dynamic),
        name.span(),
    )?;
    Ok(HandlerOutcome::new(
        next,
        Stmt::VariableDeclaration {
            name: name.text().to_string(),
            ty: VarType::Dynamic,
            value: Some(value),
        },
    ))
}

fn handle_call(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    _scope: ScopeId,
    _ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let mut parser = builder.expr_at(index);
    let expr = parser.parse_expression()?;
    let statement = match expr {
        Expr::Call { callee, args } => match *callee {
            Expr::Identifier(name) => Stmt::FunctionCall { name, args },
            callee => Stmt::Expression(Expr::Call {
                callee: Box::new(callee),
                args,
            }),
        },
        other => Stmt::Expression(other),
    };
    Ok(HandlerOutcome::new(parser.position(), statement))
}

fn handle_expression(
    builder: &mut ScopeBuilder<'_>,
    index: usize,
    _scope: ScopeId,
    _ctx: ParseContext,
) -> Result<HandlerOutcome, QuillError> {
    let mut parser = builder.expr_at(index);
    let expr = parser.parse_expression()?;
    Ok(HandlerOutcome::new(parser.position(), Stmt::Expression(expr)))
}

// ============================================================================
// HELPERS
// ============================================================================

fn type_name(token: &Token) -> Option<TypeName> {
    match token.kind {
        TokenKind::Keyword(Keyword::Int) => Some(TypeName::Int),
        TokenKind::Keyword(Keyword::Decimal) => Some(TypeName::Decimal),
        TokenKind::Keyword(Keyword::String) => Some(TypeName::String),
        TokenKind::Keyword(Keyword::Bool) => Some(TypeName::Bool),
        TokenKind::Keyword(Keyword::Array) => Some(TypeName::Array),
        _ => None,
    }
}

fn expect_assign(parser: &mut ExprParser<'_>) -> Result<(), QuillError> {
    if parser.at_operator(Operator::Assign) {
        parser.advance();
        return Ok(());
    }
    Err(parser.unexpected(Expected::one("'='")))
}
