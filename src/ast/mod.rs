//! AST module for the Quill language
//!
//! The scope tree handed to the evaluator. Scopes live in one arena owned by [`Program`] and
//! refer to each other by [`ScopeId`]; statements that open a nested scope (function bodies,
//! branches, loop bodies) hold the id of the scope they own.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{duplicate_declaration, QuillError};
use crate::err_msg;
use crate::syntax::Span;

pub mod render;

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Decimal(f64),
    String(String),
    Template(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Array(Vec<Expr>),
    /// `NEW ARRAY[size]`, optionally `WITH fill`
    NewArray {
        size: Box<Expr>,
        fill: Option<Box<Expr>>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Property {
        target: Box<Expr>,
        name: String,
    },
    /// `@Name`, the root of a host-interop access chain
    Host(String),
    /// `target::member`
    HostMember {
        target: Box<Expr>,
        member: String,
    },
    Object(Vec<(String, Expr)>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    /// True if the expression is rooted at `@Name`.
    pub fn is_host_rooted(&self) -> bool {
        match self {
            Expr::Host(_) => true,
            Expr::HostMember { target, .. }
            | Expr::Call { callee: target, .. }
            | Expr::Index { target, .. }
            | Expr::Property { target, .. } => target.is_host_rooted(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::LtEq => "<=",
            CompareOp::GtEq => ">=",
        }
    }
}

/// Relational/logical condition used by `IF` and `LOOP WHILE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Compare {
        lhs: Expr,
        op: CompareOp,
        rhs: Expr,
    },
    Truthy(Expr),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

// ============================================================================
// STATEMENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeName {
    Int,
    Decimal,
    String,
    Bool,
    Array,
}

impl TypeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeName::Int => "INT",
            TypeName::Decimal => "DECIMAL",
            TypeName::String => "STRING",
            TypeName::Bool => "BOOL",
            TypeName::Array => "ARRAY",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarType {
    Static(TypeName),
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub ty: Option<TypeName>,
    pub bits: Option<u32>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeName>,
    pub body: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: Condition,
    pub body: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    /// The `IF` branch followed by any `ELSE IF` branches.
    pub branches: Vec<Branch>,
    pub otherwise: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoopKind {
    /// `LOOP n`
    Count(Expr),
    /// `LOOP WHILE cond`
    While(Condition),
    /// `LOOP a TO b`
    Range { from: Expr, to: Expr },
    /// `LOOP IN collection`
    Each(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    pub kind: LoopKind,
    pub variable: String,
    /// Set when the variable was named with `AS`.
    pub renamed: bool,
    pub body: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportTarget {
    Namespace(String),
    File(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Print(Expr),
    VariableDeclaration {
        name: String,
        ty: VarType,
        value: Option<Expr>,
    },
    Assignment {
        name: String,
        value: Expr,
    },
    ArrayAssignment {
        name: String,
        indices: Vec<Expr>,
        value: Expr,
    },
    FunctionDeclaration(FunctionDecl),
    Return(Option<Expr>),
    Break,
    Continue,
    Conditional(Conditional),
    Loop(Loop),
    /// A call to a named function, including rewritten pattern statements.
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    HostCall(Expr),
    Import(ImportTarget),
    Expression(Expr),
}

impl Stmt {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Print(_) => "print",
            Stmt::VariableDeclaration { .. } => "variable-declaration",
            Stmt::Assignment { .. } => "assignment",
            Stmt::ArrayAssignment { .. } => "array-assignment",
            Stmt::FunctionDeclaration(_) => "function-declaration",
            Stmt::Return(_) => "return",
            Stmt::Break => "break",
            Stmt::Continue => "continue",
            Stmt::Conditional(_) => "conditional",
            Stmt::Loop(_) => "loop",
            Stmt::FunctionCall { .. } => "function-call",
            Stmt::HostCall(_) => "host-interop-call",
            Stmt::Import(_) => "import",
            Stmt::Expression(_) => "bare-expression",
        }
    }

    /// Scopes owned directly by this statement, in source order.
    pub fn child_scopes(&self) -> Vec<ScopeId> {
        match self {
            Stmt::FunctionDeclaration(f) => vec![f.body],
            Stmt::Conditional(c) => c
                .branches
                .iter()
                .map(|b| b.body)
                .chain(c.otherwise)
                .collect(),
            Stmt::Loop(l) => vec![l.body],
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// SCOPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Root,
    Function,
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclarationKind {
    Variable(VarType),
    Function {
        arity: usize,
        return_type: Option<TypeName>,
    },
    Parameter(Option<TypeName>),
    LoopVariable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    pub span: Span,
}

/// A lexical binding region: ordered statements plus name-keyed declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub outer: Option<ScopeId>,
    pub statements: Vec<Stmt>,
    pub declarations: BTreeMap<String, Declaration>,
}

impl Scope {
    pub fn new(id: ScopeId, kind: ScopeKind, outer: Option<ScopeId>) -> Self {
        Self {
            id,
            kind,
            outer,
            statements: Vec::new(),
            declarations: BTreeMap::new(),
        }
    }

    /// Adds a declaration, rejecting a name already declared in this scope.
    pub fn declare(&mut self, declaration: Declaration) -> Result<(), QuillError> {
        if let Some(existing) = self.declarations.get(&declaration.name) {
            return Err(duplicate_declaration(
                declaration.name.clone(),
                declaration.span,
                existing.span,
            ));
        }
        self.declarations
            .insert(declaration.name.clone(), declaration);
        Ok(())
    }

    pub fn lookup_local(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }
}

/// The finished scope tree. Scopes are immutable once the program is returned.
///
/// Deserialization checks the arena links, so `root` and every scope id reachable from the
/// tree always index a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProgramDocument")]
pub struct Program {
    scopes: Vec<Scope>,
    root: ScopeId,
}

#[derive(Deserialize)]
struct ProgramDocument {
    scopes: Vec<Scope>,
    root: ScopeId,
}

impl TryFrom<ProgramDocument> for Program {
    type Error = QuillError;

    /// Scopes must sit at their own index, and an outer scope always precedes the scopes it
    /// encloses, which keeps every walk over the tree finite.
    fn try_from(doc: ProgramDocument) -> Result<Self, QuillError> {
        let count = doc.scopes.len();
        if doc.root.0 >= count {
            return Err(err_msg!(
                Internal,
                "root scope {} is missing from a program of {} scopes",
                doc.root.0,
                count
            ));
        }
        for (index, scope) in doc.scopes.iter().enumerate() {
            if scope.id.0 != index {
                return Err(err_msg!(
                    Internal,
                    "scope {} is stored at index {}",
                    scope.id.0,
                    index
                ));
            }
            if scope.outer.is_some_and(|outer| outer.0 >= index) {
                return Err(err_msg!(Internal, "scope {} has an invalid outer scope", index));
            }
            let children = scope.statements.iter().flat_map(Stmt::child_scopes);
            for child in children {
                if child.0 <= index || child.0 >= count {
                    return Err(err_msg!(
                        Internal,
                        "scope {} refers to invalid child scope {}",
                        index,
                        child.0
                    ));
                }
            }
        }
        Ok(Self {
            scopes: doc.scopes,
            root: doc.root,
        })
    }
}

impl Program {
    pub(crate) fn new(scopes: Vec<Scope>, root: ScopeId) -> Self {
        Self { scopes, root }
    }

    pub fn root_id(&self) -> ScopeId {
        self.root
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[self.root.0]
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Resolves `name` starting at `from` and walking outward.
    pub fn resolve(&self, from: ScopeId, name: &str) -> Option<&Declaration> {
        let mut current = self.scope(from);
        while let Some(scope) = current {
            if let Some(declaration) = scope.lookup_local(name) {
                return Some(declaration);
            }
            current = scope.outer.and_then(|outer| self.scope(outer));
        }
        None
    }

    /// Structural summary: per scope, in tree order, its declaration keys and statement kinds.
    pub fn shape(&self) -> Vec<ScopeShape> {
        let mut out = Vec::new();
        self.collect_shape(self.root, 0, &mut out);
        out
    }

    fn collect_shape(&self, id: ScopeId, depth: usize, out: &mut Vec<ScopeShape>) {
        let Some(scope) = self.scope(id) else {
            return;
        };
        out.push(ScopeShape {
            depth,
            kind: scope.kind,
            declarations: scope.declarations.keys().cloned().collect(),
            statements: scope.statements.iter().map(Stmt::kind_name).collect(),
        });
        for stmt in &scope.statements {
            for child in stmt.child_scopes() {
                self.collect_shape(child, depth + 1, out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeShape {
    pub depth: usize,
    pub kind: ScopeKind,
    pub declarations: Vec<String>,
    pub statements: Vec<&'static str>,
}
