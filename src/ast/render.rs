//! Canonical rendering of a [`Program`] back to source.
//!
//! The output is one statement per line, four spaces per nesting level. Binary expressions
//! are always parenthesized, so parsing the rendered text yields a structurally equal tree.
//! [`render_tokens`] returns the same output already split into raw tokens, with spans into
//! [`render_program`]'s text.

use crate::ast::{
    Condition, Expr, FunctionDecl, ImportTarget, Literal, Loop, LoopKind, Program, ScopeId, Stmt,
    VarType,
};
use crate::syntax::{RawToken, Span};

/// Renders the program as canonical source text.
pub fn render_program(program: &Program) -> String {
    let mut text = String::new();
    for (line, _) in layout(program) {
        text.push_str(&line);
        text.push('\n');
    }
    text
}

/// Renders the program as the raw token sequence an external lexer would produce for
/// [`render_program`]'s text.
pub fn render_tokens(program: &Program) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    for (line, words) in layout(program) {
        let mut column = line.len() - line.trim_start().len();
        for word in words {
            let start = offset + column;
            let len = word.len();
            tokens.push(RawToken::new(word, Span::new(start, start + len)));
            column += len + 1;
        }
        offset += line.len() + 1;
    }
    tokens
}

/// Renders a single expression on one line.
pub fn render_expr(expr: &Expr) -> String {
    let mut words = Vec::new();
    expr_words(expr, &mut words);
    words.join(" ")
}

fn layout(program: &Program) -> Vec<(String, Vec<String>)> {
    let mut renderer = Renderer {
        program,
        lines: Vec::new(),
        indent: 0,
    };
    renderer.statements(program.root_id());
    renderer
        .lines
        .into_iter()
        .filter(|l| !l.words.is_empty())
        .map(|l| {
            let text = format!("{}{}", "    ".repeat(l.indent), l.words.join(" "));
            (text, l.words)
        })
        .collect()
}

struct Line {
    indent: usize,
    words: Vec<String>,
}

struct Renderer<'p> {
    program: &'p Program,
    lines: Vec<Line>,
    indent: usize,
}

impl<'p> Renderer<'p> {
    fn newline(&mut self) {
        self.lines.push(Line {
            indent: self.indent,
            words: Vec::new(),
        });
    }

    fn word(&mut self, word: impl Into<String>) {
        if self.lines.is_empty() {
            self.newline();
        }
        if let Some(line) = self.lines.last_mut() {
            line.words.push(word.into());
        }
    }

    fn expr(&mut self, expr: &Expr) {
        let mut words = Vec::new();
        expr_words(expr, &mut words);
        for w in words {
            self.word(w);
        }
    }

    fn condition(&mut self, condition: &Condition) {
        let mut words = Vec::new();
        condition_words(condition, &mut words);
        for w in words {
            self.word(w);
        }
    }

    fn statements(&mut self, scope: ScopeId) {
        let Some(scope) = self.program.scope(scope) else {
            return;
        };
        for stmt in &scope.statements {
            self.newline();
            self.statement(stmt);
        }
    }

    fn block(&mut self, scope: ScopeId) {
        self.word("{");
        self.indent += 1;
        self.statements(scope);
        self.indent -= 1;
        self.newline();
        self.word("}");
    }

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Print(e) => {
                self.word("PRINT");
                self.expr(e);
            }
            Stmt::VariableDeclaration { name, ty, value } => {
                match ty {
                    VarType::Static(t) => self.word(t.as_str()),
                    VarType::Dynamic => self.word("VAR"),
                }
                self.word(name.as_str());
                if let Some(value) = value {
                    self.word("=");
                    self.expr(value);
                }
            }
            Stmt::Assignment { name, value } => {
                self.word(name.as_str());
                self.word("=");
                self.expr(value);
            }
            Stmt::ArrayAssignment {
                name,
                indices,
                value,
            } => {
                self.word(name.as_str());
                for index in indices {
                    self.word("[");
                    self.expr(index);
                    self.word("]");
                }
                self.word("=");
                self.expr(value);
            }
            Stmt::FunctionDeclaration(f) => self.function(f),
            Stmt::Return(value) => {
                self.word("RETURN");
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::Break => self.word("BREAK"),
            Stmt::Continue => self.word("CONTINUE"),
            Stmt::Conditional(c) => {
                for (i, branch) in c.branches.iter().enumerate() {
                    if i > 0 {
                        // merged back into ELSE IF by the classifier
                        self.word("ELSE");
                    }
                    self.word("IF");
                    self.condition(&branch.condition);
                    self.block(branch.body);
                }
                if let Some(otherwise) = c.otherwise {
                    self.word("ELSE");
                    self.block(otherwise);
                }
            }
            Stmt::Loop(l) => self.looping(l),
            Stmt::FunctionCall { name, args } => {
                self.word(name.as_str());
                self.word("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.word(",");
                    }
                    self.expr(arg);
                }
                self.word(")");
            }
            Stmt::HostCall(e) | Stmt::Expression(e) => self.expr(e),
            Stmt::Import(target) => {
                self.word("IMPORT");
                match target {
                    ImportTarget::Namespace(name) => {
                        for (i, segment) in name.split('.').enumerate() {
                            if i > 0 {
                                self.word(".");
                            }
                            self.word(segment);
                        }
                    }
                    ImportTarget::File(path) => self.word(quote(path)),
                }
            }
        }
    }

    fn function(&mut self, f: &FunctionDecl) {
        self.word("FUNCTION");
        self.word(f.name.as_str());
        self.word("(");
        for (i, param) in f.params.iter().enumerate() {
            if i > 0 {
                self.word(",");
            }
            if let Some(ty) = param.ty {
                self.word(ty.as_str());
                if let Some(bits) = param.bits {
                    self.word("[");
                    self.word(bits.to_string());
                    self.word("]");
                }
            }
            self.word(param.name.as_str());
        }
        self.word(")");
        if let Some(ret) = f.return_type {
            self.word("[");
            self.word(ret.as_str());
            self.word("]");
        }
        self.block(f.body);
    }

    fn looping(&mut self, l: &Loop) {
        self.word("LOOP");
        match &l.kind {
            LoopKind::Count(n) => self.expr(n),
            LoopKind::While(c) => {
                self.word("WHILE");
                self.condition(c);
            }
            LoopKind::Range { from, to } => {
                self.expr(from);
                self.word("TO");
                self.expr(to);
            }
            LoopKind::Each(collection) => {
                self.word("IN");
                self.expr(collection);
            }
        }
        if l.renamed {
            self.word("AS");
            self.word(l.variable.as_str());
        }
        self.block(l.body);
    }
}

/// Positional form with at least one fractional digit, the only decimal shape the
/// classifier reads back.
fn decimal_text(value: f64) -> String {
    let text = format!("{}", value);
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

fn literal_words(literal: &Literal, out: &mut Vec<String>) {
    match literal {
        Literal::Int(v) if *v < 0 => {
            out.push("-".into());
            out.push(v.unsigned_abs().to_string());
        }
        Literal::Int(v) => out.push(v.to_string()),
        Literal::Decimal(v) if v.is_sign_negative() => {
            out.push("-".into());
            out.push(decimal_text(-v));
        }
        Literal::Decimal(v) => out.push(decimal_text(*v)),
        Literal::String(s) => out.push(quote(s)),
        Literal::Template(s) => out.push(format!("`{}`", s)),
        Literal::Bool(true) => out.push("TRUE".into()),
        Literal::Bool(false) => out.push("FALSE".into()),
        Literal::Null => out.push("NULL".into()),
    }
}

fn list_words(items: &[Expr], out: &mut Vec<String>) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(",".into());
        }
        expr_words(item, out);
    }
}

fn expr_words(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Literal(l) => literal_words(l, out),
        Expr::Identifier(name) => out.push(name.clone()),
        Expr::Neg(inner) => {
            out.push("-".into());
            expr_words(inner, out);
        }
        Expr::Binary { op, lhs, rhs } => {
            out.push("(".into());
            expr_words(lhs, out);
            out.push(op.as_str().into());
            expr_words(rhs, out);
            out.push(")".into());
        }
        Expr::Array(items) => {
            out.push("[".into());
            list_words(items, out);
            out.push("]".into());
        }
        Expr::NewArray { size, fill } => {
            out.extend(["NEW".into(), "ARRAY".into(), "[".into()]);
            expr_words(size, out);
            out.push("]".into());
            if let Some(fill) = fill {
                out.push("WITH".into());
                expr_words(fill, out);
            }
        }
        Expr::Call { callee, args } => {
            expr_words(callee, out);
            out.push("(".into());
            list_words(args, out);
            out.push(")".into());
        }
        Expr::Index { target, index } => {
            expr_words(target, out);
            out.push("[".into());
            expr_words(index, out);
            out.push("]".into());
        }
        Expr::Property { target, name } => {
            expr_words(target, out);
            out.push(".".into());
            out.push(name.clone());
        }
        Expr::Host(name) => {
            out.push("@".into());
            out.push(name.clone());
        }
        Expr::HostMember { target, member } => {
            expr_words(target, out);
            out.push("::".into());
            out.push(member.clone());
        }
        Expr::Object(fields) => {
            out.push("{".into());
            for (key, value) in fields {
                out.push(key.clone());
                out.push("=".into());
                expr_words(value, out);
                out.push(",".into());
            }
            out.push("}".into());
        }
    }
}

/// Binding strength, loosest first.
fn condition_rank(condition: &Condition) -> u8 {
    match condition {
        Condition::Or(..) => 0,
        Condition::And(..) => 1,
        Condition::Not(_) => 2,
        Condition::Compare { .. } | Condition::Truthy(_) => 3,
    }
}

fn operand_words(condition: &Condition, min_rank: u8, out: &mut Vec<String>) {
    if condition_rank(condition) < min_rank {
        out.push("(".into());
        condition_words(condition, out);
        out.push(")".into());
    } else {
        condition_words(condition, out);
    }
}

fn condition_words(condition: &Condition, out: &mut Vec<String>) {
    match condition {
        Condition::Compare { lhs, op, rhs } => {
            expr_words(lhs, out);
            out.push(op.as_str().into());
            expr_words(rhs, out);
        }
        Condition::Truthy(e) => expr_words(e, out),
        Condition::Not(inner) => {
            out.push("NOT".into());
            operand_words(inner, 2, out);
        }
        Condition::And(lhs, rhs) => {
            operand_words(lhs, 1, out);
            out.push("AND".into());
            operand_words(rhs, 2, out);
        }
        Condition::Or(lhs, rhs) => {
            operand_words(lhs, 0, out);
            out.push("OR".into());
            operand_words(rhs, 1, out);
        }
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    #[test]
    fn test_binary_is_parenthesized() {
        let expr = Expr::Binary {
            op: BinaryOp::Mul,
            lhs: Box::new(Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::int(1)),
                rhs: Box::new(Expr::int(2)),
            }),
            rhs: Box::new(Expr::ident("x")),
        };
        assert_eq!(render_expr(&expr), "( ( 1 + 2 ) * x )");
    }

    #[test]
    fn test_decimals_never_use_exponents() {
        let rendered: Vec<_> = [0.00001, 1e16, 2.0, 2.5, -0.125]
            .into_iter()
            .map(|v| render_expr(&Expr::Literal(Literal::Decimal(v))))
            .collect();
        assert_eq!(
            rendered,
            ["0.00001", "10000000000000000.0", "2.0", "2.5", "- 0.125"]
        );
    }

    #[test]
    fn test_strings_are_reescaped() {
        let expr = Expr::string("say \"hi\"\n");
        assert_eq!(render_expr(&expr), r#""say \"hi\"\n""#);
    }

    #[test]
    fn test_host_chain() {
        let expr = Expr::Call {
            callee: Box::new(Expr::HostMember {
                target: Box::new(Expr::Host("Math".into())),
                member: "Max".into(),
            }),
            args: vec![Expr::int(1), Expr::int(2)],
        };
        assert_eq!(render_expr(&expr), "@ Math :: Max ( 1 , 2 )");
    }

    #[test]
    fn test_conditions_keep_grouping() {
        let a = Condition::Truthy(Expr::ident("a"));
        let b = Condition::Truthy(Expr::ident("b"));
        let c = Condition::Truthy(Expr::ident("c"));
        let cond = Condition::And(
            Box::new(Condition::Or(Box::new(a), Box::new(b))),
            Box::new(Condition::Not(Box::new(c))),
        );
        let mut words = Vec::new();
        condition_words(&cond, &mut words);
        assert_eq!(words.join(" "), "( a OR b ) AND NOT c");
    }
}
