// tests/statement_tests.rs

mod common;

use common::{lex, parse, root_statements};
use quill::ast::{
    CompareOp, Condition, DeclarationKind, Expr, ImportTarget, LoopKind, ScopeKind, Stmt,
    TypeName, VarType,
};
use quill::{standard_registry, ErrorType, Parser, ParserOptions, RecordingLinker};
use rstest::rstest;

fn error_type(source: &str) -> ErrorType {
    match parse(source) {
        Ok(program) => panic!("expected {:?} to fail, got {:?}", source, program),
        Err(e) => e.error_type(),
    }
}

// ---
// Declarations and assignments
// ---

#[test]
fn test_typed_and_dynamic_declarations() {
    let program = parse("INT count = 0 VAR label = \"x\" STRING empty").unwrap();
    let statements = &program.root().statements;
    assert_eq!(
        statements[0],
        Stmt::VariableDeclaration {
            name: "count".into(),
            ty: VarType::Static(TypeName::Int),
            value: Some(Expr::int(0)),
        }
    );
    assert!(matches!(
        &statements[1],
        Stmt::VariableDeclaration { ty: VarType::Dynamic, .. }
    ));
    assert!(matches!(
        &statements[2],
        Stmt::VariableDeclaration { value: None, .. }
    ));
    assert_eq!(program.root().declarations.len(), 3);
}

#[test]
fn test_duplicate_declaration_in_one_scope() {
    let err = parse("VAR x = 1 VAR x = 2").unwrap_err();
    assert_eq!(err.error_type(), ErrorType::DuplicateDeclaration);
    assert!(err.to_string().contains("'x'"));
}

#[test]
fn test_shadowing_in_nested_scope_is_allowed() {
    assert!(parse("VAR x = 1 IF x { VAR x = 2 }").is_ok());
}

#[test]
fn test_assignment_to_declared_variable() {
    let statements = root_statements("VAR x = 1 x = x + 1");
    assert!(matches!(&statements[1], Stmt::Assignment { name, .. } if name == "x"));
}

#[test]
fn test_assignment_resolves_through_outer_scopes() {
    let program = parse("VAR total = 0 LOOP 3 { total = total + i }").unwrap();
    let Stmt::Loop(looping) = &program.root().statements[1] else {
        panic!("expected a loop");
    };
    let body = program.scope(looping.body).unwrap();
    assert!(matches!(&body.statements[0], Stmt::Assignment { .. }));
}

#[test]
fn test_implicit_declarations_can_be_disabled() {
    let registry = standard_registry().unwrap();
    let options = ParserOptions {
        implicit_declarations: false,
        ..ParserOptions::default()
    };
    let err = Parser::with_options(&registry, options)
        .parse(&lex("x = 1"))
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::StructuralRule);
}

#[test]
fn test_array_assignment() {
    let statements = root_statements("VAR grid = NEW ARRAY[3] WITH 0 grid[1] = 5");
    assert_eq!(
        statements[1],
        Stmt::ArrayAssignment {
            name: "grid".into(),
            indices: vec![Expr::int(1)],
            value: Expr::int(5),
        }
    );
}

// ---
// Functions and RETURN
// ---

#[test]
fn test_function_with_typed_parameters() {
    let program = parse("FUNCTION add(INT[32] a, INT b, c) [INT] { RETURN a + b }").unwrap();
    let Stmt::FunctionDeclaration(f) = &program.root().statements[0] else {
        panic!("expected a function");
    };
    assert_eq!(f.name, "add");
    assert_eq!(f.return_type, Some(TypeName::Int));
    assert_eq!(f.params[0].bits, Some(32));
    assert_eq!(f.params[2].ty, None);

    let body = program.scope(f.body).unwrap();
    assert_eq!(body.kind, ScopeKind::Function);
    assert!(matches!(
        body.declarations.get("a").map(|d| &d.kind),
        Some(DeclarationKind::Parameter(Some(TypeName::Int)))
    ));
    assert!(matches!(
        program.root().declarations.get("add").map(|d| &d.kind),
        Some(DeclarationKind::Function { arity: 3, .. })
    ));
}

#[test]
fn test_return_type_requires_value_return() {
    let err = parse("FUNCTION f() [INT] { PRINT 1 }").unwrap_err();
    assert_eq!(err.error_type(), ErrorType::StructuralRule);
    assert!(parse("FUNCTION f() [INT] { PRINT 1 RETURN 1 }").is_ok());
}

#[test]
fn test_return_inside_nested_block_counts() {
    assert!(parse("FUNCTION f(n) [INT] { IF n > 0 { RETURN n } RETURN 0 }").is_ok());
    assert!(parse("FUNCTION f(n) [INT] { LOOP n { RETURN 1 } }").is_ok());
}

#[test]
fn test_return_in_nested_function_does_not_count() {
    let err = parse("FUNCTION outer() [INT] { FUNCTION inner() [INT] { RETURN 1 } }").unwrap_err();
    assert_eq!(err.error_type(), ErrorType::StructuralRule);
}

#[test]
fn test_recursive_call_resolves_function_name() {
    let program = parse("FUNCTION fact(n) [INT] { RETURN n * fact(n - 1) }").unwrap();
    let Stmt::FunctionDeclaration(f) = &program.root().statements[0] else {
        panic!("expected a function");
    };
    assert!(program.resolve(f.body, "fact").is_some());
    assert!(program.resolve(f.body, "n").is_some());
    assert!(program.resolve(program.root_id(), "n").is_none());
}

#[rstest]
#[case("RETURN")]
#[case("FUNCTION f() { RETURN }")]
#[case("LOOP 2 { RETURN }")]
fn test_void_return_is_allowed_anywhere(#[case] source: &str) {
    assert!(parse(source).is_ok());
}

#[test]
fn test_value_return_outside_function() {
    assert_eq!(error_type("RETURN 5"), ErrorType::StructuralRule);
}

// ---
// Control flow
// ---

#[test]
fn test_conditional_chain() {
    let program = parse("IF a < 1 { PRINT 1 } ELSE IF a < 2 { PRINT 2 } ELSE { PRINT 3 }").unwrap();
    let Stmt::Conditional(c) = &program.root().statements[0] else {
        panic!("expected a conditional");
    };
    assert_eq!(c.branches.len(), 2);
    assert!(c.otherwise.is_some());
    assert!(matches!(
        c.branches[1].condition,
        Condition::Compare { op: CompareOp::Lt, .. }
    ));
}

#[test]
fn test_lowercase_if_is_a_call() {
    let statements = root_statements("if(ready)");
    assert_eq!(
        statements,
        vec![Stmt::FunctionCall {
            name: "if".into(),
            args: vec![Expr::ident("ready")],
        }]
    );
    assert!(matches!(root_statements("IF ready { }")[0], Stmt::Conditional(_)));
}

#[rstest]
#[case("LOOP 5 { }", "i")]
#[case("LOOP 1 TO 10 { }", "i")]
#[case("LOOP IN items { }", "i")]
#[case("LOOP WHILE x < 3 { }", "i")]
#[case("LOOP 1 TO 10 AS step { }", "step")]
fn test_loop_variable(#[case] source: &str, #[case] variable: &str) {
    let program = parse(source).unwrap();
    let Stmt::Loop(looping) = &program.root().statements[0] else {
        panic!("expected a loop");
    };
    assert_eq!(looping.variable, variable);
    let body = program.scope(looping.body).unwrap();
    assert!(matches!(
        body.declarations.get(variable).map(|d| &d.kind),
        Some(DeclarationKind::LoopVariable)
    ));
}

#[test]
fn test_nested_loops_get_successive_names() {
    let program = parse("LOOP 2 { LOOP 3 { PRINT i + j } }").unwrap();
    let Stmt::Loop(outer) = &program.root().statements[0] else {
        panic!("expected a loop");
    };
    let Stmt::Loop(inner) = &program.scope(outer.body).unwrap().statements[0] else {
        panic!("expected a nested loop");
    };
    assert_eq!(inner.variable, "j");
}

#[test]
fn test_loop_kinds() {
    let statements = root_statements("LOOP 1 TO n { } LOOP IN items { } LOOP count { }");
    assert!(matches!(&statements[0], Stmt::Loop(l) if matches!(l.kind, LoopKind::Range { .. })));
    assert!(matches!(&statements[1], Stmt::Loop(l) if matches!(l.kind, LoopKind::Each(_))));
    assert!(matches!(&statements[2], Stmt::Loop(l) if matches!(l.kind, LoopKind::Count(_))));
}

#[rstest]
#[case("BREAK")]
#[case("CONTINUE")]
#[case("IF x { BREAK }")]
fn test_break_and_continue_need_a_loop(#[case] source: &str) {
    assert_eq!(error_type(source), ErrorType::StructuralRule);
}

#[test]
fn test_break_inside_loop() {
    assert!(parse("LOOP 3 { IF i == 1 { CONTINUE } BREAK }").is_ok());
}

#[test]
fn test_depth_limit() {
    let registry = standard_registry().unwrap();
    let options = ParserOptions {
        max_depth: 2,
        ..ParserOptions::default()
    };
    let parser = Parser::with_options(&registry, options);
    assert!(parser.parse(&lex("IF a { IF b { } }")).is_ok());
    let err = parser.parse(&lex("IF a { IF b { IF c { } } }")).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::StructuralRule);
}

#[rstest]
#[case::parentheses(format!("PRINT {}1{}", "(".repeat(20_000), ")".repeat(20_000)))]
#[case::negation(format!("PRINT {}1", "-".repeat(20_000)))]
#[case::conditions(format!("IF {}a {{ }}", "NOT ".repeat(20_000)))]
#[case::grouped_conditions(format!("IF {}a{} {{ }}", "(".repeat(20_000), ")".repeat(20_000)))]
fn test_deep_expression_nesting_is_an_error(#[case] source: String) {
    assert_eq!(error_type(&source), ErrorType::StructuralRule);
}

#[test]
fn test_expression_depth_follows_options() {
    let registry = standard_registry().unwrap();
    let options = ParserOptions {
        max_depth: 3,
        ..ParserOptions::default()
    };
    let parser = Parser::with_options(&registry, options);
    assert!(parser.parse(&lex("PRINT (1)")).is_ok());
    let err = parser.parse(&lex("PRINT (((1)))")).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::StructuralRule);
}

// ---
// Imports and host calls
// ---

#[test]
fn test_imports_are_announced_to_the_linker() {
    let registry = standard_registry().unwrap();
    let mut linker = RecordingLinker::default();
    let source = "IMPORT System.Console IMPORT \"utils.ql\" @Console::WriteLine(\"hi\")";
    let program = Parser::new(&registry)
        .parse_with_linker(&lex(source), &mut linker)
        .unwrap();

    assert_eq!(linker.namespaces, vec!["System.Console".to_string()]);
    let statements = &program.root().statements;
    assert_eq!(
        statements[0],
        Stmt::Import(ImportTarget::Namespace("System.Console".into()))
    );
    assert_eq!(statements[1], Stmt::Import(ImportTarget::File("utils.ql".into())));
    assert!(matches!(statements[2], Stmt::HostCall(_)));
}

#[rstest]
#[case("PRINT 1 IMPORT System")]
#[case("IF x { IMPORT System }")]
fn test_misplaced_import(#[case] source: &str) {
    assert_eq!(error_type(source), ErrorType::StructuralRule);
}

#[test]
fn test_host_member_requires_prefix() {
    assert_eq!(error_type("Console::WriteLine(1)"), ErrorType::UnexpectedToken);
}

// ---
// Expressions as statements
// ---

#[test]
fn test_method_call_statement() {
    let statements = root_statements("items.push(4)");
    assert!(matches!(&statements[0], Stmt::Expression(Expr::Call { .. })));
}

#[test]
fn test_print_object_literal() {
    let statements = root_statements("PRINT { name = \"ada\", age = 36 }");
    let Stmt::Print(Expr::Object(fields)) = &statements[0] else {
        panic!("expected an object literal");
    };
    assert_eq!(fields.len(), 2);
}

#[rstest]
#[case("VAR = 1")]
#[case("PRINT")]
#[case("FUNCTION (a) { }")]
#[case("IF x { PRINT 1")]
#[case("}")]
fn test_malformed_statements(#[case] source: &str) {
    assert_eq!(error_type(source), ErrorType::UnexpectedToken);
}

#[test]
fn test_parsing_is_idempotent() {
    let source = "VAR xs = [3, 1, 2] SORT xs FUNCTION f(a) [INT] { RETURN a } PRINT f(1)";
    let first = parse(source).unwrap();
    let second = parse(source).unwrap();
    assert_eq!(first, second);
}
