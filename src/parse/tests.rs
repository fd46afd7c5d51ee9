use super::*;
use crate::{lex::Lexer, source};

fn compile(text: &str) -> Result<Unit, Located<CompileError>> {
    let _ = env_logger::builder().is_test(true).try_init();

    let (start, stream) = source::consume(text.as_bytes(), "<test>");
    parse(Lexer::new(start.clone(), stream), start)
}

fn failure(text: &str) -> Located<CompileError> {
    compile(text).unwrap_err()
}

/// Destinos de cada asignación escalar, en orden de aparición.
fn targets(statement: &Stmt) -> Vec<(String, u32, Type)> {
    let mut found = Vec::new();
    walk(statement, &mut |statement| {
        if let Stmt::Set { target, .. } = statement {
            found.push((target.name().to_string(), target.offset(), target.typ().clone()));
        }
    });

    found
}

fn walk<F: FnMut(&Stmt)>(statement: &Stmt, visit: &mut F) {
    visit(statement);
    match statement {
        Stmt::Seq(statements) => {
            for statement in statements {
                walk(statement, visit);
            }
        }

        Stmt::If { body, .. } | Stmt::While { body, .. } | Stmt::Do { body, .. } => {
            walk(body, visit)
        }

        Stmt::Else {
            then, otherwise, ..
        } => {
            walk(then, visit);
            walk(otherwise, visit);
        }

        _ => (),
    }
}

/// Evalúa un desplazamiento formado solo por constantes.
fn eval(expr: &Expr) -> i32 {
    match expr {
        Expr::Constant(Constant::Int(value)) => *value,
        Expr::Arith {
            op: ArithOp::Add,
            lhs,
            rhs,
            ..
        } => eval(lhs) + eval(rhs),
        Expr::Arith {
            op: ArithOp::Mul,
            lhs,
            rhs,
            ..
        } => eval(lhs) * eval(rhs),
        expr => panic!("not a constant offset: {:?}", expr),
    }
}

fn element_store(text: &str) -> Access {
    let unit = compile(text).unwrap();
    let mut found = None;
    walk(unit.body(), &mut |statement| {
        if let Stmt::SetElem { target, .. } = statement {
            found = Some(target.clone());
        }
    });

    found.expect("no element assignment")
}

#[test]
fn inner_declaration_shadows_outer() {
    let unit = compile("{ int x; { float x; x = 1.5; } x = 2; }").unwrap();

    assert_eq!(
        targets(unit.body()),
        [
            (String::from("x"), 4, Type::FLOAT),
            (String::from("x"), 0, Type::INT),
        ]
    );

    assert_eq!(unit.width(), 12);
}

#[test]
fn sibling_block_symbols_are_not_visible() {
    let error = failure("{ { int y; } y = 1; }");

    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::Undeclared(name)) if name.as_ref() == "y"
    ));

    assert_eq!(error.location().to_string(), "<test>:1:14");
}

#[test]
fn offsets_are_assigned_in_declaration_order() {
    let unit = compile("{ char c; int i; float f; bool b; c = 1; i = 2; f = 3; b = true; }").unwrap();
    let offsets: Vec<_> = targets(unit.body())
        .into_iter()
        .map(|(_, offset, _)| offset)
        .collect();

    assert_eq!(offsets, [0, 1, 5, 13]);
    assert_eq!(unit.width(), 14);
}

#[test]
fn array_declarations() {
    assert_eq!(compile("{ int[3][4] a; char c; }").unwrap().width(), 49);
    assert_eq!(compile("{ int a[3][4]; }").unwrap().width(), 48);
    assert_eq!(compile("{ char s[0]; int x; }").unwrap().width(), 4);
}

#[test]
fn dimensions_on_both_sides() {
    let error = failure("{ int[2] a[3]; }");
    assert!(matches!(
        error.val(),
        CompileError::Syntax(ParserError::DuplicateDims(name)) if name.as_ref() == "a"
    ));
}

#[test]
fn oversized_arrays_are_rejected() {
    let error = failure("{ float a[2000000000]; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::ArrayTooLarge { length: 2000000000, .. })
    ));
}

#[test]
fn storage_exhaustion() {
    let error = failure("{ char a[2000000000]; char b[2000000000]; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::TooLarge(name)) if name.as_ref() == "b"
    ));
}

#[test]
fn element_offsets() {
    let access = element_store("{ int[3][4] a; a[1][2] = 7; }");
    assert_eq!(eval(&access.index), 24);
    assert_eq!(access.typ, Type::INT);
    assert_eq!(access.array.name().as_ref(), "a");

    let access = element_store("{ float[2][3][5] m; m[1][2][3] = 0.5; }");
    assert_eq!(eval(&access.index), 120 + 80 + 24);
    assert_eq!(access.typ, Type::FLOAT);
}

#[test]
fn partial_indexing_cannot_be_assigned() {
    let error = failure("{ int[3][4] a; a[1] = 2; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::AssignMismatch { .. })
    ));
}

#[test]
fn indexing_a_scalar() {
    let error = failure("{ int x; int y; y = x[0]; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::NotAnArray(name, Type::Basic(_))) if name.as_ref() == "x"
    ));
}

#[test]
fn breaks_resolve_to_innermost_loop() {
    let unit = compile("{ bool b; while (b) { do { break; } while (b); break; } }").unwrap();

    let mut exits = Vec::new();
    let mut breaks = Vec::new();
    walk(unit.body(), &mut |statement| match statement {
        Stmt::While { exit, .. } | Stmt::Do { exit, .. } => exits.push(exit.clone()),
        Stmt::Break(exit) => breaks.push(exit.clone()),
        _ => (),
    });

    let (outer, inner) = (&exits[0], &exits[1]);
    assert_eq!(breaks.len(), 2);

    assert!(breaks[0].same_loop(inner));
    assert!(breaks[1].same_loop(outer));
    assert!(!outer.same_loop(inner));
}

#[test]
fn break_outside_of_loops() {
    for text in ["{ break; }", "{ bool b; while (b) ; break; }", "{ if (true) break; }"] {
        let error = failure(text);
        assert!(matches!(
            error.val(),
            CompileError::Semantic(SemanticError::BreakOutsideLoop)
        ));
    }
}

#[test]
fn conditions_must_be_bool() {
    let error = failure("{ int x; if (x) x = 1; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::ExpectedBool("if", Type::Basic(_)))
    ));

    let error = failure("{ int x; do x = 1; while (x + 1); }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::ExpectedBool("do", _))
    ));
}

#[test]
fn type_mismatches() {
    let error = failure("{ int x; bool b; x = b; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::AssignMismatch { .. })
    ));

    let error = failure("{ int x; bool b; b = b + x; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::BinaryMismatch { op: "+", .. })
    ));

    let error = failure("{ int x; float y; bool b; b = x < y; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::BinaryMismatch { op: "<", .. })
    ));

    let error = failure("{ int x; bool b; b = !x; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::UnaryMismatch { op: "!", .. })
    ));
}

#[test]
fn numeric_widening() {
    let unit = compile("{ char c; int i; float f; f = c + i; i = c * 2; c = 1; }");
    assert!(unit.is_ok());
}

#[test]
fn redeclaration_in_same_block() {
    let error = failure("{ int x;\n  float x; }");
    assert!(matches!(
        error.val(),
        CompileError::Semantic(SemanticError::Redeclared(name)) if name.as_ref() == "x"
    ));

    assert_eq!(error.location().line(), 2);
}

#[test]
fn syntax_errors_carry_their_line() {
    let error = failure("{\n  int x;\n  x = ;\n}\n");
    assert!(matches!(
        error.val(),
        CompileError::Syntax(ParserError::ExpectedExpr(Token::Semicolon))
    ));

    assert_eq!(error.location().line(), 3);
}

#[test]
fn missing_closing_brace() {
    let error = failure("{ int x; x = 1;");
    assert!(matches!(
        error.val(),
        CompileError::Syntax(ParserError::MissingToken(Token::CloseCurly))
    ));
}

#[test]
fn trailing_input_after_program() {
    let error = failure("{ } x");
    assert!(matches!(
        error.val(),
        CompileError::Syntax(ParserError::TrailingInput(Token::Id(_)))
    ));
}

#[test]
fn empty_input() {
    let error = failure("");
    assert!(matches!(
        error.val(),
        CompileError::Syntax(ParserError::MissingToken(Token::OpenCurly))
    ));

    assert_eq!(error.location().to_string(), "<test>:1:1");
}

#[test]
fn lexical_errors_abort_parsing() {
    let error = failure("{ int x; x = 1 # 2; }");
    assert!(matches!(
        error.val(),
        CompileError::Lexical(LexerError::BadChar('#'))
    ));

    assert_eq!(error.val().kind(), "Lexical error");
}

#[test]
fn declarations_follow_statements_only_in_new_blocks() {
    let error = failure("{ int x; x = 1; int y; }");
    assert!(matches!(
        error.val(),
        CompileError::Syntax(ParserError::ExpectedId(Token::Basic(_)))
    ));

    assert!(compile("{ int x; x = 1; { int y; y = x; } }").is_ok());
}
