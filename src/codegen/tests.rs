use super::*;
use crate::{
    ir::{Constant, RelOp},
    lex::Lexer,
    parse,
    semantic::Symbol,
    source,
    types::Type,
};

use std::rc::Rc;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn listing(text: &str) -> String {
    init();

    let (start, stream) = source::consume(text.as_bytes(), "<test>");
    let unit = parse::parse(Lexer::new(start.clone(), stream), start).unwrap();

    let mut emitter = Emitter::new(Vec::new());
    unit.gen(&mut emitter);

    let mut output = Vec::new();
    write(emitter.sink(), &mut output).unwrap();
    String::from_utf8(output).unwrap()
}

fn var(name: &str, typ: Type, offset: u32) -> Expr {
    Expr::Id(Rc::new(Symbol::new(name.into(), typ, offset)))
}

fn shown(emitter: &Emitter<Vec<Instruction>>) -> Vec<String> {
    emitter.sink().iter().map(ToString::to_string).collect()
}

#[test]
fn jump_shapes() {
    let mut emitter = Emitter::new(Vec::new());
    let (yes, no) = (emitter.new_label(), emitter.new_label());
    let test = || Test::Truth(Operand::Temp(1));

    emitter.emit_jumps(test(), Target::Label(yes), Target::Label(no));
    emitter.emit_jumps(test(), Target::Label(yes), Target::Fall);
    emitter.emit_jumps(test(), Target::Fall, Target::Label(no));
    emitter.emit_jumps(test(), Target::Fall, Target::Fall);

    assert_eq!(
        shown(&emitter),
        [
            "if t1 goto L1",
            "goto L2",
            "if t1 goto L1",
            "iffalse t1 goto L2",
        ]
    );
}

#[test]
fn counters_are_monotonic() {
    let mut emitter = Emitter::new(Vec::new());
    assert_eq!(emitter.new_label(), Label(1));
    assert_eq!(emitter.new_temp(), Operand::Temp(1));
    assert_eq!(emitter.new_label(), Label(2));
    assert_eq!(emitter.new_temp(), Operand::Temp(2));

    assert_eq!((emitter.labels(), emitter.temps(), emitter.emitted()), (2, 2, 0));
}

#[test]
fn constant_conditions_jump_unconditionally() {
    let mut emitter = Emitter::new(Vec::new());
    let label = emitter.new_label();

    let yes = Expr::Constant(Constant::Bool(true));
    let no = Expr::Constant(Constant::Bool(false));

    yes.jumping(&mut emitter, Target::Fall, Target::Label(label));
    no.jumping(&mut emitter, Target::Label(label), Target::Fall);
    no.jumping(&mut emitter, Target::Fall, Target::Label(label));

    assert_eq!(shown(&emitter), ["goto L1"]);
}

#[test]
fn not_swaps_targets() {
    let mut emitter = Emitter::new(Vec::new());
    let label = emitter.new_label();

    let lhs = var("a", Type::INT, 0);
    let rhs = var("b", Type::INT, 4);
    let condition = Expr::not(Expr::rel(RelOp::Less, lhs, rhs).unwrap()).unwrap();
    condition.jumping(&mut emitter, Target::Fall, Target::Label(label));

    assert_eq!(shown(&emitter), ["if a < b goto L1"]);
}

#[test]
fn and_falls_through_with_fresh_label() {
    let mut emitter = Emitter::new(Vec::new());
    let label = emitter.new_label();

    let p = var("p", Type::BOOL, 0);
    let q = var("q", Type::BOOL, 1);
    Expr::and(p, q)
        .unwrap()
        .jumping(&mut emitter, Target::Label(label), Target::Fall);

    assert_eq!(
        shown(&emitter),
        ["iffalse p goto L2", "if q goto L1", "L2:"]
    );
}

#[test]
fn logical_operands_must_be_bool() {
    let p = var("p", Type::BOOL, 0);
    let x = var("x", Type::INT, 1);

    assert!(Expr::or(p, x).is_err());
}

#[test]
fn while_loop() {
    let text = "{ int i; i = 0; while (i < 10) i = i + 1; }";
    assert_eq!(
        listing(text),
        "L1:\ti = 0\n\
         L3:\tiffalse i < 10 goto L2\n\
         L4:\ti = i + 1\n\
         \tgoto L3\n\
         L2:\n"
    );
}

#[test]
fn if_else() {
    let text = "{ int x; bool b; if (b) x = 1; else x = 2; }";
    assert_eq!(
        listing(text),
        "L1:\tiffalse b goto L4\n\
         L3:\tx = 1\n\
         \tgoto L2\n\
         L4:\tx = 2\n\
         L2:\n"
    );
}

#[test]
fn do_while_with_break() {
    let text = "{ int i; do { i = i + 1; if (i > 5) break; } while (i < 10); }";
    assert_eq!(
        listing(text),
        "L1:\ti = i + 1\n\
         L4:\tiffalse i > 5 goto L3\n\
         L5:\tgoto L2\n\
         L3:\tif i < 10 goto L1\n\
         L2:\n"
    );
}

#[test]
fn break_leaves_innermost_loop() {
    let text = "{ int i; while (true) { while (true) break; break; } }";
    assert_eq!(
        listing(text),
        "L1:L3:L5:\tgoto L4\n\
         \tgoto L3\n\
         L4:\tgoto L2\n\
         \tgoto L1\n\
         L2:\n"
    );
}

#[test]
fn and_reuses_false_label() {
    let text = "{ int a; int b; bool c; if (a < b && b < 10) c = true; }";
    assert_eq!(
        listing(text),
        "L1:\tiffalse a < b goto L2\n\
         \tiffalse b < 10 goto L2\n\
         L3:\tc = true\n\
         L2:\n"
    );
}

#[test]
fn or_short_circuits_to_body() {
    let text = "{ int a; int b; bool c; if (a < b || b < 10) c = true; }";
    assert_eq!(
        listing(text),
        "L1:\tif a < b goto L4\n\
         \tiffalse b < 10 goto L2\n\
         L4:L3:\tc = true\n\
         L2:\n"
    );
}

#[test]
fn not_in_condition() {
    let text = "{ int a; int b; bool c; if (!(a < b)) c = false; }";
    assert_eq!(
        listing(text),
        "L1:\tif a < b goto L2\n\
         L3:\tc = false\n\
         L2:\n"
    );
}

#[test]
fn boolean_value_is_materialized() {
    let text = "{ int a; int b; bool c; c = a < b; }";
    assert_eq!(
        listing(text),
        "L1:\tiffalse a < b goto L3\n\
         \tt1 = true\n\
         \tgoto L4\n\
         L3:\tt1 = false\n\
         L4:\tc = t1\n\
         L2:\n"
    );
}

#[test]
fn sequence_threads_labels() {
    let text = "{ int x; x = 1; x = 2; x = 3; }";
    assert_eq!(
        listing(text),
        "L1:\tx = 1\n\
         L3:\tx = 2\n\
         L4:\tx = 3\n\
         L2:\n"
    );
}

#[test]
fn empty_program() {
    assert_eq!(listing("{ }"), "L1:L2:\n");
    assert_eq!(listing("{ int x; ; { } }"), "L1:L2:\n");
}

#[test]
fn assignment_without_temporaries() {
    let text = "{ int x; int y; x = x + 1; y = -x; }";
    assert_eq!(
        listing(text),
        "L1:\tx = x + 1\n\
         L3:\ty = minus x\n\
         L2:\n"
    );
}

#[test]
fn nested_arithmetic_uses_temporaries() {
    let text = "{ int x; int y; x = (x + y) * (x - y); }";
    assert_eq!(
        listing(text),
        "L1:\tt1 = x + y\n\
         \tt2 = x - y\n\
         \tx = t1 * t2\n\
         L2:\n"
    );
}

#[test]
fn array_element_access() {
    let text = "{ int[3][4] a; int i; int j; a[i][j] = a[j][i] + 1; }";
    assert_eq!(
        listing(text),
        "L1:\tt1 = i * 16\n\
         \tt2 = j * 4\n\
         \tt3 = t1 + t2\n\
         \tt4 = j * 16\n\
         \tt5 = i * 4\n\
         \tt6 = t4 + t5\n\
         \tt7 = a [ t6 ]\n\
         \tt8 = t7 + 1\n\
         \ta [ t3 ] = t8\n\
         L2:\n"
    );
}

#[test]
fn array_read_into_scalar() {
    let text = "{ float b[5]; float x; x = b[2]; }";
    assert_eq!(
        listing(text),
        "L1:\tt1 = 2 * 8\n\
         \tx = b [ t1 ]\n\
         L2:\n"
    );
}

#[test]
fn real_constants_keep_their_point() {
    let text = "{ float x; x = 2.5; x = 3.0; }";
    assert_eq!(
        listing(text),
        "L1:\tx = 2.5\n\
         L3:\tx = 3.0\n\
         L2:\n"
    );
}

#[test]
fn long_blocks_are_threaded_iteratively() {
    const STATEMENTS: usize = 100_000;

    let mut text = String::from("{ int x; ");
    for value in 0..STATEMENTS {
        text.push_str(&format!("x = {}; ", value % 10));
    }
    text.push('}');

    let (start, stream) = source::consume(text.as_bytes(), "<test>");
    let unit = parse::parse(Lexer::new(start.clone(), stream), start).unwrap();

    let mut emitter = Emitter::new(Vec::new());
    unit.gen(&mut emitter);

    // Inicio, fin y una etiqueta intermedia por cada par de sentencias
    assert_eq!(emitter.labels() as usize, STATEMENTS + 1);
    assert_eq!(emitter.emitted(), 2 * STATEMENTS + 1);
    assert_eq!(emitter.sink().last(), Some(&Instruction::SetLabel(Label(2))));
}

#[test]
fn empty_statements_take_no_label() {
    let text = "{ int x; ; x = 1; ; { ; } x = 2; ; }";
    assert_eq!(
        listing(text),
        "L1:\tx = 1\n\
         L3:\tx = 2\n\
         L2:\n"
    );
}
