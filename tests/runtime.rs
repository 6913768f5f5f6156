use kestrel_core::bytecode::{
    compile, Ast, CompileError, ExecError, Literal, Node, Operator, Program, Vm,
};
use kestrel_core::bytecode::spec::BytecodeError;
use kestrel_core::{KestrelError, KestrelRuntime, Value};

fn evaluate(ast: &Ast) -> Value {
    KestrelRuntime::new().evaluate(ast).expect("evaluation succeeds")
}

#[test]
fn every_integer_literal_roundtrips() {
    let cases = [
        (Literal::I8(i8::MIN), Value::I8(i8::MIN)),
        (Literal::I8(-1), Value::I8(-1)),
        (Literal::U8(u8::MAX), Value::U8(u8::MAX)),
        (Literal::I16(i16::MIN), Value::I16(i16::MIN)),
        (Literal::U16(u16::MAX), Value::U16(u16::MAX)),
        (Literal::I32(-123_456), Value::I32(-123_456)),
        (Literal::U32(u32::MAX), Value::U32(u32::MAX)),
        (Literal::I64(i64::MIN), Value::I64(i64::MIN)),
        (Literal::I64(i64::MAX), Value::I64(i64::MAX)),
        (Literal::U64(u64::MAX), Value::U64(u64::MAX)),
        (Literal::U64(0), Value::U64(0)),
    ];
    for (literal, expected) in cases {
        let value = evaluate(&Ast::from_expr(Node::literal(literal)));
        assert_eq!(value, expected, "literal {literal:?}");
    }
}

#[test]
fn raw_machine_result_is_widened_word() {
    let program = compile(&Ast::from_expr(Node::literal(Literal::I8(-5)))).expect("compile");
    assert_eq!(Vm::new(program).run(), Ok(-5));

    let program = compile(&Ast::from_expr(Node::literal(Literal::U16(65_000)))).expect("compile");
    assert_eq!(Vm::new(program).run(), Ok(65_000));
}

#[test]
fn subtraction_evaluates_left_to_right() {
    let ast = Ast::from_expr(Node::binary(Operator::Sub, Node::int(74), Node::int(10)));
    assert_eq!(evaluate(&ast), Value::I64(64));
}

#[test]
fn precedence_shaped_tree_evaluates() {
    // 74 - 10 + 44 * 99 - 346 / 2, shaped as ((74 - 10) + (44 * 99)) - (346 / 2)
    let sum = Node::binary(
        Operator::Add,
        Node::binary(Operator::Sub, Node::int(74), Node::int(10)),
        Node::binary(Operator::Mul, Node::int(44), Node::int(99)),
    );
    let expr = Node::binary(
        Operator::Sub,
        sum,
        Node::binary(Operator::Div, Node::int(346), Node::int(2)),
    );
    assert_eq!(evaluate(&Ast::from_expr(expr)), Value::I64(74 - 10 + 44 * 99 - 346 / 2));
    assert_eq!(74 - 10 + 44 * 99 - 346 / 2, 4247);
}

#[test]
fn empty_body_followed_by_return_zero() {
    let ast = Ast::new(vec![
        Node::function("main", Vec::new(), Vec::new()),
        Node::ret(Node::int(0)),
    ]);
    assert_eq!(evaluate(&ast), Value::I64(0));

    let ast = Ast::main(vec![Node::compound(Vec::new()), Node::ret(Node::int(0))]);
    assert_eq!(evaluate(&ast), Value::I64(0));
}

#[test]
fn variable_declarations_do_not_disturb_the_stack() {
    let ast = Ast::main(vec![
        Node::variable("x", None, Some(Node::int(99))),
        Node::ret(Node::binary(Operator::Mul, Node::int(6), Node::int(7))),
    ]);
    assert_eq!(evaluate(&ast), Value::I64(42));
}

#[test]
fn mixed_width_expression_promotes_through_nesting() {
    // (u8 250 + u8 10) wraps at u8 to 4, then * i32 3 = 12
    let ast = Ast::from_expr(Node::binary(
        Operator::Mul,
        Node::binary(
            Operator::Add,
            Node::literal(Literal::U8(250)),
            Node::literal(Literal::U8(10)),
        ),
        Node::literal(Literal::I32(3)),
    ));
    assert_eq!(evaluate(&ast), Value::I32(12));
}

#[test]
fn signed_narrow_operand_widens_into_unsigned_division() {
    // i8 -1 promoted against u32 reads as u32::MAX
    let ast = Ast::from_expr(Node::binary(
        Operator::Div,
        Node::literal(Literal::I8(-1)),
        Node::literal(Literal::U32(2)),
    ));
    assert_eq!(evaluate(&ast), Value::U32(u32::MAX / 2));
}

#[test]
fn division_by_literal_zero_faults() {
    let ast = Ast::from_expr(Node::binary(Operator::Div, Node::int(1), Node::int(0)));
    let err = KestrelRuntime::new().evaluate(&ast).expect_err("division by zero");
    assert!(matches!(
        err,
        KestrelError::Exec(ExecError::DivisionByZero { .. })
    ));
}

#[test]
fn truncated_push_is_never_zero_padded() {
    let program = Program::from_bytes(vec![0x05, 0x00, 0x2A]);
    let err = Vm::new(program).run().expect_err("truncated operand");
    assert_eq!(
        err,
        ExecError::Decode(BytecodeError::TruncatedOperand {
            offset: 0,
            opcode: "PUSH_I32",
            expected: 4,
            available: 2,
        })
    );
}

#[test]
fn empty_program_is_an_underflow() {
    let err = Vm::new(Program::default()).run().expect_err("nothing pushed");
    assert!(matches!(err, ExecError::StackUnderflow { .. }));
}

#[test]
fn second_return_is_a_compile_error() {
    let ast = Ast::main(vec![Node::ret(Node::int(1)), Node::ret(Node::int(2))]);
    let err = KestrelRuntime::new().evaluate(&ast).expect_err("two returns");
    assert_eq!(err, KestrelError::Compile(CompileError::CodeAfterReturn));
}

#[test]
fn expression_statement_is_a_compile_error() {
    let ast = Ast::main(vec![
        Node::binary(Operator::Add, Node::int(1), Node::int(2)),
        Node::ret(Node::int(5)),
    ]);
    assert_eq!(
        compile(&ast),
        Err(CompileError::UnsupportedNode("expression statement"))
    );
}

#[test]
fn tree_without_return_is_a_compile_error() {
    let ast = Ast::main(vec![Node::variable("x", None, Some(Node::int(1)))]);
    assert_eq!(compile(&ast), Err(CompileError::MissingReturn));
}

#[test]
fn return_inside_the_stream_is_rejected_before_running() {
    let err = KestrelRuntime::new()
        .execute_bytes(&[0x02, 0x01, 0x50, 0x02, 0x02, 0x50])
        .expect_err("return before the end");
    assert_eq!(
        err,
        KestrelError::Bytecode(BytecodeError::CodeAfterReturn { offset: 2 })
    );
}

#[test]
fn unvalidated_stream_with_leftover_values_is_unbalanced() {
    let program = Program::from_bytes(vec![0x02, 0x01, 0x02, 0x02, 0x50]);
    assert_eq!(Vm::new(program).run(), Err(ExecError::UnbalancedStack { depth: 2 }));
}

#[test]
fn compiled_programs_validate_and_disassemble() {
    let ast = Ast::from_expr(Node::binary(
        Operator::Add,
        Node::literal(Literal::I16(-3)),
        Node::literal(Literal::U8(4)),
    ));
    let program = compile(&ast).expect("compile");
    program.validate().expect("well formed");
    let listing = program.disassemble().expect("disassemble");
    assert_eq!(
        listing,
        "0000: PUSH_I16 -3\n0003: PUSH_U8 4\n0005: ADD_I16\n0006: RET\n"
    );
}
