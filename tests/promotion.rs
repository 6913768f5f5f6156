use kestrel_core::bytecode::{
    compile, promote, ArithOp, Ast, IntKind, Literal, Node, Opcode, Operator,
};

fn one_of(kind: IntKind) -> Literal {
    match kind {
        IntKind::I8 => Literal::I8(1),
        IntKind::U8 => Literal::U8(1),
        IntKind::I16 => Literal::I16(1),
        IntKind::U16 => Literal::U16(1),
        IntKind::I32 => Literal::I32(1),
        IntKind::U32 => Literal::U32(1),
        IntKind::I64 => Literal::I64(1),
        IntKind::U64 => Literal::U64(1),
    }
}

fn arithmetic_opcode(ast: &Ast) -> Opcode {
    let program = compile(ast).expect("compile");
    program
        .instructions()
        .map(|instruction| instruction.expect("decode").opcode)
        .find(|opcode| opcode.arith_op().is_some())
        .expect("arithmetic opcode emitted")
}

#[test]
fn emitted_opcode_matches_promotion_for_every_pair() {
    let operators = [
        (Operator::Add, ArithOp::Add),
        (Operator::Sub, ArithOp::Sub),
        (Operator::Mul, ArithOp::Mul),
        (Operator::Div, ArithOp::Div),
    ];
    for lhs in IntKind::ALL {
        for rhs in IntKind::ALL {
            for (operator, arith) in operators {
                let ast = Ast::from_expr(Node::binary(
                    operator,
                    Node::literal(one_of(lhs)),
                    Node::literal(one_of(rhs)),
                ));
                let opcode = arithmetic_opcode(&ast);
                assert_eq!(
                    opcode,
                    Opcode::arithmetic(arith, promote(lhs, rhs)),
                    "{lhs} {operator} {rhs}"
                );
            }
        }
    }
}

#[test]
fn documented_promotions() {
    assert_eq!(promote(IntKind::U8, IntKind::I32), IntKind::I32);
    assert_eq!(promote(IntKind::I32, IntKind::U64), IntKind::U64);
    assert_eq!(promote(IntKind::I64, IntKind::U32), IntKind::I64);
    assert_eq!(promote(IntKind::U32, IntKind::I32), IntKind::I32);
}

#[test]
fn promotion_is_associative() {
    for a in IntKind::ALL {
        for b in IntKind::ALL {
            for c in IntKind::ALL {
                assert_eq!(promote(promote(a, b), c), promote(a, promote(b, c)));
            }
        }
    }
}

#[test]
fn three_term_expression_resolves_after_last_literal() {
    let ast = Ast::from_expr(Node::binary(
        Operator::Sub,
        Node::binary(
            Operator::Sub,
            Node::literal(Literal::U16(9)),
            Node::literal(Literal::U16(4)),
        ),
        Node::literal(Literal::I32(2)),
    ));
    let program = compile(&ast).expect("compile");
    let arithmetic: Vec<_> = program
        .instructions()
        .map(|instruction| instruction.expect("decode").opcode)
        .filter(|opcode| opcode.arith_op().is_some())
        .collect();
    assert_eq!(arithmetic, vec![Opcode::SubU16, Opcode::SubI32]);
    assert_eq!(program.result_kind(), Some(IntKind::I32));
}
