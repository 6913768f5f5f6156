use kestrel_core::bytecode::{Ast, Literal, Node, Operator};
use kestrel_core::KestrelRuntime;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ast = Ast::from_expr(Node::binary(
        Operator::Mul,
        Node::literal(Literal::U8(6)),
        Node::literal(Literal::I32(7)),
    ));
    let runtime = KestrelRuntime::new();
    let program = runtime.compile(&ast)?;
    print!("{}", program.disassemble()?);
    let value = runtime.execute(program)?;
    println!("result: {value} ({})", value.type_name());
    Ok(())
}
