pub mod ast;
pub mod compiler;
pub mod spec;
pub mod types;
pub mod vm;

pub use ast::{Ast, Literal, Node, Operator, Parameter};
pub use compiler::{compile, CompileError, Compiler};
pub use spec::{ArithOp, BytecodeError, Instruction, Opcode, Program};
pub use types::{promote, IntKind, ScalarKind, Width};
pub use vm::{ExecError, Vm};
