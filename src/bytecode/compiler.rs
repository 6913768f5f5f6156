use thiserror::Error;
use tracing::{debug, instrument};

use super::{
    ast::{Ast, Literal, Node, Operator},
    spec::{ArithOp, Opcode, Program},
    types::{promote, IntKind, ScalarKind},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("unexpected operator `{0}`")]
    UnexpectedOperator(Operator),
    #[error("unsupported node kind: {0}")]
    UnsupportedNode(&'static str),
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
    #[error("scalar kind {0} has no bytecode representation")]
    UnsupportedScalar(ScalarKind),
    #[error("code follows the program's return")]
    CodeAfterReturn,
    #[error("program has no return statement")]
    MissingReturn,
}

/// Public entry point used by consumers.
#[instrument(skip_all, fields(statements = ast.statements.len()))]
pub fn compile(ast: &Ast) -> Result<Program, CompileError> {
    let mut compiler = Compiler::new();
    compiler.compile_block(&ast.statements)?;
    let program = compiler.finish()?;
    debug!(bytes = program.len(), "compiled program");
    Ok(program)
}

/// Single-pass lowering of a syntax tree into an instruction stream.
///
/// The first error aborts the walk; nothing after the failing node is visited. Exactly one
/// `return` may be lowered, and it ends the stream.
#[derive(Debug, Default)]
pub struct Compiler {
    code: Vec<u8>,
    result_kind: Option<IntKind>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Result<Program, CompileError> {
        if self.result_kind.is_none() {
            return Err(CompileError::MissingReturn);
        }
        Ok(Program::new(self.code, self.result_kind))
    }

    pub fn compile_block(&mut self, statements: &[Node]) -> Result<(), CompileError> {
        for stmt in statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn compile_stmt(&mut self, stmt: &Node) -> Result<(), CompileError> {
        match stmt {
            Node::Compound { statements } => self.compile_block(statements),
            Node::VariableDeclaration { name, .. } => {
                debug!(%name, "variable declaration has no storage; skipped");
                Ok(())
            }
            Node::FunctionDeclaration { name, body, .. } => {
                debug!(%name, "lowering function body in place");
                self.compile_block(body)
            }
            Node::Return { value } => {
                if self.result_kind.is_some() {
                    return Err(CompileError::CodeAfterReturn);
                }
                let kind = self.compile_expr(value)?;
                self.emit(Opcode::Return);
                self.result_kind = Some(kind);
                Ok(())
            }
            // the value would be left behind on the stack
            Node::Literal { .. } | Node::Unary { .. } | Node::Binary { .. } => {
                Err(CompileError::UnsupportedNode("expression statement"))
            }
        }
    }

    /// Lowers an expression and returns the kind its value is resolved to.
    pub fn compile_expr(&mut self, expr: &Node) -> Result<IntKind, CompileError> {
        match expr {
            Node::Literal { value } => self.compile_literal(value),
            Node::Binary { left, op, right } => {
                let lhs = self.compile_expr(left)?;
                let rhs = self.compile_expr(right)?;
                let kind = promote(lhs, rhs);
                let arith = arith_op(*op)?;
                debug!(op = %op, %lhs, %rhs, %kind, "resolved binary operation");
                self.emit(Opcode::arithmetic(arith, kind));
                Ok(kind)
            }
            Node::Unary { .. } => Err(CompileError::NotImplemented("unary operation")),
            other => Err(CompileError::UnsupportedNode(other.kind_name())),
        }
    }

    fn compile_literal(&mut self, literal: &Literal) -> Result<IntKind, CompileError> {
        let scalar = literal.kind();
        let (Some(kind), Some(bits)) = (scalar.integer(), literal.bits()) else {
            return Err(CompileError::UnsupportedScalar(scalar));
        };
        self.emit(Opcode::push(kind));
        self.emit_immediate(kind, bits);
        Ok(kind)
    }

    fn emit(&mut self, opcode: Opcode) {
        self.code.push(opcode as u8);
    }

    fn emit_immediate(&mut self, kind: IntKind, bits: u64) {
        let width = kind.width().bytes();
        let bytes = kind.truncate(bits).to_be_bytes();
        self.code.extend_from_slice(&bytes[bytes.len() - width..]);
    }
}

fn arith_op(op: Operator) -> Result<ArithOp, CompileError> {
    match op {
        Operator::Add => Ok(ArithOp::Add),
        Operator::Sub => Ok(ArithOp::Sub),
        Operator::Mul => Ok(ArithOp::Mul),
        Operator::Div => Ok(ArithOp::Div),
        other => Err(CompileError::UnexpectedOperator(other)),
    }
}
