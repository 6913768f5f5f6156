use thiserror::Error;
use tracing::{instrument, trace};

use crate::config::RuntimeConfig;

use super::spec::{decode_at, ArithOp, BytecodeError, Instruction, Opcode, Program};
use super::types::IntKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error(transparent)]
    Decode(#[from] BytecodeError),
    #[error("runtime stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },
    #[error("program finished with {depth} values on the stack, expected exactly one")]
    UnbalancedStack { depth: usize },
    #[error("runtime stack exceeded {limit} slots")]
    StackOverflow { limit: usize },
    #[error("division by zero at offset {offset}")]
    DivisionByZero { offset: usize },
}

pub type ExecResult<T> = Result<T, ExecError>;

/// Virtual machine executing a Kestrel instruction stream.
///
/// Every stack slot holds a word in canonical form: truncated to its kind's width and
/// sign- or zero-extended back to 64 bits.
pub struct Vm {
    program: Program,
    max_stack_depth: usize,
    stack: Vec<u64>,
    pc: usize,
}

impl Vm {
    pub fn new(program: Program) -> Self {
        Self::with_config(program, &RuntimeConfig::default())
    }

    pub fn with_config(program: Program, config: &RuntimeConfig) -> Self {
        Self {
            program,
            max_stack_depth: config.max_stack_depth,
            stack: Vec::new(),
            pc: 0,
        }
    }

    /// Runs the stream to its end and returns the single remaining slot.
    #[instrument(skip_all, fields(bytes = self.program.len()))]
    pub fn run(mut self) -> ExecResult<i64> {
        while let Some(instruction) = decode_at(self.program.as_bytes(), self.pc).transpose()? {
            self.step(instruction)?;
        }
        match self.stack.as_slice() {
            [word] => Ok(*word as i64),
            [] => Err(ExecError::StackUnderflow { offset: self.pc }),
            values => Err(ExecError::UnbalancedStack {
                depth: values.len(),
            }),
        }
    }

    fn step(&mut self, instruction: Instruction) -> ExecResult<()> {
        let offset = instruction.offset;
        trace!(offset, opcode = instruction.opcode.name(), "step");
        match instruction.opcode {
            Opcode::Nop | Opcode::Return => {}
            opcode if opcode.is_push() => {
                if let Some(word) = instruction.pushed_word() {
                    self.push(word)?;
                }
            }
            opcode => {
                let (Some(op), Some(kind)) = (opcode.arith_op(), opcode.kind()) else {
                    unreachable!("decoded opcode is nop, push, arithmetic, or return");
                };
                let rhs = self.pop(offset)?;
                let lhs = self.pop(offset)?;
                let value = apply_arithmetic(op, kind, lhs, rhs)
                    .ok_or(ExecError::DivisionByZero { offset })?;
                self.push(value)?;
            }
        }
        self.pc = instruction.next_offset();
        Ok(())
    }

    fn push(&mut self, word: u64) -> ExecResult<()> {
        if self.stack.len() >= self.max_stack_depth {
            return Err(ExecError::StackOverflow {
                limit: self.max_stack_depth,
            });
        }
        self.stack.push(word);
        Ok(())
    }

    fn pop(&mut self, offset: usize) -> ExecResult<u64> {
        self.stack.pop().ok_or(ExecError::StackUnderflow { offset })
    }
}

macro_rules! wrapping_arith {
    ($op:expr, $lhs:expr, $rhs:expr, $ty:ty, $ext:ty) => {{
        let lhs = $lhs as $ty;
        let rhs = $rhs as $ty;
        let result = match $op {
            ArithOp::Add => lhs.wrapping_add(rhs),
            ArithOp::Sub => lhs.wrapping_sub(rhs),
            ArithOp::Mul => lhs.wrapping_mul(rhs),
            ArithOp::Div => {
                if rhs == 0 {
                    return None;
                }
                lhs.wrapping_div(rhs)
            }
        };
        Some(result as $ext as u64)
    }};
}

/// Applies `op` at `kind`, returning the canonical result or `None` on division by zero.
fn apply_arithmetic(op: ArithOp, kind: IntKind, lhs: u64, rhs: u64) -> Option<u64> {
    match kind {
        IntKind::I8 => wrapping_arith!(op, lhs, rhs, i8, i64),
        IntKind::U8 => wrapping_arith!(op, lhs, rhs, u8, u64),
        IntKind::I16 => wrapping_arith!(op, lhs, rhs, i16, i64),
        IntKind::U16 => wrapping_arith!(op, lhs, rhs, u16, u64),
        IntKind::I32 => wrapping_arith!(op, lhs, rhs, i32, i64),
        IntKind::U32 => wrapping_arith!(op, lhs, rhs, u32, u64),
        IntKind::I64 => wrapping_arith!(op, lhs, rhs, i64, i64),
        IntKind::U64 => wrapping_arith!(op, lhs, rhs, u64, u64),
    }
}
