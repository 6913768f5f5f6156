#![forbid(unsafe_code)]

//! KestrelCore – the back half of a small-language toolchain.
//!
//! The crate exposes the building blocks needed to take a typed syntax tree all the way to
//! a result value:
//!
//! * [`bytecode`] – the syntax tree handed over by the parser, the integer promotion rule,
//!   the width-typed instruction set, the compiler lowering a tree into that instruction
//!   stream, and the stack virtual machine executing it.
//! * [`KestrelRuntime`] – a small facade wiring compiler and virtual machine together under
//!   a [`RuntimeConfig`].
//!
//! Compilation and execution are single-threaded and perform no I/O. The instruction set
//! has no branches, so every run terminates in time linear in the stream length.

pub mod bytecode;
pub mod config;

use std::fmt;

use thiserror::Error;
use tracing::{instrument, warn};

use crate::bytecode::{BytecodeError, CompileError, ExecError, IntKind, Program, Vm};

pub use crate::config::RuntimeConfig;

/// Result type used across KestrelCore.
pub type KestrelResult<T> = std::result::Result<T, KestrelError>;

/// Value produced by a program, typed by the kind of its returned expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
}

impl Value {
    /// Reads a canonical stack word as a value of `kind`.
    pub fn from_word(kind: IntKind, word: u64) -> Self {
        match kind {
            IntKind::I8 => Value::I8(word as i8),
            IntKind::U8 => Value::U8(word as u8),
            IntKind::I16 => Value::I16(word as i16),
            IntKind::U16 => Value::U16(word as u16),
            IntKind::I32 => Value::I32(word as i32),
            IntKind::U32 => Value::U32(word as u32),
            IntKind::I64 => Value::I64(word as i64),
            IntKind::U64 => Value::U64(word),
        }
    }

    pub fn kind(&self) -> IntKind {
        match self {
            Value::I8(_) => IntKind::I8,
            Value::U8(_) => IntKind::U8,
            Value::I16(_) => IntKind::I16,
            Value::U16(_) => IntKind::U16,
            Value::I32(_) => IntKind::I32,
            Value::U32(_) => IntKind::U32,
            Value::I64(_) => IntKind::I64,
            Value::U64(_) => IntKind::U64,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Canonical 64-bit word, as it sits on the value stack.
    pub fn to_word(&self) -> u64 {
        match *self {
            Value::I8(v) => v as i64 as u64,
            Value::U8(v) => u64::from(v),
            Value::I16(v) => v as i64 as u64,
            Value::U16(v) => u64::from(v),
            Value::I32(v) => v as i64 as u64,
            Value::U32(v) => u64::from(v),
            Value::I64(v) => v as u64,
            Value::U64(v) => v,
        }
    }

    /// The word reinterpreted as a signed 64-bit integer.
    pub fn as_i64(&self) -> i64 {
        self.to_word() as i64
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I8(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KestrelError {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),
    #[error("runtime error: {0}")]
    Exec(#[from] ExecError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// KestrelRuntime compiles syntax trees and runs the resulting programs.
#[derive(Debug, Clone, Default)]
pub struct KestrelRuntime {
    config: RuntimeConfig,
}

impl KestrelRuntime {
    /// Creates a new runtime with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RuntimeConfig) -> KestrelResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Overrides the value-stack limit used by the virtual machine.
    pub fn with_max_stack_depth(mut self, max_stack_depth: usize) -> KestrelResult<Self> {
        if max_stack_depth == 0 {
            return Err(KestrelError::InvalidConfig(
                "max_stack_depth must be greater than zero".into(),
            ));
        }
        self.config.max_stack_depth = max_stack_depth;
        Ok(self)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn compile(&self, ast: &bytecode::Ast) -> KestrelResult<Program> {
        Ok(bytecode::compile(ast)?)
    }

    /// Executes a compiled program and types the result by its returned kind.
    ///
    /// Programs without a known result kind are read as `i64`.
    #[instrument(skip_all, fields(bytes = program.len()))]
    pub fn execute(&self, program: Program) -> KestrelResult<Value> {
        if self.config.verify_programs {
            program.validate()?;
        }
        let kind = program.result_kind().unwrap_or(IntKind::I64);
        let word = Vm::with_config(program, &self.config)
            .run()
            .inspect_err(|err| warn!(%err, "execution failed"))?;
        Ok(Value::from_word(kind, word as u64))
    }

    /// Executes a raw instruction stream and returns the widened result.
    pub fn execute_bytes(&self, bytes: &[u8]) -> KestrelResult<i64> {
        self.execute(Program::from_bytes(bytes)).map(|value| value.as_i64())
    }

    /// Compiles and executes `ast` in one go.
    pub fn evaluate(&self, ast: &bytecode::Ast) -> KestrelResult<Value> {
        let program = self.compile(ast)?;
        self.execute(program)
    }
}
