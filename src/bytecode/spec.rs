//! Definition of the Kestrel instruction stream.
//!
//! A program is a flat byte buffer of `(opcode, immediate)` records. Opcodes are one byte:
//! the high nibble selects the family, the low nibble the [`IntKind`]. Push immediates are
//! stored big-endian and are exactly as wide as the pushed kind.

use std::convert::TryFrom;

use thiserror::Error;

use super::types::IntKind;

/// Opcodes understood by the Kestrel virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    PushI8 = 0x01,
    PushU8 = 0x02,
    PushI16 = 0x03,
    PushU16 = 0x04,
    PushI32 = 0x05,
    PushU32 = 0x06,
    PushI64 = 0x07,
    PushU64 = 0x08,
    AddI8 = 0x10,
    AddU8 = 0x11,
    AddI16 = 0x12,
    AddU16 = 0x13,
    AddI32 = 0x14,
    AddU32 = 0x15,
    AddI64 = 0x16,
    AddU64 = 0x17,
    SubI8 = 0x20,
    SubU8 = 0x21,
    SubI16 = 0x22,
    SubU16 = 0x23,
    SubI32 = 0x24,
    SubU32 = 0x25,
    SubI64 = 0x26,
    SubU64 = 0x27,
    MulI8 = 0x30,
    MulU8 = 0x31,
    MulI16 = 0x32,
    MulU16 = 0x33,
    MulI32 = 0x34,
    MulU32 = 0x35,
    MulI64 = 0x36,
    MulU64 = 0x37,
    DivI8 = 0x40,
    DivU8 = 0x41,
    DivI16 = 0x42,
    DivU16 = 0x43,
    DivI32 = 0x44,
    DivU32 = 0x45,
    DivI64 = 0x46,
    DivU64 = 0x47,
    Return = 0x50,
}

/// Arithmetic families of the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn family(self) -> u8 {
        match self {
            ArithOp::Add => 0x10,
            ArithOp::Sub => 0x20,
            ArithOp::Mul => 0x30,
            ArithOp::Div => 0x40,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "ADD",
            ArithOp::Sub => "SUB",
            ArithOp::Mul => "MUL",
            ArithOp::Div => "DIV",
        }
    }
}

impl Opcode {
    /// Push opcode for `kind`.
    pub fn push(kind: IntKind) -> Self {
        match kind {
            IntKind::I8 => Opcode::PushI8,
            IntKind::U8 => Opcode::PushU8,
            IntKind::I16 => Opcode::PushI16,
            IntKind::U16 => Opcode::PushU16,
            IntKind::I32 => Opcode::PushI32,
            IntKind::U32 => Opcode::PushU32,
            IntKind::I64 => Opcode::PushI64,
            IntKind::U64 => Opcode::PushU64,
        }
    }

    /// Arithmetic opcode for `op` at `kind`.
    pub fn arithmetic(op: ArithOp, kind: IntKind) -> Self {
        match Opcode::try_from(op.family() | kind.index()) {
            Ok(opcode) => opcode,
            Err(_) => unreachable!("every arithmetic family covers all eight kinds"),
        }
    }

    /// Integer kind the opcode operates on, `None` for `NOP` and `RET`.
    pub fn kind(self) -> Option<IntKind> {
        let byte = self as u8;
        match byte {
            // pushes start at 0x01 so that 0x00 stays NOP
            0x01..=0x08 => IntKind::from_index(byte - 1),
            0x10..=0x4F => IntKind::from_index(byte & 0x0F),
            _ => None,
        }
    }

    pub fn arith_op(self) -> Option<ArithOp> {
        match self as u8 & 0xF0 {
            0x10 => Some(ArithOp::Add),
            0x20 => Some(ArithOp::Sub),
            0x30 => Some(ArithOp::Mul),
            0x40 => Some(ArithOp::Div),
            _ => None,
        }
    }

    pub fn is_push(self) -> bool {
        matches!(self as u8, 0x01..=0x08)
    }

    /// Number of immediate bytes following the opcode.
    pub fn operand_len(self) -> usize {
        if self.is_push() {
            self.kind().map_or(0, |kind| kind.width().bytes())
        } else {
            0
        }
    }

    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "NOP",
            PushI8 => "PUSH_I8",
            PushU8 => "PUSH_U8",
            PushI16 => "PUSH_I16",
            PushU16 => "PUSH_U16",
            PushI32 => "PUSH_I32",
            PushU32 => "PUSH_U32",
            PushI64 => "PUSH_I64",
            PushU64 => "PUSH_U64",
            AddI8 => "ADD_I8",
            AddU8 => "ADD_U8",
            AddI16 => "ADD_I16",
            AddU16 => "ADD_U16",
            AddI32 => "ADD_I32",
            AddU32 => "ADD_U32",
            AddI64 => "ADD_I64",
            AddU64 => "ADD_U64",
            SubI8 => "SUB_I8",
            SubU8 => "SUB_U8",
            SubI16 => "SUB_I16",
            SubU16 => "SUB_U16",
            SubI32 => "SUB_I32",
            SubU32 => "SUB_U32",
            SubI64 => "SUB_I64",
            SubU64 => "SUB_U64",
            MulI8 => "MUL_I8",
            MulU8 => "MUL_U8",
            MulI16 => "MUL_I16",
            MulU16 => "MUL_U16",
            MulI32 => "MUL_I32",
            MulU32 => "MUL_U32",
            MulI64 => "MUL_I64",
            MulU64 => "MUL_U64",
            DivI8 => "DIV_I8",
            DivU8 => "DIV_U8",
            DivI16 => "DIV_I16",
            DivU16 => "DIV_U16",
            DivI32 => "DIV_I32",
            DivU32 => "DIV_U32",
            DivI64 => "DIV_I64",
            DivU64 => "DIV_U64",
            Return => "RET",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        let opcode = match value {
            0x00 => Nop,
            0x01 => PushI8,
            0x02 => PushU8,
            0x03 => PushI16,
            0x04 => PushU16,
            0x05 => PushI32,
            0x06 => PushU32,
            0x07 => PushI64,
            0x08 => PushU64,
            0x10 => AddI8,
            0x11 => AddU8,
            0x12 => AddI16,
            0x13 => AddU16,
            0x14 => AddI32,
            0x15 => AddU32,
            0x16 => AddI64,
            0x17 => AddU64,
            0x20 => SubI8,
            0x21 => SubU8,
            0x22 => SubI16,
            0x23 => SubU16,
            0x24 => SubI32,
            0x25 => SubU32,
            0x26 => SubI64,
            0x27 => SubU64,
            0x30 => MulI8,
            0x31 => MulU8,
            0x32 => MulI16,
            0x33 => MulU16,
            0x34 => MulI32,
            0x35 => MulU32,
            0x36 => MulI64,
            0x37 => MulU64,
            0x40 => DivI8,
            0x41 => DivU8,
            0x42 => DivI16,
            0x43 => DivU16,
            0x44 => DivI32,
            0x45 => DivU32,
            0x46 => DivI64,
            0x47 => DivU64,
            0x50 => Return,
            other => return Err(other),
        };
        Ok(opcode)
    }
}

/// One decoded `(opcode, immediate)` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode byte inside the stream.
    pub offset: usize,
    pub opcode: Opcode,
    /// Raw immediate bits (zero when the opcode takes none).
    pub immediate: u64,
}

impl Instruction {
    /// Offset of the record that follows this one.
    pub fn next_offset(&self) -> usize {
        self.offset + 1 + self.opcode.operand_len()
    }

    /// Immediate normalised to the pushed kind, as it lands on the value stack.
    pub fn pushed_word(&self) -> Option<u64> {
        if self.opcode.is_push() {
            self.opcode.kind().map(|kind| kind.normalize(self.immediate))
        } else {
            None
        }
    }

    fn render(&self) -> String {
        match (self.pushed_word(), self.opcode.kind()) {
            (Some(word), Some(kind)) if kind.is_signed() => {
                format!("{} {}", self.opcode.name(), word as i64)
            }
            (Some(word), _) => format!("{} {}", self.opcode.name(), word),
            (None, _) => self.opcode.name().to_string(),
        }
    }
}

/// Decodes the record starting at `offset`, or `None` once the stream is exhausted.
pub fn decode_at(code: &[u8], offset: usize) -> Option<Result<Instruction, BytecodeError>> {
    let byte = *code.get(offset)?;
    Some(decode_record(code, offset, byte))
}

fn decode_record(code: &[u8], offset: usize, byte: u8) -> Result<Instruction, BytecodeError> {
    let opcode =
        Opcode::try_from(byte).map_err(|byte| BytecodeError::UnknownOpcode { offset, byte })?;
    let expected = opcode.operand_len();
    let start = offset + 1;
    let available = code.len() - start;
    if available < expected {
        return Err(BytecodeError::TruncatedOperand {
            offset,
            opcode: opcode.name(),
            expected,
            available,
        });
    }
    let immediate = code[start..start + expected]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
    Ok(Instruction {
        offset,
        opcode,
        immediate,
    })
}

/// Compiled program: the instruction stream plus the kind of its returned value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    code: Vec<u8>,
    result_kind: Option<IntKind>,
}

impl Program {
    pub fn new(code: Vec<u8>, result_kind: Option<IntKind>) -> Self {
        Self { code, result_kind }
    }

    /// Wraps a raw stream produced elsewhere. The result kind is unknown.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(bytes.into(), None)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Kind of the value the program returns, when compiled from a tree.
    pub fn result_kind(&self) -> Option<IntKind> {
        self.result_kind
    }

    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            code: &self.code,
            offset: 0,
            failed: false,
        }
    }

    /// Checks that the stream decodes cleanly and ends with its only `RET`.
    pub fn validate(&self) -> Result<(), BytecodeError> {
        let mut last = None;
        for instruction in self.instructions() {
            let instruction = instruction?;
            if instruction.opcode == Opcode::Return && instruction.next_offset() != self.len() {
                return Err(BytecodeError::CodeAfterReturn {
                    offset: instruction.offset,
                });
            }
            last = Some(instruction.opcode);
        }
        match last {
            Some(Opcode::Return) => Ok(()),
            _ => Err(BytecodeError::MissingReturn),
        }
    }

    /// One line per record: `offset: NAME [immediate]`.
    pub fn disassemble(&self) -> Result<String, BytecodeError> {
        let mut out = String::new();
        for instruction in self.instructions() {
            let instruction = instruction?;
            out.push_str(&format!("{:04}: {}\n", instruction.offset, instruction.render()));
        }
        Ok(out)
    }

    /// Hex listing of the raw stream, ten bytes per line.
    pub fn hex_dump(&self) -> String {
        const PER_LINE: usize = 10;
        let mut out = String::new();
        for chunk in self.code.chunks(PER_LINE) {
            let line = chunk
                .iter()
                .map(|byte| format!("0x{byte:02X}"))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

/// Iterator decoding a stream record by record. Stops after the first error.
pub struct Instructions<'a> {
    code: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, BytecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match decode_at(self.code, self.offset)? {
            Ok(instruction) => {
                self.offset = instruction.next_offset();
                Some(Ok(instruction))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    #[error("unknown opcode 0x{byte:02X} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },
    #[error("{opcode} at offset {offset} expects {expected} operand bytes but only {available} remain")]
    TruncatedOperand {
        offset: usize,
        opcode: &'static str,
        expected: usize,
        available: usize,
    },
    #[error("instructions follow the return at offset {offset}")]
    CodeAfterReturn { offset: usize },
    #[error("program does not end with a return instruction")]
    MissingReturn,
}
