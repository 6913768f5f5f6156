//! Scalar kinds and the integer promotion rule.
//!
//! The compiler resolves the kind of every binary operation by combining the kinds of its
//! operands through [`promote`]. The virtual machine never sees a `ScalarKind`; it only
//! sees the [`IntKind`] baked into each opcode.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Every scalar representation a literal can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::I8 => "i8",
            ScalarKind::U8 => "u8",
            ScalarKind::I16 => "i16",
            ScalarKind::U16 => "u16",
            ScalarKind::I32 => "i32",
            ScalarKind::U32 => "u32",
            ScalarKind::I64 => "i64",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
        }
    }

    /// Integer kind backing this scalar, `None` for floating point kinds.
    pub fn integer(self) -> Option<IntKind> {
        match self {
            ScalarKind::I8 => Some(IntKind::I8),
            ScalarKind::U8 => Some(IntKind::U8),
            ScalarKind::I16 => Some(IntKind::I16),
            ScalarKind::U16 => Some(IntKind::U16),
            ScalarKind::I32 => Some(IntKind::I32),
            ScalarKind::U32 => Some(IntKind::U32),
            ScalarKind::I64 => Some(IntKind::I64),
            ScalarKind::U64 => Some(IntKind::U64),
            ScalarKind::F32 | ScalarKind::F64 => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operand width. Declaration order is the promotion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    /// Number of immediate bytes a push of this width carries.
    pub fn bytes(self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

/// Integer kinds understood by the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

impl IntKind {
    /// All kinds in opcode order.
    pub const ALL: [IntKind; 8] = [
        IntKind::I8,
        IntKind::U8,
        IntKind::I16,
        IntKind::U16,
        IntKind::I32,
        IntKind::U32,
        IntKind::I64,
        IntKind::U64,
    ];

    pub fn from_parts(width: Width, signed: bool) -> Self {
        match (width, signed) {
            (Width::W8, true) => IntKind::I8,
            (Width::W8, false) => IntKind::U8,
            (Width::W16, true) => IntKind::I16,
            (Width::W16, false) => IntKind::U16,
            (Width::W32, true) => IntKind::I32,
            (Width::W32, false) => IntKind::U32,
            (Width::W64, true) => IntKind::I64,
            (Width::W64, false) => IntKind::U64,
        }
    }

    pub fn width(self) -> Width {
        match self {
            IntKind::I8 | IntKind::U8 => Width::W8,
            IntKind::I16 | IntKind::U16 => Width::W16,
            IntKind::I32 | IntKind::U32 => Width::W32,
            IntKind::I64 | IntKind::U64 => Width::W64,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64
        )
    }

    /// Position of the kind inside an opcode family (low nibble of the opcode byte).
    pub fn index(self) -> u8 {
        match self {
            IntKind::I8 => 0,
            IntKind::U8 => 1,
            IntKind::I16 => 2,
            IntKind::U16 => 3,
            IntKind::I32 => 4,
            IntKind::U32 => 5,
            IntKind::I64 => 6,
            IntKind::U64 => 7,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        self.scalar().name()
    }

    pub fn scalar(self) -> ScalarKind {
        match self {
            IntKind::I8 => ScalarKind::I8,
            IntKind::U8 => ScalarKind::U8,
            IntKind::I16 => ScalarKind::I16,
            IntKind::U16 => ScalarKind::U16,
            IntKind::I32 => ScalarKind::I32,
            IntKind::U32 => ScalarKind::U32,
            IntKind::I64 => ScalarKind::I64,
            IntKind::U64 => ScalarKind::U64,
        }
    }

    /// Truncates `word` to this kind's width and extends it back to 64 bits,
    /// sign-extending signed kinds and zero-extending unsigned ones.
    pub fn normalize(self, word: u64) -> u64 {
        match self {
            IntKind::I8 => word as i8 as i64 as u64,
            IntKind::U8 => word as u8 as u64,
            IntKind::I16 => word as i16 as i64 as u64,
            IntKind::U16 => word as u16 as u64,
            IntKind::I32 => word as i32 as i64 as u64,
            IntKind::U32 => word as u32 as u64,
            IntKind::I64 | IntKind::U64 => word,
        }
    }

    /// Low `width` bits of `word`, as stored in a push immediate.
    pub fn truncate(self, word: u64) -> u64 {
        match self.width() {
            Width::W64 => word,
            width => word & ((1u64 << width.bits()) - 1),
        }
    }
}

impl fmt::Display for IntKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolves the result kind of a binary operation.
///
/// The wider width wins. At equal width the result is unsigned only when both sides
/// are unsigned.
pub fn promote(lhs: IntKind, rhs: IntKind) -> IntKind {
    match lhs.width().cmp(&rhs.width()) {
        Ordering::Greater => lhs,
        Ordering::Less => rhs,
        Ordering::Equal => IntKind::from_parts(lhs.width(), lhs.is_signed() || rhs.is_signed()),
    }
}
