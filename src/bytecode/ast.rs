//! Syntax tree consumed by the compiler.
//!
//! The tree is produced by an upstream parser and handed over read-only. Children are owned
//! through `Box`/`Vec`, so every subtree has exactly one parent. The serde representation
//! lets a driver receive the tree as JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::ScalarKind;

/// Root of a parsed program: an implicit top-level compound statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    pub statements: Vec<Node>,
}

impl Ast {
    pub fn new(statements: Vec<Node>) -> Self {
        Self { statements }
    }

    /// Wraps `body` into a single parameterless `main` function.
    pub fn main(body: Vec<Node>) -> Self {
        Self::new(vec![Node::function("main", Vec::new(), body)])
    }

    /// Builds `fun main() { return <expr>; }`.
    pub fn from_expr(expr: Node) -> Self {
        Self::main(vec![Node::ret(expr)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Literal {
        value: Literal,
    },
    Unary {
        op: Operator,
        operand: Box<Node>,
    },
    Binary {
        left: Box<Node>,
        op: Operator,
        right: Box<Node>,
    },
    Compound {
        statements: Vec<Node>,
    },
    VariableDeclaration {
        name: String,
        #[serde(default)]
        ty: Option<ScalarKind>,
        #[serde(default)]
        init: Option<Box<Node>>,
    },
    FunctionDeclaration {
        name: String,
        #[serde(default)]
        params: Vec<Parameter>,
        #[serde(default)]
        return_type: Option<ScalarKind>,
        body: Vec<Node>,
    },
    Return {
        value: Box<Node>,
    },
}

impl Node {
    pub fn literal(value: Literal) -> Self {
        Node::Literal { value }
    }

    /// Integer literal typed the way the parser types unsuffixed numbers.
    pub fn int(value: i64) -> Self {
        Node::literal(Literal::I64(value))
    }

    pub fn unary(op: Operator, operand: Node) -> Self {
        Node::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: Operator, left: Node, right: Node) -> Self {
        Node::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn compound(statements: Vec<Node>) -> Self {
        Node::Compound { statements }
    }

    pub fn variable(name: impl Into<String>, ty: Option<ScalarKind>, init: Option<Node>) -> Self {
        Node::VariableDeclaration {
            name: name.into(),
            ty,
            init: init.map(Box::new),
        }
    }

    pub fn function(name: impl Into<String>, params: Vec<Parameter>, body: Vec<Node>) -> Self {
        Node::FunctionDeclaration {
            name: name.into(),
            params,
            return_type: None,
            body,
        }
    }

    pub fn ret(value: Node) -> Self {
        Node::Return {
            value: Box::new(value),
        }
    }

    /// Human readable node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Literal { .. } => "literal",
            Node::Unary { .. } => "unary operation",
            Node::Binary { .. } => "binary operation",
            Node::Compound { .. } => "compound statement",
            Node::VariableDeclaration { .. } => "variable declaration",
            Node::FunctionDeclaration { .. } => "function declaration",
            Node::Return { .. } => "return statement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub ty: Option<ScalarKind>,
}

/// Literal value tagged with its scalar kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Literal {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Literal {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Literal::I8(_) => ScalarKind::I8,
            Literal::U8(_) => ScalarKind::U8,
            Literal::I16(_) => ScalarKind::I16,
            Literal::U16(_) => ScalarKind::U16,
            Literal::I32(_) => ScalarKind::I32,
            Literal::U32(_) => ScalarKind::U32,
            Literal::I64(_) => ScalarKind::I64,
            Literal::U64(_) => ScalarKind::U64,
            Literal::F32(_) => ScalarKind::F32,
            Literal::F64(_) => ScalarKind::F64,
        }
    }

    /// The literal's bits reinterpreted as an unsigned value of its own width.
    pub fn bits(&self) -> Option<u64> {
        match *self {
            Literal::I8(v) => Some(u64::from(v as u8)),
            Literal::U8(v) => Some(u64::from(v)),
            Literal::I16(v) => Some(u64::from(v as u16)),
            Literal::U16(v) => Some(u64::from(v)),
            Literal::I32(v) => Some(u64::from(v as u32)),
            Literal::U32(v) => Some(u64::from(v)),
            Literal::I64(v) => Some(v as u64),
            Literal::U64(v) => Some(v),
            Literal::F32(_) | Literal::F64(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Assign,
    AssignAdd,
    AssignSub,
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    GreaterEqual,
    LesserEqual,
    Negate,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Assign => "=",
            Operator::AssignAdd => "+=",
            Operator::AssignSub => "-=",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::GreaterEqual => ">=",
            Operator::LesserEqual => "<=",
            Operator::Negate => "!",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
