use serde::{Deserialize, Serialize};

use super::node::TypedNode;
use super::types::Ty;
use crate::symbol::{AnonLabel, FuncLabel, LiteralLabel, MethodRef, VarLabel};

/// Every node kind the lowering engine understands. The dispatcher
/// matches exhaustively, so a new kind has to be handled everywhere
/// before the crate builds again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Literal(LiteralLabel),
    Var(VarLabel),
    /// The running program object.
    This,
    /// The left operand of the enclosing `?.`, evaluated once into a
    /// temporary; only valid inside `OptionalMember::member`.
    Receiver,
    Tuple(Vec<TypedNode>),
    Block {
        label: AnonLabel,
        body: Vec<TypedNode>,
    },
    /// `let a, b = value`; targets are the flattened components of `value`.
    Let {
        targets: Vec<VarLabel>,
        value: Box<TypedNode>,
    },
    /// `let a = value in body`.
    LetIn {
        label: AnonLabel,
        targets: Vec<VarLabel>,
        value: Box<TypedNode>,
        body: Box<TypedNode>,
    },
    /// `lhs <- value`.
    Assign {
        targets: Vec<LeftValue>,
        value: Box<TypedNode>,
    },
    /// Extern method, operator, constructor or conversion call.
    Call {
        method: Option<MethodRef>,
        #[serde(default)]
        instance: Option<Box<TypedNode>>,
        #[serde(default)]
        args: Vec<TypedNode>,
    },
    /// Property read through a resolved getter.
    Getter {
        method: Option<MethodRef>,
        #[serde(default)]
        instance: Option<Box<TypedNode>>,
    },
    /// Call of a user function.
    FuncCall {
        func: FuncLabel,
        #[serde(default)]
        args: Vec<TypedNode>,
    },
    And(Box<TypedNode>, Box<TypedNode>),
    Or(Box<TypedNode>, Box<TypedNode>),
    /// `target?.member`; `eq` is the equality operator of the target type.
    OptionalMember {
        target: Box<TypedNode>,
        member: Box<TypedNode>,
        eq: Option<MethodRef>,
    },
    /// `lhs ?? rhs`.
    Coalesce {
        lhs: Box<TypedNode>,
        rhs: Box<TypedNode>,
        eq: Option<MethodRef>,
    },
    If {
        branches: Vec<Branch>,
        #[serde(default)]
        otherwise: Option<Box<TypedNode>>,
    },
    While {
        cond: Box<TypedNode>,
        body: Box<TypedNode>,
    },
    Loop {
        body: Box<TypedNode>,
    },
    /// `for var in iterable do body` over an array value.
    For {
        label: AnonLabel,
        var: VarLabel,
        iterable: Box<TypedNode>,
        body: Box<TypedNode>,
    },
    Continue,
    Break,
    Array {
        elem: Ty,
        init: ArrayInit,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub cond: TypedNode,
    pub body: TypedNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LeftValue {
    Var(VarLabel),
    Setter {
        instance: Option<Box<TypedNode>>,
        method: Option<MethodRef>,
    },
}

/// How an array literal is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayInit {
    /// `[| a; b; c |]`
    Elements(Vec<TypedNode>),
    /// `[| first .. last |]`, inclusive.
    Range { first: Box<TypedNode>, last: Box<TypedNode> },
    /// `[| first .. step .. last |]`, inclusive.
    Stepped { first: Box<TypedNode>, step: Box<TypedNode>, last: Box<TypedNode> },
    /// `[| yield! source |]`
    Spread(Box<TypedNode>),
}

impl NodeKind {
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Literal(_) => "literal",
            NodeKind::Var(_) => "var",
            NodeKind::This => "this",
            NodeKind::Receiver => "receiver",
            NodeKind::Tuple(_) => "tuple",
            NodeKind::Block { .. } => "block",
            NodeKind::Let { .. } => "let",
            NodeKind::LetIn { .. } => "let-in",
            NodeKind::Assign { .. } => "assign",
            NodeKind::Call { .. } => "call",
            NodeKind::Getter { .. } => "getter",
            NodeKind::FuncCall { .. } => "function call",
            NodeKind::And(..) => "&&",
            NodeKind::Or(..) => "||",
            NodeKind::OptionalMember { .. } => "?.",
            NodeKind::Coalesce { .. } => "??",
            NodeKind::If { .. } => "if",
            NodeKind::While { .. } => "while",
            NodeKind::Loop { .. } => "loop",
            NodeKind::For { .. } => "for",
            NodeKind::Continue => "continue",
            NodeKind::Break => "break",
            NodeKind::Array { .. } => "array",
        }
    }
}
