use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::{InitialValue, SyncMode};
use crate::ast::Ty;
use crate::symbol::{Label, Named};

/// Reference to a global data slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataAddress(pub Label);

/// Jump target: a code label or a raw numeric address understood by the
/// host (the return-to-host sentinel).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeAddress {
    Label(Label),
    Absolute(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    Data(DataAddress),
    Code(CodeAddress),
}

impl fmt::Display for DataAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.identifier())
    }
}

impl fmt::Display for CodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeAddress::Label(l) => write!(f, "{}", l.identifier()),
            CodeAddress::Absolute(n) => write!(f, "0x{:08X}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Push(DataAddress),
    Pop,
    Copy,
    /// Host call dispatched on the extern signature string.
    Extern(String),
    Jump(CodeAddress),
    JumpIfFalse(CodeAddress),
    /// Jump to the code address stored in a data slot.
    JumpIndirect(DataAddress),
    Label(Label),
    ExportData(Label),
    SyncData(Label, SyncMode),
    DeclData { label: Label, ty: Ty, init: InitialValue },
    ExportCode(Label),
    /// Textual indentation delta; no runtime meaning.
    Indent(i8),
}

impl Instruction {
    pub fn push(label: impl Into<Label>) -> Self {
        let label = label.into();
        debug_assert!(label.is_data(), "PUSH of non-data label {}", label.identifier());
        Instruction::Push(DataAddress(label))
    }

    pub fn jump(label: impl Into<Label>) -> Self {
        Instruction::Jump(CodeAddress::Label(label.into()))
    }

    pub fn jump_if_false(label: impl Into<Label>) -> Self {
        Instruction::JumpIfFalse(CodeAddress::Label(label.into()))
    }

    pub fn label(label: impl Into<Label>) -> Self {
        Instruction::Label(label.into())
    }

    /// Address operand, if the instruction has one.
    pub fn address(&self) -> Option<Address> {
        match self {
            Instruction::Push(d) | Instruction::JumpIndirect(d) => Some(Address::Data(d.clone())),
            Instruction::Jump(c) | Instruction::JumpIfFalse(c) => Some(Address::Code(c.clone())),
            _ => None,
        }
    }

    /// True for instructions that belong to the data part of a program.
    pub fn is_data_directive(&self) -> bool {
        matches!(
            self,
            Instruction::DeclData { .. } | Instruction::ExportData(_) | Instruction::SyncData(..)
        )
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Instruction::Label(_))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(addr) => write!(f, "PUSH, {}", addr),
            Instruction::Pop => write!(f, "POP"),
            Instruction::Copy => write!(f, "COPY"),
            Instruction::Extern(sig) => write!(f, "EXTERN, \"{}\"", sig),
            Instruction::Jump(addr) => write!(f, "JUMP, {}", addr),
            Instruction::JumpIfFalse(addr) => write!(f, "JUMP_IF_FALSE, {}", addr),
            Instruction::JumpIndirect(addr) => write!(f, "JUMP_INDIRECT, {}", addr),
            Instruction::Label(l) => write!(f, "{}:", l.identifier()),
            Instruction::ExportData(l) => write!(f, ".export {}", l.identifier()),
            Instruction::SyncData(l, mode) => write!(f, ".sync {}, {}", l.identifier(), mode),
            Instruction::DeclData { label, ty, init } => {
                write!(f, "{}: %{}, {}", label.identifier(), ty.platform_name(), init)
            }
            Instruction::ExportCode(l) => write!(f, ".export {}", l.identifier()),
            Instruction::Indent(_) => Ok(()),
        }
    }
}

/// Ordered run of instructions produced by one lowering step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment(Vec<Instruction>);

impl Fragment {
    pub fn new() -> Self {
        Fragment(Vec::new())
    }

    pub fn single(op: Instruction) -> Self {
        Fragment(vec![op])
    }

    pub fn push(&mut self, op: Instruction) {
        self.0.push(op);
    }

    pub fn append(&mut self, other: Fragment) {
        self.0.extend(other.0);
    }

    /// `self` followed by `other`.
    pub fn then(mut self, other: Fragment) -> Self {
        self.append(other);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.0.iter()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.0
    }

    pub fn count(&self, pred: impl Fn(&Instruction) -> bool) -> usize {
        self.0.iter().filter(|op| pred(op)).count()
    }
}

impl From<Vec<Instruction>> for Fragment {
    fn from(ops: Vec<Instruction>) -> Self {
        Fragment(ops)
    }
}

impl FromIterator<Instruction> for Fragment {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Fragment(iter.into_iter().collect())
    }
}

impl IntoIterator for Fragment {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.0 {
            if !matches!(op, Instruction::Indent(_)) {
                writeln!(f, "{}", op)?;
            }
        }
        Ok(())
    }
}
