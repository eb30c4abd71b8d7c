//! file: core/src/symbol/label.rs
//! description: label variants and deterministic name synthesis.
//!
//! Every addressable entity of the target program is a label: data slots
//! (variables, literals, out-values, return slots, indirect-call targets)
//! and code locations (function entries, branch and loop points, call
//! continuations). Each label resolves to
//!
//! * a short display name for local diagnostics (collisions expected),
//! * a fully qualified display name (collisions mean an allocator bug),
//! * a canonical identifier used as the address in emitted instructions.
//!
//! All three are pure functions of the label's fields.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::hooks::mangle_hook_name;
use super::qualifier::{sanitize, Qualifier, QUALIFIED_SEPARATOR};
use crate::ast::Ty;

/// Naming capability shared by every label variant.
pub trait Named {
    fn display_name(&self) -> String;
    fn qualified_name(&self) -> String;
    fn identifier(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LabelKind {
    Var,
    Literal,
    OutValue,
    Func,
    Block,
    Loop,
    Branch,
    LetIn,
    For,
    Indirect,
    EvalFunc,
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LabelKind::Var => "var",
            LabelKind::Literal => "lit",
            LabelKind::OutValue => "out",
            LabelKind::Func => "fn",
            LabelKind::Block => "block",
            LabelKind::Loop => "loop",
            LabelKind::Branch => "branch",
            LabelKind::LetIn => "letin",
            LabelKind::For => "for",
            LabelKind::Indirect => "indirect",
            LabelKind::EvalFunc => "evalfunc",
        };
        write!(f, "{}", s)
    }
}

/// Anonymous label kinds, each with its own ordinal counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnonKind {
    Block,
    Loop,
    Branch,
    LetIn,
    For,
    Indirect,
    EvalFunc,
}

impl AnonKind {
    pub const ALL: [AnonKind; 7] = [
        AnonKind::Block,
        AnonKind::Loop,
        AnonKind::Branch,
        AnonKind::LetIn,
        AnonKind::For,
        AnonKind::Indirect,
        AnonKind::EvalFunc,
    ];

    pub fn label_kind(self) -> LabelKind {
        match self {
            AnonKind::Block => LabelKind::Block,
            AnonKind::Loop => LabelKind::Loop,
            AnonKind::Branch => LabelKind::Branch,
            AnonKind::LetIn => LabelKind::LetIn,
            AnonKind::For => LabelKind::For,
            AnonKind::Indirect => LabelKind::Indirect,
            AnonKind::EvalFunc => LabelKind::EvalFunc,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Role of a variable slot; decides how its identifier is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VarRole {
    /// Declared in user code, identifier is qualifier-prefixed.
    User,
    /// Bound by the platform (event parameters, `this`); spelled verbatim.
    System,
    /// Return value component `n` of the enclosing function.
    Return(u32),
    /// Slot holding the code address a function returns to.
    ReturnAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarLabel {
    pub qualifier: Qualifier,
    pub name: String,
    pub ty: Ty,
    pub role: VarRole,
}

impl VarLabel {
    pub fn user(qualifier: Qualifier, name: impl Into<String>, ty: Ty) -> Self {
        VarLabel { qualifier, name: name.into(), ty, role: VarRole::User }
    }

    pub fn system(name: impl Into<String>, ty: Ty) -> Self {
        VarLabel { qualifier: Qualifier::root(), name: name.into(), ty, role: VarRole::System }
    }

    pub fn is_system(&self) -> bool {
        matches!(self.role, VarRole::System)
    }
}

impl Named for VarLabel {
    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn qualified_name(&self) -> String {
        if self.qualifier.is_root() {
            return self.name.clone();
        }
        format!("{}{}{}", self.qualifier.qualified(), QUALIFIED_SEPARATOR, self.name)
    }

    fn identifier(&self) -> String {
        match self.role {
            VarRole::System => self.name.clone(),
            VarRole::User => format!("__var_{}", self.qualifier.child(self.name.as_str()).mangled()),
            VarRole::Return(n) => format!("__ret_{}_{}", self.qualifier.mangled(), n),
            VarRole::ReturnAddress => format!("__raddr_{}", self.qualifier.mangled()),
        }
    }
}

/// Interned constant. The index is assigned by `LiteralInterner` and is
/// unique per (text, type) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LiteralLabel {
    pub index: u32,
    pub text: String,
    pub ty: Ty,
}

impl Named for LiteralLabel {
    fn display_name(&self) -> String {
        self.text.clone()
    }

    fn qualified_name(&self) -> String {
        format!("lit#{}{}{}", self.index, QUALIFIED_SEPARATOR, self.text)
    }

    fn identifier(&self) -> String {
        format!("__lit_{}_{}", self.index, sanitize(&self.ty.platform_name()))
    }
}

/// Pool-managed temporary slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutValueLabel {
    pub qualifier: Qualifier,
    pub ty: Ty,
    pub ordinal: u32,
}

impl Named for OutValueLabel {
    fn display_name(&self) -> String {
        format!("out{}:{}", self.ordinal, self.ty)
    }

    fn qualified_name(&self) -> String {
        format!("{}{}{}", self.qualifier.qualified(), QUALIFIED_SEPARATOR, self.display_name())
    }

    fn identifier(&self) -> String {
        format!(
            "__out_{}_{}_{}",
            self.qualifier.mangled(),
            sanitize(&self.ty.platform_name()),
            self.ordinal
        )
    }
}

/// User function (or lifecycle hook) entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncLabel {
    pub qualifier: Qualifier,
    pub name: String,
    pub params: Vec<VarLabel>,
    pub ret: Ty,
    #[serde(default)]
    pub hook: bool,
}

impl FuncLabel {
    pub fn new(qualifier: Qualifier, name: impl Into<String>, params: Vec<VarLabel>, ret: Ty) -> Self {
        FuncLabel { qualifier, name: name.into(), params, ret, hook: false }
    }

    /// Same function bound to the platform lifecycle hook of its name.
    pub fn as_hook(&self) -> Self {
        FuncLabel { hook: true, ..self.clone() }
    }

    /// Qualifier of everything declared inside the function body.
    pub fn scope(&self) -> Qualifier {
        self.qualifier.child(self.name.as_str())
    }

    /// One slot per flattened return component.
    pub fn return_slots(&self) -> Vec<VarLabel> {
        self.ret
            .flatten()
            .into_iter()
            .enumerate()
            .map(|(i, ty)| VarLabel {
                qualifier: self.scope(),
                name: format!("return{}", i),
                ty,
                role: VarRole::Return(i as u32),
            })
            .collect()
    }

    pub fn return_address_slot(&self, address_ty: &Ty) -> VarLabel {
        VarLabel {
            qualifier: self.scope(),
            name: "return_address".to_string(),
            ty: address_ty.clone(),
            role: VarRole::ReturnAddress,
        }
    }
}

impl Named for FuncLabel {
    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn qualified_name(&self) -> String {
        self.scope().qualified()
    }

    fn identifier(&self) -> String {
        if self.hook {
            mangle_hook_name(&self.name)
        } else {
            format!("__fn_{}", self.scope().mangled())
        }
    }
}

/// Anonymous control-flow or call-site marker. Labels minted together
/// share an ordinal and differ in `part`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnonLabel {
    pub kind: AnonKind,
    pub qualifier: Qualifier,
    pub ordinal: u32,
    pub part: u16,
}

impl AnonLabel {
    pub fn new(kind: AnonKind, qualifier: Qualifier, ordinal: u32) -> Self {
        AnonLabel { kind, qualifier, ordinal, part: 0 }
    }

    /// Name of the qualifier segment opened by block-like labels.
    pub fn segment(&self) -> String {
        format!("{}{}", self.kind.label_kind(), self.ordinal)
    }
}

impl Named for AnonLabel {
    fn display_name(&self) -> String {
        format!("{}{}.{}", self.kind.label_kind(), self.ordinal, self.part)
    }

    fn qualified_name(&self) -> String {
        if self.qualifier.is_root() {
            return self.display_name();
        }
        format!("{}{}{}", self.qualifier.qualified(), QUALIFIED_SEPARATOR, self.display_name())
    }

    fn identifier(&self) -> String {
        format!(
            "__{}_{}_{}_{}",
            self.kind.label_kind(),
            self.qualifier.mangled(),
            self.ordinal,
            self.part
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Var(VarLabel),
    Literal(LiteralLabel),
    OutValue(OutValueLabel),
    Func(FuncLabel),
    Anon(AnonLabel),
}

impl Label {
    pub fn kind(&self) -> LabelKind {
        match self {
            Label::Var(_) => LabelKind::Var,
            Label::Literal(_) => LabelKind::Literal,
            Label::OutValue(_) => LabelKind::OutValue,
            Label::Func(_) => LabelKind::Func,
            Label::Anon(a) => a.kind.label_kind(),
        }
    }

    /// True for labels that name a global data slot.
    pub fn is_data(&self) -> bool {
        matches!(
            self.kind(),
            LabelKind::Var | LabelKind::Literal | LabelKind::OutValue | LabelKind::Indirect
        )
    }

    fn named(&self) -> &dyn Named {
        match self {
            Label::Var(l) => l,
            Label::Literal(l) => l,
            Label::OutValue(l) => l,
            Label::Func(l) => l,
            Label::Anon(l) => l,
        }
    }
}

impl Named for Label {
    fn display_name(&self) -> String {
        self.named().display_name()
    }

    fn qualified_name(&self) -> String {
        self.named().qualified_name()
    }

    fn identifier(&self) -> String {
        self.named().identifier()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl From<VarLabel> for Label {
    fn from(l: VarLabel) -> Self {
        Label::Var(l)
    }
}

impl From<LiteralLabel> for Label {
    fn from(l: LiteralLabel) -> Self {
        Label::Literal(l)
    }
}

impl From<OutValueLabel> for Label {
    fn from(l: OutValueLabel) -> Self {
        Label::OutValue(l)
    }
}

impl From<FuncLabel> for Label {
    fn from(l: FuncLabel) -> Self {
        Label::Func(l)
    }
}

impl From<AnonLabel> for Label {
    fn from(l: AnonLabel) -> Self {
        Label::Anon(l)
    }
}

/// A group of anonymous labels minted under one ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    kind: AnonKind,
    qualifier: Qualifier,
    ordinal: u32,
    count: u16,
}

impl LabelSet {
    pub fn kind(&self) -> AnonKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, part: usize) -> AnonLabel {
        assert!(
            part < self.count as usize,
            "label part {} out of range for a {}-label {} set",
            part,
            self.count,
            self.kind.label_kind()
        );
        AnonLabel { kind: self.kind, qualifier: self.qualifier.clone(), ordinal: self.ordinal, part: part as u16 }
    }
}

/// One monotonic ordinal counter per anonymous label kind.
#[derive(Debug, Clone, Default)]
pub struct LabelCounters {
    next: [u32; 7],
}

impl LabelCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_ordinal(&mut self, kind: AnonKind) -> u32 {
        let slot = &mut self.next[kind.index()];
        let n = *slot;
        *slot += 1;
        n
    }

    pub fn mint(&mut self, kind: AnonKind, qualifier: &Qualifier) -> AnonLabel {
        let ordinal = self.next_ordinal(kind);
        AnonLabel::new(kind, qualifier.clone(), ordinal)
    }

    pub fn mint_set(&mut self, kind: AnonKind, qualifier: &Qualifier, count: usize) -> LabelSet {
        let ordinal = self.next_ordinal(kind);
        LabelSet { kind, qualifier: qualifier.clone(), ordinal, count: count as u16 }
    }
}
