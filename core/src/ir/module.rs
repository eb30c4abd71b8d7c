//! file: core/src/ir/module.rs
//! description: compiled program container and its assembly listing.
//!
//! A `CompiledProgram` is the data part (one declaration per global slot)
//! plus the code part (one block per function, hook or entry point). The
//! `Display` impl renders the textual assembly the host loader accepts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::op::{Fragment, Instruction};
use super::value::{InitialValue, SyncMode};
use crate::ast::Ty;
use crate::symbol::{AnonKind, Label, Named, Qualifier, VarRole};

const INDENT_WIDTH: usize = 4;

/// Declaration of one global data slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDecl {
    pub label: Label,
    pub ty: Ty,
    pub init: InitialValue,
    pub export: bool,
    pub sync: Option<SyncMode>,
}

impl DataDecl {
    pub fn new(label: Label, ty: Ty, init: InitialValue) -> Self {
        DataDecl { label, ty, init, export: false, sync: None }
    }

    /// Slot class used by the statistics report.
    pub fn class(&self) -> &'static str {
        match &self.label {
            Label::Var(v) => match v.role {
                VarRole::User => "variable",
                VarRole::System => "system",
                VarRole::Return(_) | VarRole::ReturnAddress => "return",
            },
            Label::Literal(_) => "literal",
            Label::OutValue(_) => "out-value",
            Label::Anon(a) if a.kind == AnonKind::Indirect => "indirect",
            Label::Func(_) | Label::Anon(_) => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Function,
    Hook,
    /// Implicit entry block emitted as a hook of its own.
    Entry,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockKind::Function => "function",
            BlockKind::Hook => "hook",
            BlockKind::Entry => "entry",
        };
        write!(f, "{}", s)
    }
}

/// Code of one entry point, starting at `entry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub entry: Label,
    pub kind: BlockKind,
    /// Qualifier the block's temporaries were allocated under.
    pub scope: Qualifier,
    pub code: Fragment,
}

/// Out-value pool counters for one code block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotUsage {
    pub function: String,
    pub retains: usize,
    pub releases: usize,
    pub minted: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgramStats {
    /// Data declarations per slot class.
    pub slots: BTreeMap<&'static str, usize>,
    pub data_decls: usize,
    pub blocks: usize,
    pub code_instructions: usize,
    pub externs: usize,
    pub jumps: usize,
    pub labels: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub data: Vec<DataDecl>,
    /// Directives declaring `data`, as built by the primitives.
    #[serde(default)]
    pub data_code: Fragment,
    pub blocks: Vec<CodeBlock>,
    #[serde(default)]
    pub slot_usage: Vec<SlotUsage>,
}

#[derive(Serialize)]
struct InstructionStream {
    data: Vec<Instruction>,
    code: Vec<Instruction>,
}

impl CompiledProgram {
    pub fn new(data: Vec<DataDecl>, data_code: Fragment, blocks: Vec<CodeBlock>) -> Self {
        CompiledProgram { data, data_code, blocks, slot_usage: Vec::new() }
    }

    pub fn with_slot_usage(mut self, usage: Vec<SlotUsage>) -> Self {
        self.slot_usage = usage;
        self
    }

    pub fn block(&self, entry: &str) -> Option<&CodeBlock> {
        self.blocks.iter().find(|b| b.entry.identifier() == entry)
    }

    pub fn data_decl(&self, identifier: &str) -> Option<&DataDecl> {
        self.data.iter().find(|d| d.label.identifier() == identifier)
    }

    pub fn data_part(&self) -> Vec<Instruction> {
        self.data_code.instructions().to_vec()
    }

    pub fn code_part(&self) -> Vec<Instruction> {
        self.blocks.iter().flat_map(|b| b.code.iter().cloned()).collect()
    }

    /// Data part followed by code part.
    pub fn instructions(&self) -> Vec<Instruction> {
        let mut all = self.data_part();
        all.extend(self.code_part());
        all
    }

    pub fn stats(&self) -> ProgramStats {
        let mut stats = ProgramStats {
            data_decls: self.data.len(),
            blocks: self.blocks.len(),
            ..ProgramStats::default()
        };
        for decl in &self.data {
            *stats.slots.entry(decl.class()).or_insert(0) += 1;
        }
        for op in self.blocks.iter().flat_map(|b| b.code.iter()) {
            match op {
                Instruction::Indent(_) => continue,
                Instruction::Extern(_) => stats.externs += 1,
                Instruction::Jump(_) | Instruction::JumpIfFalse(_) | Instruction::JumpIndirect(_) => stats.jumps += 1,
                Instruction::Label(_) => stats.labels += 1,
                _ => {}
            }
            stats.code_instructions += 1;
        }
        stats
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let stream = InstructionStream { data: self.data_part(), code: self.code_part() };
        serde_json::to_string_pretty(&stream)
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, ops: &[Instruction]) -> fmt::Result {
    let mut depth: i32 = 1;
    for op in ops {
        if let Instruction::Indent(delta) = op {
            depth = (depth + i32::from(*delta)).max(0);
            continue;
        }
        let pad = INDENT_WIDTH * depth as usize;
        writeln!(f, "{:pad$}{}", "", op, pad = pad)?;
    }
    Ok(())
}

impl fmt::Display for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".data_start")?;
        write_section(f, &self.data_part())?;
        writeln!(f, ".data_end")?;
        writeln!(f, ".code_start")?;
        write_section(f, &self.code_part())?;
        writeln!(f, ".code_end")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::lower::{emit_data, AssemblyPrimitives};
    use crate::symbol::{LiteralLabel, VarLabel};

    fn int() -> Ty {
        Ty::named("SystemInt32")
    }

    #[test]
    fn listing_indents_by_marker() {
        let lit = Label::Literal(LiteralLabel { index: 0, text: "1".to_string(), ty: int() });
        let entry = Label::Var(VarLabel::system("_start", int()));
        let code: Fragment = vec![
            Instruction::Label(entry.clone()),
            Instruction::Indent(1),
            Instruction::push(lit.clone()),
            Instruction::Indent(-1),
        ]
        .into();
        let block = CodeBlock { entry, kind: BlockKind::Entry, scope: Qualifier::root(), code };
        let data = vec![DataDecl::new(lit, int(), InitialValue::Literal("1".to_string()))];
        let data_code = emit_data(&data, &AssemblyPrimitives);
        let p = CompiledProgram::new(data, data_code, vec![block]);
        let text = p.to_string();
        assert!(text.starts_with(".data_start\n"));
        assert!(text.contains("\n    _start:\n"));
        assert!(text.contains("\n        PUSH, __lit_0_SystemInt32\n"));
        assert!(text.trim_end().ends_with(".code_end"));
    }

    #[test]
    fn stats_skip_indent_markers() {
        let target = Label::Var(VarLabel::system("t", int()));
        let code: Fragment = vec![
            Instruction::Indent(1),
            Instruction::Extern("SystemInt32.__op_Addition".to_string()),
            Instruction::jump(target.clone()),
            Instruction::Label(target.clone()),
            Instruction::Indent(-1),
        ]
        .into();
        let block = CodeBlock { entry: target, kind: BlockKind::Function, scope: Qualifier::root(), code };
        let s = CompiledProgram::new(Vec::new(), Fragment::new(), vec![block]).stats();
        assert_eq!(s.code_instructions, 3);
        assert_eq!((s.externs, s.jumps, s.labels), (1, 1, 1));
    }
}
