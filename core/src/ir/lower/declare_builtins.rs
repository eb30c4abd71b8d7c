//! file: core/src/ir/lower/declare_builtins.rs
//! description: platform-bound slots and the data part of a program.
//!
//! Declared table variables come first, in declaration order. Every other
//! slot the code part touches (literals, out-values, return slots,
//! indirect-call targets, event parameters, `this`) follows in the order
//! of its first use, so two compilations of the same unit emit the same
//! data part.

use log::{debug, warn};
use std::collections::HashSet;

use super::{LoweringContext, Primitives};
use crate::ast::Ty;
use crate::config::TargetTypes;
use crate::ir::module::{CodeBlock, DataDecl};
use crate::ir::op::{DataAddress, Fragment, Instruction};
use crate::ir::value::InitialValue;
use crate::symbol::{event_parameter_name, AnonKind, EventSig, Label, Named, VarLabel};

/// Identifier of the implicit self-reference slot.
pub const THIS_SLOT: &str = "__this";

pub fn this_slot(types: &TargetTypes) -> VarLabel {
    VarLabel::system(THIS_SLOT, types.this_ty())
}

/// Platform-bound slots an event hands its arguments in, in parameter order.
pub fn event_parameter_slots(event: &EventSig) -> Vec<VarLabel> {
    event
        .params
        .iter()
        .map(|p| VarLabel::system(event_parameter_name(&event.name, &p.name), p.ty.clone()))
        .collect()
}

fn literal_value(text: &str) -> InitialValue {
    if text == "null" {
        InitialValue::Null
    } else {
        InitialValue::Literal(text.to_string())
    }
}

/// Initial content of a slot discovered in the code part.
fn initial_value(label: &Label, ctx: &LoweringContext<'_>) -> InitialValue {
    match label {
        Label::Var(v) if v.is_system() && v.name == THIS_SLOT => InitialValue::This,
        Label::Literal(lit) => literal_value(&lit.text),
        Label::Anon(a) if a.kind == AnonKind::Indirect => match ctx.indirect_target(a) {
            Some(target) => InitialValue::Address(target.clone()),
            None => {
                warn!("indirect slot `{}` has no registered continuation", a.identifier());
                InitialValue::Null
            }
        },
        _ => InitialValue::Null,
    }
}

fn slot_type(label: &Label, ctx: &LoweringContext<'_>) -> Option<Ty> {
    match label {
        Label::Var(v) => Some(v.ty.clone()),
        Label::Literal(l) => Some(l.ty.clone()),
        Label::OutValue(o) => Some(o.ty.clone()),
        Label::Anon(a) if a.kind == AnonKind::Indirect => Some(ctx.options.types.address_ty()),
        Label::Func(_) | Label::Anon(_) => None,
    }
}

/// Build the data part for the lowered `blocks`.
pub fn assemble_data(blocks: &[CodeBlock], ctx: &LoweringContext<'_>) -> Vec<DataDecl> {
    let mut seen = HashSet::new();
    let mut data = Vec::new();

    for decl in ctx.table.variables() {
        let label = Label::Var(decl.label.clone());
        if !seen.insert(label.identifier()) {
            continue;
        }
        let init = match &decl.init {
            Some(lit) => literal_value(&lit.text),
            None => InitialValue::Null,
        };
        data.push(DataDecl {
            ty: decl.label.ty.clone(),
            label,
            init,
            export: decl.export,
            sync: decl.sync,
        });
    }
    let declared = data.len();

    let operands = blocks.iter().flat_map(|b| b.code.iter()).filter_map(|op| match op {
        Instruction::Push(DataAddress(l)) | Instruction::JumpIndirect(DataAddress(l)) => Some(l),
        _ => None,
    });
    for label in operands {
        if !seen.insert(label.identifier()) {
            continue;
        }
        let ty = match slot_type(label, ctx) {
            Some(ty) => ty,
            None => {
                warn!("`{}` pushed as data but names a code location", label.identifier());
                continue;
            }
        };
        data.push(DataDecl::new(label.clone(), ty, initial_value(label, ctx)));
    }

    debug!("data part: {} declared, {} discovered", declared, data.len() - declared);
    data
}

/// Directives for `data`: export and sync markers ahead of each
/// declaration.
pub fn emit_data(data: &[DataDecl], prims: &dyn Primitives) -> Fragment {
    let mut code = Fragment::new();
    for decl in data {
        if decl.export {
            code.append(prims.export_data(&decl.label));
        }
        if let Some(mode) = decl.sync {
            code.append(prims.sync_data(&decl.label, mode));
        }
        code.append(prims.decl_data(&decl.label, &decl.ty, &decl.init));
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::lower::AssemblyPrimitives;
    use crate::ir::value::SyncMode;
    use crate::symbol::Qualifier;

    #[test]
    fn event_slots_follow_parameter_order() {
        let ev = EventSig::new("OnCollisionEnter", &[("other", "Collision"), ("speed", "SystemSingle")]);
        let names: Vec<_> = event_parameter_slots(&ev).into_iter().map(|v| v.identifier()).collect();
        assert_eq!(names, vec!["onCollisionEnterOther", "onCollisionEnterSpeed"]);
    }

    #[test]
    fn null_text_declares_a_null_slot() {
        assert_eq!(literal_value("null"), InitialValue::Null);
        assert_eq!(literal_value("3"), InitialValue::Literal("3".to_string()));
    }

    #[test]
    fn export_and_sync_precede_the_declaration() {
        let x = Label::Var(VarLabel::user(Qualifier::from_segments(["M"]), "x", Ty::named("SystemInt32")));
        let mut decl = DataDecl::new(x, Ty::named("SystemInt32"), InitialValue::Literal("4".to_string()));
        decl.export = true;
        decl.sync = Some(SyncMode::Linear);
        let plain = DataDecl::new(Label::Var(this_slot(&TargetTypes::default())), Ty::named("SystemObject"), InitialValue::This);

        let ops = emit_data(&[decl, plain], &AssemblyPrimitives).into_instructions();
        assert_eq!(ops.len(), 4);
        assert!(matches!(ops[0], Instruction::ExportData(_)));
        assert!(matches!(ops[1], Instruction::SyncData(_, SyncMode::Linear)));
        assert!(matches!(ops[2], Instruction::DeclData { .. }));
        assert!(matches!(&ops[3], Instruction::DeclData { init: InitialValue::This, .. }));
    }

    #[test]
    fn this_slot_uses_the_configured_type() {
        let types = TargetTypes { this: "VRCUdonUdonBehaviour".to_string(), ..TargetTypes::default() };
        let slot = this_slot(&types);
        assert_eq!(slot.identifier(), THIS_SLOT);
        assert_eq!(slot.ty, Ty::named("VRCUdonUdonBehaviour"));
    }
}
