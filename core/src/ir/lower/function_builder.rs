//! file: core/src/ir/lower/function_builder.rs
//! description: per-entry-point code blocks.
//!
//! User functions follow the return-address protocol: the caller leaves
//! the arguments and an indirect slot holding its continuation on the
//! stack, the callee stores them, runs the body, fills its return slots
//! and jumps back through the stored address.
//!
//! Lifecycle hooks are exported under their reserved names, copy the
//! platform-bound event slots into their parameters and hand control back
//! to the host with the configured sentinel jump. The top-level entry
//! statements run in front of the configured entry hook.

use log::{debug, warn};

use super::declare_builtins::event_parameter_slots;
use super::{lower_node, lower_stmt, LoweringContext};
use crate::ast::{FunctionDecl, Program, Ty, TypedNode};
use crate::ir::module::{BlockKind, CodeBlock};
use crate::ir::op::Fragment;
use crate::symbol::{EventSig, FuncLabel, Label, Named, Qualifier};

/// Lower every function, hook and the entry statements of `program`.
pub fn lower_program(program: &Program, ctx: &mut LoweringContext<'_>) -> Vec<CodeBlock> {
    let entry_event = ctx.options.entry_event.clone();
    let merged = program.functions.iter().any(|f| ctx.is_hook(&f.label) && f.label.name == entry_event);

    let mut blocks = Vec::with_capacity(program.functions.len() + 1);
    if !merged && !program.entry.is_empty() {
        blocks.push(lower_entry(&program.entry, ctx));
    }
    for decl in &program.functions {
        let block = if ctx.is_hook(&decl.label) {
            let entry: &[TypedNode] = if decl.label.name == entry_event { &program.entry } else { &[] };
            lower_hook(decl, entry, ctx)
        } else {
            lower_function(decl, ctx)
        };
        blocks.push(block);
    }
    blocks
}

fn indent(ctx: &LoweringContext<'_>, delta: i8) -> Fragment {
    if ctx.options.indent {
        ctx.prims.indent(delta)
    } else {
        Fragment::new()
    }
}

fn lower_statements(nodes: &[TypedNode], ctx: &mut LoweringContext<'_>) -> Fragment {
    let mut code = Fragment::new();
    for n in nodes {
        code.append(lower_stmt(n, ctx));
    }
    code
}

fn lower_function(decl: &FunctionDecl, ctx: &mut LoweringContext<'_>) -> CodeBlock {
    let func = &decl.label;
    let scope = func.scope();
    let entry = Label::Func(func.clone());
    ctx.enter_function(&scope);

    let mut code = Fragment::new();
    if decl.export {
        code.append(ctx.prims.export_code(&entry));
    }
    code.append(ctx.prims.label(&entry));
    code.append(indent(ctx, 1));

    let raddr = Label::Var(func.return_address_slot(&ctx.options.types.address_ty()));
    code.append(ctx.prims.copy_into(&raddr));
    for param in func.params.iter().rev() {
        code.append(ctx.prims.copy_into(&Label::Var(param.clone())));
    }

    if func.ret.is_unit() {
        code.append(lower_stmt(&decl.body, ctx));
    } else {
        let body = lower_node(&decl.body, ctx);
        code.append(body.code);
        for slot in func.return_slots().into_iter().rev() {
            code.append(ctx.prims.copy_into(&Label::Var(slot)));
        }
        ctx.release_all(body.held);
    }
    code.append(ctx.prims.indirect(&raddr));
    code.append(indent(ctx, -1));

    ctx.leave_function(&scope);
    debug!("lowered function `{}` ({} instructions)", func.qualified_name(), code.len());
    CodeBlock { entry, kind: BlockKind::Function, scope, code }
}

fn event_for(name: &str, ctx: &LoweringContext<'_>) -> EventSig {
    match ctx.table.event(name) {
        Some(ev) => ev.clone(),
        None => EventSig { name: name.to_string(), params: Vec::new() },
    }
}

fn lower_hook(decl: &FunctionDecl, entry_stmts: &[TypedNode], ctx: &mut LoweringContext<'_>) -> CodeBlock {
    let hook = decl.label.as_hook();
    let scope = hook.scope();
    let entry = Label::Func(hook.clone());
    let event = event_for(&hook.name, ctx);
    ctx.enter_function(&scope);

    let mut code = ctx.prims.export_code(&entry);
    code.append(ctx.prims.label(&entry));
    code.append(indent(ctx, 1));
    code.append(lower_statements(entry_stmts, ctx));

    let slots = event_parameter_slots(&event);
    if slots.len() != hook.params.len() {
        warn!(
            "hook `{}` declares {} parameter(s), event supplies {}",
            hook.name,
            hook.params.len(),
            slots.len()
        );
    }
    for (platform, param) in slots.into_iter().zip(hook.params.iter()) {
        code.append(ctx.prims.copy(&Label::Var(platform), &Label::Var(param.clone())));
    }

    code.append(lower_stmt(&decl.body, ctx));
    code.append(ctx.prims.jump_absolute(ctx.options.return_sentinel));
    code.append(indent(ctx, -1));

    ctx.leave_function(&scope);
    debug!(
        "lowered hook `{}` as `{}` ({} entry statement(s))",
        hook.name,
        hook.identifier(),
        entry_stmts.len()
    );
    CodeBlock { entry, kind: BlockKind::Hook, scope, code }
}

/// Entry statements with no user-declared entry hook: emitted as that
/// hook on their own.
fn lower_entry(stmts: &[TypedNode], ctx: &mut LoweringContext<'_>) -> CodeBlock {
    let hook = FuncLabel::new(Qualifier::root(), ctx.options.entry_event.clone(), Vec::new(), Ty::Unit).as_hook();
    let scope = hook.scope();
    let entry = Label::Func(hook.clone());
    ctx.enter_function(&scope);

    let mut code = ctx.prims.export_code(&entry);
    code.append(ctx.prims.label(&entry));
    code.append(indent(ctx, 1));
    code.append(lower_statements(stmts, ctx));
    code.append(ctx.prims.jump_absolute(ctx.options.return_sentinel));
    code.append(indent(ctx, -1));

    ctx.leave_function(&scope);
    debug!("lowered entry block as `{}` ({} statement(s))", hook.identifier(), stmts.len());
    CodeBlock { entry, kind: BlockKind::Entry, scope, code }
}
