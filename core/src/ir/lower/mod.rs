//! file: core/src/ir/lower/mod.rs
//! description: typed tree -> stack-machine instruction lowering.
//!
//! `lower_node` is the single dispatcher over `NodeKind`; it recurses
//! into children in evaluation order and composes `Primitives` calls.
//! Every expression leaves its value's addresses on the VM stack (one per
//! flattened component) and reports the temporaries those addresses
//! live in; the consumer releases them once the value has been used.
//!
//! `compile` is the driver: one code block per user function, one per
//! lifecycle hook and the implicit entry block, then the data part.

pub mod declare_builtins;
pub mod function_builder;
pub mod lower_expr;
pub mod lower_objects;
pub mod lower_stmt;
pub mod lowering_context;
pub mod primitives;

pub use lowering_context::LoweringContext;
pub use declare_builtins::emit_data;
pub use primitives::{AssemblyPrimitives, Primitives};

use log::debug;

use crate::ast::{CompileUnit, NodeKind, TypedNode};
use crate::config::CompileOptions;
use crate::error::LowerError;
use crate::ir::module::{CompiledProgram, SlotUsage};
use crate::ir::op::Fragment;
use crate::ir::pool::OutValue;

/// Code of an expression plus the temporaries its result occupies.
#[derive(Debug, Default)]
pub struct Lowered {
    pub code: Fragment,
    pub held: Vec<OutValue>,
}

impl Lowered {
    pub fn new(code: Fragment) -> Self {
        Lowered { code, held: Vec::new() }
    }

    pub fn empty() -> Self {
        Lowered::default()
    }

    pub fn holding(code: Fragment, held: Vec<OutValue>) -> Self {
        Lowered { code, held }
    }

    /// Take the code and hand the temporaries back to the pool; for values
    /// consumed by the very next instructions.
    pub fn consume(self, ctx: &mut LoweringContext<'_>) -> Fragment {
        ctx.release_all(self.held);
        self.code
    }
}

/// Lower `node` in value position.
pub fn lower_node(node: &TypedNode, ctx: &mut LoweringContext<'_>) -> Lowered {
    match &node.kind {
        NodeKind::Literal(_)
        | NodeKind::Var(_)
        | NodeKind::This
        | NodeKind::Receiver
        | NodeKind::Tuple(_) => lower_expr::lower_operand(node, ctx),
        NodeKind::Call { method, instance, args } => {
            lower_expr::lower_call(node, method.as_ref(), instance.as_deref(), args, ctx)
        }
        NodeKind::Getter { method, instance } => {
            lower_expr::lower_call(node, method.as_ref(), instance.as_deref(), &[], ctx)
        }
        NodeKind::FuncCall { func, args } => lower_expr::lower_func_call(node, func, args, ctx),
        NodeKind::And(lhs, rhs) => lower_expr::lower_and(lhs, rhs, ctx),
        NodeKind::Or(lhs, rhs) => lower_expr::lower_or(lhs, rhs, ctx),
        NodeKind::OptionalMember { target, member, eq } => {
            lower_expr::lower_optional_member(node, target, member, eq.as_ref(), ctx)
        }
        NodeKind::Coalesce { lhs, rhs, eq } => lower_expr::lower_coalesce(lhs, rhs, eq.as_ref(), ctx),
        NodeKind::Block { label, body } => lower_stmt::lower_block(node, label, body, ctx),
        NodeKind::Let { targets, value } => Lowered::new(lower_stmt::lower_let(targets, value, ctx)),
        NodeKind::LetIn { label, targets, value, body } => lower_stmt::lower_let_in(label, targets, value, body, ctx),
        NodeKind::Assign { targets, value } => Lowered::new(lower_stmt::lower_assign(node, targets, value, ctx)),
        NodeKind::If { branches, otherwise } => lower_stmt::lower_if(node, branches, otherwise.as_deref(), ctx),
        NodeKind::While { cond, body } => Lowered::new(lower_stmt::lower_while(cond, body, ctx)),
        NodeKind::Loop { body } => Lowered::new(lower_stmt::lower_loop(body, ctx)),
        NodeKind::For { label, var, iterable, body } => {
            Lowered::new(lower_stmt::lower_for(node, label, var, iterable, body, ctx))
        }
        NodeKind::Continue => Lowered::new(ctx.prims.jump(&ctx.continue_target())),
        NodeKind::Break => Lowered::new(ctx.prims.jump(&ctx.break_target())),
        NodeKind::Array { elem, init } => lower_objects::lower_array(node, elem, init, ctx),
    }
}

/// Lower `node` in statement position: its value, if any, is discarded
/// one component at a time.
pub fn lower_stmt(node: &TypedNode, ctx: &mut LoweringContext<'_>) -> Fragment {
    let lowered = lower_node(node, ctx);
    let mut code = lowered.consume(ctx);
    if !code.is_empty() {
        code.append(ctx.prims.pop(&node.ty));
    }
    code
}

/// Compile a unit with the textual assembly primitives.
pub fn compile(unit: &CompileUnit, options: &CompileOptions) -> Result<CompiledProgram, Vec<LowerError>> {
    compile_with(unit, options, &AssemblyPrimitives)
}

/// Compile a unit with an arbitrary primitive implementation.
pub fn compile_with(
    unit: &CompileUnit,
    options: &CompileOptions,
    prims: &dyn Primitives,
) -> Result<CompiledProgram, Vec<LowerError>> {
    let mut ctx = LoweringContext::new(&unit.table, options, prims);
    let blocks = function_builder::lower_program(&unit.program, &mut ctx);

    if !ctx.diagnostics.is_empty() {
        debug!("compile: {} diagnostic(s), no program produced", ctx.diagnostics.len());
        return Err(ctx.diagnostics);
    }

    let data = declare_builtins::assemble_data(&blocks, &ctx);
    let data_code = declare_builtins::emit_data(&data, prims);
    let usage = blocks
        .iter()
        .map(|b| {
            let slots = ctx.pool.stats(&b.scope).cloned().unwrap_or_default();
            SlotUsage {
                function: b.scope.qualified(),
                retains: slots.retains,
                releases: slots.releases,
                minted: slots.minted(),
            }
        })
        .collect();
    debug!("compile: {} block(s), {} data slot(s)", blocks.len(), data.len());
    Ok(CompiledProgram::new(data, data_code, blocks).with_slot_usage(usage))
}
