//! file: core/src/ir/lower/lower_objects.rs
//! description: array constructor lowering.
//!
//! Four strategies, chosen by the initializer shape: a fixed element list,
//! an inclusive range, an inclusive stepped range and a spread copy of an
//! existing array. Element temporaries stay retained until the whole
//! construction has been emitted.

use super::primitives::{
    ArrayBuild, Counter, IntOps, RangeSlots, StepOps, ARRAY_RANGE_LABELS, ARRAY_STEPPED_LABELS,
};
use super::{lower_node, Lowered, LoweringContext};
use crate::ast::{ArrayInit, Location, NodeKind, Ty, TypedNode};
use crate::ir::pool::OutValue;
use crate::symbol::{AnonKind, Label, MethodRef};

pub fn lower_array(node: &TypedNode, elem: &Ty, init: &ArrayInit, ctx: &mut LoweringContext<'_>) -> Lowered {
    let arr_ty = Ty::array_of(elem.clone());
    let loc = node.get_location();
    match init {
        ArrayInit::Elements(items) => lower_elements(&arr_ty, items, loc, ctx),
        ArrayInit::Range { first, last } => lower_range(&arr_ty, first, None, last, loc, ctx),
        ArrayInit::Stepped { first, step, last } => {
            if is_zero_literal(step) {
                lower_single(&arr_ty, first, last, loc, ctx)
            } else {
                lower_range(&arr_ty, first, Some(step), last, loc, ctx)
            }
        }
        ArrayInit::Spread(source) => lower_spread(&arr_ty, source, loc, ctx),
    }
}

fn is_zero_literal(node: &TypedNode) -> bool {
    match &node.kind {
        NodeKind::Literal(lit) => lit.text.trim().parse::<i64>() == Ok(0),
        _ => false,
    }
}

fn out_label(value: &OutValue) -> Label {
    Label::OutValue(value.label().clone())
}

fn array_methods<'t>(
    arr_ty: &Ty,
    loc: Option<&Location>,
    ctx: &mut LoweringContext<'t>,
) -> Option<(&'t MethodRef, &'t MethodRef)> {
    let ctor = ctx.require_method(arr_ty, "ctor", 1, loc);
    let set = ctx.require_method(arr_ty, "Set", 2, loc);
    Some((ctor?, set?))
}

fn int_ops<'t>(loc: Option<&Location>, ctx: &mut LoweringContext<'t>) -> Option<IntOps<'t>> {
    let int = ctx.int_ty();
    let add = ctx.require_method(&int, "op_Addition", 2, loc);
    let sub = ctx.require_method(&int, "op_Subtraction", 2, loc);
    let less = ctx.require_method(&int, "op_LessThan", 2, loc);
    Some(IntOps { add: add?, sub: sub?, less: less? })
}

fn step_ops<'t>(loc: Option<&Location>, ctx: &mut LoweringContext<'t>) -> Option<StepOps<'t>> {
    let int = ctx.int_ty();
    let div = ctx.require_method(&int, "op_Division", 2, loc);
    let greater = ctx.require_method(&int, "op_GreaterThan", 2, loc);
    Some(StepOps { div: div?, greater: greater? })
}

/// `[| a; b; c |]`
fn lower_elements(arr_ty: &Ty, items: &[TypedNode], loc: Option<&Location>, ctx: &mut LoweringContext<'_>) -> Lowered {
    let (ctor, set) = match array_methods(arr_ty, loc, ctx) {
        Some(m) => m,
        None => return Lowered::empty(),
    };
    let arr = ctx.retain(arr_ty);
    let arr_label = out_label(&arr);
    let len = ctx.int_literal(items.len() as i64);

    let mut held = Vec::new();
    let mut elements = Vec::with_capacity(items.len());
    for (k, item) in items.iter().enumerate() {
        let index = ctx.int_literal(k as i64);
        let l = lower_node(item, ctx);
        held.extend(l.held);
        elements.push((index, l.code));
    }

    let build = ArrayBuild { arr: &arr_label, ctor, set };
    let code = ctx.prims.array_bounded(build, &len, elements);
    ctx.release_all(held);
    Lowered::holding(code, vec![arr])
}

/// Stepped range whose step is the literal zero: one element, `first`.
/// `last` is still evaluated for its side effects.
fn lower_single(
    arr_ty: &Ty,
    first: &TypedNode,
    last: &TypedNode,
    loc: Option<&Location>,
    ctx: &mut LoweringContext<'_>,
) -> Lowered {
    let (ctor, set) = match array_methods(arr_ty, loc, ctx) {
        Some(m) => m,
        None => return Lowered::empty(),
    };
    let arr = ctx.retain(arr_ty);
    let arr_label = out_label(&arr);
    let one = ctx.int_literal(1);
    let zero = ctx.int_literal(0);

    let f = lower_node(first, ctx);
    let l = lower_node(last, ctx);
    let build = ArrayBuild { arr: &arr_label, ctor, set };
    let mut code = ctx.prims.array_bounded(build, &one, vec![(zero, f.code)]);
    if !l.code.is_empty() {
        code.append(l.code);
        code.append(ctx.prims.pop(&last.ty));
    }
    ctx.release_all(f.held);
    ctx.release_all(l.held);
    Lowered::holding(code, vec![arr])
}

/// `first .. last` or `first .. step .. last`, both inclusive.
fn lower_range(
    arr_ty: &Ty,
    first: &TypedNode,
    step: Option<&TypedNode>,
    last: &TypedNode,
    loc: Option<&Location>,
    ctx: &mut LoweringContext<'_>,
) -> Lowered {
    let methods = array_methods(arr_ty, loc, ctx);
    let ops = int_ops(loc, ctx);
    let stepping = match step {
        Some(_) => step_ops(loc, ctx).map(Some),
        None => Some(None),
    };
    let ((ctor, set), ops, stepping) = match (methods, ops, stepping) {
        (Some(m), Some(o), Some(s)) => (m, o, s),
        _ => return Lowered::empty(),
    };

    let int = ctx.int_ty();
    let arr = ctx.retain(arr_ty);
    let mut temps = vec![
        ctx.retain(&int), // first
        ctx.retain(&int), // last
        ctx.retain(&int), // current
        ctx.retain(&int), // len
        ctx.retain(&int), // index
        ctx.retain(&ops.less.result_ty()),
    ];
    let step_slot = step.map(|_| ctx.retain(&int));
    let zero = ctx.int_literal(0);
    let one = ctx.int_literal(1);

    let slots = RangeSlots {
        first: out_label(&temps[0]),
        last: out_label(&temps[1]),
        step: step_slot.as_ref().map(out_label),
        current: out_label(&temps[2]),
        counter: Counter {
            len: out_label(&temps[3]),
            index: out_label(&temps[4]),
            cond: out_label(&temps[5]),
            zero,
            one,
        },
    };
    let arr_label = out_label(&arr);
    let build = ArrayBuild { arr: &arr_label, ctor, set };

    let mut held = Vec::new();
    let f = lower_node(first, ctx);
    held.extend(f.held);
    let code = match (step, stepping) {
        (Some(step_node), Some(step_ops)) => {
            let s = lower_node(step_node, ctx);
            held.extend(s.held);
            let l = lower_node(last, ctx);
            held.extend(l.held);
            let labels = ctx.mint_set(AnonKind::For, ARRAY_STEPPED_LABELS);
            ctx.prims.array_stepped(build, ops, step_ops, &slots, f.code, s.code, l.code, &labels)
        }
        _ => {
            let l = lower_node(last, ctx);
            held.extend(l.held);
            let labels = ctx.mint_set(AnonKind::For, ARRAY_RANGE_LABELS);
            ctx.prims.array_range(build, ops, &slots, f.code, l.code, &labels)
        }
    };

    ctx.release_all(held);
    temps.extend(step_slot);
    ctx.release_all(temps);
    Lowered::holding(code, vec![arr])
}

/// `[| yield! source |]`: a clone of the source array.
fn lower_spread(arr_ty: &Ty, source: &TypedNode, loc: Option<&Location>, ctx: &mut LoweringContext<'_>) -> Lowered {
    let clone = match ctx.require_method(arr_ty, "Clone", 0, loc) {
        Some(m) => m,
        None => return Lowered::empty(),
    };
    let src = lower_node(source, ctx);
    let out = ctx.retain(arr_ty);
    let code = ctx.prims.array_spread(src.code, clone, &out_label(&out));
    ctx.release_all(src.held);
    Lowered::holding(code, vec![out])
}
