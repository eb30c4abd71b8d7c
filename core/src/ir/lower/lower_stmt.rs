//! Lowering helpers for statement-shaped nodes.
//!
//! Blocks, bindings, assignment, branch chains and loops. Loop targets
//! are pushed on the context before the body is lowered so nested
//! `continue` / `break` resolve without re-walking the tree.

use log::warn;

use super::primitives::{
    if_elif_labels, Counter, ForLoop, FOR_LOOP_LABELS, IF_THEN_LABELS, LOOP_LABELS, WHILE_LABELS,
};
use super::{declare_builtins, lower_node, lower_stmt, Lowered, LoweringContext};
use crate::ast::{Branch, LeftValue, TypedNode};
use crate::ir::op::Fragment;
use crate::ir::pool::OutValue;
use crate::symbol::{AnonKind, AnonLabel, Label, VarLabel};

/// `{ s1; s2; ...; value }`. All but the last node are statements; the
/// last one is the block's value unless the block has unit type.
pub fn lower_block(node: &TypedNode, label: &AnonLabel, body: &[TypedNode], ctx: &mut LoweringContext<'_>) -> Lowered {
    let scope = ctx.enter_scope(label.segment());
    let (statements, value) = match body.split_last() {
        Some((last, rest)) if !node.ty.is_unit() => (rest, Some(last)),
        _ => (body, None),
    };

    let mut code = Fragment::new();
    for s in statements {
        code.append(lower_stmt(s, ctx));
    }
    let held = match value {
        Some(v) => {
            let l = lower_node(v, ctx);
            code.append(l.code);
            l.held
        }
        None => Vec::new(),
    };
    let held = ctx.hand_out(&scope, held);
    Lowered::holding(code, held)
}

/// Evaluate `value` once, then bind the targets in reverse order.
pub fn lower_let(targets: &[VarLabel], value: &TypedNode, ctx: &mut LoweringContext<'_>) -> Fragment {
    let v = lower_node(value, ctx);
    if v.code.is_empty() && value.ty.width() > 0 {
        // unresolved value, already reported
        ctx.release_all(v.held);
        return Fragment::new();
    }
    let mut code = v.code;
    for target in targets.iter().rev() {
        code.append(ctx.prims.copy_into(&Label::Var(target.clone())));
    }
    ctx.release_all(v.held);
    code
}

pub fn lower_let_in(
    label: &AnonLabel,
    targets: &[VarLabel],
    value: &TypedNode,
    body: &TypedNode,
    ctx: &mut LoweringContext<'_>,
) -> Lowered {
    let scope = ctx.enter_scope(label.segment());
    let mut code = lower_let(targets, value, ctx);
    let b = lower_node(body, ctx);
    code.append(b.code);
    let held = ctx.hand_out(&scope, b.held);
    Lowered::holding(code, held)
}

/// `lhs <- value`. Exactly one left-value is lowered; any other count is
/// a silent no-op.
pub fn lower_assign(node: &TypedNode, targets: &[LeftValue], value: &TypedNode, ctx: &mut LoweringContext<'_>) -> Fragment {
    let target = match targets {
        [single] => single,
        _ => {
            warn!(
                "assignment with {} left-values in `{}` lowered as a no-op",
                targets.len(),
                ctx.function().qualified()
            );
            return Fragment::new();
        }
    };

    match target {
        LeftValue::Var(var) => {
            let v = lower_node(value, ctx);
            let code = ctx.prims.eval_assign(v.code, &Label::Var(var.clone()));
            ctx.release_all(v.held);
            code
        }
        LeftValue::Setter { instance, method } => {
            let setter = match method {
                Some(m) => m,
                None => {
                    ctx.null_callee("setter", node.get_location());
                    return Fragment::new();
                }
            };
            let mut held = Vec::new();
            let receiver = match instance {
                Some(inst) => {
                    let l = lower_node(inst, ctx);
                    held.extend(l.held);
                    l.code
                }
                None if setter.instance => {
                    let slot = declare_builtins::this_slot(&ctx.options.types);
                    ctx.prims.get(&Label::Var(slot))
                }
                None => Fragment::new(),
            };
            let v = lower_node(value, ctx);
            held.extend(v.held);
            let code = ctx.prims.eval_setter(receiver, v.code, setter);
            ctx.release_all(held);
            code
        }
    }
}

/// Lower a branch body as a value (`value_pos`) or as a statement.
fn lower_arm(body: &TypedNode, value_pos: bool, ctx: &mut LoweringContext<'_>, held: &mut Vec<OutValue>) -> Fragment {
    if value_pos {
        let l = lower_node(body, ctx);
        held.extend(l.held);
        l.code
    } else {
        lower_stmt(body, ctx)
    }
}

/// `if` / `elif` / `else` chains. Without `else` the branches are
/// statements and the node has unit type.
pub fn lower_if(node: &TypedNode, branches: &[Branch], otherwise: Option<&TypedNode>, ctx: &mut LoweringContext<'_>) -> Lowered {
    let value_pos = otherwise.is_some() && !node.ty.is_unit();
    let labels = match (otherwise, branches.len()) {
        (None, 1) => ctx.mint_set(AnonKind::Branch, IF_THEN_LABELS),
        (_, n) => ctx.mint_set(AnonKind::Branch, if_elif_labels(n)),
    };

    let mut held = Vec::new();
    let mut arms = Vec::with_capacity(branches.len());
    for b in branches {
        let cond = lower_node(&b.cond, ctx).consume(ctx);
        let body = lower_arm(&b.body, value_pos, ctx, &mut held);
        arms.push((cond, body));
    }

    let code = match otherwise {
        None if arms.len() == 1 => {
            let (cond, body) = arms.remove(0);
            ctx.prims.if_then(cond, body, &labels)
        }
        None => ctx.prims.if_elif(arms, &labels),
        Some(other) => {
            let other_code = lower_arm(other, value_pos, ctx, &mut held);
            if arms.len() == 1 {
                let (cond, body) = arms.remove(0);
                ctx.prims.if_else(cond, body, other_code, &labels)
            } else {
                ctx.prims.if_elif_else(arms, other_code, &labels)
            }
        }
    };
    Lowered::holding(code, held)
}

/// Lower a loop body inside its own scope with the loop targets bound.
fn lower_loop_body(body: &TypedNode, cont: AnonLabel, brk: AnonLabel, ctx: &mut LoweringContext<'_>) -> Fragment {
    let scope = ctx.enter_scope(cont.segment());
    ctx.push_loop(cont, brk);
    let code = lower_stmt(body, ctx);
    ctx.pop_loop();
    ctx.leave_scope(&scope);
    code
}

pub fn lower_while(cond: &TypedNode, body: &TypedNode, ctx: &mut LoweringContext<'_>) -> Fragment {
    let labels = ctx.mint_set(AnonKind::Loop, WHILE_LABELS);
    let cond_code = lower_node(cond, ctx).consume(ctx);
    let body_code = lower_loop_body(body, labels.get(0), labels.get(1), ctx);
    ctx.prims.while_loop(cond_code, body_code, &labels)
}

pub fn lower_loop(body: &TypedNode, ctx: &mut LoweringContext<'_>) -> Fragment {
    let labels = ctx.mint_set(AnonKind::Loop, LOOP_LABELS);
    let body_code = lower_loop_body(body, labels.get(0), labels.get(1), ctx);
    ctx.prims.infinite_loop(body_code, &labels)
}

/// `for var in iterable do body` over an array: the array, its length,
/// the index and the loop condition live in temporaries for the whole
/// loop; each element is read straight into `var`.
pub fn lower_for(
    node: &TypedNode,
    label: &AnonLabel,
    var: &VarLabel,
    iterable: &TypedNode,
    body: &TypedNode,
    ctx: &mut LoweringContext<'_>,
) -> Fragment {
    let arr_ty = iterable.ty.clone();
    let int = ctx.int_ty();
    let loc = node.get_location();
    let length = ctx.require_method(&arr_ty, "get_Length", 0, loc);
    let get = ctx.require_method(&arr_ty, "Get", 1, loc);
    let less = ctx.require_method(&int, "op_LessThan", 2, loc);
    let add = ctx.require_method(&int, "op_Addition", 2, loc);
    let (length, get, less, add) = match (length, get, less, add) {
        (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
        _ => return Fragment::new(),
    };

    let scope = ctx.enter_scope(label.segment());
    let labels = ctx.mint_set(AnonKind::Loop, FOR_LOOP_LABELS);
    let it = lower_node(iterable, ctx);

    let arr = ctx.retain(&arr_ty);
    let len = ctx.retain(&int);
    let index = ctx.retain(&int);
    let cond = ctx.retain(&less.result_ty());
    let zero = ctx.int_literal(0);
    let one = ctx.int_literal(1);

    ctx.push_loop(labels.get(1), labels.get(2));
    let body_code = lower_stmt(body, ctx);
    ctx.pop_loop();

    let plan = ForLoop {
        var: Label::Var(var.clone()),
        arr: Label::OutValue(arr.label().clone()),
        counter: Counter {
            len: Label::OutValue(len.label().clone()),
            index: Label::OutValue(index.label().clone()),
            cond: Label::OutValue(cond.label().clone()),
            zero,
            one,
        },
        length,
        get,
        less,
        add,
    };
    let code = ctx.prims.for_loop(it.code, &plan, body_code, &labels);

    ctx.release_all(it.held);
    ctx.release_all(vec![arr, len, index, cond]);
    ctx.leave_scope(&scope);
    code
}
