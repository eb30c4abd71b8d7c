//! file: core/src/ir/lower/lower_expr.rs
//! description: expression lowering helpers.
//!
//! Operands, extern calls, user function calls and the short-circuit
//! operators (`&&`, `||`, `?.`, `??`). Each helper returns the code that
//! leaves the value on the stack together with the temporaries holding it.

use super::primitives::{CallSite, IF_ELSE_LABELS};
use super::{declare_builtins, lower_node, Lowered, LoweringContext};
use crate::ast::{NodeKind, TypedNode};
use crate::ir::op::Fragment;
use crate::ir::pool::OutValue;
use crate::symbol::{AnonKind, FuncLabel, Label, MethodRef};

/// Literals, variables, `this`, the `?.` receiver and tuples.
pub fn lower_operand(node: &TypedNode, ctx: &mut LoweringContext<'_>) -> Lowered {
    match &node.kind {
        NodeKind::Literal(lit) => Lowered::new(ctx.prims.get(&Label::Literal(lit.clone()))),
        NodeKind::Var(var) => Lowered::new(ctx.prims.get(&Label::Var(var.clone()))),
        NodeKind::This => {
            let slot = declare_builtins::this_slot(&ctx.options.types);
            Lowered::new(ctx.prims.get(&Label::Var(slot)))
        }
        NodeKind::Receiver => {
            let slot = ctx.receiver();
            Lowered::new(ctx.prims.get(&slot))
        }
        NodeKind::Tuple(items) => {
            let (code, held) = lower_sequence(items, ctx);
            Lowered::holding(code, held)
        }
        other => panic!("lower_operand reached non-operand node `{}`", other.tag()),
    }
}

/// Lower nodes left to right, concatenating code and temporaries.
pub fn lower_sequence(nodes: &[TypedNode], ctx: &mut LoweringContext<'_>) -> (Fragment, Vec<OutValue>) {
    let mut code = Fragment::new();
    let mut held = Vec::new();
    for n in nodes {
        let l = lower_node(n, ctx);
        code.append(l.code);
        held.extend(l.held);
    }
    (code, held)
}

/// Extern method or getter call. An absent callee records a diagnostic
/// and yields no code; the children are not lowered.
pub fn lower_call(
    node: &TypedNode,
    method: Option<&MethodRef>,
    instance: Option<&TypedNode>,
    args: &[TypedNode],
    ctx: &mut LoweringContext<'_>,
) -> Lowered {
    let method = match method {
        Some(m) => m,
        None => {
            ctx.null_callee(node.describe(), node.get_location());
            return Lowered::empty();
        }
    };

    let mut inputs = Fragment::new();
    let mut consumed = Vec::new();
    match instance {
        Some(inst) => {
            let l = lower_node(inst, ctx);
            inputs.append(l.code);
            consumed.extend(l.held);
        }
        None if method.instance => {
            let slot = declare_builtins::this_slot(&ctx.options.types);
            inputs.append(ctx.prims.get(&Label::Var(slot)));
        }
        None => {}
    }
    let (arg_code, arg_held) = lower_sequence(args, ctx);
    inputs.append(arg_code);
    consumed.extend(arg_held);

    let outs: Vec<OutValue> = method.outputs.iter().map(|t| ctx.retain(t)).collect();
    let out_labels: Vec<Label> = outs.iter().map(|o| Label::OutValue(o.label().clone())).collect();
    let code = ctx.prims.eval_method(method, inputs, &out_labels);
    ctx.release_all(consumed);
    Lowered::holding(code, outs)
}

/// User function call through the return-address protocol.
pub fn lower_func_call(node: &TypedNode, func: &FuncLabel, args: &[TypedNode], ctx: &mut LoweringContext<'_>) -> Lowered {
    if ctx.is_hook(func) {
        ctx.hook_call(func, node.get_location());
        return Lowered::empty();
    }
    let (inputs, consumed) = lower_sequence(args, ctx);

    let indirect = ctx.mint(AnonKind::Indirect);
    let continuation = ctx.mint(AnonKind::EvalFunc);
    ctx.register_indirect(indirect.clone(), continuation.clone());

    let slots = func.return_slots();
    let outs: Vec<OutValue> = slots.iter().map(|s| ctx.retain(&s.ty)).collect();
    let results = slots.into_iter().zip(outs.iter().map(|o| o.label().clone())).collect();
    let site = CallSite { indirect, continuation, results };

    let code = ctx.prims.eval_func(func, inputs, &site);
    ctx.release_all(consumed);
    Lowered::holding(code, outs)
}

/// `a && b` as `if a then b else false`.
pub fn lower_and(lhs: &TypedNode, rhs: &TypedNode, ctx: &mut LoweringContext<'_>) -> Lowered {
    let labels = ctx.mint_set(AnonKind::Branch, IF_ELSE_LABELS);
    let cond = lower_node(lhs, ctx).consume(ctx);
    let then = lower_node(rhs, ctx);
    let f = ctx.bool_literal(false);
    let code = ctx.prims.if_else(cond, then.code, ctx.prims.get(&f), &labels);
    Lowered::holding(code, then.held)
}

/// `a || b` as `if a then true else b`.
pub fn lower_or(lhs: &TypedNode, rhs: &TypedNode, ctx: &mut LoweringContext<'_>) -> Lowered {
    let labels = ctx.mint_set(AnonKind::Branch, IF_ELSE_LABELS);
    let cond = lower_node(lhs, ctx).consume(ctx);
    let t = ctx.bool_literal(true);
    let otherwise = lower_node(rhs, ctx);
    let code = ctx.prims.if_else(cond, ctx.prims.get(&t), otherwise.code, &labels);
    Lowered::holding(code, otherwise.held)
}

/// Evaluate `operand` once into a fresh temporary and build the
/// `temp == null` test. Returns (code storing the temp, test code, temp).
fn store_and_test_null(
    operand: &TypedNode,
    eq: &MethodRef,
    ctx: &mut LoweringContext<'_>,
) -> (Fragment, Fragment, OutValue) {
    let value = lower_node(operand, ctx);
    let tmp = ctx.retain(&operand.ty);
    let tmp_label = Label::OutValue(tmp.label().clone());
    let store = ctx.prims.set(value.code, &tmp_label);
    ctx.release_all(value.held);

    let null = ctx.null_literal(&operand.ty);
    let is_null = ctx.retain(&eq.result_ty());
    let is_null_label = Label::OutValue(is_null.label().clone());
    let inputs = ctx.prims.get(&tmp_label).then(ctx.prims.get(&null));
    let test = ctx.prims.eval_method(eq, inputs, std::slice::from_ref(&is_null_label));
    // consumed by the branch right after the test
    ctx.pool.release(is_null);
    (store, test, tmp)
}

/// `target?.member`: null when `target` is null, otherwise `member` with
/// the receiver bound to the evaluated target. Without an equality
/// operator for the target type the result is always the null literal.
pub fn lower_optional_member(
    node: &TypedNode,
    target: &TypedNode,
    member: &TypedNode,
    eq: Option<&MethodRef>,
    ctx: &mut LoweringContext<'_>,
) -> Lowered {
    let eq = match eq {
        Some(m) => m,
        None => {
            let null = ctx.null_literal(&node.ty);
            return Lowered::new(ctx.prims.get(&null));
        }
    };

    let labels = ctx.mint_set(AnonKind::Branch, IF_ELSE_LABELS);
    let (store, test, tmp) = store_and_test_null(target, eq, ctx);
    let null_result = ctx.null_literal(&node.ty);

    ctx.push_receiver(Label::OutValue(tmp.label().clone()));
    let access = lower_node(member, ctx);
    ctx.pop_receiver();

    let code = store.then(ctx.prims.if_else(test, ctx.prims.get(&null_result), access.code, &labels));
    let mut held = access.held;
    held.push(tmp);
    Lowered::holding(code, held)
}

/// `lhs ?? rhs`: `rhs` when `lhs` is null, otherwise `lhs` evaluated once.
/// Without an equality operator only `rhs` is lowered.
pub fn lower_coalesce(
    lhs: &TypedNode,
    rhs: &TypedNode,
    eq: Option<&MethodRef>,
    ctx: &mut LoweringContext<'_>,
) -> Lowered {
    let eq = match eq {
        Some(m) => m,
        None => return lower_node(rhs, ctx),
    };

    let labels = ctx.mint_set(AnonKind::Branch, IF_ELSE_LABELS);
    let (store, test, tmp) = store_and_test_null(lhs, eq, ctx);
    let fallback = lower_node(rhs, ctx);
    let kept = ctx.prims.get(&Label::OutValue(tmp.label().clone()));

    let code = store.then(ctx.prims.if_else(test, fallback.code, kept, &labels));
    let mut held = fallback.held;
    held.push(tmp);
    Lowered::holding(code, held)
}
