mod common;

use common::*;
use slate_core::ast::{NodeKind, Program, Ty, TypedNode};
use slate_core::ir::Instruction;
use slate_core::symbol::{AnonKind, AnonLabel, Label, LabelKind};

fn loop_label(ordinal: u32, part: u16) -> Label {
    Label::Anon(AnonLabel { kind: AnonKind::Loop, qualifier: entry_scope(), ordinal, part })
}

fn jumps_to(code: &[Instruction], target: &Label) -> usize {
    code.iter().filter(|op| **op == Instruction::jump(target.clone())).count()
}

#[test]
fn if_without_else_needs_a_single_label() {
    let mut fx = Fixture::new();
    let x = var(&entry_scope(), "x", int());
    let cond = fx.bool_lit(true);
    let body = assign(&x, fx.int_lit(1));
    let program = fx.compile_entry(vec![if_(vec![(cond, body)], None, Ty::Unit)]);
    let code = entry_body(&program);
    assert_eq!(count_labels(&code, LabelKind::Branch), 1);
    assert_eq!(code.iter().filter(|op| matches!(op, Instruction::JumpIfFalse(_))).count(), 1);
}

#[test]
fn elif_chain_with_else_yields_a_value() {
    let mut fx = Fixture::new();
    let a = var(&entry_scope(), "a", boolean());
    let b = var(&entry_scope(), "b", boolean());
    let y = var(&entry_scope(), "y", int());
    let chain = if_(
        vec![(read(&a), fx.int_lit(1)), (read(&b), fx.int_lit(2))],
        Some(fx.int_lit(3)),
        int(),
    );
    let program = fx.compile_entry(vec![let_(vec![y.clone()], chain)]);
    let code = entry_body(&program);

    assert_eq!(count_labels(&code, LabelKind::Branch), 3);
    assert_eq!(code.iter().filter(|op| matches!(op, Instruction::JumpIfFalse(_))).count(), 2);
    // every arm leaves its value for the single store into `y`
    assert_eq!(code[code.len() - 2], push(y));
    assert_eq!(code[code.len() - 1], Instruction::Copy);
}

#[test]
fn while_loop_continue_and_break_target_its_labels() {
    let mut fx = Fixture::new();
    let flag = var(&entry_scope(), "flag", boolean());
    let cont = TypedNode::unit(NodeKind::Continue);
    let brk = TypedNode::unit(NodeKind::Break);
    let inner_cond = fx.bool_lit(false);
    let body = block(&entry_scope(), 0, Ty::Unit, vec![if_(vec![(inner_cond, cont)], None, Ty::Unit), brk]);
    let program = fx.compile_entry(vec![while_(read(&flag), body)]);
    let code = entry_body(&program);

    assert_eq!(count_labels(&code, LabelKind::Loop), 2);
    // back edge plus `continue`
    assert_eq!(jumps_to(&code, &loop_label(0, 0)), 2);
    assert_eq!(jumps_to(&code, &loop_label(0, 1)), 1);
    assert_eq!(code.first(), Some(&Instruction::label(loop_label(0, 0))));
    assert_eq!(code.last(), Some(&Instruction::label(loop_label(0, 1))));
}

#[test]
fn infinite_loop_exits_through_break() {
    let fx = Fixture::new();
    let body = TypedNode::unit(NodeKind::Break);
    let node = TypedNode::unit(NodeKind::Loop { body: Box::new(body) });
    let program = fx.compile_entry(vec![node]);
    let code = entry_body(&program);
    assert_eq!(count_labels(&code, LabelKind::Loop), 2);
    assert_eq!(jumps_to(&code, &loop_label(0, 1)), 1);
    assert_eq!(jumps_to(&code, &loop_label(0, 0)), 1);
}

#[test]
fn for_loop_over_an_array_uses_three_labels() {
    let fx = Fixture::new();
    let items = var(&entry_scope(), "items", int_array());
    let i = var(&entry_scope().child("for0"), "i", int());
    let node = TypedNode::unit(NodeKind::For {
        label: AnonLabel::new(AnonKind::For, entry_scope(), 0),
        var: i.clone(),
        iterable: Box::new(read(&items)),
        body: Box::new(TypedNode::unit(NodeKind::Continue)),
    });
    let program = fx.compile_entry(vec![node]);
    let code = entry_body(&program);

    assert_eq!(count_labels(&code, LabelKind::Loop), 3);
    for (owner, name, arity) in [(int_array(), "get_Length", 0), (int_array(), "Get", 1), (int(), "op_LessThan", 2)] {
        assert_eq!(count_externs(&code, &fx.method(&owner, name, arity).extern_name), 1, "{}", name);
    }
    // `continue` lands on the index increment, not the loop head
    let cont = code
        .iter()
        .filter_map(|op| match op {
            Instruction::Label(Label::Anon(a)) if a.kind == AnonKind::Loop && a.part == 1 => Some(Label::Anon(a.clone())),
            _ => None,
        })
        .next()
        .expect("continue label");
    assert_eq!(jumps_to(&code, &cont), 1);
    // each element is read straight into the loop variable
    assert!(program.data_decl(&slate_core::symbol::Named::identifier(&i)).is_some());
}

#[test]
fn for_loop_without_iteration_methods_is_reported() {
    let fx = Fixture::bare();
    let items = var(&entry_scope(), "items", int_array());
    let node = TypedNode::unit(NodeKind::For {
        label: AnonLabel::new(AnonKind::For, entry_scope(), 0),
        var: var(&entry_scope(), "i", int()),
        iterable: Box::new(read(&items)),
        body: Box::new(TypedNode::unit(NodeKind::Continue)),
    });
    let errs = compile_err(&fx.unit(Program { functions: vec![], entry: vec![node] }));
    assert!(errs.iter().all(|e| e.kind == slate_core::LowerErrorKind::MissingIntrinsic));
    assert_eq!(errs.len(), 4);
}

#[test]
#[should_panic(expected = "outside of a loop")]
fn break_outside_a_loop_is_a_contract_violation() {
    let fx = Fixture::new();
    fx.compile_entry(vec![TypedNode::unit(NodeKind::Break)]);
}

#[test]
fn block_value_survives_its_scope() {
    let mut fx = Fixture::new();
    let inner = entry_scope().child("block0");
    let t = var(&inner, "t", int());
    let y = var(&entry_scope(), "y", int());
    let one = fx.int_lit(1);
    let two = fx.int_lit(2);
    let sum = fx.add(one, two);
    let four = fx.int_lit(4);
    let value = block(&entry_scope(), 0, int(), vec![let_(vec![t.clone()], sum), fx.add(read(&t), four)]);
    let program = fx.compile_entry(vec![let_(vec![y.clone()], value), read(&y)]);

    let usage = &program.slot_usage[0];
    assert_eq!(usage.retains, usage.releases);
    // both additions share one slot: the first is free before the second
    assert_eq!(usage.minted, 1);
}

#[test]
fn let_in_binds_for_the_body_only() {
    let mut fx = Fixture::new();
    let scope = entry_scope().child("letin0");
    let t = var(&scope, "t", int());
    let value = fx.int_lit(5);
    let one = fx.int_lit(1);
    let body = fx.add(read(&t), one);
    let node = TypedNode::new(
        int(),
        NodeKind::LetIn {
            label: AnonLabel::new(AnonKind::LetIn, entry_scope(), 0),
            targets: vec![t.clone()],
            value: Box::new(value),
            body: Box::new(body),
        },
    );
    let program = fx.compile_entry(vec![node]);
    let code = entry_body(&program);
    assert_eq!(code[1], push(t));
    assert_eq!(code[2], Instruction::Copy);
    assert!(matches!(code.last(), Some(Instruction::Pop)));
    assert!(program.slot_usage.iter().all(|u| u.retains == u.releases));
}
