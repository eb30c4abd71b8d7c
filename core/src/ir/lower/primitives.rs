//! file: core/src/ir/lower/primitives.rs
//! description: instruction-construction contract used by the lowering
//! dispatcher.
//!
//! `Primitives` is split in two layers. The required methods map one to
//! one onto target instructions. The provided methods compose them into
//! the structured shapes the dispatcher needs (calls, branch cascades,
//! loops, array constructors). Every provided method that takes a
//! `LabelSet` checks that the set has exactly the number of labels the
//! shape uses; the `*_LABELS` constants name those counts so callers mint
//! the right set.
//!
//! `AssemblyPrimitives` is the production implementation.

use super::super::op::{CodeAddress, DataAddress, Fragment, Instruction};
use super::super::value::{InitialValue, SyncMode};
use crate::ast::Ty;
use crate::symbol::{AnonLabel, FuncLabel, Label, LabelSet, MethodRef, OutValueLabel, VarLabel};

pub const IF_THEN_LABELS: usize = 1;
pub const IF_ELSE_LABELS: usize = 2;
pub const WHILE_LABELS: usize = 2;
pub const LOOP_LABELS: usize = 2;
pub const FOR_LOOP_LABELS: usize = 3;
pub const ARRAY_BOUNDED_LABELS: usize = 0;
pub const ARRAY_RANGE_LABELS: usize = 4;
pub const ARRAY_STEPPED_LABELS: usize = 7;
pub const ARRAY_SPREAD_LABELS: usize = 0;

/// One "next" label per branch plus the shared end label.
pub fn if_elif_labels(branches: usize) -> usize {
    branches + 1
}

/// Call-site bookkeeping for a user function call.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Data slot whose initial value is the continuation address.
    pub indirect: AnonLabel,
    pub continuation: AnonLabel,
    /// Callee return slot and the temporary it is copied into.
    pub results: Vec<(VarLabel, OutValueLabel)>,
}

/// Array value under construction plus the methods that build it.
#[derive(Debug, Clone, Copy)]
pub struct ArrayBuild<'m> {
    pub arr: &'m Label,
    pub ctor: &'m MethodRef,
    pub set: &'m MethodRef,
}

/// Integer operators of the target's int type used by every range.
#[derive(Debug, Clone, Copy)]
pub struct IntOps<'m> {
    pub add: &'m MethodRef,
    pub sub: &'m MethodRef,
    pub less: &'m MethodRef,
}

/// Extra operators of the stepped range.
#[derive(Debug, Clone, Copy)]
pub struct StepOps<'m> {
    pub div: &'m MethodRef,
    pub greater: &'m MethodRef,
}

/// Temporaries shared by the counting loops.
#[derive(Debug, Clone)]
pub struct Counter {
    pub len: Label,
    pub index: Label,
    pub cond: Label,
    pub zero: Label,
    pub one: Label,
}

/// Slots of a range constructor. `step` is only read by the stepped form.
#[derive(Debug, Clone)]
pub struct RangeSlots {
    pub first: Label,
    pub last: Label,
    pub step: Option<Label>,
    pub current: Label,
    pub counter: Counter,
}

/// Slots and methods of a `for` loop over an array.
#[derive(Debug, Clone)]
pub struct ForLoop<'m> {
    pub var: Label,
    pub arr: Label,
    pub counter: Counter,
    pub length: &'m MethodRef,
    pub get: &'m MethodRef,
    pub less: &'m MethodRef,
    pub add: &'m MethodRef,
}

fn expect_labels(shape: &str, labels: &LabelSet, expected: usize) {
    assert_eq!(
        labels.len(),
        expected,
        "{} needs {} labels, got a set of {}",
        shape,
        expected,
        labels.len()
    );
}

pub trait Primitives {
    fn get(&self, slot: &Label) -> Fragment;
    fn copy_into(&self, dst: &Label) -> Fragment;
    fn pop(&self, ty: &Ty) -> Fragment;
    fn label(&self, label: &Label) -> Fragment;
    fn jump(&self, target: &Label) -> Fragment;
    fn jump_if_false(&self, target: &Label) -> Fragment;
    fn jump_absolute(&self, address: u32) -> Fragment;
    fn indirect(&self, slot: &Label) -> Fragment;
    fn extern_call(&self, method: &MethodRef) -> Fragment;
    fn decl_data(&self, label: &Label, ty: &Ty, init: &InitialValue) -> Fragment;
    fn export_data(&self, label: &Label) -> Fragment;
    fn sync_data(&self, label: &Label, mode: SyncMode) -> Fragment;
    fn export_code(&self, label: &Label) -> Fragment;
    fn indent(&self, delta: i8) -> Fragment;

    /// `value; PUSH dst; COPY`
    fn set(&self, value: Fragment, dst: &Label) -> Fragment {
        value.then(self.copy_into(dst))
    }

    fn copy(&self, src: &Label, dst: &Label) -> Fragment {
        self.set(self.get(src), dst)
    }

    /// Push inputs, push output slots, call. Outputs are not read back.
    fn call_method(&self, method: &MethodRef, inputs: Fragment, outputs: &[Label]) -> Fragment {
        let mut code = inputs;
        for out in outputs {
            code.append(self.get(out));
        }
        code.then(self.extern_call(method))
    }

    /// `call_method` followed by a push of every output slot.
    fn eval_method(&self, method: &MethodRef, inputs: Fragment, outputs: &[Label]) -> Fragment {
        let mut code = self.call_method(method, inputs, outputs);
        for out in outputs {
            code.append(self.get(out));
        }
        code
    }

    /// Push args and the continuation slot, enter the callee, then copy
    /// each return slot into its temporary and push the temporaries.
    fn eval_func(&self, func: &FuncLabel, args: Fragment, site: &CallSite) -> Fragment {
        let mut code = args;
        code.append(self.get(&Label::Anon(site.indirect.clone())));
        code.append(self.jump(&Label::Func(func.clone())));
        code.append(self.label(&Label::Anon(site.continuation.clone())));
        for (slot, out) in &site.results {
            code.append(self.copy(&Label::Var(slot.clone()), &Label::OutValue(out.clone())));
        }
        for (_, out) in &site.results {
            code.append(self.get(&Label::OutValue(out.clone())));
        }
        code
    }

    /// `rhs; PUSH lhs; COPY`
    fn eval_assign(&self, value: Fragment, dst: &Label) -> Fragment {
        self.set(value, dst)
    }

    /// `instance; rhs; EXTERN setter`
    fn eval_setter(&self, instance: Fragment, value: Fragment, setter: &MethodRef) -> Fragment {
        instance.then(value).then(self.extern_call(setter))
    }

    fn if_then(&self, cond: Fragment, then: Fragment, labels: &LabelSet) -> Fragment {
        expect_labels("if_then", labels, IF_THEN_LABELS);
        let end = Label::Anon(labels.get(0));
        cond.then(self.jump_if_false(&end)).then(then).then(self.label(&end))
    }

    fn if_else(&self, cond: Fragment, then: Fragment, otherwise: Fragment, labels: &LabelSet) -> Fragment {
        expect_labels("if_else", labels, IF_ELSE_LABELS);
        self.if_elif_else(vec![(cond, then)], otherwise, labels)
    }

    fn if_elif(&self, branches: Vec<(Fragment, Fragment)>, labels: &LabelSet) -> Fragment {
        expect_labels("if_elif", labels, if_elif_labels(branches.len()));
        let end = Label::Anon(labels.get(branches.len()));
        let mut code = branch_cascade(self, branches, labels, &end);
        code.append(self.label(&end));
        code
    }

    fn if_elif_else(&self, branches: Vec<(Fragment, Fragment)>, otherwise: Fragment, labels: &LabelSet) -> Fragment {
        expect_labels("if_elif_else", labels, if_elif_labels(branches.len()));
        let end = Label::Anon(labels.get(branches.len()));
        let mut code = branch_cascade(self, branches, labels, &end);
        code.append(otherwise);
        code.append(self.label(&end));
        code
    }

    fn while_loop(&self, cond: Fragment, body: Fragment, labels: &LabelSet) -> Fragment {
        expect_labels("while_loop", labels, WHILE_LABELS);
        let cont = Label::Anon(labels.get(0));
        let brk = Label::Anon(labels.get(1));
        self.label(&cont)
            .then(cond)
            .then(self.jump_if_false(&brk))
            .then(body)
            .then(self.jump(&cont))
            .then(self.label(&brk))
    }

    fn infinite_loop(&self, body: Fragment, labels: &LabelSet) -> Fragment {
        expect_labels("infinite_loop", labels, LOOP_LABELS);
        let cont = Label::Anon(labels.get(0));
        let brk = Label::Anon(labels.get(1));
        self.label(&cont).then(body).then(self.jump(&cont)).then(self.label(&brk))
    }

    /// Labels: head, continue (index increment), break.
    fn for_loop(&self, iterable: Fragment, plan: &ForLoop<'_>, body: Fragment, labels: &LabelSet) -> Fragment {
        expect_labels("for_loop", labels, FOR_LOOP_LABELS);
        let head = Label::Anon(labels.get(0));
        let cont = Label::Anon(labels.get(1));
        let brk = Label::Anon(labels.get(2));
        let c = &plan.counter;

        let mut code = self.set(iterable, &plan.arr);
        code.append(self.call_method(plan.length, self.get(&plan.arr), std::slice::from_ref(&c.len)));
        code.append(self.copy(&c.zero, &c.index));
        code.append(self.label(&head));
        code.append(self.call_method(plan.less, self.get(&c.index).then(self.get(&c.len)), std::slice::from_ref(&c.cond)));
        code.append(self.get(&c.cond));
        code.append(self.jump_if_false(&brk));
        code.append(self.call_method(plan.get, self.get(&plan.arr).then(self.get(&c.index)), std::slice::from_ref(&plan.var)));
        code.append(body);
        code.append(self.label(&cont));
        code.append(self.call_method(plan.add, self.get(&c.index).then(self.get(&c.one)), std::slice::from_ref(&c.index)));
        code.append(self.jump(&head));
        code.append(self.label(&brk));
        code
    }

    /// Fixed element list: `ctor(len)`, then `Set(arr, k, elem_k)` per
    /// element, then the array itself.
    fn array_bounded(&self, build: ArrayBuild<'_>, len: &Label, elements: Vec<(Label, Fragment)>) -> Fragment {
        let mut code = self.call_method(build.ctor, self.get(len), std::slice::from_ref(build.arr));
        for (index, elem) in elements {
            let inputs = self.get(build.arr).then(self.get(&index)).then(elem);
            code.append(self.call_method(build.set, inputs, &[]));
        }
        code.append(self.get(build.arr));
        code
    }

    /// Inclusive `first .. last`. Labels: nonempty, alloc, head, end.
    fn array_range(
        &self,
        build: ArrayBuild<'_>,
        ops: IntOps<'_>,
        slots: &RangeSlots,
        first: Fragment,
        last: Fragment,
        labels: &LabelSet,
    ) -> Fragment {
        expect_labels("array_range", labels, ARRAY_RANGE_LABELS);
        let nonempty = Label::Anon(labels.get(0));
        let alloc = Label::Anon(labels.get(1));
        let head = Label::Anon(labels.get(2));
        let end = Label::Anon(labels.get(3));
        let c = &slots.counter;

        let mut code = self.set(first, &slots.first);
        code.append(self.set(last, &slots.last));
        // len = last < first ? 0 : last - first + 1
        code.append(self.call_method(ops.less, self.get(&slots.last).then(self.get(&slots.first)), std::slice::from_ref(&c.cond)));
        code.append(self.get(&c.cond));
        code.append(self.jump_if_false(&nonempty));
        code.append(self.copy(&c.zero, &c.len));
        code.append(self.jump(&alloc));
        code.append(self.label(&nonempty));
        code.append(self.call_method(ops.sub, self.get(&slots.last).then(self.get(&slots.first)), std::slice::from_ref(&c.len)));
        code.append(self.call_method(ops.add, self.get(&c.len).then(self.get(&c.one)), std::slice::from_ref(&c.len)));
        code.append(self.label(&alloc));
        code.append(fill_counting(self, build, ops, slots, &c.one, &head, &end));
        code
    }

    /// Inclusive `first .. step .. last`. The direction is decided once by
    /// comparing the step with zero; a zero step yields one element.
    /// Labels: notpos, empty, single, count, alloc, head, end.
    fn array_stepped(
        &self,
        build: ArrayBuild<'_>,
        ops: IntOps<'_>,
        step_ops: StepOps<'_>,
        slots: &RangeSlots,
        first: Fragment,
        step: Fragment,
        last: Fragment,
        labels: &LabelSet,
    ) -> Fragment {
        expect_labels("array_stepped", labels, ARRAY_STEPPED_LABELS);
        let notpos = Label::Anon(labels.get(0));
        let empty = Label::Anon(labels.get(1));
        let single = Label::Anon(labels.get(2));
        let count = Label::Anon(labels.get(3));
        let alloc = Label::Anon(labels.get(4));
        let head = Label::Anon(labels.get(5));
        let end = Label::Anon(labels.get(6));
        let c = &slots.counter;
        let step_slot = match &slots.step {
            Some(s) => s,
            None => panic!("array_stepped called without a step slot"),
        };

        let mut code = self.set(first, &slots.first);
        code.append(self.set(step, step_slot));
        code.append(self.set(last, &slots.last));

        // step > 0: empty when last < first
        code.append(self.call_method(step_ops.greater, self.get(step_slot).then(self.get(&c.zero)), std::slice::from_ref(&c.cond)));
        code.append(self.get(&c.cond));
        code.append(self.jump_if_false(&notpos));
        code.append(self.call_method(ops.less, self.get(&slots.last).then(self.get(&slots.first)), std::slice::from_ref(&c.cond)));
        code.append(self.get(&c.cond));
        code.append(self.jump_if_false(&count));
        code.append(self.jump(&empty));

        // step < 0: empty when last > first; step == 0: one element
        code.append(self.label(&notpos));
        code.append(self.call_method(ops.less, self.get(step_slot).then(self.get(&c.zero)), std::slice::from_ref(&c.cond)));
        code.append(self.get(&c.cond));
        code.append(self.jump_if_false(&single));
        code.append(self.call_method(step_ops.greater, self.get(&slots.last).then(self.get(&slots.first)), std::slice::from_ref(&c.cond)));
        code.append(self.get(&c.cond));
        code.append(self.jump_if_false(&count));

        code.append(self.label(&empty));
        code.append(self.copy(&c.zero, &c.len));
        code.append(self.jump(&alloc));

        code.append(self.label(&single));
        code.append(self.copy(&c.one, &c.len));
        code.append(self.jump(&alloc));

        // len = (last - first) / step + 1
        code.append(self.label(&count));
        code.append(self.call_method(ops.sub, self.get(&slots.last).then(self.get(&slots.first)), std::slice::from_ref(&c.len)));
        code.append(self.call_method(step_ops.div, self.get(&c.len).then(self.get(step_slot)), std::slice::from_ref(&c.len)));
        code.append(self.call_method(ops.add, self.get(&c.len).then(self.get(&c.one)), std::slice::from_ref(&c.len)));

        code.append(self.label(&alloc));
        code.append(fill_counting(self, build, ops, slots, step_slot, &head, &end));
        code
    }

    /// Copy of an existing array.
    fn array_spread(&self, source: Fragment, clone: &MethodRef, out: &Label) -> Fragment {
        self.eval_method(clone, source, std::slice::from_ref(out))
    }
}

/// `cond_k; JUMP_IF_FALSE next_k; body_k; JUMP end; LABEL next_k` per branch.
fn branch_cascade<P: Primitives + ?Sized>(
    prims: &P,
    branches: Vec<(Fragment, Fragment)>,
    labels: &LabelSet,
    end: &Label,
) -> Fragment {
    let mut code = Fragment::new();
    for (k, (cond, body)) in branches.into_iter().enumerate() {
        let next = Label::Anon(labels.get(k));
        code.append(cond);
        code.append(prims.jump_if_false(&next));
        code.append(body);
        code.append(prims.jump(end));
        code.append(prims.label(&next));
    }
    code
}

/// Allocate `len` elements and store `first`, `first + step`, ... into
/// them. Leaves the array on the stack.
fn fill_counting<P: Primitives + ?Sized>(
    prims: &P,
    build: ArrayBuild<'_>,
    ops: IntOps<'_>,
    slots: &RangeSlots,
    step: &Label,
    head: &Label,
    end: &Label,
) -> Fragment {
    let c = &slots.counter;
    let mut code = prims.call_method(build.ctor, prims.get(&c.len), std::slice::from_ref(build.arr));
    code.append(prims.copy(&c.zero, &c.index));
    code.append(prims.copy(&slots.first, &slots.current));
    code.append(prims.label(head));
    code.append(prims.call_method(ops.less, prims.get(&c.index).then(prims.get(&c.len)), std::slice::from_ref(&c.cond)));
    code.append(prims.get(&c.cond));
    code.append(prims.jump_if_false(end));
    let store = prims.get(build.arr).then(prims.get(&c.index)).then(prims.get(&slots.current));
    code.append(prims.call_method(build.set, store, &[]));
    code.append(prims.call_method(ops.add, prims.get(&slots.current).then(prims.get(step)), std::slice::from_ref(&slots.current)));
    code.append(prims.call_method(ops.add, prims.get(&c.index).then(prims.get(&c.one)), std::slice::from_ref(&c.index)));
    code.append(prims.jump(head));
    code.append(prims.label(end));
    code.append(prims.get(build.arr));
    code
}

/// Emits the target's textual assembly instructions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblyPrimitives;

impl Primitives for AssemblyPrimitives {
    fn get(&self, slot: &Label) -> Fragment {
        Fragment::single(Instruction::push(slot.clone()))
    }

    fn copy_into(&self, dst: &Label) -> Fragment {
        Fragment::from(vec![Instruction::push(dst.clone()), Instruction::Copy])
    }

    fn pop(&self, ty: &Ty) -> Fragment {
        (0..ty.width()).map(|_| Instruction::Pop).collect()
    }

    fn label(&self, label: &Label) -> Fragment {
        Fragment::single(Instruction::label(label.clone()))
    }

    fn jump(&self, target: &Label) -> Fragment {
        Fragment::single(Instruction::jump(target.clone()))
    }

    fn jump_if_false(&self, target: &Label) -> Fragment {
        Fragment::single(Instruction::jump_if_false(target.clone()))
    }

    fn jump_absolute(&self, address: u32) -> Fragment {
        Fragment::single(Instruction::Jump(CodeAddress::Absolute(address)))
    }

    fn indirect(&self, slot: &Label) -> Fragment {
        Fragment::single(Instruction::JumpIndirect(DataAddress(slot.clone())))
    }

    fn extern_call(&self, method: &MethodRef) -> Fragment {
        Fragment::single(Instruction::Extern(method.extern_name.clone()))
    }

    fn decl_data(&self, label: &Label, ty: &Ty, init: &InitialValue) -> Fragment {
        Fragment::single(Instruction::DeclData { label: label.clone(), ty: ty.clone(), init: init.clone() })
    }

    fn export_data(&self, label: &Label) -> Fragment {
        Fragment::single(Instruction::ExportData(label.clone()))
    }

    fn sync_data(&self, label: &Label, mode: SyncMode) -> Fragment {
        Fragment::single(Instruction::SyncData(label.clone(), mode))
    }

    fn export_code(&self, label: &Label) -> Fragment {
        Fragment::single(Instruction::ExportCode(label.clone()))
    }

    fn indent(&self, delta: i8) -> Fragment {
        Fragment::single(Instruction::Indent(delta))
    }
}
