//! file: core/src/ir/lower/lowering_context.rs
//! description: compilation session threaded through every lowering call.
//!
//! `LoweringContext` owns all mutable state of one compilation: label
//! counters, the out-value pool, the literal interner (seeded from the
//! table), the qualifier stack, the loop-target stack and the recorded
//! diagnostics. Nothing is global, so independent compilations never
//! interfere.

use log::warn;
use std::collections::BTreeMap;

use super::primitives::Primitives;
use crate::ast::{Location, Ty};
use crate::config::CompileOptions;
use crate::error::LowerError;
use crate::ir::pool::{OutValue, OutValuePool};
use crate::symbol::{
    AnonKind, AnonLabel, FuncLabel, Label, LabelCounters, LabelSet, LiteralInterner, MethodRef, Qualifier,
    QualifierStack, Table,
};

#[derive(Debug, Clone)]
struct LoopTargets {
    cont: AnonLabel,
    brk: AnonLabel,
}

pub struct LoweringContext<'t> {
    pub table: &'t Table,
    pub options: &'t CompileOptions,
    pub prims: &'t dyn Primitives,
    pub counters: LabelCounters,
    pub pool: OutValuePool,
    pub literals: LiteralInterner,
    qualifiers: QualifierStack,
    functions: Vec<Qualifier>,
    loops: Vec<LoopTargets>,
    receivers: Vec<Label>,
    /// Indirect call slot -> continuation label its initial value points at.
    indirect_targets: BTreeMap<AnonLabel, AnonLabel>,
    pub diagnostics: Vec<LowerError>,
}

impl<'t> LoweringContext<'t> {
    pub fn new(table: &'t Table, options: &'t CompileOptions, prims: &'t dyn Primitives) -> Self {
        LoweringContext {
            table,
            options,
            prims,
            counters: LabelCounters::new(),
            pool: OutValuePool::new(),
            literals: table.literals().clone(),
            qualifiers: QualifierStack::new(Qualifier::root()),
            functions: Vec::new(),
            loops: Vec::new(),
            receivers: Vec::new(),
            indirect_targets: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    // ------- Scopes -------

    /// Open the outermost scope of a function body.
    pub fn enter_function(&mut self, scope: &Qualifier) {
        self.qualifiers.push(scope.clone());
        self.functions.push(scope.clone());
        self.pool.push_scope(scope);
    }

    /// Close the function scope and check that every temporary came back.
    pub fn leave_function(&mut self, scope: &Qualifier) {
        self.pool.pop_scope(scope);
        assert!(
            self.pool.is_balanced(scope),
            "function `{}` finished with unreleased out-values",
            scope.qualified()
        );
        let popped = self.functions.pop();
        assert_eq!(popped.as_ref(), Some(scope), "function scope closed out of order");
        self.qualifiers.pop(scope);
    }

    pub fn function(&self) -> &Qualifier {
        match self.functions.last() {
            Some(q) => q,
            None => panic!("lowering outside of a function scope"),
        }
    }

    pub fn qualifier(&self) -> &Qualifier {
        self.qualifiers.current()
    }

    /// Open a nested lexical scope (block, let-in, loop body).
    pub fn enter_scope(&mut self, segment: impl Into<String>) -> Qualifier {
        let q = self.qualifiers.push_segment(segment);
        let function = self.function().clone();
        self.pool.push_scope(&function);
        q
    }

    pub fn leave_scope(&mut self, scope: &Qualifier) {
        let function = self.function().clone();
        self.pool.pop_scope(&function);
        self.qualifiers.pop(scope);
    }

    /// Close `scope` while keeping the temporaries of its result alive in
    /// the parent scope.
    pub fn hand_out(&mut self, scope: &Qualifier, held: Vec<OutValue>) -> Vec<OutValue> {
        let labels: Vec<_> = held.iter().map(|h| h.label().clone()).collect();
        self.release_all(held);
        self.leave_scope(scope);
        labels.iter().map(|l| self.pool.retain_released(l)).collect()
    }

    // ------- Temporaries -------

    pub fn retain(&mut self, ty: &Ty) -> OutValue {
        let function = self.function().clone();
        self.pool.retain(&function, ty)
    }

    pub fn release_all(&mut self, held: Vec<OutValue>) {
        for value in held {
            self.pool.release(value);
        }
    }

    // ------- Literals -------

    pub fn literal(&mut self, text: &str, ty: &Ty) -> Label {
        Label::Literal(self.literals.intern(text, ty))
    }

    pub fn int_literal(&mut self, value: i64) -> Label {
        let ty = self.int_ty();
        self.literal(&value.to_string(), &ty)
    }

    pub fn bool_literal(&mut self, value: bool) -> Label {
        let ty = self.bool_ty();
        self.literal(if value { "true" } else { "false" }, &ty)
    }

    pub fn null_literal(&mut self, ty: &Ty) -> Label {
        self.literal("null", ty)
    }

    pub fn int_ty(&self) -> Ty {
        self.options.types.int_ty()
    }

    pub fn bool_ty(&self) -> Ty {
        self.options.types.bool_ty()
    }

    // ------- Labels -------

    pub fn mint(&mut self, kind: AnonKind) -> AnonLabel {
        let q = self.qualifiers.current().clone();
        self.counters.mint(kind, &q)
    }

    pub fn mint_set(&mut self, kind: AnonKind, count: usize) -> LabelSet {
        let q = self.qualifiers.current().clone();
        self.counters.mint_set(kind, &q, count)
    }

    pub fn register_indirect(&mut self, indirect: AnonLabel, continuation: AnonLabel) {
        self.indirect_targets.insert(indirect, continuation);
    }

    pub fn indirect_target(&self, indirect: &AnonLabel) -> Option<&AnonLabel> {
        self.indirect_targets.get(indirect)
    }

    // ------- Loops and receivers -------

    pub fn push_loop(&mut self, cont: AnonLabel, brk: AnonLabel) {
        self.loops.push(LoopTargets { cont, brk });
    }

    pub fn pop_loop(&mut self) {
        assert!(self.loops.pop().is_some(), "loop target stack underflow");
    }

    pub fn continue_target(&self) -> Label {
        match self.loops.last() {
            Some(t) => Label::Anon(t.cont.clone()),
            None => panic!("`continue` lowered outside of a loop"),
        }
    }

    pub fn break_target(&self) -> Label {
        match self.loops.last() {
            Some(t) => Label::Anon(t.brk.clone()),
            None => panic!("`break` lowered outside of a loop"),
        }
    }

    pub fn push_receiver(&mut self, slot: Label) {
        self.receivers.push(slot);
    }

    pub fn pop_receiver(&mut self) {
        assert!(self.receivers.pop().is_some(), "receiver stack underflow");
    }

    pub fn receiver(&self) -> Label {
        match self.receivers.last() {
            Some(l) => l.clone(),
            None => panic!("receiver placeholder lowered outside of an optional member access"),
        }
    }

    // ------- Table lookups and diagnostics -------

    /// True when `func` is emitted as a lifecycle hook entry rather than a
    /// callable function.
    pub fn is_hook(&self, func: &FuncLabel) -> bool {
        func.hook || self.table.is_lifecycle_hook(&func.name)
    }

    /// Method the engine needs for a built-in construct; records a
    /// diagnostic when the table has none.
    pub fn require_method(&mut self, owner: &Ty, name: &str, arity: usize, location: Option<&Location>) -> Option<&'t MethodRef> {
        let found = self.table.method(owner, name, arity);
        if found.is_none() {
            let subject = format!("{}.{}/{}", owner, name, arity);
            let err = LowerError::missing_intrinsic(subject, self.function().qualified(), location.cloned());
            warn!("{}", err);
            self.diagnostics.push(err);
        }
        found
    }

    pub fn null_callee(&mut self, subject: &str, location: Option<&Location>) {
        let err = LowerError::null_callee(subject, self.function().qualified(), location.cloned());
        warn!("{}", err);
        self.diagnostics.push(err);
    }

    pub fn hook_call(&mut self, hook: &FuncLabel, location: Option<&Location>) {
        let err = LowerError::hook_call(hook.name.as_str(), self.function().qualified(), location.cloned());
        warn!("{}", err);
        self.diagnostics.push(err);
    }
}
