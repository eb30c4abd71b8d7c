//! file: core/src/ir/pool.rs
//! description: scoped allocator for temporary global slots ("out-values").
//!
//! Temporaries are global slots named per (function qualifier, type,
//! ordinal). Released slots are reused before new ordinals are minted,
//! so a function needs only as many temporaries of a type as it ever
//! holds live at once.
//!
//! Checked-out slots are represented by `OutValue` handles. A handle is
//! not `Clone`; releasing consumes it. Popping a scope that still owns
//! live handles, popping scopes out of order, and releasing a handle
//! whose scope has already closed are contract violations and panic.

use log::trace;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::ast::Ty;
use crate::symbol::{Named, OutValueLabel, Qualifier};

/// A checked-out temporary slot.
#[derive(Debug, PartialEq, Eq)]
pub struct OutValue {
    label: OutValueLabel,
    scope_id: u64,
}

impl OutValue {
    pub fn label(&self) -> &OutValueLabel {
        &self.label
    }

    pub fn ty(&self) -> &Ty {
        &self.label.ty
    }
}

#[derive(Debug)]
struct PoolScope {
    id: u64,
    function: Qualifier,
    free: BTreeMap<Ty, BTreeSet<u32>>,
    live: BTreeSet<(Ty, u32)>,
}

impl PoolScope {
    fn take_free(&mut self, ty: &Ty, ordinal: u32) -> bool {
        match self.free.get_mut(ty) {
            Some(set) => set.remove(&ordinal),
            None => false,
        }
    }

    fn lowest_free(&self, ty: &Ty) -> Option<u32> {
        self.free.get(ty).and_then(|set| set.iter().next().copied())
    }
}

/// Per-function bookkeeping kept across scopes.
#[derive(Debug, Default, Clone)]
pub struct FunctionSlots {
    next_ordinal: BTreeMap<Ty, u32>,
    pub retains: usize,
    pub releases: usize,
}

impl FunctionSlots {
    /// Distinct slots ever minted for this function.
    pub fn minted(&self) -> u32 {
        self.next_ordinal.values().sum()
    }
}

#[derive(Debug, Default)]
pub struct OutValuePool {
    scopes: Vec<PoolScope>,
    functions: HashMap<Qualifier, FunctionSlots>,
    minted: Vec<OutValueLabel>,
    next_scope_id: u64,
}

impl OutValuePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self, function: &Qualifier) {
        let id = self.next_scope_id;
        self.next_scope_id += 1;
        self.functions.entry(function.clone()).or_default();
        trace!("pool: open scope {} for `{}`", id, function.qualified());
        self.scopes.push(PoolScope {
            id,
            function: function.clone(),
            free: BTreeMap::new(),
            live: BTreeSet::new(),
        });
    }

    pub fn pop_scope(&mut self, function: &Qualifier) {
        let scope = match self.scopes.pop() {
            Some(s) => s,
            None => panic!("pool scope underflow closing `{}`", function.qualified()),
        };
        assert!(
            &scope.function == function,
            "pool scope popped out of order: innermost scope belongs to `{}`, not `{}`",
            scope.function.qualified(),
            function.qualified()
        );
        assert!(
            scope.live.is_empty(),
            "pool scope for `{}` closed with {} live out-value(s): {:?}",
            function.qualified(),
            scope.live.len(),
            scope.live
        );
        trace!("pool: close scope {} for `{}`", scope.id, function.qualified());
        if let Some(parent) = self.scopes.last_mut() {
            if parent.function == scope.function {
                for (ty, ordinals) in scope.free {
                    parent.free.entry(ty).or_default().extend(ordinals);
                }
            }
        }
    }

    /// Check out a slot of `ty` for `function`, reusing the lowest released
    /// ordinal visible from the innermost scope before minting a new one.
    pub fn retain(&mut self, function: &Qualifier, ty: &Ty) -> OutValue {
        let top = self.innermost(function);
        let mut best: Option<(usize, u32)> = None;
        for i in (0..=top).rev() {
            if self.scopes[i].function != *function {
                break;
            }
            if let Some(ord) = self.scopes[i].lowest_free(ty) {
                if best.map_or(true, |(_, b)| ord < b) {
                    best = Some((i, ord));
                }
            }
        }

        let ordinal = match best {
            Some((i, ord)) => {
                self.scopes[i].take_free(ty, ord);
                ord
            }
            None => self.mint(function, ty),
        };

        let label = OutValueLabel { qualifier: function.clone(), ty: ty.clone(), ordinal };
        let scope = &mut self.scopes[top];
        scope.live.insert((ty.clone(), ordinal));
        let scope_id = scope.id;
        self.stats_mut(function).retains += 1;
        trace!("pool: retain {}", label.identifier());
        OutValue { label, scope_id }
    }

    /// Return a slot to the free list of the scope that checked it out.
    pub fn release(&mut self, value: OutValue) {
        let key = (value.label.ty.clone(), value.label.ordinal);
        let scope = match self.scopes.iter_mut().find(|s| s.id == value.scope_id) {
            Some(s) => s,
            None => panic!(
                "out-value {} released after its scope was closed",
                value.label.identifier()
            ),
        };
        assert!(
            scope.live.remove(&key),
            "out-value {} released twice",
            value.label.identifier()
        );
        scope.free.entry(key.0).or_default().insert(key.1);
        let function = scope.function.clone();
        self.stats_mut(&function).releases += 1;
        trace!("pool: release {}", value.label.identifier());
    }

    /// Re-adopt a slot that was released (typically by a child scope that
    /// just closed) into the innermost scope, keeping its value alive.
    pub fn retain_released(&mut self, label: &OutValueLabel) -> OutValue {
        let top = self.innermost(&label.qualifier);
        let mut found = false;
        for i in (0..=top).rev() {
            if self.scopes[i].function != label.qualifier {
                break;
            }
            if self.scopes[i].take_free(&label.ty, label.ordinal) {
                found = true;
                break;
            }
        }
        assert!(found, "out-value {} re-adopted while not released", label.identifier());
        let scope = &mut self.scopes[top];
        scope.live.insert((label.ty.clone(), label.ordinal));
        let scope_id = scope.id;
        self.stats_mut(&label.qualifier).retains += 1;
        trace!("pool: re-adopt {}", label.identifier());
        OutValue { label: label.clone(), scope_id }
    }

    pub fn stats(&self, function: &Qualifier) -> Option<&FunctionSlots> {
        self.functions.get(function)
    }

    /// True when every retain for `function` has a matching release.
    pub fn is_balanced(&self, function: &Qualifier) -> bool {
        self.functions
            .get(function)
            .map_or(true, |s| s.retains == s.releases)
    }

    /// Every slot ever minted, in minting order.
    pub fn minted(&self) -> &[OutValueLabel] {
        &self.minted
    }

    fn innermost(&self, function: &Qualifier) -> usize {
        let top = match self.scopes.len() {
            0 => panic!("out-value requested for `{}` with no open pool scope", function.qualified()),
            n => n - 1,
        };
        assert!(
            &self.scopes[top].function == function,
            "out-value requested for `{}` inside a scope of `{}`",
            function.qualified(),
            self.scopes[top].function.qualified()
        );
        top
    }

    fn mint(&mut self, function: &Qualifier, ty: &Ty) -> u32 {
        let slots = self.stats_mut(function);
        let next = slots.next_ordinal.entry(ty.clone()).or_insert(0);
        let ordinal = *next;
        *next += 1;
        self.minted.push(OutValueLabel { qualifier: function.clone(), ty: ty.clone(), ordinal });
        ordinal
    }

    fn stats_mut(&mut self, function: &Qualifier) -> &mut FunctionSlots {
        self.functions.entry(function.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> Ty {
        Ty::named("SystemInt32")
    }

    fn f() -> Qualifier {
        Qualifier::from_segments(["M", "f"])
    }

    #[test]
    fn released_slots_are_reused_lowest_ordinal_first() {
        let mut pool = OutValuePool::new();
        pool.push_scope(&f());
        let a = pool.retain(&f(), &int());
        let b = pool.retain(&f(), &int());
        let c = pool.retain(&f(), &int());
        assert_eq!((a.label().ordinal, b.label().ordinal, c.label().ordinal), (0, 1, 2));
        pool.release(c);
        pool.release(a);
        let d = pool.retain(&f(), &int());
        assert_eq!(d.label().ordinal, 0);
        pool.release(b);
        pool.release(d);
        pool.pop_scope(&f());
        assert!(pool.is_balanced(&f()));
        assert_eq!(pool.stats(&f()).map(|s| s.minted()), Some(3));
    }

    #[test]
    fn slots_are_not_shared_across_types() {
        let mut pool = OutValuePool::new();
        pool.push_scope(&f());
        let a = pool.retain(&f(), &int());
        pool.release(a);
        let b = pool.retain(&f(), &Ty::named("SystemBoolean"));
        assert_eq!(b.label().ordinal, 0);
        assert_eq!(pool.minted().len(), 2);
        pool.release(b);
        pool.pop_scope(&f());
    }

    #[test]
    fn inner_scope_free_slots_flow_back_to_parent() {
        let mut pool = OutValuePool::new();
        pool.push_scope(&f());
        pool.push_scope(&f());
        let a = pool.retain(&f(), &int());
        pool.release(a);
        pool.pop_scope(&f());
        let b = pool.retain(&f(), &int());
        assert_eq!(b.label().ordinal, 0);
        assert_eq!(pool.minted().len(), 1);
        pool.release(b);
        pool.pop_scope(&f());
    }

    #[test]
    fn child_result_can_be_readopted_after_scope_closes() {
        let mut pool = OutValuePool::new();
        pool.push_scope(&f());
        pool.push_scope(&f());
        let child = pool.retain(&f(), &int());
        let label = child.label().clone();
        pool.release(child);
        pool.pop_scope(&f());
        let kept = pool.retain_released(&label);
        // a sibling must not receive the re-adopted slot
        let sibling = pool.retain(&f(), &int());
        assert_ne!(sibling.label().ordinal, kept.label().ordinal);
        pool.release(sibling);
        pool.release(kept);
        pool.pop_scope(&f());
        let s = pool.stats(&f()).cloned().unwrap_or_default();
        assert_eq!(s.retains, s.releases);
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn popping_another_functions_scope_panics() {
        let mut pool = OutValuePool::new();
        let g = Qualifier::from_segments(["M", "g"]);
        pool.push_scope(&f());
        pool.push_scope(&g);
        pool.pop_scope(&f());
    }

    #[test]
    #[should_panic(expected = "live out-value")]
    fn closing_a_scope_with_a_leaked_slot_panics() {
        let mut pool = OutValuePool::new();
        pool.push_scope(&f());
        let _leak = pool.retain(&f(), &int());
        pool.pop_scope(&f());
    }

    #[test]
    #[should_panic(expected = "after its scope was closed")]
    fn releasing_into_a_closed_scope_panics() {
        let mut pool = OutValuePool::new();
        pool.push_scope(&f());
        pool.push_scope(&f());
        let a = pool.retain(&f(), &int());
        let b = pool.retain(&f(), &int());
        pool.release(b);
        // force-close the inner scope by moving the handle out first
        let stale = a;
        pool.scopes.pop();
        pool.release(stale);
    }

    #[test]
    #[should_panic(expected = "not released")]
    fn readopting_a_live_slot_panics() {
        let mut pool = OutValuePool::new();
        pool.push_scope(&f());
        let a = pool.retain(&f(), &int());
        let _again = pool.retain_released(a.label());
    }
}
