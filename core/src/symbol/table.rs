//! file: core/src/symbol/table.rs
//! description: lookup façade over the front end's declarations.
//!
//! The front end fills a `Table` while it builds the typed tree; the
//! lowering engine only reads it. Lookups cover declared variables,
//! user functions, resolved extern methods (by owner, member name and
//! arity), lifecycle events and interned literals.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::hooks::{builtin_events, EventSig};
use super::label::{FuncLabel, LiteralLabel, Named, VarLabel};
use super::literals::LiteralInterner;
use super::method::MethodRef;
use crate::ast::Ty;
use crate::ir::value::SyncMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub label: VarLabel,
    #[serde(default)]
    pub export: bool,
    #[serde(default)]
    pub sync: Option<SyncMode>,
    #[serde(default)]
    pub init: Option<LiteralLabel>,
}

impl VarDecl {
    pub fn new(label: VarLabel) -> Self {
        VarDecl { label, export: false, sync: None, init: None }
    }

    pub fn exported(mut self) -> Self {
        self.export = true;
        self
    }

    pub fn synced(mut self, mode: SyncMode) -> Self {
        self.sync = Some(mode);
        self
    }

    pub fn with_init(mut self, lit: LiteralLabel) -> Self {
        self.init = Some(lit);
        self
    }
}

type MethodKey = (Ty, String, usize);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TableSnapshot", into = "TableSnapshot")]
pub struct Table {
    variables: Vec<VarDecl>,
    var_index: HashMap<String, usize>,
    functions: Vec<FuncLabel>,
    func_index: HashMap<String, usize>,
    methods: Vec<MethodRef>,
    method_index: HashMap<MethodKey, usize>,
    events: Vec<EventSig>,
    event_index: HashMap<String, usize>,
    literals: LiteralInterner,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Table seeded with the built-in lifecycle events.
    pub fn new() -> Self {
        let mut table = Self::empty();
        for ev in builtin_events() {
            table.register_event(ev.clone());
        }
        table
    }

    pub fn empty() -> Self {
        Table {
            variables: Vec::new(),
            var_index: HashMap::new(),
            functions: Vec::new(),
            func_index: HashMap::new(),
            methods: Vec::new(),
            method_index: HashMap::new(),
            events: Vec::new(),
            event_index: HashMap::new(),
            literals: LiteralInterner::new(),
        }
    }

    // ------- Variables -------

    pub fn declare_variable(&mut self, decl: VarDecl) {
        let id = decl.label.identifier();
        match self.var_index.get(&id) {
            Some(&i) => self.variables[i] = decl,
            None => {
                self.var_index.insert(id, self.variables.len());
                self.variables.push(decl);
            }
        }
    }

    pub fn variable(&self, label: &VarLabel) -> Option<&VarDecl> {
        self.var_index.get(&label.identifier()).map(|&i| &self.variables[i])
    }

    pub fn variables(&self) -> &[VarDecl] {
        &self.variables
    }

    /// True when no other declared variable shares the short name.
    pub fn is_unique_name(&self, label: &VarLabel) -> bool {
        self.variables.iter().filter(|d| d.label.name == label.name).count() <= 1
    }

    // ------- Functions -------

    pub fn declare_function(&mut self, func: FuncLabel) {
        let key = func.qualified_name();
        match self.func_index.get(&key) {
            Some(&i) => self.functions[i] = func,
            None => {
                self.func_index.insert(key, self.functions.len());
                self.functions.push(func);
            }
        }
    }

    // ------- Methods -------

    /// Record a resolved method. The first registration for a given
    /// (owner, name, arity) wins.
    pub fn register_method(&mut self, method: MethodRef) {
        let key = (method.owner.clone(), method.name.clone(), method.arity());
        if self.method_index.contains_key(&key) {
            return;
        }
        self.method_index.insert(key, self.methods.len());
        self.methods.push(method);
    }

    pub fn method(&self, owner: &Ty, name: &str, arity: usize) -> Option<&MethodRef> {
        self.method_index
            .get(&(owner.clone(), name.to_string(), arity))
            .map(|&i| &self.methods[i])
    }

    // ------- Events -------

    pub fn register_event(&mut self, event: EventSig) {
        match self.event_index.get(&event.name) {
            Some(&i) => self.events[i] = event,
            None => {
                self.event_index.insert(event.name.clone(), self.events.len());
                self.events.push(event);
            }
        }
    }

    pub fn event(&self, name: &str) -> Option<&EventSig> {
        self.event_index.get(name).map(|&i| &self.events[i])
    }

    pub fn is_lifecycle_hook(&self, name: &str) -> bool {
        self.event_index.contains_key(name)
    }

    // ------- Literals -------

    pub fn literal(&mut self, text: &str, ty: &Ty) -> LiteralLabel {
        self.literals.intern(text, ty)
    }

    pub fn literals(&self) -> &LiteralInterner {
        &self.literals
    }
}

/// Serialized form of a `Table`; indices are rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TableSnapshot {
    #[serde(default)]
    variables: Vec<VarDecl>,
    #[serde(default)]
    functions: Vec<FuncLabel>,
    #[serde(default)]
    methods: Vec<MethodRef>,
    #[serde(default = "default_events")]
    events: Vec<EventSig>,
    #[serde(default)]
    literals: LiteralInterner,
}

fn default_events() -> Vec<EventSig> {
    builtin_events().to_vec()
}

impl From<TableSnapshot> for Table {
    fn from(snap: TableSnapshot) -> Self {
        let mut table = Table::empty();
        snap.variables.into_iter().for_each(|v| table.declare_variable(v));
        snap.functions.into_iter().for_each(|f| table.declare_function(f));
        snap.methods.into_iter().for_each(|m| table.register_method(m));
        snap.events.into_iter().for_each(|e| table.register_event(e));
        table.literals = snap.literals;
        table
    }
}

impl From<Table> for TableSnapshot {
    fn from(table: Table) -> Self {
        TableSnapshot {
            variables: table.variables,
            functions: table.functions,
            methods: table.methods,
            events: table.events,
            literals: table.literals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Qualifier;

    #[test]
    fn method_lookup_is_keyed_by_owner_name_and_arity() {
        let int = Ty::named("SystemInt32");
        let mut t = Table::empty();
        let add = MethodRef::new_static(int.clone(), "op_Addition", vec![int.clone(), int.clone()], vec![int.clone()]);
        t.register_method(add.clone());
        assert_eq!(t.method(&int, "op_Addition", 2), Some(&add));
        assert!(t.method(&int, "op_Addition", 1).is_none());
        assert!(t.method(&Ty::named("SystemSingle"), "op_Addition", 2).is_none());
    }

    #[test]
    fn snapshot_round_trip_rebuilds_indices() {
        let int = Ty::named("SystemInt32");
        let mut t = Table::new();
        let x = VarLabel::user(Qualifier::from_segments(["M"]), "x", int.clone());
        t.declare_variable(VarDecl::new(x.clone()).exported());
        t.literal("5", &int);
        let json = serde_json::to_string(&t).expect("serialize table");
        let back: Table = serde_json::from_str(&json).expect("deserialize table");
        assert!(back.variable(&x).map(|d| d.export).unwrap_or(false));
        assert!(back.literals().lookup("5", &int).is_some());
        assert!(back.is_lifecycle_hook("Start"));
    }

    #[test]
    fn short_name_uniqueness_reports_cross_scope_collisions() {
        let int = Ty::named("SystemInt32");
        let mut t = Table::empty();
        let a = VarLabel::user(Qualifier::from_segments(["M", "f"]), "i", int.clone());
        let b = VarLabel::user(Qualifier::from_segments(["M", "g"]), "i", int.clone());
        t.declare_variable(VarDecl::new(a.clone()));
        assert!(t.is_unique_name(&a));
        t.declare_variable(VarDecl::new(b));
        assert!(!t.is_unique_name(&a));
    }
}
