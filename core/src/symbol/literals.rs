//! file: core/src/symbol/literals.rs
//! description: literal interning keyed by (text, type).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::label::LiteralLabel;
use crate::ast::Ty;

/// Hands out one `LiteralLabel` per distinct (text, type) pair. Indices
/// are dense and follow first-intern order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<LiteralLabel>", into = "Vec<LiteralLabel>")]
pub struct LiteralInterner {
    literals: Vec<LiteralLabel>,
    index: HashMap<(String, Ty), u32>,
}

impl LiteralInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str, ty: &Ty) -> LiteralLabel {
        if let Some(lit) = self.lookup(text, ty) {
            return lit.clone();
        }
        let label = LiteralLabel { index: self.literals.len() as u32, text: text.to_string(), ty: ty.clone() };
        self.index.insert((label.text.clone(), label.ty.clone()), label.index);
        self.literals.push(label.clone());
        label
    }

    pub fn lookup(&self, text: &str, ty: &Ty) -> Option<&LiteralLabel> {
        self.index
            .get(&(text.to_string(), ty.clone()))
            .and_then(|&i| self.literals.get(i as usize))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiteralLabel> {
        self.literals.iter()
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

impl From<Vec<LiteralLabel>> for LiteralInterner {
    fn from(literals: Vec<LiteralLabel>) -> Self {
        let mut interner = LiteralInterner::new();
        for lit in literals {
            let label = interner.intern(&lit.text, &lit.ty);
            // front-end snapshots are expected to be dense and in order
            debug_assert_eq!(label.index, lit.index, "literal snapshot is not densely indexed");
        }
        interner
    }
}

impl From<LiteralInterner> for Vec<LiteralLabel> {
    fn from(interner: LiteralInterner) -> Self {
        interner.literals
    }
}
