//! file: core/src/ast/types.rs
//! description: resolved types carried by every typed tree node.
//!
//! The front end resolves every expression to a `Ty`. Named types carry
//! the platform type name verbatim (`SystemInt32`, `SystemString`, ...);
//! arrays and tuples are structural. Tuples never occupy a slot: a tuple
//! value is the sequence of its component addresses on the VM stack.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ty {
    Unit,
    Named(String),
    Array(Box<Ty>),
    Tuple(Vec<Ty>),
}

impl Ty {
    pub fn named(name: impl Into<String>) -> Self {
        Ty::Named(name.into())
    }

    pub fn array_of(elem: Ty) -> Self {
        Ty::Array(Box::new(elem))
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Ty::Unit)
    }

    /// Name of the type as the target platform spells it in slot
    /// declarations and extern signatures.
    pub fn platform_name(&self) -> String {
        match self {
            Ty::Unit => "SystemVoid".to_string(),
            Ty::Named(n) => n.clone(),
            Ty::Array(e) => format!("{}Array", e.platform_name()),
            Ty::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(|t| t.platform_name()).collect();
                format!("Tuple{}", parts.join(""))
            }
        }
    }

    /// Number of stack entries a value of this type occupies.
    pub fn width(&self) -> usize {
        match self {
            Ty::Unit => 0,
            Ty::Tuple(items) => items.iter().map(|t| t.width()).sum(),
            _ => 1,
        }
    }

    /// Scalar components in stack order (tuples flattened recursively).
    pub fn flatten(&self) -> Vec<Ty> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Ty>) {
        match self {
            Ty::Unit => {}
            Ty::Tuple(items) => items.iter().for_each(|t| t.flatten_into(out)),
            other => out.push(other.clone()),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unit => write!(f, "unit"),
            Ty::Named(n) => write!(f, "{}", n),
            Ty::Array(e) => write!(f, "{}[]", e),
            Ty::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(|t| t.to_string()).collect();
                write!(f, "({})", parts.join(" * "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_tuple_flattens_in_stack_order() {
        let int = Ty::named("SystemInt32");
        let s = Ty::named("SystemString");
        let t = Ty::Tuple(vec![int.clone(), Ty::Tuple(vec![s.clone(), int.clone()]), Ty::Unit]);
        assert_eq!(t.width(), 3);
        assert_eq!(t.flatten(), vec![int.clone(), s, int]);
    }

    #[test]
    fn array_platform_name_appends_suffix() {
        let t = Ty::array_of(Ty::named("SystemSingle"));
        assert_eq!(t.platform_name(), "SystemSingleArray");
    }
}
