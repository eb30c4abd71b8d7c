//! Naming model: qualifiers, labels, literal interning, lifecycle hooks
//! and the declaration table the lowering engine reads from.

pub mod hooks;
pub mod label;
pub mod literals;
pub mod method;
pub mod qualifier;
pub mod table;

pub use hooks::{builtin_events, event_parameter_name, mangle_hook_name, EventParam, EventSig};
pub use label::{
    AnonKind, AnonLabel, FuncLabel, Label, LabelCounters, LabelKind, LabelSet, LiteralLabel, Named,
    OutValueLabel, VarLabel, VarRole,
};
pub use literals::LiteralInterner;
pub use method::MethodRef;
pub use qualifier::{Qualifier, QualifierStack};
pub use table::{Table, VarDecl};
