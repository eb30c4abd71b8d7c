//! Typed tree handed to the backend by a front end.

pub mod kind;
pub mod node;
pub mod program;
pub mod types;

pub use kind::{ArrayInit, Branch, LeftValue, NodeKind};
pub use node::{Location, TypedNode};
pub use program::{CompileUnit, FunctionDecl, Program};
pub use types::Ty;
