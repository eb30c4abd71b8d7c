use serde::{Deserialize, Serialize};
use std::fmt;

use super::kind::NodeKind;
use super::types::Ty;

/// Source position a front end attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self { file: file.into(), line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A node of the type-checked tree. Every node carries its resolved type;
/// callees and slots inside `kind` are already resolved by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedNode {
    pub ty: Ty,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl TypedNode {
    pub fn new(ty: Ty, kind: NodeKind) -> Self {
        TypedNode { ty, kind, location: None }
    }

    /// Node of unit type.
    pub fn unit(kind: NodeKind) -> Self {
        TypedNode::new(Ty::Unit, kind)
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn get_location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Short tag naming the node kind, used in diagnostics.
    pub fn describe(&self) -> &'static str {
        self.kind.tag()
    }
}

impl fmt::Display for TypedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.tag(), self.ty)?;
        if let Some(loc) = &self.location {
            write!(f, " @ {}", loc)?;
        }
        Ok(())
    }
}
