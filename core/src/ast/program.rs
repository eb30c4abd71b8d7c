use serde::{Deserialize, Serialize};
use std::path::Path;

use super::node::TypedNode;
use crate::error::ConfigError;
use crate::symbol::{FuncLabel, Table};

/// A user function (or lifecycle hook) with its typed body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub label: FuncLabel,
    pub body: TypedNode,
    #[serde(default)]
    pub export: bool,
}

impl FunctionDecl {
    pub fn new(label: FuncLabel, body: TypedNode) -> Self {
        FunctionDecl { label, body, export: false }
    }

    pub fn exported(mut self) -> Self {
        self.export = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    /// Top-level statements run when the entry event fires.
    #[serde(default)]
    pub entry: Vec<TypedNode>,
}

/// Everything the backend needs from a front end: the declaration table
/// and the typed program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileUnit {
    #[serde(default)]
    pub table: Table,
    #[serde(default)]
    pub program: Program,
}

impl CompileUnit {
    pub fn new(table: Table, program: Program) -> Self {
        CompileUnit { table, program }
    }

    pub fn from_json(raw: &str) -> Result<CompileUnit, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::new(None, format!("parse compile unit: {}", e)))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<CompileUnit, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(Some(path.to_path_buf()), format!("read compile unit: {}", e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::new(Some(path.to_path_buf()), format!("parse compile unit: {}", e)))
    }
}
