//! file: core/src/config.rs
//! description: compile options and their JSON loader.
//!
//! Every field has a default so a configuration file only needs the keys
//! it changes. The engine never hard-codes platform type names; it reads
//! them from `TargetTypes`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ast::Ty;
use crate::error::ConfigError;

/// Host jump address meaning "return control to the host".
pub const RETURN_TO_HOST: u32 = 0xFFFF_FFFC;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTypes {
    #[serde(default = "default_int")]
    pub int: String,
    #[serde(default = "default_bool")]
    pub bool: String,
    /// Type of slots holding code addresses (return addresses, indirect
    /// call targets).
    #[serde(default = "default_address")]
    pub address: String,
    /// Type of the implicit self-reference slot.
    #[serde(default = "default_this")]
    pub this: String,
}

fn default_int() -> String { "SystemInt32".to_string() }
fn default_bool() -> String { "SystemBoolean".to_string() }
fn default_address() -> String { "SystemUInt32".to_string() }
fn default_this() -> String { "SystemObject".to_string() }

impl Default for TargetTypes {
    fn default() -> Self {
        TargetTypes { int: default_int(), bool: default_bool(), address: default_address(), this: default_this() }
    }
}

impl TargetTypes {
    pub fn int_ty(&self) -> Ty {
        Ty::named(self.int.as_str())
    }

    pub fn bool_ty(&self) -> Ty {
        Ty::named(self.bool.as_str())
    }

    pub fn address_ty(&self) -> Ty {
        Ty::named(self.address.as_str())
    }

    pub fn this_ty(&self) -> Ty {
        Ty::named(self.this.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Emit `INDENT` markers around entry-point bodies.
    #[serde(default = "default_indent")]
    pub indent: bool,
    #[serde(default = "default_return_sentinel")]
    pub return_sentinel: u32,
    /// Lifecycle event that receives the implicit entry block.
    #[serde(default = "default_entry_event")]
    pub entry_event: String,
    #[serde(default)]
    pub types: TargetTypes,
}

fn default_indent() -> bool { true }
fn default_return_sentinel() -> u32 { RETURN_TO_HOST }
fn default_entry_event() -> String { "Start".to_string() }

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            indent: default_indent(),
            return_sentinel: default_return_sentinel(),
            entry_event: default_entry_event(),
            types: TargetTypes::default(),
        }
    }
}

impl CompileOptions {
    /// Load options from a JSON file path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<CompileOptions, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(Some(path.to_path_buf()), format!("read config: {}", e)))?;
        let opts: CompileOptions = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::new(Some(path.to_path_buf()), format!("parse config: {}", e)))?;
        opts.validate().map_err(|msg| ConfigError::new(Some(path.to_path_buf()), msg))?;
        Ok(opts)
    }

    /// Basic checks on values serde cannot reject by itself.
    pub fn validate(&self) -> Result<(), String> {
        if self.entry_event.trim().is_empty() {
            return Err("entry_event is empty".to_string());
        }
        let types = [&self.types.int, &self.types.bool, &self.types.address, &self.types.this];
        if types.iter().any(|t| t.trim().is_empty()) {
            return Err("target type names must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let opts: CompileOptions = serde_json::from_str("{}").expect("parse");
        assert_eq!(opts, CompileOptions::default());
        assert_eq!(opts.return_sentinel, 0xFFFF_FFFC);
        assert_eq!(opts.types.int, "SystemInt32");
    }

    #[test]
    fn partial_types_keep_other_defaults() {
        let opts: CompileOptions =
            serde_json::from_str(r#"{"types": {"int": "SystemInt64"}, "indent": false}"#).expect("parse");
        assert!(!opts.indent);
        assert_eq!(opts.types.int, "SystemInt64");
        assert_eq!(opts.types.bool, "SystemBoolean");
    }

    #[test]
    fn blank_entry_event_is_rejected() {
        let opts = CompileOptions { entry_event: " ".to_string(), ..CompileOptions::default() };
        assert!(opts.validate().is_err());
    }
}
