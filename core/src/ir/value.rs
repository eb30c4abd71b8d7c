use serde::{Deserialize, Serialize};
use std::fmt;

use crate::symbol::{AnonLabel, Named};

/// Initial content of a declared data slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitialValue {
    Null,
    /// The host substitutes a reference to the running program object.
    This,
    /// Concrete literal text, spelled as the front end produced it.
    Literal(String),
    /// Code address of a continuation label (indirect-call return points).
    Address(AnonLabel),
}

impl fmt::Display for InitialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialValue::Null => write!(f, "null"),
            InitialValue::This => write!(f, "this"),
            InitialValue::Literal(text) => write!(f, "{}", text),
            InitialValue::Address(label) => write!(f, "&{}", label.identifier()),
        }
    }
}

/// Network synchronisation mode of an exported variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    None,
    Linear,
    Smooth,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncMode::None => "none",
            SyncMode::Linear => "linear",
            SyncMode::Smooth => "smooth",
        };
        write!(f, "{}", s)
    }
}
