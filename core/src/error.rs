use std::fmt;
use std::path::PathBuf;

use crate::ast::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level_str = match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        };
        write!(f, "{}", level_str)
    }
}

/// Common face of every diagnostic the backend reports.
pub trait SlateErrorExt {
    fn level(&self) -> Level;
    fn message(&self) -> String;
    /// Component that raised the diagnostic (`lower`, `config`, ...).
    fn issuer(&self) -> String;
    fn location(&self) -> Option<Location>;
}

impl fmt::Debug for dyn SlateErrorExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc_str = match self.location() {
            Some(loc) => loc.to_string(),
            None => "unknown".to_string(),
        };
        write!(f, "SLATE | {} | {} | {} | {}", self.level(), loc_str, self.issuer(), self.message())
    }
}

impl fmt::Display for dyn SlateErrorExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One-line report in the `SLATE | level | location | message` shape.
pub fn generate_error_report<E: SlateErrorExt + ?Sized>(error: &E) -> String {
    let location = match error.location() {
        Some(loc) => loc.to_string(),
        None => "unknown location".to_string(),
    };
    format!("SLATE | {} | {} | {}", error.level(), location, error.message())
}

/// Kind of hole the lowering engine found in an otherwise valid tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerErrorKind {
    /// A call, getter or setter node carries no resolved callee.
    NullCallee,
    /// A method the engine needs for a built-in construct is missing from
    /// the table (array constructors, integer operators, iteration).
    MissingIntrinsic,
    /// A user function call targets a function emitted as a lifecycle
    /// hook; hooks return to the host, never to a caller.
    HookCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerError {
    pub kind: LowerErrorKind,
    /// What was being lowered, e.g. `call` or `SystemInt32[].Set/2`.
    pub subject: String,
    /// Function or hook the node belongs to.
    pub function: String,
    pub location: Option<Location>,
}

impl LowerError {
    pub fn null_callee(subject: impl Into<String>, function: impl Into<String>, location: Option<Location>) -> Self {
        LowerError { kind: LowerErrorKind::NullCallee, subject: subject.into(), function: function.into(), location }
    }

    pub fn missing_intrinsic(subject: impl Into<String>, function: impl Into<String>, location: Option<Location>) -> Self {
        LowerError {
            kind: LowerErrorKind::MissingIntrinsic,
            subject: subject.into(),
            function: function.into(),
            location,
        }
    }

    pub fn hook_call(subject: impl Into<String>, function: impl Into<String>, location: Option<Location>) -> Self {
        LowerError { kind: LowerErrorKind::HookCall, subject: subject.into(), function: function.into(), location }
    }
}

impl SlateErrorExt for LowerError {
    fn level(&self) -> Level {
        Level::Error
    }

    fn message(&self) -> String {
        match self.kind {
            LowerErrorKind::NullCallee => {
                format!("unresolved callee for {} in `{}`; subtree skipped", self.subject, self.function)
            }
            LowerErrorKind::MissingIntrinsic => {
                format!("no method `{}` available for `{}`; subtree skipped", self.subject, self.function)
            }
            LowerErrorKind::HookCall => {
                format!("`{}` is a lifecycle hook and cannot be called from `{}`", self.subject, self.function)
            }
        }
    }

    fn issuer(&self) -> String {
        "lower".to_string()
    }

    fn location(&self) -> Option<Location> {
        self.location.clone()
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", generate_error_report(self))
    }
}

impl std::error::Error for LowerError {}

/// Reading or decoding a JSON input (configuration or compile unit) failed.
#[derive(Debug)]
pub struct ConfigError {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl ConfigError {
    pub fn new(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError { path, message: message.into() }
    }
}

impl SlateErrorExt for ConfigError {
    fn level(&self) -> Level {
        Level::Critical
    }

    fn message(&self) -> String {
        match &self.path {
            Some(p) => format!("{}: {}", p.display(), self.message),
            None => self.message.clone(),
        }
    }

    fn issuer(&self) -> String {
        "config".to_string()
    }

    fn location(&self) -> Option<Location> {
        None
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", generate_error_report(self))
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_error_report_names_function_and_location() {
        let err = LowerError::null_callee("call", "Main::update", Some(Location::new("main.sl", 4, 9)));
        let report = generate_error_report(&err);
        assert!(report.starts_with("SLATE | ERROR | main.sl:4:9 |"));
        assert!(report.contains("Main::update"));
    }

    #[test]
    fn trait_object_debug_includes_issuer() {
        let err: Box<dyn SlateErrorExt> = Box::new(ConfigError::new(None, "bad json"));
        let text = format!("{:?}", err);
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("config"));
        assert!(text.contains("bad json"));
    }
}
