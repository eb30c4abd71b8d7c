pub mod ast;
pub mod config;
pub mod error;
pub mod ir;
pub mod symbol;

pub use ast::{CompileUnit, FunctionDecl, Program, Ty, TypedNode};
pub use config::{CompileOptions, TargetTypes};
pub use error::{generate_error_report, ConfigError, Level, LowerError, LowerErrorKind, SlateErrorExt};
pub use ir::{compile, compile_with, CompiledProgram, Fragment, Instruction};
pub use symbol::Table;

/// Load a compile unit and options from disk and compile it.
pub fn compile_file<P: AsRef<std::path::Path>>(
    unit_path: P,
    options: &CompileOptions,
) -> Result<CompiledProgram, Vec<Box<dyn SlateErrorExt>>> {
    let unit = CompileUnit::load_from_file(unit_path).map_err(|e| vec![Box::new(e) as Box<dyn SlateErrorExt>])?;
    compile(&unit, options)
        .map_err(|errs| errs.into_iter().map(|e| Box::new(e) as Box<dyn SlateErrorExt>).collect())
}
