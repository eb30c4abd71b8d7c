//! Instruction model, slot allocation and the lowering engine.

pub mod lower;
pub mod module;
pub mod op;
pub mod pool;
pub mod value;

pub use self::lower::{compile, compile_with, AssemblyPrimitives, LoweringContext, Primitives};
pub use self::module::{BlockKind, CodeBlock, CompiledProgram, DataDecl, ProgramStats, SlotUsage};
pub use self::op::{Address, CodeAddress, DataAddress, Fragment, Instruction};
pub use self::value::{InitialValue, SyncMode};
