//! # Code generation
//!
//! Lowers a [`Program`](crate::lang::Program) to assembly text for the
//! accumulator machine. Every value lives in a labelled memory cell; the
//! [`SymbolTable`] decides which cell and the [`Emitter`] collects the
//! instructions that move values between them.

pub mod compile;
pub mod compile_error;
pub mod emit;
pub mod labels;
pub mod symbol;
pub mod symbol_table;
pub mod weak_scope;

pub use compile::{Compiler, CompilerOptions, compile};
pub use compile_error::CompileError;
pub use emit::Emitter;
pub use labels::LabelAllocator;
pub use symbol::{Symbol, SymbolKind};
pub use symbol_table::{ScopeId, SymbolTable};
pub use weak_scope::{LoopLabels, WeakScopes};
