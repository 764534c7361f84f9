//! # Pseudocode syntax tree
//!
//! Produced by the frontend parser and consumed by the code generator.
//!
//! ## Conventions
//!
//! - Any non-zero value is true; boolean operators produce `0` or `1`.
//! - Function declarations may appear anywhere at the top level and are
//!   visible to every call site.

pub mod node;
pub mod program;

pub use node::{BinaryOp, Branch, Expr, Stmt, SwitchCase, UnaryOp};
pub use program::Program;
