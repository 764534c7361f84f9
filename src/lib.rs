//! Pseudocode compiler, assembler and virtual machine for an extended
//! Little Man Computer.
//!
//! The crate is a pipeline of independent stages:
//!
//! - [`frontend`] turns source text into a [`lang::Program`].
//! - [`codegen`] lowers the program to assembly text.
//! - [`asm`] assembles the text into packed memory words.
//! - [`runtime`] executes those words.
//!
//! [`harness`] chains all four for callers that just want a result.

pub mod asm;
pub mod codegen;
pub mod frontend;
pub mod harness;
pub mod lang;
pub mod logger;
pub mod runtime;
