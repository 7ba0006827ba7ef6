//! Target-language AST for tern
//!
//! The object-oriented target the backend emits: blocks, gotos and labels,
//! try/catch/finally, iterator-style suspension statements, native nullable
//! value types and the generic `Optional<T>` wrapper.

pub mod eval;
pub mod ir;
pub mod names;

pub use eval::{Completion, EvalError, Evaluator, Event, Value};
pub use ir::*;
pub use names::{NameAllocator, UniqueNames};
