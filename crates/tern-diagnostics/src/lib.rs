//! Diagnostic infrastructure for the tern backend.
//!
//! Backend passes report problems as [`Diagnostic`]s carrying the span of
//! the offending node. The CLI renders them with one of the emitters.
//!
//! # Example
//!
//! ```
//! use tern_diagnostics::{
//!     Diagnostic, DiagnosticCode, DiagnosticEmitter, SimpleEmitter, SourceCache, Span,
//! };
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_file("gen.tern", "try { yield 1; } finally { yield 2; }".to_string());
//!
//! let diag = Diagnostic::new(DiagnosticCode::SuspensionInFinally, "suspension inside finally")
//!     .with_span(Span::new(file_id, 27, 35))
//!     .with_help("move the suspension out of the finally block")
//!     .build();
//!
//! let mut out = Vec::new();
//! SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("gen.tern:1:28: error"));
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use source_cache::{SourceCache, SourceFile};
pub use span::{FileId, Label, Location, Span};
