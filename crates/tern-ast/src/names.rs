//! Fresh identifier allocation
//!
//! Labels and synthesized locals must be unique across a whole output file,
//! since `goto` targets and locals share one namespace per method and bridge
//! names share one per class. Passes receive the allocator by `&mut` and
//! never keep their own counters.

use std::collections::{HashMap, HashSet};

use tern_diagnostics::Span;

use crate::ir::{Block, Ident, MethodDecl, StmtKind};

/// Source of collision-free identifiers.
pub trait NameAllocator {
    /// Return an identifier derived from `hint` that has not been handed out
    /// or reserved before. `span` is the node the name is allocated for.
    fn allocate(&mut self, hint: &str, span: Span) -> Ident;
}

/// Allocator that returns the hint itself when free and otherwise appends
/// the next free counter (`hint1`, `hint2`, ...).
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
    next_suffix: HashMap<String, u32>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a name as used so it is never allocated.
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    /// Reserve the method's own name, its parameters, and every local,
    /// label and nested method declared in its body.
    pub fn reserve_method(&mut self, method: &MethodDecl) {
        self.reserve(method.name.as_str());
        for param in &method.params {
            self.reserve(param.name.as_str());
        }
        self.reserve_block(&method.body);
    }

    pub fn reserve_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.reserve_kind(&stmt.kind);
        }
    }

    fn reserve_kind(&mut self, kind: &StmtKind) {
        match kind {
            StmtKind::Block(block) => self.reserve_block(block),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.reserve_kind(&then_branch.kind);
                if let Some(else_branch) = else_branch {
                    self.reserve_kind(&else_branch.kind);
                }
            }
            StmtKind::While { body, .. } => self.reserve_kind(&body.kind),
            StmtKind::Try(try_stmt) => {
                self.reserve_block(&try_stmt.body);
                if let Some(catch) = &try_stmt.catch {
                    self.reserve_block(catch);
                }
                if let Some(finally) = &try_stmt.finally {
                    self.reserve_block(finally);
                }
            }
            StmtKind::Labeled { label, body } => {
                self.reserve(label.as_str());
                self.reserve_kind(&body.kind);
            }
            StmtKind::Local(decl) => self.reserve(decl.name.as_str()),
            StmtKind::Method(method) => self.reserve_method(method),
            StmtKind::Switch { cases, .. } => {
                for case in cases {
                    self.reserve_block(&case.body);
                }
            }
            StmtKind::Goto(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Expr(_)
            | StmtKind::Return(_)
            | StmtKind::Yield(_)
            | StmtKind::Throw(_) => {}
        }
    }
}

impl NameAllocator for UniqueNames {
    fn allocate(&mut self, hint: &str, _span: Span) -> Ident {
        if self.taken.insert(hint.to_string()) {
            return Ident::new(hint);
        }

        let counter = self.next_suffix.entry(hint.to_string()).or_insert(1);
        loop {
            let candidate = format!("{}{}", hint, counter);
            *counter += 1;
            if self.taken.insert(candidate.clone()) {
                return Ident(candidate);
            }
        }
    }
}
