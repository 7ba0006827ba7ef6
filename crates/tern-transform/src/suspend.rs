//! Suspension hoisting
//!
//! The target forbids a suspension point (`yield`/`await`) anywhere inside a
//! try statement that has a catch clause. This pass rewrites a body so that
//! every suspension sits outside such regions while exceptions raised by the
//! surrounding code still reach the original handler:
//!
//! ```text
//! try { a(); yield x; b(); }        { try { a(); } catch { goto CATCH; }
//! catch { h(); }               =>     yield x;
//!                                     try { b(); } catch { goto CATCH; } }
//!                                   goto OK;
//!                                   CATCH: { h(); }
//!                                   OK: { }
//! ```
//!
//! Runs of non-suspending statements are wrapped in small protected regions
//! that jump to the handler label. Local declarations in those runs are
//! hoisted in front of the region so later statements still see them, and
//! non-trivial `if`/`while` conditions are evaluated into a fresh boolean
//! under protection. A fault delivered at the resumption of a suspension is
//! not caught by the original handler; that matches the target's own
//! semantics for iterators.

use std::collections::HashMap;

use tern_ast::{
    Block, Expr, Label, LocalDecl, NameAllocator, Stmt, StmtKind, SwitchCase, TargetType, TryStmt,
};
use tern_diagnostics::Span;

use crate::config::SuspendConfig;
use crate::error::TransformError;
use crate::normalize::normalize_block;

/// Result of [`hoist_suspensions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoistOutcome {
    pub body: Block,
    /// Number of catch-bearing try statements that were split apart
    pub regions_split: usize,
}

/// Rewrite `body` so that no suspension point is inside a try statement
/// with a catch clause.
///
/// A body without suspension points is returned unchanged. Fresh labels and
/// locals are requested from `names`; the input is never modified.
pub fn hoist_suspensions(
    body: &Block,
    names: &mut dyn NameAllocator,
    config: &SuspendConfig,
) -> Result<HoistOutcome, TransformError> {
    if !YieldCache::default().block_yields(body) {
        log::trace!("no suspension points, body left as is");
        return Ok(HoistOutcome {
            body: body.clone(),
            regions_split: 0,
        });
    }

    let normalized = normalize_block(body);
    let mut hoister = SuspensionHoister {
        names,
        config,
        yields: YieldCache::default(),
        regions_split: 0,
    };
    let converted = hoister.convert_block(&normalized, None)?;

    if let Some(span) = find_misplaced_suspension(&converted) {
        return Err(TransformError::internal(
            "suspension point still inside a try with a catch clause after hoisting",
            span,
        ));
    }

    Ok(HoistOutcome {
        body: converted,
        regions_split: hoister.regions_split,
    })
}

/// Span of the first suspension point nested in a try statement that has a
/// catch clause, if any. Nested method declarations are not searched.
pub fn find_misplaced_suspension(body: &Block) -> Option<Span> {
    find_suspension(body, false)
}

/// Suspensions are reported only once `in_catch_region` holds, i.e. below a
/// try statement that has a catch clause.
fn find_suspension(block: &Block, in_catch_region: bool) -> Option<Span> {
    block
        .stmts
        .iter()
        .find_map(|stmt| find_in_stmt(stmt, in_catch_region))
}

fn find_in_stmt(stmt: &Stmt, in_catch_region: bool) -> Option<Span> {
    match &stmt.kind {
        StmtKind::Yield(_) if in_catch_region => Some(stmt.span),
        StmtKind::Block(block) => find_suspension(block, in_catch_region),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => find_in_stmt(then_branch, in_catch_region)
            .or_else(|| else_branch.as_ref().and_then(|e| find_in_stmt(e, in_catch_region))),
        StmtKind::While { body, .. } | StmtKind::Labeled { body, .. } => {
            find_in_stmt(body, in_catch_region)
        }
        StmtKind::Try(try_stmt) => {
            let in_region = in_catch_region || try_stmt.catch.is_some();
            find_suspension(&try_stmt.body, in_region)
                .or_else(|| {
                    try_stmt
                        .catch
                        .as_ref()
                        .and_then(|c| find_suspension(c, in_region))
                })
                .or_else(|| {
                    try_stmt
                        .finally
                        .as_ref()
                        .and_then(|f| find_suspension(f, in_region))
                })
        }
        StmtKind::Switch { cases, .. } => cases
            .iter()
            .find_map(|case| find_suspension(&case.body, in_catch_region)),
        _ => None,
    }
}

/// Memoized "contains a suspension point" check.
///
/// Keyed by block address. Only valid while the tree it was filled from is
/// alive and unmodified.
#[derive(Debug, Default)]
struct YieldCache {
    memo: HashMap<*const Block, bool>,
}

impl YieldCache {
    fn block_yields(&mut self, block: &Block) -> bool {
        let key = block as *const Block;
        if let Some(&yields) = self.memo.get(&key) {
            return yields;
        }
        let yields = block.stmts.iter().any(|stmt| self.stmt_yields(stmt));
        self.memo.insert(key, yields);
        yields
    }

    fn stmt_yields(&mut self, stmt: &Stmt) -> bool {
        match &stmt.kind {
            StmtKind::Yield(_) => true,
            StmtKind::Block(block) => self.block_yields(block),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.stmt_yields(then_branch)
                    || else_branch.as_ref().is_some_and(|e| self.stmt_yields(e))
            }
            StmtKind::While { body, .. } | StmtKind::Labeled { body, .. } => {
                self.stmt_yields(body)
            }
            StmtKind::Try(try_stmt) => {
                self.block_yields(&try_stmt.body)
                    || try_stmt.catch.as_ref().is_some_and(|c| self.block_yields(c))
                    || try_stmt.finally.as_ref().is_some_and(|f| self.block_yields(f))
            }
            StmtKind::Switch { cases, .. } => {
                cases.iter().any(|case| self.block_yields(&case.body))
            }
            // A nested method is a separate body
            StmtKind::Method(_) => false,
            StmtKind::Goto(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Expr(_)
            | StmtKind::Local(_)
            | StmtKind::Return(_)
            | StmtKind::Throw(_) => false,
        }
    }
}

struct SuspensionHoister<'a> {
    names: &'a mut dyn NameAllocator,
    config: &'a SuspendConfig,
    yields: YieldCache,
    regions_split: usize,
}

impl SuspensionHoister<'_> {
    /// Convert a block. `catch` is the handler label that faults in this
    /// block must reach, when the block sits in a split try region.
    fn convert_block(
        &mut self,
        block: &Block,
        catch: Option<&Label>,
    ) -> Result<Block, TransformError> {
        let mut out = Vec::with_capacity(block.stmts.len());

        match catch {
            None => {
                for stmt in &block.stmts {
                    self.convert_stmt(stmt, None, &mut out)?;
                }
            }
            Some(label) => {
                let mut pending = Vec::new();
                for stmt in &block.stmts {
                    if self.yields.stmt_yields(stmt) {
                        self.fold(std::mem::take(&mut pending), label, &mut out)?;
                        self.convert_stmt(stmt, catch, &mut out)?;
                    } else {
                        pending.push(stmt);
                    }
                }
                self.fold(pending, label, &mut out)?;
            }
        }

        Ok(Block {
            stmts: out,
            span: block.span,
        })
    }

    /// Emit a run of non-suspending statements under protection.
    fn fold(
        &mut self,
        pending: Vec<&Stmt>,
        label: &Label,
        out: &mut Vec<Stmt>,
    ) -> Result<(), TransformError> {
        let mut run: Vec<Stmt> = Vec::new();

        for stmt in pending {
            match &stmt.kind {
                StmtKind::Local(decl) => {
                    log::trace!("hoisting declaration of `{}`", decl.name);
                    out.push(declare(decl.name.clone(), decl.ty.clone(), stmt.span));
                    if let Some(init) = &decl.init {
                        run.push(
                            Stmt::expr(Expr::assign(decl.name.clone(), init.clone()))
                                .with_span(stmt.span),
                        );
                    }
                }
                StmtKind::Method(_) => out.push(stmt.clone()),
                // Keep jump targets at their block level so gotos still reach them
                StmtKind::Labeled { label: target, body } => {
                    flush(&mut run, label, out);
                    let inner = self.convert_child(body, Some(label))?;
                    out.push(Stmt {
                        kind: StmtKind::Labeled {
                            label: target.clone(),
                            body: Box::new(inner),
                        },
                        span: stmt.span,
                    });
                }
                _ => run.push(stmt.clone()),
            }
        }

        flush(&mut run, label, out);
        Ok(())
    }

    fn convert_stmt(
        &mut self,
        stmt: &Stmt,
        catch: Option<&Label>,
        out: &mut Vec<Stmt>,
    ) -> Result<(), TransformError> {
        if !self.yields.stmt_yields(stmt) {
            out.push(stmt.clone());
            return Ok(());
        }

        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Yield(_) => out.push(stmt.clone()),

            StmtKind::Block(block) => out.push(Stmt {
                kind: StmtKind::Block(self.convert_block(block, catch)?),
                span,
            }),

            StmtKind::Labeled { label, body } => out.push(Stmt {
                kind: StmtKind::Labeled {
                    label: label.clone(),
                    body: Box::new(self.convert_child(body, catch)?),
                },
                span,
            }),

            StmtKind::If {
                test,
                then_branch,
                else_branch,
            } => {
                let test = self.guard_test(test, catch, span, out);
                let then_branch = self.convert_child(then_branch, catch)?;
                let else_branch = match else_branch {
                    Some(e) => Some(Box::new(self.convert_child(e, catch)?)),
                    None => None,
                };
                out.push(Stmt {
                    kind: StmtKind::If {
                        test,
                        then_branch: Box::new(then_branch),
                        else_branch,
                    },
                    span,
                });
            }

            StmtKind::While { test, body } => {
                let body = self.convert_child(body, catch)?;
                let kind = match catch {
                    Some(label) if !test.is_trivial() => {
                        // while (true) { bool c; try { c = test; } catch { goto L; }
                        //                if (!c) { break; } body }
                        let mut stmts = Vec::with_capacity(4);
                        let cond = self.guard_test(test, Some(label), span, &mut stmts);
                        stmts.push(Stmt::if_else(
                            Expr::not(cond),
                            Stmt::block(vec![Stmt::new(StmtKind::Break)]),
                            None,
                        ));
                        stmts.push(body);
                        StmtKind::While {
                            test: Expr::Bool(true),
                            body: Box::new(Stmt {
                                kind: StmtKind::Block(Block { stmts, span }),
                                span,
                            }),
                        }
                    }
                    _ => StmtKind::While {
                        test: test.clone(),
                        body: Box::new(body),
                    },
                };
                out.push(Stmt { kind, span });
            }

            StmtKind::Try(try_stmt) => self.convert_try(try_stmt, span, catch, out)?,

            StmtKind::Switch {
                discriminant,
                cases,
            } => {
                if catch.is_some() {
                    return Err(TransformError::UnsupportedSite {
                        construct: "switch",
                        span,
                    });
                }
                let cases = cases
                    .iter()
                    .map(|case| {
                        Ok(SwitchCase {
                            test: case.test.clone(),
                            body: self.convert_block(&case.body, None)?,
                        })
                    })
                    .collect::<Result<Vec<_>, TransformError>>()?;
                out.push(Stmt {
                    kind: StmtKind::Switch {
                        discriminant: discriminant.clone(),
                        cases,
                    },
                    span,
                });
            }

            StmtKind::Goto(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Expr(_)
            | StmtKind::Local(_)
            | StmtKind::Return(_)
            | StmtKind::Throw(_)
            | StmtKind::Method(_) => out.push(stmt.clone()),
        }
        Ok(())
    }

    fn convert_try(
        &mut self,
        try_stmt: &TryStmt,
        span: Span,
        catch: Option<&Label>,
        out: &mut Vec<Stmt>,
    ) -> Result<(), TransformError> {
        if let Some(finally) = &try_stmt.finally {
            if self.yields.block_yields(finally) {
                return Err(TransformError::SuspensionInFinally {
                    span: find_suspension(finally, true).unwrap_or(finally.span),
                    try_span: span,
                });
            }
        }

        let handler = match &try_stmt.catch {
            Some(handler)
                if self.yields.block_yields(&try_stmt.body) || self.yields.block_yields(handler) =>
            {
                handler
            }
            _ => {
                // No catch clause of its own: children keep the outer handler
                let body = self.convert_block(&try_stmt.body, catch)?;
                let finally = match &try_stmt.finally {
                    Some(f) => Some(self.convert_block(f, catch)?),
                    None => None,
                };
                out.push(Stmt {
                    kind: StmtKind::Try(TryStmt {
                        body,
                        catch: try_stmt.catch.clone(),
                        finally,
                    }),
                    span,
                });
                return Ok(());
            }
        };

        let catch_label = self.names.allocate(&self.config.catch_hint, span);
        let ok_label = self.names.allocate(&self.config.ok_hint, span);
        self.regions_split += 1;
        log::debug!(
            "splitting try region at {}..{} (handler `{}`, exit `{}`)",
            span.start,
            span.end,
            catch_label,
            ok_label
        );

        let body = self.convert_block(&try_stmt.body, Some(&catch_label))?;
        let handler = self.convert_block(handler, catch)?;
        let handler_span = handler.span;
        let split = vec![
            Stmt {
                span: body.span,
                kind: StmtKind::Block(body),
            },
            Stmt::goto(ok_label.clone()),
            Stmt::labeled(
                catch_label,
                Stmt {
                    kind: StmtKind::Block(handler),
                    span: handler_span,
                },
            ),
            Stmt::labeled(ok_label, Stmt::block(Vec::new())),
        ];

        match &try_stmt.finally {
            Some(finally) => {
                let finally = self.convert_block(finally, catch)?;
                out.push(Stmt {
                    kind: StmtKind::Try(TryStmt {
                        body: Block { stmts: split, span },
                        catch: None,
                        finally: Some(finally),
                    }),
                    span,
                });
            }
            None => out.extend(split),
        }
        Ok(())
    }

    /// Normalized children of if/while/labeled are blocks.
    fn convert_child(
        &mut self,
        stmt: &Stmt,
        catch: Option<&Label>,
    ) -> Result<Stmt, TransformError> {
        match &stmt.kind {
            StmtKind::Block(block) => Ok(Stmt {
                kind: StmtKind::Block(self.convert_block(block, catch)?),
                span: stmt.span,
            }),
            _ => Err(TransformError::internal(
                format!("expected a block, found a {}", stmt.describe()),
                stmt.span,
            )),
        }
    }

    /// Under an active handler, evaluate a condition that may throw into a
    /// fresh boolean local inside a protected region and test the local.
    fn guard_test(
        &mut self,
        test: &Expr,
        catch: Option<&Label>,
        span: Span,
        out: &mut Vec<Stmt>,
    ) -> Expr {
        match catch {
            Some(label) if !test.is_trivial() => {
                let cond = self.names.allocate(&self.config.cond_hint, span);
                out.push(declare(cond.clone(), TargetType::Bool, span));
                out.push(protect(
                    vec![Stmt::expr(Expr::assign(cond.clone(), test.clone())).with_span(span)],
                    label,
                ));
                Expr::Local(cond)
            }
            _ => test.clone(),
        }
    }
}

fn declare(name: Label, ty: TargetType, span: Span) -> Stmt {
    Stmt {
        kind: StmtKind::Local(LocalDecl {
            name,
            ty,
            init: None,
        }),
        span,
    }
}

/// `try { stmts } catch { goto label; }`
fn protect(stmts: Vec<Stmt>, label: &Label) -> Stmt {
    let span = cover(&stmts);
    Stmt {
        kind: StmtKind::Try(TryStmt {
            body: Block { stmts, span },
            catch: Some(Block::new(vec![Stmt::goto(label.clone())])),
            finally: None,
        }),
        span,
    }
}

fn flush(run: &mut Vec<Stmt>, label: &Label, out: &mut Vec<Stmt>) {
    if !run.is_empty() {
        log::trace!("protecting {} statement(s) with `{}`", run.len(), label);
        out.push(protect(std::mem::take(run), label));
    }
}

fn cover(stmts: &[Stmt]) -> Span {
    match (stmts.first(), stmts.last()) {
        (Some(first), Some(last)) => first.span.to(last.span),
        _ => Span::DUMMY,
    }
}
