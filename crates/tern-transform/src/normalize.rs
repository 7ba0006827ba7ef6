//! Block normalization
//!
//! Rewrites the consequent and alternate of `if`, the body of `while` and
//! the inner statement of a labeled statement into blocks, so later passes
//! always have a block to splice synthesized statements into. try/catch/
//! finally clauses are blocks by construction. Nested method declarations
//! are separate bodies and are left alone.

use tern_ast::{Block, Stmt, StmtKind, SwitchCase, TryStmt};

pub fn normalize_block(block: &Block) -> Block {
    Block {
        stmts: block.stmts.iter().map(normalize_stmt).collect(),
        span: block.span,
    }
}

fn normalize_stmt(stmt: &Stmt) -> Stmt {
    let kind = match &stmt.kind {
        StmtKind::Block(block) => StmtKind::Block(normalize_block(block)),
        StmtKind::If {
            test,
            then_branch,
            else_branch,
        } => StmtKind::If {
            test: test.clone(),
            then_branch: Box::new(as_block(normalize_stmt(then_branch))),
            else_branch: else_branch
                .as_ref()
                .map(|e| Box::new(as_block(normalize_stmt(e)))),
        },
        StmtKind::While { test, body } => StmtKind::While {
            test: test.clone(),
            body: Box::new(as_block(normalize_stmt(body))),
        },
        StmtKind::Labeled { label, body } => StmtKind::Labeled {
            label: label.clone(),
            body: Box::new(as_block(normalize_stmt(body))),
        },
        StmtKind::Try(try_stmt) => StmtKind::Try(TryStmt {
            body: normalize_block(&try_stmt.body),
            catch: try_stmt.catch.as_ref().map(normalize_block),
            finally: try_stmt.finally.as_ref().map(normalize_block),
        }),
        StmtKind::Switch {
            discriminant,
            cases,
        } => StmtKind::Switch {
            discriminant: discriminant.clone(),
            cases: cases
                .iter()
                .map(|case| SwitchCase {
                    test: case.test.clone(),
                    body: normalize_block(&case.body),
                })
                .collect(),
        },
        other => other.clone(),
    };
    Stmt {
        kind,
        span: stmt.span,
    }
}

/// Wrap a non-block statement in a singleton block with the same span.
fn as_block(stmt: Stmt) -> Stmt {
    match stmt.kind {
        StmtKind::Block(_) => stmt,
        _ => {
            let span = stmt.span;
            Stmt {
                kind: StmtKind::Block(Block {
                    stmts: vec![stmt],
                    span,
                }),
                span,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tern_ast::{Expr, Ident};

    #[test]
    fn test_wraps_bare_branches() {
        let body = Block::new(vec![Stmt::if_else(
            Expr::local("c"),
            Stmt::yield_value(None),
            Some(Stmt::new(StmtKind::Break)),
        )]);

        let expected = Block::new(vec![Stmt::if_else(
            Expr::local("c"),
            Stmt::block(vec![Stmt::yield_value(None)]),
            Some(Stmt::block(vec![Stmt::new(StmtKind::Break)])),
        )]);
        assert_eq!(normalize_block(&body), expected);
    }

    #[test]
    fn test_labeled_while_body_nested() {
        let body = Block::new(vec![Stmt::labeled(
            Ident::from("outer"),
            Stmt::while_loop(Expr::Bool(true), Stmt::yield_value(None)),
        )]);

        let expected = Block::new(vec![Stmt::labeled(
            Ident::from("outer"),
            Stmt::block(vec![Stmt::while_loop(
                Expr::Bool(true),
                Stmt::block(vec![Stmt::yield_value(None)]),
            )]),
        )]);
        assert_eq!(normalize_block(&body), expected);
    }

    #[test]
    fn test_blocks_unchanged() {
        let body = Block::new(vec![Stmt::while_loop(
            Expr::local("c"),
            Stmt::block(vec![Stmt::yield_value(None)]),
        )]);
        assert_eq!(normalize_block(&body), body);
    }
}
