//! Structural properties of hoisted bodies

mod common;

use common::{call, hoist, yield_int, TreeGen};
use pretty_assertions::assert_eq;
use tern_ast::{Block, Expr, Stmt, StmtKind, UniqueNames};
use tern_transform::config::SuspendConfig;
use tern_transform::{find_misplaced_suspension, hoist_suspensions, TransformError};

#[test]
fn test_no_suspension_left_in_catch_regions() {
    let mut violating = 0;
    for seed in 1..=200u64 {
        let original = TreeGen::new(seed, 4).body();
        if find_misplaced_suspension(&original).is_some() {
            violating += 1;
        }
        let rewritten = hoist(&original);
        assert_eq!(find_misplaced_suspension(&rewritten), None, "seed {}", seed);
    }
    // The generator must actually produce interesting inputs
    assert!(violating > 10, "only {} violating inputs", violating);
}

#[test]
fn test_hoisting_twice_changes_nothing() {
    for seed in 1..=100u64 {
        let once = hoist(&TreeGen::new(seed, 3).body());
        assert_eq!(hoist(&once), once, "seed {}", seed);
    }
}

#[test]
fn test_non_suspending_bodies_unchanged() {
    let body = Block::new(vec![
        Stmt::try_stmt(
            Block::new(vec![call("a"), Stmt::while_loop(Expr::local("c"), call("b"))]),
            Some(Block::new(vec![call("h")])),
            Some(Block::new(vec![call("f")])),
        ),
        Stmt::ret(None),
    ]);
    assert_eq!(hoist(&body), body);
}

#[test]
fn test_suspension_in_nested_method_ignored() {
    // A local method is a separate body; its suspensions are not hoisted here
    let nested = tern_ast::MethodDecl {
        name: "inner".into(),
        visibility: tern_ast::Visibility::Private,
        is_static: true,
        params: Vec::new(),
        ret: tern_ast::TargetType::Void,
        body: Block::new(vec![Stmt::try_stmt(
            Block::new(vec![yield_int(1)]),
            Some(Block::new(vec![])),
            None,
        )]),
        span: Default::default(),
    };
    let body = Block::new(vec![Stmt::new(StmtKind::Method(Box::new(nested)))]);
    assert_eq!(hoist(&body), body);
}

#[test]
fn test_input_not_modified() {
    let body = TreeGen::new(42, 3).body();
    let copy = body.clone();
    let _ = hoist(&body);
    assert_eq!(body, copy);
}

#[test]
fn test_custom_label_hints() {
    let body = Block::new(vec![Stmt::try_stmt(
        Block::new(vec![yield_int(1)]),
        Some(Block::new(vec![])),
        None,
    )]);
    let config = SuspendConfig {
        catch_hint: "on_error".to_string(),
        ok_hint: "done".to_string(),
        cond_hint: "test".to_string(),
    };
    let mut names = UniqueNames::new();
    let outcome = hoist_suspensions(&body, &mut names, &config).unwrap();
    assert_eq!(outcome.body.stmts[1], Stmt::goto("done".into()));
    assert!(matches!(
        &outcome.body.stmts[2].kind,
        StmtKind::Labeled { label, .. } if label.as_str() == "on_error"
    ));
}

#[test]
fn test_yield_in_catch_finally_error_carries_spans() {
    use tern_diagnostics::{FileId, Span};

    let yield_span = Span::new(FileId(0), 40, 48);
    let try_span = Span::new(FileId(0), 0, 60);
    let body = Block::new(vec![Stmt::try_stmt(
        Block::new(vec![yield_int(1)]),
        Some(Block::new(vec![])),
        Some(Block::new(vec![yield_int(2).with_span(yield_span)])),
    )
    .with_span(try_span)]);

    let mut names = UniqueNames::new();
    let err = hoist_suspensions(&body, &mut names, &SuspendConfig::default()).unwrap_err();
    assert_eq!(
        err,
        TransformError::SuspensionInFinally {
            span: yield_span,
            try_span,
        }
    );
    assert_eq!(err.to_diagnostic().labels[0].span, try_span);
}
