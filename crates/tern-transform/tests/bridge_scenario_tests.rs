//! `interface I<T> { f(x: T?) }` implemented by `class C : I<Int> { f(x: Int) }`

use pretty_assertions::assert_eq;
use tern_ast::{
    Block, Completion, Evaluator, Event, Expr, Ident, MethodDecl, ParamDecl, Stmt, TargetType,
    Value, Visibility,
};
use tern_diagnostics::{DiagnosticCode, Span};
use tern_transform::{
    find_misplaced_suspension, forwarded_to, load_module, Backend, BackendConfig, MethodUnit,
    ModuleUnit, OverriddenMember,
};
use tern_types::{PassType, Signature, Type, TypeFormal};

fn interface_member() -> OverriddenMember {
    let t = Type::param(TypeFormal::of_type("I", "T"));
    OverriddenMember::new(
        "I",
        Signature::new(
            vec![PassType::of(&Type::Named("I".to_string())), PassType::new(t, true)],
            PassType::of(&Type::Void),
        ),
    )
}

fn class_f(body: Vec<Stmt>) -> MethodUnit {
    let method = MethodDecl {
        name: Ident::from("f"),
        visibility: Visibility::Public,
        is_static: false,
        params: vec![ParamDecl::new("x", TargetType::Int)],
        ret: TargetType::Void,
        body: Block::new(body),
        span: Span::DUMMY,
    };
    let signature = Signature::new(
        vec![PassType::of(&Type::Named("C".to_string())), PassType::of(&Type::Int)],
        PassType::of(&Type::Void),
    );
    MethodUnit::new(method).overriding(signature, vec![interface_member()])
}

fn module(methods: Vec<MethodUnit>) -> ModuleUnit {
    ModuleUnit {
        name: "c".to_string(),
        methods,
    }
}

#[test]
fn test_bridge_unwraps_and_forwards() {
    let body = vec![Stmt::expr(Expr::call("record", vec![Expr::local("x")]))];
    let lowered =
        Backend::new(BackendConfig::default()).lower_module(&module(vec![class_f(body.clone())]));
    assert!(!lowered.diagnostics.has_errors());

    let f = &lowered.methods[0];
    let (bridge, primary) = (&f.decls[0], &f.decls[1]);
    assert_eq!(bridge.name, Ident::from("f"));
    assert_eq!(bridge.visibility, Visibility::Public);
    assert_eq!(bridge.params, vec![ParamDecl::new("x", TargetType::optional(TargetType::Int))]);
    assert_eq!(forwarded_to(bridge), Some(&primary.name));

    assert_eq!(primary.name, Ident::from("f_"));
    assert_eq!(primary.visibility, Visibility::Private);
    assert_eq!(primary.params, vec![ParamDecl::new("x", TargetType::Int)]);
    assert_eq!(primary.body, Block::new(body));

    // Calling the bridge with Optional<int>.Some(5) reaches f_ with 5
    let mut eval = Evaluator::new().with_local("x", Value::Wrapped(Some(Box::new(Value::Int(5)))));
    assert_eq!(eval.run(&bridge.body).unwrap(), Completion::Finished);
    assert_eq!(
        eval.trace(),
        &[Event::Call {
            callee: "f_".to_string(),
            args: vec![Value::Int(5)],
        }]
    );
}

#[test]
fn test_sibling_calls_pass_the_wrapper() {
    let this_f = |arg: Expr| Expr::MethodCall {
        receiver: Box::new(Expr::This),
        method: Ident::from("f"),
        args: vec![arg],
    };
    let caller = MethodDecl {
        name: Ident::from("g"),
        visibility: Visibility::Public,
        is_static: false,
        params: Vec::new(),
        ret: TargetType::Void,
        body: Block::new(vec![
            Stmt::expr(this_f(Expr::Int(5))),
            Stmt::expr(this_f(Expr::Null)),
        ]),
        span: Span::DUMMY,
    };
    let recursive = vec![Stmt::expr(this_f(Expr::local("x")))];
    let lowered = Backend::new(BackendConfig::default()).lower_module(&module(vec![
        class_f(recursive),
        MethodUnit::new(caller),
    ]));
    assert!(!lowered.diagnostics.has_errors());

    let g = &lowered.methods[1];
    assert_eq!(g.calls_adapted, 2);
    assert_eq!(
        g.decls[0].body,
        Block::new(vec![
            Stmt::expr(this_f(Expr::Wrap {
                ty: TargetType::Int,
                value: Box::new(Expr::Int(5)),
            })),
            Stmt::expr(this_f(Expr::WrapNone(TargetType::Int))),
        ])
    );

    // The primary's own recursive call goes back through the bridge
    let f = &lowered.methods[0];
    assert_eq!(f.calls_adapted, 1);
    assert_eq!(
        f.decls[1].body,
        Block::new(vec![Stmt::expr(this_f(Expr::Wrap {
            ty: TargetType::Int,
            value: Box::new(Expr::local("x")),
        }))])
    );
    assert_eq!(forwarded_to(&f.decls[0]), Some(&Ident::from("f_")));
}

#[test]
fn test_bridged_generator_is_hoisted_first() {
    let body = vec![Stmt::try_stmt(
        Block::new(vec![Stmt::yield_value(Some(Expr::local("x")))]),
        Some(Block::new(vec![Stmt::expr(Expr::call("handler", vec![]))])),
        None,
    )];
    let lowered = Backend::new(BackendConfig::default()).lower_module(&module(vec![class_f(body)]));

    let f = &lowered.methods[0];
    assert_eq!(f.regions_split, 1);
    assert_eq!(find_misplaced_suspension(&f.decls[1].body), None);

    let codes: Vec<DiagnosticCode> = lowered.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![DiagnosticCode::TryRegionSplit, DiagnosticCode::BridgeSynthesized]
    );
}

#[test]
fn test_primary_suffix_from_config() {
    let config = BackendConfig::from_toml_str("[bridge]\nprimary_suffix = \"Impl\"").unwrap();
    let lowered = Backend::new(config).lower_module(&module(vec![class_f(Vec::new())]));
    assert_eq!(lowered.methods[0].decls[1].name, Ident::from("fImpl"));
}

#[test]
fn test_module_round_trips_through_json_file() {
    let original = module(vec![class_f(vec![Stmt::ret(None)])]);
    let path = std::env::temp_dir().join(format!("tern-module-{}.json", std::process::id()));
    std::fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();

    let loaded = load_module(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, original);

    let missing = load_module(&path.with_extension("missing"));
    assert!(missing.is_err());
}
