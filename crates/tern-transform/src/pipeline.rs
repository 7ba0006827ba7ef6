//! Per-module driver
//!
//! Runs the backend passes over every method of a module: suspension
//! hoisting first, then covariance analysis and bridge synthesis for
//! overrides, and finally wrap/unwrap of the module's own calls to bridged
//! methods. All methods share one name allocator so labels and bridge names
//! are unique across the output file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tern_ast::{Ident, MethodDecl, NameAllocator, UniqueNames};
use tern_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use tern_types::Signature;

use crate::bridge::BridgeSynthesizer;
use crate::call_sites::{BridgedCallee, CallSiteRewriter};
use crate::config::BackendConfig;
use crate::covariance::{CovarianceAnalyzer, OverriddenMember, SignatureAdjustment};
use crate::error::TransformError;
use crate::suspend::hoist_suspensions;
use crate::types::{DefaultTypeTranslator, TypeTranslator};

/// A method as handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodUnit {
    pub method: MethodDecl,
    /// Source signature, receiver first; needed for override analysis
    #[serde(default)]
    pub signature: Option<Signature>,
    #[serde(default)]
    pub overrides: Vec<OverriddenMember>,
}

impl MethodUnit {
    pub fn new(method: MethodDecl) -> Self {
        Self {
            method,
            signature: None,
            overrides: Vec::new(),
        }
    }

    pub fn overriding(mut self, signature: Signature, overrides: Vec<OverriddenMember>) -> Self {
        self.signature = Some(signature);
        self.overrides = overrides;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUnit {
    pub name: String,
    pub methods: Vec<MethodUnit>,
}

/// Output for one input method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoweredMethod {
    /// Name of the input method
    pub name: Ident,
    /// The rewritten method, or bridge followed by primary
    pub decls: Vec<MethodDecl>,
    pub regions_split: usize,
    /// Calls to bridged methods converted in this method's bodies
    pub calls_adapted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<SignatureAdjustment>,
}

impl LoweredMethod {
    pub fn is_bridged(&self) -> bool {
        self.decls.len() > 1
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoweredModule {
    pub name: String,
    pub methods: Vec<LoweredMethod>,
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

pub struct Backend {
    config: BackendConfig,
    types: Box<dyn TypeTranslator>,
}

impl Backend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            types: Box::new(DefaultTypeTranslator),
        }
    }

    pub fn with_translator(mut self, types: Box<dyn TypeTranslator>) -> Self {
        self.types = types;
        self
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Lower every method of a module. A method that fails is reported in
    /// the diagnostics and left out of the output; the rest still lower.
    pub fn lower_module(&self, module: &ModuleUnit) -> LoweredModule {
        let mut names = UniqueNames::new();
        let mut diagnostics = Diagnostics::new();
        let mut methods = Vec::with_capacity(module.methods.len());

        // Pre-scan: every declared name is taken before anything is allocated
        for unit in &module.methods {
            names.reserve_method(&unit.method);
        }

        for unit in &module.methods {
            match self.lower_method(unit, &mut names) {
                Ok(lowered) => {
                    diagnostics.extend(notes_for(&lowered, unit));
                    methods.push(lowered);
                }
                Err(err) => {
                    log::warn!("failed to lower `{}`: {}", unit.method.name, err);
                    diagnostics.push(err.to_diagnostic());
                }
            }
        }

        self.adapt_call_sites(&mut methods);

        log::info!(
            "lowered module `{}`: {} of {} method(s), {} error(s)",
            module.name,
            methods.len(),
            module.methods.len(),
            diagnostics.error_count()
        );

        LoweredModule {
            name: module.name.clone(),
            methods,
            diagnostics,
        }
    }

    /// Rewrite every call to a bridged method of this module so it passes
    /// the wrapper at adjusted positions.
    fn adapt_call_sites(&self, methods: &mut [LoweredMethod]) {
        let mut rewriter = CallSiteRewriter::new();
        for lowered in methods.iter() {
            if let (Some(adjustment), [bridge, primary]) =
                (&lowered.adjustment, lowered.decls.as_slice())
            {
                rewriter.register(
                    bridge.name.clone(),
                    BridgedCallee::new(bridge, primary, adjustment, self.types.as_ref()),
                );
            }
        }
        if rewriter.is_empty() {
            return;
        }

        for lowered in methods.iter_mut() {
            lowered.calls_adapted = lowered
                .decls
                .iter_mut()
                .map(|decl| rewriter.rewrite_block(&mut decl.body))
                .sum();
            if lowered.calls_adapted > 0 {
                log::debug!(
                    "adapted {} call(s) to bridged methods in `{}`",
                    lowered.calls_adapted,
                    lowered.name
                );
            }
        }
    }

    /// Hoist suspensions out of the body, then bridge the method if it is
    /// an override that needs one.
    pub fn lower_method(
        &self,
        unit: &MethodUnit,
        names: &mut dyn NameAllocator,
    ) -> Result<LoweredMethod, TransformError> {
        let method = &unit.method;
        log::debug!("lowering `{}`", method.name);

        let hoisted = hoist_suspensions(&method.body, names, &self.config.suspend)?;
        let rewritten = MethodDecl {
            body: hoisted.body,
            ..method.clone()
        };

        let adjustment = match &unit.signature {
            Some(signature) if !unit.overrides.is_empty() => {
                CovarianceAnalyzer::new(self.types.as_ref(), &self.config.covariance)
                    .analyze(signature, &unit.overrides)
            }
            _ => None,
        };

        let decls = match &adjustment {
            Some(adjustment) => {
                let pair = BridgeSynthesizer::new(self.types.as_ref(), &self.config.bridge)
                    .synthesize(&rewritten, adjustment, names)?;
                vec![pair.bridge, pair.primary]
            }
            None => vec![rewritten],
        };

        Ok(LoweredMethod {
            name: method.name.clone(),
            decls,
            regions_split: hoisted.regions_split,
            calls_adapted: 0,
            adjustment,
        })
    }
}

fn notes_for(lowered: &LoweredMethod, unit: &MethodUnit) -> Vec<Diagnostic> {
    let mut notes = Vec::new();
    if lowered.regions_split > 0 {
        notes.push(
            Diagnostic::new(
                DiagnosticCode::TryRegionSplit,
                format!(
                    "split {} try region(s) around suspension points in `{}`",
                    lowered.regions_split, lowered.name
                ),
            )
            .with_span(unit.method.span)
            .build(),
        );
    }
    if let Some(primary) = lowered.decls.get(1) {
        notes.push(
            Diagnostic::new(
                DiagnosticCode::BridgeSynthesized,
                format!(
                    "`{}` now forwards to private `{}` with native parameter types",
                    lowered.name, primary.name
                ),
            )
            .with_span(unit.method.span)
            .build(),
        );
    }
    notes
}

/// Read a module from a JSON file.
pub fn load_module(path: &Path) -> Result<ModuleUnit> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&source)
        .with_context(|| format!("failed to parse module {}", path.display()))
}

/// Read a single method unit from a JSON file.
pub fn load_method(path: &Path) -> Result<MethodUnit> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&source)
        .with_context(|| format!("failed to parse method {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::{Block, Expr, ParamDecl, Stmt, TargetType, Visibility};
    use tern_diagnostics::Span;
    use tern_types::{PassType, Type, TypeFormal};

    fn method(name: &str, body: Vec<Stmt>) -> MethodDecl {
        MethodDecl {
            name: Ident::from(name),
            visibility: Visibility::Public,
            is_static: false,
            params: Vec::new(),
            ret: TargetType::Void,
            body: Block::new(body),
            span: Span::DUMMY,
        }
    }

    fn generator(name: &str) -> MethodUnit {
        MethodUnit::new(method(
            name,
            vec![Stmt::try_stmt(
                Block::new(vec![Stmt::yield_value(Some(Expr::Int(1)))]),
                Some(Block::new(vec![])),
                None,
            )],
        ))
    }

    fn override_of_i() -> MethodUnit {
        let t = Type::param(TypeFormal::of_type("I", "T"));
        let member = OverriddenMember::new(
            "I",
            Signature::new(
                vec![PassType::of(&Type::Named("I".to_string())), PassType::new(t, true)],
                PassType::of(&Type::Void),
            ),
        );
        let signature = Signature::new(
            vec![PassType::of(&Type::Named("C".to_string())), PassType::of(&Type::Int)],
            PassType::of(&Type::Void),
        );
        let mut decl = method("f", vec![Stmt::expr(Expr::call("work", vec![]))]);
        decl.params.push(ParamDecl::new("x", TargetType::Int));
        MethodUnit::new(decl).overriding(signature, vec![member])
    }

    #[test]
    fn test_labels_unique_across_module() {
        let module = ModuleUnit {
            name: "m".to_string(),
            methods: vec![generator("a"), generator("b")],
        };
        let lowered = Backend::new(BackendConfig::default()).lower_module(&module);
        assert_eq!(lowered.methods.len(), 2);

        let second = &lowered.methods[1].decls[0].body;
        assert_eq!(second.stmts[1], Stmt::goto(Ident::from("__ok1")));
        assert_eq!(lowered.diagnostics.hint_count(), 2);
    }

    #[test]
    fn test_failed_method_reported_and_skipped() {
        let bad = MethodUnit::new(method(
            "bad",
            vec![Stmt::try_stmt(
                Block::new(vec![]),
                None,
                Some(Block::new(vec![Stmt::yield_value(None)])),
            )],
        ));
        let module = ModuleUnit {
            name: "m".to_string(),
            methods: vec![bad, generator("good")],
        };
        let lowered = Backend::new(BackendConfig::default()).lower_module(&module);

        assert_eq!(lowered.methods.len(), 1);
        assert_eq!(lowered.methods[0].name, Ident::from("good"));
        assert_eq!(lowered.diagnostics.error_count(), 1);
        let error = lowered.diagnostics.iter().find(|d| d.is_error()).unwrap();
        assert_eq!(error.code, DiagnosticCode::SuspensionInFinally);
    }

    #[test]
    fn test_override_is_bridged() {
        let module = ModuleUnit {
            name: "m".to_string(),
            methods: vec![override_of_i()],
        };
        let lowered = Backend::new(BackendConfig::default()).lower_module(&module);
        let f = &lowered.methods[0];
        assert!(f.is_bridged());
        assert_eq!(f.decls[0].name, Ident::from("f"));
        assert_eq!(f.decls[0].params[0].ty, TargetType::optional(TargetType::Int));
        assert_eq!(f.decls[1].name, Ident::from("f_"));
        assert_eq!(f.decls[1].visibility, Visibility::Private);
    }

    #[test]
    fn test_plain_method_passes_through() {
        let unit = MethodUnit::new(method("plain", vec![Stmt::ret(None)]));
        let mut names = UniqueNames::new();
        let lowered = Backend::new(BackendConfig::default())
            .lower_method(&unit, &mut names)
            .unwrap();
        assert_eq!(lowered.decls, vec![unit.method.clone()]);
        assert!(lowered.adjustment.is_none());
    }

    #[test]
    fn test_method_unit_from_json() {
        let json = r#"{
            "method": {
                "name": "gen",
                "visibility": "Public",
                "params": [{ "name": "n", "ty": "Int" }],
                "ret": "Void",
                "body": { "stmts": [
                    { "kind": { "Yield": { "kind": "Yield", "value": { "Local": "n" } } } }
                ] }
            }
        }"#;
        let unit: MethodUnit = serde_json::from_str(json).unwrap();
        assert_eq!(unit.method.params[0].name, Ident::from("n"));
        assert!(unit.signature.is_none());
        assert_eq!(unit.method.body.stmts.len(), 1);
    }
}
