//! Call sites of bridged methods
//!
//! Once `f` is bridged, its public parameters at adjusted positions are
//! `Optional<T>`. Callers in the same module still pass native values, so
//! their arguments are wrapped, and an adjusted result is unwrapped back to
//! the native type the caller was written against.

use std::collections::HashMap;

use tern_ast::{Block, Expr, Ident, MethodDecl, Stmt, StmtKind, TargetType};

use crate::bridge::{adapt_call_args, NullableRepr, ValueAdaptation};
use crate::covariance::SignatureAdjustment;
use crate::types::TypeTranslator;

/// Conversions applied to each call of one bridged method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgedCallee {
    pub is_static: bool,
    /// One per declared parameter, receiver excluded
    pub args: Vec<ValueAdaptation>,
    /// Native return type when the bridge returns the wrapper
    pub result: Option<TargetType>,
}

impl BridgedCallee {
    pub fn new(
        bridge: &MethodDecl,
        primary: &MethodDecl,
        adjustment: &SignatureAdjustment,
        types: &dyn TypeTranslator,
    ) -> Self {
        let args = bridge
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                let source = adjustment
                    .unadjusted
                    .params
                    .get(index + 1)
                    .map_or(NullableRepr::Native, |pass| NullableRepr::of(pass, types));
                let dest = if adjustment.param(index + 1).is_some() {
                    NullableRepr::Wrapper
                } else {
                    source
                };
                ValueAdaptation {
                    source,
                    dest,
                    dest_ty: param.ty.clone(),
                }
            })
            .collect();

        Self {
            is_static: bridge.is_static,
            args,
            result: adjustment.ret.as_ref().map(|_| primary.ret.clone()),
        }
    }
}

/// Rewrites calls to registered bridged methods in place.
#[derive(Debug, Default)]
pub struct CallSiteRewriter {
    callees: HashMap<Ident, BridgedCallee>,
}

impl CallSiteRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: Ident, callee: BridgedCallee) {
        self.callees.insert(name, callee);
    }

    pub fn is_empty(&self) -> bool {
        self.callees.is_empty()
    }

    /// Number of calls rewritten in `block`, nested method declarations
    /// included.
    pub fn rewrite_block(&self, block: &mut Block) -> usize {
        block.stmts.iter_mut().map(|stmt| self.rewrite_stmt(stmt)).sum()
    }

    fn rewrite_stmt(&self, stmt: &mut Stmt) -> usize {
        match &mut stmt.kind {
            StmtKind::Block(block) => self.rewrite_block(block),
            StmtKind::If {
                test,
                then_branch,
                else_branch,
            } => {
                self.rewrite_expr(test)
                    + self.rewrite_stmt(then_branch)
                    + else_branch.as_mut().map_or(0, |e| self.rewrite_stmt(e))
            }
            StmtKind::While { test, body } => self.rewrite_expr(test) + self.rewrite_stmt(body),
            StmtKind::Try(try_stmt) => {
                self.rewrite_block(&mut try_stmt.body)
                    + try_stmt.catch.as_mut().map_or(0, |c| self.rewrite_block(c))
                    + try_stmt.finally.as_mut().map_or(0, |f| self.rewrite_block(f))
            }
            StmtKind::Labeled { body, .. } => self.rewrite_stmt(body),
            StmtKind::Expr(expr) | StmtKind::Throw(expr) => self.rewrite_expr(expr),
            StmtKind::Local(decl) => decl.init.as_mut().map_or(0, |e| self.rewrite_expr(e)),
            StmtKind::Return(value) => value.as_mut().map_or(0, |e| self.rewrite_expr(e)),
            StmtKind::Yield(suspension) => {
                suspension.value.as_mut().map_or(0, |e| self.rewrite_expr(e))
            }
            StmtKind::Method(method) => self.rewrite_block(&mut method.body),
            StmtKind::Switch {
                discriminant,
                cases,
            } => {
                let mut count = self.rewrite_expr(discriminant);
                for case in cases {
                    count += case.test.as_mut().map_or(0, |t| self.rewrite_expr(t));
                    count += self.rewrite_block(&mut case.body);
                }
                count
            }
            StmtKind::Goto(_) | StmtKind::Break | StmtKind::Continue => 0,
        }
    }

    fn rewrite_expr(&self, expr: &mut Expr) -> usize {
        // Arguments first, so `f(f(1))` converts the inner call too
        let nested = match &mut *expr {
            Expr::Null
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::Str(_)
            | Expr::Local(_)
            | Expr::This
            | Expr::WrapNone(_) => 0,
            Expr::Assign { value, .. }
            | Expr::Not(value)
            | Expr::Cast { value, .. }
            | Expr::Is { value, .. }
            | Expr::Wrap { value, .. }
            | Expr::Unwrap { value, .. } => self.rewrite_expr(value),
            Expr::Binary { left, right, .. } => self.rewrite_expr(left) + self.rewrite_expr(right),
            Expr::Call { args, .. } => args.iter_mut().map(|a| self.rewrite_expr(a)).sum(),
            Expr::MethodCall { receiver, args, .. } => {
                self.rewrite_expr(receiver)
                    + args.iter_mut().map(|a| self.rewrite_expr(a)).sum::<usize>()
            }
        };

        let Some(callee) = self.callee_of(expr) else {
            return nested;
        };
        let call = match std::mem::replace(expr, Expr::Null) {
            Expr::Call { callee: name, args } => Expr::Call {
                callee: name,
                args: adapt_call_args(args, &callee.args),
            },
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => Expr::MethodCall {
                receiver,
                method,
                args: adapt_call_args(args, &callee.args),
            },
            other => other,
        };
        // The caller was written against the native result, `object` included
        *expr = match &callee.result {
            Some(native) => Expr::Unwrap {
                ty: native.clone(),
                value: Box::new(call),
            },
            None => call,
        };
        nested + 1
    }

    /// The bridged method `expr` calls, if any. Instance methods are matched
    /// only on `this`, and the argument count must agree.
    fn callee_of(&self, expr: &Expr) -> Option<&BridgedCallee> {
        let (name, args, is_static) = match expr {
            Expr::Call { callee, args } => (callee, args, true),
            Expr::MethodCall {
                receiver,
                method,
                args,
            } if **receiver == Expr::This => (method, args, false),
            _ => return None,
        };
        self.callees
            .get(name)
            .filter(|callee| callee.is_static == is_static && callee.args.len() == args.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covariance::ParamAdjustment;
    use crate::types::DefaultTypeTranslator;
    use pretty_assertions::assert_eq;
    use tern_ast::{ParamDecl, Visibility};
    use tern_diagnostics::Span;
    use tern_types::{PassType, Signature, Type};

    fn decl(name: &str, param: TargetType, ret: TargetType) -> MethodDecl {
        MethodDecl {
            name: Ident::from(name),
            visibility: Visibility::Public,
            is_static: false,
            params: vec![ParamDecl::new("x", param), ParamDecl::new("y", TargetType::Int)],
            ret,
            body: Block::new(vec![]),
            span: Span::DUMMY,
        }
    }

    /// `g(x, y)` bridged on `x` and on the return.
    fn rewriter() -> CallSiteRewriter {
        let opt_int = TargetType::optional(TargetType::Int);
        let bridge = decl("g", opt_int.clone(), opt_int);
        let primary = decl("g_", TargetType::Int, TargetType::Int);
        let wrapped = ParamAdjustment::Wrapped {
            native: PassType::of(&Type::Int),
        };
        let adjustment = SignatureAdjustment {
            unadjusted: Signature::new(
                vec![
                    PassType::of(&Type::Named("C".to_string())),
                    PassType::of(&Type::Int),
                    PassType::of(&Type::Int),
                ],
                PassType::of(&Type::Int),
            ),
            params: vec![None, Some(wrapped.clone()), None],
            ret: Some(wrapped),
        };

        let mut rewriter = CallSiteRewriter::new();
        rewriter.register(
            Ident::from("g"),
            BridgedCallee::new(&bridge, &primary, &adjustment, &DefaultTypeTranslator),
        );
        rewriter
    }

    fn call_g(x: Expr) -> Expr {
        Expr::MethodCall {
            receiver: Box::new(Expr::This),
            method: Ident::from("g"),
            args: vec![x, Expr::Int(2)],
        }
    }

    fn converted(x: Expr) -> Expr {
        Expr::Unwrap {
            ty: TargetType::Int,
            value: Box::new(Expr::MethodCall {
                receiver: Box::new(Expr::This),
                method: Ident::from("g"),
                args: vec![x, Expr::Int(2)],
            }),
        }
    }

    #[test]
    fn test_adjusted_argument_wrapped_and_result_unwrapped() {
        let mut body = Block::new(vec![
            Stmt::local("r", TargetType::Int, Some(call_g(Expr::Int(1)))),
            Stmt::ret(Some(call_g(Expr::Null))),
        ]);
        assert_eq!(rewriter().rewrite_block(&mut body), 2);

        let expected = Block::new(vec![
            Stmt::local(
                "r",
                TargetType::Int,
                Some(converted(Expr::Wrap {
                    ty: TargetType::Int,
                    value: Box::new(Expr::Int(1)),
                })),
            ),
            Stmt::ret(Some(converted(Expr::WrapNone(TargetType::Int)))),
        ]);
        assert_eq!(body, expected);
    }

    #[test]
    fn test_nested_calls_both_converted() {
        let mut body = Block::new(vec![Stmt::expr(call_g(call_g(Expr::local("a"))))]);
        assert_eq!(rewriter().rewrite_block(&mut body), 2);

        let inner = converted(Expr::Wrap {
            ty: TargetType::Int,
            value: Box::new(Expr::local("a")),
        });
        let outer = converted(Expr::Wrap {
            ty: TargetType::Int,
            value: Box::new(inner),
        });
        assert_eq!(body, Block::new(vec![Stmt::expr(outer)]));
    }

    #[test]
    fn test_unrelated_calls_untouched() {
        let other_receiver = Expr::MethodCall {
            receiver: Box::new(Expr::local("other")),
            method: Ident::from("g"),
            args: vec![Expr::Int(1), Expr::Int(2)],
        };
        let wrong_arity = Expr::MethodCall {
            receiver: Box::new(Expr::This),
            method: Ident::from("g"),
            args: vec![Expr::Int(1)],
        };
        let static_call = Expr::call("g", vec![Expr::Int(1), Expr::Int(2)]);
        let original = Block::new(vec![
            Stmt::expr(other_receiver),
            Stmt::expr(wrong_arity),
            Stmt::expr(static_call),
        ]);

        let mut body = original.clone();
        assert_eq!(rewriter().rewrite_block(&mut body), 0);
        assert_eq!(body, original);
    }
}
