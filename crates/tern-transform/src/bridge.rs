//! Bridge synthesis and call-site conversion
//!
//! For an override whose target signature disagrees with the member it
//! overrides (see [`crate::covariance`]), the method is split in two:
//!
//! ```text
//! public int f(int x) { body }
//!   =>
//! public Optional<int> f(Optional<int> x) { return Optional<int>.Some(this.f_(x.Value)); }
//! private int f_(int x) { body }
//! ```
//!
//! The bridge keeps the name and visibility the supertype expects; the
//! primary keeps the body and its native types.

use tern_ast::{
    Block, Expr, Ident, MethodDecl, NameAllocator, ParamDecl, Stmt, StmtKind, TargetType,
    Visibility,
};
use tern_types::PassType;

use crate::config::BridgeConfig;
use crate::covariance::SignatureAdjustment;
use crate::error::TransformError;
use crate::types::TypeTranslator;

/// How a nullable value is represented at some position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullableRepr {
    /// The target's own nullable form (`int?`, a reference, `T`)
    Native,
    /// `Optional<T>`
    Wrapper,
}

impl NullableRepr {
    pub fn of(pass: &PassType, types: &dyn TypeTranslator) -> Self {
        if types.is_optional_type_argument(pass) {
            NullableRepr::Wrapper
        } else {
            NullableRepr::Native
        }
    }
}

/// Convert `value` from the `source` representation to the `dest`
/// representation. `dest_ty` is the target type of the destination.
pub fn adapt_value(
    value: Expr,
    source: NullableRepr,
    dest: NullableRepr,
    dest_ty: &TargetType,
) -> Expr {
    match (source, dest) {
        (NullableRepr::Native, NullableRepr::Native)
        | (NullableRepr::Wrapper, NullableRepr::Wrapper) => value,
        (NullableRepr::Native, NullableRepr::Wrapper) => {
            let inner = match dest_ty {
                TargetType::Optional(inner) => (**inner).clone(),
                other => other.clone(),
            };
            match value {
                Expr::Null => Expr::WrapNone(inner),
                value => Expr::Wrap {
                    ty: inner,
                    value: Box::new(value),
                },
            }
        }
        // Type tests and casts against `object` accept the wrapper as is
        (NullableRepr::Wrapper, NullableRepr::Native) if dest_ty.is_top() => value,
        (NullableRepr::Wrapper, NullableRepr::Native) => Expr::Unwrap {
            ty: dest_ty.clone(),
            value: Box::new(value),
        },
    }
}

/// Representation change for one call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueAdaptation {
    pub source: NullableRepr,
    pub dest: NullableRepr,
    pub dest_ty: TargetType,
}

/// Apply [`adapt_value`] to each argument. Arguments past the end of
/// `adaptations` are passed through.
pub fn adapt_call_args(args: Vec<Expr>, adaptations: &[ValueAdaptation]) -> Vec<Expr> {
    args.into_iter()
        .enumerate()
        .map(|(index, arg)| match adaptations.get(index) {
            Some(a) => adapt_value(arg, a.source, a.dest, &a.dest_ty),
            None => arg,
        })
        .collect()
}

/// The two methods replacing an adjusted override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgePair {
    /// Original name and visibility, wrapper types at adjusted positions
    pub bridge: MethodDecl,
    /// Private, renamed, original body and types
    pub primary: MethodDecl,
}

pub struct BridgeSynthesizer<'a> {
    types: &'a dyn TypeTranslator,
    config: &'a BridgeConfig,
}

impl<'a> BridgeSynthesizer<'a> {
    pub fn new(types: &'a dyn TypeTranslator, config: &'a BridgeConfig) -> Self {
        Self { types, config }
    }

    pub fn synthesize(
        &self,
        method: &MethodDecl,
        adjustment: &SignatureAdjustment,
        names: &mut dyn NameAllocator,
    ) -> Result<BridgePair, TransformError> {
        let expected = adjustment.unadjusted.arity();
        if method.params.len() != expected {
            return Err(TransformError::SignatureMismatch {
                method: method.name.to_string(),
                expected,
                found: method.params.len(),
                span: method.span,
            });
        }

        let hint = format!("{}{}", method.name, self.config.primary_suffix);
        let primary_name = names.allocate(&hint, method.span);
        log::debug!("bridging `{}` to primary `{}`", method.name, primary_name);

        let primary = MethodDecl {
            name: primary_name.clone(),
            visibility: Visibility::Private,
            ..method.clone()
        };

        let mut params = Vec::with_capacity(method.params.len());
        let mut args = Vec::with_capacity(method.params.len());
        for (index, param) in method.params.iter().enumerate() {
            // Receiver is position 0 in the adjustment
            let arg = Expr::Local(param.name.clone());
            match adjustment.param(index + 1) {
                Some(adjusted) => {
                    params.push(ParamDecl {
                        name: param.name.clone(),
                        ty: self.wrapper_type(adjusted.native()),
                    });
                    // The primary always gets the payload, `object` included
                    args.push(Expr::Unwrap {
                        ty: param.ty.clone(),
                        value: Box::new(arg),
                    });
                }
                None => {
                    params.push(param.clone());
                    args.push(arg);
                }
            }
        }

        let call = if method.is_static {
            Expr::Call {
                callee: primary_name,
                args,
            }
        } else {
            Expr::MethodCall {
                receiver: Box::new(Expr::This),
                method: primary_name,
                args,
            }
        };

        let ret = match &adjustment.ret {
            Some(adjusted) => self.wrapper_type(adjusted.native()),
            None => method.ret.clone(),
        };
        let stmt = if adjustment.ret.is_some() {
            Stmt::ret(Some(adapt_value(
                call,
                NullableRepr::Native,
                NullableRepr::Wrapper,
                &ret,
            )))
        } else if ret == TargetType::Void {
            Stmt::expr(call)
        } else {
            Stmt::ret(Some(call))
        };

        let bridge = MethodDecl {
            name: method.name.clone(),
            visibility: method.visibility,
            is_static: method.is_static,
            params,
            ret,
            body: Block::new(vec![stmt.with_span(method.span)]).with_span(method.span),
            span: method.span,
        };

        Ok(BridgePair { bridge, primary })
    }

    fn wrapper_type(&self, native: &PassType) -> TargetType {
        TargetType::optional(self.types.translate(native))
    }
}

/// Name of the method a bridge forwards to, if `bridge` is one.
pub fn forwarded_to(bridge: &MethodDecl) -> Option<&Ident> {
    let stmt = bridge.body.stmts.first()?;
    let call = match &stmt.kind {
        StmtKind::Expr(call) => call,
        StmtKind::Return(Some(value)) => match value {
            Expr::Wrap { value, .. } => value.as_ref(),
            other => other,
        },
        _ => return None,
    };
    match call {
        Expr::Call { callee, .. } => Some(callee),
        Expr::MethodCall { method, .. } => Some(method),
        _ => None,
    }
}
