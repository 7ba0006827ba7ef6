//! Override covariance analysis
//!
//! A supertype member `f(x: T?)` over a class formal `T` is emitted with an
//! `Optional<T>` parameter, since `T?` has no uniform representation in the
//! target. An override in `C : I<Int>` written as `f(x: Int)` then has a
//! different target signature from the member it overrides. This module
//! finds those positions so the bridge rewriter can repair them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tern_types::{FormalOwner, PassType, Signature, Type};

use crate::config::CovarianceConfig;
use crate::types::TypeTranslator;

/// A supertype member that a method overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverriddenMember {
    /// Name of the supertype declaring the member
    pub owner: String,
    /// The member's signature in terms of the declaring supertype
    pub signature: Signature,
    /// Resolves inherited formals into the supertype's own formals,
    /// keyed by qualified formal name
    #[serde(default)]
    pub bindings: HashMap<String, Type>,
}

impl OverriddenMember {
    pub fn new(owner: impl Into<String>, signature: Signature) -> Self {
        Self {
            owner: owner.into(),
            signature,
            bindings: HashMap::new(),
        }
    }

    pub fn with_binding(mut self, formal: impl Into<String>, ty: Type) -> Self {
        self.bindings.insert(formal.into(), ty);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamAdjustment {
    /// Exposed as `Optional<native>`, implemented on `native`
    Wrapped { native: PassType },
}

impl ParamAdjustment {
    pub fn native(&self) -> &PassType {
        match self {
            ParamAdjustment::Wrapped { native } => native,
        }
    }
}

/// Per-position representation changes for one overriding method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAdjustment {
    pub unadjusted: Signature,
    /// Parallel to `unadjusted.params`; index 0 (receiver) is always `None`
    pub params: Vec<Option<ParamAdjustment>>,
    pub ret: Option<ParamAdjustment>,
}

impl SignatureAdjustment {
    pub fn param(&self, index: usize) -> Option<&ParamAdjustment> {
        self.params.get(index).and_then(Option::as_ref)
    }

    /// Number of adjusted positions, return included.
    pub fn adjusted_count(&self) -> usize {
        self.params.iter().flatten().count() + usize::from(self.ret.is_some())
    }
}

pub struct CovarianceAnalyzer<'a> {
    types: &'a dyn TypeTranslator,
    config: &'a CovarianceConfig,
}

impl<'a> CovarianceAnalyzer<'a> {
    pub fn new(types: &'a dyn TypeTranslator, config: &'a CovarianceConfig) -> Self {
        Self { types, config }
    }

    /// Compare `method` against every member it overrides. `None` when no
    /// position needs wrapper representation.
    pub fn analyze(
        &self,
        method: &Signature,
        overridden: &[OverriddenMember],
    ) -> Option<SignatureAdjustment> {
        let params: Vec<Option<ParamAdjustment>> = method
            .params
            .iter()
            .enumerate()
            .map(|(index, own)| {
                if index == 0 {
                    return None;
                }
                self.adjust(own, overridden, |member| member.signature.params.get(index))
            })
            .collect();
        let ret = self.adjust(&method.ret, overridden, |member| Some(&member.signature.ret));

        if ret.is_none() && params.iter().all(Option::is_none) {
            return None;
        }

        let adjustment = SignatureAdjustment {
            unadjusted: method.clone(),
            params,
            ret,
        };
        log::debug!(
            "{} position(s) need wrapper representation",
            adjustment.adjusted_count()
        );
        Some(adjustment)
    }

    fn adjust<'m>(
        &self,
        own: &PassType,
        overridden: &'m [OverriddenMember],
        position: impl Fn(&'m OverriddenMember) -> Option<&'m PassType>,
    ) -> Option<ParamAdjustment> {
        if self.types.is_optional_type_argument(own) {
            return None;
        }
        let needs_wrapper = overridden.iter().any(|member| {
            position(member).is_some_and(|theirs| self.needs_wrapper(member, theirs))
        });
        needs_wrapper.then(|| ParamAdjustment::Wrapped {
            native: own.non_nullable(),
        })
    }

    /// Whether the supertype sees this position as `Optional<T>` over one of
    /// its own class formals.
    fn needs_wrapper(&self, member: &OverriddenMember, theirs: &PassType) -> bool {
        let resolved = theirs.substitute(&member.bindings);
        if !self.types.is_optional_type_argument(&resolved) {
            return false;
        }
        match resolved.type_formal() {
            Some(formal) => {
                formal.owner == FormalOwner::Type(member.owner.clone())
                    && !self.is_excluded(&formal.qualified())
            }
            None => false,
        }
    }

    fn is_excluded(&self, qualified: &str) -> bool {
        self.config.excluded_formals.iter().any(|f| f == qualified)
    }
}
