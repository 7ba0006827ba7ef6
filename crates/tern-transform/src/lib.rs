//! Backend rewrites for tern
//!
//! This crate contains the passes that run on translated target bodies:
//! - Suspension hoisting (no `yield` inside a try that has a catch clause)
//! - Override covariance analysis (which parameters need `Optional<T>`)
//! - Bridge synthesis and call-site wrap/unwrap
//! - A per-module driver running the passes over a set of methods

pub mod bridge;
pub mod call_sites;
pub mod config;
pub mod covariance;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod suspend;
pub mod types;

// Re-export main entry points
pub use bridge::{
    adapt_call_args, adapt_value, forwarded_to, BridgePair, BridgeSynthesizer, NullableRepr,
    ValueAdaptation,
};
pub use call_sites::{BridgedCallee, CallSiteRewriter};
pub use config::BackendConfig;
pub use covariance::{CovarianceAnalyzer, OverriddenMember, ParamAdjustment, SignatureAdjustment};
pub use error::TransformError;
pub use pipeline::{
    load_method, load_module, Backend, LoweredMethod, LoweredModule, MethodUnit, ModuleUnit,
};
pub use suspend::{find_misplaced_suspension, hoist_suspensions, HoistOutcome};
pub use types::{DefaultTypeTranslator, TypeTranslator};
