//! Errors raised by backend passes

use tern_diagnostics::{Diagnostic, DiagnosticCode, Span};
use thiserror::Error;

/// Why a method could not be rewritten.
///
/// `SuspensionInFinally` and `UnsupportedSite` reject input shapes the
/// passes do not handle; the other two are internal consistency faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("suspension point inside a finally block")]
    SuspensionInFinally { span: Span, try_span: Span },

    #[error("suspension inside a {construct} under an active catch handler is not yet supported")]
    UnsupportedSite { construct: &'static str, span: Span },

    #[error("method `{method}` declares {found} parameter(s) but its signature has {expected}")]
    SignatureMismatch {
        method: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("internal error: {message}")]
    Internal { message: String, span: Span },
}

impl TransformError {
    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        TransformError::Internal {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TransformError::SuspensionInFinally { span, .. }
            | TransformError::UnsupportedSite { span, .. }
            | TransformError::SignatureMismatch { span, .. }
            | TransformError::Internal { span, .. } => *span,
        }
    }

    pub fn code(&self) -> DiagnosticCode {
        match self {
            TransformError::SuspensionInFinally { .. } => DiagnosticCode::SuspensionInFinally,
            TransformError::UnsupportedSite { .. } => DiagnosticCode::UnsupportedSuspensionSite,
            TransformError::SignatureMismatch { .. } => DiagnosticCode::SignatureMismatch,
            TransformError::Internal { .. } => DiagnosticCode::InternalError,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let builder = Diagnostic::new(self.code(), self.to_string()).with_span(self.span());
        match self {
            TransformError::SuspensionInFinally { try_span, .. } => builder
                .with_label(*try_span, "in the finally clause of this try")
                .with_help("move the suspension out of the finally block")
                .build(),
            TransformError::UnsupportedSite { .. } => builder
                .with_help("move the suspension out of the construct or out of the try body")
                .build(),
            TransformError::SignatureMismatch { .. } | TransformError::Internal { .. } => {
                builder.build()
            }
        }
    }
}
