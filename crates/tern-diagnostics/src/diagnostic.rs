//! Diagnostic types reported by backend passes.

use crate::span::{Label, Span};
use serde::{Deserialize, Serialize};

/// Passes either note a rewrite they performed or give up on a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Hint,
    /// The method is left out of the output
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic codes, grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Unsupported input shapes (U001-U099)
    /// A suspension point inside a `finally` block
    SuspensionInFinally,
    /// A suspension point in a construct the hoisting pass does not handle
    UnsupportedSuspensionSite,

    // Rewrite notes (H001-H099)
    /// A try region was split around suspension points
    TryRegionSplit,
    /// A bridge method was synthesized for an override
    BridgeSynthesized,

    // Internal errors (I001-I099)
    /// Internal consistency fault in a backend pass
    InternalError,
    /// A method's parameters disagree with its analyzed signature
    SignatureMismatch,
}

impl DiagnosticCode {
    /// The code string (e.g., "U001").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuspensionInFinally => "U001",
            Self::UnsupportedSuspensionSite => "U002",

            Self::TryRegionSplit => "H001",
            Self::BridgeSynthesized => "H002",

            Self::InternalError => "I001",
            Self::SignatureMismatch => "I002",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::SuspensionInFinally
            | Self::UnsupportedSuspensionSite
            | Self::InternalError
            | Self::SignatureMismatch => Severity::Error,

            Self::TryRegionSplit | Self::BridgeSynthesized => Severity::Hint,
        }
    }

    /// Every code, in display order.
    pub fn all() -> &'static [DiagnosticCode] {
        &[
            Self::SuspensionInFinally,
            Self::UnsupportedSuspensionSite,
            Self::TryRegionSplit,
            Self::BridgeSynthesized,
            Self::InternalError,
            Self::SignatureMismatch,
        ]
    }

    /// Look a code up by its string form, case-insensitively.
    pub fn parse(code: &str) -> Option<DiagnosticCode> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A backend diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Short message (single line)
    pub message: String,
    /// Longer help text
    pub explanation: Option<String>,
    /// Where the offending node is
    pub span: Span,
    /// Related locations
    pub labels: Vec<Label>,
}

impl Diagnostic {
    /// Start a diagnostic at the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_hint(&self) -> bool {
        self.severity == Severity::Hint
    }
}

pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity: code.default_severity(),
                message: message.into(),
                explanation: None,
                span: Span::DUMMY,
                labels: Vec::new(),
            },
        }
    }

    /// Override the default severity.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.inner.severity = severity;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.inner.span = span;
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.inner.labels.push(Label::new(span, message));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.explanation = Some(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Everything reported while lowering one input, in report order.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn hint_count(&self) -> usize {
        self.count(Severity::Hint)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
