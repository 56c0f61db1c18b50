//! Structured compile diagnostics
//!
//! Recoverable problems are accumulated here with their source spans so a
//! single compile surfaces every independent error. Rendering to a
//! human-readable form (source quoting, color) is a presentation concern
//! that lives outside this crate.

use crate::ast::Span;
use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The compilation has failed, even if lowering completed structurally
    Error,
    /// Informational; never blocks success
    Warning,
    /// Additional context attached to a preceding diagnostic
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        write!(f, "{s}")
    }
}

/// A single structured message with severity and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Severity of the message
    pub severity: Severity,
    /// Free-text description
    pub message: String,
    /// Source span the message refers to
    pub span: Span,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(severity: Severity, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.span, self.severity, self.message)
    }
}

/// Ordered sink of diagnostics for one compilation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.messages.push(diagnostic);
    }

    /// Record an error.
    pub fn error(&mut self, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::new(Severity::Error, message, span));
    }

    /// Record a warning.
    pub fn warning(&mut self, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::new(Severity::Warning, message, span));
    }

    /// Record a note.
    pub fn note(&mut self, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::new(Severity::Note, message, span));
    }

    /// True if at least one `Error`-severity message was recorded.
    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Number of `Error`-severity messages.
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// All messages in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    /// Total message count across severities.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(1, 1, 1, 5)
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let mut diags = Diagnostics::new();
        diags.warning("suspicious", span());
        diags.note("context", span());
        assert!(!diags.has_errors());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_errors_fail() {
        let mut diags = Diagnostics::new();
        diags.warning("suspicious", span());
        diags.error("broken", span());
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::new(Severity::Error, "bad things", Span::new(4, 2, 4, 8));
        assert_eq!(d.to_string(), "4:2 error: bad things");
    }
}
