//! Diagnostics reported by the generation pass.
//!
//! Generation never fails. Model content that cannot be lowered is dropped or
//! replaced by a placeholder, and a [`Diagnostic`] records what happened:
//! - Codes for documentation and searchability ([`DiagnosticCode`])
//! - Severity levels ([`Severity`])
//! - The model element the diagnostic is about
//! - Collector for accumulating diagnostics per contract ([`DiagnosticCollector`])
//!
//! # Example
//!
//! ```
//! # use astrolabe::diagnostic::{Diagnostic, DiagnosticCode};
//! let diag = Diagnostic::warning("transition from `Idle` has no target")
//!     .with_code(DiagnosticCode::W001)
//!     .with_help("connect the transition to a state or remove it");
//!
//! assert_eq!(diag.to_string(), "warning[W001]: transition from `Idle` has no target");
//! ```

mod code;
mod collector;
mod severity;

pub use code::DiagnosticCode;
pub use collector::DiagnosticCollector;
pub use severity::Severity;

use std::fmt;

use serde::Serialize;

use astrolabe_core::model::ElementId;

/// A single warning or note about the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<DiagnosticCode>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    element: Option<ElementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<String>,
}

impl Diagnostic {
    /// Creates a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Creates a note diagnostic.
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            element: None,
            help: None,
        }
    }

    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attaches the model element the diagnostic is about.
    pub fn with_element(mut self, element: ElementId) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> Option<DiagnosticCode> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}[{code}]: {}", self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let element = ElementId::from_raw(7);
        let diag = Diagnostic::note("placeholder emitted")
            .with_code(DiagnosticCode::N101)
            .with_element(element)
            .with_help("set the behavior");

        assert_eq!(diag.severity(), Severity::Note);
        assert_eq!(diag.code(), Some(DiagnosticCode::N101));
        assert_eq!(diag.message(), "placeholder emitted");
        assert_eq!(diag.element(), Some(element));
        assert_eq!(diag.help(), Some("set the behavior"));
    }

    #[test]
    fn test_display_without_code() {
        let diag = Diagnostic::warning("something odd");
        assert_eq!(diag.to_string(), "warning: something odd");
    }
}
