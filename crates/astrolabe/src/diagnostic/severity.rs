//! Severity levels for generation diagnostics.

use std::fmt;

use serde::Serialize;

/// The severity level of a diagnostic.
///
/// Generation never fails, so there is no error level:
/// - [`Severity::Warning`] marks model content that was excluded from the output
/// - [`Severity::Note`] marks content that was lowered to a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Part of the model was dropped or replaced by a fallback.
    Warning,

    /// Part of the model was kept but could not be lowered faithfully.
    Note,
}

impl Severity {
    /// Returns `true` if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }

    /// Returns `true` if this is a note severity.
    pub fn is_note(&self) -> bool {
        matches!(self, Severity::Note)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}
