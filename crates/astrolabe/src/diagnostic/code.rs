//! Diagnostic codes for the generation pass.
//!
//! Codes are organized by phase:
//! - `W0xx` - State machine warnings
//! - `N1xx` - Activity lowering notes

use std::fmt;

use serde::{Serialize, Serializer};

/// Codes for categorizing generation diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // =========================================================================
    // State machine warnings (W0xx)
    // =========================================================================
    /// Malformed transition.
    ///
    /// The transition has no source or target, or an endpoint does not refer
    /// to a vertex. It is excluded from every dispatch table.
    W001,

    /// Unresolved initial state.
    ///
    /// The region has zero or several qualifying initial pseudostates. The
    /// first top-level state is used instead.
    W002,

    // =========================================================================
    // Activity lowering notes (N1xx)
    // =========================================================================
    /// Missing action reference.
    ///
    /// An action node does not name the behavior, signal, feature or operation
    /// it acts on.
    N101,

    /// Unsupported action.
    ///
    /// The node kind has no lowering, e.g. an accept-event action.
    N102,

    /// Opaque body rejected.
    ///
    /// No body of an opaque action is in the target language family or looks
    /// like code.
    N103,

    /// Unstructured control flow.
    ///
    /// An edge target is dangling, or a decision has no outgoing edges.
    N104,

    /// Expansion budget exhausted.
    ///
    /// Traversal visited too many nodes and stopped.
    N105,
}

impl DiagnosticCode {
    /// Returns the code as a string (e.g., "W001").
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::W001 => "W001",
            DiagnosticCode::W002 => "W002",
            DiagnosticCode::N101 => "N101",
            DiagnosticCode::N102 => "N102",
            DiagnosticCode::N103 => "N103",
            DiagnosticCode::N104 => "N104",
            DiagnosticCode::N105 => "N105",
        }
    }

    /// Returns a short description of what this code means.
    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticCode::W001 => "malformed transition",
            DiagnosticCode::W002 => "unresolved initial state",
            DiagnosticCode::N101 => "missing action reference",
            DiagnosticCode::N102 => "unsupported action",
            DiagnosticCode::N103 => "opaque body rejected",
            DiagnosticCode::N104 => "unstructured control flow",
            DiagnosticCode::N105 => "expansion budget exhausted",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
