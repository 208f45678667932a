//! Opaque action body passthrough.
//!
//! Opaque bodies are foreign code. They are never parsed; a
//! [`BodyPassthrough`] strategy only decides whether a body can be copied
//! into the target and splits it into statement lines.

use astrolabe_core::model::OpaqueBody;

use super::statement::BodyLine;
use crate::{backend::LanguageFamily, config::DEFAULT_DECLARED_IDENTIFIERS};

/// Tokens that make a body without a language look like code.
const CODE_TOKENS: [&str; 6] = ["=", ";", "++", "*", "+", "-"];

/// Strategy deciding which opaque body, if any, is passed through.
pub trait BodyPassthrough {
    /// Returns the lines of the first acceptable body, or `None` when no body
    /// qualifies.
    fn pass_through(&self, bodies: &[OpaqueBody], family: LanguageFamily) -> Option<Vec<BodyLine>>;
}

/// Token-based passthrough.
///
/// A body is accepted when its language names the target family, or when it
/// has no language and contains one of `=`, `;`, `+`, `-`, `*`, `++`.
///
/// # Examples
///
/// ```
/// use astrolabe::activity::{BodyPassthrough, HeuristicPassthrough};
/// use astrolabe::backend::LanguageFamily;
/// use astrolabe_core::model::OpaqueBody;
///
/// let passthrough = HeuristicPassthrough::default();
/// let lines = passthrough
///     .pass_through(&[OpaqueBody::new(None, "timeStep = 0.1\nstep()")], LanguageFamily::C)
///     .unwrap();
///
/// assert_eq!(lines[0].text, "timeStep = 0.1;");
/// assert!(lines[0].declare);
/// assert_eq!(lines[1].text, "step();");
/// assert!(!lines[1].declare);
/// ```
#[derive(Debug, Clone)]
pub struct HeuristicPassthrough {
    declared_identifiers: Vec<String>,
}

impl HeuristicPassthrough {
    /// Creates a passthrough tagging assignments to `declared_identifiers`.
    pub fn new(declared_identifiers: Vec<String>) -> Self {
        Self {
            declared_identifiers,
        }
    }

    /// Returns `true` if a declared language selects the family.
    ///
    /// Multi-character aliases also match inside longer names such as
    /// `C++17`. Single-letter aliases must match exactly.
    fn language_matches(language: &str, family: LanguageFamily) -> bool {
        let language = language.trim().to_ascii_lowercase();
        family.aliases().iter().any(|alias| {
            if alias.len() > 1 {
                language.contains(alias)
            } else {
                language == *alias
            }
        })
    }

    fn looks_like_code(body: &str) -> bool {
        CODE_TOKENS.iter().any(|token| body.contains(token))
    }

    fn accepts(body: &OpaqueBody, family: LanguageFamily) -> bool {
        if body.body.trim().is_empty() {
            return false;
        }
        match body.language.as_deref().map(str::trim) {
            Some(language) if !language.is_empty() => Self::language_matches(language, family),
            _ => Self::looks_like_code(&body.body),
        }
    }

    fn is_declaration(&self, line: &str) -> bool {
        self.declared_identifiers.iter().any(|identifier| {
            line.strip_prefix(identifier.as_str())
                .map(str::trim_start)
                .is_some_and(|rest| rest.starts_with('=') && !rest.starts_with("=="))
        })
    }

    fn split(&self, body: &str) -> Vec<BodyLine> {
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let text = if line.ends_with(';') {
                    line.to_owned()
                } else {
                    format!("{line};")
                };
                BodyLine {
                    declare: self.is_declaration(line),
                    text,
                }
            })
            .collect()
    }
}

impl Default for HeuristicPassthrough {
    fn default() -> Self {
        Self::new(
            DEFAULT_DECLARED_IDENTIFIERS
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
        )
    }
}

impl BodyPassthrough for HeuristicPassthrough {
    fn pass_through(&self, bodies: &[OpaqueBody], family: LanguageFamily) -> Option<Vec<BodyLine>> {
        bodies
            .iter()
            .find(|body| Self::accepts(body, family))
            .map(|body| self.split(&body.body))
    }
}
