//! Target backends and the emitters that render contracts for them.
//!
//! The generator itself never produces backend syntax. Every
//! [`ComponentContract`] carries the [`TargetBackend`] it was generated for,
//! and an [`EmitterRegistry`] routes it to the [`Emitter`] registered for that
//! target, or to the fallback emitter when none is.

use std::{fmt, io, path::PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{contract::ComponentContract, error::AstrolabeError};

/// Code generation targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetBackend {
    /// F Prime components.
    #[default]
    Fprime,
    /// State Chart XML.
    Scxml,
    /// Quantum Platform models for QM.
    QpcQm,
    /// Quantum Platform C sources.
    QpcC,
    /// ELT RAD applications.
    EltRad,
    /// ELT MAL interfaces.
    EltMal,
}

/// Family of languages an opaque body may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    C,
    EcmaScript,
}

impl LanguageFamily {
    /// Lowercase language names that select this family.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            LanguageFamily::C => &["c++", "cpp", "c"],
            LanguageFamily::EcmaScript => &["ecmascript", "javascript", "js"],
        }
    }
}

impl TargetBackend {
    pub const ALL: [TargetBackend; 6] = [
        TargetBackend::Fprime,
        TargetBackend::Scxml,
        TargetBackend::QpcQm,
        TargetBackend::QpcC,
        TargetBackend::EltRad,
        TargetBackend::EltMal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TargetBackend::Fprime => "fprime",
            TargetBackend::Scxml => "scxml",
            TargetBackend::QpcQm => "qpc-qm",
            TargetBackend::QpcC => "qpc-c",
            TargetBackend::EltRad => "elt-rad",
            TargetBackend::EltMal => "elt-mal",
        }
    }

    /// Language family opaque bodies are passed through for.
    pub fn language_family(self) -> LanguageFamily {
        match self {
            TargetBackend::Scxml => LanguageFamily::EcmaScript,
            _ => LanguageFamily::C,
        }
    }

    /// Parses a target name as written in configuration files.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|target| target.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for TargetBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by an emitter.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("output {} was already written by another contract", .0.display())]
    Collision(PathBuf),
}

/// Renders contracts into a backend's output format.
pub trait Emitter {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Emits one contract.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Render`] if the contract cannot be converted to
    /// the output format, [`EmitError::Collision`] if its output would replace
    /// another contract's, or [`EmitError::Io`] if writing the output fails.
    fn emit(&mut self, contract: &ComponentContract) -> Result<(), EmitError>;
}

/// Routes contracts to emitters by target backend.
///
/// # Examples
///
/// ```
/// use astrolabe::backend::{EmitError, Emitter, EmitterRegistry, TargetBackend};
/// use astrolabe::contract::ComponentContract;
///
/// struct Count(usize);
///
/// impl Emitter for Count {
///     fn name(&self) -> &str {
///         "count"
///     }
///
///     fn emit(&mut self, _contract: &ComponentContract) -> Result<(), EmitError> {
///         self.0 += 1;
///         Ok(())
///     }
/// }
///
/// let mut registry = EmitterRegistry::new();
/// registry.register(TargetBackend::Fprime, Box::new(Count(0)));
/// assert!(registry.supports(TargetBackend::Fprime));
/// assert!(!registry.supports(TargetBackend::Scxml));
/// ```
#[derive(Default)]
pub struct EmitterRegistry {
    emitters: IndexMap<TargetBackend, Box<dyn Emitter>>,
    fallback: Option<Box<dyn Emitter>>,
}

impl EmitterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the emitter for a target, replacing any earlier one.
    pub fn register(&mut self, target: TargetBackend, emitter: Box<dyn Emitter>) {
        debug!(backend = target.as_str(), emitter = emitter.name(); "Registering emitter");
        self.emitters.insert(target, emitter);
    }

    /// Sets the emitter used for targets without a registered emitter.
    pub fn set_fallback(&mut self, emitter: Box<dyn Emitter>) {
        debug!(emitter = emitter.name(); "Registering fallback emitter");
        self.fallback = Some(emitter);
    }

    /// Returns `true` if contracts for `target` can be emitted.
    pub fn supports(&self, target: TargetBackend) -> bool {
        self.fallback.is_some() || self.emitters.contains_key(&target)
    }

    /// Emits a contract with the emitter for its target.
    ///
    /// # Errors
    ///
    /// Returns [`AstrolabeError::UnsupportedTarget`] when no emitter handles
    /// the target, or [`AstrolabeError::Emit`] when the emitter fails.
    pub fn emit(&mut self, contract: &ComponentContract) -> Result<(), AstrolabeError> {
        let target = contract.target;
        let emitter = match self.emitters.get_mut(&target) {
            Some(emitter) => emitter,
            None => match self.fallback.as_mut() {
                Some(fallback) => fallback,
                None => {
                    warn!(backend = target.as_str(); "No emitter registered for target");
                    return Err(AstrolabeError::UnsupportedTarget(target));
                }
            },
        };
        debug!(
            emitter = emitter.name(),
            component = contract.component.as_str(),
            state_machine = contract.state_machine.as_str();
            "Emitting contract"
        );
        emitter.emit(contract)?;
        Ok(())
    }
}

impl fmt::Debug for EmitterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterRegistry")
            .field("targets", &self.emitters.keys().collect::<Vec<_>>())
            .field(
                "fallback",
                &self.fallback.as_ref().map(|emitter| emitter.name()),
            )
            .finish()
    }
}
