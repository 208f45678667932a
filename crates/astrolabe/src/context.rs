//! Per-module generation context.
//!
//! A [`GenerationContext`] is created for each module iteration of a
//! generation pass and dropped at its end. It carries the only settings that
//! change how names are resolved: the active module, the naming toggle and the
//! target backend.

use crate::backend::TargetBackend;

/// Immutable settings of one module iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    module: Option<String>,
    fully_qualified_names: bool,
    target: TargetBackend,
}

impl GenerationContext {
    /// Creates a context.
    ///
    /// # Arguments
    ///
    /// * `module` - Name of the active module package, or `None` to accept
    ///   every tagged element.
    /// * `fully_qualified_names` - Whether state and region names include
    ///   their enclosing path.
    /// * `target` - Backend the output is meant for.
    pub fn new(module: Option<String>, fully_qualified_names: bool, target: TargetBackend) -> Self {
        Self {
            module,
            fully_qualified_names,
            target,
        }
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn fully_qualified_names(&self) -> bool {
        self.fully_qualified_names
    }

    pub fn target(&self) -> TargetBackend {
        self.target
    }
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self::new(None, false, TargetBackend::default())
    }
}
