//! Configuration types for Astrolabe code generation.
//!
//! All types implement [`serde::Deserialize`] and default every missing
//! section, so an empty document is a valid configuration.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`GenerationConfig`] - Modules, naming toggle and target backend.
//! - [`PassthroughConfig`] - Opaque body passthrough settings.
//!
//! # Example
//!
//! ```
//! # use astrolabe::config::AppConfig;
//! # use astrolabe::backend::TargetBackend;
//! let config = AppConfig::default();
//! assert!(config.generation().modules().is_empty());
//! assert_eq!(config.generation().target(), TargetBackend::Fprime);
//! assert_eq!(
//!     config.passthrough().declared_identifiers(),
//!     ["timeStep", "aoa", "T2D"]
//! );
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    backend::TargetBackend,
    tags::{TagCategory, TagRegistry},
};

/// Identifiers whose assignments are emitted as declarations by default.
pub const DEFAULT_DECLARED_IDENTIFIERS: [&str; 3] = ["timeStep", "aoa", "T2D"];

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Generation settings section.
    #[serde(default)]
    generation: GenerationConfig,

    /// Extra tag variants per category.
    #[serde(default)]
    tags: HashMap<TagCategory, Vec<String>>,

    /// Opaque body passthrough section.
    #[serde(default)]
    passthrough: PassthroughConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`].
    ///
    /// # Arguments
    ///
    /// * `generation` - Modules, naming toggle and target backend.
    /// * `tags` - Extra variants added to the built-in tag categories.
    /// * `passthrough` - Opaque body passthrough settings.
    pub fn new(
        generation: GenerationConfig,
        tags: HashMap<TagCategory, Vec<String>>,
        passthrough: PassthroughConfig,
    ) -> Self {
        Self {
            generation,
            tags,
            passthrough,
        }
    }

    /// Returns the generation configuration.
    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    /// Returns the passthrough configuration.
    pub fn passthrough(&self) -> &PassthroughConfig {
        &self.passthrough
    }

    /// Replaces the generation section, keeping the others.
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Builds the tag registry: built-in variants plus configured extras.
    pub fn tag_registry(&self) -> TagRegistry {
        let mut registry = TagRegistry::default();
        for category in TagCategory::ALL {
            if let Some(extra) = self.tags.get(&category) {
                registry.extend(category, extra.iter().cloned());
            }
        }
        registry
    }
}

/// Settings that select what is generated and how it is named.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationConfig {
    /// Module packages to generate, one pass each. Empty means a single pass
    /// without an active module.
    #[serde(default)]
    modules: Vec<String>,

    /// Whether state and region names include their enclosing path.
    #[serde(default)]
    fully_qualified_names: bool,

    /// Backend the contracts are generated for.
    #[serde(default)]
    target: TargetBackend,
}

impl GenerationConfig {
    /// Creates a new [`GenerationConfig`].
    ///
    /// # Arguments
    ///
    /// * `modules` - Module packages to generate.
    /// * `fully_qualified_names` - Naming toggle.
    /// * `target` - Target backend.
    pub fn new(modules: Vec<String>, fully_qualified_names: bool, target: TargetBackend) -> Self {
        Self {
            modules,
            fully_qualified_names,
            target,
        }
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn fully_qualified_names(&self) -> bool {
        self.fully_qualified_names
    }

    pub fn target(&self) -> TargetBackend {
        self.target
    }
}

/// Opaque body passthrough settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PassthroughConfig {
    /// Identifiers whose assignments are tagged for declaration-style emission.
    #[serde(default = "default_declared_identifiers")]
    declared_identifiers: Vec<String>,
}

impl PassthroughConfig {
    pub fn new(declared_identifiers: Vec<String>) -> Self {
        Self {
            declared_identifiers,
        }
    }

    pub fn declared_identifiers(&self) -> &[String] {
        &self.declared_identifiers
    }
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self::new(default_declared_identifiers())
    }
}

fn default_declared_identifiers() -> Vec<String> {
    DEFAULT_DECLARED_IDENTIFIERS
        .iter()
        .map(|name| (*name).to_owned())
        .collect()
}
