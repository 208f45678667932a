//! Astrolabe - Statechart and activity model to code generation contracts.
//!
//! Astrolabe reads a UML/SysML model graph, selects the classes tagged as
//! components or blocks, and lowers each of their state machines into a
//! backend-agnostic [`ComponentContract`](contract::ComponentContract):
//! flattened state names, ordered dispatch tables, command and signal tables,
//! and activities lowered into structured statements. Emitters registered in
//! an [`EmitterRegistry`](backend::EmitterRegistry) turn contracts into
//! target code.

pub mod activity;
pub mod backend;
pub mod config;
pub mod context;
pub mod contract;
pub mod diagnostic;
pub mod flatten;
pub mod index;
pub mod tags;
pub mod transition;

mod error;

pub use astrolabe_core::{document, identifier, model};

pub use error::AstrolabeError;

use log::{debug, info};

use astrolabe_core::model::Model;

use activity::{BodyPassthrough, HeuristicPassthrough};
use backend::EmitterRegistry;
use config::AppConfig;
use context::GenerationContext;
use contract::{ComponentContract, ContractBuilder};
use diagnostic::Diagnostic;
use index::ModelIndex;
use tags::TagResolver;

/// Contracts produced by one generation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOutput {
    /// One contract per (module, component, state machine) unit, in module,
    /// then model order.
    pub contracts: Vec<ComponentContract>,
}

impl GenerationOutput {
    /// Iterates every diagnostic together with the contract it belongs to.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&ComponentContract, &Diagnostic)> {
        self.contracts.iter().flat_map(|contract| {
            contract
                .diagnostics
                .iter()
                .map(move |diagnostic| (contract, diagnostic))
        })
    }

    /// Routes every contract through `registry`, returning how many were
    /// emitted.
    ///
    /// # Errors
    ///
    /// Stops at the first contract no emitter accepts or whose emitter fails.
    pub fn emit_all(&self, registry: &mut EmitterRegistry) -> Result<usize, AstrolabeError> {
        for contract in &self.contracts {
            registry.emit(contract)?;
        }
        Ok(self.contracts.len())
    }
}

/// Runs generation passes over a model.
///
/// # Examples
///
/// ```
/// use astrolabe::{Generator, config::AppConfig};
/// use astrolabe::model::{ModelBuilder, Tag};
///
/// let mut b = ModelBuilder::new();
/// let class = b.class(None, "Motor").unwrap();
/// b.apply_tag(class, Tag::new("Component")).unwrap();
/// let machine = b.state_machine(class, "Control").unwrap();
/// let region = b.region(machine, None).unwrap();
/// let idle = b.state(region, Some("Idle")).unwrap();
/// let initial = b.initial(region).unwrap();
/// b.transition(region, Some(initial), Some(idle), vec![], None).unwrap();
/// let model = b.build();
///
/// let output = Generator::new(AppConfig::default()).generate(&model);
/// assert_eq!(output.contracts.len(), 1);
/// assert_eq!(output.contracts[0].initial.constant, "IDLE");
/// ```
pub struct Generator {
    config: AppConfig,
    passthrough: Box<dyn BodyPassthrough>,
}

impl Generator {
    /// Creates a generator with the heuristic opaque body passthrough.
    ///
    /// # Arguments
    ///
    /// * `config` - Modules, naming, target, tag and passthrough settings
    pub fn new(config: AppConfig) -> Self {
        let passthrough =
            HeuristicPassthrough::new(config.passthrough().declared_identifiers().to_vec());
        Self {
            config,
            passthrough: Box::new(passthrough),
        }
    }

    /// Replaces the opaque body passthrough strategy.
    pub fn with_passthrough(mut self, passthrough: impl BodyPassthrough + 'static) -> Self {
        self.passthrough = Box::new(passthrough);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Generates the contracts of every tagged class in every configured
    /// module.
    ///
    /// Generation never fails; problems in the model are reported as
    /// diagnostics on the affected contract.
    pub fn generate(&self, model: &Model) -> GenerationOutput {
        let generation = self.config.generation();
        let index = ModelIndex::new(model);
        let registry = self.config.tag_registry();
        let resolver = TagResolver::new(&index, &registry);

        let modules: Vec<Option<String>> = if generation.modules().is_empty() {
            vec![None]
        } else {
            generation.modules().iter().cloned().map(Some).collect()
        };

        let mut output = GenerationOutput::default();
        for module in modules {
            let ctx = GenerationContext::new(
                module,
                generation.fully_qualified_names(),
                generation.target(),
            );
            info!(
                module = ctx.module().unwrap_or("<all>"),
                backend = ctx.target().as_str();
                "Generating module"
            );
            self.generate_module(&index, &resolver, &ctx, &mut output);
        }

        info!(contracts = output.contracts.len(); "Generation finished");
        output
    }

    fn generate_module(
        &self,
        index: &ModelIndex<'_>,
        resolver: &TagResolver<'_, '_>,
        ctx: &GenerationContext,
        output: &mut GenerationOutput,
    ) {
        let builder = ContractBuilder::new(index, ctx, self.passthrough.as_ref());

        for class in index.classes() {
            let class_name = index.name(class).unwrap_or_default();
            if !flatten::is_generable(ctx, resolver, class) {
                let tags = resolver.applied_tag_names(class);
                debug!(class = class_name, tags = tags.as_str(); "Skipping class");
                continue;
            }

            for machine in index.state_machines(class) {
                let contract = builder.build(class, machine);
                info!(
                    component = contract.component.as_str(),
                    state_machine = contract.state_machine.as_str(),
                    states = contract.states.len(),
                    diagnostics = contract.diagnostics.len();
                    "Contract built"
                );
                output.contracts.push(contract);
            }
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use astrolabe_core::model::{ActivityNodeKind, ModelBuilder, OpaqueBody, Tag};

    use super::*;
    use crate::{
        activity::{Action, ActionBlock, BodyLine, Statement},
        backend::{LanguageFamily, TargetBackend},
        config::GenerationConfig,
    };

    /// `Plant.Motor` (component) and `Plant.Sensor` (block) each own one
    /// machine, `Lab.Gauge` (component) owns one, `Plant.Cable` is untagged.
    fn model() -> Model {
        let mut b = ModelBuilder::new();
        let plant = b.package(None, "Plant").unwrap();
        let lab = b.package(None, "Lab").unwrap();
        for (package, name, tag) in [
            (plant, "Motor", Some("Component")),
            (plant, "Sensor", Some("Block")),
            (plant, "Cable", None),
            (lab, "Gauge", Some("cmdoComponent")),
        ] {
            let class = b.class(Some(package), name).unwrap();
            if let Some(tag) = tag {
                b.apply_tag(class, Tag::new(tag)).unwrap();
            }
            let machine = b.state_machine(class, "Main").unwrap();
            let region = b.region(machine, None).unwrap();
            let idle = b.state(region, Some("Idle")).unwrap();
            let initial = b.initial(region).unwrap();
            b.transition(region, Some(initial), Some(idle), vec![], None)
                .unwrap();
        }
        b.build()
    }

    fn components(output: &GenerationOutput) -> Vec<(Option<&str>, &str)> {
        output
            .contracts
            .iter()
            .map(|contract| (contract.module.as_deref(), contract.component.as_str()))
            .collect()
    }

    #[test]
    fn test_single_pass_without_modules() {
        let output = Generator::default().generate(&model());

        assert_eq!(
            components(&output),
            vec![(None, "Motor"), (None, "Sensor"), (None, "Gauge")]
        );
        assert_eq!(output.diagnostics().count(), 0);
    }

    #[test]
    fn test_one_pass_per_module() {
        let config = AppConfig::default().with_generation(GenerationConfig::new(
            vec!["Lab".to_owned(), "Plant".to_owned(), "Nowhere".to_owned()],
            false,
            TargetBackend::Scxml,
        ));
        let output = Generator::new(config).generate(&model());

        assert_eq!(
            components(&output),
            vec![
                (Some("Lab"), "Gauge"),
                (Some("Plant"), "Motor"),
                (Some("Plant"), "Sensor"),
            ]
        );
        assert!(
            output
                .contracts
                .iter()
                .all(|contract| contract.target == TargetBackend::Scxml)
        );
    }

    /// Replaces every body with one fixed call.
    struct StubPassthrough;

    impl BodyPassthrough for StubPassthrough {
        fn pass_through(
            &self,
            _bodies: &[OpaqueBody],
            _family: LanguageFamily,
        ) -> Option<Vec<BodyLine>> {
            Some(vec![BodyLine {
                text: "stub();".to_owned(),
                declare: false,
            }])
        }
    }

    #[test]
    fn test_custom_passthrough() {
        let mut b = ModelBuilder::new();
        let class = b.class(None, "Pump").unwrap();
        b.apply_tag(class, Tag::new("Component")).unwrap();
        let machine = b.state_machine(class, "Main").unwrap();
        let region = b.region(machine, None).unwrap();
        let idle = b.state(region, Some("Idle")).unwrap();
        let initial = b.initial(region).unwrap();
        b.transition(region, Some(initial), Some(idle), vec![], None)
            .unwrap();
        let prime = b.activity(machine, "Prime").unwrap();
        let begin = b.node(prime, None, ActivityNodeKind::Initial).unwrap();
        let fill = b
            .node(
                prime,
                Some("fill"),
                ActivityNodeKind::Opaque {
                    bodies: vec![OpaqueBody::new(Some("Python"), "level = 1")],
                },
            )
            .unwrap();
        b.edge(prime, Some(begin), Some(fill), None).unwrap();
        let model = b.build();

        let opaque_lines = |generator: &Generator| {
            let output = generator.generate(&model);
            match &output.contracts[0].activity("Prime").unwrap().statements[..] {
                [Statement::Action(ActionBlock {
                    action: Action::Opaque { lines },
                    ..
                })] => Some(lines.clone()),
                _ => None,
            }
        };

        assert_eq!(opaque_lines(&Generator::default()), None);
        assert_eq!(
            opaque_lines(&Generator::default().with_passthrough(StubPassthrough)),
            Some(vec![BodyLine {
                text: "stub();".to_owned(),
                declare: false,
            }])
        );
    }

    #[test]
    fn test_diagnostics_are_attributed_to_contracts() {
        let mut b = ModelBuilder::new();
        let class = b.class(None, "Broken").unwrap();
        b.apply_tag(class, Tag::new("Component")).unwrap();
        let machine = b.state_machine(class, "Main").unwrap();
        let region = b.region(machine, None).unwrap();
        let idle = b.state(region, Some("Idle")).unwrap();
        b.transition(region, Some(idle), None, vec![], None).unwrap();

        let output = Generator::default().generate(&b.build());
        let found: Vec<(&str, String)> = output
            .diagnostics()
            .map(|(contract, diagnostic)| {
                (
                    contract.component.as_str(),
                    diagnostic.code().map(|code| code.to_string()).unwrap_or_default(),
                )
            })
            .collect();

        assert_eq!(
            found,
            vec![
                ("Broken", "W002".to_owned()),
                ("Broken", "W001".to_owned()),
            ]
        );
    }
}
