//! Flattening of nested regions and states into stable names.
//!
//! A state's fully qualified name is the path of regions and states from the
//! state machine's top region down to the state, joined with `:`. Unnamed
//! regions and states contribute the `unnamed-region` and `unnamed-state`
//! placeholders. With fully qualified names switched off, display names are
//! the bare local names.

use log::{debug, warn};

use astrolabe_core::{
    identifier::Id,
    model::{ElementId, ElementKind, PseudostateKind},
};

use crate::{
    context::GenerationContext,
    diagnostic::{Diagnostic, DiagnosticCode, DiagnosticCollector},
    index::ModelIndex,
    tags::{TagCategory, TagResolver},
};

/// Placeholder segment for an unnamed region.
pub const UNNAMED_REGION: &str = "unnamed-region";

/// Placeholder segment for an unnamed state.
pub const UNNAMED_STATE: &str = "unnamed-state";

/// Initial state name used when a machine has no states at all.
pub const UNKNOWN_STATE: &str = "UNKNOWN";

/// Outcome of initial-state resolution for a state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialState {
    /// The resolved state, if any.
    pub state: Option<ElementId>,
    /// Display name of the state, or [`UNKNOWN_STATE`].
    pub name: String,
    /// Whether the state came from the fallback chain.
    pub fallback: bool,
}

/// Naming and hierarchy queries over state machines.
#[derive(Debug, Clone, Copy)]
pub struct StateMachineFlattener<'i, 'a> {
    index: &'i ModelIndex<'a>,
    fully_qualified_names: bool,
}

impl<'i, 'a> StateMachineFlattener<'i, 'a> {
    pub fn new(index: &'i ModelIndex<'a>, ctx: &GenerationContext) -> Self {
        Self {
            index,
            fully_qualified_names: ctx.fully_qualified_names(),
        }
    }

    /// Returns `true` if the region is owned directly by its state machine.
    pub fn is_top_state(&self, region: ElementId) -> bool {
        match (
            self.index.owner(region),
            self.index.containing_state_machine(region),
        ) {
            (Some(owner), Some(machine)) => owner == machine,
            _ => false,
        }
    }

    /// Returns `true` if the state sits in a top region.
    pub fn is_top_level_state(&self, state: ElementId) -> bool {
        self.index
            .container(state)
            .is_some_and(|region| self.is_top_state(region))
    }

    /// Returns the fully qualified name of a region.
    pub fn region_fqn(&self, region: ElementId) -> Id {
        let local = Id::new(self.index.name(region).unwrap_or(UNNAMED_REGION));
        if self.is_top_state(region) {
            return local;
        }
        match self.index.parent_state(region) {
            Some(parent) => self.state_fqn(parent).create_nested(local),
            None => local,
        }
    }

    /// Returns the fully qualified name of a state.
    pub fn state_fqn(&self, state: ElementId) -> Id {
        let local = Id::new(self.index.name(state).unwrap_or(UNNAMED_STATE));
        match self.index.container(state) {
            Some(region) => self.region_fqn(region).create_nested(local),
            None => local,
        }
    }

    /// Returns the display name of a region according to the naming toggle.
    pub fn region_name(&self, region: ElementId) -> Id {
        if self.fully_qualified_names {
            self.region_fqn(region)
        } else {
            Id::new(self.index.name(region).unwrap_or(UNNAMED_REGION))
        }
    }

    /// Returns the display name of a state according to the naming toggle.
    ///
    /// Unnamed states get a bare name of the form `UNNAMED_STATE_<n>`.
    pub fn state_name(&self, state: ElementId) -> Id {
        if self.fully_qualified_names {
            return self.state_fqn(state);
        }
        match self.index.name(state) {
            Some(name) => Id::new(name),
            None => Id::new(&format!("UNNAMED_STATE_{}", state.index())),
        }
    }

    /// Returns the uppercase constant identifying a state.
    pub fn state_constant(&self, state: ElementId) -> String {
        to_constant(&self.state_name(state).as_string())
    }

    /// Returns the targets of the qualifying initial pseudostates of a region.
    ///
    /// A pseudostate qualifies when it is an `Initial` pseudostate of this
    /// region (its container is owned by the region's owner) and has exactly
    /// one outgoing transition whose target is a vertex.
    pub fn initial_candidates(&self, region: ElementId) -> Vec<ElementId> {
        let region_owner = self.index.owner(region);

        self.index
            .all_owned(region)
            .into_iter()
            .filter(|element| {
                matches!(
                    self.index.kind(*element),
                    Some(ElementKind::Pseudostate(PseudostateKind::Initial))
                )
            })
            .filter(|pseudostate| {
                self.index
                    .container(*pseudostate)
                    .and_then(|container| self.index.owner(container))
                    == region_owner
            })
            .filter_map(|pseudostate| match self.index.outgoing_transitions(pseudostate) {
                [single] => match self.index.kind(*single) {
                    Some(ElementKind::Transition(data)) => data.target.filter(|target| {
                        self.index.kind(*target).is_some_and(ElementKind::is_vertex)
                    }),
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }

    /// Returns the initial state of a region, or `None` when zero or several
    /// pseudostates qualify.
    pub fn initial_state(&self, region: ElementId) -> Option<ElementId> {
        match self.initial_candidates(region).as_slice() {
            [single] => Some(*single),
            candidates => {
                debug!(region:%, candidates = candidates.len(); "No unique initial state");
                None
            }
        }
    }

    /// Resolves the initial state of a state machine, falling back to the
    /// first top-level state and then to [`UNKNOWN_STATE`].
    pub fn resolve_initial(
        &self,
        machine: ElementId,
        diagnostics: &mut DiagnosticCollector,
    ) -> InitialState {
        if let Some(state) = self
            .index
            .root_region(machine)
            .and_then(|region| self.initial_state(region))
        {
            return InitialState {
                state: Some(state),
                name: self.state_name(state).as_string(),
                fallback: false,
            };
        }

        let machine_name = self.index.name(machine).unwrap_or_default();
        warn!(state_machine = machine_name; "Initial state could not be resolved");
        diagnostics.emit(
            Diagnostic::warning(format!(
                "state machine `{machine_name}` has no unique initial state"
            ))
            .with_code(DiagnosticCode::W002)
            .with_element(machine)
            .with_help("give the top region exactly one initial pseudostate with one transition"),
        );

        let fallback = self
            .top_level_states(machine)
            .into_iter()
            .find(|state| matches!(self.index.kind(*state), Some(ElementKind::State(_))));
        match fallback {
            Some(state) => {
                debug!(state:%; "Using first top-level state as initial state");
                InitialState {
                    state: Some(state),
                    name: self.state_name(state).as_string(),
                    fallback: true,
                }
            }
            None => InitialState {
                state: None,
                name: UNKNOWN_STATE.to_owned(),
                fallback: true,
            },
        }
    }

    /// Returns every state and final state of a machine in model order.
    pub fn states(&self, machine: ElementId) -> Vec<ElementId> {
        self.index
            .all_owned(machine)
            .into_iter()
            .filter(|element| {
                matches!(
                    self.index.kind(*element),
                    Some(ElementKind::State(_) | ElementKind::FinalState)
                )
            })
            .collect()
    }

    /// Returns the states of a machine's top regions in model order.
    pub fn top_level_states(&self, machine: ElementId) -> Vec<ElementId> {
        self.states(machine)
            .into_iter()
            .filter(|state| self.is_top_level_state(*state))
            .collect()
    }
}

/// Returns `true` if `element` is tagged as a component or block and lies in
/// the context's active module.
///
/// The element is in the module when some enclosing package is named like the
/// module. Without an active module every tagged element qualifies.
pub fn is_generable(ctx: &GenerationContext, resolver: &TagResolver<'_, '_>, element: ElementId) -> bool {
    if !resolver.matches_any(element, &[TagCategory::Component, TagCategory::Block]) {
        return false;
    }
    let Some(module) = ctx.module() else {
        return true;
    };

    let index = resolver.index();
    let mut package = index.nearest_package(element);
    while let Some(current) = package {
        if index.name(current) == Some(module) {
            return true;
        }
        package = index
            .owner(current)
            .and_then(|owner| index.nearest_package(owner));
    }
    false
}

/// Converts a display name to an uppercase constant.
///
/// ```
/// use astrolabe::flatten::to_constant;
///
/// assert_eq!(to_constant("Main:Running"), "MAIN_RUNNING");
/// assert_eq!(to_constant("idle state"), "IDLE_STATE");
/// ```
pub fn to_constant(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}


#[cfg(test)]
mod proptest_tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use astrolabe_core::model::ModelBuilder;

    use super::*;
    use crate::backend::TargetBackend;

    // ===================
    // Strategies
    // ===================

    fn sibling_names_strategy() -> impl Strategy<Value = Vec<String>> {
        prop::collection::hash_set("[A-Za-z][A-Za-z0-9]{0,6}", 1..6)
            .prop_map(|names| names.into_iter().collect())
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Sibling regions with distinct names get distinct qualified names, and
    /// bare names equal the declared names.
    fn check_sibling_regions_are_distinct(names: Vec<String>) -> Result<(), TestCaseError> {
        let mut b = ModelBuilder::new();
        let class = b.class(None, "Host").unwrap();
        let machine = b.state_machine(class, "Machine").unwrap();
        let top = b.region(machine, Some("Top")).unwrap();
        let parent = b.state(top, Some("Parent")).unwrap();
        let regions: Vec<ElementId> = names
            .iter()
            .map(|name| b.region(parent, Some(name.as_str())).unwrap())
            .collect();
        let model = b.build();
        let index = ModelIndex::new(&model);

        let qualified = StateMachineFlattener::new(
            &index,
            &GenerationContext::new(None, true, TargetBackend::Fprime),
        );
        let fqns: HashSet<Id> = regions.iter().map(|region| qualified.region_fqn(*region)).collect();
        prop_assert_eq!(fqns.len(), regions.len());

        let bare = StateMachineFlattener::new(
            &index,
            &GenerationContext::new(None, false, TargetBackend::Fprime),
        );
        for (region, name) in regions.iter().zip(&names) {
            prop_assert_eq!(bare.region_name(*region).as_string(), name.clone());
            prop_assert_eq!(
                qualified.region_name(*region).as_string(),
                format!("Top:Parent:{name}")
            );
        }
        Ok(())
    }

    /// Constants only contain uppercase letters, digits and underscores.
    fn check_constant_alphabet(name: String) -> Result<(), TestCaseError> {
        let constant = to_constant(&name);

        prop_assert_eq!(constant.chars().count(), name.chars().count());
        prop_assert!(
            constant
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        );
        Ok(())
    }

    proptest! {
        #[test]
        fn sibling_regions_are_distinct(names in sibling_names_strategy()) {
            check_sibling_regions_are_distinct(names)?;
        }

        #[test]
        fn constant_alphabet(name in ".{0,20}") {
            check_constant_alphabet(name)?;
        }
    }
}
