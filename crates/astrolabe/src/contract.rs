//! The backend contract: everything an emitter needs for one state machine.
//!
//! A [`ComponentContract`] is built per (module, class, state machine) unit by
//! a [`ContractBuilder`]. It holds only resolved names, tables and lowered
//! statements; emitters never query the model.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, trace};
use serde::Serialize;

use astrolabe_core::model::{ElementId, ElementKind, EventKind, ParameterDirection};

use crate::{
    activity::{ActivityLowering, BodyPassthrough, Statement},
    backend::TargetBackend,
    context::GenerationContext,
    diagnostic::{Diagnostic, DiagnosticCollector},
    flatten::{StateMachineFlattener, UNKNOWN_STATE, UNNAMED_STATE, to_constant},
    index::ModelIndex,
    transition::{TransitionClassifier, TransitionInfo},
};

/// Opcode of the command starting a state machine.
pub const START_STATE_MACHINE: u32 = 0x00;

/// Opcode of the command stopping a state machine.
pub const STOP_STATE_MACHINE: u32 = 0x01;

/// First opcode assigned to event commands.
pub const EVENT_OPCODE_BASE: u32 = 0x100;

/// First opcode assigned to signal commands.
pub const SIGNAL_OPCODE_BASE: u32 = 0x200;

/// Structured output for one state machine of one component.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComponentContract {
    /// Active module, if generation was scoped to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub state_machine: String,
    pub target: TargetBackend,
    /// Constants of the top-level states, sorted by name.
    pub top_level_states: Vec<String>,
    pub initial: InitialEntry,
    /// Top-level states sorted by name, then nested states sorted by
    /// qualified name.
    pub states: Vec<StateEntry>,
    /// Commands in opcode order.
    pub commands: Vec<Command>,
    /// Signals in opcode order.
    pub signals: Vec<SignalEntry>,
    /// Activity implementations sorted by name.
    pub activities: Vec<ActivityImplementation>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ComponentContract {
    /// Returns the state with the given display name.
    pub fn state(&self, display: &str) -> Option<&StateEntry> {
        self.states.iter().find(|state| state.display == display)
    }

    /// Returns the command with the given name.
    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|command| command.name == name)
    }

    /// Returns the activity implementation with the given name.
    pub fn activity(&self, name: &str) -> Option<&ActivityImplementation> {
        self.activities.iter().find(|activity| activity.name == name)
    }

    /// File stem emitters use for this unit: `<Component>_<StateMachine>`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.component, self.state_machine)
    }
}

/// The resolved initial state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitialEntry {
    pub name: String,
    pub constant: String,
    /// Whether the state came from the fallback chain.
    pub fallback: bool,
}

impl Default for InitialEntry {
    fn default() -> Self {
        Self {
            name: UNKNOWN_STATE.to_owned(),
            constant: UNKNOWN_STATE.to_owned(),
            fallback: true,
        }
    }
}

/// One state and its dispatch table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateEntry {
    #[serde(skip)]
    pub id: ElementId,
    /// Local name, or the unnamed placeholder.
    pub name: String,
    pub fqn: String,
    /// Name under the active naming toggle.
    pub display: String,
    pub constant: String,
    pub top_level: bool,
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<BehaviorBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_activity: Option<BehaviorBlock>,
    /// Outgoing transitions in dispatch order.
    pub transitions: Vec<TransitionInfo>,
}

/// A lowered behavior attached to a state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorBlock {
    pub activity: String,
    pub statements: Vec<Statement>,
}

/// A command and the transitions it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub name: String,
    pub opcode: u32,
    pub transitions: Vec<CommandTransition>,
}

/// `from → to [guard]` entry of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandTransition {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub guard: String,
}

/// A signal received by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalEntry {
    pub name: String,
    pub opcode: u32,
    /// Whether the signal carries attributes.
    pub has_params: bool,
}

/// A parameter of an activity implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub direction: ParameterDirection,
}

/// A lowered activity with its signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityImplementation {
    pub name: String,
    /// `in` and `inout` parameters in declaration order.
    pub parameters: Vec<ParameterEntry>,
    /// Type of the first `out` or `return` parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub statements: Vec<Statement>,
}

/// Builds contracts for the state machines of one generation context.
pub struct ContractBuilder<'i, 'a> {
    index: &'i ModelIndex<'a>,
    ctx: &'i GenerationContext,
    flattener: StateMachineFlattener<'i, 'a>,
    classifier: TransitionClassifier<'i, 'a>,
    lowering: ActivityLowering<'i, 'a>,
}

impl<'i, 'a> ContractBuilder<'i, 'a> {
    pub fn new(
        index: &'i ModelIndex<'a>,
        ctx: &'i GenerationContext,
        passthrough: &'i dyn BodyPassthrough,
    ) -> Self {
        let flattener = StateMachineFlattener::new(index, ctx);
        Self {
            index,
            ctx,
            flattener,
            classifier: TransitionClassifier::new(index, flattener),
            lowering: ActivityLowering::new(index, passthrough, ctx),
        }
    }

    /// Builds the contract of one state machine owned by `class`.
    pub fn build(&self, class: ElementId, machine: ElementId) -> ComponentContract {
        let mut diagnostics = DiagnosticCollector::new();
        let mut lowered = LoweredActivities::default();

        let component = self.index.name(class).unwrap_or_default().to_owned();
        let state_machine = self.index.name(machine).unwrap_or_default().to_owned();
        debug!(component = component.as_str(), state_machine = state_machine.as_str(); "Building contract");

        let initial = self.flattener.resolve_initial(machine, &mut diagnostics);
        let initial = InitialEntry {
            constant: to_constant(&initial.name),
            name: initial.name,
            fallback: initial.fallback,
        };

        let states = self.states(machine, &mut lowered, &mut diagnostics);
        let top_level_states = states
            .iter()
            .filter(|state| state.top_level)
            .map(|state| state.constant.clone())
            .collect();
        let commands = self.commands(&states);
        let signals = self.signals(&states);
        let activities = self.activities(machine, &mut lowered, &mut diagnostics);

        let contract = ComponentContract {
            module: self.ctx.module().map(str::to_owned),
            component,
            package: self
                .index
                .nearest_package(class)
                .and_then(|package| self.index.name(package))
                .map(str::to_owned),
            state_machine,
            target: self.ctx.target(),
            top_level_states,
            initial,
            states,
            commands,
            signals,
            activities,
            diagnostics: diagnostics.finish(),
        };
        trace!(contract:?; "Built contract");
        contract
    }

    fn states(
        &self,
        machine: ElementId,
        lowered: &mut LoweredActivities,
        diagnostics: &mut DiagnosticCollector,
    ) -> Vec<StateEntry> {
        let mut states: Vec<StateEntry> = self
            .flattener
            .states(machine)
            .into_iter()
            .map(|state| self.state_entry(state, lowered, diagnostics))
            .collect();
        states.sort_by(|a, b| {
            b.top_level
                .cmp(&a.top_level)
                .then_with(|| match a.top_level {
                    true => a.display.cmp(&b.display),
                    false => a.fqn.cmp(&b.fqn),
                })
        });
        states
    }

    fn state_entry(
        &self,
        state: ElementId,
        lowered: &mut LoweredActivities,
        diagnostics: &mut DiagnosticCollector,
    ) -> StateEntry {
        let (entry, do_activity, is_final) = match self.index.kind(state) {
            Some(ElementKind::State(data)) => (
                data.entry
                    .and_then(|activity| self.behavior(activity, lowered, diagnostics)),
                data.do_activity
                    .and_then(|activity| self.behavior(activity, lowered, diagnostics)),
                false,
            ),
            _ => (None, None, true),
        };

        StateEntry {
            id: state,
            name: self.index.name(state).unwrap_or(UNNAMED_STATE).to_owned(),
            fqn: self.flattener.state_fqn(state).as_string(),
            display: self.flattener.state_name(state).as_string(),
            constant: self.flattener.state_constant(state),
            top_level: self.flattener.is_top_level_state(state),
            is_final,
            entry,
            do_activity,
            transitions: self.classifier.outgoing(state, diagnostics),
        }
    }

    fn behavior(
        &self,
        activity: ElementId,
        lowered: &mut LoweredActivities,
        diagnostics: &mut DiagnosticCollector,
    ) -> Option<BehaviorBlock> {
        if !matches!(self.index.kind(activity), Some(ElementKind::Activity)) {
            debug!(activity:%; "State behavior is not an activity");
            return None;
        }
        Some(BehaviorBlock {
            activity: self.index.name(activity).unwrap_or_default().to_owned(),
            statements: lowered.get(&self.lowering, activity, diagnostics).to_vec(),
        })
    }

    /// One command per distinct call trigger name, in lexical order.
    fn commands(&self, states: &[StateEntry]) -> Vec<Command> {
        let mut table: BTreeMap<&str, Vec<CommandTransition>> = BTreeMap::new();
        for state in states {
            for info in &state.transitions {
                let Some(trigger) = info.trigger.as_deref().map(str::trim) else {
                    continue;
                };
                if !info.has_event || info.has_signal_event || trigger.is_empty() {
                    continue;
                }
                table.entry(trigger).or_default().push(CommandTransition {
                    from: state.display.clone(),
                    to: info.target_name.clone(),
                    guard: info.guard.clone(),
                });
            }
        }

        table
            .into_iter()
            .zip(EVENT_OPCODE_BASE..)
            .map(|((name, transitions), opcode)| Command {
                name: name.to_owned(),
                opcode,
                transitions,
            })
            .collect()
    }

    /// One entry per distinct signal trigger name, in lexical order.
    fn signals(&self, states: &[StateEntry]) -> Vec<SignalEntry> {
        let mut table: BTreeMap<&str, bool> = BTreeMap::new();
        for info in states.iter().flat_map(|state| &state.transitions) {
            let Some(name) = info.trigger.as_deref().map(str::trim) else {
                continue;
            };
            if !info.has_signal_event || name.is_empty() {
                continue;
            }
            let has_params = self.signal_has_params(info.transition);
            *table.entry(name).or_default() |= has_params;
        }

        table
            .into_iter()
            .zip(SIGNAL_OPCODE_BASE..)
            .map(|((name, has_params), opcode)| SignalEntry {
                name: name.to_owned(),
                opcode,
                has_params,
            })
            .collect()
    }

    fn signal_has_params(&self, transition: ElementId) -> bool {
        let trigger = match self.index.kind(transition) {
            Some(ElementKind::Transition(data)) => data.triggers.first().copied(),
            _ => None,
        };
        let signal = trigger.and_then(|trigger| match self.index.kind(trigger) {
            Some(ElementKind::Signal) => Some(trigger),
            Some(ElementKind::Event(EventKind::Signal { signal })) => *signal,
            _ => None,
        });
        signal.is_some_and(|signal| {
            self.index
                .owned(signal)
                .iter()
                .any(|owned| matches!(self.index.kind(*owned), Some(ElementKind::Property)))
        })
    }

    /// Every activity referenced by a state or owned by one of the state
    /// machine's activity scopes, sorted by name then declaration order.
    /// Same-named activities are listed separately.
    fn activities(
        &self,
        machine: ElementId,
        lowered: &mut LoweredActivities,
        diagnostics: &mut DiagnosticCollector,
    ) -> Vec<ActivityImplementation> {
        let referenced = self
            .flattener
            .states(machine)
            .into_iter()
            .filter_map(|state| match self.index.kind(state) {
                Some(ElementKind::State(data)) => Some([data.entry, data.do_activity]),
                _ => None,
            })
            .flatten()
            .flatten()
            .filter(|activity| matches!(self.index.kind(*activity), Some(ElementKind::Activity)));
        let owned = self
            .index
            .activity_scopes(machine)
            .into_iter()
            .flat_map(|scope| self.index.activities(scope));

        let candidates: BTreeSet<(&'a str, ElementId)> = referenced
            .chain(owned)
            .filter_map(|activity| Some((self.index.name(activity)?, activity)))
            .collect();
        candidates
            .into_iter()
            .map(|(name, activity)| self.implementation(name, activity, lowered, diagnostics))
            .collect()
    }

    fn implementation(
        &self,
        name: &str,
        activity: ElementId,
        lowered: &mut LoweredActivities,
        diagnostics: &mut DiagnosticCollector,
    ) -> ActivityImplementation {
        let mut parameters = Vec::new();
        let mut return_type = None;
        for &owned in self.index.owned(activity) {
            let Some(ElementKind::Parameter {
                direction,
                type_name,
            }) = self.index.kind(owned)
            else {
                continue;
            };
            match direction {
                ParameterDirection::In | ParameterDirection::InOut => {
                    parameters.push(ParameterEntry {
                        name: self.index.name(owned).unwrap_or_default().to_owned(),
                        type_name: type_name.clone(),
                        direction: *direction,
                    });
                }
                ParameterDirection::Out | ParameterDirection::Return => {
                    if return_type.is_none() {
                        return_type = type_name.clone();
                    }
                }
            }
        }

        ActivityImplementation {
            name: name.to_owned(),
            parameters,
            return_type,
            statements: lowered.get(&self.lowering, activity, diagnostics).to_vec(),
        }
    }
}

/// Lowering results of one contract, so each activity is lowered and
/// reported once.
#[derive(Default)]
struct LoweredActivities {
    cache: HashMap<ElementId, Vec<Statement>>,
}

impl LoweredActivities {
    fn get(
        &mut self,
        lowering: &ActivityLowering<'_, '_>,
        activity: ElementId,
        diagnostics: &mut DiagnosticCollector,
    ) -> &[Statement] {
        self.cache
            .entry(activity)
            .or_insert_with(|| lowering.lower(activity, diagnostics))
    }
}
