//! Serializable model document.
//!
//! A [`Document`] is a nested, name-based description of a model: packages
//! contain classes, classes contain state machines and activities, and all
//! cross references (transition endpoints, triggers, behaviors, tag profiles)
//! are written as names. [`Document::into_model`] builds the [`Model`] arena
//! and resolves those names.
//!
//! References that cannot be resolved become absent references instead of
//! errors, so they surface later as malformed transitions or placeholders.
//! Trigger names that match no declared event or signal become implicit call
//! events owned by the state machine.
//!
//! # Example
//!
//! ```
//! use astrolabe_core::document::Document;
//!
//! let document: Document = toml::from_str(r#"
//!     [[classes]]
//!     name = "Motor"
//!
//!     [[classes.state_machines]]
//!     name = "Control"
//!
//!     [[classes.state_machines.region.states]]
//!     name = "Idle"
//! "#).unwrap();
//!
//! let model = document.into_model().unwrap();
//! assert_eq!(model.len(), 4);
//! ```

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, trace};
use serde::Deserialize;

use crate::model::{
    ActivityNodeKind, ElementId, ElementKind, EventKind, Model, ModelBuilder, ModelError,
    OpaqueBody, ParameterDirection, PseudostateKind, Tag,
};

/// Root of a model document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub packages: Vec<PackageDoc>,
    #[serde(default)]
    pub classes: Vec<ClassDoc>,
    #[serde(default)]
    pub profiles: Vec<ProfileDoc>,
    #[serde(default)]
    pub signals: Vec<SignalDoc>,
    #[serde(default)]
    pub events: Vec<EventDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageDoc {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<TagDoc>,
    #[serde(default)]
    pub packages: Vec<PackageDoc>,
    #[serde(default)]
    pub classes: Vec<ClassDoc>,
    #[serde(default)]
    pub profiles: Vec<ProfileDoc>,
    #[serde(default)]
    pub signals: Vec<SignalDoc>,
    #[serde(default)]
    pub events: Vec<EventDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDoc {
    pub name: String,
}

/// An applied tag, either a bare name or a table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagDoc {
    Name(String),
    Full {
        name: Option<String>,
        qualified_name: Option<String>,
        profile: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalDoc {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKindDoc {
    Signal,
    #[default]
    Call,
    Change,
    Time,
    Any,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventDoc {
    pub name: String,
    #[serde(default)]
    pub kind: EventKindDoc,
    pub signal: Option<String>,
    pub operation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassDoc {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<TagDoc>,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub state_machines: Vec<StateMachineDoc>,
    #[serde(default)]
    pub activities: Vec<ActivityDoc>,
    #[serde(default)]
    pub classes: Vec<ClassDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateMachineDoc {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<TagDoc>,
    #[serde(default)]
    pub region: RegionDoc,
    #[serde(default)]
    pub activities: Vec<ActivityDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionDoc {
    pub name: Option<String>,
    /// Name of the state the region's initial pseudostate points to.
    pub initial: Option<String>,
    #[serde(default)]
    pub states: Vec<StateDoc>,
    #[serde(default)]
    pub pseudostates: Vec<PseudostateDoc>,
    #[serde(default)]
    pub transitions: Vec<TransitionDoc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateKindDoc {
    #[default]
    State,
    Final,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateDoc {
    pub name: Option<String>,
    #[serde(default)]
    pub kind: StateKindDoc,
    pub entry: Option<String>,
    pub do_activity: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagDoc>,
    #[serde(default)]
    pub regions: Vec<RegionDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PseudostateDoc {
    pub name: Option<String>,
    pub kind: PseudostateKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionDoc {
    pub source: Option<String>,
    pub target: Option<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    pub guard: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterDoc {
    pub name: String,
    #[serde(default)]
    pub direction: ParameterDirection,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityDoc {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDoc>,
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
    #[serde(default)]
    pub edges: Vec<EdgeDoc>,
}

/// An activity node, discriminated by its `kind` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeDoc {
    Initial {
        name: Option<String>,
    },
    Final {
        name: Option<String>,
    },
    Decision {
        name: Option<String>,
    },
    Merge {
        name: Option<String>,
    },
    CallBehavior {
        name: Option<String>,
        behavior: Option<String>,
    },
    SendSignal {
        name: Option<String>,
        signal: Option<String>,
    },
    AcceptEvent {
        name: Option<String>,
        event: Option<String>,
    },
    Opaque {
        name: Option<String>,
        language: Option<String>,
        body: Option<String>,
        #[serde(default)]
        bodies: Vec<OpaqueBody>,
    },
    ReadAttribute {
        name: Option<String>,
        feature: Option<String>,
    },
    WriteAttribute {
        name: Option<String>,
        feature: Option<String>,
    },
    CallOperation {
        name: Option<String>,
        operation: Option<String>,
    },
}

impl NodeDoc {
    fn name(&self) -> Option<&str> {
        match self {
            NodeDoc::Initial { name }
            | NodeDoc::Final { name }
            | NodeDoc::Decision { name }
            | NodeDoc::Merge { name }
            | NodeDoc::CallBehavior { name, .. }
            | NodeDoc::SendSignal { name, .. }
            | NodeDoc::AcceptEvent { name, .. }
            | NodeDoc::Opaque { name, .. }
            | NodeDoc::ReadAttribute { name, .. }
            | NodeDoc::WriteAttribute { name, .. }
            | NodeDoc::CallOperation { name, .. } => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeDoc {
    pub source: Option<String>,
    pub target: Option<String>,
    pub guard: Option<String>,
}

impl Document {
    /// Builds the model arena and resolves all name references.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateName`] when two nodes of one activity
    /// share a name, and [`ModelError::AmbiguousReference`] when a transition
    /// endpoint names several vertices that cannot be told apart.
    pub fn into_model(self) -> Result<Model, ModelError> {
        let mut loader = Loader::default();
        loader.load(self)?;
        loader.resolve()?;
        let model = loader.builder.build();
        debug!(elements = model.len(); "Model document loaded");
        Ok(model)
    }
}

/// Name reference held by an activity node until every element exists.
#[derive(Debug)]
enum NodeRef {
    Behavior(String),
    Signal(String),
    Event(String),
    Feature(String),
    Operation(String),
}

#[derive(Debug)]
struct PendingTransition {
    machine: ElementId,
    region: ElementId,
    source: Option<String>,
    target: Option<String>,
    triggers: Vec<String>,
    guard: Option<String>,
}

#[derive(Debug)]
enum Pending {
    Tag {
        element: ElementId,
        tag: TagDoc,
    },
    Event {
        event: ElementId,
        kind: EventKindDoc,
        signal: Option<String>,
        operation: Option<String>,
    },
    Behaviors {
        state: ElementId,
        entry: Option<String>,
        do_activity: Option<String>,
    },
    Node {
        node: ElementId,
        reference: NodeRef,
    },
    Initial {
        region: ElementId,
        pseudostate: ElementId,
        target: String,
    },
}

type NameTable = IndexMap<String, Vec<ElementId>>;

#[derive(Debug, Default)]
struct Loader {
    builder: ModelBuilder,
    profiles: NameTable,
    signals: NameTable,
    events: NameTable,
    activities: NameTable,
    operations: NameTable,
    properties: NameTable,
    /// Named vertices per state machine.
    vertices: HashMap<ElementId, NameTable>,
    implicit_events: HashMap<(ElementId, String), ElementId>,
    pending: Vec<Pending>,
    transitions: Vec<PendingTransition>,
}

impl Loader {
    fn load(&mut self, document: Document) -> Result<(), ModelError> {
        for profile in &document.profiles {
            self.load_profile(None, profile)?;
        }
        for signal in &document.signals {
            self.load_signal(None, signal)?;
        }
        for event in document.events {
            self.load_event(None, event)?;
        }
        for package in document.packages {
            self.load_package(None, package)?;
        }
        for class in document.classes {
            self.load_class(None, class)?;
        }
        Ok(())
    }

    fn load_package(
        &mut self,
        owner: Option<ElementId>,
        package: PackageDoc,
    ) -> Result<ElementId, ModelError> {
        let id = self.builder.package(owner, &package.name)?;
        self.defer_tags(id, package.tags);
        for profile in &package.profiles {
            self.load_profile(Some(id), profile)?;
        }
        for signal in &package.signals {
            self.load_signal(Some(id), signal)?;
        }
        for event in package.events {
            self.load_event(Some(id), event)?;
        }
        for nested in package.packages {
            self.load_package(Some(id), nested)?;
        }
        for class in package.classes {
            self.load_class(Some(id), class)?;
        }
        Ok(id)
    }

    fn load_profile(
        &mut self,
        owner: Option<ElementId>,
        profile: &ProfileDoc,
    ) -> Result<(), ModelError> {
        let id = self.builder.profile(owner, &profile.name)?;
        register(&mut self.profiles, &profile.name, id);
        Ok(())
    }

    fn load_signal(&mut self, owner: Option<ElementId>, signal: &SignalDoc) -> Result<(), ModelError> {
        let attributes: Vec<&str> = signal.attributes.iter().map(String::as_str).collect();
        let id = self.builder.signal(owner, &signal.name, &attributes)?;
        register(&mut self.signals, &signal.name, id);
        Ok(())
    }

    fn load_event(&mut self, owner: Option<ElementId>, event: EventDoc) -> Result<(), ModelError> {
        let placeholder = match event.kind {
            EventKindDoc::Signal => EventKind::Signal { signal: None },
            EventKindDoc::Call => EventKind::Call { operation: None },
            EventKindDoc::Change => EventKind::Change,
            EventKindDoc::Time => EventKind::Time,
            EventKindDoc::Any => EventKind::AnyReceive,
        };
        let id = self.builder.event(owner, &event.name, placeholder)?;
        register(&mut self.events, &event.name, id);
        self.pending.push(Pending::Event {
            event: id,
            kind: event.kind,
            signal: event.signal,
            operation: event.operation,
        });
        Ok(())
    }

    fn load_class(&mut self, owner: Option<ElementId>, class: ClassDoc) -> Result<(), ModelError> {
        let id = self.builder.class(owner, &class.name)?;
        self.defer_tags(id, class.tags);
        for operation in &class.operations {
            let op = self.builder.operation(id, operation)?;
            register(&mut self.operations, operation, op);
        }
        for property in &class.properties {
            let prop = self.builder.property(id, property)?;
            register(&mut self.properties, property, prop);
        }
        for activity in class.activities {
            self.load_activity(id, activity)?;
        }
        for machine in class.state_machines {
            self.load_state_machine(id, machine)?;
        }
        for nested in class.classes {
            self.load_class(Some(id), nested)?;
        }
        Ok(())
    }

    fn load_state_machine(
        &mut self,
        class: ElementId,
        machine: StateMachineDoc,
    ) -> Result<(), ModelError> {
        let id = self.builder.state_machine(class, &machine.name)?;
        self.defer_tags(id, machine.tags);
        self.vertices.insert(id, NameTable::new());
        for activity in machine.activities {
            self.load_activity(id, activity)?;
        }
        self.load_region(id, id, machine.region)?;
        Ok(())
    }

    fn load_region(
        &mut self,
        machine: ElementId,
        owner: ElementId,
        region: RegionDoc,
    ) -> Result<(), ModelError> {
        let id = self.builder.region(owner, region.name.as_deref())?;

        if let Some(target) = region.initial {
            let pseudostate = self.builder.initial(id)?;
            self.pending.push(Pending::Initial {
                region: id,
                pseudostate,
                target,
            });
        }

        for pseudostate in &region.pseudostates {
            let vertex = self.builder.add(
                Some(id),
                pseudostate.name.as_deref(),
                ElementKind::Pseudostate(pseudostate.kind),
            )?;
            if let Some(name) = &pseudostate.name {
                self.register_vertex(machine, name, vertex);
            }
        }

        for state in region.states {
            let vertex = match state.kind {
                StateKindDoc::State => self.builder.state(id, state.name.as_deref())?,
                StateKindDoc::Final => self.builder.final_state(id, state.name.as_deref())?,
            };
            if let Some(name) = &state.name {
                self.register_vertex(machine, name, vertex);
            }
            self.defer_tags(vertex, state.tags);
            if state.entry.is_some() || state.do_activity.is_some() {
                self.pending.push(Pending::Behaviors {
                    state: vertex,
                    entry: state.entry,
                    do_activity: state.do_activity,
                });
            }
            for nested in state.regions {
                self.load_region(machine, vertex, nested)?;
            }
        }

        for transition in region.transitions {
            self.transitions.push(PendingTransition {
                machine,
                region: id,
                source: transition.source,
                target: transition.target,
                triggers: transition.triggers,
                guard: transition.guard,
            });
        }
        Ok(())
    }

    fn load_activity(&mut self, owner: ElementId, activity: ActivityDoc) -> Result<(), ModelError> {
        let id = self.builder.activity(owner, &activity.name)?;
        register(&mut self.activities, &activity.name, id);

        for parameter in &activity.parameters {
            self.builder.parameter(
                id,
                &parameter.name,
                parameter.direction,
                parameter.type_name.as_deref(),
            )?;
        }

        let mut nodes: HashMap<String, ElementId> = HashMap::new();
        for node in activity.nodes {
            let name = node.name().map(str::to_owned);
            let (kind, reference) = node_kind(node);
            let node_id = self.builder.node(id, name.as_deref(), kind)?;
            if let Some(reference) = reference {
                self.pending.push(Pending::Node {
                    node: node_id,
                    reference,
                });
            }
            if let Some(name) = name {
                if nodes.insert(name.clone(), node_id).is_some() {
                    return Err(ModelError::DuplicateName {
                        name,
                        scope: format!("activity `{}`", activity.name),
                    });
                }
            }
        }

        for edge in &activity.edges {
            let source = edge.source.as_ref().and_then(|name| nodes.get(name)).copied();
            let target = edge.target.as_ref().and_then(|name| nodes.get(name)).copied();
            self.builder
                .edge(id, source, target, edge.guard.as_deref())?;
        }
        Ok(())
    }

    fn defer_tags(&mut self, element: ElementId, tags: Vec<TagDoc>) {
        self.pending
            .extend(tags.into_iter().map(|tag| Pending::Tag { element, tag }));
    }

    fn register_vertex(&mut self, machine: ElementId, name: &str, vertex: ElementId) {
        register(self.vertices.entry(machine).or_default(), name, vertex);
    }

    fn resolve(&mut self) -> Result<(), ModelError> {
        for pending in std::mem::take(&mut self.pending) {
            self.resolve_pending(pending)?;
        }
        for transition in std::mem::take(&mut self.transitions) {
            self.resolve_transition(transition)?;
        }
        Ok(())
    }

    fn resolve_pending(&mut self, pending: Pending) -> Result<(), ModelError> {
        match pending {
            Pending::Tag { element, tag } => {
                let tag = match tag {
                    TagDoc::Name(name) => Tag::new(name),
                    TagDoc::Full {
                        name,
                        qualified_name,
                        profile,
                    } => {
                        let mut tag = name.map(Tag::new).unwrap_or_else(Tag::anonymous);
                        if let Some(qualified_name) = qualified_name {
                            tag = tag.with_qualified_name(qualified_name);
                        }
                        if let Some(profile) = profile
                            .as_deref()
                            .and_then(|profile| self.lookup(&self.profiles, profile, element))
                        {
                            tag = tag.with_profile(profile);
                        }
                        tag
                    }
                };
                self.builder.apply_tag(element, tag)
            }
            Pending::Event {
                event,
                kind,
                signal,
                operation,
            } => {
                let resolved = match kind {
                    EventKindDoc::Signal => EventKind::Signal {
                        signal: signal
                            .as_deref()
                            .and_then(|name| self.lookup(&self.signals, name, event)),
                    },
                    EventKindDoc::Call => EventKind::Call {
                        operation: operation
                            .as_deref()
                            .and_then(|name| self.lookup(&self.operations, name, event)),
                    },
                    _ => return Ok(()),
                };
                *self.builder.kind_mut(event)? = ElementKind::Event(resolved);
                Ok(())
            }
            Pending::Behaviors {
                state,
                entry,
                do_activity,
            } => {
                let entry = entry
                    .as_deref()
                    .and_then(|name| self.lookup(&self.activities, name, state));
                let do_activity = do_activity
                    .as_deref()
                    .and_then(|name| self.lookup(&self.activities, name, state));
                self.builder.set_state_behaviors(state, entry, do_activity)
            }
            Pending::Node { node, reference } => {
                let resolved = match &reference {
                    NodeRef::Behavior(name) => self.lookup(&self.activities, name, node),
                    NodeRef::Signal(name) => self.lookup(&self.signals, name, node),
                    NodeRef::Event(name) => self.lookup(&self.events, name, node),
                    NodeRef::Feature(name) => self.lookup(&self.properties, name, node),
                    NodeRef::Operation(name) => self.lookup(&self.operations, name, node),
                };
                if resolved.is_none() {
                    debug!(node:%, reference:?; "Unresolved activity node reference");
                }
                if let ElementKind::ActivityNode(kind) = self.builder.kind_mut(node)? {
                    match kind {
                        ActivityNodeKind::CallBehavior { behavior } => *behavior = resolved,
                        ActivityNodeKind::SendSignal { signal } => *signal = resolved,
                        ActivityNodeKind::AcceptEvent { event } => *event = resolved,
                        ActivityNodeKind::ReadAttribute { feature }
                        | ActivityNodeKind::WriteAttribute { feature } => *feature = resolved,
                        ActivityNodeKind::CallOperation { operation } => *operation = resolved,
                        _ => {}
                    }
                }
                Ok(())
            }
            Pending::Initial {
                region,
                pseudostate,
                target,
            } => {
                let machine = self.machine_of(region);
                let target = match machine {
                    Some(machine) => self.lookup_vertex(machine, region, &target)?,
                    None => None,
                };
                self.builder
                    .transition(region, Some(pseudostate), target, Vec::new(), None)?;
                Ok(())
            }
        }
    }

    fn resolve_transition(&mut self, transition: PendingTransition) -> Result<(), ModelError> {
        let PendingTransition {
            machine,
            region,
            source,
            target,
            triggers,
            guard,
        } = transition;

        let source = match source {
            Some(name) => self.lookup_vertex(machine, region, &name)?,
            None => None,
        };
        let target = match target {
            Some(name) => self.lookup_vertex(machine, region, &name)?,
            None => None,
        };

        let mut trigger_ids = Vec::with_capacity(triggers.len());
        for trigger in triggers {
            trigger_ids.push(self.resolve_trigger(machine, &trigger)?);
        }

        self.builder
            .transition(region, source, target, trigger_ids, guard.as_deref())?;
        Ok(())
    }

    fn resolve_trigger(&mut self, machine: ElementId, name: &str) -> Result<ElementId, ModelError> {
        if let Some(event) = self.lookup(&self.events, name, machine) {
            return Ok(event);
        }
        if let Some(signal) = self.lookup(&self.signals, name, machine) {
            return Ok(signal);
        }

        let key = (machine, name.to_owned());
        if let Some(event) = self.implicit_events.get(&key) {
            return Ok(*event);
        }
        trace!(machine:%, trigger = name; "Creating implicit call event");
        let event = self.builder.event(
            Some(machine),
            name,
            EventKind::Call { operation: None },
        )?;
        self.implicit_events.insert(key, event);
        Ok(event)
    }

    /// Finds a named vertex of a state machine, preferring the vertices owned
    /// by `region` when the name is ambiguous.
    fn lookup_vertex(
        &self,
        machine: ElementId,
        region: ElementId,
        name: &str,
    ) -> Result<Option<ElementId>, ModelError> {
        let Some(candidates) = self.vertices.get(&machine).and_then(|table| table.get(name))
        else {
            debug!(machine:%, vertex = name; "Unresolved vertex reference");
            return Ok(None);
        };

        if let [single] = candidates.as_slice() {
            return Ok(Some(*single));
        }

        let local: Vec<ElementId> = candidates
            .iter()
            .copied()
            .filter(|candidate| self.owner_of(*candidate) == Some(region))
            .collect();
        match local.as_slice() {
            [single] => Ok(Some(*single)),
            _ => Err(ModelError::AmbiguousReference {
                name: name.to_owned(),
                scope: self.describe(machine),
            }),
        }
    }

    /// Finds a named element, preferring candidates owned by the closest
    /// ancestor of `context`, then the first declared candidate.
    fn lookup(&self, table: &NameTable, name: &str, context: ElementId) -> Option<ElementId> {
        let candidates = table.get(name)?;
        let mut scope = Some(context);
        while let Some(current) = scope {
            if let Some(found) = candidates
                .iter()
                .find(|candidate| self.owner_of(**candidate) == Some(current))
            {
                return Some(*found);
            }
            scope = self.owner_of(current);
        }
        candidates.first().copied()
    }

    fn machine_of(&self, element: ElementId) -> Option<ElementId> {
        let mut current = Some(element);
        while let Some(id) = current {
            let found = self.builder.get(id).ok()?;
            if matches!(found.kind(), ElementKind::StateMachine) {
                return Some(id);
            }
            current = found.owner();
        }
        None
    }

    fn owner_of(&self, element: ElementId) -> Option<ElementId> {
        self.builder.get(element).ok().and_then(|found| found.owner())
    }

    fn describe(&self, element: ElementId) -> String {
        match self.builder.get(element).ok().and_then(|found| found.name()) {
            Some(name) => format!("`{name}`"),
            None => element.to_string(),
        }
    }
}

fn register(table: &mut NameTable, name: &str, id: ElementId) {
    table.entry(name.to_owned()).or_default().push(id);
}

/// Splits a node document into its kind, with references left unresolved.
fn node_kind(node: NodeDoc) -> (ActivityNodeKind, Option<NodeRef>) {
    match node {
        NodeDoc::Initial { .. } => (ActivityNodeKind::Initial, None),
        NodeDoc::Final { .. } => (ActivityNodeKind::Final, None),
        NodeDoc::Decision { .. } => (ActivityNodeKind::Decision, None),
        NodeDoc::Merge { .. } => (ActivityNodeKind::Merge, None),
        NodeDoc::CallBehavior { behavior, .. } => (
            ActivityNodeKind::CallBehavior { behavior: None },
            behavior.map(NodeRef::Behavior),
        ),
        NodeDoc::SendSignal { signal, .. } => (
            ActivityNodeKind::SendSignal { signal: None },
            signal.map(NodeRef::Signal),
        ),
        NodeDoc::AcceptEvent { event, .. } => (
            ActivityNodeKind::AcceptEvent { event: None },
            event.map(NodeRef::Event),
        ),
        NodeDoc::Opaque {
            language,
            body,
            mut bodies,
            ..
        } => {
            if let Some(body) = body {
                bodies.insert(0, OpaqueBody::new(language.as_deref(), body));
            }
            (ActivityNodeKind::Opaque { bodies }, None)
        }
        NodeDoc::ReadAttribute { feature, .. } => (
            ActivityNodeKind::ReadAttribute { feature: None },
            feature.map(NodeRef::Feature),
        ),
        NodeDoc::WriteAttribute { feature, .. } => (
            ActivityNodeKind::WriteAttribute { feature: None },
            feature.map(NodeRef::Feature),
        ),
        NodeDoc::CallOperation { operation, .. } => (
            ActivityNodeKind::CallOperation { operation: None },
            operation.map(NodeRef::Operation),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, TransitionData};

    fn load(source: &str) -> Model {
        let document: Document = toml::from_str(source).expect("valid document");
        document.into_model().expect("model builds")
    }

    fn find<'a>(model: &'a Model, name: &str) -> &'a Element {
        model
            .elements()
            .find(|element| element.name() == Some(name))
            .unwrap_or_else(|| panic!("no element named {name}"))
    }

    fn transitions(model: &Model) -> Vec<&TransitionData> {
        model
            .elements()
            .filter_map(|element| match element.kind() {
                ElementKind::Transition(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    const MOTOR: &str = r#"
        [[packages]]
        name = "Controllers"

        [[packages.profiles]]
        name = "cmdo"

        [[packages.classes]]
        name = "Motor"
        tags = ["Component", { name = "Block", profile = "cmdo" }]
        operations = ["reset"]

        [[packages.classes.state_machines]]
        name = "Control"

        [packages.classes.state_machines.region]
        initial = "Idle"

        [[packages.classes.state_machines.region.states]]
        name = "Idle"
        entry = "OnIdle"

        [[packages.classes.state_machines.region.states]]
        name = "Running"

        [[packages.classes.state_machines.region.transitions]]
        source = "Idle"
        target = "Running"
        triggers = ["START"]

        [[packages.classes.state_machines.region.transitions]]
        source = "Running"
        target = "Idle"
        triggers = ["STOP"]
        guard = "speed == 0"

        [[packages.classes.state_machines.activities]]
        name = "OnIdle"

        [[packages.classes.state_machines.activities.nodes]]
        kind = "initial"
        name = "start"

        [[packages.classes.state_machines.activities.nodes]]
        kind = "opaque"
        name = "zero"
        body = "speed = 0;"

        [[packages.classes.state_machines.activities.nodes]]
        kind = "call-operation"
        name = "reset"
        operation = "reset"

        [[packages.classes.state_machines.activities.edges]]
        source = "start"
        target = "zero"

        [[packages.classes.state_machines.activities.edges]]
        source = "zero"
        target = "missing"
    "#;

    #[test]
    fn test_load_structure() {
        let model = load(MOTOR);

        let package = find(&model, "Controllers");
        let motor = find(&model, "Motor");
        assert_eq!(motor.owner(), Some(package.id()));
        assert_eq!(motor.kind(), &ElementKind::Class);

        let tags = motor.tags();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name(), Some("Component"));
        assert_eq!(tags[1].profile(), Some(find(&model, "cmdo").id()));
    }

    #[test]
    fn test_transitions_and_implicit_events() {
        let model = load(MOTOR);
        let idle = find(&model, "Idle").id();
        let running = find(&model, "Running").id();

        let all = transitions(&model);
        // Initial transition plus the two declared ones.
        assert_eq!(all.len(), 3);

        let start = all
            .iter()
            .find(|data| data.source == Some(idle))
            .expect("Idle transition");
        assert_eq!(start.target, Some(running));
        assert_eq!(start.triggers.len(), 1);

        let event = model.element(start.triggers[0]).unwrap();
        assert_eq!(event.name(), Some("START"));
        assert_eq!(event.owner(), Some(find(&model, "Control").id()));
        assert_eq!(
            event.kind(),
            &ElementKind::Event(EventKind::Call { operation: None })
        );
    }

    #[test]
    fn test_initial_pseudostate_targets_state() {
        let model = load(MOTOR);
        let idle = find(&model, "Idle").id();

        let initial = model
            .elements()
            .find(|element| {
                element.kind() == &ElementKind::Pseudostate(PseudostateKind::Initial)
            })
            .expect("initial pseudostate");
        let initial_transition = transitions(&model)
            .into_iter()
            .find(|data| data.source == Some(initial.id()))
            .expect("initial transition");
        assert_eq!(initial_transition.target, Some(idle));
    }

    #[test]
    fn test_state_entry_and_node_references() {
        let model = load(MOTOR);
        let on_idle = find(&model, "OnIdle").id();
        let reset_op = model
            .elements()
            .find(|element| {
                element.name() == Some("reset") && element.kind() == &ElementKind::Operation
            })
            .unwrap()
            .id();

        match find(&model, "Idle").kind() {
            ElementKind::State(data) => assert_eq!(data.entry, Some(on_idle)),
            other => panic!("unexpected kind {other:?}"),
        }

        let call = model
            .elements()
            .find(|element| {
                matches!(
                    element.kind(),
                    ElementKind::ActivityNode(ActivityNodeKind::CallOperation { .. })
                )
            })
            .unwrap();
        assert_eq!(
            call.kind(),
            &ElementKind::ActivityNode(ActivityNodeKind::CallOperation {
                operation: Some(reset_op)
            })
        );

        match find(&model, "zero").kind() {
            ElementKind::ActivityNode(ActivityNodeKind::Opaque { bodies }) => {
                assert_eq!(bodies, &vec![OpaqueBody::new(None, "speed = 0;")]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_edge_target_dangles() {
        let model = load(MOTOR);
        let zero = find(&model, "zero").id();

        let edge = model
            .elements()
            .find_map(|element| match element.kind() {
                ElementKind::ActivityEdge(data) if data.source == Some(zero) => Some(data),
                _ => None,
            })
            .expect("edge from zero");
        assert_eq!(edge.target, None);
    }

    #[test]
    fn test_missing_target_is_kept_as_malformed() {
        let model = load(
            r#"
            [[classes]]
            name = "Valve"

            [[classes.state_machines]]
            name = "Flow"

            [[classes.state_machines.region.states]]
            name = "Closed"

            [[classes.state_machines.region.transitions]]
            source = "Closed"
            target = "Nowhere"
            "#,
        );

        let all = transitions(&model);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].source, Some(find(&model, "Closed").id()));
        assert_eq!(all[0].target, None);
    }

    #[test]
    fn test_declared_signal_trigger_resolves_to_signal() {
        let model = load(
            r#"
            [[signals]]
            name = "Tick"
            attributes = ["dt"]

            [[classes]]
            name = "Clock"

            [[classes.state_machines]]
            name = "Main"

            [[classes.state_machines.region.states]]
            name = "On"

            [[classes.state_machines.region.transitions]]
            source = "On"
            target = "On"
            triggers = ["Tick"]
            "#,
        );

        let tick = find(&model, "Tick");
        assert_eq!(tick.kind(), &ElementKind::Signal);
        assert_eq!(transitions(&model)[0].triggers, vec![tick.id()]);
    }

    #[test]
    fn test_duplicate_node_names_are_rejected() {
        let document: Document = toml::from_str(
            r#"
            [[classes]]
            name = "Motor"

            [[classes.activities]]
            name = "Act"

            [[classes.activities.nodes]]
            kind = "merge"
            name = "m"

            [[classes.activities.nodes]]
            kind = "merge"
            name = "m"
            "#,
        )
        .unwrap();

        let err = document.into_model().unwrap_err();
        assert!(matches!(err, ModelError::DuplicateName { .. }));
    }

    #[test]
    fn test_ambiguous_vertex_is_rejected() {
        let document: Document = toml::from_str(
            r#"
            [[classes]]
            name = "Motor"

            [[classes.state_machines]]
            name = "Control"

            [[classes.state_machines.region.states]]
            name = "A"

            [[classes.state_machines.region.states.regions]]

            [[classes.state_machines.region.states.regions.states]]
            name = "Inner"

            [[classes.state_machines.region.states]]
            name = "B"

            [[classes.state_machines.region.states.regions]]

            [[classes.state_machines.region.states.regions.states]]
            name = "Inner"

            [[classes.state_machines.region.transitions]]
            source = "A"
            target = "Inner"
            "#,
        )
        .unwrap();

        let err = document.into_model().unwrap_err();
        assert!(matches!(err, ModelError::AmbiguousReference { .. }));
    }
}
