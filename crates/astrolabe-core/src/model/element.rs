//! Element arena entries and their kind-specific data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of an element in a [`Model`](super::Model) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    /// Creates an id from a raw arena index.
    ///
    /// Ids created this way are not checked against any model; lookups with an
    /// out-of-range id simply miss.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A domain marker (stereotype) applied to an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    name: Option<String>,
    qualified_name: Option<String>,
    profile: Option<ElementId>,
}

impl Tag {
    /// Creates a tag with a bare name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Creates a tag without a name. Such a tag never matches a category.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Sets the fully qualified name, e.g. `SysML::Blocks::Block`.
    pub fn with_qualified_name(mut self, qualified_name: impl Into<String>) -> Self {
        self.qualified_name = Some(qualified_name.into());
        self
    }

    /// Sets the owning profile reference. The reference is not validated.
    pub fn with_profile(mut self, profile: ElementId) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn qualified_name(&self) -> Option<&str> {
        self.qualified_name.as_deref()
    }

    pub fn profile(&self) -> Option<ElementId> {
        self.profile
    }
}

/// Kind of a pseudostate vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PseudostateKind {
    Initial,
    DeepHistory,
    ShallowHistory,
    Join,
    Fork,
    Junction,
    Choice,
    EntryPoint,
    ExitPoint,
    Terminate,
}

/// Direction of an activity parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterDirection {
    #[default]
    In,
    Out,
    InOut,
    Return,
}

/// Behaviors attached to a state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateData {
    pub entry: Option<ElementId>,
    pub do_activity: Option<ElementId>,
}

/// Endpoints, triggers and guard of a state machine transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionData {
    pub source: Option<ElementId>,
    pub target: Option<ElementId>,
    /// Event or signal elements, in declaration order.
    pub triggers: Vec<ElementId>,
    pub guard: Option<String>,
}

/// What an event element reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Signal { signal: Option<ElementId> },
    Call { operation: Option<ElementId> },
    Change,
    Time,
    AnyReceive,
}

/// One `(language, body)` pair of an opaque action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OpaqueBody {
    #[serde(default)]
    pub language: Option<String>,
    pub body: String,
}

impl OpaqueBody {
    pub fn new(language: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            language: language.map(str::to_owned),
            body: body.into(),
        }
    }
}

/// Closed set of activity node kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityNodeKind {
    Initial,
    Final,
    Decision,
    Merge,
    CallBehavior { behavior: Option<ElementId> },
    SendSignal { signal: Option<ElementId> },
    AcceptEvent { event: Option<ElementId> },
    Opaque { bodies: Vec<OpaqueBody> },
    ReadAttribute { feature: Option<ElementId> },
    WriteAttribute { feature: Option<ElementId> },
    CallOperation { operation: Option<ElementId> },
}

impl ActivityNodeKind {
    /// Returns `true` for the action kinds, i.e. everything but control nodes.
    pub fn is_action(&self) -> bool {
        !matches!(
            self,
            ActivityNodeKind::Initial
                | ActivityNodeKind::Final
                | ActivityNodeKind::Decision
                | ActivityNodeKind::Merge
        )
    }

    /// Short stable label of the kind, used in visit keys and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            ActivityNodeKind::Initial => "initial",
            ActivityNodeKind::Final => "final",
            ActivityNodeKind::Decision => "decision",
            ActivityNodeKind::Merge => "merge",
            ActivityNodeKind::CallBehavior { .. } => "call-behavior",
            ActivityNodeKind::SendSignal { .. } => "send-signal",
            ActivityNodeKind::AcceptEvent { .. } => "accept-event",
            ActivityNodeKind::Opaque { .. } => "opaque",
            ActivityNodeKind::ReadAttribute { .. } => "read-attribute",
            ActivityNodeKind::WriteAttribute { .. } => "write-attribute",
            ActivityNodeKind::CallOperation { .. } => "call-operation",
        }
    }
}

/// Endpoints and guard of an activity control flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeData {
    pub source: Option<ElementId>,
    pub target: Option<ElementId>,
    pub guard: Option<String>,
}

/// Kind-specific payload of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Package,
    Profile,
    Class,
    Operation,
    Property,
    Parameter {
        direction: ParameterDirection,
        type_name: Option<String>,
    },
    Signal,
    Event(EventKind),
    StateMachine,
    Region,
    State(StateData),
    FinalState,
    Pseudostate(PseudostateKind),
    Transition(TransitionData),
    Activity,
    ActivityNode(ActivityNodeKind),
    ActivityEdge(EdgeData),
}

impl ElementKind {
    /// Short stable label of the kind.
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Package => "package",
            ElementKind::Profile => "profile",
            ElementKind::Class => "class",
            ElementKind::Operation => "operation",
            ElementKind::Property => "property",
            ElementKind::Parameter { .. } => "parameter",
            ElementKind::Signal => "signal",
            ElementKind::Event(_) => "event",
            ElementKind::StateMachine => "state-machine",
            ElementKind::Region => "region",
            ElementKind::State(_) => "state",
            ElementKind::FinalState => "final-state",
            ElementKind::Pseudostate(_) => "pseudostate",
            ElementKind::Transition(_) => "transition",
            ElementKind::Activity => "activity",
            ElementKind::ActivityNode(node) => node.label(),
            ElementKind::ActivityEdge(_) => "activity-edge",
        }
    }

    /// Returns `true` for states, final states and pseudostates.
    pub fn is_vertex(&self) -> bool {
        matches!(
            self,
            ElementKind::State(_) | ElementKind::FinalState | ElementKind::Pseudostate(_)
        )
    }
}

/// A node of the model graph.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) id: ElementId,
    pub(crate) name: Option<String>,
    pub(crate) owner: Option<ElementId>,
    pub(crate) tags: Vec<Tag>,
    pub(crate) kind: ElementKind,
}

impl Element {
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The element name, or `None` when unnamed or blank.
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn owner(&self) -> Option<ElementId> {
        self.owner
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }
}
