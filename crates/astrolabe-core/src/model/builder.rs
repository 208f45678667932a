//! Incremental construction of a [`Model`].

use log::trace;
use thiserror::Error;

use super::{
    ActivityNodeKind, EdgeData, Element, ElementId, ElementKind, EventKind, Model,
    ParameterDirection, PseudostateKind, StateData, Tag, TransitionData,
};

/// Errors raised while building a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    #[error("element {element} is a {found}, expected {expected}")]
    WrongKind {
        element: ElementId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{name}` is ambiguous in {scope}")]
    AmbiguousReference { name: String, scope: String },

    #[error("`{name}` is declared more than once in {scope}")]
    DuplicateName { name: String, scope: String },
}

/// Appends elements to a model arena.
///
/// Every method that takes an owner checks that the owner exists and has a
/// kind that may contain the new element.
///
/// # Examples
///
/// ```
/// use astrolabe_core::model::ModelBuilder;
///
/// let mut builder = ModelBuilder::new();
/// let class = builder.class(None, "Motor").unwrap();
/// let machine = builder.state_machine(class, "Control").unwrap();
/// let region = builder.region(machine, None).unwrap();
/// let idle = builder.state(region, Some("Idle")).unwrap();
/// let initial = builder.initial(region).unwrap();
/// builder.transition(region, Some(initial), Some(idle), vec![], None).unwrap();
///
/// let model = builder.build();
/// assert_eq!(model.len(), 6);
/// ```
#[derive(Debug, Default)]
pub struct ModelBuilder {
    elements: Vec<Element>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an element of any kind.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownElement`] if `owner` does not exist.
    pub fn add(
        &mut self,
        owner: Option<ElementId>,
        name: Option<&str>,
        kind: ElementKind,
    ) -> Result<ElementId, ModelError> {
        if let Some(owner) = owner {
            self.get(owner)?;
        }

        let id = ElementId(self.elements.len() as u32);
        trace!(id:%, kind = kind.label(), name:?; "Adding model element");
        self.elements.push(Element {
            id,
            name: name.map(str::to_owned),
            owner,
            tags: Vec::new(),
            kind,
        });
        Ok(id)
    }

    pub fn package(&mut self, owner: Option<ElementId>, name: &str) -> Result<ElementId, ModelError> {
        if let Some(owner) = owner {
            self.expect_kind(owner, "package", |kind| matches!(kind, ElementKind::Package))?;
        }
        self.add(owner, Some(name), ElementKind::Package)
    }

    pub fn profile(&mut self, owner: Option<ElementId>, name: &str) -> Result<ElementId, ModelError> {
        self.add(owner, Some(name), ElementKind::Profile)
    }

    /// Adds a class, either at the root, in a package, or nested in a class.
    pub fn class(&mut self, owner: Option<ElementId>, name: &str) -> Result<ElementId, ModelError> {
        if let Some(owner) = owner {
            self.expect_kind(owner, "package or class", |kind| {
                matches!(kind, ElementKind::Package | ElementKind::Class)
            })?;
        }
        self.add(owner, Some(name), ElementKind::Class)
    }

    pub fn operation(&mut self, class: ElementId, name: &str) -> Result<ElementId, ModelError> {
        self.expect_kind(class, "class", |kind| matches!(kind, ElementKind::Class))?;
        self.add(Some(class), Some(name), ElementKind::Operation)
    }

    pub fn property(&mut self, owner: ElementId, name: &str) -> Result<ElementId, ModelError> {
        self.expect_kind(owner, "class or signal", |kind| {
            matches!(kind, ElementKind::Class | ElementKind::Signal)
        })?;
        self.add(Some(owner), Some(name), ElementKind::Property)
    }

    pub fn parameter(
        &mut self,
        activity: ElementId,
        name: &str,
        direction: ParameterDirection,
        type_name: Option<&str>,
    ) -> Result<ElementId, ModelError> {
        self.expect_kind(activity, "activity", |kind| {
            matches!(kind, ElementKind::Activity)
        })?;
        self.add(
            Some(activity),
            Some(name),
            ElementKind::Parameter {
                direction,
                type_name: type_name.map(str::to_owned),
            },
        )
    }

    /// Adds a signal with one property per attribute name.
    pub fn signal(
        &mut self,
        owner: Option<ElementId>,
        name: &str,
        attributes: &[&str],
    ) -> Result<ElementId, ModelError> {
        let signal = self.add(owner, Some(name), ElementKind::Signal)?;
        for attribute in attributes {
            self.property(signal, attribute)?;
        }
        Ok(signal)
    }

    pub fn event(
        &mut self,
        owner: Option<ElementId>,
        name: &str,
        kind: EventKind,
    ) -> Result<ElementId, ModelError> {
        self.add(owner, Some(name), ElementKind::Event(kind))
    }

    pub fn state_machine(&mut self, class: ElementId, name: &str) -> Result<ElementId, ModelError> {
        self.expect_kind(class, "class", |kind| matches!(kind, ElementKind::Class))?;
        self.add(Some(class), Some(name), ElementKind::StateMachine)
    }

    /// Adds a region owned by a state machine (a top region) or by a state.
    pub fn region(&mut self, owner: ElementId, name: Option<&str>) -> Result<ElementId, ModelError> {
        self.expect_kind(owner, "state machine or state", |kind| {
            matches!(kind, ElementKind::StateMachine | ElementKind::State(_))
        })?;
        self.add(Some(owner), name, ElementKind::Region)
    }

    pub fn state(&mut self, region: ElementId, name: Option<&str>) -> Result<ElementId, ModelError> {
        self.expect_region(region)?;
        self.add(Some(region), name, ElementKind::State(StateData::default()))
    }

    pub fn final_state(
        &mut self,
        region: ElementId,
        name: Option<&str>,
    ) -> Result<ElementId, ModelError> {
        self.expect_region(region)?;
        self.add(Some(region), name, ElementKind::FinalState)
    }

    pub fn pseudostate(
        &mut self,
        region: ElementId,
        kind: PseudostateKind,
    ) -> Result<ElementId, ModelError> {
        self.expect_region(region)?;
        self.add(Some(region), None, ElementKind::Pseudostate(kind))
    }

    pub fn initial(&mut self, region: ElementId) -> Result<ElementId, ModelError> {
        self.pseudostate(region, PseudostateKind::Initial)
    }

    /// Adds a transition. Endpoints may be absent; such transitions are kept
    /// and reported as malformed during generation.
    pub fn transition(
        &mut self,
        owner: ElementId,
        source: Option<ElementId>,
        target: Option<ElementId>,
        triggers: Vec<ElementId>,
        guard: Option<&str>,
    ) -> Result<ElementId, ModelError> {
        self.add(
            Some(owner),
            None,
            ElementKind::Transition(TransitionData {
                source,
                target,
                triggers,
                guard: guard.map(str::to_owned),
            }),
        )
    }

    pub fn activity(&mut self, owner: ElementId, name: &str) -> Result<ElementId, ModelError> {
        self.add(Some(owner), Some(name), ElementKind::Activity)
    }

    pub fn node(
        &mut self,
        activity: ElementId,
        name: Option<&str>,
        kind: ActivityNodeKind,
    ) -> Result<ElementId, ModelError> {
        self.expect_activity(activity)?;
        self.add(Some(activity), name, ElementKind::ActivityNode(kind))
    }

    pub fn edge(
        &mut self,
        activity: ElementId,
        source: Option<ElementId>,
        target: Option<ElementId>,
        guard: Option<&str>,
    ) -> Result<ElementId, ModelError> {
        self.expect_activity(activity)?;
        self.add(
            Some(activity),
            None,
            ElementKind::ActivityEdge(EdgeData {
                source,
                target,
                guard: guard.map(str::to_owned),
            }),
        )
    }

    /// Applies a tag to an element.
    pub fn apply_tag(&mut self, element: ElementId, tag: Tag) -> Result<(), ModelError> {
        self.get_mut(element)?.tags.push(tag);
        Ok(())
    }

    /// Sets the entry and do-activity behaviors of a state.
    pub fn set_state_behaviors(
        &mut self,
        state: ElementId,
        entry: Option<ElementId>,
        do_activity: Option<ElementId>,
    ) -> Result<(), ModelError> {
        match self.kind_mut(state)? {
            ElementKind::State(data) => {
                data.entry = entry;
                data.do_activity = do_activity;
                Ok(())
            }
            other => Err(ModelError::WrongKind {
                element: state,
                expected: "state",
                found: other.label(),
            }),
        }
    }

    /// Gives mutable access to an element's kind payload, for resolving
    /// references after all elements exist.
    pub fn kind_mut(&mut self, element: ElementId) -> Result<&mut ElementKind, ModelError> {
        Ok(&mut self.get_mut(element)?.kind)
    }

    /// Returns an element added so far.
    pub fn get(&self, element: ElementId) -> Result<&Element, ModelError> {
        self.elements
            .get(element.index())
            .ok_or(ModelError::UnknownElement(element))
    }

    /// Finishes the model.
    pub fn build(self) -> Model {
        Model {
            elements: self.elements,
        }
    }

    fn get_mut(&mut self, element: ElementId) -> Result<&mut Element, ModelError> {
        self.elements
            .get_mut(element.index())
            .ok_or(ModelError::UnknownElement(element))
    }

    fn expect_kind(
        &self,
        element: ElementId,
        expected: &'static str,
        accept: impl Fn(&ElementKind) -> bool,
    ) -> Result<(), ModelError> {
        let found = &self.get(element)?.kind;
        if accept(found) {
            Ok(())
        } else {
            Err(ModelError::WrongKind {
                element,
                expected,
                found: found.label(),
            })
        }
    }

    fn expect_region(&self, region: ElementId) -> Result<(), ModelError> {
        self.expect_kind(region, "region", |kind| matches!(kind, ElementKind::Region))
    }

    fn expect_activity(&self, activity: ElementId) -> Result<(), ModelError> {
        self.expect_kind(activity, "activity", |kind| {
            matches!(kind, ElementKind::Activity)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_owner_is_rejected() {
        let mut builder = ModelBuilder::new();
        let missing = ElementId::from_raw(42);

        let err = builder.class(Some(missing), "Motor").unwrap_err();
        assert_eq!(err, ModelError::UnknownElement(missing));
    }

    #[test]
    fn test_owner_precedes_element() {
        let mut builder = ModelBuilder::new();
        let class = builder.class(None, "Motor").unwrap();
        let machine = builder.state_machine(class, "Control").unwrap();
        let region = builder.region(machine, Some("Main")).unwrap();
        let state = builder.state(region, Some("Idle")).unwrap();
        let model = builder.build();

        for element in model.elements() {
            if let Some(owner) = element.owner() {
                assert!(owner < element.id());
            }
        }
        assert_eq!(model.element(state).unwrap().owner(), Some(region));
    }

    #[test]
    fn test_state_requires_region_owner() {
        let mut builder = ModelBuilder::new();
        let class = builder.class(None, "Motor").unwrap();

        let err = builder.state(class, Some("Idle")).unwrap_err();
        assert_eq!(
            err,
            ModelError::WrongKind {
                element: class,
                expected: "region",
                found: "class",
            }
        );
    }

    #[test]
    fn test_node_requires_activity_owner() {
        let mut builder = ModelBuilder::new();
        let class = builder.class(None, "Motor").unwrap();

        let err = builder
            .node(class, None, ActivityNodeKind::Initial)
            .unwrap_err();
        assert!(matches!(err, ModelError::WrongKind { expected: "activity", .. }));
    }

    #[test]
    fn test_signal_attributes_become_properties() {
        let mut builder = ModelBuilder::new();
        let signal = builder.signal(None, "Telemetry", &["speed", "heading"]).unwrap();
        let model = builder.build();

        let owned: Vec<_> = model
            .elements()
            .filter(|element| element.owner() == Some(signal))
            .map(|element| element.name())
            .collect();
        assert_eq!(owned, vec![Some("speed"), Some("heading")]);
    }

    #[test]
    fn test_apply_tag_and_state_behaviors() {
        let mut builder = ModelBuilder::new();
        let class = builder.class(None, "Motor").unwrap();
        builder
            .apply_tag(class, Tag::new("Block").with_qualified_name("SysML::Blocks::Block"))
            .unwrap();
        let machine = builder.state_machine(class, "Control").unwrap();
        let region = builder.region(machine, None).unwrap();
        let state = builder.state(region, Some("Idle")).unwrap();
        let entry = builder.activity(machine, "OnIdle").unwrap();
        builder.set_state_behaviors(state, Some(entry), None).unwrap();

        let err = builder.set_state_behaviors(region, None, None).unwrap_err();
        assert!(matches!(err, ModelError::WrongKind { expected: "state", .. }));

        let model = builder.build();
        let tags = model.element(class).unwrap().tags();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].qualified_name(), Some("SysML::Blocks::Block"));

        match model.element(state).unwrap().kind() {
            ElementKind::State(data) => assert_eq!(data.entry, Some(entry)),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_dangling_transition_is_accepted() {
        let mut builder = ModelBuilder::new();
        let class = builder.class(None, "Motor").unwrap();
        let machine = builder.state_machine(class, "Control").unwrap();
        let region = builder.region(machine, None).unwrap();
        let idle = builder.state(region, Some("Idle")).unwrap();
        let transition = builder
            .transition(region, Some(idle), None, vec![], Some("x > 0"))
            .unwrap();
        let model = builder.build();

        match model.element(transition).unwrap().kind() {
            ElementKind::Transition(data) => {
                assert_eq!(data.source, Some(idle));
                assert_eq!(data.target, None);
                assert_eq!(data.guard.as_deref(), Some("x > 0"));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
