//! Read-only query façade over a model.
//!
//! [`ModelIndex`] wraps a [`Model`] once per document and precomputes the
//! ownership tree and the outgoing transition and edge lists, each in
//! declaration order. Every semantic query of the generator goes through it.
//! Query misses yield `None` or an empty slice, never a panic.

use thiserror::Error;

use astrolabe_core::model::{Element, ElementId, ElementKind, Model, Tag};

/// Failure while following a tag's profile reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile reference {0} does not exist")]
    Dangling(ElementId),

    #[error("profile reference {element} is a {found}, not a profile")]
    NotAProfile {
        element: ElementId,
        found: &'static str,
    },
}

/// Precomputed adjacency over a model arena.
#[derive(Debug)]
pub struct ModelIndex<'a> {
    model: &'a Model,
    children: Vec<Vec<ElementId>>,
    outgoing_transitions: Vec<Vec<ElementId>>,
    outgoing_edges: Vec<Vec<ElementId>>,
}

impl<'a> ModelIndex<'a> {
    /// Builds the index. Dangling references are skipped.
    pub fn new(model: &'a Model) -> Self {
        let len = model.len();
        let mut children = vec![Vec::new(); len];
        let mut outgoing_transitions = vec![Vec::new(); len];
        let mut outgoing_edges = vec![Vec::new(); len];

        for element in model.elements() {
            if let Some(owner) = element.owner() {
                if let Some(list) = children.get_mut(owner.index()) {
                    list.push(element.id());
                }
            }
            match element.kind() {
                ElementKind::Transition(data) => {
                    if let Some(list) = data
                        .source
                        .and_then(|source| outgoing_transitions.get_mut(source.index()))
                    {
                        list.push(element.id());
                    }
                }
                ElementKind::ActivityEdge(data) => {
                    if let Some(list) = data
                        .source
                        .and_then(|source| outgoing_edges.get_mut(source.index()))
                    {
                        list.push(element.id());
                    }
                }
                _ => {}
            }
        }

        Self {
            model,
            children,
            outgoing_transitions,
            outgoing_edges,
        }
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    pub fn element(&self, id: ElementId) -> Option<&'a Element> {
        self.model.element(id)
    }

    pub fn kind(&self, id: ElementId) -> Option<&'a ElementKind> {
        self.element(id).map(Element::kind)
    }

    /// Returns the non-blank name of an element.
    pub fn name(&self, id: ElementId) -> Option<&'a str> {
        self.element(id).and_then(Element::name)
    }

    pub fn owner(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).and_then(Element::owner)
    }

    /// Returns the directly owned elements in declaration order.
    pub fn owned(&self, id: ElementId) -> &[ElementId] {
        self.children
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns every transitively owned element in preorder, excluding `id`.
    pub fn all_owned(&self, id: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut stack: Vec<ElementId> = self.owned(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.owned(current).iter().rev().copied());
        }
        result
    }

    /// Iterates the owners of `id`, nearest first. `id` itself is excluded.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.owner(id), move |current| self.owner(*current))
    }

    /// Returns the nearest package, starting with `id` itself.
    pub fn nearest_package(&self, id: ElementId) -> Option<ElementId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|candidate| matches!(self.kind(*candidate), Some(ElementKind::Package)))
    }

    /// Returns the state machine `id` is nested in.
    pub fn containing_state_machine(&self, id: ElementId) -> Option<ElementId> {
        self.ancestors(id)
            .find(|candidate| matches!(self.kind(*candidate), Some(ElementKind::StateMachine)))
    }

    /// Returns the state owning a region, or `None` for a top region.
    pub fn parent_state(&self, region: ElementId) -> Option<ElementId> {
        self.owner(region)
            .filter(|owner| matches!(self.kind(*owner), Some(ElementKind::State(_))))
    }

    /// Returns the region a vertex belongs to.
    pub fn container(&self, vertex: ElementId) -> Option<ElementId> {
        self.owner(vertex)
            .filter(|owner| matches!(self.kind(*owner), Some(ElementKind::Region)))
    }

    /// Returns the first region owned by a state machine.
    pub fn root_region(&self, machine: ElementId) -> Option<ElementId> {
        self.owned_of_kind(machine, |kind| matches!(kind, ElementKind::Region))
            .next()
    }

    /// Returns the transitions leaving a vertex, in declaration order.
    pub fn outgoing_transitions(&self, vertex: ElementId) -> &[ElementId] {
        self.outgoing_transitions
            .get(vertex.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the control flows leaving an activity node, in declaration order.
    pub fn outgoing_edges(&self, node: ElementId) -> &[ElementId] {
        self.outgoing_edges
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolves the name of the profile owning a tag.
    ///
    /// Returns `Ok(None)` when the tag has no profile reference or the
    /// profile is unnamed.
    ///
    /// # Errors
    ///
    /// Fails when the reference dangles or points at something other than a
    /// profile.
    pub fn profile_name(&self, tag: &Tag) -> Result<Option<&'a str>, ProfileError> {
        let Some(profile) = tag.profile() else {
            return Ok(None);
        };
        let element = self
            .element(profile)
            .ok_or(ProfileError::Dangling(profile))?;
        match element.kind() {
            ElementKind::Profile => Ok(element.name()),
            other => Err(ProfileError::NotAProfile {
                element: profile,
                found: other.label(),
            }),
        }
    }

    /// Iterates all classes in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.model
            .elements()
            .filter(|element| matches!(element.kind(), ElementKind::Class))
            .map(Element::id)
    }

    /// Returns the state machines owned by a class.
    pub fn state_machines(&self, class: ElementId) -> Vec<ElementId> {
        self.owned_of_kind(class, |kind| matches!(kind, ElementKind::StateMachine))
            .collect()
    }

    /// Returns the activities directly owned by an element.
    pub fn activities(&self, owner: ElementId) -> Vec<ElementId> {
        self.owned_of_kind(owner, |kind| matches!(kind, ElementKind::Activity))
            .collect()
    }

    /// Scopes whose activities a state machine can call: the state machine,
    /// its owning class, then the outermost class enclosing it.
    pub fn activity_scopes(&self, machine: ElementId) -> Vec<ElementId> {
        let class = self.owner(machine);
        let root_class = self
            .ancestors(machine)
            .filter(|candidate| matches!(self.kind(*candidate), Some(ElementKind::Class)))
            .last();

        let mut scopes = vec![machine];
        for scope in [class, root_class].into_iter().flatten() {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        scopes
    }

    fn owned_of_kind<'s>(
        &'s self,
        owner: ElementId,
        accept: impl Fn(&ElementKind) -> bool + 's,
    ) -> impl Iterator<Item = ElementId> + 's {
        self.owned(owner)
            .iter()
            .copied()
            .filter(move |child| self.kind(*child).is_some_and(&accept))
    }
}
