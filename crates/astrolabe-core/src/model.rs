//! Read-only model graph.
//!
//! Every element of a loaded model lives in one [`Model`] arena and is
//! addressed by an [`ElementId`]. Elements are appended through a
//! [`ModelBuilder`], which guarantees that an element's owner always precedes
//! it, so ownership chains are finite and acyclic.

mod builder;
mod element;

pub use builder::{ModelBuilder, ModelError};
pub use element::{
    ActivityNodeKind, EdgeData, Element, ElementId, ElementKind, EventKind, OpaqueBody,
    ParameterDirection, PseudostateKind, StateData, Tag, TransitionData,
};

/// Immutable arena of model elements.
#[derive(Debug, Clone, Default)]
pub struct Model {
    elements: Vec<Element>,
}

impl Model {
    /// Returns the element with the given id, if it exists.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.index())
    }

    /// Returns all elements in declaration order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Returns the elements without an owner.
    pub fn roots(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|element| element.owner.is_none())
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the model has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_model() {
        let model = Model::default();

        assert!(model.is_empty());
        assert_eq!(model.len(), 0);
        assert!(model.element(ElementId::from_raw(0)).is_none());
    }

    #[test]
    fn test_roots_and_lookup() {
        let mut builder = ModelBuilder::new();
        let pkg = builder.package(None, "Controllers").unwrap();
        let class = builder.class(Some(pkg), "Motor").unwrap();
        let other = builder.package(None, "Shared").unwrap();
        let model = builder.build();

        let roots: Vec<_> = model.roots().map(Element::id).collect();
        assert_eq!(roots, vec![pkg, other]);

        let motor = model.element(class).unwrap();
        assert_eq!(motor.name(), Some("Motor"));
        assert_eq!(motor.owner(), Some(pkg));
        assert_eq!(motor.kind(), &ElementKind::Class);
    }

    #[test]
    fn test_blank_name_is_absent() {
        let mut builder = ModelBuilder::new();
        let pkg = builder.package(None, "   ").unwrap();
        let model = builder.build();

        assert_eq!(model.element(pkg).unwrap().name(), None);
    }
}
