//! Control-flow graph of a single activity.
//!
//! The graph is built once per lowering from the [`ModelIndex`]. Nodes keep
//! declaration order and each node's outgoing edges keep declaration order,
//! which makes traversal deterministic. Edge targets that are not nodes of the
//! activity are kept as dangling edges instead of being dropped, so lowering
//! can report them.

use indexmap::IndexMap;

use astrolabe_core::model::{ActivityNodeKind, ElementId, ElementKind};

use crate::index::ModelIndex;

/// A node of the control-flow graph.
#[derive(Debug, Clone, Copy)]
pub(super) struct ControlNode<'a> {
    pub(super) id: ElementId,
    pub(super) name: Option<&'a str>,
    pub(super) kind: &'a ActivityNodeKind,
}

/// A directed control flow between two nodes.
#[derive(Debug, Clone, Copy)]
pub(super) struct ControlEdge<'a> {
    pub(super) id: ElementId,
    /// `None` when the target is missing or not a node of this activity.
    pub(super) target: Option<ElementId>,
    pub(super) guard: Option<&'a str>,
}

/// Nodes and edges of one activity.
#[derive(Debug)]
pub(super) struct ControlFlowGraph<'a> {
    nodes: IndexMap<ElementId, ControlNode<'a>>,
    edges: Vec<ControlEdge<'a>>,
    outgoing_edges: IndexMap<ElementId, Vec<usize>>,
}

impl<'a> ControlFlowGraph<'a> {
    /// Builds the graph of the nodes and edges owned by `activity`.
    pub(super) fn from_activity(index: &ModelIndex<'a>, activity: ElementId) -> Self {
        let mut graph = ControlFlowGraph {
            nodes: IndexMap::new(),
            edges: Vec::new(),
            outgoing_edges: IndexMap::new(),
        };

        for &element in index.owned(activity) {
            if let Some(ElementKind::ActivityNode(kind)) = index.kind(element) {
                graph.add_node(ControlNode {
                    id: element,
                    name: index.name(element),
                    kind,
                });
            }
        }

        let sources: Vec<ElementId> = graph.nodes.keys().copied().collect();
        for source in sources {
            for &element in index.outgoing_edges(source) {
                if index.owner(element) != Some(activity) {
                    continue;
                }
                let Some(ElementKind::ActivityEdge(data)) = index.kind(element) else {
                    continue;
                };
                let target = data.target.filter(|target| graph.contains_node(*target));
                graph.add_edge(
                    source,
                    ControlEdge {
                        id: element,
                        target,
                        guard: data.guard.as_deref().map(str::trim).filter(|g| !g.is_empty()),
                    },
                );
            }
        }

        graph
    }

    fn add_node(&mut self, node: ControlNode<'a>) {
        self.nodes.insert(node.id, node);
    }

    fn add_edge(&mut self, source: ElementId, edge: ControlEdge<'a>) {
        self.edges.push(edge);
        let idx = self.edges.len() - 1;
        self.outgoing_edges.entry(source).or_default().push(idx);
    }

    /// Returns the node with the given id, if it belongs to the activity.
    pub(super) fn node(&self, id: ElementId) -> Option<ControlNode<'a>> {
        self.nodes.get(&id).copied()
    }

    pub(super) fn contains_node(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterates nodes in declaration order.
    pub(super) fn nodes(&self) -> impl Iterator<Item = ControlNode<'a>> + '_ {
        self.nodes.values().copied()
    }

    pub(super) fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates the initial nodes in declaration order.
    pub(super) fn initial_nodes(&self) -> impl Iterator<Item = ControlNode<'a>> + '_ {
        self.nodes()
            .filter(|node| matches!(node.kind, ActivityNodeKind::Initial))
    }

    /// Iterates the edges leaving a node in declaration order.
    pub(super) fn outgoing(&self, source: ElementId) -> impl Iterator<Item = ControlEdge<'a>> + '_ {
        self.outgoing_edges
            .get(&source)
            .into_iter()
            .flatten()
            .map(|idx| self.edges[*idx])
    }
}

#[cfg(test)]
mod tests {
    use astrolabe_core::model::{Model, ModelBuilder};

    use super::*;

    struct Fixture {
        model: Model,
        activity: ElementId,
        initial: ElementId,
        step: ElementId,
        done: ElementId,
        first: ElementId,
        second: ElementId,
        dangling: ElementId,
    }

    fn fixture() -> Fixture {
        let mut b = ModelBuilder::new();
        let class = b.class(None, "Motor").unwrap();
        let activity = b.activity(class, "Spin").unwrap();
        let other = b.activity(class, "Other").unwrap();
        let foreign = b.node(other, Some("foreign"), ActivityNodeKind::Merge).unwrap();
        let initial = b.node(activity, None, ActivityNodeKind::Initial).unwrap();
        let step = b
            .node(activity, Some("step"), ActivityNodeKind::Opaque { bodies: vec![] })
            .unwrap();
        let done = b.node(activity, None, ActivityNodeKind::Final).unwrap();
        let first = b.edge(activity, Some(initial), Some(step), None).unwrap();
        let second = b.edge(activity, Some(step), Some(done), Some("  ")).unwrap();
        let dangling = b.edge(activity, Some(step), Some(foreign), Some("x > 1")).unwrap();
        b.edge(activity, Some(foreign), Some(step), None).unwrap();
        Fixture {
            model: b.build(),
            activity,
            initial,
            step,
            done,
            first,
            second,
            dangling,
        }
    }

    #[test]
    fn test_nodes_in_declaration_order() {
        let f = fixture();
        let index = ModelIndex::new(&f.model);
        let graph = ControlFlowGraph::from_activity(&index, f.activity);

        let ids: Vec<ElementId> = graph.nodes().map(|node| node.id).collect();
        assert_eq!(ids, vec![f.initial, f.step, f.done]);
        assert_eq!(graph.nodes_count(), 3);
        assert_eq!(graph.node(f.step).and_then(|node| node.name), Some("step"));
        assert_eq!(
            graph.initial_nodes().map(|node| node.id).collect::<Vec<_>>(),
            vec![f.initial]
        );
    }

    #[test]
    fn test_outgoing_edges() {
        let f = fixture();
        let index = ModelIndex::new(&f.model);
        let graph = ControlFlowGraph::from_activity(&index, f.activity);

        let first: Vec<_> = graph.outgoing(f.initial).collect();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, f.first);
        assert_eq!(first[0].target, Some(f.step));

        let from_step: Vec<_> = graph.outgoing(f.step).collect();
        assert_eq!(
            from_step.iter().map(|edge| edge.id).collect::<Vec<_>>(),
            vec![f.second, f.dangling]
        );
        // Blank guards are dropped, edges into other activities dangle.
        assert_eq!(from_step[0].guard, None);
        assert_eq!(from_step[1].target, None);
        assert_eq!(from_step[1].guard, Some("x > 1"));

        assert_eq!(graph.outgoing(f.done).count(), 0);
    }
}
