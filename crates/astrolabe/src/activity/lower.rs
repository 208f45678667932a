//! Lowering of activity control flow into structured statements.

use std::collections::HashSet;

use log::debug;

use astrolabe_core::model::{ActivityNodeKind, ElementId};

use super::{
    graph::{ControlFlowGraph, ControlNode},
    passthrough::BodyPassthrough,
    statement::{
        Action, ActionBlock, Alternative, Branch, BranchKeyword, Placeholder, Statement,
    },
};
use crate::{
    backend::LanguageFamily,
    context::GenerationContext,
    diagnostic::{Diagnostic, DiagnosticCode, DiagnosticCollector},
    index::ModelIndex,
};

/// Condition used for an unguarded first alternative.
pub const UNGUARDED_CONDITION: &str = "true";

/// Label of unnamed nodes.
const UNNAMED: &str = "unnamed";

/// Identity of a node on a traversal path: its kind and its name, or its id
/// when unnamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VisitKey<'a> {
    Named(&'static str, &'a str),
    Anonymous(&'static str, ElementId),
}

impl<'a> VisitKey<'a> {
    fn of(node: &ControlNode<'a>) -> Self {
        match node.name {
            Some(name) => VisitKey::Named(node.kind.label(), name),
            None => VisitKey::Anonymous(node.kind.label(), node.id),
        }
    }
}

type Visited<'a> = HashSet<VisitKey<'a>>;

/// Lowers activities of one generation context.
///
/// # Examples
///
/// ```
/// use astrolabe::activity::{ActivityLowering, HeuristicPassthrough, Statement};
/// use astrolabe::context::GenerationContext;
/// use astrolabe::diagnostic::DiagnosticCollector;
/// use astrolabe::index::ModelIndex;
/// use astrolabe_core::model::{ActivityNodeKind, ModelBuilder, OpaqueBody};
///
/// let mut b = ModelBuilder::new();
/// let class = b.class(None, "Motor").unwrap();
/// let activity = b.activity(class, "Reset").unwrap();
/// let start = b.node(activity, None, ActivityNodeKind::Initial).unwrap();
/// let body = vec![OpaqueBody::new(None, "x = 1;")];
/// let set = b.node(activity, Some("set"), ActivityNodeKind::Opaque { bodies: body }).unwrap();
/// let end = b.node(activity, None, ActivityNodeKind::Final).unwrap();
/// b.edge(activity, Some(start), Some(set), None).unwrap();
/// b.edge(activity, Some(set), Some(end), None).unwrap();
/// let model = b.build();
///
/// let index = ModelIndex::new(&model);
/// let passthrough = HeuristicPassthrough::default();
/// let ctx = GenerationContext::default();
/// let lowering = ActivityLowering::new(&index, &passthrough, &ctx);
/// let mut diagnostics = DiagnosticCollector::new();
/// let statements = lowering.lower(activity, &mut diagnostics);
///
/// assert_eq!(statements.len(), 2);
/// assert!(matches!(statements[1], Statement::Completion));
/// assert!(diagnostics.is_empty());
/// ```
pub struct ActivityLowering<'i, 'a> {
    index: &'i ModelIndex<'a>,
    passthrough: &'i dyn BodyPassthrough,
    family: LanguageFamily,
}

impl<'i, 'a> ActivityLowering<'i, 'a> {
    pub fn new(
        index: &'i ModelIndex<'a>,
        passthrough: &'i dyn BodyPassthrough,
        ctx: &GenerationContext,
    ) -> Self {
        Self {
            index,
            passthrough,
            family: ctx.target().language_family(),
        }
    }

    /// Lowers an activity into statements.
    ///
    /// Never fails: content that cannot be lowered becomes a
    /// [`Statement::Placeholder`] with a note diagnostic.
    pub fn lower(&self, activity: ElementId, diagnostics: &mut DiagnosticCollector) -> Vec<Statement> {
        let graph = ControlFlowGraph::from_activity(self.index, activity);
        if graph.nodes_count() == 0 {
            debug!(activity:%; "Activity has no nodes");
            return Vec::new();
        }

        let mut traversal = Traversal {
            lowering: self,
            graph: &graph,
            budget: 8 * graph.nodes_count() + 8,
            visits: 0,
            exhausted: false,
            diagnostics,
        };

        let mut initials = graph.initial_nodes();
        let Some(initial) = initials.next() else {
            debug!(activity:%; "Activity has no initial node, lowering actions in order");
            return graph
                .nodes()
                .filter(|node| node.kind.is_action())
                .map(|node| traversal.action(node))
                .collect();
        };
        if initials.next().is_some() {
            let first = initial.id;
            debug!(activity:%, first:%; "Several initial nodes, using the first");
        }

        let mut visited = Visited::new();
        traversal.lower_node(initial, &mut visited)
    }
}

struct Traversal<'l, 'i, 'a, 'g, 'd> {
    lowering: &'l ActivityLowering<'i, 'a>,
    graph: &'g ControlFlowGraph<'a>,
    budget: usize,
    visits: usize,
    exhausted: bool,
    diagnostics: &'d mut DiagnosticCollector,
}

impl<'a> Traversal<'_, '_, 'a, '_, '_> {
    /// Counts a node visit. Returns `false` once the budget is spent, emitting
    /// a single placeholder into `out` the first time.
    fn spend(&mut self, node: &ControlNode<'a>, out: &mut Vec<Statement>) -> bool {
        if self.exhausted {
            return false;
        }
        self.visits += 1;
        if self.visits <= self.budget {
            return true;
        }
        self.exhausted = true;
        out.push(self.placeholder(
            node,
            DiagnosticCode::N105,
            format!("expansion budget of {} node visits exhausted", self.budget),
        ));
        false
    }

    fn lower_node(&mut self, node: ControlNode<'a>, visited: &mut Visited<'a>) -> Vec<Statement> {
        let mut out = Vec::new();
        if !self.spend(&node, &mut out) {
            return out;
        }
        if !visited.insert(VisitKey::of(&node)) {
            return out;
        }

        match node.kind {
            ActivityNodeKind::Final => out.push(Statement::Completion),
            ActivityNodeKind::Decision => out.push(self.branch(node, visited)),
            ActivityNodeKind::Initial | ActivityNodeKind::Merge => {
                self.follow(node, visited, &mut out);
            }
            _ => {
                out.push(self.action(node));
                self.follow(node, visited, &mut out);
            }
        }
        out
    }

    /// Lowers the successors of a node along its outgoing edges.
    fn follow(&mut self, node: ControlNode<'a>, visited: &mut Visited<'a>, out: &mut Vec<Statement>) {
        let graph = self.graph;
        for edge in graph.outgoing(node.id) {
            if self.exhausted {
                return;
            }
            let Some(target) = edge.target.and_then(|target| graph.node(target)) else {
                self.dangling(node, edge.id, out);
                continue;
            };
            if matches!(target.kind, ActivityNodeKind::Final) {
                if self.spend(&target, out) {
                    out.push(Statement::Completion);
                }
                break;
            }
            out.extend(self.lower_node(target, visited));
        }
    }

    fn branch(&mut self, node: ControlNode<'a>, visited: &Visited<'a>) -> Statement {
        let edges: Vec<_> = self.graph.outgoing(node.id).collect();
        if edges.is_empty() {
            return self.placeholder(
                &node,
                DiagnosticCode::N104,
                "decision has no outgoing flows".to_owned(),
            );
        }

        let mut alternatives = Vec::with_capacity(edges.len());
        for (position, edge) in edges.into_iter().enumerate() {
            let (keyword, condition) = match (position, edge.guard) {
                (0, guard) => (
                    BranchKeyword::If,
                    guard.unwrap_or(UNGUARDED_CONDITION).to_owned(),
                ),
                (_, Some(guard)) => (BranchKeyword::ElseIf, guard.to_owned()),
                (_, None) => (BranchKeyword::Else, String::new()),
            };

            let body = match edge.target.and_then(|target| self.graph.node(target)) {
                Some(target) => {
                    let mut forked = visited.clone();
                    self.lower_node(target, &mut forked)
                }
                None => {
                    let mut body = Vec::new();
                    self.dangling(node, edge.id, &mut body);
                    body
                }
            };
            alternatives.push(Alternative {
                keyword,
                condition,
                body,
            });
        }

        Statement::Branch(Branch {
            label: label(&node),
            alternatives,
        })
    }

    /// Lowers a single action node without following its edges.
    fn action(&mut self, node: ControlNode<'a>) -> Statement {
        let index = self.lowering.index;
        let referenced = |reference: &Option<ElementId>| reference.and_then(|id| index.name(id));

        let action = match node.kind {
            ActivityNodeKind::CallBehavior { behavior } => {
                referenced(behavior).map(|name| Action::CallBehavior {
                    behavior: name.to_owned(),
                })
            }
            ActivityNodeKind::SendSignal { signal } => {
                referenced(signal).map(|name| Action::SendSignal {
                    signal: name.to_owned(),
                })
            }
            ActivityNodeKind::ReadAttribute { feature } => {
                referenced(feature).map(|name| Action::ReadAttribute {
                    feature: name.to_owned(),
                })
            }
            ActivityNodeKind::WriteAttribute { feature } => {
                referenced(feature).map(|name| Action::WriteAttribute {
                    feature: name.to_owned(),
                })
            }
            ActivityNodeKind::CallOperation { operation } => {
                referenced(operation).map(|name| Action::CallOperation {
                    operation: name.to_owned(),
                })
            }
            ActivityNodeKind::Opaque { bodies } => {
                return match self
                    .lowering
                    .passthrough
                    .pass_through(bodies, self.lowering.family)
                {
                    Some(lines) => Statement::Action(ActionBlock {
                        label: label(&node),
                        action: Action::Opaque { lines },
                    }),
                    None => self.placeholder(
                        &node,
                        DiagnosticCode::N103,
                        "no opaque body is usable for the target".to_owned(),
                    ),
                };
            }
            ActivityNodeKind::AcceptEvent { .. } => {
                return self.placeholder(
                    &node,
                    DiagnosticCode::N102,
                    "accept-event actions are not supported".to_owned(),
                );
            }
            ActivityNodeKind::Initial
            | ActivityNodeKind::Final
            | ActivityNodeKind::Decision
            | ActivityNodeKind::Merge => {
                return self.placeholder(
                    &node,
                    DiagnosticCode::N102,
                    format!("{} node is not an action", node.kind.label()),
                );
            }
        };

        match action {
            Some(action) => Statement::Action(ActionBlock {
                label: label(&node),
                action,
            }),
            None => self.placeholder(
                &node,
                DiagnosticCode::N101,
                format!("{} action has no target reference", node.kind.label()),
            ),
        }
    }

    /// Reports an edge whose target is not a node of the activity.
    fn dangling(&mut self, node: ControlNode<'a>, edge: ElementId, out: &mut Vec<Statement>) {
        if self.spend(&node, out) {
            out.push(self.placeholder(
                &node,
                DiagnosticCode::N104,
                format!("flow {edge} has no target in this activity"),
            ));
        }
    }

    fn placeholder(&mut self, node: &ControlNode<'a>, code: DiagnosticCode, reason: String) -> Statement {
        let label = label(node);
        let element = node.id;
        debug!(element:%, label = label.as_str(), code:%; "Lowering placeholder: {reason}");
        self.diagnostics.emit(
            Diagnostic::note(format!("`{label}`: {reason}"))
                .with_code(code)
                .with_element(node.id),
        );
        Statement::Placeholder(Placeholder { label, reason })
    }
}

fn label(node: &ControlNode<'_>) -> String {
    node.name.unwrap_or(UNNAMED).to_owned()
}
