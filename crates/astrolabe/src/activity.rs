//! Activity lowering.
//!
//! Turns the control-flow graph of an activity into a tree of backend-agnostic
//! [`Statement`]s:
//!
//! ```text
//! Initial ──▶ Action ──▶ Decision ──[x > 0]──▶ Action ──▶ Final
//!                           └──────────────▶ Final
//!
//! Action
//! Branch
//!   if (x > 0)  { Action, Completion }
//!   else        { Completion }
//! ```
//!
//! Lowering is a depth-first walk from the initial node. Merge and initial
//! nodes are transparent, a decision becomes a [`Branch`], a final node a
//! [`Statement::Completion`]. Anything that cannot be lowered becomes a
//! [`Statement::Placeholder`] and a note diagnostic. Opaque action bodies are
//! passed through by a [`BodyPassthrough`] strategy.

mod graph;
mod lower;
mod passthrough;
mod statement;

pub use lower::{ActivityLowering, UNGUARDED_CONDITION};
pub use passthrough::{BodyPassthrough, HeuristicPassthrough};
pub use statement::{
    Action, ActionBlock, Alternative, BodyLine, Branch, BranchKeyword, Placeholder, Statement,
};
