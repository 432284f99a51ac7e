//! The execution plan.
//!
//! A plan is the flat, ordered step list the planner emits. Every step
//! carries pre-bound buffer references, so running a plan performs no
//! lookups: plumbing steps copy values between buffers, user-action steps
//! dispatch to the host.

use core::fmt;
use std::sync::Arc;

use crate::runner::{Action, RunError, Runner};
use crate::value::{Buffer, Collect, Value};

/// One step of an execution plan.
#[derive(Debug)]
pub enum Step {
    /// Copies each source value into a node's input buffer, positionally.
    CollectParam(CollectParamStep),
    /// Aggregates each source value, as a single element, into a group
    /// sequence.
    CollectGroup(CollectGroupStep),
    /// Hands control to the host action bound to a node.
    UserAction(UserActionStep),
}

/// Populates a node's input buffer from collected sources.
#[derive(Debug)]
pub struct CollectParamStep {
    pub(crate) items: Vec<Collect>,
    pub(crate) result: Buffer,
}

impl CollectParamStep {
    pub(crate) fn execute(&self) {
        for (index, item) in self.items.iter().enumerate() {
            self.result.set(index, item.collect());
        }
    }
}

/// Builds a group port's aggregate sequence.
///
/// Each source slot contributes exactly one element; elements appear in the
/// order their providers were inserted into the graph.
#[derive(Debug)]
pub struct CollectGroupStep {
    pub(crate) items: Vec<Collect>,
    pub(crate) result: Buffer,
}

impl CollectGroupStep {
    pub(crate) fn execute(&self) {
        let sequence: Vec<Value> = self.items.iter().map(Collect::collect).collect();
        self.result.set(0, Value::sequence(sequence));
    }
}

/// Dispatches a node's action with its bound input and output buffers.
pub struct UserActionStep {
    pub(crate) params: Buffer,
    pub(crate) result: Buffer,
    pub(crate) action: Arc<dyn Action>,
    pub(crate) label: String,
}

impl fmt::Debug for UserActionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserActionStep")
            .field("label", &self.label)
            .field("inputs", &self.params.len())
            .field("outputs", &self.result.len())
            .finish()
    }
}

/// The ordered step sequence produced by the planner.
///
/// Running a plan consumes it; graphs, plans and their buffers all live for
/// a single run.
#[derive(Debug, Default)]
pub struct Plan {
    pub(crate) steps: Vec<Step>,
}

impl Plan {
    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the plan has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Executes the plan to completion.
    ///
    /// # Errors
    ///
    /// Returns the first action failure, tagged with the failing node's
    /// display name. Side effects of actions that already ran are
    /// observable; nothing is retried.
    pub fn run(self) -> Result<(), RunError> {
        Runner::new(self).run()
    }
}
