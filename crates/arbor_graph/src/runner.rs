//! Plan execution.
//!
//! The [`Runner`] consumes an execution plan front to back. Plumbing steps
//! (collect-param, collect-group) copy values between buffers and cannot
//! fail; user-action steps hand control to the host through the [`Action`]
//! trait. A stack action receives a [`Continuation`] which, when invoked,
//! drains the remainder of the queue before returning, so everything
//! planned after the stack node finishes before the stack's own teardown
//! runs, and nested stacks tear down in LIFO order.

use core::fmt;
use std::collections::VecDeque;

use crate::plan::{Plan, Step};
use crate::value::{Buffer, Value};

/// Failure value produced by a host action.
pub type ActionError = Box<dyn core::error::Error + Send + Sync>;

/// The capability interface the engine consumes from hosts.
///
/// One action is attached to every graph node. The runner calls
/// [`execute`](Action::execute) with the node's collected input values and
/// its pre-sized output buffer; the action must write every output slot
/// before returning success.
///
/// The `runner` handle exists for stack actions, whose continuation drains
/// the remaining queue re-entrantly. Ordinary providers and consumers can
/// ignore it.
pub trait Action: Send + Sync + 'static {
    /// Executes the node's behaviour.
    ///
    /// # Errors
    ///
    /// Returns the host's failure value; the runner stops and surfaces it
    /// tagged with the node's display name.
    fn execute(
        &self,
        runner: &mut Runner,
        input: &[Value],
        output: &Buffer,
    ) -> Result<(), ActionError>;
}

/// Error produced when a user-action step fails.
///
/// Carries the display name of the node whose action failed. When the
/// failure happened downstream of a stack continuation, the inner error is
/// itself a `RunError`, one wrapper per stack frame.
#[derive(Debug)]
pub struct RunError {
    node: String,
    source: ActionError,
}

impl RunError {
    /// Returns the display name of the failing node.
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Consumes the error, returning the host's failure value.
    #[must_use]
    pub fn into_source(self) -> ActionError {
        self.source
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node '{}' execute error: {}", self.node, self.source)
    }
}

impl core::error::Error for RunError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Executes the steps of a plan in order.
///
/// Hosts never construct a `Runner`; they receive one through
/// [`Action::execute`] and, for stack nodes, re-enter it through
/// [`Continuation::invoke`].
pub struct Runner {
    pending: VecDeque<Step>,
}

impl Runner {
    pub(crate) fn new(plan: Plan) -> Self {
        Self {
            pending: plan.steps.into(),
        }
    }

    /// Drains the pending queue, executing each step in order.
    pub(crate) fn run(&mut self) -> Result<(), RunError> {
        while let Some(step) = self.pending.pop_front() {
            match step {
                Step::CollectParam(step) => step.execute(),
                Step::CollectGroup(step) => step.execute(),
                Step::UserAction(step) => {
                    tracing::trace!(node = %step.label, "executing node action");
                    let input = step.params.snapshot();
                    if let Err(source) = step.action.execute(self, &input, &step.result) {
                        tracing::debug!(node = %step.label, error = %source, "node action failed");
                        return Err(RunError {
                            node: step.label,
                            source,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// The continuation handed to a stack action.
///
/// Invoking it publishes the stack node's output values and then drains
/// every remaining step of the plan: all downstream consumers run to
/// completion before `invoke` returns. Code after the call is the natural
/// site for scoped teardown. `invoke` consumes the continuation, so a
/// second invocation does not compile.
pub struct Continuation<'r> {
    runner: &'r mut Runner,
    output: Buffer,
}

impl<'r> Continuation<'r> {
    pub(crate) fn new(runner: &'r mut Runner, output: Buffer) -> Self {
        Self { runner, output }
    }

    /// Publishes the stack node's outputs and runs everything downstream.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any downstream step; the stack action
    /// normally propagates it after performing its own teardown.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not match the stack node's declared outputs.
    pub fn invoke(self, values: Vec<Value>) -> Result<(), ActionError> {
        self.output.fill(values);
        self.runner.run().map_err(|err| Box::new(err) as ActionError)
    }
}

impl fmt::Debug for Continuation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("outputs", &self.output.len())
            .finish()
    }
}
