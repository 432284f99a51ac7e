//! Graph nodes and their raw constructors.
//!
//! A node declares ordered input and output specs and carries the erased
//! [`Action`] the runner will dispatch when the node is reached. Nodes are
//! immutable once inserted into a graph.
//!
//! The constructors here are the explicit-spec surface: the host states
//! every port spec and works with type-erased [`Value`]s. Typed front-ends
//! build on top of them.

use core::fmt;
use std::sync::Arc;

use crate::port::Spec;
use crate::runner::{Action, ActionError, Continuation, Runner};
use crate::value::{Buffer, Value};

/// A single vertex of the dependency graph.
///
/// Consumer roots are nodes with an empty output list; they participate in
/// planning only as sinks.
pub struct Node {
    input: Vec<Spec>,
    output: Vec<Spec>,
    action: Arc<dyn Action>,
    label: Option<String>,
}

impl Node {
    /// Creates a node from port specs and an action.
    #[must_use]
    pub fn new(input: Vec<Spec>, output: Vec<Spec>, action: impl Action) -> Self {
        Self {
            input,
            output,
            action: Arc::new(action),
            label: None,
        }
    }

    /// A constructor node: calls `f` with the collected inputs and publishes
    /// the returned values, one per output spec, in order.
    #[must_use]
    pub fn provider<F>(input: Vec<Spec>, output: Vec<Spec>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, ActionError> + Send + Sync + 'static,
    {
        Self::new(input, output, ProvideAction { f })
    }

    /// A literal-value node: publishes a pre-bound value per output spec.
    #[must_use]
    pub fn supplier(output: Vec<Spec>, values: Vec<Value>) -> Self {
        Self::new(Vec::new(), output, SupplyAction { values })
    }

    /// A consumer root: calls `f` with the collected inputs.
    #[must_use]
    pub fn invoker<F>(input: Vec<Spec>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self::new(input, Vec::new(), InvokeAction { f })
    }

    /// A stack node: calls `f` with a [`Continuation`] and the collected
    /// inputs. `f` provides its outputs by invoking the continuation, which
    /// drains everything planned downstream before returning; code after
    /// the invocation runs once every downstream consumer has finished.
    #[must_use]
    pub fn stack<F>(input: Vec<Spec>, output: Vec<Spec>, f: F) -> Self
    where
        F: for<'r> Fn(Continuation<'r>, &[Value]) -> Result<(), ActionError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(input, output, StackAction { f })
    }

    /// Attaches a display label used in error attribution.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the ordered input specs.
    #[must_use]
    pub fn input(&self) -> &[Spec] {
        &self.input
    }

    /// Returns the ordered output specs.
    #[must_use]
    pub fn output(&self) -> &[Spec] {
        &self.output
    }

    /// Returns the display label, if one was attached.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn action(&self) -> Arc<dyn Action> {
        Arc::clone(&self.action)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("label", &self.label)
            .finish()
    }
}

struct ProvideAction<F> {
    f: F,
}

impl<F> Action for ProvideAction<F>
where
    F: Fn(&[Value]) -> Result<Vec<Value>, ActionError> + Send + Sync + 'static,
{
    fn execute(
        &self,
        _runner: &mut Runner,
        input: &[Value],
        output: &Buffer,
    ) -> Result<(), ActionError> {
        output.fill((self.f)(input)?);
        Ok(())
    }
}

struct SupplyAction {
    values: Vec<Value>,
}

impl Action for SupplyAction {
    fn execute(
        &self,
        _runner: &mut Runner,
        _input: &[Value],
        output: &Buffer,
    ) -> Result<(), ActionError> {
        output.fill(self.values.clone());
        Ok(())
    }
}

struct InvokeAction<F> {
    f: F,
}

impl<F> Action for InvokeAction<F>
where
    F: Fn(&[Value]) -> Result<(), ActionError> + Send + Sync + 'static,
{
    fn execute(
        &self,
        _runner: &mut Runner,
        input: &[Value],
        _output: &Buffer,
    ) -> Result<(), ActionError> {
        (self.f)(input)
    }
}

struct StackAction<F> {
    f: F,
}

impl<F> Action for StackAction<F>
where
    F: for<'r> Fn(Continuation<'r>, &[Value]) -> Result<(), ActionError> + Send + Sync + 'static,
{
    fn execute(
        &self,
        runner: &mut Runner,
        input: &[Value],
        output: &Buffer,
    ) -> Result<(), ActionError> {
        (self.f)(Continuation::new(runner, output.clone()), input)
    }
}
