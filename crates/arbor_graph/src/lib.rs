//! Graph-resolution engine for the arbor dependency injection container.
//!
//! `arbor_graph` is the generic core: it knows nothing about host functions
//! or concrete types, only about *ports* (typed provision points), *nodes*
//! (actions with declared input and output ports) and the ordering rules
//! between them. The typed front-end lives in the `arbor` crate.
//!
//! # Core Concepts
//!
//! - [`PortId`] / [`Spec`] - typed provision points and their declarations
//! - [`Value`] / [`Buffer`] - type-erased values and the shared buffers
//!   carrying them through a run
//! - [`Node`] / [`Graph`] - the dependency graph
//! - [`Plan`] - the flat execution schedule produced by planning
//! - [`Runner`] / [`Continuation`] - plan execution and stack re-entry
//!
//! # Pipeline
//!
//! A run has three phases. Insertion populates the graph and its
//! provide/decorate indices. Planning walks the graph depth-first from each
//! consumer root and linearises it into a [`Plan`], detecting missing,
//! ambiguous and cyclic dependencies along the way. Execution drains the
//! plan front to back, dispatching each node's action exactly once.
//!
//! Scheduling is single-threaded and cooperative: steps fire strictly in
//! order, and the only re-entry point is a stack node's [`Continuation`],
//! which drains the remainder of the plan before the stack's own teardown
//! runs.
//!
//! # Example
//!
//! ```
//! use arbor_graph::graph::Graph;
//! use arbor_graph::node::Node;
//! use arbor_graph::port::{PortId, Spec};
//! use arbor_graph::value::Value;
//!
//! struct Greeting(String);
//!
//! let port = PortId::of::<Greeting>();
//! let mut graph = Graph::new();
//! graph.insert(Node::supplier(
//!     vec![Spec::provide(port)],
//!     vec![Value::new(Greeting("hello".into()))],
//! ));
//! let root = graph.insert(Node::invoker(vec![Spec::provide(port)], |values| {
//!     assert_eq!(values[0].downcast_ref::<Greeting>().unwrap().0, "hello");
//!     Ok(())
//! }));
//!
//! graph.plan(&[root]).unwrap().run().unwrap();
//! ```

/// The dependency graph and node identifiers.
pub mod graph;

/// Graph nodes and their raw constructors.
pub mod node;

/// The execution plan and its step taxonomy.
pub mod plan;

/// The planner: topological linearisation with decoration and groups.
pub mod planner;

/// Port identifiers and provision specs.
pub mod port;

/// Plan execution, the action interface and stack continuations.
pub mod runner;

/// Type-erased values and shared buffers.
pub mod value;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::graph::{Graph, NodeId, OutputSlot};
    pub use crate::node::Node;
    pub use crate::plan::{Plan, Step};
    pub use crate::planner::PlanError;
    pub use crate::port::{PortId, Spec};
    pub use crate::runner::{Action, ActionError, Continuation, RunError, Runner};
    pub use crate::value::{Buffer, Collect, Value};
}

pub use graph::{Graph, NodeId};
pub use node::Node;
pub use plan::Plan;
pub use planner::PlanError;
pub use port::{PortId, Spec};
pub use runner::{Action, ActionError, Continuation, RunError, Runner};
pub use value::{Buffer, Value};
