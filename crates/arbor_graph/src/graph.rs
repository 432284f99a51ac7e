//! The dependency graph.
//!
//! An append-only collection of [`Node`]s plus two indices from port key to
//! the output slots that can satisfy the key: `provide` for plain
//! provisions and `decorate` for refining provisions. The graph is frozen
//! once planning begins; nothing is ever removed, reordered or deduplicated.
//! Duplicate provisions of a singleton key are legal here and only become an
//! error when the key is actually consumed as a singleton.

use core::fmt;

use hashbrown::HashMap;

use crate::node::Node;
use crate::planner::{self, PlanError};
use crate::plan::Plan;
use crate::port::PortId;

/// Identifier of a node within one graph.
///
/// Ids are dense and monotonic: the first inserted node is `0`, the next
/// `1`, and so on. They double as the display fallback for unlabelled nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the id's position in insertion order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Addresses one output of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSlot {
    /// The producing node.
    pub id: NodeId,
    /// The position within that node's output specs.
    pub index: usize,
}

/// The dependency graph.
///
/// # Example
///
/// ```
/// use arbor_graph::graph::Graph;
/// use arbor_graph::node::Node;
/// use arbor_graph::port::{PortId, Spec};
/// use arbor_graph::value::Value;
///
/// let mut graph = Graph::new();
/// let supplier = graph.insert(Node::supplier(
///     vec![Spec::provide(PortId::of::<u32>())],
///     vec![Value::new(7_u32)],
/// ));
/// let root = graph.insert(Node::invoker(
///     vec![Spec::provide(PortId::of::<u32>())],
///     |values| {
///         assert_eq!(values[0].downcast_ref::<u32>(), Some(&7));
///         Ok(())
///     },
/// ));
///
/// assert_eq!(supplier.index(), 0);
/// let plan = graph.plan(&[root]).unwrap();
/// plan.run().unwrap();
/// ```
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,
    provide: HashMap<PortId, Vec<OutputSlot>>,
    decorate: HashMap<PortId, Vec<OutputSlot>>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, assigning it the next dense id and routing each of
    /// its output slots into the provide or decorate index by port key.
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        for (index, spec) in node.output().iter().enumerate() {
            let slot = OutputSlot { id, index };
            if spec.decorate {
                self.decorate.entry(spec.port).or_default().push(slot);
            } else {
                self.provide.entry(spec.port).or_default().push(slot);
            }
        }
        self.nodes.push(node);
        id
    }

    /// Produces the execution plan for the given consumer roots.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] if any reachable dependency is missing,
    /// ambiguous or cyclic.
    pub fn plan(&self, roots: &[NodeId]) -> Result<Plan, PlanError> {
        planner::plan(self, roots)
    }

    /// Returns the node with the given id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the display name of a node: its label, or `#<id>`.
    #[must_use]
    pub fn display(&self, id: NodeId) -> String {
        match self.nodes[id.0].label() {
            Some(label) => label.to_owned(),
            None => id.to_string(),
        }
    }

    /// Returns the plain provisions recorded for a key, in insertion order.
    #[must_use]
    pub fn providers(&self, port: &PortId) -> &[OutputSlot] {
        self.provide.get(port).map_or(&[], Vec::as_slice)
    }

    /// Returns the decorations recorded for a key, in insertion order.
    #[must_use]
    pub fn decorators(&self, port: &PortId) -> &[OutputSlot] {
        self.decorate.get(port).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("provide_keys", &self.provide.len())
            .field("decorate_keys", &self.decorate.len())
            .finish()
    }
}
