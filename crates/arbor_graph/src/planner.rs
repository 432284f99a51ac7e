//! The planner: topological linearisation of the dependency graph.
//!
//! Planning walks the graph depth-first from each consumer root, emitting
//! plan steps as producers are discovered and allocating the shared buffers
//! the steps are bound to. The walk honours three orderings:
//!
//! - providers run before their consumers (topological order);
//! - a group port aggregates its providers in graph insertion order;
//! - decorators of a key apply in insertion order, and consumers see the
//!   last decorator's output.
//!
//! Each node's inputs are resolved in two passes: first every input is
//! *base-collected* (locating the undecorated provision and, where a
//! decorator exists for the key, seeding the in-progress decoration chain
//! with it), then every input is *final-collected* (routing decorator
//! inputs to the value they refine and ordinary inputs to the fully
//! decorated view). The passes are structural, not an optimisation: the
//! chain seed must exist before any input of the same node resolves the
//! decorated view. Merging them would change the observable wiring.

use hashbrown::{HashMap, HashSet};

use crate::graph::{Graph, NodeId};
use crate::plan::{CollectGroupStep, CollectParamStep, Plan, Step, UserActionStep};
use crate::port::{PortId, Spec};
use crate::value::{Buffer, Collect};

/// Errors detected while planning.
///
/// Planning aborts on the first error. Errors discovered below a node are
/// wrapped in [`PlanError::Dependency`] once per node on the path from the
/// consumer root, preserving the chain that led to the failing port.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// A consumed singleton port has no provider.
    #[error("port {port} missing dependency")]
    MissingDependency {
        /// The unsatisfied port.
        port: PortId,
    },

    /// A consumed singleton port has more than one provider.
    #[error("port {port} ambiguous dependency ({count} providers)")]
    AmbiguousDependency {
        /// The over-satisfied port.
        port: PortId,
        /// How many providers were recorded for it.
        count: usize,
    },

    /// The depth-first schedule reached a node already on its own stack.
    #[error("cyclic dependency on node '{node}'")]
    CyclicDependency {
        /// Display name of the node closing the cycle.
        node: String,
    },

    /// Attributes a nested failure to the node whose inputs required it.
    #[error("node '{node}' dependency error: {source}")]
    Dependency {
        /// Display name of the node being planned.
        node: String,
        /// The underlying failure.
        #[source]
        source: Box<PlanError>,
    },
}

impl PlanError {
    /// Unwraps the dependency chain down to the originating error.
    #[must_use]
    pub fn root_cause(&self) -> &PlanError {
        let mut current = self;
        while let PlanError::Dependency { source, .. } = current {
            current = source;
        }
        current
    }
}

pub(crate) fn plan(graph: &Graph, roots: &[NodeId]) -> Result<Plan, PlanError> {
    tracing::debug!(nodes = graph.len(), roots = roots.len(), "planning execution order");
    let mut planner = Planner::new(graph);
    for &root in roots {
        planner.schedule(root)?;
    }
    let plan = Plan {
        steps: planner.steps,
    };
    tracing::debug!(steps = plan.len(), "execution plan ready");
    Ok(plan)
}

/// Working state of one planning pass.
struct Planner<'g> {
    graph: &'g Graph,
    /// Output buffer of every node scheduled so far.
    outputs: HashMap<NodeId, Buffer>,
    /// Aggregation buffer of every group key scheduled so far.
    grouped: HashMap<PortId, Buffer>,
    /// Final collect of a fully decorated key, usable by consumers.
    decorated: HashMap<PortId, Collect>,
    /// Current collect while a key's decorator chain is being built; this is
    /// what the next decorator in the chain consumes.
    decorating: HashMap<PortId, Collect>,
    /// Nodes on the depth-first stack, for cycle detection.
    pending: HashSet<NodeId>,
    /// The accumulated plan.
    steps: Vec<Step>,
}

impl<'g> Planner<'g> {
    fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            outputs: HashMap::new(),
            grouped: HashMap::new(),
            decorated: HashMap::new(),
            decorating: HashMap::new(),
            pending: HashSet::new(),
            steps: Vec::new(),
        }
    }

    /// Schedules a node, returning its output buffer.
    ///
    /// Idempotent: a node already scheduled returns its recorded buffer, so
    /// no node is ever planned (or executed) twice. A node found on its own
    /// depth-first stack is a cycle.
    fn schedule(&mut self, id: NodeId) -> Result<Buffer, PlanError> {
        if let Some(buffer) = self.outputs.get(&id) {
            return Ok(buffer.clone());
        }
        if self.pending.contains(&id) {
            return Err(PlanError::CyclicDependency {
                node: self.graph.display(id),
            });
        }

        tracing::trace!(node = %self.graph.display(id), "scheduling node");
        self.pending.insert(id);
        let result = self.plan_node(id);
        self.pending.remove(&id);

        let buffer = result?;
        self.outputs.insert(id, buffer.clone());
        Ok(buffer)
    }

    /// Resolves a node's inputs (two passes), then emits its collect-param
    /// and user-action steps.
    fn plan_node(&mut self, id: NodeId) -> Result<Buffer, PlanError> {
        let node = self.graph.node(id);
        let input: Vec<Spec> = node.input().to_vec();
        let label = self.graph.display(id);

        // Pass one: base-collect every input, seeding decoration chains.
        for spec in &input {
            self.base_collect(spec.port).map_err(|source| PlanError::Dependency {
                node: label.clone(),
                source: Box::new(source),
            })?;
        }

        // Pass two: final-collect every input into the param step.
        let mut items = Vec::with_capacity(input.len());
        for spec in &input {
            let collect = self.final_collect(*spec).map_err(|source| PlanError::Dependency {
                node: label.clone(),
                source: Box::new(source),
            })?;
            items.push(collect);
        }

        let params = Buffer::new(input.len());
        self.steps.push(Step::CollectParam(CollectParamStep {
            items,
            result: params.clone(),
        }));

        let result = Buffer::new(self.graph.node(id).output().len());
        self.steps.push(Step::UserAction(UserActionStep {
            params,
            result: result.clone(),
            action: self.graph.node(id).action(),
            label,
        }));
        Ok(result)
    }

    /// Locates the undecorated provision of a key.
    ///
    /// If the key has decorators and no chain is recorded for it yet, the
    /// base collect also seeds `decorating`, the value the first decorator
    /// of the key will consume.
    fn base_collect(&mut self, port: PortId) -> Result<Collect, PlanError> {
        let base = if port.is_group() {
            self.collect_grouped(port)?
        } else {
            self.collect_single(port)?
        };

        if !self.graph.decorators(&port).is_empty()
            && !self.decorated.contains_key(&port)
            && !self.decorating.contains_key(&port)
        {
            self.decorating.insert(port, base.clone());
        }
        Ok(base)
    }

    /// Resolves one input spec to the collect its step will read.
    fn final_collect(&mut self, spec: Spec) -> Result<Collect, PlanError> {
        let port = spec.port;
        let base = self.base_collect(port)?;

        // A decorator's own input takes the value it is refining: the base
        // provision, or the previous decorator's output.
        if spec.decorate {
            return Ok(self
                .decorating
                .get(&port)
                .expect("decorator input resolved before its chain was seeded (this is a bug)")
                .clone());
        }

        let decorators = self.graph.decorators(&port);
        if decorators.is_empty() {
            return Ok(base);
        }
        if let Some(decorated) = self.decorated.get(&port) {
            return Ok(decorated.clone());
        }

        // Chain the decorators in insertion order; each one consumes the
        // collect recorded by its predecessor.
        for slot in decorators {
            let buffer = self.schedule(slot.id)?;
            self.decorating.insert(
                port,
                Collect {
                    buffer,
                    index: slot.index,
                },
            );
        }
        let result = self
            .decorating
            .remove(&port)
            .expect("decorator chain vanished while being built (this is a bug)");
        self.decorated.insert(port, result.clone());
        Ok(result)
    }

    /// Resolves a singleton key to its unique provider's output slot.
    fn collect_single(&mut self, port: PortId) -> Result<Collect, PlanError> {
        let slots = self.graph.providers(&port);
        match slots {
            [] => Err(PlanError::MissingDependency { port }),
            [slot] => {
                let slot = *slot;
                let buffer = self.schedule(slot.id)?;
                Ok(Collect {
                    buffer,
                    index: slot.index,
                })
            }
            _ => Err(PlanError::AmbiguousDependency {
                port,
                count: slots.len(),
            }),
        }
    }

    /// Resolves a group key, scheduling every provider and emitting the
    /// aggregation step that collects them in insertion order.
    fn collect_grouped(&mut self, port: PortId) -> Result<Collect, PlanError> {
        if let Some(buffer) = self.grouped.get(&port) {
            return Ok(Collect {
                buffer: buffer.clone(),
                index: 0,
            });
        }

        let result = Buffer::new(1);
        let mut items = Vec::new();
        for slot in self.graph.providers(&port) {
            let buffer = self.schedule(slot.id)?;
            items.push(Collect {
                buffer,
                index: slot.index,
            });
        }
        self.steps.push(Step::CollectGroup(CollectGroupStep {
            items,
            result: result.clone(),
        }));
        self.grouped.insert(port, result.clone());
        Ok(Collect {
            buffer: result,
            index: 0,
        })
    }
}
