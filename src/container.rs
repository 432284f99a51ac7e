//! The container: registration surface and run orchestration.
//!
//! A [`Container`] collects providers, suppliers, stackers and consumers,
//! then [`run`](Container::run) builds the dependency graph, plans it and
//! executes the plan. Registration is chained builder-style; related
//! registrations can be grouped into reusable [`Module`]s.
//!
//! ```
//! use arbor::container::Container;
//! use arbor::param::Dep;
//! use arbor::provision::Provision;
//!
//! struct Config { retries: u32 }
//! impl Provision for Config {}
//!
//! Container::new()
//!     .supply(Config { retries: 3 })
//!     .invoke(|config: Dep<Config>| assert_eq!(config.retries, 3))
//!     .run()
//!     .unwrap();
//! ```

use core::fmt;
use std::sync::Arc;

use arbor_graph::graph::{Graph, NodeId};
use arbor_graph::node::Node;
use arbor_graph::planner::PlanError;
use arbor_graph::port::Spec;
use arbor_graph::runner::RunError;
use parking_lot::Mutex;
use variadics_please::all_tuples;

use crate::adapters::{IntoInvoker, IntoProvider, IntoStack};
use crate::param::PortParam;
use crate::provision::Provision;

/// A run failed, either while planning or while executing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The graph could not be linearised.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A node's action failed during execution.
    #[error(transparent)]
    Run(#[from] RunError),
}

/// A reusable bundle of registrations.
///
/// Modules carry no runtime semantics of their own; installing one simply
/// applies its registrations to the container. Tuples of modules install in
/// order, so module trees compose without ceremony.
///
/// ```
/// use arbor::container::{Container, Module};
/// use arbor::provision::Provision;
///
/// struct Config { verbose: bool }
/// impl Provision for Config {}
///
/// struct ConfigModule { verbose: bool }
///
/// impl Module for ConfigModule {
///     fn install(self, container: Container) -> Container {
///         container.supply(Config { verbose: self.verbose })
///     }
/// }
///
/// let container = Container::new().install(ConfigModule { verbose: true });
/// # let _ = container;
/// ```
pub trait Module {
    /// Applies this module's registrations.
    #[must_use]
    fn install(self, container: Container) -> Container;
}

macro_rules! impl_module_tuple {
    ($(($M:ident, $m:ident)),*) => {
        impl<$($M: Module),*> Module for ($($M,)*) {
            fn install(self, container: Container) -> Container {
                let ($($m,)*) = self;
                $(let container = $m.install(container);)*
                container
            }
        }
    };
}

all_tuples!(impl_module_tuple, 1, 8, M, m);

/// A slot filled by [`Container::populate`] during a run.
///
/// Cloning a handle shares the slot; read it after `run` returns.
pub struct Handle<P> {
    slot: Arc<Mutex<Option<P>>>,
}

impl<P> Handle<P> {
    /// Creates an empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Clones the populated value out of the slot.
    #[must_use]
    pub fn get(&self) -> Option<P>
    where
        P: Clone,
    {
        self.slot.lock().clone()
    }

    /// Moves the populated value out of the slot.
    #[must_use]
    pub fn take(&self) -> Option<P> {
        self.slot.lock().take()
    }
}

impl<P> Default for Handle<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for Handle<P> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<P> fmt::Debug for Handle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("populated", &self.slot.lock().is_some())
            .finish()
    }
}

/// Collects registrations and runs the resulting dependency graph.
///
/// Consumer roots (invoke and populate registrations) are the entry points
/// of planning: only producers reachable from a root are planned, and each
/// runs exactly once. Roots execute in registration order.
#[derive(Debug, Default)]
pub struct Container {
    graph: Graph,
    roots: Vec<NodeId>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor function.
    ///
    /// Parameters declare dependencies ([`Dep<T>`](crate::param::Dep),
    /// [`Group<T>`](crate::param::Group)); the return type declares the
    /// provisions. A function returning a port it also consumes decorates
    /// that port.
    #[must_use]
    pub fn provide<M>(self, provider: impl IntoProvider<M>) -> Self {
        self.add_node(provider.into_node())
    }

    /// Registers a literal value as a provision.
    ///
    /// Accepts anything [`Provision`]: plain values, `Member(..)` group
    /// elements, or `Arc<..>` handles the host wants to keep sharing.
    #[must_use]
    pub fn supply<T: Provision>(self, value: T) -> Self {
        let label = format!("Supply({})", core::any::type_name::<T>());
        self.add_node(
            Node::supplier(vec![Spec::provide(T::port())], vec![value.into_value()])
                .with_label(label),
        )
    }

    /// Registers a scoped provider around a continuation.
    ///
    /// The function provides its outputs by invoking the continuation; every
    /// downstream consumer finishes before the invocation returns, making
    /// the code after it the natural teardown site.
    #[must_use]
    pub fn stack<M>(self, stacker: impl IntoStack<M>) -> Self {
        self.add_node(stacker.into_node())
    }

    /// Registers a consumer root.
    #[must_use]
    pub fn invoke<M>(self, consumer: impl IntoInvoker<M>) -> Self {
        self.add_node(consumer.into_node())
    }

    /// Registers a consumer root that writes its dependency into `handle`.
    #[must_use]
    pub fn populate<P>(self, handle: &Handle<P>) -> Self
    where
        P: PortParam + Send,
    {
        let slot = Arc::clone(&handle.slot);
        let label = format!("Populate({})", core::any::type_name::<P>());
        self.add_node(
            Node::invoker(vec![P::spec()], move |values| {
                *slot.lock() = Some(P::extract(&values[0]));
                Ok(())
            })
            .with_label(label),
        )
    }

    /// Applies a module's registrations.
    #[must_use]
    pub fn install(self, module: impl Module) -> Self {
        module.install(self)
    }

    /// Inserts a pre-built node; the escape hatch to the explicit-spec
    /// engine surface.
    ///
    /// Nodes without outputs are consumer roots.
    #[must_use]
    pub fn add_node(mut self, node: Node) -> Self {
        let is_root = node.output().is_empty();
        let id = self.graph.insert(node);
        if is_root {
            self.roots.push(id);
        }
        self
    }

    /// Builds the execution plan and runs it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Plan`] if a reachable dependency is missing,
    /// ambiguous or cyclic, and [`Error::Run`] if a registered function
    /// fails during execution.
    pub fn run(self) -> Result<(), Error> {
        let plan = self.graph.plan(&self.roots)?;
        plan.run()?;
        Ok(())
    }
}
