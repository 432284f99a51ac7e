//! A graph-resolving dependency injection container.
//!
//! Hosts register *providers* (constructor functions), *suppliers* (literal
//! values), *stackers* (providers wrapping a continuation, for scoped
//! teardown), *decorators* (providers refining a port they also consume)
//! and *consumers*. Running the container builds a dependency graph keyed
//! by typed ports, linearises it into an execution plan, and executes the
//! plan so every consumer receives exactly the values it declared, in an
//! order that respects dependencies, decoration and group aggregation.
//!
//! # Layers
//!
//! - `arbor_graph` — the engine: port keys, type-erased values, the graph,
//!   the planner and the runner. Works entirely in erased terms.
//! - `arbor` (this crate) — the typed surface: the [`Container`] builder,
//!   [`Module`] composition, parameter wrappers ([`Dep`], [`Group`]) and
//!   the function adapters that turn plain Rust functions into graph nodes.
//!
//! # Example
//!
//! ```
//! use arbor::prelude::*;
//!
//! struct Config { url: String }
//! impl Provision for Config {}
//!
//! struct Database { url: String }
//! impl Provision for Database {}
//!
//! Container::new()
//!     .supply(Config { url: "sqlite://demo".into() })
//!     .provide(|config: Dep<Config>| Database { url: config.url.clone() })
//!     .invoke(|db: Dep<Database>| assert_eq!(db.url, "sqlite://demo"))
//!     .run()
//!     .unwrap();
//! ```
//!
//! Groups aggregate every provision of a type, in registration order:
//!
//! ```
//! use arbor::prelude::*;
//!
//! struct Route(&'static str);
//! impl Provision for Route {}
//!
//! Container::new()
//!     .supply(Member(Route("/health")))
//!     .provide(|| Member(Route("/metrics")))
//!     .invoke(|routes: Group<Route>| {
//!         let paths: Vec<&str> = routes.iter().map(|route| route.0).collect();
//!         assert_eq!(paths, ["/health", "/metrics"]);
//!     })
//!     .run()
//!     .unwrap();
//! ```

/// Function adapters turning plain functions into graph nodes.
pub mod adapters;

/// The container builder, modules and populate handles.
pub mod container;

/// Typed parameter extraction.
pub mod param;

/// Output declarations.
pub mod provision;

pub use arbor_graph as engine;

pub use adapters::{IntoInvoker, IntoProvider, IntoStack, InvokerOutput, Next};
pub use container::{Container, Error, Handle, Module};
pub use param::{Dep, Group, PortParam};
pub use provision::{Member, Provision, ProviderOutput};

pub use arbor_graph::node::Node;
pub use arbor_graph::planner::PlanError;
pub use arbor_graph::port::{PortId, Spec};
pub use arbor_graph::runner::{ActionError, RunError};
pub use arbor_graph::value::Value;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::adapters::Next;
    pub use crate::container::{Container, Error, Handle, Module};
    pub use crate::param::{Dep, Group, PortParam};
    pub use crate::provision::{Member, Provision};
    pub use arbor_graph::node::Node;
    pub use arbor_graph::port::{PortId, Spec};
    pub use arbor_graph::runner::ActionError;
    pub use arbor_graph::value::Value;
}
