//! Port identifiers and provision specs.
//!
//! A *port* is the point at which a value is provided to, or consumed from,
//! the container. Ports are identified by the value's type identity, an
//! optional name to distinguish same-typed ports, and a group flag marking
//! ports whose value is an ordered sequence aggregated from every provider
//! of the key.

use core::any::TypeId;
use core::fmt;

/// Identity of a provision point.
///
/// Two `PortId`s address the same provision bucket iff their type identity,
/// name and group flag are all equal. The captured type name participates
/// only in display output, never in identity (the same `TypeId` always
/// carries the same name).
///
/// # Example
///
/// ```
/// use arbor_graph::port::PortId;
///
/// struct Database;
///
/// let port = PortId::of::<Database>();
/// let replica = PortId::of::<Database>().named("replica");
/// assert_ne!(port, replica);
/// assert_ne!(port, port.grouped());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<&'static str>,
    group: bool,
}

impl PortId {
    /// Creates the port identity for a value type.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            name: None,
            group: false,
        }
    }

    /// Distinguishes this port from other ports of the same type.
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Marks this port as a group port.
    ///
    /// A group port's value is the ordered sequence of every provision of
    /// the key, aggregated in provider insertion order.
    #[must_use]
    pub fn grouped(mut self) -> Self {
        self.group = true;
        self
    }

    /// Returns the underlying type identity.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the port name, if one was set.
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// Returns `true` if this is a group port.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.group
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.name.unwrap_or(self.type_name);
        if self.group {
            write!(f, "[{label}]")
        } else {
            f.write_str(label)
        }
    }
}

/// The declared shape of one port on a graph node.
///
/// A spec pairs a [`PortId`] with a `decorate` flag. On an output the flag
/// means "this node refines an existing provision of the key"; on an input
/// it means "this node wants the value it is itself decorating" (the base
/// provision, or the previous decorator's output). The flag routes planner
/// decisions only; it is not part of port identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spec {
    /// The port this spec declares.
    pub port: PortId,
    /// Whether this spec refines an existing provision rather than creating
    /// or consuming one.
    pub decorate: bool,
}

impl Spec {
    /// Creates a plain provision/consumption spec for a port.
    #[must_use]
    pub fn provide(port: PortId) -> Self {
        Self {
            port,
            decorate: false,
        }
    }

    /// Creates a decoration spec for a port.
    #[must_use]
    pub fn decorate(port: PortId) -> Self {
        Self {
            port,
            decorate: true,
        }
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decorate {
            write!(f, "decorate {}", self.port)
        } else {
            fmt::Display::fmt(&self.port, f)
        }
    }
}
