//! Output declarations: what a provider contributes to the container.
//!
//! Hosts opt their types in with a one-line marker impl:
//!
//! ```
//! use arbor::provision::Provision;
//!
//! struct Database;
//! impl Provision for Database {}
//! ```
//!
//! The marker gives the type a singleton port derived from its type
//! identity. Wrappers refine the declaration: [`Member`] contributes one
//! element of the type's group port, `Arc<T>` provides the plain port from
//! an already-shared handle, and [`Group`](crate::param::Group) as an output
//! replaces a group's aggregated sequence (the decorator form).
//!
//! Do not implement `Provision` for tuples or `Result`: provider functions
//! use tuples to declare several outputs and `Result` to declare
//! fallibility, and the adapters rely on those shapes staying free.

use core::marker::PhantomData;
use std::sync::Arc;

use arbor_graph::port::{PortId, Spec};
use arbor_graph::runner::ActionError;
use arbor_graph::value::Value;
use variadics_please::all_tuples;

use crate::param::Group;

/// A type that can be provided through the container.
///
/// The default methods derive a singleton port from the implementing type.
/// Override [`port`](Provision::port) to name the port when several
/// same-typed ports must coexist.
pub trait Provision: Sized + Send + Sync + 'static {
    /// The port this type provides.
    #[must_use]
    fn port() -> PortId {
        PortId::of::<Self>()
    }

    /// Erases the value for the engine.
    #[must_use]
    fn into_value(self) -> Value {
        Value::new(self)
    }
}

/// A shared handle provides the inner type's port.
///
/// This is what a decorator returns when it refines a value in place, and
/// what a supplier uses to keep a handle on the value it supplied.
impl<T: Provision> Provision for Arc<T> {
    fn port() -> PortId {
        T::port()
    }

    fn into_value(self) -> Value {
        Value::from_arc(self)
    }
}

/// Declares one element of `T`'s group port.
///
/// Every `Member<T>` output across the graph is aggregated, in provider
/// insertion order, into the ordered sequence a
/// [`Group<T>`](crate::param::Group) parameter consumes.
///
/// A function that consumes `Group<T>` and also outputs the same group is a
/// group decorator and must declare its output as `Group<T>` (the whole
/// sequence), not `Member<T>`.
pub struct Member<T: Provision>(pub T);

impl<T: Provision> Provision for Member<T> {
    fn port() -> PortId {
        T::port().grouped()
    }

    fn into_value(self) -> Value {
        self.0.into_value()
    }
}

/// A decorated group output: replaces the aggregated sequence consumers see.
impl<T: Provision> Provision for Group<T> {
    fn port() -> PortId {
        T::port().grouped()
    }

    fn into_value(self) -> Value {
        Value::sequence(self.into_inner().into_iter().map(Value::from_arc).collect())
    }
}

/// The full output declaration of a provider function.
///
/// Implemented for a lone [`Provision`], for tuples of provisions (several
/// outputs), and for `Result`s of either (a fallible provider). The marker
/// parameter distinguishes the shapes so the compiler can pick exactly one
/// impl from a function's return type.
pub trait ProviderOutput<Marker> {
    /// The ordered output specs this declaration contributes.
    fn specs() -> Vec<Spec>;

    /// Converts the produced value(s) into the engine representation.
    ///
    /// # Errors
    ///
    /// Returns the host failure of a fallible provider.
    fn into_values(self) -> Result<Vec<Value>, ActionError>;
}

/// Marker: a single provision.
pub struct SingleOut;

/// Marker: a tuple of provisions.
pub struct TupleOut;

/// Marker: a fallible declaration wrapping another shape.
pub struct FallibleOut<Marker>(PhantomData<Marker>);

impl<T: Provision> ProviderOutput<SingleOut> for T {
    fn specs() -> Vec<Spec> {
        vec![Spec::provide(T::port())]
    }

    fn into_values(self) -> Result<Vec<Value>, ActionError> {
        Ok(vec![self.into_value()])
    }
}

macro_rules! impl_provider_output_tuple {
    ($(($O:ident, $o:ident)),*) => {
        impl<$($O: Provision),*> ProviderOutput<TupleOut> for ($($O,)*) {
            fn specs() -> Vec<Spec> {
                vec![$(Spec::provide($O::port())),*]
            }

            fn into_values(self) -> Result<Vec<Value>, ActionError> {
                let ($($o,)*) = self;
                Ok(vec![$($o.into_value()),*])
            }
        }
    };
}

all_tuples!(impl_provider_output_tuple, 1, 8, O, o);

impl<T, E, M> ProviderOutput<FallibleOut<M>> for Result<T, E>
where
    T: ProviderOutput<M>,
    E: Into<ActionError>,
{
    fn specs() -> Vec<Spec> {
        T::specs()
    }

    fn into_values(self) -> Result<Vec<Value>, ActionError> {
        self.map_err(Into::into)?.into_values()
    }
}
