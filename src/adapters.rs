//! Function adapters: plain functions and closures become graph nodes.
//!
//! A provider is any `Fn` whose parameters implement
//! [`PortParam`](crate::param::PortParam) and whose return type implements
//! [`ProviderOutput`](crate::provision::ProviderOutput); consumers return
//! `()` or `Result<(), E>`; stackers additionally take a [`Next`]
//! continuation as their first parameter. The adapters read port specs from
//! the signature, wrap the function in an erased action, and label the node
//! with the function's type name.
//!
//! # Decoration inference
//!
//! A function whose output declares a port it also consumes is a decorator
//! of that port: both specs are marked `decorate`, the function receives
//! the value it refines (the base provision, or the previous decorator's
//! output), and consumers of the port see its output instead.
//!
//! The marker type parameter on each trait exists only to keep the blanket
//! impls apart; it is always inferred.

use core::marker::PhantomData;

use arbor_graph::node::Node;
use arbor_graph::port::Spec;
use arbor_graph::runner::{ActionError, Continuation};
use arbor_graph::value::Value;
use variadics_please::all_tuples;

use crate::param::PortParam;
use crate::provision::{FallibleOut, ProviderOutput};

/// Marks every output spec whose port is also consumed as decoration,
/// along with the matching inputs.
fn infer_decoration(mut input: Vec<Spec>, mut output: Vec<Spec>) -> (Vec<Spec>, Vec<Spec>) {
    for out in &mut output {
        let mut refined = false;
        for spec in &mut input {
            if spec.port == out.port {
                spec.decorate = true;
                refined = true;
            }
        }
        if refined {
            out.decorate = true;
        }
    }
    (input, output)
}

/// The outcome of a consumer or stack function.
pub trait InvokerOutput<Marker> {
    /// Converts the outcome into the engine result.
    ///
    /// # Errors
    ///
    /// Returns the host failure of a fallible function.
    fn into_result(self) -> Result<(), ActionError>;
}

/// Marker: an infallible `()` outcome.
pub struct UnitOut;

impl InvokerOutput<UnitOut> for () {
    fn into_result(self) -> Result<(), ActionError> {
        Ok(())
    }
}

impl<E: Into<ActionError>> InvokerOutput<FallibleOut<UnitOut>> for Result<(), E> {
    fn into_result(self) -> Result<(), ActionError> {
        self.map_err(Into::into)
    }
}

/// Converts a function into a provider node.
pub trait IntoProvider<Marker> {
    /// Builds the graph node for this provider.
    fn into_node(self) -> Node;
}

/// Converts a function into a consumer root node.
pub trait IntoInvoker<Marker> {
    /// Builds the graph node for this consumer.
    fn into_node(self) -> Node;
}

/// Converts a function into a stack node.
pub trait IntoStack<Marker> {
    /// Builds the graph node for this stacker.
    fn into_node(self) -> Node;
}

/// The typed continuation a stack function receives.
///
/// Invoking it publishes the stack's outputs and runs everything downstream
/// before returning; code after the call is the teardown site. The
/// continuation is consumed by [`invoke`](Next::invoke), so it cannot be
/// invoked twice.
pub struct Next<'r, O> {
    inner: Continuation<'r>,
    _output: PhantomData<fn(O)>,
}

impl<'r, O> Next<'r, O> {
    /// Publishes the stack's output values and drains the rest of the plan.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any downstream step; propagate it after
    /// teardown.
    pub fn invoke<M>(self, output: O) -> Result<(), ActionError>
    where
        O: ProviderOutput<M>,
    {
        self.inner.invoke(output.into_values()?)
    }
}

macro_rules! impl_into_provider {
    ($(($P:ident, $p:ident)),*) => {
        impl<F, O, OM, $($P),*> IntoProvider<(OM, O, $($P,)*)> for F
        where
            F: Fn($($P),*) -> O + Send + Sync + 'static,
            O: ProviderOutput<OM>,
            $($P: PortParam,)*
        {
            fn into_node(self) -> Node {
                let input = vec![$($P::spec()),*];
                let (input, output) = infer_decoration(input, O::specs());
                let label = format!("Provide({})", core::any::type_name::<F>());
                Node::provider(input, output, move |values: &[Value]| {
                    #[allow(unused_variables, unused_mut)]
                    let mut args = values.iter();
                    $(
                        let $p = $P::extract(
                            args.next().expect("argument count mismatch (this is a bug)"),
                        );
                    )*
                    (self)($($p),*).into_values()
                })
                .with_label(label)
            }
        }
    };
}

all_tuples!(impl_into_provider, 0, 8, P, p);

macro_rules! impl_into_invoker {
    ($(($P:ident, $p:ident)),*) => {
        impl<F, R, RM, $($P),*> IntoInvoker<(RM, R, $($P,)*)> for F
        where
            F: Fn($($P),*) -> R + Send + Sync + 'static,
            R: InvokerOutput<RM>,
            $($P: PortParam,)*
        {
            fn into_node(self) -> Node {
                let input = vec![$($P::spec()),*];
                let label = format!("Invoke({})", core::any::type_name::<F>());
                Node::invoker(input, move |values: &[Value]| {
                    #[allow(unused_variables, unused_mut)]
                    let mut args = values.iter();
                    $(
                        let $p = $P::extract(
                            args.next().expect("argument count mismatch (this is a bug)"),
                        );
                    )*
                    (self)($($p),*).into_result()
                })
                .with_label(label)
            }
        }
    };
}

all_tuples!(impl_into_invoker, 0, 8, P, p);

macro_rules! impl_into_stack {
    ($(($P:ident, $p:ident)),*) => {
        impl<F, O, OM, R, RM, $($P),*> IntoStack<(OM, O, RM, R, $($P,)*)> for F
        where
            F: for<'r> Fn(Next<'r, O>, $($P),*) -> R + Send + Sync + 'static,
            O: ProviderOutput<OM>,
            R: InvokerOutput<RM>,
            $($P: PortParam,)*
        {
            fn into_node(self) -> Node {
                let input = vec![$($P::spec()),*];
                let (input, output) = infer_decoration(input, O::specs());
                let label = format!("Stack({})", core::any::type_name::<F>());
                Node::stack(input, output, move |continuation, values: &[Value]| {
                    #[allow(unused_variables, unused_mut)]
                    let mut args = values.iter();
                    $(
                        let $p = $P::extract(
                            args.next().expect("argument count mismatch (this is a bug)"),
                        );
                    )*
                    let next = Next {
                        inner: continuation,
                        _output: PhantomData,
                    };
                    (self)(next, $($p),*).into_result()
                })
                .with_label(label)
            }
        }
    };
}

all_tuples!(impl_into_stack, 0, 8, P, p);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Dep;
    use crate::provision::{Member, Provision};

    struct Seedling(u32);
    impl Provision for Seedling {}

    struct Soil;
    impl Provision for Soil {}

    #[test]
    fn provider_specs_come_from_the_signature() {
        let node = IntoProvider::into_node(|_soil: Dep<Soil>| Seedling(1));
        assert_eq!(node.input().len(), 1);
        assert_eq!(node.input()[0].port, Soil::port());
        assert_eq!(node.output().len(), 1);
        assert_eq!(node.output()[0].port, Seedling::port());
        assert!(node.label().unwrap().starts_with("Provide("));
    }

    #[test]
    fn same_port_on_both_sides_is_inferred_as_decoration() {
        let node = IntoProvider::into_node(|seedling: Dep<Seedling>, _soil: Dep<Soil>| {
            (Seedling(seedling.0 + 1), Member(Soil))
        });

        // The seedling specs decorate; the unrelated input and the group
        // member output do not.
        assert!(node.input()[0].decorate);
        assert!(!node.input()[1].decorate);
        assert!(node.output()[0].decorate);
        assert!(!node.output()[1].decorate);
    }

    #[test]
    fn invokers_are_consumer_roots() {
        let node = IntoInvoker::into_node(|_seedling: Dep<Seedling>| ());
        assert!(node.output().is_empty());
        assert!(node.label().unwrap().starts_with("Invoke("));
    }

    #[test]
    fn stack_outputs_come_from_the_continuation_type() {
        fn scoped(next: Next<'_, Seedling>) -> Result<(), ActionError> {
            next.invoke(Seedling(1))
        }

        let node = IntoStack::into_node(scoped);
        assert!(node.input().is_empty());
        assert_eq!(node.output().len(), 1);
        assert_eq!(node.output()[0].port, Seedling::port());
        assert!(node.label().unwrap().starts_with("Stack("));
    }
}
