//! Type-erased values and the shared buffers that carry them through a run.
//!
//! Buffers hold values of differing types indexed positionally. The engine
//! only ever addresses them by `(buffer, index)`; typed access is the
//! responsibility of the host layer that declared the ports.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// A clonable, type-erased handle to a value flowing through the container.
///
/// Cloning a `Value` bumps a reference count; the underlying value is shared
/// between every consumer that collects it. Group ports carry their
/// aggregated sequence as a `Value` wrapping `Vec<Value>`.
///
/// # Example
///
/// ```
/// use arbor_graph::value::Value;
///
/// let value = Value::new(42_u32);
/// assert_eq!(value.downcast_ref::<u32>(), Some(&42));
/// assert!(value.downcast_ref::<i64>().is_none());
/// ```
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wraps a value into an erased handle.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Wraps an already-shared value without another allocation.
    ///
    /// The handle's dynamic type is `T`, not `Arc<T>`, so consumers of the
    /// port downcast exactly as they would for [`Value::new`].
    #[must_use]
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Wraps an ordered sequence, the carrier for group port aggregates.
    #[must_use]
    pub fn sequence(values: Vec<Value>) -> Self {
        Self::new(values)
    }

    /// Returns a shared handle to the value if it is a `T`.
    #[must_use]
    pub fn downcast_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Returns a reference to the value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns the aggregated sequence if this value carries one.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Value]> {
        self.downcast_ref::<Vec<Value>>().map(Vec::as_slice)
    }

    /// Returns the name of the wrapped type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.type_name).finish()
    }
}

/// A positionally-addressed buffer of slots shared between plan steps.
///
/// One buffer backs each node's inputs, each node's outputs and each group
/// aggregate. Buffers are allocated by the planner and written exactly once
/// per slot during a run; the plan's step order guarantees every read
/// happens after the corresponding write.
#[derive(Clone)]
pub struct Buffer {
    slots: Arc<Mutex<Vec<Option<Value>>>>,
}

impl Buffer {
    /// Allocates a buffer with `len` empty slots.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(vec![None; len])),
        }
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns `true` if the buffer has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Writes one slot.
    pub fn set(&self, index: usize, value: Value) {
        self.slots.lock()[index] = Some(value);
    }

    /// Reads one slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot has not been written yet. The planner orders every
    /// write before its reads, so an empty slot means an action violated its
    /// contract to write all outputs before returning success.
    #[must_use]
    pub fn get(&self, index: usize) -> Value {
        self.slots.lock()[index]
            .clone()
            .expect("buffer slot read before it was written (this is a bug)")
    }

    /// Writes every slot from an ordered list of values.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not match the buffer's slot count.
    pub fn fill(&self, values: Vec<Value>) {
        let mut slots = self.slots.lock();
        assert_eq!(
            values.len(),
            slots.len(),
            "action produced {} values for {} output ports",
            values.len(),
            slots.len(),
        );
        for (slot, value) in slots.iter_mut().zip(values) {
            *slot = Some(value);
        }
    }

    /// Reads every slot into an ordered list.
    ///
    /// # Panics
    ///
    /// Panics if any slot is unwritten, as for [`Buffer::get`].
    #[must_use]
    pub fn snapshot(&self) -> Vec<Value> {
        self.slots
            .lock()
            .iter()
            .map(|slot| {
                slot.clone()
                    .expect("buffer slot read before it was written (this is a bug)")
            })
            .collect()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();
        let written = slots.iter().filter(|slot| slot.is_some()).count();
        f.debug_struct("Buffer")
            .field("len", &slots.len())
            .field("written", &written)
            .finish()
    }
}

/// Identifies where a value will live when the plan runs.
#[derive(Debug, Clone)]
pub struct Collect {
    /// The buffer holding the value.
    pub buffer: Buffer,
    /// The slot within the buffer.
    pub index: usize,
}

impl Collect {
    /// Reads the value this descriptor points at.
    #[must_use]
    pub fn collect(&self) -> Value {
        self.buffer.get(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Payload {
        id: u64,
    }

    #[test]
    fn downcast_roundtrip() {
        let value = Value::new(Payload { id: 9 });
        assert_eq!(value.downcast_ref::<Payload>(), Some(&Payload { id: 9 }));
        assert!(value.downcast_ref::<u64>().is_none());
        assert!(value.type_name().ends_with("Payload"));
    }

    #[test]
    fn from_arc_shares_the_allocation() {
        let shared = Arc::new(Payload { id: 4 });
        let value = Value::from_arc(Arc::clone(&shared));

        let roundtrip = value.downcast_arc::<Payload>().unwrap();
        assert!(Arc::ptr_eq(&shared, &roundtrip));
    }

    #[test]
    fn sequence_roundtrip() {
        let seq = Value::sequence(vec![Value::new(1_u8), Value::new(2_u8)]);
        let items = seq.as_sequence().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].downcast_ref::<u8>(), Some(&2));
        assert!(Value::new(1_u8).as_sequence().is_none());
    }

    #[test]
    fn buffer_set_get_and_snapshot() {
        let buffer = Buffer::new(2);
        assert_eq!(buffer.len(), 2);
        buffer.set(0, Value::new("a"));
        buffer.set(1, Value::new("b"));

        let collect = Collect {
            buffer: buffer.clone(),
            index: 1,
        };
        assert_eq!(collect.collect().downcast_ref::<&str>(), Some(&"b"));
        assert_eq!(buffer.snapshot().len(), 2);
    }

    #[test]
    #[should_panic(expected = "read before it was written")]
    fn reading_an_unwritten_slot_panics() {
        let buffer = Buffer::new(1);
        let _ = buffer.get(0);
    }

    #[test]
    #[should_panic(expected = "values for")]
    fn fill_checks_arity() {
        let buffer = Buffer::new(2);
        buffer.fill(vec![Value::new(1_u8)]);
    }
}
