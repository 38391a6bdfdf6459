//! Adder over one atomic value.

use std::fmt::{self, Debug};

use crate::adders::Adder;
use crate::cell::Cell;
use crate::value::Value;

/// An adder holding its total in a single padded atomic.
///
/// Every update is a compare-and-swap loop on the same cache line, so it is
/// only competitive while contention stays low.
///
/// # Examples
///
/// ```rust
/// use sommatori::adders::{Adder, AtomicAdder};
///
/// let adder = AtomicAdder::<i64>::new();
/// adder.add(7);
/// adder.dec();
/// assert_eq!(adder.sum(), 6);
/// ```
pub struct AtomicAdder<V: Value = i64> {
    name: &'static str,
    value: Cell<V>,
}

impl<V: Value> AtomicAdder<V> {
    /// Creates a new adder with a zero total.
    pub fn new() -> Self {
        AtomicAdder {
            name: "",
            value: Cell::default(),
        }
    }

    /// Sets the name of this adder, returning `self` for method chaining.
    pub const fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<V: Value> Adder<V> for AtomicAdder<V> {
    #[inline]
    fn name(&self) -> &str {
        self.name
    }

    #[inline]
    fn add(&self, delta: V) {
        let mut current = self.value.load();
        while !self.value.compare_and_swap(current, current.combine(delta)) {
            current = self.value.load();
        }
    }

    #[inline]
    fn sum(&self) -> V {
        self.value.load()
    }

    #[inline]
    fn reset(&self) {
        self.value.store(V::ZERO);
    }

    #[inline]
    fn sum_and_reset(&self) -> V {
        self.value.swap(V::ZERO)
    }

    #[inline]
    fn store(&self, value: V) {
        self.value.store(value);
    }
}

impl<V: Value> Default for AtomicAdder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> Debug for AtomicAdder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{ {} }}", self.name, self.value.load())
    }
}
