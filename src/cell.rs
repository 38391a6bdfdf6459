//! Cache-line padded partial sums.
//!
//! A [`Cell`] is one slot of a striped table. Cells sit next to each other in
//! the table, so each one is wrapped in [`crossbeam_utils::CachePadded`] to keep
//! updates to neighbouring cells off the same cache line.

use std::fmt::{self, Debug};

use crossbeam_utils::CachePadded;

use crate::value::Value;

/// A padded atomic holding one partial value.
///
/// Cells are only ever updated through [`compare_and_swap`](Cell::compare_and_swap)
/// on the update path; the plain store and swap are reserved for the reset paths
/// of the owning accumulator.
///
/// # Examples
///
/// ```rust
/// use sommatori::cell::Cell;
///
/// let cell = Cell::new(10i64);
/// assert!(cell.compare_and_swap(10, 15));
/// assert!(!cell.compare_and_swap(10, 20));
/// assert_eq!(cell.load(), 15);
/// ```
pub struct Cell<V: Value> {
    value: CachePadded<V::Atomic>,
}

impl<V: Value> Cell<V> {
    /// Creates a cell seeded with `value`.
    #[inline]
    pub fn new(value: V) -> Self {
        Cell {
            value: CachePadded::new(V::new_atomic(value)),
        }
    }

    /// Returns the current value.
    #[inline]
    pub fn load(&self) -> V {
        V::load(&self.value)
    }

    /// Replaces the value with `new` if it is still exactly `expected`.
    #[inline]
    pub fn compare_and_swap(&self, expected: V, new: V) -> bool {
        V::compare_and_swap(&self.value, expected, new)
    }

    #[inline]
    pub(crate) fn store(&self, value: V) {
        V::store(&self.value, value)
    }

    #[inline]
    pub(crate) fn swap(&self, value: V) -> V {
        V::swap(&self.value, value)
    }
}

impl<V: Value> Default for Cell<V> {
    fn default() -> Self {
        Self::new(V::ZERO)
    }
}

impl<V: Value> Debug for Cell<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cell").field(&self.load()).finish()
    }
}
