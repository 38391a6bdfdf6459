//! Adder with a fixed, pre-allocated table of cells.
//!
//! This module provides [`FixedStripeAdder`], which spreads updates over
//! [`FIXED_STRIPES`] padded cells picked by the calling thread's probe. The
//! table never grows and every read walks all of it.

use std::fmt::{self, Debug};

use crate::adders::Adder;
use crate::cell::Cell;
use crate::probe;
use crate::value::Value;

/// Number of cells in a [`FixedStripeAdder`].
pub const FIXED_STRIPES: usize = 256;

/// An adder striped over a fixed table of 256 cells.
///
/// Fast under contention from the first update, at the cost of always holding
/// the whole table (256 cache lines) and of reads that visit every cell.
///
/// # Examples
///
/// ```rust
/// use sommatori::adders::{Adder, FixedStripeAdder};
///
/// let adder = FixedStripeAdder::<i64>::new();
/// adder.add(3);
/// adder.inc();
/// assert_eq!(adder.sum(), 4);
/// ```
pub struct FixedStripeAdder<V: Value = i64> {
    name: &'static str,
    components: Box<[Cell<V>]>,
}

impl<V: Value> FixedStripeAdder<V> {
    /// Creates a new adder with all cells at zero.
    pub fn new() -> Self {
        FixedStripeAdder {
            name: "",
            components: (0..FIXED_STRIPES).map(|_| Cell::default()).collect(),
        }
    }

    /// Sets the name of this adder, returning `self` for method chaining.
    pub const fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<V: Value> Adder<V> for FixedStripeAdder<V> {
    #[inline]
    fn name(&self) -> &str {
        self.name
    }

    /// Adds `delta` to the cell at the thread's probe, moving to another cell
    /// whenever the compare-and-swap loses a race.
    #[inline]
    fn add(&self, delta: V) {
        let mut probe = probe::current();
        loop {
            let cell = &self.components[probe as usize & (FIXED_STRIPES - 1)];
            let current = cell.load();
            if cell.compare_and_swap(current, current.combine(delta)) {
                return;
            }
            probe = probe::advance(probe);
        }
    }

    #[inline]
    fn sum(&self) -> V {
        self.components
            .iter()
            .fold(V::ZERO, |acc, cell| acc.combine(cell.load()))
    }

    fn reset(&self) {
        for cell in self.components.iter() {
            cell.store(V::ZERO);
        }
    }

    fn sum_and_reset(&self) -> V {
        self.components
            .iter()
            .fold(V::ZERO, |acc, cell| acc.combine(cell.swap(V::ZERO)))
    }

    /// Puts `value` in the first cell and zeroes the others.
    fn store(&self, value: V) {
        self.reset();
        self.components[0].store(value);
    }
}

impl<V: Value> Default for FixedStripeAdder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> Debug for FixedStripeAdder<V> {
    /// Formats the adder showing non-zero cells.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.name)?;
        for (i, cell) in self.components.iter().enumerate() {
            let val = cell.load();
            if val != V::ZERO {
                write!(f, " [{i}]:{val}")?;
            }
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let adder = FixedStripeAdder::<i64>::new();
        assert_eq!(adder.sum(), 0);
        assert_eq!(adder.components.len(), FIXED_STRIPES);
    }

    #[test]
    fn test_updates_land_on_probe_cell() {
        let adder = FixedStripeAdder::<u64>::new();
        adder.add(2);
        adder.add(3);
        let slot = probe::current() as usize & (FIXED_STRIPES - 1);
        assert_eq!(adder.components[slot].load(), 5);
    }

    #[test]
    fn test_store_and_reset() {
        let adder = FixedStripeAdder::<i64>::new().with_name("fixed");
        adder.add(9);
        adder.store(4);
        assert_eq!(adder.sum(), 4);
        adder.reset();
        assert_eq!(adder.sum(), 0);
    }

    #[test]
    fn test_debug() {
        let adder = FixedStripeAdder::<i64>::new().with_name("fixed");
        assert_eq!(format!("{:?}", adder), "fixed{ }");
        adder.store(3);
        assert_eq!(format!("{:?}", adder), "fixed{ [0]:3 }");
    }
}
