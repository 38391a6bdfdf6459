//! General striped reductions.
//!
//! [`Accumulator`] runs the same contention-adaptive algorithm as
//! [`StripedAdder`](crate::adders::StripedAdder) but folds updates with any
//! associative and commutative [`BinaryOperator`], starting from an identity
//! value. With [`Max`] it tracks a running maximum, with [`Min`] a running
//! minimum, and with a closure anything else that fits.
//!
//! # Examples
//!
//! ```rust
//! use sommatori::accumulator::Accumulator;
//! use sommatori::value::Max;
//!
//! let peak = Accumulator::<u64, Max>::max().with_name("queue_depth_max");
//! peak.accumulate(12);
//! peak.accumulate(40);
//! peak.accumulate(7);
//! assert_eq!(peak.get(), 40);
//! ```
//!
//! Custom reductions take the identity explicitly:
//!
//! ```rust
//! use sommatori::accumulator::Accumulator;
//!
//! let seen = Accumulator::new(|a: u64, b: u64| a | b, 0u64);
//! seen.accumulate(0b0001);
//! seen.accumulate(0b0100);
//! assert_eq!(seen.get(), 0b0101);
//! ```

use std::fmt::{self, Debug};

use crate::striped::Striped;
use crate::value::{BinaryOperator, Max, Min, Sum, Value};

/// A striped reduction of every value passed to [`accumulate`](Accumulator::accumulate).
///
/// Reads fold `base` and every cell with the operator; like the adders, they
/// are not snapshots, and [`reset`](Accumulator::reset) /
/// [`get_then_reset`](Accumulator::get_then_reset) are exact only without
/// concurrent updates.
pub struct Accumulator<V: Value, F: BinaryOperator<V> = Sum> {
    name: &'static str,
    op: F,
    identity: V,
    striped: Striped<V>,
}

impl<V: Value, F: BinaryOperator<V>> Accumulator<V, F> {
    /// Creates an accumulator folding with `op`, starting from `identity`.
    ///
    /// `identity` must satisfy `op(identity, x) == x` for every `x`.
    pub fn new(op: F, identity: V) -> Self {
        Accumulator {
            name: "",
            op,
            identity,
            striped: Striped::new(identity),
        }
    }

    /// Sets the name of this accumulator, returning `self` for method chaining.
    pub const fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Caps the number of cells this accumulator may grow to.
    pub fn with_max_cells(self, max_cells: usize) -> Self {
        Self {
            striped: self.striped.with_max_cells(max_cells),
            ..self
        }
    }

    /// Returns the name of this accumulator.
    #[inline]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the identity value.
    #[inline]
    pub fn identity(&self) -> V {
        self.identity
    }

    /// Current number of cell slots, `0` until the first contention.
    #[inline]
    pub fn table_len(&self) -> usize {
        self.striped.table_len()
    }

    /// Folds `x` into the reduction.
    #[inline]
    pub fn accumulate(&self, x: V) {
        self.striped.update(x, &self.op);
    }

    /// Returns the reduction of every value accumulated so far.
    #[inline]
    pub fn get(&self) -> V {
        self.striped.fold(&self.op)
    }

    /// Puts every component back to the identity.
    #[inline]
    pub fn reset(&self) {
        self.striped.reset_to(self.identity, self.identity);
    }

    /// Returns the current reduction and puts every component back to the
    /// identity.
    #[inline]
    pub fn get_then_reset(&self) -> V {
        self.striped.fold_and_reset(&self.op, self.identity)
    }
}

impl<V: Value> Accumulator<V, Sum> {
    /// A summing accumulator, starting at zero.
    pub fn sum() -> Self {
        Self::new(Sum, V::ZERO)
    }
}

impl<V: Value + PartialOrd> Accumulator<V, Max> {
    /// A running maximum, starting at [`Value::LOWEST`].
    pub fn max() -> Self {
        Self::new(Max, V::LOWEST)
    }
}

impl<V: Value + PartialOrd> Accumulator<V, Min> {
    /// A running minimum, starting at [`Value::HIGHEST`].
    pub fn min() -> Self {
        Self::new(Min, V::HIGHEST)
    }
}

impl<V: Value, F: BinaryOperator<V>> Debug for Accumulator<V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.name, self.striped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_max() {
        let acc = Accumulator::<i64, Max>::max();
        assert_eq!(acc.get(), i64::MIN);
        acc.accumulate(-5);
        acc.accumulate(3);
        acc.accumulate(1);
        assert_eq!(acc.get(), 3);
    }

    #[test]
    fn test_min() {
        let acc = Accumulator::<u32, Min>::min().with_name("latency_min");
        acc.accumulate(150);
        acc.accumulate(85);
        acc.accumulate(200);
        assert_eq!(acc.get(), 85);
        assert_eq!(acc.name(), "latency_min");
    }

    #[test]
    fn test_float_extremes() {
        let peak = Accumulator::<f64, Max>::max();
        assert_eq!(peak.get(), f64::NEG_INFINITY);
        peak.accumulate(f64::NEG_INFINITY);
        assert_eq!(peak.get(), f64::NEG_INFINITY);
        peak.accumulate(f64::MIN);
        assert_eq!(peak.get(), f64::MIN);

        let floor = Accumulator::<f32, Min>::min();
        floor.accumulate(f32::INFINITY);
        assert_eq!(floor.get(), f32::INFINITY);
        floor.accumulate(2.5);
        assert_eq!(floor.get(), 2.5);
        assert_eq!(floor.get_then_reset(), 2.5);
        assert_eq!(floor.get(), f32::INFINITY);
    }

    #[test]
    fn test_sum() {
        let acc = Accumulator::<i64, Sum>::sum();
        acc.accumulate(4);
        acc.accumulate(-1);
        assert_eq!(acc.get(), 3);
        assert_eq!(acc.identity(), 0);
    }

    #[test]
    fn test_reset_returns_to_identity() {
        let acc = Accumulator::<i64, Max>::max();
        acc.accumulate(42);
        assert_eq!(acc.get_then_reset(), 42);
        assert_eq!(acc.get(), i64::MIN);
        acc.accumulate(7);
        acc.reset();
        assert_eq!(acc.get(), i64::MIN);
    }

    #[test]
    fn test_concurrent_max() {
        let acc = Arc::new(Accumulator::<u64, Max>::max());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let acc = Arc::clone(&acc);
                thread::spawn(move || {
                    for i in 0..100_000u64 {
                        acc.accumulate((i * 8 + t) % 500_000);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(acc.get(), 499_999);
    }

    #[test]
    fn test_concurrent_closure() {
        let acc = Arc::new(Accumulator::new(|a: u64, b: u64| a | b, 0u64).with_max_cells(4));
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let acc = Arc::clone(&acc);
                thread::spawn(move || {
                    for _ in 0..50_000 {
                        acc.accumulate(1 << t);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(acc.get(), 0xff);
        assert!(acc.table_len() <= 4);
    }

    #[test]
    fn test_debug() {
        let acc = Accumulator::<i64, Max>::max().with_name("peak");
        acc.accumulate(9);
        assert_eq!(format!("{:?}", acc), "peak{ base:9 }");
    }
}
