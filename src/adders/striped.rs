//! The contention-adaptive adder.
//!
//! [`StripedAdder`] is a thin facade over [`Striped`]: it starts as a single
//! value and grows a table of cache-line padded cells only once threads
//! actually collide on it.

use std::fmt::{self, Debug};

use crate::adders::Adder;
use crate::striped::Striped;
use crate::value::{Sum, Value};

/// A striped adder over `i64`.
pub type LongAdder = StripedAdder<i64>;

/// A striped adder over `f64`.
pub type DoubleAdder = StripedAdder<f64>;

/// A high-performance adder that stripes its total under contention.
///
/// Under no contention an update is one compare-and-swap on a single value,
/// like an atomic integer. Once two threads collide the adder allocates a
/// small table of padded cells and spreads threads over it, doubling the table
/// on repeated collisions up to [`max_cells`](StripedAdder::max_cells).
///
/// # Memory Usage
///
/// One cache line until the first contention; at most `max_cells` padded
/// cells afterwards. The table never shrinks.
///
/// # Examples
///
/// ```rust
/// use sommatori::adders::{Adder, LongAdder};
/// use std::sync::Arc;
/// use std::thread;
///
/// let hits = Arc::new(LongAdder::new().with_name("hits"));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let hits = Arc::clone(&hits);
///         thread::spawn(move || {
///             for _ in 0..1000 {
///                 hits.inc();
///             }
///         })
///     })
///     .collect();
///
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(hits.sum(), 4000);
/// ```
///
/// Floating-point totals use the same algorithm:
///
/// ```rust
/// use sommatori::adders::{Adder, DoubleAdder};
///
/// let seconds = DoubleAdder::new();
/// seconds.add(0.25);
/// seconds.add(1.5);
/// assert_eq!(seconds.sum(), 1.75);
/// ```
pub struct StripedAdder<V: Value = i64> {
    name: &'static str,
    striped: Striped<V>,
}

impl<V: Value> StripedAdder<V> {
    /// Creates a new adder with a zero total and no name.
    pub fn new() -> Self {
        StripedAdder {
            name: "",
            striped: Striped::default(),
        }
    }

    /// Sets the name of this adder, returning `self` for method chaining.
    ///
    /// ```rust
    /// use sommatori::adders::{Adder, LongAdder};
    ///
    /// let adder = LongAdder::new().with_name("bytes_sent");
    /// assert_eq!(adder.name(), "bytes_sent");
    /// ```
    pub const fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Caps the number of cells this adder may grow to.
    ///
    /// Rounded up to a power of two, clamped to `[2, 2048]`. Defaults to the
    /// process-wide [`max_cells`](crate::striped::max_cells).
    pub fn with_max_cells(self, max_cells: usize) -> Self {
        Self {
            striped: self.striped.with_max_cells(max_cells),
            ..self
        }
    }

    /// Maximum number of cells this adder may grow to.
    #[inline]
    pub fn max_cells(&self) -> usize {
        self.striped.max_cells()
    }

    /// Current number of cell slots, `0` until the first contention.
    #[inline]
    pub fn table_len(&self) -> usize {
        self.striped.table_len()
    }
}

impl<V: Value> Adder<V> for StripedAdder<V> {
    #[inline]
    fn name(&self) -> &str {
        self.name
    }

    /// Adds `delta`: one attempt on the fast path, the contended loop otherwise.
    #[inline]
    fn add(&self, delta: V) {
        self.striped.update(delta, &Sum);
    }

    /// Returns `base` plus every cell. Not a snapshot.
    #[inline]
    fn sum(&self) -> V {
        self.striped.sum()
    }

    #[inline]
    fn reset(&self) {
        self.striped.reset();
    }

    /// Clears `base` then each cell in turn, returning what was cleared.
    #[inline]
    fn sum_and_reset(&self) -> V {
        self.striped.sum_and_reset()
    }

    #[inline]
    fn store(&self, value: V) {
        self.striped.store(value);
    }
}

impl<V: Value> Default for StripedAdder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> Debug for StripedAdder<V> {
    /// Formats as `name{ base:b [slot]:value ... }`, skipping zero cells.
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
    fn test_new() {
        let adder = LongAdder::new();
        assert_eq!(adder.sum(), 0);
        assert_eq!(adder.table_len(), 0);
        assert_eq!(adder.name(), "");
    }

    #[test]
    fn test_add() {
        let adder = LongAdder::new();
        adder.add(10);
        adder.add(-15);
        assert_eq!(adder.sum(), -5);
        // no contention, no table
        assert_eq!(adder.table_len(), 0);
    }

    #[test]
    fn test_with_name_preserves_value() {
        let adder = LongAdder::new().with_name("test");
        adder.dec();
        adder.dec();
        assert_eq!(adder.name(), "test");
        assert_eq!(adder.sum(), -2);
    }

    #[test]
    fn test_with_max_cells() {
        let adder = LongAdder::new().with_name("capped").with_max_cells(16);
        assert_eq!(adder.max_cells(), 16);
        assert_eq!(adder.name(), "capped");
    }

    #[test]
    fn test_default() {
        let adder = DoubleAdder::default();
        assert_eq!(adder.sum(), 0.0);
        assert_eq!(adder.max_cells(), crate::striped::max_cells());
    }

    #[test]
    fn test_debug() {
        let adder = LongAdder::new().with_name("requests");
        adder.add(5);
        assert_eq!(format!("{:?}", adder), "requests{ base:5 }");
    }

    #[test]
    fn test_table_grows_within_bound() {
        let adder = Arc::new(LongAdder::new().with_max_cells(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let adder = Arc::clone(&adder);
                thread::spawn(move || {
                    for _ in 0..250_000 {
                        adder.inc();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(adder.sum(), 2_000_000);
        let len = adder.table_len();
        assert!(len == 0 || (len.is_power_of_two() && (2..=8).contains(&len)));

        // structure survives: sequential laws hold afterwards
        assert_eq!(adder.sum_and_reset(), 2_000_000);
        assert_eq!(adder.sum(), 0);
        adder.store(7);
        assert_eq!(adder.sum(), 7);
        assert_eq!(adder.table_len(), len);
    }
}
