//! Adder guarded by a mutex.

use std::fmt::{self, Debug};

use parking_lot::Mutex;

use crate::adders::Adder;
use crate::value::Value;

/// An adder whose total sits behind a [`parking_lot::Mutex`].
///
/// Each operation holds the lock for its whole body, which makes
/// [`sum_and_reset`](Adder::sum_and_reset) exact even under concurrent updates.
///
/// # Examples
///
/// ```rust
/// use sommatori::adders::{Adder, MutexAdder};
///
/// let adder = MutexAdder::<i64>::new();
/// adder.add(40);
/// adder.add(2);
/// assert_eq!(adder.sum_and_reset(), 42);
/// assert_eq!(adder.sum(), 0);
/// ```
pub struct MutexAdder<V: Value = i64> {
    name: &'static str,
    value: Mutex<V>,
}

impl<V: Value> MutexAdder<V> {
    /// Creates a new adder with a zero total.
    pub fn new() -> Self {
        MutexAdder {
            name: "",
            value: Mutex::new(V::ZERO),
        }
    }

    /// Sets the name of this adder, returning `self` for method chaining.
    pub const fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<V: Value> Adder<V> for MutexAdder<V> {
    #[inline]
    fn name(&self) -> &str {
        self.name
    }

    #[inline]
    fn add(&self, delta: V) {
        let mut value = self.value.lock();
        *value = value.combine(delta);
    }

    #[inline]
    fn sum(&self) -> V {
        *self.value.lock()
    }

    #[inline]
    fn reset(&self) {
        *self.value.lock() = V::ZERO;
    }

    #[inline]
    fn sum_and_reset(&self) -> V {
        std::mem::replace(&mut *self.value.lock(), V::ZERO)
    }

    #[inline]
    fn store(&self, value: V) {
        *self.value.lock() = value;
    }
}

impl<V: Value> Default for MutexAdder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> Debug for MutexAdder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{ {} }}", self.name, self.sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sum_and_reset_is_exact_under_contention() {
        let adder = Arc::new(MutexAdder::<i64>::new());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let adder = Arc::clone(&adder);
                thread::spawn(move || {
                    for _ in 0..50_000 {
                        adder.inc();
                    }
                })
            })
            .collect();

        let mut drained = 0;
        for _ in 0..100 {
            drained += adder.sum_and_reset();
        }
        for writer in writers {
            writer.join().unwrap();
        }
        drained += adder.sum_and_reset();
        assert_eq!(drained, 200_000);
    }

    #[test]
    fn test_debug() {
        let adder = MutexAdder::<i64>::new().with_name("locked");
        adder.add(8);
        assert_eq!(format!("{:?}", adder), "locked{ 8 }");
    }
}
