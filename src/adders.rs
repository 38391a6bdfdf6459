//! Adders: the common contract and the strategies implementing it.
//!
//! Every strategy maintains one numeric total that many threads add to, and
//! exposes it through the [`Adder`] trait. They differ only in how they spread
//! contention:
//!
//! | Kind | Type | Layout |
//! |------|------|--------|
//! | [`Striped`](AdderKind::Striped) | [`StripedAdder`] | base + lazily grown table of padded cells |
//! | [`FixedStripe`](AdderKind::FixedStripe) | [`FixedStripeAdder`] | 256 padded cells, allocated up front |
//! | [`SingleValue`](AdderKind::SingleValue) | [`AtomicAdder`] | one padded atomic, CAS loop |
//! | [`Mutex`](AdderKind::Mutex) | [`MutexAdder`] | one value behind a mutex |
//!
//! The striped adder is the one to use; the others exist as comparison points.
//!
//! # Consistency
//!
//! [`sum`](Adder::sum) is not a snapshot: updates racing with it may be
//! partially reflected, which is fine for statistics and wrong for
//! synchronization. [`reset`](Adder::reset), [`store`](Adder::store) and
//! [`sum_and_reset`](Adder::sum_and_reset) are exact only while no
//! [`add`](Adder::add) is in flight; violating that gives a racy total, never
//! a corrupt adder.
//!
//! # Examples
//!
//! ```rust
//! use sommatori::adders::{new_adder, Adder, AdderKind};
//!
//! for kind in AdderKind::ALL {
//!     let adder = new_adder::<i64>(kind);
//!     adder.add(10);
//!     adder.dec();
//!     assert_eq!(adder.sum(), 9);
//!     assert_eq!(adder.sum_and_reset(), 9);
//!     assert_eq!(adder.sum(), 0);
//! }
//! ```

mod atomic;
mod fixed;
mod mutex;
mod striped;

pub use atomic::AtomicAdder;
pub use fixed::{FixedStripeAdder, FIXED_STRIPES};
pub use mutex::MutexAdder;
pub use striped::{DoubleAdder, LongAdder, StripedAdder};

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseAdderKindError;
use crate::value::Value;

/// The capability set shared by every adder.
///
/// All operations are total: nothing here returns an error and integer
/// overflow wraps.
pub trait Adder<V: Value>: Debug + Send + Sync {
    /// Returns the name of this adder, empty if none was set.
    fn name(&self) -> &str;

    /// Adds `delta` to the total.
    fn add(&self, delta: V);

    /// Adds one.
    #[inline]
    fn inc(&self) {
        self.add(V::ONE);
    }

    /// Subtracts one.
    #[inline]
    fn dec(&self) {
        self.add(V::ONE.negate());
    }

    /// Returns the current total.
    fn sum(&self) -> V;

    /// Sets the total to zero.
    fn reset(&self);

    /// Returns the total and sets it to zero.
    fn sum_and_reset(&self) -> V;

    /// Sets the total to `value`.
    fn store(&self, value: V);
}

impl<V: Value> Display for dyn Adder<V> + '_ {
    /// Formats the adder as `name:sum` if named, or just `sum` otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name().is_empty() {
            write!(f, "{}:{}", self.name(), self.sum())
        } else {
            write!(f, "{}", self.sum())
        }
    }
}

/// Selects an adder strategy.
///
/// Parses from (and displays as) `striped`, `fixed-stripe`, `single-value` and
/// `mutex`, case-insensitively and with `_` accepted in place of `-`.
///
/// ```rust
/// use sommatori::adders::AdderKind;
///
/// assert_eq!("Fixed_Stripe".parse::<AdderKind>().unwrap(), AdderKind::FixedStripe);
/// assert_eq!(AdderKind::SingleValue.to_string(), "single-value");
/// assert_eq!(AdderKind::default(), AdderKind::Striped);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum AdderKind {
    /// [`StripedAdder`]: adapts to contention by growing its cell table.
    #[default]
    Striped,
    /// [`FixedStripeAdder`]: fixed table of cells, picked at random.
    FixedStripe,
    /// [`AtomicAdder`]: a single atomic value.
    SingleValue,
    /// [`MutexAdder`]: a single value guarded by a mutex.
    Mutex,
}

impl AdderKind {
    /// Every strategy, striped first.
    pub const ALL: [AdderKind; 4] = [
        AdderKind::Striped,
        AdderKind::FixedStripe,
        AdderKind::SingleValue,
        AdderKind::Mutex,
    ];

    /// Returns the canonical name of this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AdderKind::Striped => "striped",
            AdderKind::FixedStripe => "fixed-stripe",
            AdderKind::SingleValue => "single-value",
            AdderKind::Mutex => "mutex",
        }
    }

    /// Creates a new, unnamed adder of this kind with a zero total.
    pub fn build<V: Value>(self) -> Box<dyn Adder<V>> {
        match self {
            AdderKind::Striped => Box::new(StripedAdder::<V>::new()),
            AdderKind::FixedStripe => Box::new(FixedStripeAdder::<V>::new()),
            AdderKind::SingleValue => Box::new(AtomicAdder::<V>::new()),
            AdderKind::Mutex => Box::new(MutexAdder::<V>::new()),
        }
    }
}

impl Display for AdderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdderKind {
    type Err = ParseAdderKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "striped" | "jdk" => Ok(AdderKind::Striped),
            "fixed-stripe" | "random-cell" => Ok(AdderKind::FixedStripe),
            "single-value" | "atomic" => Ok(AdderKind::SingleValue),
            "mutex" => Ok(AdderKind::Mutex),
            _ => Err(ParseAdderKindError::new(s)),
        }
    }
}

/// Creates a new adder of the given kind. Same as [`AdderKind::build`].
#[inline]
pub fn new_adder<V: Value>(kind: AdderKind) -> Box<dyn Adder<V>> {
    kind.build()
}
