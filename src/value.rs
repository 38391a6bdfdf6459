//! Numeric types that can be striped, and the reductions applied to them.
//!
//! Every adder in this crate is generic over a [`Value`]: a plain numeric type
//! paired with the atomic type used to store it. Integers are stored in their
//! matching std atomic; floats are stored as raw bits in an unsigned atomic, so
//! their compare-and-swap compares exact bit patterns.
//!
//! Updates are folded in with a [`BinaryOperator`]. Adders always use [`Sum`];
//! an [`Accumulator`](crate::accumulator::Accumulator) accepts any operator,
//! including plain closures.

use std::fmt::{Debug, Display};
use std::sync::atomic::{
    AtomicI32, AtomicI64, AtomicIsize, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};

use atomic_traits::Atomic;
use num_traits::{WrappingAdd, WrappingNeg};

/// A numeric type that can be held in a striped cell.
///
/// # Examples
///
/// ```rust
/// use sommatori::value::Value;
///
/// assert_eq!(i64::MAX.combine(1), i64::MIN); // wraps
/// assert_eq!(2.5f64.combine(0.5), 3.0);
/// assert_eq!(u32::ONE.negate(), u32::MAX);
/// ```
pub trait Value: Copy + PartialEq + Debug + Display + Send + Sync + 'static {
    /// Raw representation stored in the atomic.
    type Bits: Copy + Eq;

    /// Atomic storage for [`Self::Bits`].
    type Atomic: Atomic<Type = Self::Bits> + Send + Sync;

    /// Additive identity.
    const ZERO: Self;

    /// Unit increment.
    const ONE: Self;

    /// Identity of a running maximum: `MIN` for integers, negative infinity
    /// for floats.
    const LOWEST: Self;

    /// Identity of a running minimum: `MAX` for integers, infinity for floats.
    const HIGHEST: Self;

    /// Converts the value into its raw representation.
    fn to_bits(self) -> Self::Bits;

    /// Rebuilds a value from its raw representation.
    fn from_bits(bits: Self::Bits) -> Self;

    /// Adds two values. Integers wrap on overflow.
    fn combine(self, other: Self) -> Self;

    /// Additive inverse. Integers use wrapping negation.
    fn negate(self) -> Self;

    /// Creates a new atomic holding `value`.
    #[inline]
    fn new_atomic(value: Self) -> Self::Atomic {
        <Self::Atomic as Atomic>::new(value.to_bits())
    }

    /// Loads the value stored in `atomic`.
    #[inline]
    fn load(atomic: &Self::Atomic) -> Self {
        Self::from_bits(atomic.load(Ordering::Relaxed))
    }

    /// Stores `value` into `atomic`.
    #[inline]
    fn store(atomic: &Self::Atomic, value: Self) {
        atomic.store(value.to_bits(), Ordering::Relaxed)
    }

    /// Replaces the value in `atomic`, returning the previous one.
    #[inline]
    fn swap(atomic: &Self::Atomic, value: Self) -> Self {
        Self::from_bits(atomic.swap(value.to_bits(), Ordering::Relaxed))
    }

    /// Stores `new` if `atomic` still holds exactly `current`.
    #[inline]
    fn compare_and_swap(atomic: &Self::Atomic, current: Self, new: Self) -> bool {
        atomic
            .compare_exchange(
                current.to_bits(),
                new.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok()
    }
}

macro_rules! impl_integer_value {
    ($($ty:ty => $atomic:ty),* $(,)?) => {$(
        impl Value for $ty {
            type Bits = $ty;
            type Atomic = $atomic;

            const ZERO: Self = 0;
            const ONE: Self = 1;
            const LOWEST: Self = <$ty>::MIN;
            const HIGHEST: Self = <$ty>::MAX;

            #[inline]
            fn to_bits(self) -> $ty {
                self
            }

            #[inline]
            fn from_bits(bits: $ty) -> Self {
                bits
            }

            #[inline]
            fn combine(self, other: Self) -> Self {
                WrappingAdd::wrapping_add(&self, &other)
            }

            #[inline]
            fn negate(self) -> Self {
                WrappingNeg::wrapping_neg(&self)
            }
        }
    )*};
}

impl_integer_value! {
    i32 => AtomicI32,
    i64 => AtomicI64,
    isize => AtomicIsize,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
}

macro_rules! impl_float_value {
    ($($ty:ty => $bits:ty, $atomic:ty),* $(,)?) => {$(
        impl Value for $ty {
            type Bits = $bits;
            type Atomic = $atomic;

            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            const LOWEST: Self = <$ty>::NEG_INFINITY;
            const HIGHEST: Self = <$ty>::INFINITY;

            #[inline]
            fn to_bits(self) -> $bits {
                bytemuck::cast(self)
            }

            #[inline]
            fn from_bits(bits: $bits) -> Self {
                bytemuck::cast(bits)
            }

            #[inline]
            fn combine(self, other: Self) -> Self {
                self + other
            }

            #[inline]
            fn negate(self) -> Self {
                -self
            }
        }
    )*};
}

impl_float_value! {
    f32 => u32, AtomicU32,
    f64 => u64, AtomicU64,
}

/// A binary reduction applied as `apply(current, delta) -> updated`.
///
/// To keep striping correct the operation must be associative and
/// commutative: partial results land in arbitrary cells and are folded
/// together in arbitrary order.
///
/// Any `Fn(V, V) -> V` closure is an operator:
///
/// ```rust
/// use sommatori::value::BinaryOperator;
///
/// let xor = |a: u64, b: u64| a ^ b;
/// assert_eq!(xor.apply(0b1100, 0b1010), 0b0110);
/// ```
pub trait BinaryOperator<V>: Send + Sync {
    /// Combines the current value with an update.
    fn apply(&self, left: V, right: V) -> V;
}

impl<V, F> BinaryOperator<V> for F
where
    F: Fn(V, V) -> V + Send + Sync,
{
    #[inline]
    fn apply(&self, left: V, right: V) -> V {
        self(left, right)
    }
}

/// Addition, with native wraparound for integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sum;

impl<V: Value> BinaryOperator<V> for Sum {
    #[inline]
    fn apply(&self, left: V, right: V) -> V {
        left.combine(right)
    }
}

/// Keeps the larger operand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Max;

impl<V: Value + PartialOrd> BinaryOperator<V> for Max {
    #[inline]
    fn apply(&self, left: V, right: V) -> V {
        if right > left {
            right
        } else {
            left
        }
    }
}

/// Keeps the smaller operand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Min;

impl<V: Value + PartialOrd> BinaryOperator<V> for Min {
    #[inline]
    fn apply(&self, left: V, right: V) -> V {
        if right < left {
            right
        } else {
            left
        }
    }
}
