//! # Sommatori - Contention-Adaptive Striped Adders
//!
//! A Rust library providing thread-safe adders for totals that many threads
//! update at high rates and few threads read. The main type,
//! [`StripedAdder`](adders::StripedAdder), costs one compare-and-swap per update
//! while nobody contends, and spreads updates over a growing table of padded
//! cells as soon as threads start colliding.
//!
//! ## The Problem
//!
//! A single atomic shared by all threads is correct but slow under load: every
//! update needs exclusive ownership of the same cache line, which then bounces
//! between cores. Pre-sharding the counter fixes contention but pays for all
//! shards up front, even for counters that are never contended.
//!
//! ## The Solution: Lazy Striping
//!
//! 1. **Base first**: updates go to a single `base` value until a
//!    compare-and-swap on it fails.
//!
//! 2. **Grow on collision**: the first failure allocates a table of two cells.
//!    Every thread hashes to a cell with a per-thread [`probe`]; two consecutive
//!    collisions double the table, up to [`max_cells`](striped::max_cells)
//!    (four cells per CPU, clamped to `[64, 2048]`). Threads that keep
//!    colliding move to another cell instead.
//!
//! 3. **Cache Line Padding**: each [`Cell`](cell::Cell) is wrapped in
//!    [`crossbeam_utils::CachePadded`] to prevent false sharing between
//!    neighbouring cells.
//!
//! 4. **No waiting**: a single spinlock guards table allocation, growth and
//!    cell installation. It is only ever *tried*; whoever fails to take it
//!    retries elsewhere.
//!
//! 5. **Aggregation on Read**: [`sum`](adders::Adder::sum) folds `base` and every
//!    cell. It is not a snapshot, which is the right trade-off for statistics.
//!
//! ## Available Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StripedAdder`](adders::StripedAdder) | Contention-adaptive adder (`LongAdder`, `DoubleAdder`) |
//! | [`FixedStripeAdder`](adders::FixedStripeAdder) | 256 pre-allocated cells |
//! | [`AtomicAdder`](adders::AtomicAdder) | Single atomic value |
//! | [`MutexAdder`](adders::MutexAdder) | Single value behind a mutex |
//! | [`Accumulator`](accumulator::Accumulator) | Striped max / min / custom reduction |
//!
//! ## Quick Start
//!
//! ```rust
//! use sommatori::adders::{Adder, LongAdder};
//!
//! // Share it across threads via Arc
//! let requests = LongAdder::new().with_name("requests");
//!
//! requests.inc();
//! requests.add(5);
//!
//! assert_eq!(requests.sum(), 6);
//!
//! // Read and clear
//! let total = requests.sum_and_reset();
//! assert_eq!(total, 6);
//! ```
//!
//! Picking a strategy at runtime:
//!
//! ```rust
//! use sommatori::adders::{new_adder, Adder, AdderKind};
//!
//! let kind: AdderKind = "fixed-stripe".parse().unwrap();
//! let adder = new_adder::<i64>(kind);
//! adder.dec();
//! assert_eq!(adder.sum(), -1);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | [`snapshot`] module and serde support for [`AdderKind`](adders::AdderKind) |
//! | `logging` | Emits `log` records when a table is allocated or grown |
//! | `full` | All of the above |

pub mod accumulator;
pub mod adders;
pub mod cell;
pub mod error;
pub mod probe;
pub mod striped;
pub mod value;

#[cfg(feature = "serde")]
pub mod snapshot;
