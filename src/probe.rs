//! Per-thread pseudo-random probes used to pick a table slot.
//!
//! Each thread keeps its own xorshift state in thread-local storage. The state
//! is seeded lazily, the first time the thread touches any striped adder, from
//! a process-wide sequence stepped by the 32-bit golden ratio, so threads start
//! on well spread slots. When a thread collides with another one it advances
//! its probe, which moves it to a different slot on the next update.
//!
//! Probes are never zero: zero is reserved by the accumulator to mean "no
//! probe yet".

use std::cell::Cell;
use std::sync::atomic::{AtomicU32, Ordering};

/// Step between consecutive seeds handed out to new threads.
const SEED_INCREMENT: u32 = 0x9e37_79b9;

/// Source of seeds for threads that have not probed yet.
static NEXT_SEED: AtomicU32 = AtomicU32::new(0);

thread_local! {
    /// Current probe of this thread, `0` until first use.
    static THREAD_PROBE: Cell<u32> = const { Cell::new(0) };
}

/// Returns a fresh non-zero seed from the process-wide sequence.
fn next_seed() -> u32 {
    loop {
        let seed = NEXT_SEED
            .fetch_add(SEED_INCREMENT, Ordering::Relaxed)
            .wrapping_add(SEED_INCREMENT);
        if seed != 0 {
            return seed;
        }
    }
}

/// Marsaglia xorshift step. Maps non-zero inputs to non-zero outputs.
#[inline]
pub fn xorshift(mut probe: u32) -> u32 {
    probe ^= probe << 13;
    probe ^= probe >> 17;
    probe ^= probe << 5;
    probe
}

/// Returns the calling thread's probe, seeding it on first use.
///
/// # Examples
///
/// ```rust
/// use sommatori::probe;
///
/// let p = probe::current();
/// assert_ne!(p, 0);
/// assert_eq!(p, probe::current()); // stable until advanced
/// ```
#[inline]
pub fn current() -> u32 {
    THREAD_PROBE.with(|probe| {
        let value = probe.get();
        if value != 0 {
            return value;
        }
        let seed = next_seed();
        probe.set(seed);
        seed
    })
}

/// Moves the calling thread to a new probe derived from `probe` and returns it.
///
/// A zero `probe` is replaced by a fresh seed instead of being shifted.
///
/// # Examples
///
/// ```rust
/// use sommatori::probe;
///
/// let p = probe::current();
/// let q = probe::advance(p);
/// assert_ne!(q, 0);
/// assert_eq!(probe::current(), q);
/// ```
#[inline]
pub fn advance(probe: u32) -> u32 {
    let next = if probe == 0 { next_seed() } else { xorshift(probe) };
    THREAD_PROBE.with(|p| p.set(next));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_current_is_non_zero_and_stable() {
        let p = current();
        assert_ne!(p, 0);
        assert_eq!(current(), p);
    }

    #[test]
    fn test_advance_zero_reseeds() {
        let p = advance(0);
        assert_ne!(p, 0);
        assert_eq!(current(), p);
    }

    #[test]
    fn test_xorshift_never_zero() {
        let mut p = 1;
        for _ in 0..100_000 {
            p = xorshift(p);
            assert_ne!(p, 0);
        }
    }

    #[test]
    fn test_threads_get_distinct_seeds() {
        let probes: Vec<u32> = (0..16)
            .map(|_| thread::spawn(current))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();
        let unique: HashSet<_> = probes.iter().copied().collect();
        assert_eq!(unique.len(), probes.len());
    }

    #[test]
    fn test_distribution_over_slots() {
        const SLOTS: usize = 64;
        let mut hits = [0usize; SLOTS];
        let mut p = current();
        for _ in 0..SLOTS * 1000 {
            p = advance(p);
            hits[p as usize & (SLOTS - 1)] += 1;
        }
        // every slot is reached, none is starved
        assert!(hits.iter().all(|&h| h > 500), "{hits:?}");
    }
}
