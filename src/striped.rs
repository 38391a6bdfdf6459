//! The contention-adaptive striped accumulator.
//!
//! [`Striped`] keeps a `base` value plus a lazily allocated table of padded
//! [`Cell`]s. While nobody contends, every update lands on `base` and the table
//! does not exist. The first failed compare-and-swap on `base` allocates a table
//! of two slots; further collisions between threads double it, up to
//! [`max_cells`]. Readers fold `base` and every present cell together.
//!
//! ```text
//!                    ┌──────────────────────────────────────────┐
//!   add(x) ──fast──► │ base ██████                              │
//!      │             ├──────────────────────────────────────────┤
//!      └─contended─► │ table (len 2 → 4 → 8 → … → max_cells)    │
//!                    │  [0] ██ Cell   [1] ── empty   [2] ██ Cell │
//!                    └──────────────────────────────────────────┘
//!                                      │
//!                                      ▼
//!                        sum() = base + Σ present cells
//! ```
//!
//! # Structural changes
//!
//! A single busy flag (an `AtomicBool` spinlock) guards the only three
//! structural changes: allocating the table, installing a cell into an empty
//! slot, and growing the table. Nobody ever waits on it: a thread that fails to
//! take the flag moves on to another slot or back to `base`.
//!
//! # Table handles
//!
//! The table is published through an `AtomicPtr` to an immutable node. Growing
//! publishes a new node and keeps the old one alive (chained behind the new one)
//! until the accumulator is dropped, so a reader holding a snapshot can always
//! finish its traversal. Staleness is detected by node identity. A node may
//! expose only part of its backing slots; growing first exposes the reserved
//! part of the backing storage, and only reallocates once it is exhausted.

use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::{Arc, OnceLock};

use crate::cell::Cell;
use crate::probe;
use crate::value::{BinaryOperator, Sum, Value};

/// Lower bound of the process-wide [`max_cells`].
pub const MIN_MAX_CELLS: usize = 64;

/// Upper bound of any table length.
pub const MAX_MAX_CELLS: usize = 2048;

const INITIAL_LEN: usize = 2;
const INITIAL_CAPACITY: usize = 4;

/// Maximum table length used by accumulators that do not override it.
///
/// Computed once per process as four slots per available CPU, clamped to
/// `[MIN_MAX_CELLS, MAX_MAX_CELLS]` and rounded up to a power of two.
///
/// # Examples
///
/// ```rust
/// use sommatori::striped::{max_cells, MAX_MAX_CELLS, MIN_MAX_CELLS};
///
/// let n = max_cells();
/// assert!(n.is_power_of_two());
/// assert!((MIN_MAX_CELLS..=MAX_MAX_CELLS).contains(&n));
/// ```
pub fn max_cells() -> usize {
    static MAX_CELLS: OnceLock<usize> = OnceLock::new();
    *MAX_CELLS.get_or_init(|| {
        let cpus = std::thread::available_parallelism().map_or(1, usize::from);
        cpus.saturating_mul(4)
            .clamp(MIN_MAX_CELLS, MAX_MAX_CELLS)
            .next_power_of_two()
    })
}

/// Spinlock guarding structural changes. Only ever try-acquired.
struct Busy(AtomicBool);

struct BusyGuard<'a>(&'a AtomicBool);

impl Busy {
    const fn new() -> Self {
        Busy(AtomicBool::new(false))
    }

    #[inline]
    fn is_held(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        if self.is_held() {
            return None;
        }
        self.0
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| BusyGuard(&self.0))
    }
}

impl Drop for BusyGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// An immutable view over the cell slots.
///
/// `len` slots are exposed; the backing storage may hold more, reserved for
/// the next growth. Slots are written only while the busy flag is held.
struct Table<V: Value> {
    len: usize,
    slots: Arc<[AtomicPtr<Cell<V>>]>,
    retired: *mut Table<V>,
}

impl<V: Value> Table<V> {
    fn with_capacity(len: usize, capacity: usize, retired: *mut Table<V>) -> Self {
        Table {
            len,
            slots: (0..capacity)
                .map(|_| AtomicPtr::new(ptr::null_mut()))
                .collect(),
            retired,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn index(&self, probe: u32) -> usize {
        probe as usize & (self.len - 1)
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&Cell<V>> {
        // SAFETY: published cells are never freed before the owning
        // `Striped` is dropped, which outlives any borrow of this table.
        unsafe { self.slots[index].load(Ordering::Acquire).as_ref() }
    }

    /// Publishes `cell` into an empty slot. Busy flag must be held.
    #[inline]
    fn put(&self, index: usize, cell: Box<Cell<V>>) {
        self.slots[index].store(Box::into_raw(cell), Ordering::Release);
    }

    fn cells(&self) -> impl Iterator<Item = &Cell<V>> {
        (0..self.len).filter_map(move |i| self.get(i))
    }
}

/// Lazily striped accumulator over a [`Value`].
///
/// This is the engine shared by [`StripedAdder`](crate::adders::StripedAdder)
/// and [`Accumulator`](crate::accumulator::Accumulator). Reads are not
/// snapshots: updates racing with [`sum`](Striped::sum) may be partially
/// reflected. The reset family is exact only while no update is in flight.
pub struct Striped<V: Value> {
    base: Cell<V>,
    table: AtomicPtr<Table<V>>,
    busy: Busy,
    max_cells: usize,
    _owns: PhantomData<Box<Table<V>>>,
}

// SAFETY: the table nodes and cells reachable from `table` are only mutated
// through atomics, and are freed exclusively in `Drop`.
unsafe impl<V: Value> Send for Striped<V> {}
unsafe impl<V: Value> Sync for Striped<V> {}

impl<V: Value> Striped<V> {
    /// Creates an accumulator whose `base` starts at `initial`, with no table.
    pub fn new(initial: V) -> Self {
        Striped {
            base: Cell::new(initial),
            table: AtomicPtr::new(ptr::null_mut()),
            busy: Busy::new(),
            max_cells: max_cells(),
            _owns: PhantomData,
        }
    }

    /// Caps the table length of this accumulator.
    ///
    /// The cap is rounded up to a power of two and clamped to
    /// `[2, MAX_MAX_CELLS]`.
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells
            .clamp(INITIAL_LEN, MAX_MAX_CELLS)
            .next_power_of_two();
        self
    }

    /// Maximum table length of this accumulator.
    #[inline]
    pub fn max_cells(&self) -> usize {
        self.max_cells
    }

    /// Current table length, `0` while the table is not allocated.
    #[inline]
    pub fn table_len(&self) -> usize {
        self.table().map_or(0, Table::len)
    }

    #[inline]
    fn table(&self) -> Option<&Table<V>> {
        // SAFETY: table nodes are only freed in `Drop`.
        unsafe { self.table.load(Ordering::Acquire).as_ref() }
    }

    #[inline]
    fn is_current(&self, snapshot: &Table<V>) -> bool {
        ptr::eq(self.table.load(Ordering::Acquire), snapshot)
    }

    /// Tries a single compare-and-swap of `base` with `op(base, delta)`.
    #[inline]
    pub(crate) fn try_update_base<F>(&self, delta: V, op: &F) -> bool
    where
        F: BinaryOperator<V> + ?Sized,
    {
        let current = self.base.load();
        self.base.compare_and_swap(current, op.apply(current, delta))
    }

    /// Fast path shared by the facades.
    ///
    /// One compare-and-swap on `base` while no table exists, otherwise one on
    /// the cell at the calling thread's probe. Falls back to
    /// [`accumulate`](Striped::accumulate) when that single attempt is not enough.
    #[inline]
    pub(crate) fn update<F>(&self, delta: V, op: &F)
    where
        F: BinaryOperator<V> + ?Sized,
    {
        let Some(table) = self.table() else {
            if !self.try_update_base(delta, op) {
                self.accumulate(probe::current(), delta, op, true);
            }
            return;
        };

        let probe = probe::current();
        match table.get(table.index(probe)) {
            None => self.accumulate(probe, delta, op, true),
            Some(cell) => {
                let current = cell.load();
                if !cell.compare_and_swap(current, op.apply(current, delta)) {
                    self.accumulate(probe, delta, op, false);
                }
            }
        }
    }

    /// Folds `delta` into the accumulator, handling contention.
    ///
    /// `probe` selects the starting slot (`0` derives a fresh one).
    /// `was_uncontended` is `false` when the caller has just failed a
    /// compare-and-swap on the cell at `probe`, in which case that cell gets
    /// one more direct attempt before the failure counts as a collision.
    ///
    /// Returns once one compare-and-swap (on `base`, on a new cell, or on an
    /// existing cell) has succeeded.
    pub fn accumulate<F>(&self, mut probe: u32, delta: V, op: &F, mut was_uncontended: bool)
    where
        F: BinaryOperator<V> + ?Sized,
    {
        if probe == 0 {
            probe = probe::advance(0);
            was_uncontended = true;
        }

        let mut collide = false;
        loop {
            let Some(table) = self.table() else {
                if self.try_update_base(delta, op) {
                    return;
                }
                if let Some(_busy) = self.busy.try_acquire() {
                    if self.table().is_none() {
                        self.initialize(probe, delta);
                        return;
                    }
                }
                continue;
            };

            match table.get(table.index(probe)) {
                None => {
                    if !self.busy.is_held() {
                        let cell = Box::new(Cell::new(delta));
                        if let Some(_busy) = self.busy.try_acquire() {
                            if self.install(probe, cell) {
                                return;
                            }
                        }
                    }
                    collide = false;
                }
                Some(_) if !was_uncontended => {
                    was_uncontended = true;
                    continue;
                }
                Some(cell) => {
                    let current = cell.load();
                    if cell.compare_and_swap(current, op.apply(current, delta)) {
                        return;
                    }
                    if table.len() >= self.max_cells || !self.is_current(table) {
                        collide = false;
                    } else if !collide {
                        collide = true;
                    } else if let Some(_busy) = self.busy.try_acquire() {
                        if self.is_current(table) {
                            self.grow(table);
                        }
                        collide = false;
                        continue;
                    }
                }
            }

            probe = probe::advance(probe);
        }
    }

    /// Allocates the first table with one cell holding `delta`. Busy flag held.
    fn initialize(&self, probe: u32, delta: V) {
        let table = Table::with_capacity(INITIAL_LEN, INITIAL_CAPACITY, ptr::null_mut());
        table.put(probe as usize & (INITIAL_LEN - 1), Box::new(Cell::new(delta)));
        self.table
            .store(Box::into_raw(Box::new(table)), Ordering::Release);

        #[cfg(feature = "logging")]
        log::debug!("striped table allocated, len {INITIAL_LEN}");
    }

    /// Installs `cell` at `probe` if that slot of the current table is still
    /// empty. Busy flag held.
    fn install(&self, probe: u32, cell: Box<Cell<V>>) -> bool {
        let Some(table) = self.table() else {
            return false;
        };
        let index = table.index(probe);
        if table.get(index).is_some() {
            return false;
        }
        table.put(index, cell);
        true
    }

    /// Doubles the exposed length of `current`. Busy flag held and `current`
    /// is the published table.
    fn grow(&self, current: &Table<V>) {
        let retired = current as *const Table<V> as *mut Table<V>;
        let len = current.len();
        let next = if len < current.capacity() {
            Table {
                len: current.capacity(),
                slots: Arc::clone(&current.slots),
                retired,
            }
        } else {
            let next = Table::with_capacity(len << 1, len << 2, retired);
            for (from, to) in current.slots.iter().zip(next.slots.iter()) {
                to.store(from.load(Ordering::Relaxed), Ordering::Relaxed);
            }
            next
        };

        #[cfg(feature = "logging")]
        log::debug!(
            "striped table grown {} -> {} (capacity {})",
            len,
            next.len,
            next.capacity()
        );
        #[cfg(feature = "logging")]
        if next.len >= self.max_cells {
            log::trace!("striped table reached max cells {}", self.max_cells);
        }

        self.table
            .store(Box::into_raw(Box::new(next)), Ordering::Release);
    }

    /// Returns `base` plus every present cell.
    #[inline]
    pub fn sum(&self) -> V {
        self.fold(&Sum)
    }

    /// Folds `base` and every present cell with `op`.
    pub fn fold<F>(&self, op: &F) -> V
    where
        F: BinaryOperator<V> + ?Sized,
    {
        let mut acc = self.base.load();
        if let Some(table) = self.table() {
            for cell in table.cells() {
                acc = op.apply(acc, cell.load());
            }
        }
        acc
    }

    /// Sets `base` to `base` and every present cell to `cells`, in place.
    pub fn reset_to(&self, base: V, cells: V) {
        self.base.store(base);
        if let Some(table) = self.table() {
            for cell in table.cells() {
                cell.store(cells);
            }
        }
    }

    /// Sets every component to zero.
    #[inline]
    pub fn reset(&self) {
        self.reset_to(V::ZERO, V::ZERO);
    }

    /// Sets `base` to `value` and every present cell to zero.
    #[inline]
    pub fn store(&self, value: V) {
        self.reset_to(value, V::ZERO);
    }

    /// Swaps every component with `identity`, folding the values taken out.
    pub fn fold_and_reset<F>(&self, op: &F, identity: V) -> V
    where
        F: BinaryOperator<V> + ?Sized,
    {
        let mut acc = self.base.swap(identity);
        if let Some(table) = self.table() {
            for cell in table.cells() {
                acc = op.apply(acc, cell.swap(identity));
            }
        }
        acc
    }

    /// Clears `base` then each cell in turn, summing what each held.
    #[inline]
    pub fn sum_and_reset(&self) -> V {
        self.fold_and_reset(&Sum, V::ZERO)
    }
}

impl<V: Value> Default for Striped<V> {
    fn default() -> Self {
        Self::new(V::ZERO)
    }
}

impl<V: Value> Drop for Striped<V> {
    fn drop(&mut self) {
        let mut node = *self.table.get_mut();
        if node.is_null() {
            return;
        }
        // SAFETY: `&mut self` means no outstanding borrows. The newest node
        // holds every cell ever installed (installs and growth both happen
        // under the busy flag on the current node), and each retired node is
        // reachable exactly once through the chain.
        unsafe {
            for slot in (*node).slots.iter() {
                let cell = slot.load(Ordering::Relaxed);
                if !cell.is_null() {
                    drop(Box::from_raw(cell));
                }
            }
            while !node.is_null() {
                let table = Box::from_raw(node);
                node = table.retired;
            }
        }
    }
}

impl<V: Value> Debug for Striped<V> {
    /// Formats `base` and the non-zero cells as `{ base:b [slot]:value ... }`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ base:{}", self.base.load())?;
        if let Some(table) = self.table() {
            for i in 0..table.len() {
                if let Some(cell) = table.get(i) {
                    let val = cell.load();
                    if val != V::ZERO {
                        write!(f, " [{i}]:{val}")?;
                    }
                }
            }
        }
        write!(f, " }}")
    }
}
