use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};
use std::ptr;
use std::slice;

use log::debug;

use crate::buffer::iter::{IntoIter, Iter, IterMut};
use crate::buffer::raw::RawStorage;
use crate::error::CarouselResult;

/// Fixed-capacity sequential container that reuses storage cyclically and
/// evicts the oldest element to make room when full.
///
/// Invariant I, maintained by every operation:
///
/// ```text
/// if write < capacity then
///     occupied = [oldest, write)
/// else
///     occupied = [oldest, capacity) ∪ [0, write - capacity)
/// and
///     0 <= oldest < capacity      (oldest == 0 when capacity == 0)
///     oldest <= write <= oldest + capacity
/// ```
///
/// `write` lives in the doubled index space `[0, 2 * capacity)`; letting it
/// run up to `capacity` past `oldest` keeps "empty" (`write == oldest`) and
/// "full" (`write == oldest + capacity`) distinguishable without a separate
/// flag. Overwrite detection and `resize` both rely on this arithmetic.
pub struct RingBuffer<T> {
    storage: RawStorage<T>,
    oldest: usize,
    write: usize,
}

impl<T> RingBuffer<T> {
    /// Empty buffer with zero capacity; no allocation is performed.
    pub fn new() -> Self {
        Self {
            storage: RawStorage::empty(),
            oldest: 0,
            write: 0,
        }
    }

    /// Empty buffer with `capacity` preallocated slots.
    ///
    /// Aborts through the global allocation error hook if memory cannot be
    /// obtained; use [`try_with_capacity`](Self::try_with_capacity) to handle
    /// that case.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: RawStorage::allocate_unbounded(capacity),
            oldest: 0,
            write: 0,
        }
    }

    /// Fallible twin of [`with_capacity`](Self::with_capacity).
    pub fn try_with_capacity(capacity: usize) -> CarouselResult<Self> {
        Ok(Self {
            storage: RawStorage::allocate(capacity)?,
            oldest: 0,
            write: 0,
        })
    }

    /// Buffer with `capacity == len == items.len()`, cloning every element.
    ///
    /// A clone panic mid-build destroys everything built so far and releases
    /// the storage before the panic propagates.
    pub fn from_slice(items: &[T]) -> Self
    where
        T: Clone,
    {
        let mut ring = Self::with_capacity(items.len());
        ring.append(&mut items.iter().cloned());
        ring
    }

    /// Preallocates `capacity`, then appends from `items` (which may be
    /// single-pass) until the buffer is full or the input is exhausted.
    pub fn with_capacity_from<I>(capacity: usize, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut ring = Self::with_capacity(capacity);
        ring.append(&mut items.into_iter());
        ring
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    pub fn len(&self) -> usize {
        debug_assert!(self.oldest <= self.write);
        self.write - self.oldest
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.capacity() > 0 && self.len() == self.capacity()
    }

    #[inline]
    fn physical(&self, index: usize) -> usize {
        let cap = self.capacity();
        if index >= cap {
            index - cap
        } else {
            index
        }
    }

    /// Appends the result of `make`, evicting the oldest element first when
    /// the buffer is full. Returns whether an eviction happened. With zero
    /// capacity this is a no-op returning `false`.
    ///
    /// Panic tier: strong when not full (`make` runs before any state
    /// changes take effect); basic when full. In the full case the eviction
    /// happens before `make` runs, so a panic there leaves a valid buffer
    /// whose window has shifted and holds one fewer element.
    pub fn push_back_with<F>(&mut self, make: F) -> bool
    where
        F: FnOnce() -> T,
    {
        let cap = self.capacity();
        if cap == 0 {
            return false;
        }
        let overwrite = self.write >= cap && self.write - cap == self.oldest;
        let slot = self.physical(self.write);
        if overwrite {
            self.oldest += 1;
            if self.oldest == cap {
                self.oldest = 0;
                self.write = cap - 1;
            }
            unsafe { self.storage.drop_in_place(slot) };
        }
        let value = make();
        unsafe { self.storage.write(slot, value) };
        self.write += 1;
        overwrite
    }

    /// Appends `value`, evicting the oldest element first when the buffer is
    /// full. Returns whether an eviction happened.
    pub fn push_back(&mut self, value: T) -> bool {
        self.push_back_with(move || value)
    }

    /// Appends from `iter` while there is free capacity, never evicting;
    /// stops at whichever limit is hit first and returns the number of
    /// elements appended. The iterator keeps the unconsumed tail.
    ///
    /// If `iter.next()` panics mid-append, everything appended during this
    /// call is destroyed and the write cursor rolled back to its entry value,
    /// leaving the buffer exactly as it was (strong for the call).
    pub fn append<I>(&mut self, iter: &mut I) -> usize
    where
        I: Iterator<Item = T>,
    {
        struct Rollback<'a, T> {
            ring: &'a mut RingBuffer<T>,
            entry_write: usize,
        }

        impl<T> Drop for Rollback<'_, T> {
            fn drop(&mut self) {
                let write = self.ring.write;
                unsafe {
                    self.ring.storage.drop_doubled_range(self.entry_write, write);
                }
                self.ring.write = self.entry_write;
            }
        }

        let entry_write = self.write;
        let guard = Rollback {
            ring: self,
            entry_write,
        };
        let mut appended = 0;
        while guard.ring.len() < guard.ring.capacity() {
            match iter.next() {
                Some(value) => {
                    let evicted = guard.ring.push_back(value);
                    debug_assert!(!evicted);
                    appended += 1;
                }
                None => break,
            }
        }
        mem::forget(guard);
        appended
    }

    /// Removes and returns the oldest element, or `None` when empty.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = unsafe { self.storage.read(self.oldest) };
        self.oldest += 1;
        if self.oldest == self.capacity() {
            self.oldest = 0;
            self.write -= self.capacity();
        }
        Some(value)
    }

    /// Removes and returns the newest element, or `None` when empty.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.write -= 1;
        let slot = self.physical(self.write);
        Some(unsafe { self.storage.read(slot) })
    }

    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    pub fn back(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.len().checked_sub(1).and_then(move |i| self.get_mut(i))
    }

    /// Element at logical position `index` (0 is the oldest).
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        let slot = self.physical(self.oldest + index);
        Some(unsafe { &*self.storage.slot(slot) })
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len() {
            return None;
        }
        let slot = self.physical(self.oldest + index);
        Some(unsafe { &mut *self.storage.slot(slot) })
    }

    /// Reallocates to `new_capacity`, keeping up to
    /// `min(new_capacity, len)` of the oldest elements in their original
    /// order and discarding the newest excess when shrinking. The oldest
    /// index of the rebuilt buffer is 0.
    ///
    /// Allocation is the sole failable step and happens before any visible
    /// mutation (strong); element moves are plain byte copies and cannot
    /// panic.
    pub fn try_resize(&mut self, new_capacity: usize) -> CarouselResult<()> {
        let new_storage = RawStorage::allocate(new_capacity)?;
        self.rebuild(new_storage);
        Ok(())
    }

    /// Infallible twin of [`try_resize`](Self::try_resize); aborts through
    /// the global allocation error hook on failure.
    pub fn resize(&mut self, new_capacity: usize) {
        let new_storage = RawStorage::allocate_unbounded(new_capacity);
        self.rebuild(new_storage);
    }

    fn rebuild(&mut self, new_storage: RawStorage<T>) {
        let cap = self.capacity();
        let moved = self.len().min(new_storage.capacity());
        unsafe {
            if moved > 0 {
                // The occupied range is at most two contiguous physical runs;
                // move the oldest `moved` elements in logical order.
                let first = moved.min(cap - self.oldest);
                ptr::copy_nonoverlapping(self.storage.slot(self.oldest), new_storage.slot(0), first);
                if first < moved {
                    ptr::copy_nonoverlapping(
                        self.storage.slot(0),
                        new_storage.slot(first),
                        moved - first,
                    );
                }
            }
            // Newest elements that do not fit are dropped; the moved ones are
            // now owned by the new block, so the old block is released as-is.
            self.storage.drop_doubled_range(self.oldest + moved, self.write);
        }
        self.storage = new_storage;
        self.oldest = 0;
        self.write = moved;
        debug!("ring buffer capacity {} -> {}", cap, self.capacity());
    }

    /// Destroys every live element and resets both cursors; capacity is
    /// unchanged.
    pub fn clear(&mut self) {
        unsafe {
            self.storage.drop_doubled_range(self.oldest, self.write);
        }
        self.oldest = 0;
        self.write = 0;
    }

    /// Constant-time exchange of the full internal state; never panics.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// The occupied range as at most two contiguous runs, oldest first.
    pub fn as_slices(&self) -> (&[T], &[T]) {
        let cap = self.capacity();
        if cap == 0 {
            return (&[], &[]);
        }
        unsafe {
            if self.write <= cap {
                (
                    slice::from_raw_parts(self.storage.slot(self.oldest), self.write - self.oldest),
                    &[],
                )
            } else {
                (
                    slice::from_raw_parts(self.storage.slot(self.oldest), cap - self.oldest),
                    slice::from_raw_parts(self.storage.slot(0), self.write - cap),
                )
            }
        }
    }

    /// Mutable variant of [`as_slices`](Self::as_slices).
    pub fn as_mut_slices(&mut self) -> (&mut [T], &mut [T]) {
        let cap = self.capacity();
        if cap == 0 {
            return (&mut [], &mut []);
        }
        unsafe {
            if self.write <= cap {
                (
                    slice::from_raw_parts_mut(
                        self.storage.slot(self.oldest),
                        self.write - self.oldest,
                    ),
                    &mut [],
                )
            } else {
                (
                    slice::from_raw_parts_mut(self.storage.slot(self.oldest), cap - self.oldest),
                    slice::from_raw_parts_mut(self.storage.slot(0), self.write - cap),
                )
            }
        }
    }

    /// Iterates the live elements oldest to newest. Holding the iterator
    /// borrows the buffer, so no mutation can invalidate it.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.storage.base(), self.oldest, self.write, self.capacity())
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.storage.base(), self.oldest, self.write, self.capacity())
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        unsafe {
            self.storage.drop_doubled_range(self.oldest, self.write);
        }
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Sync> Sync for RingBuffer<T> {}

impl<T: Clone> Clone for RingBuffer<T> {
    /// Deep-copies exactly the occupied range into freshly sized storage;
    /// capacity is preserved. A clone panic destroys the partial copy and
    /// leaves the source untouched (strong).
    fn clone(&self) -> Self {
        let mut out = Self::with_capacity(self.capacity());
        out.append(&mut self.iter().cloned());
        out
    }

    /// Reuses existing storage when `capacity >= source.len()`; the
    /// destination is cleared first, so a clone panic mid-copy leaves it
    /// valid but holding only the elements cloned so far (basic). When the
    /// destination must grow, a fresh buffer is built aside and swapped in
    /// (strong).
    fn clone_from(&mut self, source: &Self) {
        if self.capacity() < source.len() {
            *self = source.clone();
            return;
        }
        self.clear();
        self.append(&mut source.iter().cloned());
    }
}

impl<T> FromIterator<T> for RingBuffer<T> {
    /// Buffer with `capacity == len` equal to the input length.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        Self::from(items)
    }
}

impl<T> From<Vec<T>> for RingBuffer<T> {
    fn from(items: Vec<T>) -> Self {
        let mut ring = Self::with_capacity(items.len());
        ring.append(&mut items.into_iter());
        ring
    }
}

impl<T> Extend<T> for RingBuffer<T> {
    /// Overwriting push loop: unlike [`append`](RingBuffer::append), this
    /// evicts the oldest elements once the buffer is full.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        let len = self.len();
        self.get(index).unwrap_or_else(|| {
            panic!("index out of bounds: the len is {len} but the index is {index}")
        })
    }
}

impl<T> IndexMut<usize> for RingBuffer<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        self.get_mut(index).unwrap_or_else(|| {
            panic!("index out of bounds: the len is {len} but the index is {index}")
        })
    }
}

impl<T: PartialEq> PartialEq for RingBuffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for RingBuffer<T> {}

impl<T: fmt::Debug> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> IntoIterator for RingBuffer<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    /// Owning drain in logical order, oldest first.
    fn into_iter(self) -> IntoIter<T> {
        IntoIter::new(self)
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut RingBuffer<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}
