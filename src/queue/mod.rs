use std::ptr;

use log::trace;
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::buffer::RingBuffer;
use crate::error::CarouselResult;

/// Thread-safe producer/consumer facade over a [`RingBuffer`].
///
/// One mutex serializes every access to the underlying buffer, held for the
/// full duration of each operation (and released on unwind); a condition
/// variable keyed on "non-empty" lets consumers block until data arrives.
/// Waiters always re-check the predicate under the lock after waking, so a
/// producer's notification cannot be lost. Which of several waiters wakes
/// first is unspecified; FIFO order holds only within the buffer itself.
#[derive(Debug)]
pub struct ConcurrentQueue<T> {
    inner: Mutex<RingBuffer<T>>,
    not_empty: Condvar,
}

impl<T> ConcurrentQueue<T> {
    /// Queue over an empty zero-capacity buffer.
    pub fn new() -> Self {
        Self::from_ring(RingBuffer::new())
    }

    /// Queue over an empty buffer with `capacity` preallocated slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_ring(RingBuffer::with_capacity(capacity))
    }

    /// Fallible twin of [`with_capacity`](Self::with_capacity).
    pub fn try_with_capacity(capacity: usize) -> CarouselResult<Self> {
        Ok(Self::from_ring(RingBuffer::try_with_capacity(capacity)?))
    }

    /// Wraps an already-populated buffer.
    pub fn from_ring(ring: RingBuffer<T>) -> Self {
        Self {
            inner: Mutex::new(ring),
            not_empty: Condvar::new(),
        }
    }

    /// Pushes `value`, evicting the oldest element when full; wakes one
    /// waiting consumer after the lock is released. Returns whether an
    /// eviction happened.
    pub fn push_back(&self, value: T) -> bool {
        let overwrite = self.inner.lock().push_back(value);
        if overwrite {
            trace!("push_back evicted the oldest element");
        }
        self.not_empty.notify_one();
        overwrite
    }

    /// Deferred-construction form of [`push_back`](Self::push_back); `make`
    /// runs under the lock, which is released even if it panics.
    pub fn push_back_with<F>(&self, make: F) -> bool
    where
        F: FnOnce() -> T,
    {
        let overwrite = self.inner.lock().push_back_with(make);
        self.not_empty.notify_one();
        overwrite
    }

    /// Appends from `iter` without evicting, stopping at free capacity or
    /// input exhaustion; returns the number appended. Wakes every waiting
    /// consumer when anything was appended, since a range push may satisfy
    /// many of them at once.
    pub fn append<I>(&self, iter: &mut I) -> usize
    where
        I: Iterator<Item = T>,
    {
        let appended = self.inner.lock().append(iter);
        if appended > 0 {
            self.not_empty.notify_all();
        }
        appended
    }

    /// Pops the oldest element without blocking; `None` when empty.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Blocks until the buffer is non-empty, then pops the oldest element.
    pub fn wait_pop(&self) -> T {
        let mut ring = self.inner.lock();
        loop {
            if let Some(value) = ring.pop_front() {
                return value;
            }
            self.not_empty.wait(&mut ring);
        }
    }

    /// Blocks until the buffer is non-empty, then drains up to `max` of the
    /// elements available at that moment (possibly fewer, at least one) into
    /// `out`, returning how many were taken. Never waits for a full batch;
    /// `max == 0` returns 0 without blocking.
    pub fn wait_pop_n(&self, out: &mut Vec<T>, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        let mut ring = self.inner.lock();
        while ring.is_empty() {
            self.not_empty.wait(&mut ring);
        }
        let take = max.min(ring.len());
        out.reserve(take);
        for _ in 0..take {
            if let Some(value) = ring.pop_front() {
                out.push(value);
            }
        }
        take
    }

    /// Explicit scoped acquisition of the queue's lock.
    ///
    /// The guard doubles as the held-lock token: any reads or mutations
    /// chained through it (including iterating the buffer) happen atomically
    /// with respect to other threads. Release it promptly.
    pub fn lock(&self) -> MutexGuard<'_, RingBuffer<T>> {
        self.inner.lock()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Reallocates the underlying buffer; see [`RingBuffer::resize`].
    pub fn resize(&self, new_capacity: usize) {
        self.inner.lock().resize(new_capacity);
    }

    /// Fallible twin of [`resize`](Self::resize).
    pub fn try_resize(&self, new_capacity: usize) -> CarouselResult<()> {
        self.inner.lock().try_resize(new_capacity)
    }

    /// Assigns `source`'s contents to `self` between two live instances.
    ///
    /// Both locks are taken in address order so concurrent cross-assignments
    /// cannot deadlock. Waiters are notified afterwards since the buffer may
    /// have become non-empty.
    pub fn copy_from(&self, source: &Self)
    where
        T: Clone,
    {
        if ptr::eq(self, source) {
            return;
        }
        if (self as *const Self) < (source as *const Self) {
            let mut dst = self.inner.lock();
            let src = source.inner.lock();
            dst.clone_from(&src);
        } else {
            let src = source.inner.lock();
            let mut dst = self.inner.lock();
            dst.clone_from(&src);
        }
        self.not_empty.notify_all();
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for ConcurrentQueue<T> {
    /// Snapshots the source buffer under its lock; the clone starts with no
    /// waiters.
    fn clone(&self) -> Self {
        Self::from_ring(self.inner.lock().clone())
    }
}
