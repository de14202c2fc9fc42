use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::buffer::ring::RingBuffer;

/// Shared-reference iterator over the occupied range, oldest to newest.
///
/// Positions live in the doubled index space of the owning buffer; a
/// position maps to the physical slot `pos - capacity` once it passes
/// `capacity`. Equality and ordering compare positions, not physical slots,
/// so the end position stays distinguishable from interior ones after
/// wraparound.
pub struct Iter<'a, T> {
    base: NonNull<T>,
    pos: usize,
    end: usize,
    capacity: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(base: NonNull<T>, pos: usize, end: usize, capacity: usize) -> Self {
        Self {
            base,
            pos,
            end,
            capacity,
            _marker: PhantomData,
        }
    }

    fn slot(&self, pos: usize) -> *mut T {
        let physical = if pos >= self.capacity {
            pos - self.capacity
        } else {
            pos
        };
        unsafe { self.base.as_ptr().add(physical) }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.pos == self.end {
            return None;
        }
        let item = unsafe { &*self.slot(self.pos) };
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.pos;
        (remaining, Some(remaining))
    }

    fn nth(&mut self, n: usize) -> Option<&'a T> {
        if n >= self.end - self.pos {
            self.pos = self.end;
            return None;
        }
        self.pos += n;
        self.next()
    }

    fn last(mut self) -> Option<&'a T> {
        self.next_back()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.pos == self.end {
            return None;
        }
        self.end -= 1;
        Some(unsafe { &*self.slot(self.end) })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            base: self.base,
            pos: self.pos,
            end: self.end,
            capacity: self.capacity,
            _marker: PhantomData,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

unsafe impl<T: Sync> Send for Iter<'_, T> {}
unsafe impl<T: Sync> Sync for Iter<'_, T> {}

/// Mutable counterpart of [`Iter`].
pub struct IterMut<'a, T> {
    base: NonNull<T>,
    pos: usize,
    end: usize,
    capacity: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> IterMut<'a, T> {
    pub(crate) fn new(base: NonNull<T>, pos: usize, end: usize, capacity: usize) -> Self {
        Self {
            base,
            pos,
            end,
            capacity,
            _marker: PhantomData,
        }
    }

    fn slot(&self, pos: usize) -> *mut T {
        let physical = if pos >= self.capacity {
            pos - self.capacity
        } else {
            pos
        };
        unsafe { self.base.as_ptr().add(physical) }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.pos == self.end {
            return None;
        }
        // Each position is visited once, so the returned references never
        // alias.
        let item = unsafe { &mut *self.slot(self.pos) };
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.pos;
        (remaining, Some(remaining))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.pos == self.end {
            return None;
        }
        self.end -= 1;
        Some(unsafe { &mut *self.slot(self.end) })
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

unsafe impl<T: Send> Send for IterMut<'_, T> {}
unsafe impl<T: Sync> Sync for IterMut<'_, T> {}

/// Owning iterator that drains the buffer in logical order.
pub struct IntoIter<T> {
    ring: RingBuffer<T>,
}

impl<T> IntoIter<T> {
    pub(crate) fn new(ring: RingBuffer<T>) -> Self {
        Self { ring }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.ring.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.ring.len(), Some(self.ring.len()))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        self.ring.pop_back()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
impl<T> FusedIterator for IntoIter<T> {}

impl<T: fmt::Debug> fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.ring).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::buffer::ring::RingBuffer;

    fn wrapped_ring() -> RingBuffer<i32> {
        // Capacity 4, contents [2, 3, 4, 5] split across the physical end.
        let mut ring = RingBuffer::with_capacity(4);
        for value in 0..6 {
            ring.push_back(value);
        }
        ring
    }

    #[test]
    fn test_forward_iteration_visits_oldest_to_newest() {
        let ring = wrapped_ring();
        let seen: Vec<i32> = ring.iter().copied().collect();
        assert_eq!(seen, vec![2, 3, 4, 5]);
        assert_eq!(ring.iter().len(), ring.len());
    }

    #[test]
    fn test_reverse_iteration() {
        let ring = wrapped_ring();
        let seen: Vec<i32> = ring.iter().rev().copied().collect();
        assert_eq!(seen, vec![5, 4, 3, 2]);
    }

    #[test]
    fn test_double_ended_meets_in_middle() {
        let ring = wrapped_ring();
        let mut iter = ring.iter();
        assert_eq!(iter.next(), Some(&2));
        assert_eq!(iter.next_back(), Some(&5));
        assert_eq!(iter.next(), Some(&3));
        assert_eq!(iter.next_back(), Some(&4));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn test_nth_random_access() {
        let ring = wrapped_ring();
        let mut iter = ring.iter();
        assert_eq!(iter.nth(2), Some(&4));
        assert_eq!(iter.next(), Some(&5));
        assert_eq!(ring.iter().nth(10), None);
    }

    #[test]
    fn test_iter_mut_writes_through() {
        let mut ring = wrapped_ring();
        for value in ring.iter_mut() {
            *value *= 10;
        }
        let seen: Vec<i32> = ring.iter().copied().collect();
        assert_eq!(seen, vec![20, 30, 40, 50]);
    }

    #[test]
    fn test_into_iter_drains_in_order() {
        let ring = wrapped_ring();
        let drained: Vec<i32> = ring.into_iter().collect();
        assert_eq!(drained, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_into_iter_back_to_front() {
        let ring = wrapped_ring();
        let drained: Vec<i32> = ring.into_iter().rev().collect();
        assert_eq!(drained, vec![5, 4, 3, 2]);
    }

    #[test]
    fn test_empty_iterator_is_fused() {
        let ring: RingBuffer<i32> = RingBuffer::new();
        let mut iter = ring.iter();
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.len(), 0);
    }
}
