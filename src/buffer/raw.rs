use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};

use crate::error::{CarouselError, CarouselResult};

/// Exclusively-owned block of `capacity` uninitialized slots of `T`.
///
/// Element lifetimes are managed by the owner through the slot primitives
/// below; dropping a `RawStorage` releases the memory and nothing else, so
/// release happens on every exit path, including unwinds out of element
/// construction.
pub(crate) struct RawStorage<T> {
    ptr: NonNull<T>,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T> RawStorage<T> {
    /// No allocation, zero capacity.
    pub(crate) const fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            _marker: PhantomData,
        }
    }

    /// Allocates `capacity` uninitialized slots.
    ///
    /// Zero capacity and zero-sized element types allocate nothing. Capacity
    /// is capped at `isize::MAX` so the doubled index space `[0, 2 * capacity)`
    /// always fits in `usize`.
    pub(crate) fn allocate(capacity: usize) -> CarouselResult<Self> {
        if capacity > isize::MAX as usize {
            return Err(CarouselError::CapacityOverflow(format!(
                "capacity {capacity} exceeds isize::MAX"
            )));
        }
        if capacity == 0 || mem::size_of::<T>() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                capacity,
                _marker: PhantomData,
            });
        }
        let layout = Layout::array::<T>(capacity).map_err(|e| {
            CarouselError::CapacityOverflow(format!("layout for {capacity} slots: {e}"))
        })?;
        let raw = unsafe { alloc::alloc(layout) } as *mut T;
        match NonNull::new(raw) {
            Some(ptr) => Ok(Self {
                ptr,
                capacity,
                _marker: PhantomData,
            }),
            None => Err(CarouselError::AllocationFailure {
                requested: capacity,
                elem_size: mem::size_of::<T>(),
            }),
        }
    }

    /// Infallible allocation for paths that cannot surface an error
    /// (`Clone`, `FromIterator`). Diverges through `handle_alloc_error` like
    /// the std containers.
    pub(crate) fn allocate_unbounded(capacity: usize) -> Self {
        match Self::allocate(capacity) {
            Ok(storage) => storage,
            Err(CarouselError::AllocationFailure { .. }) => match Layout::array::<T>(capacity) {
                Ok(layout) => alloc::handle_alloc_error(layout),
                Err(_) => panic!("capacity overflow"),
            },
            Err(_) => panic!("capacity overflow"),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn base(&self) -> NonNull<T> {
        self.ptr
    }

    /// Pointer to a physical slot; the slot may be uninitialized.
    pub(crate) fn slot(&self, physical: usize) -> *mut T {
        debug_assert!(physical < self.capacity);
        unsafe { self.ptr.as_ptr().add(physical) }
    }

    /// # Safety
    /// `physical` must be in bounds and the slot uninitialized (or previously
    /// moved out); old contents are not dropped.
    pub(crate) unsafe fn write(&mut self, physical: usize, value: T) {
        ptr::write(self.slot(physical), value);
    }

    /// # Safety
    /// `physical` must hold a live element; afterwards the slot counts as
    /// uninitialized again.
    pub(crate) unsafe fn read(&mut self, physical: usize) -> T {
        ptr::read(self.slot(physical))
    }

    /// # Safety
    /// Same contract as `read`, dropping the element in place instead of
    /// returning it.
    pub(crate) unsafe fn drop_in_place(&mut self, physical: usize) {
        ptr::drop_in_place(self.slot(physical));
    }

    /// Drops every element in the doubled-space range `[from, to)`, splitting
    /// it into at most two contiguous physical runs.
    ///
    /// # Safety
    /// The whole range must hold live elements, with
    /// `from <= to <= from + capacity` in the doubled index space.
    pub(crate) unsafe fn drop_doubled_range(&mut self, from: usize, to: usize) {
        debug_assert!(from <= to && to <= from + self.capacity);
        if !mem::needs_drop::<T>() || from == to {
            return;
        }
        let cap = self.capacity;
        if from >= cap {
            self.drop_run(from - cap, to - from);
        } else if to <= cap {
            self.drop_run(from, to - from);
        } else {
            self.drop_run(from, cap - from);
            self.drop_run(0, to - cap);
        }
    }

    /// # Safety
    /// `[physical, physical + len)` must be in bounds and hold live elements.
    unsafe fn drop_run(&mut self, physical: usize, len: usize) {
        ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.slot(physical), len));
    }
}

impl<T> Drop for RawStorage<T> {
    fn drop(&mut self) {
        if self.capacity == 0 || mem::size_of::<T>() == 0 {
            return;
        }
        // The layout was validated when the block was allocated.
        if let Ok(layout) = Layout::array::<T>(self.capacity) {
            unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout) };
        }
    }
}
