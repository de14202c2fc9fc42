#![allow(dead_code)]

use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;

/// Per-test live-instance tracker: every `Counted` it makes (or a clone of
/// one) increments the count, every drop decrements it. A test asserts
/// `live() == 0` after tearing a container down to prove the container
/// destroyed exactly what it owned.
#[derive(Default)]
pub struct Counter {
    live: Arc<AtomicUsize>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn make(&self, value: i32) -> Counted {
        self.live.fetch_add(1, Ordering::SeqCst);
        Counted {
            value,
            live: Arc::clone(&self.live),
        }
    }
}

#[derive(Debug)]
pub struct Counted {
    value: i32,
    live: Arc<AtomicUsize>,
}

impl Counted {
    pub fn value(&self) -> i32 {
        self.value
    }
}

impl Clone for Counted {
    fn clone(&self) -> Self {
        self.live.fetch_add(1, Ordering::SeqCst);
        Self {
            value: self.value,
            live: Arc::clone(&self.live),
        }
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PartialEq for Counted {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Fault-injection rig: instances it makes count like [`Counted`], but each
/// clone burns one unit of a shared fuse and panics once the fuse is spent.
/// Lets a test trigger a "construction failure" at an exact point and then
/// check what the container left behind.
pub struct FaultRig {
    live: Arc<AtomicUsize>,
    fuse: Arc<AtomicIsize>,
}

impl FaultRig {
    /// `clones_before_panic` clones succeed; the next one panics.
    pub fn new(clones_before_panic: isize) -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            fuse: Arc::new(AtomicIsize::new(clones_before_panic)),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Direct construction never consumes the fuse.
    pub fn make(&self, value: i32) -> FaultyClone {
        self.live.fetch_add(1, Ordering::SeqCst);
        FaultyClone {
            value,
            live: Arc::clone(&self.live),
            fuse: Arc::clone(&self.fuse),
        }
    }
}

#[derive(Debug)]
pub struct FaultyClone {
    value: i32,
    live: Arc<AtomicUsize>,
    fuse: Arc<AtomicIsize>,
}

impl FaultyClone {
    pub fn value(&self) -> i32 {
        self.value
    }
}

impl Clone for FaultyClone {
    fn clone(&self) -> Self {
        if self.fuse.fetch_sub(1, Ordering::SeqCst) <= 0 {
            panic!("injected clone fault");
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        Self {
            value: self.value,
            live: Arc::clone(&self.live),
            fuse: Arc::clone(&self.fuse),
        }
    }
}

impl Drop for FaultyClone {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
