//! Fixed-capacity, overwrite-on-full ring buffer with a blocking
//! producer/consumer wrapper.
//!
//! [`RingBuffer`] is the single-threaded core: raw preallocated storage, an
//! oldest cursor plus a write cursor in a doubled index space (so "empty"
//! and "full" stay distinguishable without an extra flag), overwrite-on-full
//! `push_back`, and random-access iteration in logical order.
//! [`ConcurrentQueue`] layers a mutex and condition variable on top for
//! blocking consumption across threads.
//!
//! ```
//! use carousel::RingBuffer;
//!
//! let mut ring = RingBuffer::with_capacity(3);
//! for value in 1..=4 {
//!     ring.push_back(value);
//! }
//! assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
//! ```

pub mod buffer;
pub mod error;
pub mod queue;

pub use buffer::{IntoIter, Iter, IterMut, RingBuffer};
pub use error::{CarouselError, CarouselResult};
pub use queue::ConcurrentQueue;
