pub mod iter;
pub(crate) mod raw;
pub mod ring;

pub use iter::{IntoIter, Iter, IterMut};
pub use ring::RingBuffer;
