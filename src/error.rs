use thiserror::Error;

pub type CarouselResult<T, E = CarouselError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum CarouselError {
    #[error("Allocation failure: {requested} slots of {elem_size} bytes")]
    AllocationFailure { requested: usize, elem_size: usize },

    #[error("Capacity overflow: {0}")]
    CapacityOverflow(String),
}
