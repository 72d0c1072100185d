use comm::CommError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatherError {
    #[error("transport error: {0}")]
    Comm(#[from] CommError),

    #[error("rank {rank} contributes {count} elements, which overflows the byte layout")]
    LayoutOverflow { rank: usize, count: u64 },
}
