use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommError {
    #[error("root rank {root} is out of range for a group of {world_size} processes")]
    InvalidRoot { root: usize, world_size: usize },

    #[error("rank {0} left the group before the collective completed")]
    PeerDisconnected(usize),

    #[error("the process group was aborted by a failing rank")]
    GroupAborted,

    #[error("expected {expected} bytes from rank {rank}, received {actual}")]
    LengthMismatch {
        rank: usize,
        expected: usize,
        actual: usize,
    },

    #[error("rank {rank} sent a message out of order, expected {expected}")]
    ProtocolMismatch { rank: usize, expected: &'static str },

    #[error("count {0} exceeds the transport limit")]
    CountOverflow(usize),
}
