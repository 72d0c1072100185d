//! Variable-length gather.
//!
//! Every rank of a [`comm::ProcessGroup`] contributes a slice of plain-old-data elements of any
//! length, and one root assembles their concatenation, ordered by rank, in a single contiguous
//! buffer. The exchange takes exactly two collective rounds:
//! 1. each rank's element count is gathered to the root, which derives byte displacements by a
//!    prefix sum in rank order;
//! 2. each non-root rank's bytes are received at its displacement. The root's own contribution
//!    is already resident in the destination and never goes through the transport.
//!
//! Elements travel as opaque bytes (`size_of::<T>()` each); there is no serialization or
//! endianness handling.
//!
//! Two shapes of the same protocol:
//! - [`gather_buffer`]: the caller sizes the destination, the total count is returned on root;
//! - [`gather_vec`]: the root's `Vec` grows to the total.
//!
//! [`gather_varlen_vec`] additionally splits the root's result back into per-rank vectors.

mod errors;
pub use errors::GatherError;

mod scratch;
pub use scratch::GatherScratch;

mod gather;
pub use gather::{gather_buffer, gather_varlen_vec, gather_vec};
