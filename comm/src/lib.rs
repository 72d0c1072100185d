//! Process groups for collective communication.
//!
//! - [`ProcessGroup`]: the transport API a collective is written against: rank and size queries,
//!   a one-count-per-rank gather, and a variable-length byte gather with per-rank counts and
//!   displacements.
//! - [`LocalGroup`]: every rank is a thread of the current process, links are channels.
//! - `MPIGroup` (feature `mpi`): every rank is an MPI process of a communicator.

mod definition;
pub use definition::ProcessGroup;

mod errors;
pub use errors::CommError;

mod local;
pub use local::LocalGroup;

#[cfg(feature = "mpi")]
mod mpi_group;
#[cfg(feature = "mpi")]
pub use mpi_group::MPIGroup;

#[doc(hidden)]
pub use log;

/// Log at info level on the default root rank only. `$group` is a reference to a
/// [`ProcessGroup`].
#[macro_export]
macro_rules! root_info {
    ($group: expr, $($arg:tt)*) => {
        if $crate::ProcessGroup::is_root($group) {
            $crate::log::info!($($arg)*);
        }
    };
}
