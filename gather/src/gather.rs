//! Entry points backed by a per-thread [`GatherScratch`].
//!
//! The scratch is borrowed for the duration of one call; starting a second gather on the same
//! thread while one is in flight panics. Use an explicit [`GatherScratch`] per concurrent gather
//! instead.

use std::cell::RefCell;

use bytemuck::Pod;
use comm::ProcessGroup;

use crate::{GatherError, GatherScratch};

thread_local! {
    static SCRATCH: RefCell<GatherScratch> = const { RefCell::new(GatherScratch::new()) };
}

/// See [`GatherScratch::gather_buffer`]. Pass `G::ROOT_RANK` for the default root.
#[inline]
pub fn gather_buffer<T: Pod, G: ProcessGroup>(
    buffer: &mut [T],
    n_elem: usize,
    group: &G,
    root: usize,
) -> Result<usize, GatherError> {
    SCRATCH.with_borrow_mut(|scratch| scratch.gather_buffer(buffer, n_elem, group, root))
}

/// See [`GatherScratch::gather_vec`].
#[inline]
pub fn gather_vec<T: Pod, G: ProcessGroup>(
    buffer: &mut Vec<T>,
    group: &G,
    root: usize,
) -> Result<(), GatherError> {
    SCRATCH.with_borrow_mut(|scratch| scratch.gather_vec(buffer, group, root))
}

/// See [`GatherScratch::gather_varlen_vec`].
#[inline]
pub fn gather_varlen_vec<T: Pod, G: ProcessGroup>(
    local: &[T],
    group: &G,
    root: usize,
) -> Result<Vec<Vec<T>>, GatherError> {
    SCRATCH.with_borrow_mut(|scratch| scratch.gather_varlen_vec(local, group, root))
}
