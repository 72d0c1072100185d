use crate::CommError;

/// A fixed, already-formed group of cooperating processes.
///
/// Every method that moves data is a collective: all members must call it with the same `root`
/// and in the same order as every other collective, or the call never completes. Root-side and
/// non-root-side halves are separate methods, the caller picks the one matching its rank.
pub trait ProcessGroup {
    /// The rank that collects results when the caller has no preference.
    const ROOT_RANK: usize = 0;

    /// Get the number of processes in the group
    fn world_size(&self) -> usize;

    /// Get the rank of the current process
    fn world_rank(&self) -> usize;

    #[inline(always)]
    /// Check if there is only one process in the group
    fn is_single_process(&self) -> bool {
        self.world_size() == 1
    }

    #[inline(always)]
    /// Check if the current process is the default root process
    fn is_root(&self) -> bool {
        self.world_rank() == Self::ROOT_RANK
    }

    /// Reject a root rank outside `[0, world_size)`.
    #[inline]
    fn check_root(&self, root: usize) -> Result<(), CommError> {
        if root < self.world_size() {
            Ok(())
        } else {
            Err(CommError::InvalidRoot {
                root,
                world_size: self.world_size(),
            })
        }
    }

    /// Assert that a byte layout has one entry per rank and that every segment lies inside a
    /// receive buffer of `recv_len` bytes.
    ///
    /// # Panics
    /// On any violation.
    fn check_layout(&self, recv_len: usize, byte_counts: &[usize], displs: &[usize]) {
        assert_eq!(byte_counts.len(), self.world_size(), "one byte count per rank");
        assert_eq!(displs.len(), self.world_size(), "one displacement per rank");
        for (rank, (&count, &displ)) in byte_counts.iter().zip(displs).enumerate() {
            assert!(
                displ.checked_add(count).is_some_and(|end| end <= recv_len),
                "segment of rank {} at {}..+{} exceeds the receive buffer of {} bytes",
                rank,
                displ,
                count,
                recv_len
            );
        }
    }

    /// Root half of the count exchange: `counts[r]` receives the count of rank `r`.
    /// `counts` must hold exactly `world_size` entries.
    fn gather_count_into_root(
        &self,
        count: u64,
        counts: &mut [u64],
        root: usize,
    ) -> Result<(), CommError>;

    /// Non-root half of the count exchange.
    fn gather_count_into(&self, count: u64, root: usize) -> Result<(), CommError>;

    /// Root half of the byte exchange.
    ///
    /// Rank `r`'s bytes land at `recv[displs[r]..displs[r] + byte_counts[r]]`. The root's own
    /// segment is already resident at `displs[root]` and is never sent, received or written.
    fn gather_bytes_in_place(
        &self,
        recv: &mut [u8],
        byte_counts: &[usize],
        displs: &[usize],
        root: usize,
    ) -> Result<(), CommError>;

    /// Non-root half of the byte exchange.
    fn gather_bytes_into(&self, send: &[u8], root: usize) -> Result<(), CommError>;

    /// Barrier for all the processes
    fn barrier(&self) -> Result<(), CommError>;
}
