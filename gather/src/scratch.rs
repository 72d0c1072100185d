use std::mem::size_of;

use bytemuck::Pod;
use comm::ProcessGroup;

use crate::GatherError;

/// Per-rank sizes and byte layout of a gather, kept between calls so the root does not
/// reallocate them on every timestep.
///
/// Every root-side call resizes the vectors to the group size and overwrites every entry before
/// any of them is read; nothing carries over from one call to the next. A scratch serves one
/// gather at a time (all entry points take `&mut self`).
#[derive(Debug, Default, Clone)]
pub struct GatherScratch {
    sizes: Vec<u64>,
    byte_counts: Vec<usize>,
    displs: Vec<usize>,
}

#[inline]
fn assert_elem_size<T>() {
    assert!(
        size_of::<T>() > 0,
        "zero-sized element types cannot be gathered as bytes"
    );
}

impl GatherScratch {
    #[inline]
    pub const fn new() -> Self {
        Self {
            sizes: Vec::new(),
            byte_counts: Vec::new(),
            displs: Vec::new(),
        }
    }

    /// Element count of every rank, from the last gather this scratch served as root.
    #[inline]
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Byte length of every rank's segment, from the last gather this scratch served as root.
    #[inline]
    pub fn byte_counts(&self) -> &[usize] {
        &self.byte_counts
    }

    /// Byte offset of every rank's segment, from the last gather this scratch served as root.
    #[inline]
    pub fn displacements(&self) -> &[usize] {
        &self.displs
    }

    /// Gather into a caller-sized buffer.
    ///
    /// On every rank the local contribution is `buffer[..n_elem]`. On `root` the buffer is also
    /// the destination: it must already hold the root's contribution at its head and be large
    /// enough for the concatenation of all contributions. Afterwards `buffer[..total]` holds
    /// every rank's contribution in ascending rank order.
    ///
    /// Returns the total element count on `root` and 0 on every other rank. Non-root buffers are
    /// never written.
    ///
    /// For a `root` other than rank 0 the root's contribution is first moved from the head of the
    /// buffer to its rank slot, and the head is then overwritten by the lower ranks. Do not expect
    /// the root's own data at `buffer[..n_elem]` afterwards.
    ///
    /// # Panics
    /// If `n_elem > buffer.len()`, or if on `root` the buffer is shorter than the total.
    pub fn gather_buffer<T: Pod, G: ProcessGroup>(
        &mut self,
        buffer: &mut [T],
        n_elem: usize,
        group: &G,
        root: usize,
    ) -> Result<usize, GatherError> {
        assert_elem_size::<T>();
        assert!(
            n_elem <= buffer.len(),
            "local contribution of {} elements exceeds the buffer of {}",
            n_elem,
            buffer.len()
        );

        let Some(total) = self.exchange_sizes(group, n_elem, size_of::<T>(), root)? else {
            group.gather_bytes_into(bytemuck::cast_slice(&buffer[..n_elem]), root)?;
            return Ok(0);
        };

        assert!(
            buffer.len() >= total,
            "destination holds {} elements but the gather delivers {}",
            buffer.len(),
            total
        );
        self.receive(bytemuck::cast_slice_mut(&mut buffer[..total]), group, root)?;
        Ok(total)
    }

    /// Gather into a growable buffer.
    ///
    /// The local contribution is the whole of `buffer`. On `root` the buffer grows to the total
    /// length, its existing elements are kept as the root's contribution, and the other ranks'
    /// contributions are filled in around it in ascending rank order. Non-root buffers are left
    /// untouched. As with [`Self::gather_buffer`], a root other than rank 0 finds its own
    /// elements moved to its rank slot.
    pub fn gather_vec<T: Pod, G: ProcessGroup>(
        &mut self,
        buffer: &mut Vec<T>,
        group: &G,
        root: usize,
    ) -> Result<(), GatherError> {
        assert_elem_size::<T>();

        let Some(total) = self.exchange_sizes(group, buffer.len(), size_of::<T>(), root)? else {
            group.gather_bytes_into(bytemuck::cast_slice(buffer.as_slice()), root)?;
            return Ok(());
        };

        buffer.resize(total, T::zeroed());
        self.receive(bytemuck::cast_slice_mut(buffer.as_mut_slice()), group, root)
    }

    /// Gather every rank's contribution to `root`, kept apart: the result holds one vector per
    /// rank, in rank order. Non-root ranks get an empty vector.
    pub fn gather_varlen_vec<T: Pod, G: ProcessGroup>(
        &mut self,
        local: &[T],
        group: &G,
        root: usize,
    ) -> Result<Vec<Vec<T>>, GatherError> {
        assert_elem_size::<T>();
        if group.world_rank() != root {
            self.exchange_sizes(group, local.len(), size_of::<T>(), root)?;
            group.gather_bytes_into(bytemuck::cast_slice(local), root)?;
            return Ok(vec![]);
        }

        let mut assembled = local.to_vec();
        self.gather_vec(&mut assembled, group, root)?;

        let mut rest = assembled.as_slice();
        Ok(self
            .sizes
            .iter()
            .map(|&count| {
                let (head, tail) = rest.split_at(count as usize);
                rest = tail;
                head.to_vec()
            })
            .collect())
    }

    /// Phase 1. Every rank reports its element count to `root`, which then lays out the
    /// destination. Returns the total element count on `root` and `None` elsewhere.
    fn exchange_sizes<G: ProcessGroup>(
        &mut self,
        group: &G,
        n_elem: usize,
        elem_size: usize,
        root: usize,
    ) -> Result<Option<usize>, GatherError> {
        group.check_root(root)?;
        log::trace!(
            "rank {} contributes {} elements to root {}",
            group.world_rank(),
            n_elem,
            root
        );

        if group.world_rank() != root {
            group.gather_count_into(n_elem as u64, root)?;
            return Ok(None);
        }

        self.sizes.resize(group.world_size(), 0);
        group.gather_count_into_root(n_elem as u64, &mut self.sizes, root)?;
        self.layout(elem_size).map(Some)
    }

    /// Byte lengths and displacements in rank order, from `sizes`.
    fn layout(&mut self, elem_size: usize) -> Result<usize, GatherError> {
        self.byte_counts.clear();
        self.displs.clear();

        let mut total = 0usize;
        let mut offset = 0usize;
        for (rank, &count) in self.sizes.iter().enumerate() {
            let overflow = move || GatherError::LayoutOverflow { rank, count };
            let n_elem = usize::try_from(count).map_err(|_| overflow())?;
            let bytes = n_elem.checked_mul(elem_size).ok_or_else(overflow)?;

            self.byte_counts.push(bytes);
            self.displs.push(offset);

            offset = offset.checked_add(bytes).ok_or_else(overflow)?;
            // bounded by `offset` since elem_size >= 1
            total += n_elem;
        }
        Ok(total)
    }

    /// Phase 2 on root. `bytes` is the destination, with the root's contribution at its head.
    fn receive<G: ProcessGroup>(
        &self,
        bytes: &mut [u8],
        group: &G,
        root: usize,
    ) -> Result<(), GatherError> {
        // for root 0 the head is already the root's slot and nothing moves
        let (displ, len) = (self.displs[root], self.byte_counts[root]);
        if displ != 0 && len != 0 {
            bytes.copy_within(0..len, displ);
        }

        group.gather_bytes_in_place(bytes, &self.byte_counts, &self.displs, root)?;
        log::debug!(
            "root {} assembled {} bytes from {} ranks",
            root,
            bytes.len(),
            self.sizes.len()
        );
        Ok(())
    }
}
