use std::{cell::RefCell, ffi::c_void, fmt::Debug};

use mpi::{
    environment::Universe,
    ffi,
    topology::{Process, SimpleCommunicator},
    traits::*,
};

use crate::{CommError, ProcessGroup};

pub struct MPIGroup<'a> {
    pub world: &'a SimpleCommunicator,
    pub world_size: i32,
    pub world_rank: i32,
    // i32 copies of the byte layout handed to MPI_Gatherv, reused across calls
    layout: RefCell<(Vec<i32>, Vec<i32>)>,
}

impl Debug for MPIGroup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MPIGroup")
            .field("world_size", &self.world_size)
            .field("world_rank", &self.world_rank)
            .finish()
    }
}

impl<'a> MPIGroup<'a> {
    /// Initialize the MPI environment.
    /// Returns `None` if MPI was already initialized.
    #[inline]
    pub fn init() -> Option<Universe> {
        mpi::initialize()
    }

    pub fn new(world: &'a SimpleCommunicator) -> Self {
        Self {
            world,
            world_size: world.size(),
            world_rank: world.rank(),
            layout: RefCell::new((vec![], vec![])),
        }
    }

    #[inline(always)]
    pub fn process_at(&self, rank: usize) -> Process {
        self.world.process_at_rank(rank as i32)
    }
}

impl ProcessGroup for MPIGroup<'_> {
    #[inline(always)]
    fn world_size(&self) -> usize {
        self.world_size as usize
    }

    #[inline(always)]
    fn world_rank(&self) -> usize {
        self.world_rank as usize
    }

    fn gather_count_into_root(
        &self,
        count: u64,
        counts: &mut [u64],
        root: usize,
    ) -> Result<(), CommError> {
        self.check_root(root)?;
        assert_eq!(self.world_rank(), root, "root half called on rank {}", self.world_rank);
        assert_eq!(counts.len(), self.world_size(), "one count slot per rank");
        self.process_at(root).gather_into_root(&count, counts);
        Ok(())
    }

    fn gather_count_into(&self, count: u64, root: usize) -> Result<(), CommError> {
        self.check_root(root)?;
        assert_ne!(self.world_rank(), root, "non-root half called on the root");
        self.process_at(root).gather_into(&count);
        Ok(())
    }

    fn gather_bytes_in_place(
        &self,
        recv: &mut [u8],
        byte_counts: &[usize],
        displs: &[usize],
        root: usize,
    ) -> Result<(), CommError> {
        self.check_root(root)?;
        assert_eq!(self.world_rank(), root, "root half called on rank {}", self.world_rank);
        // MPI writes through the raw pointer, every segment must lie inside `recv`
        self.check_layout(recv.len(), byte_counts, displs);

        let mut layout = self.layout.borrow_mut();
        let (counts_i32, displs_i32) = &mut *layout;
        counts_i32.clear();
        displs_i32.clear();
        for (&count, &displ) in byte_counts.iter().zip(displs) {
            counts_i32.push(i32::try_from(count).map_err(|_| CommError::CountOverflow(count))?);
            displs_i32.push(i32::try_from(displ).map_err(|_| CommError::CountOverflow(displ))?);
        }

        // MPI_IN_PLACE: the root's own segment is neither sent nor received
        unsafe {
            ffi::MPI_Gatherv(
                ffi::RSMPI_IN_PLACE,
                0,
                u8::equivalent_datatype().as_raw(),
                recv.as_mut_ptr() as *mut c_void,
                counts_i32.as_ptr(),
                displs_i32.as_ptr(),
                u8::equivalent_datatype().as_raw(),
                root as i32,
                self.world.as_raw(),
            );
        }
        Ok(())
    }

    fn gather_bytes_into(&self, send: &[u8], root: usize) -> Result<(), CommError> {
        self.check_root(root)?;
        assert_ne!(self.world_rank(), root, "non-root half called on the root");
        i32::try_from(send.len()).map_err(|_| CommError::CountOverflow(send.len()))?;
        self.process_at(root).gather_varcount_into(send);
        Ok(())
    }

    #[inline(always)]
    fn barrier(&self) -> Result<(), CommError> {
        self.world.barrier();
        Ok(())
    }
}
