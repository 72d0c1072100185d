//! Run with e.g. `mpiexec -n 4 gather-mpi --sizes 2,1,3`.

use clap::Parser;
use comm::{MPIGroup, ProcessGroup};
use mpi::traits::*;

mod executor;
use executor::{run_gather, GatherExecArgs};

fn main() {
    env_logger::init();
    let args = GatherExecArgs::parse();

    let Some(universe) = MPIGroup::init() else {
        log::error!("MPI was already initialized");
        std::process::exit(1);
    };
    let world = universe.world();
    let group = MPIGroup::new(&world);

    if let Err(e) = run_gather(&group, &args) {
        log::error!("rank {}: {e}", group.world_rank());
        world.abort(1);
    }
}
