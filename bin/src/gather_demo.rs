use std::process::exit;

use clap::Parser;
use comm::LocalGroup;

mod executor;
use executor::{run_gather, GatherExecArgs};

fn main() {
    env_logger::init();
    let args = GatherExecArgs::parse();
    if args.world_size == 0 {
        log::error!("a process group needs at least one rank");
        exit(1);
    }

    let outcomes = LocalGroup::spawn_world(args.world_size, |group| {
        let outcome = run_gather(&group, &args);
        if outcome.is_err() {
            // no partial results: release every rank still blocked in the collective
            group.abort();
        }
        outcome
    });

    let mut failed = false;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        if let Err(e) = outcome {
            log::error!("rank {rank}: {e}");
            failed = true;
        }
    }
    if failed {
        exit(1);
    }
}
