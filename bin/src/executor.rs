use clap::{Parser, ValueEnum};
use comm::ProcessGroup;
use gather::{gather_buffer, gather_varlen_vec, gather_vec, GatherError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct GatherExecArgs {
    /// Number of ranks in the local world. Ignored under mpirun.
    #[arg(short, long, default_value_t = 3)]
    pub world_size: usize,

    /// Rank that assembles the result
    #[arg(short, long, default_value_t = 0)]
    pub root: usize,

    /// Element counts per rank, comma separated. Ranks beyond the list get generated counts.
    #[arg(short, long, value_delimiter = ',')]
    pub sizes: Vec<usize>,

    /// Exclusive upper bound of generated counts
    #[arg(short, long, default_value_t = 8)]
    pub max_len: usize,

    /// Seed for generated counts
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Gather shape: caller-sized buffer, growable vec, or split per rank
    #[arg(short, long, value_enum, default_value_t = Variant::Vec)]
    pub variant: Variant,

    /// Number of back-to-back gathers; every result must be identical
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    Buffer,
    Vec,
    Split,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Gather(#[from] GatherError),

    #[error("gather {step} assembled {actual} elements in the wrong order, expected 1..={expected}")]
    WrongResult {
        step: usize,
        expected: usize,
        actual: usize,
    },
}

impl GatherExecArgs {
    /// Element count of every rank. Identical on every rank for the same arguments.
    pub fn contribution_sizes(&self, world_size: usize) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..world_size)
            .map(|rank| match self.sizes.get(rank) {
                Some(&size) => size,
                None => rng.gen_range(0..self.max_len.max(1)),
            })
            .collect()
    }
}

/// Rank `r` contributes the next `sizes[r]` integers after those of ranks `0..r`, so the
/// assembled result is always `1..=total`.
fn contribution(sizes: &[usize], rank: usize) -> Vec<u64> {
    let offset: usize = sizes[..rank].iter().sum();
    (offset + 1..=offset + sizes[rank])
        .map(|v| v as u64)
        .collect()
}

fn gather_once<G: ProcessGroup>(
    group: &G,
    variant: Variant,
    sizes: &[usize],
    root: usize,
) -> Result<Vec<u64>, GatherError> {
    let rank = group.world_rank();
    let mut buffer = contribution(sizes, rank);

    match variant {
        Variant::Buffer => {
            let n_elem = buffer.len();
            if rank == root {
                buffer.resize(sizes.iter().sum(), 0);
            }
            let total = gather_buffer(&mut buffer, n_elem, group, root)?;
            if rank == root {
                buffer.truncate(total);
            }
            Ok(buffer)
        }
        Variant::Vec => {
            gather_vec(&mut buffer, group, root)?;
            Ok(buffer)
        }
        Variant::Split => Ok(gather_varlen_vec(&buffer, group, root)?.concat()),
    }
}

/// Run `args.repeat` gathers on `group` and check the root's result every time.
pub fn run_gather<G: ProcessGroup>(group: &G, args: &GatherExecArgs) -> Result<(), ExecError> {
    let sizes = args.contribution_sizes(group.world_size());
    let total: usize = sizes.iter().sum();
    comm::root_info!(
        group,
        "{:?} gather over {} ranks to root {}, sizes {:?}",
        args.variant,
        group.world_size(),
        args.root,
        sizes
    );

    for step in 0..args.repeat {
        let assembled = gather_once(group, args.variant, &sizes, args.root)?;
        if group.world_rank() != args.root {
            continue;
        }

        let in_order = assembled.iter().copied().eq(1..=total as u64);
        if !in_order {
            return Err(ExecError::WrongResult {
                step,
                expected: total,
                actual: assembled.len(),
            });
        }
        log::info!("gather {step}: root assembled {total} elements");
        log::debug!("gather {step}: {assembled:?}");
    }
    Ok(())
}
