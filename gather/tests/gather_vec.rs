use ark_std::{rand::Rng, test_rng};
use bytemuck::{Pod, Zeroable};
use comm::{LocalGroup, ProcessGroup};
use gather::gather_vec;
use itertools::izip;

#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Particle {
    position: [f64; 3],
    force: [f64; 3],
    id: u64,
}

impl Particle {
    fn new(rank: usize, i: usize) -> Self {
        let x = (rank * 1000 + i) as f64;
        Self {
            position: [x, x + 0.25, x + 0.5],
            force: [-x, 0.0, x * 2.0],
            id: (rank * 1000 + i) as u64,
        }
    }
}

fn local_particles(rank: usize, n: usize) -> Vec<Particle> {
    (0..n).map(|i| Particle::new(rank, i)).collect()
}

#[test]
fn test_gather_vec_three_ranks() {
    let contributions: [&[i64]; 3] = [&[1, 2], &[3], &[4, 5, 6]];

    let results = LocalGroup::spawn_world(3, |group| {
        let mut buffer = contributions[group.world_rank()].to_vec();
        gather_vec(&mut buffer, &group, LocalGroup::ROOT_RANK).unwrap();
        buffer
    });

    assert_eq!(results[0], vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(results[1], vec![3]);
    assert_eq!(results[2], vec![4, 5, 6]);
}

#[test]
fn test_gather_vec_resize_law() {
    const WORLD_SIZE: usize = 6;

    let mut rng = test_rng();
    let sizes: Vec<usize> = (0..WORLD_SIZE).map(|_| rng.gen_range(0..50)).collect();

    for root in 0..WORLD_SIZE {
        let results = LocalGroup::spawn_world(WORLD_SIZE, |group| {
            let rank = group.world_rank();
            let mut buffer = local_particles(rank, sizes[rank]);
            gather_vec(&mut buffer, &group, root).unwrap();
            buffer
        });

        let assembled = &results[root];
        assert_eq!(assembled.len(), sizes.iter().sum::<usize>());

        let mut offset = 0;
        for (rank, &size) in sizes.iter().enumerate() {
            let segment = &assembled[offset..offset + size];
            izip!(segment, local_particles(rank, size)).for_each(|(got, want)| {
                assert_eq!(*got, want);
            });
            offset += size;
        }

        // non-root sequences are untouched
        for (rank, buffer) in results.iter().enumerate().filter(|(r, _)| *r != root) {
            assert_eq!(*buffer, local_particles(rank, sizes[rank]));
        }
    }
}

#[test]
fn test_gather_vec_deterministic() {
    const WORLD_SIZE: usize = 4;

    let run = || {
        LocalGroup::spawn_world(WORLD_SIZE, |group| {
            let rank = group.world_rank();
            let mut assembled = Vec::new();
            // repeated gathers on the same group, same inputs every time
            for step in 0..5 {
                let mut buffer: Vec<u32> = (0..rank * 2 + step % 2)
                    .map(|i| (rank * 100 + i) as u32)
                    .collect();
                gather_vec(&mut buffer, &group, 0).unwrap();
                if group.is_root() {
                    assembled.push(buffer);
                }
            }
            assembled
        })
        .swap_remove(0)
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first[0], first[2]);
    assert_eq!(first[1], first[3]);
}

#[test]
fn test_gather_vec_zero_contributions() {
    let results = LocalGroup::spawn_world(3, |group| {
        let mut buffer: Vec<f32> = Vec::new();
        gather_vec(&mut buffer, &group, 1).unwrap();
        buffer
    });
    assert!(results.iter().all(|buffer| buffer.is_empty()));

    // only the root has data
    let results = LocalGroup::spawn_world(3, |group| {
        let mut buffer = if group.world_rank() == 1 {
            vec![0.5f32, 1.5]
        } else {
            vec![]
        };
        gather_vec(&mut buffer, &group, 1).unwrap();
        buffer
    });
    assert_eq!(results[1], vec![0.5, 1.5]);
}
