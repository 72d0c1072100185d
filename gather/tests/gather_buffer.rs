use comm::{LocalGroup, ProcessGroup};
use gather::gather_buffer;

const ROOT: usize = 0;

#[test]
fn test_gather_buffer_three_ranks() {
    let contributions: [&[i32]; 3] = [&[1, 2], &[3], &[4, 5, 6]];

    let results = LocalGroup::spawn_world(3, |group| {
        let rank = group.world_rank();
        let local = contributions[rank];

        let mut buffer = if group.is_root() {
            let mut buffer = vec![0; 6];
            buffer[..local.len()].copy_from_slice(local);
            buffer
        } else {
            local.to_vec()
        };
        let total = gather_buffer(&mut buffer, local.len(), &group, ROOT).unwrap();
        (total, buffer)
    });

    assert_eq!(results[0], (6, vec![1, 2, 3, 4, 5, 6]));
    assert_eq!(results[1], (0, vec![3]));
    assert_eq!(results[2], (0, vec![4, 5, 6]));
}

#[test]
fn test_gather_buffer_total_count() {
    const WORLD_SIZE: usize = 5;

    let results = LocalGroup::spawn_world(WORLD_SIZE, |group| {
        let n_elem = 3 * group.world_rank() + 1;
        let mut buffer = if group.is_root() {
            vec![0u64; 64]
        } else {
            vec![group.world_rank() as u64; n_elem]
        };
        gather_buffer(&mut buffer, n_elem, &group, ROOT).unwrap()
    });

    let expected: usize = (0..WORLD_SIZE).map(|r| 3 * r + 1).sum();
    assert_eq!(results[ROOT], expected);
    assert!(results[1..].iter().all(|&total| total == 0));
}

#[test]
fn test_gather_buffer_leaves_tail_and_root_segment() {
    let results = LocalGroup::spawn_world(3, |group| {
        let rank = group.world_rank();
        if group.is_root() {
            // own contribution at the head, sentinel beyond the eventual total
            let mut buffer = vec![-1i16; 10];
            buffer[..2].copy_from_slice(&[100, 101]);
            let total = gather_buffer(&mut buffer, 2, &group, ROOT).unwrap();
            (total, buffer)
        } else {
            let mut buffer = vec![rank as i16; rank];
            let total = gather_buffer(&mut buffer, rank, &group, ROOT).unwrap();
            (total, buffer)
        }
    });

    let (total, buffer) = &results[ROOT];
    assert_eq!(*total, 5);
    assert_eq!(&buffer[..2], &[100, 101]);
    assert_eq!(&buffer[2..5], &[1, 2, 2]);
    assert!(buffer[5..].iter().all(|&v| v == -1));
}

#[test]
fn test_gather_buffer_partial_local_buffer() {
    // only the first n_elem elements of a non-root buffer are contributed
    let results = LocalGroup::spawn_world(2, |group| {
        if group.is_root() {
            let mut buffer = vec![9u8; 3];
            let total = gather_buffer(&mut buffer, 1, &group, ROOT).unwrap();
            (total, buffer)
        } else {
            let mut buffer = vec![1u8, 2, 3, 4];
            let total = gather_buffer(&mut buffer, 2, &group, ROOT).unwrap();
            (total, buffer)
        }
    });

    assert_eq!(results[0], (3, vec![9, 1, 2]));
    assert_eq!(results[1], (0, vec![1, 2, 3, 4]));
}

#[test]
fn test_gather_buffer_all_empty() {
    let results = LocalGroup::spawn_world(4, |group| {
        let mut buffer = vec![42u32; 3];
        let total = gather_buffer(&mut buffer, 0, &group, ROOT).unwrap();
        (total, buffer)
    });

    for (total, buffer) in results {
        assert_eq!(total, 0);
        assert_eq!(buffer, vec![42; 3]);
    }
}

#[test]
fn test_gather_buffer_non_zero_root() {
    const NON_ZERO_ROOT: usize = 2;
    let contributions: [&[u32]; 4] = [&[0, 0], &[1], &[2, 2, 2], &[3]];

    let results = LocalGroup::spawn_world(4, |group| {
        let rank = group.world_rank();
        let local = contributions[rank];
        let mut buffer = local.to_vec();
        if rank == NON_ZERO_ROOT {
            buffer.resize(7, u32::MAX);
        }
        let total = gather_buffer(&mut buffer, local.len(), &group, NON_ZERO_ROOT).unwrap();
        (total, buffer)
    });

    assert_eq!(results[NON_ZERO_ROOT], (7, vec![0, 0, 1, 2, 2, 2, 3]));
    // the root's own elements moved to its slot, lower ranks now occupy the head
    assert_ne!(results[NON_ZERO_ROOT].1[..3], [2, 2, 2]);
    assert_eq!(results[0], (0, vec![0, 0]));
}
