//! An in-process process group: every rank is a thread, every link is a channel.
//!
//! Assumptions
//! 1. Each endpoint is owned by exactly one thread. Endpoints are `Send` but not `Sync`.
//! 2. Messages between a pair of ranks arrive in the order they were sent. Messages from other
//!    sources that arrive early are stashed until the collective asks for them.
//! 3. A rank that unwinds while holding its endpoint aborts the whole group: every pending and
//!    future receive on the other ranks fails with [`CommError::GroupAborted`].

use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt::Debug,
    panic,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::Duration,
};

use crate::{CommError, ProcessGroup};

/// How often a blocked receive checks whether the group was aborted.
const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
enum Message {
    Count(u64),
    Bytes(Vec<u8>),
    Release,
}

type Envelope = (usize, Message);

pub struct LocalGroup {
    world_size: usize,
    world_rank: usize,
    // indexed by destination rank, `None` for ourselves
    senders: Vec<Option<mpsc::Sender<Envelope>>>,
    receiver: mpsc::Receiver<Envelope>,
    // indexed by source rank
    pending: RefCell<Vec<VecDeque<Message>>>,
    aborted: Arc<AtomicBool>,
}

impl Debug for LocalGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalGroup")
            .field("world_size", &self.world_size)
            .field("world_rank", &self.world_rank)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

impl LocalGroup {
    /// Build the endpoints of a fresh group, indexed by rank.
    pub fn world(world_size: usize) -> Vec<Self> {
        assert!(world_size > 0, "a process group needs at least one rank");

        let aborted = Arc::new(AtomicBool::new(false));
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..world_size).map(|_| mpsc::channel::<Envelope>()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(world_rank, receiver)| Self {
                world_size,
                world_rank,
                senders: senders
                    .iter()
                    .enumerate()
                    .map(|(dest, sender)| (dest != world_rank).then(|| sender.clone()))
                    .collect(),
                receiver,
                pending: RefCell::new((0..world_size).map(|_| VecDeque::new()).collect()),
                aborted: aborted.clone(),
            })
            .collect()
    }

    /// Run `f` once per rank, each on its own thread, and return the results in rank order.
    ///
    /// A panic on any rank aborts the group and is re-raised here once every rank has finished.
    pub fn spawn_world<R, F>(world_size: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(LocalGroup) -> R + Sync,
    {
        let f = &f;
        thread::scope(|scope| {
            let handles = Self::world(world_size)
                .into_iter()
                .map(|group| scope.spawn(move || f(group)))
                .collect::<Vec<_>>();

            let joined = handles.into_iter().map(|h| h.join()).collect::<Vec<_>>();
            let mut results = Vec::with_capacity(world_size);
            for outcome in joined {
                match outcome {
                    Ok(result) => results.push(result),
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            results
        })
    }

    /// Mark the whole group as failed. Blocked receives on other ranks return
    /// [`CommError::GroupAborted`].
    pub fn abort(&self) {
        if !self.aborted.swap(true, Ordering::AcqRel) {
            log::error!("rank {} aborted the local process group", self.world_rank);
        }
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    fn send_to(&self, dest: usize, message: Message) -> Result<(), CommError> {
        let Some(sender) = &self.senders[dest] else {
            unreachable!("rank {dest} has no channel to itself")
        };
        sender
            .send((self.world_rank, message))
            .map_err(|_| CommError::PeerDisconnected(dest))
    }

    fn recv_from(&self, source: usize) -> Result<Message, CommError> {
        if let Some(message) = self.pending.borrow_mut()[source].pop_front() {
            return Ok(message);
        }

        loop {
            match self.receiver.recv_timeout(ABORT_POLL_INTERVAL) {
                Ok((from, message)) if from == source => return Ok(message),
                Ok((from, message)) => self.pending.borrow_mut()[from].push_back(message),
                Err(RecvTimeoutError::Timeout) => {
                    if self.is_aborted() {
                        return Err(CommError::GroupAborted);
                    }
                }
                // an unwinding rank raises the flag before its senders are dropped
                Err(RecvTimeoutError::Disconnected) if self.is_aborted() => {
                    return Err(CommError::GroupAborted)
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CommError::PeerDisconnected(source))
                }
            }
        }
    }

    fn recv_release(&self, source: usize) -> Result<(), CommError> {
        match self.recv_from(source)? {
            Message::Release => Ok(()),
            _ => Err(CommError::ProtocolMismatch {
                rank: source,
                expected: "barrier release",
            }),
        }
    }
}

impl Drop for LocalGroup {
    fn drop(&mut self) {
        if thread::panicking() {
            self.abort();
        }
    }
}

impl ProcessGroup for LocalGroup {
    #[inline(always)]
    fn world_size(&self) -> usize {
        self.world_size
    }

    #[inline(always)]
    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn gather_count_into_root(
        &self,
        count: u64,
        counts: &mut [u64],
        root: usize,
    ) -> Result<(), CommError> {
        self.check_root(root)?;
        assert_eq!(self.world_rank, root, "root half called on rank {}", self.world_rank);
        assert_eq!(counts.len(), self.world_size, "one count slot per rank");

        for (rank, slot) in counts.iter_mut().enumerate() {
            if rank == root {
                *slot = count;
                continue;
            }
            *slot = match self.recv_from(rank)? {
                Message::Count(count) => count,
                _ => {
                    return Err(CommError::ProtocolMismatch {
                        rank,
                        expected: "count",
                    })
                }
            };
        }
        Ok(())
    }

    fn gather_count_into(&self, count: u64, root: usize) -> Result<(), CommError> {
        self.check_root(root)?;
        assert_ne!(self.world_rank, root, "non-root half called on the root");
        self.send_to(root, Message::Count(count))
    }

    fn gather_bytes_in_place(
        &self,
        recv: &mut [u8],
        byte_counts: &[usize],
        displs: &[usize],
        root: usize,
    ) -> Result<(), CommError> {
        self.check_root(root)?;
        assert_eq!(self.world_rank, root, "root half called on rank {}", self.world_rank);
        self.check_layout(recv.len(), byte_counts, displs);

        for rank in 0..self.world_size {
            // the root's segment is already where it belongs
            if rank == root {
                continue;
            }
            let bytes = match self.recv_from(rank)? {
                Message::Bytes(bytes) => bytes,
                _ => {
                    return Err(CommError::ProtocolMismatch {
                        rank,
                        expected: "bytes",
                    })
                }
            };
            if bytes.len() != byte_counts[rank] {
                return Err(CommError::LengthMismatch {
                    rank,
                    expected: byte_counts[rank],
                    actual: bytes.len(),
                });
            }
            recv[displs[rank]..displs[rank] + bytes.len()].copy_from_slice(&bytes);
        }
        Ok(())
    }

    fn gather_bytes_into(&self, send: &[u8], root: usize) -> Result<(), CommError> {
        self.check_root(root)?;
        assert_ne!(self.world_rank, root, "non-root half called on the root");
        self.send_to(root, Message::Bytes(send.to_vec()))
    }

    fn barrier(&self) -> Result<(), CommError> {
        let root = Self::ROOT_RANK;
        if self.world_rank == root {
            for rank in (0..self.world_size).filter(|&r| r != root) {
                self.recv_release(rank)?;
            }
            for rank in (0..self.world_size).filter(|&r| r != root) {
                self.send_to(rank, Message::Release)?;
            }
            Ok(())
        } else {
            self.send_to(root, Message::Release)?;
            self.recv_release(root)
        }
    }
}
