use super::{Communicator, Tag};
use crate::error::{Error, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

enum Signal {
    Message(Tag, Box<dyn Any + Send>),
    /// The sending endpoint was dropped.
    Hangup,
}

struct Envelope {
    source: usize,
    signal: Signal,
}

/// In-process [`Communicator`]: each worker owns one endpoint (and normally runs on
/// its own thread), endpoints only talk through channels.
///
/// Every rank has a single inbox. Messages that arrive from a rank other than the one
/// currently awaited are parked, so per-source ordering is preserved like in MPI.
/// Dropping an endpoint sends a hang-up to all peers; a peer waiting on that rank
/// then fails with [`Error::PeerExited`] instead of blocking forever.
pub struct LocalCommunicator {
    rank: usize,
    outboxes: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    parked: RefCell<VecDeque<Envelope>>,
    timeout: Option<Duration>,
}
impl LocalCommunicator {
    /// Create the `world` connected endpoints of one group, ordered by rank.
    /// Receives block without limit.
    pub fn group(world: usize) -> Vec<LocalCommunicator> {
        Self::build_group(world, None)
    }

    /// Like [`LocalCommunicator::group`], but every receive gives up after `timeout`
    /// with [`Error::Timeout`].
    pub fn group_with_timeout(world: usize, timeout: Duration) -> Vec<LocalCommunicator> {
        Self::build_group(world, Some(timeout))
    }

    fn build_group(world: usize, timeout: Option<Duration>) -> Vec<LocalCommunicator> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..world).map(|_| unbounded()).unzip();
        receivers.into_iter().enumerate()
            .map(|(rank, inbox)| LocalCommunicator {
                rank,
                outboxes: senders.clone(),
                inbox,
                parked: RefCell::new(VecDeque::new()),
                timeout,
            })
            .collect()
    }

    fn next_envelope(&self, source: usize) -> Result<Envelope> {
        match self.timeout {
            None => self.inbox.recv().map_err(|_| Error::PeerExited { rank: source }),
            Some(timeout) => self.inbox.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => Error::Timeout { rank: source },
                RecvTimeoutError::Disconnected => Error::PeerExited { rank: source },
            }),
        }
    }

    fn open<T: Send + 'static>(envelope: Envelope, expected: Tag) -> Result<T> {
        match envelope.signal {
            Signal::Hangup => Err(Error::PeerExited { rank: envelope.source }),
            Signal::Message(tag, _) if tag != expected => Err(Error::Protocol(format!(
                "expected {:?} from rank {}, received {:?}", expected, envelope.source, tag
            ))),
            Signal::Message(tag, body) => body.downcast::<T>().map(|b| *b).map_err(|_| {
                Error::Protocol(format!("unexpected payload type in {:?} from rank {}", tag, envelope.source))
            }),
        }
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize { self.rank }
    fn world_size(&self) -> usize { self.outboxes.len() }

    fn send<T: Send + 'static>(&self, dest: usize, tag: Tag, value: T) -> Result<()> {
        let outbox = self.outboxes.get(dest)
            .ok_or_else(|| Error::Protocol(format!("rank {} does not exist", dest)))?;
        outbox.send(Envelope { source: self.rank, signal: Signal::Message(tag, Box::new(value)) })
            .map_err(|_| Error::PeerExited { rank: dest })
    }

    fn recv<T: Send + 'static>(&self, source: usize, tag: Tag) -> Result<T> {
        let parked = {
            let mut parked = self.parked.borrow_mut();
            parked.iter().position(|e| e.source == source).and_then(|pos| parked.remove(pos))
        };
        if let Some(envelope) = parked {
            return Self::open(envelope, tag);
        }
        loop {
            let envelope = self.next_envelope(source)?;
            if envelope.source == source {
                return Self::open(envelope, tag);
            }
            self.parked.borrow_mut().push_back(envelope);
        }
    }
}

impl Drop for LocalCommunicator {
    fn drop(&mut self) {
        for (dest, outbox) in self.outboxes.iter().enumerate() {
            if dest != self.rank {
                // peers that already left have dropped their inbox
                let _ = outbox.send(Envelope { source: self.rank, signal: Signal::Hangup });
            }
        }
    }
}

/// Run `f` once per rank of a fresh group of `world` workers, each on its own
/// scoped thread, and return the results in rank order.
pub fn spawn_group<R, F>(world: usize, f: F) -> Vec<R>
where
    F: Fn(LocalCommunicator) -> R + Sync,
    R: Send,
{
    spawn_endpoints(LocalCommunicator::group(world), f)
}

/// Like [`spawn_group`], but every receive of the group gives up after `timeout`
/// with [`Error::Timeout`].
pub fn spawn_group_with_timeout<R, F>(world: usize, timeout: Duration, f: F) -> Vec<R>
where
    F: Fn(LocalCommunicator) -> R + Sync,
    R: Send,
{
    spawn_endpoints(LocalCommunicator::group_with_timeout(world, timeout), f)
}

fn spawn_endpoints<R, F>(endpoints: Vec<LocalCommunicator>, f: F) -> Vec<R>
where
    F: Fn(LocalCommunicator) -> R + Sync,
    R: Send,
{
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = endpoints.into_iter()
            .map(|comm| s.spawn(move || f(comm)))
            .collect();
        handles.into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::PartitionTable;

    #[test]
    fn broadcast_reaches_every_rank() {
        let results = spawn_group(4, |comm| {
            let mut value = if comm.rank() == 0 { vec![7u8, 8, 9] } else { Vec::new() };
            comm.broadcast(0, &mut value).unwrap();
            value
        });
        assert!(results.iter().all(|v| v == &[7, 8, 9]));
    }

    #[test]
    fn broadcast_from_non_zero_root() {
        let results = spawn_group(3, |comm| {
            let mut value = comm.rank() as u64 * 100;
            comm.broadcast(2, &mut value).unwrap();
            value
        });
        assert_eq!(results, vec![200, 200, 200]);
    }

    #[test]
    fn scatter_then_gather_restores_order() {
        let data: Vec<u32> = (0..11).collect();
        let layout = PartitionTable::even(data.len(), 3);
        let results = spawn_group(3, |comm| {
            let send = if comm.rank() == 0 { Some((&data[..], &layout)) } else { None };
            let part = comm.scatterv(0, send).unwrap();
            let doubled: Vec<u32> = part.iter().map(|v| v * 2).collect();
            let gathered = comm.gatherv(0, &doubled, if comm.rank() == 0 { Some(&layout) } else { None }).unwrap();
            (part, gathered)
        });
        assert_eq!(results[0].0, vec![0, 1, 2]);
        assert_eq!(results[1].0, vec![3, 4, 5]);
        assert_eq!(results[2].0, vec![6, 7, 8, 9, 10]);
        assert_eq!(results[0].1, Some((0..11).map(|v| v * 2).collect::<Vec<u32>>()));
        assert_eq!(results[1].1, None);
    }

    #[test]
    fn reduce_sums_on_root_only() {
        let results = spawn_group(4, |comm| {
            let r = comm.rank() as u64;
            comm.reduce_sum(0, &[r, 1, 10 * r]).unwrap()
        });
        assert_eq!(results[0], Some(vec![6, 4, 60]));
        assert!(results[1..].iter().all(|r| r.is_none()));
    }

    #[test]
    fn reduce_into_non_zero_root() {
        let results = spawn_group(3, |comm| {
            let r = comm.rank() as f64;
            comm.reduce_sum(2, &[r, 0.5]).unwrap()
        });
        assert_eq!(results[2], Some(vec![3.0, 1.5]));
        assert_eq!(results[0], None);
        assert_eq!(results[1], None);
    }

    #[test]
    fn reduce_length_mismatch() {
        let results = spawn_group(2, |comm| {
            let local = vec![1.0f64; 2 + comm.rank()];
            comm.reduce_sum(0, &local)
        });
        assert_eq!(results[0], Err(Error::DimensionMismatch { expected: 2, found: 3 }));
    }

    #[test]
    fn single_worker_group() {
        let results = spawn_group(1, |comm| {
            let mut v = 5u8;
            comm.broadcast(0, &mut v).unwrap();
            let layout = PartitionTable::even(3, 1);
            let part = comm.scatterv(0, Some((&[1u8, 2, 3][..], &layout))).unwrap();
            let sum = comm.reduce_sum(0, &[1u64]).unwrap();
            (v, part, sum)
        });
        assert_eq!(results, vec![(5, vec![1, 2, 3], Some(vec![1]))]);
    }

    #[test]
    fn wrong_tag_is_a_protocol_error() {
        let results = spawn_group(2, |comm| {
            if comm.rank() == 1 {
                comm.send(0, Tag::Gather, 1u8).unwrap();
                Ok(0u8)
            } else {
                comm.recv::<u8>(1, Tag::Reduce)
            }
        });
        assert!(matches!(results[0], Err(Error::Protocol(_))));
    }

    #[test]
    fn exited_peer_does_not_deadlock() {
        let results = spawn_group(3, |comm| {
            if comm.rank() == 0 {
                return Ok(());
            }
            let mut v = 0u8;
            comm.broadcast(0, &mut v)
        });
        assert_eq!(results[1], Err(Error::PeerExited { rank: 0 }));
        assert_eq!(results[2], Err(Error::PeerExited { rank: 0 }));
    }

    #[test]
    fn messages_from_other_ranks_are_parked() {
        let results = spawn_group(3, |comm| match comm.rank() {
            0 => {
                // rank 2 sends first, but rank 1 is awaited first
                let a: u8 = comm.recv(1, Tag::Reduce).unwrap();
                let b: u8 = comm.recv(2, Tag::Reduce).unwrap();
                vec![a, b]
            }
            1 => {
                let mut go = 0u8;
                comm.broadcast(2, &mut go).unwrap();
                comm.send(0, Tag::Reduce, 11u8).unwrap();
                vec![]
            }
            _ => {
                comm.send(0, Tag::Reduce, 22u8).unwrap();
                let mut go = 1u8;
                comm.broadcast(2, &mut go).unwrap();
                vec![]
            }
        });
        assert_eq!(results[0], vec![11, 22]);
    }

    #[test]
    fn receive_timeout() {
        let results = spawn_group_with_timeout(2, Duration::from_millis(20), |comm| {
            if comm.rank() == 0 {
                comm.recv::<u8>(1, Tag::Broadcast)
            } else {
                std::thread::sleep(Duration::from_millis(300));
                Ok(0)
            }
        });
        assert_eq!(results[0], Err(Error::Timeout { rank: 1 }));
    }
}
