//! Collective communication between the workers of one fit.
//!
//! Workers never share memory. Every piece of data that crosses a worker boundary
//! is moved through [`Communicator::send`] / [`Communicator::recv`], and the four
//! collectives the engine needs are built on top of those two primitives.
//! All collectives block until the local part of the exchange is complete.

mod local;

pub use local::{spawn_group, spawn_group_with_timeout, LocalCommunicator};

use crate::error::{Error, Result};
use crate::partition::PartitionTable;
use std::ops::AddAssign;

/// Kind of collective a point-to-point message belongs to.
/// Receivers match on (source, tag), so a message of the wrong kind is a protocol error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    Broadcast,
    Scatter,
    Reduce,
    Gather,
}

/// Endpoint of one worker inside a fixed group of `world_size()` workers.
pub trait Communicator {
    /// Rank of this worker, `0..world_size()`.
    fn rank(&self) -> usize;
    /// Amount of workers in the group.
    fn world_size(&self) -> usize;

    /// Move `value` to worker `dest`.
    fn send<T: Send + 'static>(&self, dest: usize, tag: Tag, value: T) -> Result<()>;
    /// Block until the next message from `source` arrives and take it.
    fn recv<T: Send + 'static>(&self, source: usize, tag: Tag) -> Result<T>;

    /// One-to-all distribution of `value` from `root`.
    /// On every other worker `value` is overwritten with the root's copy.
    fn broadcast<T: Clone + Send + 'static>(&self, root: usize, value: &mut T) -> Result<()> {
        if self.rank() == root {
            for dest in (0..self.world_size()).filter(|&r| r != root) {
                self.send(dest, Tag::Broadcast, value.clone())?;
            }
        } else {
            *value = self.recv(root, Tag::Broadcast)?;
        }
        Ok(())
    }

    /// Variable-length scatter: rank `r` receives `buf[layout.range(r)]`.
    /// Only the root supplies `send`; every worker gets its own slice back.
    fn scatterv<T: Clone + Send + 'static>(&self, root: usize, send: Option<(&[T], &PartitionTable)>) -> Result<Vec<T>> {
        if self.rank() != root {
            return self.recv(root, Tag::Scatter);
        }
        let (buf, layout) = send.ok_or_else(|| Error::Protocol("root must supply the scatter buffer".into()))?;
        check_layout(layout, self.world_size())?;
        if layout.total() != buf.len() {
            return Err(Error::DimensionMismatch { expected: layout.total(), found: buf.len() });
        }
        for dest in (0..self.world_size()).filter(|&r| r != root) {
            self.send(dest, Tag::Scatter, buf[layout.range(dest)].to_vec())?;
        }
        Ok(buf[layout.range(root)].to_vec())
    }

    /// Element-wise sum of every worker's `local` into the root.
    /// The root's own contribution is the starting value, the other ranks are added
    /// in ascending rank order. Returns `Some` on the root only.
    fn reduce_sum<T>(&self, root: usize, local: &[T]) -> Result<Option<Vec<T>>>
    where
        T: Copy + AddAssign + Send + 'static,
    {
        if self.rank() != root {
            self.send(root, Tag::Reduce, local.to_vec())?;
            return Ok(None);
        }
        let mut acc = local.to_vec();
        for source in (0..self.world_size()).filter(|&r| r != root) {
            let part: Vec<T> = self.recv(source, Tag::Reduce)?;
            if part.len() != acc.len() {
                return Err(Error::DimensionMismatch { expected: acc.len(), found: part.len() });
            }
            acc.iter_mut().zip(part).for_each(|(a, b)| *a += b);
        }
        Ok(Some(acc))
    }

    /// Inverse of [`Communicator::scatterv`]: the root reassembles every worker's
    /// `local` at the offsets given by `layout`. Returns `Some` on the root only.
    fn gatherv<T: Clone + Send + 'static>(&self, root: usize, local: &[T], layout: Option<&PartitionTable>) -> Result<Option<Vec<T>>> {
        if self.rank() != root {
            self.send(root, Tag::Gather, local.to_vec())?;
            return Ok(None);
        }
        let layout = layout.ok_or_else(|| Error::Protocol("root must supply the gather layout".into()))?;
        check_layout(layout, self.world_size())?;

        let mut parts = Vec::with_capacity(self.world_size());
        for source in 0..self.world_size() {
            let part = if source == root { local.to_vec() } else { self.recv::<Vec<T>>(source, Tag::Gather)? };
            if part.len() != layout.counts()[source] {
                return Err(Error::DimensionMismatch { expected: layout.counts()[source], found: part.len() });
            }
            parts.push((layout.offsets()[source], part));
        }
        parts.sort_by_key(|(offset, _)| *offset);

        let mut gathered = Vec::with_capacity(layout.total());
        for (offset, part) in parts {
            if offset != gathered.len() {
                return Err(Error::Protocol(format!("gather layout is not contiguous at offset {}", offset)));
            }
            gathered.extend(part);
        }
        Ok(Some(gathered))
    }
}

fn check_layout(layout: &PartitionTable, world: usize) -> Result<()> {
    if layout.workers() != world {
        return Err(Error::DimensionMismatch { expected: world, found: layout.workers() });
    }
    Ok(())
}
