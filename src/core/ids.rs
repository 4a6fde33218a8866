//! Small integer handle allocation
//!
//! Hands out process and stream ids from a pool that doubles when exhausted.
//! Released ids go to the back of a FIFO free list, so reuse order is
//! deterministic.

use std::collections::VecDeque;
use thiserror::Error;

/// Opaque handle naming a process or a stream
pub type Id = usize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("id {0} was never issued")]
    InvalidId(Id),

    #[error("id {0} is already free")]
    DoubleFree(Id),
}

/// State of one slot in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Part of the pool, never handed out
    Fresh,
    /// Owned by exactly one entity
    Allocated,
    /// Handed out once, returned since
    Released,
}

/// Id pool with free-list reuse
#[derive(Debug)]
pub struct IdAllocator {
    slots: Vec<Slot>,
    free: VecDeque<Id>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Create an allocator whose pool starts as `{0}`
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Create an allocator with `capacity` ids ready (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![Slot::Fresh; capacity],
            free: (0..capacity).collect(),
        }
    }

    /// Allocate the oldest free id, growing the pool if none is left
    pub fn alloc(&mut self) -> Id {
        let id = loop {
            if let Some(id) = self.free.pop_front() {
                break id;
            }
            self.grow();
        };
        self.slots[id] = Slot::Allocated;
        id
    }

    /// Return an id to the pool
    pub fn free(&mut self, id: Id) -> Result<(), IdError> {
        match self.slots.get(id) {
            None | Some(Slot::Fresh) => Err(IdError::InvalidId(id)),
            Some(Slot::Released) => Err(IdError::DoubleFree(id)),
            Some(Slot::Allocated) => {
                self.slots[id] = Slot::Released;
                self.free.push_back(id);
                Ok(())
            }
        }
    }

    /// Double the pool, queueing every new id for allocation
    fn grow(&mut self) {
        let old = self.slots.len();
        let new = old * 2;
        self.slots.resize(new, Slot::Fresh);
        self.free.extend(old..new);
        tracing::trace!(from = old, to = new, "id pool grown");
    }

    /// Check whether an id is currently owned
    pub fn is_allocated(&self, id: Id) -> bool {
        matches!(self.slots.get(id), Some(Slot::Allocated))
    }

    /// Number of ids currently owned
    pub fn allocated_count(&self) -> usize {
        self.slots.iter().filter(|s| **s == Slot::Allocated).count()
    }

    /// Current pool size
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
