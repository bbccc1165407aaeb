//! Bounded FIFO of accepted items waiting for the diverter.
//!
//! Backed by a fixed [`heapless::Deque`]; the runtime capacity (from
//! config) may be lower than the storage size.  A push against a full
//! queue hands the item back so the caller can downgrade it to a
//! capacity rejection.

use heapless::Deque;
use log::{info, warn};

use crate::item::Item;

/// Upper bound on in-flight accepted items.
pub const MAX_QUEUE_CAPACITY: usize = 16;

pub struct ItemQueue {
    items: Deque<Item, MAX_QUEUE_CAPACITY>,
    capacity: usize,
}

impl ItemQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Deque::new(),
            capacity: capacity.clamp(1, MAX_QUEUE_CAPACITY),
        }
    }

    /// Append at the tail.  Returns the item back if the queue is full.
    pub fn push(&mut self, item: Item) -> Result<(), Item> {
        if self.is_full() {
            warn!("QUEUE: full ({}/{}), refusing {}", self.len(), self.capacity, item.id);
            return Err(item);
        }
        self.items.push_back(item)
    }

    /// Remove the head.  Each item leaves the queue exactly once, here.
    pub fn pop_front(&mut self) -> Option<Item> {
        self.items.pop_front()
    }

    pub fn front(&self) -> Option<&Item> {
        self.items.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the runtime capacity.  Never shrinks below the current length.
    pub fn set_capacity(&mut self, capacity: usize) {
        let new_cap = capacity.clamp(1, MAX_QUEUE_CAPACITY).max(self.items.len());
        if new_cap != capacity {
            warn!("QUEUE: capacity {} adjusted to {}", capacity, new_cap);
        }
        if new_cap != self.capacity {
            info!("QUEUE: capacity {} -> {}", self.capacity, new_cap);
            self.capacity = new_cap;
        }
    }
}
