//! Per-node shard loads kept as a binary min-heap.
//!
//! Entries carry their own shard id, so an entry's heap position says
//! nothing about which shard it is. Freshly created loads are laid out
//! in id order and all zero, which already satisfies the heap property.

use serde::Serialize;
use shardgrid_topology::ShardId;

/// Load of a single shard, in tablet replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShardLoad {
    pub id: ShardId,
    pub load: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeLoad {
    shards: Vec<ShardLoad>,
    /// False between a bulk `record` and the next `heapify`.
    heap_ordered: bool,
}

impl NodeLoad {
    pub(crate) fn new(shard_count: u32) -> Self {
        Self {
            shards: (0..shard_count).map(|id| ShardLoad { id, load: 0 }).collect(),
            heap_ordered: true,
        }
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Count one replica on `shard` during a bulk scan.
    ///
    /// Returns `false` if `shard` is out of range. The heap must be
    /// rebuilt with [`heapify`](Self::heapify) before the next `take_lowest`.
    pub(crate) fn record(&mut self, shard: ShardId) -> bool {
        let Some(entry) = self.shards.get_mut(shard as usize) else {
            return false;
        };
        entry.load += 1;
        self.heap_ordered = false;
        true
    }

    /// Restore the heap property over all entries. O(S).
    pub(crate) fn heapify(&mut self) {
        // Records index by id, so they are only valid before the first heapify.
        debug_assert!(self.heap_ordered || is_id_ordered(&self.shards));
        for pos in (0..self.shards.len() / 2).rev() {
            self.sift_down(pos);
        }
        self.heap_ordered = true;
    }

    /// Pick the least-loaded shard and charge it one replica. O(log S).
    ///
    /// Returns `None` only for a node with no shards.
    pub(crate) fn take_lowest(&mut self) -> Option<ShardId> {
        debug_assert!(self.heap_ordered);
        let root = self.shards.first_mut()?;
        root.load += 1;
        let id = root.id;
        self.sift_down(0);
        Some(id)
    }

    pub(crate) fn lowest(&self) -> Option<ShardLoad> {
        self.shards.first().copied()
    }

    pub(crate) fn total(&self) -> usize {
        self.shards.iter().map(|s| s.load).sum()
    }

    /// Loads indexed by shard id.
    pub(crate) fn loads_by_shard(&self) -> Vec<usize> {
        let mut loads = vec![0; self.shards.len()];
        for s in &self.shards {
            loads[s.id as usize] = s.load;
        }
        loads
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.shards.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.shards[right].load < self.shards[left].load {
                right
            } else {
                left
            };
            if self.shards[child].load >= self.shards[pos].load {
                break;
            }
            self.shards.swap(pos, child);
            pos = child;
        }
    }

    #[cfg(test)]
    pub(crate) fn is_min_heap(&self) -> bool {
        (1..self.shards.len()).all(|i| self.shards[(i - 1) / 2].load <= self.shards[i].load)
    }
}

fn is_id_ordered(shards: &[ShardLoad]) -> bool {
    shards.iter().enumerate().all(|(i, s)| s.id as usize == i)
}
