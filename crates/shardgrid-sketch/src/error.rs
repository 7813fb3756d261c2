//! Load sketch error types.

use shardgrid_topology::{HostId, TableId, TabletId, TabletReplica};
use thiserror::Error;

/// Errors surfaced by the load sketch.
#[derive(Debug, Error)]
pub enum SketchError {
    /// Topology reports no shard count (or zero) for a node being tracked.
    #[error("shard count not known for node {0}")]
    UnknownShardCount(HostId),

    /// A replica names a shard past the node's shard count, under
    /// [`OutOfRangePolicy::Reject`](shardgrid_topology::OutOfRangePolicy::Reject).
    #[error("replica {replica} of tablet {tablet} in table {table} is out of range for {shard_count} shards")]
    ShardOutOfRange {
        table: TableId,
        tablet: TabletId,
        replica: TabletReplica,
        shard_count: usize,
    },
}

pub type SketchResult<T> = Result<T, SketchError>;
