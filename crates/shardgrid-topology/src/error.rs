//! Error types for the cluster snapshot.

use thiserror::Error;

use crate::types::{HostId, TableId, TabletId, TabletReplica};

/// Result type alias for snapshot operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors raised while building or querying a cluster snapshot.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("tablet map not found for table {0}")]
    TabletMapNotFound(TableId),

    #[error("invalid tablet id: {id} >= {count}")]
    InvalidTabletId { id: TabletId, count: usize },

    #[error("tablet count not a power of 2: {0}")]
    TabletCountNotPowerOfTwo(usize),

    #[error("tablet count {count} exceeds the limit of {max}")]
    TabletCountTooLarge { count: usize, max: usize },

    #[error("malformed replica {0:?}: expected <host>:<shard>")]
    MalformedReplica(String),

    #[error("duplicate node in snapshot: {0}")]
    DuplicateNode(HostId),

    #[error("duplicate table in snapshot: {0}")]
    DuplicateTable(TableId),

    #[error("tablet {tablet} of table {table} declared twice")]
    DuplicateTablet { table: TableId, tablet: TabletId },

    #[error("replica {replica} of table {table} is on a node missing from topology")]
    UnknownReplicaHost { table: TableId, replica: TabletReplica },
}
