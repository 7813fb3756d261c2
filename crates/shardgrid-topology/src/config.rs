//! Snapshot file parser and load sketch tuning.
//!
//! A snapshot file describes a whole cluster in TOML:
//!
//! ```toml
//! [sketch]
//! out_of_range = "ignore"
//! yield_every = 1
//!
//! [[nodes]]
//! host_id = "a"
//! shard_count = 3
//!
//! [[tables]]
//! id = "ks.events"
//! tablet_count = 4
//!
//! [[tables.tablets]]
//! id = 0
//! replicas = ["a:1", "b:0"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};
use crate::tablets::{TabletMap, TabletMetadata};
use crate::topology::{Node, Topology, TokenMetadata};
use crate::types::{HostId, TableId, TabletId, TabletInfo, TabletReplica};

/// What to do with a replica naming a shard the node does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Skip the replica and keep scanning.
    #[default]
    Ignore,
    /// Abort the scan with an error.
    Reject,
}

/// Tuning for the load sketch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    pub out_of_range: OutOfRangePolicy,
    /// Tablets processed between cooperative yields. Zero is treated as one.
    pub yield_every: usize,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            out_of_range: OutOfRangePolicy::Ignore,
            yield_every: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub sketch: SketchConfig,
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub tables: Vec<TableEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    pub host_id: HostId,
    pub shard_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    pub id: TableId,
    pub tablet_count: usize,
    #[serde(default)]
    pub tablets: Vec<TabletEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabletEntry {
    pub id: u64,
    pub replicas: Vec<TabletReplica>,
}

impl SnapshotFile {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let snapshot: SnapshotFile = toml::from_str(content)?;
        Ok(snapshot)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the file and build the immutable cluster snapshot.
    ///
    /// Replicas whose shard index exceeds the node's shard count are kept;
    /// deciding what to do with them is left to the reader.
    pub fn token_metadata(&self) -> TopologyResult<TokenMetadata> {
        let mut topology = Topology::new();
        for entry in &self.nodes {
            if topology.find_node(&entry.host_id).is_some() {
                return Err(TopologyError::DuplicateNode(entry.host_id.clone()));
            }
            topology.add_node(Node {
                host_id: entry.host_id.clone(),
                shard_count: entry.shard_count,
                datacenter: entry.datacenter.clone(),
                rack: entry.rack.clone(),
            });
        }

        let mut tablets = TabletMetadata::new();
        for table in &self.tables {
            if tablets.get_tablet_map(&table.id).is_ok() {
                return Err(TopologyError::DuplicateTable(table.id.clone()));
            }
            let mut map = TabletMap::new(table.tablet_count)?;
            let mut seen = HashSet::new();
            for tablet in &table.tablets {
                let id = TabletId(tablet.id);
                if !seen.insert(id) {
                    return Err(TopologyError::DuplicateTablet {
                        table: table.id.clone(),
                        tablet: id,
                    });
                }
                if let Some(replica) = tablet
                    .replicas
                    .iter()
                    .find(|r| topology.find_node(&r.host).is_none())
                {
                    return Err(TopologyError::UnknownReplicaHost {
                        table: table.id.clone(),
                        replica: replica.clone(),
                    });
                }
                map.set_tablet(id, TabletInfo::new(tablet.replicas.clone()))?;
            }
            tablets.set_tablet_map(table.id.clone(), map);
        }

        Ok(TokenMetadata::new(topology, tablets))
    }
}
