//! Cluster membership and the read-only view handed to load tracking.

use std::collections::HashMap;

use crate::tablets::{TabletMap, TabletMetadata};
use crate::types::{HostId, TableId};

/// A cluster member as seen by topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub host_id: HostId,
    /// Number of shards the node runs. Zero means "not yet known".
    pub shard_count: u32,
    pub datacenter: Option<String>,
    pub rack: Option<String>,
}

impl Node {
    pub fn new(host_id: impl Into<HostId>, shard_count: u32) -> Self {
        Self {
            host_id: host_id.into(),
            shard_count,
            datacenter: None,
            rack: None,
        }
    }

    pub fn get_shard_count(&self) -> u32 {
        self.shard_count
    }
}

/// Authoritative set of nodes and their shard counts.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: HashMap<HostId, Node>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing any previous entry for the same host.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.host_id.clone(), node);
    }

    pub fn find_node(&self, host: &HostId) -> Option<&Node> {
        self.nodes.get(host)
    }

    pub fn shard_count(&self, host: &HostId) -> Option<u32> {
        self.find_node(host).map(Node::get_shard_count)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Immutable snapshot of topology plus the tablet catalog.
///
/// Meant to be built once and shared as `Arc<TokenMetadata>`.
#[derive(Debug, Clone, Default)]
pub struct TokenMetadata {
    topology: Topology,
    tablets: TabletMetadata,
}

impl TokenMetadata {
    pub fn new(topology: Topology, tablets: TabletMetadata) -> Self {
        Self { topology, tablets }
    }

    pub fn get_topology(&self) -> &Topology {
        &self.topology
    }

    pub fn tablets(&self) -> &TabletMetadata {
        &self.tablets
    }
}

/// What load tracking needs to read from a cluster snapshot.
///
/// Implementations must not change while a reader holds them; the tablet
/// scan relies on seeing the same catalog from start to finish.
pub trait ClusterView: Send + Sync {
    /// Shard count of `host`, or `None` if topology does not know the node.
    fn shard_count(&self, host: &HostId) -> Option<u32>;

    /// Every table's tablet map, in no particular order.
    fn tablet_maps(&self) -> Box<dyn Iterator<Item = (&TableId, &TabletMap)> + Send + '_>;
}

impl ClusterView for TokenMetadata {
    fn shard_count(&self, host: &HostId) -> Option<u32> {
        self.topology.shard_count(host)
    }

    fn tablet_maps(&self) -> Box<dyn Iterator<Item = (&TableId, &TabletMap)> + Send + '_> {
        Box::new(self.tablets.all_tables().iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TabletId, TabletInfo, TabletReplica};

    #[test]
    fn add_node_replaces_previous_entry() {
        let mut topo = Topology::new();
        topo.add_node(Node::new("a", 2));
        topo.add_node(Node::new("a", 8));
        assert_eq!(topo.len(), 1);
        assert_eq!(topo.shard_count(&HostId::from("a")), Some(8));
        assert_eq!(topo.shard_count(&HostId::from("b")), None);
    }

    #[test]
    fn token_metadata_exposes_catalog_as_view() {
        let mut topo = Topology::new();
        topo.add_node(Node::new("a", 4));

        let mut map = TabletMap::new(2).unwrap();
        map.set_tablet(TabletId(0), TabletInfo::new(vec![TabletReplica::new("a", 0)]))
            .unwrap();
        let mut tablets = TabletMetadata::new();
        tablets.set_tablet_map(TableId::from("ks.t"), map);

        let tm = TokenMetadata::new(topo, tablets);
        let view: &dyn ClusterView = &tm;
        assert_eq!(view.shard_count(&HostId::from("a")), Some(4));

        let maps: Vec<_> = view.tablet_maps().collect();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].0, &TableId::from("ks.t"));
        assert_eq!(maps[0].1.tablet_count(), 2);
    }
}
