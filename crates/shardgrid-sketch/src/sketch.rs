//! Load sketch — greedy shard selection from local replica counts.
//!
//! The sketch keeps, for each node it has seen, how many tablet replicas
//! sit on each of its shards. `populate` recounts everything from the
//! cluster snapshot; `next_shard` hands out the least-loaded shard of a
//! node and charges it one replica, so a batch of planned placements
//! spreads evenly without rescanning the catalog.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use shardgrid_topology::{
    ClusterView, HostId, OutOfRangePolicy, ShardId, SketchConfig, TokenMetadata,
};

use crate::error::{SketchError, SketchResult};
use crate::node_load::{NodeLoad, ShardLoad};

/// Counters from a single `populate` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulateStats {
    pub tablets_scanned: usize,
    pub replicas_counted: usize,
    /// Replicas on nodes other than the requested one.
    pub replicas_filtered: usize,
    /// Replicas naming a shard the node does not have.
    pub replicas_out_of_range: usize,
    pub nodes_tracked: usize,
}

/// Shard loads of every tracked node.
#[derive(Debug, Default)]
struct ClusterLoadState {
    nodes: HashMap<HostId, NodeLoad>,
}

impl ClusterLoadState {
    /// Return the node's loads, creating all-zero loads sized from topology
    /// on first reference.
    fn ensure_tracked<V: ClusterView + ?Sized>(
        &mut self,
        view: &V,
        host: &HostId,
    ) -> SketchResult<&mut NodeLoad> {
        match self.nodes.entry(host.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let shard_count = view
                    .shard_count(host)
                    .filter(|&count| count > 0)
                    .ok_or_else(|| SketchError::UnknownShardCount(host.clone()))?;
                debug!(node = %host, shard_count, "tracking node");
                Ok(entry.insert(NodeLoad::new(shard_count)))
            }
        }
    }
}

/// Tracks tablet load per shard across the cluster.
///
/// Bound to a shared, read-only cluster view for its whole lifetime. Not
/// internally synchronized: callers must serialize `populate` and
/// `next_shard` on the same instance.
pub struct LoadSketch<V: ClusterView + ?Sized = TokenMetadata> {
    view: Arc<V>,
    state: ClusterLoadState,
    config: SketchConfig,
}

impl<V: ClusterView + ?Sized> LoadSketch<V> {
    /// Create an empty sketch. No load is counted until `populate` runs.
    pub fn new(view: Arc<V>) -> Self {
        Self::with_config(view, SketchConfig::default())
    }

    pub fn with_config(view: Arc<V>, config: SketchConfig) -> Self {
        Self {
            view,
            state: ClusterLoadState::default(),
            config,
        }
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// Rebuild all loads from the cluster snapshot.
    ///
    /// Drops every previously tracked node first, including load charged
    /// by `next_shard`. With `host` set, only replicas on that node are
    /// counted and no other node becomes tracked.
    ///
    /// Yields to the runtime every `yield_every` tablets. Counts go into a
    /// scratch state that replaces the tracked one only once every heap is
    /// built; if this future is dropped or returns an error, the sketch is
    /// left empty.
    pub async fn populate(&mut self, host: Option<&HostId>) -> SketchResult<PopulateStats> {
        let view = Arc::clone(&self.view);
        let yield_every = self.config.yield_every.max(1);
        self.state.nodes.clear();

        let mut state = ClusterLoadState::default();
        let mut stats = PopulateStats::default();
        for (table, tablets) in view.tablet_maps() {
            for (tablet, info) in tablets.tablets() {
                for replica in &info.replicas {
                    if host.is_some_and(|h| *h != replica.host) {
                        stats.replicas_filtered += 1;
                        continue;
                    }
                    let node = state.ensure_tracked(view.as_ref(), &replica.host)?;
                    if node.record(replica.shard) {
                        stats.replicas_counted += 1;
                        continue;
                    }
                    match self.config.out_of_range {
                        OutOfRangePolicy::Ignore => {
                            debug!(
                                table = %table,
                                tablet = %tablet,
                                replica = %replica,
                                shard_count = node.shard_count(),
                                "ignoring replica on out-of-range shard"
                            );
                            stats.replicas_out_of_range += 1;
                        }
                        OutOfRangePolicy::Reject => {
                            return Err(SketchError::ShardOutOfRange {
                                table: table.clone(),
                                tablet,
                                replica: replica.clone(),
                                shard_count: node.shard_count(),
                            });
                        }
                    }
                }

                stats.tablets_scanned += 1;
                if stats.tablets_scanned % yield_every == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }

        for node in state.nodes.values_mut() {
            node.heapify();
        }
        stats.nodes_tracked = state.nodes.len();
        self.state = state;

        if stats.replicas_out_of_range > 0 {
            warn!(
                dropped = stats.replicas_out_of_range,
                "replicas referenced shards beyond their node's shard count"
            );
        }
        info!(
            tablets = stats.tablets_scanned,
            replicas = stats.replicas_counted,
            nodes = stats.nodes_tracked,
            "load sketch populated"
        );
        Ok(stats)
    }

    /// Pick the least-loaded shard on `host` and charge it one replica.
    ///
    /// Starts an untracked node at zero load on every shard. Fails if
    /// topology cannot size the node, in which case nothing is tracked.
    /// Shards with equal load may come back in any order.
    pub fn next_shard(&mut self, host: &HostId) -> SketchResult<ShardId> {
        let node = self.state.ensure_tracked(self.view.as_ref(), host)?;
        let shard = node
            .take_lowest()
            .ok_or_else(|| SketchError::UnknownShardCount(host.clone()))?;
        debug!(node = %host, shard, "picked least-loaded shard");
        Ok(shard)
    }

    pub fn is_tracked(&self, host: &HostId) -> bool {
        self.state.nodes.contains_key(host)
    }

    pub fn tracked_nodes(&self) -> impl Iterator<Item = &HostId> + '_ {
        self.state.nodes.keys()
    }

    /// Number of shards the sketch tracks for `host`.
    pub fn shard_count(&self, host: &HostId) -> Option<usize> {
        self.state.nodes.get(host).map(NodeLoad::shard_count)
    }

    /// Current load of every shard on `host`, indexed by shard id.
    pub fn shard_loads(&self, host: &HostId) -> Option<Vec<usize>> {
        self.state.nodes.get(host).map(NodeLoad::loads_by_shard)
    }

    /// Sum of all shard loads on `host`.
    pub fn total_load(&self, host: &HostId) -> Option<usize> {
        self.state.nodes.get(host).map(NodeLoad::total)
    }

    /// The shard `next_shard` would currently pick, without charging it.
    pub fn lowest_load(&self, host: &HostId) -> Option<ShardLoad> {
        self.state.nodes.get(host).and_then(NodeLoad::lowest)
    }
}
