pub mod load;
pub mod plan;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use shardgrid_sketch::LoadSketch;
use shardgrid_topology::{HostId, SnapshotFile};

/// Build a sketch over the snapshot stored at `path`.
pub fn open_sketch(path: &Path) -> anyhow::Result<LoadSketch> {
    let file = SnapshotFile::from_file(path)?;
    let tm = file.token_metadata()?;
    tracing::debug!(
        path = %path.display(),
        nodes = tm.get_topology().len(),
        tables = tm.tablets().table_count(),
        "snapshot loaded"
    );
    Ok(LoadSketch::with_config(Arc::new(tm), file.sketch))
}

/// Per-shard loads of one node, as printed by the CLI.
#[derive(Debug, Serialize)]
pub struct NodeReport {
    pub node: HostId,
    pub loads: Vec<usize>,
    pub total: usize,
}

impl NodeReport {
    pub fn collect(sketch: &LoadSketch, node: &HostId) -> Option<Self> {
        let loads = sketch.shard_loads(node)?;
        Some(Self {
            node: node.clone(),
            total: loads.iter().sum(),
            loads,
        })
    }

    pub fn to_text(&self) -> String {
        let shards: Vec<String> = self
            .loads
            .iter()
            .enumerate()
            .map(|(shard, load)| format!("{shard}={load}"))
            .collect();
        format!("{:<20} total={:<6} {}", self.node, self.total, shards.join(" "))
    }
}
