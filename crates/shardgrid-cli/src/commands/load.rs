use std::path::Path;

use serde::Serialize;
use shardgrid_sketch::PopulateStats;
use shardgrid_topology::HostId;

use super::{NodeReport, open_sketch};

#[derive(Serialize)]
struct LoadOutput {
    stats: PopulateStats,
    nodes: Vec<NodeReport>,
}

pub async fn load(snapshot: &Path, node: Option<&str>, format: &str) -> anyhow::Result<()> {
    let mut sketch = open_sketch(snapshot)?;
    let filter = node.map(HostId::from);
    let stats = sketch.populate(filter.as_ref()).await?;

    let mut hosts: Vec<HostId> = sketch.tracked_nodes().cloned().collect();
    hosts.sort();
    let nodes: Vec<NodeReport> = hosts
        .iter()
        .filter_map(|h| NodeReport::collect(&sketch, h))
        .collect();

    match format {
        "json" => {
            let output = LoadOutput { stats, nodes };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!(
                "scanned {} tablets, counted {} replicas ({} out of range)",
                stats.tablets_scanned, stats.replicas_counted, stats.replicas_out_of_range
            );
            for report in &nodes {
                println!("{}", report.to_text());
            }
        }
    }

    Ok(())
}
