use std::path::Path;

use serde::Serialize;
use shardgrid_sketch::LoadSketch;
use shardgrid_topology::HostId;

use super::{NodeReport, open_sketch};

#[derive(Serialize)]
struct PlanOutput {
    node: HostId,
    shards: Vec<u32>,
    after: Option<NodeReport>,
}

pub async fn plan(
    snapshot: &Path,
    node: &str,
    count: usize,
    fresh: bool,
    format: &str,
) -> anyhow::Result<()> {
    let mut sketch = open_sketch(snapshot)?;
    let host = HostId::from(node);
    let shards = place(&mut sketch, &host, count, fresh).await?;
    tracing::info!(node = %host, placed = shards.len(), "placement planned");

    let after = NodeReport::collect(&sketch, &host);
    match format {
        "json" => {
            let output = PlanOutput {
                node: host,
                shards,
                after,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            for (i, shard) in shards.iter().enumerate() {
                println!("replica {i:<4} -> {host}:{shard}");
            }
            if let Some(report) = after {
                println!("{}", report.to_text());
            }
        }
    }

    Ok(())
}

/// Pick `count` shards on `host`, counting existing tablets unless `fresh`.
async fn place(
    sketch: &mut LoadSketch,
    host: &HostId,
    count: usize,
    fresh: bool,
) -> anyhow::Result<Vec<u32>> {
    if !fresh {
        sketch.populate(None).await?;
    }
    let shards = (0..count)
        .map(|_| sketch.next_shard(host))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(shards)
}
