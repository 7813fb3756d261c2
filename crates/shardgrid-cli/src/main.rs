use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "shardgrid",
    about = "ShardGrid — tablet load inspection and shard placement planning",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count tablet replicas per shard from a cluster snapshot
    Load {
        /// Snapshot file (TOML)
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Only count replicas on this node
        #[arg(short, long)]
        node: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Pick shards for a batch of new replicas on one node.
    ///
    /// Loads are first counted from the snapshot, then each placement
    /// goes to the least-loaded shard and charges it one replica.
    Plan {
        /// Snapshot file (TOML)
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Node receiving the replicas
        #[arg(short, long)]
        node: String,
        /// Number of replicas to place
        #[arg(short, long, default_value = "1")]
        count: usize,
        /// Start from zero load instead of counting existing replicas
        #[arg(long)]
        fresh: bool,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shardgrid=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load {
            snapshot,
            node,
            format,
        } => commands::load::load(&snapshot, node.as_deref(), &format).await,
        Commands::Plan {
            snapshot,
            node,
            count,
            fresh,
            format,
        } => commands::plan::plan(&snapshot, &node, count, fresh, &format).await,
    }
}
