//! shardgrid-topology — read-only cluster snapshot for ShardGrid.
//!
//! Holds the two things a placement decision needs to read: the topology
//! (which nodes exist and how many shards each one runs) and the tablet
//! catalog (for every table, which `(node, shard)` pairs hold each tablet).
//!
//! # Components
//!
//! - **`types`** — Identifiers, replicas, tokens
//! - **`tablets`** — `TabletMap` and `TabletMetadata`
//! - **`topology`** — Nodes, `Topology`, `TokenMetadata` and the `ClusterView` boundary
//! - **`config`** — TOML snapshot files and sketch tuning
//!
//! A `TokenMetadata` is built once and then shared behind an `Arc`; nothing
//! in the workspace mutates it after construction.

pub mod config;
pub mod error;
pub mod tablets;
pub mod topology;
pub mod types;

pub use config::{OutOfRangePolicy, SketchConfig, SnapshotFile};
pub use error::{TopologyError, TopologyResult};
pub use tablets::{MAX_TABLET_COUNT, TabletMap, TabletMetadata};
pub use topology::{ClusterView, Node, Topology, TokenMetadata};
pub use types::*;
