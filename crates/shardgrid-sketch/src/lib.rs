//! shardgrid-sketch — load tracking for tablet placement.
//!
//! Keeps a per-shard count of tablet replicas for every node it has seen
//! and answers "which shard on this node should get the next replica?".
//! It does NOT decide when or where tablets move (that's the allocator).
//! It only picks the least-loaded shard on a node the caller names.
//!
//! # Components
//!
//! - **`node_load`** — Per-node min-heap of shard loads
//! - **`sketch`** — `LoadSketch`: bulk populate and incremental `next_shard`
//! - **`error`** — Error types
//!
//! # Usage
//!
//! ```text
//! let mut sketch = LoadSketch::new(token_metadata);
//! sketch.populate(None).await?;          // snapshot real load
//! let shard = sketch.next_shard(&host)?; // plan one placement
//! ```
//!
//! A sketch is not internally synchronized. One task at a time may call
//! `populate` or `next_shard` on a given instance.

pub mod error;
pub mod node_load;
pub mod sketch;

pub use error::{SketchError, SketchResult};
pub use node_load::ShardLoad;
pub use sketch::{LoadSketch, PopulateStats};
