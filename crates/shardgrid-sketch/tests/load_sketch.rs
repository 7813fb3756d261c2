//! Load sketch behaviour against synthetic and file-backed cluster views.
//!
//! Covers the placement guarantees an allocator relies on: least-loaded
//! selection, load conservation, node filtering, and cooperative yielding.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use shardgrid_sketch::{LoadSketch, SketchError};
use shardgrid_topology::*;

/// In-memory view that records how often topology was consulted.
struct SyntheticView {
    shard_counts: HashMap<HostId, u32>,
    tables: HashMap<TableId, TabletMap>,
    lookups: AtomicUsize,
}

impl SyntheticView {
    fn new(nodes: &[(&str, u32)]) -> Self {
        Self {
            shard_counts: nodes
                .iter()
                .map(|&(h, s)| (HostId::from(h), s))
                .collect(),
            tables: HashMap::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    fn with_table(mut self, table: &str, tablets: &[&[(&str, u32)]]) -> Self {
        let mut map = TabletMap::new(tablets.len().next_power_of_two()).unwrap();
        for (i, replicas) in tablets.iter().enumerate() {
            let replicas = replicas
                .iter()
                .map(|&(h, s)| TabletReplica::new(h, s))
                .collect();
            map.set_tablet(TabletId(i as u64), TabletInfo::new(replicas))
                .unwrap();
        }
        self.tables.insert(TableId::from(table), map);
        self
    }
}

impl ClusterView for SyntheticView {
    fn shard_count(&self, host: &HostId) -> Option<u32> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.shard_counts.get(host).copied()
    }

    fn tablet_maps(&self) -> Box<dyn Iterator<Item = (&TableId, &TabletMap)> + Send + '_> {
        Box::new(self.tables.iter())
    }
}

fn host(id: &str) -> HostId {
    HostId::from(id)
}

fn assert_root_is_min<V: ClusterView + ?Sized>(sketch: &LoadSketch<V>, node: &HostId) {
    let lowest = sketch.lowest_load(node).unwrap();
    let loads = sketch.shard_loads(node).unwrap();
    assert_eq!(loads[lowest.id as usize], lowest.load);
    assert!(
        loads.iter().all(|&l| lowest.load <= l),
        "root {lowest:?} is not minimal in {loads:?}"
    );
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name)
}

#[tokio::test]
async fn least_loaded_shards_are_chosen_first() {
    // Shard 1 already holds three replicas; shards 0 and 2 are empty.
    let view = SyntheticView::new(&[("a", 3)]).with_table(
        "t1",
        &[&[("a", 1)], &[("a", 1)], &[("a", 1)]],
    );
    let mut sketch = LoadSketch::new(Arc::new(view));
    sketch.populate(None).await.unwrap();
    assert_eq!(sketch.shard_loads(&host("a")), Some(vec![0, 3, 0]));

    let first = sketch.next_shard(&host("a")).unwrap();
    let second = sketch.next_shard(&host("a")).unwrap();
    let third = sketch.next_shard(&host("a")).unwrap();

    let mut first_two = [first, second];
    first_two.sort();
    assert_eq!(first_two, [0, 2]);
    assert_ne!(third, 1);
    assert_eq!(sketch.shard_loads(&host("a")).unwrap()[1], 3);
    assert_root_is_min(&sketch, &host("a"));
}

#[tokio::test]
async fn loads_are_conserved_across_tables() {
    let view = SyntheticView::new(&[("a", 4), ("b", 2), ("c", 8)])
        .with_table("t1", &[&[("a", 0), ("b", 1)], &[("a", 3), ("c", 7)]])
        .with_table(
            "t2",
            &[
                &[("a", 0), ("b", 0), ("c", 0)],
                &[("a", 2), ("b", 5), ("c", 1)],
                &[("b", 1)],
            ],
        );
    let mut sketch = LoadSketch::new(Arc::new(view));
    let stats = sketch.populate(None).await.unwrap();

    // b:5 is out of range for a two-shard node.
    assert_eq!(stats.replicas_out_of_range, 1);
    assert_eq!(sketch.total_load(&host("a")), Some(4));
    assert_eq!(sketch.total_load(&host("b")), Some(3));
    assert_eq!(sketch.total_load(&host("c")), Some(3));
    assert_eq!(sketch.shard_loads(&host("a")), Some(vec![2, 0, 1, 1]));
    assert_eq!(stats.replicas_counted, 10);
    for node in ["a", "b", "c"] {
        assert_root_is_min(&sketch, &host(node));
    }
}

#[tokio::test]
async fn filter_counts_only_the_requested_node() {
    let view = SyntheticView::new(&[("a", 2), ("b", 2)])
        .with_table("t1", &[&[("a", 0), ("b", 0)], &[("a", 1), ("b", 0)]]);
    let mut sketch = LoadSketch::new(Arc::new(view));
    sketch.populate(Some(&host("a"))).await.unwrap();

    assert_eq!(sketch.tracked_nodes().collect::<Vec<_>>(), vec![&host("a")]);
    assert_eq!(sketch.shard_loads(&host("a")), Some(vec![1, 1]));
    assert!(sketch.shard_loads(&host("b")).is_none());
}

#[tokio::test]
async fn repeated_next_shard_only_grows_load() {
    let view = SyntheticView::new(&[("a", 5)])
        .with_table("t1", &[&[("a", 4)], &[("a", 4)], &[("a", 2)]]);
    let mut sketch = LoadSketch::new(Arc::new(view));
    sketch.populate(None).await.unwrap();

    let mut before = sketch.shard_loads(&host("a")).unwrap();
    let start = sketch.total_load(&host("a")).unwrap();
    for k in 1..=23 {
        sketch.next_shard(&host("a")).unwrap();
        let after = sketch.shard_loads(&host("a")).unwrap();
        assert!(before.iter().zip(&after).all(|(b, a)| a >= b));
        assert_eq!(sketch.total_load(&host("a")), Some(start + k));
        assert_root_is_min(&sketch, &host("a"));
        before = after;
    }
    let max = before.iter().max().unwrap();
    let min = before.iter().min().unwrap();
    assert!(max - min <= 1, "greedy picks left imbalance: {before:?}");
}

#[test]
fn fresh_node_starts_at_zero() {
    let view = Arc::new(SyntheticView::new(&[("a", 6)]));
    let mut sketch = LoadSketch::new(Arc::clone(&view));

    let lookups_before = view.lookups.load(Ordering::Relaxed);
    let shard = sketch.next_shard(&host("a")).unwrap();
    let loads = sketch.shard_loads(&host("a")).unwrap();
    assert_eq!(loads.len(), 6);
    assert_eq!(loads[shard as usize], 1);
    assert_eq!(loads.iter().sum::<usize>(), 1);

    // Topology is consulted once, on first reference only.
    sketch.next_shard(&host("a")).unwrap();
    assert_eq!(view.lookups.load(Ordering::Relaxed), lookups_before + 1);
}

#[test]
fn zero_shard_count_is_fatal_and_leaves_no_entry() {
    let view = SyntheticView::new(&[("a", 0)]);
    let mut sketch = LoadSketch::new(Arc::new(view));

    let err = sketch.next_shard(&host("a")).unwrap_err();
    assert!(matches!(err, SketchError::UnknownShardCount(ref h) if *h == host("a")));
    assert!(err.to_string().contains("shard count not known for node a"));
    assert!(!sketch.is_tracked(&host("a")));
}

#[tokio::test]
async fn result_is_independent_of_yield_interval() {
    let tablets: Vec<Vec<(&str, u32)>> = (0..64)
        .map(|i| vec![("a", i % 3), ("b", (i * 7) % 4)])
        .collect();
    let slices: Vec<&[(&str, u32)]> = tablets.iter().map(Vec::as_slice).collect();
    let view = Arc::new(SyntheticView::new(&[("a", 3), ("b", 4)]).with_table("t1", &slices));

    let mut loads = Vec::new();
    for yield_every in [0, 1, 7, 1000] {
        let config = SketchConfig {
            yield_every,
            ..SketchConfig::default()
        };
        let mut sketch = LoadSketch::with_config(Arc::clone(&view), config);
        let stats = sketch.populate(None).await.unwrap();
        assert_eq!(stats.tablets_scanned, 64);
        loads.push((sketch.shard_loads(&host("a")), sketch.shard_loads(&host("b"))));
    }
    assert!(loads.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn populate_lets_other_tasks_run() {
    let view = SyntheticView::new(&[("a", 2)])
        .with_table("t1", &[&[("a", 0)], &[("a", 1)], &[("a", 0)], &[("a", 1)]]);
    let mut sketch = LoadSketch::new(Arc::new(view));

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let _task = tokio::spawn(async move {
        flag.store(true, Ordering::SeqCst);
    });

    // The test runtime is single-threaded, so the spawned task can only
    // have run if populate yielded.
    sketch.populate(None).await.unwrap();
    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn sketches_share_one_snapshot() {
    let view = Arc::new(
        SyntheticView::new(&[("a", 2), ("b", 2)])
            .with_table("t1", &[&[("a", 0), ("b", 1)]]),
    );
    let mut whole = LoadSketch::new(Arc::clone(&view));
    let mut only_b = LoadSketch::new(Arc::clone(&view));

    let handle = tokio::spawn(async move {
        whole.populate(None).await.map(|_| whole)
    });
    only_b.populate(Some(&host("b"))).await.unwrap();
    let whole = handle.await.unwrap().unwrap();

    assert_eq!(whole.shard_loads(&host("a")), Some(vec![1, 0]));
    assert_eq!(only_b.shard_loads(&host("b")), Some(vec![0, 1]));
    assert!(!only_b.is_tracked(&host("a")));
}

#[tokio::test]
async fn snapshot_file_drives_the_sketch() {
    let file = SnapshotFile::from_file(&fixture("cluster.toml")).unwrap();
    let tm = Arc::new(file.token_metadata().unwrap());
    let mut sketch = LoadSketch::with_config(tm, file.sketch.clone());
    let stats = sketch.populate(None).await.unwrap();

    assert_eq!(stats.tablets_scanned, 8);
    assert_eq!(stats.replicas_out_of_range, 1);
    assert_eq!(sketch.shard_loads(&host("node-a")), Some(vec![0, 2, 0]));
    assert_eq!(sketch.shard_loads(&host("node-b")), Some(vec![2, 1]));
    assert_eq!(sketch.shard_loads(&host("node-c")), Some(vec![1, 1, 1, 0]));

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["replicas_counted"], 8);

    // node-d is in topology but holds nothing yet.
    assert!(!sketch.is_tracked(&host("node-d")));
    assert!(sketch.next_shard(&host("node-d")).unwrap() < 2);
}
