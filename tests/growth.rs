use osm_geostore::{GeoStore, NodeStoreKind, StoreConfig};
use tempfile::NamedTempFile;

fn temp_path() -> std::path::PathBuf {
    let f = NamedTempFile::new().unwrap();
    let path = f.path().to_path_buf();
    drop(f);
    path
}

// spec.md §8 scenario 5: inserting far more nodes than the arena's initial
// size allows must transparently grow the backing file and remap, with
// every node inserted before the growth still reachable afterwards.
#[test]
fn a_million_nodes_survive_repeated_arena_growth() {
    const NODE_COUNT: u64 = 1_000_000;

    let config = StoreConfig::new(temp_path(), NodeStoreKind::Compact)
        .with_initial_arena_size(4096)
        .with_expected_nodes(NODE_COUNT as usize);
    let mut store = GeoStore::open(config).unwrap();

    for id in 0..NODE_COUNT {
        let latp = (id % 900_000_000) as i32;
        let lon = (id % 1_800_000_000) as i32;
        store.insert_node(id, latp, lon).unwrap();
    }

    assert_eq!(store.node_count() as u64, NODE_COUNT);
    assert!(store.arena_capacity() >= NODE_COUNT * 8);

    for id in (0..NODE_COUNT).step_by(997) {
        let latp = (id % 900_000_000) as i32;
        let lon = (id % 1_800_000_000) as i32;
        let looked_up = store.lookup_node(id).unwrap();
        assert_eq!(looked_up.latp, latp);
        assert_eq!(looked_up.lon, lon);
    }
}

// Ways and relations inserted before a growth triggered by unrelated node
// inserts must remain readable afterwards: handles are arena-relative
// offsets, never raw pointers, so a remap can't invalidate them.
#[test]
fn way_handles_survive_growth_triggered_by_later_node_inserts() {
    let config = StoreConfig::new(temp_path(), NodeStoreKind::Sparse).with_initial_arena_size(64);
    let mut store = GeoStore::open(config).unwrap();

    for id in 0..8u64 {
        store.insert_node(id, id as i32, id as i32).unwrap();
    }
    store.insert_way(1, &[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();

    // Sparse doesn't touch the arena for nodes, so force growth through a
    // large run of additional way inserts.
    for id in 0..2000i64 {
        store.insert_way(id + 100, &[0, 1, 2]).unwrap();
    }

    assert!(store.arena_capacity() > 64);
    assert_eq!(store.way_as_linestring(1).unwrap().0.len(), 8);
}
