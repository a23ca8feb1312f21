pub mod arena;
pub mod assembler;
pub mod geometry;
pub mod nodes;
pub mod relations;
pub mod ways;

use crate::errors::StoreError;
use crate::ids::{Handle, LatpLon, NodeId, WayId};
use crate::tags::Tags;
use arena::{Arena, DEFAULT_INITIAL_SIZE};
use assembler::Assembler;
use geo::{LineString, MultiPolygon, Point, Polygon};
pub use geometry::GeometryKind;
use geometry::GeometryStore;
use nodes::{CompactNodeStore, NodeStore, SparseNodeStore};
use relations::RelationStore;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use ways::WayStore;

/// Which concrete `NodeStore` layout a `GeoStore` should use, selected once
/// at construction time (spec.md §4.B, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStoreKind {
    Compact,
    Sparse,
}

/// Construction-time configuration for a `GeoStore`. No env vars or CLI
/// parsing happens in this crate; a caller (e.g. an importer binary) is
/// expected to build one of these from whatever configuration surface it
/// already has.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub arena_path: PathBuf,
    pub initial_arena_size: u64,
    pub node_store: NodeStoreKind,
    pub expected_nodes: usize,
    pub expected_ways: usize,
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(arena_path: P, node_store: NodeStoreKind) -> StoreConfig {
        StoreConfig {
            arena_path: arena_path.as_ref().to_path_buf(),
            initial_arena_size: DEFAULT_INITIAL_SIZE,
            node_store,
            expected_nodes: 0,
            expected_ways: 0,
        }
    }

    pub fn with_initial_arena_size(mut self, bytes: u64) -> StoreConfig {
        self.initial_arena_size = bytes;
        self
    }

    /// Hint used to pre-`reserve` the node store. Only `Compact` acts on
    /// this (it needs an up-front allocation sized to the id range);
    /// `Sparse` just reserves hash map capacity.
    pub fn with_expected_nodes(mut self, count: usize) -> StoreConfig {
        self.expected_nodes = count;
        self
    }

    /// Hint used to pre-size the way store's id index (spec.md §6).
    pub fn with_expected_ways(mut self, count: usize) -> StoreConfig {
        self.expected_ways = count;
        self
    }
}

/// The façade of spec.md §4.G: owns the arena and every entity/geometry
/// store built on top of it. Every mutating method funnels its arena work
/// through a substore that already wraps itself in `with_resize_retry`, so
/// growth is transparent to callers.
pub struct GeoStore {
    arena: Arena,
    nodes: Box<dyn NodeStore>,
    ways: WayStore,
    relations: RelationStore,
    osm_geometries: GeometryStore,
    shp_geometries: GeometryStore,
}

impl GeoStore {
    pub fn open(config: StoreConfig) -> Result<GeoStore, StoreError> {
        let mut arena = Arena::create(&config.arena_path, config.initial_arena_size)?;

        let mut nodes: Box<dyn NodeStore> = match config.node_store {
            NodeStoreKind::Compact => Box::new(CompactNodeStore::new()),
            NodeStoreKind::Sparse => Box::new(SparseNodeStore::new()),
        };
        if config.expected_nodes > 0 {
            nodes.reserve(&mut arena, config.expected_nodes)?;
        }

        let ways = if config.expected_ways > 0 {
            WayStore::with_capacity(config.expected_ways)
        } else {
            WayStore::new()
        };

        Ok(GeoStore {
            arena,
            nodes,
            ways,
            relations: RelationStore::new(),
            osm_geometries: GeometryStore::new(),
            shp_geometries: GeometryStore::new(),
        })
    }

    pub fn insert_node(&mut self, id: NodeId, latp: i32, lon: i32) -> Result<(), StoreError> {
        self.nodes.insert(&mut self.arena, id, LatpLon::new(latp, lon))
    }

    pub fn insert_node_with_tags(&mut self, id: NodeId, latp: i32, lon: i32, tags: Tags) -> Result<(), StoreError> {
        self.nodes.insert_with_tags(&mut self.arena, id, LatpLon::new(latp, lon), tags)
    }

    pub fn insert_way(&mut self, id: WayId, nodes: &[NodeId]) -> Result<Handle, StoreError> {
        self.ways.insert(&mut self.arena, id, nodes)
    }

    pub fn insert_way_with_tags(&mut self, id: WayId, nodes: &[NodeId], tags: Tags) -> Result<Handle, StoreError> {
        self.ways.insert_with_tags(&mut self.arena, id, nodes, tags)
    }

    pub fn insert_relation(&mut self, id: WayId, outer: &[WayId], inner: &[WayId]) -> Result<Handle, StoreError> {
        self.relations.insert(&mut self.arena, id, outer, inner)
    }

    pub fn insert_relation_with_tags(
        &mut self,
        id: WayId,
        outer: &[WayId],
        inner: &[WayId],
        tags: Tags,
    ) -> Result<Handle, StoreError> {
        self.relations.insert_with_tags(&mut self.arena, id, outer, inner, tags)
    }

    pub fn lookup_node(&self, id: NodeId) -> Result<LatpLon, StoreError> {
        self.nodes.lookup(&self.arena, id)
    }

    pub fn node_tags(&self, id: NodeId) -> Option<&Tags> {
        self.nodes.tags(id)
    }

    pub fn way_tags(&self, id: WayId) -> Option<&Tags> {
        self.ways.tags(id)
    }

    pub fn relation_tags(&self, id: WayId) -> Option<&Tags> {
        self.relations.tags(id)
    }

    pub fn way_as_linestring(&self, id: WayId) -> Result<LineString<f64>, StoreError> {
        self.assembler().way_as_linestring(id)
    }

    pub fn way_as_polygon(&self, id: WayId) -> Result<Polygon<f64>, StoreError> {
        self.assembler().way_as_polygon(id)
    }

    pub fn way_is_closed(&self, id: WayId) -> Result<bool, StoreError> {
        self.assembler().way_is_closed(id)
    }

    pub fn relation_as_multipolygon(&self, outer: &[WayId], inner: &[WayId]) -> Result<MultiPolygon<f64>, StoreError> {
        self.assembler().relation_as_multipolygon(outer, inner)
    }

    pub fn store_point(&mut self, which: GeometryKind, value: &Point<f64>) -> Result<Handle, StoreError> {
        match which {
            GeometryKind::Osm => self.osm_geometries.store_point(&mut self.arena, value),
            GeometryKind::Shp => self.shp_geometries.store_point(&mut self.arena, value),
        }
    }

    pub fn store_linestring(&mut self, which: GeometryKind, value: &LineString<f64>) -> Result<Handle, StoreError> {
        match which {
            GeometryKind::Osm => self.osm_geometries.store_linestring(&mut self.arena, value),
            GeometryKind::Shp => self.shp_geometries.store_linestring(&mut self.arena, value),
        }
    }

    pub fn store_multipolygon(&mut self, which: GeometryKind, value: &MultiPolygon<f64>) -> Result<Handle, StoreError> {
        match which {
            GeometryKind::Osm => self.osm_geometries.store_multipolygon(&mut self.arena, value),
            GeometryKind::Shp => self.shp_geometries.store_multipolygon(&mut self.arena, value),
        }
    }

    pub fn retrieve<T: DeserializeOwned>(&self, which: GeometryKind, handle: Handle) -> Result<T, StoreError> {
        self.geometry_store(which).retrieve(&self.arena, handle)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.size()
    }

    pub fn way_count(&self) -> usize {
        self.ways.size()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.size()
    }

    pub fn arena_capacity(&self) -> u64 {
        self.arena.capacity()
    }

    pub fn arena_used(&self) -> u64 {
        self.arena.used()
    }

    /// Resets all three entity stores to empty, per spec.md §8: "after
    /// `clear()`, `size()` is 0 for all three entity stores; arena capacity
    /// is unchanged." Generated geometries are cleared along with them,
    /// since they're derived from the entities being cleared; the arena
    /// itself is untouched — its capacity and any already-written bytes
    /// stay as they are, only the bookkeeping that addresses them resets.
    pub fn clear(&mut self) {
        self.nodes.clear(&mut self.arena);
        self.ways.clear();
        self.relations.clear();
        self.osm_geometries.clear();
        self.shp_geometries.clear();
    }

    fn assembler(&self) -> Assembler<'_> {
        Assembler::new(&self.arena, self.nodes.as_ref(), &self.ways)
    }

    fn geometry_store(&self, which: GeometryKind) -> &GeometryStore {
        match which {
            GeometryKind::Osm => &self.osm_geometries,
            GeometryKind::Shp => &self.shp_geometries,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use tempfile::NamedTempFile;

    fn config(size: u64) -> StoreConfig {
        let f = NamedTempFile::new().unwrap();
        let path = f.path().to_path_buf();
        drop(f);
        StoreConfig::new(path, NodeStoreKind::Compact).with_initial_arena_size(size)
    }

    #[test]
    fn end_to_end_single_closed_way_becomes_a_polygon() {
        let mut store = GeoStore::open(config(65536)).unwrap();
        for (id, latp, lon) in [(1u64, 0, 0), (2, 10_000_000, 0), (3, 10_000_000, 10_000_000), (4, 0, 10_000_000)] {
            store.insert_node(id, latp, lon).unwrap();
        }
        store.insert_way(10, &[1, 2, 3, 4, 1]).unwrap();

        assert!(store.way_is_closed(10).unwrap());
        let polygon = store.way_as_polygon(10).unwrap();
        assert_eq!(polygon.exterior().0.len(), 5);
    }

    #[test]
    fn relation_stitches_two_outer_fragments_and_attaches_inner() {
        let mut store = GeoStore::open(config(65536)).unwrap();
        let outer_nodes = [
            (1u64, 0, 0),
            (2, 0, 40_000_000),
            (3, 40_000_000, 40_000_000),
            (4, 40_000_000, 0),
        ];
        for (id, latp, lon) in outer_nodes {
            store.insert_node(id, latp, lon).unwrap();
        }
        let inner_nodes = [
            (5u64, 10_000_000, 10_000_000),
            (6, 10_000_000, 20_000_000),
            (7, 20_000_000, 20_000_000),
            (8, 20_000_000, 10_000_000),
        ];
        for (id, latp, lon) in inner_nodes {
            store.insert_node(id, latp, lon).unwrap();
        }

        store.insert_way(100, &[1, 2, 3]).unwrap();
        store.insert_way(101, &[3, 4, 1]).unwrap();
        store.insert_way(200, &[5, 6, 7, 8, 5]).unwrap();
        store.insert_relation(-1, &[100, 101], &[200]).unwrap();

        let (outer, inner) = (vec![100, 101], vec![200]);
        let multipolygon = store.relation_as_multipolygon(&outer, &inner).unwrap();
        assert_eq!(multipolygon.0.len(), 1);
        assert_eq!(multipolygon.0[0].interiors().len(), 1);
    }

    #[test]
    fn stores_and_retrieves_a_generated_point() {
        let mut store = GeoStore::open(config(65536)).unwrap();
        let point = Point::new(1.0, 2.0);
        let handle = store.store_point(GeometryKind::Osm, &point).unwrap();
        let back: Point<f64> = store.retrieve(GeometryKind::Osm, handle).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn arena_grows_to_fit_a_reservation_larger_than_its_initial_size() {
        let mut store = GeoStore::open(config(64).with_expected_nodes(2000)).unwrap();
        for id in 0..2000u64 {
            store.insert_node(id, id as i32, id as i32).unwrap();
        }
        assert_eq!(store.node_count(), 2000);
        assert!(store.arena_capacity() > 64);
    }

    #[test]
    fn compact_store_reports_out_of_range() {
        let mut store = GeoStore::open(config(65536).with_expected_nodes(10)).unwrap();
        assert!(matches!(store.insert_node(50, 1, 1), Err(StoreError::NodeOutOfRange(50))));
    }

    #[test]
    fn expected_ways_hint_pre_sizes_the_way_store_without_affecting_behavior() {
        let mut store = GeoStore::open(config(65536).with_expected_ways(50)).unwrap();
        store.insert_node(1, 0, 0).unwrap();
        store.insert_node(2, 1, 1).unwrap();
        store.insert_way(1, &[1, 2]).unwrap();
        assert_eq!(store.way_count(), 1);
    }

    #[test]
    fn node_tags_round_trip_through_the_facade() {
        let mut store = GeoStore::open(config(65536)).unwrap();
        let mut tags = Tags::new();
        tags.insert("amenity".to_string(), "bench".to_string());
        store.insert_node_with_tags(1, 0, 0, tags.clone()).unwrap();
        store.insert_node(2, 1, 1).unwrap();
        assert_eq!(store.node_tags(1), Some(&tags));
        assert_eq!(store.node_tags(2), None);
    }

    #[test]
    fn clear_empties_every_entity_store_but_keeps_arena_capacity() {
        let mut store = GeoStore::open(config(65536).with_expected_nodes(10)).unwrap();
        store.insert_node(1, 1, 1).unwrap();
        store.insert_way(10, &[1]).unwrap();
        store.insert_relation(-1, &[10], &[]).unwrap();
        let capacity_before = store.arena_capacity();

        store.clear();

        assert_eq!(store.node_count(), 0);
        assert_eq!(store.way_count(), 0);
        assert_eq!(store.relation_count(), 0);
        assert_eq!(store.arena_capacity(), capacity_before);
    }

    #[test]
    fn linestring_from_way_preserves_node_order() {
        let mut store = GeoStore::open(config(65536)).unwrap();
        store.insert_node(1, 0, 0).unwrap();
        store.insert_node(2, 1, 1).unwrap();
        store.insert_way(5, &[1, 2]).unwrap();
        let ls = store.way_as_linestring(5).unwrap();
        assert_eq!(ls.0, vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1e-7, y: 1e-7 }]);
    }
}
