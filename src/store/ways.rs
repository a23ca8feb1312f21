use crate::errors::StoreError;
use crate::ids::{Handle, NodeId, WayId};
use crate::store::arena::{with_resize_retry, Arena};
use crate::tags::Tags;
use byteorder::{ByteOrder, LittleEndian};
use indexmap::IndexMap;

const NODE_ID_SIZE: u64 = 8;

struct WayRecord {
    handle: Handle,
    node_count: u32,
    tags: Tags,
}

/// `WayID -> Vec<NodeID>`, arena-backed for the node-id payloads. The index
/// itself (id to handle/length) is kept as an `IndexMap` rather than a
/// plain `HashMap` so that iterating the store preserves insertion order,
/// per spec.md §5's "insertion order within one entity kind is preserved".
#[derive(Default)]
pub struct WayStore {
    index: IndexMap<WayId, WayRecord>,
}

impl WayStore {
    pub fn new() -> WayStore {
        WayStore::default()
    }

    /// Pre-sizes the id index from `StoreConfig::expected_ways` (spec.md
    /// §6: "expected node count and expected way count for `reserve()`"),
    /// mirroring `CompactNodeStore::reserve`'s up-front allocation but for
    /// the index capacity only — a way's node-id payload size isn't known
    /// until insert time, so there's nothing to pre-allocate in the arena.
    pub fn with_capacity(expected_ways: usize) -> WayStore {
        WayStore {
            index: IndexMap::with_capacity(expected_ways),
        }
    }

    /// Insert-once semantics: re-inserting an id is undefined per spec.md
    /// §4.C. We don't detect it, matching the source's contract.
    ///
    /// Rejects an empty node slice: spec.md §3 requires a way to carry a
    /// non-empty ordered sequence of node ids.
    pub fn insert(&mut self, arena: &mut Arena, id: WayId, nodes: &[NodeId]) -> Result<Handle, StoreError> {
        if nodes.is_empty() {
            return Err(StoreError::EmptyWay(id));
        }
        let bytes_len = (nodes.len() as u64) * NODE_ID_SIZE;
        let handle = with_resize_retry(arena, |a| a.alloc_bytes(bytes_len))?;
        let buf = arena.bytes_mut(handle, bytes_len);
        for (i, node_id) in nodes.iter().enumerate() {
            LittleEndian::write_u64(&mut buf[i * 8..i * 8 + 8], *node_id);
        }
        self.index.insert(
            id,
            WayRecord {
                handle,
                node_count: nodes.len() as u32,
                tags: Tags::default(),
            },
        );
        Ok(handle)
    }

    pub fn insert_with_tags(
        &mut self,
        arena: &mut Arena,
        id: WayId,
        nodes: &[NodeId],
        tags: Tags,
    ) -> Result<Handle, StoreError> {
        let handle = self.insert(arena, id, nodes)?;
        self.index.get_mut(&id).expect("just inserted").tags = tags;
        Ok(handle)
    }

    pub fn lookup(&self, arena: &Arena, id: WayId) -> Result<Vec<NodeId>, StoreError> {
        let record = self.index.get(&id).ok_or(StoreError::WayNotFound(id))?;
        Ok(read_node_ids(arena, record.handle, record.node_count))
    }

    pub fn lookup_by_handle(&self, arena: &Arena, handle: Handle, node_count: u32) -> Vec<NodeId> {
        read_node_ids(arena, handle, node_count)
    }

    pub fn tags(&self, id: WayId) -> Option<&Tags> {
        self.index.get(&id).map(|r| &r.tags)
    }

    pub fn contains(&self, id: WayId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn size(&self) -> usize {
        self.index.len()
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = WayId> + '_ {
        self.index.keys().copied()
    }
}

fn read_node_ids(arena: &Arena, handle: Handle, node_count: u32) -> Vec<NodeId> {
    let bytes_len = (node_count as u64) * NODE_ID_SIZE;
    let buf = arena.bytes(handle, bytes_len);
    (0..node_count as usize).map(|i| LittleEndian::read_u64(&buf[i * 8..i * 8 + 8])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn new_arena(size: u64) -> Arena {
        let f = NamedTempFile::new().unwrap();
        let path = f.path().to_path_buf();
        drop(f);
        Arena::create(path, size).unwrap()
    }

    #[test]
    fn insert_then_lookup_roundtrips_node_order() {
        let mut arena = new_arena(4096);
        let mut store = WayStore::new();
        store.insert(&mut arena, 100, &[1, 2, 3, 4, 1]).unwrap();
        assert_eq!(store.lookup(&arena, 100).unwrap(), vec![1, 2, 3, 4, 1]);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn missing_way_is_not_found() {
        let arena = new_arena(4096);
        let store = WayStore::new();
        assert!(matches!(store.lookup(&arena, 7), Err(StoreError::WayNotFound(7))));
    }

    #[test]
    fn empty_node_list_is_rejected() {
        let mut arena = new_arena(4096);
        let mut store = WayStore::new();
        assert!(matches!(store.insert(&mut arena, 9, &[]), Err(StoreError::EmptyWay(9))));
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn with_capacity_pre_sizes_the_index_but_stays_empty() {
        let mut arena = new_arena(4096);
        let mut store = WayStore::with_capacity(100);
        assert_eq!(store.size(), 0);
        store.insert(&mut arena, 1, &[1, 2]).unwrap();
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn preserves_insertion_order_across_ids() {
        let mut arena = new_arena(4096);
        let mut store = WayStore::new();
        store.insert(&mut arena, 5, &[1]).unwrap();
        store.insert(&mut arena, 1, &[2]).unwrap();
        store.insert(&mut arena, 3, &[3]).unwrap();
        assert_eq!(store.ids().collect::<Vec<_>>(), vec![5, 1, 3]);
    }
}
