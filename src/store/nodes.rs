use crate::errors::StoreError;
use crate::ids::{LatpLon, NodeId};
use crate::store::arena::{with_resize_retry, Arena};
use crate::tags::Tags;
use byteorder::{ByteOrder, LittleEndian};
use std::collections::HashMap;

const LATPLON_SIZE: u64 = 8;

/// The capability every node store layout provides, selected once at
/// construction time (spec.md §4.B, §9: "two concrete types behind a
/// capability interface ... either is acceptable").
pub trait NodeStore: Send {
    fn reserve(&mut self, arena: &mut Arena, expected_count: usize) -> Result<(), StoreError>;
    fn insert(&mut self, arena: &mut Arena, id: NodeId, value: LatpLon) -> Result<(), StoreError>;
    fn insert_with_tags(&mut self, arena: &mut Arena, id: NodeId, value: LatpLon, tags: Tags) -> Result<(), StoreError>;
    fn lookup(&self, arena: &Arena, id: NodeId) -> Result<LatpLon, StoreError>;
    fn tags(&self, id: NodeId) -> Option<&Tags>;
    fn contains(&self, arena: &Arena, id: NodeId) -> bool;
    fn size(&self) -> usize;
    fn clear(&mut self, arena: &mut Arena);
}

/// Dense-array layout: a single arena allocation of
/// `reserved_count * size_of::<LatpLon>()` bytes, indexed directly by id.
/// Suited to a filtered extract whose node ids were renumbered into a
/// compact range ahead of time.
///
/// Tags (SPEC_FULL.md §3, grounded on the teacher's `RawNode` carrying tags
/// in `geodata/importer.rs`) live in a side `HashMap` rather than inline:
/// the arena-backed `LatpLon` record is a fixed 8 bytes with no room for a
/// variable-length map, so a node's tags — present for only a minority of
/// nodes in practice — are kept alongside it in ordinary process memory,
/// the same division `WayStore`/`RelationStore` use for their own `Tags`.
pub struct CompactNodeStore {
    base: Option<u64>,
    reserved_count: usize,
    len: usize,
    tags: HashMap<NodeId, Tags>,
}

impl CompactNodeStore {
    pub fn new() -> CompactNodeStore {
        CompactNodeStore {
            base: None,
            reserved_count: 0,
            len: 0,
            tags: HashMap::new(),
        }
    }

    fn offset(&self, id: NodeId) -> Result<u64, StoreError> {
        let idx = id as usize;
        if idx >= self.reserved_count {
            return Err(StoreError::NodeOutOfRange(id));
        }
        let base = self.base.expect("reserve() must run before any insert/lookup");
        Ok(base + (idx as u64) * LATPLON_SIZE)
    }
}

impl Default for CompactNodeStore {
    fn default() -> Self {
        CompactNodeStore::new()
    }
}

impl NodeStore for CompactNodeStore {
    fn reserve(&mut self, arena: &mut Arena, expected_count: usize) -> Result<(), StoreError> {
        let bytes_needed = (expected_count as u64) * LATPLON_SIZE;
        let handle = with_resize_retry(arena, |a| a.alloc_bytes(bytes_needed))?;
        self.base = Some(handle);
        self.reserved_count = expected_count;
        self.len = 0;
        Ok(())
    }

    fn insert(&mut self, arena: &mut Arena, id: NodeId, value: LatpLon) -> Result<(), StoreError> {
        let offset = self.offset(id)?;
        let was_unset = arena.bytes(offset, LATPLON_SIZE) == [0u8; 8];
        let buf = arena.bytes_mut(offset, LATPLON_SIZE);
        LittleEndian::write_i32(&mut buf[0..4], value.latp);
        LittleEndian::write_i32(&mut buf[4..8], value.lon);
        if was_unset {
            self.len += 1;
        }
        Ok(())
    }

    fn insert_with_tags(&mut self, arena: &mut Arena, id: NodeId, value: LatpLon, tags: Tags) -> Result<(), StoreError> {
        NodeStore::insert(self, arena, id, value)?;
        self.tags.insert(id, tags);
        Ok(())
    }

    fn lookup(&self, arena: &Arena, id: NodeId) -> Result<LatpLon, StoreError> {
        let offset = self.offset(id)?;
        let buf = arena.bytes(offset, LATPLON_SIZE);
        Ok(LatpLon::new(LittleEndian::read_i32(&buf[0..4]), LittleEndian::read_i32(&buf[4..8])))
    }

    fn tags(&self, id: NodeId) -> Option<&Tags> {
        self.tags.get(&id)
    }

    fn contains(&self, arena: &Arena, id: NodeId) -> bool {
        match self.offset(id) {
            Ok(offset) => arena.bytes(offset, LATPLON_SIZE) != [0u8; 8],
            Err(_) => false,
        }
    }

    fn size(&self) -> usize {
        self.len
    }

    fn clear(&mut self, arena: &mut Arena) {
        if let Some(base) = self.base {
            let bytes_used = (self.reserved_count as u64) * LATPLON_SIZE;
            arena.bytes_mut(base, bytes_used).iter_mut().for_each(|b| *b = 0);
        }
        self.len = 0;
        self.tags.clear();
    }
}

/// Open-addressed hash map layout, suited to a full-planet extract whose
/// ids have not been renumbered. `lookup` of an id that was never inserted
/// fails with `NotFound` rather than `OutOfRange`.
///
/// The map lives in ordinary process memory rather than inside the arena:
/// `NodeStore` never hands out a `Handle` (spec.md §6 — `lookup_node`
/// returns a value, not a reference), so nothing about the handle-stability
/// contract requires its backing memory to live in the mmap region. See
/// DESIGN.md.
#[derive(Default)]
pub struct SparseNodeStore {
    map: HashMap<NodeId, LatpLon>,
    tags: HashMap<NodeId, Tags>,
}

impl SparseNodeStore {
    pub fn new() -> SparseNodeStore {
        SparseNodeStore::default()
    }
}

impl NodeStore for SparseNodeStore {
    fn reserve(&mut self, _arena: &mut Arena, expected_count: usize) -> Result<(), StoreError> {
        self.map.reserve(expected_count);
        Ok(())
    }

    fn insert(&mut self, _arena: &mut Arena, id: NodeId, value: LatpLon) -> Result<(), StoreError> {
        // Add-only: the most recently inserted value for an id wins, no
        // overwrite contract is promised beyond that.
        self.map.insert(id, value);
        Ok(())
    }

    fn insert_with_tags(&mut self, _arena: &mut Arena, id: NodeId, value: LatpLon, tags: Tags) -> Result<(), StoreError> {
        self.map.insert(id, value);
        self.tags.insert(id, tags);
        Ok(())
    }

    fn lookup(&self, _arena: &Arena, id: NodeId) -> Result<LatpLon, StoreError> {
        self.map.get(&id).copied().ok_or(StoreError::NodeNotFound(id))
    }

    fn tags(&self, id: NodeId) -> Option<&Tags> {
        self.tags.get(&id)
    }

    fn contains(&self, _arena: &Arena, id: NodeId) -> bool {
        self.map.contains_key(&id)
    }

    fn size(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self, _arena: &mut Arena) {
        self.map.clear();
        self.tags.clear();
    }
}
