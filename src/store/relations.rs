use crate::errors::StoreError;
use crate::ids::{Handle, WayId};
use crate::store::arena::{with_resize_retry, Arena};
use crate::tags::Tags;
use byteorder::{ByteOrder, LittleEndian};
use indexmap::IndexMap;

const WAY_ID_SIZE: u64 = 8;

struct RelationRecord {
    outer_handle: Handle,
    outer_count: u32,
    inner_handle: Handle,
    inner_count: u32,
    tags: Tags,
}

/// `WayID (pseudo-id) -> (outer way-ids, inner way-ids)`, mirroring
/// `WayStore`'s layout: one index keyed by the relation's pseudo-id, two
/// arena-backed payload vectors per entry. `insert_front`'s naming hint in
/// spec.md §4.D ("relations are inserted with decreasing pseudo-ids") is
/// not enforced here either — the store only guarantees what it's asked to
/// store, uniqueness is the caller's responsibility.
#[derive(Default)]
pub struct RelationStore {
    index: IndexMap<WayId, RelationRecord>,
}

impl RelationStore {
    pub fn new() -> RelationStore {
        RelationStore::default()
    }

    pub fn insert(&mut self, arena: &mut Arena, id: WayId, outer: &[WayId], inner: &[WayId]) -> Result<Handle, StoreError> {
        let outer_handle = write_way_ids(arena, outer)?;
        let inner_handle = write_way_ids(arena, inner)?;
        self.index.insert(
            id,
            RelationRecord {
                outer_handle,
                outer_count: outer.len() as u32,
                inner_handle,
                inner_count: inner.len() as u32,
                tags: Tags::default(),
            },
        );
        Ok(outer_handle)
    }

    pub fn insert_with_tags(
        &mut self,
        arena: &mut Arena,
        id: WayId,
        outer: &[WayId],
        inner: &[WayId],
        tags: Tags,
    ) -> Result<Handle, StoreError> {
        let handle = self.insert(arena, id, outer, inner)?;
        self.index.get_mut(&id).expect("just inserted").tags = tags;
        Ok(handle)
    }

    pub fn lookup(&self, arena: &Arena, id: WayId) -> Result<(Vec<WayId>, Vec<WayId>), StoreError> {
        let record = self.index.get(&id).ok_or(StoreError::RelationNotFound(id))?;
        Ok((
            read_way_ids(arena, record.outer_handle, record.outer_count),
            read_way_ids(arena, record.inner_handle, record.inner_count),
        ))
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

fn write_way_ids(arena: &mut Arena, ids: &[WayId]) -> Result<Handle, StoreError> {
    let bytes_len = (ids.len() as u64) * WAY_ID_SIZE;
    let handle = with_resize_retry(arena, |a| a.alloc_bytes(bytes_len))?;
    let buf = arena.bytes_mut(handle, bytes_len);
    for (i, way_id) in ids.iter().enumerate() {
        LittleEndian::write_i64(&mut buf[i * 8..i * 8 + 8], *way_id);
    }
    Ok(handle)
}

fn read_way_ids(arena: &Arena, handle: Handle, count: u32) -> Vec<WayId> {
    let bytes_len = (count as u64) * WAY_ID_SIZE;
    let buf = arena.bytes(handle, bytes_len);
    (0..count as usize).map(|i| LittleEndian::read_i64(&buf[i * 8..i * 8 + 8])).collect()
}
