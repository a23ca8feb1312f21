use crate::errors::StoreError;
use crate::ids::Handle;
use crate::store::arena::{with_resize_retry, Arena};
use byteorder::{ByteOrder, LittleEndian};
use geo::{LineString, MultiPolygon, Point};
use serde::de::DeserializeOwned;
use serde::Serialize;

const LENGTH_PREFIX_SIZE: u64 = 8;

/// Selects which of the façade's two `GeometryStore`s an operation targets:
/// geometry derived straight from OSM ways/relations, or geometry supplied
/// by an external shapefile overlay. Kept as a plain enum rather than two
/// differently-typed stores because every operation on them is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Osm,
    Shp,
}

/// One of the two parallel stores from spec.md §4.E: three append-only
/// "deques" (points, linestrings, multipolygons). Each is tracked here as a
/// `Vec<Handle>` — the payload itself is bincode-serialized straight into
/// the arena, one allocation per value, which gives every element a stable
/// address for free (a bump allocation is never moved once made) without
/// needing a segmented container to get there.
#[derive(Default)]
pub struct GeometryStore {
    points: Vec<Handle>,
    linestrings: Vec<Handle>,
    multipolygons: Vec<Handle>,
}

impl GeometryStore {
    pub fn new() -> GeometryStore {
        GeometryStore::default()
    }

    pub fn store_point(&mut self, arena: &mut Arena, value: &Point<f64>) -> Result<Handle, StoreError> {
        let handle = write_value(arena, value)?;
        self.points.push(handle);
        Ok(handle)
    }

    pub fn store_linestring(&mut self, arena: &mut Arena, value: &LineString<f64>) -> Result<Handle, StoreError> {
        let handle = write_value(arena, value)?;
        self.linestrings.push(handle);
        Ok(handle)
    }

    pub fn store_multipolygon(&mut self, arena: &mut Arena, value: &MultiPolygon<f64>) -> Result<Handle, StoreError> {
        let handle = write_value(arena, value)?;
        self.multipolygons.push(handle);
        Ok(handle)
    }

    pub fn retrieve<T: DeserializeOwned>(&self, arena: &Arena, handle: Handle) -> Result<T, StoreError> {
        read_value(arena, handle)
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn linestring_count(&self) -> usize {
        self.linestrings.len()
    }

    pub fn multipolygon_count(&self) -> usize {
        self.multipolygons.len()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.linestrings.clear();
        self.multipolygons.clear();
    }
}

fn write_value<T: Serialize>(arena: &mut Arena, value: &T) -> Result<Handle, StoreError> {
    let payload = bincode::serialize(value).map_err(StoreError::Serialization)?;
    let total_len = LENGTH_PREFIX_SIZE + payload.len() as u64;
    let handle = with_resize_retry(arena, |a| a.alloc_bytes(total_len))?;
    let buf = arena.bytes_mut(handle, total_len);
    LittleEndian::write_u64(&mut buf[0..8], payload.len() as u64);
    buf[8..].copy_from_slice(&payload);
    Ok(handle)
}

fn read_value<T: DeserializeOwned>(arena: &Arena, handle: Handle) -> Result<T, StoreError> {
    let len_bytes = arena.bytes(handle, LENGTH_PREFIX_SIZE);
    let payload_len = LittleEndian::read_u64(len_bytes);
    let payload = arena.bytes(handle + LENGTH_PREFIX_SIZE, payload_len);
    bincode::deserialize(payload).map_err(StoreError::Serialization)
}
