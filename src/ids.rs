use serde::{Deserialize, Serialize};

/// 64-bit OSM node id. In `Compact` node store mode this also doubles as a
/// dense array index.
pub type NodeId = u64;

/// 64-bit OSM way id. Real OSM ways are positive; multipolygon relations are
/// synthesized with negative pseudo-ids so they can share the same id space
/// as ways when a relation needs to be addressed like one.
pub type WayId = i64;

/// An offset into the arena, relative to its base address. Never a raw
/// pointer: every dereference re-resolves through the live mapping, which is
/// what lets a handle survive `Arena::grow`.
pub type Handle = u64;

/// Mercator-projected latitude and longitude, in units of 1/10^7 degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LatpLon {
    pub latp: i32,
    pub lon: i32,
}

impl LatpLon {
    pub fn new(latp: i32, lon: i32) -> LatpLon {
        LatpLon { latp, lon }
    }

    pub fn lat_f64(&self) -> f64 {
        f64::from(self.latp) / 1e7
    }

    pub fn lon_f64(&self) -> f64 {
        f64::from(self.lon) / 1e7
    }
}
