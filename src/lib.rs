pub mod errors;
pub mod ids;
pub mod store;
pub mod tags;

pub use errors::StoreError;
pub use ids::{Handle, LatpLon, NodeId, WayId};
pub use store::{GeoStore, GeometryKind, NodeStoreKind, StoreConfig};
