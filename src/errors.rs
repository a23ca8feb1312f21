use crate::ids::{NodeId, WayId};

/// Errors surfaced across the store's public API.
///
/// `OutOfSpace` (arena allocation failure) never reaches this enum: it is
/// caught internally by the resize-retry loop in `store::arena` and turned
/// into a `grow()` followed by a retry, per the protocol in the spec.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("node {0} is out of range for the compact node store")]
    NodeOutOfRange(NodeId),

    #[error("node {0} was not found")]
    NodeNotFound(NodeId),

    #[error("way {0} was not found")]
    WayNotFound(WayId),

    #[error("relation {0} was not found")]
    RelationNotFound(WayId),

    #[error("way {0} has no nodes")]
    EmptyWay(WayId),

    #[error("failed to grow the backing arena")]
    GrowthFailure(#[source] std::io::Error),

    #[error("failed to (de)serialize a stored geometry")]
    Serialization(#[source] bincode::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
