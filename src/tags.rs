use std::collections::BTreeMap;

/// Key/value tags attached to a way or relation.
///
/// Kept as an ordinary `BTreeMap` in process memory rather than packed into
/// the arena: unlike node/way/relation geometry references, tags are never
/// addressed by `Handle`, never resized in place, and are only ever read
/// back wholesale by the entity that owns them, so there is nothing about
/// them that benefits from arena placement. The `Compact` node store in
/// particular has no room for them at all (`LatpLon` is a fixed 8-byte
/// record); nodes in this store therefore carry no tags, matching the
/// layout spec.md §4.B describes.
pub type Tags = BTreeMap<String, String>;
