use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for minting process-unique node identities.
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a graph node, assigned at construction.
///
/// Identities are never reused, so a `NodeId` found in an edge table can be
/// trusted even after the node it named has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u64);

impl NodeId {
    /// Mint the next unused identity.
    pub(crate) fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Version is a monotonically increasing number bumped when a producer's
/// value semantically changes. Recomputing to an equal value does not bump it.
///
/// Versions are node-local: comparing versions of different nodes is
/// meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version(pub u64);

impl Version {
    /// The version after this one.
    #[must_use]
    pub fn next(self) -> Self {
        Version(self.0 + 1)
    }
}

/// TrackingVersion is a consumer-local monotonically increasing number bumped
/// each time the consumer is about to re-run its computation and thereby
/// re-establish its dependency set.
///
/// An edge stamped with an older tracking version belongs to a previous run
/// and is no longer live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackingVersion(pub u64);

impl TrackingVersion {
    /// The tracking version after this one.
    #[must_use]
    pub fn next(self) -> Self {
        TrackingVersion(self.0 + 1)
    }
}
