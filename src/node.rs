//! Graph vertices and the edge table.
//!
//! Every participant in the dependency graph (writable signals, derived
//! values, watchers, and any external consumer a scheduler builds) is a
//! [`ReactiveNode`]. A node can act as a *producer* (it exposes a value with
//! a version), as a *consumer* (it depends on other nodes' values), or both.
//!
//! Dependencies are recorded as edges: one shared object per
//! producer/consumer pair, inserted into both endpoints' maps and holding
//! both endpoints weakly. The graph therefore never keeps a node alive;
//! whoever created a node owns it, and edges whose endpoint has been dropped
//! are pruned the next time either side is traversed.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::error::SignalError;
use crate::version::{NodeId, TrackingVersion, Version};

/// Per-node edge map, keyed by the identity of the node on the far side.
pub(crate) type EdgeMap = HashMap<NodeId, Rc<Edge>, ahash::RandomState>;

/// A vertex in the reactive dependency graph.
///
/// Concrete node kinds implement the two capability hooks; the graph
/// traversals in [`crate::graph`] dispatch through them:
///
/// - [`on_consumer_dependency_may_have_changed`] is the notification sink: a
///   producer this node depends on changed, so the node may be stale. No
///   value travels with the notification and nothing is recomputed; the hook
///   must only record staleness (and may forward it to a scheduler).
/// - [`on_producer_update_value_version`] is the currency hook: a consumer is
///   about to trust this node's value version, so the node gets a chance to
///   lazily refresh itself first (a derived value recomputing, for example).
///
/// [`on_consumer_dependency_may_have_changed`]: ReactiveNode::on_consumer_dependency_may_have_changed
/// [`on_producer_update_value_version`]: ReactiveNode::on_producer_update_value_version
pub trait ReactiveNode {
    /// The node's shared bookkeeping: identity, version counters, edges.
    fn state(&self) -> &NodeState;

    /// A producer this node depends on may have changed value.
    ///
    /// Called during a notification pass, with producer reads forbidden.
    fn on_consumer_dependency_may_have_changed(self: Rc<Self>);

    /// Bring this node's value and version up to date before they are read.
    ///
    /// Nodes whose value is always current (plain signals) implement this as
    /// a no-op. A derived value uses it to recompute if needed, and reports a
    /// re-entrant self-read as [`SignalError::Cycle`].
    fn on_producer_update_value_version(self: Rc<Self>) -> Result<(), SignalError>;

    /// Whether signal writes are permitted while this node is the active
    /// consumer.
    ///
    /// Pure derivations return `false`; consumers that intentionally perform
    /// writes (a watcher created with writes enabled) return `true`. The flag
    /// is fixed per node kind and queried through
    /// [`crate::producer_updates_allowed`].
    fn consumer_allow_signal_writes(&self) -> bool;
}

/// Bookkeeping shared by every node kind.
///
/// Concrete nodes embed one `NodeState` and hand it out through
/// [`ReactiveNode::state`].
pub struct NodeState {
    id: NodeId,
    tracking_version: Cell<TrackingVersion>,
    value_version: Cell<Version>,
    pub(crate) producers: RefCell<EdgeMap>,
    pub(crate) consumers: RefCell<EdgeMap>,
}

impl NodeState {
    /// Create bookkeeping for a new node, with a fresh identity and both
    /// version counters at zero.
    pub fn new() -> Self {
        Self {
            id: NodeId::next(),
            tracking_version: Cell::new(TrackingVersion::default()),
            value_version: Cell::new(Version::default()),
            producers: RefCell::new(EdgeMap::default()),
            consumers: RefCell::new(EdgeMap::default()),
        }
    }

    /// This node's process-unique identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The tracking version of the node's current (or upcoming) run.
    pub fn tracking_version(&self) -> TrackingVersion {
        self.tracking_version.get()
    }

    /// The version of the node's current value.
    pub fn value_version(&self) -> Version {
        self.value_version.get()
    }

    /// Start a new dependency-tracking run: edges stamped with the previous
    /// tracking version are no longer live and will be pruned on traversal.
    pub fn bump_tracking_version(&self) {
        self.tracking_version.set(self.tracking_version.get().next());
    }

    /// Record that the node's value semantically changed.
    pub fn bump_value_version(&self) {
        self.value_version.set(self.value_version.get().next());
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::new()
    }
}

/// The versioned link recording that a consumer last saw a producer at a
/// given value version, while tracking at a given tracking version.
///
/// One `Edge` is shared between `producer.consumers[consumer_id]` and
/// `consumer.producers[producer_id]`; its stamps are interior-mutable so a
/// refresh updates both sides at once. Both endpoints are held weakly.
pub(crate) struct Edge {
    pub(crate) producer: Weak<dyn ReactiveNode>,
    pub(crate) consumer: Weak<dyn ReactiveNode>,
    pub(crate) at_tracking_version: Cell<TrackingVersion>,
    pub(crate) seen_value_version: Cell<Version>,
}

impl Edge {
    /// Link `consumer` to `producer`, stamped with their current versions.
    pub(crate) fn new(producer: &Rc<dyn ReactiveNode>, consumer: &Rc<dyn ReactiveNode>) -> Self {
        Edge {
            producer: Rc::downgrade(producer),
            consumer: Rc::downgrade(consumer),
            at_tracking_version: Cell::new(consumer.state().tracking_version()),
            seen_value_version: Cell::new(producer.state().value_version()),
        }
    }
}

/// Capability marking a value as backed by a reactive graph node.
///
/// This is the public branding for signal-like values: anything bounded by
/// `Reactive` is known to sit on the graph, and schedulers can reach its
/// backing node without the crate exposing node internals.
pub trait Reactive {
    /// The graph node backing this value.
    fn node(&self) -> Rc<dyn ReactiveNode>;

    /// The backing node's identity.
    fn node_id(&self) -> NodeId {
        self.node().state().id()
    }
}
