//! Edge-table traversals: dependency recording, staleness notification, and
//! on-demand change verification.
//!
//! These free functions are the whole consistency algorithm. Producers call
//! [`producer_accessed`] when read and [`producer_may_have_changed`] after a
//! real change; consumers call [`consumer_poll_producers_for_change`] to find
//! out whether a staleness notification corresponded to an actual change.
//! Notifications push no values; verification is always pulled at read
//! time, which is what keeps readers from ever observing a value derived
//! from a partially updated dependency set.
//!
//! All traversals prune edges that are dead (an endpoint was dropped) or
//! stale (stamped with an outdated tracking version) as they encounter them.

use std::rc::Rc;

use crate::context::{self, NotificationPhaseGuard};
use crate::error::SignalError;
use crate::node::{Edge, ReactiveNode};
use crate::version::{NodeId, Version};

/// Record that `producer`'s value was just read.
///
/// If no consumer is active this is an untracked read and a no-op.
/// Otherwise the edge between the active consumer and `producer` is created,
/// or refreshed with the pair's current version stamps if it already exists.
///
/// # Panics
///
/// Panics if called while a notification pass is in progress: a read at that
/// point could observe a value the pass is mid-way through invalidating, so
/// it is a bug in the calling consumer (typically a scheduler callback doing
/// real work instead of just recording staleness).
pub fn producer_accessed(producer: &Rc<dyn ReactiveNode>) {
    assert!(
        !context::in_notification_phase(),
        "reactive value read while a change notification is in progress"
    );
    let Some(consumer) = context::active_consumer() else {
        return;
    };

    let producer_id = producer.state().id();
    let existing = consumer
        .state()
        .producers
        .borrow()
        .get(&producer_id)
        .cloned();
    match existing {
        Some(edge) => {
            edge.seen_value_version.set(producer.state().value_version());
            edge.at_tracking_version
                .set(consumer.state().tracking_version());
        }
        None => {
            let edge = Rc::new(Edge::new(producer, &consumer));
            consumer
                .state()
                .producers
                .borrow_mut()
                .insert(producer_id, edge.clone());
            producer
                .state()
                .consumers
                .borrow_mut()
                .insert(consumer.state().id(), edge);
        }
    }
}

/// Tell every live consumer of `producer` that it may now be stale.
///
/// Called by a producer after its value actually changed. This is a pure
/// dirty signal: no value is computed or carried, and consumers decide
/// lazily, at their next read, whether anything really changed. Dead and
/// stale edges encountered along the way are unlinked from both sides.
///
/// The notification phase is entered for the duration and restored on exit,
/// including when a consumer hook panics.
pub fn producer_may_have_changed(producer: &Rc<dyn ReactiveNode>) {
    let _phase = NotificationPhaseGuard::enter();

    // Snapshot the edges: hooks may cascade into further notifications that
    // rearrange other parts of the graph while this pass is running.
    let edges: Vec<(NodeId, Rc<Edge>)> = producer
        .state()
        .consumers
        .borrow()
        .iter()
        .map(|(id, edge)| (*id, edge.clone()))
        .collect();

    for (consumer_id, edge) in edges {
        match edge.consumer.upgrade() {
            Some(consumer)
                if edge.at_tracking_version.get() == consumer.state().tracking_version() =>
            {
                consumer.on_consumer_dependency_may_have_changed();
            }
            consumer => {
                producer.state().consumers.borrow_mut().remove(&consumer_id);
                if let Some(consumer) = consumer {
                    consumer
                        .state()
                        .producers
                        .borrow_mut()
                        .remove(&producer.state().id());
                }
            }
        }
    }
}

/// Check whether any of `consumer`'s dependencies actually changed value, as
/// opposed to merely having notified.
///
/// Each live producer edge is verified through [`producer_poll_status`],
/// which lets a lazy producer refresh itself before its version is trusted.
/// Returns `Ok(true)` on the first dependency found to have truly changed
/// and `Ok(false)` if none did. An error from a producer's refresh (a cycle
/// discovered mid-poll) propagates to the reader that initiated the poll.
pub fn consumer_poll_producers_for_change(
    consumer: &Rc<dyn ReactiveNode>,
) -> Result<bool, SignalError> {
    let edges: Vec<(NodeId, Rc<Edge>)> = consumer
        .state()
        .producers
        .borrow()
        .iter()
        .map(|(id, edge)| (*id, edge.clone()))
        .collect();

    for (producer_id, edge) in edges {
        let stale = edge.at_tracking_version.get() != consumer.state().tracking_version();
        match edge.producer.upgrade() {
            Some(producer) if !stale => {
                if producer_poll_status(&producer, edge.seen_value_version.get())? {
                    return Ok(true);
                }
            }
            producer => {
                consumer.state().producers.borrow_mut().remove(&producer_id);
                if let Some(producer) = producer {
                    producer
                        .state()
                        .consumers
                        .borrow_mut()
                        .remove(&consumer.state().id());
                }
            }
        }
    }
    Ok(false)
}

/// Has `producer` changed since a consumer last saw it at `seen`?
///
/// A version mismatch answers immediately. Otherwise the producer is given
/// the chance to lazily refresh itself (a derived value recomputing, if its
/// own dependencies warrant it) and the version is compared again.
pub fn producer_poll_status(
    producer: &Rc<dyn ReactiveNode>,
    seen: Version,
) -> Result<bool, SignalError> {
    if producer.state().value_version() != seen {
        return Ok(true);
    }
    producer.clone().on_producer_update_value_version()?;
    Ok(producer.state().value_version() != seen)
}

/// Does `node` currently depend on any live producer?
pub fn has_producers(node: &dyn ReactiveNode) -> bool {
    node.state().producers.borrow().values().any(|edge| {
        edge.producer.upgrade().is_some()
            && edge.at_tracking_version.get() == node.state().tracking_version()
    })
}

/// May a signal be written to right now?
///
/// `false` while the active consumer is a kind that must not trigger writes
/// mid-read (a pure derivation). Enforcement is up to the producer being
/// written: [`crate::Signal::set`] panics when this returns `false`.
pub fn producer_updates_allowed() -> bool {
    context::active_consumer().is_none_or(|consumer| consumer.consumer_allow_signal_writes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computed::Computed;
    use crate::node::Reactive;
    use crate::signal::Signal;

    #[test]
    fn updates_allowed_outside_any_consumer() {
        assert!(producer_updates_allowed());
    }

    #[test]
    fn poll_without_producers_reports_no_change() {
        let lonely = Signal::new(0);
        assert!(!consumer_poll_producers_for_change(&lonely.node()).unwrap());
    }

    #[test]
    fn untracked_read_creates_no_edge() {
        let source = Signal::new(1);
        assert_eq!(source.get(), 1);
        assert!(source.node().state().consumers.borrow().is_empty());
    }

    #[test]
    fn stale_edges_are_pruned_when_polled() {
        let toggle = Signal::new(true);
        let sometimes = Signal::new(10);
        let value = Computed::new({
            let toggle = toggle.clone();
            let sometimes = sometimes.clone();
            move || {
                if toggle.get() {
                    sometimes.get()
                } else {
                    0
                }
            }
        });

        assert_eq!(value.get().unwrap(), 10);
        assert!(has_producers(&*value.node()));
        assert_eq!(value.node().state().producers.borrow().len(), 2);

        // Recomputing without reading `sometimes` leaves its edge behind at
        // the old tracking version; the next traversal of either side sweeps
        // it out.
        toggle.set(false);
        assert_eq!(value.get().unwrap(), 0);
        sometimes.set(99);
        assert_eq!(value.get().unwrap(), 0);
        assert!(!value
            .node()
            .state()
            .producers
            .borrow()
            .contains_key(&sometimes.node_id()));
    }
}
