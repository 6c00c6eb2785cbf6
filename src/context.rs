//! Ambient tracking context.
//!
//! While a consumer runs its reactive computation it is installed as the
//! *active consumer*: every producer read that happens during the run
//! registers an edge back to it. The slot is thread-local because the graph
//! is a single-threaded structure; each thread owns its own graph.
//!
//! The slot and the notification-phase flag are only ever changed through
//! accessors that hand back the previous value, or through the RAII guards in
//! this module, so re-entrant use (a computation triggering another
//! computation) always unwinds to a consistent state, including when user
//! code panics.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::node::ReactiveNode;

thread_local! {
    static ACTIVE_CONSUMER: RefCell<Option<Rc<dyn ReactiveNode>>> = const { RefCell::new(None) };
    static NOTIFICATION_PHASE: Cell<bool> = const { Cell::new(false) };
}

/// Install `consumer` as the node currently performing tracked reads,
/// returning the previously installed node.
///
/// Callers are responsible for restoring the previous value on every exit
/// path; prefer [`ActiveConsumerGuard`] which does so on drop.
pub fn set_active_consumer(
    consumer: Option<Rc<dyn ReactiveNode>>,
) -> Option<Rc<dyn ReactiveNode>> {
    ACTIVE_CONSUMER.with(|slot| slot.replace(consumer))
}

/// The node currently performing tracked reads, if any.
pub fn active_consumer() -> Option<Rc<dyn ReactiveNode>> {
    ACTIVE_CONSUMER.with(|slot| slot.borrow().clone())
}

/// Returns `true` while a staleness notification pass is in progress.
///
/// Producer reads are forbidden during that window; see
/// [`crate::producer_accessed`].
pub fn in_notification_phase() -> bool {
    NOTIFICATION_PHASE.with(Cell::get)
}

/// Scope guard that installs an active consumer and restores the previous
/// one when dropped, panics included.
pub struct ActiveConsumerGuard {
    previous: Option<Rc<dyn ReactiveNode>>,
}

impl ActiveConsumerGuard {
    /// Swap in `consumer` (or `None` for an untracked scope) for the
    /// lifetime of the returned guard.
    pub fn activate(consumer: Option<Rc<dyn ReactiveNode>>) -> Self {
        Self {
            previous: set_active_consumer(consumer),
        }
    }
}

impl Drop for ActiveConsumerGuard {
    fn drop(&mut self) {
        set_active_consumer(self.previous.take());
    }
}

/// Scope guard marking a staleness notification pass.
///
/// Nested notification passes stack; the flag reverts to its previous state
/// when each guard is dropped.
pub struct NotificationPhaseGuard {
    previous: bool,
}

impl NotificationPhaseGuard {
    /// Enter the notification phase for the lifetime of the returned guard.
    pub fn enter() -> Self {
        Self {
            previous: NOTIFICATION_PHASE.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for NotificationPhaseGuard {
    fn drop(&mut self) {
        NOTIFICATION_PHASE.with(|flag| flag.set(self.previous));
    }
}

/// Run `f` with dependency recording suspended.
///
/// Producer reads inside `f` do not create edges, even when an outer consumer
/// is mid-tracking. The outer consumer is reinstated when `f` returns or
/// unwinds.
///
/// # Example
///
/// ```
/// use signal_flow::{computed, signal, untracked};
///
/// let tracked = signal(1);
/// let peeked = signal(10);
/// let sum = computed({
///     let tracked = tracked.clone();
///     let peeked = peeked.clone();
///     move || tracked.get() + untracked(|| peeked.get())
/// });
///
/// assert_eq!(sum.get().unwrap(), 11);
///
/// // `peeked` is not a dependency: changing it leaves the cache untouched.
/// peeked.set(100);
/// assert_eq!(sum.get().unwrap(), 11);
///
/// // `tracked` is: the next read recomputes with the fresh `peeked` value.
/// tracked.set(2);
/// assert_eq!(sum.get().unwrap(), 102);
/// ```
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _scope = ActiveConsumerGuard::activate(None);
    f()
}
