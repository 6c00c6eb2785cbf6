//! The reference consumer for external schedulers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::context::ActiveConsumerGuard;
use crate::error::SignalError;
use crate::graph;
use crate::node::{NodeState, Reactive, ReactiveNode};
use crate::version::TrackingVersion;

struct WatchInner {
    node: NodeState,
    effect: RefCell<Box<dyn FnMut()>>,
    on_stale: Box<dyn Fn()>,
    stale: Cell<bool>,
    allow_signal_writes: bool,
}

/// A side-effecting consumer that bridges the graph to a scheduler.
///
/// A watch runs a user function with dependency tracking, exactly like a
/// derived value, except that it produces no value. When any dependency may have
/// changed, the watch invokes its `on_stale` callback once; it stays quiet
/// after that until the scheduler calls [`run`] again. When and how often to
/// re-run is entirely the scheduler's decision; this crate never schedules
/// anything itself.
///
/// The `on_stale` callback fires during the notification pass, so it must
/// only record the fact somewhere (push onto a queue, set a flag): reading
/// any reactive value from it panics.
///
/// A watch starts stale; nothing runs until the first [`run`].
///
/// [`run`]: Watch::run
#[derive(Clone)]
pub struct Watch {
    inner: Rc<WatchInner>,
}

impl Watch {
    /// Create a watch around `effect`, reporting staleness to `on_stale`.
    ///
    /// `allow_signal_writes` decides whether signals may be written while
    /// `effect` runs. Pass `false` unless the effect deliberately feeds
    /// other state.
    pub fn new(
        effect: impl FnMut() + 'static,
        on_stale: impl Fn() + 'static,
        allow_signal_writes: bool,
    ) -> Self {
        Self {
            inner: Rc::new(WatchInner {
                node: NodeState::new(),
                effect: RefCell::new(Box::new(effect)),
                on_stale: Box::new(on_stale),
                stale: Cell::new(true),
                allow_signal_writes,
            }),
        }
    }

    /// Execute the effect under dependency tracking.
    ///
    /// After the first run, a call is skipped entirely when no dependency
    /// has actually changed value: a staleness notification that turns out
    /// to be a false alarm (an equal write upstream) costs nothing but the
    /// poll.
    pub fn run(&self) {
        self.inner.stale.set(false);

        let node: Rc<dyn ReactiveNode> = self.inner.clone();
        if self.inner.node.tracking_version() != TrackingVersion(0) {
            // A failed poll (a cycle surfaced mid-verification) falls
            // through to the run so the effect observes the error itself.
            match graph::consumer_poll_producers_for_change(&node) {
                Ok(false) => return,
                Ok(true) | Err(_) => {}
            }
        }

        self.inner.node.bump_tracking_version();
        let _scope = ActiveConsumerGuard::activate(Some(node));
        let mut effect = self.inner.effect.borrow_mut();
        (*effect)();
    }

    /// Has a dependency notified since the last [`run`](Watch::run)?
    pub fn is_stale(&self) -> bool {
        self.inner.stale.get()
    }
}

impl ReactiveNode for WatchInner {
    fn state(&self) -> &NodeState {
        &self.node
    }

    fn on_consumer_dependency_may_have_changed(self: Rc<Self>) {
        if self.stale.get() {
            return;
        }
        self.stale.set(true);
        (self.on_stale)();
    }

    fn on_producer_update_value_version(self: Rc<Self>) -> Result<(), SignalError> {
        // A watch exposes no value to refresh.
        Ok(())
    }

    fn consumer_allow_signal_writes(&self) -> bool {
        self.allow_signal_writes
    }
}

impl Reactive for Watch {
    fn node(&self) -> Rc<dyn ReactiveNode> {
        self.inner.clone()
    }
}
