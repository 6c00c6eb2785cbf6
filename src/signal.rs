//! Writable leaf values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::SignalError;
use crate::graph;
use crate::node::{NodeState, Reactive, ReactiveNode};

struct SignalInner<T> {
    node: NodeState,
    value: RefCell<T>,
    equal: Box<dyn Fn(&T, &T) -> bool>,
}

/// A writable reactive value: the graph's leaf producer.
///
/// Reading a signal inside a tracked computation registers a dependency
/// edge; writing a *different* value bumps the signal's version and notifies
/// consumers that they may be stale. Writing an equal value is a complete
/// no-op: no version bump, no notification, no downstream work.
///
/// Cloning is cheap and yields a handle to the same node.
///
/// # Example
///
/// ```
/// use signal_flow::signal;
///
/// let name = signal("Ada".to_string());
/// assert_eq!(name.get(), "Ada");
///
/// name.update(|n| format!("{n} Lovelace"));
/// assert_eq!(name.get(), "Ada Lovelace");
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal holding `value`, comparing writes with `PartialEq`.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_equal(value, T::eq)
    }

    /// Create a signal with a custom equality predicate deciding whether a
    /// write is a semantic change.
    pub fn with_equal(value: T, equal: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                node: NodeState::new(),
                value: RefCell::new(value),
                equal: Box::new(equal),
            }),
        }
    }

    /// Read the current value, registering a dependency on this signal if a
    /// consumer is tracking.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        let node: Rc<dyn ReactiveNode> = self.inner.clone();
        graph::producer_accessed(&node);
        self.inner.value.borrow().clone()
    }

    /// Read the current value without registering a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Replace the value, notifying consumers if it semantically changed.
    ///
    /// # Panics
    ///
    /// Panics when called while the active consumer is a kind that forbids
    /// writes, such as from inside a derived value's computation.
    pub fn set(&self, value: T) {
        assert!(
            graph::producer_updates_allowed(),
            "signal written from inside a consumer that does not allow writes"
        );
        let changed = !(self.inner.equal)(&self.inner.value.borrow(), &value);
        if !changed {
            return;
        }
        *self.inner.value.borrow_mut() = value;
        self.inner.node.bump_value_version();
        let node: Rc<dyn ReactiveNode> = self.inner.clone();
        graph::producer_may_have_changed(&node);
    }

    /// Derive the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }
}

impl<T: 'static> ReactiveNode for SignalInner<T> {
    fn state(&self) -> &NodeState {
        &self.node
    }

    fn on_consumer_dependency_may_have_changed(self: Rc<Self>) {
        // A signal depends on nothing; it is never notified.
    }

    fn on_producer_update_value_version(self: Rc<Self>) -> Result<(), SignalError> {
        // A signal's value is always current.
        Ok(())
    }

    fn consumer_allow_signal_writes(&self) -> bool {
        true
    }
}

impl<T: 'static> Reactive for Signal<T> {
    fn node(&self) -> Rc<dyn ReactiveNode> {
        self.inner.clone()
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.node_id())
            .field("value", &self.get_untracked())
            .finish()
    }
}

/// Create a writable reactive value.
///
/// Shorthand for [`Signal::new`].
pub fn signal<T: PartialEq + 'static>(value: T) -> Signal<T> {
    Signal::new(value)
}
