//! Lazily derived, memoizing values.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::context::ActiveConsumerGuard;
use crate::error::SignalError;
use crate::graph;
use crate::node::{NodeState, Reactive, ReactiveNode};

/// The cached state of a derived value.
///
/// `Computing` doubles as the re-entrancy guard: finding it at the start of
/// a recomputation means the computation transitively read its own value.
enum ComputedValue<T> {
    Unset,
    Computing,
    Errored(SignalError),
    Value(T),
}

impl<T> ComputedValue<T> {
    /// A value or error from a completed computation, as opposed to the
    /// never-computed and mid-computation states.
    fn is_settled(&self) -> bool {
        matches!(self, ComputedValue::Value(_) | ComputedValue::Errored(_))
    }
}

struct ComputedInner<T> {
    node: NodeState,
    computation: Box<dyn Fn() -> Result<T, SignalError>>,
    equal: Box<dyn Fn(&T, &T) -> bool>,
    value: RefCell<ComputedValue<T>>,
    stale: Cell<bool>,
}

/// A value derived from other reactive values by a user computation.
///
/// The computation does not run at construction. It runs on the first read,
/// and after that only when a read finds that a dependency has actually
/// changed; a staleness notification alone never triggers work. While the
/// computation runs, every tracked read it performs registers a dependency
/// edge, so the dependency set always reflects the most recent run.
///
/// `Computed` is both a consumer (of whatever the computation reads) and a
/// producer (for downstream consumers reading it). Cloning is cheap and
/// yields a handle to the same node.
///
/// # Example
///
/// ```
/// use signal_flow::{signal, Computed};
///
/// let price = signal(100);
/// let tax = signal(25);
/// let total = Computed::new({
///     let price = price.clone();
///     let tax = tax.clone();
///     move || price.get() + tax.get()
/// });
///
/// assert_eq!(total.get().unwrap(), 125);
///
/// tax.set(30);
/// assert_eq!(total.get().unwrap(), 130);
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Computed<T> {
    /// Derive a value from an infallible computation, comparing successive
    /// results with `PartialEq`.
    pub fn new(computation: impl Fn() -> T + 'static) -> Self
    where
        T: PartialEq,
    {
        Self::with_equal(computation, T::eq)
    }

    /// Derive a value from an infallible computation with a custom equality
    /// predicate.
    ///
    /// When a recomputation produces a value equal to the previous one, the
    /// previous value is kept and downstream consumers observe no change.
    pub fn with_equal(
        computation: impl Fn() -> T + 'static,
        equal: impl Fn(&T, &T) -> bool + 'static,
    ) -> Self {
        Self::fallible_with_equal(move || Ok(computation()), equal)
    }

    /// Derive a value from a fallible computation.
    ///
    /// Errors are cached exactly like values: every read returns the same
    /// error until a dependency genuinely changes, at which point the
    /// computation is retried.
    pub fn fallible(computation: impl Fn() -> Result<T, SignalError> + 'static) -> Self
    where
        T: PartialEq,
    {
        Self::fallible_with_equal(computation, T::eq)
    }

    /// Derive a value from a fallible computation with a custom equality
    /// predicate.
    pub fn fallible_with_equal(
        computation: impl Fn() -> Result<T, SignalError> + 'static,
        equal: impl Fn(&T, &T) -> bool + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(ComputedInner {
                node: NodeState::new(),
                computation: Box::new(computation),
                equal: Box::new(equal),
                value: RefCell::new(ComputedValue::Unset),
                stale: Cell::new(true),
            }),
        }
    }

    /// Read the derived value, recomputing it first if a dependency actually
    /// changed since the last run.
    ///
    /// Registers this node as a dependency of the active consumer, if any.
    /// Returns the cached error if the last computation failed, and
    /// [`SignalError::Cycle`] if the read re-entered a computation already
    /// in progress.
    pub fn get(&self) -> Result<T, SignalError>
    where
        T: Clone,
    {
        ComputedInner::update_value_version(&self.inner)?;

        let node: Rc<dyn ReactiveNode> = self.inner.clone();
        graph::producer_accessed(&node);

        let value = self.inner.value.borrow();
        match &*value {
            ComputedValue::Value(v) => Ok(v.clone()),
            ComputedValue::Errored(e) => Err(e.clone()),
            ComputedValue::Unset | ComputedValue::Computing => {
                unreachable!("derived value read before it settled")
            }
        }
    }
}

impl<T: 'static> ComputedInner<T> {
    /// Make the cached value and its version current, without recomputing
    /// unless a dependency truly changed.
    fn update_value_version(this: &Rc<Self>) -> Result<(), SignalError> {
        if !this.stale.get() {
            // Already verified current; no dependency has notified since.
            return Ok(());
        }

        if this.value.borrow().is_settled() {
            let node: Rc<dyn ReactiveNode> = this.clone();
            if !graph::consumer_poll_producers_for_change(&node)? {
                // A notification arrived, but nothing actually changed
                // value. Keep the cache.
                this.stale.set(false);
                return Ok(());
            }
        }

        Self::recompute(this)?;
        this.stale.set(false);
        Ok(())
    }

    /// Run the computation and fold its result into the cache.
    ///
    /// Returns an error only for the re-entrancy guard; a failing
    /// computation is recorded in the cache and reported by the caller.
    fn recompute(this: &Rc<Self>) -> Result<(), SignalError> {
        if matches!(*this.value.borrow(), ComputedValue::Computing) {
            return Err(SignalError::Cycle);
        }

        let previous = this.value.replace(ComputedValue::Computing);
        this.node.bump_tracking_version();

        let result = {
            let node: Rc<dyn ReactiveNode> = this.clone();
            let _scope = ActiveConsumerGuard::activate(Some(node));
            (this.computation)()
        };

        let next = match result {
            Ok(new) => match previous {
                ComputedValue::Value(old) if (this.equal)(&old, &new) => {
                    // Semantically unchanged: keep the old value and version
                    // so downstream consumers see no change.
                    ComputedValue::Value(old)
                }
                _ => {
                    this.node.bump_value_version();
                    ComputedValue::Value(new)
                }
            },
            Err(err) => {
                let unchanged = matches!(
                    &previous,
                    ComputedValue::Errored(prev) if prev.same_failure(&err)
                );
                if !unchanged {
                    this.node.bump_value_version();
                }
                ComputedValue::Errored(err)
            }
        };
        *this.value.borrow_mut() = next;
        Ok(())
    }
}

impl<T: 'static> ReactiveNode for ComputedInner<T> {
    fn state(&self) -> &NodeState {
        &self.node
    }

    fn on_consumer_dependency_may_have_changed(self: Rc<Self>) {
        if self.stale.get() {
            return;
        }
        self.stale.set(true);
        // A derived value is also a producer: staleness cascades outward,
        // still without recomputing anything.
        let node: Rc<dyn ReactiveNode> = self;
        graph::producer_may_have_changed(&node);
    }

    fn on_producer_update_value_version(self: Rc<Self>) -> Result<(), SignalError> {
        ComputedInner::update_value_version(&self)
    }

    fn consumer_allow_signal_writes(&self) -> bool {
        false
    }
}

impl<T: 'static> Reactive for Computed<T> {
    fn node(&self) -> Rc<dyn ReactiveNode> {
        self.inner.clone()
    }
}

/// Derive a value from an infallible computation.
///
/// Shorthand for [`Computed::new`].
pub fn computed<T: PartialEq + 'static>(computation: impl Fn() -> T + 'static) -> Computed<T> {
    Computed::new(computation)
}
