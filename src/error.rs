//! Error type surfaced when reading a derived value.

use std::fmt;
use std::sync::Arc;

/// Errors produced while bringing a derived value up to date.
///
/// User errors can be propagated out of a fallible computation with the `?`
/// operator, which converts any `Into<anyhow::Error>` type into
/// `SignalError::UserError`.
///
/// A derived value caches the error it failed with and returns a clone of it
/// on every subsequent read, until a dependency is observed to have actually
/// changed value, at which point the computation is retried.
#[derive(Debug, Clone)]
pub enum SignalError {
    /// A derived value read its own not-yet-resolved value, directly or
    /// through other nodes, during its own recomputation.
    Cycle,

    /// A computation failed with a user-defined error.
    ///
    /// Unlike `Cycle`, user errors are ordinary domain failures: they are
    /// cached like values and participate in early cutoff.
    UserError(Arc<anyhow::Error>),
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalError::Cycle => write!(f, "detected cycle in computations"),
            SignalError::UserError(e) => write!(f, "computation failed: {}", e),
        }
    }
}

// No std::error::Error impl: it would collide with the blanket conversion
// below, which is what lets computations use `?` on arbitrary error types.
impl<T: Into<anyhow::Error>> From<T> for SignalError {
    fn from(err: T) -> Self {
        SignalError::UserError(Arc::new(err.into()))
    }
}

impl SignalError {
    /// Returns the inner user error if this is a `UserError` variant.
    pub fn user_error(&self) -> Option<&Arc<anyhow::Error>> {
        match self {
            SignalError::UserError(e) => Some(e),
            _ => None,
        }
    }

    /// Attempts to downcast the user error to a specific type.
    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.user_error().and_then(|e| e.downcast_ref::<E>())
    }

    /// Returns `true` if this is the cycle error.
    pub fn is_cycle(&self) -> bool {
        matches!(self, SignalError::Cycle)
    }

    /// Returns `true` if `other` is observably the same failure as `self`.
    ///
    /// Two cycle errors are the same failure. Two user errors are the same
    /// failure only when they share the same underlying error object, which
    /// happens when a cached error is re-propagated unchanged through a
    /// dependency chain. Distinct error objects are conservatively treated as
    /// different, so a retried computation that fails anew still counts as a
    /// change.
    pub fn same_failure(&self, other: &Self) -> bool {
        match (self, other) {
            (SignalError::Cycle, SignalError::Cycle) => true,
            (SignalError::UserError(a), SignalError::UserError(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
