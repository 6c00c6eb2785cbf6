#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod computed;
mod context;
mod error;
mod graph;
mod node;
mod signal;
mod version;
mod watch;

pub use computed::{computed, Computed};
pub use context::{
    active_consumer, in_notification_phase, set_active_consumer, untracked, ActiveConsumerGuard,
    NotificationPhaseGuard,
};
pub use error::SignalError;
pub use graph::{
    consumer_poll_producers_for_change, has_producers, producer_accessed,
    producer_may_have_changed, producer_poll_status, producer_updates_allowed,
};
pub use node::{NodeState, Reactive, ReactiveNode};
pub use signal::{signal, Signal};
pub use version::{NodeId, TrackingVersion, Version};
pub use watch::Watch;
