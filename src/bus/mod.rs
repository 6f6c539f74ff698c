//! Typed event bus.
//!
//! Handlers are registered per event type and invoked synchronously, in
//! registration order, for every event of that type:
//! - [`EventBus::attach`] / [`EventBus::detach`] manage raw registrations
//! - [`Subscription`] detaches its registration when dropped
//! - [`SubscriptionList`] groups subscriptions and releases them together
//!
//! # Example
//!
//! ```ignore
//! let bus = EventBus::new();
//!
//! let mut subscriptions = SubscriptionList::new();
//! subscriptions
//!     .on(&bus)
//!     .subscribe(|e: &Connected| println!("connected to {}", e.peer))
//!     .subscribe(|_: &Disconnected| println!("gone"));
//!
//! bus.dispatch(Connected { peer: "relay-1".into() });
//! ```

mod dispatcher;
mod subscription;

pub use dispatcher::{EventBus, Handle};
pub use subscription::{Subscription, SubscriptionList, SubscriptionProxy};
