//! # State Bus
//!
//! An in-process reactive state container for single-threaded applications.
//!
//! ## Core Concepts
//!
//! - **Event Bus**: Type-keyed multicast dispatch with scope-bound subscriptions
//! - **Store**: Owns one state value and applies events through a pure reducer
//! - **Observation**: Handlers that fire only when a projection of the state changes
//!
//! ## Example
//!
//! ```ignore
//! use statebus::{ObservationManager, Reduce, ReduceError, Store};
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: i32,
//! }
//!
//! struct Increase(i32);
//!
//! impl Reduce<Increase> for Counter {
//!     fn reduce(&self, event: Increase) -> Result<Self, ReduceError> {
//!         Ok(Counter { value: self.value + event.0 })
//!     }
//! }
//!
//! let store = Store::<Counter>::default();
//! let manager = ObservationManager::bind(&store);
//! manager.observe(|c: &Counter| c.value, |value| println!("value = {value}"));
//!
//! store.apply(Increase(3))?;
//! ```

pub mod bus;
pub mod error;
pub mod observation;
pub mod store;
pub mod types;

// Re-exports
pub use bus::{EventBus, Handle, Subscription, SubscriptionList, SubscriptionProxy};
pub use error::{ObserverError, ReduceError, Result, StoreError};
pub use observation::{ObservationManager, StateObserver, Token};
pub use store::{ChangeHandler, ErrorHandler, Reduce, Store, StoreConfig};
pub use types::*;
