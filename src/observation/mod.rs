//! Change observation over projections of the state.
//!
//! An [`ObservationManager`] follows one state value and invokes registered
//! handlers only when their projection of the state changes. A
//! [`StateObserver`] groups the observations of one consumer and releases
//! them together.
//!
//! # Example
//!
//! ```ignore
//! let store = Store::<Inventory>::default();
//! let manager = ObservationManager::bind(&store);
//!
//! let mut observer = StateObserver::new(Rc::clone(&manager));
//! observer.observe(|s: &Inventory| s.items.len(), |count| println!("{count} items"))?;
//!
//! store.apply(AddItem("lamp".into()))?;
//! ```

mod manager;
mod observer;

pub use manager::{ObservationManager, Token};
pub use observer::StateObserver;
