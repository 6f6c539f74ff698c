//! Transactional state store driven by a pure reducer.

use crate::error::{ReduceError, Result};
use crate::types::Revision;
use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Reducer contract: a model implements `Reduce<E>` once for every event
/// type `E` it accepts.
///
/// `reduce` must not mutate `self`; it returns the complete next state or
/// the reason the event was refused.
pub trait Reduce<E>: Sized {
    fn reduce(&self, event: E) -> std::result::Result<Self, ReduceError>;
}

/// Receives `(previous, next)` after a committed transition.
pub type ChangeHandler<M> = Rc<dyn Fn(&Rc<M>, &Rc<M>)>;

/// Receives the failure of a refused event.
pub type ErrorHandler = Rc<dyn Fn(&ReduceError)>;

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Label used in log records and `Debug` output.
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
        }
    }
}

/// Owns one state value and applies events to it.
///
/// The visible state is either the value before an [`apply`](Self::apply)
/// or the complete value the reducer returned, never anything in between.
/// Change and error handlers are single slots; installing one replaces the
/// previous handler.
///
/// No borrow is held while the reducer or a handler runs, so handlers may
/// call back into the store (including `apply`).
pub struct Store<M> {
    config: StoreConfig,
    state: RefCell<Rc<M>>,
    revision: Cell<Revision>,
    change_handler: RefCell<Option<ChangeHandler<M>>>,
    error_handler: RefCell<Option<ErrorHandler>>,
}

impl<M> Store<M> {
    /// Create a store holding `initial`.
    pub fn new(initial: M) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    /// Create a store holding `initial` with custom configuration.
    pub fn with_config(initial: M, config: StoreConfig) -> Self {
        Self {
            config,
            state: RefCell::new(Rc::new(initial)),
            revision: Cell::new(Revision::default()),
            change_handler: RefCell::new(None),
            error_handler: RefCell::new(None),
        }
    }

    /// The current state.
    ///
    /// The returned value stays valid after later transitions; it is the same
    /// allocation the change handler received as `next`.
    pub fn state(&self) -> Rc<M> {
        Rc::clone(&self.state.borrow())
    }

    /// Number of committed transitions.
    pub fn revision(&self) -> Revision {
        self.revision.get()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn set_change_handler<F>(&self, handler: F)
    where
        F: Fn(&Rc<M>, &Rc<M>) + 'static,
    {
        let previous = self.change_handler.replace(Some(Rc::new(handler)));
        drop(previous);
    }

    pub fn clear_change_handler(&self) {
        let previous = self.change_handler.take();
        drop(previous);
    }

    pub fn has_change_handler(&self) -> bool {
        self.change_handler.borrow().is_some()
    }

    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&ReduceError) + 'static,
    {
        let previous = self.error_handler.replace(Some(Rc::new(handler)));
        drop(previous);
    }

    pub fn clear_error_handler(&self) {
        let previous = self.error_handler.take();
        drop(previous);
    }

    pub fn has_error_handler(&self) -> bool {
        self.error_handler.borrow().is_some()
    }

    /// Apply `event` through the model's reducer.
    ///
    /// On success the state is replaced and the change handler runs. On
    /// failure the state is untouched; the error goes to the error handler if
    /// one is installed (and `Ok(())` is returned), otherwise it is returned.
    pub fn apply<E>(&self, event: E) -> Result<()>
    where
        M: Reduce<E>,
    {
        let current = self.state();

        match current.reduce(event) {
            Ok(next) => {
                self.commit(current, next);
                Ok(())
            }
            Err(error) => {
                let handler = self.error_handler.borrow().clone();
                match handler {
                    Some(handler) => {
                        debug!(
                            store = %self.config.name,
                            event = type_name::<E>(),
                            error = %error,
                            "Reducer refused event"
                        );
                        handler(&error);
                        Ok(())
                    }
                    None => {
                        warn!(
                            store = %self.config.name,
                            event = type_name::<E>(),
                            error = %error,
                            "Reducer refused event with no error handler installed"
                        );
                        Err(error.into())
                    }
                }
            }
        }
    }

    /// Commit an externally built state as if a reducer had produced it.
    pub fn replace_state(&self, next: M) {
        let current = self.state();
        self.commit(current, next);
    }

    fn commit(&self, previous: Rc<M>, next: M) {
        let next = Rc::new(next);
        *self.state.borrow_mut() = Rc::clone(&next);

        let revision = self.revision.get().next();
        self.revision.set(revision);
        debug!(store = %self.config.name, revision = %revision, "Committed transition");

        let handler = self.change_handler.borrow().clone();
        if let Some(handler) = handler {
            handler(&previous, &next);
        }
    }
}

impl<M: Default> Default for Store<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: fmt::Debug> fmt::Debug for Store<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.config.name)
            .field("revision", &self.revision.get())
            .field("state", &*self.state.borrow())
            .field("change_handler", &self.has_change_handler())
            .field("error_handler", &self.has_error_handler())
            .finish()
    }
}
