//! Groups observations and releases them together.

use crate::error::ObserverError;
use std::fmt;
use std::rc::Rc;

use super::manager::{ObservationManager, Token};

/// Per-consumer view onto a shared [`ObservationManager`].
///
/// Every observation made through the observer is forgotten by
/// [`clear`](Self::clear) or when the observer is dropped. Observers can be
/// moved but not cloned, so each token is released once.
pub struct StateObserver<M> {
    link: Option<Rc<ObservationManager<M>>>,
    tokens: Vec<Token>,
}

impl<M> StateObserver<M> {
    /// Bind a new observer to `manager`.
    pub fn new(manager: Rc<ObservationManager<M>>) -> Self {
        Self {
            link: Some(manager),
            tokens: Vec::new(),
        }
    }

    /// The bound manager, if the observer has not been cleared.
    pub fn manager(&self) -> Option<Rc<ObservationManager<M>>> {
        self.link.clone()
    }

    pub fn is_bound(&self) -> bool {
        self.link.is_some()
    }

    /// Number of observations held.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Forget every held observation and unbind from the manager.
    pub fn clear(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };

        for token in self.tokens.drain(..) {
            link.forget(token);
        }
    }

    fn link(&self) -> Result<&Rc<ObservationManager<M>>, ObserverError> {
        self.link.as_ref().ok_or(ObserverError::Unbound)
    }
}

impl<M: 'static> StateObserver<M> {
    /// Forward to [`ObservationManager::observe`] and keep the token.
    pub fn observe<V, P, H>(&mut self, projection: P, handler: H) -> Result<(), ObserverError>
    where
        V: PartialEq + 'static,
        P: Fn(&M) -> V + 'static,
        H: Fn(V) + 'static,
    {
        let token = self.link()?.observe(projection, handler);
        self.tokens.push(token);
        Ok(())
    }

    /// Forward to [`ObservationManager::observe_with`] and keep the token.
    pub fn observe_with<V, P, Q, H>(
        &mut self,
        projection: P,
        predicate: Q,
        handler: H,
    ) -> Result<(), ObserverError>
    where
        V: 'static,
        P: Fn(&M) -> V + 'static,
        Q: Fn(&V, &V) -> bool + 'static,
        H: Fn(V) + 'static,
    {
        let token = self.link()?.observe_with(projection, predicate, handler);
        self.tokens.push(token);
        Ok(())
    }
}

impl<M> Default for StateObserver<M> {
    fn default() -> Self {
        Self {
            link: None,
            tokens: Vec::new(),
        }
    }
}

impl<M> Drop for StateObserver<M> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<M> fmt::Debug for StateObserver<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateObserver")
            .field("bound", &self.is_bound())
            .field("observations", &self.tokens.len())
            .finish()
    }
}
