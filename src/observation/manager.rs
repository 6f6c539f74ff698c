//! Projection-based change observation.

use crate::store::Store;
use crate::types::ObservationId;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use tracing::trace;

/// One registered reaction, with its projection and predicate erased.
trait Reaction<M> {
    /// Run the handler against the projection of `state`.
    fn initial(&self, state: &M);

    /// Run the handler if the projection differs between `from` and `to`.
    fn changed(&self, from: &M, to: &M);
}

struct Projected<P, Q, H, V> {
    projection: P,
    predicate: Q,
    handler: H,
    _value: PhantomData<fn() -> V>,
}

impl<M, V, P, Q, H> Reaction<M> for Projected<P, Q, H, V>
where
    P: Fn(&M) -> V,
    Q: Fn(&V, &V) -> bool,
    H: Fn(V),
{
    fn initial(&self, state: &M) {
        (self.handler)((self.projection)(state));
    }

    fn changed(&self, from: &M, to: &M) {
        let next = (self.projection)(to);
        if !(self.predicate)(&next, &(self.projection)(from)) {
            (self.handler)(next);
        }
    }
}

type Entry<M> = Rc<dyn Reaction<M>>;

/// Entries keyed by allocation order. `pending` holds entries registered
/// since the last notification; they join `live` when the next one starts.
struct Entries<M> {
    pending: BTreeMap<ObservationId, Entry<M>>,
    live: BTreeMap<ObservationId, Entry<M>>,
}

/// Cancels one observation when passed to [`ObservationManager::forget`].
///
/// Tokens cannot be cloned; forgetting consumes them.
#[derive(Debug, PartialEq, Eq)]
pub struct Token {
    id: ObservationId,
}

impl Token {
    pub fn id(&self) -> ObservationId {
        self.id
    }
}

/// Tracks the current state and notifies projections that change.
///
/// Registration is two-phase: a new observation runs once immediately and
/// is queued as pending; pending entries are promoted at the start of the
/// next [`message_changed`](Self::message_changed), before any handler runs.
/// An observation added while a notification is being delivered therefore
/// first fires on the following notification.
///
/// Forgetting an observation while notifications are delivered is allowed.
/// An entry forgotten before its turn is skipped. An entry that forgets
/// itself from its own handler finishes the current call and never fires
/// again.
///
/// Panics raised by handlers propagate out of `message_changed`; handlers
/// later in the round do not run.
pub struct ObservationManager<M> {
    state: RefCell<Rc<M>>,
    entries: RefCell<Entries<M>>,
    next_id: Cell<u64>,
}

impl<M> ObservationManager<M> {
    /// Create a manager tracking `state`.
    pub fn new(state: Rc<M>) -> Self {
        Self {
            state: RefCell::new(state),
            entries: RefCell::new(Entries {
                pending: BTreeMap::new(),
                live: BTreeMap::new(),
            }),
            next_id: Cell::new(1),
        }
    }

    /// The state the manager currently tracks.
    pub fn state(&self) -> Rc<M> {
        Rc::clone(&self.state.borrow())
    }

    /// Notify observations about the transition `from` -> `to`.
    pub fn message_changed(&self, from: &Rc<M>, to: &Rc<M>) {
        let superseded = self.state.replace(Rc::clone(to));
        drop(superseded);

        let ids: Vec<ObservationId> = {
            let mut entries = self.entries.borrow_mut();
            let Entries { pending, live } = &mut *entries;
            if !pending.is_empty() {
                trace!(promoted = pending.len(), "Promoting pending observations");
                // Pending ids are newer than every live id, so order is kept.
                live.append(pending);
            }
            live.keys().copied().collect()
        };

        for id in ids {
            let entry = self.entries.borrow().live.get(&id).cloned();
            if let Some(entry) = entry {
                entry.changed(from, to);
            }
        }
    }

    /// Remove the observation behind `token`.
    ///
    /// Returns false if the entry was already gone.
    pub fn forget(&self, token: Token) -> bool {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            match entries.pending.remove(&token.id) {
                Some(entry) => Some(entry),
                None => entries.live.remove(&token.id),
            }
        };

        trace!(observation = %token.id, removed = removed.is_some(), "Forgot observation");
        removed.is_some()
    }

    /// Number of registered observations, pending or live.
    pub fn len(&self) -> usize {
        let entries = self.entries.borrow();
        entries.pending.len() + entries.live.len()
    }

    /// Number of observations waiting for promotion.
    pub fn pending_len(&self) -> usize {
        self.entries.borrow().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M: 'static> ObservationManager<M> {
    /// Create a manager tracking `store` and install it as the store's change
    /// handler.
    ///
    /// The store only keeps a weak reference; once the returned manager is
    /// dropped, transitions are no longer forwarded.
    pub fn bind(store: &Store<M>) -> Rc<Self> {
        let manager = Rc::new(Self::new(store.state()));
        let weak = Rc::downgrade(&manager);
        store.set_change_handler(move |from, to| {
            if let Some(manager) = weak.upgrade() {
                manager.message_changed(from, to);
            }
        });
        manager
    }

    /// Observe `projection`, reacting whenever its value changes.
    ///
    /// `handler` runs once right away with the current projection, then on
    /// every transition where the projection differs by `==`. Tuples can be
    /// destructured in the handler's parameter. Projections return owned
    /// values and cannot borrow from the model, so clone (or `Rc`-share) any
    /// field the handler needs.
    pub fn observe<V, P, H>(&self, projection: P, handler: H) -> Token
    where
        V: PartialEq + 'static,
        P: Fn(&M) -> V + 'static,
        H: Fn(V) + 'static,
    {
        self.observe_with(projection, |next: &V, previous: &V| next == previous, handler)
    }

    /// Observe `projection` with a custom equality.
    ///
    /// `predicate(next, previous)` returning true means "unchanged" and
    /// suppresses the handler for that transition. As with
    /// [`observe`](Self::observe), the projection returns an owned value.
    pub fn observe_with<V, P, Q, H>(&self, projection: P, predicate: Q, handler: H) -> Token
    where
        V: 'static,
        P: Fn(&M) -> V + 'static,
        Q: Fn(&V, &V) -> bool + 'static,
        H: Fn(V) + 'static,
    {
        let id = ObservationId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let entry: Entry<M> = Rc::new(Projected {
            projection,
            predicate,
            handler,
            _value: PhantomData::<fn() -> V>,
        });

        // Queued before the initial call so a transition triggered from
        // inside that call already reaches the new entry.
        self.entries
            .borrow_mut()
            .pending
            .insert(id, Rc::clone(&entry));
        trace!(observation = %id, "Queued observation");

        let state = self.state();
        entry.initial(&state);

        Token { id }
    }
}

impl<M> fmt::Debug for ObservationManager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        f.debug_struct("ObservationManager")
            .field("pending", &entries.pending.len())
            .field("live", &entries.live.len())
            .finish()
    }
}
