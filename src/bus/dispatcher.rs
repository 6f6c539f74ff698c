//! Type-keyed multicast dispatch.

use crate::types::HandlerId;
use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use super::subscription::Subscription;

/// Handler with its event type erased. The wrapper recovers the concrete
/// type with a checked downcast.
type ErasedHandler = Rc<dyn Fn(&dyn Any)>;

/// Source of per-bus identities, so a handle is only honoured by its own bus.
static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// Registrations for one event type, ordered by registration.
struct HandlerList {
    event_name: &'static str,
    handlers: BTreeMap<HandlerId, ErasedHandler>,
}

impl HandlerList {
    fn new(event_name: &'static str) -> Self {
        Self {
            event_name,
            handlers: BTreeMap::new(),
        }
    }
}

/// Identifies one registration on an [`EventBus`].
///
/// Handles are neither `Clone` nor `Copy`: [`EventBus::detach`] consumes the
/// handle, so the same registration cannot be detached twice. A handle
/// remembers the bus that issued it; other buses ignore it.
#[derive(Debug)]
pub struct Handle {
    bus: u64,
    event_type: TypeId,
    event_name: &'static str,
    id: HandlerId,
}

impl Handle {
    /// Key of the registration within its event type.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Name of the event type the handler is registered for.
    pub fn event_name(&self) -> &'static str {
        self.event_name
    }
}

/// Synchronous publish/subscribe keyed by the static type of the event.
///
/// All operations take `&self`, so handlers may attach, detach and dispatch
/// on the same bus while they are being invoked. A dispatch delivers to the
/// handlers registered when it started, in registration order; handlers
/// detached mid-dispatch and not yet reached are skipped.
///
/// A panicking handler unwinds out of [`dispatch`](Self::dispatch) and the
/// remaining handlers for that event do not run.
pub struct EventBus {
    id: u64,
    handlers: RefCell<HashMap<TypeId, HandlerList>>,
    next_id: Cell<u64>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
            handlers: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    /// Register `handler` for events of type `E`.
    ///
    /// `E` is usually inferred from the closure's parameter type.
    pub fn attach<E, F>(&self, handler: F) -> Handle
    where
        E: 'static,
        F: Fn(&E) + 'static,
    {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let wrapped: ErasedHandler = Rc::new(move |event: &dyn Any| {
            match event.downcast_ref::<E>() {
                Some(event) => handler(event),
                None => unreachable!("event routed under the wrong type key"),
            }
        });

        let event_name = type_name::<E>();
        self.handlers
            .borrow_mut()
            .entry(TypeId::of::<E>())
            .or_insert_with(|| HandlerList::new(event_name))
            .handlers
            .insert(id, wrapped);

        trace!(event = event_name, handler = %id, "attached handler");

        Handle {
            bus: self.id,
            event_type: TypeId::of::<E>(),
            event_name,
            id,
        }
    }

    /// Remove the registration behind `handle`.
    ///
    /// Returns false if the registration was already gone (e.g. after
    /// [`clear`](Self::clear)) or the handle was issued by another bus.
    pub fn detach(&self, handle: Handle) -> bool {
        if handle.bus != self.id {
            trace!(event = handle.event_name, handler = %handle.id, "ignored foreign handle");
            return false;
        }

        // The removed handler is dropped after the borrow ends; its captures
        // may own subscriptions on this same bus.
        let removed = {
            let mut map = self.handlers.borrow_mut();
            let Some(list) = map.get_mut(&handle.event_type) else {
                return false;
            };

            let removed = list.handlers.remove(&handle.id);
            if list.handlers.is_empty() {
                map.remove(&handle.event_type);
            }
            removed
        };

        trace!(
            event = handle.event_name,
            handler = %handle.id,
            removed = removed.is_some(),
            "detached handler"
        );
        removed.is_some()
    }

    /// Deliver `event` to every handler registered for `E`.
    pub fn dispatch<E: 'static>(&self, event: E) {
        self.dispatch_with(move || event)
    }

    /// Build an event with `make` and deliver it to every handler registered
    /// for `E`. `make` is not called when nobody listens.
    pub fn dispatch_with<E, F>(&self, make: F)
    where
        E: 'static,
        F: FnOnce() -> E,
    {
        let key = TypeId::of::<E>();

        let ids: Vec<HandlerId> = match self.handlers.borrow().get(&key) {
            Some(list) if !list.handlers.is_empty() => list.handlers.keys().copied().collect(),
            _ => return,
        };

        let event = make();
        trace!(event = type_name::<E>(), handlers = ids.len(), "dispatching");

        for id in ids {
            // Looked up per handler so detaches made by earlier handlers are honoured.
            let handler = self
                .handlers
                .borrow()
                .get(&key)
                .and_then(|list| list.handlers.get(&id).cloned());

            if let Some(handler) = handler {
                handler(&event);
            }
        }
    }

    /// Register `handler` and tie the registration to the returned
    /// [`Subscription`].
    pub fn subscribe<E, F>(&self, handler: F) -> Subscription<'_>
    where
        E: 'static,
        F: Fn(&E) + 'static,
    {
        Subscription::new(self, self.attach(handler))
    }

    /// Number of handlers registered for `E`.
    pub fn handler_count<E: 'static>(&self) -> usize {
        self.handlers
            .borrow()
            .get(&TypeId::of::<E>())
            .map_or(0, |list| list.handlers.len())
    }

    /// Whether any handler is registered for `E`.
    pub fn has_handlers<E: 'static>(&self) -> bool {
        self.handler_count::<E>() > 0
    }

    /// Whether the bus holds no registrations at all.
    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    /// Drop every registration. Outstanding handles become stale and
    /// detaching them is a no-op.
    pub fn clear(&self) {
        // Taken out first for the same reason as in `detach`.
        let drained = std::mem::take(&mut *self.handlers.borrow_mut());
        drop(drained);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.handlers.borrow();
        f.debug_map()
            .entries(map.values().map(|list| (list.event_name, list.handlers.len())))
            .finish()
    }
}
