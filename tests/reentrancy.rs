//! Re-entrant registration, removal and dispatch during notification.

use statebus::{EventBus, ObservationManager, Reduce, ReduceError, StateObserver, Store, Token};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct IncreaseCounter {
    by: i32,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct CountingState {
    counter: i32,
}

impl Reduce<IncreaseCounter> for CountingState {
    fn reduce(&self, event: IncreaseCounter) -> Result<Self, ReduceError> {
        Ok(Self {
            counter: self.counter + event.by,
        })
    }
}

fn get_counter(state: &CountingState) -> i32 {
    state.counter
}

fn bound_store() -> (Rc<Store<CountingState>>, Rc<ObservationManager<CountingState>>) {
    let store = Rc::new(Store::<CountingState>::default());
    let manager = ObservationManager::bind(&store);
    store.apply(IncreaseCounter { by: 42 }).unwrap();
    (store, manager)
}

#[test]
fn test_can_add_handlers_in_handlers() {
    let (store, manager) = bound_store();
    let counters = Rc::new(RefCell::new(Vec::new()));

    let weak = Rc::downgrade(&manager);
    let sink = Rc::clone(&counters);
    manager.observe(get_counter, move |counter| {
        if counter != 44 {
            return;
        }
        if let Some(manager) = weak.upgrade() {
            let sink = Rc::clone(&sink);
            manager.observe(get_counter, move |counter| sink.borrow_mut().push(counter));
        }
    });

    store.apply(IncreaseCounter { by: 2 }).unwrap();
    store.apply(IncreaseCounter { by: 16 }).unwrap();

    assert_eq!(*counters.borrow(), vec![44, 60]);
}

#[test]
fn test_added_from_initial_call_sees_next_transition() {
    let (store, manager) = bound_store();
    let late = Rc::new(RefCell::new(Vec::new()));
    let added = Rc::new(Cell::new(false));

    let weak = Rc::downgrade(&manager);
    let (sink, flag) = (Rc::clone(&late), Rc::clone(&added));
    manager.observe(get_counter, move |_| {
        if flag.replace(true) {
            return;
        }
        if let Some(manager) = weak.upgrade() {
            let sink = Rc::clone(&sink);
            manager.observe(get_counter, move |c| sink.borrow_mut().push(c));
        }
    });

    // The first observer's initial call registered the late one against 42.
    assert_eq!(*late.borrow(), vec![42]);
    assert_eq!(manager.pending_len(), 2);

    store.apply(IncreaseCounter { by: 1 }).unwrap();
    store.apply(IncreaseCounter { by: 1 }).unwrap();

    assert_eq!(*late.borrow(), vec![42, 43, 44]);
}

#[test]
fn test_existing_observers_unaffected_by_registration() {
    let (store, manager) = bound_store();
    let order = Rc::new(RefCell::new(Vec::new()));

    let weak = Rc::downgrade(&manager);
    let log = Rc::clone(&order);
    manager.observe(get_counter, move |c| {
        log.borrow_mut().push(format!("a{c}"));
        if let Some(manager) = weak.upgrade() {
            manager.observe(|_: &CountingState| (), |_| {});
        }
    });
    let log = Rc::clone(&order);
    manager.observe(get_counter, move |c| log.borrow_mut().push(format!("b{c}")));

    store.apply(IncreaseCounter { by: 1 }).unwrap();

    assert_eq!(*order.borrow(), vec!["a42", "b42", "a43", "b43"]);
    assert_eq!(manager.len(), 4);
    assert_eq!(manager.pending_len(), 1);
}

#[test]
fn test_forget_other_entry_during_delivery() {
    let (store, manager) = bound_store();
    let victim: Rc<RefCell<Option<Token>>> = Rc::new(RefCell::new(None));
    let victim_calls = Rc::new(Cell::new(0));

    let weak = Rc::downgrade(&manager);
    let slot = Rc::clone(&victim);
    manager.observe(get_counter, move |_| {
        let token = slot.borrow_mut().take();
        if let (Some(manager), Some(token)) = (weak.upgrade(), token) {
            manager.forget(token);
        }
    });

    let calls = Rc::clone(&victim_calls);
    let token = manager.observe(get_counter, move |_| calls.set(calls.get() + 1));
    *victim.borrow_mut() = Some(token);
    assert_eq!(victim_calls.get(), 1);

    store.apply(IncreaseCounter { by: 1 }).unwrap();

    assert_eq!(victim_calls.get(), 1);
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_forget_self_during_delivery() {
    let (store, manager) = bound_store();
    let own: Rc<RefCell<Option<Token>>> = Rc::new(RefCell::new(None));
    let calls = Rc::new(Cell::new(0));

    let weak = Rc::downgrade(&manager);
    let (slot, count) = (Rc::clone(&own), Rc::clone(&calls));
    let token = manager.observe(get_counter, move |_| {
        count.set(count.get() + 1);
        let token = slot.borrow_mut().take();
        if let (Some(manager), Some(token)) = (weak.upgrade(), token) {
            manager.forget(token);
        }
    });
    *own.borrow_mut() = Some(token);

    store.apply(IncreaseCounter { by: 1 }).unwrap();
    store.apply(IncreaseCounter { by: 1 }).unwrap();

    assert_eq!(calls.get(), 2);
    assert!(manager.is_empty());
}

#[test]
fn test_nested_apply_from_observer() {
    let (store, manager) = bound_store();
    let seen = Rc::new(RefCell::new(Vec::new()));

    // Round every odd counter up to the next even value.
    let weak_store = Rc::downgrade(&store);
    manager.observe(get_counter, move |c| {
        if c % 2 != 0 {
            if let Some(store) = weak_store.upgrade() {
                store.apply(IncreaseCounter { by: 1 }).unwrap();
            }
        }
    });
    let sink = Rc::clone(&seen);
    manager.observe(get_counter, move |c| sink.borrow_mut().push(c));

    store.apply(IncreaseCounter { by: 1 }).unwrap();

    assert_eq!(store.state().counter, 44);
    assert_eq!(*seen.borrow(), vec![42, 44, 43]);
}

#[test]
fn test_observer_released_from_bus_handler() {
    let bus = EventBus::new();
    let (store, manager) = bound_store();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let observer = Rc::new(RefCell::new(StateObserver::new(Rc::clone(&manager))));
    let sink = Rc::clone(&seen);
    observer
        .borrow_mut()
        .observe(get_counter, move |c| sink.borrow_mut().push(c))
        .unwrap();

    struct Shutdown;
    let target = Rc::clone(&observer);
    let _subscription = bus.subscribe(move |_: &Shutdown| target.borrow_mut().clear());

    store.apply(IncreaseCounter { by: 1 }).unwrap();
    bus.dispatch(Shutdown);
    store.apply(IncreaseCounter { by: 1 }).unwrap();

    assert_eq!(*seen.borrow(), vec![42, 43]);
    assert!(manager.is_empty());
}
