//! Scope-bound ownership of event bus registrations.

use std::fmt;
use std::ops::AddAssign;

use super::dispatcher::{EventBus, Handle};

/// Owns one registration on an [`EventBus`] and detaches it when dropped.
///
/// A default subscription owns nothing. Moving a subscription moves the
/// ownership, so each registration is detached exactly once.
#[must_use = "dropping a subscription detaches its handler immediately"]
#[derive(Default)]
pub struct Subscription<'bus> {
    inner: Option<(&'bus EventBus, Handle)>,
}

impl<'bus> Subscription<'bus> {
    pub(crate) fn new(bus: &'bus EventBus, handle: Handle) -> Self {
        Self {
            inner: Some((bus, handle)),
        }
    }

    /// Whether this subscription still owns a registration.
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Name of the subscribed event type, if any.
    pub fn event_name(&self) -> Option<&'static str> {
        self.inner.as_ref().map(|(_, handle)| handle.event_name())
    }

    /// Detach now instead of at end of scope.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some((bus, handle)) = self.inner.take() {
            bus.detach(handle);
        }
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some((_, handle)) => f
                .debug_struct("Subscription")
                .field("event", &handle.event_name())
                .field("id", &handle.id())
                .finish(),
            None => f.write_str("Subscription(empty)"),
        }
    }
}

/// Holds several subscriptions and detaches them all together.
#[derive(Default, Debug)]
pub struct SubscriptionList<'bus> {
    list: Vec<Subscription<'bus>>,
}

impl<'bus> SubscriptionList<'bus> {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn push(&mut self, subscription: Subscription<'bus>) {
        self.list.push(subscription);
    }

    /// Detach and discard every held subscription.
    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Start a chain of subscriptions against `bus`, collected into this list.
    ///
    /// ```ignore
    /// list.on(&bus)
    ///     .subscribe(|e: &Opened| ...)
    ///     .subscribe(|e: &Closed| ...);
    /// ```
    pub fn on<'l>(&'l mut self, bus: &'bus EventBus) -> SubscriptionProxy<'l, 'bus> {
        SubscriptionProxy { list: self, bus }
    }
}

impl<'bus> AddAssign<Subscription<'bus>> for SubscriptionList<'bus> {
    fn add_assign(&mut self, rhs: Subscription<'bus>) {
        self.push(rhs);
    }
}

/// Builder returned by [`SubscriptionList::on`].
pub struct SubscriptionProxy<'l, 'bus> {
    list: &'l mut SubscriptionList<'bus>,
    bus: &'bus EventBus,
}

impl<'l, 'bus> SubscriptionProxy<'l, 'bus> {
    pub fn subscribe<E, F>(self, handler: F) -> Self
    where
        E: 'static,
        F: Fn(&E) + 'static,
    {
        self.list.push(self.bus.subscribe(handler));
        self
    }
}
