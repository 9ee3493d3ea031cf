//! Handler registry for inbound realtime events.
//!
//! Registering a handler returns a [`Subscription`]; dropping it removes
//! the handler from every later dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::debug;

use roadhelp_core::events::ServerEvent;

/// A registered event handler.
pub type EventHandler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Event name → handlers, in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: DashMap<&'static str, Vec<(u64, EventHandler)>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `handler` for events named `event`.
    pub fn register(self: &Arc<Self>, event: &'static str, handler: EventHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.entry(event).or_default().push((id, handler));
        debug!(event = event, handler_id = id, "Realtime handler registered");

        Subscription {
            registry: Arc::downgrade(self),
            event,
            id,
        }
    }

    fn deregister(&self, event: &'static str, id: u64) {
        if let Some(mut entries) = self.handlers.get_mut(event) {
            entries.retain(|(handler_id, _)| *handler_id != id);
        }
        self.handlers.remove_if(event, |_, entries| entries.is_empty());
        debug!(event = event, handler_id = id, "Realtime handler deregistered");
    }

    /// Invokes every handler registered for the event. Returns how many ran.
    pub fn dispatch(&self, event: &ServerEvent) -> usize {
        // Clone out so handlers may (de)register without holding the shard lock.
        let targets: Vec<EventHandler> = match self.handlers.get(event.name()) {
            Some(entries) => entries.iter().map(|(_, handler)| handler.clone()).collect(),
            None => return 0,
        };
        for handler in &targets {
            handler(event);
        }
        targets.len()
    }

    /// Total handlers across all events.
    pub fn handler_count(&self) -> usize {
        self.handlers.iter().map(|entry| entry.value().len()).sum()
    }
}

/// Keeps a handler registered while alive.
#[must_use = "dropping a Subscription deregisters its handler"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<HandlerRegistry>,
    event: &'static str,
    id: u64,
}

impl Subscription {
    /// The event this subscription listens to.
    pub fn event(&self) -> &'static str {
        self.event
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.event, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use roadhelp_core::events::HELP_ACCEPTED;

    use super::*;

    fn ping() -> ServerEvent {
        ServerEvent::Ping { timestamp: 1 }
    }

    #[test]
    fn test_dropped_subscription_never_fires() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let subscription = registry.register(
            "ping",
            Arc::new(move |_: &ServerEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(registry.dispatch(&ping()), 1);
        drop(subscription);
        assert_eq!(registry.dispatch(&ping()), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.handler_count(), 0);
    }

    #[test]
    fn test_dispatch_only_matches_event_name() {
        let registry = HandlerRegistry::new();
        let _sub = registry.register(HELP_ACCEPTED, Arc::new(|_: &ServerEvent| {}));
        assert_eq!(registry.dispatch(&ping()), 0);
    }

    #[test]
    fn test_subscription_outliving_registry_is_harmless() {
        let registry = HandlerRegistry::new();
        let subscription = registry.register("ping", Arc::new(|_: &ServerEvent| {}));
        drop(registry);
        assert_eq!(subscription.event(), "ping");
        drop(subscription);
    }
}
