//! Typed observers for pipeline events
//!
//! Listeners are plain callbacks. [`EventBus::subscribe`] returns a
//! [`Subscription`] that removes the listener when dropped, so a listener
//! lives exactly as long as its handle.

use super::types::ExportEvent;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Listener = Arc<dyn Fn(&ExportEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener)>>,
}

/// Fan-out of [`ExportEvent`]s to registered listeners
///
/// Listeners run synchronously on the emitting task, in registration
/// order.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Listeners>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ExportEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            bus: Some(Arc::downgrade(&self.inner)),
        }
    }

    /// Deliver an event to every listener
    pub fn emit(&self, event: &ExportEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while running
        let listeners: Vec<Listener> = self
            .inner
            .entries
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.entries.lock().len()
    }
}

/// Handle keeping a listener registered
pub struct Subscription {
    id: u64,
    bus: Option<Weak<Listeners>>,
}

impl Subscription {
    /// Remove the listener now
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the listener registered for the lifetime of the bus
    pub fn detach(mut self) {
        self.bus = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.take().and_then(|bus| bus.upgrade()) {
            inner.entries.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus, tag: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Subscription {
        let log = log.clone();
        bus.subscribe(move |event| log.lock().push(format!("{}:{:?}", tag, event)))
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = recorder(&bus, "a", &log);
        let _b = recorder(&bus, "b", &log);

        bus.emit(&ExportEvent::Loaded);
        assert_eq!(*log.lock(), vec!["a:Loaded", "b:Loaded"]);
    }

    #[test]
    fn test_unsubscribe_and_drop() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&bus, "a", &log);
        {
            let _b = recorder(&bus, "b", &log);
            assert_eq!(bus.listener_count(), 2);
        }
        assert_eq!(bus.listener_count(), 1);

        a.unsubscribe();
        bus.emit(&ExportEvent::Loaded);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_detach_keeps_listener() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, "a", &log).detach();

        bus.emit(&ExportEvent::Progress { ratio: 1.0 });
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus = EventBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        drop(sub);
    }
}
