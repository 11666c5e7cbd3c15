//! Named-event handler registry.
//!
//! Dispatch snapshots the handler list before invoking anything, so
//! handlers may register or unregister (themselves included) while an event
//! is being dispatched.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::protocol::InboundEvent;

pub type Handler = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

/// Returned by `on`; pass it to `off` to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<String, Vec<(HandlerId, Handler)>>>,
}

impl HandlerRegistry {
    pub(crate) fn on(&self, event: &str, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    pub(crate) fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Invoke every handler for the event's name in registration order.
    /// A panicking handler is logged and skipped. Returns how many ran.
    pub(crate) fn dispatch(&self, event: &InboundEvent) -> usize {
        let snapshot: Vec<(HandlerId, Handler)> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event.name())
            .cloned()
            .unwrap_or_default();

        if snapshot.is_empty() {
            debug!(event = event.name(), "No handler registered");
        }

        for (id, handler) in &snapshot {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!(event = event.name(), handler = id.0, "Signaling handler panicked");
            }
        }
        snapshot.len()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handlers registered by `SignalingChannel::subscribe`. Dropping the
/// subscription unregisters them.
pub struct Subscription {
    registry: Weak<HandlerRegistry>,
    ids: Vec<(String, HandlerId)>,
}

impl Subscription {
    /// Register one forwarding handler per event name.
    pub(crate) fn forward(
        registry: &Arc<HandlerRegistry>,
        events: &[&str],
    ) -> (Self, mpsc::UnboundedReceiver<InboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ids = events
            .iter()
            .map(|name| {
                let tx = tx.clone();
                let handler: Handler = Arc::new(move |event: &InboundEvent| {
                    let _ = tx.send(event.clone());
                });
                (name.to_string(), registry.on(name, handler))
            })
            .collect();
        (
            Self {
                registry: Arc::downgrade(registry),
                ids,
            },
            rx,
        )
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|(name, _)| name.as_str())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            for (name, id) in self.ids.drain(..) {
                registry.off(&name, id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::protocol::events;

    fn end_event() -> InboundEvent {
        InboundEvent::CallEnd {
            from: "u2".into(),
            call_id: "c1".into(),
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Handler {
        let log = Arc::clone(log);
        Arc::new(move |_: &InboundEvent| log.lock().unwrap().push(tag))
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.on(events::CALL_END, recorder(&log, "first"));
        registry.on(events::CALL_END, recorder(&log, "second"));
        registry.on(events::CALL_OFFER, recorder(&log, "other"));

        assert_eq!(registry.dispatch(&end_event()), 2);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn panicking_handler_does_not_stop_others() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.on(events::CALL_END, Arc::new(|_: &InboundEvent| panic!("handler bug")));
        registry.on(events::CALL_END, recorder(&log, "survivor"));

        registry.dispatch(&end_event());
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }

    #[test]
    fn off_removes_only_that_handler() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = registry.on(events::CALL_END, recorder(&log, "a"));
        registry.on(events::CALL_END, recorder(&log, "b"));

        assert!(registry.off(events::CALL_END, a));
        assert!(!registry.off(events::CALL_END, a));
        registry.dispatch(&end_event());
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn handler_can_unregister_itself_during_dispatch() {
        let registry = Arc::new(HandlerRegistry::default());
        let slot: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let handler: Handler = {
            let registry = Arc::downgrade(&registry);
            let slot = Arc::clone(&slot);
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &InboundEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let (Some(registry), Some(id)) = (registry.upgrade(), *slot.lock().unwrap()) {
                    registry.off(events::CALL_END, id);
                }
            })
        };
        let id = registry.on(events::CALL_END, handler);
        *slot.lock().unwrap() = Some(id);

        registry.dispatch(&end_event());
        registry.dispatch(&end_event());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.count(events::CALL_END), 0);
    }

    #[test]
    fn subscription_forwards_and_cleans_up() {
        let registry = Arc::new(HandlerRegistry::default());
        let (subscription, mut rx) =
            Subscription::forward(&registry, &[events::CALL_END, events::CALL_OFFER]);
        assert_eq!(subscription.events().count(), 2);

        registry.dispatch(&end_event());
        assert_eq!(rx.try_recv().unwrap(), end_event());

        drop(subscription);
        assert_eq!(registry.count(events::CALL_END), 0);
        assert_eq!(registry.count(events::CALL_OFFER), 0);
    }
}
