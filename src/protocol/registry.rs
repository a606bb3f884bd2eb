//! Pending-request listeners keyed by response channel

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

enum Listener {
    /// Single-shot request, detached after the first delivery
    Once(oneshot::Sender<String>),
    /// Streaming request, detached when the receiver goes away
    Stream(mpsc::UnboundedSender<String>),
}

/// Routes inbound payloads to whoever is waiting on their response channel
#[derive(Clone, Default)]
pub(crate) struct ListenerRegistry {
    listeners: Arc<Mutex<HashMap<String, Listener>>>,
}

impl ListenerRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_once(&self, id: &str) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id.to_string(), Listener::Once(tx));
        rx
    }

    pub fn register_stream(&self, id: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().insert(id.to_string(), Listener::Stream(tx));
        rx
    }

    /// Detach a listener; returns whether one was attached
    pub fn remove(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Hand `payload` to the listener on `id`; returns false when nobody listens
    pub fn deliver(&self, id: &str, payload: String) -> bool {
        let mut listeners = self.lock();
        match listeners.remove(id) {
            Some(Listener::Once(tx)) => tx.send(payload).is_ok(),
            Some(Listener::Stream(tx)) => {
                if tx.send(payload).is_ok() {
                    listeners.insert(id.to_string(), Listener::Stream(tx));
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    /// Drop every listener, waking all waiters with a closed channel
    pub fn close_all(&self) {
        let closed = {
            let mut listeners = self.lock();
            let count = listeners.len();
            listeners.clear();
            count
        };
        if closed > 0 {
            log::debug!("Closed {} pending listeners", closed);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Detaches a listener when dropped
pub(crate) struct ListenerGuard {
    registry: ListenerRegistry,
    id: String,
}

impl ListenerGuard {
    pub fn new(registry: ListenerRegistry, id: String) -> Self {
        Self { registry, id }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
