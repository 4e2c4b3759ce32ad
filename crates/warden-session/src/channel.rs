//! Explicit many-listener publish/subscribe channels
//!
//! The engine's two push channels are modeled as independent
//! [`EventChannel`]s with explicit subscribe/unsubscribe lifetimes instead
//! of one global emitter. Listeners on a single channel see events in
//! emission order; distinct listeners are fanned out independently.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ChannelInner<T> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
}

/// A many-listener broadcast channel for one kind of engine event.
///
/// Cloning yields another handle to the same channel.
pub struct EventChannel<T> {
    inner: Arc<ChannelInner<T>>,
}

impl<T> Clone for EventChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                next_id: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a listener. The returned [`Subscription`] unsubscribes it;
    /// dropping the subscription unsubscribes as well.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .expect("listener registry poisoned")
            .push((id, Arc::new(listener)));

        Subscription {
            id,
            channel: Arc::downgrade(&self.inner),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Deliver a value to every registered listener, in registration order.
    ///
    /// The registry lock is released before listeners run, so a callback
    /// may cancel its own (or any) subscription.
    pub fn emit(&self, value: &T) {
        let listeners: Vec<Listener<T>> = {
            let registry = self
                .inner
                .listeners
                .lock()
                .expect("listener registry poisoned");
            registry.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(value);
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .expect("listener registry poisoned")
            .len()
    }
}

/// Handle for one registered listener.
///
/// [`cancel()`](Subscription::cancel) is idempotent; `Drop` cancels too, so
/// a forgotten handle cannot leak its listener.
pub struct Subscription<T> {
    id: u64,
    channel: Weak<ChannelInner<T>>,
    cancelled: AtomicBool,
}

impl<T> Subscription<T> {
    /// Remove the listener from its channel. Safe to call repeatedly.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(inner) = self.channel.upgrade() {
            inner
                .listeners
                .lock()
                .expect("listener registry poisoned")
                .retain(|(id, _)| *id != self.id);
        }
    }

    /// Whether this subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
