//! Property-change observers attached to status adapters.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Name of the only property adapters publish.
pub const STATE_PROPERTY: &str = "state";

/// Change notification delivered synchronously to registered listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChangeEvent<S> {
    /// Name of the property that changed.
    pub property: &'static str,
    /// Previously published value, if any was published.
    pub old: Option<S>,
    /// Newly observed value.
    pub new: S,
}

impl<S> PropertyChangeEvent<S> {
    /// State change from `old` to `new`.
    pub const fn state(old: Option<S>, new: S) -> Self {
        Self {
            property: STATE_PROPERTY,
            old,
            new,
        }
    }
}

/// Observer of adapter property changes.
pub trait PropertyChangeListener<S>: Send + Sync {
    /// Invoked on the thread that caused the change.
    fn property_changed(&self, event: &PropertyChangeEvent<S>);
}

impl<S, F> PropertyChangeListener<S> for F
where
    F: Fn(&PropertyChangeEvent<S>) + Send + Sync,
{
    fn property_changed(&self, event: &PropertyChangeEvent<S>) {
        self(event);
    }
}

/// Shared listener handle; identity is the allocation address.
pub type ListenerHandle<S> = Arc<dyn PropertyChangeListener<S>>;

/// Thread-safe listener list with synchronous broadcast.
pub struct ListenerRegistry<S> {
    listeners: RwLock<Vec<ListenerHandle<S>>>,
}

impl<S: 'static> ListenerRegistry<S> {
    /// Empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener. Registering the same handle twice is a no-op.
    pub fn add(&self, listener: ListenerHandle<S>) {
        let mut guard = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !guard.iter().any(|existing| same_listener(existing, &listener)) {
            guard.push(listener);
        }
    }

    /// Deregister a listener, returning whether it was registered.
    pub fn remove(&self, listener: &ListenerHandle<S>) -> bool {
        let mut guard = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|existing| !same_listener(existing, listener));
        guard.len() != before
    }

    /// Whether the handle is currently registered.
    #[must_use]
    pub fn contains(&self, listener: &ListenerHandle<S>) -> bool {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|existing| same_listener(existing, listener))
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener registered at the time of delivery.
    ///
    /// No lock is held during callbacks, so listeners may deregister
    /// themselves or others; a listener removed mid-broadcast is skipped.
    pub fn broadcast(&self, event: &PropertyChangeEvent<S>) {
        let snapshot: Vec<ListenerHandle<S>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in snapshot {
            if self.contains(&listener) {
                listener.property_changed(event);
            }
        }
    }
}

impl<S: 'static> Default for ListenerRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for ListenerRegistry<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        formatter
            .debug_struct("ListenerRegistry")
            .field("listeners", &count)
            .finish()
    }
}

fn same_listener<S>(left: &ListenerHandle<S>, right: &ListenerHandle<S>) -> bool {
    Arc::as_ptr(left).cast::<()>() == Arc::as_ptr(right).cast::<()>()
}
