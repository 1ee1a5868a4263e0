//! Change-notification bus.
//!
//! Listeners are plain callback tables keyed by flag id, so user flag
//! ids live in their own namespace and can never collide with the
//! internal refresh-rate notification, which has its own listener list.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::types::FlagValue;

/// A dynamic flag transition observed by a refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagChange {
    pub id: String,
    pub new_value: FlagValue,
    pub old_value: FlagValue,
}

/// Internal notification emitted when the scheduler retimes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRateChange {
    pub current: Duration,
    pub previous: Duration,
}

/// Callback invoked with each change to a subscribed flag id.
pub type ChangeListener = Arc<dyn Fn(&FlagChange) + Send + Sync>;

/// Callback invoked when the refresh rate changes.
pub type RateListener = Arc<dyn Fn(&RefreshRateChange) + Send + Sync>;

/// Per-flag-id change listeners plus refresh-rate listeners.
#[derive(Clone, Default)]
pub struct ChangeBus {
    change_listeners: Arc<RwLock<HashMap<String, Vec<ChangeListener>>>>,
    rate_listeners: Arc<RwLock<Vec<RateListener>>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one flag id.
    pub fn subscribe<F>(&self, id: impl Into<String>, listener: F)
    where
        F: Fn(&FlagChange) + Send + Sync + 'static,
    {
        let id = id.into();
        self.change_listeners
            .write()
            .entry(id)
            .or_default()
            .push(Arc::new(listener));
    }

    /// Register a listener for refresh-rate changes.
    pub fn subscribe_refresh_rate<F>(&self, listener: F)
    where
        F: Fn(&RefreshRateChange) + Send + Sync + 'static,
    {
        self.rate_listeners.write().push(Arc::new(listener));
    }

    /// Deliver a change to every listener subscribed to its id.
    pub fn emit_change(&self, change: &FlagChange) {
        let listeners = {
            let table = self.change_listeners.read();
            table.get(&change.id).cloned().unwrap_or_default()
        };
        if listeners.is_empty() {
            return;
        }
        tracing::debug!(
            flag = %change.id,
            listeners = listeners.len(),
            "Emitting flag change"
        );
        for listener in listeners {
            listener(change);
        }
    }

    pub fn emit_rate_change(&self, change: &RefreshRateChange) {
        let listeners = self.rate_listeners.read().clone();
        tracing::debug!(
            current = ?change.current,
            previous = ?change.previous,
            "Emitting refresh-rate change"
        );
        for listener in listeners {
            listener(change);
        }
    }

    pub fn listener_count(&self, id: &str) -> usize {
        self.change_listeners
            .read()
            .get(id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
