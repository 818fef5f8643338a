use crossbeam_channel::{unbounded, Receiver, Sender};
use mapdash_core::{Color, FetchFailure};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

pub mod boundary;
pub mod telemetry;

pub use boundary::{
    FetchBoundary, FetchRequest, FetchResponse, FetchTarget, InMemoryBoundary, RequestId,
    ResponseStream,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WidgetEvent {
    // Fetch lifecycle
    Loading {
        target: FetchTarget,
    },
    Sync {
        target: FetchTarget,
    },
    Error {
        target: FetchTarget,
        detail: FetchFailure,
    },

    // Data
    DataChanged {
        size: usize,
    },
    SearchDataChanged {
        result_count: usize,
    },
    TotalCountChanged {
        total_count: f64,
    },

    // ========================================================================
    // Lock Events
    // ========================================================================
    LockCollectionChanged {
        names: Vec<String>,
    },
    LockedChanged {
        locked: bool,
    },

    // ========================================================================
    // Filter Events
    // ========================================================================
    FilterChanged {
        accepted: Vec<String>,
        rejected: Vec<String>,
        reject_all: bool,
    },

    // ========================================================================
    // Color Events
    // ========================================================================
    /// Name/color pairs for consumers that style map layers.
    ApplyCategoryColors {
        colors: Vec<(String, Color)>,
    },
    CancelCategoryColors,
}

type SubscriberId = u64;

#[derive(Default)]
struct Registry {
    next_id: SubscriberId,
    subscribers: Vec<(SubscriberId, Sender<WidgetEvent>)>,
}

/// Fan-out bus: every live subscription receives its own copy of each event.
///
/// Events are queued, never delivered inline, so a subscriber reacting to an
/// event cannot re-enter the model that published it.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = unbounded();
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push((id, tx));

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn publish(&self, event: WidgetEvent) {
        let mut registry = self.registry.lock();
        registry
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }
}

/// Handle returned by [`EventBus::subscribe`]. Dropping it deregisters.
pub struct Subscription {
    id: SubscriberId,
    rx: Receiver<WidgetEvent>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn try_next(&self) -> Option<WidgetEvent> {
        self.rx.try_recv().ok()
    }

    /// Take every queued event.
    pub fn drain(&self) -> Vec<WidgetEvent> {
        self.rx.try_iter().collect()
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .subscribers
                .retain(|(id, _)| *id != self.id);
        }
    }
}

/// Trait for components that respond to events.
/// Implement this to receive events from a [`Subscription`].
pub trait EventListener {
    fn handle_event(&mut self, event: &WidgetEvent);
}
