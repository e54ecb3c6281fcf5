//! Notification bus for engine state changes.
//!
//! Observers (status views, shortcut overlays, tests) subscribe here instead of
//! polling the scheduler. The bus is an explicit value owned by the session;
//! there is no process-wide instance.
//!
//! Dispatch runs on a snapshot of the subscriber list, so a handler may
//! unsubscribe itself (or anyone else) mid-dispatch. A panicking handler is
//! caught and logged and the remaining handlers still run.
//!
//! The bus lives on the host's UI thread alongside the scheduler, so handlers
//! may capture `Rc` state, including the scheduler itself.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::host::{ObjectId, PanelId};

// ---------------------------------------------------------------------------
// Notification types
// ---------------------------------------------------------------------------

/// Discriminant used to filter subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EngineEnabledChanged,
    PauseChanged,
    UpdateCompleted,
    PanelLockChanged,
    HistoryUpdated,
    FavoritesUpdated,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EngineEnabledChanged => "engine_enabled_changed",
            Self::PauseChanged => "pause_changed",
            Self::UpdateCompleted => "update_completed",
            Self::PanelLockChanged => "panel_lock_changed",
            Self::HistoryUpdated => "history_updated",
            Self::FavoritesUpdated => "favorites_updated",
        };
        f.write_str(name)
    }
}

/// A state change published by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Rotation was switched on or off.
    EngineEnabledChanged { enabled: bool },
    /// Rotation was paused or resumed.
    PauseChanged { paused: bool },
    /// A panel finished showing a newly selected object.
    UpdateCompleted { panel: PanelId, object: ObjectId },
    /// A panel's lock flag actually flipped.
    PanelLockChanged { panel: PanelId, locked: bool },
    HistoryUpdated,
    FavoritesUpdated,
}

impl Notification {
    #[must_use]
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::EngineEnabledChanged { .. } => NotificationKind::EngineEnabledChanged,
            Self::PauseChanged { .. } => NotificationKind::PauseChanged,
            Self::UpdateCompleted { .. } => NotificationKind::UpdateCompleted,
            Self::PanelLockChanged { .. } => NotificationKind::PanelLockChanged,
            Self::HistoryUpdated => NotificationKind::HistoryUpdated,
            Self::FavoritesUpdated => NotificationKind::FavoritesUpdated,
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Opaque handle returned when subscribing.
pub type SubscriptionId = u64;

/// Handler callback signature. Handlers must not block.
pub type NotificationHandler = dyn Fn(&Notification);

struct SubscriberRecord {
    id: SubscriptionId,
    handler: Rc<NotificationHandler>,
    /// If set, the handler only fires for this kind.
    filter: Option<NotificationKind>,
}

// ---------------------------------------------------------------------------
// NotificationBus
// ---------------------------------------------------------------------------

/// Typed publish/subscribe bus.
///
/// Handlers fire in registration order.
pub struct NotificationBus {
    subscribers: RefCell<Vec<SubscriberRecord>>,
    next_id: Cell<u64>,
}

impl NotificationBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Register a handler, optionally restricted to one notification kind.
    pub fn subscribe(
        &self,
        filter: Option<NotificationKind>,
        handler: Rc<NotificationHandler>,
    ) -> SubscriptionId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().push(SubscriberRecord {
            id,
            handler,
            filter,
        });
        id
    }

    /// Remove a handler. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|r| r.id != id);
        subscribers.len() < before
    }

    /// Deliver `notification` to every matching handler and return how many
    /// ran to completion.
    pub fn publish(&self, notification: &Notification) -> usize {
        let kind = notification.kind();
        let snapshot: Vec<(SubscriptionId, Rc<NotificationHandler>)> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|r| r.filter.is_none_or(|f| f == kind))
            .map(|r| (r.id, Rc::clone(&r.handler)))
            .collect();

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(notification))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        subscription_id = id,
                        kind = %kind,
                        panic = panic_message(payload.as_ref()),
                        "notification handler panicked"
                    );
                }
            }
        }
        delivered
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Remove all handlers, returning the count removed.
    pub fn clear(&self) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        let count = subscribers.len();
        subscribers.clear();
        count
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
