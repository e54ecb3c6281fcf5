//! Rotation scheduler.
//!
//! Keeps a set of host panels locked and feeds each new selection to one of
//! them, so several panels show recent selections side by side instead of a
//! single panel following the selection.
//!
//! # State machine
//!
//! ```text
//!             set_enabled(true)                      selection changed
//!  Disabled ───────────────────► Idle ──────────────────────────────► Updating
//!     ▲                           ▲  ◄──── direct update / continuation ──┘
//!     │     set_enabled(false)    │                                        │
//!     └───────────────────────────┴──── timeout (> UPDATE_TIMEOUT) ◄───────┘
//! ```
//!
//! `Paused` is orthogonal: while paused, selection changes are ignored but the
//! queue and locks stay as they are.
//!
//! # Dispatch policies
//!
//! - [`RotationMode::Cycle`]: the queue head shows the selection, then moves
//!   to the tail.
//! - [`RotationMode::History`]: panel *i* in queue order shows the *i*-th most
//!   recent selection; the queue order itself does not change.
//!
//! When a host cannot push an object into a locked panel directly, a cycle
//! update unlocks the head, lets the host repaint it with the live selection,
//! and finishes on the host's idle tick (re-lock, requeue, notify).
//!
//! # Re-entrancy
//!
//! Scheduler state sits in a `RefCell`. No borrow is held across a host call
//! or a bus publish, so hosts and observers may call back into the scheduler
//! synchronously. A host that changes the selection from inside an update hits
//! the in-flight guard instead of recursing.

use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{RotationConfig, RotationMode};
use crate::deferred::IdleQueue;
use crate::exclusion::{ExclusionChange, ExclusionSet};
use crate::host::{FocusedSurface, ListenerId, ObjectId, PanelHost, PanelId, SelectionSource};
use crate::locks::PanelLocker;
use crate::notifications::{Notification, NotificationBus};
use crate::persistence::{Persistence, PersistenceExt};
use crate::queue::RotationQueue;
use crate::selection_filter::SelectionPredicate;

/// An update still in flight after this long is considered stuck and is reset
/// by the next synchronization pass.
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(1);

/// Extra history entries kept beyond the queue length.
pub const HISTORY_SLACK: usize = 5;

/// Persistence key for the enabled flag.
pub const ENABLED_KEY: &str = "rotation.enabled";

// =============================================================================
// Public types
// =============================================================================

/// Host services the scheduler runs against.
#[derive(Clone)]
pub struct SchedulerServices {
    pub host: Rc<dyn PanelHost>,
    pub selection: Rc<dyn SelectionSource>,
    pub idle: Rc<dyn IdleQueue>,
    pub clock: Rc<dyn Clock>,
    pub store: Rc<dyn Persistence>,
    pub bus: Rc<NotificationBus>,
}

/// Label for a panel's slot in History mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "role", content = "age")]
pub enum PanelRole {
    /// Shows the most recent selection.
    Latest,
    /// Shows the selection `n` steps back.
    Previous(usize),
}

impl std::fmt::Display for PanelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => f.write_str("Latest"),
            Self::Previous(n) => write!(f, "Previous -{n}"),
        }
    }
}

/// Live panels partitioned by how the scheduler treats them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PanelLists {
    /// In rotation, in queue order.
    pub rotation: Vec<PanelId>,
    /// Pinned out of rotation.
    pub excluded: Vec<PanelId>,
    /// Live but neither queued nor excluded (e.g. while disabled).
    pub unmanaged: Vec<PanelId>,
}

/// Point-in-time view of scheduler state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    pub enabled: bool,
    pub paused: bool,
    pub updating: bool,
    pub mode: RotationMode,
    pub auto_focus: bool,
    pub queue: Vec<PanelId>,
    pub excluded: Vec<PanelId>,
    pub history_len: usize,
    pub last_selection: Option<ObjectId>,
}

// =============================================================================
// Internal state
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct InFlight {
    seq: u64,
    started: Duration,
}

#[derive(Debug)]
struct RotationState {
    enabled: bool,
    paused: bool,
    disposed: bool,
    mode: RotationMode,
    auto_focus: bool,
    updating: Option<InFlight>,
    next_seq: u64,
    queue: RotationQueue,
    exclusions: ExclusionSet,
    /// Most recent first.
    history: VecDeque<ObjectId>,
    last_known: Option<ObjectId>,
}

struct Inner {
    services: SchedulerServices,
    state: RefCell<RotationState>,
    filter: RefCell<Option<SelectionPredicate>>,
    listener: Cell<Option<ListenerId>>,
}

/// Clears the in-flight marker if dispatch unwinds before handing off.
struct UpdateGuard<'a> {
    inner: &'a Inner,
    seq: u64,
    armed: bool,
}

impl<'a> UpdateGuard<'a> {
    fn new(inner: &'a Inner, seq: u64) -> Self {
        Self {
            inner,
            seq,
            armed: true,
        }
    }

    /// Update finished: clear the marker now.
    fn finish(mut self) {
        self.armed = false;
        self.inner.clear_update(self.seq);
    }

    /// Ownership of the marker moved elsewhere (a deferred continuation).
    fn hand_off(mut self) {
        self.armed = false;
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut st) = self.inner.state.try_borrow_mut() {
            if st.updating.is_some_and(|f| f.seq == self.seq) {
                st.updating = None;
            }
        }
        warn!(seq = self.seq, "rotation update aborted; in-flight state cleared");
    }
}

// =============================================================================
// RotationScheduler
// =============================================================================

/// The rotation engine. Subscribes to the selection source on construction and
/// unsubscribes on [`RotationScheduler::dispose`] (or drop).
pub struct RotationScheduler {
    inner: Rc<Inner>,
}

impl RotationScheduler {
    /// Build a scheduler and restore the persisted enabled flag. When the flag
    /// was set, the queue is rebuilt from the live panels.
    pub fn new(services: SchedulerServices, config: &RotationConfig) -> Self {
        let enabled: bool = services.store.load(ENABLED_KEY, false);
        let inner = Rc::new(Inner {
            services,
            state: RefCell::new(RotationState {
                enabled,
                paused: false,
                disposed: false,
                mode: config.mode,
                auto_focus: config.auto_focus_on_update,
                updating: None,
                next_seq: 0,
                queue: RotationQueue::new(),
                exclusions: ExclusionSet::new(),
                history: VecDeque::new(),
                last_known: None,
            }),
            filter: RefCell::new(None),
            listener: Cell::new(None),
        });

        let weak: Weak<Inner> = Rc::downgrade(&inner);
        let id = inner
            .services
            .selection
            .subscribe(Box::new(move |selection| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_selection_changed(selection);
                }
            }));
        inner.listener.set(Some(id));

        if enabled {
            inner.initialize_rotation();
        }
        info!(enabled, mode = %config.mode, "rotation scheduler ready");
        Self { inner }
    }

    // -- engine switches ------------------------------------------------------

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.state.borrow().enabled
    }

    /// Turn rotation on or off. Setting the current value is a no-op.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.set_enabled(enabled);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.state.borrow().paused
    }

    pub fn set_paused(&self, paused: bool) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.disposed || st.paused == paused {
                return;
            }
            st.paused = paused;
        }
        info!(paused, "rotation pause toggled");
        self.inner
            .services
            .bus
            .publish(&Notification::PauseChanged { paused });
    }

    #[must_use]
    pub fn mode(&self) -> RotationMode {
        self.inner.state.borrow().mode
    }

    /// Switch dispatch policy. The history buffer starts over.
    pub fn set_mode(&self, mode: RotationMode) {
        let mut st = self.inner.state.borrow_mut();
        if st.mode == mode {
            return;
        }
        st.mode = mode;
        st.history.clear();
        info!(mode = %mode, "rotation mode changed");
    }

    #[must_use]
    pub fn auto_focus(&self) -> bool {
        self.inner.state.borrow().auto_focus
    }

    pub fn set_auto_focus(&self, auto_focus: bool) {
        self.inner.state.borrow_mut().auto_focus = auto_focus;
    }

    /// Install (or remove) the predicate for selections to ignore.
    pub fn set_selection_filter(&self, filter: Option<SelectionPredicate>) {
        *self.inner.filter.borrow_mut() = filter;
    }

    // -- event entry points ---------------------------------------------------

    /// Feed a selection change. The selection-source subscription calls this;
    /// hosts with their own event plumbing may call it directly.
    pub fn handle_selection(&self, selection: Option<ObjectId>) {
        self.inner.on_selection_changed(selection);
    }

    /// Periodic host tick: reconcile the queue with the live panel set.
    pub fn tick(&self) {
        self.inner.sync_queue();
    }

    /// Reconcile the queue with the live panel set and recover from a stuck
    /// update. No-op while disabled.
    pub fn sync_queue(&self) {
        self.inner.sync_queue();
    }

    // -- manual controls ------------------------------------------------------

    /// Skip the head panel: move it to the tail without updating it.
    pub fn rotate_to_next(&self) {
        if !self.is_enabled() {
            return;
        }
        self.inner.sync_queue();
        let mut st = self.inner.state.borrow_mut();
        st.queue.rotate();
        debug!(head = ?st.queue.head(), "rotated to next panel");
    }

    /// Make `panel` the next one to receive a selection. Returns `false` when
    /// the panel is not in rotation.
    pub fn set_next_target(&self, panel: PanelId) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.inner.sync_queue();
        let moved = self.inner.state.borrow_mut().queue.move_to_front(panel);
        if moved {
            debug!(panel_id = %panel, "next rotation target set");
        }
        moved
    }

    /// Move the queue entry at `from` to `to`. Invalid indices are ignored.
    pub fn reorder(&self, from: usize, to: usize) -> bool {
        self.inner.state.borrow_mut().queue.reorder(from, to)
    }

    /// Put `panel` under rotation management: clear any exclusion, lock it and
    /// append it to the queue tail.
    pub fn add_managed_panel(&self, panel: PanelId) {
        let enabled = {
            let mut guard = self.inner.state.borrow_mut();
            let st = &mut *guard;
            if st.disposed {
                return;
            }
            st.exclusions.set_excluded(panel, false, &mut st.queue);
            st.enabled
        };
        if !enabled || !self.inner.services.host.is_live(panel) {
            return;
        }
        self.inner.locker().set(panel, true);
        self.inner.state.borrow_mut().queue.push_back(panel);
        debug!(panel_id = %panel, "panel added to rotation");
    }

    /// Pin `panel` out of rotation (held locked) or return it.
    pub fn set_excluded(&self, panel: PanelId, excluded: bool) -> bool {
        if excluded && !self.inner.services.host.is_live(panel) {
            return false;
        }
        let change = {
            let mut guard = self.inner.state.borrow_mut();
            let st = &mut *guard;
            if st.disposed {
                return false;
            }
            st.exclusions.set_excluded(panel, excluded, &mut st.queue)
        };
        match change {
            Some(ExclusionChange::Excluded(panel)) => {
                self.inner.locker().set(panel, true);
                true
            }
            Some(ExclusionChange::IncludedBack(_)) => {
                self.inner.sync_queue();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_excluded(&self, panel: PanelId) -> bool {
        self.inner.state.borrow().exclusions.is_excluded(panel)
    }

    /// Close a panel through the host and drop it from bookkeeping.
    pub fn close_panel(&self, panel: PanelId) {
        self.inner.services.host.close(panel);
        self.inner.sync_queue();
    }

    // -- queries --------------------------------------------------------------

    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.inner.state.borrow().updating.is_some()
    }

    #[must_use]
    pub fn rotation_order(&self) -> Vec<PanelId> {
        self.inner.state.borrow().queue.to_vec()
    }

    #[must_use]
    pub fn excluded_panels(&self) -> Vec<PanelId> {
        self.inner.state.borrow().exclusions.panels().to_vec()
    }

    /// Whether `panel` receives the next selection.
    #[must_use]
    pub fn is_next_target(&self, panel: PanelId) -> bool {
        let st = self.inner.state.borrow();
        st.enabled && st.queue.head() == Some(panel)
    }

    /// Zero-based position of `panel` in the queue.
    #[must_use]
    pub fn rotation_index(&self, panel: PanelId) -> Option<usize> {
        self.inner.state.borrow().queue.position(panel)
    }

    /// One-based position of `panel` in the host's enumeration order.
    #[must_use]
    pub fn window_number(&self, panel: PanelId) -> Option<usize> {
        self.inner
            .services
            .host
            .list_panels()
            .iter()
            .position(|&p| p == panel)
            .map(|i| i + 1)
    }

    /// History-mode slot label for `panel`.
    #[must_use]
    pub fn role(&self, panel: PanelId) -> Option<PanelRole> {
        let st = self.inner.state.borrow();
        if !st.enabled || st.mode != RotationMode::History {
            return None;
        }
        st.queue.position(panel).map(|i| match i {
            0 => PanelRole::Latest,
            n => PanelRole::Previous(n),
        })
    }

    #[must_use]
    pub fn panel_lists(&self) -> PanelLists {
        let live = self.inner.services.host.list_panels();
        let st = self.inner.state.borrow();
        let rotation: Vec<PanelId> = st.queue.iter().filter(|p| live.contains(p)).collect();
        let excluded: Vec<PanelId> = st
            .exclusions
            .panels()
            .iter()
            .copied()
            .filter(|p| live.contains(p))
            .collect();
        let unmanaged = live
            .iter()
            .copied()
            .filter(|p| !rotation.contains(p) && !excluded.contains(p))
            .collect();
        PanelLists {
            rotation,
            excluded,
            unmanaged,
        }
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.inner.state.borrow().history.len()
    }

    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let st = self.inner.state.borrow();
        SchedulerSnapshot {
            enabled: st.enabled,
            paused: st.paused,
            updating: st.updating.is_some(),
            mode: st.mode,
            auto_focus: st.auto_focus,
            queue: st.queue.to_vec(),
            excluded: st.exclusions.panels().to_vec(),
            history_len: st.history.len(),
            last_selection: st.last_known,
        }
    }

    // -- lifecycle ------------------------------------------------------------

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }

    /// Unsubscribe from the selection source and drop all bookkeeping. Pending
    /// continuations become no-ops. Safe to call more than once.
    pub fn dispose(&self) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.disposed {
                return;
            }
            st.disposed = true;
            st.updating = None;
            st.queue.clear();
            st.exclusions.clear();
            st.history.clear();
            st.last_known = None;
        }
        if let Some(id) = self.inner.listener.take() {
            self.inner.services.selection.unsubscribe(id);
        }
        debug!("rotation scheduler disposed");
    }
}

impl Drop for RotationScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for RotationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationScheduler")
            .field("state", &self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Dispatch internals
// =============================================================================

impl Inner {
    fn locker(&self) -> PanelLocker<'_> {
        PanelLocker::new(self.services.host.as_ref(), &self.services.bus)
    }

    fn set_enabled(&self, enabled: bool) {
        {
            let mut st = self.state.borrow_mut();
            if st.disposed || st.enabled == enabled {
                return;
            }
            st.enabled = enabled;
            st.paused = false;
        }
        if let Err(err) = self.services.store.save(ENABLED_KEY, &enabled) {
            warn!(error = %err, "failed to persist rotation enabled flag");
        }
        if enabled {
            self.initialize_rotation();
        } else {
            self.release_panels();
        }
        info!(enabled, "rotation engine toggled");
        self.services
            .bus
            .publish(&Notification::EngineEnabledChanged { enabled });
    }

    /// Rebuild the queue from every live, non-excluded panel. Queued and
    /// excluded panels all end up locked.
    fn initialize_rotation(&self) {
        let live = self.services.host.list_panels();
        let active = self.services.selection.active_object();
        let (queued, pinned) = {
            let mut guard = self.state.borrow_mut();
            let st = &mut *guard;
            st.exclusions.purge_dead(&live);
            st.queue.clear();
            st.history.clear();
            st.updating = None;
            for &panel in &live {
                if !st.exclusions.is_excluded(panel) {
                    st.queue.push_back(panel);
                }
            }
            st.last_known = active;
            (st.queue.to_vec(), st.exclusions.panels().to_vec())
        };
        let locker = self.locker();
        for &panel in queued.iter().chain(&pinned) {
            locker.set(panel, true);
        }
        debug!(queue_len = queued.len(), excluded = pinned.len(), "rotation queue rebuilt");
    }

    /// Unlock every live panel the engine was holding and empty the queue.
    fn release_panels(&self) {
        let live = self.services.host.list_panels();
        let held: Vec<PanelId> = {
            let mut st = self.state.borrow_mut();
            let mut held = st.queue.to_vec();
            held.extend_from_slice(st.exclusions.panels());
            st.queue.clear();
            st.history.clear();
            st.updating = None;
            st.last_known = None;
            held
        };
        let locker = self.locker();
        let released = held
            .into_iter()
            .filter(|p| live.contains(p))
            .filter(|&p| locker.set(p, false))
            .count();
        debug!(released, "rotation panels released");
    }

    fn start_update(&self) -> u64 {
        let now = self.services.clock.now();
        let mut st = self.state.borrow_mut();
        st.next_seq += 1;
        let seq = st.next_seq;
        st.updating = Some(InFlight { seq, started: now });
        seq
    }

    /// Clear the in-flight marker if it still belongs to update `seq`.
    fn clear_update(&self, seq: u64) -> bool {
        let mut st = self.state.borrow_mut();
        if st.updating.is_some_and(|f| f.seq == seq) {
            st.updating = None;
            true
        } else {
            false
        }
    }

    fn on_selection_changed(self: &Rc<Self>, selection: Option<ObjectId>) {
        {
            let st = self.state.borrow();
            if st.disposed || !st.enabled || st.paused {
                return;
            }
            if st.updating.is_some() {
                debug!("update in flight; selection ignored");
                return;
            }
        }
        let Some(object) = selection else {
            return;
        };

        let filter = self.filter.borrow().clone();
        if filter.is_some_and(|blocked| blocked(object)) {
            debug!(object_id = %object, "selection blocked by filter");
            return;
        }

        {
            let mut st = self.state.borrow_mut();
            if st.last_known == Some(object) {
                return;
            }
            st.last_known = Some(object);
        }

        self.sync_queue();

        let (mode, queue_len) = {
            let st = self.state.borrow();
            (st.mode, st.queue.len())
        };
        if queue_len == 0 {
            return;
        }
        let span = crate::rotation_span!("dispatch", object_id = object.0, queue_len = queue_len);
        let _enter = span.enter();
        match mode {
            RotationMode::Cycle => self.cycle_update(object),
            RotationMode::History => self.history_update(object),
        }
    }

    fn sync_queue(&self) {
        {
            let st = self.state.borrow();
            if st.disposed || !st.enabled {
                return;
            }
        }
        let host = self.services.host.as_ref();
        let live = host.list_panels();
        let now = self.services.clock.now();

        let (added, timed_out, in_flight) = {
            let mut guard = self.state.borrow_mut();
            let st = &mut *guard;
            let dropped = st.queue.retain(|p| live.contains(&p));
            let purged = st.exclusions.purge_dead(&live);
            if dropped + purged > 0 {
                debug!(dropped, purged, "dead panels removed");
            }

            let mut added = Vec::new();
            for &panel in &live {
                if !st.exclusions.is_excluded(panel) && st.queue.push_back(panel) {
                    added.push(panel);
                }
            }

            let timed_out = match st.updating {
                Some(flight) if now.saturating_sub(flight.started) > UPDATE_TIMEOUT => {
                    st.updating = None;
                    Some(now.saturating_sub(flight.started))
                }
                _ => None,
            };
            (added, timed_out, st.updating.is_some())
        };

        let locker = self.locker();
        for &panel in &added {
            locker.set(panel, true);
            debug!(panel_id = %panel, "new panel joined rotation");
        }

        if let Some(elapsed) = timed_out {
            warn!(
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Rotation update timed out, resetting state"
            );
        }

        if !in_flight {
            let managed: Vec<PanelId> = {
                let st = self.state.borrow();
                live.iter()
                    .copied()
                    .filter(|&p| !st.exclusions.is_excluded(p))
                    .collect()
            };
            for panel in managed {
                locker.set(panel, true);
            }
        }
    }

    fn cycle_update(self: &Rc<Self>, object: ObjectId) {
        let Some(target) = self.state.borrow().queue.head() else {
            return;
        };
        let seq = self.start_update();
        let guard = UpdateGuard::new(self, seq);
        let host = self.services.host.as_ref();

        if host.direct_update_supported() {
            match host.try_direct_update(target, object) {
                Ok(true) => {
                    self.state.borrow_mut().queue.move_to_back(target);
                    guard.finish();
                    debug!(panel_id = %target, object_id = %object, mode = "cycle", "panel updated in place");
                    self.complete(target, object);
                    return;
                }
                Ok(false) => {
                    warn!(panel_id = %target, "Direct update failed, falling back");
                }
                Err(err) => {
                    warn!(panel_id = %target, error = %err, "Direct update failed, falling back");
                }
            }
        }

        // Fallback: let the unlocked panel pick up the live selection on
        // repaint, then finish on the idle tick.
        self.locker().set(target, false);
        host.repaint(target);
        let weak = Rc::downgrade(self);
        self.services.idle.defer(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.complete_fallback(target, object, seq);
            }
        }));
        guard.hand_off();
        debug!(panel_id = %target, object_id = %object, "fallback update scheduled");
    }

    fn complete_fallback(&self, target: PanelId, object: ObjectId, seq: u64) {
        {
            let st = self.state.borrow();
            if st.disposed {
                return;
            }
            if !st.updating.is_some_and(|f| f.seq == seq) {
                debug!(panel_id = %target, seq, "stale fallback continuation ignored");
                return;
            }
        }
        if !self.services.host.is_live(target) {
            self.clear_update(seq);
            debug!(panel_id = %target, "panel closed before fallback completed");
            return;
        }
        if self.state.borrow().exclusions.is_excluded(target) {
            // Pinned mid-flight: keep it frozen, no completion.
            self.locker().set(target, true);
            self.clear_update(seq);
            debug!(panel_id = %target, "panel excluded before fallback completed");
            return;
        }

        let guard = UpdateGuard::new(self, seq);
        self.locker().set(target, true);
        self.state.borrow_mut().queue.move_to_back(target);
        guard.finish();
        debug!(panel_id = %target, object_id = %object, "fallback update completed");
        self.complete(target, object);
    }

    fn history_update(self: &Rc<Self>, object: ObjectId) {
        let seq = self.start_update();
        let guard = UpdateGuard::new(self, seq);
        {
            let mut st = self.state.borrow_mut();
            st.history.push_front(object);
            let cap = st.queue.len() + HISTORY_SLACK;
            st.history.truncate(cap);
        }

        let host = self.services.host.as_ref();
        if !host.direct_update_supported() {
            warn!("History mode needs direct updates; falling back to cycle rotation");
            self.state.borrow_mut().history.clear();
            guard.finish();
            self.cycle_update(object);
            return;
        }

        let plan: Vec<(PanelId, ObjectId)> = {
            let st = self.state.borrow();
            st.queue.iter().zip(st.history.iter().copied()).collect()
        };
        for &(panel, shown) in &plan {
            if !host.is_object_valid(shown) {
                debug!(panel_id = %panel, object_id = %shown, "skipping stale history entry");
                continue;
            }
            match host.try_direct_update(panel, shown) {
                Ok(true) => {}
                Ok(false) => debug!(panel_id = %panel, "history step declined by host"),
                Err(err) => debug!(panel_id = %panel, error = %err, "history step failed"),
            }
        }
        guard.finish();

        if let Some(&(head, _)) = plan.first() {
            debug!(panel_id = %head, object_id = %object, mode = "history", "history cascade applied");
            self.complete(head, object);
        }
    }

    /// Announce a finished update and bring the panel forward.
    fn complete(&self, panel: PanelId, object: ObjectId) {
        self.services
            .bus
            .publish(&Notification::UpdateCompleted { panel, object });
        if !self.state.borrow().auto_focus {
            return;
        }
        let host = self.services.host.as_ref();
        if host.focused_surface() == FocusedSurface::Browser {
            return;
        }
        host.focus(panel);
    }
}

// =============================================================================
// Tests
// =============================================================================
