//! Selection browser: records selections into history and drives back/forward
//! navigation and favorites.
//!
//! Navigating sets the host selection, which fires the selection listener
//! again. A `navigating` flag suppresses re-recording for that echo so history
//! stays put while the user walks through it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::config::HistoryConfig;
use crate::favorites::Favorites;
use crate::host::{ListenerId, ObjectCatalog, ObjectId, SelectionSource};
use crate::notifications::{Notification, NotificationBus};
use crate::persistence::Persistence;
use crate::selection_history::{ObjectRecord, SelectionHistory};

struct BrowserInner {
    selection: Rc<dyn SelectionSource>,
    catalog: Rc<dyn ObjectCatalog>,
    bus: Rc<NotificationBus>,
    history: RefCell<SelectionHistory>,
    favorites: RefCell<Favorites>,
    record_assets: Cell<bool>,
    record_scene_objects: Cell<bool>,
    recording: Cell<bool>,
    navigating: Cell<bool>,
    disposed: Cell<bool>,
    listener: Cell<Option<ListenerId>>,
}

/// Resets the navigating flag even if the host's selection callback unwinds.
struct Navigating<'a>(&'a Cell<bool>);

impl<'a> Navigating<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for Navigating<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct SelectionBrowser {
    inner: Rc<BrowserInner>,
}

impl SelectionBrowser {
    /// Load history and favorites from `store` and start listening.
    pub fn new(
        selection: Rc<dyn SelectionSource>,
        catalog: Rc<dyn ObjectCatalog>,
        store: Rc<dyn Persistence>,
        bus: Rc<NotificationBus>,
        config: &HistoryConfig,
    ) -> Self {
        let inner = Rc::new(BrowserInner {
            selection,
            catalog,
            bus,
            history: RefCell::new(SelectionHistory::load(Rc::clone(&store), config.max_entries)),
            favorites: RefCell::new(Favorites::load(store)),
            record_assets: Cell::new(config.record_assets),
            record_scene_objects: Cell::new(config.record_scene_objects),
            recording: Cell::new(true),
            navigating: Cell::new(false),
            disposed: Cell::new(false),
            listener: Cell::new(None),
        });

        let weak: Weak<BrowserInner> = Rc::downgrade(&inner);
        let id = inner.selection.subscribe(Box::new(move |selection| {
            if let Some(inner) = weak.upgrade() {
                inner.on_selection_changed(selection);
            }
        }));
        inner.listener.set(Some(id));
        Self { inner }
    }

    // -- recording ------------------------------------------------------------

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.inner.recording.get()
    }

    pub fn set_recording(&self, recording: bool) {
        self.inner.recording.set(recording);
    }

    /// Apply the recording switches and capacity from `config`.
    pub fn apply_config(&self, config: &HistoryConfig) {
        self.inner.record_assets.set(config.record_assets);
        self.inner.record_scene_objects.set(config.record_scene_objects);
        let changed = self
            .inner
            .history
            .borrow_mut()
            .set_max_entries(config.max_entries);
        if changed {
            self.inner.publish(&Notification::HistoryUpdated);
        }
    }

    // -- history --------------------------------------------------------------

    #[must_use]
    pub fn history(&self) -> Vec<ObjectRecord> {
        self.inner.history.borrow().entries().to_vec()
    }

    #[must_use]
    pub fn current_history_index(&self) -> Option<usize> {
        self.inner.history.borrow().current_index()
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.inner.history.borrow().can_go_back()
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.inner.history.borrow().can_go_forward()
    }

    /// Select the previous history entry, skipping entries whose object is
    /// gone. Returns the object selected.
    pub fn go_back(&self) -> Option<ObjectId> {
        self.step(|h| h.go_back().cloned())
    }

    pub fn go_forward(&self) -> Option<ObjectId> {
        self.step(|h| h.go_forward().cloned())
    }

    pub fn select_from_history(&self, index: usize) -> Option<ObjectId> {
        let record = self.inner.history.borrow_mut().go_to(index).cloned()?;
        let object = record.resolve(self.inner.catalog.as_ref())?;
        self.inner.navigate_to(object);
        Some(object)
    }

    pub fn clear_history(&self) {
        let changed = self.inner.history.borrow_mut().clear();
        if changed {
            self.inner.publish(&Notification::HistoryUpdated);
        }
    }

    fn step(
        &self,
        mut advance: impl FnMut(&mut SelectionHistory) -> Option<ObjectRecord>,
    ) -> Option<ObjectId> {
        loop {
            let record = advance(&mut self.inner.history.borrow_mut())?;
            if let Some(object) = record.resolve(self.inner.catalog.as_ref()) {
                self.inner.navigate_to(object);
                return Some(object);
            }
            debug!(name = %record.name, "history entry no longer resolves; skipping");
        }
    }

    // -- favorites ------------------------------------------------------------

    #[must_use]
    pub fn favorites(&self) -> Vec<ObjectRecord> {
        self.inner.favorites.borrow().entries().to_vec()
    }

    /// Whether the active selection is a favorite.
    #[must_use]
    pub fn is_current_favorite(&self) -> bool {
        self.inner
            .current_record()
            .is_some_and(|r| self.inner.favorites.borrow().is_favorite(&r))
    }

    pub fn add_current_to_favorites(&self) -> bool {
        let Some(record) = self.inner.current_record() else {
            return false;
        };
        let added = self.inner.favorites.borrow_mut().add(record);
        if added {
            self.inner.publish(&Notification::FavoritesUpdated);
        }
        added
    }

    /// Returns whether the active selection is a favorite afterwards, or
    /// `None` with nothing selected.
    pub fn toggle_current_favorite(&self) -> Option<bool> {
        let record = self.inner.current_record()?;
        let now_favorite = self.inner.favorites.borrow_mut().toggle(record);
        self.inner.publish(&Notification::FavoritesUpdated);
        Some(now_favorite)
    }

    pub fn remove_favorite(&self, index: usize) -> bool {
        let removed = self.inner.favorites.borrow_mut().remove_at(index).is_some();
        if removed {
            self.inner.publish(&Notification::FavoritesUpdated);
        }
        removed
    }

    pub fn reorder_favorites(&self, from: usize, to: usize) -> bool {
        let moved = self.inner.favorites.borrow_mut().reorder(from, to);
        if moved {
            self.inner.publish(&Notification::FavoritesUpdated);
        }
        moved
    }

    /// Select the favorite at `index` without recording it into history.
    pub fn select_favorite(&self, index: usize) -> Option<ObjectId> {
        let record = self.inner.favorites.borrow().get(index).cloned()?;
        let object = record.resolve(self.inner.catalog.as_ref())?;
        self.inner.navigate_to(object);
        Some(object)
    }

    // -- maintenance ----------------------------------------------------------

    /// Drop unresolvable history entries and favorites, and re-point favorites
    /// at current session ids. Returns the number of entries removed.
    pub fn cleanup_all(&self) -> usize {
        let catalog = self.inner.catalog.as_ref();
        let from_history = self.inner.history.borrow_mut().cleanup_invalid(catalog);
        let (from_favorites, moved) = {
            let mut favorites = self.inner.favorites.borrow_mut();
            let moved = favorites.refresh(catalog);
            (favorites.cleanup_invalid(catalog), moved)
        };
        if from_history > 0 {
            self.inner.publish(&Notification::HistoryUpdated);
        }
        if from_favorites > 0 || moved > 0 {
            self.inner.publish(&Notification::FavoritesUpdated);
        }
        from_history + from_favorites
    }

    /// Stop listening for selection changes. Safe to call more than once.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        if let Some(id) = self.inner.listener.take() {
            self.inner.selection.unsubscribe(id);
        }
    }
}

impl Drop for SelectionBrowser {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for SelectionBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionBrowser")
            .field("history", &self.inner.history.borrow())
            .field("favorites", &self.inner.favorites.borrow())
            .field("recording", &self.inner.recording.get())
            .finish_non_exhaustive()
    }
}

impl BrowserInner {
    fn on_selection_changed(&self, selection: Option<ObjectId>) {
        if self.disposed.get() || !self.recording.get() || self.navigating.get() {
            return;
        }
        let Some(object) = selection else {
            return;
        };
        let Some(desc) = self.catalog.describe(object) else {
            return;
        };
        let wanted = if desc.is_asset() {
            self.record_assets.get()
        } else {
            self.record_scene_objects.get()
        };
        if !wanted {
            return;
        }
        let recorded = self
            .history
            .borrow_mut()
            .record(ObjectRecord::from_descriptor(object, &desc));
        if recorded {
            self.publish(&Notification::HistoryUpdated);
        }
    }

    fn current_record(&self) -> Option<ObjectRecord> {
        let object = self.selection.active_object()?;
        let desc = self.catalog.describe(object)?;
        Some(ObjectRecord::from_descriptor(object, &desc))
    }

    fn navigate_to(&self, object: ObjectId) {
        let _navigating = Navigating::enter(&self.navigating);
        self.selection.set_active_object(Some(object));
    }

    fn publish(&self, notification: &Notification) {
        self.bus.publish(notification);
    }
}
