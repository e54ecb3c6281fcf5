//! Ordered list of favorite objects.

use std::rc::Rc;

use crate::host::{ObjectCatalog, ObjectId};
use crate::persistence::{Persistence, PersistenceExt};
use crate::selection_history::ObjectRecord;

/// Persistence key for the favorites list.
pub const FAVORITES_KEY: &str = "favorites";

/// Favorite objects in user-chosen order. Mutators persist immediately and
/// report whether anything changed.
pub struct Favorites {
    entries: Vec<ObjectRecord>,
    store: Rc<dyn Persistence>,
}

impl Favorites {
    pub fn load(store: Rc<dyn Persistence>) -> Self {
        let entries: Vec<ObjectRecord> = store.load(FAVORITES_KEY, Vec::new());
        Self { entries, store }
    }

    #[must_use]
    pub fn entries(&self) -> &[ObjectRecord] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ObjectRecord> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_favorite(&self, record: &ObjectRecord) -> bool {
        self.entries.iter().any(|e| e.same_object(record))
    }

    pub fn add(&mut self, record: ObjectRecord) -> bool {
        if self.is_favorite(&record) {
            return false;
        }
        self.entries.push(record);
        self.persist();
        true
    }

    pub fn remove(&mut self, record: &ObjectRecord) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !e.same_object(record));
        let removed = self.entries.len() < before;
        if removed {
            self.persist();
        }
        removed
    }

    pub fn remove_at(&mut self, index: usize) -> Option<ObjectRecord> {
        if index >= self.entries.len() {
            return None;
        }
        let record = self.entries.remove(index);
        self.persist();
        Some(record)
    }

    /// Add when absent, remove when present. Returns whether the object is a
    /// favorite afterwards.
    pub fn toggle(&mut self, record: ObjectRecord) -> bool {
        if self.remove(&record) {
            false
        } else {
            self.add(record)
        }
    }

    /// Move the entry at `from` to `to`. Invalid or equal indices are ignored.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.entries.len();
        if from >= len || to >= len || from == to {
            return false;
        }
        let record = self.entries.remove(from);
        self.entries.insert(to, record);
        self.persist();
        true
    }

    /// Drop favorites whose object no longer resolves.
    pub fn cleanup_invalid(&mut self, catalog: &dyn ObjectCatalog) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.is_valid(catalog));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist();
            tracing::debug!(removed, "invalid favorites removed");
        }
        removed
    }

    /// Re-point entries at their current session ids (ids change across
    /// restarts; guids do not). Returns how many entries moved.
    pub fn refresh(&mut self, catalog: &dyn ObjectCatalog) -> usize {
        let mut moved = 0;
        for entry in &mut self.entries {
            let Some(live) = entry.resolve(catalog) else {
                continue;
            };
            if live == entry.object_id {
                continue;
            }
            entry.object_id = live;
            if let Some(desc) = catalog.describe(live) {
                entry.name = desc.name;
                entry.type_name = desc.type_name;
            }
            moved += 1;
        }
        if moved > 0 {
            self.persist();
        }
        moved
    }

    #[must_use]
    pub fn position(&self, object: ObjectId) -> Option<usize> {
        self.entries.iter().position(|e| e.object_id == object)
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(FAVORITES_KEY, &self.entries) {
            tracing::warn!(error = %err, "failed to persist favorites");
        }
    }
}

impl std::fmt::Debug for Favorites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Favorites")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
