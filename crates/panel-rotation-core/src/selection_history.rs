//! Browser-style selection history.
//!
//! Entries are kept oldest first with a cursor on the current one. Recording a
//! selection while the cursor sits in the past drops the forward branch, the
//! same way a web browser does after "back, then follow a new link".
//!
//! Session ids do not survive a restart, so each entry also keeps the asset
//! guid (when the object has one) and is resolved through the catalog before
//! use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::config::clamp_history_entries;
use crate::host::{ObjectCatalog, ObjectDescriptor, ObjectId};
use crate::persistence::{Persistence, PersistenceExt};

/// Persistence key for the history list.
pub const HISTORY_KEY: &str = "selection_history";

/// Snapshot of a selected object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub object_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_guid: Option<String>,
    pub name: String,
    pub type_name: String,
    pub recorded_at: DateTime<Utc>,
}

impl ObjectRecord {
    #[must_use]
    pub fn from_descriptor(object_id: ObjectId, desc: &ObjectDescriptor) -> Self {
        Self {
            object_id,
            asset_guid: desc.asset_guid.clone().filter(|g| !g.is_empty()),
            name: desc.name.clone(),
            type_name: desc.type_name.clone(),
            recorded_at: Utc::now(),
        }
    }

    /// Same session id, or same asset guid.
    #[must_use]
    pub fn same_object(&self, other: &Self) -> bool {
        if self.object_id == other.object_id {
            return true;
        }
        match (&self.asset_guid, &other.asset_guid) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Find the live object this record refers to. The session id wins when
    /// it still describes the same asset; otherwise the guid is resolved.
    #[must_use]
    pub fn resolve(&self, catalog: &dyn ObjectCatalog) -> Option<ObjectId> {
        if let Some(desc) = catalog.describe(self.object_id) {
            let guid_matches = match &self.asset_guid {
                Some(guid) => desc.asset_guid.as_deref() == Some(guid.as_str()),
                None => true,
            };
            if guid_matches {
                return Some(self.object_id);
            }
        }
        self.asset_guid
            .as_deref()
            .and_then(|guid| catalog.resolve_asset(guid))
    }

    #[must_use]
    pub fn is_valid(&self, catalog: &dyn ObjectCatalog) -> bool {
        self.resolve(catalog).is_some()
    }
}

/// Navigable selection history. Mutators report whether anything changed so
/// the owner can announce it.
pub struct SelectionHistory {
    entries: Vec<ObjectRecord>,
    current: Option<usize>,
    max_entries: usize,
    store: Rc<dyn Persistence>,
}

impl SelectionHistory {
    /// Load persisted entries; the cursor starts at the newest one.
    pub fn load(store: Rc<dyn Persistence>, max_entries: usize) -> Self {
        let mut entries: Vec<ObjectRecord> = store.load(HISTORY_KEY, Vec::new());
        let max_entries = clamp_history_entries(max_entries);
        if entries.len() > max_entries {
            entries.drain(..entries.len() - max_entries);
        }
        let current = entries.len().checked_sub(1);
        tracing::debug!(entries = entries.len(), "selection history loaded");
        Self {
            entries,
            current,
            max_entries,
            store,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[ObjectRecord] {
        &self.entries
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
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn current(&self) -> Option<&ObjectRecord> {
        self.current.and_then(|i| self.entries.get(i))
    }

    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Append a selection. A repeat of the current entry is ignored.
    pub fn record(&mut self, record: ObjectRecord) -> bool {
        if self.current().is_some_and(|c| c.same_object(&record)) {
            return false;
        }
        if let Some(current) = self.current {
            self.entries.truncate(current + 1);
        }
        self.entries.push(record);
        self.trim_oldest();
        self.current = self.entries.len().checked_sub(1);
        self.persist();
        true
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.current.is_some_and(|i| i > 0)
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.current.is_some_and(|i| i + 1 < self.entries.len())
    }

    /// Step the cursor back and return the entry it lands on.
    pub fn go_back(&mut self) -> Option<&ObjectRecord> {
        if !self.can_go_back() {
            return None;
        }
        let index = self.current? - 1;
        self.current = Some(index);
        self.entries.get(index)
    }

    pub fn go_forward(&mut self) -> Option<&ObjectRecord> {
        if !self.can_go_forward() {
            return None;
        }
        let index = self.current? + 1;
        self.current = Some(index);
        self.entries.get(index)
    }

    /// Jump the cursor to `index`.
    pub fn go_to(&mut self, index: usize) -> Option<&ObjectRecord> {
        if index >= self.entries.len() {
            return None;
        }
        self.current = Some(index);
        self.entries.get(index)
    }

    pub fn clear(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.entries.clear();
        self.current = None;
        self.persist();
        true
    }

    /// Drop entries whose object no longer resolves. Returns how many went.
    ///
    /// The cursor stays on its entry when that survives, otherwise it moves to
    /// the nearest older survivor.
    pub fn cleanup_invalid(&mut self, catalog: &dyn ObjectCatalog) -> usize {
        let before = self.entries.len();
        let mut kept = Vec::with_capacity(before);
        let mut current = None;
        for (index, entry) in std::mem::take(&mut self.entries).into_iter().enumerate() {
            let valid = entry.is_valid(catalog);
            if valid {
                kept.push(entry);
            }
            if self.current == Some(index) {
                current = kept.len().checked_sub(1);
            }
        }
        if current.is_none() && !kept.is_empty() {
            current = Some(0);
        }
        let removed = before - kept.len();
        self.entries = kept;
        if removed == 0 {
            return 0;
        }
        self.current = current;
        self.persist();
        tracing::debug!(removed, "invalid history entries removed");
        removed
    }

    /// Change capacity (clamped to the accepted range) and trim to fit.
    pub fn set_max_entries(&mut self, max_entries: usize) -> bool {
        let max_entries = clamp_history_entries(max_entries);
        if max_entries == self.max_entries {
            return false;
        }
        self.max_entries = max_entries;
        if self.trim_oldest() > 0 {
            self.persist();
        }
        true
    }

    fn trim_oldest(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess > 0 {
            self.entries.drain(..excess);
            self.current = self.current.map(|i| i.saturating_sub(excess));
        }
        excess
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(HISTORY_KEY, &self.entries) {
            tracing::warn!(error = %err, "failed to persist selection history");
        }
    }
}

impl std::fmt::Debug for SelectionHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionHistory")
            .field("entries", &self.entries.len())
            .field("current", &self.current)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}
