//! Ordered rotation queue. The head is the next panel to receive a selection.

use std::collections::VecDeque;

use crate::host::PanelId;

/// Ordered, duplicate-free sequence of panels taking part in rotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationQueue {
    panels: VecDeque<PanelId>,
}

impl RotationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    #[must_use]
    pub fn head(&self) -> Option<PanelId> {
        self.panels.front().copied()
    }

    #[must_use]
    pub fn contains(&self, panel: PanelId) -> bool {
        self.panels.contains(&panel)
    }

    #[must_use]
    pub fn position(&self, panel: PanelId) -> Option<usize> {
        self.panels.iter().position(|&p| p == panel)
    }

    pub fn iter(&self) -> impl Iterator<Item = PanelId> + '_ {
        self.panels.iter().copied()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<PanelId> {
        self.panels.iter().copied().collect()
    }

    /// Append at the tail. Returns `false` if the panel was already queued.
    pub fn push_back(&mut self, panel: PanelId) -> bool {
        if self.contains(panel) {
            return false;
        }
        self.panels.push_back(panel);
        true
    }

    pub fn remove(&mut self, panel: PanelId) -> bool {
        match self.position(panel) {
            Some(index) => {
                self.panels.remove(index);
                true
            }
            None => false,
        }
    }

    /// Move the head to the tail.
    pub fn rotate(&mut self) {
        if let Some(head) = self.panels.pop_front() {
            self.panels.push_back(head);
        }
    }

    /// Move `panel` to the tail, wherever it currently sits.
    pub fn move_to_back(&mut self, panel: PanelId) -> bool {
        if !self.remove(panel) {
            return false;
        }
        self.panels.push_back(panel);
        true
    }

    /// Move `panel` to the head so it receives the next selection.
    pub fn move_to_front(&mut self, panel: PanelId) -> bool {
        if !self.remove(panel) {
            return false;
        }
        self.panels.push_front(panel);
        true
    }

    /// Move the entry at `from` to index `to`. Out-of-range or equal indices
    /// are a silent no-op.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.panels.len();
        if from >= len || to >= len || from == to {
            return false;
        }
        if let Some(panel) = self.panels.remove(from) {
            self.panels.insert(to, panel);
        }
        true
    }

    /// Keep only panels for which `keep` returns true. Returns how many were
    /// dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(PanelId) -> bool) -> usize {
        let before = self.panels.len();
        self.panels.retain(|&p| keep(p));
        before - self.panels.len()
    }

    pub fn clear(&mut self) {
        self.panels.clear();
    }
}
