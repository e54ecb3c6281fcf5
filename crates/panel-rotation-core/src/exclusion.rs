//! Panels the user pinned out of rotation.
//!
//! An excluded panel is held locked and never receives rotated selections.
//! Membership here and in the [`RotationQueue`] is mutually exclusive: every
//! transition removes the panel from one side before it can appear on the
//! other.
//!
//! This type only keeps the bookkeeping. The caller applies the side effects
//! reported by [`ExclusionChange`] once it has released its own state: locking
//! a newly excluded panel, and resynchronizing the queue after a panel is
//! returned.

use crate::host::PanelId;
use crate::queue::RotationQueue;

/// Membership change produced by [`ExclusionSet::set_excluded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionChange {
    /// The panel left the queue and must now be force-locked.
    Excluded(PanelId),
    /// The panel was un-pinned; the queue should be resynchronized so it can
    /// rejoin rotation.
    IncludedBack(PanelId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    panels: Vec<PanelId>,
}

impl ExclusionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `panel` out of rotation or return it. Excluding removes the panel
    /// from `queue` first. Returns `None` when membership did not change.
    pub fn set_excluded(
        &mut self,
        panel: PanelId,
        excluded: bool,
        queue: &mut RotationQueue,
    ) -> Option<ExclusionChange> {
        if excluded {
            if self.is_excluded(panel) {
                return None;
            }
            queue.remove(panel);
            self.panels.push(panel);
            Some(ExclusionChange::Excluded(panel))
        } else {
            let before = self.panels.len();
            self.panels.retain(|&p| p != panel);
            (self.panels.len() < before).then_some(ExclusionChange::IncludedBack(panel))
        }
    }

    #[must_use]
    pub fn is_excluded(&self, panel: PanelId) -> bool {
        self.panels.contains(&panel)
    }

    /// Excluded panels in the order they were pinned.
    #[must_use]
    pub fn panels(&self) -> &[PanelId] {
        &self.panels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn clear(&mut self) {
        self.panels.clear();
    }

    /// Forget panels that are no longer live. Returns how many were dropped.
    pub fn purge_dead(&mut self, live: &[PanelId]) -> usize {
        let before = self.panels.len();
        self.panels.retain(|p| live.contains(p));
        before - self.panels.len()
    }
}
