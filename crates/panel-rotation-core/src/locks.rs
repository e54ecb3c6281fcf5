//! Panel lock bookkeeping and the manual lock shortcuts.

use crate::host::{FocusedSurface, PanelHost, PanelId};
use crate::notifications::{Notification, NotificationBus};

/// Lock setter that only touches the host when the flag actually changes and
/// announces every change on the bus.
#[derive(Clone, Copy)]
pub struct PanelLocker<'a> {
    host: &'a dyn PanelHost,
    bus: &'a NotificationBus,
}

impl<'a> PanelLocker<'a> {
    #[must_use]
    pub fn new(host: &'a dyn PanelHost, bus: &'a NotificationBus) -> Self {
        Self { host, bus }
    }

    /// Set the lock flag. Returns `true` when it changed.
    pub fn set(&self, panel: PanelId, locked: bool) -> bool {
        if self.host.is_locked(panel) == locked {
            return false;
        }
        self.host.set_locked(panel, locked);
        tracing::trace!(panel_id = %panel, locked, "panel lock changed");
        self.bus
            .publish(&Notification::PanelLockChanged { panel, locked });
        true
    }

    /// Lock every live panel. Returns how many changed.
    pub fn lock_all(&self) -> usize {
        self.set_all(true)
    }

    /// Unlock every live panel. Returns how many changed.
    pub fn unlock_all(&self) -> usize {
        self.set_all(false)
    }

    fn set_all(&self, locked: bool) -> usize {
        self.host
            .list_panels()
            .into_iter()
            .filter(|&panel| self.set(panel, locked))
            .count()
    }
}

/// Toggle the lock of the focused panel, or of the first panel when focus is
/// elsewhere. Returns the panel that was toggled and its new state.
pub fn toggle_focused_lock(locker: &PanelLocker<'_>) -> Option<(PanelId, bool)> {
    let panel = match locker.host.focused_surface() {
        FocusedSurface::Panel(panel) if locker.host.is_live(panel) => panel,
        _ => locker.host.list_panels().first().copied()?,
    };
    let locked = !locker.host.is_locked(panel);
    locker.set(panel, locked);
    Some((panel, locked))
}

/// If any panel is unlocked lock them all, otherwise unlock them all.
/// Returns the state every panel ended up in, or `None` with no panels.
pub fn toggle_all_locks(locker: &PanelLocker<'_>) -> Option<bool> {
    let panels = locker.host.list_panels();
    if panels.is_empty() {
        return None;
    }
    let any_unlocked = panels.iter().any(|&p| !locker.host.is_locked(p));
    if any_unlocked {
        locker.lock_all();
    } else {
        locker.unlock_all();
    }
    Some(any_unlocked)
}
