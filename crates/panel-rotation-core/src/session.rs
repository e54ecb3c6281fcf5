//! Session wiring: one scheduler, one selection browser and the bus they
//! publish on, built from a single [`Config`].
//!
//! A host creates a [`Session`] when its editor session starts and drops (or
//! disposes) it when the session ends. Nothing outlives the session except
//! what was written through the persistence store.

use std::path::Path;
use std::rc::Rc;

use tracing::info;

use crate::browser::SelectionBrowser;
use crate::clock::Clock;
use crate::config::Config;
use crate::deferred::IdleQueue;
use crate::error::Result;
use crate::host::{ObjectCatalog, PanelHost, PanelId, SelectionSource};
use crate::locks::{self, PanelLocker};
use crate::logging::{LogError, init_logging, is_logging_initialized};
use crate::notifications::NotificationBus;
use crate::persistence::Persistence;
use crate::scheduler::{RotationScheduler, SchedulerServices};
use crate::selection_filter::selection_predicate;

/// Everything a session needs from the host.
#[derive(Clone)]
pub struct SessionServices {
    pub host: Rc<dyn PanelHost>,
    pub selection: Rc<dyn SelectionSource>,
    pub catalog: Rc<dyn ObjectCatalog>,
    pub idle: Rc<dyn IdleQueue>,
    pub clock: Rc<dyn Clock>,
    pub store: Rc<dyn Persistence>,
}

pub struct Session {
    services: SessionServices,
    config: Config,
    bus: Rc<NotificationBus>,
    scheduler: RotationScheduler,
    browser: SelectionBrowser,
    disposed: bool,
}

impl Session {
    pub fn start(services: SessionServices, config: Config) -> Self {
        let bus = Rc::new(NotificationBus::new());
        let scheduler = RotationScheduler::new(
            SchedulerServices {
                host: Rc::clone(&services.host),
                selection: Rc::clone(&services.selection),
                idle: Rc::clone(&services.idle),
                clock: Rc::clone(&services.clock),
                store: Rc::clone(&services.store),
                bus: Rc::clone(&bus),
            },
            &config.rotation,
        );
        scheduler.set_selection_filter(Some(selection_predicate(
            Rc::clone(&services.catalog),
            config.filter.clone(),
        )));

        let browser = SelectionBrowser::new(
            Rc::clone(&services.selection),
            Rc::clone(&services.catalog),
            Rc::clone(&services.store),
            Rc::clone(&bus),
            &config.history,
        );
        if config.history.auto_clean_invalid {
            let removed = browser.cleanup_all();
            if removed > 0 {
                info!(removed, "stale history and favorites removed");
            }
        }

        info!(
            enabled = scheduler.is_enabled(),
            mode = %config.rotation.mode,
            "rotation session started"
        );
        Self {
            services,
            config,
            bus,
            scheduler,
            browser,
            disposed: false,
        }
    }

    /// Load the config file at `config_path` (defaults when missing), install
    /// the global log subscriber unless one is already set, and start.
    pub fn bootstrap(services: SessionServices, config_path: &Path) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        if !is_logging_initialized() {
            match init_logging(&config.logging) {
                // Another subscriber already owns the global slot.
                Ok(()) | Err(LogError::AlreadyInitialized | LogError::SetSubscriber(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(Self::start(services, config))
    }

    #[must_use]
    pub fn scheduler(&self) -> &RotationScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn browser(&self) -> &SelectionBrowser {
        &self.browser
    }

    #[must_use]
    pub fn bus(&self) -> &Rc<NotificationBus> {
        &self.bus
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Forward the host's periodic tick.
    pub fn tick(&self) {
        self.scheduler.tick();
    }

    /// Open a new panel through the host and put it under rotation.
    pub fn open_managed_panel(&self) -> Option<PanelId> {
        let panel = self.services.host.open_panel()?;
        self.scheduler.add_managed_panel(panel);
        Some(panel)
    }

    /// Toggle the focused panel's lock (or the first panel's).
    pub fn toggle_focused_lock(&self) -> Option<(PanelId, bool)> {
        locks::toggle_focused_lock(&self.locker())
    }

    /// Lock everything if anything is unlocked, otherwise unlock everything.
    pub fn toggle_all_locks(&self) -> Option<bool> {
        locks::toggle_all_locks(&self.locker())
    }

    /// Re-apply mode, focus behavior, block rules and history settings.
    pub fn apply_config(&mut self, config: Config) {
        self.scheduler.set_mode(config.rotation.mode);
        self.scheduler
            .set_auto_focus(config.rotation.auto_focus_on_update);
        self.scheduler
            .set_selection_filter(Some(selection_predicate(
                Rc::clone(&self.services.catalog),
                config.filter.clone(),
            )));
        self.browser.apply_config(&config.history);
        self.config = config;
    }

    /// Tear down in dependency order. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.scheduler.dispose();
        self.browser.dispose();
        let dropped = self.bus.clear();
        info!(subscribers = dropped, "rotation session disposed");
    }

    fn locker(&self) -> PanelLocker<'_> {
        PanelLocker::new(self.services.host.as_ref(), &self.bus)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("scheduler", &self.scheduler)
            .field("browser", &self.browser)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}
