//! panel-rotation-core: rotation engine for host inspection panels
//!
//! A host application shows the current selection in one or more inspection
//! panels. Left alone, every unlocked panel mirrors the same selection. This
//! crate keeps the panels locked and hands each new selection to one of them,
//! so several recent selections stay visible side by side.
//!
//! # Architecture
//!
//! ```text
//! SelectionSource ──► RotationScheduler ──► PanelHost (lock / update / focus)
//!        │                  │   ▲
//!        │                  │   └── IdleQueue (fallback continuation), Clock
//!        ▼                  ▼
//! SelectionBrowser    NotificationBus ──► observers
//!   (history, favorites)
//! ```
//!
//! # Modules
//!
//! - `scheduler`: the rotation state machine (Cycle and History policies)
//! - `queue`: ordered, duplicate-free rotation queue
//! - `exclusion`: panels pinned out of rotation
//! - `locks`: lock bookkeeping and manual lock shortcuts
//! - `selection_filter`: block rules for selections not worth a panel
//! - `selection_history`, `favorites`, `browser`: navigable selection history
//! - `notifications`: typed publish/subscribe bus
//! - `host`, `deferred`, `clock`: host capability seams
//! - `persistence`: key-value state that survives restarts
//! - `config`, `logging`, `error`: ambient plumbing
//! - `session`: wires everything together from one `Config`
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod browser;
pub mod clock;
pub mod config;
pub mod deferred;
pub mod error;
pub mod exclusion;
pub mod favorites;
pub mod host;
pub mod locks;
pub mod logging;
pub mod notifications;
pub mod persistence;
pub mod queue;
pub mod scheduler;
pub mod selection_filter;
pub mod selection_history;
pub mod session;

pub use config::{Config, RotationMode};
pub use error::{Error, Result};
pub use host::{FocusedSurface, ObjectCatalog, ObjectId, PanelHost, PanelId, SelectionSource};
pub use notifications::{Notification, NotificationBus, NotificationKind};
pub use scheduler::{RotationScheduler, SchedulerServices, UPDATE_TIMEOUT};
pub use session::{Session, SessionServices};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
