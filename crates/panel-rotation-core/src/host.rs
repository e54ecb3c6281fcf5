//! Host capability seams.
//!
//! The engine never talks to a concrete panel toolkit. Everything it needs from
//! the host is expressed as one of the traits in this module:
//!
//! - [`PanelHost`]: enumerate panels, toggle their lock flag, push an object
//!   into a panel, focus and repaint it
//! - [`SelectionSource`]: read and set the active selection, listen for changes
//! - [`ObjectCatalog`]: describe selectable objects and resolve persisted
//!   references back to live ones
//!
//! All three are single-threaded; callbacks into the engine happen on the
//! host's main thread.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HostError;

// =============================================================================
// Identifiers
// =============================================================================

/// Identity of one live inspection panel.
///
/// An id is bound to a single panel handle and is never reused by the host
/// once that panel closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelId(pub u64);

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Session-scoped identity of a selectable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj:{}", self.0)
    }
}

/// Handle returned by [`SelectionSource::subscribe`].
pub type ListenerId = u64;

/// Selection-changed callback. Receives the new active object, if any.
pub type SelectionListener = Box<dyn Fn(Option<ObjectId>)>;

// =============================================================================
// Panel host
// =============================================================================

/// Where the host's keyboard focus currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "panel")]
pub enum FocusedSurface {
    /// Nothing has focus.
    None,
    /// One of the inspection panels.
    Panel(PanelId),
    /// A browsing surface (object tree, asset browser). Rotation never steals
    /// focus from these.
    Browser,
    /// Any other host surface.
    Other,
}

/// Capabilities the host exposes over its inspection panels.
pub trait PanelHost {
    /// Live panels in the host's enumeration order.
    fn list_panels(&self) -> Vec<PanelId>;

    /// Whether `panel` still refers to a live panel.
    fn is_live(&self, panel: PanelId) -> bool {
        self.list_panels().contains(&panel)
    }

    fn is_locked(&self, panel: PanelId) -> bool;

    fn set_locked(&self, panel: PanelId, locked: bool);

    /// Object the panel currently shows, if any.
    fn displayed_object(&self, panel: PanelId) -> Option<ObjectId>;

    /// Push `object` into a locked panel without unlocking it.
    ///
    /// `Ok(false)` means the host declined; `Err` means the call itself
    /// failed. Both are treated as "use the fallback path".
    fn try_direct_update(&self, panel: PanelId, object: ObjectId) -> Result<bool, HostError>;

    /// Whether [`PanelHost::try_direct_update`] is usable at all on this host.
    fn direct_update_supported(&self) -> bool;

    /// Whether `object` still refers to something that can be displayed.
    fn is_object_valid(&self, _object: ObjectId) -> bool {
        true
    }

    fn focused_surface(&self) -> FocusedSurface;

    fn focus(&self, panel: PanelId);

    fn repaint(&self, panel: PanelId);

    fn close(&self, panel: PanelId);

    /// Open a new panel and return its id.
    fn open_panel(&self) -> Option<PanelId>;
}

// =============================================================================
// Selection source
// =============================================================================

/// The host's global "active selection".
pub trait SelectionSource {
    fn active_object(&self) -> Option<ObjectId>;

    /// Change the active selection. Listeners fire synchronously.
    fn set_active_object(&self, object: Option<ObjectId>);

    fn subscribe(&self, listener: SelectionListener) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId);
}

// =============================================================================
// Object catalog
// =============================================================================

/// Coarse category of a selectable object, as far as block rules care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Folder,
    /// Asset with no dedicated importer (plugins, unknown files).
    DefaultAsset,
    AssemblyDefinition,
    TextAsset,
    LightingSettings,
    Shader,
    ComputeShader,
    Font,
    /// Object living in an open scene rather than on disk.
    SceneObject,
    Other,
}

/// What the host knows about one selectable object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub name: String,
    pub type_name: String,
    pub kind: ObjectKind,
    /// Project-relative path; `None` for scene objects.
    pub asset_path: Option<String>,
    /// Stable identifier that survives restarts; `None` for scene objects.
    pub asset_guid: Option<String>,
}

impl ObjectDescriptor {
    /// Whether the object is backed by an asset on disk.
    #[must_use]
    pub fn is_asset(&self) -> bool {
        self.asset_path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Lookup service for selectable objects.
pub trait ObjectCatalog {
    /// Describe a live object. `None` means the object was destroyed.
    fn describe(&self, object: ObjectId) -> Option<ObjectDescriptor>;

    /// Resolve a persisted asset guid to the object currently loaded for it.
    fn resolve_asset(&self, guid: &str) -> Option<ObjectId>;
}
