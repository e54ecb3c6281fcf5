//! Shared fakes for integration tests.
//!
//! `FakeHost` models a host where every unlocked panel mirrors the active
//! selection, which is what the fallback update path relies on.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;

use panel_rotation_core::clock::ManualClock;
use panel_rotation_core::deferred::DeferredQueue;
use panel_rotation_core::error::HostError;
use panel_rotation_core::host::{
    FocusedSurface, ListenerId, ObjectCatalog, ObjectDescriptor, ObjectId, ObjectKind, PanelHost,
    PanelId, SelectionListener, SelectionSource,
};
use panel_rotation_core::persistence::{MemoryStore, Persistence};
use panel_rotation_core::{Config, Notification, NotificationKind, Session, SessionServices};
use tracing_subscriber::fmt::MakeWriter;

// ---------------------------------------------------------------------------
// FakeHost
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectOutcome {
    Succeed,
    Decline,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    SetLocked(PanelId, bool),
    DirectUpdate(PanelId, ObjectId),
    Repaint(PanelId),
    Focus(PanelId),
    Close(PanelId),
}

pub struct FakeHost {
    panels: RefCell<Vec<PanelId>>,
    next_panel: Cell<u64>,
    locked: RefCell<BTreeMap<PanelId, bool>>,
    shown: RefCell<BTreeMap<PanelId, ObjectId>>,
    active: Cell<Option<ObjectId>>,
    pub direct_supported: Cell<bool>,
    pub direct_outcome: Cell<DirectOutcome>,
    pub focus_surface: Cell<FocusedSurface>,
    pub calls: RefCell<Vec<HostCall>>,
    /// Runs once, the next time the host is asked to focus a panel.
    pub on_focus: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl FakeHost {
    pub fn new(panels: u64, direct: bool) -> Rc<Self> {
        Rc::new(Self {
            panels: RefCell::new((1..=panels).map(PanelId).collect()),
            next_panel: Cell::new(panels + 1),
            locked: RefCell::new(BTreeMap::new()),
            shown: RefCell::new(BTreeMap::new()),
            active: Cell::new(None),
            direct_supported: Cell::new(direct),
            direct_outcome: Cell::new(DirectOutcome::Succeed),
            focus_surface: Cell::new(FocusedSurface::None),
            calls: RefCell::new(Vec::new()),
            on_focus: RefCell::new(None),
        })
    }

    /// Panel closed by the user, outside the engine.
    pub fn close_externally(&self, panel: PanelId) {
        self.panels.borrow_mut().retain(|&p| p != panel);
    }

    /// Lock flag flipped by the user, outside the engine.
    pub fn unlock_externally(&self, panel: PanelId) {
        self.locked.borrow_mut().insert(panel, false);
    }

    pub fn shown(&self, panel: u64) -> Option<u64> {
        self.shown.borrow().get(&PanelId(panel)).map(|o| o.0)
    }

    pub fn locked(&self, panel: u64) -> bool {
        self.is_locked(PanelId(panel))
    }

    pub fn direct_targets(&self) -> Vec<u64> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                HostCall::DirectUpdate(p, _) => Some(p.0),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn selection_changed(&self, object: Option<ObjectId>) {
        self.active.set(object);
        let Some(object) = object else {
            return;
        };
        for &panel in self.panels.borrow().iter() {
            if !self.is_locked(panel) {
                self.shown.borrow_mut().insert(panel, object);
            }
        }
    }
}

impl PanelHost for FakeHost {
    fn list_panels(&self) -> Vec<PanelId> {
        self.panels.borrow().clone()
    }

    fn is_locked(&self, panel: PanelId) -> bool {
        self.locked.borrow().get(&panel).copied().unwrap_or(false)
    }

    fn set_locked(&self, panel: PanelId, locked: bool) {
        self.calls.borrow_mut().push(HostCall::SetLocked(panel, locked));
        self.locked.borrow_mut().insert(panel, locked);
    }

    fn displayed_object(&self, panel: PanelId) -> Option<ObjectId> {
        self.shown.borrow().get(&panel).copied()
    }

    fn try_direct_update(&self, panel: PanelId, object: ObjectId) -> Result<bool, HostError> {
        self.calls
            .borrow_mut()
            .push(HostCall::DirectUpdate(panel, object));
        match self.direct_outcome.get() {
            DirectOutcome::Succeed => {
                self.shown.borrow_mut().insert(panel, object);
                Ok(true)
            }
            DirectOutcome::Decline => Ok(false),
            DirectOutcome::Fail => Err(HostError::Rejected("reflection failed".to_string())),
        }
    }

    fn direct_update_supported(&self) -> bool {
        self.direct_supported.get()
    }

    fn focused_surface(&self) -> FocusedSurface {
        self.focus_surface.get()
    }

    fn focus(&self, panel: PanelId) {
        self.calls.borrow_mut().push(HostCall::Focus(panel));
        let hook = self.on_focus.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn repaint(&self, panel: PanelId) {
        self.calls.borrow_mut().push(HostCall::Repaint(panel));
        if !self.is_locked(panel) {
            if let Some(object) = self.active.get() {
                self.shown.borrow_mut().insert(panel, object);
            }
        }
    }

    fn close(&self, panel: PanelId) {
        self.calls.borrow_mut().push(HostCall::Close(panel));
        self.close_externally(panel);
    }

    fn open_panel(&self) -> Option<PanelId> {
        let panel = PanelId(self.next_panel.get());
        self.next_panel.set(panel.0 + 1);
        self.panels.borrow_mut().push(panel);
        Some(panel)
    }
}

// ---------------------------------------------------------------------------
// FakeSelection
// ---------------------------------------------------------------------------

pub struct FakeSelection {
    host: Rc<FakeHost>,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn Fn(Option<ObjectId>)>)>>,
    next_id: Cell<ListenerId>,
}

impl FakeSelection {
    pub fn new(host: Rc<FakeHost>) -> Rc<Self> {
        Rc::new(Self {
            host,
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        })
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl SelectionSource for FakeSelection {
    fn active_object(&self) -> Option<ObjectId> {
        self.host.active.get()
    }

    fn set_active_object(&self, object: Option<ObjectId>) {
        self.host.selection_changed(object);
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(object);
        }
    }

    fn subscribe(&self, listener: SelectionListener) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::from(listener)));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(i, _)| *i != id);
    }
}

// ---------------------------------------------------------------------------
// FakeCatalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCatalog {
    objects: RefCell<BTreeMap<u64, ObjectDescriptor>>,
}

impl FakeCatalog {
    pub fn add_scene_object(&self, id: u64) {
        self.objects.borrow_mut().insert(
            id,
            ObjectDescriptor {
                name: format!("GameObject {id}"),
                type_name: "GameObject".to_string(),
                kind: ObjectKind::SceneObject,
                asset_path: None,
                asset_guid: None,
            },
        );
    }

    pub fn add_asset(&self, id: u64, path: &str, kind: ObjectKind) {
        self.objects.borrow_mut().insert(
            id,
            ObjectDescriptor {
                name: path.rsplit('/').next().unwrap_or(path).to_string(),
                type_name: format!("{kind:?}"),
                kind,
                asset_path: Some(path.to_string()),
                asset_guid: Some(format!("guid:{path}")),
            },
        );
    }

    pub fn remove(&self, id: u64) {
        self.objects.borrow_mut().remove(&id);
    }
}

impl ObjectCatalog for FakeCatalog {
    fn describe(&self, object: ObjectId) -> Option<ObjectDescriptor> {
        self.objects.borrow().get(&object.0).cloned()
    }

    fn resolve_asset(&self, guid: &str) -> Option<ObjectId> {
        self.objects
            .borrow()
            .iter()
            .find(|(_, d)| d.asset_guid.as_deref() == Some(guid))
            .map(|(&id, _)| ObjectId(id))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub host: Rc<FakeHost>,
    pub selection: Rc<FakeSelection>,
    pub catalog: Rc<FakeCatalog>,
    pub idle: Rc<DeferredQueue>,
    pub clock: Rc<ManualClock>,
    pub store: Rc<dyn Persistence>,
}

impl Harness {
    /// `panels` open panels; objects 1..=100 exist as scene objects.
    pub fn new(panels: u64, direct: bool) -> Self {
        Self::with_store(panels, direct, Rc::new(MemoryStore::new()))
    }

    pub fn with_store(panels: u64, direct: bool, store: Rc<dyn Persistence>) -> Self {
        let host = FakeHost::new(panels, direct);
        let selection = FakeSelection::new(Rc::clone(&host));
        let catalog = Rc::new(FakeCatalog::default());
        for id in 1..=100 {
            catalog.add_scene_object(id);
        }
        Self {
            host,
            selection,
            catalog,
            idle: Rc::new(DeferredQueue::new()),
            clock: Rc::new(ManualClock::new()),
            store,
        }
    }

    pub fn services(&self) -> SessionServices {
        SessionServices {
            host: self.host.clone(),
            selection: self.selection.clone(),
            catalog: self.catalog.clone(),
            idle: self.idle.clone(),
            clock: self.clock.clone(),
            store: Rc::clone(&self.store),
        }
    }

    pub fn start(&self, config: Config) -> Session {
        Session::start(self.services(), config)
    }

    pub fn select(&self, id: u64) {
        self.selection.set_active_object(Some(ObjectId(id)));
    }
}

pub fn ids(panels: &[PanelId]) -> Vec<u64> {
    panels.iter().map(|p| p.0).collect()
}

/// Record every notification published on the session bus, except lock churn.
pub fn record_notifications(session: &Session) -> Rc<RefCell<Vec<Notification>>> {
    record_matching(session, |kind| kind != NotificationKind::PanelLockChanged)
}

/// Record only what the rotation engine publishes: enable, pause and update
/// events. History and favorites traffic from the browser is left out.
pub fn record_engine_notifications(session: &Session) -> Rc<RefCell<Vec<Notification>>> {
    record_matching(session, |kind| {
        matches!(
            kind,
            NotificationKind::EngineEnabledChanged
                | NotificationKind::PauseChanged
                | NotificationKind::UpdateCompleted
        )
    })
}

fn record_matching(
    session: &Session,
    keep: impl Fn(NotificationKind) -> bool + 'static,
) -> Rc<RefCell<Vec<Notification>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session.bus().subscribe(
        None,
        Rc::new(move |n: &Notification| {
            if keep(n.kind()) {
                sink.borrow_mut().push(n.clone());
            }
        }),
    );
    seen
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8(self.buffer.lock().clone()).unwrap()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
