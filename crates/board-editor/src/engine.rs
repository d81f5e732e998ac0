//! Event dispatcher: the single ingress for host input.
//!
//! ```text
//!  host event (screen space)
//!      │ camera
//!      ▼
//!  ┌─ tool gesture in progress? ──▶ Tool ──Commit──▶ SceneStore
//!  ├─ select gesture in progress? ─▶ SelectionManager ─▶ SceneStore
//!  └─ pointer-down: tool activation │ handle │ element │ marquee
//!
//!  SceneStore journal ──▶ History (batched per gesture)
//! ```
//!
//! Elements are plain data; every behaviour lives here or in the managers
//! the engine owns.

use crate::camera::Camera;
use crate::clipboard::ClipboardPayload;
use crate::config::EngineConfig;
use crate::error::EditorError;
use crate::grouping::{self, ZOrder};
use crate::history::History;
use crate::input::{InputEvent, Modifiers};
use crate::persistence::PersistenceBackend;
use crate::selection::{GestureEnd, SelectionManager};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::snap::SnapEngine;
use crate::tools::{Tool, ToolContext, ToolKind, ToolOutcome, tool_for};
use crate::worker::{SimplifyJob, SimplifyResult, SimplifyWorker};
use board_core::document::{DocumentMetadata, SceneDocument};
use board_core::geometry::{Bounds, Point, Size};
use board_core::id::ElementId;
use board_core::model::{Element, ElementKind, ElementPatch, ImageHandle};
use board_core::store::{ConnectorPolicy, SceneState, SceneStore, Transition};
use board_render::bridge::{BridgeConfig, RenderBridge};
use board_render::draw::{DrawList, Overlay};
use board_render::hit::hit_test;
use board_render::pool::RenderHost;
use std::sync::mpsc::Receiver;

/// Screen pixels of slack when hit-testing element bodies.
const HIT_TOLERANCE: f64 = 4.0;

/// Zoom factor per wheel notch or zoom shortcut.
const ZOOM_STEP: f64 = 1.25;

/// What a dispatch did, for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The scene, the view or a transient overlay changed; repaint.
    pub changed: bool,
    pub tool: ToolKind,
    pub tool_switched: bool,
}

pub struct Engine {
    config: EngineConfig,
    store: SceneStore,
    history: History,
    camera: Camera,
    /// Host surface size in screen pixels.
    viewport: Size,
    snap: SnapEngine,
    tool_kind: ToolKind,
    last_tool: ToolKind,
    tool: Option<Box<dyn Tool>>,
    selection: SelectionManager,
    worker: SimplifyWorker,
    clipboard: Option<ClipboardPayload>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: SceneStore::new(config.connector_policy),
            history: History::new(config.history_depth),
            camera: Camera::default(),
            viewport: Size::new(config.stage.width, config.stage.height),
            snap: SnapEngine::new(&config),
            tool_kind: ToolKind::Select,
            last_tool: ToolKind::Select,
            tool: None,
            selection: SelectionManager::new(),
            worker: SimplifyWorker::spawn(),
            clipboard: None,
            config,
        }
    }

    // ── Queries ──

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn state(&self) -> &SceneState {
        self.store.state()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn tool(&self) -> ToolKind {
        self.tool_kind
    }

    /// Whether a tool or select gesture is between pointer-down and -up.
    pub fn is_gesture_active(&self) -> bool {
        self.selection.is_active() || self.tool.as_ref().is_some_and(|t| t.is_active())
    }

    /// World region currently on screen.
    pub fn visible_world(&self) -> Bounds {
        self.camera.visible_world(self.viewport)
    }

    pub fn subscribe(&mut self) -> Receiver<Transition> {
        self.store.subscribe()
    }

    pub fn set_connector_policy(&mut self, policy: ConnectorPolicy) {
        self.store.set_policy(policy);
    }

    // ── Dispatch ──

    pub fn dispatch(&mut self, event: InputEvent) -> DispatchOutcome {
        let revision = self.store.revision();
        let tool_before = self.tool_kind;
        log::trace!("dispatch {event:?}");

        let view_changed = match event {
            InputEvent::PointerDown { .. } | InputEvent::PointerMove { .. } | InputEvent::PointerUp { .. } => {
                self.pointer(event)
            }
            InputEvent::Wheel {
                x,
                y,
                dx,
                dy,
                modifiers,
            } => self.wheel(Point::new(x, y), dx, dy, modifiers),
            InputEvent::Key { key, modifiers } => match ShortcutMap::resolve(&key, modifiers) {
                Some(action) => self.run(action),
                None => false,
            },
            InputEvent::ViewportResized { width, height } => {
                self.viewport = Size::new(width, height);
                true
            }
        };

        self.absorb_journal();
        self.poll_worker();
        DispatchOutcome {
            changed: view_changed || self.store.revision() != revision,
            tool: self.tool_kind,
            tool_switched: self.tool_kind != tool_before,
        }
    }

    fn pointer(&mut self, event: InputEvent) -> bool {
        let Some((sx, sy)) = event.position() else {
            return false;
        };
        let p = self.camera.screen_to_world(Point::new(sx, sy));
        let mods = event.modifiers();
        let world = event.with_position(p.x, p.y);
        let is_down = matches!(world, InputEvent::PointerDown { .. });

        // A drawing tool owns the pointer from activation to release.
        if self.tool.as_ref().is_some_and(|t| is_down || t.is_active()) {
            return self.route_tool(&world);
        }
        if self.selection.is_active() {
            self.route_selection(&world, p, mods);
            return true;
        }
        if is_down {
            self.begin_select_gesture(p, mods);
            return true;
        }
        false
    }

    fn route_tool(&mut self, event: &InputEvent) -> bool {
        let Some(tool) = self.tool.as_mut() else {
            return false;
        };
        let cx = ToolContext {
            state: self.store.state(),
            snap: &self.snap,
            config: &self.config,
            zoom: self.camera.zoom,
        };
        let outcome = tool.handle(event, &cx);
        log::trace!("tool {:?}: {:?}", tool.kind(), std::mem::discriminant(&outcome));
        match outcome {
            ToolOutcome::Idle => false,
            ToolOutcome::Preview | ToolOutcome::Cancelled => true,
            ToolOutcome::Commit(el) => {
                self.commit(el);
                true
            }
        }
    }

    fn begin_select_gesture(&mut self, p: Point, mods: Modifiers) {
        let zoom = self.camera.zoom;
        if let Some(handle) = SelectionManager::handle_at(self.store.state(), p, zoom, &self.config) {
            self.selection.begin_handle(&self.store, handle, p);
            let label = self.selection.gesture_label().unwrap_or("edit");
            self.history.begin_batch(label, &self.store);
            return;
        }

        let Some(id) = hit_test(self.store.state(), p, HIT_TOLERANCE / zoom) else {
            self.selection.begin_marquee(self.store.state(), p, mods.shift);
            return;
        };
        let mut selected = self.store.selection().to_vec();
        if mods.shift {
            match selected.iter().position(|s| *s == id) {
                Some(pos) => {
                    selected.remove(pos);
                }
                None => selected.push(id),
            }
        } else if !selected.contains(&id) {
            selected = vec![id];
        }
        if let Err(err) = self.store.set_selection(&selected) {
            log::warn!("selection rejected: {err}");
            return;
        }
        if self.store.state().is_selected(id) {
            self.selection.begin_move(&self.store, p);
            self.history.begin_batch("move", &self.store);
        }
    }

    fn route_selection(&mut self, event: &InputEvent, p: Point, mods: Modifiers) {
        match event {
            InputEvent::PointerMove { .. } => {
                if let Err(err) = self.selection.drag(&mut self.store, p, mods, &self.snap, &self.config) {
                    self.abort_gesture(&err.into());
                }
            }
            InputEvent::PointerUp { .. } => {
                let finished = self
                    .selection
                    .finish(&mut self.store, p, mods, &self.snap, &self.config)
                    .map_err(EditorError::from)
                    .and_then(|end| match end {
                        Some(GestureEnd::Moved(ids)) => {
                            grouping::reparent_after_drag(&mut self.store, &ids)?;
                            Ok(())
                        }
                        _ => Ok(()),
                    });
                match finished {
                    Ok(()) => self.close_gesture_batch(),
                    Err(err) => self.abort_gesture(&err),
                }
            }
            _ => {}
        }
    }

    fn close_gesture_batch(&mut self) {
        if self.history.in_batch() {
            self.absorb_journal();
            self.history.end_batch(&self.store);
        }
    }

    fn abort_gesture(&mut self, err: &EditorError) {
        log::warn!("gesture aborted: {err}");
        self.selection.cancel();
        self.absorb_journal();
        self.history.abort_batch(&mut self.store);
    }

    fn wheel(&mut self, at: Point, dx: f64, dy: f64, mods: Modifiers) -> bool {
        if mods.command() {
            if dy == 0.0 {
                return false;
            }
            let factor = if dy < 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
            self.camera.zoom_about(at, factor);
        } else {
            self.camera.pan_by(-dx, -dy);
        }
        self.sync_zoom();
        true
    }

    fn zoom_view(&mut self, factor: Option<f64>) {
        let center = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
        match factor {
            Some(f) => self.camera.zoom_about(center, f),
            None => self.camera.zoom_to(center, 1.0),
        }
        self.sync_zoom();
    }

    /// Snap distance is configured in screen pixels.
    fn sync_zoom(&mut self) {
        self.snap.threshold = self.config.snap_threshold / self.camera.zoom;
    }

    // ── Actions ──

    /// Run a shortcut action. Returns whether anything changed.
    pub fn run(&mut self, action: ShortcutAction) -> bool {
        // Only Escape may interrupt a gesture.
        if self.is_gesture_active() && action != ShortcutAction::Escape {
            return false;
        }
        log::debug!("action {action:?}");
        match action {
            ShortcutAction::Tool(kind) => {
                let changed = kind != self.tool_kind;
                self.set_tool(kind);
                changed
            }
            ShortcutAction::ToggleLastTool => {
                self.set_tool(self.last_tool);
                true
            }
            ShortcutAction::Undo => self.undo().is_some(),
            ShortcutAction::Redo => self.redo().is_some(),
            ShortcutAction::Delete => self.delete_selection().is_ok(),
            ShortcutAction::SelectAll => self.select_all().is_ok(),
            ShortcutAction::Duplicate => self.duplicate_selection().is_ok(),
            ShortcutAction::Copy => {
                if let Err(err) = self.copy_selection() {
                    log::warn!("copy failed: {err}");
                }
                false
            }
            ShortcutAction::Cut => self.cut_selection().is_ok(),
            ShortcutAction::Paste => self.paste().is_ok(),
            ShortcutAction::ZoomIn => {
                self.zoom_view(Some(ZOOM_STEP));
                true
            }
            ShortcutAction::ZoomOut => {
                self.zoom_view(Some(1.0 / ZOOM_STEP));
                true
            }
            ShortcutAction::ZoomReset => {
                self.zoom_view(None);
                true
            }
            ShortcutAction::BringForward => self.z_order(ZOrder::BringForward).is_ok(),
            ShortcutAction::SendBackward => self.z_order(ZOrder::SendBackward).is_ok(),
            ShortcutAction::BringToFront => self.z_order(ZOrder::BringToFront).is_ok(),
            ShortcutAction::SendToBack => self.z_order(ZOrder::SendToBack).is_ok(),
            ShortcutAction::Escape => self.cancel(),
        }
    }

    pub fn set_tool(&mut self, kind: ToolKind) {
        if kind == self.tool_kind {
            return;
        }
        if let Some(tool) = self.tool.as_mut() {
            tool.cancel();
        }
        if self.selection.is_active() {
            self.selection.cancel();
            self.absorb_journal();
            self.history.abort_batch(&mut self.store);
        }
        self.last_tool = self.tool_kind;
        self.tool_kind = kind;
        self.tool = tool_for(kind);
        log::debug!("tool {:?} -> {:?}", self.last_tool, kind);
    }

    /// Escape: cancel the gesture, else leave the drawing tool, else clear
    /// the selection. Returns whether anything changed.
    pub fn cancel(&mut self) -> bool {
        if let Some(tool) = self.tool.as_mut()
            && tool.is_active()
        {
            tool.cancel();
            return true;
        }
        if self.selection.is_active() {
            self.selection.cancel();
            self.absorb_journal();
            self.history.abort_batch(&mut self.store);
            return true;
        }
        if self.tool_kind != ToolKind::Select {
            self.set_tool(ToolKind::Select);
            return true;
        }
        if !self.store.selection().is_empty() {
            return self.select(&[]).is_ok();
        }
        false
    }

    pub fn undo(&mut self) -> Option<String> {
        if self.is_gesture_active() {
            return None;
        }
        self.absorb_journal();
        let label = self.history.undo(&mut self.store)?;
        log::debug!("undo {label:?}");
        Some(label)
    }

    pub fn redo(&mut self) -> Option<String> {
        if self.is_gesture_active() {
            return None;
        }
        self.absorb_journal();
        let label = self.history.redo(&mut self.store)?;
        log::debug!("redo {label:?}");
        Some(label)
    }

    /// Run `f` as one history entry. On error the store is rolled back to
    /// where the batch began.
    fn batch<T>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> Result<T, EditorError>) -> Result<T, EditorError> {
        self.absorb_journal();
        self.history.begin_batch(label, &self.store);
        let out = f(self);
        self.absorb_journal();
        match out {
            Ok(v) => {
                self.history.end_batch(&self.store);
                Ok(v)
            }
            Err(err) => {
                self.history.abort_batch(&mut self.store);
                log::warn!("{label} failed: {err}");
                Err(err)
            }
        }
    }

    fn absorb_journal(&mut self) {
        for t in self.store.drain_journal() {
            self.history.record(t);
        }
    }

    fn commit(&mut self, mut el: Element) {
        if el.container_id.is_none() && !el.is_connector() {
            el.container_id = grouping::section_at(self.store.state(), el.bounds(), &[]);
        }
        let label = format!("add {}", el.tag().name().replace('_', " "));
        let long_stroke = matches!(&el.kind, ElementKind::PenStroke(s) if s.points.len() > self.config.pen_worker_threshold);
        let is_section = el.is_section();
        let committed = self.batch(&label, |eng| {
            let id = eng.store.add_element(el)?;
            if is_section {
                grouping::adopt_contained(&mut eng.store, id)?;
            }
            eng.store.set_selection(&[id])?;
            Ok(id)
        });
        if let Ok(id) = committed {
            log::debug!("committed {id}");
            if long_stroke {
                self.submit_simplify(id);
            }
        }
        self.set_tool(ToolKind::Select);
    }

    /// Add an element programmatically as one undoable step.
    pub fn add_element(&mut self, el: Element) -> Result<ElementId, EditorError> {
        let label = format!("add {}", el.tag().name().replace('_', " "));
        self.batch(&label, |eng| Ok(eng.store.add_element(el)?))
    }

    pub fn update_element(&mut self, id: ElementId, patch: ElementPatch) -> Result<Element, EditorError> {
        self.batch("update", |eng| Ok(eng.store.update_element(id, patch)?))
    }

    pub fn select(&mut self, ids: &[ElementId]) -> Result<(), EditorError> {
        self.store.set_selection(ids)?;
        self.absorb_journal();
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<(), EditorError> {
        let ids: Vec<ElementId> = self
            .store
            .elements_in_paint_order()
            .into_iter()
            .map(|el| el.id)
            .collect();
        self.select(&ids)
    }

    pub fn delete_selection(&mut self) -> Result<(), EditorError> {
        let ids = self.store.selection().to_vec();
        if ids.is_empty() {
            return Ok(());
        }
        self.batch("delete", |eng| Ok(eng.store.remove_elements(&ids)?))
    }

    pub fn z_order(&mut self, order: ZOrder) -> Result<(), EditorError> {
        let ids = self.store.selection().to_vec();
        if ids.is_empty() {
            return Ok(());
        }
        let label = match order {
            ZOrder::BringForward => "bring forward",
            ZOrder::SendBackward => "send backward",
            ZOrder::BringToFront => "bring to front",
            ZOrder::SendToBack => "send to back",
        };
        self.batch(label, |eng| Ok(grouping::apply_z_order(&mut eng.store, &ids, order)?))
    }

    // ── Clipboard ──

    /// Copy the selection. Returns the clipboard text for the host, or
    /// `None` when nothing is selected.
    pub fn copy_selection(&mut self) -> Result<Option<String>, EditorError> {
        let payload = ClipboardPayload::copy(self.store.state(), self.store.selection());
        if payload.is_empty() {
            return Ok(None);
        }
        let text = payload.to_text()?;
        self.clipboard = Some(payload);
        Ok(Some(text))
    }

    pub fn cut_selection(&mut self) -> Result<Option<String>, EditorError> {
        let text = self.copy_selection()?;
        if text.is_some() {
            self.delete_selection()?;
        }
        Ok(text)
    }

    /// Paste the last copied elements.
    pub fn paste(&mut self) -> Result<Vec<ElementId>, EditorError> {
        match self.clipboard.clone() {
            Some(payload) => self.paste_payload(&payload, "paste"),
            None => Ok(Vec::new()),
        }
    }

    /// Paste clipboard text produced by [`Engine::copy_selection`].
    pub fn paste_text(&mut self, text: &str) -> Result<Vec<ElementId>, EditorError> {
        let payload = ClipboardPayload::from_text(text)?;
        self.paste_payload(&payload, "paste")
    }

    pub fn duplicate_selection(&mut self) -> Result<Vec<ElementId>, EditorError> {
        let payload = ClipboardPayload::copy(self.store.state(), self.store.selection());
        if payload.is_empty() {
            return Ok(Vec::new());
        }
        self.paste_payload(&payload, "duplicate")
    }

    fn paste_payload(&mut self, payload: &ClipboardPayload, label: &str) -> Result<Vec<ElementId>, EditorError> {
        let offset = self.config.paste_offset;
        self.batch(label, |eng| {
            let roots = payload.paste(&mut eng.store, (offset, offset))?;
            eng.store.set_selection(&roots)?;
            Ok(roots)
        })
    }

    /// Place a host bitmap centred on a screen position. Dropping onto a
    /// section makes the image a member of it.
    pub fn drop_image(&mut self, handle: ImageHandle, x: f64, y: f64) -> Result<ElementId, EditorError> {
        let at = self.camera.screen_to_world(Point::new(x, y));
        let (w, h) = (f64::from(handle.width), f64::from(handle.height));
        let bounds = Bounds::new(at.x - w / 2.0, at.y - h / 2.0, w, h);
        let container = grouping::section_at(self.store.state(), bounds, &[]);
        let el = Element::in_bounds(
            ElementKind::Image {
                handle,
                backdrop: false,
            },
            bounds,
        )
        .with_container(container);
        self.batch("add image", |eng| {
            let id = eng.store.add_element(el)?;
            eng.store.set_selection(&[id])?;
            Ok(id)
        })
    }

    // ── Persistence ──

    /// Hand the current scene to `backend`. A failure is returned but the
    /// scene stays as it is.
    pub fn save(&mut self, backend: &mut dyn PersistenceBackend, metadata: DocumentMetadata) -> Result<(), EditorError> {
        let doc = SceneDocument::from_state(self.store.state(), metadata);
        match backend.save(&doc) {
            Ok(()) => {
                log::debug!("saved revision {}", self.store.revision());
                Ok(())
            }
            Err(err) => {
                log::warn!("save failed: {err}");
                Err(err.into())
            }
        }
    }

    /// Replace the scene from `backend`. History is cleared.
    pub fn load(&mut self, backend: &mut dyn PersistenceBackend) -> Result<(), EditorError> {
        let doc = backend.load()?;
        if let Some(tool) = self.tool.as_mut() {
            tool.cancel();
        }
        self.selection.cancel();
        self.absorb_journal();
        self.history.abort_batch(&mut self.store);
        self.store.load(doc.elements)?;
        self.history.clear();
        Ok(())
    }

    // ── Background simplification ──

    fn submit_simplify(&mut self, id: ElementId) {
        let Some(el) = self.store.get(id) else {
            return;
        };
        let job = SimplifyJob {
            id,
            original: el.stroke_world_points(),
            tolerance: self.config.pen_tolerance,
        };
        log::debug!("stroke {id}: {} points sent to worker", job.original.len());
        if let Some(result) = self.worker.submit(job) {
            self.apply_simplified(vec![result]);
        }
    }

    /// Apply any simplification results that have arrived.
    pub fn poll_worker(&mut self) -> usize {
        let results = self.worker.try_results();
        if results.is_empty() {
            return 0;
        }
        self.apply_simplified(results)
    }

    /// Block until the worker is idle and apply everything it returned.
    pub fn flush_worker(&mut self) -> usize {
        let results = self.worker.wait_all();
        self.apply_simplified(results)
    }

    fn apply_simplified(&mut self, results: Vec<SimplifyResult>) -> usize {
        self.absorb_journal();
        let mut applied = 0;
        for r in results {
            let Some(el) = self.store.get(r.id) else {
                log::debug!("discarding simplified stroke for deleted {}", r.id);
                continue;
            };
            if el.stroke_world_points() != r.original {
                log::debug!("discarding simplified stroke for edited {}", r.id);
                continue;
            }
            let mut next = el.clone();
            if !next.set_stroke_points(&r.simplified) {
                continue;
            }
            let patch = ElementPatch::new()
                .kind(next.kind.clone())
                .transform(*next.transform())
                .size(next.size());
            match self.store.update_element(r.id, patch) {
                Ok(_) => applied += 1,
                Err(err) => log::warn!("simplified stroke rejected: {err}"),
            }
        }
        // Simplification is not an undoable step.
        self.store.drain_journal();
        applied
    }

    // ── Rendering ──

    /// Transient overlay items for the current frame.
    pub fn overlays(&self) -> Vec<Overlay> {
        let mut out = Vec::new();
        if self.tool_kind == ToolKind::Select
            && let Some((bounds, handles, rotate_handle)) =
                SelectionManager::handles(self.store.state(), self.camera.zoom, &self.config)
        {
            out.push(Overlay::Selection {
                bounds,
                handles,
                rotate_handle,
            });
        }
        if let Some(rect) = self.selection.marquee() {
            out.push(Overlay::Marquee(rect));
        }
        let guides = match &self.tool {
            Some(tool) if tool.is_active() => tool.guides(),
            _ => self.selection.guides(),
        };
        out.extend(guides.iter().map(|g| Overlay::Guide {
            axis: g.axis,
            position: g.position,
            from: g.from,
            to: g.to,
        }));
        if let Some(preview) = self.tool.as_ref().and_then(|t| t.preview()) {
            out.push(Overlay::Preview(preview.clone()));
        }
        out
    }

    /// A render bridge subscribed to this engine's store.
    pub fn render_bridge<H: RenderHost>(&mut self, host: H) -> RenderBridge<H> {
        let updates = self.store.subscribe();
        RenderBridge::new(
            host,
            updates,
            self.visible_world(),
            BridgeConfig {
                margin: self.config.viewport_margin,
                pool_cap: self.config.pool_cap,
            },
        )
    }

    /// Build and present one frame through `bridge`.
    pub fn render<'b, H: RenderHost>(&self, bridge: &'b mut RenderBridge<H>) -> &'b DrawList {
        bridge.set_viewport(self.visible_world());
        bridge.frame(self.store.state(), self.store.revision(), self.overlays())
    }
}
