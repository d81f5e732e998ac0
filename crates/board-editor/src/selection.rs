//! Selection & transform manager.
//!
//! Owns the select-mode gestures: move, resize via eight handles, rotate
//! via the handle above the box, and marquee. Every pointer-move re-derives
//! the new geometry from the snapshot taken at gesture start, so rounding
//! never accumulates and a cancelled gesture can be rolled back to exactly
//! where it began.
//!
//! ```text
//!   TL ── T ── TR        ○ Rotate (rotate_offset above T)
//!   │           │
//!   L           R
//!   │           │
//!   BL ── B ── BR
//! ```

use crate::config::EngineConfig;
use crate::input::Modifiers;
use crate::snap::{GuideLine, SnapEngine};
use board_core::error::SceneError;
use board_core::geometry::{Bounds, Point, Size, Transform};
use board_core::id::ElementId;
use board_core::model::{Element, ElementKind, ElementPatch, Endpoint};
use board_core::store::{SceneState, SceneStore};
use board_render::hit::hit_test_rect;
use std::sync::Arc;

/// Rotation step while Shift is held.
const ROTATE_STEP: f64 = 15.0;

/// Marquee extent below which the gesture is a plain click.
const CLICK_EXTENT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    Rotate,
}

impl Handle {
    pub const RESIZE: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    /// Which edges the handle drags: -1 = min edge, 1 = max edge, 0 = none.
    fn sides(self) -> (i8, i8) {
        match self {
            Handle::TopLeft => (-1, -1),
            Handle::Top => (0, -1),
            Handle::TopRight => (1, -1),
            Handle::Right => (1, 0),
            Handle::BottomRight => (1, 1),
            Handle::Bottom => (0, 1),
            Handle::BottomLeft => (-1, 1),
            Handle::Left => (-1, 0),
            Handle::Rotate => (0, 0),
        }
    }

    /// Position of this handle on `bounds`.
    pub fn point_on(self, bounds: &Bounds, rotate_offset: f64) -> Point {
        let c = bounds.center();
        if self == Handle::Rotate {
            return Point::new(c.x, bounds.min_y() - rotate_offset);
        }
        let (sx, sy) = self.sides();
        let x = match sx {
            -1 => bounds.min_x(),
            1 => bounds.max_x(),
            _ => c.x,
        };
        let y = match sy {
            -1 => bounds.min_y(),
            1 => bounds.max_y(),
            _ => c.y,
        };
        Point::new(x, y)
    }
}

/// How a finished gesture ended, for follow-up work by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEnd {
    /// Elements were dragged; membership should be re-evaluated.
    Moved(Vec<ElementId>),
    Resized,
    Rotated,
    Selected,
}

#[derive(Debug, Clone)]
enum Gesture {
    Moving {
        origin: Point,
        snapshot: Arc<SceneState>,
        moved: Vec<ElementId>,
        start: Bounds,
    },
    Resizing {
        handle: Handle,
        origin: Point,
        snapshot: Arc<SceneState>,
        ids: Vec<ElementId>,
        start: Bounds,
    },
    Rotating {
        snapshot: Arc<SceneState>,
        ids: Vec<ElementId>,
        center: Point,
        start_angle: f64,
    },
    Marquee {
        origin: Point,
        current: Point,
        additive: bool,
        base: Vec<ElementId>,
    },
}

#[derive(Debug, Default)]
pub struct SelectionManager {
    gesture: Option<Gesture>,
    guides: Vec<GuideLine>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// History label for the running gesture.
    pub fn gesture_label(&self) -> Option<&'static str> {
        match self.gesture.as_ref()? {
            Gesture::Moving { .. } => Some("move"),
            Gesture::Resizing { .. } => Some("resize"),
            Gesture::Rotating { .. } => Some("rotate"),
            Gesture::Marquee { .. } => Some("select"),
        }
    }

    /// Combined bounding box of the selection.
    pub fn selection_bounds(state: &SceneState) -> Option<Bounds> {
        state.bounds_of(state.selection())
    }

    /// Handle under `p`, if any. Slop and offset are screen pixels.
    pub fn handle_at(state: &SceneState, p: Point, zoom: f64, config: &EngineConfig) -> Option<Handle> {
        let bounds = Self::selection_bounds(state)?;
        let slop = config.handle_slop / zoom;
        let offset = config.rotate_offset / zoom;
        Handle::RESIZE
            .iter()
            .chain(std::iter::once(&Handle::Rotate))
            .map(|h| (*h, h.point_on(&bounds, offset).distance(p)))
            .filter(|(_, d)| *d <= slop)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(h, _)| h)
    }

    /// Selection box, its eight handle points and the rotate handle.
    pub fn handles(state: &SceneState, zoom: f64, config: &EngineConfig) -> Option<(Bounds, Vec<Point>, Point)> {
        let bounds = Self::selection_bounds(state)?;
        let offset = config.rotate_offset / zoom;
        let points = Handle::RESIZE.iter().map(|h| h.point_on(&bounds, offset)).collect();
        Some((bounds, points, Handle::Rotate.point_on(&bounds, offset)))
    }

    pub fn guides(&self) -> &[GuideLine] {
        &self.guides
    }

    /// Current marquee rectangle while one is being dragged.
    pub fn marquee(&self) -> Option<Bounds> {
        match &self.gesture {
            Some(Gesture::Marquee { origin, current, .. }) => Some(Bounds::from_corners(*origin, *current)),
            _ => None,
        }
    }

    // ── Gesture start ──

    /// Start dragging the selection. Selected sections carry their members.
    pub fn begin_move(&mut self, store: &SceneStore, p: Point) {
        let state = store.state();
        let mut moved: Vec<ElementId> = Vec::new();
        for id in state.selection() {
            if !moved.contains(id) {
                moved.push(*id);
            }
            for d in state.descendants_of(*id) {
                if !moved.contains(&d) {
                    moved.push(d);
                }
            }
        }
        let Some(start) = state.bounds_of(&moved) else {
            return;
        };
        self.gesture = Some(Gesture::Moving {
            origin: p,
            snapshot: store.snapshot(),
            moved,
            start,
        });
    }

    pub fn begin_handle(&mut self, store: &SceneStore, handle: Handle, p: Point) {
        let state = store.state();
        let ids = state.selection().to_vec();
        let Some(start) = state.bounds_of(&ids) else {
            return;
        };
        self.gesture = Some(match handle {
            Handle::Rotate => {
                let center = start.center();
                Gesture::Rotating {
                    snapshot: store.snapshot(),
                    ids,
                    center,
                    start_angle: p.angle_from(center),
                }
            }
            _ => Gesture::Resizing {
                handle,
                origin: p,
                snapshot: store.snapshot(),
                ids,
                start,
            },
        });
    }

    pub fn begin_marquee(&mut self, state: &SceneState, p: Point, additive: bool) {
        let base = if additive { state.selection().to_vec() } else { Vec::new() };
        self.gesture = Some(Gesture::Marquee {
            origin: p,
            current: p,
            additive,
            base,
        });
    }

    // ── Gesture progress ──

    /// Apply the gesture for pointer position `p`.
    pub fn drag(
        &mut self,
        store: &mut SceneStore,
        p: Point,
        mods: Modifiers,
        snap: &SnapEngine,
        config: &EngineConfig,
    ) -> Result<(), SceneError> {
        let Some(gesture) = &mut self.gesture else {
            return Ok(());
        };
        let (patches, guides) = match gesture {
            Gesture::Moving {
                origin,
                snapshot,
                moved,
                start,
            } => move_patches(snapshot, moved, *start, *origin, p, mods, snap),
            Gesture::Resizing {
                handle,
                origin,
                snapshot,
                ids,
                start,
            } => resize_patches(snapshot, ids, *handle, *start, *origin, p, mods, snap, config),
            Gesture::Rotating {
                snapshot,
                ids,
                center,
                start_angle,
            } => (rotate_patches(snapshot, ids, *center, *start_angle, p, mods), Vec::new()),
            Gesture::Marquee { current, .. } => {
                *current = p;
                return Ok(());
            }
        };
        self.guides = guides;
        if !patches.is_empty() {
            store.update_elements(patches)?;
        }
        Ok(())
    }

    /// Apply the final position and close the gesture.
    pub fn finish(
        &mut self,
        store: &mut SceneStore,
        p: Point,
        mods: Modifiers,
        snap: &SnapEngine,
        config: &EngineConfig,
    ) -> Result<Option<GestureEnd>, SceneError> {
        let result = self.drag(store, p, mods, snap, config);
        let gesture = self.gesture.take();
        self.guides.clear();
        result?;
        Ok(match gesture {
            None => None,
            Some(Gesture::Moving { moved, .. }) => Some(GestureEnd::Moved(moved)),
            Some(Gesture::Resizing { .. }) => Some(GestureEnd::Resized),
            Some(Gesture::Rotating { .. }) => Some(GestureEnd::Rotated),
            Some(Gesture::Marquee {
                origin,
                current,
                additive,
                base,
            }) => {
                let rect = Bounds::from_corners(origin, current);
                let mut ids = base;
                if rect.width >= CLICK_EXTENT || rect.height >= CLICK_EXTENT {
                    for id in hit_test_rect(store.state(), rect) {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                } else if !additive {
                    ids.clear();
                }
                store.set_selection(&ids)?;
                Some(GestureEnd::Selected)
            }
        })
    }

    /// Drop the gesture without touching the store.
    pub fn cancel(&mut self) {
        self.gesture = None;
        self.guides.clear();
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// Connector kind with every free endpoint mapped through `f`, or `None`
/// when both ends are bound (they follow their elements).
fn map_free_endpoints(el: &Element, f: impl Fn(Point) -> Point) -> Option<ElementKind> {
    let conn = el.as_connector()?;
    let mut conn = conn.clone();
    let mut any = false;
    for ep in conn.endpoints_mut() {
        if let Endpoint::Free { point } = ep {
            *point = f(*point);
            any = true;
        }
    }
    if !any {
        return None;
    }
    for p in &mut conn.points {
        *p = f(*p);
    }
    Some(ElementKind::Connector(conn))
}

/// Patch placing `el`'s frame centred on `center` with `frame` size.
fn placed(el: &Element, center: Point, frame: Size, rotation: f64) -> ElementPatch {
    let t = el.transform();
    let transform = Transform::at(center.x - frame.width / 2.0, center.y - frame.height / 2.0)
        .with_scale(t.scale)
        .with_rotation(rotation);
    let mut patch = ElementPatch::new().transform(transform);
    if frame.width != el.frame().width || frame.height != el.frame().height {
        let scale = if t.scale > 0.0 { t.scale } else { 1.0 };
        patch = patch.size(Size::new(frame.width / scale, frame.height / scale));
    }
    patch
}

type Patches = Vec<(ElementId, ElementPatch)>;

fn move_patches(
    snapshot: &SceneState,
    moved: &[ElementId],
    start: Bounds,
    origin: Point,
    p: Point,
    mods: Modifiers,
    snap: &SnapEngine,
) -> (Patches, Vec<GuideLine>) {
    let mut dx = p.x - origin.x;
    let mut dy = p.y - origin.y;
    if mods.shift {
        if dx.abs() >= dy.abs() {
            dy = 0.0;
        } else {
            dx = 0.0;
        }
    }
    if dx == 0.0 && dy == 0.0 {
        return (Vec::new(), Vec::new());
    }
    let snapped = snap.snap_bounds(snapshot, start.translate(dx, dy), moved);
    let (sx, sy) = snapped.offset();
    dx += sx;
    dy += sy;

    let mut patches = Vec::with_capacity(moved.len());
    for id in moved {
        let Some(el) = snapshot.get(*id) else {
            continue;
        };
        if el.is_connector() {
            if let Some(kind) = map_free_endpoints(el, |q| q.offset(dx, dy)) {
                patches.push((*id, ElementPatch::new().kind(kind)));
            }
            continue;
        }
        let t = *el.transform();
        patches.push((
            *id,
            ElementPatch::new().transform(Transform { x: t.x + dx, y: t.y + dy, ..t }),
        ));
    }
    (patches, snapped.guides)
}

#[allow(clippy::too_many_arguments)]
fn resize_patches(
    snapshot: &SceneState,
    ids: &[ElementId],
    handle: Handle,
    start: Bounds,
    origin: Point,
    p: Point,
    mods: Modifiers,
    snap: &SnapEngine,
    config: &EngineConfig,
) -> (Patches, Vec<GuideLine>) {
    let (side_x, side_y) = handle.sides();
    let mut dx = p.x - origin.x;
    let mut dy = p.y - origin.y;
    if dx == 0.0 && dy == 0.0 {
        return (Vec::new(), Vec::new());
    }

    let grip = handle.point_on(&start, 0.0).offset(dx, dy);
    let snapped = snap.snap_point(snapshot, grip, ids);
    let (sx, sy) = snapped.offset();
    if side_x != 0 {
        dx += sx;
    }
    if side_y != 0 {
        dy += sy;
    }

    let factor = |side: i8, delta: f64, extent: f64| -> f64 {
        if side == 0 || extent <= 0.0 {
            return 1.0;
        }
        let f = (extent + delta * side as f64) / extent;
        f.max(config.min_size / extent)
    };
    let mut fx = factor(side_x, dx, start.width);
    let mut fy = factor(side_y, dy, start.height);
    if ids.len() > 1 || mods.shift {
        let s = match (side_x, side_y) {
            (0, _) => fy,
            (_, 0) => fx,
            _ if (fx - 1.0).abs() >= (fy - 1.0).abs() => fx,
            _ => fy,
        };
        fx = s;
        fy = s;
    }

    let anchor = Point::new(
        match side_x {
            -1 => start.max_x(),
            1 => start.min_x(),
            _ => start.center().x,
        },
        match side_y {
            -1 => start.max_y(),
            1 => start.min_y(),
            _ => start.center().y,
        },
    );
    let map = |q: Point| Point::new(anchor.x + (q.x - anchor.x) * fx, anchor.y + (q.y - anchor.y) * fy);

    let mut patches = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(el) = snapshot.get(*id) else {
            continue;
        };
        if el.is_connector() {
            if let Some(kind) = map_free_endpoints(el, map) {
                patches.push((*id, ElementPatch::new().kind(kind)));
            }
            continue;
        }
        let frame = el.frame();
        let size = Size::new(frame.width * fx, frame.height * fy);
        patches.push((*id, placed(el, map(frame.center()), size, el.transform().rotation)));
    }
    (patches, snapped.guides)
}

fn rotate_patches(
    snapshot: &SceneState,
    ids: &[ElementId],
    center: Point,
    start_angle: f64,
    p: Point,
    mods: Modifiers,
) -> Patches {
    let mut angle = p.angle_from(center) - start_angle;
    if mods.shift {
        angle = (angle / ROTATE_STEP).round() * ROTATE_STEP;
    }
    let mut patches = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(el) = snapshot.get(*id) else {
            continue;
        };
        if el.is_connector() {
            if let Some(kind) = map_free_endpoints(el, |q| q.rotate_about(center, angle)) {
                patches.push((*id, ElementPatch::new().kind(kind)));
            }
            continue;
        }
        let frame = el.frame();
        let c = frame.center().rotate_about(center, angle);
        patches.push((
            *id,
            placed(
                el,
                c,
                Size::new(frame.width, frame.height),
                el.transform().rotation + angle,
            ),
        ));
    }
    patches
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_core::model::ElementKind;
    use pretty_assertions::assert_eq;

    fn no_snap() -> SnapEngine {
        SnapEngine {
            enabled: false,
            threshold: 5.0,
            stage: Bounds::new(0.0, 0.0, 1920.0, 1080.0),
        }
    }

    fn rect(store: &mut SceneStore, b: Bounds) -> ElementId {
        store
            .add_element(Element::in_bounds(ElementKind::Rectangle { corner_radius: 0.0 }, b))
            .unwrap()
    }

    fn approx_bounds(a: Bounds, b: Bounds) {
        for (x, y) in [(a.x, b.x), (a.y, b.y), (a.width, b.width), (a.height, b.height)] {
            assert!((x - y).abs() < 1e-6, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn handle_hit_uses_screen_slop() {
        let mut store = SceneStore::default();
        let a = rect(&mut store, Bounds::new(100.0, 100.0, 100.0, 100.0));
        store.set_selection(&[a]).unwrap();
        let config = EngineConfig::default();
        let state = store.state();
        assert_eq!(
            SelectionManager::handle_at(state, Point::new(205.0, 205.0), 1.0, &config),
            Some(Handle::BottomRight)
        );
        assert_eq!(
            SelectionManager::handle_at(state, Point::new(150.0, 76.0), 1.0, &config),
            Some(Handle::Rotate)
        );
        // At 2x zoom the same 7px screen offset is 3.5 world units.
        assert_eq!(
            SelectionManager::handle_at(state, Point::new(207.0, 200.0), 2.0, &config),
            None
        );
        assert_eq!(
            SelectionManager::handle_at(state, Point::new(203.5, 200.0), 2.0, &config),
            Some(Handle::BottomRight)
        );
    }

    #[test]
    fn move_shifts_every_selected_element() {
        let mut store = SceneStore::default();
        let a = rect(&mut store, Bounds::new(100.0, 100.0, 50.0, 50.0));
        let b = rect(&mut store, Bounds::new(300.0, 100.0, 50.0, 50.0));
        store.set_selection(&[a, b]).unwrap();
        let config = EngineConfig::default();
        let mut sel = SelectionManager::new();
        sel.begin_move(&store, Point::new(120.0, 120.0));
        sel.drag(&mut store, Point::new(130.0, 125.0), Modifiers::NONE, &no_snap(), &config)
            .unwrap();
        let end = sel
            .finish(&mut store, Point::new(140.0, 150.0), Modifiers::NONE, &no_snap(), &config)
            .unwrap();
        assert_eq!(end, Some(GestureEnd::Moved(vec![a, b])));
        assert_eq!(store.get(a).unwrap().bounds(), Bounds::new(120.0, 130.0, 50.0, 50.0));
        assert_eq!(store.get(b).unwrap().bounds(), Bounds::new(320.0, 130.0, 50.0, 50.0));
    }

    #[test]
    fn shift_move_locks_dominant_axis() {
        let mut store = SceneStore::default();
        let a = rect(&mut store, Bounds::new(100.0, 100.0, 50.0, 50.0));
        store.set_selection(&[a]).unwrap();
        let mut sel = SelectionManager::new();
        sel.begin_move(&store, Point::new(110.0, 110.0));
        sel.finish(
            &mut store,
            Point::new(150.0, 120.0),
            Modifiers::SHIFT,
            &no_snap(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(store.get(a).unwrap().bounds().origin(), Point::new(140.0, 100.0));
    }

    #[test]
    fn resize_keeps_opposite_corner() {
        let mut store = SceneStore::default();
        let a = rect(&mut store, Bounds::new(100.0, 100.0, 100.0, 50.0));
        store.set_selection(&[a]).unwrap();
        let mut sel = SelectionManager::new();
        sel.begin_handle(&store, Handle::TopLeft, Point::new(100.0, 100.0));
        sel.finish(
            &mut store,
            Point::new(80.0, 90.0),
            Modifiers::NONE,
            &no_snap(),
            &EngineConfig::default(),
        )
        .unwrap();
        approx_bounds(store.get(a).unwrap().bounds(), Bounds::new(80.0, 90.0, 120.0, 60.0));
    }

    #[test]
    fn resize_respects_minimum_size() {
        let mut store = SceneStore::default();
        let a = rect(&mut store, Bounds::new(100.0, 100.0, 100.0, 100.0));
        store.set_selection(&[a]).unwrap();
        let config = EngineConfig::default();
        let mut sel = SelectionManager::new();
        sel.begin_handle(&store, Handle::Right, Point::new(200.0, 150.0));
        sel.finish(&mut store, Point::new(0.0, 150.0), Modifiers::NONE, &no_snap(), &config)
            .unwrap();
        approx_bounds(
            store.get(a).unwrap().bounds(),
            Bounds::new(100.0, 100.0, config.min_size, 100.0),
        );
    }

    #[test]
    fn multi_resize_is_uniform_about_anchor() {
        let mut store = SceneStore::default();
        let a = rect(&mut store, Bounds::new(0.0, 0.0, 50.0, 50.0));
        let b = rect(&mut store, Bounds::new(150.0, 50.0, 50.0, 50.0));
        store.set_selection(&[a, b]).unwrap();
        let mut sel = SelectionManager::new();
        // Drag the right edge from 200 to 400: scale 2 about the left edge.
        sel.begin_handle(&store, Handle::Right, Point::new(200.0, 50.0));
        sel.finish(
            &mut store,
            Point::new(400.0, 50.0),
            Modifiers::NONE,
            &no_snap(),
            &EngineConfig::default(),
        )
        .unwrap();
        // Vertical anchor is the box's centre line (y = 50).
        approx_bounds(store.get(a).unwrap().bounds(), Bounds::new(0.0, -50.0, 100.0, 100.0));
        approx_bounds(store.get(b).unwrap().bounds(), Bounds::new(300.0, 50.0, 100.0, 100.0));
    }

    #[test]
    fn rotate_snaps_with_shift() {
        let mut store = SceneStore::default();
        let a = rect(&mut store, Bounds::new(0.0, 0.0, 100.0, 100.0));
        store.set_selection(&[a]).unwrap();
        let mut sel = SelectionManager::new();
        // Start straight above the centre, end straight right of it (+90°),
        // nudged a little off so Shift has something to round.
        sel.begin_handle(&store, Handle::Rotate, Point::new(50.0, -24.0));
        sel.finish(
            &mut store,
            Point::new(150.0, 55.0),
            Modifiers::SHIFT,
            &no_snap(),
            &EngineConfig::default(),
        )
        .unwrap();
        let el = store.get(a).unwrap();
        assert_eq!(el.transform().rotation, 90.0);
        approx_bounds(el.frame(), Bounds::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn marquee_selects_intersecting() {
        let mut store = SceneStore::default();
        let a = rect(&mut store, Bounds::new(0.0, 0.0, 50.0, 50.0));
        let b = rect(&mut store, Bounds::new(100.0, 0.0, 50.0, 50.0));
        let c = rect(&mut store, Bounds::new(400.0, 400.0, 50.0, 50.0));
        store.set_selection(&[c]).unwrap();
        let config = EngineConfig::default();
        let mut sel = SelectionManager::new();

        sel.begin_marquee(store.state(), Point::new(40.0, 40.0), false);
        sel.drag(&mut store, Point::new(110.0, 60.0), Modifiers::NONE, &no_snap(), &config)
            .unwrap();
        assert_eq!(sel.marquee(), Some(Bounds::new(40.0, 40.0, 70.0, 20.0)));
        sel.finish(&mut store, Point::new(110.0, 60.0), Modifiers::NONE, &no_snap(), &config)
            .unwrap();
        assert_eq!(store.selection(), &[a, b]);

        sel.begin_marquee(store.state(), Point::new(300.0, 300.0), true);
        sel.finish(&mut store, Point::new(460.0, 460.0), Modifiers::SHIFT, &no_snap(), &config)
            .unwrap();
        assert_eq!(store.selection(), &[a, b, c]);

        // A click on empty canvas clears the selection.
        sel.begin_marquee(store.state(), Point::new(900.0, 900.0), false);
        sel.finish(&mut store, Point::new(900.0, 900.0), Modifiers::NONE, &no_snap(), &config)
            .unwrap();
        assert!(store.selection().is_empty());
    }
}
