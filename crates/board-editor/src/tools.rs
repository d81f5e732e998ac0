//! Tool controller: one state machine per drawing tool family.
//!
//! Tools see world-space events and the current scene; they never mutate
//! the store. A finished gesture hands back the element to add, and the
//! engine commits it.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Shape tools | Connector tool |
//! |----------|-------------|----------------|
//! | **Shift** | Square / circle | Elbow route |
//! | **Alt** | Draw from centre | — |

use crate::config::EngineConfig;
use crate::input::{InputEvent, Modifiers};
use crate::snap::{GuideLine, SnapEngine};
use crate::worker::simplify_path;
use board_core::geometry::{Bounds, Point, Size, Transform};
use board_core::id::ElementId;
use board_core::model::{
    Anchor, Connector, ConnectorRoute, Element, ElementKind, Endpoint, PenStroke, Table,
    route_points,
};
use board_core::store::SceneState;

/// Pointer travel below which a shape gesture counts as a click.
const CLICK_EXTENT: f64 = 2.0;

/// The active tool determines how pointer input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Select,
    Rectangle,
    Ellipse,
    Triangle,
    Star,
    Text,
    StickyNote,
    Table,
    Section,
    Pen,
    Connector,
}

impl ToolKind {
    pub fn is_shape(self) -> bool {
        !matches!(self, ToolKind::Select | ToolKind::Pen | ToolKind::Connector)
    }
}

/// Read-only view handed to tools for each event.
pub struct ToolContext<'a> {
    pub state: &'a SceneState,
    pub snap: &'a SnapEngine,
    pub config: &'a EngineConfig,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Event ignored; nothing changed.
    Idle,
    /// Gesture in progress; the preview changed.
    Preview,
    /// Gesture finished; the element should be added.
    Commit(Element),
    /// Gesture ended without producing anything.
    Cancelled,
}

/// A drawing tool state machine.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    fn handle(&mut self, event: &InputEvent, cx: &ToolContext) -> ToolOutcome;

    /// Drop any in-progress gesture and return to idle.
    fn cancel(&mut self);

    fn is_active(&self) -> bool;

    /// The element being drawn, for the overlay layer.
    fn preview(&self) -> Option<&Element>;

    fn guides(&self) -> &[GuideLine];
}

/// Build the tool for a kind. `Select` has no drawing tool.
pub fn tool_for(kind: ToolKind) -> Option<Box<dyn Tool>> {
    match kind {
        ToolKind::Select => None,
        ToolKind::Pen => Some(Box::new(PenTool::new())),
        ToolKind::Connector => Some(Box::new(ConnectorTool::new())),
        shape => Some(Box::new(ShapeTool::new(shape))),
    }
}

fn snapped(cx: &ToolContext, p: Point) -> (Point, Vec<GuideLine>) {
    let r = cx.snap.snap_point(cx.state, p, &[]);
    let (dx, dy) = r.offset();
    (p.offset(dx, dy), r.guides)
}

// ─── Shape tools ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum ShapeState {
    Idle,
    /// Pointer is down; nothing dragged yet.
    Drawing { start: Point },
    Sizing { start: Point, current: Point },
}

/// Rectangle, ellipse, triangle, star, text, sticky note, table and section.
pub struct ShapeTool {
    kind: ToolKind,
    state: ShapeState,
    preview: Option<Element>,
    guides: Vec<GuideLine>,
}

impl ShapeTool {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            state: ShapeState::Idle,
            preview: None,
            guides: Vec::new(),
        }
    }

    fn element_kind(&self, size: Size, cx: &ToolContext) -> ElementKind {
        match self.kind {
            ToolKind::Ellipse => ElementKind::Ellipse,
            ToolKind::Triangle => ElementKind::Triangle,
            ToolKind::Star => ElementKind::Star {
                points: 5,
                inner_ratio: 0.5,
            },
            ToolKind::Text => ElementKind::Text {
                content: "Text".into(),
            },
            ToolKind::StickyNote => ElementKind::StickyNote {
                content: String::new(),
            },
            ToolKind::Table => {
                let cell = cx.config.table_cell;
                let rows = (size.height / cell.height).round().max(1.0) as usize;
                let cols = (size.width / cell.width).round().max(1.0) as usize;
                ElementKind::Table(Table::grid(rows, cols))
            }
            ToolKind::Section => ElementKind::Section {
                title: "Section".into(),
            },
            _ => ElementKind::Rectangle { corner_radius: 0.0 },
        }
    }

    fn default_size(&self, cx: &ToolContext) -> Size {
        match self.kind {
            ToolKind::Text => Size::new(160.0, 32.0),
            ToolKind::StickyNote => Size::new(200.0, 200.0),
            ToolKind::Table => Size::new(cx.config.table_cell.width * 3.0, cx.config.table_cell.height * 3.0),
            ToolKind::Section => Size::new(400.0, 300.0),
            _ => Size::new(100.0, 100.0),
        }
    }

    /// The box spanned by a drag, after modifiers and the size floor.
    fn drag_bounds(&self, start: Point, current: Point, mods: Modifiers, cx: &ToolContext) -> Bounds {
        let mut dx = current.x - start.x;
        let mut dy = current.y - start.y;
        if dx.abs() < CLICK_EXTENT && dy.abs() < CLICK_EXTENT {
            let size = self.default_size(cx);
            return Bounds::new(start.x, start.y, size.width, size.height);
        }
        if mods.shift {
            let side = dx.abs().max(dy.abs());
            dx = side.copysign(dx);
            dy = side.copysign(dy);
        }
        let raw = if mods.alt {
            Bounds::from_corners(start.offset(-dx, -dy), start.offset(dx, dy))
        } else {
            Bounds::from_corners(start, start.offset(dx, dy))
        };
        let min = cx.config.min_size;
        Bounds::new(raw.x, raw.y, raw.width.max(min), raw.height.max(min))
    }

    fn update_preview(&mut self, bounds: Bounds, cx: &ToolContext) {
        let size = Size::new(bounds.width, bounds.height);
        let kind = self.element_kind(size, cx);
        match &mut self.preview {
            Some(el) => {
                el.kind = kind;
                el.set_transform(Transform::at(bounds.x, bounds.y));
                el.set_size(size);
            }
            None => {
                self.preview = Some(Element::new(kind, Transform::at(bounds.x, bounds.y), size));
            }
        }
    }

    fn reset(&mut self) {
        self.state = ShapeState::Idle;
        self.preview = None;
        self.guides.clear();
    }
}

impl Tool for ShapeTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn handle(&mut self, event: &InputEvent, cx: &ToolContext) -> ToolOutcome {
        match (event, self.state) {
            (InputEvent::PointerDown { x, y, .. }, ShapeState::Idle) => {
                let (start, guides) = snapped(cx, Point::new(*x, *y));
                self.guides = guides;
                self.state = ShapeState::Drawing { start };
                ToolOutcome::Preview
            }
            (
                InputEvent::PointerMove { x, y, modifiers, .. },
                ShapeState::Drawing { start } | ShapeState::Sizing { start, .. },
            ) => {
                let (current, guides) = snapped(cx, Point::new(*x, *y));
                self.guides = guides;
                self.state = ShapeState::Sizing { start, current };
                let bounds = self.drag_bounds(start, current, *modifiers, cx);
                self.update_preview(bounds, cx);
                ToolOutcome::Preview
            }
            (InputEvent::PointerUp { x, y, modifiers, .. }, ShapeState::Drawing { start } | ShapeState::Sizing { start, .. }) => {
                let (current, _) = snapped(cx, Point::new(*x, *y));
                let bounds = self.drag_bounds(start, current, *modifiers, cx);
                self.update_preview(bounds, cx);
                let committed = self.preview.take();
                self.reset();
                match committed {
                    Some(el) => ToolOutcome::Commit(el),
                    None => ToolOutcome::Cancelled,
                }
            }
            _ => ToolOutcome::Idle,
        }
    }

    fn cancel(&mut self) {
        self.reset();
    }

    fn is_active(&self) -> bool {
        self.state != ShapeState::Idle
    }

    fn preview(&self) -> Option<&Element> {
        self.preview.as_ref()
    }

    fn guides(&self) -> &[GuideLine] {
        &self.guides
    }
}

// ─── Pen tool ────────────────────────────────────────────────────────────

pub struct PenTool {
    points: Vec<Point>,
    last_sample_ms: u64,
    stroking: bool,
    preview: Option<Element>,
}

impl Default for PenTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PenTool {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            last_sample_ms: 0,
            stroking: false,
            preview: None,
        }
    }

    fn push(&mut self, p: Point) {
        if self.points.last() != Some(&p) {
            self.points.push(p);
        }
    }

    fn refresh_preview(&mut self, tolerance: f64) {
        if self.points.len() < 2 {
            return;
        }
        let el = self.preview.get_or_insert_with(|| {
            Element::new(
                ElementKind::PenStroke(PenStroke {
                    points: Vec::new(),
                    tolerance,
                }),
                Transform::default(),
                Size::default(),
            )
        });
        el.set_stroke_points(&self.points);
    }

    fn reset(&mut self) {
        self.points.clear();
        self.stroking = false;
        self.preview = None;
    }
}

impl Tool for PenTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Pen
    }

    fn handle(&mut self, event: &InputEvent, cx: &ToolContext) -> ToolOutcome {
        let tolerance = cx.config.pen_tolerance;
        match event {
            InputEvent::PointerDown { x, y, time_ms, .. } if !self.stroking => {
                self.reset();
                self.stroking = true;
                self.last_sample_ms = *time_ms;
                self.push(Point::new(*x, *y));
                ToolOutcome::Preview
            }
            InputEvent::PointerMove { x, y, time_ms, .. } if self.stroking => {
                if time_ms.saturating_sub(self.last_sample_ms) < cx.config.pen_sample_interval_ms {
                    return ToolOutcome::Idle;
                }
                self.last_sample_ms = *time_ms;
                self.push(Point::new(*x, *y));
                self.refresh_preview(tolerance);
                ToolOutcome::Preview
            }
            InputEvent::PointerUp { x, y, .. } if self.stroking => {
                self.push(Point::new(*x, *y));
                if self.points.len() < 2 {
                    self.reset();
                    return ToolOutcome::Cancelled;
                }
                // Long strokes are simplified later by the worker.
                if self.points.len() <= cx.config.pen_worker_threshold {
                    self.points = simplify_path(&self.points, tolerance);
                }
                self.refresh_preview(tolerance);
                let committed = self.preview.take();
                self.reset();
                match committed {
                    Some(el) => ToolOutcome::Commit(el),
                    None => ToolOutcome::Cancelled,
                }
            }
            _ => ToolOutcome::Idle,
        }
    }

    fn cancel(&mut self) {
        self.reset();
    }

    fn is_active(&self) -> bool {
        self.stroking
    }

    fn preview(&self) -> Option<&Element> {
        self.preview.as_ref()
    }

    fn guides(&self) -> &[GuideLine] {
        &[]
    }
}

// ─── Connector tool ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum ConnectorState {
    Idle,
    /// Start fixed (bound or free); waiting for the first move.
    Anchoring { start: Endpoint, start_pt: Point },
    Routing { start: Endpoint, start_pt: Point },
}

pub struct ConnectorTool {
    state: ConnectorState,
    preview: Option<Element>,
    guides: Vec<GuideLine>,
}

impl Default for ConnectorTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorTool {
    pub fn new() -> Self {
        Self {
            state: ConnectorState::Idle,
            preview: None,
            guides: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.state = ConnectorState::Idle;
        self.preview = None;
        self.guides.clear();
    }

    /// Resolve an end under the pointer, keeping the guides of a snapped
    /// free end for the overlay.
    fn resolve(&mut self, cx: &ToolContext, p: Point, skip: Option<ElementId>) -> (Endpoint, Point) {
        let (end, guides) = endpoint_at(cx, p, skip);
        self.guides = guides;
        end
    }

    fn route_of(mods: Modifiers) -> ConnectorRoute {
        if mods.shift {
            ConnectorRoute::Elbow
        } else {
            ConnectorRoute::Straight
        }
    }

    /// Build the routed connector element between two resolved ends.
    fn routed(&mut self, start: (Endpoint, Point), end: (Endpoint, Point), route: ConnectorRoute) -> &Element {
        let connector = Connector::new(start.0, end.0, route);
        let points = route_points(route, start.1, end.1);
        let el = self.preview.get_or_insert_with(|| {
            Element::new(
                ElementKind::Connector(connector.clone()),
                Transform::default(),
                Size::default(),
            )
        });
        el.kind = ElementKind::Connector(connector);
        el.set_route(points);
        el
    }
}

/// Nearest anchor of the topmost non-connector element within reach.
pub fn nearest_anchor(cx: &ToolContext, p: Point, skip: Option<ElementId>) -> Option<(ElementId, Anchor, Point)> {
    let reach = cx.config.anchor_distance / cx.zoom;
    let mut best: Option<(ElementId, Anchor, Point, f64)> = None;
    for el in cx.state.elements_in_paint_order().into_iter().rev() {
        if el.is_connector() || Some(el.id) == skip {
            continue;
        }
        let bounds = el.bounds();
        if !bounds.expand(reach).contains_point(p) {
            continue;
        }
        for anchor in Anchor::ALL {
            let at = anchor.point_on(&bounds);
            let d = at.distance(p);
            if d < reach && best.is_none_or(|(_, _, _, b)| d < b) {
                best = Some((el.id, anchor, at, d));
            }
        }
    }
    best.map(|(id, anchor, at, _)| (id, anchor, at))
}

/// Anchored ends sit exactly on the anchor; free ends go through the snap
/// engine like any drawn point.
fn endpoint_at(cx: &ToolContext, p: Point, skip: Option<ElementId>) -> ((Endpoint, Point), Vec<GuideLine>) {
    match nearest_anchor(cx, p, skip) {
        Some((id, anchor, at)) => ((Endpoint::bound(id, anchor), at), Vec::new()),
        None => {
            let (at, guides) = snapped(cx, p);
            ((Endpoint::free(at), at), guides)
        }
    }
}

impl Tool for ConnectorTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Connector
    }

    fn handle(&mut self, event: &InputEvent, cx: &ToolContext) -> ToolOutcome {
        match (event, self.state) {
            (InputEvent::PointerDown { x, y, .. }, ConnectorState::Idle) => {
                let (start, start_pt) = self.resolve(cx, Point::new(*x, *y), None);
                self.state = ConnectorState::Anchoring { start, start_pt };
                ToolOutcome::Preview
            }
            (
                InputEvent::PointerMove { x, y, modifiers, .. },
                ConnectorState::Anchoring { start, start_pt } | ConnectorState::Routing { start, start_pt },
            ) => {
                let end = self.resolve(cx, Point::new(*x, *y), start.bound_element());
                self.state = ConnectorState::Routing { start, start_pt };
                self.routed((start, start_pt), end, Self::route_of(*modifiers));
                ToolOutcome::Preview
            }
            (
                InputEvent::PointerUp { x, y, modifiers, .. },
                ConnectorState::Anchoring { start, start_pt } | ConnectorState::Routing { start, start_pt },
            ) => {
                let end = self.resolve(cx, Point::new(*x, *y), start.bound_element());
                if start_pt.distance(end.1) < cx.config.min_connector_length {
                    self.reset();
                    return ToolOutcome::Cancelled;
                }
                let el = self.routed((start, start_pt), end, Self::route_of(*modifiers)).clone();
                self.reset();
                ToolOutcome::Commit(el)
            }
            _ => ToolOutcome::Idle,
        }
    }

    fn cancel(&mut self) {
        self.reset();
    }

    fn is_active(&self) -> bool {
        self.state != ConnectorState::Idle
    }

    fn preview(&self) -> Option<&Element> {
        self.preview.as_ref()
    }

    fn guides(&self) -> &[GuideLine] {
        &self.guides
    }
}
