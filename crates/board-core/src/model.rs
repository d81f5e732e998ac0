//! Scene data model.
//!
//! Every drawable object is an [`Element`]: a tagged [`ElementKind`] plus
//! the attributes all variants share (transform, size, layer, z-order,
//! optional container and style). Elements are plain data; behaviour lives
//! in the store and the editor. Section membership is a back-reference
//! (`container_id`), never ownership: the store's element table owns every
//! element.

use crate::geometry::{Bounds, Point, Size, Transform};
use crate::id::ElementId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

// ─── Colors & Style ──────────────────────────────────────────────────────

/// 8-bit RGBA color. Serialized as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn hex_pair(bytes: &[u8]) -> Option<u8> {
    Some(hex_val(bytes[0])? << 4 | hex_val(bytes[1])?)
}

impl Color {
    pub const BLACK: Color = Color::rgb(0x1E, 0x1E, 0x1E);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xFF)
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        match bytes.len() {
            3 => Some(Self::rgb(
                hex_val(bytes[0])? * 17,
                hex_val(bytes[1])? * 17,
                hex_val(bytes[2])? * 17,
            )),
            6 => Some(Self::rgb(
                hex_pair(&bytes[0..2])?,
                hex_pair(&bytes[2..4])?,
                hex_pair(&bytes[4..6])?,
            )),
            8 => Some(Self::rgba(
                hex_pair(&bytes[0..2])?,
                hex_pair(&bytes[2..4])?,
                hex_pair(&bytes[4..6])?,
                hex_pair(&bytes[6..8])?,
            )),
            _ => None,
        }
    }

    /// Shortest lossless hex form; alpha is omitted when opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 0xFF {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    #[serde(default = "default_weight")]
    pub weight: u16,
}

fn default_weight() -> u16 {
    400
}

impl FontSpec {
    pub fn sans(size: f64) -> Self {
        Self {
            family: "Inter".into(),
            size,
            weight: default_weight(),
        }
    }
}

/// Visual attributes shared by every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<StrokeStyle>,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontSpec>,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            opacity: 1.0,
            font: None,
        }
    }
}

impl Style {
    /// Default look for a freshly drawn element of the given variant.
    pub fn for_tag(tag: ElementTag) -> Self {
        let outline = Some(StrokeStyle {
            color: Color::BLACK,
            width: 2.0,
        });
        match tag {
            ElementTag::Rectangle | ElementTag::Ellipse | ElementTag::Triangle | ElementTag::Star => {
                Style {
                    fill: Some(Color::WHITE),
                    stroke: outline,
                    ..Style::default()
                }
            }
            ElementTag::Text => Style {
                font: Some(FontSpec::sans(16.0)),
                ..Style::default()
            },
            ElementTag::StickyNote => Style {
                fill: Some(Color::rgb(0xFF, 0xE0, 0x66)),
                font: Some(FontSpec::sans(14.0)),
                ..Style::default()
            },
            ElementTag::Table => Style {
                fill: Some(Color::WHITE),
                stroke: Some(StrokeStyle {
                    color: Color::rgb(0xD0, 0xD0, 0xD0),
                    width: 1.0,
                }),
                font: Some(FontSpec::sans(13.0)),
                ..Style::default()
            },
            ElementTag::Connector | ElementTag::PenStroke => Style {
                stroke: outline,
                ..Style::default()
            },
            ElementTag::Section => Style {
                fill: Some(Color::rgba(0xF5, 0xF5, 0xF5, 0xCC)),
                stroke: Some(StrokeStyle {
                    color: Color::rgb(0xC8, 0xC8, 0xC8),
                    width: 1.0,
                }),
                font: Some(FontSpec::sans(14.0)),
                ..Style::default()
            },
            ElementTag::Image => Style::default(),
        }
    }
}

// ─── Layers ──────────────────────────────────────────────────────────────

/// Fixed compositing buckets. Declaration order is paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Background,
    Main,
    Connector,
    /// Transient UI only; never holds scene elements.
    Overlay,
}

impl Layer {
    pub const PAINT_ORDER: [Layer; 4] = [
        Layer::Background,
        Layer::Main,
        Layer::Connector,
        Layer::Overlay,
    ];
}

// ─── Variant payloads ────────────────────────────────────────────────────

/// Attachment point on a bound element's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Top,
    Right,
    Bottom,
    Left,
    Center,
}

impl Anchor {
    pub const ALL: [Anchor; 5] = [
        Anchor::Top,
        Anchor::Right,
        Anchor::Bottom,
        Anchor::Left,
        Anchor::Center,
    ];

    /// World position of this anchor on `bounds`.
    pub fn point_on(self, bounds: &Bounds) -> Point {
        let c = bounds.center();
        match self {
            Anchor::Top => Point::new(c.x, bounds.min_y()),
            Anchor::Right => Point::new(bounds.max_x(), c.y),
            Anchor::Bottom => Point::new(c.x, bounds.max_y()),
            Anchor::Left => Point::new(bounds.min_x(), c.y),
            Anchor::Center => c,
        }
    }
}

/// One end of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Endpoint {
    Free { point: Point },
    Bound { element: ElementId, anchor: Anchor },
}

impl Endpoint {
    pub fn free(point: Point) -> Self {
        Endpoint::Free { point }
    }

    pub fn bound(element: ElementId, anchor: Anchor) -> Self {
        Endpoint::Bound { element, anchor }
    }

    pub fn bound_element(&self) -> Option<ElementId> {
        match self {
            Endpoint::Bound { element, .. } => Some(*element),
            Endpoint::Free { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorRoute {
    #[default]
    Straight,
    Elbow,
}

/// Polyline for a route between two resolved world points.
pub fn route_points(route: ConnectorRoute, start: Point, end: Point) -> Vec<Point> {
    match route {
        ConnectorRoute::Straight => vec![start, end],
        ConnectorRoute::Elbow => {
            let mid_x = (start.x + end.x) / 2.0;
            vec![
                start,
                Point::new(mid_x, start.y),
                Point::new(mid_x, end.y),
                end,
            ]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub start: Endpoint,
    pub end: Endpoint,
    #[serde(default)]
    pub route: ConnectorRoute,
    /// Resolved world-space route, refreshed by the store.
    #[serde(default)]
    pub points: Vec<Point>,
}

impl Connector {
    pub fn new(start: Endpoint, end: Endpoint, route: ConnectorRoute) -> Self {
        Self {
            start,
            end,
            route,
            points: Vec::new(),
        }
    }

    pub fn endpoints(&self) -> [&Endpoint; 2] {
        [&self.start, &self.end]
    }

    pub fn endpoints_mut(&mut self) -> [&mut Endpoint; 2] {
        [&mut self.start, &mut self.end]
    }

    /// Last resolved position of the start and end of the route.
    pub fn resolved_ends(&self) -> Option<(Point, Point)> {
        Some((*self.points.first()?, *self.points.last()?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub text: String,
    #[serde(default = "one")]
    pub row_span: u16,
    #[serde(default = "one")]
    pub col_span: u16,
}

fn one() -> u16 {
    1
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            text: String::new(),
            row_span: 1,
            col_span: 1,
        }
    }
}

/// Row-major grid of cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub cells: Vec<Vec<Cell>>,
}

impl Table {
    pub fn grid(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![vec![Cell::default(); cols]; rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }
}

/// Freehand stroke; points are local to the element origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenStroke {
    pub points: Vec<Point>,
    pub tolerance: f64,
}

/// Opaque bitmap reference owned by the rendering host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

// ─── Element kinds ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Rectangle {
        #[serde(default)]
        corner_radius: f64,
    },
    Ellipse,
    Triangle,
    Star {
        points: u8,
        inner_ratio: f64,
    },
    Text {
        content: String,
    },
    StickyNote {
        content: String,
    },
    Image {
        handle: ImageHandle,
        #[serde(default)]
        backdrop: bool,
    },
    Table(Table),
    Connector(Connector),
    PenStroke(PenStroke),
    Section {
        title: String,
    },
}

/// Payload-free discriminant of [`ElementKind`], used for pooling and ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementTag {
    Rectangle,
    Ellipse,
    Triangle,
    Star,
    Text,
    StickyNote,
    Image,
    Table,
    Connector,
    PenStroke,
    Section,
}

impl ElementTag {
    pub fn name(self) -> &'static str {
        match self {
            ElementTag::Rectangle => "rectangle",
            ElementTag::Ellipse => "ellipse",
            ElementTag::Triangle => "triangle",
            ElementTag::Star => "star",
            ElementTag::Text => "text",
            ElementTag::StickyNote => "sticky_note",
            ElementTag::Image => "image",
            ElementTag::Table => "table",
            ElementTag::Connector => "connector",
            ElementTag::PenStroke => "pen_stroke",
            ElementTag::Section => "section",
        }
    }
}

impl ElementKind {
    pub fn tag(&self) -> ElementTag {
        match self {
            ElementKind::Rectangle { .. } => ElementTag::Rectangle,
            ElementKind::Ellipse => ElementTag::Ellipse,
            ElementKind::Triangle => ElementTag::Triangle,
            ElementKind::Star { .. } => ElementTag::Star,
            ElementKind::Text { .. } => ElementTag::Text,
            ElementKind::StickyNote { .. } => ElementTag::StickyNote,
            ElementKind::Image { .. } => ElementTag::Image,
            ElementKind::Table(_) => ElementTag::Table,
            ElementKind::Connector(_) => ElementTag::Connector,
            ElementKind::PenStroke(_) => ElementTag::PenStroke,
            ElementKind::Section { .. } => ElementTag::Section,
        }
    }

    /// The compositing layer this variant lives on.
    pub fn layer(&self) -> Layer {
        match self {
            ElementKind::Connector(_) => Layer::Connector,
            ElementKind::Image { backdrop: true, .. } => Layer::Background,
            _ => Layer::Main,
        }
    }
}

// ─── Element ─────────────────────────────────────────────────────────────

/// A single drawable scene object.
///
/// Transform and size are private so the cached bounding box can never go
/// stale; use the setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ElementRecord", into = "ElementRecord")]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    transform: Transform,
    size: Size,
    pub z_index: i64,
    pub layer: Layer,
    pub container_id: Option<ElementId>,
    pub style: Style,
    aabb: Bounds,
}

/// Wire form of an [`Element`]: everything but the derived bounding box.
#[derive(Serialize, Deserialize)]
struct ElementRecord {
    id: ElementId,
    kind: ElementKind,
    transform: Transform,
    size: Size,
    #[serde(default)]
    z_index: i64,
    layer: Layer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    container_id: Option<ElementId>,
    #[serde(default)]
    style: Style,
}

impl From<ElementRecord> for Element {
    fn from(r: ElementRecord) -> Self {
        let aabb = r.transform.aabb(r.size);
        Element {
            id: r.id,
            kind: r.kind,
            transform: r.transform,
            size: r.size,
            z_index: r.z_index,
            layer: r.layer,
            container_id: r.container_id,
            style: r.style,
            aabb,
        }
    }
}

impl From<Element> for ElementRecord {
    fn from(e: Element) -> Self {
        ElementRecord {
            id: e.id,
            kind: e.kind,
            transform: e.transform,
            size: e.size,
            z_index: e.z_index,
            layer: e.layer,
            container_id: e.container_id,
            style: e.style,
        }
    }
}

impl Element {
    /// New element with a generated id, its variant's layer and default style.
    pub fn new(kind: ElementKind, transform: Transform, size: Size) -> Self {
        let id = ElementId::with_prefix(kind.tag().name());
        Self::with_id(id, kind, transform, size)
    }

    pub fn with_id(id: ElementId, kind: ElementKind, transform: Transform, size: Size) -> Self {
        let layer = kind.layer();
        let style = Style::for_tag(kind.tag());
        Element {
            id,
            kind,
            transform,
            size,
            z_index: 0,
            layer,
            container_id: None,
            style,
            aabb: transform.aabb(size),
        }
    }

    /// Convenience for an unrotated element occupying `bounds`.
    pub fn in_bounds(kind: ElementKind, bounds: Bounds) -> Self {
        Self::new(
            kind,
            Transform::at(bounds.x, bounds.y),
            Size::new(bounds.width, bounds.height),
        )
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_container(mut self, container: Option<ElementId>) -> Self {
        self.container_id = container;
        self
    }

    pub fn tag(&self) -> ElementTag {
        self.kind.tag()
    }

    pub fn is_section(&self) -> bool {
        matches!(self.kind, ElementKind::Section { .. })
    }

    pub fn is_connector(&self) -> bool {
        matches!(self.kind, ElementKind::Connector(_))
    }

    pub fn as_connector(&self) -> Option<&Connector> {
        match &self.kind {
            ElementKind::Connector(c) => Some(c),
            _ => None,
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Cached axis-aligned bounding box in world space.
    pub fn bounds(&self) -> Bounds {
        self.aabb
    }

    /// The unrotated world box.
    pub fn frame(&self) -> Bounds {
        self.transform.frame(self.size)
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.refresh_bounds();
    }

    /// Resize; pen strokes rescale their points to the new extent.
    pub fn set_size(&mut self, size: Size) {
        if let ElementKind::PenStroke(stroke) = &mut self.kind {
            let sx = if self.size.width > 0.0 { size.width / self.size.width } else { 1.0 };
            let sy = if self.size.height > 0.0 { size.height / self.size.height } else { 1.0 };
            for p in &mut stroke.points {
                p.x *= sx;
                p.y *= sy;
            }
        }
        self.size = size;
        self.refresh_bounds();
    }

    pub(crate) fn set_size_raw(&mut self, size: Size) {
        self.size = size;
        self.refresh_bounds();
    }

    /// Move by a world delta. Connectors shift their free endpoints and route.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        if let ElementKind::Connector(c) = &mut self.kind {
            for ep in c.endpoints_mut() {
                if let Endpoint::Free { point } = ep {
                    *point = point.offset(dx, dy);
                }
            }
            for p in &mut c.points {
                *p = p.offset(dx, dy);
            }
        }
        self.transform.x += dx;
        self.transform.y += dy;
        self.refresh_bounds();
    }

    /// Text-like content: text body, sticky-note body or section title.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text { content } | ElementKind::StickyNote { content } => Some(content),
            ElementKind::Section { title } => Some(title),
            _ => None,
        }
    }

    /// Replace text-like content. Returns `false` for variants without text.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        match &mut self.kind {
            ElementKind::Text { content } | ElementKind::StickyNote { content } => {
                *content = text.into();
                true
            }
            ElementKind::Section { title } => {
                *title = text.into();
                true
            }
            _ => false,
        }
    }

    /// Replace a pen stroke's points from world coordinates, re-basing the
    /// element origin on their extent. Rotation and scale are reset.
    pub fn set_stroke_points(&mut self, world: &[Point]) -> bool {
        let Some(extent) = Bounds::from_points(world.iter()) else {
            return false;
        };
        let ElementKind::PenStroke(stroke) = &mut self.kind else {
            return false;
        };
        stroke.points = world
            .iter()
            .map(|p| Point::new(p.x - extent.x, p.y - extent.y))
            .collect();
        self.transform = Transform::at(extent.x, extent.y);
        self.size = Size::new(extent.width, extent.height);
        self.refresh_bounds();
        true
    }

    /// Pen stroke points mapped to world space.
    pub fn stroke_world_points(&self) -> Vec<Point> {
        match &self.kind {
            ElementKind::PenStroke(stroke) => stroke
                .points
                .iter()
                .map(|p| self.transform.apply(*p, self.size))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Install a resolved connector route and fit the frame to it.
    pub fn set_route(&mut self, points: Vec<Point>) {
        let Some(extent) = Bounds::from_points(points.iter()) else {
            return;
        };
        if let ElementKind::Connector(c) = &mut self.kind {
            c.points = points;
            self.transform = Transform::at(extent.x, extent.y);
            self.size = Size::new(extent.width, extent.height);
            self.refresh_bounds();
        }
    }

    /// Ids of elements a connector is bound to.
    pub fn bound_elements(&self) -> SmallVec<[ElementId; 2]> {
        match &self.kind {
            ElementKind::Connector(c) => c
                .endpoints()
                .iter()
                .filter_map(|ep| ep.bound_element())
                .collect(),
            _ => SmallVec::new(),
        }
    }

    fn refresh_bounds(&mut self) {
        self.aabb = self.transform.aabb(self.size);
    }
}

// ─── Patches ─────────────────────────────────────────────────────────────

/// Partial update for [`crate::store::SceneStore::update_element`].
///
/// `container` uses a nested option: `Some(None)` clears membership.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementPatch {
    pub transform: Option<Transform>,
    pub size: Option<Size>,
    pub style: Option<Style>,
    pub container: Option<Option<ElementId>>,
    pub text: Option<String>,
    pub kind: Option<ElementKind>,
}

impl ElementPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn container(mut self, container: Option<ElementId>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn kind(mut self, kind: ElementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &ElementPatch::default()
    }

    /// Whether applying this patch can move the element's bounding box.
    pub fn touches_geometry(&self) -> bool {
        self.transform.is_some() || self.size.is_some() || self.kind.is_some()
    }
}
