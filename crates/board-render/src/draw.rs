//! Draw list handed to the rendering host each frame.

use board_core::geometry::{Axis, Bounds, Point, Size, Transform};
use board_core::id::ElementId;
use board_core::model::{Element, ElementTag, Layer, Style};

/// How an item should be painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawContent {
    /// Paint the element itself.
    Element,
    /// Paint the section's cached bitmap in place of it and its members.
    CachedSubtree { members: usize },
}

/// One visible element, resolved for painting.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub id: ElementId,
    pub tag: ElementTag,
    pub layer: Layer,
    pub z_index: i64,
    pub bounds: Bounds,
    pub transform: Transform,
    pub size: Size,
    pub style: Style,
    pub content: DrawContent,
}

impl DrawItem {
    pub fn from_element(el: &Element) -> Self {
        Self {
            id: el.id,
            tag: el.tag(),
            layer: el.layer,
            z_index: el.z_index,
            bounds: el.bounds(),
            transform: *el.transform(),
            size: el.size(),
            style: el.style.clone(),
            content: DrawContent::Element,
        }
    }
}

/// Transient UI painted on the overlay layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// Combined selection box with its resize handles and rotate handle.
    Selection {
        bounds: Bounds,
        handles: Vec<Point>,
        rotate_handle: Point,
    },
    Marquee(Bounds),
    /// Alignment guide: a line at `position` on `axis`, spanning `from..to`
    /// on the other axis.
    Guide {
        axis: Axis,
        position: f64,
        from: f64,
        to: f64,
    },
    /// In-progress element from a drawing tool.
    Preview(Element),
}

/// Everything the host needs to paint one frame.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    /// Visible elements, back to front.
    pub items: Vec<DrawItem>,
    pub overlays: Vec<Overlay>,
    /// Scene revision the items were built from.
    pub revision: u64,
}

impl DrawList {
    pub fn ids(&self) -> Vec<ElementId> {
        self.items.iter().map(|i| i.id).collect()
    }

    pub fn get(&self, id: ElementId) -> Option<&DrawItem> {
        self.items.iter().find(|i| i.id == id)
    }
}
