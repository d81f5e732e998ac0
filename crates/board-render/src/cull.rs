//! Viewport culling.

use board_core::geometry::Bounds;
use board_core::id::ElementId;
use board_core::store::SceneState;

/// Tracks the visible world region and the ids that intersect it.
#[derive(Debug, Clone)]
pub struct Culler {
    viewport: Bounds,
    margin: f64,
    visible: Vec<ElementId>,
}

impl Culler {
    pub fn new(viewport: Bounds, margin: f64) -> Self {
        Self {
            viewport,
            margin,
            visible: Vec::new(),
        }
    }

    pub fn viewport(&self) -> Bounds {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Bounds) {
        self.viewport = viewport;
    }

    /// The viewport grown by the margin; anything touching it is kept.
    pub fn region(&self) -> Bounds {
        self.viewport.expand(self.margin)
    }

    /// Recompute the visible ids in paint order.
    pub fn recompute(&mut self, state: &SceneState) -> &[ElementId] {
        let region = self.region();
        self.visible = state
            .elements_in_paint_order()
            .into_iter()
            .filter(|el| el.bounds().intersects(&region))
            .map(|el| el.id)
            .collect();
        log::trace!(
            "culled {} of {} elements to {:?}",
            state.len() - self.visible.len(),
            state.len(),
            region
        );
        &self.visible
    }

    pub fn visible(&self) -> &[ElementId] {
        &self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_core::model::{Element, ElementKind};
    use board_core::store::SceneStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn margin_keeps_near_offscreen_elements() {
        let mut store = SceneStore::default();
        let on = store
            .add_element(Element::in_bounds(
                ElementKind::Ellipse,
                Bounds::new(10.0, 10.0, 10.0, 10.0),
            ))
            .unwrap();
        let near = store
            .add_element(Element::in_bounds(
                ElementKind::Ellipse,
                Bounds::new(130.0, 10.0, 10.0, 10.0),
            ))
            .unwrap();
        store
            .add_element(Element::in_bounds(
                ElementKind::Ellipse,
                Bounds::new(1000.0, 10.0, 10.0, 10.0),
            ))
            .unwrap();

        let mut culler = Culler::new(Bounds::new(0.0, 0.0, 100.0, 100.0), 64.0);
        assert_eq!(culler.recompute(store.state()), &[on, near]);

        culler.set_viewport(Bounds::new(500.0, 0.0, 100.0, 100.0));
        assert!(culler.recompute(store.state()).is_empty());
    }
}
