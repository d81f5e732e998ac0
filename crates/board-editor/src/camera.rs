//! Pan/zoom camera for the infinite canvas.

use board_core::geometry::{Bounds, Point, Size};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 8.0;

/// Screen = world * zoom + pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan_x) / self.zoom,
            (screen.y - self.pan_y) / self.zoom,
        )
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            world.x * self.zoom + self.pan_x,
            world.y * self.zoom + self.pan_y,
        )
    }

    /// Screen pixels → world units (handle slop, hit tolerance).
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Zoom by `factor`, keeping the world point under `anchor` fixed.
    pub fn zoom_about(&mut self, anchor: Point, factor: f64) {
        self.zoom_to(anchor, self.zoom * factor);
    }

    /// Set an absolute zoom level, keeping the world point under `anchor` fixed.
    pub fn zoom_to(&mut self, anchor: Point, zoom: f64) {
        let world = self.screen_to_world(anchor);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan_x = anchor.x - world.x * self.zoom;
        self.pan_y = anchor.y - world.y * self.zoom;
    }

    /// World region covered by a screen of `viewport` size.
    pub fn visible_world(&self, viewport: Size) -> Bounds {
        let origin = self.screen_to_world(Point::ZERO);
        Bounds::new(
            origin.x,
            origin.y,
            viewport.width / self.zoom,
            viewport.height / self.zoom,
        )
    }
}
