//! Hit testing: point → element lookup.
//!
//! Walks layers top to bottom (the background layer is never hit) and,
//! within a layer, elements from highest z down. Closed variants are hit
//! inside their rotated outline; connectors and pen strokes are hit within
//! a tolerance of their polyline.

use board_core::geometry::{Bounds, Point};
use board_core::id::ElementId;
use board_core::model::{Element, ElementKind, Layer};
use board_core::store::SceneState;
use kurbo::{Affine, BezPath, Ellipse, Line, ParamCurveNearest, Rect, RoundedRect, Shape};
use std::f64::consts::PI;

/// Flattening accuracy for curved outlines.
const ACCURACY: f64 = 0.1;

fn kp(p: Point) -> kurbo::Point {
    kurbo::Point::new(p.x, p.y)
}

/// Find the topmost element at a world position.
/// Returns `None` over empty canvas or background-only content.
pub fn hit_test(state: &SceneState, point: Point, tolerance: f64) -> Option<ElementId> {
    Layer::PAINT_ORDER
        .iter()
        .rev()
        .filter(|layer| **layer != Layer::Background)
        .find_map(|layer| {
            state
                .layer_order(*layer)
                .into_iter()
                .rev()
                .find(|id| state.get(*id).is_some_and(|el| hits(el, point, tolerance)))
        })
}

/// Every non-background element whose bounds intersect `rect`, in paint
/// order. Used for marquee selection.
pub fn hit_test_rect(state: &SceneState, rect: Bounds) -> Vec<ElementId> {
    state
        .elements_in_paint_order()
        .into_iter()
        .filter(|el| el.layer != Layer::Background && el.bounds().intersects(&rect))
        .map(|el| el.id)
        .collect()
}

/// Does `point` fall on `el`?
pub fn hits(el: &Element, point: Point, tolerance: f64) -> bool {
    let half_stroke = el.style.stroke.map_or(0.0, |s| s.width / 2.0);
    let reach = tolerance + half_stroke;
    if !el.bounds().expand(reach).contains_point(point) {
        return false;
    }
    match &el.kind {
        ElementKind::Connector(c) => polyline_distance(&c.points, point) <= reach,
        ElementKind::PenStroke(_) => polyline_distance(&el.stroke_world_points(), point) <= reach,
        ElementKind::Rectangle { .. }
        | ElementKind::Ellipse
        | ElementKind::Triangle
        | ElementKind::Star { .. }
        | ElementKind::Text { .. }
        | ElementKind::StickyNote { .. }
        | ElementKind::Image { .. }
        | ElementKind::Table(_)
        | ElementKind::Section { .. } => {
            outline(el).is_some_and(|path| path.contains(kp(point)))
        }
    }
}

/// World-space closed outline of an element; `None` for open paths.
pub fn outline(el: &Element) -> Option<BezPath> {
    let t = el.transform();
    let size = el.size();
    let local = Rect::new(0.0, 0.0, size.width * t.scale, size.height * t.scale);
    let (w, h) = (local.width(), local.height());
    let path = match &el.kind {
        ElementKind::Rectangle { corner_radius } => {
            let r = (corner_radius * t.scale).clamp(0.0, w.min(h) / 2.0);
            RoundedRect::from_rect(local, r).to_path(ACCURACY)
        }
        ElementKind::Ellipse => Ellipse::from_rect(local).to_path(ACCURACY),
        ElementKind::Triangle => polygon(&[(w / 2.0, 0.0), (w, h), (0.0, h)]),
        ElementKind::Star {
            points,
            inner_ratio,
        } => star(local, *points, *inner_ratio),
        ElementKind::Text { .. }
        | ElementKind::StickyNote { .. }
        | ElementKind::Image { .. }
        | ElementKind::Table(_)
        | ElementKind::Section { .. } => local.to_path(ACCURACY),
        ElementKind::Connector(_) | ElementKind::PenStroke(_) => return None,
    };
    let affine = Affine::translate((t.x, t.y))
        * Affine::rotate_about(t.rotation.to_radians(), local.center());
    Some(affine * path)
}

fn polygon(points: &[(f64, f64)]) -> BezPath {
    let mut path = BezPath::new();
    for (i, &(x, y)) in points.iter().enumerate() {
        if i == 0 {
            path.move_to((x, y));
        } else {
            path.line_to((x, y));
        }
    }
    path.close_path();
    path
}

fn star(frame: Rect, points: u8, inner_ratio: f64) -> BezPath {
    let n = usize::from(points.max(3));
    let c = frame.center();
    let (rx, ry) = (frame.width() / 2.0, frame.height() / 2.0);
    let vertices: Vec<(f64, f64)> = (0..2 * n)
        .map(|i| {
            let angle = -PI / 2.0 + i as f64 * PI / n as f64;
            let r = if i % 2 == 0 { 1.0 } else { inner_ratio };
            (c.x + angle.cos() * rx * r, c.y + angle.sin() * ry * r)
        })
        .collect();
    polygon(&vertices)
}

/// Shortest distance from `p` to a polyline.
pub fn polyline_distance(points: &[Point], p: Point) -> f64 {
    let target = kp(p);
    match points {
        [] => f64::INFINITY,
        [only] => kp(*only).distance(target),
        _ => points
            .windows(2)
            .map(|seg| {
                Line::new(kp(seg[0]), kp(seg[1]))
                    .nearest(target, 1e-9)
                    .distance_sq
                    .sqrt()
            })
            .fold(f64::INFINITY, f64::min),
    }
}
