//! Spatial snap engine.
//!
//! Candidate guides come from the stage (edges and centre) followed by
//! every other element's bounding box in ascending id order. Per axis the
//! guide closest to any of the active box's three snap points wins, as long
//! as the distance is strictly below the threshold. Equal distances keep the
//! earlier guide.

use crate::config::EngineConfig;
use board_core::geometry::{Axis, Bounds, Point};
use board_core::id::ElementId;
use board_core::store::SceneState;

/// A transient alignment line. For `Axis::X` the line is vertical at
/// `x = position` spanning `from..to` in y; for `Axis::Y` it is horizontal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideLine {
    pub axis: Axis,
    pub position: f64,
    pub from: f64,
    pub to: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapResult {
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    pub guides: Vec<GuideLine>,
}

impl SnapResult {
    /// Offset to add to the active geometry (zero on unmatched axes).
    pub fn offset(&self) -> (f64, f64) {
        (self.dx.unwrap_or(0.0), self.dy.unwrap_or(0.0))
    }

    pub fn is_empty(&self) -> bool {
        self.dx.is_none() && self.dy.is_none()
    }
}

/// One candidate on one axis: its coordinate and the extent it spans on the
/// other axis (used to draw the guide).
#[derive(Debug, Clone, Copy)]
struct Candidate {
    value: f64,
    span: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapEngine {
    pub enabled: bool,
    /// World units.
    pub threshold: f64,
    pub stage: Bounds,
}

impl SnapEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            enabled: config.snap_enabled,
            threshold: config.snap_threshold,
            stage: config.stage,
        }
    }

    /// Snap a moving or resizing box against the scene, ignoring `exclude`.
    pub fn snap_bounds(&self, state: &SceneState, active: Bounds, exclude: &[ElementId]) -> SnapResult {
        if !self.enabled {
            return SnapResult::default();
        }
        let (xs, ys) = self.candidates(state, exclude);
        let px = [active.min_x(), active.center().x, active.max_x()];
        let py = [active.min_y(), active.center().y, active.max_y()];

        let mut result = SnapResult::default();
        if let Some((cand, d)) = self.best(&xs, &px) {
            result.dx = Some(d);
            let moved = active.translate(d, 0.0);
            result.guides.push(GuideLine {
                axis: Axis::X,
                position: cand.value,
                from: moved.min_y().min(cand.span.0),
                to: moved.max_y().max(cand.span.1),
            });
        }
        if let Some((cand, d)) = self.best(&ys, &py) {
            result.dy = Some(d);
            let moved = active.translate(0.0, d);
            result.guides.push(GuideLine {
                axis: Axis::Y,
                position: cand.value,
                from: moved.min_x().min(cand.span.0),
                to: moved.max_x().max(cand.span.1),
            });
        }
        result
    }

    /// Snap a single point (drawing tools) as a zero-size box.
    pub fn snap_point(&self, state: &SceneState, point: Point, exclude: &[ElementId]) -> SnapResult {
        self.snap_bounds(state, Bounds::new(point.x, point.y, 0.0, 0.0), exclude)
    }

    fn best(&self, candidates: &[Candidate], points: &[f64]) -> Option<(Candidate, f64)> {
        let mut best: Option<(Candidate, f64)> = None;
        for cand in candidates {
            for p in points {
                let d = cand.value - p;
                if best.is_none_or(|(_, b)| d.abs() < b.abs()) {
                    best = Some((*cand, d));
                }
            }
        }
        best.filter(|(_, d)| d.abs() < self.threshold)
    }

    fn candidates(&self, state: &SceneState, exclude: &[ElementId]) -> (Vec<Candidate>, Vec<Candidate>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let mut push = |b: Bounds| {
            let yspan = (b.min_y(), b.max_y());
            let xspan = (b.min_x(), b.max_x());
            for value in [b.min_x(), b.center().x, b.max_x()] {
                xs.push(Candidate { value, span: yspan });
            }
            for value in [b.min_y(), b.center().y, b.max_y()] {
                ys.push(Candidate { value, span: xspan });
            }
        };
        push(self.stage);
        for id in state.ids() {
            if exclude.contains(&id) {
                continue;
            }
            if let Some(el) = state.get(id)
                && !el.is_connector()
            {
                push(el.bounds());
            }
        }
        (xs, ys)
    }
}
