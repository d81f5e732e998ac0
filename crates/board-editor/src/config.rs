//! Engine configuration.
//!
//! Every field has a default, so a host can pass a partial JSON object
//! (or nothing at all) and override only what it cares about.

use board_core::geometry::{Bounds, Size};
use board_core::store::ConnectorPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Undo entries kept before the oldest is evicted.
    pub history_depth: usize,
    pub snap_enabled: bool,
    /// World units; snapping needs a distance strictly below this.
    pub snap_threshold: f64,
    /// Stage rectangle that contributes edge and centre guides.
    pub stage: Bounds,
    pub connector_policy: ConnectorPolicy,
    /// Smallest width/height a drawn or resized element may have.
    pub min_size: f64,
    pub pen_sample_interval_ms: u64,
    /// Ramer–Douglas–Peucker tolerance in world units.
    pub pen_tolerance: f64,
    /// Strokes with more points than this are simplified off-thread.
    pub pen_worker_threshold: usize,
    pub table_cell: Size,
    /// Screen pixels within which a connector end binds to an anchor.
    pub anchor_distance: f64,
    /// Connectors shorter than this are discarded on release.
    pub min_connector_length: f64,
    pub viewport_margin: f64,
    pub pool_cap: usize,
    /// Screen pixels around a handle that still count as a hit.
    pub handle_slop: f64,
    /// Screen pixels between the top edge and the rotate handle.
    pub rotate_offset: f64,
    /// Offset applied to pasted and duplicated elements.
    pub paste_offset: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: 200,
            snap_enabled: true,
            snap_threshold: 5.0,
            stage: Bounds::new(0.0, 0.0, 1920.0, 1080.0),
            connector_policy: ConnectorPolicy::Detach,
            min_size: 8.0,
            pen_sample_interval_ms: 16,
            pen_tolerance: 1.5,
            pen_worker_threshold: 512,
            table_cell: Size::new(120.0, 40.0),
            anchor_distance: 12.0,
            min_connector_length: 10.0,
            viewport_margin: 64.0,
            pool_cap: 32,
            handle_slop: 8.0,
            rotate_offset: 24.0,
            paste_offset: 20.0,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
