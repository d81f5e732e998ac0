//! Performance layer between the scene store and the rendering host.
//!
//! ```text
//!  SceneStore ──Transition──▶ RenderBridge ──DrawList──▶ RenderHost
//!                               │  cull to viewport + margin
//!                               │  pool nodes per variant
//!                               └─ cache static sections as bitmaps
//! ```
//!
//! The bridge listens on a store subscription. Each frame it drains the
//! pending transitions (invalidating cached subtrees), recomputes the
//! visible set if anything changed, binds host nodes to visible ids and
//! presents the draw list with the caller's overlays.

use crate::cache::SubtreeCache;
use crate::cull::Culler;
use crate::draw::{DrawContent, DrawItem, DrawList, Overlay};
use crate::pool::{NodePool, PoolStats, RenderHost};
use board_core::geometry::Bounds;
use board_core::id::ElementId;
use board_core::model::{Element, ElementTag};
use board_core::store::{SceneState, Transition};
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Receiver;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeConfig {
    /// World-space margin added around the viewport before culling.
    pub margin: f64,
    /// Parked host nodes kept per variant.
    pub pool_cap: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            margin: 64.0,
            pool_cap: 32,
        }
    }
}

struct LiveNode<N> {
    tag: ElementTag,
    node: N,
}

pub struct RenderBridge<H: RenderHost> {
    host: H,
    updates: Receiver<Transition>,
    culler: Culler,
    pool: NodePool<H::Node>,
    cache: SubtreeCache<H::Bitmap>,
    live: HashMap<ElementId, LiveNode<H::Node>>,
    list: DrawList,
    dirty: bool,
}

impl<H: RenderHost> RenderBridge<H> {
    /// `updates` comes from [`board_core::store::SceneStore::subscribe`].
    pub fn new(
        host: H,
        updates: Receiver<Transition>,
        viewport: Bounds,
        config: BridgeConfig,
    ) -> Self {
        Self {
            host,
            updates,
            culler: Culler::new(viewport, config.margin),
            pool: NodePool::new(config.pool_cap),
            cache: SubtreeCache::new(),
            live: HashMap::new(),
            list: DrawList::default(),
            dirty: true,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn viewport(&self) -> Bounds {
        self.culler.viewport()
    }

    pub fn set_viewport(&mut self, viewport: Bounds) {
        if viewport != self.culler.viewport() {
            self.culler.set_viewport(viewport);
            self.dirty = true;
        }
    }

    pub fn draw_list(&self) -> &DrawList {
        &self.list
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn cached_sections(&self) -> usize {
        self.cache.len()
    }

    pub fn live_nodes(&self) -> usize {
        self.live.len()
    }

    /// Drain pending transitions. Returns how many arrived.
    pub fn pump(&mut self) -> usize {
        let mut n = 0;
        while let Ok(transition) = self.updates.try_recv() {
            self.cache.invalidate(&transition);
            n += 1;
        }
        if n > 0 {
            self.dirty = true;
        }
        n
    }

    /// Build and present one frame.
    pub fn frame(&mut self, state: &SceneState, revision: u64, overlays: Vec<Overlay>) -> &DrawList {
        self.pump();
        if self.dirty {
            self.rebuild(state);
            self.list.revision = revision;
            self.dirty = false;
        }
        self.list.overlays = overlays;
        self.host.present(&self.list);
        &self.list
    }

    fn rebuild(&mut self, state: &SceneState) {
        let visible: Vec<ElementId> = self.culler.recompute(state).to_vec();

        // Sections holding the selection stay live so edits show immediately.
        let mut hot: HashSet<ElementId> = HashSet::new();
        for id in state.selection() {
            hot.insert(*id);
            hot.extend(state.ancestors(*id));
        }

        let order: Vec<ElementId> = state.elements_in_paint_order().iter().map(|el| el.id).collect();
        let slots: HashMap<ElementId, usize> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut skipped: HashSet<ElementId> = HashSet::new();
        let mut items: Vec<DrawItem> = Vec::with_capacity(visible.len());
        for id in &visible {
            if skipped.contains(id) {
                continue;
            }
            let Some(el) = state.get(*id) else {
                continue;
            };
            let mut item = DrawItem::from_element(el);
            if el.is_section() && !hot.contains(id) {
                let members = state.descendants_of(*id);
                if !members.is_empty()
                    && paints_as_one_run(state, &order, &slots, el, &members)
                    && self.ensure_cached(state, &item, &members)
                {
                    item.content = DrawContent::CachedSubtree {
                        members: members.len(),
                    };
                    skipped.extend(members);
                }
            }
            items.push(item);
        }

        self.bind_nodes(&items);
        log::trace!(
            "frame: {} items, {} cached sections, {} live nodes",
            items.len(),
            self.cache.len(),
            self.live.len()
        );
        self.list.items = items;
    }

    fn ensure_cached(&mut self, state: &SceneState, section: &DrawItem, members: &[ElementId]) -> bool {
        if self.cache.contains(section.id) {
            return true;
        }
        let mut member_items: Vec<DrawItem> = members
            .iter()
            .filter_map(|m| state.get(*m))
            .map(DrawItem::from_element)
            .collect();
        member_items.sort_by(|a, b| {
            a.layer
                .cmp(&b.layer)
                .then(a.z_index.cmp(&b.z_index))
                .then(a.id.cmp(&b.id))
        });
        match self.host.rasterize(section, &member_items) {
            Some(bitmap) => {
                self.cache.insert(section.id, bitmap);
                true
            }
            None => false,
        }
    }

    fn bind_nodes(&mut self, items: &[DrawItem]) {
        let keep: HashSet<ElementId> = items.iter().map(|i| i.id).collect();

        let leaving: Vec<ElementId> = self
            .live
            .keys()
            .filter(|id| !keep.contains(*id))
            .copied()
            .collect();
        for id in leaving {
            if let Some(mut live) = self.live.remove(&id) {
                self.host.hide_node(&mut live.node);
                self.pool.release(live.tag, live.node);
            }
        }

        for item in items {
            // A variant change can't happen in place, but a reused id could
            // come back as a different element after undo.
            if self.live.get(&item.id).is_some_and(|l| l.tag != item.tag)
                && let Some(mut stale) = self.live.remove(&item.id)
            {
                self.host.hide_node(&mut stale.node);
                self.pool.release(stale.tag, stale.node);
            }
            if !self.live.contains_key(&item.id) {
                let host = &mut self.host;
                let node = self.pool.acquire(item.tag, || host.create_node(item.tag));
                self.live.insert(
                    item.id,
                    LiveNode {
                        tag: item.tag,
                        node,
                    },
                );
            }
            let cached = match item.content {
                DrawContent::CachedSubtree { .. } => self.cache.get(item.id),
                DrawContent::Element => None,
            };
            if let Some(live) = self.live.get_mut(&item.id) {
                self.host.update_node(&mut live.node, item, cached);
            }
        }
    }
}

/// Members can be folded into the section's slot only when, on the
/// section's layer, they fill the paint order directly above it.
fn paints_as_one_run(
    state: &SceneState,
    order: &[ElementId],
    slots: &HashMap<ElementId, usize>,
    section: &Element,
    members: &[ElementId],
) -> bool {
    let Some(&at) = slots.get(&section.id) else {
        return false;
    };
    let Some(run) = order.get(at + 1..at + 1 + members.len()) else {
        return false;
    };
    let members: HashSet<&ElementId> = members.iter().collect();
    run.iter()
        .all(|id| members.contains(id) && state.get(*id).is_some_and(|m| m.layer == section.layer))
}
