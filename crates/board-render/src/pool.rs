//! Rendering host contract and node pooling.
//!
//! The bridge never talks to a GPU or DOM directly; it drives a
//! [`RenderHost`]. Host nodes for elements that scroll out of view are
//! parked in a [`NodePool`] per variant and handed to the next element of
//! that variant that scrolls in.

use crate::draw::{DrawItem, DrawList};
use board_core::model::ElementTag;
use std::collections::HashMap;

/// The host side of the render bridge.
pub trait RenderHost {
    /// A retained host object (DOM node, scene node, sprite, ...).
    type Node;
    /// A rasterized section subtree.
    type Bitmap: Clone;

    fn create_node(&mut self, tag: ElementTag) -> Self::Node;

    /// Bring a node up to date with `item`. `cached` carries the subtree
    /// bitmap when the item is a cached section.
    fn update_node(&mut self, node: &mut Self::Node, item: &DrawItem, cached: Option<&Self::Bitmap>);

    /// Detach a node that left the visible set.
    fn hide_node(&mut self, node: &mut Self::Node);

    /// Rasterize a section and its members. `None` declines caching.
    fn rasterize(&mut self, section: &DrawItem, members: &[DrawItem]) -> Option<Self::Bitmap>;

    /// Called once per frame after all nodes are updated.
    fn present(&mut self, _list: &DrawList) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub created: usize,
    pub reused: usize,
    pub dropped: usize,
}

/// Free host nodes keyed by variant, capped per variant.
#[derive(Debug)]
pub struct NodePool<N> {
    free: HashMap<ElementTag, Vec<N>>,
    cap: usize,
    stats: PoolStats,
}

impl<N> NodePool<N> {
    pub fn new(cap: usize) -> Self {
        Self {
            free: HashMap::new(),
            cap,
            stats: PoolStats::default(),
        }
    }

    /// Take a parked node for `tag`, or build one with `create`.
    pub fn acquire(&mut self, tag: ElementTag, create: impl FnOnce() -> N) -> N {
        match self.free.get_mut(&tag).and_then(Vec::pop) {
            Some(node) => {
                self.stats.reused += 1;
                node
            }
            None => {
                self.stats.created += 1;
                create()
            }
        }
    }

    /// Park a node. Returns `false` when the variant's slot is full and the
    /// node was dropped.
    pub fn release(&mut self, tag: ElementTag, node: N) -> bool {
        let slot = self.free.entry(tag).or_default();
        if slot.len() >= self.cap {
            self.stats.dropped += 1;
            return false;
        }
        slot.push(node);
        true
    }

    pub fn available(&self, tag: ElementTag) -> usize {
        self.free.get(&tag).map_or(0, Vec::len)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
