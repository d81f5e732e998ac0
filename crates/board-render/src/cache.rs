//! Subtree cache: rasterized sections, invalidated from store transitions.
//!
//! An entry dies when the section itself changes or when any element that
//! sits (before or after the change) anywhere below it changes.

use board_core::id::ElementId;
use board_core::store::{SceneState, Transition};
use std::collections::HashMap;

#[derive(Debug)]
pub struct SubtreeCache<B> {
    entries: HashMap<ElementId, B>,
}

impl<B> Default for SubtreeCache<B> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<B> SubtreeCache<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, section: ElementId) -> Option<&B> {
        self.entries.get(&section)
    }

    pub fn insert(&mut self, section: ElementId, bitmap: B) {
        self.entries.insert(section, bitmap);
    }

    pub fn contains(&self, section: ElementId) -> bool {
        self.entries.contains_key(&section)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry affected by a transition.
    pub fn invalidate(&mut self, transition: &Transition) {
        if self.entries.is_empty() {
            return;
        }
        for id in transition.changed_ids() {
            self.invalidate_chain(&transition.before, id);
            self.invalidate_chain(&transition.after, id);
        }
    }

    fn invalidate_chain(&mut self, state: &SceneState, id: ElementId) {
        if self.entries.remove(&id).is_some() {
            log::trace!("subtree cache: dropped {id}");
        }
        for ancestor in state.ancestors(id) {
            if self.entries.remove(&ancestor).is_some() {
                log::trace!("subtree cache: dropped {ancestor} (member {id} changed)");
            }
        }
    }
}
