//! Scene Store: the authoritative, versioned scene state.
//!
//! The state is an `Arc`-shared value. Every mutation runs against a
//! working copy (element entries are themselves `Arc`s, so the copy is a
//! table of pointer clones), is validated in full, and only then replaces
//! the current state. The replaced state and the new one form a
//! [`Transition`], which is journaled for the history manager and fanned
//! out to subscribers.
//!
//! ```text
//!   add/update/remove/reorder/select
//!            │
//!     working copy ── validate ──✗──▶ Err (state untouched)
//!            │ ok
//!     swap Arc ──▶ Transition { before, after } ──▶ journal + subscribers
//! ```

use crate::error::{Invariant, SceneError};
use crate::geometry::{Bounds, Point};
use crate::id::ElementId;
use crate::model::{Element, ElementKind, ElementPatch, Endpoint, Layer, route_points};
use crate::relations::Relations;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

/// Maximum number of ancestors an element may have.
pub const MAX_CONTAINER_DEPTH: usize = 32;

/// What happens to a connector whose bound element is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorPolicy {
    /// The endpoint becomes a free point at its last anchor position.
    #[default]
    Detach,
    /// The connector is deleted along with the element.
    Remove,
}

pub type Selection = SmallVec<[ElementId; 4]>;

// ─── Scene state ─────────────────────────────────────────────────────────

/// One immutable-once-published version of the scene.
#[derive(Debug, Clone, Default)]
pub struct SceneState {
    elements: HashMap<ElementId, Arc<Element>>,
    selection: Selection,
    relations: Relations,
}

impl PartialEq for SceneState {
    fn eq(&self, other: &Self) -> bool {
        self.selection == other.selection
            && self.elements.len() == other.elements.len()
            && self.elements.iter().all(|(id, el)| {
                other
                    .elements
                    .get(id)
                    .is_some_and(|o| Arc::ptr_eq(el, o) || **el == **o)
            })
    }
}

impl SceneState {
    // ── Queries ──

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id).map(Arc::as_ref)
    }

    pub fn get_shared(&self, id: ElementId) -> Option<Arc<Element>> {
        self.elements.get(&id).cloned()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements, unordered.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values().map(Arc::as_ref)
    }

    /// All ids in ascending order.
    pub fn ids(&self) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self.elements.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selection.contains(&id)
    }

    /// Ids on `layer`, bottom to top.
    pub fn layer_order(&self, layer: Layer) -> Vec<ElementId> {
        let mut members: Vec<&Element> = self.elements().filter(|e| e.layer == layer).collect();
        members.sort_by(|a, b| a.z_index.cmp(&b.z_index).then(a.id.cmp(&b.id)));
        members.into_iter().map(|e| e.id).collect()
    }

    /// Every element, back to front: by layer, then z.
    pub fn elements_in_paint_order(&self) -> Vec<&Element> {
        let mut all: Vec<&Element> = self.elements().collect();
        all.sort_by(|a, b| {
            a.layer
                .cmp(&b.layer)
                .then(a.z_index.cmp(&b.z_index))
                .then(a.id.cmp(&b.id))
        });
        all
    }

    pub fn children_of(&self, id: ElementId) -> Vec<ElementId> {
        self.relations.children(id)
    }

    /// Every element transitively inside `id`, breadth first.
    pub fn descendants_of(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut frontier = vec![id];
        for _ in 0..=MAX_CONTAINER_DEPTH {
            let next: Vec<ElementId> = frontier
                .iter()
                .flat_map(|f| self.relations.children(*f))
                .filter(|c| *c != id && !out.contains(c))
                .collect();
            if next.is_empty() {
                break;
            }
            out.extend(next.iter().copied());
            frontier = next;
        }
        out
    }

    /// Containers of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut cur = self.get(id).and_then(|e| e.container_id);
        while let Some(c) = cur {
            if out.len() > MAX_CONTAINER_DEPTH || c == id || out.contains(&c) {
                break;
            }
            out.push(c);
            cur = self.get(c).and_then(|e| e.container_id);
        }
        out
    }

    pub fn is_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    pub fn connectors_bound_to(&self, id: ElementId) -> Vec<ElementId> {
        self.relations.connectors_bound_to(id)
    }

    /// World position of a connector endpoint.
    pub fn resolve_endpoint(&self, endpoint: &Endpoint) -> Option<Point> {
        match endpoint {
            Endpoint::Free { point } => Some(*point),
            Endpoint::Bound { element, anchor } => {
                self.get(*element).map(|e| anchor.point_on(&e.bounds()))
            }
        }
    }

    /// Combined bounds of the given ids that exist.
    pub fn bounds_of(&self, ids: &[ElementId]) -> Option<Bounds> {
        Bounds::union_all(ids.iter().filter_map(|id| self.get(*id)).map(Element::bounds))
    }

    /// Ids whose entries differ between `self` and `other`, ascending.
    pub fn changed_ids(&self, other: &SceneState) -> Vec<ElementId> {
        let mut out: Vec<ElementId> = self
            .elements
            .iter()
            .filter(|&(id, el)| {
                other
                    .elements
                    .get(id)
                    .is_none_or(|o| !Arc::ptr_eq(el, o) && **el != **o)
            })
            .map(|(id, _)| *id)
            .collect();
        out.extend(
            other
                .elements
                .keys()
                .filter(|id| !self.elements.contains_key(*id))
                .copied(),
        );
        out.sort();
        out
    }

    fn depth(&self, id: ElementId) -> usize {
        self.ancestors(id).len()
    }

    fn subtree_height(&self, id: ElementId) -> usize {
        self.height_from(id, 0)
    }

    fn height_from(&self, id: ElementId, level: usize) -> usize {
        if level > MAX_CONTAINER_DEPTH {
            return 0;
        }
        self.relations
            .children(id)
            .into_iter()
            .map(|c| 1 + self.height_from(c, level + 1))
            .max()
            .unwrap_or(0)
    }

    // ── Validation ──

    fn validate_container(
        &self,
        child: ElementId,
        container: Option<ElementId>,
        height: usize,
    ) -> Result<(), SceneError> {
        let Some(c) = container else {
            return Ok(());
        };
        let target = self.get(c).ok_or(SceneError::NotFound(c))?;
        if !target.is_section() {
            return Err(Invariant::NotASection(c).into());
        }
        if c == child || self.is_ancestor(child, c) {
            return Err(Invariant::CyclicContainment {
                child,
                container: c,
            }
            .into());
        }
        if self.depth(c) + 1 + height > MAX_CONTAINER_DEPTH {
            return Err(Invariant::DepthExceeded(child).into());
        }
        Ok(())
    }

    fn validate_bindings(&self, el: &Element) -> Result<(), SceneError> {
        for target in el.bound_elements() {
            let bound = self.get(target).ok_or(SceneError::NotFound(target))?;
            if target == el.id || bound.is_connector() {
                return Err(Invariant::InvalidBinding {
                    connector: el.id,
                    target,
                }
                .into());
            }
        }
        Ok(())
    }

    // ── Internal writes (run against a working copy) ──

    fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id).map(Arc::make_mut)
    }

    fn insert_raw(&mut self, el: Element) {
        self.relations.insert(&el);
        self.elements.insert(el.id, Arc::new(el));
    }

    /// Rewrite z on `layer` to `0..n`, preserving order.
    fn restack(&mut self, layer: Layer) {
        let order = self.layer_order(layer);
        self.apply_order(&order);
    }

    fn apply_order(&mut self, order: &[ElementId]) {
        for (z, id) in order.iter().enumerate() {
            let z = z as i64;
            if self.get(*id).is_some_and(|e| e.z_index != z)
                && let Some(el) = self.element_mut(*id)
            {
                el.z_index = z;
            }
        }
    }

    fn refresh_connector(&mut self, id: ElementId) {
        let Some(conn) = self.get(id).and_then(Element::as_connector) else {
            return;
        };
        let (Some(start), Some(end)) = (
            self.resolve_endpoint(&conn.start),
            self.resolve_endpoint(&conn.end),
        ) else {
            return;
        };
        let points = route_points(conn.route, start, end);
        let Some(current) = self.get(id) else {
            return;
        };
        let mut routed = current.clone();
        routed.set_route(points);
        if routed != *current {
            self.elements.insert(id, Arc::new(routed));
        }
    }

    fn refresh_connectors_of(&mut self, id: ElementId) {
        for conn in self.relations.connectors_bound_to(id) {
            self.refresh_connector(conn);
        }
    }

    fn add(&mut self, mut element: Element) -> Result<ElementId, SceneError> {
        let id = element.id;
        if self.contains(id) {
            return Err(Invariant::DuplicateId(id).into());
        }
        self.validate_container(id, element.container_id, 0)?;
        self.validate_bindings(&element)?;

        element.layer = element.kind.layer();
        element.z_index = self.layer_order(element.layer).len() as i64;
        self.insert_raw(element);
        self.refresh_connector(id);
        Ok(id)
    }

    fn update(&mut self, id: ElementId, patch: ElementPatch) -> Result<Element, SceneError> {
        let current = self.get(id).ok_or(SceneError::NotFound(id))?.clone();
        if let Some(kind) = &patch.kind
            && kind.tag() != current.tag()
        {
            return Err(Invariant::VariantChange(id).into());
        }
        if patch.text.is_some() && current.text().is_none() {
            return Err(Invariant::NoText(id).into());
        }

        let mut next = current.clone();
        let kind_patched = patch.kind.is_some();
        if let Some(kind) = patch.kind {
            next.kind = kind;
        }
        if let Some(transform) = patch.transform {
            if next.is_connector() {
                // Connector geometry follows its endpoints; a new origin is a move.
                let origin = *next.transform();
                next.translate(transform.x - origin.x, transform.y - origin.y);
            } else {
                next.set_transform(transform);
            }
        }
        if let Some(size) = patch.size {
            if kind_patched {
                next.set_size_raw(size);
            } else {
                next.set_size(size);
            }
        }
        if let Some(style) = patch.style {
            next.style = style;
        }
        if let Some(text) = patch.text {
            next.set_text(text);
        }
        if let Some(container) = patch.container {
            next.container_id = container;
        }
        if next == current {
            return Ok(current);
        }

        if next.container_id != current.container_id {
            self.validate_container(id, next.container_id, self.subtree_height(id))?;
        }
        self.validate_bindings(&next)?;

        next.layer = next.kind.layer();
        let layer_changed = next.layer != current.layer;
        if layer_changed {
            next.z_index = self.layer_order(next.layer).len() as i64;
        }
        let geometry_changed = next.bounds() != current.bounds();

        self.relations
            .set_container(id, current.container_id, next.container_id);
        if next.is_connector() {
            self.relations.set_bindings(id, &next.bound_elements());
        }
        let is_connector = next.is_connector();
        self.elements.insert(id, Arc::new(next));

        if layer_changed {
            self.restack(current.layer);
        }
        if is_connector {
            self.refresh_connector(id);
        }
        if geometry_changed {
            self.refresh_connectors_of(id);
        }
        self.get(id).cloned().ok_or(SceneError::NotFound(id))
    }

    fn remove(&mut self, id: ElementId, policy: ConnectorPolicy) -> Result<(), SceneError> {
        let el = self.get_shared(id).ok_or(SceneError::NotFound(id))?;

        // Children move one level up, never dropped.
        for child in self.relations.children(id) {
            if let Some(c) = self.element_mut(child) {
                c.container_id = el.container_id;
            }
            self.relations.set_container(child, Some(id), el.container_id);
        }

        let bounds = el.bounds();
        for conn in self.relations.connectors_bound_to(id) {
            match policy {
                ConnectorPolicy::Remove => self.remove(conn, policy)?,
                ConnectorPolicy::Detach => {
                    let Some(c_el) = self.element_mut(conn) else {
                        continue;
                    };
                    if let ElementKind::Connector(c) = &mut c_el.kind {
                        for ep in c.endpoints_mut() {
                            if let Endpoint::Bound { element, anchor } = *ep
                                && element == id
                            {
                                *ep = Endpoint::free(anchor.point_on(&bounds));
                            }
                        }
                    }
                    let targets = c_el.bound_elements();
                    self.relations.set_bindings(conn, &targets);
                }
            }
        }

        self.relations.remove(id);
        self.elements.remove(&id);
        self.selection.retain(|s| *s != id);
        self.restack(el.layer);
        Ok(())
    }

    fn reorder(&mut self, id: ElementId, new_z: i64) -> Result<(), SceneError> {
        let layer = self.get(id).ok_or(SceneError::NotFound(id))?.layer;
        let mut order = self.layer_order(layer);
        let Some(pos) = order.iter().position(|o| *o == id) else {
            return Err(SceneError::NotFound(id));
        };
        let target = new_z.clamp(0, order.len() as i64 - 1) as usize;
        order.remove(pos);
        order.insert(target, id);
        self.apply_order(&order);
        Ok(())
    }

    fn select(&mut self, ids: &[ElementId]) -> Result<(), SceneError> {
        let mut next = Selection::new();
        for &id in ids {
            if !self.contains(id) {
                return Err(SceneError::NotFound(id));
            }
            if !next.contains(&id) {
                next.push(id);
            }
        }
        self.selection = next;
        Ok(())
    }

    /// Build and validate a state from a flat element list (document load).
    pub fn from_elements(elements: Vec<Element>) -> Result<Self, SceneError> {
        let mut state = SceneState::default();
        for el in elements {
            if state.contains(el.id) {
                return Err(Invariant::DuplicateId(el.id).into());
            }
            let expected = el.kind.layer();
            if el.layer != expected {
                return Err(Invariant::WrongLayer {
                    id: el.id,
                    expected,
                    found: el.layer,
                }
                .into());
            }
            state.insert_raw(el);
        }

        let mut z_seen: HashSet<(Layer, i64)> = HashSet::new();
        for el in state.elements() {
            if !z_seen.insert((el.layer, el.z_index)) {
                return Err(Invariant::DuplicateZIndex {
                    layer: el.layer,
                    z: el.z_index,
                }
                .into());
            }
            state.validate_bindings(el)?;
            let mut seen = HashSet::new();
            let mut cur = el.container_id;
            while let Some(c) = cur {
                let container = state.get(c).ok_or(SceneError::NotFound(c))?;
                if !container.is_section() {
                    return Err(Invariant::NotASection(c).into());
                }
                if c == el.id || !seen.insert(c) {
                    return Err(Invariant::CyclicContainment {
                        child: el.id,
                        container: c,
                    }
                    .into());
                }
                if seen.len() > MAX_CONTAINER_DEPTH {
                    return Err(Invariant::DepthExceeded(el.id).into());
                }
                cur = container.container_id;
            }
        }

        for layer in Layer::PAINT_ORDER {
            state.restack(layer);
        }
        for id in state.ids() {
            state.refresh_connector(id);
        }
        Ok(state)
    }
}

// ─── Transitions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Element table changed.
    Edit,
    /// Only the selection changed.
    Selection,
    /// Undo/redo swapped in a recorded snapshot.
    Restore,
    /// A document replaced the scene.
    Load,
}

/// A published `(before, after)` snapshot pair.
#[derive(Debug, Clone)]
pub struct Transition {
    pub label: String,
    pub kind: TransitionKind,
    pub revision: u64,
    pub before: Arc<SceneState>,
    pub after: Arc<SceneState>,
}

impl Transition {
    /// Ids whose entries differ between the two states.
    pub fn changed_ids(&self) -> Vec<ElementId> {
        self.before.changed_ids(&self.after)
    }

    pub fn is_selection_only(&self) -> bool {
        self.kind == TransitionKind::Selection
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

/// Instance-scoped scene container. All mutations take `&mut self`.
///
/// Edit and selection transitions accumulate in a journal until drained
/// by the history owner with [`SceneStore::drain_journal`].
#[derive(Debug, Default)]
pub struct SceneStore {
    state: Arc<SceneState>,
    revision: u64,
    policy: ConnectorPolicy,
    journal: Vec<Transition>,
    subscribers: Vec<Sender<Transition>>,
}

impl SceneStore {
    pub fn new(policy: ConnectorPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// Cheap shared handle to the current state.
    pub fn snapshot(&self) -> Arc<SceneState> {
        Arc::clone(&self.state)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn policy(&self) -> ConnectorPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ConnectorPolicy) {
        self.policy = policy;
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.state.get(id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.state.contains(id)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn selection(&self) -> &[ElementId] {
        self.state.selection()
    }

    pub fn elements_in_paint_order(&self) -> Vec<&Element> {
        self.state.elements_in_paint_order()
    }

    pub fn children_of(&self, id: ElementId) -> Vec<ElementId> {
        self.state.children_of(id)
    }

    pub fn descendants_of(&self, id: ElementId) -> Vec<ElementId> {
        self.state.descendants_of(id)
    }

    pub fn connectors_bound_to(&self, id: ElementId) -> Vec<ElementId> {
        self.state.connectors_bound_to(id)
    }

    /// Receive every future transition (edits, selection, restore, load).
    pub fn subscribe(&mut self) -> Receiver<Transition> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Take the edit/selection transitions recorded since the last drain.
    pub fn drain_journal(&mut self) -> Vec<Transition> {
        std::mem::take(&mut self.journal)
    }

    // ── Mutations ──

    /// Insert an element on top of its variant's layer.
    pub fn add_element(&mut self, element: Element) -> Result<ElementId, SceneError> {
        let label = format!("add {}", element.tag().name().replace('_', " "));
        self.mutate(label, TransitionKind::Edit, |s| s.add(element))
    }

    /// Patch one element; returns the updated element.
    pub fn update_element(
        &mut self,
        id: ElementId,
        patch: ElementPatch,
    ) -> Result<Element, SceneError> {
        self.mutate("update", TransitionKind::Edit, |s| s.update(id, patch))
    }

    /// Patch several elements atomically: all apply or none do.
    pub fn update_elements(
        &mut self,
        patches: Vec<(ElementId, ElementPatch)>,
    ) -> Result<Vec<Element>, SceneError> {
        self.mutate("update", TransitionKind::Edit, |s| {
            patches
                .into_iter()
                .map(|(id, patch)| s.update(id, patch))
                .collect()
        })
    }

    /// Delete an element, re-parenting its children and applying the
    /// connector policy to connectors bound to it.
    pub fn remove_element(&mut self, id: ElementId) -> Result<(), SceneError> {
        self.remove_elements(&[id])
    }

    pub fn remove_elements(&mut self, ids: &[ElementId]) -> Result<(), SceneError> {
        if let Some(missing) = ids.iter().find(|id| !self.contains(**id)) {
            return Err(SceneError::NotFound(*missing));
        }
        let policy = self.policy;
        self.mutate("delete", TransitionKind::Edit, |s| {
            for &id in ids {
                // A connector may already be gone under `Remove`.
                if s.contains(id) {
                    s.remove(id, policy)?;
                }
            }
            Ok(())
        })
    }

    /// Move an element to `new_z` within its layer (clamped); the rest of
    /// the layer shifts to keep z dense.
    pub fn reorder(&mut self, id: ElementId, new_z: i64) -> Result<(), SceneError> {
        self.mutate("reorder", TransitionKind::Edit, |s| s.reorder(id, new_z))
    }

    pub fn set_selection(&mut self, ids: &[ElementId]) -> Result<(), SceneError> {
        self.mutate("select", TransitionKind::Selection, |s| s.select(ids))
    }

    /// Swap in a recorded snapshot (undo/redo). Not journaled.
    pub fn restore(&mut self, snapshot: Arc<SceneState>) {
        let before = std::mem::replace(&mut self.state, snapshot);
        self.publish("restore", TransitionKind::Restore, before);
    }

    /// Replace the scene with a validated element list. Not journaled.
    pub fn load(&mut self, elements: Vec<Element>) -> Result<(), SceneError> {
        let state = SceneState::from_elements(elements)?;
        let before = std::mem::replace(&mut self.state, Arc::new(state));
        self.publish("load", TransitionKind::Load, before);
        Ok(())
    }

    fn mutate<T>(
        &mut self,
        label: impl Into<String>,
        kind: TransitionKind,
        f: impl FnOnce(&mut SceneState) -> Result<T, SceneError>,
    ) -> Result<T, SceneError> {
        let label = label.into();
        let mut working = (*self.state).clone();
        let out = match f(&mut working) {
            Ok(out) => out,
            Err(err) => {
                log::warn!("rejected {label}: {err}");
                return Err(err);
            }
        };
        if working == *self.state {
            log::trace!("{label}: no change");
            return Ok(out);
        }
        let before = std::mem::replace(&mut self.state, Arc::new(working));
        let transition = self.publish(label, kind, before);
        self.journal.push(transition);
        Ok(out)
    }

    fn publish(
        &mut self,
        label: impl Into<String>,
        kind: TransitionKind,
        before: Arc<SceneState>,
    ) -> Transition {
        self.revision += 1;
        let transition = Transition {
            label: label.into(),
            kind,
            revision: self.revision,
            before,
            after: self.snapshot(),
        };
        log::debug!(
            "r{} {} ({:?}, {} elements)",
            transition.revision,
            transition.label,
            kind,
            self.state.len()
        );
        self.subscribers
            .retain(|tx| tx.send(transition.clone()).is_ok());
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Size, Transform};
    use crate::model::{Anchor, Connector, ConnectorRoute};
    use pretty_assertions::assert_eq;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Element {
        Element::in_bounds(
            ElementKind::Rectangle { corner_radius: 0.0 },
            Bounds::new(x, y, w, h),
        )
    }

    fn section(x: f64, y: f64, w: f64, h: f64) -> Element {
        Element::in_bounds(
            ElementKind::Section {
                title: "Section".into(),
            },
            Bounds::new(x, y, w, h),
        )
    }

    fn connector(start: Endpoint, end: Endpoint) -> Element {
        Element::in_bounds(
            ElementKind::Connector(Connector::new(start, end, ConnectorRoute::Straight)),
            Bounds::default(),
        )
    }

    #[test]
    fn add_places_on_top_of_layer() {
        let mut store = SceneStore::default();
        let a = store.add_element(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let b = store.add_element(rect(5.0, 5.0, 10.0, 10.0)).unwrap();
        assert_eq!(store.get(a).unwrap().z_index, 0);
        assert_eq!(store.get(b).unwrap().z_index, 1);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut store = SceneStore::default();
        let el = rect(0.0, 0.0, 10.0, 10.0);
        store.add_element(el.clone()).unwrap();
        let err = store.add_element(el.clone()).unwrap_err();
        assert_eq!(err, SceneError::InvariantViolation(Invariant::DuplicateId(el.id)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_missing_is_not_found() {
        let mut store = SceneStore::default();
        let ghost = ElementId::intern("ghost_element");
        let err = store
            .update_element(ghost, ElementPatch::new().text("x"))
            .unwrap_err();
        assert_eq!(err, SceneError::NotFound(ghost));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn variant_change_is_rejected() {
        let mut store = SceneStore::default();
        let a = store.add_element(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let err = store
            .update_element(a, ElementPatch::new().kind(ElementKind::Ellipse))
            .unwrap_err();
        assert_eq!(err, SceneError::InvariantViolation(Invariant::VariantChange(a)));
    }

    #[test]
    fn reparent_into_descendant_is_rejected() {
        let mut store = SceneStore::default();
        let outer = store.add_element(section(0.0, 0.0, 500.0, 500.0)).unwrap();
        let inner = store
            .add_element(section(10.0, 10.0, 100.0, 100.0).with_container(Some(outer)))
            .unwrap();
        let before = store.snapshot();
        let err = store
            .update_element(outer, ElementPatch::new().container(Some(inner)))
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::InvariantViolation(Invariant::CyclicContainment {
                child: outer,
                container: inner,
            })
        );
        assert_eq!(*store.state(), *before);
    }

    #[test]
    fn container_must_be_section() {
        let mut store = SceneStore::default();
        let a = store.add_element(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let err = store
            .add_element(rect(1.0, 1.0, 2.0, 2.0).with_container(Some(a)))
            .unwrap_err();
        assert_eq!(err, SceneError::InvariantViolation(Invariant::NotASection(a)));
    }

    #[test]
    fn depth_is_bounded() {
        let mut store = SceneStore::default();
        let mut parent = None;
        for _ in 0..=MAX_CONTAINER_DEPTH {
            let s = section(0.0, 0.0, 10.0, 10.0).with_container(parent);
            parent = Some(store.add_element(s).unwrap());
        }
        // The deepest section already has MAX_CONTAINER_DEPTH ancestors.
        let err = store
            .add_element(rect(0.0, 0.0, 1.0, 1.0).with_container(parent))
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::InvariantViolation(Invariant::DepthExceeded(_))
        ));
    }

    #[test]
    fn deleting_section_reparents_children_one_level_up() {
        let mut store = SceneStore::default();
        let outer = store.add_element(section(0.0, 0.0, 500.0, 500.0)).unwrap();
        let s = store
            .add_element(section(10.0, 10.0, 200.0, 200.0).with_container(Some(outer)))
            .unwrap();
        let a = store
            .add_element(rect(20.0, 20.0, 10.0, 10.0).with_container(Some(s)))
            .unwrap();
        store.remove_element(s).unwrap();
        assert!(store.contains(a));
        assert_eq!(store.get(a).unwrap().container_id, Some(outer));
        assert_eq!(store.children_of(outer), vec![a]);
    }

    #[test]
    fn detach_policy_frees_endpoint_at_last_anchor() {
        let mut store = SceneStore::new(ConnectorPolicy::Detach);
        let a = store.add_element(rect(0.0, 0.0, 100.0, 100.0)).unwrap();
        let b = store.add_element(rect(300.0, 0.0, 100.0, 100.0)).unwrap();
        let c = store
            .add_element(connector(
                Endpoint::bound(a, Anchor::Right),
                Endpoint::bound(b, Anchor::Left),
            ))
            .unwrap();
        store.remove_element(a).unwrap();
        let conn = store.get(c).unwrap().as_connector().unwrap().clone();
        assert_eq!(conn.start, Endpoint::free(Point::new(100.0, 50.0)));
        assert_eq!(conn.end, Endpoint::bound(b, Anchor::Left));
        assert_eq!(store.connectors_bound_to(b), vec![c]);
    }

    #[test]
    fn remove_policy_deletes_connector() {
        let mut store = SceneStore::new(ConnectorPolicy::Remove);
        let a = store.add_element(rect(0.0, 0.0, 100.0, 100.0)).unwrap();
        let b = store.add_element(rect(300.0, 0.0, 100.0, 100.0)).unwrap();
        let c = store
            .add_element(connector(
                Endpoint::bound(a, Anchor::Right),
                Endpoint::bound(b, Anchor::Left),
            ))
            .unwrap();
        store.set_selection(&[a, c]).unwrap();
        store.remove_element(a).unwrap();
        assert!(!store.contains(c));
        assert!(store.connectors_bound_to(b).is_empty());
        assert!(store.selection().is_empty());
    }

    #[test]
    fn moving_bound_element_refreshes_connector() {
        let mut store = SceneStore::default();
        let a = store.add_element(rect(0.0, 0.0, 100.0, 100.0)).unwrap();
        let c = store
            .add_element(connector(
                Endpoint::bound(a, Anchor::Right),
                Endpoint::free(Point::new(300.0, 50.0)),
            ))
            .unwrap();
        store
            .update_element(a, ElementPatch::new().transform(Transform::at(0.0, 100.0)))
            .unwrap();
        let route = &store.get(c).unwrap().as_connector().unwrap().points;
        assert_eq!(route[0], Point::new(100.0, 150.0));
    }

    #[test]
    fn binding_to_connector_is_rejected() {
        let mut store = SceneStore::default();
        let c1 = store
            .add_element(connector(
                Endpoint::free(Point::ZERO),
                Endpoint::free(Point::new(50.0, 0.0)),
            ))
            .unwrap();
        let err = store
            .add_element(connector(
                Endpoint::bound(c1, Anchor::Center),
                Endpoint::free(Point::new(0.0, 50.0)),
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::InvariantViolation(Invariant::InvalidBinding { .. })
        ));
    }

    #[test]
    fn reorder_keeps_z_dense() {
        let mut store = SceneStore::default();
        let ids: Vec<_> = (0..4)
            .map(|i| store.add_element(rect(i as f64, 0.0, 5.0, 5.0)).unwrap())
            .collect();
        store.reorder(ids[3], 0).unwrap();
        assert_eq!(
            store.state().layer_order(Layer::Main),
            vec![ids[3], ids[0], ids[1], ids[2]]
        );
        store.remove_element(ids[0]).unwrap();
        let zs: Vec<i64> = store
            .state()
            .layer_order(Layer::Main)
            .iter()
            .map(|id| store.get(*id).unwrap().z_index)
            .collect();
        assert_eq!(zs, vec![0, 1, 2]);
    }

    #[test]
    fn selection_rejects_unknown_ids() {
        let mut store = SceneStore::default();
        let a = store.add_element(rect(0.0, 0.0, 5.0, 5.0)).unwrap();
        let ghost = ElementId::intern("ghost_selection");
        assert_eq!(
            store.set_selection(&[a, ghost]).unwrap_err(),
            SceneError::NotFound(ghost)
        );
        store.set_selection(&[a, a]).unwrap();
        assert_eq!(store.selection(), &[a]);
    }

    #[test]
    fn journal_and_subscribers_see_transitions() {
        let mut store = SceneStore::default();
        let rx = store.subscribe();
        let a = store.add_element(rect(0.0, 0.0, 5.0, 5.0)).unwrap();
        store.set_selection(&[a]).unwrap();
        let journal = store.drain_journal();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].label, "add rectangle");
        assert_eq!(journal[0].changed_ids(), vec![a]);
        assert!(journal[1].is_selection_only());
        assert_eq!(rx.try_iter().count(), 2);

        store.restore(Arc::clone(&journal[0].before));
        assert!(store.drain_journal().is_empty());
        assert_eq!(rx.try_recv().unwrap().kind, TransitionKind::Restore);
        assert!(store.is_empty());
    }

    #[test]
    fn no_op_update_publishes_nothing() {
        let mut store = SceneStore::default();
        let a = store.add_element(rect(0.0, 0.0, 5.0, 5.0)).unwrap();
        store.drain_journal();
        store
            .update_element(a, ElementPatch::new().size(Size::new(5.0, 5.0)))
            .unwrap();
        assert!(store.drain_journal().is_empty());
    }

    #[test]
    fn batch_update_is_atomic() {
        let mut store = SceneStore::default();
        let a = store.add_element(rect(0.0, 0.0, 5.0, 5.0)).unwrap();
        let ghost = ElementId::intern("ghost_batch");
        let before = store.snapshot();
        let err = store
            .update_elements(vec![
                (a, ElementPatch::new().transform(Transform::at(50.0, 50.0))),
                (ghost, ElementPatch::new().transform(Transform::at(1.0, 1.0))),
            ])
            .unwrap_err();
        assert_eq!(err, SceneError::NotFound(ghost));
        assert_eq!(*store.state(), *before);
    }
}
