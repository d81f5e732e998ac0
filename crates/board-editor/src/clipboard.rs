//! Copy / paste of element subtrees as text.
//!
//! A copy takes the chosen elements plus everything nested in them. Links
//! that point outside the copied set are cut: connector ends bound to an
//! outside element become free points where they were attached, and
//! containers outside the set are dropped. Paste gives every element a
//! fresh id and rewrites container and connector references to match.

use crate::error::ClipboardError;
use board_core::error::SceneError;
use board_core::id::ElementId;
use board_core::model::{Element, ElementKind, Endpoint};
use board_core::store::{SceneState, SceneStore};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const CLIPBOARD_FORMAT: &str = "board/elements";
pub const CLIPBOARD_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub format: String,
    pub version: u32,
    /// Copied elements in paint order.
    pub elements: Vec<Element>,
}

impl ClipboardPayload {
    /// Capture `ids` and their descendants from `state`.
    pub fn copy(state: &SceneState, ids: &[ElementId]) -> Self {
        let mut set: HashSet<ElementId> = HashSet::new();
        for id in ids {
            if state.contains(*id) {
                set.insert(*id);
                set.extend(state.descendants_of(*id));
            }
        }

        let elements = state
            .elements_in_paint_order()
            .into_iter()
            .filter(|el| set.contains(&el.id))
            .map(|el| {
                let mut el = el.clone();
                if el.container_id.is_some_and(|c| !set.contains(&c)) {
                    el.container_id = None;
                }
                cut_external_bindings(state, &mut el, &set);
                el
            })
            .collect();

        Self {
            format: CLIPBOARD_FORMAT.to_string(),
            version: CLIPBOARD_VERSION,
            elements,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn to_text(&self) -> Result<String, ClipboardError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self, ClipboardError> {
        let payload: ClipboardPayload = serde_json::from_str(text)?;
        if payload.format != CLIPBOARD_FORMAT {
            return Err(ClipboardError::Format {
                found: payload.format,
            });
        }
        if payload.version > CLIPBOARD_VERSION {
            return Err(ClipboardError::Version {
                found: payload.version,
                supported: CLIPBOARD_VERSION,
            });
        }
        Ok(payload)
    }

    /// Add the payload to `store` with fresh ids, shifted by `offset`.
    /// Returns the new ids of the top-level pasted elements.
    ///
    /// Each element is a separate store mutation; callers wrap the call in
    /// a history batch so a failure can be rolled back as a whole.
    pub fn paste(&self, store: &mut SceneStore, offset: (f64, f64)) -> Result<Vec<ElementId>, SceneError> {
        let remap: HashMap<ElementId, ElementId> = self
            .elements
            .iter()
            .map(|el| (el.id, ElementId::with_prefix(el.tag().name())))
            .collect();

        let by_id: HashMap<ElementId, &Element> = self.elements.iter().map(|e| (e.id, e)).collect();
        // Containers before members, connectors after their targets.
        let mut order: Vec<(bool, usize, usize)> = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, el)| (el.is_connector(), depth(&by_id, el), i))
            .collect();
        order.sort();

        let mut roots = Vec::new();
        for (_, _, i) in order {
            let src = &self.elements[i];
            let Some(&new_id) = remap.get(&src.id) else {
                continue;
            };
            let mut el = src.clone();
            el.id = new_id;
            el.container_id = src.container_id.and_then(|c| remap.get(&c).copied());
            if let ElementKind::Connector(c) = &mut el.kind {
                for ep in c.endpoints_mut() {
                    if let Endpoint::Bound { element, .. } = ep
                        && let Some(mapped) = remap.get(element)
                    {
                        *element = *mapped;
                    }
                }
            }
            el.translate(offset.0, offset.1);
            if el.container_id.is_none() {
                roots.push(new_id);
            }
            store.add_element(el)?;
        }
        log::debug!("pasted {} elements", remap.len());
        Ok(roots)
    }
}

/// Number of containers above `el` that are part of the same payload.
fn depth(by_id: &HashMap<ElementId, &Element>, el: &Element) -> usize {
    let mut depth = 0;
    let mut cur = el.container_id;
    while let Some(c) = cur {
        let Some(parent) = by_id.get(&c) else {
            break;
        };
        depth += 1;
        if depth > by_id.len() {
            break;
        }
        cur = parent.container_id;
    }
    depth
}

/// Free any connector end bound to an element outside `set`, at the
/// position it currently resolves to.
fn cut_external_bindings(state: &SceneState, el: &mut Element, set: &HashSet<ElementId>) {
    let ElementKind::Connector(c) = &mut el.kind else {
        return;
    };
    let ends = c.resolved_ends();
    for (i, ep) in c.endpoints_mut().into_iter().enumerate() {
        let Some(target) = ep.bound_element() else {
            continue;
        };
        if set.contains(&target) {
            continue;
        }
        let at = state
            .resolve_endpoint(ep)
            .or_else(|| ends.map(|(s, e)| if i == 0 { s } else { e }));
        if let Some(point) = at {
            *ep = Endpoint::free(point);
        }
    }
}
