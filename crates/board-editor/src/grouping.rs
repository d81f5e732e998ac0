//! Section membership and z-order commands.
//!
//! Membership follows geometry: an element whose bounding box ends up
//! fully inside a section after a drag joins the topmost such section, and
//! leaves every section when dragged clear of them. A freshly drawn section
//! adopts what it encloses and sits beneath it.

use board_core::error::SceneError;
use board_core::geometry::Bounds;
use board_core::id::ElementId;
use board_core::model::ElementPatch;
use board_core::store::{SceneState, SceneStore};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    BringForward,
    SendBackward,
    BringToFront,
    SendToBack,
}

/// Topmost section that fully contains `bounds`, skipping `exclude`.
pub fn section_at(state: &SceneState, bounds: Bounds, exclude: &[ElementId]) -> Option<ElementId> {
    state
        .elements_in_paint_order()
        .into_iter()
        .rev()
        .find(|el| el.is_section() && !exclude.contains(&el.id) && el.bounds().contains(&bounds))
        .map(|el| el.id)
}

/// Pull the elements a new section encloses into it and restack the
/// section beneath them. Only siblings of the section move, so a section
/// drawn inside another takes over the outer section's enclosed members.
/// Returns the adopted ids.
pub fn adopt_contained(store: &mut SceneStore, section: ElementId) -> Result<Vec<ElementId>, SceneError> {
    let state = store.state();
    let sec = state.get(section).ok_or(SceneError::NotFound(section))?;
    let area = sec.bounds();
    let parent = sec.container_id;
    let ancestors = state.ancestors(section);

    let mut adopted: Vec<(i64, ElementId)> = state
        .elements()
        .filter(|el| {
            el.id != section
                && !el.is_connector()
                && el.container_id == parent
                && !ancestors.contains(&el.id)
                && area.contains(&el.bounds())
        })
        .map(|el| (el.z_index, el.id))
        .collect();
    if adopted.is_empty() {
        return Ok(Vec::new());
    }
    adopted.sort();
    let lowest_main = adopted
        .iter()
        .filter(|(_, id)| state.get(*id).is_some_and(|e| e.layer == sec.layer))
        .map(|(z, _)| *z)
        .min();
    let ids: Vec<ElementId> = adopted.into_iter().map(|(_, id)| id).collect();

    store.update_elements(
        ids.iter()
            .map(|id| (*id, ElementPatch::new().container(Some(section))))
            .collect(),
    )?;
    if let Some(z) = lowest_main {
        store.reorder(section, z)?;
    }
    log::debug!("section {section} adopted {} elements", ids.len());
    Ok(ids)
}

/// Re-evaluate membership of dragged elements. `moved` is the whole moved
/// set (selection plus descendants); only its roots are reparented.
pub fn reparent_after_drag(store: &mut SceneStore, moved: &[ElementId]) -> Result<usize, SceneError> {
    let state = store.state();
    let moved_set: HashSet<ElementId> = moved.iter().copied().collect();
    let mut patches = Vec::new();
    for &id in moved {
        let Some(el) = state.get(id) else {
            continue;
        };
        if el.is_connector() || el.container_id.is_some_and(|c| moved_set.contains(&c)) {
            continue;
        }
        let target = section_at(state, el.bounds(), moved);
        if target != el.container_id {
            patches.push((id, ElementPatch::new().container(target)));
        }
    }
    let n = patches.len();
    if n > 0 {
        store.update_elements(patches)?;
    }
    Ok(n)
}

/// Apply a z-order command to every id, preserving their relative order.
pub fn apply_z_order(store: &mut SceneStore, ids: &[ElementId], order: ZOrder) -> Result<(), SceneError> {
    let mut targets: Vec<(i64, ElementId)> = ids
        .iter()
        .map(|id| {
            store
                .get(*id)
                .map(|el| (el.z_index, *id))
                .ok_or(SceneError::NotFound(*id))
        })
        .collect::<Result<_, _>>()?;
    // Walk from the side the elements move towards so they don't leapfrog.
    match order {
        ZOrder::BringForward | ZOrder::SendToBack => targets.sort_by(|a, b| b.cmp(a)),
        ZOrder::SendBackward | ZOrder::BringToFront => targets.sort(),
    }
    for (_, id) in targets {
        let z = store.get(id).map_or(0, |el| el.z_index);
        let new_z = match order {
            ZOrder::BringForward => z + 1,
            ZOrder::SendBackward => z - 1,
            ZOrder::BringToFront => i64::MAX,
            ZOrder::SendToBack => 0,
        };
        store.reorder(id, new_z)?;
    }
    Ok(())
}
