//! Undo/redo history.
//!
//! Entries are `(before, after)` snapshot pairs taken from store
//! transitions, so undo and redo are a single pointer swap and restore the
//! exact recorded state.
//!
//! Gestures use **batching**: the state is captured when the outermost
//! batch opens and again when it closes, and everything in between becomes
//! one entry. A batch that changed nothing pushes nothing.

use board_core::store::{SceneState, SceneStore, Transition, TransitionKind};
use std::sync::Arc;

/// One undoable unit.
#[derive(Debug, Clone)]
pub struct Entry {
    pub label: String,
    pub before: Arc<SceneState>,
    pub after: Arc<SceneState>,
}

#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Entry>,
    redo_stack: Vec<Entry>,
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    batch_label: String,
    batch_before: Option<Arc<SceneState>>,
    /// Whether an edit landed inside the current batch.
    batch_dirty: bool,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_label: String::new(),
            batch_before: None,
            batch_dirty: false,
        }
    }

    /// Open a batch. Only the outermost call captures the state and label.
    pub fn begin_batch(&mut self, label: &str, store: &SceneStore) {
        if self.batch_depth == 0 {
            self.batch_before = Some(store.snapshot());
            self.batch_label = label.to_string();
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
    }

    /// Close a batch. When the outermost batch closes after an edit, push
    /// one entry spanning the whole batch.
    pub fn end_batch(&mut self, store: &SceneStore) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        let before = self.batch_before.take();
        if self.batch_dirty
            && let Some(before) = before
        {
            let after = store.snapshot();
            if *before != *after {
                let label = std::mem::take(&mut self.batch_label);
                self.push(Entry {
                    label,
                    before,
                    after,
                });
            }
        }
        self.batch_dirty = false;
    }

    /// Abandon the current batch, rolling the store back if anything in it
    /// was applied. Returns whether a rollback happened.
    pub fn abort_batch(&mut self, store: &mut SceneStore) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth = 0;
        let dirty = std::mem::take(&mut self.batch_dirty);
        let before = self.batch_before.take();
        match before {
            Some(before) if dirty || *before != *store.state() => {
                store.restore(before);
                true
            }
            _ => false,
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Feed one journaled transition.
    pub fn record(&mut self, transition: Transition) {
        if transition.kind != TransitionKind::Edit {
            return;
        }
        if self.batch_depth > 0 {
            self.batch_dirty = true;
            return;
        }
        self.push(Entry {
            label: transition.label,
            before: transition.before,
            after: transition.after,
        });
    }

    fn push(&mut self, entry: Entry) {
        log::debug!("history: push {:?}", entry.label);
        self.undo_stack.push(entry);
        if self.undo_stack.len() > self.max_depth {
            let evicted = self.undo_stack.remove(0);
            log::debug!("history: evicted {:?} (depth {})", evicted.label, self.max_depth);
        }
        self.redo_stack.clear();
    }

    /// Restore the state before the last entry. Returns its label.
    pub fn undo(&mut self, store: &mut SceneStore) -> Option<String> {
        if self.in_batch() {
            return None;
        }
        let entry = self.undo_stack.pop()?;
        store.restore(Arc::clone(&entry.before));
        let label = entry.label.clone();
        self.redo_stack.push(entry);
        Some(label)
    }

    /// Re-apply the last undone entry. Returns its label.
    pub fn redo(&mut self, store: &mut SceneStore) -> Option<String> {
        if self.in_batch() {
            return None;
        }
        let entry = self.redo_stack.pop()?;
        store.restore(Arc::clone(&entry.after));
        let label = entry.label.clone();
        self.undo_stack.push(entry);
        Some(label)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable entries.
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.label.as_str())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_before = None;
        self.batch_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_core::geometry::{Bounds, Transform};
    use board_core::id::ElementId;
    use board_core::model::{Element, ElementKind, ElementPatch};

    fn add_rect(store: &mut SceneStore, history: &mut History, x: f64) -> ElementId {
        let id = store
            .add_element(Element::in_bounds(
                ElementKind::Rectangle { corner_radius: 0.0 },
                Bounds::new(x, 0.0, 10.0, 10.0),
            ))
            .unwrap();
        for t in store.drain_journal() {
            history.record(t);
        }
        id
    }

    fn move_to(store: &mut SceneStore, history: &mut History, id: ElementId, x: f64) {
        store
            .update_element(id, ElementPatch::new().transform(Transform::at(x, 0.0)))
            .unwrap();
        for t in store.drain_journal() {
            history.record(t);
        }
    }

    #[test]
    fn undo_redo_restore_exact_snapshots() {
        let mut store = SceneStore::default();
        let mut history = History::new(10);
        let empty = store.snapshot();
        add_rect(&mut store, &mut history, 0.0);
        let one = store.snapshot();

        assert_eq!(history.undo(&mut store).as_deref(), Some("add rectangle"));
        assert!(Arc::ptr_eq(&store.snapshot(), &empty));
        assert_eq!(history.redo(&mut store).as_deref(), Some("add rectangle"));
        assert!(Arc::ptr_eq(&store.snapshot(), &one));
        assert!(!history.can_redo());
    }

    #[test]
    fn batch_coalesces_into_one_entry() {
        let mut store = SceneStore::default();
        let mut history = History::new(10);
        let id = add_rect(&mut store, &mut history, 0.0);
        let before = store.snapshot();

        history.begin_batch("move", &store);
        history.begin_batch("nested", &store);
        move_to(&mut store, &mut history, id, 5.0);
        history.end_batch(&store);
        move_to(&mut store, &mut history, id, 20.0);
        history.end_batch(&store);

        assert_eq!(history.len(), 2);
        assert_eq!(history.undo_label(), Some("move"));
        history.undo(&mut store);
        assert!(Arc::ptr_eq(&store.snapshot(), &before));
    }

    #[test]
    fn empty_batch_pushes_nothing() {
        let mut store = SceneStore::default();
        let mut history = History::new(10);
        history.begin_batch("move", &store);
        history.end_batch(&store);
        assert!(history.is_empty());
    }

    #[test]
    fn selection_only_changes_are_skipped() {
        let mut store = SceneStore::default();
        let mut history = History::new(10);
        let id = add_rect(&mut store, &mut history, 0.0);
        store.set_selection(&[id]).unwrap();
        for t in store.drain_journal() {
            history.record(t);
        }
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn new_commit_clears_redo() {
        let mut store = SceneStore::default();
        let mut history = History::new(10);
        add_rect(&mut store, &mut history, 0.0);
        history.undo(&mut store);
        assert!(history.can_redo());
        add_rect(&mut store, &mut history, 50.0);
        assert!(!history.can_redo());
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut store = SceneStore::default();
        let mut history = History::new(2);
        let id = add_rect(&mut store, &mut history, 0.0);
        move_to(&mut store, &mut history, id, 10.0);
        move_to(&mut store, &mut history, id, 20.0);
        assert_eq!(history.len(), 2);
        history.undo(&mut store);
        history.undo(&mut store);
        assert!(history.undo(&mut store).is_none());
        // The add was evicted, so the element is still there.
        assert!(store.contains(id));
    }

    #[test]
    fn abort_rolls_back() {
        let mut store = SceneStore::default();
        let mut history = History::new(10);
        let id = add_rect(&mut store, &mut history, 0.0);
        let before = store.snapshot();
        history.begin_batch("move", &store);
        move_to(&mut store, &mut history, id, 40.0);
        assert!(history.abort_batch(&mut store));
        assert!(Arc::ptr_eq(&store.snapshot(), &before));
        assert!(!history.in_batch());
        assert_eq!(history.len(), 1);
    }
}
