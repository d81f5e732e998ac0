//! Relation index over the flat element table.
//!
//! A directed graph keyed by element id with two kinds of edges:
//! `section → child` ([`Link::Contains`]) and `connector → target`
//! ([`Link::Binds`]). The element table stays the source of truth; this
//! index answers "who is inside / attached to X" without a scan.

use crate::id::ElementId;
use crate::model::Element;
use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Contains,
    Binds,
}

#[derive(Debug, Clone, Default)]
pub struct Relations {
    graph: DiGraphMap<ElementId, Link>,
}

impl Relations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from scratch.
    pub fn rebuild<'a>(elements: impl IntoIterator<Item = &'a Element>) -> Self {
        let mut rel = Self::new();
        for el in elements {
            rel.insert(el);
        }
        rel
    }

    /// Register an element and its outgoing links.
    pub fn insert(&mut self, el: &Element) {
        self.graph.add_node(el.id);
        if let Some(container) = el.container_id {
            self.graph.add_edge(container, el.id, Link::Contains);
        }
        for target in el.bound_elements() {
            self.graph.add_edge(el.id, target, Link::Binds);
        }
    }

    pub fn remove(&mut self, id: ElementId) {
        self.graph.remove_node(id);
    }

    pub fn set_container(&mut self, child: ElementId, old: Option<ElementId>, new: Option<ElementId>) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            self.graph.remove_edge(old, child);
        }
        if let Some(new) = new {
            self.graph.add_edge(new, child, Link::Contains);
        }
    }

    /// Replace a connector's binding edges.
    pub fn set_bindings(&mut self, connector: ElementId, targets: &[ElementId]) {
        let stale: Vec<ElementId> = self
            .graph
            .neighbors_directed(connector, Direction::Outgoing)
            .filter(|t| self.graph.edge_weight(connector, *t) == Some(&Link::Binds))
            .collect();
        for t in stale {
            self.graph.remove_edge(connector, t);
        }
        for &t in targets {
            self.graph.add_edge(connector, t, Link::Binds);
        }
    }

    /// Direct children of a section, in id order.
    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.linked(id, Direction::Outgoing, Link::Contains)
    }

    /// Connectors with at least one endpoint bound to `id`, in id order.
    pub fn connectors_bound_to(&self, id: ElementId) -> Vec<ElementId> {
        self.linked(id, Direction::Incoming, Link::Binds)
    }

    fn linked(&self, id: ElementId, dir: Direction, link: Link) -> Vec<ElementId> {
        if !self.graph.contains_node(id) {
            return Vec::new();
        }
        let mut out: Vec<ElementId> = self
            .graph
            .neighbors_directed(id, dir)
            .filter(|other| {
                let weight = match dir {
                    Direction::Outgoing => self.graph.edge_weight(id, *other),
                    Direction::Incoming => self.graph.edge_weight(*other, id),
                };
                weight == Some(&link)
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
