//! Serialized scene snapshots exchanged with the persistence collaborator.
//!
//! A [`SceneDocument`] is the element list in paint order (layer, then z)
//! plus metadata. Selection is session state and is not persisted. Two
//! encodings are supported: pretty JSON for humans and diffs, MessagePack
//! for compact storage.

use crate::error::DocumentError;
use crate::model::Element;
use crate::store::SceneState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Newest document version this crate reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: String,
    /// Host-defined key/value pairs, kept verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl DocumentMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            properties: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub version: u32,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    pub elements: Vec<Element>,
}

impl SceneDocument {
    /// Capture a scene state in paint order.
    pub fn from_state(state: &SceneState, metadata: DocumentMetadata) -> Self {
        Self {
            version: FORMAT_VERSION,
            metadata,
            elements: state
                .elements_in_paint_order()
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    /// Validate and build a scene state from this document.
    pub fn to_state(&self) -> Result<SceneState, DocumentError> {
        Ok(SceneState::from_elements(self.elements.clone())?)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        let doc: SceneDocument = serde_json::from_str(text)?;
        doc.check_version()
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, DocumentError> {
        let doc: SceneDocument = rmp_serde::from_slice(bytes)?;
        doc.check_version()
    }

    fn check_version(self) -> Result<Self, DocumentError> {
        if self.version > FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion {
                found: self.version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::model::ElementKind;
    use crate::store::SceneStore;

    #[test]
    fn future_version_is_rejected() {
        let doc = SceneDocument {
            version: FORMAT_VERSION + 1,
            metadata: DocumentMetadata::default(),
            elements: vec![],
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(matches!(
            SceneDocument::from_json(&json),
            Err(DocumentError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn elements_are_written_in_paint_order() {
        let mut store = SceneStore::default();
        let back = store
            .add_element(Element::in_bounds(
                ElementKind::Ellipse,
                Bounds::new(0.0, 0.0, 10.0, 10.0),
            ))
            .unwrap();
        let front = store
            .add_element(Element::in_bounds(
                ElementKind::Triangle,
                Bounds::new(0.0, 0.0, 10.0, 10.0),
            ))
            .unwrap();
        store.reorder(front, 0).unwrap();
        let doc = SceneDocument::from_state(store.state(), DocumentMetadata::titled("t"));
        let order: Vec<_> = doc.elements.iter().map(|e| e.id).collect();
        assert_eq!(order, vec![front, back]);
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(
            SceneDocument::from_json("{ not json"),
            Err(DocumentError::Json(_))
        ));
    }
}
