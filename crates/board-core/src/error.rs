//! Error types for scene mutations and document encoding.

use crate::id::ElementId;
use crate::model::Layer;
use crate::store::MAX_CONTAINER_DEPTH;
use thiserror::Error;

/// A rejected scene mutation. The scene is unchanged when this is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("element {0} not found")]
    NotFound(ElementId),
    #[error("invariant violation: {0}")]
    InvariantViolation(Invariant),
}

/// The scene rule a mutation would have broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Invariant {
    #[error("id {0} is already in use")]
    DuplicateId(ElementId),
    #[error("{child} cannot be placed inside its own descendant {container}")]
    CyclicContainment {
        child: ElementId,
        container: ElementId,
    },
    #[error("{0} is not a section")]
    NotASection(ElementId),
    #[error("placing {0} would nest sections deeper than {max}", max = MAX_CONTAINER_DEPTH)]
    DepthExceeded(ElementId),
    #[error("the variant of {0} cannot change")]
    VariantChange(ElementId),
    #[error("{0} has no text content")]
    NoText(ElementId),
    #[error("connector {connector} cannot bind to {target}")]
    InvalidBinding {
        connector: ElementId,
        target: ElementId,
    },
    #[error("{id} is on layer {found:?} but its variant belongs on {expected:?}")]
    WrongLayer {
        id: ElementId,
        expected: Layer,
        found: Layer,
    },
    #[error("z-index {z} appears twice on layer {layer:?}")]
    DuplicateZIndex { layer: Layer, z: i64 },
}

impl From<Invariant> for SceneError {
    fn from(inv: Invariant) -> Self {
        SceneError::InvariantViolation(inv)
    }
}

/// Failure to encode or decode a [`crate::document::SceneDocument`].
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("messagepack encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("messagepack decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("unsupported document version {found} (newest known is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("invalid document: {0}")]
    Invalid(#[from] SceneError),
}
