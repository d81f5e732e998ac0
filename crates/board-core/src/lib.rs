pub mod document;
pub mod error;
pub mod geometry;
pub mod id;
pub mod model;
pub mod relations;
pub mod store;

pub use document::{DocumentMetadata, FORMAT_VERSION, SceneDocument};
pub use error::{DocumentError, Invariant, SceneError};
pub use geometry::{Axis, Bounds, Point, Size, Transform};
pub use id::ElementId;
pub use model::{Element, ElementKind, ElementPatch, ElementTag, Layer};
pub use store::{
    ConnectorPolicy, MAX_CONTAINER_DEPTH, SceneState, SceneStore, Transition, TransitionKind,
};
