use std::path::PathBuf;

use thiserror::Error;

use crate::scene::EntityId;

/// Rejected attach/detach/remove on the scene graph. The graph is left
/// untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidGraphError {
    #[error("entity {child:?} already has a parent and must be detached first")]
    AlreadyParented { child: EntityId },
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: EntityId, child: EntityId },
    #[error("entity {0:?} does not exist in this scene")]
    MissingEntity(EntityId),
    #[error("the scene root cannot be re-parented, detached or removed")]
    RootImmutable,
}

/// Name lookup found no entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no entity named `{0}`")]
pub struct NotFound(pub String);

/// A camera pose name that was never registered with the rig.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown camera pose `{0}`")]
pub struct UnknownPoseError(pub String);

/// Failure to load a font (or other text asset).
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("unable to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is empty")]
    Empty { path: PathBuf },
    #[error("no asset registered under `{0}`")]
    Missing(String),
}
