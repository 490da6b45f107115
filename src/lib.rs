//! Core modules for interactive 3D shop dioramas.
//!
//! The crate builds a scene graph from procedural props, resolves pointer
//! clicks to the prop that was hit and animates the camera between named
//! poses in response. Rendering, windowing and font decoding stay outside
//! of the crate behind small traits so that everything here runs headless
//! and is easy to test.

pub mod assets;
pub mod builders;
pub mod camera;
pub mod color;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod orbit;
pub mod picking;
pub mod render;
pub mod render_loop;
pub mod scene;
pub mod transition;
pub mod viewport;

pub use assets::{AssetInbox, AssetLoader, FontFace, FsAssetLoader, MemoryAssetLoader, TextRequest};
pub use camera::{Camera, CameraPose, CameraRig, PoseOrientation, Projection};
pub use color::Color;
pub use context::{ClickOutcome, SceneContext, SceneSummary, TickReport};
pub use dispatch::{ClickAction, ClickDispatchTable};
pub use error::{AssetLoadError, InvalidGraphError, NotFound, UnknownPoseError};
pub use geometry::{Aabb, Geometry};
pub use input::{MouseButton, PointerEvent, PointerQueue};
pub use layout::SceneLayout;
pub use orbit::OrbitControls;
pub use picking::{PickResult, Picker, Ray};
pub use render::{CameraParams, Frame, HeadlessRenderer, LightParams, Renderer};
pub use render_loop::{Clock, ManualClock, RenderLoop, SystemClock};
pub use scene::{Entity, EntityId, EntityKind, Prefab, SceneGraph, Transform};
pub use transition::{
    Easing, LookAtPolicy, TransitionController, TransitionRequest, TransitionStatus,
};
pub use viewport::{StaticViewport, ViewportProvider, WindowViewport};
