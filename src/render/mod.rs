//! Boundary to the rendering engine.
//!
//! The core hands the engine a [`Frame`] snapshot once per tick; how the
//! snapshot is drawn is up to the [`Renderer`] implementation.

pub mod common;
pub mod headless;

pub use common::{CameraParams, DrawItem, Frame, LightParams};
pub use headless::{FrameStats, HeadlessRenderer};

pub trait Renderer {
    fn render(&mut self, frame: &Frame) -> anyhow::Result<()>;
}
