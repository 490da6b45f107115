use anyhow::{ensure, Result};
use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use log::trace;

use super::common::{CameraParams, Frame, LightParams};
use super::Renderer;

/// Renderer without a GPU. Encodes the same uniform data a GPU backend
/// would upload into a staging buffer and keeps statistics about it.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    staging: Vec<u8>,
    stats: FrameStats,
    last_camera: Option<CameraParams>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub draws: usize,
    pub lights: usize,
    pub bytes: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Uniform bytes of the last frame: one global block followed by one
    /// block per draw.
    pub fn staging(&self) -> &[u8] {
        &self.staging
    }

    pub fn last_camera(&self) -> Option<&CameraParams> {
        self.last_camera.as_ref()
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        ensure!(
            frame.camera.view_proj.is_finite(),
            "camera matrix is not finite"
        );

        self.staging.clear();
        let globals = global_uniform(&frame.camera, frame.key_light());
        self.staging.extend_from_slice(bytes_of(&globals));

        for draw in &frame.draws {
            let constants =
                object_constants(draw.model, draw.material.color.rgb(), draw.material.opacity);
            self.staging.extend_from_slice(bytes_of(&constants));
        }

        self.stats = FrameStats {
            frames: self.stats.frames + 1,
            draws: frame.draws.len(),
            lights: frame.lights.len(),
            bytes: self.staging.len(),
        };
        self.last_camera = Some(frame.camera.clone());
        trace!("headless frame {:?}", self.stats);
        Ok(())
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light_position: [f32; 4],
    pub light_color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ObjectConstants {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub color: [f32; 4],
}

fn global_uniform(camera: &CameraParams, light: Option<&LightParams>) -> GlobalUniform {
    let (light_position, light_color) = match light {
        Some(light) => (light.position, light.color.extend(light.intensity)),
        None => (Vec3::new(3.0, 5.0, -3.0), Vec3::ONE.extend(1.0)),
    };
    GlobalUniform {
        view_proj: camera.view_proj.to_cols_array_2d(),
        camera_position: camera.position.extend(1.0).into(),
        light_position: light_position.extend(1.0).into(),
        light_color: light_color.into(),
    }
}

fn object_constants(model: Mat4, color: Vec3, opacity: f32) -> ObjectConstants {
    let normal = Mat3::from_mat4(model).inverse().transpose();
    ObjectConstants {
        model: model.to_cols_array_2d(),
        normal: mat3_to_3x4(normal),
        color: color.extend(opacity).into(),
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use glam::Quat;

    use super::*;
    use crate::builders;
    use crate::camera::{Camera, Projection};
    use crate::color::Color;
    use crate::scene::SceneGraph;

    #[test]
    fn encodes_one_block_per_draw() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        graph
            .spawn(root, &builders::skateboard(Color::from_hex(0), Color::from_hex(0xffffff)))
            .unwrap();
        let camera = Camera::new(Vec3::new(0.0, 5.0, 10.0), Quat::IDENTITY, Projection::default());
        let frame = Frame::capture(&graph, &camera, 1.0);

        let mut renderer = HeadlessRenderer::new();
        renderer.render(&frame).unwrap();
        renderer.render(&frame).unwrap();

        let stats = renderer.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.draws, 7);
        assert_eq!(
            stats.bytes,
            size_of::<GlobalUniform>() + 7 * size_of::<ObjectConstants>()
        );
        assert_eq!(renderer.staging().len(), stats.bytes);
        assert_eq!(renderer.last_camera().unwrap().position, camera.position);
    }

    #[test]
    fn uniform_layout_matches_shader_blocks() {
        assert_eq!(size_of::<GlobalUniform>(), 112);
        assert_eq!(size_of::<ObjectConstants>(), 128);
    }
}
