use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::geometry::Geometry;
use crate::scene::{EntityId, EntityKind, Material, SceneGraph, ShadowOptions};

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

impl CameraParams {
    pub fn from_camera(camera: &Camera, aspect: f32) -> Self {
        Self {
            view_proj: camera.view_proj(aspect),
            position: camera.position,
        }
    }
}

/// Lighting state consumed by the renderer's uniform buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct LightParams {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub distance: f32,
}

/// One mesh to draw, with its transform already resolved to world space.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    pub entity: EntityId,
    pub model: Mat4,
    pub geometry: Geometry,
    pub material: Material,
    pub shadows: ShadowOptions,
}

/// Everything the renderer needs for one frame. Only entities reachable
/// from the scene root are captured.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub camera: CameraParams,
    pub lights: Vec<LightParams>,
    pub draws: Vec<DrawItem>,
}

impl Frame {
    pub fn capture(graph: &SceneGraph, camera: &Camera, aspect: f32) -> Self {
        let mut lights = Vec::new();
        let mut draws = Vec::new();

        for id in graph.preorder(graph.root()) {
            let (Some(entity), Ok(model)) = (graph.get(id), graph.world_matrix(id)) else {
                continue;
            };
            match &entity.kind {
                EntityKind::Mesh { geometry, material } => draws.push(DrawItem {
                    entity: id,
                    model,
                    geometry: geometry.clone(),
                    material: *material,
                    shadows: entity.shadows,
                }),
                EntityKind::PointLight(light) => lights.push(LightParams {
                    position: model.transform_point3(Vec3::ZERO),
                    color: light.color.rgb(),
                    intensity: light.intensity,
                    distance: light.distance,
                }),
                EntityKind::Group => {}
            }
        }

        Self {
            camera: CameraParams::from_camera(camera, aspect),
            lights,
            draws,
        }
    }

    /// The brightest light, used by renderers with a single light slot.
    pub fn key_light(&self) -> Option<&LightParams> {
        self.lights
            .iter()
            .max_by(|a, b| a.intensity.total_cmp(&b.intensity))
    }
}
