use std::collections::HashMap;

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::UnknownPoseError;

/// Perspective parameters shared by every pose of a rig.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov_y_degrees.to_radians(),
            aspect.max(0.01),
            self.near,
            self.far,
        )
    }
}

/// Live camera state. Looks down its local -Z axis with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub orientation: Quat,
    pub projection: Projection,
}

impl Camera {
    pub fn new(position: Vec3, orientation: Quat, projection: Projection) -> Self {
        Self {
            position,
            orientation,
            projection,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Turns the camera so that it faces `target`.
    pub fn look_at(&mut self, target: Vec3) {
        if let Some(orientation) = look_rotation(self.position, target) {
            self.orientation = orientation;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        self.projection.matrix(aspect)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

/// Rotation that points -Z from `eye` towards `target`. `None` when the two
/// points coincide.
pub fn look_rotation(eye: Vec3, target: Vec3) -> Option<Quat> {
    let forward = target - eye;
    if forward.length_squared() <= f32::EPSILON {
        return None;
    }
    let forward = forward.normalize();
    let up = if forward.cross(Vec3::Y).length_squared() <= 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let right = forward.cross(up).normalize();
    let up = right.cross(forward);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize())
}

/// How a pose is aimed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PoseOrientation {
    /// Euler XYZ angles in radians.
    Euler(Vec3),
    /// Face this world point.
    LookAt(Vec3),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub orientation: PoseOrientation,
}

impl CameraPose {
    pub fn euler(position: Vec3, rotation: Vec3) -> Self {
        Self {
            position,
            orientation: PoseOrientation::Euler(rotation),
        }
    }

    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            orientation: PoseOrientation::LookAt(target),
        }
    }

    pub fn rotation(&self) -> Quat {
        match self.orientation {
            PoseOrientation::Euler(angles) => {
                Quat::from_euler(EulerRot::XYZ, angles.x, angles.y, angles.z)
            }
            PoseOrientation::LookAt(target) => {
                look_rotation(self.position, target).unwrap_or(Quat::IDENTITY)
            }
        }
    }
}

/// Named camera poses plus the single live camera the renderer draws
/// from. The renderer always reads [`CameraRig::active_camera`], including
/// while a transition is moving it.
#[derive(Debug, Clone)]
pub struct CameraRig {
    poses: HashMap<String, CameraPose>,
    active_pose: String,
    camera: Camera,
    free_look: bool,
}

impl CameraRig {
    /// Creates a rig whose camera starts at `initial`, registered as
    /// `name`.
    pub fn new(name: impl Into<String>, initial: CameraPose, projection: Projection) -> Self {
        let name = name.into();
        let camera = Camera::new(initial.position, initial.rotation(), projection);
        let mut poses = HashMap::new();
        poses.insert(name.clone(), initial);
        Self {
            poses,
            active_pose: name,
            camera,
            free_look: true,
        }
    }

    /// Registers (or replaces) a pose.
    pub fn register(&mut self, name: impl Into<String>, pose: CameraPose) {
        self.poses.insert(name.into(), pose);
    }

    pub fn pose(&self, name: &str) -> Result<&CameraPose, UnknownPoseError> {
        self.poses
            .get(name)
            .ok_or_else(|| UnknownPoseError(name.to_string()))
    }

    pub fn pose_names(&self) -> impl Iterator<Item = &str> {
        self.poses.keys().map(String::as_str)
    }

    /// Cuts the camera to `name` without animating.
    pub fn set_active(&mut self, name: &str) -> Result<(), UnknownPoseError> {
        let pose = *self.pose(name)?;
        self.camera.position = pose.position;
        self.camera.orientation = pose.rotation();
        self.active_pose = name.to_string();
        debug!("camera cut to pose {name}");
        Ok(())
    }

    /// Records that the camera has arrived at `name` without touching it.
    pub(crate) fn mark_active(&mut self, name: &str) {
        self.active_pose = name.to_string();
    }

    pub fn active_pose_name(&self) -> &str {
        &self.active_pose
    }

    pub fn active_camera(&self) -> &Camera {
        &self.camera
    }

    pub fn active_camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn free_look_enabled(&self) -> bool {
        self.free_look
    }

    pub fn set_free_look(&mut self, enabled: bool) {
        if self.free_look != enabled {
            debug!("free-look {}", if enabled { "enabled" } else { "disabled" });
        }
        self.free_look = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> CameraRig {
        let mut rig = CameraRig::new(
            "default",
            CameraPose::euler(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO),
            Projection::default(),
        );
        rig.register(
            "front-view",
            CameraPose::looking_at(Vec3::new(9.0, 4.0, 10.0), Vec3::new(2.0, 1.5, -10.0)),
        );
        rig
    }

    #[test]
    fn set_active_snaps_camera() {
        let mut rig = rig();
        rig.set_active("front-view").unwrap();
        assert_eq!(rig.active_pose_name(), "front-view");
        let camera = rig.active_camera();
        assert_eq!(camera.position, Vec3::new(9.0, 4.0, 10.0));
        let expected = (Vec3::new(2.0, 1.5, -10.0) - camera.position).normalize();
        assert!(camera.forward().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn unknown_pose_is_an_error() {
        let mut rig = rig();
        assert_eq!(
            rig.set_active("nowhere"),
            Err(UnknownPoseError("nowhere".to_string()))
        );
        assert_eq!(rig.active_pose_name(), "default");
    }

    #[test]
    fn look_rotation_matches_look_at_view() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let target = Vec3::new(-4.0, 0.5, -7.0);
        let mut camera = Camera::new(eye, Quat::IDENTITY, Projection::default());
        camera.look_at(target);
        let expected = Mat4::look_at_rh(eye, target, Vec3::Y);
        assert!(camera.view_matrix().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn looking_straight_down_is_well_defined() {
        let rotation = look_rotation(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO).unwrap();
        assert!((rotation * Vec3::NEG_Z).abs_diff_eq(Vec3::NEG_Y, 1e-5));
        assert!(look_rotation(Vec3::ONE, Vec3::ONE).is_none());
    }

    #[test]
    fn default_camera_faces_negative_z() {
        let rig = rig();
        assert!(rig.active_camera().forward().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(rig.free_look_enabled());
    }
}
