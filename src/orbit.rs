use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};

use crate::camera::Camera;
use crate::input::{MouseButton, PointerEvent};

const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Free-look camera controls: dragging with the left button orbits around
/// `target`, dragging with the right button pans it, the wheel zooms.
///
/// The caller decides whether the controls may touch the camera; they are
/// never applied while a transition owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            rotate_speed: 0.005,
            zoom_speed: 0.5,
            pan_speed: 0.01,
            min_distance: 0.5,
            max_distance: 200.0,
        }
    }
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Applies one pointer event to `camera`. Returns `false` when the event
    /// is not a camera gesture (clicks).
    pub fn apply(&mut self, event: &PointerEvent, camera: &mut Camera) -> bool {
        match *event {
            PointerEvent::Drag { delta, button } if button == MouseButton::RIGHT => {
                self.pan(delta, camera);
            }
            PointerEvent::Drag { delta, .. } => {
                self.orbit(
                    camera,
                    -delta.x * self.rotate_speed,
                    delta.y * self.rotate_speed,
                    0.0,
                );
            }
            PointerEvent::Wheel { delta } => {
                self.orbit(camera, 0.0, 0.0, delta * self.zoom_speed);
            }
            PointerEvent::Click { .. } => return false,
        }
        true
    }

    fn orbit(&self, camera: &mut Camera, yaw: f32, pitch: f32, zoom: f32) {
        let offset = camera.position - self.target;
        let distance = offset.length().max(f32::EPSILON);
        let current_yaw = offset.x.atan2(offset.z);
        let current_pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();

        let yaw = current_yaw + yaw;
        let pitch = (current_pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let distance = (distance + zoom).clamp(self.min_distance, self.max_distance);

        let direction = Vec3::new(
            pitch.cos() * yaw.sin(),
            pitch.sin(),
            pitch.cos() * yaw.cos(),
        );
        camera.position = self.target + direction * distance;
        camera.look_at(self.target);
    }

    fn pan(&mut self, delta: Vec2, camera: &mut Camera) {
        let right = camera.orientation * Vec3::X;
        let up = camera.orientation * Vec3::Y;
        let shift = (right * -delta.x + up * delta.y) * self.pan_speed;
        self.target += shift;
        camera.position += shift;
    }
}
