//! Timed camera moves between registered poses.
//!
//! A [`TransitionController`] owns at most one transition. Starting a new
//! one replaces the current one outright (last writer wins); the replaced
//! transition's completion callback is dropped without being called and the
//! camera continues from wherever it was at that moment.

use std::time::Duration;

use glam::{Quat, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::camera::{look_rotation, CameraRig};
use crate::error::UnknownPoseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    CubicOut,
}

impl Easing {
    /// Maps normalised time to normalised progress. Both ends are fixed:
    /// `apply(0) == 0` and `apply(1) == 1`.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticIn => t * t,
            Easing::QuadraticOut => t * (2.0 - t),
            Easing::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Some(Easing::Linear),
            "quadratic-in" => Some(Easing::QuadraticIn),
            "quadratic-out" => Some(Easing::QuadraticOut),
            "quadratic-in-out" => Some(Easing::QuadraticInOut),
            "cubic-out" => Some(Easing::CubicOut),
            _ => None,
        }
    }
}

/// How the camera is aimed while it travels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LookAtPolicy {
    /// Slerp from the starting orientation to the pose's orientation.
    Interpolate,
    /// Re-aim at this point after every position update.
    Fixed(Vec3),
}

/// Runs once, on the tick the transition reaches its target.
pub type CompletionCallback = Box<dyn FnOnce(&mut CameraRig)>;

pub struct TransitionRequest {
    pub pose: String,
    pub duration: Duration,
    pub easing: Easing,
    pub look_at: LookAtPolicy,
    pub on_complete: Option<CompletionCallback>,
}

impl TransitionRequest {
    pub fn new(pose: impl Into<String>, duration: Duration) -> Self {
        Self {
            pose: pose.into(),
            duration,
            easing: Easing::default(),
            look_at: LookAtPolicy::Interpolate,
            on_complete: None,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.look_at = LookAtPolicy::Fixed(target);
        self
    }

    pub fn on_complete(mut self, callback: impl FnOnce(&mut CameraRig) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for TransitionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionRequest")
            .field("pose", &self.pose)
            .field("duration", &self.duration)
            .field("easing", &self.easing)
            .field("look_at", &self.look_at)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionStatus {
    Idle,
    InFlight { progress: f32 },
    /// Returned once, on the tick the target was reached.
    Completed { pose: String },
}

struct ActiveTransition {
    pose: String,
    from_position: Vec3,
    from_orientation: Quat,
    to_position: Vec3,
    to_orientation: Quat,
    look_at: LookAtPolicy,
    easing: Easing,
    started: Duration,
    duration: Duration,
    on_complete: Option<CompletionCallback>,
}

impl ActiveTransition {
    fn progress(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

#[derive(Default)]
pub struct TransitionController {
    active: Option<ActiveTransition>,
}

impl TransitionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Name of the pose the camera is currently heading to.
    pub fn target_pose(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.pose.as_str())
    }

    /// Starts moving the rig's camera towards `request.pose`, replacing any
    /// transition already in flight. Free-look is switched off until a
    /// completion callback turns it back on.
    pub fn begin(
        &mut self,
        rig: &mut CameraRig,
        request: TransitionRequest,
        now: Duration,
    ) -> Result<(), UnknownPoseError> {
        let target = *rig.pose(&request.pose)?;
        let camera = rig.active_camera();

        let to_orientation = match request.look_at {
            LookAtPolicy::Fixed(point) => {
                look_rotation(target.position, point).unwrap_or_else(|| target.rotation())
            }
            LookAtPolicy::Interpolate => target.rotation(),
        };

        if let Some(previous) = self.active.take() {
            debug!(
                "transition to {} superseded by {}",
                previous.pose, request.pose
            );
        }
        debug!(
            "transition to {} over {:?} ({:?})",
            request.pose, request.duration, request.easing
        );

        self.active = Some(ActiveTransition {
            pose: request.pose,
            from_position: camera.position,
            from_orientation: camera.orientation,
            to_position: target.position,
            to_orientation,
            look_at: request.look_at,
            easing: request.easing,
            started: now,
            duration: request.duration,
            on_complete: request.on_complete,
        });
        rig.set_free_look(false);
        Ok(())
    }

    /// Moves the camera to where it should be at `now`. Progress depends
    /// only on elapsed time, never on how often this is called.
    pub fn advance(&mut self, rig: &mut CameraRig, now: Duration) -> TransitionStatus {
        let Some(active) = self.active.as_ref() else {
            return TransitionStatus::Idle;
        };

        let progress = active.progress(now);
        if progress < 1.0 {
            let eased = active.easing.apply(progress);
            let camera = rig.active_camera_mut();
            camera.position = active.from_position.lerp(active.to_position, eased);
            match active.look_at {
                LookAtPolicy::Fixed(point) => camera.look_at(point),
                LookAtPolicy::Interpolate => {
                    camera.orientation = active
                        .from_orientation
                        .slerp(active.to_orientation, eased)
                        .normalize();
                }
            }
            return TransitionStatus::InFlight { progress };
        }

        let Some(finished) = self.active.take() else {
            return TransitionStatus::Idle;
        };
        let camera = rig.active_camera_mut();
        camera.position = finished.to_position;
        camera.orientation = finished.to_orientation;
        rig.mark_active(&finished.pose);
        debug!("transition to {} complete", finished.pose);
        if let Some(callback) = finished.on_complete {
            callback(rig);
        }
        TransitionStatus::Completed {
            pose: finished.pose,
        }
    }
}

impl std::fmt::Debug for TransitionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionController")
            .field("target", &self.target_pose())
            .finish()
    }
}
