use std::collections::HashMap;
use std::time::Duration;

use glam::Vec3;
use log::info;
use serde::{Deserialize, Serialize};

use crate::camera::CameraRig;
use crate::error::UnknownPoseError;
use crate::scene::EntityId;
use crate::transition::{Easing, TransitionController, TransitionRequest};

/// What clicking an addressable entity does to the camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickAction {
    pub pose: String,
    /// Keep the camera aimed at this point while it travels.
    pub look_at: Option<Vec3>,
    /// Free-look state applied once the camera arrives.
    pub free_look_on_arrival: bool,
    pub duration: Duration,
    pub easing: Easing,
}

impl ClickAction {
    pub fn new(pose: impl Into<String>) -> Self {
        Self {
            pose: pose.into(),
            look_at: None,
            free_look_on_arrival: false,
            duration: Duration::from_millis(2000),
            easing: Easing::QuadraticOut,
        }
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.look_at = Some(target);
        self
    }

    pub fn with_free_look_on_arrival(mut self, enabled: bool) -> Self {
        self.free_look_on_arrival = enabled;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    fn request(&self) -> TransitionRequest {
        let free_look = self.free_look_on_arrival;
        let request = TransitionRequest::new(self.pose.clone(), self.duration)
            .with_easing(self.easing)
            .on_complete(move |rig: &mut CameraRig| rig.set_free_look(free_look));
        match self.look_at {
            Some(target) => request.looking_at(target),
            None => request,
        }
    }
}

/// Maps addressable entities to camera actions. Entities without an entry
/// are inert when clicked.
#[derive(Debug, Clone, Default)]
pub struct ClickDispatchTable {
    actions: HashMap<EntityId, ClickAction>,
}

impl ClickDispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `entity`, replacing any previous binding.
    pub fn insert(&mut self, entity: EntityId, action: ClickAction) -> Option<ClickAction> {
        self.actions.insert(entity, action)
    }

    pub fn get(&self, entity: EntityId) -> Option<&ClickAction> {
        self.actions.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.actions.keys().copied()
    }

    /// Starts the transition bound to `entity`. Returns `Ok(None)` when the
    /// entity has no binding.
    pub fn dispatch(
        &self,
        entity: EntityId,
        rig: &mut CameraRig,
        controller: &mut TransitionController,
        now: Duration,
    ) -> Result<Option<&ClickAction>, UnknownPoseError> {
        let Some(action) = self.actions.get(&entity) else {
            return Ok(None);
        };
        controller.begin(rig, action.request(), now)?;
        info!("click on {entity:?} moves the camera to {}", action.pose);
        Ok(Some(action))
    }
}
