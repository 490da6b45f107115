//! Per-scene state.
//!
//! A [`SceneContext`] owns everything one running scene needs: the graph,
//! the camera rig, the transition in flight, the click bindings and the
//! queues through which pointer input and finished asset loads reach the
//! render tick. Nothing here is global, so several scenes can coexist.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use log::{debug, error, info, warn};

use crate::assets::{AssetInbox, AssetLoader, LoadedText, TextRequest};
use crate::builders;
use crate::camera::CameraRig;
use crate::dispatch::ClickDispatchTable;
use crate::input::{PointerEvent, PointerQueue};
use crate::layout::{ObjectSpec, Prop, SceneLayout};
use crate::orbit::OrbitControls;
use crate::picking::{project_to_viewport, Picker};
use crate::scene::{EntityId, EntityKind, Prefab, SceneGraph, Transform};
use crate::transition::{TransitionController, TransitionStatus};
use crate::viewport::ViewportProvider;

/// What a click led to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Nothing addressable under the pointer.
    Missed,
    /// An addressable entity was hit but has no binding.
    Unmapped { target: EntityId },
    Dispatched { target: EntityId, pose: String },
    /// The binding names a pose the rig does not know; the click is
    /// ignored.
    Rejected { target: EntityId, pose: String },
}

/// What happened during one [`SceneContext::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub clicks: Vec<ClickOutcome>,
    pub texts_added: usize,
    pub transition: TransitionStatus,
}

pub struct SceneContext {
    name: String,
    graph: SceneGraph,
    rig: CameraRig,
    transitions: TransitionController,
    clicks: ClickDispatchTable,
    picker: Picker,
    orbit: OrbitControls,
    pointer: PointerQueue,
    assets: AssetInbox,
    viewport: Arc<dyn ViewportProvider>,
    loader: Arc<dyn AssetLoader>,
}

impl SceneContext {
    /// Builds the scene described by `layout`. Any inconsistency in the
    /// layout (a click on a missing entity, an unknown pose) aborts setup.
    /// Text labels are requested from `loader` and appear on a later tick.
    pub fn from_layout(
        layout: &SceneLayout,
        viewport: Arc<dyn ViewportProvider>,
        loader: Arc<dyn AssetLoader>,
    ) -> Result<Self> {
        let start = layout
            .pose(&layout.start_pose)
            .ok_or_else(|| anyhow!("start pose `{}` is not defined", layout.start_pose))?;
        let mut rig = CameraRig::new(layout.start_pose.clone(), *start, layout.projection);
        for spec in &layout.poses {
            rig.register(spec.name.clone(), spec.pose);
        }

        let mut graph = SceneGraph::new();
        let root = graph.root();
        for object in &layout.objects {
            let prefab = place(object, &graph);
            graph
                .spawn(root, &prefab)
                .with_context(|| format!("adding {}", describe(object)))?;
        }
        for light in &layout.lights {
            let mut prefab =
                builders::point_light(light.color, light.intensity).at(light.position);
            if let Some(name) = &light.name {
                prefab = prefab.named(name.clone());
            }
            graph.spawn(root, &prefab).context("adding light")?;
        }

        let mut clicks = ClickDispatchTable::new();
        for binding in &layout.clicks {
            let target = graph
                .find_by_name(root, &binding.target)
                .with_context(|| format!("click binding for `{}`", binding.target))?;
            rig.pose(&binding.action.pose)
                .with_context(|| format!("click binding for `{}`", binding.target))?;
            graph.set_addressable(target, true)?;
            if clicks.insert(target, binding.action.clone()).is_some() {
                warn!("`{}` is bound more than once; the last binding wins", binding.target);
            }
        }

        let context = Self {
            name: layout.name.clone(),
            graph,
            rig,
            transitions: TransitionController::new(),
            clicks,
            picker: Picker::new(),
            orbit: OrbitControls::new(layout.orbit_target),
            pointer: PointerQueue::new(),
            assets: AssetInbox::new(),
            viewport,
            loader,
        };
        for text in &layout.texts {
            context.request_text(text.clone());
        }
        info!(
            "scene {} ready: {} entities, {} click targets",
            context.name,
            context.graph.len(),
            context.clicks.len()
        );
        Ok(context)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut CameraRig {
        &mut self.rig
    }

    pub fn transitions(&self) -> &TransitionController {
        &self.transitions
    }

    pub fn clicks(&self) -> &ClickDispatchTable {
        &self.clicks
    }

    pub fn orbit(&self) -> &OrbitControls {
        &self.orbit
    }

    pub fn viewport(&self) -> &dyn ViewportProvider {
        self.viewport.as_ref()
    }

    /// Handle for the host to push pointer events from its own callbacks.
    pub fn pointer_queue(&self) -> PointerQueue {
        self.pointer.clone()
    }

    pub fn assets(&self) -> &AssetInbox {
        &self.assets
    }

    /// Asks for a text label; it is added on the first tick after its font
    /// has loaded, or never if loading fails.
    pub fn request_text(&self, request: TextRequest) {
        debug!("requesting font {} for `{}`", request.font, request.content);
        self.assets.request_text(self.loader.as_ref(), request);
    }

    /// Picks under `pointer` with the current camera and runs the bound
    /// action, if any.
    pub fn click(&mut self, pointer: Vec2, now: Duration) -> ClickOutcome {
        let result = self.picker.pick(
            pointer,
            self.viewport.viewport_size(),
            self.rig.active_camera(),
            &self.graph,
        );
        let Some(hit) = result.nearest() else {
            debug!("click at {pointer} hit nothing addressable");
            return ClickOutcome::Missed;
        };
        let target = hit.target;

        match self
            .clicks
            .dispatch(target, &mut self.rig, &mut self.transitions, now)
        {
            Ok(Some(action)) => ClickOutcome::Dispatched {
                target,
                pose: action.pose.clone(),
            },
            Ok(None) => {
                debug!("{} is not bound to anything", self.entity_name(target));
                ClickOutcome::Unmapped { target }
            }
            Err(err) => {
                warn!("ignoring click on {}: {err}", self.entity_name(target));
                ClickOutcome::Rejected {
                    target,
                    pose: err.0,
                }
            }
        }
    }

    /// Clicks at the screen position of the entity named `name`.
    pub fn click_entity(&mut self, name: &str, now: Duration) -> Result<ClickOutcome> {
        let entity = self.graph.find_by_name(self.graph.root(), name)?;
        let aim = self
            .aim_point(entity)
            .with_context(|| format!("`{name}` has no visible geometry"))?;
        let Some(pointer) =
            project_to_viewport(aim, self.viewport.viewport_size(), self.rig.active_camera())
        else {
            warn!("`{name}` is behind the camera");
            return Ok(ClickOutcome::Missed);
        };
        Ok(self.click(pointer, now))
    }

    /// Runs one render tick: inserts finished text labels, handles queued
    /// pointer input and advances the camera transition.
    pub fn tick(&mut self, now: Duration) -> TickReport {
        let texts_added = self
            .assets
            .drain()
            .into_iter()
            .filter(|loaded| self.insert_text(loaded))
            .count();

        let mut clicks = Vec::new();
        for event in self.pointer.drain() {
            match event {
                PointerEvent::Click { position, .. } => clicks.push(self.click(position, now)),
                gesture if self.rig.free_look_enabled() && !self.transitions.is_active() => {
                    self.orbit.apply(&gesture, self.rig.active_camera_mut());
                }
                gesture => debug!("free-look is off, dropping {gesture:?}"),
            }
        }

        let transition = self.transitions.advance(&mut self.rig, now);
        TickReport {
            clicks,
            texts_added,
            transition,
        }
    }

    fn insert_text(&mut self, loaded: &LoadedText) -> bool {
        let request = &loaded.request;
        let font = match &loaded.result {
            Ok(font) => font,
            Err(err) => {
                error!("text `{}` dropped: {err}", request.content);
                return false;
            }
        };
        let prefab = builders::text(&font.family, &request.content, request.size, request.color)
            .named(request.content.clone())
            .at(request.position)
            .rotated(request.rotation);
        match self.graph.spawn(self.graph.root(), &prefab) {
            Ok(_) => {
                info!("added text `{}` in {}", request.content, font.family);
                true
            }
            Err(err) => {
                error!("text `{}` dropped: {err}", request.content);
                false
            }
        }
    }

    /// Centre of the first mesh at or below `entity`, in world space.
    fn aim_point(&self, entity: EntityId) -> Option<Vec3> {
        self.graph.preorder(entity).find_map(|id| {
            let bounds = self.graph.get(id)?.kind.geometry()?.local_bounds();
            let world = self.graph.world_matrix(id).ok()?;
            Some(world.transform_point3(bounds.center()))
        })
    }

    fn entity_name(&self, id: EntityId) -> &str {
        self.graph
            .get(id)
            .map(|entity| entity.name_or_default())
            .unwrap_or("<removed>")
    }

    pub fn summary(&self) -> SceneSummary {
        let mut summary = SceneSummary {
            name: self.name.clone(),
            entities: 0,
            meshes: 0,
            lights: 0,
            click_targets: self.clicks.len(),
            poses: self.rig.pose_names().count(),
        };
        // The root itself is not counted.
        for id in self.graph.preorder(self.graph.root()).skip(1) {
            summary.entities += 1;
            match self.graph.get(id).map(|entity| &entity.kind) {
                Some(EntityKind::Mesh { .. }) => summary.meshes += 1,
                Some(EntityKind::PointLight(_)) => summary.lights += 1,
                _ => {}
            }
        }
        summary
    }
}

impl fmt::Debug for SceneContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneContext")
            .field("name", &self.name)
            .field("entities", &self.graph.len())
            .field("active_pose", &self.rig.active_pose_name())
            .field("transitions", &self.transitions)
            .finish()
    }
}

/// Entity counts for the part of the graph reachable from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSummary {
    pub name: String,
    pub entities: usize,
    pub meshes: usize,
    pub lights: usize,
    pub click_targets: usize,
    pub poses: usize,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scene {}: {} entities ({} meshes, {} lights), {} click targets, {} poses",
            self.name, self.entities, self.meshes, self.lights, self.click_targets, self.poses
        )
    }
}

/// Builds the prefab for `object` at its layout position. Builders that
/// already orient their own root (the ground plane, the tip bowls) are
/// wrapped in a placement group so that orientation survives.
fn place(object: &ObjectSpec, graph: &SceneGraph) -> Prefab {
    let mut transform = object.transform;
    if let Prop::Sign {
        anchor: Some(anchor),
        height,
    } = &object.prop
    {
        match graph
            .find_by_name(graph.root(), anchor)
            .ok()
            .and_then(|id| graph.world_position(id).ok())
        {
            Some(base) => transform.position = Vec3::new(base.x, *height, base.z),
            None => warn!(
                "sign anchor `{anchor}` not found, keeping {}",
                transform.position
            ),
        }
    }

    let prefab = object.prop.prefab();
    let mut placed = if prefab.transform == Transform::default() {
        Prefab {
            transform,
            ..prefab
        }
    } else {
        Prefab::group().with_child(prefab).with_transform(transform)
    };
    if let Some(name) = &object.name {
        placed = placed.named(name.clone());
    }
    placed
}

fn describe(object: &ObjectSpec) -> String {
    match &object.name {
        Some(name) => format!("object `{name}`"),
        None => "unnamed object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FontFace, MemoryAssetLoader};
    use crate::viewport::StaticViewport;

    const LAYOUT: &str = r#"
    <scene>
        <name>test</name>
        <pose><name>default</name><position>0 5 10</position></pose>
        <pose><name>close</name><position>0 3 0</position><look-at>0 1 -5</look-at></pose>
        <object><name>ground</name><type>ground</type></object>
        <object><name>post</name><type>post</type><position>-15 0 2</position></object>
        <object><name>sign</name><type>sign</type><anchor>post</anchor><height>4</height></object>
        <object>
            <name>lost-sign</name><type>sign</type>
            <anchor>nothing</anchor><position>7 8 9</position>
        </object>
        <object>
            <name>crate</name><type>cube</type><size>2</size><position>0 1 -5</position>
        </object>
        <click><target>crate</target><pose>close</pose><look-at>0 1 -5</look-at></click>
        <text>
            <content>Hello</content>
            <font>fonts/a.json</font>
            <position>0 3 -5</position>
        </text>
        <text>
            <content>Lost</content>
            <font>fonts/missing.json</font>
        </text>
    </scene>
    "#;

    fn context() -> SceneContext {
        let loader = Arc::new(MemoryAssetLoader::new());
        loader.register("fonts/a.json", FontFace::new("a", vec![0u8; 4]));
        let layout = SceneLayout::from_xml(LAYOUT).unwrap();
        SceneContext::from_layout(&layout, Arc::new(StaticViewport::new(800, 600)), loader).unwrap()
    }

    fn position_of(context: &SceneContext, name: &str) -> Vec3 {
        let id = context.graph().find_by_name(context.graph().root(), name).unwrap();
        context.graph().world_position(id).unwrap()
    }

    #[test]
    fn signs_follow_their_anchor() {
        let context = context();
        assert_eq!(position_of(&context, "sign"), Vec3::new(-15.0, 4.0, 2.0));
        assert_eq!(position_of(&context, "lost-sign"), Vec3::new(7.0, 8.0, 9.0));
    }

    #[test]
    fn texts_arrive_on_the_next_tick() {
        let mut context = context();
        let root = context.graph().root();
        assert!(context.graph().find_by_name(root, "Hello").is_err());

        let report = context.tick(Duration::ZERO);
        assert_eq!(report.texts_added, 1);
        assert!(context.graph().find_by_name(root, "Hello").is_ok());
        assert!(context.graph().find_by_name(root, "Lost").is_err());
        assert_eq!(context.tick(Duration::from_millis(16)).texts_added, 0);
    }

    #[test]
    fn summary_counts_match_the_graph() {
        let mut context = context();
        context.tick(Duration::ZERO);
        let summary = context.summary();
        assert_eq!(summary.entities, context.graph().len());
        assert_eq!(summary.click_targets, 1);
    }

    #[test]
    fn clicks_on_bound_and_empty_space() {
        let mut context = context();
        let outcome = context.click_entity("crate", Duration::ZERO).unwrap();
        let crate_id = context.graph().find_by_name(context.graph().root(), "crate").unwrap();
        assert_eq!(
            outcome,
            ClickOutcome::Dispatched {
                target: crate_id,
                pose: "close".to_string()
            }
        );
        assert!(context.transitions().is_active());

        // Straight up from the top edge of the screen there is only sky.
        let mut context = self::context();
        assert_eq!(context.click(Vec2::new(400.0, 0.0), Duration::ZERO), ClickOutcome::Missed);
        assert!(!context.transitions().is_active());
    }

    #[test]
    fn gestures_are_dropped_while_free_look_is_off() {
        let mut context = context();
        let queue = context.pointer_queue();
        context.click_entity("crate", Duration::ZERO).unwrap();
        let before = context.rig().active_camera().position;

        queue.push(PointerEvent::Wheel { delta: 5.0 });
        let report = context.tick(Duration::ZERO);
        assert!(matches!(report.transition, TransitionStatus::InFlight { .. }));
        assert_eq!(context.rig().active_camera().position, before);
    }

    #[test]
    fn unknown_click_target_aborts_setup() {
        let xml = r#"<scene>
            <pose><name>default</name><position>0 5 10</position></pose>
            <click><target>ghost</target><pose>default</pose></click>
        </scene>"#;
        let layout = SceneLayout::from_xml(xml).unwrap();
        let result = SceneContext::from_layout(
            &layout,
            Arc::new(StaticViewport::new(800, 600)),
            Arc::new(MemoryAssetLoader::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_click_pose_aborts_setup() {
        let xml = r#"<scene>
            <pose><name>default</name><position>0 5 10</position></pose>
            <object><name>crate</name><type>cube</type></object>
            <click><target>crate</target><pose>attic</pose></click>
        </scene>"#;
        let layout = SceneLayout::from_xml(xml).unwrap();
        let err = SceneContext::from_layout(
            &layout,
            Arc::new(StaticViewport::new(800, 600)),
            Arc::new(MemoryAssetLoader::new()),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("attic"));
    }
}
