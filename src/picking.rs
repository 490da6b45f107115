//! Pointer picking.
//!
//! 1. The pointer position is turned into a world-space ray through the
//!    camera handed in by the caller (always the rig's live camera).
//! 2. The ray is tested against the bounds of every mesh reachable from
//!    the scene root, in each entity's local space so rotated parts get an
//!    oriented box.
//! 3. Raw hits are resolved to their nearest addressable ancestor, which is
//!    what the user conceptually clicked.

use std::collections::HashSet;

use glam::{Vec2, Vec3};

use crate::camera::Camera;
use crate::scene::{EntityId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray through `pointer` (pixels, origin top-left) for a viewport of
    /// `viewport` pixels.
    pub fn from_viewport(pointer: Vec2, viewport: (u32, u32), camera: &Camera) -> Self {
        let (width, height) = (viewport.0.max(1) as f32, viewport.1.max(1) as f32);
        let ndc = Vec2::new(
            2.0 * pointer.x / width - 1.0,
            1.0 - 2.0 * pointer.y / height,
        );
        let inverse = camera.view_proj(width / height).inverse();
        let near = inverse.project_point3(ndc.extend(-1.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Self::new(near, far - near)
    }
}

/// Pixel position of a world point as seen by `camera`, or `None` when
/// the point is behind it.
pub fn project_to_viewport(point: Vec3, viewport: (u32, u32), camera: &Camera) -> Option<Vec2> {
    let (width, height) = (viewport.0.max(1) as f32, viewport.1.max(1) as f32);
    let clip = camera.view_proj(width / height) * point.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(
        (ndc.x + 1.0) * 0.5 * width,
        (1.0 - ndc.y) * 0.5 * height,
    ))
}

/// A mesh the ray passed through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub entity: EntityId,
    pub distance: f32,
    pub point: Vec3,
}

/// A hit mapped to the addressable entity that owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedHit {
    pub target: EntityId,
    pub part: EntityId,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickResult {
    pub ray: Ray,
    /// Every intersected mesh, nearest first.
    pub raw: Vec<Hit>,
    /// Addressable targets, nearest first, each listed once.
    pub resolved: Vec<ResolvedHit>,
}

impl PickResult {
    pub fn nearest(&self) -> Option<&ResolvedHit> {
        self.resolved.first()
    }
}

/// Stateless ray caster over a [`SceneGraph`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Picker;

impl Picker {
    pub fn new() -> Self {
        Self
    }

    pub fn pick(
        &self,
        pointer: Vec2,
        viewport: (u32, u32),
        camera: &Camera,
        graph: &SceneGraph,
    ) -> PickResult {
        self.cast(Ray::from_viewport(pointer, viewport, camera), graph)
    }

    pub fn cast(&self, ray: Ray, graph: &SceneGraph) -> PickResult {
        let mut raw: Vec<Hit> = graph
            .preorder(graph.root())
            .filter_map(|id| intersect_entity(graph, id, &ray))
            .collect();
        raw.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let mut seen = HashSet::new();
        let resolved = raw
            .iter()
            .filter_map(|hit| {
                let target = graph.nearest_addressable(hit.entity)?;
                seen.insert(target).then_some(ResolvedHit {
                    target,
                    part: hit.entity,
                    distance: hit.distance,
                })
            })
            .collect();

        PickResult { ray, raw, resolved }
    }
}

fn intersect_entity(graph: &SceneGraph, id: EntityId, ray: &Ray) -> Option<Hit> {
    let bounds = graph.get(id)?.kind.geometry()?.local_bounds();
    let world = graph.world_matrix(id).ok()?;
    if world.determinant() == 0.0 {
        return None;
    }
    let inverse = world.inverse();
    if !inverse.is_finite() {
        return None;
    }
    // The ray parameter is preserved by the affine map as long as the
    // direction is not renormalised in local space.
    let origin = inverse.transform_point3(ray.origin);
    let direction = inverse.transform_vector3(ray.direction);
    let t = bounds.intersect_ray(origin, direction)?;
    Some(Hit {
        entity: id,
        distance: t,
        point: ray.point_at(t),
    })
}
