//! Primitive shapes and the bounding volumes used for picking.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Average glyph advance relative to the text size, used to size text
/// bounds without shaping the string.
const GLYPH_ADVANCE: f32 = 0.6;

/// Primitive geometry attached to a mesh entity. Dimensions follow the
/// usual conventions: boxes, cylinders and spheres are centred on the
/// origin, cylinders and lathes revolve around +Y, planes lie in XY.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
    },
    Sphere {
        radius: f32,
    },
    Plane {
        width: f32,
        height: f32,
    },
    Lathe {
        profile: Vec<Vec2>,
    },
    Text {
        font: String,
        content: String,
        size: f32,
    },
}

impl Geometry {
    /// Axis-aligned bounds in the entity's local space.
    pub fn local_bounds(&self) -> Aabb {
        match self {
            Geometry::Box {
                width,
                height,
                depth,
            } => Aabb::from_extents(Vec3::new(*width, *height, *depth)),
            Geometry::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => {
                let radius = radius_top.max(*radius_bottom);
                Aabb::from_extents(Vec3::new(radius * 2.0, *height, radius * 2.0))
            }
            Geometry::Sphere { radius } => Aabb::from_extents(Vec3::splat(radius * 2.0)),
            Geometry::Plane { width, height } => {
                Aabb::from_extents(Vec3::new(*width, *height, 0.0))
            }
            Geometry::Lathe { profile } if profile.is_empty() => Aabb::new(Vec3::ZERO, Vec3::ZERO),
            Geometry::Lathe { profile } => {
                let radius = profile.iter().fold(0.0_f32, |acc, p| acc.max(p.x.abs()));
                let (low, high) = profile
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
                        (lo.min(p.y), hi.max(p.y))
                    });
                Aabb::new(
                    Vec3::new(-radius, low, -radius),
                    Vec3::new(radius, high, radius),
                )
            }
            Geometry::Text { content, size, .. } => {
                let width = content.chars().count() as f32 * size * GLYPH_ADVANCE;
                Aabb::new(Vec3::ZERO, Vec3::new(width, *size, 0.0))
            }
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Box of the given full extents centred on the origin.
    pub fn from_extents(extents: Vec3) -> Self {
        let half = extents * 0.5;
        Self::new(-half, half)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Slab test. Returns the ray parameter of the first intersection in
    /// front of the origin (or zero when the origin is inside the box).
    /// `direction` does not need to be normalised.
    pub fn intersect_ray(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let (o, d) = (origin[axis], direction[axis]);
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t0, t1) = ((lo - o) * inv, (hi - o) * inv);
            t_near = t_near.max(t0.min(t1));
            t_far = t_far.min(t0.max(t1));
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            return None;
        }
        Some(t_near.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_bounds_are_centered() {
        let bounds = Geometry::Box {
            width: 1.0,
            height: 0.1,
            depth: 0.3,
        }
        .local_bounds();
        assert_eq!(bounds.min, Vec3::new(-0.5, -0.05, -0.15));
        assert_eq!(bounds.max, Vec3::new(0.5, 0.05, 0.15));
    }

    #[test]
    fn ray_hits_front_face() {
        let bounds = Aabb::from_extents(Vec3::splat(2.0));
        let t = bounds
            .intersect_ray(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0))
            .unwrap();
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn ray_pointing_away_misses() {
        let bounds = Aabb::from_extents(Vec3::splat(2.0));
        assert!(bounds
            .intersect_ray(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0))
            .is_none());
        assert!(bounds
            .intersect_ray(Vec3::new(3.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0))
            .is_none());
    }

    #[test]
    fn flat_plane_bounds_still_intersect() {
        let plane = Geometry::Plane {
            width: 4.0,
            height: 4.0,
        }
        .local_bounds();
        let t = plane
            .intersect_ray(Vec3::new(1.0, 1.0, 3.0), Vec3::new(0.0, 0.0, -2.0))
            .unwrap();
        assert!((t - 1.5).abs() < 1e-5);
    }
}
