//! Prefab factories for the diorama props.
//!
//! Every builder returns a detached [`Prefab`] with its parts already laid
//! out at fixed offsets relative to the composite's origin. Placing the
//! result in the world (and naming it, when it has to be addressable) is
//! the caller's job.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Vec2, Vec3};

use crate::color::Color;
use crate::geometry::Geometry;
use crate::scene::{EntityKind, Material, PointLight, Prefab, ShadowOptions};

/// Per-part configuration shared by most props.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartOptions {
    pub color: Color,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl PartOptions {
    /// Casts and receives shadows.
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            cast_shadow: true,
            receive_shadow: true,
        }
    }

    /// Neither casts nor receives shadows.
    pub fn unshaded(color: Color) -> Self {
        Self {
            color,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    fn shadows(&self) -> ShadowOptions {
        ShadowOptions {
            cast: self.cast_shadow,
            receive: self.receive_shadow,
        }
    }

    fn mesh(&self, geometry: Geometry) -> Prefab {
        self.mesh_with(geometry, Material::standard(self.color))
    }

    fn mesh_with(&self, geometry: Geometry, material: Material) -> Prefab {
        Prefab::new(EntityKind::Mesh { geometry, material }).with_shadows(self.shadows())
    }
}

fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
    Geometry::Box {
        width,
        height,
        depth,
    }
}

fn cylinder(radius: f32, height: f32) -> Geometry {
    Geometry::Cylinder {
        radius_top: radius,
        radius_bottom: radius,
        height,
    }
}

/// Board, four wheels and two trucks. Names its parts `board`, `wheel`
/// and `truck`.
pub fn skateboard(board: Color, wheels: Color) -> Prefab {
    const BOARD: Vec3 = Vec3::new(1.0, 0.1, 0.3);
    const WHEEL_RADIUS: f32 = 0.05;
    const WHEEL_WIDTH: f32 = 0.1;
    const TRUCK: Vec3 = Vec3::new(0.02, 0.02, 0.2);

    let deck = PartOptions::solid(board)
        .mesh(cuboid(BOARD.x, BOARD.y, BOARD.z))
        .named("board")
        .at(Vec3::new(0.0, BOARD.y / 2.0, 0.0));

    let wheel_parts = [(-0.45, 0.15), (0.45, 0.15), (-0.45, -0.15), (0.45, -0.15)]
        .into_iter()
        .map(|(x, z)| {
            PartOptions::solid(wheels)
                .mesh(cylinder(WHEEL_RADIUS, WHEEL_WIDTH))
                .named("wheel")
                .at(Vec3::new(x, -WHEEL_WIDTH / 2.0, z))
                // Lay the cylinder axis horizontally, across the deck.
                .rotated(Vec3::new(0.0, FRAC_PI_2, FRAC_PI_2))
        });

    let trucks = [-0.4, 0.4].into_iter().map(|x| {
        PartOptions::solid(Color::from_hex(0x808080))
            .mesh(cuboid(TRUCK.x, TRUCK.y, TRUCK.z))
            .named("truck")
            .at(Vec3::new(x, TRUCK.y / 2.0, 0.0))
    });

    Prefab::group()
        .with_child(deck)
        .with_children(wheel_parts)
        .with_children(trucks)
}

/// Post, emissive bulb and a point light sitting in the bulb. When
/// `extra_intensity` is set a second light of that intensity is added at
/// the lamp origin.
pub fn lamp_post(post: Color, light: Color, extra_intensity: Option<f32>) -> Prefab {
    const BULB_HEIGHT: f32 = 1.5;

    let pole = PartOptions::solid(post)
        .mesh(cylinder(0.1, 3.0))
        .named("post");

    let bulb_material = Material {
        emissive: true,
        ..Material::standard(light)
    };
    let bulb = PartOptions::unshaded(light)
        .mesh_with(Geometry::Sphere { radius: 0.5 }, bulb_material)
        .named("bulb")
        .at(Vec3::new(0.0, BULB_HEIGHT, 0.0));

    let glow = Prefab::new(EntityKind::PointLight(PointLight {
        color: light,
        intensity: 50.0,
        distance: 32.0,
        decay: 2.0,
    }))
    .named("lamp-light")
    .at(Vec3::new(0.0, BULB_HEIGHT, 0.0));

    let lamp = Prefab::group().with_child(pole).with_child(bulb).with_child(glow);
    match extra_intensity {
        Some(intensity) => lamp.with_child(point_light(light, intensity).named("lamp-fill")),
        None => lamp,
    }
}

/// Transparent display case with a metal stand underneath.
pub fn glass_exhibit() -> Prefab {
    let glass = Material {
        opacity: 0.5,
        metalness: 0.0,
        roughness: 0.0,
        ..Material::standard(Color::from_hex(0xffffff))
    };
    let steel = Material {
        metalness: 0.8,
        roughness: 0.4,
        ..Material::standard(Color::from_hex(0x555555))
    };
    let options = PartOptions::unshaded(Color::from_hex(0xffffff));

    let stand = options
        .mesh_with(cuboid(8.0, 0.2, 2.5), steel)
        .named("stand")
        .at(Vec3::new(0.0, -1.1, 0.0));

    options
        .mesh_with(cuboid(8.0, 2.0, 2.5), glass)
        .with_child(stand)
}

/// Three boards between two side panels.
pub fn shelf() -> Prefab {
    let wood = PartOptions::solid(Color::from_hex(0x8b4513));

    let boards = (0..3).map(|i| {
        wood.mesh(cuboid(1.0, 0.1, 0.5))
            .named("shelf-board")
            .at(Vec3::new(0.0, i as f32 * 1.2 - 1.0, 0.0))
    });
    let sides = (0..2).map(|i| {
        wood.mesh(cuboid(0.1, 3.0, 0.5))
            .named("shelf-side")
            .at(Vec3::new(i as f32 - 0.5, 0.0, 0.0))
    });

    Prefab::group().with_children(boards).with_children(sides)
}

/// Lathed bowl, scaled to half size.
pub fn tip_bowl(color: Color) -> Prefab {
    let profile = (0..10)
        .map(|i| {
            let i = i as f32;
            Vec2::new((i * 0.2).sin() * 0.3 + 0.3, (i - 5.0) * 0.08)
        })
        .collect();
    let material = Material {
        double_sided: true,
        ..Material::standard(color)
    };
    PartOptions::unshaded(color)
        .mesh_with(Geometry::Lathe { profile }, material)
        .scaled(Vec3::splat(0.5))
}

/// Sign post standing on the ground, its mesh centred half way up.
pub fn post() -> Prefab {
    let pole = PartOptions::solid(Color::from_hex(0xa52a2a))
        .mesh(cuboid(0.2, 5.0, 0.2))
        .at(Vec3::new(0.0, 2.5, 0.0));
    Prefab::group().with_child(pole)
}

pub fn sign() -> Prefab {
    PartOptions::solid(Color::from_hex(0xffffff)).mesh(cuboid(2.0, 1.0, 0.1))
}

pub fn cube(size: f32, color: Color) -> Prefab {
    PartOptions::solid(color).mesh(cuboid(size, size, size))
}

/// Square floor, laid flat.
pub fn ground_plane(size: f32, color: Color) -> Prefab {
    let material = Material {
        double_sided: true,
        ..Material::standard(color)
    };
    let options = PartOptions {
        color,
        cast_shadow: false,
        receive_shadow: true,
    };
    options
        .mesh_with(
            Geometry::Plane {
                width: size,
                height: size,
            },
            material,
        )
        .rotated(Vec3::new(PI / 2.0, 0.0, 0.0))
}

pub fn back_wall(width: f32, height: f32) -> Prefab {
    let material = Material {
        double_sided: true,
        ..Material::standard(Color::from_hex(0xffffff))
    };
    PartOptions::unshaded(Color::from_hex(0xffffff))
        .mesh_with(Geometry::Plane { width, height }, material)
}

/// Flat text label set in `font`, growing along +X from its origin.
pub fn text(font: &str, content: &str, size: f32, color: Color) -> Prefab {
    PartOptions::unshaded(color).mesh(Geometry::Text {
        font: font.to_string(),
        content: content.to_string(),
        size,
    })
}

pub fn point_light(color: Color, intensity: f32) -> Prefab {
    Prefab::new(EntityKind::PointLight(PointLight {
        color,
        intensity,
        distance: 0.0,
        decay: 2.0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children_named<'a>(prefab: &'a Prefab, name: &str) -> Vec<&'a Prefab> {
        prefab
            .children
            .iter()
            .filter(|child| child.name.as_deref() == Some(name))
            .collect()
    }

    #[test]
    fn skateboard_has_fixed_parts() {
        let board = skateboard(Color::parse("Black").unwrap(), Color::parse("White").unwrap());
        assert_eq!(board.children.len(), 7);
        assert_eq!(children_named(&board, "board").len(), 1);
        assert_eq!(children_named(&board, "truck").len(), 2);

        let wheels = children_named(&board, "wheel");
        assert_eq!(wheels.len(), 4);
        for wheel in wheels {
            assert_eq!(wheel.transform.rotation, Vec3::new(0.0, FRAC_PI_2, FRAC_PI_2));
            assert_eq!(wheel.transform.position.x.abs(), 0.45);
            assert_eq!(wheel.transform.position.z.abs(), 0.15);
        }
    }

    #[test]
    fn skateboard_is_deterministic() {
        let a = skateboard(Color::parse("Blue").unwrap(), Color::parse("Green").unwrap());
        let b = skateboard(Color::parse("Blue").unwrap(), Color::parse("Green").unwrap());
        assert_eq!(a, b);
        let c = skateboard(Color::parse("Blue").unwrap(), Color::parse("Red").unwrap());
        assert_ne!(a, c);
    }

    #[test]
    fn lamp_post_collocates_light_with_bulb() {
        let lamp = lamp_post(Color::from_hex(0), Color::from_hex(0xff0000), None);
        assert_eq!(lamp.children.len(), 3);
        let bulb = children_named(&lamp, "bulb")[0];
        let light = children_named(&lamp, "lamp-light")[0];
        assert_eq!(bulb.transform.position, light.transform.position);
        match &light.kind {
            EntityKind::PointLight(source) => {
                assert_eq!(source.intensity, 50.0);
                assert_eq!(source.distance, 32.0);
            }
            other => panic!("expected a light, got {other:?}"),
        }

        let brighter = lamp_post(Color::from_hex(0), Color::from_hex(0xff0000), Some(0.53));
        assert_eq!(brighter.children.len(), 4);
    }

    #[test]
    fn shelf_spaces_boards() {
        let shelf = shelf();
        let heights: Vec<f32> = children_named(&shelf, "shelf-board")
            .iter()
            .map(|board| board.transform.position.y)
            .collect();
        assert_eq!(heights.len(), 3);
        assert!((heights[0] + 1.0).abs() < 1e-6);
        assert!((heights[2] - 1.4).abs() < 1e-6);
    }

    #[test]
    fn exhibit_owns_its_stand() {
        let exhibit = glass_exhibit();
        assert!(matches!(exhibit.kind, EntityKind::Mesh { .. }));
        assert_eq!(exhibit.children.len(), 1);
        assert_eq!(exhibit.children[0].transform.position.y, -1.1);
    }
}
