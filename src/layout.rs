//! Scene layouts: which props go where, the camera poses, what clicking
//! does and which text labels to load.
//!
//! Layouts are XML documents. Every value is the text of a child element;
//! vectors are whitespace separated and rotations are in degrees.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::assets::TextRequest;
use crate::builders;
use crate::camera::{CameraPose, Projection};
use crate::color::Color;
use crate::dispatch::ClickAction;
use crate::scene::{Prefab, Transform};
use crate::transition::Easing;

/// The shop front: four skateboards on the back wall and two tip bowls.
pub const SHOP: &str = include_str!("../scenes/shop.xml");
/// A red cube surrounded by skateboards, each switching to another camera.
pub const CUBE: &str = include_str!("../scenes/cube.xml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLayout {
    pub name: String,
    pub projection: Projection,
    pub start_pose: String,
    pub orbit_target: Vec3,
    pub poses: Vec<PoseSpec>,
    pub objects: Vec<ObjectSpec>,
    pub lights: Vec<LightSpec>,
    pub clicks: Vec<ClickBinding>,
    pub texts: Vec<TextRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSpec {
    pub name: String,
    pub pose: CameraPose,
}

/// One placed prop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub name: Option<String>,
    pub prop: Prop,
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Prop {
    Ground { size: f32, color: Color },
    BackWall { width: f32, height: f32 },
    Skateboard { board: Color, wheels: Color },
    LampPost {
        post: Color,
        light: Color,
        extra_intensity: Option<f32>,
    },
    GlassExhibit,
    Shelf,
    TipBowl { color: Color },
    Post,
    /// Placed above the entity named `anchor` at `height`, or at the
    /// object's own position when there is no such entity.
    Sign { anchor: Option<String>, height: f32 },
    Cube { size: f32, color: Color },
}

impl Prop {
    pub fn prefab(&self) -> Prefab {
        match self {
            Prop::Ground { size, color } => builders::ground_plane(*size, *color),
            Prop::BackWall { width, height } => builders::back_wall(*width, *height),
            Prop::Skateboard { board, wheels } => builders::skateboard(*board, *wheels),
            Prop::LampPost {
                post,
                light,
                extra_intensity,
            } => builders::lamp_post(*post, *light, *extra_intensity),
            Prop::GlassExhibit => builders::glass_exhibit(),
            Prop::Shelf => builders::shelf(),
            Prop::TipBowl { color } => builders::tip_bowl(*color),
            Prop::Post => builders::post(),
            Prop::Sign { .. } => builders::sign(),
            Prop::Cube { size, color } => builders::cube(*size, *color),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSpec {
    pub name: Option<String>,
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickBinding {
    /// Name of the entity that becomes clickable.
    pub target: String,
    pub action: ClickAction,
}

impl SceneLayout {
    /// Looks up one of the layouts shipped with the crate.
    pub fn builtin(name: &str) -> Result<Self> {
        match name {
            "shop" => Self::from_xml(SHOP).context("built-in shop layout"),
            "cube" => Self::from_xml(CUBE).context("built-in cube layout"),
            other => bail!("unknown built-in scene `{other}` (expected shop or cube)"),
        }
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            bail!("root element must be <scene>");
        }

        let name = optional_text(&root, "name").unwrap_or_else(|| "untitled".to_string());
        let (projection, start_pose, orbit_target) = match child(&root, "camera") {
            Some(camera) => parse_camera(&camera)?,
            None => (Projection::default(), "default".to_string(), Vec3::ZERO),
        };

        let mut layout = Self {
            name,
            projection,
            start_pose,
            orbit_target,
            poses: Vec::new(),
            objects: Vec::new(),
            lights: Vec::new(),
            clicks: Vec::new(),
            texts: Vec::new(),
        };

        for node in root.children().filter(Node::is_element) {
            match node.tag_name().name() {
                "pose" => layout.poses.push(parse_pose(&node)?),
                "object" => layout.objects.push(parse_object(&node)?),
                "light" => layout.lights.push(parse_light(&node)?),
                "click" => layout.clicks.push(parse_click(&node)?),
                "text" => layout.texts.push(parse_text(&node)?),
                "name" | "camera" => {}
                other => bail!("unexpected <{other}> in scene"),
            }
        }

        layout.validate()?;
        Ok(layout)
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for pose in &self.poses {
            if !names.insert(pose.name.as_str()) {
                bail!("pose `{}` is defined twice", pose.name);
            }
        }
        if !names.contains(self.start_pose.as_str()) {
            bail!("start pose `{}` is not defined", self.start_pose);
        }
        Ok(())
    }

    pub fn pose(&self, name: &str) -> Option<&CameraPose> {
        self.poses
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| &spec.pose)
    }
}

fn parse_camera(node: &Node<'_, '_>) -> Result<(Projection, String, Vec3)> {
    let defaults = Projection::default();
    let projection = Projection {
        fov_y_degrees: parse_f32(optional_text(node, "fov"), defaults.fov_y_degrees)?,
        near: parse_f32(optional_text(node, "near"), defaults.near)?,
        far: parse_f32(optional_text(node, "far"), defaults.far)?,
    };
    if projection.near <= 0.0 || projection.far <= projection.near {
        bail!(
            "camera clip planes must satisfy 0 < near < far (got {} and {})",
            projection.near,
            projection.far
        );
    }
    let start = optional_text(node, "start").unwrap_or_else(|| "default".to_string());
    let orbit_target = parse_vec3(optional_text(node, "orbit-target"), Vec3::ZERO)?;
    Ok((projection, start, orbit_target))
}

fn parse_pose(node: &Node<'_, '_>) -> Result<PoseSpec> {
    let name = required_text(node, "name")?;
    let position = parse_vec3(Some(required_text(node, "position")?), Vec3::ZERO)
        .with_context(|| format!("pose `{name}`"))?;
    let look_at = optional_text(node, "look-at");
    let rotation = optional_text(node, "rotation");
    let pose = match (look_at, rotation) {
        (Some(_), Some(_)) => bail!("pose `{name}` has both <look-at> and <rotation>"),
        (Some(target), None) => {
            CameraPose::looking_at(position, parse_vec3(Some(target), Vec3::ZERO)?)
        }
        (None, rotation) => CameraPose::euler(position, parse_degrees(rotation)?),
    };
    Ok(PoseSpec { name, pose })
}

fn parse_object(node: &Node<'_, '_>) -> Result<ObjectSpec> {
    let kind = required_text(node, "type")?;
    let name = optional_text(node, "name");
    let label = name.clone().unwrap_or_else(|| kind.clone());
    let prop = parse_prop(node, &kind).with_context(|| format!("object `{label}`"))?;
    let transform = Transform {
        position: parse_vec3(optional_text(node, "position"), Vec3::ZERO)?,
        rotation: parse_degrees(optional_text(node, "rotation"))?,
        scale: parse_vec3(optional_text(node, "scale"), Vec3::ONE)?,
    };
    Ok(ObjectSpec {
        name,
        prop,
        transform,
    })
}

fn parse_prop(node: &Node<'_, '_>, kind: &str) -> Result<Prop> {
    let prop = match kind {
        "ground" => Prop::Ground {
            size: parse_f32(optional_text(node, "size"), 59.0)?,
            color: parse_color(optional_text(node, "color"), "gray")?,
        },
        "back-wall" => Prop::BackWall {
            width: parse_f32(optional_text(node, "width"), 20.0)?,
            height: parse_f32(optional_text(node, "height"), 15.0)?,
        },
        "skateboard" => Prop::Skateboard {
            board: parse_color(optional_text(node, "board"), "black")?,
            wheels: parse_color(optional_text(node, "wheels"), "white")?,
        },
        "lamp-post" => Prop::LampPost {
            post: parse_color(optional_text(node, "post"), "black")?,
            light: parse_color(optional_text(node, "light"), "white")?,
            extra_intensity: optional_text(node, "extra-intensity")
                .map(|value| parse_f32(Some(value), 0.0))
                .transpose()?,
        },
        "glass-exhibit" => Prop::GlassExhibit,
        "shelf" => Prop::Shelf,
        "tip-bowl" => Prop::TipBowl {
            color: parse_color(optional_text(node, "color"), "blue")?,
        },
        "post" => Prop::Post,
        "sign" => Prop::Sign {
            anchor: optional_text(node, "anchor"),
            height: parse_f32(optional_text(node, "height"), 4.0)?,
        },
        "cube" => Prop::Cube {
            size: parse_f32(optional_text(node, "size"), 2.0)?,
            color: parse_color(optional_text(node, "color"), "red")?,
        },
        other => bail!("unknown object type `{other}`"),
    };
    Ok(prop)
}

fn parse_light(node: &Node<'_, '_>) -> Result<LightSpec> {
    Ok(LightSpec {
        name: optional_text(node, "name"),
        color: parse_color(optional_text(node, "color"), "white")?,
        intensity: parse_f32(optional_text(node, "intensity"), 1.0)?,
        position: parse_vec3(optional_text(node, "position"), Vec3::ZERO)?,
    })
}

fn parse_click(node: &Node<'_, '_>) -> Result<ClickBinding> {
    let target = required_text(node, "target")?;
    let pose = required_text(node, "pose").with_context(|| format!("click on `{target}`"))?;
    let mut action = ClickAction::new(pose);
    if let Some(look_at) = optional_text(node, "look-at") {
        action = action.looking_at(parse_vec3(Some(look_at), Vec3::ZERO)?);
    }
    if let Some(duration) = optional_text(node, "duration-ms") {
        let millis = duration
            .parse::<u64>()
            .map_err(|err| anyhow!("invalid duration `{duration}` on click `{target}`: {err}"))?;
        action = action.with_duration(Duration::from_millis(millis));
    }
    if let Some(easing) = optional_text(node, "easing") {
        let easing = Easing::from_name(&easing)
            .ok_or_else(|| anyhow!("unknown easing `{easing}` on click `{target}`"))?;
        action = action.with_easing(easing);
    }
    if let Some(free_look) = optional_text(node, "free-look") {
        let enabled = match free_look.as_str() {
            "enabled" => true,
            "disabled" => false,
            other => bail!("free-look must be enabled or disabled, got `{other}`"),
        };
        action = action.with_free_look_on_arrival(enabled);
    }
    Ok(ClickBinding { target, action })
}

fn parse_text(node: &Node<'_, '_>) -> Result<TextRequest> {
    Ok(TextRequest {
        content: required_text(node, "content")?,
        font: required_text(node, "font")?,
        size: parse_f32(optional_text(node, "size"), 0.5)?,
        color: parse_color(optional_text(node, "color"), "white")?,
        position: parse_vec3(optional_text(node, "position"), Vec3::ZERO)?,
        rotation: parse_degrees(optional_text(node, "rotation"))?,
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let numbers = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid vector component `{component}`: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match numbers.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => bail!("vector `{value}` must have exactly three components"),
    }
}

fn parse_degrees(value: Option<String>) -> Result<Vec3> {
    let degrees = parse_vec3(value, Vec3::ZERO)?;
    Ok(Vec3::new(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    ))
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float `{value}`: {err}")),
        None => Ok(default),
    }
}

fn parse_color(value: Option<String>, default: &str) -> Result<Color> {
    Color::parse(value.as_deref().unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::camera::PoseOrientation;

    const SAMPLE: &str = r#"
    <scene>
        <name>sample</name>
        <camera>
            <fov>60</fov>
            <start>default</start>
        </camera>
        <pose>
            <name>default</name>
            <position>0 5 10</position>
        </pose>
        <pose>
            <name>close</name>
            <position>1 4 -6</position>
            <look-at>1 4 -10</look-at>
        </pose>
        <object>
            <name>board</name>
            <type>skateboard</type>
            <board>Blue</board>
            <wheels>#ffff00</wheels>
            <position>1.2 1.5 -0.9</position>
            <rotation>0 0 90</rotation>
        </object>
        <light>
            <color>white</color>
            <intensity>100</intensity>
            <position>1 6 -7</position>
        </light>
        <click>
            <target>board</target>
            <pose>close</pose>
            <look-at>1 4 -10</look-at>
            <duration-ms>1500</duration-ms>
            <easing>cubic-out</easing>
            <free-look>enabled</free-look>
        </click>
        <text>
            <content>Hello</content>
            <font>fonts/optimer_bold.typeface.json</font>
            <size>0.3</size>
            <color>green</color>
            <rotation>0 90 0</rotation>
        </text>
    </scene>
    "#;

    #[test]
    fn parse_layout_populates_everything() {
        let layout = SceneLayout::from_xml(SAMPLE).unwrap();
        assert_eq!(layout.name, "sample");
        assert_eq!(layout.projection.fov_y_degrees, 60.0);
        assert_eq!(layout.projection.far, 1000.0);
        assert_eq!(layout.poses.len(), 2);
        assert_eq!(
            layout.pose("close").unwrap().orientation,
            PoseOrientation::LookAt(Vec3::new(1.0, 4.0, -10.0))
        );

        let board = &layout.objects[0];
        assert_eq!(board.name.as_deref(), Some("board"));
        assert_eq!(
            board.prop,
            Prop::Skateboard {
                board: Color::from_hex(0x0000ff),
                wheels: Color::from_hex(0xffff00),
            }
        );
        assert!((board.transform.rotation.z - FRAC_PI_2).abs() < 1e-6);

        let click = &layout.clicks[0];
        assert_eq!(click.target, "board");
        assert_eq!(click.action.duration, Duration::from_millis(1500));
        assert_eq!(click.action.easing, Easing::CubicOut);
        assert!(click.action.free_look_on_arrival);

        assert_eq!(layout.lights[0].intensity, 100.0);
        assert_eq!(layout.texts[0].content, "Hello");
        assert!((layout.texts[0].rotation.y - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn builtin_layouts_parse() {
        for name in ["shop", "cube"] {
            let layout = SceneLayout::builtin(name).unwrap();
            assert_eq!(layout.name, name);
            assert!(layout.pose(&layout.start_pose).is_some());
            assert!(!layout.clicks.is_empty());
        }
        assert!(SceneLayout::builtin("garage").is_err());
    }

    #[test]
    fn missing_start_pose_is_an_error() {
        let bad = "<scene><camera><start>nowhere</start></camera></scene>";
        let err = SceneLayout::from_xml(bad).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let two_components = r#"<scene>
            <pose><name>default</name><position>0 5</position></pose>
        </scene>"#;
        assert!(SceneLayout::from_xml(two_components).is_err());

        let bad_easing = r#"<scene>
            <pose><name>default</name><position>0 5 10</position></pose>
            <click><target>a</target><pose>default</pose><easing>bounce</easing></click>
        </scene>"#;
        assert!(SceneLayout::from_xml(bad_easing).is_err());

        let unknown_type = r#"<scene>
            <pose><name>default</name><position>0 5 10</position></pose>
            <object><type>piano</type></object>
        </scene>"#;
        assert!(SceneLayout::from_xml(unknown_type).is_err());
    }
}
