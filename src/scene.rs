use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::color::Color;
use crate::error::{InvalidGraphError, NotFound};
use crate::geometry::Geometry;

slotmap::new_key_type! {
    /// Stable handle of an entity inside a [`SceneGraph`].
    pub struct EntityId;
}

/// Name given to the implicit root of every scene.
pub const ROOT_NAME: &str = "scene";

/// Local transform of an entity relative to its parent. Rotation is Euler
/// XYZ in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// Surface description consumed by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: Color,
    pub opacity: f32,
    pub emissive: bool,
    pub metalness: f32,
    pub roughness: f32,
    pub double_sided: bool,
}

impl Material {
    pub fn standard(color: Color) -> Self {
        Self {
            color,
            opacity: 1.0,
            emissive: false,
            metalness: 0.0,
            roughness: 1.0,
            double_sided: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShadowOptions {
    pub cast: bool,
    pub receive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f32,
    /// Zero means unlimited range.
    pub distance: f32,
    pub decay: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Group,
    Mesh { geometry: Geometry, material: Material },
    PointLight(PointLight),
}

impl EntityKind {
    pub fn geometry(&self) -> Option<&Geometry> {
        match self {
            EntityKind::Mesh { geometry, .. } => Some(geometry),
            _ => None,
        }
    }
}

/// Detached entity tree produced by the builders. Compared by content.
#[derive(Debug, Clone, PartialEq)]
pub struct Prefab {
    pub name: Option<String>,
    pub transform: Transform,
    pub kind: EntityKind,
    pub shadows: ShadowOptions,
    pub children: Vec<Prefab>,
}

impl Prefab {
    pub fn group() -> Self {
        Self::new(EntityKind::Group)
    }

    pub fn new(kind: EntityKind) -> Self {
        Self {
            name: None,
            transform: Transform::default(),
            kind,
            shadows: ShadowOptions::default(),
            children: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn rotated(mut self, rotation: Vec3) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn scaled(mut self, scale: Vec3) -> Self {
        self.transform.scale = scale;
        self
    }

    pub fn with_shadows(mut self, shadows: ShadowOptions) -> Self {
        self.shadows = shadows;
        self
    }

    pub fn with_child(mut self, child: Prefab) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Prefab>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A node of the scene graph.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: Option<String>,
    pub transform: Transform,
    pub kind: EntityKind,
    pub shadows: ShadowOptions,
    pub addressable: bool,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
}

impl Entity {
    fn from_prefab_node(prefab: &Prefab) -> Self {
        Self {
            name: prefab.name.clone(),
            transform: prefab.transform,
            kind: prefab.kind.clone(),
            shadows: prefab.shadows,
            addressable: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Tree of entities owned by a single root. Detached subtrees may exist
/// transiently (after [`SceneGraph::insert`] or [`SceneGraph::detach`]) but
/// only what hangs off the root is traversed, picked or rendered.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    entities: SlotMap<EntityId, Entity>,
    root: EntityId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut entities = SlotMap::with_key();
        let root = entities.insert(Entity::from_prefab_node(&Prefab::group().named(ROOT_NAME)));
        Self { entities, root }
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Number of entities, not counting the root.
    pub fn len(&self) -> usize {
        self.entities.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Allocates a detached copy of `prefab`, returning its root.
    pub fn insert(&mut self, prefab: &Prefab) -> EntityId {
        let id = self.entities.insert(Entity::from_prefab_node(prefab));
        for child in &prefab.children {
            let child_id = self.insert(child);
            self.link(id, child_id);
        }
        id
    }

    /// Inserts `prefab` and attaches it under `parent`.
    pub fn spawn(
        &mut self,
        parent: EntityId,
        prefab: &Prefab,
    ) -> Result<EntityId, InvalidGraphError> {
        if !self.contains(parent) {
            return Err(InvalidGraphError::MissingEntity(parent));
        }
        let id = self.insert(prefab);
        self.link(parent, id);
        Ok(id)
    }

    pub fn add_child(
        &mut self,
        parent: EntityId,
        child: EntityId,
    ) -> Result<(), InvalidGraphError> {
        if !self.contains(parent) {
            return Err(InvalidGraphError::MissingEntity(parent));
        }
        let Some(entity) = self.entities.get(child) else {
            return Err(InvalidGraphError::MissingEntity(child));
        };
        if child == self.root {
            return Err(InvalidGraphError::RootImmutable);
        }
        if entity.parent.is_some() {
            return Err(InvalidGraphError::AlreadyParented { child });
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(InvalidGraphError::Cycle { parent, child });
        }
        self.link(parent, child);
        Ok(())
    }

    /// Unlinks `child` from its parent; the subtree stays allocated.
    pub fn detach(&mut self, child: EntityId) -> Result<(), InvalidGraphError> {
        if child == self.root {
            return Err(InvalidGraphError::RootImmutable);
        }
        let parent = self
            .entities
            .get_mut(child)
            .ok_or(InvalidGraphError::MissingEntity(child))?
            .parent
            .take();
        if let Some(parent) = parent.and_then(|id| self.entities.get_mut(id)) {
            parent.children.retain(|&id| id != child);
        }
        Ok(())
    }

    /// Detaches `entity` and frees it together with all of its descendants.
    pub fn remove(&mut self, entity: EntityId) -> Result<(), InvalidGraphError> {
        self.detach(entity)?;
        let doomed: Vec<EntityId> = self.preorder(entity).collect();
        for id in doomed {
            self.entities.remove(id);
        }
        Ok(())
    }

    /// Composition of local transforms from the root down to `entity`.
    pub fn world_matrix(&self, entity: EntityId) -> Result<Mat4, InvalidGraphError> {
        let mut current = self
            .entities
            .get(entity)
            .ok_or(InvalidGraphError::MissingEntity(entity))?;
        let mut matrix = current.transform.matrix();
        while let Some(parent) = current.parent.and_then(|id| self.entities.get(id)) {
            matrix = parent.transform.matrix() * matrix;
            current = parent;
        }
        Ok(matrix)
    }

    pub fn world_position(&self, entity: EntityId) -> Result<Vec3, InvalidGraphError> {
        Ok(self.world_matrix(entity)?.transform_point3(Vec3::ZERO))
    }

    /// First entity named `name` in pre-order below (and including)
    /// `start`. Duplicate names resolve to the earliest in that order.
    pub fn find_by_name(&self, start: EntityId, name: &str) -> Result<EntityId, NotFound> {
        self.preorder(start)
            .find(|id| self.entities[*id].name.as_deref() == Some(name))
            .ok_or_else(|| NotFound(name.to_string()))
    }

    /// Depth-first pre-order traversal, children in insertion order.
    pub fn preorder(&self, start: EntityId) -> Preorder<'_> {
        let stack = if self.contains(start) {
            vec![start]
        } else {
            Vec::new()
        };
        Preorder { graph: self, stack }
    }

    pub fn set_addressable(
        &mut self,
        entity: EntityId,
        addressable: bool,
    ) -> Result<(), InvalidGraphError> {
        self.entities
            .get_mut(entity)
            .ok_or(InvalidGraphError::MissingEntity(entity))?
            .addressable = addressable;
        Ok(())
    }

    /// Walks from `entity` (inclusive) towards the root and returns the
    /// first addressable entity.
    pub fn nearest_addressable(&self, entity: EntityId) -> Option<EntityId> {
        let mut current = Some(entity);
        while let Some(id) = current {
            let node = self.entities.get(id)?;
            if node.addressable {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    /// True when `node` is reachable from the root.
    pub fn is_attached(&self, node: EntityId) -> bool {
        self.is_ancestor_or_self(self.root, node)
    }

    fn is_ancestor_or_self(&self, ancestor: EntityId, node: EntityId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.entities.get(id).and_then(|entity| entity.parent);
        }
        false
    }

    fn link(&mut self, parent: EntityId, child: EntityId) {
        self.entities[child].parent = Some(parent);
        self.entities[parent].children.push(child);
    }
}

pub struct Preorder<'a> {
    graph: &'a SceneGraph,
    stack: Vec<EntityId>,
}

impl Iterator for Preorder<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        if let Some(entity) = self.graph.entities.get(id) {
            self.stack.extend(entity.children.iter().rev().copied());
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn node(name: &str, position: Vec3) -> Prefab {
        Prefab::group().named(name).at(position)
    }

    #[test]
    fn world_matrix_composes_parent_chain() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph
            .spawn(
                root,
                &node("a", Vec3::new(1.0, 0.0, 0.0)).rotated(Vec3::new(0.0, FRAC_PI_2, 0.0)),
            )
            .unwrap();
        let b = graph.spawn(a, &node("b", Vec3::new(0.0, 0.0, 2.0))).unwrap();
        let c = graph.spawn(b, &node("c", Vec3::new(0.0, 3.0, 0.0))).unwrap();

        let expected = graph.get(a).unwrap().transform.matrix()
            * graph.get(b).unwrap().transform.matrix()
            * graph.get(c).unwrap().transform.matrix();
        let world = graph.world_matrix(c).unwrap();
        assert!(world.abs_diff_eq(expected, 1e-5));

        // +Z in a's frame is +X in the world after the 90° yaw.
        let position = graph.world_position(c).unwrap();
        assert!(position.abs_diff_eq(Vec3::new(3.0, 3.0, 0.0), 1e-5));
    }

    #[test]
    fn world_matrix_reflects_later_edits() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let parent = graph.spawn(root, &node("parent", Vec3::ZERO)).unwrap();
        let child = graph.spawn(parent, &node("child", Vec3::X)).unwrap();
        graph.get_mut(parent).unwrap().transform.position = Vec3::new(0.0, 5.0, 0.0);
        let position = graph.world_position(child).unwrap();
        assert!(position.abs_diff_eq(Vec3::new(1.0, 5.0, 0.0), 1e-6));
    }

    #[test]
    fn cycle_is_rejected_and_graph_unchanged() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.spawn(root, &node("a", Vec3::ZERO)).unwrap();
        let b = graph.spawn(a, &node("b", Vec3::ZERO)).unwrap();
        let c = graph.spawn(b, &node("c", Vec3::ZERO)).unwrap();

        graph.detach(a).unwrap();
        let before: Vec<_> = graph.preorder(a).collect();
        assert_eq!(
            graph.add_child(c, a),
            Err(InvalidGraphError::Cycle { parent: c, child: a })
        );
        assert_eq!(
            graph.add_child(a, a),
            Err(InvalidGraphError::Cycle { parent: a, child: a })
        );
        assert_eq!(graph.preorder(a).collect::<Vec<_>>(), before);
        assert_eq!(graph.get(a).unwrap().parent(), None);
        assert_eq!(graph.get(c).unwrap().children(), &[] as &[EntityId]);
    }

    #[test]
    fn double_attach_is_rejected() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.spawn(root, &node("a", Vec3::ZERO)).unwrap();
        let b = graph.spawn(root, &node("b", Vec3::ZERO)).unwrap();
        assert_eq!(
            graph.add_child(a, b),
            Err(InvalidGraphError::AlreadyParented { child: b })
        );
        graph.detach(b).unwrap();
        graph.add_child(a, b).unwrap();
        assert_eq!(graph.get(b).unwrap().parent(), Some(a));
        assert_eq!(graph.get(root).unwrap().children(), &[a]);
    }

    #[test]
    fn root_cannot_move() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let loose = graph.insert(&node("loose", Vec3::ZERO));
        assert_eq!(graph.add_child(loose, root), Err(InvalidGraphError::RootImmutable));
        assert_eq!(graph.detach(root), Err(InvalidGraphError::RootImmutable));
        assert_eq!(graph.remove(root), Err(InvalidGraphError::RootImmutable));
    }

    #[test]
    fn find_by_name_returns_first_in_preorder() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let first = graph.spawn(root, &node("group", Vec3::ZERO)).unwrap();
        let nested = graph.spawn(first, &node("dup", Vec3::ZERO)).unwrap();
        graph.spawn(root, &node("dup", Vec3::ONE)).unwrap();

        assert_eq!(graph.find_by_name(root, "dup"), Ok(nested));
        assert_eq!(
            graph.find_by_name(root, "missing"),
            Err(NotFound("missing".to_string()))
        );
    }

    #[test]
    fn remove_frees_the_subtree() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.spawn(root, &node("a", Vec3::ZERO)).unwrap();
        let b = graph.spawn(a, &node("b", Vec3::ZERO)).unwrap();
        assert_eq!(graph.len(), 2);
        assert!(!graph.is_empty());
        graph.remove(a).unwrap();
        assert_eq!(graph.len(), 0);
        assert!(graph.is_empty());
        assert!(!graph.contains(b));
        assert!(graph.get(root).unwrap().children().is_empty());
        assert!(graph.world_matrix(b).is_err());
    }

    #[test]
    fn nearest_addressable_walks_up() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let board = graph
            .spawn(
                root,
                &node("skateboard", Vec3::ZERO).with_child(node("wheel", Vec3::X)),
            )
            .unwrap();
        let wheel = graph.find_by_name(board, "wheel").unwrap();
        assert_eq!(graph.nearest_addressable(wheel), None);
        graph.set_addressable(board, true).unwrap();
        assert_eq!(graph.nearest_addressable(wheel), Some(board));
        assert!(graph.is_attached(wheel));
    }
}
