// Scene graph for lamp-viewer

use glam::{Mat4, Vec3};

use crate::engine::{SceneEngine, SpotLightDesc};
use crate::math::{self, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightId(usize);

/// Triangle mesh in node-local space.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

/// Surface material. Emission is `emissive * emissive_intensity` and does not
/// light other objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
            emissive: [0.0, 0.0, 0.0],
            emissive_intensity: 1.0,
        }
    }
}

/// Represents an object within the 3D scene.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshData>,
    pub material: Option<MaterialId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Creates a detached, empty node with an identity transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            mesh: None,
            material: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshData, material: MaterialId) -> Self {
        self.mesh = Some(mesh);
        self.material = Some(material);
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub distance: f32,
    pub decay: f32,
    pub position: Vec3,
    pub visible: bool,
}

/// Cone light. `position` is in world space; `target` is the node it aims at.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub distance: f32,
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub position: Vec3,
    pub target: NodeId,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Point(PointLight),
    Spot(SpotLight),
}

impl Light {
    pub fn visible(&self) -> bool {
        match self {
            Light::Point(light) => light.visible,
            Light::Spot(light) => light.visible,
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        match self {
            Light::Point(light) => light.visible = visible,
            Light::Spot(light) => light.visible = visible,
        }
    }
}

/// Arena-backed scene graph. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<Node>,
    materials: Vec<Material>,
    lights: Vec<Light>,
    redraw_requests: u32,
}

impl Scene {
    /// Creates a scene holding only a root node with the given name.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(root_name)],
            materials: Vec::new(),
            lights: Vec::new(),
            redraw_requests: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Adds a node as the last child of `parent`.
    pub fn add_node(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_light(&mut self, light: Light) -> LightId {
        self.lights.push(light);
        LightId(self.lights.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn light(&self, id: LightId) -> &Light {
        &self.lights[id.0]
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes that carry geometry, in arena order.
    pub fn mesh_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.mesh.is_some())
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Model-to-world matrix of a node.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.0];
            chain.push(&node.transform);
            current = node.parent;
        }
        math::compose(chain.into_iter().rev())
    }

    /// Grafts another scene below `parent` and returns the new id of its root.
    /// Node, material and light handles of `other` are remapped.
    pub fn attach(&mut self, other: Scene, parent: NodeId) -> NodeId {
        let node_offset = self.nodes.len();
        let material_offset = self.materials.len();
        let remap = |id: NodeId| NodeId(id.0 + node_offset);

        for mut node in other.nodes {
            node.parent = node.parent.map(remap);
            node.children = node.children.into_iter().map(remap).collect();
            node.material = node.material.map(|m| MaterialId(m.0 + material_offset));
            self.nodes.push(node);
        }
        self.materials.extend(other.materials);
        for mut light in other.lights {
            if let Light::Spot(spot) = &mut light {
                spot.target = remap(spot.target);
            }
            self.lights.push(light);
        }

        let grafted = NodeId(node_offset);
        self.nodes[grafted.0].parent = Some(parent);
        self.nodes[parent.0].children.push(grafted);
        self.redraw_requests += other.redraw_requests;
        grafted
    }

    /// Number of redraws requested since the last call, resetting the count.
    pub fn take_redraw_requests(&mut self) -> u32 {
        std::mem::take(&mut self.redraw_requests)
    }
}

impl SceneEngine for Scene {
    fn find_node_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.name == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    fn world_position(&self, node: NodeId) -> Vec3 {
        self.world_matrix(node).transform_point3(Vec3::ZERO)
    }

    fn first_material_child(&self, node: NodeId) -> Option<MaterialId> {
        self.nodes[node.0]
            .children
            .iter()
            .find_map(|child| self.nodes[child.0].material)
    }

    fn set_emissive_intensity(&mut self, material: MaterialId, intensity: f32) {
        self.materials[material.0].emissive_intensity = intensity;
    }

    fn add_spot_light(&mut self, desc: SpotLightDesc) -> LightId {
        let root = self.root();
        let target = self.add_node(
            root,
            Node::new("SpotLightTarget").with_transform(Transform::from_translation(desc.target)),
        );
        self.add_light(Light::Spot(SpotLight {
            color: desc.color,
            intensity: desc.intensity,
            distance: desc.distance,
            angle: desc.angle,
            penumbra: desc.penumbra,
            decay: desc.decay,
            position: desc.position,
            target,
            visible: desc.visible,
        }))
    }

    fn set_light_visible(&mut self, light: LightId, visible: bool) {
        self.lights[light.0].set_visible(visible);
    }

    fn request_redraw(&mut self) {
        self.redraw_requests += 1;
        log::debug!("Redraw requested ({} pending)", self.redraw_requests);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    fn lamp_model() -> (Scene, NodeId, MaterialId) {
        let mut model = Scene::new("Scene");
        let root = model.root();
        let body = model.add_node(
            root,
            Node::new("Body").with_transform(Transform::from_translation(Vec3::new(0.0, 2.0, 0.0))),
        );
        let bulb = model.add_node(
            body,
            Node::new("Bulb").with_transform(Transform::from_translation(Vec3::new(1.0, 1.0, 0.0))),
        );
        let glass = model.add_material(Material::default());
        model.add_node(bulb, Node::new("Glass").with_mesh(MeshData::default(), glass));
        (model, bulb, glass)
    }

    #[test]
    fn find_by_name_searches_depth_first() {
        let (scene, bulb, _) = lamp_model();
        assert_eq!(scene.find_node_by_name(scene.root(), "Bulb"), Some(bulb));
        assert_eq!(scene.find_node_by_name(scene.root(), "Scene"), Some(scene.root()));
        assert_eq!(scene.find_node_by_name(bulb, "Body"), None);
        assert_eq!(scene.find_node_by_name(scene.root(), "Sphere_6"), None);
    }

    #[test]
    fn world_position_differs_from_local() {
        let (mut scene, bulb, _) = lamp_model();
        let root = scene.root();
        scene.node_mut(root).transform = Transform::new(
            Vec3::new(-1.5, -2.0, 0.0),
            Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2),
            Vec3::ONE,
        );

        let world = scene.world_position(bulb);
        assert_eq!(scene.node(bulb).transform.position, Vec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(world.x, -1.5, epsilon = 1e-5);
        assert_relative_eq!(world.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(world.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn first_material_child_skips_empty_children() {
        let (mut scene, bulb, glass) = lamp_model();
        let body = scene.node(bulb).parent().unwrap();
        assert_eq!(scene.first_material_child(body), None);

        let mut other = Scene::new("Other");
        let other_root = other.root();
        other.add_node(other_root, Node::new("Empty"));
        let second = other.add_material(Material::default());
        other.add_node(other_root, Node::new("Mesh").with_mesh(MeshData::default(), second));
        let grafted = scene.attach(other, bulb);

        assert_eq!(scene.first_material_child(bulb), Some(glass));
        assert_eq!(scene.first_material_child(grafted), Some(MaterialId(1)));
    }

    #[test]
    fn attach_remaps_handles() {
        let mut stage = Scene::new("Stage");
        stage.add_material(Material::default());
        let (model, _, _) = lamp_model();
        let model_nodes = model.node_count();

        let grafted = stage.attach(model, stage.root());

        assert_eq!(stage.node_count(), 1 + model_nodes);
        assert_eq!(stage.node(grafted).name, "Scene");
        assert_eq!(stage.node(grafted).parent(), Some(stage.root()));
        assert_eq!(stage.node(stage.root()).children(), &[grafted]);

        let bulb = stage.find_node_by_name(stage.root(), "Bulb").unwrap();
        let glass = stage.first_material_child(bulb).unwrap();
        assert_eq!(glass, MaterialId(1));
        assert_relative_eq!(stage.world_position(bulb).y, 3.0);
    }

    #[test]
    fn spot_light_adds_target_node() {
        let mut scene = Scene::new("Stage");
        let nodes_before = scene.node_count();
        let light = scene.add_spot_light(SpotLightDesc {
            color: [1.0, 1.0, 1.0],
            intensity: 100.0,
            distance: 100.0,
            angle: std::f32::consts::FRAC_PI_4,
            penumbra: 0.5,
            decay: 2.0,
            position: Vec3::new(1.0, 4.0, 2.0),
            target: Vec3::new(1.0, 0.0, 2.0),
            visible: false,
        });

        assert_eq!(scene.node_count(), nodes_before + 1);
        assert_eq!(scene.lights().len(), 1);
        match scene.light(light) {
            Light::Spot(spot) => {
                assert!(!spot.visible);
                assert_eq!(scene.world_position(spot.target), Vec3::new(1.0, 0.0, 2.0));
            }
            other => panic!("unexpected light {other:?}"),
        }

        scene.set_light_visible(light, true);
        assert!(scene.light(light).visible());
    }

    #[test]
    fn redraw_requests_are_counted_and_taken() {
        let mut scene = Scene::new("Stage");
        scene.request_redraw();
        scene.request_redraw();
        assert_eq!(scene.take_redraw_requests(), 2);
        assert_eq!(scene.take_redraw_requests(), 0);
    }
}
