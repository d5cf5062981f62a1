//! glTF loader
//!
//! Uses the gltf crate to import a model and rebuild its node hierarchy as a
//! [`Scene`]. Node names and local transforms are preserved so the lamp can be
//! found by name and placed in world space.

use std::path::{Path, PathBuf};

use crate::error::{Result, ViewerError};
use crate::math::Transform;
use crate::scene::{Material, MaterialId, MeshData, Node, NodeId, Scene};

/// Root node name of every loaded model.
pub const MODEL_ROOT_NAME: &str = "Scene";

/// Load a glTF or GLB file from disk.
pub fn load_scene(path: &Path) -> Result<Scene> {
    log::info!("Loading model from {:?}", path);
    let (document, buffers, _images) = gltf::import(path)?;
    build_scene(&document, &buffers)
}

/// Load a glTF or GLB document held in memory.
pub fn load_scene_from_slice(bytes: &[u8]) -> Result<Scene> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;
    build_scene(&document, &buffers)
}

/// Runs [`load_scene`] on the blocking pool.
pub async fn load_scene_async(path: PathBuf) -> Result<Scene> {
    tokio::task::spawn_blocking(move || load_scene(&path)).await?
}

struct Builder<'a> {
    buffers: &'a [gltf::buffer::Data],
    scene: Scene,
    /// Scene material per glTF material index.
    materials: Vec<MaterialId>,
    default_material: Option<MaterialId>,
    primitives: usize,
}

fn build_scene(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<Scene> {
    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(ViewerError::EmptyDocument)?;

    let mut builder = Builder {
        buffers,
        scene: Scene::new(MODEL_ROOT_NAME),
        materials: Vec::new(),
        default_material: None,
        primitives: 0,
    };
    for material in document.materials() {
        let id = builder.scene.add_material(convert_material(&material));
        builder.materials.push(id);
    }

    let root = builder.scene.root();
    for node in gltf_scene.nodes() {
        builder.add_node(root, &node);
    }

    log::info!(
        "Loaded model: {} nodes, {} primitives, {} materials",
        builder.scene.node_count(),
        builder.primitives,
        builder.materials.len()
    );
    Ok(builder.scene)
}

impl<'a> Builder<'a> {
    fn add_node(&mut self, parent: NodeId, node: &gltf::Node) {
        let (translation, rotation, scale) = node.transform().decomposed();
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{}", node.index()));
        let mut scene_node =
            Node::new(name).with_transform(Transform::from_decomposed(translation, rotation, scale));

        // A single primitive is drawn by the node itself; several become a
        // group with one child per primitive.
        let primitives: Vec<gltf::Primitive> = node
            .mesh()
            .map(|mesh| mesh.primitives().collect())
            .unwrap_or_default();
        let mut grouped = Vec::new();
        if primitives.len() == 1 {
            if let Some((mesh, material)) = self.read_primitive(&primitives[0]) {
                scene_node = scene_node.with_mesh(mesh, material);
            }
        } else {
            grouped = primitives;
        }

        let id = self.scene.add_node(parent, scene_node);
        for primitive in &grouped {
            if let Some((mesh, material)) = self.read_primitive(primitive) {
                let name = format!("{}_primitive{}", self.scene.node(id).name, primitive.index());
                self.scene.add_node(id, Node::new(name).with_mesh(mesh, material));
            }
        }

        for child in node.children() {
            self.add_node(id, &child);
        }
    }

    fn read_primitive(&mut self, primitive: &gltf::Primitive) -> Option<(MeshData, MaterialId)> {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("Skipping primitive with mode {:?}", primitive.mode());
            return None;
        }

        let buffers = self.buffers;
        let reader = primitive.reader(move |buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let Some(positions) = reader.read_positions() else {
            log::warn!("Skipping primitive without positions");
            return None;
        };
        let positions: Vec<[f32; 3]> = positions.collect();

        // Default normals pointing up
        let normals = reader
            .read_normals()
            .map(|normals| normals.collect())
            .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);

        let indices = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());

        let material = match primitive.material().index() {
            Some(index) => self.materials[index],
            None => self.default_material(),
        };

        self.primitives += 1;
        Some((
            MeshData {
                positions,
                normals,
                indices,
            },
            material,
        ))
    }

    fn default_material(&mut self) -> MaterialId {
        match self.default_material {
            Some(id) => id,
            None => {
                let id = self.scene.add_material(Material::default());
                self.default_material = Some(id);
                id
            }
        }
    }
}

fn convert_material(material: &gltf::Material) -> Material {
    Material {
        name: material.name().map(str::to_string),
        base_color: material.pbr_metallic_roughness().base_color_factor(),
        emissive: material.emissive_factor(),
        emissive_intensity: material.emissive_strength().unwrap_or(1.0),
    }
}
