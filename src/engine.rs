// Capability interface between the lamp logic and the scene it drives

use glam::Vec3;

use crate::scene::{LightId, MaterialId, NodeId};

/// Parameters for a cone light aimed from `position` at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLightDesc {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Cutoff distance; zero means unbounded.
    pub distance: f32,
    /// Half-angle of the outer cone in radians.
    pub angle: f32,
    /// Fraction of the cone that fades out, 0..=1.
    pub penumbra: f32,
    pub decay: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub visible: bool,
}

/// What the lamp controller needs from a scene graph and its renderer.
///
/// `Scene` is the production implementation. Handles are non-owning: the
/// engine owns every node, material and light it hands out.
pub trait SceneEngine {
    /// Depth-first search below (and including) `root`.
    fn find_node_by_name(&self, root: NodeId, name: &str) -> Option<NodeId>;

    /// Position in the scene's global frame, all ancestor transforms applied.
    fn world_position(&self, node: NodeId) -> Vec3;

    /// Material of the first direct child of `node` that carries one.
    fn first_material_child(&self, node: NodeId) -> Option<MaterialId>;

    fn set_emissive_intensity(&mut self, material: MaterialId, intensity: f32);

    /// Adds the light and an empty node for its aim target.
    fn add_spot_light(&mut self, desc: SpotLightDesc) -> LightId;

    fn set_light_visible(&mut self, light: LightId, visible: bool);

    fn request_redraw(&mut self);
}
