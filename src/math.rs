// Math utilities for lamp-viewer

use glam::{Mat4, Quat, Vec3};

/// Local transform of a scene node, relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create a new transform
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Create an identity transform
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Transform that only translates.
    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Builds a transform from glTF's decomposed `(translation, rotation, scale)`.
    /// glTF quaternions are stored as `[x, y, z, w]`, same as glam.
    pub fn from_decomposed(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            position: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from_array(scale),
        }
    }

    /// Generate transformation matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Composes a chain of local transforms, outermost ancestor first.
pub fn compose<'a, I>(chain: I) -> Mat4
where
    I: IntoIterator<Item = &'a Transform>,
{
    chain
        .into_iter()
        .fold(Mat4::IDENTITY, |acc, transform| acc * transform.matrix())
}
