// Perspective camera and orbit controls

use glam::{Mat4, Vec3};

use crate::config::{CameraSettings, OrbitSettings};

/// Keeps the polar angle off the poles so `look_at` stays well defined.
const POLAR_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Values below 1 widen the view.
    pub zoom: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(settings: &CameraSettings, width: u32, height: u32) -> Self {
        let mut camera = Self {
            fov_y_degrees: settings.fov_y_degrees,
            aspect: 1.0,
            near: settings.near,
            far: settings.far,
            zoom: settings.zoom,
            position: settings.position,
            target: Vec3::ZERO,
        };
        camera.set_aspect(width, height);
        camera
    }

    /// Ignores degenerate sizes, e.g. a minimized window.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    /// Vertical field of view in radians after zoom.
    pub fn effective_fov(&self) -> f32 {
        let half = (self.fov_y_degrees.to_radians() * 0.5).tan() / self.zoom;
        2.0 * half.atan()
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.effective_fov(), self.aspect, self.near, self.far)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Mouse-driven orbit around a fixed target, in spherical coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per pixel of drag.
    pub rotate_speed: f32,
    /// Distance scale per scroll line.
    pub zoom_step: f32,
    radius: f32,
    theta: f32,
    phi: f32,
}

impl OrbitControls {
    pub fn new(settings: &OrbitSettings, camera: &PerspectiveCamera) -> Self {
        let mut controls = Self {
            target: settings.target,
            min_distance: settings.min_distance,
            max_distance: settings.max_distance,
            rotate_speed: 0.005,
            zoom_step: 0.95,
            radius: 1.0,
            theta: 0.0,
            phi: 0.0,
        };
        controls.sync_from(camera);
        controls
    }

    fn sync_from(&mut self, camera: &PerspectiveCamera) {
        let offset = camera.position - self.target;
        self.radius = offset.length();
        if self.radius > 0.0 {
            self.theta = offset.x.atan2(offset.z);
            self.phi = (offset.y / self.radius).clamp(-1.0, 1.0).acos();
        }
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Clamps the orbit and writes it back to the camera.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        self.radius = self.radius.clamp(self.min_distance, self.max_distance);
        self.phi = self
            .phi
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);

        let sin_phi = self.phi.sin();
        let offset = Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        );
        camera.position = self.target + offset;
        camera.target = self.target;
    }

    /// Drag by `(dx, dy)` pixels. Dragging right swings the camera left.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.theta -= dx * self.rotate_speed;
        self.phi -= dy * self.rotate_speed;
    }

    /// Positive `lines` moves closer.
    pub fn dolly(&mut self, lines: f32) {
        self.radius *= self.zoom_step.powf(lines);
    }
}
