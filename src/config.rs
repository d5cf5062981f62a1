// Command-line options and fixed scene constants

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use std::path::PathBuf;

use clap::Parser;
use glam::{Quat, Vec3};

use crate::math::Transform;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Orbit a glTF model and switch its lamp on and off")]
pub struct Opts {
    /// Directory the model is loaded from
    #[arg(long, default_value = "public/scene")]
    pub asset_dir: PathBuf,

    /// Model file name inside the asset directory
    #[arg(long, default_value = "scene.gltf")]
    pub model: String,

    /// Name of the node holding the glowing bulb
    #[arg(long, default_value = "Sphere_6")]
    pub lamp_node: String,

    /// Tone mapping exposure
    #[arg(long, default_value_t = 1.0)]
    pub exposure: f32,

    #[arg(long, default_value = "lamp-viewer")]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub zoom: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitSettings {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLightSettings {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vec3,
}

/// Spot light created over the bulb.
#[derive(Debug, Clone, PartialEq)]
pub struct LampSettings {
    pub node_name: String,
    pub color: [f32; 3],
    pub intensity: f32,
    pub distance: f32,
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
}

impl Default for LampSettings {
    fn default() -> Self {
        Self {
            node_name: "Sphere_6".to_string(),
            color: [1.0, 1.0, 1.0],
            intensity: 100.0,
            distance: 100.0,
            angle: FRAC_PI_4,
            penumbra: 0.5,
            decay: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    pub model_path: PathBuf,
    pub exposure: f32,
    pub camera: CameraSettings,
    pub orbit: OrbitSettings,
    /// Applied to the model root before it joins the stage.
    pub model_placement: Transform,
    pub global_light: PointLightSettings,
    pub lamp: LampSettings,
}

impl From<Opts> for ViewerConfig {
    fn from(opts: Opts) -> Self {
        Self {
            title: opts.title,
            model_path: opts.asset_dir.join(opts.model),
            exposure: opts.exposure,
            camera: CameraSettings {
                fov_y_degrees: 45.0,
                near: 1.0,
                far: 1000.0,
                zoom: 0.5,
                position: Vec3::new(0.0, 5.0, 20.0),
            },
            orbit: OrbitSettings {
                target: Vec3::new(0.0, 0.0, -0.2),
                min_distance: 2.0,
                max_distance: 10.0,
            },
            model_placement: Transform::new(
                Vec3::new(-1.5, -2.0, 0.0),
                Quat::from_rotation_y(-FRAC_PI_2),
                Vec3::ONE,
            ),
            global_light: PointLightSettings {
                color: [1.0, 1.0, 1.0],
                intensity: 200.0,
                position: Vec3::new(0.0, 10.0, 0.0),
            },
            lamp: LampSettings {
                node_name: opts.lamp_node,
                ..LampSettings::default()
            },
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Opts::parse_from(["lamp-viewer"]).into()
    }
}
