//! Viewer state.
//!
//! [`Viewer`] owns everything the window shows: the stage scene, camera,
//! orbit controls, the lamp button and the lamp controller once the model has
//! arrived. It holds no GPU resources, so every input path can be driven
//! directly in tests.

use crate::camera::{OrbitControls, PerspectiveCamera};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::lamp::{LampController, LampState};
use crate::scene::{Light, NodeId, PointLight, Scene};
use crate::ui::ToggleButton;

pub const STAGE_ROOT_NAME: &str = "Stage";

/// Model loading progress. Lamp wiring only happens on entering `Ready`.
#[derive(Debug)]
pub enum LoadPhase {
    Loading,
    Ready { model: NodeId },
    Failed(ViewerError),
}

#[derive(Debug, Default)]
struct Pointer {
    x: f32,
    y: f32,
    dragging: bool,
    pressed_on_button: bool,
}

pub struct Viewer {
    config: ViewerConfig,
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    button: ToggleButton,
    phase: LoadPhase,
    lamp: Option<LampController>,
    viewport: (u32, u32),
    pointer: Pointer,
    redraw: bool,
}

impl Viewer {
    /// Builds the stage with its global light. The model arrives later
    /// through [`Viewer::on_scene_loaded`].
    pub fn new(config: ViewerConfig, width: u32, height: u32) -> Self {
        let mut scene = Scene::new(STAGE_ROOT_NAME);
        scene.add_light(Light::Point(PointLight {
            color: config.global_light.color,
            intensity: config.global_light.intensity,
            distance: 0.0,
            decay: 2.0,
            position: config.global_light.position,
            visible: true,
        }));

        let mut camera = PerspectiveCamera::new(&config.camera, width, height);
        let mut controls = OrbitControls::new(&config.orbit, &camera);
        controls.update(&mut camera);

        Self {
            config,
            scene,
            camera,
            controls,
            button: ToggleButton::new(),
            phase: LoadPhase::Loading,
            lamp: None,
            viewport: (width, height),
            pointer: Pointer::default(),
            redraw: true,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn button(&self) -> &ToggleButton {
        &self.button
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn lamp_state(&self) -> Option<LampState> {
        self.lamp.as_ref().map(LampController::state)
    }

    pub fn lamp(&self) -> Option<&LampController> {
        self.lamp.as_ref()
    }

    /// Window title carrying the button label.
    pub fn title(&self) -> String {
        format!("{} [{}]", self.config.title, self.button.label())
    }

    /// Consumes the completed model load. Only the first result counts.
    pub fn on_scene_loaded(&mut self, result: Result<Scene>) {
        if !matches!(self.phase, LoadPhase::Loading) {
            log::warn!("Ignoring model load result in phase {:?}", self.phase);
            return;
        }

        match result {
            Ok(mut model) => {
                let model_root = model.root();
                model.node_mut(model_root).transform = self.config.model_placement;
                let stage_root = self.scene.root();
                let model = self.scene.attach(model, stage_root);

                match LampController::initialize(&mut self.scene, model, &self.config.lamp) {
                    Ok(lamp) => {
                        self.button.enable();
                        self.lamp = Some(lamp);
                    }
                    Err(err) => log::error!("Lamp disabled: {}", err),
                }
                log::info!("Model ready ({} nodes in stage)", self.scene.node_count());
                self.phase = LoadPhase::Ready { model };
            }
            Err(err) => {
                log::error!("Failed to load model: {}", err);
                self.phase = LoadPhase::Failed(err);
            }
        }
        self.redraw = true;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.camera.set_aspect(width, height);
        self.redraw = true;
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        let (dx, dy) = (x - self.pointer.x, y - self.pointer.y);
        self.pointer.x = x;
        self.pointer.y = y;
        if self.pointer.dragging {
            self.controls.rotate(dx, dy);
            self.controls.update(&mut self.camera);
            self.redraw = true;
        }
    }

    pub fn pointer_pressed(&mut self) {
        if self.button.hit(self.pointer.x, self.pointer.y) {
            self.pointer.pressed_on_button = true;
        } else {
            self.pointer.dragging = true;
        }
    }

    /// Completes a click when press and release both land on the button.
    pub fn pointer_released(&mut self) -> Option<LampState> {
        let clicked =
            self.pointer.pressed_on_button && self.button.hit(self.pointer.x, self.pointer.y);
        self.pointer.pressed_on_button = false;
        self.pointer.dragging = false;
        if clicked {
            self.toggle_lamp()
        } else {
            None
        }
    }

    pub fn scrolled(&mut self, lines: f32) {
        self.controls.dolly(lines);
        self.controls.update(&mut self.camera);
        self.redraw = true;
    }

    /// Returns `None` while no lamp is wired.
    pub fn toggle_lamp(&mut self) -> Option<LampState> {
        let lamp = self.lamp.as_mut()?;
        let state = lamp.toggle(&mut self.scene);
        self.button.set_label(state.label());
        Some(state)
    }

    /// True when anything asked for a frame since the last call.
    pub fn take_redraw(&mut self) -> bool {
        let scene_requested = self.scene.take_redraw_requests() > 0;
        let viewer_requested = std::mem::take(&mut self.redraw);
        scene_requested || viewer_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SceneEngine;
    use crate::math::Transform;
    use crate::scene::{Material, MeshData, Node};
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn model(lamp_name: &str) -> Scene {
        let mut model = Scene::new("Scene");
        let root = model.root();
        let sphere = model.add_node(
            root,
            Node::new(lamp_name).with_transform(Transform::from_translation(Vec3::new(0.0, 5.0, 1.0))),
        );
        let glass = model.add_material(Material::default());
        model.add_node(sphere, Node::new("Object_7").with_mesh(MeshData::default(), glass));
        model
    }

    fn viewer() -> Viewer {
        let mut viewer = Viewer::new(ViewerConfig::default(), 800, 600);
        viewer.take_redraw();
        viewer
    }

    fn click_button(viewer: &mut Viewer) -> Option<LampState> {
        viewer.pointer_moved(30.0, 30.0);
        viewer.pointer_pressed();
        viewer.pointer_released()
    }

    fn spot_visible(viewer: &Viewer) -> bool {
        let lamp = viewer.lamp().unwrap();
        viewer.scene().light(lamp.light()).visible()
    }

    fn bulb_intensity(viewer: &Viewer) -> f32 {
        let lamp = viewer.lamp().unwrap();
        viewer.scene().material(lamp.bulb()).emissive_intensity
    }

    #[test]
    fn fresh_load_is_off() {
        let mut viewer = viewer();
        viewer.on_scene_loaded(Ok(model("Sphere_6")));

        assert!(matches!(viewer.phase(), LoadPhase::Ready { .. }));
        assert_eq!(viewer.lamp_state(), Some(LampState::Off));
        assert_eq!(viewer.button().label(), "OFF");
        assert!(viewer.button().enabled());
        assert!(!spot_visible(&viewer));
        assert_eq!(bulb_intensity(&viewer), 0.0);
        assert!(viewer.take_redraw());
    }

    #[test]
    fn click_turns_lamp_on_and_requests_redraw() {
        let mut viewer = viewer();
        viewer.on_scene_loaded(Ok(model("Sphere_6")));
        viewer.take_redraw();

        assert_eq!(click_button(&mut viewer), Some(LampState::On));
        assert_eq!(viewer.button().label(), " ON ");
        assert!(spot_visible(&viewer));
        assert_eq!(bulb_intensity(&viewer), 1.0);
        assert!(viewer.take_redraw());
        assert!(!viewer.take_redraw());
        assert_eq!(viewer.title(), "lamp-viewer [ ON ]");
    }

    #[test]
    fn two_clicks_restore_initial_state() {
        let mut viewer = viewer();
        viewer.on_scene_loaded(Ok(model("Sphere_6")));

        click_button(&mut viewer);
        assert_eq!(click_button(&mut viewer), Some(LampState::Off));
        assert_eq!(viewer.button().label(), "OFF");
        assert!(!spot_visible(&viewer));
        assert_eq!(bulb_intensity(&viewer), 0.0);
    }

    #[test]
    fn model_placement_reaches_spot_light() {
        let mut viewer = viewer();
        viewer.on_scene_loaded(Ok(model("Sphere_6")));

        let lamp = viewer.lamp().unwrap();
        let Light::Spot(spot) = viewer.scene().light(lamp.light()) else {
            panic!("expected a spot light");
        };
        // Local (0, 5, 1) rotated -90deg about Y is (-1, 5, 0), then offset.
        assert_relative_eq!(spot.position.x, -2.5, epsilon = 1e-5);
        assert_relative_eq!(spot.position.y, 3.0, epsilon = 1e-5);
        assert_relative_eq!(spot.position.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn missing_lamp_node_keeps_button_inert() {
        let mut viewer = viewer();
        viewer.on_scene_loaded(Ok(model("Sphere_1")));

        assert!(matches!(viewer.phase(), LoadPhase::Ready { .. }));
        assert!(viewer.lamp().is_none());
        assert!(!viewer.button().enabled());
        // Only the global light.
        assert_eq!(viewer.scene().lights().len(), 1);
        assert_eq!(click_button(&mut viewer), None);
        assert_eq!(viewer.button().label(), "OFF");
        // The model still renders.
        assert!(viewer.scene().find_node_by_name(viewer.scene().root(), "Object_7").is_some());
    }

    #[test]
    fn resize_before_load_updates_aspect() {
        let mut viewer = viewer();
        viewer.resize(1200, 400);

        assert_relative_eq!(viewer.camera().aspect, 3.0);
        assert_eq!(viewer.viewport(), (1200, 400));
        assert!(viewer.take_redraw());
        assert!(matches!(viewer.phase(), LoadPhase::Loading));
        assert_eq!(click_button(&mut viewer), None);
        assert_eq!(viewer.toggle_lamp(), None);
    }

    #[test]
    fn load_failure_leaves_scene_unlit() {
        let mut viewer = viewer();
        viewer.on_scene_loaded(Err(ViewerError::EmptyDocument));

        assert!(matches!(viewer.phase(), LoadPhase::Failed(ViewerError::EmptyDocument)));
        assert!(!viewer.button().enabled());
        assert!(viewer.take_redraw());

        // A late success does not resurrect the viewer.
        viewer.on_scene_loaded(Ok(model("Sphere_6")));
        assert!(matches!(viewer.phase(), LoadPhase::Failed(_)));
        assert!(viewer.lamp().is_none());
    }

    #[test]
    fn bundled_scene_wires_lamp() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(ViewerConfig::default().model_path);
        let mut viewer = viewer();
        viewer.on_scene_loaded(crate::loader::load_scene(&path));

        assert_eq!(viewer.lamp_state(), Some(LampState::Off));
        assert_eq!(viewer.scene().mesh_nodes().count(), 4);
        assert_eq!(click_button(&mut viewer), Some(LampState::On));
        assert_eq!(bulb_intensity(&viewer), 1.0);
    }

    #[test]
    fn drag_orbits_camera() {
        let mut viewer = viewer();
        let before = viewer.camera().position;

        viewer.pointer_moved(400.0, 300.0);
        viewer.pointer_pressed();
        viewer.pointer_moved(460.0, 300.0);
        viewer.pointer_released();

        assert_ne!(viewer.camera().position, before);
        assert!(viewer.take_redraw());
    }

    #[test]
    fn release_off_button_does_not_toggle() {
        let mut viewer = viewer();
        viewer.on_scene_loaded(Ok(model("Sphere_6")));

        viewer.pointer_moved(30.0, 30.0);
        viewer.pointer_pressed();
        viewer.pointer_moved(300.0, 300.0);
        assert_eq!(viewer.pointer_released(), None);
        assert_eq!(viewer.lamp_state(), Some(LampState::Off));
    }
}
