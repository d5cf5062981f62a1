//! Lamp toggle controller.
//!
//! Keeps the bulb's emissive intensity and the spot light under it in step
//! with a single on/off state driven by the toggle button.

use glam::Vec3;

use crate::config::LampSettings;
use crate::engine::{SceneEngine, SpotLightDesc};
use crate::error::{Result, ViewerError};
use crate::scene::{LightId, MaterialId, NodeId};

/// Button labels are padded to the same width.
pub const LABEL_ON: &str = " ON ";
pub const LABEL_OFF: &str = "OFF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LampState {
    #[default]
    Off,
    On,
}

impl LampState {
    pub fn flipped(self) -> Self {
        match self {
            LampState::Off => LampState::On,
            LampState::On => LampState::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LampState::Off => LABEL_OFF,
            LampState::On => LABEL_ON,
        }
    }

    pub fn emissive_intensity(self) -> f32 {
        match self {
            LampState::Off => 0.0,
            LampState::On => 1.0,
        }
    }

    pub fn light_visible(self) -> bool {
        self == LampState::On
    }
}

#[derive(Debug)]
pub struct LampController {
    state: LampState,
    bulb: MaterialId,
    light: LightId,
}

impl LampController {
    /// Finds the bulb under `model_root` and adds a hidden spot light above
    /// the ground directly below it. Nothing is added to the scene on error.
    pub fn initialize<E: SceneEngine>(
        engine: &mut E,
        model_root: NodeId,
        settings: &LampSettings,
    ) -> Result<Self> {
        let node = engine
            .find_node_by_name(model_root, &settings.node_name)
            .ok_or_else(|| ViewerError::LampNodeMissing(settings.node_name.clone()))?;
        let bulb = engine
            .first_material_child(node)
            .ok_or_else(|| ViewerError::LampMaterialMissing(settings.node_name.clone()))?;

        // Local position is relative to the model root, which is transformed.
        let position = engine.world_position(node);
        let state = LampState::Off;

        engine.set_emissive_intensity(bulb, state.emissive_intensity());
        let light = engine.add_spot_light(SpotLightDesc {
            color: settings.color,
            intensity: settings.intensity,
            distance: settings.distance,
            angle: settings.angle,
            penumbra: settings.penumbra,
            decay: settings.decay,
            position,
            target: Vec3::new(position.x, 0.0, position.z),
            visible: state.light_visible(),
        });

        log::info!(
            "Lamp {:?} wired at ({:.2}, {:.2}, {:.2})",
            settings.node_name,
            position.x,
            position.y,
            position.z
        );

        Ok(Self { state, bulb, light })
    }

    pub fn state(&self) -> LampState {
        self.state
    }

    pub fn light(&self) -> LightId {
        self.light
    }

    pub fn bulb(&self) -> MaterialId {
        self.bulb
    }

    /// Switches the lamp and requests one redraw. Returns the new state.
    pub fn toggle<E: SceneEngine>(&mut self, engine: &mut E) -> LampState {
        let next = self.state.flipped();
        engine.set_emissive_intensity(self.bulb, next.emissive_intensity());
        engine.set_light_visible(self.light, next.light_visible());
        engine.request_redraw();
        self.state = next;
        log::debug!("Lamp toggled {:?}", next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use crate::scene::{Light, Material, MeshData, Node, Scene};
    use approx::assert_relative_eq;

    struct Fixture {
        scene: Scene,
        model: NodeId,
    }

    /// Stage with a transformed model: Scene -> Lamp -> Sphere_6 -> Glass.
    fn fixture() -> Fixture {
        let mut model = Scene::new("Scene");
        model.node_mut(model.root()).transform = Transform::new(
            Vec3::new(-1.5, -2.0, 0.0),
            glam::Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2),
            Vec3::ONE,
        );
        let lamp = model.add_node(model.root(), Node::new("Lamp"));
        let sphere = model.add_node(
            lamp,
            Node::new("Sphere_6").with_transform(Transform::from_translation(Vec3::new(2.0, 6.0, 0.0))),
        );
        let glass = model.add_material(Material {
            emissive: [1.0, 0.9, 0.6],
            ..Material::default()
        });
        model.add_node(sphere, Node::new("Glass").with_mesh(MeshData::default(), glass));

        let mut scene = Scene::new("Stage");
        let model = scene.attach(model, scene.root());
        scene.take_redraw_requests();
        Fixture { scene, model }
    }

    fn spot_visible(scene: &Scene, controller: &LampController) -> bool {
        scene.light(controller.light()).visible()
    }

    fn intensity(scene: &Scene, controller: &LampController) -> f32 {
        scene.material(controller.bulb()).emissive_intensity
    }

    fn assert_consistent(scene: &Scene, controller: &LampController) {
        let on = controller.state() == LampState::On;
        assert_eq!(spot_visible(scene, controller), on);
        assert_eq!(intensity(scene, controller) == 1.0, on);
        assert_eq!(intensity(scene, controller) == 0.0, !on);
    }

    #[test]
    fn fresh_lamp_is_off() {
        let Fixture { mut scene, model } = fixture();
        let controller = LampController::initialize(&mut scene, model, &LampSettings::default()).unwrap();

        assert_eq!(controller.state(), LampState::Off);
        assert_eq!(controller.state().label(), "OFF");
        assert!(!spot_visible(&scene, &controller));
        assert_eq!(intensity(&scene, &controller), 0.0);
        assert_eq!(scene.lights().len(), 1);
    }

    #[test]
    fn spot_light_sits_at_world_position_of_bulb() {
        let Fixture { mut scene, model } = fixture();
        let controller = LampController::initialize(&mut scene, model, &LampSettings::default()).unwrap();

        let Light::Spot(spot) = scene.light(controller.light()).clone() else {
            panic!("expected a spot light");
        };
        // (2, 6, 0) rotated -90deg about Y is (0, 6, 2), then offset.
        assert_relative_eq!(spot.position.x, -1.5, epsilon = 1e-5);
        assert_relative_eq!(spot.position.y, 4.0, epsilon = 1e-5);
        assert_relative_eq!(spot.position.z, 2.0, epsilon = 1e-5);

        let target = scene.world_position(spot.target);
        assert_relative_eq!(target.x, spot.position.x, epsilon = 1e-5);
        assert_eq!(target.y, 0.0);
        assert_relative_eq!(target.z, spot.position.z, epsilon = 1e-5);
        assert_eq!(spot.angle, std::f32::consts::FRAC_PI_4);
        assert_eq!(spot.penumbra, 0.5);
    }

    #[test]
    fn one_toggle_turns_lamp_on() {
        let Fixture { mut scene, model } = fixture();
        let mut controller = LampController::initialize(&mut scene, model, &LampSettings::default()).unwrap();

        let state = controller.toggle(&mut scene);

        assert_eq!(state, LampState::On);
        assert_eq!(state.label(), " ON ");
        assert!(spot_visible(&scene, &controller));
        assert_eq!(intensity(&scene, &controller), 1.0);
        assert_eq!(scene.take_redraw_requests(), 1);
    }

    #[test]
    fn two_toggles_round_trip() {
        let Fixture { mut scene, model } = fixture();
        let mut controller = LampController::initialize(&mut scene, model, &LampSettings::default()).unwrap();

        controller.toggle(&mut scene);
        let state = controller.toggle(&mut scene);

        assert_eq!(state, LampState::Off);
        assert_eq!(state.label(), "OFF");
        assert!(!spot_visible(&scene, &controller));
        assert_eq!(intensity(&scene, &controller), 0.0);
        assert_eq!(scene.take_redraw_requests(), 2);
    }

    #[test]
    fn state_and_scene_never_disagree() {
        let Fixture { mut scene, model } = fixture();
        let mut controller = LampController::initialize(&mut scene, model, &LampSettings::default()).unwrap();

        assert_consistent(&scene, &controller);
        for _ in 0..7 {
            controller.toggle(&mut scene);
            assert_consistent(&scene, &controller);
        }
    }

    #[test]
    fn missing_node_adds_no_light() {
        let Fixture { mut scene, model } = fixture();
        let settings = LampSettings {
            node_name: "Sphere_99".to_string(),
            ..LampSettings::default()
        };
        let nodes_before = scene.node_count();

        let err = LampController::initialize(&mut scene, model, &settings).unwrap_err();

        assert!(matches!(err, ViewerError::LampNodeMissing(ref name) if name == "Sphere_99"));
        assert!(scene.lights().is_empty());
        assert_eq!(scene.node_count(), nodes_before);
    }

    #[test]
    fn node_without_material_child_is_rejected() {
        let Fixture { mut scene, model } = fixture();
        let settings = LampSettings {
            node_name: "Lamp".to_string(),
            ..LampSettings::default()
        };

        let err = LampController::initialize(&mut scene, model, &settings).unwrap_err();

        assert!(matches!(err, ViewerError::LampMaterialMissing(_)));
        assert!(scene.lights().is_empty());
    }

    /// Records calls so ordering can be checked without a real scene.
    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<&'static str>,
    }

    impl SceneEngine for RecordingEngine {
        fn find_node_by_name(&self, root: NodeId, _name: &str) -> Option<NodeId> {
            Some(root)
        }

        fn world_position(&self, _node: NodeId) -> Vec3 {
            Vec3::new(0.0, 3.0, 0.0)
        }

        fn first_material_child(&self, _node: NodeId) -> Option<MaterialId> {
            let mut scene = Scene::new("Scratch");
            Some(scene.add_material(Material::default()))
        }

        fn set_emissive_intensity(&mut self, _material: MaterialId, _intensity: f32) {
            self.calls.push("intensity");
        }

        fn add_spot_light(&mut self, desc: SpotLightDesc) -> LightId {
            assert_eq!(desc.target, Vec3::ZERO);
            self.calls.push("add_light");
            let mut scene = Scene::new("Scratch");
            scene.add_spot_light(desc)
        }

        fn set_light_visible(&mut self, _light: LightId, _visible: bool) {
            self.calls.push("visible");
        }

        fn request_redraw(&mut self) {
            self.calls.push("redraw");
        }
    }

    #[test]
    fn toggle_redraws_after_both_writes() {
        let mut engine = RecordingEngine::default();
        let root = Scene::new("Scratch").root();
        let mut controller = LampController::initialize(&mut engine, root, &LampSettings::default()).unwrap();
        assert_eq!(engine.calls, ["intensity", "add_light"]);

        engine.calls.clear();
        controller.toggle(&mut engine);
        assert_eq!(engine.calls, ["intensity", "visible", "redraw"]);
    }
}
