use glam::{Mat3, Mat4, Vec3};
use std::rc::Rc;

use crate::controller::SceneEngine;
use crate::error::ViewerError;
use crate::model::gltf_import;
use crate::model::mixer::ClipMixer;
use crate::model::skeleton::{self, AnimationClip, SkinnedMesh};
use crate::model::{AnimationName, CharacterTransform, FollowCamera};
use crate::utils::{create_ground_mesh, hex_color, Mesh, Vertex};

const GROUND_SIZE: f32 = 200.0;
const GROUND_COLOR: u32 = 0x888888;
const CHARACTER_COLOR: u32 = 0xc8a27a;

/// Ambient plus one directional light, both white.
#[derive(Debug, Clone, Copy)]
pub struct SceneLighting {
    pub ambient: f32,
    pub sun_intensity: f32,
    pub sun_dir: Vec3,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            ambient: 0.6,
            sun_intensity: 1.0,
            sun_dir: Vec3::new(5.0, 10.0, 7.5).normalize(),
        }
    }
}

/// Scene engine that skins the character on the CPU and hands world-space
/// geometry to the renderer.
pub struct CpuScene {
    ground: Mesh,
    character: Option<SkinnedMesh>,
    character_model: Mat4,
    pub lighting: SceneLighting,
    frame: Mesh,
    view_proj: Mat4,
}

impl CpuScene {
    pub fn new(camera: &FollowCamera) -> Self {
        let ground = create_ground_mesh(GROUND_SIZE, hex_color(GROUND_COLOR));
        Self {
            frame: ground.clone(),
            ground,
            character: None,
            character_model: Mat4::IDENTITY,
            lighting: SceneLighting::default(),
            view_proj: camera.view_proj(),
        }
    }

    /// World-space geometry of the last rendered frame
    pub fn frame(&self) -> &Mesh {
        &self.frame
    }

    pub fn view_proj(&self) -> Mat4 {
        self.view_proj
    }

    pub fn has_character(&self) -> bool {
        self.character.is_some()
    }

    /// Keep the camera projection current before the character exists
    pub fn set_camera(&mut self, camera: &FollowCamera) {
        self.view_proj = camera.view_proj();
    }

    fn skin_character(&mut self, mesh: &SkinnedMesh, mixer: &ClipMixer) {
        let palette = skeleton::sample_palette(mesh, mixer.pose_source());
        let model = self.character_model;
        let normal_mat = Mat3::from_mat4(model).inverse().transpose();
        let color = hex_color(CHARACTER_COLOR);

        let base = self.frame.vertices.len() as u32;
        self.frame.vertices.extend(mesh.vertices.iter().map(|v| {
            let (pos, normal) = skeleton::skin_vertex(v, &palette);
            Vertex {
                pos: model.transform_point3(pos).to_array(),
                normal: (normal_mat * normal).normalize_or_zero().to_array(),
                color,
            }
        }));
        self.frame.indices.extend(mesh.indices.iter().map(|i| base + i));
    }
}

impl SceneEngine for CpuScene {
    type Clip = Rc<AnimationClip>;
    type Mesh = SkinnedMesh;
    type Mixer = ClipMixer;

    fn decode_clip(asset: &str, name: AnimationName, bytes: &[u8]) -> Result<Self::Clip, ViewerError> {
        gltf_import::decode_clip(asset, name.as_str(), bytes).map(Rc::new)
    }

    fn decode_mesh(asset: &str, bytes: &[u8]) -> Result<Self::Mesh, ViewerError> {
        gltf_import::decode_mesh(asset, bytes)
    }

    fn attach_character(&mut self, mesh: Self::Mesh) -> Self::Mixer {
        self.character = Some(mesh);
        ClipMixer::new()
    }

    fn detach_character(&mut self) {
        self.character = None;
        self.frame = self.ground.clone();
    }

    fn place_character(&mut self, transform: &CharacterTransform) {
        self.character_model = transform.model_matrix();
    }

    fn render(&mut self, mixer: &Self::Mixer, camera: &FollowCamera) {
        self.view_proj = camera.view_proj();
        self.frame.clear();
        self.frame.extend_from(&self.ground);
        // Taken out for the duration of skinning so `self` can be borrowed mutably
        if let Some(mesh) = self.character.take() {
            self.skin_character(&mesh, mixer);
            self.character = Some(mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::skeleton::SkinVertex;
    use crate::model::Facing;
    use glam::Quat;

    fn single_triangle() -> SkinnedMesh {
        let v = |x: f32, y: f32| SkinVertex {
            pos: Vec3::new(x, y, 0.0),
            normal: Vec3::Z,
            joints: [0; 4],
            weights: [1.0, 0.0, 0.0, 0.0],
        };
        SkinnedMesh {
            vertices: vec![v(0.0, 0.0), v(100.0, 0.0), v(0.0, 100.0)],
            indices: vec![0, 1, 2],
            joint_nodes: vec![0],
            inverse_bind: vec![Mat4::IDENTITY],
            parent: vec![None],
            node_names: vec!["Hips".into()],
            rest_t: vec![Vec3::ZERO],
            rest_r: vec![Quat::IDENTITY],
            rest_s: vec![Vec3::ONE],
        }
    }

    #[test]
    fn test_new_scene_draws_ground_only() {
        let cam = FollowCamera::new(800, 600);
        let scene = CpuScene::new(&cam);
        assert_eq!(scene.frame().vertices.len(), 4);
        assert!(!scene.has_character());
    }

    #[test]
    fn test_render_places_scaled_character() {
        let cam = FollowCamera::new(800, 600);
        let mut scene = CpuScene::new(&cam);
        let mixer = scene.attach_character(single_triangle());

        let mut transform = CharacterTransform::new(0.01);
        transform.position.x = 2.0;
        transform.facing = Facing::FullTurn;
        scene.place_character(&transform);
        scene.render(&mixer, &cam);

        let frame = scene.frame();
        assert_eq!(frame.vertices.len(), 7);
        assert_eq!(&frame.indices[6..], &[4, 5, 6]);
        let top = frame.vertices[6].pos;
        assert!((top[0] - 2.0).abs() < 1e-4);
        assert!((top[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_detach_restores_ground() {
        let cam = FollowCamera::new(800, 600);
        let mut scene = CpuScene::new(&cam);
        let mixer = scene.attach_character(single_triangle());
        scene.render(&mixer, &cam);
        scene.detach_character();
        assert_eq!(scene.frame().vertices.len(), 4);
    }
}
