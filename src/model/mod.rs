// MODEL: Character, animation and scene data
pub mod animation;
pub mod camera;
pub mod character;
pub mod gltf_import;
pub mod mixer;
pub mod scene;
pub mod skeleton;

pub use animation::{AnimationCatalog, AnimationName};
pub use camera::FollowCamera;
pub use character::{CharacterTransform, Facing};
pub use mixer::ClipMixer;
pub use scene::{CpuScene, SceneLighting};
pub use skeleton::{AnimationClip, SkinnedMesh};
