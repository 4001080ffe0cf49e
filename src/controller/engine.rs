use crate::error::ViewerError;
use crate::model::{AnimationName, CharacterTransform, FollowCamera};

/// Plays clips onto a character's skeleton.
pub trait AnimationMixer {
    type Clip;

    /// Start `clip` from its first frame.
    fn play(&mut self, clip: &Self::Clip);
    fn stop_all(&mut self);
    /// Advance every active clip by `dt` seconds.
    fn advance(&mut self, dt: f32);
}

/// The rendering and animation substrate the controller drives.
///
/// Decoding is associated (no `self`) so assets can be loaded while the
/// engine itself is borrowed elsewhere, e.g. by the frame loop.
pub trait SceneEngine {
    type Clip: Clone;
    type Mesh;
    type Mixer: AnimationMixer<Clip = Self::Clip>;

    fn decode_clip(asset: &str, name: AnimationName, bytes: &[u8]) -> Result<Self::Clip, ViewerError>;
    fn decode_mesh(asset: &str, bytes: &[u8]) -> Result<Self::Mesh, ViewerError>;

    /// Add the character to the scene and create its mixer.
    fn attach_character(&mut self, mesh: Self::Mesh) -> Self::Mixer;
    /// Remove the character from the scene.
    fn detach_character(&mut self);
    fn place_character(&mut self, transform: &CharacterTransform);
    fn render(&mut self, mixer: &Self::Mixer, camera: &FollowCamera);
}
