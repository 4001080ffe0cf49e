// CONTROLLER: Input, character state and update loop
pub mod engine;
pub mod input;
pub mod loader;
pub mod character_controller;
pub mod frame_loop;

pub use engine::{AnimationMixer, SceneEngine};
pub use input::{ArrowKey, Direction, DirectionalKeys, InputEvent};
pub use loader::{AssetLoader, AssetSource, LoadedAssets};
#[cfg(target_arch = "wasm32")]
pub use loader::FetchSource;
#[cfg(not(target_arch = "wasm32"))]
pub use loader::FsSource;
pub use character_controller::{CharacterController, LoadStatus};
pub use frame_loop::{FpsCounter, FrameInput, FrameLoopContext};
