use crate::model::AnimationName;

/// Tunables for movement and the follow camera.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Units per frame tick before the run threshold.
    pub walk_speed: f32,
    /// Units per frame tick once the key has been held past the threshold.
    pub run_speed: f32,
    /// Hold time in milliseconds after which walking becomes running.
    pub run_threshold_ms: f64,
    pub camera_height: f32,
    pub camera_distance: f32,
    /// Height above the character's feet the camera looks at.
    pub look_at_height: f32,
    pub character_scale: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            walk_speed: 0.05,
            run_speed: 0.1,
            run_threshold_ms: 1000.0,
            camera_height: 2.0,
            camera_distance: 5.0,
            look_at_height: 1.0,
            character_scale: 0.01,
        }
    }
}

/// Relative paths of the assets the viewer needs. Fixed, not user configurable.
#[derive(Debug, Clone)]
pub struct AssetManifest {
    pub models_dir: String,
    pub character_mesh: String,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            character_mesh: format!("models/{}", AnimationName::Start.file_name()),
        }
    }
}

impl AssetManifest {
    pub fn clip_path(&self, name: AnimationName) -> String {
        format!("{}/{}", self.models_dir, name.file_name())
    }
}

/// Environment variable overriding the native asset root directory.
pub const ASSET_ROOT_ENV: &str = "CHARACTER_VIEWER_ASSETS";

/// Asset root for native builds: `$CHARACTER_VIEWER_ASSETS` or `assets`.
#[cfg(not(target_arch = "wasm32"))]
pub fn native_asset_root() -> std::path::PathBuf {
    std::env::var(ASSET_ROOT_ENV)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("assets"))
}
