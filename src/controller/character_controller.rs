use crate::config::ControllerConfig;
use crate::controller::input::{ArrowKey, Direction, DirectionalKeys, InputEvent};
use crate::controller::loader::LoadedAssets;
use crate::controller::{AnimationMixer, SceneEngine};
use crate::error::ViewerError;
use crate::model::{AnimationCatalog, AnimationName, CharacterTransform, Facing, FollowCamera};

/// Lifecycle of the controller, shown by the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loading,
    Ready,
    Unavailable { reason: String },
    TornDown,
}

/// Keyboard-driven animation and movement for one character.
///
/// Timestamps are milliseconds on a monotonic clock supplied by the caller;
/// frame deltas are seconds.
pub struct CharacterController<E: SceneEngine> {
    config: ControllerConfig,
    engine: E,
    catalog: Option<AnimationCatalog<E::Clip>>,
    mixer: Option<E::Mixer>,
    current: Option<AnimationName>,
    keys: DirectionalKeys,
    transform: CharacterTransform,
    camera: FollowCamera,
    status: LoadStatus,
}

impl<E: SceneEngine> CharacterController<E> {
    pub fn new(engine: E, config: ControllerConfig, width: u32, height: u32) -> Self {
        let transform = CharacterTransform::new(config.character_scale);
        Self {
            engine,
            catalog: None,
            mixer: None,
            current: None,
            keys: DirectionalKeys::new(),
            transform,
            camera: FollowCamera::new(width, height),
            status: LoadStatus::Loading,
            config,
        }
    }

    /// Attach the loaded character and start the idle clip
    pub fn initialize(&mut self, assets: LoadedAssets<E>) {
        if self.status != LoadStatus::Loading {
            tracing::warn!(status = ?self.status, "ignoring assets delivered outside of loading");
            return;
        }
        self.mixer = Some(self.engine.attach_character(assets.mesh));
        self.catalog = Some(assets.catalog);
        self.status = LoadStatus::Ready;

        // Keys pressed while loading already set the facing
        let initial = if self.keys.any_pressed() { AnimationName::Walking } else { AnimationName::Start };
        self.play_animation(initial);
        self.engine.place_character(&self.transform);
        tracing::info!("character ready");
    }

    /// Record a failed load; the viewer keeps running without a character
    pub fn fail(&mut self, err: &ViewerError) {
        if self.status == LoadStatus::Loading {
            tracing::error!(error = %err, "character assets unavailable");
            self.status = LoadStatus::Unavailable { reason: err.to_string() };
        }
    }

    /// Switch to `name` unless it is already playing. Returns whether a clip
    /// was started; before initialization or for an unknown clip this is a
    /// no-op.
    pub fn play_animation(&mut self, name: AnimationName) -> bool {
        if self.current == Some(name) {
            return false;
        }
        let (Some(mixer), Some(catalog)) = (self.mixer.as_mut(), self.catalog.as_ref()) else {
            tracing::debug!(animation = %name, "player not initialized, skipping");
            return false;
        };
        let Some(clip) = catalog.get(name) else {
            tracing::debug!(animation = %name, "clip not in catalog, skipping");
            return false;
        };
        mixer.stop_all();
        mixer.play(clip);
        tracing::debug!(from = ?self.current, to = %name, "animation switch");
        self.current = Some(name);
        true
    }

    pub fn handle_event(&mut self, event: &InputEvent, now_ms: f64) {
        match event {
            InputEvent::KeyDown(key) => self.handle_key_down(key, now_ms),
            InputEvent::KeyUp(key) => self.handle_key_up(key, now_ms),
            InputEvent::FocusLost => self.handle_focus_lost(),
            InputEvent::VisibilityChanged { visible } => {
                if !visible {
                    self.handle_focus_lost();
                }
            }
            InputEvent::Resized { width, height } => self.resize(*width, *height),
        }
    }

    pub fn handle_key_down(&mut self, key: &str, now_ms: f64) {
        if self.status == LoadStatus::TornDown {
            return;
        }
        let Some(arrow) = ArrowKey::from_key_name(key) else {
            tracing::trace!(key, "ignoring key");
            return;
        };
        match arrow.direction() {
            Some(dir) => {
                if self.keys.press(dir, now_ms) {
                    self.play_animation(AnimationName::Walking);
                }
                // Auto-repeat re-applies the facing, e.g. after a jump turned the character
                if self.keys.active() == Some(dir) {
                    self.transform.facing = dir.facing();
                }
            }
            None if arrow == ArrowKey::Up => {
                self.play_animation(AnimationName::JumpUp);
            }
            None => {
                self.play_animation(AnimationName::JumpDown);
            }
        }
    }

    pub fn handle_key_up(&mut self, key: &str, _now_ms: f64) {
        if self.status == LoadStatus::TornDown {
            return;
        }
        let Some(arrow) = ArrowKey::from_key_name(key) else {
            return;
        };
        match arrow.direction() {
            Some(dir) => {
                self.keys.release(dir);
                self.settle_after_release();
            }
            None => {
                self.play_animation(AnimationName::Start);
                self.transform.facing = Facing::FullTurn;
            }
        }
    }

    /// Release held keys whose key-up will never arrive
    pub fn handle_focus_lost(&mut self) {
        if self.status == LoadStatus::TornDown {
            return;
        }
        if !self.keys.clear().is_empty() {
            tracing::debug!("focus lost, releasing held keys");
            self.settle_after_release();
        }
    }

    fn settle_after_release(&mut self) {
        match self.keys.active() {
            // Still moving with the other key
            Some(other) => self.transform.facing = other.facing(),
            None => {
                self.play_animation(AnimationName::Start);
                self.transform.facing = Facing::Back;
            }
        }
    }

    /// Speed in units per frame tick for the current key state
    pub fn movement_speed(&self, now_ms: f64) -> f32 {
        match self.active_hold(now_ms) {
            None => 0.0,
            Some((_, held)) if held >= self.config.run_threshold_ms => self.config.run_speed,
            Some(_) => self.config.walk_speed,
        }
    }

    fn active_hold(&self, now_ms: f64) -> Option<(Direction, f64)> {
        let dir = self.keys.active()?;
        self.keys.held_for(dir, now_ms).map(|held| (dir, held))
    }

    /// Per-frame update: advance the clip, promote walking to running,
    /// move the character, trail the camera and render.
    pub fn update(&mut self, now_ms: f64, delta_secs: f32) {
        if self.status != LoadStatus::Ready {
            return;
        }
        let Some(mixer) = self.mixer.as_mut() else {
            return;
        };
        mixer.advance(delta_secs);

        let hold = self.active_hold(now_ms);
        if let Some((_, held)) = hold {
            if held >= self.config.run_threshold_ms {
                self.play_animation(AnimationName::Running);
            }
        }

        let speed = self.movement_speed(now_ms);
        if let Some((dir, _)) = hold {
            self.transform.position.x += dir.sign() * speed;
        }

        self.camera.follow(self.transform.position, &self.config);
        self.engine.place_character(&self.transform);
        if let Some(mixer) = self.mixer.as_ref() {
            self.engine.render(mixer, &self.camera);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!(width, height, "resize");
        self.camera.set_aspect(width, height);
    }

    /// Stop playback and drop the character. Later events and frames are ignored.
    pub fn teardown(&mut self) {
        if self.status == LoadStatus::TornDown {
            return;
        }
        self.keys.clear();
        if let Some(mut mixer) = self.mixer.take() {
            mixer.stop_all();
            self.engine.detach_character();
        }
        self.catalog = None;
        self.current = None;
        self.status = LoadStatus::TornDown;
        tracing::info!("controller torn down");
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == LoadStatus::Ready
    }

    pub fn current_animation(&self) -> Option<AnimationName> {
        self.current
    }

    pub fn transform(&self) -> &CharacterTransform {
        &self.transform
    }

    pub fn camera(&self) -> &FollowCamera {
        &self.camera
    }

    pub fn keys(&self) -> &DirectionalKeys {
        &self.keys
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
