#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use character_viewer::config::ControllerConfig;
use character_viewer::controller::{AnimationMixer, CharacterController, LoadedAssets, SceneEngine};
use character_viewer::error::ViewerError;
use character_viewer::model::{AnimationName, CharacterTransform, FollowCamera};

/// What the controller asked of the mixer, in order
#[derive(Debug, Clone, PartialEq)]
pub enum MixerCall {
    Play(AnimationName),
    StopAll,
}

pub type CallLog = Rc<RefCell<Vec<MixerCall>>>;

pub struct RecordingMixer {
    log: CallLog,
    pub elapsed: f32,
}

impl AnimationMixer for RecordingMixer {
    type Clip = AnimationName;

    fn play(&mut self, clip: &AnimationName) {
        self.log.borrow_mut().push(MixerCall::Play(*clip));
    }

    fn stop_all(&mut self) {
        self.log.borrow_mut().push(MixerCall::StopAll);
    }

    fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
    }
}

/// Engine whose clips are just their names; records what it was asked to do
#[derive(Default)]
pub struct FakeEngine {
    pub log: CallLog,
    pub attached: bool,
    pub renders: usize,
    pub placed: Option<CharacterTransform>,
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<MixerCall> {
        self.log.borrow().clone()
    }

    pub fn plays(&self) -> Vec<AnimationName> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                MixerCall::Play(name) => Some(*name),
                MixerCall::StopAll => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }
}

impl SceneEngine for FakeEngine {
    type Clip = AnimationName;
    type Mesh = ();
    type Mixer = RecordingMixer;

    fn decode_clip(_asset: &str, name: AnimationName, _bytes: &[u8]) -> Result<AnimationName, ViewerError> {
        Ok(name)
    }

    fn decode_mesh(_asset: &str, _bytes: &[u8]) -> Result<(), ViewerError> {
        Ok(())
    }

    fn attach_character(&mut self, _mesh: ()) -> RecordingMixer {
        self.attached = true;
        RecordingMixer { log: self.log.clone(), elapsed: 0.0 }
    }

    fn detach_character(&mut self) {
        self.attached = false;
    }

    fn place_character(&mut self, transform: &CharacterTransform) {
        self.placed = Some(transform.clone());
    }

    fn render(&mut self, _mixer: &RecordingMixer, _camera: &FollowCamera) {
        self.renders += 1;
    }
}

pub fn full_catalog() -> LoadedAssets<FakeEngine> {
    LoadedAssets {
        catalog: AnimationName::ALL.into_iter().map(|n| (n, n)).collect(),
        mesh: (),
    }
}

pub fn controller() -> CharacterController<FakeEngine> {
    CharacterController::new(FakeEngine::default(), ControllerConfig::default(), 800, 600)
}

/// A controller that finished loading, with the log cleared
pub fn ready_controller() -> CharacterController<FakeEngine> {
    let mut c = controller();
    c.initialize(full_catalog());
    c.engine().clear_log();
    c
}

/// Call `update` every `step_ms` from `from_ms` (exclusive) through `to_ms` (inclusive)
pub fn run_frames(c: &mut CharacterController<FakeEngine>, from_ms: f64, to_ms: f64, step_ms: f64) {
    let mut t = from_ms + step_ms;
    while t <= to_ms + 1e-9 {
        c.update(t, (step_ms / 1000.0) as f32);
        t += step_ms;
    }
}
