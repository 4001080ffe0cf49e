use std::rc::Rc;

use crate::controller::AnimationMixer;
use crate::model::skeleton::AnimationClip;

/// One clip being played with its own local clock.
#[derive(Debug, Clone)]
pub struct ClipAction {
    pub clip: Rc<AnimationClip>,
    pub time: f32,
}

/// Plays clips onto a character. Several actions may be active, but the
/// pose is taken from the most recently started one.
#[derive(Debug, Default)]
pub struct ClipMixer {
    actions: Vec<ClipAction>,
}

impl ClipMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> &[ClipAction] {
        &self.actions
    }

    /// Clip and playback time used for posing
    pub fn pose_source(&self) -> Option<(&AnimationClip, f32)> {
        self.actions.last().map(|a| (a.clip.as_ref(), a.time))
    }
}

impl AnimationMixer for ClipMixer {
    type Clip = Rc<AnimationClip>;

    fn play(&mut self, clip: &Self::Clip) {
        // Restarting a clip that is already active resets it to its first frame
        self.actions.retain(|a| !Rc::ptr_eq(&a.clip, clip));
        self.actions.push(ClipAction { clip: Rc::clone(clip), time: 0.0 });
    }

    fn stop_all(&mut self) {
        self.actions.clear();
    }

    fn advance(&mut self, dt: f32) {
        for action in &mut self.actions {
            action.time += dt;
        }
    }
}
