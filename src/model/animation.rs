use std::collections::HashMap;
use std::fmt;

/// The fixed set of clips the character knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationName {
    Start,
    Walking,
    Running,
    JumpUp,
    JumpDown,
}

impl AnimationName {
    pub const ALL: [AnimationName; 5] = [
        AnimationName::Start,
        AnimationName::Walking,
        AnimationName::Running,
        AnimationName::JumpUp,
        AnimationName::JumpDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationName::Start => "Start",
            AnimationName::Walking => "Walking",
            AnimationName::Running => "Running",
            AnimationName::JumpUp => "JumpUp",
            AnimationName::JumpDown => "JumpDown",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.glb", self.as_str())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }
}

impl fmt::Display for AnimationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loaded clip handles keyed by name. Built once from the loader's output.
#[derive(Debug, Clone)]
pub struct AnimationCatalog<C> {
    clips: HashMap<AnimationName, C>,
}

impl<C> AnimationCatalog<C> {
    pub fn get(&self, name: AnimationName) -> Option<&C> {
        self.clips.get(&name)
    }

    pub fn contains(&self, name: AnimationName) -> bool {
        self.clips.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl<C> FromIterator<(AnimationName, C)> for AnimationCatalog<C> {
    fn from_iter<I: IntoIterator<Item = (AnimationName, C)>>(iter: I) -> Self {
        Self {
            clips: iter.into_iter().collect(),
        }
    }
}
