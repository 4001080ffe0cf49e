//! Skinned mesh data and CPU-side animation sampling.
//!
//! Clips and meshes come from separate files, so tracks are bound to joints
//! by node name rather than by node index.

use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct SkinVertex {
    pub pos: Vec3,
    pub normal: Vec3,
    pub joints: [u16; 4],
    pub weights: [f32; 4],
}

/// Bind-pose mesh plus the node hierarchy it is skinned to.
#[derive(Debug, Clone)]
pub struct SkinnedMesh {
    pub vertices: Vec<SkinVertex>,
    pub indices: Vec<u32>,
    /// Node index of each joint, in skin order.
    pub joint_nodes: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
    pub parent: Vec<Option<usize>>,
    pub node_names: Vec<String>,
    pub rest_t: Vec<Vec3>,
    pub rest_r: Vec<Quat>,
    pub rest_s: Vec<Vec3>,
}

impl SkinnedMesh {
    pub fn node_count(&self) -> usize {
        self.parent.len()
    }
}

pub trait Interpolate: Copy {
    fn interpolate(self, other: Self, f: f32) -> Self;
}

impl Interpolate for Vec3 {
    fn interpolate(self, other: Self, f: f32) -> Self { self.lerp(other, f) }
}

impl Interpolate for Quat {
    fn interpolate(self, other: Self, f: f32) -> Self { self.slerp(other, f) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Hold the previous key until the next one
    Step,
}

/// Keyframes of one animated property. `times` is sorted ascending.
#[derive(Debug, Clone)]
pub struct Track<T> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    pub interpolation: Interpolation,
}

impl<T: Interpolate> Track<T> {
    pub fn linear(times: Vec<f32>, values: Vec<T>) -> Self {
        Self { times, values, interpolation: Interpolation::Linear }
    }

    pub fn sample(&self, t: f32) -> Option<T> {
        let (first, last) = (self.times.first()?, self.times.last()?);
        if self.values.len() < self.times.len() {
            return None;
        }
        if t <= *first {
            return Some(self.values[0]);
        }
        if t >= *last {
            return Some(self.values[self.times.len() - 1]);
        }
        // First key strictly after t; t > first guarantees i >= 1
        let i = self.times.partition_point(|&k| k <= t);
        if self.interpolation == Interpolation::Step {
            return Some(self.values[i - 1]);
        }
        let (t0, t1) = (self.times[i - 1], self.times[i]);
        let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
        Some(self.values[i - 1].interpolate(self.values[i], f))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub translations: HashMap<String, Track<Vec3>>,
    pub rotations: HashMap<String, Track<Quat>>,
    pub scales: HashMap<String, Track<Vec3>>,
}

impl AnimationClip {
    /// Wrap playback time into the clip; clips loop.
    pub fn local_time(&self, t: f32) -> f32 {
        if self.duration > 0.0 { t.rem_euclid(self.duration) } else { 0.0 }
    }
}

/// Joint matrices (global * inverse bind) for `clip` at time `t`, or the
/// rest pose when no clip is playing.
pub fn sample_palette(mesh: &SkinnedMesh, clip: Option<(&AnimationClip, f32)>) -> Vec<Mat4> {
    let mut lt = mesh.rest_t.clone();
    let mut lr = mesh.rest_r.clone();
    let mut ls = mesh.rest_s.clone();

    if let Some((clip, t)) = clip {
        let time = clip.local_time(t);
        for (node, name) in mesh.node_names.iter().enumerate() {
            if let Some(v) = clip.translations.get(name).and_then(|tr| tr.sample(time)) {
                lt[node] = v;
            }
            if let Some(v) = clip.rotations.get(name).and_then(|tr| tr.sample(time)) {
                lr[node] = v;
            }
            if let Some(v) = clip.scales.get(name).and_then(|tr| tr.sample(time)) {
                ls[node] = v;
            }
        }
    }

    let mut cache: HashMap<usize, Mat4> = HashMap::new();
    mesh.joint_nodes
        .iter()
        .enumerate()
        .map(|(i, &node)| {
            let global = if node < mesh.node_count() {
                compute_global(node, &mesh.parent, &lt, &lr, &ls, &mut cache)
            } else {
                Mat4::IDENTITY
            };
            global * mesh.inverse_bind.get(i).copied().unwrap_or(Mat4::IDENTITY)
        })
        .collect()
}

pub(crate) fn compute_global(
    node: usize,
    parent: &[Option<usize>],
    lt: &[Vec3],
    lr: &[Quat],
    ls: &[Vec3],
    cache: &mut HashMap<usize, Mat4>,
) -> Mat4 {
    if let Some(m) = cache.get(&node) {
        return *m;
    }
    let local = Mat4::from_scale_rotation_translation(ls[node], lr[node], lt[node]);
    let m = match parent[node] {
        Some(p) => compute_global(p, parent, lt, lr, ls, cache) * local,
        None => local,
    };
    cache.insert(node, m);
    m
}

/// Linear blend skinning of one vertex; returns (position, normal) in mesh space.
pub fn skin_vertex(v: &SkinVertex, palette: &[Mat4]) -> (Vec3, Vec3) {
    let mut skin = Mat4::ZERO;
    let mut total = 0.0;
    for k in 0..4 {
        let w = v.weights[k];
        if w <= 0.0 {
            continue;
        }
        if let Some(m) = palette.get(v.joints[k] as usize) {
            skin += *m * w;
            total += w;
        }
    }
    if total <= 0.0 {
        return (v.pos, v.normal);
    }
    let skin = skin * (1.0 / total);
    (skin.transform_point3(v.pos), skin.transform_vector3(v.normal).normalize_or_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_bone_mesh() -> SkinnedMesh {
        SkinnedMesh {
            vertices: vec![SkinVertex {
                pos: Vec3::new(0.0, 2.0, 0.0),
                normal: Vec3::X,
                joints: [1, 0, 0, 0],
                weights: [1.0, 0.0, 0.0, 0.0],
            }],
            indices: vec![0],
            joint_nodes: vec![0, 1],
            inverse_bind: vec![Mat4::IDENTITY, Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))],
            parent: vec![None, Some(0)],
            node_names: vec!["Hips".into(), "Spine".into()],
            rest_t: vec![Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)],
            rest_r: vec![Quat::IDENTITY; 2],
            rest_s: vec![Vec3::ONE; 2],
        }
    }

    #[test]
    fn test_track_interpolates_between_keys() {
        let track = Track::linear(vec![0.0, 1.0], vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]);
        assert_relative_eq!(track.sample(0.25).unwrap().x, 0.5);
        assert_relative_eq!(track.sample(-1.0).unwrap().x, 0.0);
        assert_relative_eq!(track.sample(5.0).unwrap().x, 2.0);
    }

    #[test]
    fn test_step_track_holds_previous_key() {
        let mut track = Track::linear(vec![0.0, 1.0, 2.0], vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        track.interpolation = Interpolation::Step;
        assert_eq!(track.sample(0.9), Some(Vec3::ZERO));
        assert_eq!(track.sample(1.0), Some(Vec3::X));
        assert_eq!(track.sample(1.5), Some(Vec3::X));
        assert_eq!(track.sample(3.0), Some(Vec3::Y));
    }

    #[test]
    fn test_empty_track_samples_nothing() {
        let track: Track<Vec3> = Track::linear(vec![], vec![]);
        assert!(track.sample(0.5).is_none());
    }

    #[test]
    fn test_clip_time_loops() {
        let clip = AnimationClip { duration: 2.0, ..Default::default() };
        assert_relative_eq!(clip.local_time(5.0), 1.0);
        let still = AnimationClip::default();
        assert_eq!(still.local_time(3.0), 0.0);
    }

    #[test]
    fn test_rest_pose_leaves_vertices_in_place() {
        let mesh = two_bone_mesh();
        let palette = sample_palette(&mesh, None);
        let (pos, normal) = skin_vertex(&mesh.vertices[0], &palette);
        assert_relative_eq!(pos.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(normal.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_clip_rotation_moves_child_vertex() {
        let mesh = two_bone_mesh();
        let mut clip = AnimationClip { name: "Bend".into(), duration: 1.0, ..Default::default() };
        let quarter = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        clip.rotations.insert(
            "Spine".into(),
            Track::linear(vec![0.0, 1.0], vec![quarter, quarter]),
        );
        let palette = sample_palette(&mesh, Some((&clip, 0.5)));
        let (pos, _) = skin_vertex(&mesh.vertices[0], &palette);
        // Vertex one unit above the spine joint swings to the -x side
        assert_relative_eq!(pos.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(pos.y, 1.0, epsilon = 1e-5);
    }
}
