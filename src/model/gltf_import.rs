//! Decoding of binary glTF character assets.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::mesh::util::{ReadIndices, ReadJoints, ReadWeights};

use crate::error::ViewerError;
use crate::model::skeleton::{self, AnimationClip, Interpolate, Interpolation, SkinVertex, SkinnedMesh, Track};

type Buffers = Vec<gltf::buffer::Data>;

fn import(asset: &str, bytes: &[u8]) -> Result<(gltf::Document, Buffers), ViewerError> {
    let (doc, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| ViewerError::asset_unavailable(asset, e))?;
    Ok((doc, buffers))
}

/// Decode the first animation in `bytes` into a clip called `name`.
pub fn decode_clip(asset: &str, name: &str, bytes: &[u8]) -> Result<AnimationClip, ViewerError> {
    let (doc, buffers) = import(asset, bytes)?;
    let anim = doc
        .animations()
        .next()
        .ok_or_else(|| ViewerError::MissingAnimation { asset: asset.to_string() })?;

    let mut clip = AnimationClip { name: name.to_string(), ..Default::default() };
    for ch in anim.channels() {
        let node = ch.target().node();
        let node_name = node_name(&node);
        let rdr = ch.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
        let Some(inputs) = rdr.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        if let Some(&last) = times.last() {
            clip.duration = clip.duration.max(last);
        }
        let Some(outputs) = rdr.read_outputs() else {
            continue;
        };
        let mode = ch.sampler().interpolation();
        match outputs {
            ReadOutputs::Translations(it) => {
                if let Some(track) = keyframes(times, it.map(Vec3::from).collect(), mode) {
                    clip.translations.insert(node_name, track);
                }
            }
            ReadOutputs::Rotations(it) => {
                let raw = it.into_f32().map(Quat::from_array).collect();
                if let Some(mut track) = keyframes(times, raw, mode) {
                    track.values.iter_mut().for_each(|q| *q = q.normalize());
                    clip.rotations.insert(node_name, track);
                }
            }
            ReadOutputs::Scales(it) => {
                if let Some(track) = keyframes(times, it.map(Vec3::from).collect(), mode) {
                    clip.scales.insert(node_name, track);
                }
            }
            ReadOutputs::MorphTargetWeights(_) => {}
        }
    }
    tracing::debug!(clip = name, duration = clip.duration, "decoded clip");
    Ok(clip)
}

/// Decode every skinned primitive in `bytes` into one mesh. Files without a
/// skin fall back to world-space rigid geometry bound to a single identity joint.
pub fn decode_mesh(asset: &str, bytes: &[u8]) -> Result<SkinnedMesh, ViewerError> {
    let (doc, buffers) = import(asset, bytes)?;

    let node_count = doc.nodes().len();
    let mut parent = vec![None; node_count];
    let mut rest_t = vec![Vec3::ZERO; node_count];
    let mut rest_r = vec![Quat::IDENTITY; node_count];
    let mut rest_s = vec![Vec3::ONE; node_count];
    let mut node_names = Vec::with_capacity(node_count);
    for n in doc.nodes() {
        for c in n.children() {
            parent[c.index()] = Some(n.index());
        }
        let (t, r, s) = n.transform().decomposed();
        rest_t[n.index()] = Vec3::from(t);
        rest_r[n.index()] = Quat::from_array(r);
        rest_s[n.index()] = Vec3::from(s);
        node_names.push(node_name(&n));
    }

    let skin = doc.skins().next();
    let mut world = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for node in doc.nodes() {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let skinned = skin.is_some() && node.skin().is_some();
        // Rigid meshes are only used when the file has no skin at all
        if skin.is_some() && !skinned {
            continue;
        }
        // Skinned vertices are placed by their joints, rigid ones by their node
        let bake = if skinned {
            Mat4::IDENTITY
        } else {
            skeleton::compute_global(node.index(), &parent, &rest_t, &rest_r, &rest_s, &mut world)
        };
        for prim in mesh.primitives() {
            append_primitive(&prim, &buffers, skinned, bake, &mut vertices, &mut indices);
        }
    }
    if vertices.is_empty() {
        return Err(ViewerError::asset_unavailable(asset, "no mesh geometry"));
    }

    let (joint_nodes, inverse_bind) = match skin {
        Some(skin) => {
            let joint_nodes: Vec<usize> = skin.joints().map(|j| j.index()).collect();
            let rdr = skin.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
            let inverse_bind = match rdr.read_inverse_bind_matrices() {
                Some(it) => it.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
                None => vec![Mat4::IDENTITY; joint_nodes.len()],
            };
            (joint_nodes, inverse_bind)
        }
        // A joint pointing past the node list samples as identity
        None => (vec![usize::MAX], vec![Mat4::IDENTITY]),
    };

    tracing::info!(
        asset,
        vertices = vertices.len(),
        joints = joint_nodes.len(),
        "decoded character mesh"
    );
    Ok(SkinnedMesh {
        vertices,
        indices,
        joint_nodes,
        inverse_bind,
        parent,
        node_names,
        rest_t,
        rest_r,
        rest_s,
    })
}

/// Build a track from sampler output. Cubic splines store an
/// (in-tangent, value, out-tangent) triple per key; only the value is kept.
fn keyframes<T: Interpolate>(
    times: Vec<f32>,
    values: Vec<T>,
    mode: gltf::animation::Interpolation,
) -> Option<Track<T>> {
    use gltf::animation::Interpolation as Mode;
    let (values, interpolation) = match mode {
        Mode::Linear => (values, Interpolation::Linear),
        Mode::Step => (values, Interpolation::Step),
        Mode::CubicSpline => (values.chunks_exact(3).map(|c| c[1]).collect(), Interpolation::Linear),
    };
    if values.len() != times.len() {
        tracing::warn!(keys = times.len(), values = values.len(), "skipping malformed channel");
        return None;
    }
    Some(Track { times, values, interpolation })
}

fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()))
}

fn append_primitive(
    prim: &gltf::Primitive,
    buffers: &Buffers,
    skinned: bool,
    bake: Mat4,
    vertices: &mut Vec<SkinVertex>,
    indices: &mut Vec<u32>,
) {
    let reader = prim.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
    let Some(pos_it) = reader.read_positions() else {
        return;
    };
    let pos: Vec<[f32; 3]> = pos_it.collect();
    let nrm: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|it| it.collect())
        .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; pos.len()]);

    let joints: Vec<[u16; 4]> = match reader.read_joints(0).filter(|_| skinned) {
        Some(ReadJoints::U16(it)) => it.collect(),
        Some(ReadJoints::U8(it)) => it
            .map(|v| [v[0] as u16, v[1] as u16, v[2] as u16, v[3] as u16])
            .collect(),
        None => vec![[0; 4]; pos.len()],
    };
    let weights: Vec<[f32; 4]> = match reader.read_weights(0).filter(|_| skinned) {
        Some(ReadWeights::F32(it)) => it.collect(),
        Some(ReadWeights::U16(it)) => it
            .map(|v| v.map(|w| w as f32 / 65535.0))
            .collect(),
        Some(ReadWeights::U8(it)) => it
            .map(|v| v.map(|w| w as f32 / 255.0))
            .collect(),
        None => vec![[1.0, 0.0, 0.0, 0.0]; pos.len()],
    };

    let normal_bake = bake.inverse().transpose();
    let base = vertices.len() as u32;
    for i in 0..pos.len() {
        let normal = nrm.get(i).copied().map(Vec3::from).unwrap_or(Vec3::Y);
        vertices.push(SkinVertex {
            pos: bake.transform_point3(Vec3::from(pos[i])),
            normal: normal_bake.transform_vector3(normal).normalize_or_zero(),
            joints: joints.get(i).copied().unwrap_or([0; 4]),
            weights: weights.get(i).copied().unwrap_or([1.0, 0.0, 0.0, 0.0]),
        });
    }
    match reader.read_indices() {
        Some(ReadIndices::U8(it)) => indices.extend(it.map(|i| base + i as u32)),
        Some(ReadIndices::U16(it)) => indices.extend(it.map(|i| base + i as u32)),
        Some(ReadIndices::U32(it)) => indices.extend(it.map(|i| base + i)),
        None => indices.extend(base..base + pos.len() as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    /// Two joints, one triangle and a rotation channel on the child joint.
    const SKINNED_JSON: &str = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": BUFFER_LEN}],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 24},
            {"buffer": 0, "byteOffset": 60, "byteLength": 48},
            {"buffer": 0, "byteOffset": 108, "byteLength": 128},
            {"buffer": 0, "byteOffset": 236, "byteLength": 8},
            {"buffer": 0, "byteOffset": 244, "byteLength": OUTPUT_LEN}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 2, 0]},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "VEC4"},
            {"bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC4"},
            {"bufferView": 3, "componentType": 5126, "count": 2, "type": "MAT4"},
            {"bufferView": 4, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0], "max": [1]},
            {"bufferView": 5, "componentType": 5126, "count": OUTPUT_COUNT, "type": "VEC4"}
        ],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "JOINTS_0": 1, "WEIGHTS_0": 2}}]}],
        "skins": [{"joints": [0, 1], "inverseBindMatrices": 3}],
        "nodes": [
            {"name": "Hips", "children": [1]},
            {"name": "Spine", "translation": [0, 1, 0]},
            {"name": "Body", "mesh": 0, "skin": 0}
        ],
        "animations": [{
            "channels": [{"sampler": 0, "target": {"node": 1, "path": "rotation"}}],
            "samplers": [{"input": 4, "output": 5, "interpolation": "INTERPOLATION"}]
        }],
        "scenes": [{"nodes": [0, 2]}],
        "scene": 0
    }"#;

    /// One unskinned triangle under a translated parent, rotated a quarter turn.
    const RIGID_JSON: &str = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": 36}],
        "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 36}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 2, 0]}
        ],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "nodes": [
            {"name": "Prop", "translation": [2, 0, 0], "children": [1]},
            {"name": "Crate", "mesh": 0, "rotation": [0, 0, 0.70710677, 0.70710677]}
        ],
        "scenes": [{"nodes": [0]}],
        "scene": 0
    }"#;

    const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0];

    /// Pack a JSON chunk and a binary chunk into a `.glb` container
    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    fn quarter_turn() -> Quat {
        Quat::from_rotation_z(FRAC_PI_2)
    }

    fn skinned_glb(interpolation: &str) -> Vec<u8> {
        let (identity, quarter) = (Quat::IDENTITY.to_array(), quarter_turn().to_array());
        let keys: Vec<f32> = if interpolation == "CUBICSPLINE" {
            let tangent = [0.0; 4];
            [tangent, identity, tangent, tangent, quarter, tangent].concat()
        } else {
            [identity, quarter].concat()
        };

        let mut bin: Vec<u8> = Vec::new();
        bin.extend_from_slice(bytemuck::cast_slice(&TRIANGLE));
        bin.extend_from_slice(bytemuck::cast_slice(&[0u16, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0]));
        bin.extend_from_slice(bytemuck::cast_slice(&[1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0]));
        bin.extend_from_slice(bytemuck::cast_slice(&Mat4::IDENTITY.to_cols_array()));
        bin.extend_from_slice(bytemuck::cast_slice(
            &Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)).to_cols_array(),
        ));
        bin.extend_from_slice(bytemuck::cast_slice(&[0.0f32, 1.0]));
        bin.extend_from_slice(bytemuck::cast_slice(&keys));

        let json = SKINNED_JSON
            .replace("BUFFER_LEN", &bin.len().to_string())
            .replace("OUTPUT_LEN", &(keys.len() * 4).to_string())
            .replace("OUTPUT_COUNT", &(keys.len() / 4).to_string())
            .replace("INTERPOLATION", interpolation);
        glb(&json, &bin)
    }

    #[test]
    fn test_clip_decodes_rotation_channel() {
        let clip = decode_clip("models/Walking.glb", "Walking", &skinned_glb("LINEAR")).unwrap();
        assert_eq!(clip.name, "Walking");
        assert_relative_eq!(clip.duration, 1.0);
        assert!(clip.translations.is_empty());
        assert!(clip.scales.is_empty());
        assert_eq!(clip.rotations.len(), 1);

        let track = &clip.rotations["Spine"];
        assert_eq!(track.times, vec![0.0, 1.0]);
        assert_eq!(track.interpolation, Interpolation::Linear);
        assert!(track.values[0].abs_diff_eq(Quat::IDENTITY, 1e-6));
        assert!(track.values[1].abs_diff_eq(quarter_turn(), 1e-6));
    }

    #[test]
    fn test_cubic_spline_keeps_key_values() {
        let clip = decode_clip("models/Walking.glb", "Walking", &skinned_glb("CUBICSPLINE")).unwrap();
        let track = &clip.rotations["Spine"];
        assert_eq!(track.values.len(), track.times.len());
        assert!(track.values[0].abs_diff_eq(Quat::IDENTITY, 1e-6));
        assert!(track.values[1].abs_diff_eq(quarter_turn(), 1e-6));
    }

    #[test]
    fn test_step_channel_is_not_interpolated() {
        let clip = decode_clip("models/Walking.glb", "Walking", &skinned_glb("STEP")).unwrap();
        let track = &clip.rotations["Spine"];
        assert_eq!(track.interpolation, Interpolation::Step);
        assert!(track.sample(0.5).unwrap().abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn test_skinned_mesh_decodes_hierarchy_and_weights() {
        let mesh = decode_mesh("models/Start.glb", &skinned_glb("LINEAR")).unwrap();
        assert_eq!(mesh.joint_nodes, vec![0, 1]);
        assert_eq!(mesh.parent, vec![None, Some(0), None]);
        assert_eq!(mesh.node_names, vec!["Hips", "Spine", "Body"]);
        assert_eq!(mesh.rest_t[1], Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(mesh.inverse_bind[1], Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)));

        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
        // Skinned positions stay in bind space
        assert_eq!(mesh.vertices[2].pos, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(mesh.vertices[1].joints, [1, 0, 0, 0]);
        assert_eq!(mesh.vertices[2].joints, [0, 1, 0, 0]);
        assert_eq!(mesh.vertices[2].weights, [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_decoded_clip_poses_decoded_mesh() {
        let bytes = skinned_glb("LINEAR");
        let mesh = decode_mesh("models/Start.glb", &bytes).unwrap();
        let clip = decode_clip("models/Walking.glb", "Walking", &bytes).unwrap();

        // Halfway through, the spine has turned 45 degrees
        let palette = skeleton::sample_palette(&mesh, Some((&clip, 0.5)));
        let (pos, _) = skeleton::skin_vertex(&mesh.vertices[1], &palette);
        assert_relative_eq!(pos.x, std::f32::consts::SQRT_2, epsilon = 1e-5);
        assert_relative_eq!(pos.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rigid_fallback_bakes_node_transform() {
        let mesh = decode_mesh("models/Start.glb", &glb(RIGID_JSON, bytemuck::cast_slice(&TRIANGLE))).unwrap();
        assert_eq!(mesh.joint_nodes, vec![usize::MAX]);
        assert_eq!(mesh.inverse_bind, vec![Mat4::IDENTITY]);

        let v = &mesh.vertices[1];
        assert_relative_eq!(v.pos.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(v.pos.y, 1.0, epsilon = 1e-5);
        // Missing normals default to +y before the quarter turn
        assert_relative_eq!(v.normal.x, -1.0, epsilon = 1e-5);
        assert_eq!(v.weights, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_garbage_bytes_are_asset_unavailable() {
        let err = decode_clip("models/Walking.glb", "Walking", b"not a gltf file").unwrap_err();
        assert!(matches!(err, ViewerError::AssetUnavailable { ref asset, .. } if asset == "models/Walking.glb"));
        let err = decode_mesh("models/Start.glb", b"").unwrap_err();
        assert!(err.is_asset_failure());
    }

    #[test]
    fn test_document_without_animation_is_rejected() {
        let json = br#"{"asset":{"version":"2.0"},"nodes":[{"name":"Root"}],"scenes":[{"nodes":[0]}]}"#;
        let err = decode_clip("models/Start.glb", "Start", json).unwrap_err();
        assert!(matches!(err, ViewerError::MissingAnimation { .. }));
    }

    #[test]
    fn test_document_without_geometry_is_rejected() {
        let json = br#"{"asset":{"version":"2.0"},"nodes":[{"name":"Root"}],"scenes":[{"nodes":[0]}]}"#;
        let err = decode_mesh("models/Start.glb", json).unwrap_err();
        assert!(matches!(err, ViewerError::AssetUnavailable { .. }));
    }
}
