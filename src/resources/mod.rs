//! Loading glTF/GLB assets into scene graphs and animation clips.
//!
//! Decoding is split in two: [`read_mesh_data`] and [`read_animations`] turn
//! the document into plain vertex, index and keyframe data without touching
//! the GPU, and [`load_model_gltf`] uploads that data and assembles the
//! scene graph under one root node.

use anyhow::{Context as _, bail};
use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};
use log::{debug, warn};

use crate::{
    data_structures::{
        animation::{AnimationClip, Channel, Interpolation, Keyframes},
        instance::Instance,
        model::{self, ModelVertex},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        skin::{MAX_JOINTS, Skin},
        texture::Texture,
    },
    pipelines::Layouts,
    resources::texture::{load_binary, load_texture},
};

pub mod pick;
pub mod texture;

/// Normal used when a primitive carries none.
const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// CPU-side geometry of one triangle primitive.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    /// Material index in the document, if any.
    pub material: Option<usize>,
}

/// A decoded asset: the scene graph and the clips that can drive it.
pub struct LoadedModel {
    pub root: ContainerNode,
    pub clips: Vec<AnimationClip>,
}

/// Reads vertices and indices of every triangle primitive of `mesh`.
///
/// Non-indexed primitives get sequential indices; primitives of other
/// topologies are skipped.
pub fn read_mesh_data(mesh: &gltf::Mesh, buffers: &[Vec<u8>]) -> Vec<PrimitiveData> {
    mesh.primitives()
        .filter_map(|primitive| {
            if !matches!(primitive.mode(), gltf::mesh::Mode::Triangles) {
                warn!(
                    "skipping primitive {} of mesh {:?}: unsupported mode {:?}",
                    primitive.index(),
                    mesh.name(),
                    primitive.mode()
                );
                return None;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

            let mut vertices: Vec<ModelVertex> = match reader.read_positions() {
                Some(positions) => positions
                    .map(|position| ModelVertex {
                        position,
                        normal: DEFAULT_NORMAL,
                        ..ModelVertex::default()
                    })
                    .collect(),
                None => {
                    warn!("primitive {} of mesh {:?} has no positions", primitive.index(), mesh.name());
                    return None;
                }
            };
            if let Some(normals) = reader.read_normals() {
                vertices
                    .iter_mut()
                    .zip(normals)
                    .for_each(|(vertex, normal)| vertex.normal = normal);
            }
            if let Some(tex_coords) = reader.read_tex_coords(0).map(|t| t.into_f32()) {
                vertices
                    .iter_mut()
                    .zip(tex_coords)
                    .for_each(|(vertex, tex_coords)| vertex.tex_coords = tex_coords);
            }
            if let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0)) {
                vertices
                    .iter_mut()
                    .zip(joints.into_u16().zip(weights.into_f32()))
                    .for_each(|(vertex, (joints, weights))| {
                        vertex.joints = joints.map(u32::from);
                        let total: f32 = weights.iter().sum();
                        if total > 0.0 {
                            vertex.weights = weights.map(|w| w / total);
                        }
                    });
            }

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };

            Some(PrimitiveData {
                vertices,
                indices,
                material: primitive.material().index(),
            })
        })
        .collect()
}

/// Reads the joints of `skin` and their inverse bind matrices.
///
/// Missing inverse bind matrices default to identity. Joints beyond
/// [`MAX_JOINTS`] are dropped.
pub fn read_skin(skin: &gltf::Skin, buffers: &[Vec<u8>]) -> Skin {
    let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
    let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let mut inverse_bind: Vec<Matrix4<f32>> = match reader.read_inverse_bind_matrices() {
        Some(matrices) => matrices.map(Matrix4::from).collect(),
        None => Vec::new(),
    };
    inverse_bind.resize(joints.len(), Matrix4::identity());
    if joints.len() > MAX_JOINTS {
        warn!(
            "skin {:?} has {} joints, only {} are animated",
            skin.name(),
            joints.len(),
            MAX_JOINTS
        );
    }
    Skin {
        joints,
        inverse_bind,
    }
}

/// Reads every animation of the document as a clip of node TRS channels.
///
/// Cubic spline channels keep only their key values and are sampled
/// linearly. Morph target weights are not supported and are dropped.
pub fn read_animations(document: &gltf::Document, buffers: &[Vec<u8>]) -> Vec<AnimationClip> {
    document
        .animations()
        .map(|animation| {
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation_{}", animation.index()));
            let channels = animation
                .channels()
                .filter_map(|channel| {
                    let reader =
                        channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
                    let timestamps: Vec<f32> = reader.read_inputs()?.collect();
                    let sampler = channel.sampler().interpolation();
                    let interpolation = match sampler {
                        gltf::animation::Interpolation::Step => Interpolation::Step,
                        _ => Interpolation::Linear,
                    };
                    let cubic = matches!(sampler, gltf::animation::Interpolation::CubicSpline);
                    // cubic splines store (in-tangent, value, out-tangent) per key
                    let keys = |values: Vec<Vector3<f32>>| -> Vec<Vector3<f32>> {
                        if cubic {
                            values.into_iter().skip(1).step_by(3).collect()
                        } else {
                            values
                        }
                    };
                    let (keyframes, len) = match reader.read_outputs()? {
                        gltf::animation::util::ReadOutputs::Translations(values) => {
                            let values = keys(values.map(Vector3::from).collect());
                            let len = values.len();
                            (Keyframes::Translation(values), len)
                        }
                        gltf::animation::util::ReadOutputs::Scales(values) => {
                            let values = keys(values.map(Vector3::from).collect());
                            let len = values.len();
                            (Keyframes::Scale(values), len)
                        }
                        gltf::animation::util::ReadOutputs::Rotations(values) => {
                            let values: Vec<Quaternion<f32>> = values
                                .into_f32()
                                .map(|q| Quaternion::new(q[3], q[0], q[1], q[2]))
                                .collect();
                            let values = if cubic {
                                values.into_iter().skip(1).step_by(3).collect()
                            } else {
                                values
                            };
                            let len = values.len();
                            (Keyframes::Rotation(values), len)
                        }
                        gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => {
                            debug!("skipping morph target channel in {}", name);
                            return None;
                        }
                    };
                    if len != timestamps.len() {
                        warn!(
                            "channel {} of {} has {} keys for {} timestamps",
                            channel.index(),
                            name,
                            len,
                            timestamps.len()
                        );
                        return None;
                    }
                    Some(Channel {
                        target: channel.target().node().index(),
                        interpolation,
                        timestamps,
                        keyframes,
                    })
                })
                .collect();
            AnimationClip::new(name, channels)
        })
        .collect()
}

async fn load_buffers(gltf: &gltf::Gltf) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => bail!("buffer {} refers to a missing binary chunk", buffer.index()),
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                bail!("embedded data URIs are not supported (buffer {})", buffer.index())
            }
            gltf::buffer::Source::Uri(uri) => buffer_data.push(load_binary(uri).await?),
        }
    }
    Ok(buffer_data)
}

async fn load_materials(
    gltf: &gltf::Gltf,
    buffers: &[Vec<u8>],
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Vec<model::Material> {
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let name = material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#{}", file_name, materials.len()));
        let diffuse = match pbr.base_color_texture() {
            Some(info) => match info.texture().source().source() {
                gltf::image::Source::View { view, mime_type } => buffers
                    .get(view.buffer().index())
                    .and_then(|data| data.get(view.offset()..view.offset() + view.length()))
                    .context("image buffer view out of range")
                    .and_then(|bytes| {
                        Texture::from_bytes(device, queue, bytes, &name, mime_type.split('/').last())
                    }),
                gltf::image::Source::Uri { uri, mime_type } => {
                    load_texture(uri, device, queue, mime_type.and_then(|mt| mt.split('/').last()))
                        .await
                }
            },
            None => Ok(Texture::from_color(device, queue, [255; 4], &name)),
        };
        let diffuse = diffuse.unwrap_or_else(|e| {
            warn!("material {} falls back to white: {:#}", name, e);
            Texture::from_color(device, queue, [255; 4], &name)
        });
        materials.push(model::Material::new(
            device,
            &name,
            diffuse,
            pbr.base_color_factor(),
            layout,
        ));
    }
    // Primitives without a material use the last entry.
    let white = Texture::from_color(device, queue, [255; 4], "default material");
    materials.push(model::Material::new(device, "default", white, [1.0; 4], layout));
    materials
}

fn rest_transform(node: &gltf::Node) -> Instance {
    let (translation, rotation, scale) = node.transform().decomposed();
    Instance {
        position: translation.into(),
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    }
}

fn build_node(
    node: gltf::Node,
    buffers: &[Vec<u8>],
    materials: &[model::Material],
    device: &wgpu::Device,
    layouts: &Layouts,
    pick_id: u32,
) -> Box<dyn SceneNode> {
    let rest = rest_transform(&node);
    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let default_material = materials.len() - 1;
            let label = mesh.name().unwrap_or("mesh");
            let meshes = read_mesh_data(&mesh, buffers)
                .into_iter()
                .map(|primitive| {
                    let material = primitive
                        .material
                        .filter(|&index| index < default_material)
                        .unwrap_or(default_material);
                    model::Mesh::new(device, label, &primitive.vertices, &primitive.indices, material)
                })
                .collect();
            let model = model::Model {
                meshes,
                materials: materials.to_vec(),
            };
            let model_node =
                ModelNode::from_model(device, &layouts.skin, Some(node.index()), rest, model, pick_id);
            match node.skin() {
                Some(skin) => Box::new(model_node.with_skin(read_skin(&skin, buffers))),
                None => Box::new(model_node),
            }
        }
        None => Box::new(ContainerNode::new(Some(node.index()), rest)),
    };
    for child in node.children() {
        scene_node.add_child(build_node(child, buffers, materials, device, layouts, pick_id));
    }
    scene_node
}

/// Loads a glTF or GLB asset. Every mesh of it is picked with `pick_id`.
pub async fn load_model_gltf(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layouts: &Layouts,
    pick_id: u32,
) -> anyhow::Result<LoadedModel> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&bytes).with_context(|| format!("Cannot parse {}", file_name))?;
    let buffers = load_buffers(&gltf).await?;
    let materials = load_materials(&gltf, &buffers, file_name, device, queue, &layouts.material).await;

    let mut root = ContainerNode::new(None, Instance::new());
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                root.add_child(build_node(node, &buffers, &materials, device, layouts, pick_id));
            }
        }
        None => warn!("{} contains no scene", file_name),
    }

    let clips = read_animations(&gltf.document, &buffers);
    debug!(
        "loaded {}: {} nodes, {} animation clips",
        file_name,
        root.count(),
        clips.len()
    );
    Ok(LoadedModel { root, clips })
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector3};

    use super::*;
    use crate::data_structures::skin::skin_position;

    fn floats(bin: &mut Vec<u8>, values: &[f32]) {
        values.iter().for_each(|v| bin.extend_from_slice(&v.to_le_bytes()));
    }

    /// Packs a JSON chunk and a binary chunk into a GLB container.
    fn glb(json: &str, bin: Vec<u8>) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    /// A GLB with one triangle and a one second translation clip.
    fn triangle_glb() -> Vec<u8> {
        let mut bin: Vec<u8> = Vec::new();
        floats(&mut bin, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        [0u16, 1, 2, 0].iter().for_each(|i| bin.extend_from_slice(&i.to_le_bytes()));
        floats(&mut bin, &[0.0, 1.0]);
        floats(&mut bin, &[0.0, 0.0, 0.0, 1.0, 2.0, 0.0]);
        assert_eq!(bin.len(), 76);

        let json = r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 76}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36},
                {"buffer": 0, "byteOffset": 36, "byteLength": 6},
                {"buffer": 0, "byteOffset": 44, "byteLength": 8},
                {"buffer": 0, "byteOffset": 52, "byteLength": 24}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                 "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
                {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"},
                {"bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR",
                 "min": [0.0], "max": [1.0]},
                {"bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3"}
            ],
            "meshes": [{"name": "tri", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
            "nodes": [{"mesh": 0}],
            "scenes": [{"nodes": [0]}],
            "scene": 0,
            "animations": [{
                "name": "Wave",
                "channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}],
                "samplers": [{"input": 2, "output": 3, "interpolation": "LINEAR"}]
            }]
        }"#;
        glb(json, bin)
    }

    /// A triangle skinned to joint node 1, whose translation is animated
    /// from (0, 2, 0) to (2, 2, 0) over one second.
    fn skinned_glb() -> Vec<u8> {
        let mut bin: Vec<u8> = Vec::new();
        floats(&mut bin, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        bin.extend_from_slice(&[0u8; 12]);
        (0..3).for_each(|_| floats(&mut bin, &[1.0, 0.0, 0.0, 0.0]));
        floats(
            &mut bin,
            &[
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -2.0, 0.0, 1.0,
            ],
        );
        floats(&mut bin, &[0.0, 1.0]);
        floats(&mut bin, &[0.0, 2.0, 0.0, 2.0, 2.0, 0.0]);
        assert_eq!(bin.len(), 192);

        let json = r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 192}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36},
                {"buffer": 0, "byteOffset": 36, "byteLength": 12},
                {"buffer": 0, "byteOffset": 48, "byteLength": 48},
                {"buffer": 0, "byteOffset": 96, "byteLength": 64},
                {"buffer": 0, "byteOffset": 160, "byteLength": 8},
                {"buffer": 0, "byteOffset": 168, "byteLength": 24}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                 "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
                {"bufferView": 1, "componentType": 5121, "count": 3, "type": "VEC4"},
                {"bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC4"},
                {"bufferView": 3, "componentType": 5126, "count": 1, "type": "MAT4"},
                {"bufferView": 4, "componentType": 5126, "count": 2, "type": "SCALAR",
                 "min": [0.0], "max": [1.0]},
                {"bufferView": 5, "componentType": 5126, "count": 2, "type": "VEC3"}
            ],
            "meshes": [{"name": "flag", "primitives": [
                {"attributes": {"POSITION": 0, "JOINTS_0": 1, "WEIGHTS_0": 2}}
            ]}],
            "skins": [{"joints": [1], "inverseBindMatrices": 3}],
            "nodes": [
                {"mesh": 0, "skin": 0},
                {"name": "bone", "translation": [0.0, 2.0, 0.0]}
            ],
            "scenes": [{"nodes": [0, 1]}],
            "scene": 0,
            "animations": [{
                "name": "Slide",
                "channels": [{"sampler": 0, "target": {"node": 1, "path": "translation"}}],
                "samplers": [{"input": 4, "output": 5, "interpolation": "LINEAR"}]
            }]
        }"#;
        glb(json, bin)
    }

    fn parse() -> (gltf::Gltf, Vec<Vec<u8>>) {
        let gltf = gltf::Gltf::from_slice(&triangle_glb()).expect("hand-built GLB parses");
        let buffers = vec![gltf.blob.clone().expect("GLB has a binary chunk")];
        (gltf, buffers)
    }

    #[test]
    fn reads_triangle_with_default_attributes() {
        let (gltf, buffers) = parse();
        let mesh = gltf.meshes().next().expect("one mesh");
        let primitives = read_mesh_data(&mesh, &buffers);

        assert_eq!(primitives.len(), 1);
        let primitive = &primitives[0];
        assert_eq!(primitive.indices, vec![0, 1, 2]);
        assert_eq!(primitive.material, None);
        assert_eq!(primitive.vertices.len(), 3);
        assert_eq!(primitive.vertices[1].position, [1.0, 0.0, 0.0]);
        assert!(primitive.vertices.iter().all(|v| v.normal == DEFAULT_NORMAL));
        assert!(primitive.vertices.iter().all(|v| v.tex_coords == [0.0, 0.0]));
    }

    #[test]
    fn reads_translation_clip() {
        let (gltf, buffers) = parse();
        let clips = read_animations(&gltf.document, &buffers);

        assert_eq!(clips.len(), 1);
        let clip = &clips[0];
        assert_eq!(clip.name, "Wave");
        assert_eq!(clip.duration, 1.0);
        assert_eq!(clip.channels.len(), 1);
        assert_eq!(clip.channels[0].target, 0);
        assert_eq!(
            clip.channels[0].keyframes,
            Keyframes::Translation(vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 0.0)])
        );

        let mut pose = Instance::new();
        clip.channels[0].apply(0.5, &mut pose);
        assert_eq!(pose.position, Vector3::new(0.5, 1.0, 0.0));
    }

    #[test]
    fn rest_transform_reads_node_trs() {
        let (gltf, _) = parse();
        let node = gltf.nodes().next().expect("one node");
        assert_eq!(rest_transform(&node), Instance::new());
    }

    #[test]
    fn joint_channel_moves_skinned_vertices() {
        let gltf = gltf::Gltf::from_slice(&skinned_glb()).expect("hand-built GLB parses");
        let buffers = vec![gltf.blob.clone().expect("GLB has a binary chunk")];

        let mesh = gltf.meshes().next().expect("one mesh");
        let primitives = read_mesh_data(&mesh, &buffers);
        let vertex = primitives[0].vertices[1];
        assert_eq!(vertex.joints, [0; 4]);
        assert_eq!(vertex.weights, [1.0, 0.0, 0.0, 0.0]);

        let skinned = gltf.nodes().next().expect("mesh node");
        let skin = read_skin(&skinned.skin().expect("mesh node is skinned"), &buffers);
        assert_eq!(skin.joints, vec![1]);
        let clips = read_animations(&gltf.document, &buffers);

        let mut root = ContainerNode::new(None, Instance::new());
        for node in gltf.nodes() {
            root.add_child(Box::new(ContainerNode::new(Some(node.index()), rest_transform(&node))));
        }
        let mut skinned_at = |t: f32| {
            root.apply_pose(&clips[0], t);
            root.update_world_transforms(&Instance::new());
            let worlds = root.world_matrices();
            let palette = skin.joint_matrices(worlds[&0], &worlds);
            skin_position(&vertex, &palette)
        };

        assert!((skinned_at(0.0) - Vector3::new(1.0, 0.0, 0.0)).magnitude() < 1e-5);
        assert!((skinned_at(0.5) - Vector3::new(2.0, 0.0, 0.0)).magnitude() < 1e-5);
        assert!((skinned_at(1.0) - Vector3::new(3.0, 0.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn unskinned_vertices_follow_the_first_joint() {
        let (gltf, buffers) = parse();
        let mesh = gltf.meshes().next().expect("one mesh");
        let primitives = read_mesh_data(&mesh, &buffers);
        assert!(primitives[0].vertices.iter().all(|v| v.weights == [1.0, 0.0, 0.0, 0.0]));
        assert!(gltf.nodes().all(|node| node.skin().is_none()));
    }
}
