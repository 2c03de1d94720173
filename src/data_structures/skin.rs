//! Skeletal skinning: joint palettes and their GPU uniform.
//!
//! A [`Skin`] names the joint nodes of a mesh and their inverse bind
//! matrices. Every frame the palette is recomputed from the joints' world
//! transforms and uploaded into a [`SkinPalette`], which the model and pick
//! shaders blend per vertex.

use std::collections::HashMap;

use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4, Zero};
use wgpu::util::DeviceExt;

use crate::data_structures::model::ModelVertex;

/// Joints one palette holds; the uniform is `MAX_JOINTS` 4x4 matrices.
pub const MAX_JOINTS: usize = 64;

/// Joint nodes of a skinned mesh, in palette order.
#[derive(Clone, Debug, PartialEq)]
pub struct Skin {
    /// Node indices of the joints.
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Matrix4<f32>>,
}

impl Skin {
    /// Joint matrices in the mesh node's space.
    ///
    /// `worlds` maps node indices to world matrices. A joint missing from it
    /// keeps its bind pose.
    pub fn joint_matrices(
        &self,
        mesh_world: Matrix4<f32>,
        worlds: &HashMap<usize, Matrix4<f32>>,
    ) -> Vec<Matrix4<f32>> {
        let to_mesh = mesh_world.invert().unwrap_or_else(Matrix4::identity);
        self.joints
            .iter()
            .zip(&self.inverse_bind)
            .take(MAX_JOINTS)
            .map(|(joint, inverse_bind)| match worlds.get(joint) {
                Some(world) => to_mesh * world * inverse_bind,
                None => Matrix4::identity(),
            })
            .collect()
    }
}

/// Position of `vertex` after blending its joints from `palette`.
///
/// Mirrors the vertex stage of `model.wgsl`; joints outside the palette
/// count as identity.
pub fn skin_position(vertex: &ModelVertex, palette: &[Matrix4<f32>]) -> Vector3<f32> {
    let position = Vector4::new(vertex.position[0], vertex.position[1], vertex.position[2], 1.0);
    let blended = vertex
        .joints
        .iter()
        .zip(vertex.weights)
        .map(|(&joint, weight)| {
            let matrix = palette
                .get(joint as usize)
                .copied()
                .unwrap_or_else(Matrix4::identity);
            matrix * weight
        })
        .fold(Matrix4::zero(), |sum, m| sum + m);
    (blended * position).truncate()
}

pub fn skin_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("skin_bind_group_layout"),
    })
}

/// GPU copy of one node's joint palette.
#[derive(Debug)]
pub struct SkinPalette {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl SkinPalette {
    /// A palette of identities, which leaves unskinned meshes in place.
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skin Buffer"),
            contents: bytemuck::cast_slice(&[identity; MAX_JOINTS]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("skin_bind_group"),
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, matrices: &[Matrix4<f32>]) {
        let raw: Vec<[[f32; 4]; 4]> = matrices
            .iter()
            .take(MAX_JOINTS)
            .map(|&m| m.into())
            .collect();
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&raw));
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    #[test]
    fn bind_pose_is_identity() {
        let bind = Matrix4::from_translation(Vector3::new(0.0, 2.0, 0.0));
        let skin = Skin {
            joints: vec![3],
            inverse_bind: vec![bind.invert().unwrap()],
        };
        let worlds = HashMap::from([(3, bind)]);
        assert_eq!(skin.joint_matrices(Matrix4::identity(), &worlds), vec![Matrix4::identity()]);
    }

    #[test]
    fn weights_blend_joint_translations() {
        let palette = vec![
            Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0)),
            Matrix4::from_translation(Vector3::new(0.0, 4.0, 0.0)),
        ];
        let vertex = ModelVertex {
            position: [1.0, 1.0, 0.0],
            joints: [0, 1, 0, 0],
            weights: [0.5, 0.5, 0.0, 0.0],
            ..ModelVertex::default()
        };
        assert_eq!(skin_position(&vertex, &palette), Vector3::new(2.0, 3.0, 0.0));
        assert_eq!(
            skin_position(&ModelVertex::default(), &[]),
            Vector3::new(0.0, 0.0, 0.0)
        );
    }

    #[test]
    fn mesh_world_is_factored_out() {
        let mesh_world = Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0));
        let skin = Skin {
            joints: vec![1],
            inverse_bind: vec![Matrix4::identity()],
        };
        let worlds = HashMap::from([(1, mesh_world)]);
        assert_eq!(skin.joint_matrices(mesh_world, &worlds), vec![Matrix4::identity()]);
    }
}
