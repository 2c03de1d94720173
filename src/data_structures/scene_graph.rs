//! Scene graph and hierarchical scene organization.
//!
//! A loaded asset becomes a tree of [`SceneNode`]s under one root
//! [`ContainerNode`]. The root's local transform is driven by the model's
//! interaction logic, inner nodes by animation clips, and every
//! [`ModelNode`] keeps its world transform in an instance buffer and its
//! joint palette in a skin buffer.

use std::collections::HashMap;

use cgmath::Matrix4;
use log::warn;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        animation::AnimationClip,
        instance::{Instance, InstanceRaw},
        model,
        skin::{Skin, SkinPalette},
    },
    render::Instanced,
};

/// Rest, animated and world transform of one node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeTransforms {
    /// Index of the node in the source asset; `None` for synthetic nodes.
    pub index: Option<usize>,
    pub rest: Instance,
    pub local: Instance,
    pub world: Instance,
}

impl NodeTransforms {
    pub fn new(index: Option<usize>, rest: Instance) -> Self {
        Self {
            index,
            rest,
            local: rest,
            world: rest,
        }
    }

    fn pose(&mut self, clip: &AnimationClip, t: f32) {
        let Some(index) = self.index else {
            return;
        };
        let mut local = self.rest;
        for channel in clip.channels_for(index) {
            channel.apply(t, &mut local);
        }
        self.local = local;
    }
}

pub trait SceneNode {
    fn transforms(&self) -> &NodeTransforms;

    fn transforms_mut(&mut self) -> &mut NodeTransforms;

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.get_children_mut().push(child);
    }

    fn get_local_transform(&self) -> Instance {
        self.transforms().local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.transforms_mut().local = instance;
    }

    fn get_world_transform(&self) -> Instance {
        self.transforms().world
    }

    /// Recomputes world transforms of this subtree below `parent`.
    fn update_world_transforms(&mut self, parent: &Instance) {
        let world = parent * &self.transforms().local;
        self.transforms_mut().world = world;
        for child in self.get_children_mut().iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    /// Samples `clip` at `t` seconds into the local transforms of this subtree.
    ///
    /// Nodes the clip does not drive fall back to their rest transform.
    fn apply_pose(&mut self, clip: &AnimationClip, t: f32) {
        self.transforms_mut().pose(clip, t);
        for child in self.get_children_mut().iter_mut() {
            child.apply_pose(clip, t);
        }
    }

    /// Adds the world matrix of every indexed node of this subtree to `worlds`.
    fn collect_world_matrices(&self, worlds: &mut HashMap<usize, Matrix4<f32>>) {
        if let Some(index) = self.transforms().index {
            worlds.insert(index, self.transforms().world.to_matrix());
        }
        for child in self.get_children().iter() {
            child.collect_world_matrices(worlds);
        }
    }

    fn world_matrices(&self) -> HashMap<usize, Matrix4<f32>> {
        let mut worlds = HashMap::new();
        self.collect_world_matrices(&mut worlds);
        worlds
    }

    /// Recomputes the joint palettes of this subtree from `worlds`.
    fn pose_skins(&mut self, worlds: &HashMap<usize, Matrix4<f32>>) {
        for child in self.get_children_mut().iter_mut() {
            child.pose_skins(worlds);
        }
    }

    /// Poses every skin below this node. Call after `update_world_transforms`.
    fn update_skins(&mut self) {
        let worlds = self.world_matrices();
        self.pose_skins(&worlds);
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        for child in self.get_children_mut().iter_mut() {
            child.write_to_buffers(queue);
        }
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.get_children()
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }

    fn count(&self) -> usize {
        1 + self.get_children().iter().map(|c| c.count()).sum::<usize>()
    }
}

pub struct ContainerNode {
    pub children: Vec<Box<dyn SceneNode>>,
    transforms: NodeTransforms,
}

impl ContainerNode {
    pub fn new(index: Option<usize>, rest: Instance) -> Self {
        Self {
            children: Vec::new(),
            transforms: NodeTransforms::new(index, rest),
        }
    }
}

impl SceneNode for ContainerNode {
    fn transforms(&self) -> &NodeTransforms {
        &self.transforms
    }

    fn transforms_mut(&mut self) -> &mut NodeTransforms {
        &mut self.transforms
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }
}

/// A node that draws a mesh at its world transform.
pub struct ModelNode {
    children: Vec<Box<dyn SceneNode>>,
    transforms: NodeTransforms,
    instance_buffer: wgpu::Buffer,
    model: model::Model,
    skin: Option<Skin>,
    /// Joint matrices of the last `pose_skins`; empty for unskinned nodes.
    joints: Vec<Matrix4<f32>>,
    palette: SkinPalette,
    id: u32,
}

impl ModelNode {
    pub fn from_model(
        device: &wgpu::Device,
        skin_layout: &wgpu::BindGroupLayout,
        index: Option<usize>,
        rest: Instance,
        model: model::Model,
        id: u32,
    ) -> Self {
        let transforms = NodeTransforms::new(index, rest);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&[transforms.world.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        if model.meshes.is_empty() {
            warn!("model node {:?} has no drawable primitives", index);
        }
        Self {
            children: Vec::new(),
            transforms,
            instance_buffer,
            model,
            skin: None,
            joints: Vec::new(),
            palette: SkinPalette::new(device, skin_layout),
            id,
        }
    }

    pub fn with_skin(mut self, skin: Skin) -> Self {
        self.skin = Some(skin);
        self
    }
}

impl SceneNode for ModelNode {
    fn transforms(&self) -> &NodeTransforms {
        &self.transforms
    }

    fn transforms_mut(&mut self) -> &mut NodeTransforms {
        &mut self.transforms
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn pose_skins(&mut self, worlds: &HashMap<usize, Matrix4<f32>>) {
        if let Some(skin) = &self.skin {
            self.joints = skin.joint_matrices(self.transforms.world.to_matrix(), worlds);
        }
        for child in self.children.iter_mut() {
            child.pose_skins(worlds);
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        let raw: [InstanceRaw; 1] = [self.transforms.world.to_raw()];
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&raw));
        if !self.joints.is_empty() {
            self.palette.write(queue, &self.joints);
        }
        for child in self.children.iter_mut() {
            child.write_to_buffers(queue);
        }
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain([Instanced {
                instance: &self.instance_buffer,
                model: &self.model,
                skin: &self.palette.bind_group,
                amount: 1,
                id: self.id,
            }])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;
    use crate::data_structures::animation::{Channel, Interpolation, Keyframes};

    fn at(x: f32, y: f32, z: f32) -> Instance {
        Instance {
            position: Vector3::new(x, y, z),
            ..Instance::new()
        }
    }

    fn tree() -> ContainerNode {
        let mut root = ContainerNode::new(None, Instance::new());
        let mut arm = ContainerNode::new(Some(0), at(1.0, 0.0, 0.0));
        arm.add_child(Box::new(ContainerNode::new(Some(1), at(0.0, 1.0, 0.0))));
        root.add_child(Box::new(arm));
        root
    }

    fn hand(root: &ContainerNode) -> &dyn SceneNode {
        root.get_children()[0].get_children()[0].as_ref()
    }

    #[test]
    fn world_transforms_compose_down_the_tree() {
        let mut root = tree();
        root.set_local_transform(Instance {
            scale: Vector3::new(2.0, 2.0, 2.0),
            ..at(0.0, -1.0, 0.0)
        });
        root.update_world_transforms(&Instance::new());
        assert_eq!(hand(&root).get_world_transform().position, Vector3::new(2.0, 1.0, 0.0));
        assert_eq!(root.count(), 3);
    }

    #[test]
    fn pose_overrides_only_driven_nodes() {
        let mut root = tree();
        let clip = AnimationClip::new(
            "Wave",
            vec![Channel {
                target: 1,
                interpolation: Interpolation::Linear,
                timestamps: vec![0.0, 1.0],
                keyframes: Keyframes::Translation(vec![
                    Vector3::new(0.0, 1.0, 0.0),
                    Vector3::new(0.0, 3.0, 0.0),
                ]),
            }],
        );
        let root_local = at(5.0, 0.0, 0.0);
        root.set_local_transform(root_local);
        root.apply_pose(&clip, 0.5);
        root.update_world_transforms(&Instance::new());

        assert_eq!(root.get_local_transform(), root_local);
        assert_eq!(root.get_children()[0].get_local_transform(), at(1.0, 0.0, 0.0));
        assert_eq!(hand(&root).get_local_transform().position, Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(hand(&root).get_world_transform().position, Vector3::new(6.0, 2.0, 0.0));
    }

    #[test]
    fn world_matrices_cover_indexed_nodes() {
        let mut root = tree();
        root.update_world_transforms(&Instance::new());
        let worlds = root.world_matrices();
        assert_eq!(worlds.len(), 2);
        assert_eq!(worlds[&1], at(1.0, 1.0, 0.0).to_matrix());
    }

    #[test]
    fn containers_render_nothing() {
        assert!(tree().get_render().is_empty());
    }
}
